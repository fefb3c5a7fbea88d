//! Concurrent multi-keyword full-text search over a document tree.
//!
//! Used when no vector index is available. Documents are enumerated once;
//! every `(keyword, document)` pair becomes one job on a bounded worker
//! pool. Workers pull jobs from a shared queue and append their matches to
//! a single shared collection. Matches are then deduplicated on
//! `(file_path, line_number)`, keeping the first occurrence.
//!
//! Result order depends on scheduling and is not stable between runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::chunk::sanitize_bytes;
use crate::config::TextSearchConfig;
use crate::error::{Error, Result};
use crate::models::TextMatch;

/// Matches rendered into a synthesis context, at most.
pub const MAX_CONTEXT_MATCHES: usize = 20;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub extensions: Vec<String>,
    pub context_before: usize,
    pub context_after: usize,
    /// `0` means one worker per available CPU.
    pub max_workers: usize,
}

impl SearchOptions {
    pub fn from_config(config: &TextSearchConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            context_before: config.context_before,
            context_after: config.context_after,
            max_workers: config.max_workers,
        }
    }

    fn worker_count(&self, jobs: usize) -> usize {
        let limit = if self.max_workers > 0 {
            self.max_workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        };
        limit.min(jobs).max(1)
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&TextSearchConfig::default())
    }
}

fn build_globset(extensions: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for ext in extensions {
        let pattern = format!("**/*.{}", ext.trim_start_matches('.').to_lowercase());
        let glob = Glob::new(&pattern)
            .map_err(|e| Error::Configuration(format!("bad extension {:?}: {}", ext, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Configuration(format!("extension filter: {}", e)))
}

/// List the files under `root` whose extension is one of `extensions`
/// (case-insensitive), sorted by path.
pub fn list_documents(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::NotFound {
            kind: "document directory",
            name: root.display().to_string(),
        });
    }

    let filter = build_globset(extensions)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if filter.is_match(relative.to_string_lossy().to_lowercase()) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Find every line of `lines` containing `keyword` (case-insensitive).
pub fn search_lines(
    lines: &[&str],
    keyword: &str,
    file_path: &str,
    before: usize,
    after: usize,
) -> Vec<TextMatch> {
    let needle = keyword.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !line.to_lowercase().contains(&needle) {
            continue;
        }
        let start = i.saturating_sub(before);
        let end = (i + after).min(lines.len() - 1);

        matches.push(TextMatch {
            file_path: file_path.to_string(),
            line_number: i + 1,
            context_lines: lines[start..=end].iter().map(|l| l.to_string()).collect(),
            matched_line_offset: i - start,
        });
    }
    matches
}

/// Search one file. An unreadable file yields no matches.
pub async fn search_file(path: &Path, keyword: &str, before: usize, after: usize) -> Vec<TextMatch> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read document");
            return Vec::new();
        }
    };
    let text = sanitize_bytes(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    search_lines(&lines, keyword, &path.display().to_string(), before, after)
}

/// Keep the first match for each `(file_path, line_number)`.
pub fn dedup_matches(matches: Vec<TextMatch>) -> Vec<TextMatch> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert((m.file_path.clone(), m.line_number)))
        .collect()
}

/// Search every document under `root` for every keyword.
pub async fn search_directory(
    root: &Path,
    keywords: &[String],
    opts: &SearchOptions,
) -> Result<Vec<TextMatch>> {
    let files = list_documents(root, &opts.extensions)?;

    let keywords: Vec<Arc<str>> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(Arc::<str>::from)
        .collect();

    let total_jobs = keywords.len() * files.len();
    if total_jobs == 0 {
        return Ok(Vec::new());
    }

    let (job_tx, job_rx) = mpsc::channel::<(Arc<str>, PathBuf)>(total_jobs);
    for keyword in &keywords {
        for file in &files {
            // Capacity equals the job count, so this never waits
            if job_tx.send((keyword.clone(), file.clone())).await.is_err() {
                break;
            }
        }
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let results: Arc<Mutex<Vec<TextMatch>>> = Arc::new(Mutex::new(Vec::new()));
    let workers = opts.worker_count(total_jobs);

    tracing::debug!(
        keywords = keywords.len(),
        files = files.len(),
        workers,
        "starting keyword search"
    );

    let mut pool = JoinSet::new();
    for _ in 0..workers {
        let job_rx = Arc::clone(&job_rx);
        let results = Arc::clone(&results);
        let (before, after) = (opts.context_before, opts.context_after);

        pool.spawn(async move {
            loop {
                let job = job_rx.lock().await.recv().await;
                let Some((keyword, path)) = job else {
                    break;
                };
                let found = search_file(&path, &keyword, before, after).await;
                if !found.is_empty() {
                    results.lock().await.extend(found);
                }
            }
        });
    }

    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "keyword search worker panicked");
        }
    }

    let all = std::mem::take(&mut *results.lock().await);
    let unique = dedup_matches(all);
    tracing::info!(matches = unique.len(), "keyword search finished");
    Ok(unique)
}

/// Render matches as context for answer synthesis.
pub fn format_matches_for_ai(matches: &[TextMatch], query: &str) -> String {
    if matches.is_empty() {
        return format!("No information related to '{}' was found.", query);
    }

    let mut out = format!(
        "Found {} results related to the query '{}':\n\n",
        matches.len(),
        query
    );

    for (i, m) in matches.iter().take(MAX_CONTEXT_MATCHES).enumerate() {
        let base = Path::new(&m.file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| m.file_path.clone());
        out.push_str(&format!(
            "--- result {} (file: {}, line: {}) ---\n",
            i + 1,
            base,
            m.line_number
        ));

        for (j, line) in m.context_lines.iter().enumerate() {
            if j == m.matched_line_offset {
                out.push_str(&format!(">>> {} <<<\n", line));
            } else if !line.trim().is_empty() {
                out.push_str(&format!("    {}\n", line));
            }
        }
        out.push('\n');
    }

    if matches.len() > MAX_CONTEXT_MATCHES {
        out.push_str(&format!(
            "... and {} more results\n",
            matches.len() - MAX_CONTEXT_MATCHES
        ));
    }

    out
}
