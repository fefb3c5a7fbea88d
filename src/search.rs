//! Query answering: vector similarity search and expanded keyword search,
//! each optionally followed by answer synthesis.

use serde::Serialize;

use crate::chunk::sanitize_text;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::expand::smart_keywords;
use crate::fallback::summarize;
use crate::models::{RankedMatch, TextMatch, UnitDistance};
use crate::textsearch::{format_matches_for_ai, search_directory, SearchOptions};

/// Matches at or below this similarity are never reported.
pub const SIMILARITY_CUTOFF: f64 = 0.15;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub tenant_id: String,
    pub results: Vec<RankedMatch>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesized_answer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextSearchResponse {
    pub query: String,
    pub keywords: Vec<String>,
    pub results: Vec<TextMatch>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesized_answer: Option<String>,
}

/// Answer used when matches exist but no provider could synthesize one.
pub fn degraded_answer(query: &str) -> String {
    format!("related results found for {}", query)
}

/// Convert nearest-neighbour rows into ranked matches: undecodable rows are
/// skipped, similarity is `1 - distance`, matches at or below
/// [`SIMILARITY_CUTOFF`] are dropped, and the rest are ordered by
/// descending similarity.
pub fn rank(rows: Vec<Result<UnitDistance>>) -> Vec<RankedMatch> {
    let mut filtered = 0usize;
    let mut ranked: Vec<RankedMatch> = Vec::with_capacity(rows.len());

    for row in rows {
        let unit = match row {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable row");
                continue;
            }
        };

        let similarity = 1.0 - unit.distance;
        if similarity > SIMILARITY_CUTOFF {
            ranked.push(RankedMatch {
                content: unit.content,
                source_document: unit.source_document,
                tenant_id: unit.tenant_id,
                sequence_index: unit.sequence_index,
                similarity,
            });
        } else {
            filtered += 1;
        }
    }

    if filtered > 0 {
        tracing::debug!(filtered, cutoff = SIMILARITY_CUTOFF, "dropped low-similarity matches");
    }

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// Rank `tenant_id`'s units against `query`.
///
/// A `limit` below 1 falls back to `retrieval.default_limit`. Embedding
/// or datastore failures fail the whole search; an empty result is not an
/// error.
pub async fn similarity_search(
    ctx: &AppContext,
    tenant_id: &str,
    query: &str,
    limit: i64,
) -> Result<Vec<RankedMatch>> {
    let query = sanitize_text(query);
    if query.trim().is_empty() {
        return Err(Error::malformed("query must not be empty"));
    }
    if tenant_id.trim().is_empty() {
        return Err(Error::malformed("tenant id must not be empty"));
    }
    let limit = if limit < 1 {
        ctx.config.retrieval.default_limit
    } else {
        limit
    };

    let vector = ctx.embedder.embed(&query).await?;
    let rows = ctx.store.nearest(tenant_id, &vector, limit).await?;
    let ranked = rank(rows);

    tracing::info!(tenant_id, limit, results = ranked.len(), "similarity search");
    Ok(ranked)
}

/// Render ranked matches as context for answer synthesis.
pub fn format_ranked_for_ai(matches: &[RankedMatch]) -> String {
    let mut out = String::new();
    for (i, m) in matches.iter().enumerate() {
        out.push_str(&format!(
            "--- result {} (file: {}, chunk: {}, similarity: {:.4}) ---\n{}\n\n",
            i + 1,
            m.source_document,
            m.sequence_index,
            m.similarity,
            m.content
        ));
    }
    out
}

/// Similarity search plus synthesis. Synthesis only runs when there are
/// results; when every provider fails the answer degrades to
/// [`degraded_answer`].
pub async fn search_and_summarize(
    ctx: &AppContext,
    tenant_id: &str,
    query: &str,
    limit: i64,
) -> Result<SearchResponse> {
    let results = similarity_search(ctx, tenant_id, query, limit).await?;

    let synthesized_answer = if results.is_empty() {
        None
    } else {
        let context = format_ranked_for_ai(&results);
        Some(
            summarize(&ctx.summarizers, query, &context)
                .await
                .unwrap_or_else(|| degraded_answer(query)),
        )
    };

    Ok(SearchResponse {
        query: query.to_string(),
        tenant_id: tenant_id.to_string(),
        total: results.len(),
        results,
        synthesized_answer,
    })
}

/// Expand the query, search the document tree for every keyword and
/// synthesize an answer from the matches.
pub async fn keyword_search_and_summarize(
    ctx: &AppContext,
    query: &str,
) -> Result<TextSearchResponse> {
    let query = sanitize_text(query);
    if query.trim().is_empty() {
        return Err(Error::malformed("query must not be empty"));
    }

    let ts = &ctx.config.textsearch;
    let keywords = smart_keywords(&ctx.expanders, &ctx.tokenizer, &query, ts.max_keywords).await;
    let results = search_directory(&ts.root, &keywords, &SearchOptions::from_config(ts)).await?;

    let synthesized_answer = if results.is_empty() {
        None
    } else {
        let context = format_matches_for_ai(&results, &query);
        Some(
            summarize(&ctx.summarizers, &query, &context)
                .await
                .unwrap_or_else(|| degraded_answer(&query)),
        )
    };

    Ok(TextSearchResponse {
        total: results.len(),
        query,
        keywords,
        results,
        synthesized_answer,
    })
}

/// `shoprag search`: print ranked matches and the synthesized answer.
pub async fn run_search(ctx: &AppContext, tenant_id: &str, query: &str, limit: i64) -> anyhow::Result<()> {
    let response = search_and_summarize(ctx, tenant_id, query, limit).await?;

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, m) in response.results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} #{}",
            i + 1,
            m.similarity,
            m.source_document,
            m.sequence_index
        );
        println!("    excerpt: \"{}\"", excerpt(&m.content));
        println!();
    }

    if let Some(answer) = &response.synthesized_answer {
        println!("Answer:");
        println!("{}", answer);
    }
    Ok(())
}

/// `shoprag grep`: expanded keyword search over the document tree.
pub async fn run_grep(ctx: &AppContext, query: &str) -> anyhow::Result<()> {
    let response = keyword_search_and_summarize(ctx, query).await?;

    println!("keywords: {}", response.keywords.join(", "));
    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for m in &response.results {
        let line = m
            .context_lines
            .get(m.matched_line_offset)
            .map(String::as_str)
            .unwrap_or_default();
        println!("{}:{}: {}", m.file_path, m.line_number, line.trim());
    }
    println!();
    println!("{} matches", response.total);

    if let Some(answer) = &response.synthesized_answer {
        println!();
        println!("Answer:");
        println!("{}", answer);
    }
    Ok(())
}

fn excerpt(content: &str) -> String {
    let flat = content.replace('\n', " ");
    let trimmed = flat.trim();
    if trimmed.chars().count() > 240 {
        format!("{}...", trimmed.chars().take(240).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: i32, distance: f64) -> Result<UnitDistance> {
        Ok(UnitDistance {
            content: format!("chunk {}", idx),
            source_document: "doc1.md".to_string(),
            tenant_id: "shop1".to_string(),
            sequence_index: idx,
            distance,
        })
    }

    #[test]
    fn test_rank_filters_at_cutoff() {
        let ranked = rank(vec![row(1, 0.5), row(2, 0.95), row(3, 1.2)]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].sequence_index, 1);
        assert!(ranked.iter().all(|m| m.similarity > SIMILARITY_CUTOFF));
    }

    #[test]
    fn test_rank_orders_descending() {
        let ranked = rank(vec![row(1, 0.6), row(2, 0.1), row(3, 0.3)]);
        let sims: Vec<f64> = ranked.iter().map(|m| m.similarity).collect();
        assert_eq!(ranked[0].sequence_index, 2);
        assert!(sims.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_rank_skips_decode_errors() {
        let ranked = rank(vec![
            row(1, 0.2),
            Err(Error::RowDecode("bad column".into())),
            row(2, 0.3),
        ]);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::new()).is_empty());
    }

    #[test]
    fn test_format_ranked_for_ai() {
        let ranked = rank(vec![row(4, 0.25)]);
        let out = format_ranked_for_ai(&ranked);
        assert!(out.contains("file: doc1.md, chunk: 4"));
        assert!(out.contains("chunk 4\n"));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "ก".repeat(300);
        assert_eq!(excerpt(&long).chars().count(), 243);
        assert_eq!(excerpt(" a\nb "), "a b");
    }
}
