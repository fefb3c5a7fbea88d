//! Thai-aware tokenizer and keyword extractor.
//!
//! Two tiers:
//!
//! 1. **Dictionary** — longest-matching segmentation against a word list
//!    loaded at startup. Only runs containing Thai are split this way,
//!    since Thai is written without spaces between words.
//! 2. **Rules** — always available. Letters, digits and characters of the
//!    Thai block (U+0E00–U+0E7F) form words; every other character is a
//!    separator. Runs shorter than two characters are dropped.
//!
//! A missing or unreadable word list degrades to tier 2 with a warning.

use std::collections::HashSet;
use std::path::Path;

use crate::config::TokenizerConfig;
use crate::error::Result;

const MIN_WORD_CHARS: usize = 2;
/// Single keywords shorter than this get the full query appended.
const SHORT_KEYWORD_CHARS: usize = 4;

pub fn is_thai_char(c: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&c)
}

pub fn has_thai(text: &str) -> bool {
    text.chars().any(is_thai_char)
}

fn is_word_char(c: char) -> bool {
    is_thai_char(c) || c.is_alphanumeric()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

struct Dictionary {
    words: HashSet<String>,
    /// Longest entry, in characters.
    max_len: usize,
}

impl Dictionary {
    fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: HashSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        let max_len = words.iter().map(|w| char_len(w)).max().unwrap_or(0);
        Self { words, max_len }
    }

    /// Greedy longest-match segmentation. Characters not covered by any
    /// entry are grouped into runs of their own.
    fn segment(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = Vec::new();
        let mut unknown = String::new();
        let mut i = 0;

        while i < chars.len() {
            let longest = (1..=self.max_len.min(chars.len() - i))
                .rev()
                .map(|len| (len, chars[i..i + len].iter().collect::<String>()))
                .find(|(_, candidate)| self.words.contains(candidate));

            match longest {
                Some((len, word)) => {
                    if !unknown.is_empty() {
                        out.push(std::mem::take(&mut unknown));
                    }
                    out.push(word);
                    i += len;
                }
                None => {
                    unknown.push(chars[i]);
                    i += 1;
                }
            }
        }

        if !unknown.is_empty() {
            out.push(unknown);
        }
        out
    }
}

pub struct Tokenizer {
    dictionary: Option<Dictionary>,
}

impl Tokenizer {
    /// Rule-based tokenizer with no dictionary.
    pub fn rule_based() -> Self {
        Self { dictionary: None }
    }

    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dict = Dictionary::new(words);
        if dict.words.is_empty() {
            return Self::rule_based();
        }
        Self {
            dictionary: Some(dict),
        }
    }

    /// Load a newline-separated word list.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::with_words(content.lines()))
    }

    /// Build from config, degrading to rule-based segmentation when the
    /// word list cannot be loaded.
    pub fn from_config(config: &TokenizerConfig) -> Self {
        let Some(path) = &config.dictionary_path else {
            return Self::rule_based();
        };

        match Self::from_file(path) {
            Ok(tokenizer) if tokenizer.has_dictionary() => {
                tracing::info!(path = %path.display(), "loaded segmentation dictionary");
                tokenizer
            }
            Ok(_) => {
                tracing::warn!(path = %path.display(), "segmentation dictionary is empty, using rule-based tokenizer");
                Self::rule_based()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "segmentation dictionary unavailable, using rule-based tokenizer");
                Self::rule_based()
            }
        }
    }

    pub fn has_dictionary(&self) -> bool {
        self.dictionary.is_some()
    }

    /// Split text into words of at least two characters.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let mut words = Vec::new();
        for run in text.split(|c: char| !is_word_char(c)) {
            if run.is_empty() {
                continue;
            }
            match &self.dictionary {
                Some(dict) if has_thai(run) => words.extend(dict.segment(run)),
                _ => words.push(run.to_string()),
            }
        }
        words.retain(|w| char_len(w) >= MIN_WORD_CHARS);
        words
    }

    /// Dictionary segments of a phrase, used to split compound expansion
    /// terms. Without a dictionary the phrase comes back unchanged.
    pub fn segment_phrase(&self, phrase: &str) -> Vec<String> {
        match &self.dictionary {
            Some(dict) => dict
                .segment(phrase)
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| char_len(s) >= MIN_WORD_CHARS && !s.contains(' '))
                .collect(),
            None => vec![phrase.to_string()],
        }
    }

    /// Extract search keywords from a query.
    ///
    /// Output is case-insensitively deduplicated and never empty for
    /// non-empty input: with no words found the query itself is returned,
    /// and a lone short keyword is accompanied by the full query.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let words = self.segment(text);
        if words.is_empty() {
            return vec![text.to_string()];
        }

        let mut keywords = dedup_case_insensitive(words);

        if keywords.len() == 1
            && char_len(&keywords[0]) < SHORT_KEYWORD_CHARS
            && keywords[0].to_lowercase() != text.to_lowercase()
        {
            keywords.push(text.to_string());
        }
        keywords
    }
}

/// Keep the first occurrence of each keyword, comparing lowercased.
pub fn dedup_case_insensitive<I>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    words
        .into_iter()
        .filter(|w| seen.insert(w.to_lowercase()))
        .collect()
}
