//! Query expansion for keyword search.
//!
//! A text generator is asked for related search terms (spelling variants,
//! English equivalents, compound forms, trade names) separated by `|`. The
//! reply is cleaned and deduplicated into an expanded keyword list that
//! always starts with the original query.

use crate::fallback::FallbackChain;
use crate::tokenize::{dedup_case_insensitive, has_thai, Tokenizer};

/// Decoration the models like to add around keywords. `**` is covered by `*`.
const DECORATIONS: &[&str] = &[
    "*", "\"", ":", "`", "- ", "• ", "【", "】", "《", "》", "「", "」",
];

pub fn expansion_prompt(query: &str) -> String {
    format!(
        "คุณเป็นผู้เชี่ยวชาญด้านการค้นหาข้อมูลภาษาไทย\n\n\
         คำค้นหาของผู้ใช้: \"{}\"\n\n\
         กรุณาสร้างรายการคำค้นหาที่เกี่ยวข้อง โดย:\n\
         1. คำพ้องเสียงภาษาไทย (เช่น กระเบื้อง → กะเบื้อง)\n\
         2. คำภาษาอังกฤษที่เกี่ยวข้อง (เช่น กระเบื้อง → tile, roof tile)\n\
         3. แก้คำสะกดผิด (ถ้ามี)\n\
         4. คำที่เกี่ยวข้อง (เช่น กระเบื้อง → กระเบื้องหลังคา, กระเบื้องปูพื้น, กระเบื้องเซรามิก)\n\
         5. คำย่อหรือชื่อทางการค้า\n\n\
         ตอบเฉพาะคำค้นหาที่เกี่ยวข้อง แยกด้วยเครื่องหมาย | เท่านั้น ไม่ต้องอธิบาย\n\
         ตัวอย่าง: กระเบื้อง|กะเบื้อง|tile|roof tile|กระเบื้องหลังคา|กระเบื้องปูพื้น",
        query
    )
}

/// Strip decoration characters and collapse repeated spaces.
pub fn clean_special_characters(text: &str) -> String {
    let mut result = text.to_string();
    for d in DECORATIONS {
        result = result.replace(*d, "");
    }
    while result.contains("  ") {
        result = result.replace("  ", " ");
    }
    result.trim().to_string()
}

/// Turn a raw `a|b|c` reply into keywords: the original query first, then
/// each cleaned term of at least two characters, Thai terms followed by
/// their dictionary segments. Deduplicated case-insensitively, capped at
/// `max_keywords`.
pub fn parse_expansion(
    reply: &str,
    query: &str,
    tokenizer: &Tokenizer,
    max_keywords: usize,
) -> Vec<String> {
    let cleaned = clean_special_characters(reply);
    let mut candidates = vec![query.to_string()];

    for term in cleaned.split('|') {
        let term = term.replace(&['\n', '\r'][..], " ");
        let term = term.trim_matches(|c: char| matches!(c, '-' | ' ' | '•' | '\t')).trim();
        if term.chars().count() < 2 {
            continue;
        }

        candidates.push(term.to_string());
        if has_thai(term) {
            candidates.extend(
                tokenizer
                    .segment_phrase(term)
                    .into_iter()
                    .filter(|s| s.chars().count() >= 2),
            );
        }
    }

    let mut keywords = dedup_case_insensitive(candidates);
    keywords.truncate(max_keywords.max(1));
    keywords
}

/// Expand `query` through the chain. Returns `[query]` when every provider
/// fails.
pub async fn expand_query(
    chain: &FallbackChain,
    tokenizer: &Tokenizer,
    query: &str,
    max_keywords: usize,
) -> Vec<String> {
    match chain.invoke(&expansion_prompt(query)).await {
        Some(reply) => {
            let keywords = parse_expansion(&reply, query, tokenizer, max_keywords);
            tracing::info!(count = keywords.len(), ?keywords, "expanded query");
            keywords
        }
        None => vec![query.to_string()],
    }
}

/// Expansion merged with rule-based extraction of the query itself.
///
/// The original query always comes first and is exempt from the
/// two-character minimum, so the result is never empty.
pub async fn smart_keywords(
    chain: &FallbackChain,
    tokenizer: &Tokenizer,
    query: &str,
    max_keywords: usize,
) -> Vec<String> {
    let mut all = expand_query(chain, tokenizer, query, max_keywords).await;
    all.extend(tokenizer.extract(query));
    all.retain(|k| k == query || k.chars().count() >= 2);
    dedup_case_insensitive(all)
}
