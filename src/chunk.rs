//! Word-boundary text chunker.
//!
//! Splits document text into chunks of at most `max_size` bytes by greedily
//! packing whitespace-delimited words. A word is never split; a single word
//! longer than `max_size` becomes a chunk of its own.
//!
//! Input is sanitized first: the embedding backend and the datastore both
//! reject NUL characters and invalid UTF-8.

use crate::models::Chunk;

/// Strip NUL characters from already-decoded text.
pub fn sanitize_text(text: &str) -> String {
    text.chars().filter(|&c| c != '\0').collect()
}

/// Decode raw bytes, dropping invalid UTF-8 sequences, then sanitize.
pub fn sanitize_bytes(bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                decoded.push_str(valid);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                decoded.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => rest = &after[len..],
                    // Truncated sequence at the end of input
                    None => break,
                }
            }
        }
    }

    sanitize_text(&decoded)
}

/// Split text into word-boundary chunks no longer than `max_size` bytes.
///
/// Returns an empty vector for empty or whitespace-only input. Joining the
/// chunks with single spaces reproduces the input's word sequence.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<String> {
    let text = sanitize_text(text);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > max_size {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Attach ownership and 1-based sequence indices to chunk texts.
pub fn make_chunks(tenant_id: &str, source_document: &str, texts: Vec<String>) -> Vec<Chunk> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            sequence_index: i as i32 + 1,
            text,
            source_document: source_document.to_string(),
            tenant_id: tenant_id.to_string(),
        })
        .collect()
}
