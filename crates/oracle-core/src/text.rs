//! Small text helpers shared by the converters, the ranker and the deduplicator.

use std::collections::HashSet;

/// Lowercased, whitespace-separated tokens of `text`.
pub fn keywords(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Fraction of `query` keywords that also occur in `words`, in `[0, 1]`.
pub fn overlap_ratio(query: &HashSet<String>, words: &HashSet<String>) -> f32 {
    if query.is_empty() { return 0.0; }
    let matches = query.intersection(words).count();
    matches as f32 / query.len() as f32
}

/// Trimmed and lowercased form used for content equality.
pub fn normalize(text: &str) -> String { text.trim().to_lowercase() }

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
