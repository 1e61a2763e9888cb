//! Edit-distance similarity between two already-normalized strings.

use strsim::levenshtein;

/// Only this many leading characters of each side are compared, so a pasted
/// wall of text cannot blow up the O(n*m) distance table.
pub const MAX_COMPARED_CHARS: usize = 100;

/// Levenshtein distance over the first [`MAX_COMPARED_CHARS`] characters.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    levenshtein(truncate_chars(a), truncate_chars(b))
}

/// Similarity in `0..=1`: `1 - distance / max(len(a), len(b))`.
///
/// Two empty strings score 0, never 1: an absent value must not look like a
/// match.
///
/// ```
/// use rust_lead_dedup::similarity::similarity;
///
/// assert_eq!(similarity("acme", "acme"), 1.0);
/// assert_eq!(similarity("acme", "acne"), 0.75);
/// assert_eq!(similarity("", ""), 0.0);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = truncate_chars(a);
    let b = truncate_chars(b);

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }

    let distance = levenshtein(a, b);
    (1.0 - distance as f64 / max_len as f64).clamp(0.0, 1.0)
}

fn truncate_chars(s: &str) -> &str {
    match s.char_indices().nth(MAX_COMPARED_CHARS) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
