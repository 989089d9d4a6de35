//! Small text helpers used wherever content is cut to a length limit.

/// Truncate to at most `max_chars` characters (not bytes).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Whether a text field counts as missing: empty or whitespace only.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
