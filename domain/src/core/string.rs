//! String utilities for the domain layer.

/// Truncate to at most `max_chars` characters, ending with an ellipsis when
/// anything was cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Truncate tool output, telling the reader how much was dropped.
pub fn truncate_output(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars).collect();
    format!("{}\n... [truncated {} chars]", kept, total - max_chars)
}

/// Collapse an arbitrary string to a single display line.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
