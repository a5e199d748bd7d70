//! Small text helpers.

/// Longest content preview written to the trusted-helper audit log.
pub const PREVIEW_LEN: usize = 64;

/// Truncates `s` to at most `max_chars` characters, adding an ellipsis if
/// anything was cut.
///
/// # Example
///
/// ```rust
/// use tessera::util::truncate_preview;
///
/// assert_eq!(truncate_preview("Hello", 10), "Hello");
/// assert_eq!(truncate_preview("Hello World", 6), "Hello…");
/// ```
pub fn truncate_preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    // Reserve one char for the ellipsis
    let limit = max_chars.saturating_sub(1);
    let mut result: String = s.chars().take(limit).collect();
    if max_chars > 0 {
        result.push('…');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_preview_fits() {
        assert_eq!(truncate_preview("abc", 3), "abc");
        assert_eq!(truncate_preview("", 0), "");
    }

    #[test]
    fn test_truncate_preview_cuts() {
        assert_eq!(truncate_preview("abcdef", 4), "abc…");
        assert_eq!(truncate_preview("abcdef", 0), "");
    }

    #[test]
    fn test_truncate_preview_counts_chars_not_bytes() {
        assert_eq!(truncate_preview("日本語テキスト", 3), "日本…");
    }

    #[test]
    fn test_preview_len_bounds_output() {
        let long = "x".repeat(500);
        assert_eq!(truncate_preview(&long, PREVIEW_LEN).chars().count(), PREVIEW_LEN);
    }
}
