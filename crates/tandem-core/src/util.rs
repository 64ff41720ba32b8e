//! Small string helpers shared across the workspace.

/// Longest prefix of `text` holding at most `max_chars` characters,
/// always cut on a character boundary.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::char_prefix;

    #[test]
    fn char_prefix_shorter_input_is_untouched() {
        assert_eq!(char_prefix("short", 120), "short");
    }

    #[test]
    fn char_prefix_cuts_at_char_count() {
        assert_eq!(char_prefix("abcdef", 3), "abc");
        assert_eq!(char_prefix("abcdef", 0), "");
    }

    #[test]
    fn char_prefix_respects_multibyte_boundaries() {
        // "résumé" holds 6 chars but 8 bytes
        assert_eq!(char_prefix("résumé", 4), "résu");
        assert_eq!(char_prefix("μμμ", 2), "μμ");
    }
}
