//! Terminal output helpers
//!
//! Conversation text and names come straight out of the stores and may carry
//! escape sequences. Anything the CLI prints goes through [`sanitize`] first.

/// Removes ANSI CSI sequences and control characters other than tab and newline
///
/// ```
/// use composer_history::utils::terminal::sanitize;
///
/// assert_eq!(sanitize("\x1b[31mred\x1b[0m"), "red");
/// ```
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for next in chars.by_ref() {
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        if ch.is_control() && ch != '\t' && ch != '\n' {
            continue;
        }
        out.push(ch);
    }

    out
}

/// Single-line, sanitized preview truncated to `max_chars` characters
pub fn preview_line(text: &str, max_chars: usize) -> String {
    let flat = sanitize(text).split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut truncated: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_color_and_cursor_codes() {
        assert_eq!(sanitize("\x1b[2J\x1b[H\x1b[1;31mhello\x1b[0m"), "hello");
    }

    #[test]
    fn test_sanitize_drops_bare_escape_and_bell() {
        assert_eq!(sanitize("a\x1bb\x07c"), "abc");
    }

    #[test]
    fn test_sanitize_keeps_newlines_and_unicode() {
        assert_eq!(sanitize("line 1\nline 2\t👋"), "line 1\nline 2\t👋");
    }

    #[test]
    fn test_preview_line_collapses_whitespace() {
        assert_eq!(preview_line("fix\n  the   build", 80), "fix the build");
    }

    #[test]
    fn test_preview_line_truncates() {
        assert_eq!(preview_line("abcdefghij", 5), "abcd…");
        assert_eq!(preview_line("abcde", 5), "abcde");
    }
}
