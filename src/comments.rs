//! Comment stripping for scanned source files.
//!
//! Marker extraction must not match text inside comments, so each file is
//! stripped before scanning. Comment bytes are replaced with spaces and
//! newlines are kept, which preserves the line/column structure of the file:
//! a marker's byte offset in the stripped text equals its offset in the
//! original. String and character literals are passed through untouched so
//! comment-like substrings inside them survive.

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Code,
    LineComment,
    BlockComment { start: usize },
    StringLiteral,
    CharLiteral,
}

/// Replace all `//` and `/* */` comments in `text` with whitespace.
///
/// Fails on an unterminated block comment; the caller is expected to skip
/// the file and keep scanning others.
pub fn strip_comments(text: &str) -> Result<String, ScanError> {
    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match state {
            State::Code => match c {
                '/' => match chars.peek() {
                    Some((_, '/')) => {
                        chars.next();
                        out.push_str("  ");
                        state = State::LineComment;
                    }
                    Some((_, '*')) => {
                        chars.next();
                        out.push_str("  ");
                        state = State::BlockComment { start: i };
                    }
                    _ => out.push(c),
                },
                '"' => {
                    out.push(c);
                    state = State::StringLiteral;
                }
                '\'' => {
                    out.push(c);
                    state = State::CharLiteral;
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment { .. } => {
                if c == '*' {
                    if let Some((_, '/')) = chars.peek() {
                        chars.next();
                        out.push_str("  ");
                        state = State::Code;
                        continue;
                    }
                }
                if c == '\n' {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::StringLiteral => {
                out.push(c);
                if c == '\\' {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == '"' {
                    state = State::Code;
                }
            }
            State::CharLiteral => {
                out.push(c);
                if c == '\\' {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == '\'' {
                    state = State::Code;
                }
            }
        }
    }

    if let State::BlockComment { start } = state {
        return Err(ScanError::UnterminatedComment { offset: start });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_comments() {
        let stripped = strip_comments("int a; // scanner_plugin(X)\nint b;").unwrap();
        assert!(!stripped.contains("scanner_plugin"));
        assert!(stripped.contains("int a;"));
        assert!(stripped.contains("int b;"));
    }

    #[test]
    fn strips_block_comments_preserving_lines() {
        let text = "before /* one\ntwo\nthree */ after";
        let stripped = strip_comments(text).unwrap();
        assert_eq!(stripped.lines().count(), text.lines().count());
        assert!(stripped.starts_with("before"));
        assert!(stripped.ends_with(" after"));
        assert!(!stripped.contains("one"));
    }

    #[test]
    fn offsets_are_preserved() {
        let text = "/* pad */ scanner_plugin";
        let stripped = strip_comments(text).unwrap();
        assert_eq!(
            text.find("scanner_plugin"),
            stripped.find("scanner_plugin")
        );
    }

    #[test]
    fn string_literals_are_not_comments() {
        let text = r#"const char* s = "// not a comment /* either */";"#;
        let stripped = strip_comments(text).unwrap();
        assert_eq!(stripped, text);
    }

    #[test]
    fn char_literal_quote_does_not_open_string() {
        let text = "char c = '\"'; // gone\nint x;";
        let stripped = strip_comments(text).unwrap();
        assert!(!stripped.contains("gone"));
        assert!(stripped.contains("int x;"));
    }

    #[test]
    fn escaped_quote_inside_string() {
        let text = r#"s = "a\"b"; /* drop */ t;"#;
        let stripped = strip_comments(text).unwrap();
        assert!(stripped.contains(r#""a\"b""#));
        assert!(!stripped.contains("drop"));
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = strip_comments("code /* never closed").unwrap_err();
        assert_eq!(err, ScanError::UnterminatedComment { offset: 5 });
    }
}
