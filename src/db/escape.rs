//! Identifier quoting and string escaping.

/// Quote an identifier (table, column, alias) for use in SQL text.
///
/// Embedded double quotes are doubled, per the SQL standard.
pub fn quote_identifier(identifier: &str) -> String {
    let mut result = String::with_capacity(identifier.len() + 2);
    result.push('"');
    for c in identifier.chars() {
        if c == '"' {
            result.push('"');
        }
        result.push(c);
    }
    result.push('"');
    result
}

/// Escape a string for display inside a quoted literal.
///
/// # Arguments
/// * `s` - The string to escape
/// * `quote_char` - The quote character to escape ('"' for double-quoted, '\'' for single-quoted)
pub fn escape_string_for_quote(s: &str, quote_char: char) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            c if c == quote_char => {
                result.push('\\');
                result.push(c);
            }
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

/// Escape a string for display inside double quotes.
#[inline]
pub fn escape_string(s: &str) -> String {
    escape_string_for_quote(s, '"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("persons", "\"persons\"")]
    #[case("weird\"name", "\"weird\"\"name\"")]
    #[case("", "\"\"")]
    #[case("with space", "\"with space\"")]
    fn test_quote_identifier(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote_identifier(input), expected);
    }

    #[rstest]
    fn test_escape_string_basic() {
        assert_eq!(escape_string("hello"), "hello");
    }

    #[rstest]
    fn test_escape_string_with_quotes() {
        assert_eq!(escape_string(r#"say "hello""#), r#"say \"hello\""#);
    }

    #[rstest]
    fn test_escape_string_control_characters() {
        assert_eq!(escape_string("a\nb\u{1}"), "a\\nb\\u0001");
    }

    #[rstest]
    fn test_escape_single_quote_mode_leaves_double_quotes() {
        assert_eq!(escape_string_for_quote(r#"it's "x""#, '\''), r#"it\'s "x""#);
    }
}
