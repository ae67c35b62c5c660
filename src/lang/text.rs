//! Scanning helpers shared by the statement splitter and the expression
//! compiler. Everything here works on raw source text and understands the
//! language's quoting rule: text literals open with `'` or `"` and a doubled
//! quote inside a literal stands for one literal quote character.

pub fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

/// Case folding for identifiers, keywords and text-index keys.
pub fn fold(s: &str) -> String {
    s.to_uppercase()
}

/// Characters that terminate an identifier. A variable name containing any
/// of these is rejected with INCORRECT NAME.
pub fn is_delim(c: char) -> bool {
    is_space(c)
        || is_quote(c)
        || matches!(
            c,
            '&' | '(' | ')' | '[' | ']' | '{' | '}' | '=' | '!' | '<' | '>' | '+' | '-' | '*'
                | '/' | ',' | ':' | '$' | '\r' | '\n'
        )
}

/// A variable name must be a non-empty identifier that does not start with
/// a digit. The leading `$` text marker is expected to be stripped already.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => return false,
        Some(c) if c.is_ascii_digit() => return false,
        Some(c) if is_delim(c) => return false,
        Some(_) => {}
    }
    !name.chars().any(is_delim)
}

/// Advances past a quoted literal. `start` is the byte index of the opening
/// quote; the return value is the byte index just past the closing quote, or
/// `None` if the literal never closes.
pub fn skip_quoted(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if i + 1 < bytes.len() && bytes[i + 1] == quote {
                i += 2; // doubled quote stays inside the literal
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Finds the first byte index of `delim` at nesting depth zero, outside any
/// quoted literal. Depth counts `(`, `[` and `{`.
pub fn find_top_level(s: &str, delim: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    let bytes = s.as_bytes();
    while i < bytes.len() {
        let c = bytes[i] as char;
        if is_quote(c) {
            match skip_quoted(s, i) {
                Some(next) => i = next,
                None => return None,
            }
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {
                if depth == 0 && c == delim {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

/// Splits a line into statements on `delim` at nesting depth zero. Quoted
/// literals and bracketed groups are never split.
pub fn split_top_level(s: &str, delim: char) -> Vec<&str> {
    let mut parts = vec![];
    let mut rest = s;
    let mut base = 0;
    while let Some(at) = find_top_level(rest, delim) {
        parts.push(&s[base..base + at]);
        base += at + delim.len_utf8();
        rest = &s[base..];
    }
    parts.push(&s[base..]);
    parts
}

/// Locates the first `<<expr>>` span in a description template. Returns the
/// byte range covering the markers; the inner expression may itself contain
/// nested spans and quoted text.
pub fn subexpr_span(s: &str) -> Option<(usize, usize)> {
    let start = s.find("<<")?;
    let mut depth = 1usize;
    let mut i = start + 2;
    let bytes = s.as_bytes();
    while i < bytes.len() {
        let c = bytes[i] as char;
        if is_quote(c) {
            match skip_quoted(s, i) {
                Some(next) => {
                    i = next;
                    continue;
                }
                None => return None,
            }
        }
        if s[i..].starts_with("<<") {
            depth += 1;
            i += 2;
            continue;
        }
        if s[i..].starts_with(">>") {
            depth -= 1;
            if depth == 0 {
                return Some((start, i + 2));
            }
            i += 2;
            continue;
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("X"));
        assert!(is_valid_name("money_total"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("9LIVES"));
        assert!(!is_valid_name("A B"));
        assert!(!is_valid_name("A+B"));
    }

    #[test]
    fn test_skip_quoted_doubling() {
        let s = "'it''s fine' rest";
        assert_eq!(skip_quoted(s, 0), Some(12));
        assert_eq!(skip_quoted("'open", 0), None);
    }

    #[test]
    fn test_split_respects_quotes_and_brackets() {
        let parts = split_top_level("p 'a & b' & x = (1 & 2) & nl", '&');
        assert_eq!(parts, vec!["p 'a & b' ", " x = (1 & 2) ", " nl"]);
    }

    #[test]
    fn test_find_top_level_colon() {
        assert_eq!(find_top_level("act 'go': x = 1", ':'), Some(8));
        assert_eq!(find_top_level("p 'no: colon'", ':'), None);
    }

    #[test]
    fn test_subexpr_span() {
        assert_eq!(subexpr_span("Hello <<1+1>>!"), Some((6, 13)));
        assert_eq!(subexpr_span("a <<b + <<c>> >> d"), Some((2, 16)));
        assert_eq!(subexpr_span("a << '>>' >> d"), Some((2, 12)));
        assert_eq!(subexpr_span("no spans"), None);
    }
}
