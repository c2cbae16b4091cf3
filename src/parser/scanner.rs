//! Delimiter matching over raw script text.
//!
//! Everything here works on bytes. All the delimiters and literal markers are
//! ASCII, so every offset returned is a char boundary of the input `&str`.
//!
//! Literal spans the scanner steps over:
//!
//! | Span               | Ends at                                        |
//! |--------------------|------------------------------------------------|
//! | `'...'`, `"..."`   | matching quote, or the end of the line          |
//! | `` `...` ``        | matching backtick; `${ ... }` matched recursively |
//! | `// ...`           | end of line                                    |
//! | `/* ... */`        | `*/`                                           |
//! | `/re/flags`        | closing `/` outside a `[...]` class             |
//!
//! A `/` only opens a regular expression where an expression can start
//! (after an operator, an opening delimiter, a comma, a keyword such as
//! `return`, the `)` closing an `if`/`while`/`for`/`with` head, or at the
//! start of the text); elsewhere it is division.

use std::ops::Range;

/// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_PREFIX_KEYWORDS: &[&[u8]] = &[
    b"return", b"typeof", b"instanceof", b"in", b"of", b"new", b"delete", b"void", b"throw",
    b"case", b"do", b"else", b"yield", b"await",
];

/// Statement heads whose closing `)` may be followed by a regex literal.
const CONTROL_HEAD_KEYWORDS: &[&[u8]] = &[b"if", b"while", b"for", b"with"];

/// Offset immediately after the delimiter that closes the one at `open`.
///
/// `open` must point at `{`, `(` or `[`; any other byte yields `None`. Only
/// the delimiter pair found at `open` is counted. Returns `None` when the text
/// ends before depth returns to zero.
pub fn match_delimiter(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (opener, closer) = delimiter_pair(*bytes.get(open)?)?;
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        if let Some(end) = literal_end(text, i) {
            i = end;
            continue;
        }
        let b = bytes[i];
        if b == opener {
            depth += 1;
        } else if b == closer {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
        i += 1;
    }

    None
}

/// Every string, comment and regex literal span in `text`, in order.
pub fn literal_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < text.len() {
        match literal_end(text, i) {
            Some(end) => {
                spans.push(i..end);
                i = end.max(i + 1);
            }
            None => i += 1,
        }
    }
    spans
}

/// Whether `offset` falls inside one of `spans` (as returned by [`literal_spans`]).
pub fn in_literal(spans: &[Range<usize>], offset: usize) -> bool {
    let idx = spans.partition_point(|s| s.end <= offset);
    spans.get(idx).is_some_and(|s| s.start <= offset)
}

/// Advance from `from` to the next top-level `,`, or to an unbalanced closing
/// delimiter, or to `end`. Nested delimiters and literals are stepped over.
pub fn skip_expression(text: &str, from: usize, end: usize) -> usize {
    let bytes = text.as_bytes();
    let end = end.min(bytes.len());
    let mut depth = 0usize;
    let mut i = from;

    while i < end {
        if let Some(lit_end) = literal_end(text, i) {
            i = lit_end;
            continue;
        }
        match bytes[i] {
            b'{' | b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            b',' if depth == 0 => return i,
            _ => {}
        }
        i += 1;
    }

    end
}

/// Skip whitespace and comments starting at `from`, stopping at `end`.
pub fn skip_trivia(text: &str, from: usize, end: usize) -> usize {
    let bytes = text.as_bytes();
    let end = end.min(bytes.len());
    let mut i = from;

    while i < end {
        match bytes[i] {
            b if b.is_ascii_whitespace() => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = block_comment_end(bytes, i),
            _ => break,
        }
    }

    i.min(end)
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn delimiter_pair(b: u8) -> Option<(u8, u8)> {
    match b {
        b'{' => Some((b'{', b'}')),
        b'(' => Some((b'(', b')')),
        b'[' => Some((b'[', b']')),
        _ => None,
    }
}

/// If a literal or comment starts at `i`, the offset just past it.
pub(crate) fn literal_end(text: &str, i: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    match bytes[i] {
        b'\'' | b'"' => Some(quoted_end(bytes, i)),
        b'`' => Some(template_end(text, i)),
        b'/' => match bytes.get(i + 1) {
            Some(b'/') => Some(line_end(bytes, i)),
            Some(b'*') => Some(block_comment_end(bytes, i)),
            _ if regex_allowed(bytes, i) => regex_end(bytes, i),
            _ => None,
        },
        _ => None,
    }
}

fn quoted_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            // Unterminated; end the literal with the line so the rest of the
            // file still scans.
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn template_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => match match_delimiter(text, i + 1) {
                Some(end) => i = end,
                None => return bytes.len(),
            },
            _ => i += 1,
        }
    }
    bytes.len()
}

fn line_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p)
}

fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    let body = start + 2;
    if body >= bytes.len() {
        return bytes.len();
    }
    bytes[body..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| body + p + 2)
}

/// End of a regex literal starting at `start`, or `None` if the line ends
/// first (then it was never a regex).
fn regex_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Some(i);
            }
            _ => i += 1,
        }
    }
    None
}

fn regex_allowed(bytes: &[u8], slash: usize) -> bool {
    let mut j = slash;
    while j > 0 && bytes[j - 1].is_ascii_whitespace() {
        j -= 1;
    }
    if j == 0 {
        return true;
    }

    let prev = bytes[j - 1];
    if is_ident_byte(prev) {
        return REGEX_PREFIX_KEYWORDS.contains(&word_before(bytes, j));
    }
    if prev == b')' {
        // `if (x) /re/` starts a statement; `(a + b) / c` divides.
        return paren_opener(bytes, j - 1).is_some_and(|open| {
            let mut k = open;
            while k > 0 && bytes[k - 1].is_ascii_whitespace() {
                k -= 1;
            }
            CONTROL_HEAD_KEYWORDS.contains(&word_before(bytes, k))
        });
    }

    !matches!(prev, b']' | b'"' | b'\'' | b'`')
}

/// The identifier ending at `end`, possibly empty.
fn word_before(bytes: &[u8], end: usize) -> &[u8] {
    let mut k = end;
    while k > 0 && is_ident_byte(bytes[k - 1]) {
        k -= 1;
    }
    &bytes[k..end]
}

/// Offset of the `(` matching the `)` at `close`, counting parentheses only.
fn paren_opener(bytes: &[u8], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for k in (0..=close).rev() {
        match bytes[k] {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Close offset for the first `{` in `text`.
    fn close_of_first_brace(text: &str) -> Option<usize> {
        let open = text.find('{').expect("no brace in input");
        match_delimiter(text, open)
    }

    #[test]
    fn simple_block() {
        let text = "a { b } c";
        assert_eq!(close_of_first_brace(text), Some(7));
    }

    #[test]
    fn nested_blocks() {
        let text = "{ { {} } { } }";
        assert_eq!(close_of_first_brace(text), Some(text.len()));
    }

    #[test]
    fn brace_in_double_quoted_string() {
        let text = r#"{ return "{"; } tail"#;
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn brace_in_single_quoted_string_with_escape() {
        let text = r"{ x = '\'{'; } tail";
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn brace_in_comments() {
        let text = "{ // }\n /* } { */ } tail";
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn template_literal_with_substitution() {
        let text = "{ s = `a ${ {x: \"}\"}.x } }`; } tail";
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn regex_literal_with_brace() {
        let text = r"{ return /\{+[}]/g.test(s); } tail";
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn regex_after_control_statement_head() {
        let text = r"{ if (s) /}/.test(s); while ((n)) /{/g.exec(s); } tail";
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn division_after_parenthesized_expression() {
        let text = "{ a = (b + c) / 2 + f(x) / 4; } tail";
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn division_is_not_regex() {
        // If `/ 2 ... /` were taken as a regex the inner `}` would be skipped.
        let text = "{ a = b / 2; c = d / 4 } tail";
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn unbalanced_returns_none() {
        assert_eq!(close_of_first_brace("{ { }"), None);
        assert_eq!(close_of_first_brace("{ \"}\" "), None);
        assert_eq!(close_of_first_brace("{ /* } "), None);
    }

    #[test]
    fn parentheses_and_brackets() {
        let text = "f(a, (b), \")\") + 1";
        assert_eq!(match_delimiter(text, 1), Some(text.find(" + 1").unwrap()));
        let text = "[1, [2], ']']";
        assert_eq!(match_delimiter(text, 0), Some(text.len()));
    }

    #[test]
    fn non_delimiter_start() {
        assert_eq!(match_delimiter("abc", 0), None);
        assert_eq!(match_delimiter("abc", 10), None);
    }

    #[test]
    fn multibyte_text() {
        let text = "{ s = 'héllo {'; t = \"ü\" } tail";
        assert_eq!(close_of_first_brace(text), Some(text.find(" tail").unwrap()));
    }

    #[test]
    fn literal_spans_cover_strings_and_comments() {
        let text = "a 'x' b // c\nd /* e */ f";
        let spans = literal_spans(text);
        let covered: Vec<&str> = spans.iter().map(|s| &text[s.clone()]).collect();
        assert_eq!(covered, vec!["'x'", "// c", "/* e */"]);
        assert!(in_literal(&spans, text.find('x').unwrap()));
        assert!(!in_literal(&spans, text.find('b').unwrap()));
        assert!(in_literal(&spans, text.find('e').unwrap()));
    }

    #[test]
    fn skip_expression_stops_at_top_level_comma() {
        let text = "a(1, 2), next";
        assert_eq!(skip_expression(text, 0, text.len()), 7);
        let text = "{ a: 1, b: 2 }, next";
        assert_eq!(skip_expression(text, 0, text.len()), text.find(", next").unwrap());
        let text = "x => x + ',' }";
        assert_eq!(skip_expression(text, 0, text.len()), text.len() - 1);
    }

    #[test]
    fn skip_trivia_skips_comments() {
        let text = "  /* a */ // b\n  )";
        assert_eq!(skip_trivia(text, 0, text.len()), text.len() - 1);
    }
}
