//! Helper extraction from a located call site's argument.
//!
//! For the object-literal form, each member is tried against these shapes in
//! order, and the first that fits consumes the whole member:
//!
//! | Shape                          | Syntax                  |
//! |--------------------------------|-------------------------|
//! | `name(params) { ... }`         | [`MemberSyntax::Method`] |
//! | `name: function(params) {...}` | [`MemberSyntax::FunctionExpr`] |
//! | `name: (params) => ...`        | [`MemberSyntax::Arrow`] |
//! | `name: param => ...`           | [`MemberSyntax::SingleParamArrow`] |
//!
//! `async`, generator `*` and `<T>` type parameters are accepted in front of
//! the parameter list. Keys may be identifiers or quoted strings. Members that
//! fit none of the shapes (plain values, getters, spreads) are skipped up to the
//! next top-level comma.
//!
//! When a name occurs twice in one object literal, the first occurrence is kept.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::helpers::{HelperMeta, MemberSyntax};

use super::jsdoc::preceding_doc;
use super::locator::CallSite;
use super::scanner::{literal_end, match_delimiter, skip_expression, skip_trivia};

const KEY: &str = r#"[A-Za-z_$][\w$]*|'[^'\\\n]*'|"[^"\\\n]*""#;
const TYPE_PARAMS: &str = r"(?:<[^>(]*>\s*)?";

static METHOD_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?:async\s+)?(?:\*\s*)?({KEY})\s*{TYPE_PARAMS}\("))
        .expect("method pattern")
});

static KEYED_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^({KEY})\s*:\s*")).expect("keyed member pattern"));

static FUNCTION_EXPR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:async\s+)?function\b\s*(?:\*\s*)?(?:[A-Za-z_$][\w$]*\s*)?{TYPE_PARAMS}\("
    ))
    .expect("function expression pattern")
});

static ARROW_EXPR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^(?:async\s+)?{TYPE_PARAMS}\(")).expect("arrow pattern"));

static SINGLE_PARAM_ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:async\s+)?([A-Za-z_$][\w$]*)\s*=>").expect("single parameter arrow pattern")
});

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$]*(?:\s*\.\s*[A-Za-z_$][\w$]*)*$").expect("reference pattern")
});

/// A callable value: parameter list, optional return type, and body.
struct Callable {
    syntax: MemberSyntax,
    parameters: Option<String>,
    return_type: Option<String>,
    end: usize,
}

/// Helpers bound in the object literal at `arg_start..arg_end` (braces
/// included), in source order.
pub fn extract_helpers(text: &str, arg_start: usize, arg_end: usize) -> Vec<HelperMeta> {
    let body_start = arg_start + 1;
    let body_end = arg_end.saturating_sub(1).max(body_start).min(text.len());
    let mut helpers: Vec<HelperMeta> = Vec::new();
    let mut pos = body_start;

    while pos < body_end {
        pos = skip_separators(text, pos, body_end);
        if pos >= body_end {
            break;
        }

        match parse_member(text, pos, body_end) {
            Some((name, callable)) => {
                if helpers.iter().any(|h| h.name == name) {
                    trace!(
                        name = %name,
                        offset = pos,
                        "duplicate helper, keeping first definition"
                    );
                } else {
                    helpers.push(HelperMeta {
                        jsdoc: preceding_doc(text, pos, body_start),
                        name,
                        syntax: callable.syntax,
                        parameters: callable.parameters,
                        return_type: callable.return_type,
                        range: pos..callable.end,
                    });
                }
                pos = advance(text, pos, callable.end);
            }
            None => {
                let stop = skip_expression(text, pos, body_end);
                trace!(
                    offset = pos,
                    member = %text[pos..stop].trim(),
                    "skipping unrecognized member"
                );
                pos = advance(text, pos, stop);
            }
        }
    }

    helpers
}

/// The single helper registered by a global call site.
pub fn extract_global(text: &str, site: &CallSite) -> Option<HelperMeta> {
    let name = site.helper_name.clone()?;
    let jsdoc = preceding_doc(text, site.start, 0);
    let arg_end = site.arg_end.min(text.len());
    let arg = text.get(site.arg_start..arg_end)?;

    if let Some(callable) = parse_callable(text, site.arg_start, arg_end) {
        return Some(HelperMeta {
            name,
            syntax: callable.syntax,
            parameters: callable.parameters,
            return_type: callable.return_type,
            jsdoc,
            range: site.start..callable.end,
        });
    }

    if REFERENCE.is_match(arg.trim()) {
        return Some(HelperMeta {
            name,
            syntax: MemberSyntax::Reference,
            parameters: None,
            return_type: None,
            jsdoc,
            range: site.start..arg_end,
        });
    }

    trace!(name = %name, offset = site.start, "unrecognized registerHelper argument");
    None
}

fn parse_member(text: &str, pos: usize, end: usize) -> Option<(String, Callable)> {
    let rest = &text[pos..end];

    let (name, callable) = if let Some(caps) = METHOD_HEAD.captures(rest) {
        let head = caps.get(0)?;
        let paren = pos + head.end() - 1;
        (unquote(&caps[1]), parse_block_body(text, paren, end, MemberSyntax::Method)?)
    } else {
        let caps = KEYED_HEAD.captures(rest)?;
        let value = pos + caps.get(0)?.end();
        (unquote(&caps[1]), parse_callable(text, value, end)?)
    };

    // `''` and `""` keys are legal JavaScript but cannot be invoked from a
    // template.
    if name.is_empty() {
        return None;
    }
    Some((name, callable))
}

/// Function expression, parenthesized arrow, or single-parameter arrow
/// starting at `pos`.
fn parse_callable(text: &str, pos: usize, end: usize) -> Option<Callable> {
    let rest = &text[pos..end];

    if let Some(head) = FUNCTION_EXPR.find(rest) {
        let paren = pos + head.end() - 1;
        return parse_block_body(text, paren, end, MemberSyntax::FunctionExpr);
    }

    if let Some(head) = ARROW_EXPR.find(rest) {
        let paren = pos + head.end() - 1;
        let close = match_delimiter(text, paren).filter(|&c| c <= end)?;
        let (return_type, arrow) = scan_return_type(text, close, end, true)?;
        if !text[arrow..].starts_with("=>") {
            return None;
        }
        return Some(Callable {
            syntax: MemberSyntax::Arrow,
            parameters: clean_params(&text[paren + 1..close - 1]),
            return_type,
            end: arrow_body_end(text, arrow + 2, end),
        });
    }

    if let Some(caps) = SINGLE_PARAM_ARROW.captures(rest) {
        let arrow_end = pos + caps.get(0)?.end();
        return Some(Callable {
            syntax: MemberSyntax::SingleParamArrow,
            parameters: clean_params(&caps[1]),
            return_type: None,
            end: arrow_body_end(text, arrow_end, end),
        });
    }

    None
}

/// Parameter list at `paren`, optional return type, then a `{ ... }` body.
fn parse_block_body(
    text: &str,
    paren: usize,
    end: usize,
    syntax: MemberSyntax,
) -> Option<Callable> {
    let close = match_delimiter(text, paren).filter(|&c| c <= end)?;
    let (return_type, body) = scan_return_type(text, close, end, false)?;
    if text.as_bytes().get(body) != Some(&b'{') {
        return None;
    }
    let body_end = match_delimiter(text, body).filter(|&c| c <= end)?;

    Some(Callable {
        syntax,
        parameters: clean_params(&text[paren + 1..close - 1]),
        return_type,
        end: body_end,
    })
}

/// From just past a parameter list, read an optional `: Type` annotation.
///
/// Returns the annotation and the offset where the body begins: the `{` of a
/// block body, or the `=>` of an arrow when `arrow` is set.
fn scan_return_type(
    text: &str,
    from: usize,
    end: usize,
    arrow: bool,
) -> Option<(Option<String>, usize)> {
    let bytes = text.as_bytes();
    let i = skip_trivia(text, from, end);
    if bytes.get(i) != Some(&b':') {
        return Some((None, i));
    }

    let type_start = i + 1;
    let mut i = type_start;
    let mut angle = 0usize;

    while i < end {
        match bytes[i] {
            b'=' if bytes.get(i + 1) == Some(&b'>') => {
                if arrow && angle == 0 {
                    return Some((clean_type(&text[type_start..i]), i));
                }
                // Function type such as `() => void`.
                i += 2;
            }
            b'<' => {
                angle += 1;
                i += 1;
            }
            b'>' => {
                angle = angle.saturating_sub(1);
                i += 1;
            }
            b'(' | b'[' => i = match_delimiter(text, i)?,
            b'{' => {
                let so_far = text[type_start..i].trim_end();
                let is_type_literal = angle > 0
                    || so_far.is_empty()
                    || so_far.ends_with(&['|', '&', '<', ',', ':'][..]);
                if !is_type_literal && !arrow {
                    return Some((clean_type(so_far), i));
                }
                i = match_delimiter(text, i)?;
            }
            b'\'' | b'"' | b'`' => i = literal_end(text, i).unwrap_or(i + 1),
            b',' | b';' | b'}' | b')' if angle == 0 => return None,
            _ => i += 1,
        }
    }

    None
}

/// End of an arrow body starting after `=>`: a block, or an expression up to
/// the next top-level comma.
fn arrow_body_end(text: &str, from: usize, end: usize) -> usize {
    let start = skip_trivia(text, from, end);
    if text.as_bytes().get(start) == Some(&b'{') {
        if let Some(close) = match_delimiter(text, start).filter(|&c| c <= end) {
            let next = skip_trivia(text, close, end);
            // A block followed by more expression (`=> {...}.x`) is not a body.
            if next >= end || text.as_bytes()[next] == b',' {
                return close;
            }
        }
    }
    let stop = skip_expression(text, start, end);
    start + text[start..stop].trim_end().len()
}

fn skip_separators(text: &str, from: usize, end: usize) -> usize {
    let mut i = from;
    loop {
        i = skip_trivia(text, i, end);
        if i < end && text.as_bytes()[i] == b',' {
            i += 1;
        } else {
            return i;
        }
    }
}

/// Move to `to`, or to the next char boundary when `to` would not advance.
fn advance(text: &str, from: usize, to: usize) -> usize {
    if to > from {
        return to;
    }
    from + text[from..].chars().next().map_or(1, char::len_utf8)
}

fn unquote(key: &str) -> String {
    key.trim_matches(|c| c == '\'' || c == '"').to_string()
}

fn clean_params(raw: &str) -> Option<String> {
    let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = joined.trim_end_matches(',').trim_end();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn clean_type(raw: &str) -> Option<String> {
    let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}
