//! Finds helper registration call sites in script text.
//!
//! Two shapes are recognized:
//!
//! - scoped: `Owner.<template>.helpers({ ... })`
//! - global: `Owner.registerHelper(<name>, <function>)`
//!
//! Matching is anchored on the whole dotted shape: the owner token may not be
//! the tail of a longer member chain, so `a.b.c.helpers(...)` and
//! `x.helpers(...)` are not call sites. Matches that begin inside a comment or
//! string literal are ignored.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::helpers::Scope;

use super::scanner::{in_literal, literal_spans, match_delimiter, skip_trivia};

static SCOPED_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:^|[^\w$.])([A-Za-z_$][\w$]*)\s*\.\s*",
        r"([A-Za-z_$][\w$]*)\s*\.\s*helpers\s*\(\s*\{",
    ))
    .expect("scoped call pattern")
});

static GLOBAL_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:^|[^\w$.])([A-Za-z_$][\w$]*)\s*\.\s*registerHelper\s*(\()\s*",
        r#"(?:'([^'\\\n]*)'|"([^"\\\n]*)"|`([^`\\$]*)`|([A-Za-z_$][\w$]*))"#,
        r"\s*,\s*",
    ))
    .expect("global call pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Scoped,
    Global,
}

/// One located registration.
///
/// For scoped calls `arg_start..arg_end` covers the object literal including
/// its braces. For global calls it covers the function argument, trimmed,
/// up to the call's closing parenthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub kind: CallKind,
    pub owner: String,
    pub scope: Scope,
    /// Helper name taken from the literal of a global call.
    pub helper_name: Option<String>,
    /// Offset of the owner token.
    pub start: usize,
    pub arg_start: usize,
    pub arg_end: usize,
}

/// All well-formed call sites in `text`, in source order.
pub fn locate_calls(text: &str) -> Vec<CallSite> {
    let spans = literal_spans(text);
    let mut sites: Vec<CallSite> = Vec::new();

    for caps in SCOPED_CALL.captures_iter(text) {
        let owner = &caps[1];
        let start = caps.get(1).map_or(0, |m| m.start());
        if in_literal(&spans, start) {
            continue;
        }
        if let Some(site) = scoped_site(text, &caps, start) {
            sites.push(site);
        } else {
            debug!(offset = start, owner, scope = &caps[2], "discarding malformed helpers() call");
        }
    }

    for caps in GLOBAL_CALL.captures_iter(text) {
        let start = caps.get(1).map_or(0, |m| m.start());
        if in_literal(&spans, start) {
            continue;
        }
        if let Some(site) = global_site(text, &caps, start) {
            sites.push(site);
        } else {
            debug!(offset = start, owner = &caps[1], "discarding malformed registerHelper() call");
        }
    }

    sites.sort_by_key(|s| s.start);
    sites
}

fn scoped_site(text: &str, caps: &Captures<'_>, start: usize) -> Option<CallSite> {
    let whole = caps.get(0)?;
    let brace = whole.end() - 1;
    let arg_end = match_delimiter(text, brace)?;

    // The object must be the whole argument list.
    let after = skip_trivia(text, arg_end, text.len());
    if text.as_bytes().get(after) != Some(&b')') {
        return None;
    }

    Some(CallSite {
        kind: CallKind::Scoped,
        owner: caps[1].to_string(),
        scope: Scope::template(&caps[2]),
        helper_name: None,
        start,
        arg_start: brace,
        arg_end,
    })
}

fn global_site(text: &str, caps: &Captures<'_>, start: usize) -> Option<CallSite> {
    let name = (3..=6).find_map(|i| caps.get(i))?.as_str();
    if name.is_empty() {
        return None;
    }

    let paren = caps.get(2)?.start();
    let call_end = match_delimiter(text, paren)?;
    let arg_start = caps.get(0)?.end();
    let close = call_end - 1;
    if arg_start > close {
        return None;
    }

    let arg = text[arg_start..close].trim_end();
    let arg = arg.strip_suffix(',').map_or(arg, str::trim_end);
    if arg.is_empty() {
        return None;
    }

    Some(CallSite {
        kind: CallKind::Global,
        owner: caps[1].to_string(),
        scope: Scope::Global,
        helper_name: Some(name.to_string()),
        start,
        arg_start,
        arg_end: arg_start + arg.len(),
    })
}
