//! Cursor requests against template documents.
//!
//! A request carries the document text and a byte offset. The word under the
//! cursor is resolved in the scope of the enclosing `<template name="...">`
//! block, falling back to global helpers.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::helpers::ByteRange;
use crate::index::HelperIndex;
use crate::parser::scanner::is_ident_byte;
use crate::position::LineIndex;
use crate::render::{render, render_completion, CompletionEntry, DocFragment};

static TEMPLATE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<template\s+name\s*=\s*["']([^"']+)["'][^>]*>"#).expect("template tag pattern")
});

const TEMPLATE_CLOSE: &str = "</template>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordAtCursor<'a> {
    pub word: &'a str,
    pub range: ByteRange,
}

/// The identifier touching `offset`, including one that ends right at it.
pub fn word_at(text: &str, offset: usize) -> Option<WordAtCursor<'_>> {
    let bytes = text.as_bytes();
    let offset = offset.min(bytes.len());

    let mut start = offset;
    while start > 0 && is_ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }

    if start == end || bytes[start].is_ascii_digit() {
        return None;
    }
    // Non-ASCII bytes are all identifier bytes, so both ends sit on char
    // boundaries; `get` keeps that from ever panicking.
    let word = text.get(start..end)?;
    Some(WordAtCursor { word, range: start..end })
}

/// Name of the template block containing `offset`, if any.
pub fn enclosing_template(text: &str, offset: usize) -> Option<&str> {
    let offset = offset.min(text.len());
    let open = TEMPLATE_OPEN
        .captures_iter(text)
        .take_while(|caps| caps.get(0).is_some_and(|m| m.end() <= offset))
        .last()?;
    let tag_end = open.get(0)?.end();
    if text.get(tag_end..offset)?.contains(TEMPLATE_CLOSE) {
        return None;
    }
    open.get(1).map(|m| m.as_str())
}

/// Documentation for the helper under the cursor.
pub fn hover(index: &HelperIndex, text: &str, offset: usize) -> Option<DocFragment> {
    let cursor = word_at(text, offset)?;
    let template = enclosing_template(text, offset);
    let Some(record) = index.resolve(cursor.word, template) else {
        trace!(word = cursor.word, template, "no helper under cursor");
        return None;
    };
    let lines = LineIndex::new(text);
    Some(render(record, cursor.word, cursor.range).with_positions(&lines))
}

/// Completion entries for the helpers visible at `offset` whose names start
/// with the part of the word before the cursor.
pub fn completions(index: &HelperIndex, text: &str, offset: usize) -> Vec<CompletionEntry> {
    let offset = offset.min(text.len());
    let prefix = word_at(text, offset)
        .and_then(|w| text.get(w.range.start..offset))
        .unwrap_or("");
    let template = enclosing_template(text, offset);

    index
        .helpers_in_scope(template)
        .into_iter()
        .filter(|r| r.name.starts_with(prefix))
        .map(render_completion)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Scope;

    const DOC: &str = "<template name=\"list\">\n  {{count}} {{pad 3}}\n</template>\n\
                       <template name='other'>\n  {{count}}\n</template>\n{{count}}";

    fn index() -> HelperIndex {
        let mut index = HelperIndex::new();
        index.update(
            "/w/client/list.ts",
            "Template.list.helpers({\n  /** Items shown. */\n  \
             count(): number { return 1; },\n  pad(num: number) {}\n});",
        );
        index.update(
            "/w/client/globals.js",
            "Template.registerHelper('count', () => 0);\n\
             Template.registerHelper('eq', (a, b) => a === b);",
        );
        index
    }

    #[test]
    fn word_under_and_after_cursor() {
        let text = "{{pad num}}";
        let w = word_at(text, 3).unwrap();
        assert_eq!(w.word, "pad");
        assert_eq!(w.range, 2..5);
        assert_eq!(word_at(text, 5).unwrap().word, "pad");
        assert_eq!(word_at(text, 0), None);
        assert_eq!(word_at("{{ 12 }}", 3), None);
        assert_eq!(word_at("", 10), None);
    }

    #[test]
    fn word_with_multibyte_identifier() {
        let text = "{{größe}}";
        let w = word_at(text, 4).unwrap();
        assert_eq!(w.word, "größe");
    }

    #[test]
    fn template_blocks() {
        let in_list = DOC.find("{{pad").unwrap();
        assert_eq!(enclosing_template(DOC, in_list), Some("list"));
        let in_other = DOC.rfind("  {{count}}").unwrap();
        assert_eq!(enclosing_template(DOC, in_other), Some("other"));
        assert_eq!(enclosing_template(DOC, DOC.len() - 3), None);
        assert_eq!(enclosing_template(DOC, 0), None);
    }

    #[test]
    fn hover_prefers_template_scope() {
        let index = index();
        let offset = DOC.find("{{count").unwrap() + 3;
        let fragment = hover(&index, DOC, offset).unwrap();
        assert!(fragment.contents.value.starts_with("**count** - Template Helper of `list`"));
        assert!(fragment.contents.value.contains("Items shown."));
        let range = fragment.range.unwrap();
        assert_eq!((range.start.line, range.start.character), (1, 4));
        assert_eq!((range.end.line, range.end.character), (1, 9));
    }

    #[test]
    fn hover_falls_back_to_global() {
        let index = index();
        let offset = DOC.len() - 4;
        let fragment = hover(&index, DOC, offset).unwrap();
        assert!(fragment.contents.value.starts_with("**count** - Global Template Helper"));
        assert!(fragment.contents.value.contains("*Defined in `globals.js`*"));
    }

    #[test]
    fn hover_miss() {
        let index = index();
        assert_eq!(hover(&index, "{{nothing}}", 4), None);
        assert_eq!(hover(&HelperIndex::new(), DOC, 30), None);
    }

    #[test]
    fn completion_lists_scope_then_globals() {
        let index = index();
        let text = "<template name=\"list\">{{</template>";
        let offset = text.find("</").unwrap();
        let labels: Vec<String> = completions(&index, text, offset)
            .into_iter()
            .map(|e| e.label)
            .collect();
        assert_eq!(labels, vec!["count", "pad", "eq"]);
    }

    #[test]
    fn completion_filters_by_prefix() {
        let index = index();
        let text = "{{co";
        let entries = completions(&index, text, text.len());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "count");
        assert!(entries[0].documentation.value.contains("Global Template Helper"));
        assert_eq!(index.resolve("count", None).map(|r| &r.scope), Some(&Scope::Global));
    }
}
