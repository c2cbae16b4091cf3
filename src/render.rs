//! Markdown documentation for a single helper.
//!
//! The fragment is built from sections joined by one blank line. A section
//! whose field is absent is left out entirely, separator included:
//!
//! ~~~text
//! **count** - Template Helper of `template2`
//!
//! ```text
//! Number of items.
//! ```
//!
//! **Signature:** `count(): number`
//!
//! **Returns:** `number`
//!
//! **Parameters:** `...`
//!
//! *Defined in `template2.ts`*
//!
//! **Usage:** `{{count}}`
//! ~~~

use serde::Serialize;

use crate::helpers::{ByteRange, HelperRecord, Scope};
use crate::position::{LineIndex, TextRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkupContent {
    pub kind: MarkupKind,
    pub value: String,
}

/// Rendered documentation plus the range of the word it describes.
///
/// `anchor` is in bytes of the document the word came from; `range` is filled
/// in with editor positions by [`DocFragment::with_positions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocFragment {
    pub contents: MarkupContent,
    #[serde(skip)]
    pub anchor: ByteRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
}

impl DocFragment {
    pub fn with_positions(mut self, lines: &LineIndex<'_>) -> Self {
        self.range = Some(lines.range(self.anchor.clone()));
        self
    }
}

/// One completion list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionEntry {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub documentation: MarkupContent,
}

pub fn render(record: &HelperRecord, invocation_word: &str, anchor: ByteRange) -> DocFragment {
    let info = record.info();
    let mut sections: Vec<String> = vec![title(invocation_word, &record.scope)];

    if let Some(doc) = info.jsdoc {
        sections.push(format!("```text\n{doc}\n```"));
    }
    if let Some(signature) = info.signature {
        sections.push(format!("**Signature:** `{signature}`"));
    }
    if let Some(ret) = info.return_type {
        sections.push(format!("**Returns:** `{ret}`"));
    }
    if let Some(params) = info.parameters {
        sections.push(format!("**Parameters:** `{params}`"));
    }
    sections.push(format!("*Defined in `{}`*", info.file_name()));
    sections.push(format!("**Usage:** `{}`", usage_example(&record.name, info.parameters)));

    DocFragment {
        contents: MarkupContent {
            kind: MarkupKind::Markdown,
            value: sections.join("\n\n"),
        },
        anchor,
        range: None,
    }
}

pub fn render_completion(record: &HelperRecord) -> CompletionEntry {
    let fragment = render(record, &record.name, 0..0);
    CompletionEntry {
        label: record.name.clone(),
        detail: record.signature.clone(),
        documentation: fragment.contents,
    }
}

/// `{{name p1 p2 ...}}` for a helper with the given raw parameter text.
pub fn usage_example(name: &str, parameters: Option<&str>) -> String {
    let names = parameters.map(parameter_names).unwrap_or_default();
    if names.is_empty() {
        format!("{{{{{name}}}}}")
    } else {
        format!("{{{{{name} {}}}}}", names.join(" "))
    }
}

/// Parameter names from raw parameter text: split on commas, keep what comes
/// before a `:` annotation or `=` default, drop rest/optional markers.
///
/// Type arguments containing commas (`Map<K, V>`) split wrongly; the result is
/// only a usage hint.
pub fn parameter_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|token| {
            let name = token.split(|c: char| c == ':' || c == '=').next()?.trim();
            let name = name.trim_start_matches("...").trim_end_matches('?').trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

fn title(word: &str, scope: &Scope) -> String {
    match scope {
        Scope::Global => format!("**{word}** - Global Template Helper"),
        Scope::Template(name) => format!("**{word}** - Template Helper of `{name}`"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::helpers::MemberSyntax;

    fn record(scope: Scope) -> HelperRecord {
        HelperRecord {
            name: "pad".to_string(),
            scope,
            syntax: MemberSyntax::Method,
            signature: Some("pad(num: number): string".to_string()),
            parameters: Some("num: number".to_string()),
            return_type: Some("string".to_string()),
            jsdoc: Some("Pads a number.\n\n@param num value".to_string()),
            file_path: PathBuf::from("/home/dev/app/client/template2.ts"),
            source_range: 0..10,
        }
    }

    fn bare(scope: Scope) -> HelperRecord {
        HelperRecord {
            signature: None,
            parameters: None,
            return_type: None,
            jsdoc: None,
            ..record(scope)
        }
    }

    #[test]
    fn full_record_renders_every_section() {
        let fragment = render(&record(Scope::template("template2")), "pad", 5..8);
        let expected = "**pad** - Template Helper of `template2`\n\n\
                        ```text\nPads a number.\n\n@param num value\n```\n\n\
                        **Signature:** `pad(num: number): string`\n\n\
                        **Returns:** `string`\n\n\
                        **Parameters:** `num: number`\n\n\
                        *Defined in `template2.ts`*\n\n\
                        **Usage:** `{{pad num}}`";
        assert_eq!(fragment.contents.value, expected);
        assert_eq!(fragment.contents.kind, MarkupKind::Markdown);
        assert_eq!(fragment.anchor, 5..8);
        assert_eq!(fragment.range, None);
    }

    #[test]
    fn empty_fields_leave_no_placeholders() {
        let fragment = render(&bare(Scope::Global), "pad", 0..3);
        assert_eq!(
            fragment.contents.value,
            "**pad** - Global Template Helper\n\n\
             *Defined in `template2.ts`*\n\n\
             **Usage:** `{{pad}}`"
        );
        assert!(!fragment.contents.value.contains("\n\n\n"));
    }

    #[test]
    fn source_line_never_contains_directories() {
        let fragment = render(&record(Scope::Global), "pad", 0..3);
        assert!(!fragment.contents.value.contains("/home/dev"));
    }

    #[test]
    fn usage_examples() {
        assert_eq!(usage_example("count", None), "{{count}}");
        assert_eq!(usage_example("percentage", Some("a, b")), "{{percentage a b}}");
        assert_eq!(
            usage_example("fmt", Some("date: Date, pattern = 'YYYY', ...rest: string[]")),
            "{{fmt date pattern rest}}"
        );
        assert_eq!(usage_example("opt", Some("x?: number")), "{{opt x}}");
    }

    #[test]
    fn generic_commas_degrade_gracefully() {
        let names = parameter_names("x: Map<string, number>, y: number");
        assert_eq!(names.first().map(String::as_str), Some("x"));
        assert!(names.contains(&"y".to_string()));
        assert_eq!(parameter_names(" , ,"), Vec::<String>::new());
    }

    #[test]
    fn fragment_serializes_in_hover_shape() {
        let text = "{{pad}}";
        let lines = LineIndex::new(text);
        let fragment = render(&bare(Scope::Global), "pad", 2..5).with_positions(&lines);
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json["contents"]["kind"], "markdown");
        assert_eq!(json["range"]["start"]["character"], 2);
        assert_eq!(json["range"]["end"]["character"], 5);
        assert!(json.get("anchor").is_none());
    }

    #[test]
    fn completion_entry() {
        let entry = render_completion(&record(Scope::template("t")));
        assert_eq!(entry.label, "pad");
        assert_eq!(entry.detail.as_deref(), Some("pad(num: number): string"));
        assert!(entry.documentation.value.starts_with("**pad**"));
    }
}
