//! Helper extraction from script source text.
//!
//! [`extract_file`] is one full pass over a file: the [`locator`] finds the
//! registration calls, the [`extractor`] reads the helpers out of each, and the
//! result is a fresh [`FileIndexEntry`].
//!
//! Within one object literal the first definition of a name wins. Across call
//! sites for the same scope in one file the later call site wins, matching the
//! order the registrations run in.

pub mod extractor;
pub mod jsdoc;
pub mod locator;
pub mod scanner;

use std::path::Path;

use tracing::debug;

use crate::helpers::hash::content_hash;
use crate::helpers::{FileIndexEntry, HelperRecord};

use self::locator::{locate_calls, CallKind};

/// Run the locator and extractor over the whole of `text`.
pub fn extract_file(path: &Path, text: &str) -> FileIndexEntry {
    let mut helpers: Vec<HelperRecord> = Vec::new();

    for site in locate_calls(text) {
        let metas = match site.kind {
            CallKind::Scoped => extractor::extract_helpers(text, site.arg_start, site.arg_end),
            CallKind::Global => extractor::extract_global(text, &site).into_iter().collect(),
        };

        for meta in metas {
            let record = HelperRecord::from_meta(meta, site.scope.clone(), path);
            if let Some(prev) = helpers
                .iter()
                .position(|h| h.name == record.name && h.scope == record.scope)
            {
                debug!(
                    helper = %record.name,
                    scope = %record.scope,
                    "helper registered again by a later call, replacing"
                );
                helpers.remove(prev);
            }
            helpers.push(record);
        }
    }

    FileIndexEntry {
        file_path: path.to_path_buf(),
        content_hash: content_hash(text),
        helpers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{MemberSyntax, Scope};

    fn extract(source: &str) -> FileIndexEntry {
        extract_file(Path::new("/w/client/test.ts"), source)
    }

    fn names(entry: &FileIndexEntry) -> Vec<(String, String)> {
        entry
            .helpers
            .iter()
            .map(|h| (h.scope.to_string(), h.name.clone()))
            .collect()
    }

    #[test]
    fn scoped_and_global_in_one_file() {
        let entry = extract(
            "Template.list.helpers({ items() { return []; } });\n\
             Template.registerHelper('eq', (a, b) => a === b);",
        );
        assert_eq!(
            names(&entry),
            vec![
                ("list".to_string(), "items".to_string()),
                ("<global>".to_string(), "eq".to_string()),
            ]
        );
        assert_eq!(entry.helpers[1].scope, Scope::Global);
        assert_eq!(entry.helpers[1].syntax, MemberSyntax::Arrow);
    }

    #[test]
    fn later_call_site_replaces_same_scope_and_name() {
        let entry = extract(
            "Template.a.helpers({ x() { return 1; }, y() {} });\n\
             Template.a.helpers({ x: (n: number) => n });\n\
             Template.b.helpers({ x() {} });",
        );
        assert_eq!(entry.total_helpers(), 3);
        let x = entry.find("x", &Scope::template("a")).unwrap();
        assert_eq!(x.syntax, MemberSyntax::Arrow);
        assert_eq!(x.parameters.as_deref(), Some("n: number"));
        assert!(entry.find("x", &Scope::template("b")).is_some());
    }

    #[test]
    fn records_carry_path_and_ranges() {
        let source = "Template.t.helpers({ one() {} });";
        let entry = extract(source);
        let one = &entry.helpers[0];
        assert_eq!(one.file_path, Path::new("/w/client/test.ts"));
        assert_eq!(&source[one.source_range.clone()], "one() {}");
    }

    #[test]
    fn no_registrations_yield_empty_entry() {
        let entry = extract("export const helpers = { a() {} };");
        assert_eq!(entry.total_helpers(), 0);
        assert_ne!(entry.content_hash, [0u8; 32]);
    }
}
