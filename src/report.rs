//! Helper listings for the `scan` command.
//!
//! A [`HelperReport`] is a flat, path-ordered view of an index; formatters
//! turn it into a terminal table or JSON.

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;

use crate::helpers::{HelperRecord, MemberSyntax, Scope};
use crate::index::HelperIndex;

/// One helper as listed in a report.
#[derive(Debug, Clone, Serialize)]
pub struct HelperRow {
    /// Path relative to the scanned root where possible.
    pub path: String,
    pub scope: Scope,
    pub name: String,
    pub syntax: MemberSyntax,
    pub signature: Option<String>,
    pub documented: bool,
}

impl HelperRow {
    fn from_record(record: &HelperRecord, root: &Path) -> Self {
        let path = record
            .file_path
            .strip_prefix(root)
            .unwrap_or(&record.file_path)
            .to_string_lossy()
            .into_owned();
        Self {
            path,
            scope: record.scope.clone(),
            name: record.name.clone(),
            syntax: record.syntax,
            signature: record.signature.clone(),
            documented: record.jsdoc.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HelperReport {
    pub root: String,
    pub files: usize,
    pub helpers: Vec<HelperRow>,
}

impl HelperReport {
    pub fn from_index(index: &HelperIndex, root: &Path) -> Self {
        Self {
            root: root.to_string_lossy().into_owned(),
            files: index.len(),
            helpers: index.records().map(|r| HelperRow::from_record(r, root)).collect(),
        }
    }

    pub fn global_count(&self) -> usize {
        self.helpers.iter().filter(|h| h.scope.is_global()).count()
    }

    pub fn documented_count(&self) -> usize {
        self.helpers.iter().filter(|h| h.documented).count()
    }
}

/// Output formats for a [`HelperReport`].
pub trait ReportFormatter {
    fn format(&self, report: &HelperReport) -> Result<String>;
}

/// Text table formatter for terminal output.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    /// Minimum width for the path column.
    pub min_path_width: usize,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self { min_path_width: 30 }
    }
}

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &HelperReport) -> Result<String> {
        let mut output = String::new();
        output.push_str(&format!("Template helpers in {}\n", report.root));

        let path_width = report
            .helpers
            .iter()
            .map(|h| h.path.len())
            .max()
            .unwrap_or(0)
            .max(self.min_path_width);
        let scope_width = report
            .helpers
            .iter()
            .map(|h| h.scope.to_string().len())
            .max()
            .unwrap_or(0)
            .max(8);

        let separator = "─".repeat(path_width + scope_width + 50);
        output.push_str(&separator);
        output.push('\n');
        output.push_str(&format!(
            "{:<pw$} {:<sw$} {:<9} {}\n",
            "File",
            "Scope",
            "Kind",
            "Signature",
            pw = path_width,
            sw = scope_width
        ));
        output.push_str(&separator);
        output.push('\n');

        for row in &report.helpers {
            let signature = row.signature.as_deref().unwrap_or(&row.name);
            output.push_str(&format!(
                "{:<pw$} {:<sw$} {:<9} {}\n",
                row.path,
                row.scope.to_string(),
                row.syntax.to_string(),
                signature,
                pw = path_width,
                sw = scope_width
            ));
        }

        output.push_str(&separator);
        output.push('\n');
        output.push_str(&format!(
            "TOTAL {} helpers ({} global, {} documented) in {} files\n",
            report.helpers.len(),
            report.global_count(),
            report.documented_count(),
            report.files
        ));

        Ok(output)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &HelperReport) -> Result<String> {
        serde_json::to_string_pretty(report).wrap_err("failed to serialize helper report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> HelperReport {
        let mut index = HelperIndex::new();
        index.update(
            "/proj/client/list.ts",
            "Template.list.helpers({ /** n */ count(): number { return 1; } });",
        );
        index.update("/proj/lib/globals.js", "Template.registerHelper('eq', (a, b) => a === b);");
        HelperReport::from_index(&index, Path::new("/proj"))
    }

    #[test]
    fn rows_use_relative_paths() {
        let report = report();
        let paths: Vec<&str> = report.helpers.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["client/list.ts", "lib/globals.js"]);
        assert_eq!(report.files, 2);
        assert_eq!(report.global_count(), 1);
        assert_eq!(report.documented_count(), 1);
    }

    #[test]
    fn text_table() {
        let text = TextFormatter::default().format(&report()).unwrap();
        assert!(text.starts_with("Template helpers in /proj\n"));
        assert!(text.contains("count(): number"));
        assert!(text.contains("<global>"));
        assert!(text.contains("TOTAL 2 helpers (1 global, 1 documented) in 2 files"));
    }

    #[test]
    fn path_column_fits_shortest_paths() {
        let mut index = HelperIndex::new();
        index.update("/p/a.js", "Template.registerHelper('eq', (a, b) => a === b);");
        let report = HelperReport::from_index(&index, Path::new("/p"));
        let text = TextFormatter { min_path_width: 0 }.format(&report).unwrap();
        assert!(text.contains("\nFile Scope    Kind"), "{text}");
        assert!(text.contains("\na.js <global> "), "{text}");
    }

    #[test]
    fn json_report() {
        let json = JsonFormatter.format(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["helpers"][0]["name"], "count");
        assert_eq!(value["helpers"][0]["scope"]["kind"], "template");
        assert_eq!(value["helpers"][0]["scope"]["name"], "list");
        assert_eq!(value["helpers"][1]["scope"]["kind"], "global");
        assert_eq!(value["helpers"][1]["syntax"], "arrow");
    }
}
