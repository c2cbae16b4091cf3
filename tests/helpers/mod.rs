#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use helperdoc::helpers::{HelperMeta, HelperRecord, MemberSyntax, Scope};
use tempfile::TempDir;

/// Root of the checked-in fixture project.
pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/project")
}

pub fn fixture(relative: &str) -> (PathBuf, String) {
    let path = fixture_root().join(relative);
    let text = fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    (path, text)
}

/// Create a record with only a name and scope filled in.
pub fn record(name: &str, scope: Scope) -> HelperRecord {
    let meta = HelperMeta {
        name: name.to_string(),
        syntax: MemberSyntax::Method,
        parameters: None,
        return_type: None,
        jsdoc: None,
        range: 0..name.len(),
    };
    HelperRecord::from_meta(meta, scope, Path::new("/test/project/client/helpers.ts"))
}

/// A temporary project laid out from `(relative path, contents)` pairs.
pub fn temp_project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, contents) in files {
        write_file(dir.path(), relative, contents);
    }
    dir
}

pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// `(scope, name)` pairs of `records`, in order.
pub fn scoped_names<'a>(
    records: impl IntoIterator<Item = &'a HelperRecord>,
) -> Vec<(String, String)> {
    records
        .into_iter()
        .map(|r| (r.scope.to_string(), r.name.clone()))
        .collect()
}
