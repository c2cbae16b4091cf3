//! Walking a project tree into a [`HelperIndex`].

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{bail, Result};
use ignore::gitignore::Gitignore;
use ignore::{Match, WalkBuilder};
use tracing::{debug, info, warn};

use crate::index::{HelperIndex, UpdateOutcome};

pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs"];

/// Directories never descended into, ignore files or not.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".meteor"];

const IGNORE_FILES: &[&str] = &[".gitignore", ".ignore"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub extensions: Vec<String>,
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }
}

impl ScanOptions {
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Whether `path` is a script file this scan should index.
    pub fn matches(&self, path: &Path) -> bool {
        if path.components().any(|c| SKIPPED_DIRS.iter().any(|d| c.as_os_str() == *d)) {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// The rules [`scan_project`] walks by, applied to one path at a time.
///
/// Used for paths reported by the file watcher, which sees every change under
/// the root including ignored and hidden ones. Ignore files are read once, at
/// construction.
#[derive(Debug, Clone)]
pub struct ProjectFilter {
    root: PathBuf,
    options: ScanOptions,
    /// One matcher per ignore file, parents before children.
    ignores: Vec<Gitignore>,
}

impl ProjectFilter {
    pub fn new(root: &Path, options: ScanOptions) -> Self {
        let include_hidden = options.include_hidden;
        // Ignore files are hidden themselves, so hidden entries are let
        // through here and hidden directories are pruned by hand.
        let walker = project_walker(root, &options)
            .hidden(false)
            .filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                entry.depth() == 0
                    || !(SKIPPED_DIRS.contains(&&*name)
                        || (is_dir && !include_hidden && name.starts_with('.')))
            })
            .build();

        let mut ignores = Vec::new();
        for entry in walker.flatten() {
            let is_ignore_file = entry
                .file_name()
                .to_str()
                .is_some_and(|name| IGNORE_FILES.contains(&name));
            if !is_ignore_file || !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let (matcher, err) = Gitignore::new(entry.path());
            if let Some(err) = err {
                warn!(path = %entry.path().display(), error = %err, "bad pattern in ignore file");
            }
            debug!(
                path = %entry.path().display(),
                patterns = matcher.num_ignores(),
                "loaded ignore file"
            );
            ignores.push(matcher);
        }

        Self {
            root: root.to_path_buf(),
            options,
            ignores,
        }
    }

    /// Whether a scan of the root would index `path`.
    pub fn includes(&self, path: &Path) -> bool {
        if !self.options.matches(path) {
            return false;
        }
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        let hidden = relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
        if hidden && !self.options.include_hidden {
            return false;
        }

        // The deepest ignore file with an opinion decides.
        for matcher in self.ignores.iter().rev() {
            if !path.starts_with(matcher.path()) {
                continue;
            }
            match matcher.matched_path_or_any_parents(path, false) {
                Match::Ignore(_) => return false,
                Match::Whitelist(_) => return true,
                Match::None => {}
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files_indexed: usize,
    pub files_unchanged: usize,
    pub files_with_helpers: usize,
    pub helpers: usize,
    pub unreadable: Vec<PathBuf>,
}

/// Index every matching file under `root`.
///
/// Honours `.gitignore`/`.ignore` files. A file that cannot be read is
/// logged and skipped; whatever the index held for it stays.
pub fn scan_project(
    root: &Path,
    options: &ScanOptions,
    index: &mut HelperIndex,
) -> Result<ScanSummary> {
    if !root.is_dir() {
        bail!("project root {} is not a directory", root.display());
    }

    let walker = project_walker(root, options)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map_or(true, |name| !SKIPPED_DIRS.contains(&name))
        })
        .build();

    let mut summary = ScanSummary::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) || !options.matches(entry.path()) {
            continue;
        }

        let path = entry.path();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read source file");
                summary.unreadable.push(path.to_path_buf());
                continue;
            }
        };

        let outcome = index.update(path, &text);
        match outcome {
            UpdateOutcome::Unchanged { .. } => summary.files_unchanged += 1,
            UpdateOutcome::Replaced { .. } => summary.files_indexed += 1,
        }
        if outcome.helpers() > 0 {
            debug!(path = %path.display(), helpers = outcome.helpers(), "indexed");
            summary.files_with_helpers += 1;
            summary.helpers += outcome.helpers();
        }
    }

    info!(
        root = %root.display(),
        files = summary.files_indexed + summary.files_unchanged,
        helpers = summary.helpers,
        "scan complete"
    );
    Ok(summary)
}

fn project_walker(root: &Path, options: &ScanOptions) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);
    builder.hidden(!options.include_hidden).require_git(false);
    builder
}
