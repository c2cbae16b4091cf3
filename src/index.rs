//! Per-file cache of extracted helpers.
//!
//! The index maps a normalized absolute path to the entry produced by that
//! file's most recent extraction. Entries are replaced whole; nothing is ever
//! patched, so helpers deleted from a file disappear with the next update.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, trace};

use crate::helpers::hash::{content_hash, short_hex};
use crate::helpers::{FileIndexEntry, HelperRecord, Scope};
use crate::parser::extract_file;

/// What an [`HelperIndex::update`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Text hashed the same as the cached entry; nothing was re-extracted.
    Unchanged { helpers: usize },
    /// The entry was (re)built from the new text.
    Replaced { helpers: usize },
}

impl UpdateOutcome {
    pub fn helpers(&self) -> usize {
        match *self {
            UpdateOutcome::Unchanged { helpers } | UpdateOutcome::Replaced { helpers } => helpers,
        }
    }
}

#[derive(Debug, Default)]
pub struct HelperIndex {
    entries: BTreeMap<PathBuf, FileIndexEntry>,
}

impl HelperIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-extract `path` from `text` and replace its entry.
    pub fn update(&mut self, path: impl AsRef<Path>, text: &str) -> UpdateOutcome {
        let key = normalize_path(path.as_ref());
        let hash = content_hash(text);

        if let Some(existing) = self.entries.get(&key) {
            if existing.content_hash == hash {
                trace!(path = %key.display(), "unchanged, keeping cached helpers");
                return UpdateOutcome::Unchanged { helpers: existing.total_helpers() };
            }
        }

        let entry = extract_file(&key, text);
        let helpers = entry.total_helpers();
        debug!(
            path = %key.display(),
            hash = %short_hex(&hash),
            helpers,
            "extracted helpers"
        );
        self.entries.insert(key, entry);
        UpdateOutcome::Replaced { helpers }
    }

    /// Install an entry built elsewhere, replacing any entry for its path.
    pub fn install(&mut self, entry: FileIndexEntry) {
        self.entries.insert(entry.file_path.clone(), entry);
    }

    /// Drop the entry for `path`. Returns whether one existed.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        let key = normalize_path(path.as_ref());
        let removed = self.entries.remove(&key).is_some();
        if removed {
            debug!(path = %key.display(), "invalidated");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn lookup(
        &self,
        path: impl AsRef<Path>,
        name: &str,
        scope: &Scope,
    ) -> Option<&HelperRecord> {
        self.entry(path)?.find(name, scope)
    }

    pub fn all_for_file(&self, path: impl AsRef<Path>) -> &[HelperRecord] {
        self.entry(path).map(|e| e.helpers.as_slice()).unwrap_or(&[])
    }

    pub fn entry(&self, path: impl AsRef<Path>) -> Option<&FileIndexEntry> {
        self.entries.get(&normalize_path(path.as_ref()))
    }

    /// Find `name` registered against `template`, falling back to global
    /// helpers. Files are searched in path order; the first hit wins.
    pub fn resolve(&self, name: &str, template: Option<&str>) -> Option<&HelperRecord> {
        let scoped = template.map(Scope::template);
        scoped
            .iter()
            .find_map(|scope| self.find_in_any_file(name, scope))
            .or_else(|| self.find_in_any_file(name, &Scope::Global))
    }

    /// Helpers visible from `template`: its own first, then globals not
    /// shadowed by one of its own.
    pub fn helpers_in_scope(&self, template: Option<&str>) -> Vec<&HelperRecord> {
        let mut visible: Vec<&HelperRecord> = Vec::new();
        if let Some(name) = template {
            let scope = Scope::template(name);
            for record in self.records().filter(|r| r.scope == scope) {
                if !visible.iter().any(|v| v.name == record.name) {
                    visible.push(record);
                }
            }
        }
        for record in self.records().filter(|r| r.scope.is_global()) {
            if !visible.iter().any(|v| v.name == record.name) {
                visible.push(record);
            }
        }
        visible
    }

    /// Every record in the index, in path then source order.
    pub fn records(&self) -> impl Iterator<Item = &HelperRecord> {
        self.entries.values().flat_map(|e| e.helpers.iter())
    }

    pub fn entries(&self) -> impl Iterator<Item = &FileIndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_helpers(&self) -> usize {
        self.entries.values().map(|e| e.total_helpers()).sum()
    }

    fn find_in_any_file(&self, name: &str, scope: &Scope) -> Option<&HelperRecord> {
        self.entries.values().find_map(|e| e.find(name, scope))
    }
}

/// Absolute form of `path` with `.` and `..` removed lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Handle for one pending extraction started with [`SharedIndex::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTicket {
    path: PathBuf,
    generation: u64,
}

impl UpdateTicket {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the extraction for this ticket. Needs no lock.
    pub fn extract(&self, text: &str) -> FileIndexEntry {
        extract_file(&self.path, text)
    }
}

/// A [`HelperIndex`] shared between threads.
///
/// Extraction runs outside the lock. Each `begin` for a path supersedes every
/// earlier ticket for that path, and `commit` drops results from superseded
/// tickets, so readers only ever see the newest text's helpers.
#[derive(Debug, Clone, Default)]
pub struct SharedIndex {
    index: Arc<RwLock<HelperIndex>>,
    generations: Arc<Mutex<HashMap<PathBuf, u64>>>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, path: impl AsRef<Path>) -> UpdateTicket {
        let path = normalize_path(path.as_ref());
        let generation = self.bump(&path);
        UpdateTicket { path, generation }
    }

    /// Install `entry` unless a newer ticket for the same path exists.
    pub fn commit(&self, ticket: UpdateTicket, entry: FileIndexEntry) -> bool {
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        if generations.get(&ticket.path) != Some(&ticket.generation) {
            trace!(path = %ticket.path.display(), "dropping superseded extraction");
            return false;
        }
        // Held across the write so a concurrent `begin` cannot slip in between.
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .install(entry);
        drop(generations);
        true
    }

    /// `begin`, extract and `commit` in one step.
    pub fn update(&self, path: impl AsRef<Path>, text: &str) -> bool {
        let ticket = self.begin(path);
        let entry = ticket.extract(text);
        self.commit(ticket, entry)
    }

    /// Remove `path` and cancel any extraction still running for it.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize_path(path.as_ref());
        self.bump(&path);
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate(&path)
    }

    /// Empty the index and cancel every extraction still running.
    ///
    /// Generations only ever grow, so a ticket from before the clear can never
    /// match one handed out after it.
    pub fn clear(&self) {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        for generation in generations.values_mut() {
            *generation += 1;
        }
        self.index.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn read(&self) -> RwLockReadGuard<'_, HelperIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self, path: &Path) -> u64 {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = generations.entry(path.to_path_buf()).or_insert(0);
        *generation += 1;
        *generation
    }
}
