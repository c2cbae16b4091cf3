use std::path::{Path, PathBuf};
use std::sync::mpsc;

use color_eyre::eyre::{Result, WrapErr};
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

use crate::project::ProjectFilter;

/// File system change relevant to the helper index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Created or modified; re-read and `update`.
    Changed(PathBuf),
    /// Deleted; `invalidate`.
    Removed(PathBuf),
}

impl HostEvent {
    pub fn path(&self) -> &Path {
        match self {
            HostEvent::Changed(path) | HostEvent::Removed(path) => path,
        }
    }
}

/// Map one notify event to host events for the files a scan would index.
pub fn classify(event: &NotifyEvent, filter: &ProjectFilter) -> Vec<HostEvent> {
    let make: fn(PathBuf) -> HostEvent = match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => HostEvent::Changed,
        EventKind::Remove(_) => HostEvent::Removed,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .filter(|p| filter.includes(p))
        .map(|p| make(p.clone()))
        .collect()
}

/// Watch `root` recursively and forward classified events to `tx`.
///
/// The returned watcher must be kept alive for events to keep flowing.
pub fn spawn_watcher(
    root: &Path,
    tx: mpsc::Sender<HostEvent>,
    filter: ProjectFilter,
) -> Result<RecommendedWatcher> {
    let handler = move |res: notify::Result<NotifyEvent>| match res {
        Ok(event) => {
            for host_event in classify(&event, &filter) {
                let _ = tx.send(host_event);
            }
        }
        Err(err) => warn!(error = %err, "file watcher error"),
    };
    let mut watcher =
        notify::recommended_watcher(handler).wrap_err("failed to create file watcher")?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .wrap_err_with(|| format!("failed to watch {}", root.display()))?;
    Ok(watcher)
}
