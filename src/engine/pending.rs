// src/engine/pending.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::runtime::ChangeKind;

/// Changes that arrived for a category while its build was in flight.
///
/// Keyed by path, so rapid successive events for the same file collapse into
/// one rebuild that reads the file's latest state when it finally runs.
/// Deletions never queue: the runtime forgets them immediately and calls
/// [`PendingChanges::discard`] so a stale rebuild of a now-gone file is
/// dropped on the floor.
#[derive(Debug, Default)]
pub struct PendingChanges {
    changes: BTreeMap<PathBuf, ChangeKind>,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Queue a change. The first observed kind wins; the rebuild reads
    /// current file contents either way.
    pub fn push(&mut self, path: PathBuf, kind: ChangeKind) {
        let coalesced = self.changes.contains_key(&path);
        self.changes.entry(path.clone()).or_insert(kind);
        if coalesced {
            debug!(path = %path.display(), "coalesced change into pending rebuild");
        }
    }

    /// Drop a queued change for a path that was deleted.
    pub fn discard(&mut self, path: &Path) {
        if self.changes.remove(path).is_some() {
            debug!(path = %path.display(), "discarded pending change for deleted file");
        }
    }

    /// Take everything queued, leaving the set empty.
    pub fn drain(&mut self) -> Vec<(PathBuf, ChangeKind)> {
        std::mem::take(&mut self.changes).into_iter().collect()
    }
}
