// src/cache/mod.rs

//! Per-category memory of previously built source files.
//!
//! The cache maps each source file to the fingerprint it had when it was
//! last built successfully. The reactor probes it to skip rebuilds of
//! unchanged files and removes entries when sources are deleted, so the
//! mapping never references a file that no longer exists. Purely in-memory;
//! discarded on process exit.

pub mod fingerprint;

pub use fingerprint::file_fingerprint;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::pipeline::Category;

/// In-memory build cache, one mapping per category.
#[derive(Debug, Default)]
pub struct BuildCache {
    entries: HashMap<Category, HashMap<PathBuf, String>>,
}

impl BuildCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only probe: does this file need building?
    ///
    /// True if the file has never been built for this category, or its stored
    /// fingerprint differs from `fingerprint`.
    pub fn should_rebuild(&self, category: Category, path: &Path, fingerprint: &str) -> bool {
        match self.entries.get(&category).and_then(|m| m.get(path)) {
            Some(stored) => stored != fingerprint,
            None => true,
        }
    }

    /// Insert or update an entry. Called only after a successful build.
    pub fn record(&mut self, category: Category, path: &Path, fingerprint: impl Into<String>) {
        self.entries
            .entry(category)
            .or_default()
            .insert(path.to_path_buf(), fingerprint.into());
    }

    /// Remove the entry for a deleted source file.
    ///
    /// Idempotent: forgetting an absent key is a no-op.
    pub fn forget(&mut self, category: Category, path: &Path) {
        if let Some(map) = self.entries.get_mut(&category) {
            if map.remove(path).is_some() {
                debug!(category = %category, path = %path.display(), "forgot cache entry");
            }
        }
    }

    /// Whether a file is currently tracked for a category.
    pub fn is_tracked(&self, category: Category, path: &Path) -> bool {
        self.entries
            .get(&category)
            .is_some_and(|m| m.contains_key(path))
    }

    /// Number of tracked files for a category.
    pub fn tracked(&self, category: Category) -> usize {
        self.entries.get(&category).map_or(0, |m| m.len())
    }
}
