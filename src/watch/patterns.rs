// src/watch/patterns.rs

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::pipeline::{Category, PathSpec, PathTable};

/// Compiled watch/exclude glob patterns for a single category.
///
/// Patterns are relative to the project root. The watcher passes relative
/// paths (e.g. `"app/js/main.js"`) into `matches`.
#[derive(Clone)]
pub struct CategoryWatchProfile {
    category: Category,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for CategoryWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryWatchProfile")
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl CategoryWatchProfile {
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns true if this category is interested in the given path
    /// (relative to project root).
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a compiled watch profile for each category in the table.
pub fn build_watch_profiles(table: &PathTable) -> Result<Vec<CategoryWatchProfile>> {
    let mut profiles = Vec::with_capacity(Category::ALL.len());

    for (category, spec) in table.iter() {
        let watch_set = build_globset(&[spec.watch.clone()])
            .with_context(|| format!("building watch globset for category {category}"))?;

        let exclude_set = match &spec.exclude {
            Some(pattern) => Some(
                build_globset(std::slice::from_ref(pattern))
                    .with_context(|| format!("building exclude globset for category {category}"))?,
            ),
            None => None,
        };

        profiles.push(CategoryWatchProfile {
            category,
            watch_set,
            exclude_set,
        });
    }

    Ok(profiles)
}

/// One category's source pattern, compiled for entry checks and enumeration.
///
/// "Entries" are the files matching the category's `src` glob: the inputs a
/// transform starts from, as opposed to the wider `watch` glob which also
/// covers include files.
#[derive(Clone)]
pub struct CategorySources {
    category: Category,
    root: PathBuf,
    src_set: GlobSet,
    exclude_set: Option<GlobSet>,
    /// Literal prefix of the src glob, resolved under `root`.
    base: PathBuf,
}

impl fmt::Debug for CategorySources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategorySources")
            .field("category", &self.category)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl CategorySources {
    pub fn from_spec(category: Category, spec: &PathSpec, root: &Path) -> Result<Self> {
        let src_set = build_globset(&[spec.src.clone()])
            .with_context(|| format!("building source globset for category {category}"))?;

        let exclude_set = match &spec.exclude {
            Some(pattern) => Some(
                build_globset(std::slice::from_ref(pattern))
                    .with_context(|| format!("building exclude globset for category {category}"))?,
            ),
            None => None,
        };

        Ok(CategorySources {
            category,
            root: root.to_path_buf(),
            src_set,
            exclude_set,
            base: root.join(glob_base(&spec.src)),
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory entry paths are made relative to when computing outputs.
    ///
    /// For a glob like `app/*.html` this is `<root>/app`; for a literal
    /// single-file pattern it is the file's parent directory.
    pub fn base_dir(&self) -> PathBuf {
        if self.base.is_dir() {
            self.base.clone()
        } else {
            self.base
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| self.root.clone())
        }
    }

    /// Whether `path` (absolute) is one of this category's entries.
    pub fn is_entry(&self, path: &Path) -> bool {
        let Some(rel) = relative_str(&self.root, path) else {
            return false;
        };
        if !self.src_set.is_match(&rel) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(&rel) {
                return false;
            }
        }
        true
    }

    /// Enumerate all entries currently on disk, as absolute paths.
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if self.base.is_file() {
            return Ok(vec![self.base.clone()]);
        }
        if !self.base.is_dir() {
            // Source tree absent: nothing to build yet, not an error.
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        self.walk(&self.base, &mut entries)?;
        entries.sort();
        Ok(entries)
    }

    fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
            let entry = entry.with_context(|| format!("reading dir entry in {:?}", dir))?;
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, out)?;
            } else if self.is_entry(&path) {
                out.push(path);
            }
        }
        Ok(())
    }
}

/// Literal leading components of a glob pattern, up to the first metacharacter.
///
/// `app/assets/img/**/*.*` -> `app/assets/img`; a pattern with no
/// metacharacters is returned whole.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for part in pattern.split('/') {
        if part.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(part);
    }
    base
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
