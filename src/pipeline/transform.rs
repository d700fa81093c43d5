// src/pipeline/transform.rs

//! The transform seam between the reactor and the per-category build steps.
//!
//! A [`Transform`] converts a set of changed source files into build
//! artifacts for one category, or fails with a diagnosable error.
//! Implementations are synchronous and filesystem-heavy; the runtime invokes
//! them on blocking threads so the reactor keeps processing other categories'
//! events while one category builds.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::errors::TransformError;
use crate::pipeline::copy::CopyTransform;
use crate::pipeline::page::PageTransform;
use crate::pipeline::script::ScriptTransform;
use crate::pipeline::style::StyleTransform;
use crate::pipeline::{BuildMode, Category, PathSpec};
use crate::watch::patterns::CategorySources;

/// Artifacts written by one transform run.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub outputs: Vec<PathBuf>,
}

/// One category's conversion from source files to build artifacts.
pub trait Transform: Send + Sync {
    /// Build the given source files, returning the artifacts written.
    ///
    /// All-or-nothing: on error, nothing is considered built and the caller
    /// leaves its cache untouched so the next change retries.
    fn run(&self, inputs: &[PathBuf]) -> Result<BuildOutput, TransformError>;
}

/// Construct the transform for a category.
pub fn transform_for(
    spec: &PathSpec,
    sources: CategorySources,
    mode: BuildMode,
    root: &Path,
) -> Arc<dyn Transform> {
    let dest = root.join(&spec.dest);
    match sources.category() {
        Category::Html => Arc::new(PageTransform::new(sources, dest)),
        Category::Js => Arc::new(ScriptTransform::new(sources, dest, mode)),
        Category::Style => Arc::new(StyleTransform::new(sources, dest, mode)),
        Category::Image | Category::Assets => Arc::new(CopyTransform::new(sources, dest)),
    }
}

/// Resolve the concrete entry set for a run.
///
/// Changed entries rebuild themselves; any non-entry input (an include file
/// pulled in by `//=`) rebuilds every entry, since there is no reverse map
/// from includes to the entries using them.
pub(crate) fn resolve_entries(
    sources: &CategorySources,
    inputs: &[PathBuf],
) -> Result<Vec<PathBuf>, TransformError> {
    let mut rebuild_all = false;
    let mut entries = Vec::new();

    for input in inputs {
        if sources.is_entry(input) {
            entries.push(input.clone());
        } else {
            rebuild_all = true;
        }
    }

    if rebuild_all {
        entries = sources.collect().map_err(|err| {
            TransformError::for_category(
                sources.category(),
                format!("enumerating sources: {err:#}"),
            )
        })?;
    } else {
        entries.sort();
        entries.dedup();
    }

    Ok(entries)
}

/// Output path for an entry: its path relative to the category's source base,
/// re-rooted under the destination directory.
pub(crate) fn output_path(entry: &Path, base: &Path, dest: &Path) -> PathBuf {
    match entry.strip_prefix(base) {
        Ok(rel) => dest.join(rel),
        Err(_) => dest.join(entry.file_name().map(PathBuf::from).unwrap_or_default()),
    }
}

/// Write an artifact, creating parent directories as needed.
pub(crate) fn write_output(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {:?}", path))
}
