// src/pipeline/copy.rs

//! Plain file copying for the image and assets categories, preserving the
//! path relative to the category's source base.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::TransformError;
use crate::pipeline::transform::{output_path, resolve_entries, BuildOutput, Transform};
use crate::watch::patterns::CategorySources;

pub struct CopyTransform {
    sources: CategorySources,
    dest: PathBuf,
}

impl CopyTransform {
    pub fn new(sources: CategorySources, dest: PathBuf) -> Self {
        Self { sources, dest }
    }
}

impl Transform for CopyTransform {
    fn run(&self, inputs: &[PathBuf]) -> Result<BuildOutput, TransformError> {
        let category = self.sources.category();
        let entries = resolve_entries(&self.sources, inputs)?;
        let base = self.sources.base_dir();
        let mut output = BuildOutput::default();

        for entry in entries {
            let out = output_path(&entry, &base, &self.dest);

            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(|err| {
                    TransformError::for_file(category, &entry, format!("creating {parent:?}: {err}"))
                })?;
            }
            fs::copy(&entry, &out)
                .map_err(|err| TransformError::for_file(category, &entry, err.to_string()))?;

            debug!(category = %category, file = %out.display(), "copied");
            output.outputs.push(out);
        }

        Ok(output)
    }
}
