// src/pipeline/page.rs

//! HTML page assembly: include expansion into the build root.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::TransformError;
use crate::pipeline::transform::{output_path, resolve_entries, write_output, BuildOutput, Transform};
use crate::pipeline::{include, Category};
use crate::watch::patterns::CategorySources;

pub struct PageTransform {
    sources: CategorySources,
    dest: PathBuf,
}

impl PageTransform {
    pub fn new(sources: CategorySources, dest: PathBuf) -> Self {
        Self { sources, dest }
    }
}

impl Transform for PageTransform {
    fn run(&self, inputs: &[PathBuf]) -> Result<BuildOutput, TransformError> {
        let entries = resolve_entries(&self.sources, inputs)?;
        let base = self.sources.base_dir();
        let mut output = BuildOutput::default();

        for entry in entries {
            let source = fs::read_to_string(&entry)
                .map_err(|err| TransformError::for_file(Category::Html, &entry, err.to_string()))?;

            let page_base = entry.parent().unwrap_or(&base);
            let assembled = include::expand(&source, page_base)
                .map_err(|err| TransformError::for_file(Category::Html, &entry, format!("{err:#}")))?;

            let out = output_path(&entry, &base, &self.dest);
            write_output(&out, assembled.as_bytes())
                .map_err(|err| TransformError::for_file(Category::Html, &entry, format!("{err:#}")))?;

            debug!(page = %out.display(), "assembled html page");
            output.outputs.push(out);
        }

        Ok(output)
    }
}
