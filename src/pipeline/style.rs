// src/pipeline/style.rs

//! Stylesheet bundling: include expansion, then parsing (and in production,
//! minification) via lightningcss.
//!
//! The style category is bundle-shaped: its `src` names entry stylesheets
//! (by default a single `styles.css`) and every watched CSS change rebuilds
//! the bundle, since partial files only matter through their includes.

use std::fs;
use std::path::PathBuf;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use tracing::debug;

use crate::errors::TransformError;
use crate::pipeline::transform::{output_path, write_output, BuildOutput, Transform};
use crate::pipeline::{include, BuildMode, Category};
use crate::watch::patterns::CategorySources;

pub struct StyleTransform {
    sources: CategorySources,
    dest: PathBuf,
    mode: BuildMode,
}

impl StyleTransform {
    pub fn new(sources: CategorySources, dest: PathBuf, mode: BuildMode) -> Self {
        Self {
            sources,
            dest,
            mode,
        }
    }
}

impl Transform for StyleTransform {
    fn run(&self, _inputs: &[PathBuf]) -> Result<BuildOutput, TransformError> {
        let entries = self.sources.collect().map_err(|err| {
            TransformError::for_category(Category::Style, format!("enumerating sources: {err:#}"))
        })?;
        let base = self.sources.base_dir();
        let mut output = BuildOutput::default();

        for entry in entries {
            let source = fs::read_to_string(&entry)
                .map_err(|err| TransformError::for_file(Category::Style, &entry, err.to_string()))?;

            let sheet_base = entry.parent().unwrap_or(&base);
            let bundled = include::expand(&source, sheet_base).map_err(|err| {
                TransformError::for_file(Category::Style, &entry, format!("{err:#}"))
            })?;

            // Parse in both modes so malformed CSS is a build diagnostic, not
            // a silently broken page.
            let code = process_css(&bundled, self.mode.is_production())
                .map_err(|msg| TransformError::for_file(Category::Style, &entry, msg))?;

            let out = output_path(&entry, &base, &self.dest);
            write_output(&out, code.as_bytes())
                .map_err(|err| TransformError::for_file(Category::Style, &entry, format!("{err:#}")))?;

            debug!(stylesheet = %out.display(), "built stylesheet");
            output.outputs.push(out);
        }

        Ok(output)
    }
}

fn process_css(source: &str, minify: bool) -> Result<String, String> {
    let stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|err| err.to_string())?;

    if !minify {
        return Ok(source.to_string());
    }

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|err| err.to_string())?;

    Ok(result.code)
}
