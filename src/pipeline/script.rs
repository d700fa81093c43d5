// src/pipeline/script.rs

//! JavaScript bundling: include expansion, then minification via oxc in
//! production mode. Development mode writes the expanded source as-is so the
//! browser shows something readable, but still parses it so syntax errors
//! surface as build diagnostics rather than console surprises.

use std::fs;
use std::path::PathBuf;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use tracing::debug;

use crate::errors::TransformError;
use crate::pipeline::transform::{output_path, resolve_entries, write_output, BuildOutput, Transform};
use crate::pipeline::{include, BuildMode, Category};
use crate::watch::patterns::CategorySources;

pub struct ScriptTransform {
    sources: CategorySources,
    dest: PathBuf,
    mode: BuildMode,
}

impl ScriptTransform {
    pub fn new(sources: CategorySources, dest: PathBuf, mode: BuildMode) -> Self {
        Self {
            sources,
            dest,
            mode,
        }
    }
}

impl Transform for ScriptTransform {
    fn run(&self, inputs: &[PathBuf]) -> Result<BuildOutput, TransformError> {
        let entries = resolve_entries(&self.sources, inputs)?;
        let base = self.sources.base_dir();
        let mut output = BuildOutput::default();

        for entry in entries {
            let source = fs::read_to_string(&entry)
                .map_err(|err| TransformError::for_file(Category::Js, &entry, err.to_string()))?;

            let script_base = entry.parent().unwrap_or(&base);
            let bundled = include::expand(&source, script_base)
                .map_err(|err| TransformError::for_file(Category::Js, &entry, format!("{err:#}")))?;

            let code = if self.mode.is_production() {
                minify_js(&bundled).ok_or_else(|| {
                    TransformError::for_file(Category::Js, &entry, "JavaScript failed to parse")
                })?
            } else {
                if !parses_as_js(&bundled) {
                    return Err(TransformError::for_file(
                        Category::Js,
                        &entry,
                        "JavaScript failed to parse",
                    ));
                }
                bundled
            };

            let out = output_path(&entry, &base, &self.dest);
            write_output(&out, code.as_bytes())
                .map_err(|err| TransformError::for_file(Category::Js, &entry, format!("{err:#}")))?;

            debug!(script = %out.display(), "built script");
            output.outputs.push(out);
        }

        Ok(output)
    }
}

/// Minify JavaScript source code.
fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

fn parses_as_js(source: &str) -> bool {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    ret.errors.is_empty()
}
