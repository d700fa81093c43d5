// src/pipeline/include.rs

//! Include directive expansion.
//!
//! HTML and JS sources can pull other files in with a directive alone on its
//! line, `//= relative/path`; CSS uses the comment form `/*= relative/path */`.
//! The directive line is replaced by the referenced file's contents,
//! recursively, with paths resolved relative to the including file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use regex::Regex;

fn line_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*//=\s*(\S+)\s*$").unwrap())
}

fn block_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*/\*=\s*(\S+?)\s*\*/\s*$").unwrap())
}

/// Expand all include directives in `source`.
///
/// `base` is the directory containing the file being expanded; nested
/// includes resolve relative to their own file. A missing include or an
/// include cycle is an error naming the offending path.
pub fn expand(source: &str, base: &Path) -> Result<String> {
    let mut stack = Vec::new();
    expand_inner(source, base, &mut stack)
}

fn expand_inner(source: &str, base: &Path, stack: &mut Vec<PathBuf>) -> Result<String> {
    let mut out = String::with_capacity(source.len());

    for line in source.lines() {
        let target = line_directive()
            .captures(line)
            .or_else(|| block_directive().captures(line))
            .map(|caps| caps[1].to_string());

        let Some(rel) = target else {
            out.push_str(line);
            out.push('\n');
            continue;
        };

        let include = base.join(&rel);
        if stack.contains(&include) {
            return Err(anyhow!("include cycle through {:?}", include));
        }

        let contents = std::fs::read_to_string(&include)
            .with_context(|| format!("reading include {:?}", include))?;

        let nested_base = include.parent().unwrap_or(base).to_path_buf();
        stack.push(include);
        let expanded = expand_inner(&contents, &nested_base, stack)?;
        stack.pop();

        out.push_str(&expanded);
        if !expanded.ends_with('\n') && !expanded.is_empty() {
            out.push('\n');
        }
    }

    Ok(out)
}
