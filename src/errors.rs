// src/errors.rs

//! Crate-wide error types.
//!
//! Configuration problems are fatal and travel through `anyhow` at startup.
//! A failed build of one category is not fatal: it gets a structured type so
//! the runtime can report it and keep watching, with the cache left untouched
//! so the next relevant change retries the same files.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pipeline::Category;

pub use anyhow::{Error, Result};

/// A failed transform run for one category.
///
/// Never crosses category boundaries and never terminates the watch loop.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error("{category}: failed to build {}: {message}", .file.display())]
    File {
        category: Category,
        file: PathBuf,
        message: String,
    },

    #[error("{category}: {message}")]
    Category { category: Category, message: String },
}

impl TransformError {
    pub fn for_file(
        category: Category,
        file: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        TransformError::File {
            category,
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn for_category(category: Category, message: impl Into<String>) -> Self {
        TransformError::Category {
            category,
            message: message.into(),
        }
    }

    /// Category this failure belongs to.
    pub fn category(&self) -> Category {
        match self {
            TransformError::File { category, .. } => *category,
            TransformError::Category { category, .. } => *category,
        }
    }

    /// The failing file, when the failure is attributable to one.
    pub fn file(&self) -> Option<&Path> {
        match self {
            TransformError::File { file, .. } => Some(file),
            TransformError::Category { .. } => None,
        }
    }
}
