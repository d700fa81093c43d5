// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::model::{ConfigFile, Settings};
use crate::config::validate::resolve_settings;

/// Load a configuration file from a given path and return the raw
/// [`ConfigFile`].
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config file at {:?}", path))?;

    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML config from {:?}", path))?;

    Ok(config)
}

/// Load a configuration file and resolve it into validated [`Settings`].
///
/// This is the entry point for the rest of the application: it reads TOML,
/// applies the builtin defaults, and fails fast on anything semantically
/// wrong (unknown categories, bad globs, broken server section).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let config = load_from_path(&path)?;
    resolve_settings(&config)
}

/// Resolve settings for an optional config path.
///
/// An explicitly given path must exist; the default path quietly falls back
/// to builtin settings when absent, so a fresh project runs with zero
/// configuration.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => {
            let path = default_config_path();
            if path.exists() {
                load_and_validate(&path)
            } else {
                debug!("no {:?} found; using builtin settings", path);
                Ok(Settings::default())
            }
        }
    }
}

/// Default config path: `Assetpipe.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetpipe.toml")
}
