// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Resolve overrides onto the builtin path table and fail fast on
//!   configuration bugs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_settings};
pub use model::{CategoryOverride, ConfigFile, ServeSection, Settings};
pub use validate::resolve_settings;
