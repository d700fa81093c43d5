// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::pipeline::PathTable;

/// Top-level configuration as read from a TOML file.
///
/// Everything is optional: an absent file (or an empty one) yields the
/// builtin layout, `app/` into `build/` served on port 9000.
///
/// ```toml
/// [serve]
/// host = "127.0.0.1"
/// port = 9000
///
/// [category.js]
/// src = "app/js/*.js"
/// dest = "build/js"
/// watch = "app/**/*.js"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Dev server settings from `[serve]`.
    #[serde(default)]
    pub serve: ServeSection,

    /// Per-category overrides from `[category.<name>]`.
    ///
    /// Keys must be category names (html, js, style, image, assets); anything
    /// else is a startup error. Overrides replace individual fields of the
    /// builtin table, they never remove a category.
    #[serde(default)]
    pub category: BTreeMap<String, CategoryOverride>,
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Port for the live-reload WebSocket. The server retries upward from
    /// here if it is taken.
    #[serde(default = "default_reload_port")]
    pub reload_port: u16,

    /// Directory served as the site root, relative to the project root.
    #[serde(default = "default_serve_root")]
    pub root: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_reload_port() -> u16 {
    35729
}

fn default_serve_root() -> PathBuf {
    PathBuf::from("build")
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reload_port: default_reload_port(),
            root: default_serve_root(),
        }
    }
}

/// `[category.<name>]` section: partial override of one path spec.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryOverride {
    #[serde(default)]
    pub src: Option<String>,

    #[serde(default)]
    pub dest: Option<PathBuf>,

    #[serde(default)]
    pub watch: Option<String>,

    #[serde(default)]
    pub exclude: Option<String>,
}

/// Validated, resolved configuration the rest of the application runs on.
#[derive(Debug, Clone)]
pub struct Settings {
    pub serve: ServeSection,
    pub paths: PathTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serve: ServeSection::default(),
            paths: PathTable::builtin(),
        }
    }
}
