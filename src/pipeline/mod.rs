// src/pipeline/mod.rs

//! Asset categories, the static path table, and the initial full build.
//!
//! A [`Category`] is one logical asset pipeline (html, js, style, image,
//! assets). The set is fixed; categories are never created or destroyed at
//! runtime. The [`PathTable`] maps each category to its source glob, build
//! destination and watch glob, and is immutable after startup.

pub mod copy;
pub mod include;
pub mod page;
pub mod script;
pub mod style;
pub mod transform;

pub use transform::{transform_for, BuildOutput, Transform};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{fingerprint::file_fingerprint, BuildCache};
use crate::errors::TransformError;
use crate::watch::patterns::CategorySources;

/// One logical asset pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Html,
    Js,
    Style,
    Image,
    Assets,
}

impl Category {
    /// All categories, in build/report order.
    pub const ALL: [Category; 5] = [
        Category::Html,
        Category::Js,
        Category::Style,
        Category::Image,
        Category::Assets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Html => "html",
            Category::Js => "js",
            Category::Style => "style",
            Category::Image => "image",
            Category::Assets => "assets",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(Category::Html),
            "js" => Ok(Category::Js),
            "style" => Ok(Category::Style),
            "image" => Ok(Category::Image),
            "assets" => Ok(Category::Assets),
            other => Err(format!(
                "unknown category: {other} (expected html, js, style, image or assets)"
            )),
        }
    }
}

/// Environment variable selecting the build mode.
pub const MODE_ENV_VAR: &str = "ASSETPIPE_ENV";

/// Build mode, selected from the environment at startup.
///
/// Only the exact value `production` selects production mode; anything else,
/// including an unset variable, is development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    pub fn from_env() -> Self {
        match std::env::var(MODE_ENV_VAR) {
            Ok(value) if value == "production" => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => f.write_str("development"),
            BuildMode::Production => f.write_str("production"),
        }
    }
}

/// Per-category source glob, destination dir and watch glob.
///
/// Patterns are relative to the project root. `exclude` carves files out of
/// both `src` and `watch`; the builtin table uses it to keep the assets
/// category off the image subtree so no two categories ever write the same
/// output path.
#[derive(Debug, Clone)]
pub struct PathSpec {
    pub src: String,
    pub dest: PathBuf,
    pub watch: String,
    pub exclude: Option<String>,
}

/// Immutable mapping from category to its [`PathSpec`].
///
/// Holding one field per category makes lookup total: a missing category is
/// unrepresentable, and configuration can only override, never remove.
#[derive(Debug, Clone)]
pub struct PathTable {
    html: PathSpec,
    js: PathSpec,
    style: PathSpec,
    image: PathSpec,
    assets: PathSpec,
}

impl PathTable {
    /// The builtin layout: sources under `app/`, artifacts under `build/`.
    pub fn builtin() -> Self {
        PathTable {
            html: PathSpec {
                src: "app/*.html".to_string(),
                dest: PathBuf::from("build"),
                watch: "app/**/*.html".to_string(),
                exclude: None,
            },
            js: PathSpec {
                src: "app/js/*.js".to_string(),
                dest: PathBuf::from("build/js"),
                watch: "app/**/*.js".to_string(),
                exclude: None,
            },
            style: PathSpec {
                src: "app/css/styles.css".to_string(),
                dest: PathBuf::from("build/css"),
                watch: "app/**/*.css".to_string(),
                exclude: None,
            },
            image: PathSpec {
                src: "app/assets/img/**/*.*".to_string(),
                dest: PathBuf::from("build/img"),
                watch: "app/assets/img/**/*.*".to_string(),
                exclude: None,
            },
            assets: PathSpec {
                src: "app/assets/**/*.*".to_string(),
                dest: PathBuf::from("build"),
                watch: "app/assets/**/*.*".to_string(),
                exclude: Some("app/assets/img/**".to_string()),
            },
        }
    }

    pub fn spec(&self, category: Category) -> &PathSpec {
        match category {
            Category::Html => &self.html,
            Category::Js => &self.js,
            Category::Style => &self.style,
            Category::Image => &self.image,
            Category::Assets => &self.assets,
        }
    }

    pub(crate) fn spec_mut(&mut self, category: Category) -> &mut PathSpec {
        match category {
            Category::Html => &mut self.html,
            Category::Js => &mut self.js,
            Category::Style => &mut self.style,
            Category::Image => &mut self.image,
            Category::Assets => &mut self.assets,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &PathSpec)> {
        Category::ALL.iter().map(|c| (*c, self.spec(*c)))
    }
}

/// Everything needed to drive one category: its transform and the compiled
/// source matcher used for entry enumeration and entry checks.
pub struct CategoryWorker {
    pub transform: Arc<dyn Transform>,
    pub sources: CategorySources,
}

/// Report from the initial full build.
#[derive(Debug, Default)]
pub struct BuildSummary {
    /// Total source files built across all categories.
    pub built: usize,
    /// Per-category failures; the build keeps going for the others.
    pub failures: Vec<TransformError>,
}

impl BuildSummary {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the initial full build: every category in parallel, awaiting all.
///
/// This is the one hard sequencing contract in the system: callers must not
/// start watching or serving until this returns, or a partially-built output
/// directory could be observed. Successful files are recorded in the cache so
/// the first watch events on unchanged files are skipped.
pub async fn initial_build(
    workers: &BTreeMap<Category, CategoryWorker>,
    cache: &mut BuildCache,
) -> BuildSummary {
    let mut summary = BuildSummary::default();
    let mut join = JoinSet::new();

    for (&category, worker) in workers.iter() {
        let entries = match worker.sources.collect() {
            Ok(entries) => entries,
            Err(err) => {
                let failure = TransformError::for_category(
                    category,
                    format!("enumerating sources: {err:#}"),
                );
                warn!(category = %category, error = %failure, "initial build failed");
                summary.failures.push(failure);
                continue;
            }
        };

        info!(category = %category, files = entries.len(), "initial build starting");

        let transform = Arc::clone(&worker.transform);
        join.spawn_blocking(move || {
            // Fingerprint before building so the cache records the state that
            // was actually built, not whatever is on disk afterwards.
            let mut tracked = Vec::with_capacity(entries.len());
            for entry in &entries {
                match file_fingerprint(entry) {
                    Ok(fp) => tracked.push((entry.clone(), fp)),
                    Err(err) => {
                        warn!(
                            category = %category,
                            path = %entry.display(),
                            error = %err,
                            "failed to fingerprint source; it will rebuild on next change"
                        );
                    }
                }
            }

            let inputs: Vec<PathBuf> = tracked.iter().map(|(p, _)| p.clone()).collect();
            let result = transform.run(&inputs);
            (category, tracked, result)
        });
    }

    while let Some(joined) = join.join_next().await {
        let (category, tracked, result) = match joined {
            Ok(t) => t,
            Err(err) => {
                warn!(error = %err, "initial build task panicked");
                continue;
            }
        };

        match result {
            Ok(output) => {
                debug!(
                    category = %category,
                    outputs = output.outputs.len(),
                    "initial build finished"
                );
                summary.built += tracked.len();
                for (path, fp) in tracked {
                    cache.record(category, &path, fp);
                }
            }
            Err(failure) => {
                warn!(category = %category, error = %failure, "initial build failed");
                summary.failures.push(failure);
            }
        }
    }

    summary
}
