// src/config/validate.rs

use anyhow::{anyhow, Context, Result};
use globset::Glob;

use crate::config::model::{CategoryOverride, ConfigFile, ServeSection, Settings};
use crate::pipeline::{Category, PathTable};

/// Resolve a loaded configuration into validated [`Settings`].
///
/// Every problem found here is fatal: the process must not start with a
/// malformed path table or server section.
pub fn resolve_settings(cfg: &ConfigFile) -> Result<Settings> {
    validate_serve(&cfg.serve)?;
    let paths = resolve_path_table(cfg)?;
    Ok(Settings {
        serve: cfg.serve.clone(),
        paths,
    })
}

fn validate_serve(serve: &ServeSection) -> Result<()> {
    if serve.host.trim().is_empty() {
        return Err(anyhow!("[serve].host must not be empty"));
    }
    if serve.port == 0 {
        return Err(anyhow!("[serve].port must be >= 1 (got 0)"));
    }
    if serve.reload_port == 0 {
        return Err(anyhow!("[serve].reload_port must be >= 1 (got 0)"));
    }
    if serve.port == serve.reload_port {
        return Err(anyhow!(
            "[serve].port and [serve].reload_port must differ (both {})",
            serve.port
        ));
    }
    if serve.root.as_os_str().is_empty() {
        return Err(anyhow!("[serve].root must not be empty"));
    }
    Ok(())
}

/// Apply `[category.<name>]` overrides onto the builtin table and check the
/// result. Unknown category names fail fast; the five categories themselves
/// can never be absent since overrides only replace fields.
fn resolve_path_table(cfg: &ConfigFile) -> Result<PathTable> {
    let mut table = PathTable::builtin();

    for (name, over) in cfg.category.iter() {
        let category: Category = name
            .parse()
            .map_err(|e: String| anyhow!("[category.{name}]: {e}"))?;
        apply_override(&mut table, category, over);
    }

    for (category, spec) in table.iter() {
        if spec.src.trim().is_empty() {
            return Err(anyhow!("[category.{category}].src must not be empty"));
        }
        if spec.watch.trim().is_empty() {
            return Err(anyhow!("[category.{category}].watch must not be empty"));
        }
        if spec.dest.as_os_str().is_empty() {
            return Err(anyhow!("[category.{category}].dest must not be empty"));
        }

        Glob::new(&spec.src)
            .with_context(|| format!("invalid src glob for category {category}"))?;
        Glob::new(&spec.watch)
            .with_context(|| format!("invalid watch glob for category {category}"))?;
        if let Some(exclude) = &spec.exclude {
            Glob::new(exclude)
                .with_context(|| format!("invalid exclude glob for category {category}"))?;
        }
    }

    Ok(table)
}

fn apply_override(table: &mut PathTable, category: Category, over: &CategoryOverride) {
    let spec = table.spec_mut(category);
    if let Some(src) = &over.src {
        spec.src = src.clone();
    }
    if let Some(dest) = &over.dest {
        spec.dest = dest.clone();
    }
    if let Some(watch) = &over.watch {
        spec.watch = watch.clone();
    }
    if let Some(exclude) = &over.exclude {
        spec.exclude = Some(exclude.clone());
    }
}
