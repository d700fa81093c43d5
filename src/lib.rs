// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod serve;
pub mod watch;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cache::BuildCache;
use crate::cli::CliArgs;
use crate::config::{load_settings, Settings};
use crate::engine::{Runtime, RuntimeEvent};
use crate::pipeline::{
    initial_build, transform_for, BuildMode, BuildSummary, Category, CategoryWorker,
};
use crate::serve::{DevServer, LiveServer};
use crate::watch::{build_watch_profiles, CategorySources};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the initial full build (all categories in parallel)
/// - the dev server
/// - the file watcher and the watch runtime
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_ref().map(PathBuf::from);
    let settings = load_settings(config_path.as_deref())?;
    let root = project_root(config_path.as_deref());

    let mode = BuildMode::from_env();
    info!(mode = %mode, root = ?root, "assetpipe starting");

    if args.dry_run {
        print_dry_run(&settings, mode);
        return Ok(());
    }

    if args.clean {
        clean_output(&root.join(&settings.serve.root))?;
    }

    let workers = build_workers(&settings, mode, &root)?;
    let mut cache = BuildCache::new();

    if args.once {
        let summary = initial_build(&workers, &mut cache).await;
        report_summary(&summary);
        if !summary.is_ok() {
            return Err(anyhow!(
                "build failed for {} categor{}",
                summary.failures.len(),
                if summary.failures.len() == 1 { "y" } else { "ies" }
            ));
        }
        return Ok(());
    }

    let server: Arc<dyn DevServer> = Arc::new(LiveServer::new(&settings.serve));
    let serve_root = root.join(&settings.serve.root);
    let summary = build_and_start(&workers, &mut cache, &server, &serve_root).await?;
    report_summary(&summary);

    // Runtime event channel; the watcher, build tasks and the Ctrl-C handler
    // all feed it.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let profiles = build_watch_profiles(&settings.paths)?;
    let _watcher_handle = watch::spawn_watcher(root.clone(), profiles, rt_tx.clone())?;

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let runtime = Runtime::new(workers, cache, server, rt_rx, rt_tx);
    runtime.run().await
}

/// Run the initial full build, then bring up the dev server.
///
/// The ordering is the system's one hard sequencing contract: the server
/// starts only after every category's initial build has completed (success
/// or reported failure), so a partially-built output directory is never
/// served.
pub async fn build_and_start(
    workers: &BTreeMap<Category, CategoryWorker>,
    cache: &mut BuildCache,
    server: &Arc<dyn DevServer>,
    serve_root: &Path,
) -> Result<BuildSummary> {
    let summary = initial_build(workers, cache).await;
    server.start(serve_root)?;
    Ok(summary)
}

/// Construct the per-category workers (source matcher + transform) from
/// validated settings.
pub fn build_workers(
    settings: &Settings,
    mode: BuildMode,
    root: &Path,
) -> Result<BTreeMap<Category, CategoryWorker>> {
    let mut workers = BTreeMap::new();

    for category in Category::ALL {
        let spec = settings.paths.spec(category);
        let sources = CategorySources::from_spec(category, spec, root)?;
        let transform = transform_for(spec, sources.clone(), mode, root);
        workers.insert(category, CategoryWorker { transform, sources });
    }

    Ok(workers)
}

/// Figure out the project root against which all patterns are evaluated.
/// Currently: directory containing the config file, or `.`.
fn project_root(config_path: Option<&Path>) -> PathBuf {
    let root = config_path
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    root.canonicalize().unwrap_or(root) // best-effort
}

/// Remove the build output directory, like a `clean` task.
fn clean_output(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            info!(dir = ?dir, "removed build output");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("removing build output at {:?}", dir)),
    }
}

fn report_summary(summary: &BuildSummary) {
    info!(files = summary.built, "initial build complete");
    for failure in &summary.failures {
        warn!(category = %failure.category(), error = %failure, "category failed to build");
    }
}

/// Simple dry-run output: print the resolved table, server config and mode.
fn print_dry_run(settings: &Settings, mode: BuildMode) {
    println!("assetpipe dry-run");
    println!("  mode = {mode}");
    println!(
        "  serve = http://{}:{} (reload port {}, root {:?})",
        settings.serve.host, settings.serve.port, settings.serve.reload_port, settings.serve.root
    );
    println!();

    println!("categories ({}):", Category::ALL.len());
    for (category, spec) in settings.paths.iter() {
        println!("  - {category}");
        println!("      src: {}", spec.src);
        println!("      dest: {}", spec.dest.display());
        println!("      watch: {}", spec.watch);
        if let Some(exclude) = &spec.exclude {
            println!("      exclude: {exclude}");
        }
    }
}
