// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{ChangeEvent, ChangeKind, RuntimeEvent};
use crate::watch::patterns::{relative_str, CategoryWatchProfile};

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher observing `root` recursively, sending a
/// `RuntimeEvent::SourceChanged` for every category whose watch pattern
/// matches a changed path.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<CategoryWatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone()); // best-effort

    let profiles = Arc::new(profiles);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // Tracing isn't usable from the notify callback thread
                    // once the receiver is gone; fall back to stderr.
                    eprintln!("assetpipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    let async_root = root.clone();
    let async_profiles = Arc::clone(&profiles);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let Some(kind) = classify(&event) else {
                continue;
            };

            for path in &event.paths {
                if is_temp_file(path) {
                    continue;
                }

                let Some(rel_str) = relative_str(&async_root, path) else {
                    warn!(
                        "could not relativize path {:?} against root {:?}",
                        path, async_root
                    );
                    continue;
                };

                for profile in async_profiles.iter() {
                    if !profile.matches(&rel_str) {
                        continue;
                    }
                    let change = ChangeEvent {
                        category: profile.category(),
                        path: path.clone(),
                        kind,
                    };
                    debug!(
                        category = %change.category,
                        path = %rel_str,
                        kind = ?kind,
                        "watch match -> dispatching change"
                    );
                    if let Err(err) = runtime_tx
                        .send(RuntimeEvent::SourceChanged(change))
                        .await
                    {
                        warn!("failed to send RuntimeEvent::SourceChanged: {err}");
                        // Runtime channel closed; no point keeping this loop.
                        return;
                    }
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Map a notify event onto a change kind, dropping the noise.
///
/// Metadata-only modifications (mtime/atime/chmod) are ignored; they would
/// otherwise trigger rebuild loops from our own output writes being stat'd.
fn classify(event: &Event) -> Option<ChangeKind> {
    match event.kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        EventKind::Modify(modify) => {
            if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                None
            } else {
                Some(ChangeKind::Modified)
            }
        }
        _ => None,
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
