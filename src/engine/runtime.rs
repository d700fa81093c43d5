// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{file_fingerprint, BuildCache};
use crate::engine::pending::PendingChanges;
use crate::errors::TransformError;
use crate::pipeline::{BuildOutput, Category, CategoryWorker};
use crate::serve::DevServer;

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// A single filesystem change, already attributed to a category.
///
/// Transient: produced by the watcher, consumed immediately by the runtime.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub category: Category,
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Events sent into the runtime from the watcher, build tasks, or signals.
#[derive(Debug)]
pub enum RuntimeEvent {
    SourceChanged(ChangeEvent),
    BuildFinished {
        category: Category,
        result: Result<BuildOutput, TransformError>,
    },
    ShutdownRequested,
}

/// Per-category state: the worker, the in-flight build (if any) and the
/// changes queued behind it.
struct CategoryState {
    worker: CategoryWorker,
    /// Sources (with their pre-build fingerprints) currently being built.
    /// `Some` is the mutual-exclusion flag: at most one build per category.
    in_flight: Option<Vec<(PathBuf, String)>>,
    pending: PendingChanges,
}

/// The watch reactor.
///
/// Consumes change events, drives each category through
/// Idle -> Dispatching -> Building independently of the others, reconciles
/// the build cache, and pings the dev server after successful rebuilds.
/// Build failures are diagnostics, never fatal: the loop keeps running and
/// the untouched cache makes the next relevant change retry.
pub struct Runtime {
    states: BTreeMap<Category, CategoryState>,
    cache: BuildCache,
    server: Arc<dyn DevServer>,
    events_rx: mpsc::Receiver<RuntimeEvent>,
    /// Cloned into build tasks so they can report completion.
    events_tx: mpsc::Sender<RuntimeEvent>,
}

impl Runtime {
    pub fn new(
        workers: BTreeMap<Category, CategoryWorker>,
        cache: BuildCache,
        server: Arc<dyn DevServer>,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        events_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        let states = workers
            .into_iter()
            .map(|(category, worker)| {
                (
                    category,
                    CategoryState {
                        worker,
                        in_flight: None,
                        pending: PendingChanges::default(),
                    },
                )
            })
            .collect();

        Self {
            states,
            cache,
            server,
            events_rx,
            events_tx,
        }
    }

    /// Main event loop. Runs until the channel closes or shutdown is
    /// requested.
    pub async fn run(mut self) -> Result<()> {
        info!("watch runtime started");

        while let Some(event) = self.events_rx.recv().await {
            match event {
                RuntimeEvent::SourceChanged(change) => self.handle_change(change).await,
                RuntimeEvent::BuildFinished { category, result } => {
                    self.handle_build_finished(category, result).await
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping runtime");
                    break;
                }
            }
        }

        info!("watch runtime exiting");
        Ok(())
    }

    async fn handle_change(&mut self, change: ChangeEvent) {
        let ChangeEvent {
            category,
            path,
            kind,
        } = change;

        let Some(state) = self.states.get_mut(&category) else {
            warn!(category = %category, "change for unknown category; ignoring");
            return;
        };

        match kind {
            ChangeKind::Deleted => {
                // Reconcile before the next build cycle: the cache must never
                // reference a nonexistent source file, and a queued rebuild
                // of it would be stale.
                debug!(category = %category, path = %path.display(), "source deleted");
                state.pending.discard(&path);
                self.cache.forget(category, &path);
            }
            ChangeKind::Added | ChangeKind::Modified => {
                if state.in_flight.is_some() {
                    state.pending.push(path, kind);
                    return;
                }
                self.dispatch(category, vec![path]).await;
            }
        }
    }

    async fn handle_build_finished(
        &mut self,
        category: Category,
        result: Result<BuildOutput, TransformError>,
    ) {
        let Some(state) = self.states.get_mut(&category) else {
            warn!(category = %category, "completion for unknown category; ignoring");
            return;
        };

        let Some(built) = state.in_flight.take() else {
            warn!(category = %category, "completion for idle category; ignoring");
            return;
        };

        match result {
            Ok(output) => {
                for (path, fingerprint) in built {
                    self.cache.record(category, &path, fingerprint);
                }
                info!(
                    category = %category,
                    outputs = output.outputs.len(),
                    "rebuild finished"
                );
                // Fire-and-forget; must never block the reactor.
                self.server.reload();
            }
            Err(failure) => {
                // Cache left untouched so the next relevant change retries.
                warn!(
                    category = %category,
                    error = %failure,
                    "rebuild failed; keeping previous outputs"
                );
            }
        }

        let queued = self.states.get_mut(&category).map(|s| s.pending.drain());
        if let Some(queued) = queued {
            if !queued.is_empty() {
                let candidates = queued.into_iter().map(|(path, _)| path).collect();
                self.dispatch(category, candidates).await;
            }
        }
    }

    /// Fingerprint candidates, probe the cache, and kick off a build for
    /// whatever actually needs one.
    async fn dispatch(&mut self, category: Category, candidates: Vec<PathBuf>) {
        let Some(state) = self.states.get_mut(&category) else {
            return;
        };

        let mut inputs = Vec::new();
        let mut tracked = Vec::new();

        for path in candidates {
            if !path.is_file() {
                debug!(
                    category = %category,
                    path = %path.display(),
                    "changed path is not a file; ignoring"
                );
                continue;
            }

            if state.worker.sources.is_entry(&path) {
                match file_fingerprint(&path) {
                    Ok(fp) => {
                        if self.cache.should_rebuild(category, &path, &fp) {
                            inputs.push(path.clone());
                            tracked.push((path, fp));
                        } else {
                            debug!(
                                category = %category,
                                path = %path.display(),
                                "fingerprint unchanged; skipping rebuild"
                            );
                        }
                    }
                    Err(err) => {
                        warn!(
                            category = %category,
                            path = %path.display(),
                            error = %err,
                            "failed to fingerprint changed file; it will retry on next change"
                        );
                    }
                }
            } else {
                // A watched non-entry file (an include): always rebuild,
                // never cached, so cache keys stay a subset of the source
                // pattern's matches.
                inputs.push(path);
            }
        }

        if inputs.is_empty() {
            return;
        }

        state.in_flight = Some(tracked);

        let transform = Arc::clone(&state.worker.transform);
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = transform.run(&inputs);
            if tx
                .blocking_send(RuntimeEvent::BuildFinished { category, result })
                .is_err()
            {
                debug!(category = %category, "runtime gone; dropping build result");
            }
        });
    }
}
