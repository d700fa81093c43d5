// src/serve/mod.rs

//! Local dev server with live reload.
//!
//! The [`DevServer`] trait is the seam the runtime talks through: production
//! code uses [`LiveServer`] (tiny_http static serving plus a tungstenite
//! reload channel); tests can substitute an implementation that just records
//! calls.

pub mod http;
pub mod reload;

use std::path::Path;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::config::model::ServeSection;
use crate::errors::Result;

/// The browser-facing collaborator: serves the build output and pushes
/// reload notifications after rebuilds.
pub trait DevServer: Send + Sync {
    /// Start serving `root` as static content.
    ///
    /// Called exactly once, and only after the initial full build has
    /// completed for every category; starting earlier would serve a
    /// partially-built output directory.
    fn start(&self, root: &Path) -> Result<()>;

    /// Ask connected clients to refresh. Fire-and-forget; never blocks.
    fn reload(&self);
}

/// Production dev server: static files over HTTP, reloads over WebSocket.
pub struct LiveServer {
    host: String,
    port: u16,
    reload_port: u16,
    clients: reload::ClientPool,
    reload_tx: Mutex<Option<Sender<()>>>,
}

impl LiveServer {
    pub fn new(serve: &ServeSection) -> Self {
        Self {
            host: serve.host.clone(),
            port: serve.port,
            reload_port: serve.reload_port,
            clients: Arc::new(Mutex::new(Vec::new())),
            reload_tx: Mutex::new(None),
        }
    }
}

impl DevServer for LiveServer {
    fn start(&self, root: &Path) -> Result<()> {
        let (tx, rx) = channel::<()>();

        let ws_port =
            reload::spawn_reload_server(&self.host, self.reload_port, Arc::clone(&self.clients), rx)?;
        http::spawn_http_server(&self.host, self.port, root.to_path_buf(), ws_port)?;

        if let Ok(mut guard) = self.reload_tx.lock() {
            *guard = Some(tx);
        }
        Ok(())
    }

    fn reload(&self) {
        let Ok(guard) = self.reload_tx.lock() else {
            warn!("reload sender poisoned; skipping reload");
            return;
        };
        if let Some(tx) = guard.as_ref() {
            // Receiver lives in the broadcaster thread; an error just means
            // the server is gone, which only happens at shutdown.
            let _ = tx.send(());
        }
    }
}
