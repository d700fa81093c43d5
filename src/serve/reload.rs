// src/serve/reload.rs

//! WebSocket live-reload channel.
//!
//! A plain TCP acceptor upgrades connections with `tungstenite` and parks
//! them in a shared client pool; a broadcaster thread drains reload requests
//! from a channel and pushes a `reload` text frame to every client, dropping
//! the ones that went away. Served pages connect via the embedded client
//! script below.

use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

/// URL path the HTTP server serves the client script from.
pub const RELOAD_SCRIPT_PATH: &str = "/__assetpipe/reload.js";

/// Maximum port retry attempts when the preferred port is taken.
const MAX_PORT_RETRIES: u16 = 10;

const CLIENT_JS: &str = r#"(function () {
  function connect() {
    var socket = new WebSocket("ws://" + location.hostname + ":__WS_PORT__/");
    socket.onmessage = function (ev) {
      if (ev.data === "reload") location.reload();
    };
    socket.onclose = function () {
      setTimeout(connect, 1000);
    };
  }
  connect();
})();
"#;

/// The client script with the WebSocket port substituted in.
pub fn client_script(ws_port: u16) -> String {
    CLIENT_JS.replace("__WS_PORT__", &ws_port.to_string())
}

pub type ClientPool = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Bind the reload listener (retrying on busy ports), then spawn the
/// acceptor and broadcaster threads. Returns the port actually bound.
pub fn spawn_reload_server(
    host: &str,
    base_port: u16,
    clients: ClientPool,
    reload_rx: Receiver<()>,
) -> Result<u16> {
    let (listener, port) = bind_with_retry(host, base_port)?;

    let acceptor_clients = Arc::clone(&clients);
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => match tungstenite::accept(stream) {
                    Ok(ws) => {
                        let Ok(mut pool) = acceptor_clients.lock() else {
                            warn!("reload client pool poisoned; dropping connection");
                            continue;
                        };
                        pool.push(ws);
                        debug!(clients = pool.len(), "reload client connected");
                    }
                    Err(err) => debug!("reload handshake failed: {err}"),
                },
                Err(err) => warn!("reload accept error: {err}"),
            }
        }
    });

    std::thread::spawn(move || {
        while reload_rx.recv().is_ok() {
            broadcast(&clients);
        }
        debug!("reload broadcaster stopped (channel closed)");
    });

    info!(port, "live reload listening");
    Ok(port)
}

/// Send `reload` to every connected client, dropping dead connections.
fn broadcast(clients: &ClientPool) {
    let Ok(mut pool) = clients.lock() else {
        warn!("reload client pool poisoned; skipping broadcast");
        return;
    };

    let before = pool.len();
    pool.retain_mut(|ws| ws.send(Message::Text("reload".to_string().into())).is_ok());

    debug!(
        notified = pool.len(),
        dropped = before - pool.len(),
        "reload broadcast"
    );
}

/// Try binding to a port, retrying with incremented ports if in use.
pub(crate) fn bind_with_retry(host: &str, base_port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("{host}:{port}")) {
            Ok(listener) => {
                let actual = listener.local_addr()?.port();
                return Ok((listener, actual));
            }
            Err(err) => {
                last_error = Some(err);
            }
        }
    }

    Err(anyhow!(
        "failed to bind {host} after {MAX_PORT_RETRIES} attempts starting at port {base_port}: {}",
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
