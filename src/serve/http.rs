// src/serve/http.rs

//! Static file serving for the build output directory.
//!
//! A `tiny_http` request loop on its own thread. HTML responses get the
//! live-reload client script injected so browsers pick up rebuilds without
//! the page opting in.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Result};
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, info};

use crate::serve::reload::{client_script, RELOAD_SCRIPT_PATH};

/// Maximum port retry attempts when the preferred port is taken.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind the HTTP server (retrying on busy ports) and spawn the request loop.
/// Returns the port actually bound.
pub fn spawn_http_server(host: &str, base_port: u16, root: PathBuf, ws_port: u16) -> Result<u16> {
    let (server, port) = http_bind_with_retry(host, base_port)?;

    info!(
        "dev server on http://{host}:{port} serving {:?}",
        root
    );

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            if let Err(err) = handle_request(request, &root, ws_port) {
                debug!("request error: {err:#}");
            }
        }
        debug!("dev server request loop ended");
    });

    Ok(port)
}

fn http_bind_with_retry(host: &str, base_port: u16) -> Result<(Server, u16)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http(format!("{host}:{port}")) {
            Ok(server) => return Ok((server, port)),
            Err(err) => {
                last_error = Some(err.to_string());
            }
        }
    }

    Err(anyhow!(
        "failed to bind dev server on {host} after {MAX_PORT_RETRIES} attempts starting at port {base_port}: {}",
        last_error.unwrap_or_default()
    ))
}

fn handle_request(request: Request, root: &Path, ws_port: u16) -> Result<()> {
    let url = request.url().split('?').next().unwrap_or("/");

    if url == RELOAD_SCRIPT_PATH {
        let body = client_script(ws_port).into_bytes();
        return send(request, 200, "application/javascript", body);
    }

    let Some(path) = resolve_path(url, root) else {
        return send(request, 404, "text/plain", b"404 Not Found".to_vec());
    };

    let content_type = content_type_for(&path);
    let mut body = match fs::read(&path) {
        Ok(body) => body,
        Err(_) => return send(request, 404, "text/plain", b"404 Not Found".to_vec()),
    };

    if content_type == "text/html" {
        body = inject_reload_script(body);
    }

    send(request, 200, content_type, body)
}

/// Map a request URL onto a file under `root`.
///
/// Rejects parent-directory traversal; directories resolve to their
/// `index.html`. Returns `None` when nothing servable exists.
fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let rel = url.trim_start_matches('/');
    if Path::new(rel)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return None;
    }

    let mut path = root.join(rel);
    if path.is_dir() {
        path = path.join("index.html");
    }
    path.is_file().then_some(path)
}

/// Append the reload client script so every served page reconnects.
fn inject_reload_script(body: Vec<u8>) -> Vec<u8> {
    let tag = format!(r#"<script src="{RELOAD_SCRIPT_PATH}"></script>"#);
    let text = match String::from_utf8(body) {
        Ok(text) => text,
        // Mislabelled binary; serve it untouched.
        Err(err) => return err.into_bytes(),
    };

    let injected = if let Some(idx) = text.rfind("</body>") {
        let mut s = String::with_capacity(text.len() + tag.len());
        s.push_str(&text[..idx]);
        s.push_str(&tag);
        s.push_str(&text[idx..]);
        s
    } else {
        let mut s = text;
        s.push_str(&tag);
        s
    };

    injected.into_bytes()
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

fn send(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let header = Header::from_bytes("Content-Type", content_type)
        .map_err(|_| anyhow!("invalid content type header"))?;
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header);
    request.respond(response)?;
    Ok(())
}
