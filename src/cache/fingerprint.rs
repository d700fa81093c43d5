// src/cache/fingerprint.rs

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

/// Compute the content fingerprint of a single source file.
///
/// Streaming blake3 over the contents, hex encoded. Contents rather than
/// mtime: editors rewrite files without changing them, and mtime granularity
/// misses rapid successive edits.
pub fn file_fingerprint(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("opening file for fingerprinting: {:?}", path))?;

    let mut hasher = Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
