use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::error::MatterError;

/// Idempotent `mkdir -p`. Succeeds when the directory already exists;
/// anything else surfaces as an explicit artifact I/O error naming the path.
pub fn ensure_dir(path: &Path) -> Result<(), MatterError> {
    fs::create_dir_all(path).map_err(|source| MatterError::ArtifactIo {
        path: path.to_path_buf(),
        source,
    })
}

/// Write bytes via a temp file + rename so readers never observe a
/// half-written file. The parent directory is fsynced after the rename.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<(), MatterError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0);
    let pid = std::process::id();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("tmpfile");
    let tmp = path.with_file_name(format!(".{}.tmp.{}.{}", name, pid, micros));
    let wrap = |source: std::io::Error| MatterError::ArtifactIo {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(&tmp).map_err(wrap)?;
    file.write_all(bytes).map_err(wrap)?;
    file.sync_all().map_err(wrap)?;
    fs::rename(&tmp, path).map_err(wrap)?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

/// Pretty JSON (2-space indent) with a trailing newline.
pub fn atomic_write_json_pretty(path: &Path, value: &Value) -> Result<(), MatterError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    atomic_write_bytes(path, &bytes)
}
