// SPDX-License-Identifier: PMPL-1.0-or-later
//
// JDB - Persistence primitives
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Directory creation, whole-file JSON reads, crash-safe JSON writes and
// identifier generation. A collection file is always replaced as a unit:
// the new contents go to `<file>.tmp`, are synced, and are then renamed over
// the target, so a reader (or a restart after a crash) sees either the old
// file or the new one, never a partial write.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::JdbResult;

/// Suffix appended to a file name for its in-progress replacement.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Create `dir` and any missing parents. Succeeds if it already exists.
pub async fn ensure_dir(dir: impl AsRef<Path>) -> JdbResult<()> {
    fs::create_dir_all(dir.as_ref()).await?;
    Ok(())
}

/// Read and parse a JSON file.
///
/// Returns `Ok(None)` when the file does not exist; every other read or
/// parse failure is an error.
pub async fn read_json<T: DeserializeOwned>(file: impl AsRef<Path>) -> JdbResult<Option<T>> {
    let file = file.as_ref();
    let bytes = match fs::read(file).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes)?;
    debug!(file = %file.display(), bytes = bytes.len(), "Read JSON file");
    Ok(Some(value))
}

/// Serialize `data` as pretty-printed JSON (2-space indent) and replace
/// `file` with it atomically.
pub async fn write_json<T: Serialize + ?Sized>(file: impl AsRef<Path>, data: &T) -> JdbResult<()> {
    let bytes = serde_json::to_vec_pretty(data)?;
    write_atomic(file, &bytes).await
}

/// Replace `file` with `bytes` via a synced sibling temp file and a rename.
///
/// The target is not touched until the rename, so a failure at any earlier
/// step leaves the previous contents intact.
pub async fn write_atomic(file: impl AsRef<Path>, bytes: &[u8]) -> JdbResult<()> {
    let file = file.as_ref();
    let temp = temp_path(file);

    let mut handle = fs::File::create(&temp).await?;
    handle.write_all(bytes).await?;
    handle.sync_all().await?;
    drop(handle);

    fs::rename(&temp, file).await?;
    debug!(file = %file.display(), bytes = bytes.len(), "Replaced file");
    Ok(())
}

/// The temp-file path used while replacing `file`: `<file>.tmp`.
pub fn temp_path(file: &Path) -> PathBuf {
    let mut name = OsString::from(file.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// A new random (v4) UUID in hyphenated form.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
