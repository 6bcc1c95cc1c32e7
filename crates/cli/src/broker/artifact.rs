// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ephemeral secret files.

#[cfg(unix)]
use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::warn;

use crate::error::{FetchError, Result};

/// Owner read/write.
pub const SECRET_MODE: u32 = 0o600;
/// Owner read/write/execute, for helper scripts.
pub const SCRIPT_MODE: u32 = 0o700;

/// At most one temp file of a given kind, created on first use.
///
/// The file descriptor is closed right after writing, so the path can be
/// handed to other processes (including exec'd as a script).
#[derive(Debug)]
pub struct ArtifactSlot {
    prefix: &'static str,
    file: Option<TempPath>,
}

impl ArtifactSlot {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, file: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Create-or-return-existing. `contents` is ignored when the file
    /// already exists.
    pub fn get_or_create(&mut self, dir: &Path, contents: &str, mode: u32) -> Result<PathBuf> {
        if let Some(ref path) = self.file {
            return Ok(path.to_path_buf());
        }
        let path = write_private_file(dir, self.prefix, contents, mode)?;
        let owned = path.to_path_buf();
        self.file = Some(path);
        Ok(owned)
    }

    /// Delete the file if one was created. Failures are logged, not returned.
    pub fn release(&mut self) {
        if let Some(path) = self.file.take() {
            let shown = path.display().to_string();
            if let Err(e) = path.close() {
                warn!(path = %shown, "error removing auth temp file: {e}");
            }
        }
    }
}

/// Write `contents` to a fresh file under `dir`, restricted to `mode` from
/// the moment it exists. On a failed write the partial file is removed.
fn write_private_file(dir: &Path, prefix: &str, contents: &str, mode: u32) -> Result<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(mode));
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = builder
        .tempfile_in(dir)
        .map_err(|e| FetchError::io(format!("failed to create {prefix}* in {}", dir.display()), e))?;
    let shown = file.path().display().to_string();
    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| FetchError::io(format!("failed to write {shown}"), e))?;
    Ok(file.into_temp_path())
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
