// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot file: load/save the full job array as one JSON document.

use lsh_core::{Job, JobStatus};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from snapshot operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The on-disk snapshot: a top-level JSON array of job records with
/// owner-only permissions.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, normalizing jobs that claimed a live process.
    ///
    /// A missing, empty, or malformed file yields an empty store — a
    /// later successful save overwrites whatever was there. Jobs loaded
    /// as `running` or `paused` are rewritten to `stopped`: the child did
    /// not survive the daemon, and the recorded pid is stale.
    pub fn load(&self) -> Vec<Job> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read snapshot");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        let mut jobs: Vec<Job> = match serde_json::from_str(&raw) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "malformed snapshot, starting empty"
                );
                return Vec::new();
            }
        };
        for job in &mut jobs {
            if job.status.is_live() {
                debug!(job_id = %job.id, status = %job.status, "normalizing loaded job to stopped");
                job.status = JobStatus::Stopped;
            }
        }
        jobs
    }

    /// Write the snapshot atomically: serialize, write to a temp file with
    /// mode `0600`, then rename over the target.
    pub fn save(&self, jobs: &[Job]) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(jobs)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
