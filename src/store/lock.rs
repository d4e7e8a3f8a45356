//! Exclusive per-location writer lock

use crate::error::{ConsensusError, ErrorCode, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub const LOCK_FILE: &str = ".lock";

/// Contents of a lock file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub location: String,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub token: String,
}

/// Lock guard that removes the lock file when dropped
#[derive(Debug)]
pub struct LocationLock {
    info: LockInfo,
    lock_file: PathBuf,
    dir: PathBuf,
    /// Directories created by `acquire`, deepest first
    created: Vec<PathBuf>,
}

impl LocationLock {
    /// Take the lock for `location` in `dir`, failing if another writer holds it
    pub fn acquire(dir: &Path, location: &str) -> Result<Self> {
        let created: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        std::fs::create_dir_all(dir).map_err(|e| {
            ConsensusError::store(
                ErrorCode::STORE_IO_ERROR,
                "failed to create location directory",
                Some(dir.to_path_buf()),
            )
            .with_source(e)
        })?;

        let lock_file = dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_file)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ConsensusError::location_busy(lock_file))
            }
            Err(e) => {
                return Err(ConsensusError::store(
                    ErrorCode::STORE_IO_ERROR,
                    "failed to create lock file",
                    Some(lock_file),
                )
                .with_source(e))
            }
        };

        let info = LockInfo {
            location: location.to_string(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
            token: Uuid::new_v4().to_string(),
        };
        let lock = Self {
            info,
            lock_file,
            dir: dir.to_path_buf(),
            created,
        };

        // Dropping `lock` on any error below removes the file again
        let body = serde_json::to_vec_pretty(&lock.info).map_err(|e| {
            ConsensusError::store(
                ErrorCode::STORE_SERIALIZATION_ERROR,
                "failed to encode lock info",
                Some(lock.lock_file.clone()),
            )
            .with_source(e)
        })?;
        file.write_all(&body).map_err(|e| {
            ConsensusError::store(
                ErrorCode::STORE_IO_ERROR,
                "failed to write lock file",
                Some(lock.lock_file.clone()),
            )
            .with_source(e)
        })?;

        debug!("Acquired {} for location {}", lock.lock_file.display(), location);
        Ok(lock)
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    pub fn location(&self) -> &str {
        &self.info.location
    }

    /// Directory the lock protects
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Release the lock and remove the directories `acquire` created, for a
    /// run that stopped before writing anything
    pub fn release_unused(mut self) {
        let created = std::mem::take(&mut self.created);
        drop(self);
        for dir in created {
            // Only empty directories go; stop at the first one still in use
            if std::fs::remove_dir(&dir).is_err() {
                break;
            }
            debug!("Removed unused {}", dir.display());
        }
    }
}

impl Drop for LocationLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.lock_file) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to release {}: {}", self.lock_file.display(), e);
            }
        }
    }
}
