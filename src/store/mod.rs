//! Persisted consensus mask and metadata
//!
//! Layout under `<output_root>/<location>/combined/`:
//!
//! ```text
//! CURRENT                  name of the live snapshot
//! snap-<uuid>/
//!     combined_mask.json   one 2D dataset per known class
//!     meta.json            jobs, classes, shape
//! .lock                    present while a writer holds the location
//! ```
//!
//! A writer stages both files in a fresh directory, renames it into a
//! snapshot and then swaps `CURRENT` with an atomic rename. Readers resolve
//! `CURRENT` first, so the mask and metadata they see always come from the
//! same run. The superseded snapshot is kept until the next write so that a
//! reader that resolved it just before the swap can still open it.

pub mod lock;
pub mod metadata;

pub use lock::{LocationLock, LockInfo, LOCK_FILE};
pub use metadata::{Metadata, META_FILE};

use crate::error::{ConsensusError, ErrorCode, Result};
use crate::jobs::validate_component;
use crate::mask::{write_container, DatasetCheck, Grid, Label, MaskContainer, Shape, VoteKey, UNVOTED};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const COMBINED_DIR: &str = "combined";
pub const MASK_FILE: &str = "combined_mask.json";
pub const CURRENT_FILE: &str = "CURRENT";
const SNAPSHOT_PREFIX: &str = "snap-";
const STAGING_PREFIX: &str = ".staging-";

/// Prior state of a location as seen by a run
#[derive(Debug, Clone, Default)]
pub struct StoredState {
    pub metadata: Metadata,
    /// Live consensus mask, if the location was combined before
    pub mask_path: Option<PathBuf>,
    pub snapshot: Option<String>,
}

impl StoredState {
    pub fn shape(&self) -> Option<Shape> {
        self.metadata.shape
    }
}

/// A fully loaded consensus mask for consumers
#[derive(Debug, Clone)]
pub struct ConsensusSnapshot {
    pub metadata: Metadata,
    pub grids: BTreeMap<String, Grid>,
}

impl ConsensusSnapshot {
    /// Grid of a recorded class
    pub fn class_grid(&self, class: &str) -> Result<&Grid> {
        if !self.metadata.classes.contains(class) {
            return Err(ConsensusError::unknown_class(class, &self.metadata.classes));
        }
        self.grids.get(class).ok_or_else(|| {
            ConsensusError::store(
                ErrorCode::STORE_CORRUPTED,
                format!("class '{}' is recorded but has no 2D dataset", class),
                None,
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct MaskStore {
    output_root: PathBuf,
}

impl MaskStore {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn location_dir(&self, location: &str) -> PathBuf {
        self.output_root.join(location).join(COMBINED_DIR)
    }

    /// Read the live metadata and mask location; defaults when never combined
    pub fn load(&self, location: &str) -> Result<StoredState> {
        validate_component("location", location)?;
        let dir = self.location_dir(location);
        let Some(snapshot) = read_current(&dir)? else {
            debug!("No prior consensus for location {}", location);
            return Ok(StoredState::default());
        };

        let snapshot_dir = dir.join(&snapshot);
        let meta_path = snapshot_dir.join(META_FILE);
        let mask_path = snapshot_dir.join(MASK_FILE);
        if !meta_path.is_file() || !mask_path.is_file() {
            return Err(ConsensusError::store(
                ErrorCode::STORE_CORRUPTED,
                format!("snapshot {} named by CURRENT is incomplete", snapshot),
                Some(snapshot_dir),
            ));
        }

        let body = fs::read_to_string(&meta_path).map_err(|e| io_err("failed to read metadata", &meta_path, e))?;
        let metadata: Metadata = serde_json::from_str(&body).map_err(|e| {
            ConsensusError::store(
                ErrorCode::STORE_SERIALIZATION_ERROR,
                "metadata is not valid JSON",
                Some(meta_path.clone()),
            )
            .with_source(e)
        })?;

        Ok(StoredState {
            metadata,
            mask_path: Some(mask_path),
            snapshot: Some(snapshot),
        })
    }

    /// Load the live consensus mask with its metadata
    pub fn read_consensus(&self, location: &str) -> Result<ConsensusSnapshot> {
        let state = self.load(location)?;
        let Some(mask_path) = state.mask_path else {
            return Err(ConsensusError::not_aggregated(location));
        };

        let grids = MaskContainer::open(&mask_path)?
            .into_checked()
            .filter_map(|(class, check)| match check {
                DatasetCheck::Rectangular(grid) => Some((class, grid)),
                DatasetCheck::Skip(reason) => {
                    warn!("Consensus dataset '{}' unreadable: {}", class, reason);
                    None
                }
            })
            .collect();

        Ok(ConsensusSnapshot {
            metadata: state.metadata,
            grids,
        })
    }

    /// Take the writer lock for a location
    pub fn lock(&self, location: &str) -> Result<LocationLock> {
        validate_component("location", location)?;
        LocationLock::acquire(&self.location_dir(location), location)
    }

    /// Start a new snapshot for the locked location
    pub fn stage<'a>(&self, lock: &'a LocationLock) -> Result<SnapshotWriter<'a>> {
        let staging = lock
            .dir()
            .join(format!("{}{}", STAGING_PREFIX, Uuid::new_v4()));
        fs::create_dir(&staging).map_err(|e| io_err("failed to create staging directory", &staging, e))?;
        debug!("Staging snapshot in {}", staging.display());
        Ok(SnapshotWriter {
            lock,
            staging,
            mask_written: false,
            metadata_written: false,
            committed: false,
        })
    }
}

/// Allocate one grid per class, filled with [`UNVOTED`], and place every
/// resolved label
pub fn build_grids<I>(classes: &BTreeSet<String>, shape: Shape, resolved: I) -> Result<BTreeMap<String, Grid>>
where
    I: IntoIterator<Item = (VoteKey, Label)>,
{
    let mut grids: BTreeMap<String, Grid> = classes
        .iter()
        .map(|class| (class.clone(), Grid::filled(shape, UNVOTED)))
        .collect();

    for (key, label) in resolved {
        let grid = grids.get_mut(&*key.class).ok_or_else(|| {
            ConsensusError::aggregation(
                ErrorCode::AGG_UNKNOWN_CLASS,
                format!("resolved label {} belongs to no known class", key),
                None,
            )
        })?;
        if !grid.set(key.row, key.col, label.value()) {
            return Err(ConsensusError::aggregation(
                ErrorCode::AGG_OUT_OF_BOUNDS,
                format!("resolved label {} lies outside shape {}", key, shape),
                None,
            ));
        }
    }
    Ok(grids)
}

/// Staged snapshot; becomes visible only through [`SnapshotWriter::commit`]
#[derive(Debug)]
pub struct SnapshotWriter<'a> {
    lock: &'a LocationLock,
    staging: PathBuf,
    mask_written: bool,
    metadata_written: bool,
    committed: bool,
}

impl<'a> SnapshotWriter<'a> {
    pub fn write_mask(&mut self, grids: &BTreeMap<String, Grid>) -> Result<()> {
        write_container(&self.staging.join(MASK_FILE), grids)?;
        self.mask_written = true;
        Ok(())
    }

    pub fn write_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        let path = self.staging.join(META_FILE);
        let body = serde_json::to_vec_pretty(metadata).map_err(|e| {
            ConsensusError::store(
                ErrorCode::STORE_SERIALIZATION_ERROR,
                "failed to encode metadata",
                Some(path.clone()),
            )
            .with_source(e)
        })?;
        write_synced(&path, &body)?;
        self.metadata_written = true;
        Ok(())
    }

    /// Publish the snapshot by swapping `CURRENT`
    pub fn commit(mut self) -> Result<PathBuf> {
        if !self.mask_written || !self.metadata_written {
            return Err(ConsensusError::store(
                ErrorCode::STORE_GENERIC,
                "snapshot needs both the mask and the metadata before commit",
                Some(self.staging.clone()),
            ));
        }

        let dir = self.lock.dir().to_path_buf();
        let previous = read_current(&dir)?;
        let name = format!("{}{}", SNAPSHOT_PREFIX, Uuid::new_v4());
        let snapshot_dir = dir.join(&name);
        fs::rename(&self.staging, &snapshot_dir)
            .map_err(|e| io_err("failed to publish snapshot directory", &snapshot_dir, e))?;
        self.committed = true;

        let pending = dir.join(format!("{}.tmp", CURRENT_FILE));
        write_synced(&pending, format!("{}\n", name).as_bytes())?;
        let current = dir.join(CURRENT_FILE);
        fs::rename(&pending, &current).map_err(|e| io_err("failed to swap CURRENT", &current, e))?;
        if let Ok(handle) = File::open(&dir) {
            let _ = handle.sync_all();
        }

        info!(
            "Published snapshot {} for location {}",
            name,
            self.lock.location()
        );
        prune(&dir, &name, previous.as_deref());
        Ok(snapshot_dir)
    }
}

impl Drop for SnapshotWriter<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.staging) {
            if e.kind() != ErrorKind::NotFound {
                warn!(
                    "Failed to remove abandoned staging directory {}: {}",
                    self.staging.display(),
                    e
                );
            }
        }
    }
}

fn read_current(dir: &Path) -> Result<Option<String>> {
    let path = dir.join(CURRENT_FILE);
    let body = match fs::read_to_string(&path) {
        Ok(body) => body,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err("failed to read CURRENT", &path, e)),
    };
    let name = body.trim();
    if !name.starts_with(SNAPSHOT_PREFIX) || name.contains(['/', '\\']) {
        return Err(ConsensusError::store(
            ErrorCode::STORE_CORRUPTED,
            format!("CURRENT names an invalid snapshot '{}'", name),
            Some(path),
        ));
    }
    Ok(Some(name.to_string()))
}

fn write_synced(path: &Path, body: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| io_err("failed to create file", path, e))?;
    file.write_all(body)
        .and_then(|_| file.sync_all())
        .map_err(|e| io_err("failed to write file", path, e))
}

/// Remove snapshots other than the live and the previous one, and staging
/// leftovers of crashed writers
fn prune(dir: &Path, live: &str, previous: Option<&str>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Skipping snapshot pruning in {}: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let stale_snapshot =
            name.starts_with(SNAPSHOT_PREFIX) && name != live && Some(name.as_str()) != previous;
        if !(stale_snapshot || name.starts_with(STAGING_PREFIX)) {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => debug!("Pruned {}", entry.path().display()),
            Err(e) => warn!("Failed to prune {}: {}", entry.path().display(), e),
        }
    }
}

fn io_err(message: &str, path: &Path, source: std::io::Error) -> ConsensusError {
    ConsensusError::store(ErrorCode::STORE_IO_ERROR, message, Some(path.to_path_buf())).with_source(source)
}
