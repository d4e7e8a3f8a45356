//! Job discovery and extraction
//!
//! [`JobLocator`] enumerates a location's archives for one date and
//! [`extract_mask`] copies each archive's mask payload into the run's scratch
//! directory. [`extract_all`] runs extraction as one blocking task per
//! archive, bounded by the configured parallelism.

pub mod extractor;
pub mod locator;

pub use extractor::{extract_mask, ExtractedMask};
pub use locator::{validate_component, JobLocator, ARCHIVE_SUFFIX};

use crate::error::{ConsensusError, ErrorCode, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Extract every archive concurrently
///
/// The result keeps archive order. Archives without a mask entry are dropped
/// with a warning; any I/O failure aborts the whole extraction.
pub async fn extract_all(
    archives: Vec<PathBuf>,
    extension: &str,
    scratch: &Path,
    max_parallel: usize,
    cancel: &CancellationToken,
) -> Result<Vec<ExtractedMask>> {
    let total = archives.len();
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut futures = FuturesUnordered::new();

    for (index, archive) in archives.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ConsensusError::cancelled());
        }
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| task_failed("extraction semaphore closed", e))?;
        let extension = extension.to_string();
        let scratch = scratch.to_path_buf();

        futures.push(tokio::task::spawn_blocking(move || {
            let result = extract_mask(&archive, &extension, &scratch);
            drop(permit);
            (index, archive, result)
        }));
    }

    let mut slots: Vec<Option<ExtractedMask>> = vec![None; total];
    while let Some(joined) = futures.next().await {
        let (index, archive, result) =
            joined.map_err(|e| task_failed("extraction task panicked", e))?;
        match result? {
            Some(mask) => slots[index] = Some(mask),
            None => warn!("No mask entry in {}, skipping", archive.display()),
        }
    }

    let extracted: Vec<ExtractedMask> = slots.into_iter().flatten().collect();
    info!(
        "Extracted {} mask(s) from {} archive(s)",
        extracted.len(),
        total
    );
    Ok(extracted)
}

fn task_failed(message: &str, source: impl std::error::Error + Send + Sync + 'static) -> ConsensusError {
    ConsensusError::aggregation(ErrorCode::AGG_TASK_FAILED, message, None).with_source(source)
}
