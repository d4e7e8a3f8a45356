//! Pull the mask payload out of a job archive

use crate::error::{ConsensusError, ErrorCode, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::debug;

/// A mask payload copied out of an archive into the run's scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMask {
    /// Archive the payload came from
    pub archive: PathBuf,
    /// Entry name inside the archive
    pub entry: String,
    /// Transient copy, removed with the scratch directory
    pub path: PathBuf,
}

/// Copy the first regular entry whose name ends in `extension` into `scratch`
///
/// Returns `Ok(None)` when the archive holds no such entry.
pub fn extract_mask(archive: &Path, extension: &str, scratch: &Path) -> Result<Option<ExtractedMask>> {
    let file = File::open(archive).map_err(|e| {
        ConsensusError::extraction(
            ErrorCode::EXTRACT_OPEN_FAILED,
            "failed to open job archive",
            Some(archive.to_path_buf()),
        )
        .with_source(e)
    })?;

    let corrupt = |e: io::Error| {
        ConsensusError::extraction(
            ErrorCode::EXTRACT_CORRUPT_ARCHIVE,
            "failed to read archive entries",
            Some(archive.to_path_buf()),
        )
        .with_source(e)
    };

    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    for entry in tar.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path().map_err(corrupt)?.to_string_lossy().into_owned();
        if !name.ends_with(extension) {
            continue;
        }

        let base = Path::new(&name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mask".to_string());

        let write_err = |e: io::Error| {
            ConsensusError::extraction(
                ErrorCode::EXTRACT_WRITE_FAILED,
                format!("failed to copy entry {} into {}", name, scratch.display()),
                Some(archive.to_path_buf()),
            )
            .with_source(e)
        };

        let mut temp = tempfile::Builder::new()
            .prefix(&format!("{}.", base))
            .suffix(".part")
            .tempfile_in(scratch)
            .map_err(write_err)?;
        io::copy(&mut entry, temp.as_file_mut()).map_err(write_err)?;
        let (_, path) = temp.keep().map_err(|e| write_err(e.error))?;

        debug!(
            "Extracted {} from {} to {}",
            name,
            archive.display(),
            path.display()
        );
        return Ok(Some(ExtractedMask {
            archive: archive.to_path_buf(),
            entry: name,
            path,
        }));
    }

    Ok(None)
}
