//! Job archive discovery for a (location, date) pair

use crate::error::{ConsensusError, ErrorCode, Result};
use glob::Pattern;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Suffix shared by every job archive
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Finds `<source_root>/<location>/*_<location>_<date>.tar.gz`
#[derive(Debug, Clone)]
pub struct JobLocator {
    source_root: PathBuf,
}

impl JobLocator {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    /// Glob pattern for a location's archives on a date, with every literal
    /// component escaped
    pub fn pattern(&self, location: &str, date: &str) -> String {
        let dir = self.source_root.join(location);
        format!(
            "{}/*_{}_{}{}",
            Pattern::escape(&dir.to_string_lossy()),
            Pattern::escape(location),
            Pattern::escape(date),
            ARCHIVE_SUFFIX
        )
    }

    /// Archive paths in lexical order; an empty result is not an error
    pub fn locate(&self, location: &str, date: &str) -> Result<Vec<PathBuf>> {
        validate_component("location", location)?;
        validate_component("date", date)?;

        let pattern = self.pattern(location, date);
        debug!("Looking for job archives matching {}", pattern);

        let entries = glob::glob(&pattern).map_err(|e| {
            ConsensusError::discovery(
                ErrorCode::DISCOVERY_BAD_PATTERN,
                format!("invalid archive pattern {}", pattern),
                Some(location.to_string()),
            )
            .with_source(e)
        })?;

        let mut archives = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => archives.push(path),
                Ok(path) => debug!("Ignoring non-file match {}", path.display()),
                Err(e) => {
                    warn!("Unreadable path while listing job archives: {}", e);
                    return Err(ConsensusError::discovery(
                        ErrorCode::DISCOVERY_IO_ERROR,
                        format!("failed to list {}", e.path().display()),
                        Some(location.to_string()),
                    )
                    .with_source(e.into_error()));
                }
            }
        }
        archives.sort();
        Ok(archives)
    }
}

/// Location ids and dates name a directory and part of a file name; they must
/// not be empty or carry path separators
pub fn validate_component(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed != value {
        return Err(ConsensusError::validation(
            ErrorCode::VALIDATION_INVALID_ARGUMENT,
            format!("{} must be a non-empty value without surrounding spaces", field),
            Some(field.to_string()),
        ));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ConsensusError::validation(
            ErrorCode::VALIDATION_INVALID_ARGUMENT,
            format!("{} '{}' must not contain path separators", field, value),
            Some(field.to_string()),
        ));
    }
    Ok(())
}
