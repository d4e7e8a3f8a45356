//! Engine configuration
//!
//! Values are layered, lowest precedence first:
//!
//! 1. Hardcoded defaults
//! 2. A TOML file (`--config <file>`)
//! 3. `MASK_CONSENSUS_*` environment variables
//! 4. Command-line flags, applied by the CLI on top of the loaded value

use crate::error::{ConsensusError, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "MASK_CONSENSUS_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Root holding `<location>/*_<location>_<date>.tar.gz`
    pub source_root: PathBuf,
    /// Root for `<location>/combined/`; falls back to `source_root`
    pub output_root: Option<PathBuf>,
    /// Suffix of the mask entry inside a job archive
    pub mask_extension: String,
    /// Concurrent extraction/aggregation workers
    pub max_parallel: usize,
    /// Key shards per vote accumulator
    pub shards: usize,
    /// Parent directory for per-run scratch space
    pub scratch_dir: Option<PathBuf>,
    /// Log filter override (e.g. `debug`, `mask_consensus=trace`)
    pub log_level: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("New_Data"),
            output_root: None,
            mask_extension: ".mask.json".to_string(),
            max_parallel: 4,
            shards: 16,
            scratch_dir: None,
            log_level: None,
        }
    }
}

impl EngineConfig {
    /// Defaults, then `file` if given, then the process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConsensusError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                "failed to read configuration file",
                Some(path.to_path_buf()),
            )
            .with_source(e)
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConsensusError::Config {
                code,
                message,
                source,
                ..
            } => ConsensusError::Config {
                code,
                message,
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ConsensusError::config_with_code(
                ErrorCode::CONFIG_PARSE_ERROR,
                "invalid configuration",
                None,
            )
            .with_source(e)
        })
    }

    /// Apply `MASK_CONSENSUS_*` overrides read through `lookup`
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(root) = var("SOURCE_ROOT") {
            self.source_root = PathBuf::from(root);
        }
        if let Some(root) = var("OUTPUT_ROOT") {
            self.output_root = Some(PathBuf::from(root));
        }
        if let Some(ext) = var("MASK_EXTENSION") {
            self.mask_extension = ext;
        }
        if let Some(n) = var("MAX_PARALLEL") {
            self.max_parallel = parse_count("MAX_PARALLEL", &n)?;
        }
        if let Some(n) = var("SHARDS") {
            self.shards = parse_count("SHARDS", &n)?;
        }
        if let Some(dir) = var("SCRATCH_DIR") {
            self.scratch_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = Some(level);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| {
            ConsensusError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("{} {}", field, reason),
                None,
            )
        };
        if self.max_parallel == 0 {
            return Err(invalid("max_parallel", "must be at least 1"));
        }
        if self.shards == 0 {
            return Err(invalid("shards", "must be at least 1"));
        }
        if self.mask_extension.trim().is_empty() {
            return Err(invalid("mask_extension", "must not be empty"));
        }
        Ok(())
    }

    /// Root of persisted consensus masks
    pub fn output_root(&self) -> &Path {
        self.output_root.as_deref().unwrap_or(&self.source_root)
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|e| {
        ConsensusError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("{}{}='{}' is not a count", ENV_PREFIX, name, value),
            None,
        )
        .with_source(e)
    })
}
