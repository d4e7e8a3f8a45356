//! Consensus engine
//!
//! A run folds every job mask of one (location, date) into the location's
//! consensus mask. It moves through the phases of [`RunPhase`] in order and
//! either publishes a new mask and metadata together or leaves the store as
//! it was.

pub mod context;
pub mod orchestrator;
pub mod phase;

pub use context::AggregationContext;
pub use orchestrator::Engine;
pub use phase::{PhaseObserver, PhaseRecord, PhaseTracker, RunPhase};

use crate::error::{ConsensusError, ErrorCode, Result};
use crate::jobs::validate_component;
use crate::mask::{Shape, SkippedDataset};
use serde::Serialize;
use std::fmt;

/// Input of one engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineRequest {
    pub location: String,
    pub date: String,
    /// Classes to record even if no job votes for them
    pub classes: Vec<String>,
}

impl CombineRequest {
    pub fn new(location: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            date: date.into(),
            classes: Vec::new(),
        }
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes.extend(classes.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_component("location", &self.location)?;
        validate_component("date", &self.date)?;
        if let Some(bad) = self
            .classes
            .iter()
            .find(|c| c.is_empty() || c.trim() != c.as_str())
        {
            return Err(ConsensusError::validation(
                ErrorCode::VALIDATION_INVALID_ARGUMENT,
                format!("class name '{}' is empty or padded with whitespace", bad),
                Some("classes".to_string()),
            ));
        }
        Ok(())
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub location: String,
    pub date: String,
    /// Job masks folded in by this run
    pub new_jobs: u64,
    /// Job masks folded in across all runs
    pub total_jobs: u64,
    /// Sources read, including a prior consensus mask
    pub sources: usize,
    pub classes: Vec<String>,
    pub shape: Shape,
    pub skipped_datasets: Vec<SkippedDataset>,
    pub phases: Vec<PhaseRecord>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Location {} ({})", self.location, self.date)?;
        writeln!(
            f,
            "  jobs:    {} new, {} total",
            self.new_jobs, self.total_jobs
        )?;
        writeln!(f, "  sources: {}", self.sources)?;
        writeln!(f, "  classes: [{}]", self.classes.join(", "))?;
        write!(f, "  shape:   {}", self.shape)?;
        if !self.skipped_datasets.is_empty() {
            write!(f, "\n  skipped: {} dataset(s)", self.skipped_datasets.len())?;
            for skipped in &self.skipped_datasets {
                write!(
                    f,
                    "\n    {} in {}: {}",
                    skipped.class,
                    skipped.path.display(),
                    skipped.reason
                )?;
            }
        }
        Ok(())
    }
}
