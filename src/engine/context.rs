//! Per-run aggregation context

use crate::mask::Shape;
use crate::store::{Metadata, StoredState};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Everything one run knows about its location
///
/// Built fresh for each run and handed from phase to phase, so runs for
/// different locations share nothing.
#[derive(Debug, Clone)]
pub struct AggregationContext {
    pub location: String,
    pub date: String,
    /// Metadata as loaded before the run
    pub prior: Metadata,
    /// Live consensus mask of the location, if any
    pub prior_mask: Option<PathBuf>,
    pub shape: Option<Shape>,
    pub classes: BTreeSet<String>,
    /// Job masks folded in by this run
    pub new_jobs: u64,
}

impl AggregationContext {
    pub fn new(location: &str, date: &str, state: StoredState, requested: &[String]) -> Self {
        let mut classes = state.metadata.classes.clone();
        classes.extend(requested.iter().cloned());
        Self {
            location: location.to_string(),
            date: date.to_string(),
            shape: state.shape(),
            prior_mask: state.mask_path,
            prior: state.metadata,
            classes,
            new_jobs: 0,
        }
    }

    /// Metadata to persist once this run's mask is written
    pub fn next_metadata(&self, shape: Shape) -> Metadata {
        self.prior.advance(self.new_jobs, self.classes.clone(), shape)
    }
}
