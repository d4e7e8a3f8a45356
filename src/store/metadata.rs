//! Per-location metadata record

use crate::mask::Shape;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// File name of the metadata record inside a snapshot
pub const META_FILE: &str = "meta.json";

/// Accumulated facts about a location's consensus mask
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Job masks folded in across all runs
    #[serde(default)]
    pub jobs: u64,
    /// Every class ever observed or requested
    #[serde(default)]
    pub classes: BTreeSet<String>,
    /// Image shape, fixed by the first job mask
    #[serde(default)]
    pub shape: Option<Shape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Record after a run that folded in `new_jobs` job masks
    pub fn advance(&self, new_jobs: u64, classes: BTreeSet<String>, shape: Shape) -> Self {
        let mut merged = self.classes.clone();
        merged.extend(classes);
        Self {
            jobs: self.jobs + new_jobs,
            classes: merged,
            shape: Some(shape),
            updated_at: Some(Utc::now()),
        }
    }
}
