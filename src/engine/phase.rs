//! Run phases and their ordering

use crate::error::{ConsensusError, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Phase of a consensus run
///
/// Phases execute strictly in declaration order and never go back:
/// LoadState → DiscoverJobs → Extract → DetermineShape → Aggregate →
/// Resolve → Write → PersistMetadata → Cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    LoadState,
    DiscoverJobs,
    Extract,
    DetermineShape,
    Aggregate,
    Resolve,
    Write,
    PersistMetadata,
    Cleanup,
}

impl RunPhase {
    pub const ALL: [RunPhase; 9] = [
        RunPhase::LoadState,
        RunPhase::DiscoverJobs,
        RunPhase::Extract,
        RunPhase::DetermineShape,
        RunPhase::Aggregate,
        RunPhase::Resolve,
        RunPhase::Write,
        RunPhase::PersistMetadata,
        RunPhase::Cleanup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::LoadState => "LOAD_STATE",
            RunPhase::DiscoverJobs => "DISCOVER_JOBS",
            RunPhase::Extract => "EXTRACT",
            RunPhase::DetermineShape => "DETERMINE_SHAPE",
            RunPhase::Aggregate => "AGGREGATE",
            RunPhase::Resolve => "RESOLVE",
            RunPhase::Write => "WRITE",
            RunPhase::PersistMetadata => "PERSIST_METADATA",
            RunPhase::Cleanup => "CLEANUP",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing of one completed phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: RunPhase,
    pub duration_ms: u64,
}

/// Callback invoked with every phase a run enters
pub type PhaseObserver = Arc<dyn Fn(RunPhase) + Send + Sync>;

/// Enforces forward-only phase transitions and records their durations
pub struct PhaseTracker {
    location: String,
    current: Option<(RunPhase, Instant)>,
    completed: Vec<PhaseRecord>,
    observer: Option<PhaseObserver>,
}

impl PhaseTracker {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            current: None,
            completed: Vec::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: PhaseObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Finish the running phase and start `next`
    ///
    /// Phases may be skipped but never repeated or revisited.
    pub fn enter(&mut self, next: RunPhase) -> Result<()> {
        let last = self
            .current
            .map(|(phase, _)| phase)
            .or_else(|| self.completed.last().map(|r| r.phase));
        if let Some(last) = last {
            if next <= last {
                return Err(ConsensusError::aggregation(
                    ErrorCode::AGG_GENERIC,
                    format!("invalid phase transition {} -> {}", last, next),
                    Some(self.location.clone()),
                ));
            }
        }
        self.finish();
        info!("[{}] {}", self.location, next);
        self.current = Some((next, Instant::now()));
        if let Some(observer) = &self.observer {
            observer(next);
        }
        Ok(())
    }

    /// Close the running phase, if any
    pub fn finish(&mut self) {
        if let Some((phase, started)) = self.current.take() {
            self.completed.push(PhaseRecord {
                phase,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }
    }

    pub fn current(&self) -> Option<RunPhase> {
        self.current.map(|(phase, _)| phase)
    }

    pub fn into_records(mut self) -> Vec<PhaseRecord> {
        self.finish();
        self.completed
    }
}

impl fmt::Debug for PhaseTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseTracker")
            .field("location", &self.location)
            .field("current", &self.current)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}
