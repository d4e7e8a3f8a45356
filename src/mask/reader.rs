//! Turn a mask container into a lazy stream of keyed votes

use super::container::MaskContainer;
use super::grid::{DatasetCheck, Grid, Shape, SkipReason};
use super::label::{normalize, Label};
use crate::error::{ConsensusError, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Identifies one pixel of one class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoteKey {
    pub class: Arc<str>,
    pub row: usize,
    pub col: usize,
}

impl VoteKey {
    pub fn new(class: impl Into<Arc<str>>, row: usize, col: usize) -> Self {
        Self {
            class: class.into(),
            row,
            col,
        }
    }
}

impl fmt::Display for VoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}]", self.class, self.row, self.col)
    }
}

/// How cell values of a source become votes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Raw job labels, normalized per cell
    Job,
    /// A previous consensus mask; stored labels are votes as-is
    Consensus,
}

/// One readable mask feeding the aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSource {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl MaskSource {
    pub fn job(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: SourceKind::Job,
        }
    }

    pub fn consensus(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: SourceKind::Consensus,
        }
    }
}

/// A dataset left out of the vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDataset {
    pub path: PathBuf,
    pub class: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Result of reading one source
#[derive(Debug)]
pub struct MaskRead {
    pub votes: MaskVotes,
    pub skipped: Vec<SkippedDataset>,
}

/// Read a source, admitting only rectangular datasets
///
/// When `expected` is set, a rectangular dataset of any other shape is a
/// fatal mismatch rather than a skip.
pub fn read_mask(source: &MaskSource, expected: Option<Shape>) -> Result<MaskRead> {
    let container = MaskContainer::open(&source.path)?;
    from_container(container, &source.path, source.kind, expected)
}

pub(crate) fn from_container(
    container: MaskContainer,
    path: &Path,
    kind: SourceKind,
    expected: Option<Shape>,
) -> Result<MaskRead> {
    let mut grids = Vec::new();
    let mut skipped = Vec::new();

    for (class, check) in container.into_checked() {
        match check {
            DatasetCheck::Rectangular(grid) => {
                if let Some(shape) = expected {
                    if grid.shape() != shape {
                        return Err(ConsensusError::shape_mismatch(
                            path,
                            &class,
                            shape,
                            grid.shape(),
                        ));
                    }
                }
                grids.push((Arc::<str>::from(class), grid));
            }
            DatasetCheck::Skip(reason) => {
                debug!(
                    "Skipping dataset '{}' in {}: {}",
                    class,
                    path.display(),
                    reason
                );
                skipped.push(SkippedDataset {
                    path: path.to_path_buf(),
                    class,
                    reason,
                });
            }
        }
    }

    Ok(MaskRead {
        votes: MaskVotes::new(grids, kind),
        skipped,
    })
}

/// Lazy per-pixel vote stream over the admitted grids of one source
#[derive(Debug)]
pub struct MaskVotes {
    grids: Vec<(Arc<str>, Grid)>,
    kind: SourceKind,
    grid: usize,
    cell: usize,
}

impl MaskVotes {
    fn new(grids: Vec<(Arc<str>, Grid)>, kind: SourceKind) -> Self {
        Self {
            grids,
            kind,
            grid: 0,
            cell: 0,
        }
    }

    /// Classes with at least one admitted grid
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.grids.iter().map(|(class, _)| class.as_ref())
    }
}

impl Iterator for MaskVotes {
    type Item = (VoteKey, Label);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (class, grid) = self.grids.get(self.grid)?;
            if self.cell >= grid.len() {
                self.grid += 1;
                self.cell = 0;
                continue;
            }

            let index = self.cell;
            self.cell += 1;
            let value = grid.cells()[index];
            let label = match self.kind {
                SourceKind::Job => Some(normalize(value)),
                SourceKind::Consensus => Label::from_stored(value),
            };
            if let Some(label) = label {
                let (row, col) = grid.shape().coords(index);
                return Some((VoteKey::new(class.clone(), row, col), label));
            }
        }
    }
}
