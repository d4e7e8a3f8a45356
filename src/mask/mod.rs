//! Mask model: labels, grids, containers and the vote reader
//!
//! - [`label`] - the ternary scale with the normalizer and resolver tables
//! - [`grid`] - rectangular 2D grids and the dataset capability check
//! - [`container`] - the multi-dataset document shared by job and consensus masks
//! - [`reader`] - lazy `(key, vote)` streams over one mask source

pub mod container;
pub mod grid;
pub mod label;
pub mod reader;

pub use container::{write_container, MaskContainer};
pub use grid::{DatasetCheck, Grid, Shape, SkipReason};
pub use label::{normalize, resolve, Label, UNVOTED};
pub use reader::{read_mask, MaskRead, MaskSource, MaskVotes, SkippedDataset, SourceKind, VoteKey};
