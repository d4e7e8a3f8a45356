//! Ternary labels and the two threshold tables that produce them
//!
//! Raw job labels are mapped onto the vote scale by [`normalize`]; summed
//! votes are mapped back onto consensus labels by [`resolve`]. Both tables
//! use the same cutoffs, but they are kept separate because they apply to
//! different domains: `resolve(-1)` is `Absent`, so a consensus label fed back
//! in as a single vote is not a fixed point.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Fill value for cells of a class that never received a vote
///
/// Distinct from every label value so readers can tell "no vote" apart from
/// an undefined consensus.
pub const UNVOTED: i64 = i64::MIN;

/// A value on the ternary scale shared by votes and consensus labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Label {
    Undefined,
    Absent,
    Present,
}

impl Label {
    /// Stored integer encoding
    pub fn value(self) -> i64 {
        match self {
            Self::Undefined => -1,
            Self::Absent => 0,
            Self::Present => 1,
        }
    }

    /// Read a stored consensus cell; `UNVOTED` and anything outside the
    /// ternary scale carry no label
    pub fn from_stored(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::Undefined),
            0 => Some(Self::Absent),
            1 => Some(Self::Present),
            _ => None,
        }
    }
}

impl From<Label> for i64 {
    fn from(label: Label) -> Self {
        label.value()
    }
}

impl TryFrom<i64> for Label {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Label::from_stored(value).ok_or_else(|| format!("{} is not a ternary label", value))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

fn threshold(value: i64) -> Label {
    match value.cmp(&0) {
        Ordering::Less => Label::Absent,
        Ordering::Equal => Label::Undefined,
        Ordering::Greater => Label::Present,
    }
}

/// Map a raw job label onto the vote scale
///
/// | raw   | vote |
/// |-------|------|
/// | < 0   | 0    |
/// | == 0  | -1   |
/// | > 0   | 1    |
pub fn normalize(raw: i64) -> Label {
    threshold(raw)
}

/// Map a summed vote onto a consensus label
///
/// | sum   | label |
/// |-------|-------|
/// | < 0   | 0     |
/// | == 0  | -1    |
/// | > 0   | 1     |
///
/// Ties, including any mix of votes that cancels out, resolve to undefined.
pub fn resolve(sum: i64) -> Label {
    threshold(sum)
}
