//! Rectangular 2D integer grids and the capability check that admits them

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Image shape shared by every mask of a location, persisted as `[rows, cols]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Row-major coordinates of a flat cell index
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self { rows, cols }
    }
}

impl From<Shape> for (usize, usize) {
    fn from(shape: Shape) -> Self {
        (shape.rows, shape.cols)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}

/// Why a dataset was not admitted as a rectangular 2D grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NotAnArray,
    Empty,
    NotTwoDimensional { row: usize },
    Ragged { row: usize, expected: usize, found: usize },
    NonInteger { row: usize, col: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnArray => write!(f, "dataset is not an array"),
            Self::Empty => write!(f, "dataset has no cells"),
            Self::NotTwoDimensional { row } => {
                write!(f, "dataset is not two-dimensional (row {})", row)
            }
            Self::Ragged {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} has {} columns, expected {}",
                row, found, expected
            ),
            Self::NonInteger { row, col } => {
                write!(f, "cell ({}, {}) is not an integer", row, col)
            }
        }
    }
}

/// Outcome of inspecting one dataset
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetCheck {
    Rectangular(Grid),
    Skip(SkipReason),
}

/// A dense row-major grid of 64-bit labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    shape: Shape,
    cells: Vec<i64>,
}

impl Grid {
    /// Grid of `shape` with every cell set to `fill`
    pub fn filled(shape: Shape, fill: i64) -> Self {
        Self {
            shape,
            cells: vec![fill; shape.cells()],
        }
    }

    /// Build from rows; `None` if the rows are ragged
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Option<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let shape = Shape::new(rows.len(), cols);
        Some(Self {
            shape,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Capability check: admit `value` only if it is a non-empty array of
    /// equal-length, non-empty arrays of integers
    pub fn inspect(value: &Value) -> DatasetCheck {
        let Some(rows) = value.as_array() else {
            return DatasetCheck::Skip(SkipReason::NotAnArray);
        };
        if rows.is_empty() {
            return DatasetCheck::Skip(SkipReason::Empty);
        }

        let mut cells = Vec::new();
        let mut cols = None;
        for (r, row) in rows.iter().enumerate() {
            let Some(row) = row.as_array() else {
                return DatasetCheck::Skip(SkipReason::NotTwoDimensional { row: r });
            };
            let expected = *cols.get_or_insert(row.len());
            if row.len() != expected {
                return DatasetCheck::Skip(SkipReason::Ragged {
                    row: r,
                    expected,
                    found: row.len(),
                });
            }
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Value::Array(_) => {
                        return DatasetCheck::Skip(SkipReason::NotTwoDimensional { row: r })
                    }
                    _ => match cell.as_i64() {
                        Some(v) => cells.push(v),
                        None => {
                            return DatasetCheck::Skip(SkipReason::NonInteger { row: r, col: c })
                        }
                    },
                }
            }
        }

        match cols {
            Some(cols) if cols > 0 => DatasetCheck::Rectangular(Self {
                shape: Shape::new(rows.len(), cols),
                cells,
            }),
            _ => DatasetCheck::Skip(SkipReason::Empty),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn cells(&self) -> &[i64] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i64> {
        self.shape
            .contains(row, col)
            .then(|| self.cells[row * self.shape.cols + col])
    }

    /// Set one cell; returns false when the coordinate is outside the shape
    pub fn set(&mut self, row: usize, col: usize, value: i64) -> bool {
        if !self.shape.contains(row, col) {
            return false;
        }
        self.cells[row * self.shape.cols + col] = value;
        true
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i64]> + '_ {
        let cols = self.shape.cols;
        (0..self.shape.rows).map(move |r| &self.cells[r * cols..(r + 1) * cols])
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.shape.rows))?;
        for row in self.rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}
