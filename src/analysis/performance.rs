//! Overlap consistency of a consensus mask
//!
//! A pixel is *voted* when at least one class carries a label other than
//! undefined or [`UNVOTED`]; it *overlaps* when two or more classes are
//! present there. The metric is `(voted - overlap) / voted * 100`.

use crate::error::{ConsensusError, ErrorCode, Result};
use crate::mask::{Grid, Label, Shape, UNVOTED};
use crate::store::MaskStore;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapMetric {
    pub voted_pixels: usize,
    pub overlap_pixels: usize,
    pub percentage: f64,
}

/// Compute the metric over grids sharing one shape
///
/// Overlap counts shared presence only. Two classes that are both absent
/// at a pixel repeat a label there but do not overlap, so a mask where every
/// class is absent everywhere scores 100.
pub fn compute_overlap<'a, I>(grids: I, shape: Shape) -> Result<OverlapMetric>
where
    I: IntoIterator<Item = (&'a str, &'a Grid)>,
{
    let grids: Vec<(&str, &Grid)> = grids.into_iter().collect();
    if grids.len() < 2 {
        return Err(ConsensusError::too_few_classes(grids.len()));
    }
    for (class, grid) in &grids {
        if grid.shape() != shape {
            return Err(ConsensusError::store(
                ErrorCode::STORE_CORRUPTED,
                format!(
                    "class '{}' has shape {} but the location shape is {}",
                    class,
                    grid.shape(),
                    shape
                ),
                None,
            ));
        }
    }

    let mut voted_pixels = 0;
    let mut overlap_pixels = 0;
    for index in 0..shape.cells() {
        let mut voted = false;
        let mut present = 0;
        for (_, grid) in &grids {
            let value = grid.cells()[index];
            if value != UNVOTED && value != Label::Undefined.value() {
                voted = true;
            }
            if value == Label::Present.value() {
                present += 1;
            }
        }
        if voted {
            voted_pixels += 1;
        }
        if present >= 2 {
            overlap_pixels += 1;
        }
    }

    if voted_pixels == 0 {
        return Err(ConsensusError::validation(
            ErrorCode::VALIDATION_NO_VOTES,
            "no pixel of the consensus mask carries a vote",
            None,
        ));
    }

    let percentage = (voted_pixels - overlap_pixels) as f64 / voted_pixels as f64 * 100.0;
    debug!(
        "voted: {}, overlapping: {}",
        voted_pixels, overlap_pixels
    );
    Ok(OverlapMetric {
        voted_pixels,
        overlap_pixels,
        percentage,
    })
}

/// Metric over every recorded class of a location's live consensus mask
pub fn measure_location(store: &MaskStore, location: &str) -> Result<OverlapMetric> {
    let snapshot = store.read_consensus(location)?;
    let classes = &snapshot.metadata.classes;
    if classes.len() < 2 {
        return Err(ConsensusError::too_few_classes(classes.len()));
    }
    let shape = match snapshot.metadata.shape {
        Some(shape) => shape,
        None => return Err(ConsensusError::no_shape(location)),
    };

    let grids = classes
        .iter()
        .map(|class| snapshot.class_grid(class).map(|grid| (class.as_str(), grid)))
        .collect::<Result<Vec<_>>>()?;
    let metric = compute_overlap(grids, shape)?;
    info!(
        "Location {}: {:.2}% of voted pixels are claimed by at most one class",
        location, metric.percentage
    );
    Ok(metric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<i64>>) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn test_overlap_percentage() {
        let a = grid(vec![vec![1, 1], vec![0, -1]]);
        let b = grid(vec![vec![1, 0], vec![0, UNVOTED]]);
        let metric = compute_overlap([("1", &a), ("2", &b)], Shape::new(2, 2)).unwrap();
        // (0,0) (0,1) (1,0) are voted; (0,0) overlaps
        assert_eq!(metric.voted_pixels, 3);
        assert_eq!(metric.overlap_pixels, 1);
        assert!((metric.percentage - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_absence_is_not_overlap() {
        let a = grid(vec![vec![0, 0]]);
        let b = grid(vec![vec![0, 1]]);
        let metric = compute_overlap([("1", &a), ("2", &b)], Shape::new(1, 2)).unwrap();
        assert_eq!(metric.voted_pixels, 2);
        assert_eq!(metric.overlap_pixels, 0);
        assert_eq!(metric.percentage, 100.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let a = grid(vec![vec![1]]);
        let err = compute_overlap([("1", &a)], Shape::new(1, 1)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::VALIDATION_TOO_FEW_CLASSES);
    }

    #[test]
    fn test_no_votes_rejected() {
        let a = grid(vec![vec![-1]]);
        let b = grid(vec![vec![UNVOTED]]);
        let err = compute_overlap([("1", &a), ("2", &b)], Shape::new(1, 1)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::VALIDATION_NO_VOTES);
    }
}
