//! Read-only consumers of a location's consensus mask
//!
//! - [`view`] renders one class grid as a grayscale image
//! - [`performance`] measures how often classes claim the same pixel

pub mod performance;
pub mod view;

pub use performance::{compute_overlap, measure_location, OverlapMetric};
pub use view::{load_class_grid, render_pgm, write_pgm, RenderOptions};
