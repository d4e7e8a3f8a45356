//! `performance`: overlap consistency of a consensus mask

use crate::analysis::measure_location;
use crate::config::EngineConfig;
use crate::store::MaskStore;
use anyhow::{Context, Result};

pub fn run_performance(config: &EngineConfig, location: &str, json: bool) -> Result<()> {
    let store = MaskStore::new(config.output_root());
    let metric = measure_location(&store, location)?;

    if json {
        let body = serde_json::to_string_pretty(&metric).context("Failed to encode metric")?;
        println!("{}", body);
    } else {
        println!(
            "Location {}: {:.2}% ({} voted pixel(s), {} overlapping)",
            location, metric.percentage, metric.voted_pixels, metric.overlap_pixels
        );
    }
    Ok(())
}
