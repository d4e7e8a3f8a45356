//! `view`: render a class grid to an image

use crate::analysis::{write_pgm, RenderOptions};
use crate::config::EngineConfig;
use crate::store::MaskStore;
use anyhow::Result;
use std::path::Path;

pub fn run_view(
    config: &EngineConfig,
    location: &str,
    class: &str,
    out: &Path,
    shade_undefined: bool,
) -> Result<()> {
    let store = MaskStore::new(config.output_root());
    let grid = write_pgm(
        &store,
        location,
        class,
        out,
        RenderOptions { shade_undefined },
    )?;
    println!(
        "Wrote class {} of location {} ({}) to {}",
        class,
        location,
        grid.shape(),
        out.display()
    );
    Ok(())
}
