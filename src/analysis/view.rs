//! Two-tone rendering of a consensus class grid

use crate::error::{ConsensusError, ErrorCode, Result};
use crate::mask::{Grid, Label};
use crate::store::MaskStore;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Gray level of pixels the class is present at
pub const PRESENT_TONE: u8 = 255;
/// Gray level of every other pixel
pub const BACKGROUND_TONE: u8 = 0;
/// Gray level of undefined pixels with `shade_undefined`
pub const UNDEFINED_TONE: u8 = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Give undefined (-1) pixels their own tone
    pub shade_undefined: bool,
}

impl RenderOptions {
    pub fn tone(&self, value: i64) -> u8 {
        match Label::from_stored(value) {
            Some(Label::Present) => PRESENT_TONE,
            Some(Label::Undefined) if self.shade_undefined => UNDEFINED_TONE,
            _ => BACKGROUND_TONE,
        }
    }
}

/// Encode a grid as a binary (P5) PGM image, one byte per pixel
pub fn render_pgm(grid: &Grid, options: RenderOptions) -> Vec<u8> {
    let shape = grid.shape();
    let mut image = format!("P5\n{} {}\n255\n", shape.cols, shape.rows).into_bytes();
    image.reserve(grid.len());
    image.extend(grid.cells().iter().map(|&value| options.tone(value)));
    image
}

/// Class grid of a location's live consensus mask
pub fn load_class_grid(store: &MaskStore, location: &str, class: &str) -> Result<Grid> {
    let snapshot = store.read_consensus(location)?;
    snapshot.class_grid(class).cloned()
}

/// Render `class` of `location` into `out`
pub fn write_pgm(
    store: &MaskStore,
    location: &str,
    class: &str,
    out: &Path,
    options: RenderOptions,
) -> Result<Grid> {
    let grid = load_class_grid(store, location, class)?;
    let image = render_pgm(&grid, options);

    let write_err = |e: std::io::Error| {
        ConsensusError::store(
            ErrorCode::STORE_IO_ERROR,
            "failed to write image",
            Some(out.to_path_buf()),
        )
        .with_source(e)
    };
    let file = std::fs::File::create(out).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&image).map_err(write_err)?;
    writer.flush().map_err(write_err)?;

    info!(
        "Rendered class {} of location {} ({}) to {}",
        class,
        location,
        grid.shape(),
        out.display()
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::UNVOTED;

    fn grid() -> Grid {
        Grid::from_rows(vec![vec![1, 0], vec![-1, UNVOTED]]).unwrap()
    }

    #[test]
    fn test_two_tone_by_default() {
        let image = render_pgm(&grid(), RenderOptions::default());
        let header = b"P5\n2 2\n255\n";
        assert_eq!(&image[..header.len()], header);
        assert_eq!(&image[header.len()..], &[255, 0, 0, 0]);
    }

    #[test]
    fn test_shade_undefined() {
        let image = render_pgm(
            &grid(),
            RenderOptions {
                shade_undefined: true,
            },
        );
        assert_eq!(&image[image.len() - 4..], &[255, 0, 100, 0]);
    }

    #[test]
    fn test_width_comes_first_in_header() {
        let wide = Grid::from_rows(vec![vec![1, 1, 1]]).unwrap();
        let image = render_pgm(&wide, RenderOptions::default());
        assert!(image.starts_with(b"P5\n3 1\n255\n"));
    }
}
