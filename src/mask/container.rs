//! Multi-dataset mask container
//!
//! A container is a JSON document whose top-level object maps a dataset
//! (class) name to a nested integer array. Job masks and the persisted
//! consensus mask share this format.

use super::grid::{DatasetCheck, Grid, Shape};
use crate::error::{ConsensusError, ErrorCode, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Datasets of one container, keyed and ordered by name
#[derive(Debug, Clone, Default)]
pub struct MaskContainer {
    path: Option<PathBuf>,
    datasets: BTreeMap<String, Value>,
}

impl MaskContainer {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            ConsensusError::mask(
                ErrorCode::MASK_OPEN_FAILED,
                "failed to open mask container",
                Some(path.to_path_buf()),
            )
            .with_source(e)
        })?;
        let mut container = Self::from_reader(BufReader::new(file)).map_err(|e| {
            ConsensusError::mask(
                ErrorCode::MASK_PARSE_ERROR,
                format!("{} is not a dataset document", path.display()),
                Some(path.to_path_buf()),
            )
            .with_source(e)
        })?;
        container.path = Some(path.to_path_buf());
        Ok(container)
    }

    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        let datasets: BTreeMap<String, Value> = serde_json::from_reader(reader)?;
        Ok(Self {
            path: None,
            datasets,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Every dataset with its capability check outcome, in name order
    pub fn inspect(&self) -> impl Iterator<Item = (&str, DatasetCheck)> {
        self.datasets
            .iter()
            .map(|(name, value)| (name.as_str(), Grid::inspect(value)))
    }

    /// Consume the container into its datasets, in name order
    pub fn into_checked(self) -> impl Iterator<Item = (String, DatasetCheck)> {
        self.datasets.into_iter().map(|(name, value)| {
            let check = Grid::inspect(&value);
            (name, check)
        })
    }

    /// Shape of the first rectangular dataset, if any
    pub fn first_shape(&self) -> Option<Shape> {
        self.inspect().find_map(|(_, check)| match check {
            DatasetCheck::Rectangular(grid) => Some(grid.shape()),
            DatasetCheck::Skip(_) => None,
        })
    }
}

/// Write grids as one container document
pub fn write_container(path: &Path, grids: &BTreeMap<String, Grid>) -> Result<()> {
    let write_err = |e: std::io::Error| {
        ConsensusError::mask(
            ErrorCode::MASK_WRITE_FAILED,
            "failed to write mask container",
            Some(path.to_path_buf()),
        )
        .with_source(e)
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, grids).map_err(|e| {
        ConsensusError::mask(
            ErrorCode::MASK_WRITE_FAILED,
            "failed to serialize mask container",
            Some(path.to_path_buf()),
        )
        .with_source(e)
    })?;
    writer.flush().map_err(write_err)?;
    writer
        .into_inner()
        .map_err(|e| write_err(e.into_error()))?
        .sync_all()
        .map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_shape_skips_malformed() {
        let doc = r#"{"a": [[[1]]], "b": [[1, 2, 3], [4, 5, 6]]}"#;
        let container = MaskContainer::from_reader(doc.as_bytes()).unwrap();
        assert_eq!(container.first_shape(), Some(Shape::new(2, 3)));
        assert_eq!(container.dataset_names().collect::<Vec<_>>(), vec!["a", "b"]);

        let doc = r#"{"0": [], "1": [[]], "3": [[1, 1], [0, -1]]}"#;
        let container = MaskContainer::from_reader(doc.as_bytes()).unwrap();
        assert_eq!(container.first_shape(), Some(Shape::new(2, 2)));
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(MaskContainer::from_reader("[1, 2]".as_bytes()).is_err());
    }

    #[test]
    fn test_write_then_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mask.json");
        let mut grids = BTreeMap::new();
        grids.insert(
            "3".to_string(),
            Grid::from_rows(vec![vec![1, 1], vec![0, -1]]).unwrap(),
        );
        write_container(&path, &grids).unwrap();

        let container = MaskContainer::open(&path).unwrap();
        assert_eq!(container.path(), Some(path.as_path()));
        let checked: Vec<_> = container.into_checked().collect();
        assert_eq!(checked.len(), 1);
        assert_eq!(
            checked[0].1,
            DatasetCheck::Rectangular(grids.remove("3").unwrap())
        );
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = MaskContainer::open(&dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MASK_OPEN_FAILED);
    }
}
