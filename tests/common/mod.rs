//! Common test utilities and helpers

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use mask_consensus::store::MaskStore;
use mask_consensus::{Engine, EngineConfig};
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A source tree of job archives with an engine pointed at it
pub struct TestSite {
    pub root: TempDir,
}

impl TestSite {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            source_root: self.path().to_path_buf(),
            max_parallel: 2,
            shards: 4,
            ..EngineConfig::default()
        }
    }

    pub fn engine(&self) -> Engine {
        Engine::new(self.config()).unwrap()
    }

    pub fn store(&self) -> MaskStore {
        MaskStore::new(self.path())
    }

    /// Add job `<prefix>_<location>_<date>.tar.gz` holding `mask`
    pub fn add_job(&self, prefix: &str, location: &str, date: &str, mask: &Value) -> PathBuf {
        let body = serde_json::to_vec(mask).unwrap();
        self.add_archive(prefix, location, date, &[("job/mask.mask.json", body.as_slice())])
    }

    /// Add an archive with arbitrary entries
    pub fn add_archive(
        &self,
        prefix: &str,
        location: &str,
        date: &str,
        entries: &[(&str, &[u8])],
    ) -> PathBuf {
        let dir = self.path().join(location);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}_{}_{}.tar.gz", prefix, location, date));
        write_archive(&path, entries);
        path
    }

    /// Class grid of the live consensus mask as nested rows
    pub fn grid(&self, location: &str, class: &str) -> Vec<Vec<i64>> {
        let snapshot = self.store().read_consensus(location).unwrap();
        snapshot
            .class_grid(class)
            .unwrap()
            .rows()
            .map(|row| row.to_vec())
            .collect()
    }
}

pub fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}
