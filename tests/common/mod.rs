#![allow(dead_code)]

use std::path::{Path, PathBuf};

use csp_headers::config::{Config, FileConfig, Overrides};
use tempfile::TempDir;

/// A throwaway build directory.
pub struct Site {
    dir: TempDir,
}

impl Site {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root().join(rel)).unwrap()
    }

    pub fn headers(&self) -> String {
        self.read("_headers")
    }

    /// Config from a JSON config file body, with this site as build dir.
    pub fn config(&self, json: &str) -> Config {
        let file: FileConfig = serde_json::from_str(json).expect("Invalid test config");
        Config::resolve(
            file,
            Overrides {
                build_dir: Some(self.root().to_path_buf()),
                ..Default::default()
            },
        )
        .expect("Failed to resolve config")
    }
}

pub fn page(head: &str, body: &str) -> String {
    format!("<!DOCTYPE html><html><head>{head}</head><body>{body}</body></html>")
}
