#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

pub const PLANT_CSV: &str = "Flow Rate,Pressure,Type\n5,100,Pump\n7,110,Pump\n9,120,Valve\n";

/// Scratch directory holding uploads and a private history store.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }

    pub fn store(&self) -> PathBuf {
        self.temp_dir.path().join("history.db")
    }

    /// Binary invocation bound to this workspace's store.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("equipment-history").expect("binary exists");
        cmd.env_remove("RUST_LOG")
            .arg("--store")
            .arg(self.store());
        cmd
    }

    pub fn ingest(&self, name: &str, contents: &str) {
        let path = self.write(name, contents);
        self.command()
            .args(["ingest", "-i", path.to_str().unwrap(), "--json"])
            .assert()
            .success();
    }

    pub fn history_json(&self) -> serde_json::Value {
        let output = self
            .command()
            .args(["history", "--json"])
            .output()
            .expect("run history");
        assert!(output.status.success(), "history failed: {output:?}");
        serde_json::from_slice(&output.stdout).expect("history json")
    }
}
