use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated sandbox: a temp root marked as a repo so config discovery stops there.
pub struct TestEnv {
    _tmp: TempDir,
    pub root: PathBuf,
    pub reports: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join(".git")).expect("mark repo root");
        let reports = root.join("reports");
        fs::create_dir_all(&reports).expect("create report dir");
        Self {
            _tmp: tmp,
            root,
            reports,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("qgenv").expect("qgenv binary");
        cmd.current_dir(&self.root).env("NO_COLOR", "1");
        cmd
    }

    /// `validate` wired to this sandbox with an interpreter that cannot exist.
    pub fn validate(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("validate")
            .arg("--root")
            .arg(&self.root)
            .arg("--report-dir")
            .arg(&self.reports)
            .arg("--python")
            .arg("qgenv-test-missing-python");
        cmd
    }

    pub fn read_report(&self) -> Value {
        read_json(&self.reports.join("test_report.json"))
    }
}

pub fn read_json(path: &Path) -> Value {
    let s = fs::read_to_string(path).expect("read json");
    serde_json::from_str(&s).expect("parse json")
}
