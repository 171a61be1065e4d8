//! Capability probing against the target environment.
//!
//! Check routines only talk to the `Probe` trait. `PythonProbe` answers by
//! spawning the environment's Python interpreter with small embedded
//! scripts; tests substitute an in-memory implementation.

use crate::error::{HarnessError, Result};
use crate::models::Availability;
use serde_json::Value as Json;
use std::path::PathBuf;
use std::process::Command;

pub const IMPORT_MODULE: &str = include_str!("../probes/import_module.py");
pub const QGIS_INIT: &str = include_str!("../probes/qgis_init.py");
pub const PROCESSING: &str = include_str!("../probes/processing.py");
pub const PROVIDERS: &str = include_str!("../probes/providers.py");
pub const DATA_IO: &str = include_str!("../probes/data_io.py");

/// Detects whether capabilities of the target environment are present.
pub trait Probe {
    /// Attempt to import a Python module. Never fails; an import error is
    /// reported as `available = false` with the error text as detail.
    fn import(&self, module: &str) -> Availability;

    /// Run an embedded probe script and return the JSON document it prints.
    fn script(&self, name: &str, source: &str, args: &[String]) -> Result<Json>;

    /// Read an environment variable of the target environment.
    fn var(&self, name: &str) -> Option<String>;
}

/// Probes a Python installation by running `<python> -c <script> args...`.
pub struct PythonProbe {
    pub python: String,
    /// Prepended to `PYTHONPATH` for every spawned interpreter.
    pub search_paths: Vec<PathBuf>,
}

impl PythonProbe {
    pub fn new(python: impl Into<String>) -> Self {
        PythonProbe {
            python: python.into(),
            search_paths: Vec::new(),
        }
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    fn command(&self, source: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-c").arg(source).args(args);
        cmd.env("QT_QPA_PLATFORM", "offscreen");
        if !self.search_paths.is_empty() {
            let mut paths: Vec<PathBuf> = self.search_paths.clone();
            if let Some(existing) = std::env::var_os("PYTHONPATH") {
                paths.extend(std::env::split_paths(&existing));
            }
            if let Ok(joined) = std::env::join_paths(paths) {
                cmd.env("PYTHONPATH", joined);
            }
        }
        cmd
    }
}

/// Parse the last non-empty stdout line as JSON. Libraries loaded by the
/// probe scripts may print their own chatter before the result line.
pub fn parse_last_json(name: &str, stdout: &str) -> Result<Json> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");
    serde_json::from_str(line).map_err(|source| HarnessError::Output {
        name: name.to_string(),
        source,
    })
}

impl Probe for PythonProbe {
    fn import(&self, module: &str) -> Availability {
        match self.script("import", IMPORT_MODULE, &[module.to_string()]) {
            Ok(v) => serde_json::from_value(v)
                .unwrap_or_else(|e| Availability::missing(format!("unexpected probe output: {}", e))),
            Err(e) => Availability::missing(e.to_string()),
        }
    }

    fn script(&self, name: &str, source: &str, args: &[String]) -> Result<Json> {
        tracing::debug!(probe = name, python = %self.python, ?args, "running probe script");
        let out = self
            .command(source, args)
            .output()
            .map_err(|source| HarnessError::Spawn {
                program: self.python.clone(),
                source,
            })?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(HarnessError::Script {
                name: name.to_string(),
                status: out.status.to_string(),
                stderr: crate::utils::one_line(&stderr),
            });
        }
        parse_last_json(name, &String::from_utf8_lossy(&out.stdout))
    }

    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}
