//! Error type shared by the harness, the bootstrapper, and the entry point.
//!
//! Expected failures (a missing library, a missing provider) never become a
//! `HarnessError`; they are recorded as failing check results. This type
//! covers what is left: probe scripts that cannot run, unreadable config,
//! and I/O failures while writing reports or scaffolding.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("probe `{name}` exited with {status}: {stderr}")]
    Script {
        name: String,
        status: String,
        stderr: String,
    },
    #[error("probe `{name}` printed invalid JSON: {source}")]
    Output {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl HarnessError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
