//! Bootstrap layout: what `qgenv init` creates in a target directory.

use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
/// A file written by the bootstrapper. Contents are opaque.
pub struct Artifact {
    pub path: &'static str,
    pub contents: String,
    pub executable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Dir,
    File,
}

#[derive(Debug, Clone, Serialize)]
/// One directory created or file written during `qgenv init`.
pub struct BootstrapAction {
    pub path: PathBuf,
    pub kind: ActionKind,
    /// The path was already present and has been reused or overwritten.
    pub existed: bool,
}
