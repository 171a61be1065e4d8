//! qgenv core library.
//!
//! Scaffolds a Docker-based QGIS + EnMAP-Box project and validates a running
//! environment by probing the installation and writing pass/fail reports.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `probe`: Capability probing against the target Python environment.
//! - `checks`: The validation routines and their fixed order.
//! - `harness`: Result aggregation and isolated routine execution.
//! - `output`: Human/JSON printers and the persisted reports.
//! - `bootstrap`: Project scaffolding for `qgenv init`.
//! - `entrypoint`: Container entry point for `qgenv start`.
//! - `models`: Check results, summaries, reports, and scaffold actions.
//! - `error`, `logging`, `utils`: Supporting pieces.
pub mod bootstrap;
pub mod checks;
pub mod cli;
pub mod config;
pub mod entrypoint;
pub mod error;
pub mod harness;
pub mod logging;
pub mod models;
pub mod output;
pub mod probe;
pub mod utils;
