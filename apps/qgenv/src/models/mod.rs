//! Shared data models for check results, run summaries, and reports.

pub mod scaffold;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Outcome of a single probe.
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Derived totals for one harness run.
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage of passed checks; 100.0 for an empty run.
    pub success_rate: f64,
    pub duration_secs: f64,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A failed check as it appears in the persisted report.
pub struct Failure {
    pub test: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted structured report. Field order is the on-disk order.
pub struct Report {
    pub test_date: String,
    pub environment: String,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub success_rate: String,
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Whether a capability is present, with a version or error detail.
pub struct Availability {
    pub available: bool,
    #[serde(default)]
    pub detail: String,
}

impl Availability {
    pub fn present(detail: impl Into<String>) -> Self {
        Availability {
            available: true,
            detail: detail.into(),
        }
    }

    pub fn missing(detail: impl Into<String>) -> Self {
        Availability {
            available: false,
            detail: detail.into(),
        }
    }
}
