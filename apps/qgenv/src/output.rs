//! Report rendering for validation runs.
//!
//! Supports `human` (default) and `json` console outputs. Independently of
//! the console mode, every run persists two files into the report directory:
//! `test_report.json` and `test_report.txt`. Both are pure functions of the
//! results and the timestamp, so identical inputs render identical bytes.

use crate::error::{HarnessError, Result};
use crate::harness::Aggregator;
use crate::models::scaffold::{ActionKind, BootstrapAction};
use crate::models::{Failure, Report, RunSummary};
use crate::utils;
use owo_colors::OwoColorize;
use serde_json::Value as JsonVal;
use std::fs;
use std::path::{Path, PathBuf};

pub const JSON_REPORT: &str = "test_report.json";
pub const TEXT_REPORT: &str = "test_report.txt";

const RULE_WIDTH: usize = 70;

/// Timestamp format used in reports (local time, microsecond precision).
pub fn report_timestamp(now: chrono::DateTime<chrono::Local>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Build the persisted report from aggregated results (pure).
pub fn compose_report(agg: &Aggregator, test_date: &str, environment: &str) -> Report {
    let summary = agg.summarize();
    Report {
        test_date: test_date.to_string(),
        environment: environment.to_string(),
        total_tests: summary.total,
        passed: summary.passed,
        failed: summary.failed,
        success_rate: format!("{:.1}%", summary.success_rate),
        failures: agg
            .failures()
            .map(|r| Failure {
                test: r.name.clone(),
                message: r.message.clone(),
            })
            .collect(),
    }
}

/// Compose report JSON object (pure) for printing and testing.
pub fn compose_report_json(report: &Report) -> JsonVal {
    serde_json::to_value(report).unwrap_or(JsonVal::Null)
}

/// Render the plain-text report (pure).
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("QGIS DOCKER ENVIRONMENT TEST REPORT\n");
    out.push_str(&"=".repeat(50));
    out.push('\n');
    out.push_str(&format!("Date: {}\n", report.test_date));
    out.push_str(&format!("Tests Run: {}\n", report.total_tests));
    out.push_str(&format!("Passed: {}\n", report.passed));
    out.push_str(&format!("Failed: {}\n", report.failed));
    out.push_str(&format!("Success Rate: {}\n", report.success_rate));
    if report.failures.is_empty() {
        out.push_str("\nAll tests passed!\n");
    } else {
        out.push_str("\nFailed Tests:\n");
        for f in &report.failures {
            out.push_str(&format!("  - {}: {}\n", f.test, f.message));
        }
    }
    out
}

/// Write both report files into `dir`, overwriting previous runs.
pub fn write_reports(dir: &Path, report: &Report) -> Result<(PathBuf, PathBuf)> {
    let json_path = dir.join(JSON_REPORT);
    let text_path = dir.join(TEXT_REPORT);
    let json = serde_json::to_string_pretty(report).map_err(|source| HarnessError::Output {
        name: "report".into(),
        source,
    })?;
    fs::write(&json_path, json).map_err(|e| HarnessError::io(&json_path, e))?;
    fs::write(&text_path, render_text(report)).map_err(|e| HarnessError::io(&text_path, e))?;
    tracing::info!(json = %json_path.display(), text = %text_path.display(), "reports written");
    Ok((json_path, text_path))
}

/// Print the run banner for human output.
pub fn print_banner(title: &str, started: &str, output: &str) {
    if output == "json" {
        return;
    }
    let rule = "=".repeat(RULE_WIDTH);
    println!("{}", rule);
    if utils::use_colors(output) {
        println!("{}", title.bold());
    } else {
        println!("{}", title);
    }
    println!("{}", rule);
    println!("Starting tests at {}", started);
}

/// Print the end-of-run summary. JSON mode prints the report object only.
pub fn print_summary(summary: &RunSummary, report: &Report, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_report_json(report)).unwrap_or_default()
        ),
        _ => {
            let color = utils::use_colors(output);
            let rule = "=".repeat(RULE_WIDTH);
            println!("\n{}", rule);
            println!("TEST SUMMARY");
            println!("{}", rule);
            println!("Tests Run: {}", summary.total);
            println!("Passed: {}", summary.passed);
            println!("Failed: {}", summary.failed);
            println!("Success Rate: {:.1}%", summary.success_rate);
            println!("Duration: {:.2} seconds", summary.duration_secs);
            if !report.failures.is_empty() {
                println!("\nFailed Tests:");
                for f in &report.failures {
                    println!("  - {}: {}", f.test, f.message);
                }
            }
            let verdict = if summary.success {
                "ALL TESTS PASSED! Environment is fully operational.".to_string()
            } else {
                format!("{} tests failed. Check the report for details.", summary.failed)
            };
            if !color {
                println!("\n{}", verdict);
            } else if summary.success {
                println!("\n{}", verdict.green().bold());
            } else {
                println!("\n{}", verdict.red().bold());
            }
        }
    }
}

/// Print where the report files went.
pub fn print_report_paths(json: &Path, text: &Path, output: &str) {
    if output == "json" {
        return;
    }
    println!("\nTest report saved to:");
    println!("  - {}", json.display());
    println!("  - {}", text.display());
}

/// Print directories created and files written by `qgenv init`.
pub fn print_bootstrap(actions: &[BootstrapAction], output: &str) {
    match output {
        "json" => {
            let out = serde_json::json!({
                "results": actions,
                "summary": {
                    "dirs": actions.iter().filter(|a| a.kind == ActionKind::Dir).count(),
                    "files": actions.iter().filter(|a| a.kind == ActionKind::File).count(),
                    "overwritten": actions
                        .iter()
                        .filter(|a| a.kind == ActionKind::File && a.existed)
                        .count(),
                },
            });
            println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        }
        _ => {
            let color = utils::use_colors(output);
            for a in actions {
                let verb = match (a.kind, a.existed) {
                    (ActionKind::Dir, false) => "created",
                    (ActionKind::Dir, true) => "exists",
                    (ActionKind::File, false) => "wrote",
                    (ActionKind::File, true) => "overwrote",
                };
                let path = utils::rel_to_wd(&a.path);
                if color {
                    println!("  {} {:<9} {}", utils::status_mark(true), verb.green(), path);
                } else {
                    println!("  {} {:<9} {}", utils::status_mark(true), verb, path);
                }
            }
        }
    }
}
