//! Console helpers: colored prefixes, status marks, and path display.

use owo_colors::OwoColorize;
use std::path::Path;

/// Colors are disabled for JSON output and when `NO_COLOR` is set.
pub fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn paint(label: &str, style: fn(&str) -> String) -> String {
    if use_colors("human") {
        style(label)
    } else {
        label.to_string()
    }
}

pub fn error_prefix() -> String {
    paint("error:", |s| s.red().bold().to_string())
}

pub fn warning_prefix() -> String {
    paint("warning:", |s| s.yellow().bold().to_string())
}

pub fn note_prefix() -> String {
    paint("note:", |s| s.cyan().bold().to_string())
}

pub fn info_prefix() -> String {
    paint("info:", |s| s.blue().bold().to_string())
}

/// `[OK]` / `[FAIL]` marker used on progress lines.
pub fn status_mark(passed: bool) -> String {
    if passed {
        paint("[OK]", |s| s.green().bold().to_string())
    } else {
        paint("[FAIL]", |s| s.red().bold().to_string())
    }
}

/// Render `p` relative to the current working directory when possible.
pub fn rel_to_wd(p: &Path) -> String {
    let cwd = match std::env::current_dir() {
        Ok(c) => c,
        Err(_) => return p.to_string_lossy().to_string(),
    };
    match pathdiff::diff_paths(p, &cwd) {
        Some(rel) if !rel.as_os_str().is_empty() && !rel.starts_with("..") => {
            rel.to_string_lossy().to_string()
        }
        _ => p.to_string_lossy().to_string(),
    }
}

/// Single-line form of a possibly multi-line message (stderr tails, tracebacks).
pub fn one_line(s: &str) -> String {
    let trimmed = s.trim();
    match trimmed.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(last) => last.trim().to_string(),
        None => String::new(),
    }
}
