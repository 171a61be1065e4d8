//! Container entry point: announce readiness or run a pass-through command.

use crate::error::{HarnessError, Result};
use crate::probe::Probe;
use crate::utils;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Exit code when the pass-through command cannot be started.
pub const EXIT_NOT_RUNNABLE: i32 = 127;

/// Append `<timestamp> - Environment started` to `startup.log` in `log_dir`.
pub fn log_startup(log_dir: &Path, timestamp: &str) -> Result<PathBuf> {
    fs::create_dir_all(log_dir).map_err(|e| HarnessError::io(log_dir, e))?;
    let path = log_dir.join("startup.log");
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| HarnessError::io(&path, e))?;
    writeln!(f, "{} - Environment started", timestamp).map_err(|e| HarnessError::io(&path, e))?;
    Ok(path)
}

/// Run `argv` to completion and return the exit code to relay.
///
/// A signal-terminated child maps to 1; a command that cannot be spawned
/// maps to 127.
pub fn run_passthrough(argv: &[String]) -> i32 {
    let Some((program, args)) = argv.split_first() else {
        return 0;
    };
    tracing::debug!(%program, ?args, "running pass-through command");
    match Command::new(program).args(args).status() {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            eprintln!(
                "{} failed to run `{}`: {}",
                utils::error_prefix(),
                program,
                e
            );
            EXIT_NOT_RUNNABLE
        }
    }
}

/// Entry point behavior. Returns the process exit code.
pub fn start(probe: &dyn Probe, log_dir: &Path, timestamp: &str, argv: &[String]) -> i32 {
    println!("Starting QGIS Docker environment...");
    println!("Timestamp: {}", timestamp);
    println!(
        "Platform: {}",
        probe.var("TARGETPLATFORM").unwrap_or_else(|| "unknown".to_string())
    );

    let qgis = probe.import("qgis.core");
    if qgis.available {
        println!("{} QGIS Python API ready", utils::status_mark(true));
    } else {
        eprintln!(
            "{} failed to load QGIS Python API: {}",
            utils::warning_prefix(),
            qgis.detail
        );
    }

    if let Err(e) = log_startup(log_dir, timestamp) {
        tracing::warn!(error = %e, "startup log not written");
        eprintln!("{} startup log not written: {}", utils::warning_prefix(), e);
    }

    if argv.is_empty() {
        println!("Environment ready!");
        0
    } else {
        run_passthrough(argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_startup_appends() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        log_startup(&logs, "t1").unwrap();
        let path = log_startup(&logs, "t2").unwrap();
        let s = fs::read_to_string(path).unwrap();
        assert_eq!(s, "t1 - Environment started\nt2 - Environment started\n");
    }

    #[test]
    fn test_passthrough_unknown_program() {
        let code = run_passthrough(&["qgenv-no-such-command-anywhere".to_string()]);
        assert_eq!(code, EXIT_NOT_RUNNABLE);
        assert_eq!(run_passthrough(&[]), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_passthrough_relays_exit_code() {
        let argv: Vec<String> = ["sh", "-c", "exit 3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(run_passthrough(&argv), 3);
    }
}
