//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "qgenv",
    version,
    about = "Scaffold and validate a containerized QGIS + EnMAP-Box environment",
    long_about = "qgenv scaffolds a Docker-based QGIS 3.34 LTR + EnMAP-Box project and validates a running environment.\n\nConfiguration precedence: CLI > qgenv.toml > defaults.",
    after_help = "Examples:\n  qgenv init my-project\n  qgenv validate --quick\n  qgenv validate --report-dir /workspace --output json\n  qgenv start -- qgis_process list",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current qgenv version.")]
    Version,
    /// Validate the environment
    #[command(
        about = "Run validation checks",
        long_about = "Probe the QGIS installation, Python libraries, plugin, processing algorithms, data I/O, container environment, and data providers. Exits 0 when every check passed, 1 otherwise.",
        after_help = "Examples:\n  qgenv validate --quick\n  qgenv validate --config qgenv.toml --output json"
    )]
    Validate {
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Only check that qgis.core, numpy and pandas import")]
        quick: bool,
        #[arg(long, help = "Directory for test_report.json/.txt (default: /workspace)")]
        report_dir: Option<String>,
        #[arg(long, help = "Python interpreter used for probing (default: python3)")]
        python: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "Explicit config file (default: discover qgenv.toml)")]
        config: Option<String>,
        #[arg(long, help = "Directory to start config discovery from (default: current dir)")]
        root: Option<String>,
    },
    /// Scaffold a project directory
    #[command(
        about = "Create project files",
        long_about = "Create the directory layout, Dockerfile, compose file, scripts, and settings in a target directory. Prompts before overwriting a non-empty directory.",
        after_help = "Examples:\n  qgenv init\n  qgenv init my-project --yes --build"
    )]
    Init {
        #[arg(default_value = ".", help = "Target directory")]
        dir: String,
        #[arg(long, short = 'y', action = clap::ArgAction::SetTrue, help = "Do not prompt when the directory is not empty")]
        yes: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Run docker-compose build afterwards when Docker is available")]
        build: bool,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Container entry point
    #[command(
        about = "Container entry point",
        long_about = "Report readiness, append to startup.log, and optionally run a command, relaying its exit code.",
        after_help = "Examples:\n  qgenv start\n  qgenv start -- python3 /workspace/job.py"
    )]
    Start {
        #[arg(long, help = "Directory for startup.log (default: /logs)")]
        log_dir: Option<String>,
        #[arg(long, help = "Python interpreter used for probing (default: python3)")]
        python: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, help = "Command to run")]
        command: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_flags() {
        let cli = Cli::try_parse_from(["qgenv", "validate", "--quick", "--report-dir", "/tmp/r"]).unwrap();
        match cli.cmd {
            Commands::Validate { quick, report_dir, .. } => {
                assert!(quick);
                assert_eq!(report_dir.as_deref(), Some("/tmp/r"));
            }
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn test_start_collects_trailing_command() {
        let cli = Cli::try_parse_from(["qgenv", "start", "--", "qgis_process", "list", "--json"]).unwrap();
        match cli.cmd {
            Commands::Start { command, log_dir, .. } => {
                assert_eq!(command, vec!["qgis_process", "list", "--json"]);
                assert!(log_dir.is_none());
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn test_init_defaults_to_cwd() {
        let cli = Cli::try_parse_from(["qgenv", "init"]).unwrap();
        match cli.cmd {
            Commands::Init { dir, yes, build, output } => {
                assert_eq!(dir, ".");
                assert!(!yes && !build);
                assert!(output.is_none());
            }
            _ => panic!("expected init"),
        }
    }
}
