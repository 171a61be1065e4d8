//! qgenv CLI binary entry point.
//! Delegates to library modules for init/validate/start and maps outcomes
//! to exit codes: 0 success, 1 failed checks, 2 fatal error.

use chrono::Local;
use clap::Parser;
use qgenv::bootstrap::{self, Outcome};
use qgenv::checks::{Context, Routine};
use qgenv::cli::{Cli, Commands};
use qgenv::config::{self, Overrides};
use qgenv::harness::{self, Aggregator};
use qgenv::probe::PythonProbe;
use qgenv::{entrypoint, logging, output, utils};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const EXIT_FATAL: i32 = 2;

fn main() {
    logging::init_tracing();
    let cli = Cli::parse();
    let code = match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            0
        }
        Commands::Validate {
            quick,
            report_dir,
            python,
            output,
            config,
            root,
        } => validate(
            quick,
            Overrides {
                root,
                config,
                output,
                report_dir,
                python,
                log_dir: None,
            },
        ),
        Commands::Init {
            dir,
            yes,
            build,
            output,
        } => init(Path::new(&dir), yes, build, output.as_deref().unwrap_or("human")),
        Commands::Start {
            log_dir,
            python,
            command,
        } => start(
            Overrides {
                log_dir,
                python,
                ..Default::default()
            },
            &command,
        ),
    };
    std::process::exit(code);
}

fn fatal(e: impl std::fmt::Display) -> i32 {
    tracing::error!(error = %e, "fatal");
    eprintln!("{} {}", utils::error_prefix(), e);
    EXIT_FATAL
}

fn probe_for(eff: &config::Effective) -> PythonProbe {
    let probe = PythonProbe::new(eff.python.clone());
    match eff.plugin.path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => probe.with_search_path(parent),
        _ => probe,
    }
}

fn validate(quick: bool, ov: Overrides) -> i32 {
    let eff = match config::resolve_effective(&ov) {
        Ok(eff) => eff,
        Err(e) => return fatal(e),
    };
    if eff.source.is_none() && eff.output != "json" {
        eprintln!(
            "{} No qgenv.toml found; using defaults.",
            utils::note_prefix()
        );
    }
    let probe = probe_for(&eff);
    let ctx = Context {
        probe: &probe,
        settings: &eff,
    };

    let (title, routines): (&str, &[Routine]) = if quick {
        ("QGIS DOCKER ENVIRONMENT - QUICK VALIDATION", &Routine::QUICK[..])
    } else {
        ("QGIS DOCKER ENVIRONMENT - COMPREHENSIVE TEST SUITE", &Routine::FULL[..])
    };
    output::print_banner(
        title,
        &Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        &eff.output,
    );

    let mut agg = if eff.output == "json" {
        Aggregator::new()
    } else {
        Aggregator::echoing()
    };
    harness::run_routines(routines, &ctx, &mut agg);

    let summary = agg.summarize();
    let report = output::compose_report(
        &agg,
        &output::report_timestamp(Local::now()),
        &eff.environment,
    );
    output::print_summary(&summary, &report, &eff.output);
    match output::write_reports(&eff.report_dir, &report) {
        Ok((json, text)) => output::print_report_paths(&json, &text, &eff.output),
        Err(e) => return fatal(e),
    }
    if summary.success {
        0
    } else {
        1
    }
}

fn init(target: &Path, yes: bool, build: bool, out: &str) -> i32 {
    let human = out != "json";
    let abs: PathBuf = std::fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
    if human {
        println!("{}", "=".repeat(60));
        println!("QGIS DOCKER ENVIRONMENT - AUTOMATED SETUP");
        println!("{}", "=".repeat(60));
        println!("\nWorking directory: {}", abs.display());
    }

    let platform = bootstrap::default_platform();
    // JSON mode keeps stdout for the action document.
    let mut console: Box<dyn Write> = if human {
        Box::new(io::stdout())
    } else {
        Box::new(io::stderr())
    };
    let outcome = bootstrap::run_bootstrap(target, platform, |names| {
        if yes {
            return true;
        }
        let _ = writeln!(console, "\n{} Directory is not empty!", utils::warning_prefix());
        let shown: Vec<&str> = names.iter().take(5).map(String::as_str).collect();
        let _ = writeln!(console, "Existing files: {}", shown.join(", "));
        bootstrap::prompt_yes_no(&mut console, &mut io::stdin().lock(), "Continue anyway?")
    });
    let actions = match outcome {
        Ok(Outcome::Cancelled) => {
            let _ = writeln!(console, "Setup cancelled.");
            return 0;
        }
        Ok(Outcome::Completed(actions)) => actions,
        Err(e) => return fatal(e),
    };
    output::print_bootstrap(&actions, out);
    if !human {
        return 0;
    }
    println!("  platform: {}", platform);

    println!("\nChecking Docker installation...");
    let docker = bootstrap::docker_version();
    match docker.as_deref() {
        Some(v) => println!("  {} Docker found: {}", utils::status_mark(true), v),
        None => {
            println!("  {} Docker not found!", utils::warning_prefix());
            println!("  Mac: https://docs.docker.com/desktop/install/mac-install/");
            println!("  Windows: https://docs.docker.com/desktop/install/windows-install/");
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("SETUP COMPLETE!");
    println!("{}", "=".repeat(60));
    println!("\nNext steps:");
    println!("  1. Build the Docker image: docker-compose build");
    println!("  2. Start the container: docker-compose up -d");
    println!("  3. Validate: docker-compose exec qgis python3 /scripts/validate_environment.py");

    if build && docker.is_some() {
        println!("\nBuilding Docker image...");
        println!("  This may take 10-15 minutes on first run...");
        match bootstrap::build_image(target) {
            Ok(true) => println!("  {} Docker image built successfully!", utils::status_mark(true)),
            Ok(false) => println!(
                "  {} Build failed. Check the errors above.",
                utils::status_mark(false)
            ),
            Err(e) => println!("  {} Build failed: {}", utils::status_mark(false), e),
        }
    } else if build {
        println!(
            "\n{} Install Docker Desktop, then run 'docker-compose build'",
            utils::note_prefix()
        );
    }
    0
}

fn start(ov: Overrides, command: &[String]) -> i32 {
    let eff = match config::resolve_effective(&ov) {
        Ok(eff) => eff,
        Err(e) => return fatal(e),
    };
    let probe = probe_for(&eff);
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();
    entrypoint::start(&probe, &eff.log_dir, &timestamp, command)
}
