//! Project scaffolding for `qgenv init`.
//!
//! Creates the directory tree and writes the Docker, script, and settings
//! files into a target directory. Directory creation is idempotent and every
//! file write overwrites. The only decision point is the confirmation gate
//! for a non-empty target, which the caller supplies.

use crate::config;
use crate::error::{HarnessError, Result};
use crate::models::scaffold::{ActionKind, Artifact, BootstrapAction};
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;
use std::process::Command;

pub const DIRECTORIES: [&str; 9] = [
    "docker",
    "scripts",
    "config",
    "workspace/data",
    "workspace/projects",
    "workspace/plugins",
    "logs",
    "tests",
    ".github/workflows",
];

pub const GITKEEP_DIRS: [&str; 4] = [
    "workspace/data",
    "workspace/projects",
    "workspace/plugins",
    "logs",
];

const PLATFORM_TOKEN: &str = "@PLATFORM@";

const DOCKERFILE: &str = include_str!("../templates/Dockerfile");
const COMPOSE: &str = include_str!("../templates/docker-compose.yml");
const REQUIREMENTS: &str = include_str!("../templates/requirements.txt");
const INSTALL_ENMAP: &str = include_str!("../templates/install_enmap.sh");
const STARTUP_PY: &str = include_str!("../templates/startup.py");
const VALIDATE_PY: &str = include_str!("../templates/validate_environment.py");
const TEST_ENV_PY: &str = include_str!("../templates/test_environment.py");
const ENV_FILE: &str = include_str!("../templates/env");
const GITIGNORE: &str = include_str!("../templates/gitignore");
const README: &str = include_str!("../templates/README.md");

/// Container platform for a host: Apple silicon builds arm64 images.
pub fn platform_for(os: &str, arch: &str) -> &'static str {
    if os == "macos" && arch == "aarch64" {
        "linux/arm64"
    } else {
        "linux/amd64"
    }
}

pub fn default_platform() -> &'static str {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Files written by `qgenv init`, in write order.
pub fn artifacts(platform: &str) -> Vec<Artifact> {
    let file = |path: &'static str, contents: String| Artifact {
        path,
        contents,
        executable: false,
    };
    vec![
        file("docker/Dockerfile", DOCKERFILE.to_string()),
        file("docker-compose.yml", COMPOSE.replace(PLATFORM_TOKEN, platform)),
        file("docker/requirements.txt", REQUIREMENTS.to_string()),
        Artifact {
            path: "scripts/install_enmap.sh",
            contents: INSTALL_ENMAP.to_string(),
            executable: true,
        },
        file("scripts/startup.py", STARTUP_PY.to_string()),
        file("scripts/validate_environment.py", VALIDATE_PY.to_string()),
        file("tests/test_environment.py", TEST_ENV_PY.to_string()),
        file(".env", ENV_FILE.replace(PLATFORM_TOKEN, platform)),
        file(".gitignore", GITIGNORE.to_string()),
        file("README.md", README.to_string()),
        file("qgenv.toml", config::starter_toml()),
    ]
}

/// Names of entries already present in `target`, sorted. Missing target is empty.
pub fn existing_entries(target: &Path) -> Result<Vec<String>> {
    if !target.exists() {
        return Ok(Vec::new());
    }
    let rd = fs::read_dir(target).map_err(|e| HarnessError::io(target, e))?;
    let mut names: Vec<String> = rd
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    Ok(names)
}

pub enum Outcome {
    /// The operator declined to continue; nothing was written.
    Cancelled,
    Completed(Vec<BootstrapAction>),
}

/// Scaffold `target`. When it already has entries, `confirm` decides
/// whether to proceed; declining leaves the directory untouched.
pub fn run_bootstrap<F>(target: &Path, platform: &str, confirm: F) -> Result<Outcome>
where
    F: FnOnce(&[String]) -> bool,
{
    let existing = existing_entries(target)?;
    if !existing.is_empty() && !confirm(&existing) {
        return Ok(Outcome::Cancelled);
    }
    scaffold(target, platform).map(Outcome::Completed)
}

/// Create directories, `.gitkeep` markers, and all artifacts under `target`.
pub fn scaffold(target: &Path, platform: &str) -> Result<Vec<BootstrapAction>> {
    let mut actions = Vec::new();
    for dir in DIRECTORIES {
        let p = target.join(dir);
        let existed = p.is_dir();
        fs::create_dir_all(&p).map_err(|e| HarnessError::io(&p, e))?;
        actions.push(BootstrapAction {
            path: p,
            kind: ActionKind::Dir,
            existed,
        });
    }
    for dir in GITKEEP_DIRS {
        let p = target.join(dir).join(".gitkeep");
        if !p.exists() {
            fs::write(&p, "").map_err(|e| HarnessError::io(&p, e))?;
        }
    }
    for art in artifacts(platform) {
        let p = target.join(art.path);
        let existed = p.exists();
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
        }
        fs::write(&p, &art.contents).map_err(|e| HarnessError::io(&p, e))?;
        if art.executable {
            make_executable(&p)?;
        }
        tracing::debug!(path = %p.display(), existed, "wrote artifact");
        actions.push(BootstrapAction {
            path: p,
            kind: ActionKind::File,
            existed,
        });
    }
    Ok(actions)
}

#[cfg(unix)]
fn make_executable(p: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(p, fs::Permissions::from_mode(0o755)).map_err(|e| HarnessError::io(p, e))
}

#[cfg(not(unix))]
fn make_executable(_p: &Path) -> Result<()> {
    Ok(())
}

/// Ask a y/n question on `out` and read the answer from `input`.
/// Only an explicit `y` counts as yes.
pub fn prompt_yes_no(out: &mut dyn Write, input: &mut dyn BufRead, question: &str) -> bool {
    let _ = write!(out, "{} (y/n): ", question);
    let _ = out.flush();
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(_) => line.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

/// `docker --version` output when Docker is installed.
pub fn docker_version() -> Option<String> {
    let out = Command::new("docker").arg("--version").output().ok()?;
    if !out.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// Run `docker-compose build` in `target`, streaming its output.
pub fn build_image(target: &Path) -> Result<bool> {
    let status = Command::new("docker-compose")
        .arg("build")
        .current_dir(target)
        .status()
        .map_err(|source| HarnessError::Spawn {
            program: "docker-compose".into(),
            source,
        })?;
    Ok(status.success())
}
