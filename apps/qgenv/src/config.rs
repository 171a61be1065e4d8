//! Configuration discovery and effective settings resolution.
//!
//! qgenv reads `qgenv.toml|yaml|yml` from the start directory (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults describe the stock container image:
//! - `report_dir`: `/workspace`
//! - `log_dir`: `/logs`
//! - `python`: `python3`
//! - `prefix_path`: `/usr`
//! - `output`: `human`
//! - plugin: EnMAP-Box under `/usr/share/qgis/python/plugins/enmapbox`
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::{HarnessError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_NAMES: [&str; 3] = ["qgenv.toml", "qgenv.yaml", "qgenv.yml"];

const DEFAULT_LIBRARIES: [&str; 8] = [
    "numpy",
    "pandas",
    "osgeo.gdal",
    "matplotlib",
    "scipy",
    "rasterio",
    "shapely",
    "fiona",
];
const DEFAULT_QUICK_MODULES: [&str; 3] = ["qgis.core", "numpy", "pandas"];
const DEFAULT_ALGORITHMS: [&str; 3] = ["native:buffer", "gdal:hillshade", "qgis:creategrid"];
const DEFAULT_PROVIDERS: [&str; 5] = ["ogr", "gdal", "memory", "WFS", "WMS"];
const DEFAULT_DIRECTORIES: [&str; 3] = ["/workspace", "/logs", "/config"];
const DEFAULT_VARIABLES: [&str; 2] = ["QGIS_PREFIX_PATH", "PYTHONPATH"];

#[derive(Debug, Default, Deserialize, Clone)]
/// `[qgis]` section.
pub struct QgisCfg {
    pub version_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[plugin]` section describing the plugin whose installation is probed.
pub struct PluginCfg {
    pub label: Option<String>,
    pub module: Option<String>,
    pub path: Option<String>,
    pub min_files: Option<usize>,
    pub dependencies: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[processing]` section.
pub struct ProcessingCfg {
    pub min_algorithms: Option<usize>,
    pub algorithms: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[io]` section.
pub struct IoCfg {
    pub workspace: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[env]` section: container filesystem and variables.
pub struct EnvCfg {
    pub workspace: Option<String>,
    pub directories: Option<Vec<String>>,
    pub variables: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[providers]` section.
pub struct ProvidersCfg {
    pub essential: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `qgenv.toml|yaml`.
pub struct QgenvConfig {
    pub output: Option<String>,
    pub report_dir: Option<String>,
    pub log_dir: Option<String>,
    pub python: Option<String>,
    pub prefix_path: Option<String>,
    pub environment: Option<String>,
    pub libraries: Option<Vec<String>>,
    pub quick_modules: Option<Vec<String>>,
    #[serde(default)]
    pub qgis: Option<QgisCfg>,
    #[serde(default)]
    pub plugin: Option<PluginCfg>,
    #[serde(default)]
    pub processing: Option<ProcessingCfg>,
    #[serde(default)]
    pub io: Option<IoCfg>,
    #[serde(default)]
    pub env: Option<EnvCfg>,
    #[serde(default)]
    pub providers: Option<ProvidersCfg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Resolved plugin probe settings.
pub struct PluginSpec {
    pub label: String,
    pub module: String,
    pub path: PathBuf,
    pub min_files: usize,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub root: PathBuf,
    /// Config file the settings came from, if any.
    pub source: Option<PathBuf>,
    pub output: String,
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
    pub python: String,
    pub prefix_path: String,
    pub environment: String,
    pub version_prefix: String,
    pub libraries: Vec<String>,
    pub quick_modules: Vec<String>,
    pub plugin: PluginSpec,
    pub min_algorithms: usize,
    pub algorithms: Vec<String>,
    pub io_workspace: PathBuf,
    pub workspace: PathBuf,
    pub directories: Vec<PathBuf>,
    pub variables: Vec<String>,
    pub providers: Vec<String>,
}

#[derive(Debug, Default, Clone)]
/// CLI-level overrides. `None` means "not given on the command line".
pub struct Overrides {
    pub root: Option<String>,
    pub config: Option<String>,
    pub output: Option<String>,
    pub report_dir: Option<String>,
    pub log_dir: Option<String>,
    pub python: Option<String>,
}

/// Absolute form of `start`, resolved against the working directory.
pub fn absolute_start(start: &Path) -> PathBuf {
    if let Ok(p) = fs::canonicalize(start) {
        return p;
    }
    if start.is_absolute() {
        return start.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(start))
        .unwrap_or_else(|_| start.to_path_buf())
}

/// Walk upward from `start` to find the directory holding the config.
///
/// Stops when a `qgenv.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_root(start: &Path) -> PathBuf {
    let start = absolute_start(start);
    let mut cur = start.as_path();
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start,
        }
    }
}

/// Locate a config file directly inside `root`.
pub fn find_config(root: &Path) -> Option<PathBuf> {
    CONFIG_NAMES
        .iter()
        .map(|n| root.join(n))
        .find(|p| p.is_file())
}

/// Parse a config file, choosing TOML or YAML by extension.
pub fn load_file(path: &Path) -> Result<QgenvConfig> {
    let s = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&s).map_err(|e| HarnessError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    } else {
        toml::from_str(&s).map_err(|e| HarnessError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Load `QgenvConfig` from `qgenv.toml` or `qgenv.yaml|yml` if present.
///
/// A discovered file that fails to parse is reported and ignored.
pub fn load_config(root: &Path) -> Option<QgenvConfig> {
    let path = find_config(root)?;
    match load_file(&path) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config");
            eprintln!("{} {}; using defaults", crate::utils::warning_prefix(), e);
            None
        }
    }
}

/// Paths from a config file are relative to the file's directory.
fn anchored(root: &Path, value: String) -> PathBuf {
    let p = PathBuf::from(value);
    if p.is_absolute() {
        p
    } else {
        root.join(p)
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Resolve `Effective` by merging CLI flags, the config file, and defaults.
///
/// An explicit `--config` that cannot be read or parsed is an error.
pub fn resolve_effective(ov: &Overrides) -> Result<Effective> {
    let start = absolute_start(Path::new(ov.root.as_deref().unwrap_or(".")));
    let (root, source, cfg) = match ov.config.as_deref() {
        Some(explicit) => {
            let path = PathBuf::from(explicit);
            let cfg = load_file(&path)?;
            let path = absolute_start(&path);
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start.clone());
            (root, Some(path), cfg)
        }
        None => {
            let root = detect_root(&start);
            let source = find_config(&root);
            let cfg = load_config(&root).unwrap_or_default();
            (root, source, cfg)
        }
    };

    let output = ov
        .output
        .clone()
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    let report_dir = match (ov.report_dir.clone(), cfg.report_dir) {
        (Some(cli), _) => PathBuf::from(cli),
        (None, Some(file)) => anchored(&root, file),
        (None, None) => PathBuf::from("/workspace"),
    };
    let log_dir = match (ov.log_dir.clone(), cfg.log_dir) {
        (Some(cli), _) => PathBuf::from(cli),
        (None, Some(file)) => anchored(&root, file),
        (None, None) => PathBuf::from("/logs"),
    };
    let python = ov
        .python
        .clone()
        .or(cfg.python)
        .unwrap_or_else(|| "python3".to_string());
    let prefix_path = cfg.prefix_path.unwrap_or_else(|| "/usr".to_string());
    let environment = cfg
        .environment
        .unwrap_or_else(|| "Docker QGIS 3.34 LTR with EnMAP-Box".to_string());
    let version_prefix = cfg
        .qgis
        .and_then(|q| q.version_prefix)
        .unwrap_or_else(|| "3.34".to_string());
    let libraries = cfg.libraries.unwrap_or_else(|| owned(&DEFAULT_LIBRARIES));
    let quick_modules = cfg
        .quick_modules
        .unwrap_or_else(|| owned(&DEFAULT_QUICK_MODULES));

    let plugin_cfg = cfg.plugin.unwrap_or_default();
    let plugin = PluginSpec {
        label: plugin_cfg.label.unwrap_or_else(|| "EnMAP-Box".to_string()),
        module: plugin_cfg.module.unwrap_or_else(|| "enmapbox".to_string()),
        path: plugin_cfg
            .path
            .map(|p| anchored(&root, p))
            .unwrap_or_else(|| PathBuf::from("/usr/share/qgis/python/plugins/enmapbox")),
        min_files: plugin_cfg.min_files.unwrap_or(100),
        dependencies: plugin_cfg
            .dependencies
            .unwrap_or_else(|| owned(&["pyqtgraph", "spectral"])),
    };

    let processing = cfg.processing.unwrap_or_default();
    let min_algorithms = processing.min_algorithms.unwrap_or(100);
    let algorithms = processing
        .algorithms
        .unwrap_or_else(|| owned(&DEFAULT_ALGORITHMS));

    let env_cfg = cfg.env.unwrap_or_default();
    let workspace = env_cfg
        .workspace
        .map(|w| anchored(&root, w))
        .unwrap_or_else(|| PathBuf::from("/workspace"));
    let io_workspace = cfg
        .io
        .and_then(|io| io.workspace)
        .map(|w| anchored(&root, w))
        .unwrap_or_else(|| workspace.clone());
    let directories = env_cfg
        .directories
        .unwrap_or_else(|| owned(&DEFAULT_DIRECTORIES))
        .into_iter()
        .map(|d| anchored(&root, d))
        .collect();
    let variables = env_cfg
        .variables
        .unwrap_or_else(|| owned(&DEFAULT_VARIABLES));

    let providers = cfg
        .providers
        .and_then(|p| p.essential)
        .unwrap_or_else(|| owned(&DEFAULT_PROVIDERS));

    Ok(Effective {
        root,
        source,
        output,
        report_dir,
        log_dir,
        python,
        prefix_path,
        environment,
        version_prefix,
        libraries,
        quick_modules,
        plugin,
        min_algorithms,
        algorithms,
        io_workspace,
        workspace,
        directories,
        variables,
        providers,
    })
}

/// Starter config written by `qgenv init`, spelling out every default.
pub fn starter_toml() -> String {
    let list = |items: &[&str]| {
        items
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        r#"# qgenv validation settings (CLI flags take precedence)
output = "human"
report_dir = "/workspace"
log_dir = "/logs"
python = "python3"
prefix_path = "/usr"
libraries = [{libs}]
quick_modules = [{quick}]

[qgis]
version_prefix = "3.34"

[plugin]
label = "EnMAP-Box"
module = "enmapbox"
path = "/usr/share/qgis/python/plugins/enmapbox"
min_files = 100
dependencies = ["pyqtgraph", "spectral"]

[processing]
min_algorithms = 100
algorithms = [{algs}]

[env]
workspace = "/workspace"
directories = [{dirs}]
variables = [{vars}]

[providers]
essential = [{providers}]
"#,
        libs = list(&DEFAULT_LIBRARIES),
        quick = list(&DEFAULT_QUICK_MODULES),
        algs = list(&DEFAULT_ALGORITHMS),
        dirs = list(&DEFAULT_DIRECTORIES),
        vars = list(&DEFAULT_VARIABLES),
        providers = list(&DEFAULT_PROVIDERS),
    )
}
