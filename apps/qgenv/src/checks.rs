//! Check routines of the validation harness.
//!
//! Each routine performs one or more independent probes and records exactly
//! one result per probe. Individual probe failures are data, not errors:
//! a routine only returns `Err` when the probed subsystem as a whole is
//! unusable (for example, QGIS cannot be initialized), and the runner turns
//! that into a single failing result.

use crate::config::Effective;
use crate::error::{HarnessError, Result};
use crate::harness::Aggregator;
use crate::models::CheckResult;
use crate::probe::{self, Probe};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Import errors that only mean "no display attached".
static GUI_ONLY_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)pyqtgraph|display").unwrap());

/// What a routine can see: the probe and the resolved settings.
pub struct Context<'a> {
    pub probe: &'a dyn Probe,
    pub settings: &'a Effective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routine {
    Quick,
    QgisInstallation,
    PythonLibraries,
    PluginInstallation,
    ProcessingAlgorithms,
    DataIo,
    ContainerEnvironment,
    DataProviders,
}

impl Routine {
    /// Full check set in report order.
    pub const FULL: [Routine; 7] = [
        Routine::QgisInstallation,
        Routine::PythonLibraries,
        Routine::PluginInstallation,
        Routine::ProcessingAlgorithms,
        Routine::DataIo,
        Routine::ContainerEnvironment,
        Routine::DataProviders,
    ];

    /// Minimal check set used by container health checks.
    pub const QUICK: [Routine; 1] = [Routine::Quick];

    pub fn title(&self) -> &'static str {
        match self {
            Routine::Quick => "Quick validation...",
            Routine::QgisInstallation => "Testing QGIS Installation...",
            Routine::PythonLibraries => "Testing Python Libraries...",
            Routine::PluginInstallation => "Testing Plugin Installation...",
            Routine::ProcessingAlgorithms => "Testing Processing Algorithms...",
            Routine::DataIo => "Testing Data I/O...",
            Routine::ContainerEnvironment => "Testing Container Environment...",
            Routine::DataProviders => "Testing Data Providers...",
        }
    }

    /// Name of the single result recorded when the whole routine fails.
    pub fn failure_name(&self, ctx: &Context<'_>) -> String {
        match self {
            Routine::Quick => "Quick Validation".into(),
            Routine::QgisInstallation => "QGIS Installation".into(),
            Routine::PythonLibraries => "Python Libraries".into(),
            Routine::PluginInstallation => format!("{} Installation", ctx.settings.plugin.label),
            Routine::ProcessingAlgorithms => "Processing Framework".into(),
            Routine::DataIo => "Data I/O".into(),
            Routine::ContainerEnvironment => "Container Environment".into(),
            Routine::DataProviders => "Providers".into(),
        }
    }

    pub fn run(&self, ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
        match self {
            Routine::Quick => quick(ctx, agg),
            Routine::QgisInstallation => qgis_installation(ctx, agg),
            Routine::PythonLibraries => python_libraries(ctx, agg),
            Routine::PluginInstallation => plugin_installation(ctx, agg),
            Routine::ProcessingAlgorithms => processing_algorithms(ctx, agg),
            Routine::DataIo => data_io(ctx, agg),
            Routine::ContainerEnvironment => container_environment(ctx, agg),
            Routine::DataProviders => data_providers(ctx, agg),
        }
    }
}

fn quick(ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
    for module in &ctx.settings.quick_modules {
        let a = ctx.probe.import(module);
        agg.add_result(format!("Import: {}", module), a.available, a.detail);
    }
    Ok(())
}

fn qgis_installation(ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
    let s = ctx.settings;
    let out = ctx
        .probe
        .script("qgis", probe::QGIS_INIT, &[s.prefix_path.clone()])?;
    let version = out
        .get("version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| missing_field("qgis", "version"))?;
    let label = format!("QGIS Version {} LTR", s.version_prefix);
    if version.starts_with(&s.version_prefix) {
        agg.add_result(label, true, format!("Version: {}", version));
    } else {
        agg.add_result(label, false, format!("Wrong version: {}", version));
    }
    agg.add_result("QGIS Initialization", true, "");
    Ok(())
}

/// Name a library is reported under: the last segment of its import path,
/// so `osgeo.gdal` reports as `gdal`.
pub fn library_label(module: &str) -> &str {
    module.rsplit('.').next().unwrap_or(module)
}

fn python_libraries(ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
    for lib in &ctx.settings.libraries {
        let name = format!("Library: {}", library_label(lib));
        let a = ctx.probe.import(lib);
        if a.available {
            agg.add_result(name, true, format!("v{}", a.detail));
        } else {
            tracing::debug!(library = %lib, detail = %a.detail, "import failed");
            agg.add_result(name, false, "Not installed");
        }
    }
    Ok(())
}

/// Count regular files below `root`, following the layout on disk.
pub fn count_files(root: &Path) -> usize {
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    match glob::glob(&pattern) {
        Ok(paths) => paths.flatten().filter(|p| p.is_file()).count(),
        Err(_) => 0,
    }
}

fn plugin_installation(ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
    let plugin = &ctx.settings.plugin;
    if !plugin.path.exists() {
        agg.add_result(format!("{} Files", plugin.label), false, "Not found");
        return Ok(());
    }
    agg.add_result(
        format!("{} Files", plugin.label),
        true,
        format!("Found at {}", plugin.path.display()),
    );

    let n = count_files(&plugin.path);
    if n > plugin.min_files {
        agg.add_result(
            format!("{} Completeness", plugin.label),
            true,
            format!("{} files", n),
        );
    } else {
        agg.add_result(
            format!("{} Completeness", plugin.label),
            false,
            format!("Only {} files", n),
        );
    }

    for dep in &plugin.dependencies {
        let a = ctx.probe.import(dep);
        agg.add_result(
            format!("{} Dependency: {}", plugin.label, dep),
            a.available,
            if a.available { String::new() } else { "Not installed".to_string() },
        );
    }

    let a = ctx.probe.import(&plugin.module);
    let name = format!("{} Import", plugin.label);
    if a.available {
        agg.add_result(name, true, "Module loads");
    } else if is_gui_only_error(&a.detail) {
        agg.add_result(name, true, "Installed (GUI components need display)");
    } else {
        agg.add_result(name, false, a.detail);
    }
    Ok(())
}

fn is_gui_only_error(detail: &str) -> bool {
    GUI_ONLY_ERROR.is_match(detail)
}

fn processing_algorithms(ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
    let s = ctx.settings;
    let mut args = vec![s.prefix_path.clone()];
    args.extend(s.algorithms.iter().cloned());
    let out = ctx.probe.script("processing", probe::PROCESSING, &args)?;
    let count = out
        .get("count")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| missing_field("processing", "count"))? as usize;

    if count > s.min_algorithms {
        agg.add_result(
            "Processing Algorithms",
            true,
            format!("{} algorithms available", count),
        );
    } else {
        agg.add_result(
            "Processing Algorithms",
            false,
            format!("Only {} algorithms", count),
        );
    }

    for alg in &s.algorithms {
        let found = out
            .get("found")
            .and_then(|f| f.get(alg))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if found {
            agg.add_result(format!("Algorithm: {}", alg), true, "");
        } else {
            agg.add_result(format!("Algorithm: {}", alg), false, "Not found");
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct DataIoOutput {
    steps: Vec<CheckResult>,
}

fn data_io(ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
    let s = ctx.settings;
    let args = [
        s.prefix_path.clone(),
        s.io_workspace.to_string_lossy().to_string(),
    ];
    let out = ctx.probe.script("data_io", probe::DATA_IO, &args)?;
    let parsed: DataIoOutput =
        serde_json::from_value(out).map_err(|source| HarnessError::Output {
            name: "data_io".into(),
            source,
        })?;
    for step in parsed.steps {
        agg.add_result(step.name, step.passed, step.message);
    }
    Ok(())
}

fn container_environment(ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
    let s = ctx.settings;
    agg.add_result("Workspace Directory", s.workspace.is_dir(), "");

    let probe_file = s.workspace.join("test_write.txt");
    let writable = fs::write(&probe_file, "test").and_then(|_| fs::remove_file(&probe_file));
    match writable {
        Ok(()) => agg.add_result("Workspace Write Permission", true, ""),
        Err(e) => {
            tracing::debug!(path = %probe_file.display(), error = %e, "workspace not writable");
            agg.add_result("Workspace Write Permission", false, "Cannot write to workspace");
        }
    }

    for dir in &s.directories {
        let name = format!("Directory: {}", dir.display());
        if dir.is_dir() {
            agg.add_result(name, true, "");
        } else {
            agg.add_result(name, false, "Missing");
        }
    }

    for var in &s.variables {
        match ctx.probe.var(var) {
            Some(value) => agg.add_result(format!("Environment: {}", var), true, value),
            None => agg.add_result(format!("Environment: {}", var), false, "Not set"),
        }
    }
    Ok(())
}

fn data_providers(ctx: &Context<'_>, agg: &mut Aggregator) -> Result<()> {
    let s = ctx.settings;
    let out = ctx
        .probe
        .script("providers", probe::PROVIDERS, &[s.prefix_path.clone()])?;
    let providers: Vec<String> = out
        .get("providers")
        .and_then(|v| v.as_array())
        .ok_or_else(|| missing_field("providers", "providers"))?
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();

    for key in &s.providers {
        if providers.iter().any(|p| p == key) {
            agg.add_result(format!("Provider: {}", key), true, "");
        } else {
            agg.add_result(format!("Provider: {}", key), false, "Not available");
        }
    }
    agg.add_result(
        "Total Providers",
        true,
        format!("{} providers available", providers.len()),
    );
    Ok(())
}

fn missing_field(name: &str, field: &str) -> HarnessError {
    HarnessError::Script {
        name: name.to_string(),
        status: "exit status: 0".to_string(),
        stderr: format!("output has no `{}` field", field),
    }
}
