mod common;

use common::TestEnv;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;

#[test]
fn version_prints_package_version() {
    TestEnv::new()
        .cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn quick_validation_fails_without_python_and_writes_reports() {
    let env = TestEnv::new();
    env.validate()
        .arg("--quick")
        .assert()
        .code(1)
        .stdout(contains("Import: qgis.core"))
        .stdout(contains("Tests Run: 3"));
    let report = env.read_report();
    assert_eq!(report["total_tests"], 3);
    assert_eq!(report["failed"], 3);
    assert_eq!(report["success_rate"], "0.0%");
    assert_eq!(report["failures"][1]["test"], "Import: numpy");
    let text = fs::read_to_string(env.reports.join("test_report.txt")).unwrap();
    assert!(text.contains("Failed Tests:\n  - Import: qgis.core: "));
}

#[test]
fn full_validation_json_output_keeps_routine_order() {
    let env = TestEnv::new();
    let out = env
        .validate()
        .args(["--output", "json"])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let printed: serde_json::Value = serde_json::from_slice(&out).expect("stdout is the report");
    let tests: Vec<String> = printed["failures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["test"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(tests[0], "QGIS Installation");
    assert_eq!(tests[1], "Library: numpy");
    let pos = |name: &str| tests.iter().position(|t| t == name).unwrap();
    assert!(pos("Processing Framework") < pos("Data I/O"));
    assert!(pos("Data I/O") < pos("Providers"));

    // Same run, same document on stdout and on disk.
    let persisted = env.read_report();
    assert_eq!(persisted, printed);
}

#[test]
fn unwritable_report_dir_is_fatal() {
    let env = TestEnv::new();
    let mut cmd = env.cmd();
    cmd.args(["validate", "--quick", "--python", "qgenv-test-missing-python"])
        .arg("--root")
        .arg(&env.root)
        .arg("--report-dir")
        .arg(env.root.join("does/not/exist"))
        .assert()
        .code(2)
        .stderr(contains("error:"));
}

#[test]
fn broken_explicit_config_is_fatal() {
    let env = TestEnv::new();
    let cfg = env.root.join("custom.toml");
    fs::write(&cfg, "libraries = 3\n").unwrap();
    env.cmd()
        .args(["validate", "--quick", "--config"])
        .arg(&cfg)
        .assert()
        .code(2)
        .stderr(contains("invalid config"));
}

#[test]
fn config_file_selects_quick_modules() {
    let env = TestEnv::new();
    fs::write(
        env.root.join("qgenv.toml"),
        "quick_modules = [\"json\"]\nenvironment = \"sandbox\"\n",
    )
    .unwrap();
    env.validate().arg("--quick").assert().code(1);
    let report = env.read_report();
    assert_eq!(report["total_tests"], 1);
    assert_eq!(report["environment"], "sandbox");
    assert_eq!(report["failures"][0]["test"], "Import: json");
}

#[test]
fn config_is_discovered_from_a_nested_working_directory() {
    let env = TestEnv::new();
    fs::write(
        env.root.join("qgenv.toml"),
        "quick_modules = [\"json\"]\nreport_dir = \"reports\"\n",
    )
    .unwrap();
    let nested = env.root.join("a/b");
    fs::create_dir_all(&nested).unwrap();
    env.cmd()
        .current_dir(&nested)
        .args(["validate", "--quick", "--python", "qgenv-test-missing-python"])
        .assert()
        .code(1);
    let report = env.read_report();
    assert_eq!(report["total_tests"], 1);
    assert_eq!(report["failures"][0]["test"], "Import: json");
    assert!(!nested.join("test_report.json").exists());
}

#[test]
fn init_scaffolds_empty_directory_without_prompt() {
    let env = TestEnv::new();
    let target = env.root.join("project");
    env.cmd()
        .arg("init")
        .arg(&target)
        .write_stdin("")
        .assert()
        .success()
        .stdout(contains("SETUP COMPLETE!"))
        .stdout(contains("Directory is not empty").not());
    for f in [
        "docker/Dockerfile",
        "docker-compose.yml",
        "docker/requirements.txt",
        "scripts/install_enmap.sh",
        "scripts/startup.py",
        "scripts/validate_environment.py",
        "tests/test_environment.py",
        ".env",
        ".gitignore",
        "README.md",
        "qgenv.toml",
        "workspace/data/.gitkeep",
        "logs/.gitkeep",
    ] {
        assert!(target.join(f).is_file(), "missing {}", f);
    }
    assert!(target.join(".github/workflows").is_dir());
}

#[test]
fn init_on_populated_directory_prompts_and_can_be_declined() {
    let env = TestEnv::new();
    let target = env.root.join("project");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("notes.txt"), "mine").unwrap();
    env.cmd()
        .arg("init")
        .arg(&target)
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(contains("Directory is not empty"))
        .stdout(contains("notes.txt"))
        .stdout(contains("Setup cancelled."));
    assert!(!target.join("README.md").exists());
    assert_eq!(fs::read_dir(&target).unwrap().count(), 1);
}

#[test]
fn second_init_prompts_and_overwrites_on_yes() {
    let env = TestEnv::new();
    let target = env.root.join("project");
    env.cmd().arg("init").arg(&target).assert().success();
    fs::write(target.join("README.md"), "local edits").unwrap();
    env.cmd()
        .arg("init")
        .arg(&target)
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(contains("Continue anyway?"))
        .stdout(contains("overwrote"));
    let readme = fs::read_to_string(target.join("README.md")).unwrap();
    assert!(readme.starts_with("# QGIS Docker Environment"));
}

#[test]
fn init_json_reports_actions() {
    let env = TestEnv::new();
    let target = env.root.join("project");
    let out = env
        .cmd()
        .args(["init", "--yes", "--output", "json"])
        .arg(&target)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["summary"]["dirs"], 9);
    assert_eq!(v["summary"]["files"], 11);
    assert_eq!(v["summary"]["overwritten"], 0);
}

#[test]
fn init_json_keeps_prompt_off_stdout() {
    let env = TestEnv::new();
    let target = env.root.join("project");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("notes.txt"), "mine").unwrap();
    let out = env
        .cmd()
        .args(["init", "--output", "json"])
        .arg(&target)
        .write_stdin("y\n")
        .assert()
        .success()
        .stderr(contains("Directory is not empty"))
        .stderr(contains("Continue anyway? (y/n)"))
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).expect("stdout is only the action document");
    assert_eq!(v["summary"]["files"], 11);

    env.cmd()
        .args(["init", "--output", "json"])
        .arg(&target)
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(contains("Setup cancelled."));
}

#[test]
fn start_without_command_reports_ready_and_logs() {
    let env = TestEnv::new();
    let logs = env.root.join("logs");
    env.cmd()
        .args(["start", "--python", "qgenv-test-missing-python", "--log-dir"])
        .arg(&logs)
        .env("TARGETPLATFORM", "linux/arm64")
        .assert()
        .success()
        .stdout(contains("Platform: linux/arm64"))
        .stdout(contains("Environment ready!"));
    let log = fs::read_to_string(logs.join("startup.log")).unwrap();
    assert!(log.ends_with(" - Environment started\n"));
}

#[cfg(unix)]
#[test]
fn start_relays_command_exit_code() {
    let env = TestEnv::new();
    env.cmd()
        .args(["start", "--python", "qgenv-test-missing-python", "--log-dir"])
        .arg(env.root.join("logs"))
        .args(["--", "sh", "-c", "echo from-child; exit 7"])
        .assert()
        .code(7)
        .stdout(contains("from-child"))
        .stdout(contains("Environment ready!").not());
}
