mod fixtures;

use std::fs;
use std::process::{Command, Output};

use fixtures::{go_fixture_path, DYNAMIC_CLIENT};
use tempfile::TempDir;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_test-api-usage"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn fixture_arg() -> String {
    go_fixture_path(DYNAMIC_CLIENT).to_string_lossy().into_owned()
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--path"));
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("--output-file"));
    assert!(stdout.contains("--callgraph"));
}

#[test]
fn test_cli_missing_path() {
    let output = run(&[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("required") || stderr.contains("--path"));
}

#[test]
fn test_cli_invalid_path() {
    let output = run(&["--path", "/nonexistent/path/that/does/not/exist"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Invalid arguments"));
}

#[test]
fn test_cli_invalid_output_format() {
    let output = run(&["--path", &fixture_arg(), "--format", "xml"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("invalid value") || stderr.contains("possible values"));
}

#[test]
fn test_cli_writes_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let report_path = temp_dir.path().join("report.json");

    let output = run(&[
        "--path",
        &fixture_arg(),
        "--output-file",
        report_path.to_str().unwrap(),
        "--quiet",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["total_tests"], 5);
    assert_eq!(report["helper_count"], 9);
    assert_eq!(report["tests"].as_array().unwrap().len(), 5);
    assert_eq!(report["failures"].as_array().unwrap().len(), 1);
    assert!(report.get("traversal").is_none());
}

#[test]
fn test_cli_text_report_on_stdout() {
    let output = run(&["--path", &fixture_arg(), "--format", "text", "--callgraph"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("5 tests, 9 helpers, 5 files"));
    assert!(stdout.contains("[sig-apps] workloads"));
    assert!(stdout.contains("- apps/v1/statefulsets"));
    assert!(stdout.contains("unresolved (1):"));
    assert!(stdout.contains("call graph ("));
}

#[test]
fn test_cli_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "classifier:\n  domain_suffixes: [\"openshift.io\"]\n").unwrap();

    let output = run(&[
        "--path",
        &fixture_arg(),
        "--config",
        config_path.to_str().unwrap(),
        "-q",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("apps/v1/deployments"));
    assert!(stdout.contains("config.openshift.io/v1/networks"));
}

#[test]
fn test_cli_rejects_unknown_config_format() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "max_passes = 3\n").unwrap();

    let output = run(&["--path", &fixture_arg(), "--config", config_path.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unsupported config format"));
}
