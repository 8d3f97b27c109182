//! Integration tests for the CLI
//!
//! Runs the built binary against temp workspaces for apply, validate and query.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const DEPLOYMENT: &str = r#"metadata:
  name: web
spec:
  replicas: 1
  containers:
  - name: nginx
    image: nginx:1.0
  - name: sidecar
    image: envoy:1.0
"#;

/// Helper to create a workspace with a document and a rule file
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::write(dir.path().join("deploy.yaml"), DEPLOYMENT).unwrap();
    fs::write(
        dir.path().join("rules.yaml"),
        r#"meta:
  name: bump
  description: Bump nginx and scale up
rules:
  - action: replace
    path: spec.containers[name=nginx].image
    value: nginx:1.25
  - action: set
    path: spec.replicas
    value: 3
  - action: delete
    path: spec.volumes
    continue_on_not_found: true
"#,
    )
    .unwrap();

    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_yaml-patcher"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_apply_help() {
    let output = run(&["apply", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply a rule file"));
}

#[test]
fn test_apply_in_place() {
    let workspace = setup_test_workspace();
    let config = workspace.path().join("rules.yaml");
    let input = workspace.path().join("deploy.yaml");

    let output = run(&["apply", "--config", arg(&config), "--input", arg(&input)]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("Loaded 3 rule(s)"));
    assert!(stdout.contains("Patched"));
    assert!(stdout.contains("Summary:"));
    assert!(stdout.contains("1 rule(s) skipped"));

    let patched = fs::read_to_string(&input).unwrap();
    assert!(patched.contains("image: nginx:1.25"));
    assert!(patched.contains("image: envoy:1.0"));
    assert!(patched.contains("replicas: 3"));
}

#[test]
fn test_apply_dry_run_with_diff() {
    let workspace = setup_test_workspace();
    let config = workspace.path().join("rules.yaml");
    let input = workspace.path().join("deploy.yaml");

    let output = run(&[
        "apply",
        "--config",
        arg(&config),
        "--input",
        arg(&input),
        "--dry-run",
        "--diff",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("Would patch"));
    assert!(stdout.contains("-  replicas: 1"));
    assert!(stdout.contains("+  replicas: 3"));
    assert_eq!(fs::read_to_string(&input).unwrap(), DEPLOYMENT);
}

#[test]
fn test_apply_failure_exits_nonzero() {
    let workspace = setup_test_workspace();
    let config = workspace.path().join("strict.yaml");
    fs::write(
        &config,
        "rules:\n  - action: set\n    path: spec.containers[name=redis].image\n    value: x\n",
    )
    .unwrap();
    let input = workspace.path().join("deploy.yaml");

    let output = run(&["apply", "--config", arg(&config), "--input", arg(&input)]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("rule #1"));
    assert_eq!(fs::read_to_string(&input).unwrap(), DEPLOYMENT);
}

#[test]
fn test_apply_directory_to_output() {
    let workspace = setup_test_workspace();
    let config = workspace.path().join("rules.yaml");
    let docs = workspace.path().join("docs");
    let out = workspace.path().join("out");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.yaml"), DEPLOYMENT).unwrap();

    let output = run(&[
        "apply",
        "--config",
        arg(&config),
        "--dir",
        arg(&docs),
        "--output",
        arg(&out),
    ]);

    assert!(output.status.success());
    assert!(fs::read_to_string(out.join("a.yaml"))
        .unwrap()
        .contains("replicas: 3"));
    assert_eq!(fs::read_to_string(docs.join("a.yaml")).unwrap(), DEPLOYMENT);
}

#[test]
fn test_output_requires_dir() {
    let workspace = setup_test_workspace();
    let config = workspace.path().join("rules.yaml");
    let input = workspace.path().join("deploy.yaml");

    let output = run(&[
        "apply",
        "--config",
        arg(&config),
        "--input",
        arg(&input),
        "--output",
        arg(workspace.path()),
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_validate_lists_rules() {
    let workspace = setup_test_workspace();
    let config = workspace.path().join("rules.yaml");

    let output = run(&["validate", "--config", arg(&config)]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 rule(s) valid"));
    assert!(stdout.contains("1. replace spec.containers[name=nginx].image"));
    assert!(stdout.contains("3. delete spec.volumes (optional)"));
}

#[test]
fn test_validate_reports_every_issue() {
    let workspace = setup_test_workspace();
    let config = workspace.path().join("bad.yaml");
    fs::write(
        &config,
        "rules:\n  - action: replace\n    path: a\n  - action: set\n    path: 'b['\n    value: 1\n",
    )
    .unwrap();

    let output = run(&["validate", "--config", arg(&config)]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 problem(s)"));
    assert!(stderr.contains("rule #1 missing required field 'value'"));
    assert!(stderr.contains("rule #2 has an invalid path"));
}

#[test]
fn test_query_prints_matches() {
    let workspace = setup_test_workspace();
    let input = workspace.path().join("deploy.yaml");

    let output = run(&[
        "query",
        "--input",
        arg(&input),
        "--path",
        "spec.containers[*].image",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# document 1: 2 match(es)"));
    let nginx = stdout.find("nginx:1.0").unwrap();
    let envoy = stdout.find("envoy:1.0").unwrap();
    assert!(nginx < envoy);
}

#[test]
fn test_query_navigation_error() {
    let workspace = setup_test_workspace();
    let input = workspace.path().join("deploy.yaml");

    let output = run(&["query", "--input", arg(&input), "--path", "spec.containers[5]"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("document 1"));
}
