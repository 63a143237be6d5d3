//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tsdojo() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("tsdojo").unwrap()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

// ─────────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────────

#[test]
fn run_basic_types_demo() {
    tsdojo()
        .args(["run", "--code", "../../demos/basic-types/solution.ts"])
        .args(["--suite", "../../demos/basic-types/suite.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Basic Types"))
        .stdout(predicate::str::contains("4 passed, 0 failed, 4 total"));
}

#[test]
fn run_addition_demo_from_toml() {
    tsdojo()
        .args(["run", "--code", "../../demos/addition/solution.ts"])
        .args(["--suite", "../../demos/addition/suite.toml"])
        .args(["--config", "../../demos/runner.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 passed, 0 failed, 3 total"));
}

#[test]
fn failing_case_exits_one() {
    tsdojo()
        .args(["run", "--code", "../../demos/addition/wrong.ts"])
        .args(["--suite", "../../demos/addition/suite.toml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("expected 0, got -1"))
        .stdout(predicate::str::contains("2 passed, 1 failed"));
}

#[test]
fn json_format_is_machine_readable() {
    let output = tsdojo()
        .args(["run", "--code", "../../demos/addition/solution.ts"])
        .args(["--suite", "../../demos/addition/suite.toml"])
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["name"], "Addition");
    assert_eq!(report["total"], 3);
    assert_eq!(report["results"][2]["actual"], 0);
}

#[test]
fn compile_error_is_reported() {
    let dir = TempDir::new().unwrap();
    let code = write(&dir, "broken.ts", "export function broken(");
    tsdojo()
        .args(["run", "--code"])
        .arg(&code)
        .args(["--suite", "../../demos/addition/suite.toml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[compile] Code evaluation failed"))
        .stdout(predicate::str::contains("0 passed, 1 failed, 1 total"));
}

#[test]
fn step_limit_override_times_out() {
    let dir = TempDir::new().unwrap();
    let code = write(
        &dir,
        "slow.ts",
        "export function slow(n: number) { let s = 0; for (let i = 0; i < 1e6; i++) s += i; return n; }",
    );
    let suite = write(
        &dir,
        "suite.json",
        r#"{ "name": "Slow", "cases": [{ "input": 1, "expected": 1 }] }"#,
    );
    tsdojo()
        .args(["run", "--code"])
        .arg(&code)
        .arg("--suite")
        .arg(&suite)
        .args(["--case-step-limit", "1000"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[timeout]"));
}

#[test]
fn missing_suite_file_exits_two() {
    tsdojo()
        .args(["run", "--code", "../../demos/addition/solution.ts"])
        .args(["--suite", "nonexistent.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn invalid_format_is_usage_error() {
    tsdojo()
        .args(["run", "--code", "a.ts", "--suite", "b.json", "--format", "xml"])
        .assert()
        .code(2);
}

// ─────────────────────────────────────────────────────────────────────
// check
// ─────────────────────────────────────────────────────────────────────

#[test]
fn check_lists_exports() {
    let dir = TempDir::new().unwrap();
    let code = write(
        &dir,
        "lib.ts",
        "export function first() {}\nexport const second = 2;\nexport type Hidden = string;\n",
    );
    tsdojo()
        .args(["check", "--code"])
        .arg(&code)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exports: first, second"))
        .stdout(predicate::str::contains("Entry point: first"));
}

#[test]
fn check_reports_diagnostics() {
    let dir = TempDir::new().unwrap();
    let code = write(&dir, "broken.ts", "const x = ;\n");
    tsdojo()
        .args(["check", "--code"])
        .arg(&code)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("broken.ts:1:"))
        .stdout(predicate::str::contains("error["));
}

#[test]
fn check_without_exports() {
    let dir = TempDir::new().unwrap();
    let code = write(&dir, "none.ts", "function local() {}\n");
    tsdojo()
        .args(["check", "--code"])
        .arg(&code)
        .assert()
        .success()
        .stdout(predicate::str::contains("No exports found."));
}
