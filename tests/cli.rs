use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn luna_eval_prints_result() {
    let mut cmd = Command::cargo_bin("luna").expect("binary exists");
    cmd.arg("eval").arg("1 + 2 * 3");
    cmd.assert().success().stdout("7\n");
}

#[test]
fn luna_eval_skips_void_results() {
    let mut cmd = Command::cargo_bin("luna").expect("binary exists");
    cmd.arg("eval").arg("io.print(\"hello\", 42)");
    cmd.assert().success().stdout("hello 42\n");
}

#[test]
fn luna_run_script_file() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("main.luna");
    fs::write(
        &script,
        r#"
# greet everyone in the list
names: const = ["Ada", "Linus"]
for i: var = 0; i < names.length(); i++ {
    name: var = names[i]
    io.print("Hello from {name}!")
}
debug {names.length()}
"#,
    )
    .expect("write script");

    let mut cmd = Command::cargo_bin("luna").expect("binary exists");
    cmd.arg("run").arg(&script);
    cmd.assert()
        .success()
        .stdout("Hello from Ada!\nHello from Linus!\nDEBUG: 2\n");
}

#[test]
fn luna_run_missing_file_fails() {
    let dir = tempdir().expect("create temp dir");
    let mut cmd = Command::cargo_bin("luna").expect("binary exists");
    cmd.arg("run").arg(dir.path().join("absent.luna"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}

#[test]
fn luna_reports_runtime_errors_on_stderr() {
    let mut cmd = Command::cargo_bin("luna").expect("binary exists");
    cmd.arg("eval").arg("1 + true");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "unsupported binary operation: number + boolean",
        ))
        .stderr(predicate::str::contains("^"));
}

#[test]
fn luna_exit_sets_status_code() {
    let mut cmd = Command::cargo_bin("luna").expect("binary exists");
    cmd.arg("eval").arg("io.print(\"bye\")\nexit(3)\nio.print(\"unreachable\")");
    cmd.assert()
        .code(3)
        .stdout("bye\n");
}
