use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn admin_init_creates_database_and_token_file() {
    let temp = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("northstar").unwrap();
    cmd.args(["admin", "init", "--non-interactive", "--data-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Admin session token"));

    assert!(temp.path().join("northstar.db").exists());

    let token = std::fs::read_to_string(temp.path().join(".admin_token")).unwrap();
    assert!(token.starts_with("northstar_"));
}

#[test]
fn admin_init_refuses_to_run_twice() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("northstar")
        .unwrap()
        .args(["admin", "init", "--non-interactive", "--data-dir"])
        .arg(temp.path())
        .assert()
        .success();

    Command::cargo_bin("northstar")
        .unwrap()
        .args(["admin", "init", "--non-interactive", "--data-dir"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn serve_requires_initialization() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("northstar")
        .unwrap()
        .args(["serve", "--data-dir"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
