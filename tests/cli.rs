#![allow(unused_crate_dependencies)]

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help() {
    let mut cmd = cmd();
    cmd.arg("--help").assert().success();
}

#[test]
fn test_auth_check_json_reports_failure_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cmd();
    cmd.env("XDG_CONFIG_HOME", dir.path())
        .env("TUTANOTA_NO_SESSION_PERSISTENCE", "yes")
        .env("TUTANOTA_API_URL", "http://127.0.0.1:1")
        .env("TUTANOTA_EMAIL", "nobody@example.com")
        .env("TUTANOTA_PASSWORD", "irrelevant")
        .args(["auth", "check", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"ok\":false"));
}

#[test]
fn test_auth_logout_without_session_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cmd();
    cmd.env("XDG_CONFIG_HOME", dir.path())
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("logged out"));
}

#[test]
fn test_mails_list_requires_folder_id() {
    let mut cmd = cmd();
    cmd.args(["mails", "list"]).assert().failure();
}

fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}
