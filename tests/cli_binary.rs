use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("jreport").unwrap()
}

// --- Help & version ---

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("weekly Jira report"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jreport"));
}

#[test]
fn generate_report_help() {
    cmd()
        .args(["generate-report", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--days-ago"))
        .stdout(predicate::str::contains("--till"))
        .stdout(predicate::str::contains("--image-output"));
}

// --- Fatal configuration errors (reported before any network call) ---

#[test]
fn missing_config_file() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["generate-report", "--config", "does-not-exist.toml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn invalid_till_date() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["generate-report", "--till", "20-12-2021"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid --till date"));
}

#[test]
fn malformed_category_pattern() {
    let tmp = tempfile::tempdir().unwrap();
    let config = r#"
[general]
jira_instance = "https://issues.example.com"
jira_token = "secret"
jira_project = "PROJ"
jira_closed_states = ["Done"]
jira_open_states = ["New"]

[[categories]]
name = "Broken"
pattern = "^bug("
"#;
    fs::write(tmp.path().join("config.toml"), config).unwrap();
    cmd()
        .current_dir(&tmp)
        .arg("generate-report")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid pattern"));
}

#[test]
fn unknown_config_field() {
    let tmp = tempfile::tempdir().unwrap();
    let config = r#"
[general]
jira_instance = "https://issues.example.com"
jira_token = "secret"
jira_project = "PROJ"
jira_closed_states = ["Done"]
jira_open_states = ["New"]
surprise = true
"#;
    fs::write(tmp.path().join("config.toml"), config).unwrap();
    cmd()
        .current_dir(&tmp)
        .arg("generate-report")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown field"));
}
