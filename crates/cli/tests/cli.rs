use assert_cmd::Command;
use predicates::prelude::*;
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn nextver_cmd() -> Command {
    Command::cargo_bin("nextver").unwrap()
}

fn create_git_repo() -> TempDir {
    let temp = TempDir::new().unwrap();
    let repo_path = temp.path();

    StdCommand::new("git")
        .args(["init", "--initial-branch=main"])
        .current_dir(repo_path)
        .output()
        .unwrap();

    StdCommand::new("git")
        .args(["config", "user.email", "test@example.com"])
        .current_dir(repo_path)
        .output()
        .unwrap();

    StdCommand::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(repo_path)
        .output()
        .unwrap();

    StdCommand::new("git")
        .args(["commit", "--allow-empty", "-m", "Initial commit"])
        .current_dir(repo_path)
        .output()
        .unwrap();

    temp
}

fn create_git_repo_with_tag(tag: &str) -> TempDir {
    let temp = create_git_repo();
    let repo_path = temp.path();

    StdCommand::new("git")
        .args(["tag", tag])
        .current_dir(repo_path)
        .output()
        .unwrap();

    temp
}

#[test]
fn test_help_flag() {
    nextver_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Calculate the next semantic version from Git history",
        ));
}

#[test]
fn test_version_flag() {
    nextver_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"nextver \d+\.\d+\.\d+").unwrap());
}

#[test]
fn test_no_increment_configured_is_an_error() {
    let temp = create_git_repo();
    nextver_cmd()
        .current_dir(temp.path())
        .assert()
        .code(2);
}

#[test]
fn test_in_git_repo_with_tag() {
    let temp = create_git_repo_with_tag("1.0.0");
    nextver_cmd()
        .current_dir(temp.path())
        .arg("--increment")
        .arg("patch")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"));
}

#[test]
fn test_non_git_directory_falls_back_to_zero_version() {
    let temp = TempDir::new().unwrap();
    nextver_cmd()
        .current_dir(temp.path())
        .arg("--increment")
        .arg("patch")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.0.0"));
}

#[test]
fn test_tag_prefix() {
    let temp = create_git_repo();
    let repo_path = temp.path();

    StdCommand::new("git")
        .args(["tag", "v1.0.0"])
        .current_dir(repo_path)
        .output()
        .unwrap();

    nextver_cmd()
        .current_dir(repo_path)
        .arg("--increment")
        .arg("patch")
        .arg("--tag-prefix")
        .arg("v")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"));
}

#[test]
fn test_increment_flag_major() {
    let temp = create_git_repo_with_tag("1.0.0");
    let repo_path = temp.path();

    StdCommand::new("git")
        .args(["commit", "--allow-empty", "-m", "a change"])
        .current_dir(repo_path)
        .output()
        .unwrap();

    nextver_cmd()
        .current_dir(repo_path)
        .arg("--increment")
        .arg("major")
        .assert()
        .success()
        .stdout(predicate::str::contains("2.0.0"));
}

#[test]
fn test_env_var_increment() {
    let temp = create_git_repo_with_tag("1.0.0");
    let repo_path = temp.path();

    StdCommand::new("git")
        .args(["commit", "--allow-empty", "-m", "a change"])
        .current_dir(repo_path)
        .output()
        .unwrap();

    nextver_cmd()
        .current_dir(repo_path)
        .env("NEXTVER_INCREMENT", "minor")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.1.0"));
}

#[test]
fn test_cli_args_override_env_vars() {
    let temp = create_git_repo_with_tag("1.0.0");
    let repo_path = temp.path();

    StdCommand::new("git")
        .args(["commit", "--allow-empty", "-m", "a change"])
        .current_dir(repo_path)
        .output()
        .unwrap();

    nextver_cmd()
        .current_dir(repo_path)
        .env("NEXTVER_INCREMENT", "major")
        .arg("--increment")
        .arg("minor")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.1.0"));
}

#[test]
fn test_json_output() {
    let temp = create_git_repo_with_tag("1.2.3");
    let repo_path = temp.path();

    nextver_cmd()
        .current_dir(repo_path)
        .arg("--increment")
        .arg("patch")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""major":1"#))
        .stdout(predicate::str::contains(r#""minor":2"#))
        .stdout(predicate::str::contains(r#""patch":3"#));
}
