use std::process::{Command, Output};

fn parrot(args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_parrot"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_ACCESS_TOKEN")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

#[test]
fn one_without_branch_is_rejected() {
    let output = parrot(&["one", "cohort/todo"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no branch given"), "stderr: {stderr}");
}

#[test]
fn malformed_repo_is_rejected() {
    let output = parrot(&["all", "todo"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("owner/repo"), "stderr: {stderr}");
}

#[test]
fn missing_token_is_reported() {
    let output = parrot(&["all", "cohort/todo"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.to_lowercase().contains("token"), "stderr: {stderr}");
}

#[test]
fn unknown_format_is_rejected() {
    let output = parrot(&["--format", "sarif", "all", "cohort/todo"]);
    assert!(!output.status.success());
}

#[test]
fn completions_are_generated() {
    let output = parrot(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("parrot"));
}
