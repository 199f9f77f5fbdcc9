use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with config lookup pinned to a throwaway home folder so a developer's
/// real portal-sync.json never leaks into the assertions.
fn portal_sync(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("portal-sync").unwrap();
    cmd.env("PORTAL_SYNC_HOME", home.path());
    cmd
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    let home = TempDir::new().unwrap();
    portal_sync(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_the_commands() {
    let home = TempDir::new().unwrap();
    portal_sync(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("pull"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn list_without_a_server_fails_with_the_missing_key() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    portal_sync(&home)
        .args(["list", "projects", "--non-interactive"])
        .arg("--content-root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("portalServer"));
}

#[test]
fn push_without_a_target_fails_before_any_network_call() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("index.html"), "<html></html>").unwrap();

    // No server is configured either, but target validation runs first.
    portal_sync(&home)
        .args(["push", "--non-interactive"])
        .arg("--content-root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("contentId"));
}

#[test]
fn failures_point_at_the_log_file() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    portal_sync(&home)
        .args(["list", "vportals", "--non-interactive"])
        .arg("--content-root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("portal-sync.log"));

    assert!(root.path().join("portal-sync.log").is_file());
}
