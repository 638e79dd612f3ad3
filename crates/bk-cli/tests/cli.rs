use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

// nothing listens there, so every remote call fails fast
const UNREACHABLE: &str = "http://127.0.0.1:1";

fn bk(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("bk");
    cmd.env("BK_HOME", home)
        .env("BK_SERVER_URL", UNREACHABLE)
        .env("BK_HTTP_TIMEOUT", "2")
        .env("NO_COLOR", "1")
        .env_remove("BK_PROXY");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

#[test]
fn help_lists_the_command_groups() {
    let temp = tempfile::tempdir().expect("tempdir");
    let stdout = stdout_of(bk(temp.path()).arg("--help"));
    for command in ["user", "login", "logout", "fetch", "check", "cache"] {
        assert!(stdout.contains(command), "{command} missing from help: {stdout}");
    }
}

#[test]
fn user_switch_is_remembered() {
    let temp = tempfile::tempdir().expect("tempdir");

    let stdout = stdout_of(bk(temp.path()).arg("user"));
    assert!(stdout.contains("Current user: None (anonymous)"), "{stdout:?}");

    let stdout = stdout_of(bk(temp.path()).args(["user", "pepe"]));
    assert!(
        stdout.contains("Change user from None (anonymous) to pepe"),
        "{stdout:?}"
    );

    let stdout = stdout_of(bk(temp.path()).arg("user"));
    assert!(stdout.contains("Current user: pepe"), "{stdout:?}");

    let stdout = stdout_of(bk(temp.path()).args(["user", "pepe"]));
    assert!(stdout.contains("Current user already: pepe"), "{stdout:?}");

    let stdout = stdout_of(bk(temp.path()).args(["user", "none"]));
    assert!(
        stdout.contains("Change user from pepe to None (anonymous)"),
        "{stdout:?}"
    );
}

#[test]
fn logout_keeps_the_username() {
    let temp = tempfile::tempdir().expect("tempdir");
    stdout_of(bk(temp.path()).args(["user", "maya"]));

    let stdout = stdout_of(bk(temp.path()).arg("logout"));
    assert!(stdout.contains("Token removed for maya"), "{stdout:?}");

    let stdout = stdout_of(bk(temp.path()).arg("user"));
    assert!(stdout.contains("Current user: maya"), "{stdout:?}");
}

#[test]
fn cache_commands_work_on_a_fresh_home() {
    let temp = tempfile::tempdir().expect("tempdir");

    let stdout = stdout_of(bk(temp.path()).args(["cache", "info"]));
    assert!(stdout.contains("references  0"), "{stdout:?}");
    assert!(temp.path().join("bk.db").exists());

    let stdout = stdout_of(bk(temp.path()).args(["cache", "gc"]));
    assert!(
        stdout.contains("Removed 0 cell(s) and 0 content(s)"),
        "{stdout:?}"
    );

    let stdout = stdout_of(bk(temp.path()).args(["cache", "clean"]));
    assert!(stdout.contains("Local cache cleaned"), "{stdout:?}");
}

#[test]
fn unreachable_server_info_is_only_a_warning() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = bk(temp.path()).arg("info").assert().success();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 stderr");
    assert!(stderr.contains("Unable to check server info"), "{stderr:?}");
}

#[test]
fn unreachable_server_fails_lookups_with_one_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = bk(temp.path())
        .args(["deps", "maya/lib/master@1"])
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 stderr");
    assert!(stderr.contains("[BK810]"), "{stderr:?}");
    assert_eq!(stderr.trim().lines().count(), 1, "{stderr:?}");
}

#[test]
fn malformed_versions_are_usage_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    bk(temp.path())
        .args(["deps", "not-a-version"])
        .assert()
        .failure()
        .code(2);
}
