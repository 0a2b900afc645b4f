//! End-to-end CLI smoke tests

use assert_cmd::Command;
use predicates::prelude::*;

fn dpitest() -> Command {
    Command::cargo_bin("dpitest").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    dpitest()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_version_flag() {
    dpitest()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dpitest"));
}

#[test]
fn test_missing_explicit_config_fails() {
    dpitest()
        .args(["list", "-c", "/nonexistent/engine.toml"])
        .assert()
        .failure();
}

#[test]
fn test_list_with_prepared_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let strategies_dir = tmp.path().join("strategies");
    std::fs::create_dir(&strategies_dir).unwrap();
    std::fs::write(strategies_dir.join("alpha.conf"), "--frag 2").unwrap();
    let targets = tmp.path().join("targets.txt");
    std::fs::write(
        &targets,
        "### discord\ndiscord_web=\"https://discord.com\"\n",
    )
    .unwrap();
    let config = tmp.path().join("dpitest.toml");
    std::fs::write(
        &config,
        format!(
            "[paths]\nstrategies_dir = {:?}\ntargets_file = {:?}\n",
            strategies_dir, targets
        ),
    )
    .unwrap();

    dpitest()
        .args(["list", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha"))
        .stdout(predicate::str::contains("discord_web"));
}

#[test]
fn test_run_dry_run_does_not_touch_service() {
    let tmp = tempfile::tempdir().unwrap();
    let strategies_dir = tmp.path().join("strategies");
    std::fs::create_dir(&strategies_dir).unwrap();
    std::fs::write(strategies_dir.join("alpha.conf"), "--frag 2").unwrap();
    let targets = tmp.path().join("targets.txt");
    std::fs::write(
        &targets,
        "### discord\ndiscord_web=\"https://discord.com\"\n",
    )
    .unwrap();
    let config = tmp.path().join("dpitest.toml");
    std::fs::write(
        &config,
        format!(
            "[paths]\nstrategies_dir = {:?}\ntargets_file = {:?}\n",
            strategies_dir, targets
        ),
    )
    .unwrap();

    dpitest()
        .args(["run", "--dry-run", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("alpha"));
}
