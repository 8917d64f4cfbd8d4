//! Focused CLI argument parsing tests.
//!
//! None of these need a reachable cluster.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;

fn fabric_shell() -> Command {
    Command::cargo_bin("fabric-shell").unwrap()
}

#[test]
fn version_command_succeeds() {
    fabric_shell()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fabric-shell"));
}

#[test]
fn version_flag_shows_version() {
    fabric_shell()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_lists_commands() {
    fabric_shell()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("connect"))
        .stdout(predicate::str::contains("node"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn connect_help_shows_metadata_options() {
    fabric_shell()
        .args(["connect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--get-metadata"))
        .stdout(predicate::str::contains("--aad-token"));
}

#[test]
fn global_flags_are_accepted_after_subcommand() {
    fabric_shell()
        .args(["node", "list", "--endpoint", "http://a:19080", "--no-color", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--name"));
}

#[test]
fn node_restart_requires_name() {
    fabric_shell()
        .args(["node", "restart"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn node_restart_rejects_non_numeric_instance() {
    fabric_shell()
        .args(["node", "restart", "_Node_0", "--instance-id", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn config_show_rejects_unknown_format() {
    fabric_shell()
        .args(["config", "show", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn unknown_command_fails() {
    fabric_shell()
        .arg("chaos")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
