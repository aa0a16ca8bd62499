//! Black-box tests for the subcommands that never touch the desktop.

use assert_cmd::Command;
use predicates::prelude::*;

fn marionette() -> Command {
    Command::cargo_bin("marionette").unwrap()
}

#[test]
fn classify_reports_the_matched_tool() {
    marionette()
        .args(["classify", "what", "time", "is", "it"])
        .assert()
        .success()
        .stdout(predicate::str::contains("getTime"))
        .stdout(predicate::str::contains("confidence: 0.90"));
}

#[test]
fn classify_extracts_parameters() {
    marionette()
        .args(["classify", "play", "bohemian", "rhapsody", "on", "spotify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("playMusic"))
        .stdout(predicate::str::contains("songInfo = bohemian rhapsody"));
}

#[test]
fn classify_json_output() {
    let output = marionette()
        .args(["--json", "classify", "open", "calculator"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["tool"], "openApp");
    assert_eq!(value["params"]["appName"], "calculator");
}

#[test]
fn unmatched_text_is_reported_not_errored() {
    marionette()
        .args(["classify", "ponder", "the", "imponderable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no local tool matched"));
}

#[test]
fn run_refuses_unmatched_text() {
    marionette()
        .args(["run", "ponder", "the", "imponderable"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no local tool matched"));
}

#[test]
fn caps_lists_capability_flags() {
    marionette()
        .arg("caps")
        .assert()
        .success()
        .stdout(predicate::str::contains("platform:"))
        .stdout(predicate::str::contains("music_control"));
}

#[test]
fn classify_requires_text() {
    marionette().arg("classify").assert().failure();
}
