use assert_cmd::Command;
use predicates::prelude::*;
use std::env;
use std::fs;
use tempfile::tempdir;

fn fixture(name: &str) -> std::path::PathBuf {
    env::current_dir().unwrap().join("tests/fixtures").join(name)
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("sol2liquid").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Converts Solidity smart contracts to LiquidHaskell"));
}

#[test]
fn test_writes_module_file() {
    let out = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("sol2liquid").unwrap();
    cmd.arg(fixture("counter.sol"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully converted"))
        .stdout(predicate::str::contains("(Counter)"));

    let module = fs::read_to_string(out.path().join("Counter.hs")).unwrap();
    assert!(module.contains("module Counter where"));
    assert!(module.contains("{x:Uint | (x > 0)}"));
    assert!(module.contains("ownerCounter = (sender msgctx)"));
}

#[test]
fn test_stdout_output() {
    let mut cmd = Command::cargo_bin("sol2liquid").unwrap();
    cmd.arg(fixture("counter.sol"))
        .arg("--stdout")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{-@ LIQUID"))
        .stdout(predicate::str::contains("get st = (countCounter st)"));
}

#[test]
fn test_module_name_flag() {
    let out = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("sol2liquid").unwrap();
    cmd.arg(fixture("counter.sol"))
        .arg("-o")
        .arg(out.path())
        .arg("--module")
        .arg("Verified")
        .assert()
        .success();

    let module = fs::read_to_string(out.path().join("Verified.hs")).unwrap();
    assert!(module.contains("module Verified where"));
}

#[test]
fn test_missing_input_fails() {
    let mut cmd = Command::cargo_bin("sol2liquid").unwrap();
    cmd.arg(fixture("does_not_exist.sol"))
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read input file"));
}

#[test]
fn test_syntax_error_fails() {
    let out = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("sol2liquid").unwrap();
    cmd.arg(fixture("broken.sol"))
        .arg("-o")
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("syntax error"));
    assert!(!out.path().join("Broken.hs").exists());
}
