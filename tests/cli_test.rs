use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::{id, sel, write_script};
use diamond_registry::application::diamond::CUT_SIGNATURE;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

mod common;

fn route(handler: u64, signature: &str) -> String {
    format!("{},{}", id(handler), sel(signature))
}

#[test]
fn test_cli_end_to_end() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "batch, action, handler, target").unwrap();
    writeln!(file, "0, deploy, 0x10, echo").unwrap();
    writeln!(file, "0, deploy, 0x11, echo").unwrap();
    writeln!(file, "1, add, 0x10, ping()").unwrap();
    writeln!(file, "1, add, 0x10, pong()").unwrap();
    writeln!(file, "2, add, 0x11, status()").unwrap();
    writeln!(file, "3, replace, 0x11, pong()").unwrap();
    writeln!(file, "4, remove, , ping()").unwrap();

    let mut cmd = Command::new(cargo_bin!("diamond"));
    cmd.arg(file.path());

    // 0x10 lost both selectors, so it left the handler list.
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("handler,selector"))
        .stdout(predicate::str::contains(route(0xb007, CUT_SIGNATURE)))
        .stdout(predicate::str::contains(route(0x11, "status()")))
        .stdout(predicate::str::contains(route(0x11, "pong()")))
        .stdout(predicate::str::contains(format!("{},", id(0x10))).not());
}

#[test]
fn test_empty_script_prints_bootstrap_route() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "batch, action, handler, target").unwrap();

    let mut cmd = Command::new(cargo_bin!("diamond"));
    cmd.arg(file.path()).arg("--bootstrap-handler").arg("0xc0de");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(route(0xc0de, CUT_SIGNATURE)));
}

#[test]
fn test_failed_batch_is_reported_and_skipped() {
    let file = NamedTempFile::new().unwrap();
    write_script(
        file.path(),
        &[
            ["0", "deploy", "0x10", "echo"],
            ["1", "add", "0x10", "ping()"],
            // Same selector again in the next batch: rejected as a whole.
            ["2", "add", "0x10", "other()"],
            ["2", "add", "0x10", "ping()"],
            // No code behind 0x99.
            ["3", "add", "0x99", "ghost()"],
            ["4", "add", "0x10", "after()"],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("diamond"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error applying cut batch 2"))
        .stderr(predicate::str::contains("Error applying cut batch 3"))
        .stdout(predicate::str::contains(route(0x10, "ping()")))
        .stdout(predicate::str::contains(route(0x10, "after()")))
        .stdout(predicate::str::contains(route(0x10, "other()")).not())
        .stdout(predicate::str::contains(route(0x99, "ghost()")).not());
}

#[test]
fn test_malformed_rows_handling() {
    let file = NamedTempFile::new().unwrap();
    write_script(
        file.path(),
        &[
            ["0", "deploy", "0x10", "echo"],
            ["0", "deploy", "0x11", "ledger"],
            ["1", "explode", "0x10", "a()"],
            ["2", "add", "not-hex", "b()"],
            ["2", "add", "0x10", "c()"],
            ["3", "add", "0x10", "d()"],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("diamond"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading cut script"))
        .stderr(predicate::str::contains("batch 2"))
        .stdout(predicate::str::contains(route(0x10, "d()")))
        .stdout(predicate::str::contains(route(0x10, "c()")).not());
}

#[test]
fn test_unreadable_row_drops_whole_batch() {
    let file = NamedTempFile::new().unwrap();
    write_script(
        file.path(),
        &[
            ["0", "deploy", "0x10", "echo"],
            ["1", "add", "0x10", "a()"],
            ["1", "remvoe", "", "b()"],
            ["1", "add", "0x10", "c()"],
            ["2", "add", "0x10", "d()"],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("diamond"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading cut script"))
        .stderr(predicate::str::contains("batch 1"))
        .stdout(predicate::str::contains(route(0x10, "d()")))
        .stdout(predicate::str::contains(route(0x10, "a()")).not())
        .stdout(predicate::str::contains(route(0x10, "c()")).not());
}

#[test]
fn test_initializer_failure_rolls_back_batch() {
    let file = NamedTempFile::new().unwrap();
    write_script(
        file.path(),
        &[
            ["0", "deploy", "0x10", "echo"],
            ["0", "deploy", "0xf0", "failing"],
            ["1", "add", "0x10", "a()"],
            ["1", "init", "0xf0", "anything"],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("diamond"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error applying cut batch 1"))
        .stderr(predicate::str::contains("module failed"))
        .stdout(predicate::str::contains(route(0x10, "a()")).not());
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = Command::new(cargo_bin!("diamond"));
    cmd.arg("does/not/exist.csv");

    cmd.assert().failure();
}
