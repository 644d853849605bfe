#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use common::{id, sel};
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let ping = format!("{},{}", id(0x10), sel("ping()"));
    let status = format!("{},{}", id(0x10), sel("status()"));

    // 1. First run: bind ping() with owner 0xa
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "batch, action, handler, target").unwrap();
    writeln!(csv1, "0, deploy, 0x10, echo").unwrap();
    writeln!(csv1, "1, add, 0x10, ping()").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("diamond"));
    cmd1.arg(csv1.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--owner")
        .arg("0xa");

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains(&ping));

    // 2. Second run, same owner: routes recovered, new binding added
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "batch, action, handler, target").unwrap();
    writeln!(csv2, "0, deploy, 0x10, echo").unwrap();
    writeln!(csv2, "1, add, 0x10, status()").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("diamond"));
    cmd2.arg(csv2.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--owner")
        .arg("0xa");

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains(&ping));
    assert!(stdout2.contains(&status));

    // 3. Third run as someone else: the stored owner still rules
    let mut cmd3 = Command::new(cargo_bin!("diamond"));
    cmd3.arg(csv1.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--owner")
        .arg("0xb");

    let output3 = cmd3.output().expect("Failed to execute command");
    assert!(output3.status.success());
    let stderr3 = String::from_utf8_lossy(&output3.stderr);
    assert!(stderr3.contains("is not the registry owner"));
    let stdout3 = String::from_utf8_lossy(&output3.stdout);
    assert!(stdout3.contains(&status));
}
