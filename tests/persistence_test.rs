#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

const HEADER: &str = "type, actor, book, request, days, price_per_day, price, rating, text";

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: list a book and request a rental
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "{HEADER}").unwrap();
    writeln!(csv1, "list_book, 1, , , , 10, 100, , Middlemarch").unwrap();
    writeln!(csv1, "request_rental, 2, 1, , 14, , , ,").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("bookswap"));
    cmd1.arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,1,Middlemarch,true,true,10,100,0,0,open"));

    // 2. Second run: approve the rental recorded by the first run
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "{HEADER}").unwrap();
    writeln!(csv2, "approve_rental, 1, , 1, , , , ,").unwrap();
    writeln!(csv2, "list_book, 1, , , , 1, 5, , Emma").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("bookswap"));
    cmd2.arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // The rental survived the restart and the id sequence continued.
    assert!(stdout2.contains("1,1,Middlemarch,false,false,10,100,0,0,rented"));
    assert!(stdout2.contains("2,1,Emma,true,true,1,5,0,0,open"));
}
