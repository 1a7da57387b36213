//! Command line tests: run the `property-etl` binary against file databases.

use pretty_assertions::assert_eq;
use property_etl::schema::ALL_TABLES;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn property_etl(args: &[&str], database: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_property-etl"))
        .args(args)
        .arg("--database")
        .arg(database)
        .env_remove("PROPERTY_ETL_DATABASE")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

/// Tables with a CHECK constraint that rejects Zip 99999 in `Address_info`.
fn constrained_database(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE \"Address_info\" (
            \"Address_ID\" INTEGER PRIMARY KEY AUTOINCREMENT,
            \"Address\" TEXT NOT NULL,
            \"Street_Address\",
            \"City\",
            \"State\",
            \"Zip\" CHECK (\"Zip\" <> 99999)
        );",
    )
    .unwrap();
    for table in &ALL_TABLES[1..] {
        conn.execute_batch(&table.create_table_sql()).unwrap();
    }
}

fn count(path: &Path, table: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn test_successful_run_exits_zero_with_banner() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("home.db");
    let input = fixture("properties.csv");

    let output = property_etl(
        &["--input", input.to_str().unwrap(), "--init-schema", "-q"],
        &database,
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Data successfully inserted into the database."));
    assert_eq!(count(&database, "Address_info"), 3);
}

#[test]
fn test_failed_table_exits_non_zero_without_banner() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("home.db");
    constrained_database(&database);
    let input = fixture("five_addresses.csv");

    let output = property_etl(&["--input", input.to_str().unwrap(), "-q"], &database);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout.contains("Data successfully inserted"));
    assert!(stdout.contains("No rows were committed."));
    assert!(stderr.contains("table 'Address_info' failed"), "stderr: {stderr}");
    assert_eq!(count(&database, "Address_info"), 0);
}

#[test]
fn test_json_output_reports_failure_and_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("home.db");
    constrained_database(&database);
    let input = fixture("five_addresses.csv");

    let output = property_etl(
        &[
            "--input",
            input.to_str().unwrap(),
            "--json",
            "--on-failure",
            "continue",
            "--unresolved",
            "null",
            "--non-atomic",
        ],
        &database,
    );

    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["load"]["status"], "partial");
    assert_eq!(json["load"]["committed"], true);
    assert_eq!(json["load"]["tables"][0]["status"], "failed");
    assert_eq!(count(&database, "Address_info"), 2);
}
