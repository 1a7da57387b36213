//! End-to-end tests: CSV fixture in, in-memory SQLite out.

use pretty_assertions::assert_eq;
use property_etl::schema::{ALL_TABLES, create_tables};
use property_etl::{
    EtlConfig, EtlError, EtlPipeline, FailurePolicy, LoadStatus, RunReport, TableStatus,
    UnresolvedKeyPolicy,
};
use rusqlite::Connection;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run(config: EtlConfig, conn: &mut Connection) -> property_etl::Result<RunReport> {
    EtlPipeline::builder().config(config).build()?.run(conn)
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn strings(conn: &Connection, sql: &str) -> Vec<String> {
    let mut stmt = conn.prepare(sql).unwrap();
    stmt.query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

fn load_properties() -> (Connection, RunReport) {
    let mut conn = Connection::open_in_memory().unwrap();
    let config = EtlConfig::builder()
        .input_path(fixture("properties.csv"))
        .create_schema(true)
        .build()
        .unwrap();
    let report = run(config, &mut conn).unwrap();
    (conn, report)
}

/// Tables with a CHECK constraint that rejects Zip 99999 in `Address_info`.
fn constrained_database() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
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
    conn
}

#[test]
fn test_full_run_loads_every_table() {
    let (conn, report) = load_properties();

    assert!(report.is_success());
    assert!(report.load.committed);
    assert_eq!(report.transform.rows_before, 6);
    assert_eq!(report.transform.negative_rows_removed, 1);
    assert_eq!(report.transform.duplicates_removed, 1);
    assert_eq!(report.transform.rows_after, 4);

    assert_eq!(count(&conn, "Address_info"), 3);
    assert_eq!(count(&conn, "Property"), 3);
    for table in ["Leads", "Valuation", "Rehab", "HOA", "Taxes"] {
        assert_eq!(count(&conn, table), 4, "table {table}");
        assert_eq!(report.load.table(table).unwrap().rows_inserted, 4);
    }
}

#[test]
fn test_dependent_rows_carry_their_property_id() {
    let (conn, _) = load_properties();

    for table in ["Leads", "Valuation", "Rehab", "HOA", "Taxes"] {
        let addresses = strings(
            &conn,
            &format!(
                "SELECT a.\"Address\" FROM \"{table}\" d
                 JOIN \"Property\" p ON d.\"Property_ID\" = p.\"Property_ID\"
                 JOIN \"Address_info\" a ON p.\"Address_ID\" = a.\"Address_ID\"
                 ORDER BY d.rowid"
            ),
        );
        assert_eq!(
            addresses,
            vec![
                "100 Main St, Austin, TX 73301",
                "300 Elm Rd, Houston, TX 77001",
                "100 Main St, Austin, TX 73301",
                "400 Pine Ln, Austin, TX 73344",
            ],
            "table {table}"
        );
    }
}

#[test]
fn test_shared_address_resolves_to_one_property() {
    let (conn, _) = load_properties();

    let ids: Vec<i64> = {
        let mut stmt = conn
            .prepare("SELECT \"Property_ID\" FROM \"Leads\" ORDER BY rowid")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    };
    assert_eq!(ids[0], ids[2]);
    assert_eq!(
        strings(&conn, "SELECT \"Source\" FROM \"Leads\" ORDER BY rowid"),
        vec!["Zillow", "Zillow", "Redfin", "Zillow"]
    );
}

#[test]
fn test_negative_row_is_absent_everywhere() {
    let (conn, _) = load_properties();

    let oak: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM \"Address_info\" WHERE \"Address\" LIKE '200 Oak%'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(oak, 0);

    let beds: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM \"Property\" WHERE \"Bed\" < 0",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(beds, 0);
}

#[test]
fn test_text_defaults_and_trimming() {
    let (conn, _) = load_properties();

    let elm = "WHERE a.\"Address\" LIKE '300 Elm%'";
    let property = |column: &str| {
        strings(
            &conn,
            &format!(
                "SELECT p.\"{column}\" FROM \"Property\" p
                 JOIN \"Address_info\" a ON p.\"Address_ID\" = a.\"Address_ID\" {elm}"
            ),
        )
    };
    assert_eq!(property("Market"), vec!["Unknown"]);
    assert_eq!(property("Subdivision"), vec!["Unknown"]);
    assert_eq!(property("BasementYesNo"), vec!["No"]);
    assert_eq!(property("Layout"), vec!["Split level"]);

    assert_eq!(
        strings(&conn, "SELECT \"Roof_Flag\" FROM \"Rehab\" ORDER BY rowid"),
        vec!["No", "No", "No", "No"]
    );
    assert_eq!(
        strings(&conn, "SELECT \"HOA_Flag\" FROM \"HOA\" ORDER BY rowid"),
        vec!["No", "No", "No", "No"]
    );
}

#[test]
fn test_decimal_columns_are_rounded_half_to_even() {
    let (conn, _) = load_properties();

    let (tax_rate, school): (f64, f64) = conn
        .query_row(
            "SELECT p.\"Tax_Rate\", p.\"School_Average\" FROM \"Property\" p
             JOIN \"Address_info\" a ON p.\"Address_ID\" = a.\"Address_ID\"
             WHERE a.\"Address\" LIKE '400 Pine%'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(tax_rate, 0.12);
    assert_eq!(school, 8.62);

    let (net_yield, irr): (f64, f64) = conn
        .query_row(
            "SELECT \"Net_Yield\", \"IRR\" FROM \"Leads\" ORDER BY rowid DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(net_yield, 0.38);
    assert_eq!(irr, 1.0);
}

#[test]
fn test_address_failure_keeps_partial_rows_when_not_atomic() {
    let mut conn = constrained_database();
    let config = EtlConfig::builder()
        .input_path(fixture("five_addresses.csv"))
        .failure_policy(FailurePolicy::Continue)
        .unresolved_keys(UnresolvedKeyPolicy::InsertNull)
        .atomic(false)
        .build()
        .unwrap();

    let report = run(config, &mut conn).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.load.status, LoadStatus::Partial);
    assert!(report.load.committed);

    let address = report.load.table("Address_info").unwrap();
    assert!(matches!(address.status, TableStatus::Failed { .. }));
    assert_eq!(address.rows_inserted, 2);
    assert_eq!(count(&conn, "Address_info"), 2);

    // no address index survived the failure, so every property key is NULL
    assert_eq!(count(&conn, "Property"), 5);
    let null_keys: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM \"Property\" WHERE \"Address_ID\" IS NULL",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(null_keys, 5);
    assert_eq!(report.load.table("Property").unwrap().rows_unresolved, 5);
    assert_eq!(count(&conn, "Taxes"), 5);
}

#[test]
fn test_address_failure_halts_and_rolls_back_by_default() {
    let mut conn = constrained_database();
    let config = EtlConfig::builder()
        .input_path(fixture("five_addresses.csv"))
        .build()
        .unwrap();

    let report = run(config, &mut conn).unwrap();
    assert!(!report.is_success());
    assert!(!report.load.committed);
    assert_eq!(count(&conn, "Address_info"), 0);

    let (failed_table, error) = report.load.first_failure().unwrap();
    assert_eq!(failed_table, "Address_info");
    assert_eq!(error.code, "STAGE_FAILED");
    for outcome in &report.load.tables[1..] {
        assert!(
            matches!(outcome.status, TableStatus::Skipped { .. }),
            "table {}",
            outcome.table
        );
    }
}

#[test]
fn test_missing_columns_fail_before_loading() {
    let mut conn = Connection::open_in_memory().unwrap();
    create_tables(&conn).unwrap();
    let config = EtlConfig::builder()
        .input_path(fixture("missing_taxes.csv"))
        .build()
        .unwrap();

    match run(config, &mut conn) {
        Err(EtlError::MissingColumns { table, columns }) => {
            assert_eq!(table, "Taxes");
            assert_eq!(columns, vec!["Taxes".to_string()]);
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
    assert_eq!(count(&conn, "Address_info"), 0);
}

#[test]
fn test_export_and_report_files() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("cleaned.csv");
    let report_path = dir.path().join("run.json");

    let mut conn = Connection::open_in_memory().unwrap();
    let config = EtlConfig::builder()
        .input_path(fixture("properties.csv"))
        .create_schema(true)
        .export_cleaned(&export)
        .report_path(&report_path)
        .build()
        .unwrap();
    run(config, &mut conn).unwrap();

    let cleaned = std::fs::read_to_string(&export).unwrap();
    let mut lines = cleaned.lines();
    assert!(lines.next().unwrap().starts_with("Address,Street_Address,City"));
    assert_eq!(lines.count(), 4);

    let raw = std::fs::read_to_string(&report_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["load"]["status"], "success");
    assert_eq!(json["transform"]["rows_after"], 4);
    assert_eq!(json["load"]["tables"].as_array().unwrap().len(), 7);
}
