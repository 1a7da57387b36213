//! Database seam used by the loader.

use crate::error::{Result, ResultExt};
use crate::types::SqlValue;
use rusqlite::{Connection, params_from_iter};
use tracing::debug;

/// Inserts rows into a named table.
pub trait TableWriter {
    /// Insert one row and return the generated surrogate key.
    fn insert_returning_id(&mut self, table: &str, columns: &[String], row: &[SqlValue])
    -> Result<i64>;

    /// Insert all rows or none of them. Returns the number of rows inserted.
    fn insert_many(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<usize>;
}

/// `INSERT INTO "table" ("a", "b") VALUES (?1, ?2)`
pub fn insert_sql(table: &str, columns: &[String]) -> String {
    let quoted: Vec<String> = columns
        .iter()
        .map(|col| format!("\"{}\"", col.replace('"', "\"\"")))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table.replace('"', "\"\""),
        quoted.join(", "),
        placeholders.join(", ")
    )
}

/// [`TableWriter`] over a SQLite connection (or an open transaction).
pub struct SqliteWriter<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteWriter<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn insert_all(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }
        Ok(rows.len())
    }
}

impl TableWriter for SqliteWriter<'_> {
    fn insert_returning_id(
        &mut self,
        table: &str,
        columns: &[String],
        row: &[SqlValue],
    ) -> Result<i64> {
        let sql = insert_sql(table, columns);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(row.iter()))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_many(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = insert_sql(table, columns);
        self.conn.execute_batch("SAVEPOINT bulk_insert")?;
        match self.insert_all(&sql, rows) {
            Ok(inserted) => {
                self.conn
                    .execute_batch("RELEASE bulk_insert")
                    .context(format!("Releasing bulk insert into {table}"))?;
                debug!("Inserted {} rows into {}", inserted, table);
                Ok(inserted)
            }
            Err(err) => {
                // keep the original error even if the rollback itself fails
                let _ = self
                    .conn
                    .execute_batch("ROLLBACK TO bulk_insert; RELEASE bulk_insert");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"Taxes\" (
                \"Taxes_ID\" INTEGER PRIMARY KEY AUTOINCREMENT,
                \"Taxes\" REAL CHECK (\"Taxes\" >= 0),
                \"Property_ID\" INTEGER
            );",
        )
        .unwrap();
        conn
    }

    fn columns() -> Vec<String> {
        vec!["Taxes".to_string(), "Property_ID".to_string()]
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM \"Taxes\"", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_sql() {
        assert_eq!(
            insert_sql("HOA", &["HOA".to_string(), "HOA_Flag".to_string()]),
            "INSERT INTO \"HOA\" (\"HOA\", \"HOA_Flag\") VALUES (?1, ?2)"
        );
    }

    #[test]
    fn test_insert_returning_id_is_sequential() {
        let conn = connection();
        let mut writer = SqliteWriter::new(&conn);
        let row = [SqlValue::Real(10.0), SqlValue::Null];
        assert_eq!(writer.insert_returning_id("Taxes", &columns(), &row).unwrap(), 1);
        assert_eq!(writer.insert_returning_id("Taxes", &columns(), &row).unwrap(), 2);
    }

    #[test]
    fn test_insert_many_is_all_or_nothing() {
        let conn = connection();
        let mut writer = SqliteWriter::new(&conn);
        let rows = vec![
            vec![SqlValue::Real(1.0), SqlValue::Integer(1)],
            vec![SqlValue::Real(-1.0), SqlValue::Integer(2)],
        ];
        assert!(writer.insert_many("Taxes", &columns(), &rows).is_err());
        assert_eq!(count(&conn), 0);

        let rows = vec![
            vec![SqlValue::Real(1.0), SqlValue::Integer(1)],
            vec![SqlValue::Real(2.0), SqlValue::Integer(2)],
        ];
        assert_eq!(writer.insert_many("Taxes", &columns(), &rows).unwrap(), 2);
        assert_eq!(count(&conn), 2);
    }
}
