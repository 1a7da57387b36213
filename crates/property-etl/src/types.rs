use crate::error::EtlError;
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

/// One typed cell bound into an insert statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
        })
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Integer)
    }
}

/// Result of one table stage.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    Loaded,
    Failed { error: ErrorInfo },
    Skipped { reason: String },
}

impl TableStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, TableStatus::Loaded)
    }
}

/// Serializable snapshot of an [`EtlError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&EtlError> for ErrorInfo {
    fn from(err: &EtlError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableLoadOutcome {
    pub table: String,
    #[serde(flatten)]
    pub status: TableStatus,
    pub rows_inserted: usize,
    /// Rows whose foreign key could not be resolved (skipped or loaded with NULL).
    pub rows_unresolved: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// Every table loaded and every key resolved
    Success,
    /// Some tables loaded, or keys were left unresolved
    Partial,
    /// Nothing was loaded
    Failed,
}

/// Per-table outcome of the multi-table load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub tables: Vec<TableLoadOutcome>,
    pub status: LoadStatus,
    /// Whether the inserted rows are durable in the database.
    pub committed: bool,
}

impl LoadReport {
    pub fn table(&self, name: &str) -> Option<&TableLoadOutcome> {
        self.tables.iter().find(|outcome| outcome.table == name)
    }

    pub fn rows_inserted(&self) -> usize {
        self.tables.iter().map(|outcome| outcome.rows_inserted).sum()
    }

    pub fn is_success(&self) -> bool {
        self.status == LoadStatus::Success
    }

    /// First failed stage, if any.
    pub fn first_failure(&self) -> Option<(&str, &ErrorInfo)> {
        self.tables.iter().find_map(|outcome| match &outcome.status {
            TableStatus::Failed { error } => Some((outcome.table.as_str(), error)),
            _ => None,
        })
    }
}
