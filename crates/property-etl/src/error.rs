//! Custom error types for the ETL pipeline.
//!
//! This module provides the error hierarchy using `thiserror` so that every
//! stage (extract, transform, split, load) reports failures with context.
//!
//! Errors are serializable, allowing them to be embedded in the JSON run
//! report next to the per-table load outcomes.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the ETL pipeline.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Input file does not exist.
    #[error("Input file not found: {0}")]
    InputNotFound(String),

    /// One or more columns a table projection needs are absent from the input.
    #[error("Table '{table}' requires columns missing from the input: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A column that must be numeric holds non-numeric values.
    #[error("Column '{column}' must be numeric but has type {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    /// A projected row has no `Address` join key.
    #[error("Row {row} of table '{table}' has no Address key")]
    MissingJoinKey { table: String, row: usize },

    /// A row's foreign key could not be resolved and the policy is to abort.
    #[error("Row {row} of table '{table}' has unresolved key for address '{address}'")]
    UnresolvedKey {
        table: String,
        row: usize,
        address: String,
    },

    /// A load stage failed; carries the table name and the database message.
    #[error("Loading table '{table}' failed: {reason}")]
    StageFailed { table: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// SQLite error wrapper.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EtlError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, used in the JSON report.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InputNotFound(_) => "INPUT_NOT_FOUND",
            Self::MissingColumns { .. } => "MISSING_COLUMNS",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NonNumericColumn { .. } => "NON_NUMERIC_COLUMN",
            Self::MissingJoinKey { .. } => "MISSING_JOIN_KEY",
            Self::UnresolvedKey { .. } => "UNRESOLVED_KEY",
            Self::StageFailed { .. } => "STAGE_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the error came from the database rather than the data itself.
    pub fn is_database_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::StageFailed { .. } => true,
            Self::WithContext { source, .. } => source.is_database_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for EtlError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EtlError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EtlError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EtlError::Database(e).with_context(context))
    }
}
