//! Property ETL Library
//!
//! Moves one wide CSV of property listings into a normalized relational
//! store, built with Rust, Polars and SQLite.
//!
//! # Overview
//!
//! A run has four stages:
//!
//! - **Extract**: read the CSV with types inferred from the whole file
//! - **Transform**: normalize types, trim and impute text, round the decimal
//!   columns, drop negative and duplicate rows
//! - **Split**: project the cleaned table into seven fixed table schemas
//! - **Load**: insert parent tables row by row, capture their generated keys
//!   and bulk insert the child tables with those keys attached
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use property_etl::{EtlConfig, EtlPipeline};
//! use rusqlite::Connection;
//!
//! let config = EtlConfig::builder()
//!     .input_path("sql/fake_data.csv")
//!     .database_path("home.db")
//!     .create_schema(true)
//!     .build()?;
//!
//! let mut conn = Connection::open(&config.database.path)?;
//! let report = EtlPipeline::builder().config(config).build()?.run(&mut conn)?;
//!
//! for table in &report.load.tables {
//!     println!("{}: {} rows", table.table, table.rows_inserted);
//! }
//! ```
//!
//! # Load policies
//!
//! [`LoadConfig`] controls what happens when something goes wrong:
//!
//! - [`FailurePolicy`]: stop after the first failed table, or keep going
//! - [`UnresolvedKeyPolicy`]: skip, NULL-fill or abort on a row whose
//!   foreign key cannot be resolved
//! - `atomic`: one transaction for the whole load, or per-insert commits

pub mod cleaner;
pub mod config;
pub mod error;
pub mod extract;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod split;
pub mod types;
pub mod utils;

pub use cleaner::{TransformOutcome, TransformSummary, Transformer, TypeNormalizer};
pub use config::{
    DatabaseConfig, EtlConfig, EtlConfigBuilder, FailurePolicy, LoadConfig, RoundingMode,
    TransformConfig, UnresolvedKeyPolicy,
};
pub use error::{EtlError, Result, ResultExt};
pub use extract::load_csv;
pub use loader::{KeyPropagator, SqliteWriter, TableWriter, load};
pub use pipeline::{EtlPipeline, EtlPipelineBuilder, export_csv};
pub use report::RunReport;
pub use split::{SplitTables, TableFrame, TableSplitter};
pub use types::{LoadReport, LoadStatus, SqlValue, TableLoadOutcome, TableStatus};
