//! Load stage: writes the split tables into the database.
//!
//! This module provides:
//! - [`TableWriter`], the database seam, and its SQLite implementation
//! - Key indexes and the two-hop `Address -> Address_ID -> Property_ID` lookup
//! - [`KeyPropagator`], which runs the staged load
//! - [`load`], which wraps a run in a transaction when configured to

mod keys;
mod propagator;
mod writer;

pub use keys::{AddressIndex, KeyResolution, KeyResolver, PropertyIndex};
pub use propagator::KeyPropagator;
pub use writer::{SqliteWriter, TableWriter, insert_sql};

use crate::config::LoadConfig;
use crate::error::{Result, ResultExt};
use crate::split::SplitTables;
use crate::types::{LoadReport, TableStatus};
use rusqlite::Connection;
use tracing::{info, warn};

/// Load every table through `conn`.
///
/// With `config.atomic` the whole load runs in one transaction, committed
/// only when every table stage loaded. Otherwise each insert commits as it
/// runs, so rows written before a failure stay in the database.
pub fn load(conn: &mut Connection, tables: &SplitTables, config: &LoadConfig) -> Result<LoadReport> {
    let propagator = KeyPropagator::new(*config);

    if !config.atomic {
        let mut writer = SqliteWriter::new(conn);
        let mut report = propagator.propagate(&mut writer, tables);
        report.committed = true;
        return Ok(report);
    }

    let tx = conn.transaction().context("Starting load transaction")?;
    let mut report = {
        let mut writer = SqliteWriter::new(&tx);
        propagator.propagate(&mut writer, tables)
    };

    let every_stage_loaded = report
        .tables
        .iter()
        .all(|outcome| matches!(outcome.status, TableStatus::Loaded));

    if every_stage_loaded {
        tx.commit().context("Committing load transaction")?;
        report.committed = true;
        info!("Committed {} rows", report.rows_inserted());
    } else {
        tx.rollback().context("Rolling back load transaction")?;
        report.committed = false;
        warn!("Load did not complete; rolled back all inserts");
    }

    Ok(report)
}
