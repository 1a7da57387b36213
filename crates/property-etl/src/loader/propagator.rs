//! Staged multi-table load with surrogate key propagation.

use super::keys::{AddressIndex, KeyResolution, KeyResolver, PropertyIndex};
use super::writer::TableWriter;
use crate::config::{FailurePolicy, LoadConfig, UnresolvedKeyPolicy};
use crate::error::{EtlError, Result};
use crate::split::{SplitTables, TableFrame};
use crate::types::{ErrorInfo, LoadReport, LoadStatus, SqlValue, TableLoadOutcome, TableStatus};
use tracing::{debug, info, warn};

/// Loads the split tables parent-first, feeding generated keys to child tables.
///
/// Stages run in a fixed order: `Address_info` and `Property` row by row (their
/// generated keys are captured), then the five dependent tables in bulk.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPropagator {
    config: LoadConfig,
}

/// Rows of a child table with their foreign keys attached.
struct ResolvedRows {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    /// Address key of each entry in `rows`.
    keys: Vec<String>,
    unresolved: usize,
}

impl KeyPropagator {
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    /// Run every load stage through `writer`.
    ///
    /// Failures never escape: each one is recorded on its table's outcome.
    pub fn propagate(&self, writer: &mut dyn TableWriter, tables: &SplitTables) -> LoadReport {
        let mut outcomes = Vec::with_capacity(2 + tables.dependents.len());
        let mut halted_by: Option<&'static str> = None;

        info!("Loading {} address rows", tables.address.len());
        let (outcome, address_index) = self.load_addresses(writer, &tables.address);
        if !outcome.status.is_loaded() {
            halted_by = self.halt_after(&tables.address);
        }
        outcomes.push(outcome);

        let property_index = match halted_by {
            Some(failed) => {
                outcomes.push(skipped(&tables.property, failed));
                None
            }
            None => {
                info!("Loading {} property rows", tables.property.len());
                let resolver = KeyResolver::new(address_index.as_ref(), None);
                let (outcome, index) = self.load_properties(writer, &tables.property, &resolver);
                if !outcome.status.is_loaded() {
                    halted_by = self.halt_after(&tables.property);
                }
                outcomes.push(outcome);
                index
            }
        };

        let resolver = KeyResolver::new(address_index.as_ref(), property_index.as_ref());
        for table in &tables.dependents {
            if let Some(failed) = halted_by {
                outcomes.push(skipped(table, failed));
                continue;
            }
            info!("Loading {} {} rows", table.len(), table.name());
            let outcome = self.load_dependent(writer, table, &resolver);
            if !outcome.status.is_loaded() {
                halted_by = self.halt_after(table);
            }
            outcomes.push(outcome);
        }

        let status = overall_status(&outcomes);
        LoadReport {
            tables: outcomes,
            status,
            committed: false,
        }
    }

    /// The failed table, when the policy stops the load after a failure.
    fn halt_after(&self, table: &TableFrame) -> Option<&'static str> {
        match self.config.failure_policy {
            FailurePolicy::Halt => Some(table.name()),
            FailurePolicy::Continue => None,
        }
    }

    fn load_addresses(
        &self,
        writer: &mut dyn TableWriter,
        table: &TableFrame,
    ) -> (TableLoadOutcome, Option<AddressIndex>) {
        let mut index = AddressIndex::default();

        for (row, key) in table.rows.iter().zip(&table.keys) {
            match writer.insert_returning_id(table.name(), &table.columns, row) {
                Ok(address_id) => index.insert(key.as_str(), address_id),
                Err(err) => {
                    let inserted = index.len();
                    return (failed(table.name(), &err, inserted, 0), None);
                }
            }
        }

        debug!("Captured {} Address_ID values", index.len());
        (loaded(table.name(), index.len(), 0), Some(index))
    }

    fn load_properties(
        &self,
        writer: &mut dyn TableWriter,
        table: &TableFrame,
        resolver: &KeyResolver<'_>,
    ) -> (TableLoadOutcome, Option<PropertyIndex>) {
        let resolved = match self.attach_keys(table, |key| resolver.address_id(key)) {
            Ok(resolved) => resolved,
            Err(err) => return (failed(table.name(), &err, 0, 0), None),
        };

        let mut index = PropertyIndex::default();
        let mut inserted = 0;
        for (row, key) in resolved.rows.iter().zip(&resolved.keys) {
            match writer.insert_returning_id(table.name(), &resolved.columns, row) {
                Ok(property_id) => {
                    inserted += 1;
                    if let Some(address_id) = resolver.address_id(key).id() {
                        index.insert(address_id, property_id);
                    }
                }
                Err(err) => {
                    return (
                        failed(table.name(), &err, inserted, resolved.unresolved),
                        None,
                    );
                }
            }
        }

        debug!("Captured {} Property_ID values", index.len());
        (
            loaded(table.name(), inserted, resolved.unresolved),
            Some(index),
        )
    }

    fn load_dependent(
        &self,
        writer: &mut dyn TableWriter,
        table: &TableFrame,
        resolver: &KeyResolver<'_>,
    ) -> TableLoadOutcome {
        let resolved = match self.attach_keys(table, |key| resolver.property_id(key)) {
            Ok(resolved) => resolved,
            Err(err) => return failed(table.name(), &err, 0, 0),
        };

        match writer.insert_many(table.name(), &resolved.columns, &resolved.rows) {
            Ok(inserted) => loaded(table.name(), inserted, resolved.unresolved),
            Err(err) => failed(table.name(), &err, 0, resolved.unresolved),
        }
    }

    /// Append each row's foreign key, applying the unresolved-key policy to misses.
    fn attach_keys(
        &self,
        table: &TableFrame,
        resolve: impl Fn(&str) -> KeyResolution,
    ) -> Result<ResolvedRows> {
        let mut columns = table.columns.clone();
        if let Some(fk) = table.schema.foreign_key() {
            columns.push(fk.to_string());
        }

        let mut resolved = ResolvedRows {
            columns,
            rows: Vec::with_capacity(table.len()),
            keys: Vec::with_capacity(table.len()),
            unresolved: 0,
        };

        for (idx, (row, key)) in table.rows.iter().zip(&table.keys).enumerate() {
            let foreign_key = match resolve(key.as_str()) {
                KeyResolution::Resolved(id) => SqlValue::Integer(id),
                miss => {
                    resolved.unresolved += 1;
                    match self.config.unresolved_keys {
                        UnresolvedKeyPolicy::Skip => {
                            debug!("Skipping {} row {}: {:?}", table.name(), idx, miss);
                            continue;
                        }
                        UnresolvedKeyPolicy::InsertNull => SqlValue::Null,
                        UnresolvedKeyPolicy::Abort => {
                            return Err(EtlError::UnresolvedKey {
                                table: table.name().to_string(),
                                row: idx,
                                address: key.clone(),
                            });
                        }
                    }
                }
            };

            let mut values = row.clone();
            values.push(foreign_key);
            resolved.rows.push(values);
            resolved.keys.push(key.clone());
        }

        if resolved.unresolved > 0 {
            warn!(
                "{} rows of {} have no resolvable {} ({:?})",
                resolved.unresolved,
                table.name(),
                table.schema.foreign_key().unwrap_or("key"),
                self.config.unresolved_keys
            );
        }
        Ok(resolved)
    }
}

fn loaded(table: &str, rows_inserted: usize, rows_unresolved: usize) -> TableLoadOutcome {
    TableLoadOutcome {
        table: table.to_string(),
        status: TableStatus::Loaded,
        rows_inserted,
        rows_unresolved,
    }
}

fn failed(
    table: &str,
    err: &EtlError,
    rows_inserted: usize,
    rows_unresolved: usize,
) -> TableLoadOutcome {
    let err = EtlError::StageFailed {
        table: table.to_string(),
        reason: err.to_string(),
    };
    warn!("{}", err);
    TableLoadOutcome {
        table: table.to_string(),
        status: TableStatus::Failed {
            error: ErrorInfo::from(&err),
        },
        rows_inserted,
        rows_unresolved,
    }
}

fn skipped(table: &TableFrame, failed_table: &str) -> TableLoadOutcome {
    TableLoadOutcome {
        table: table.name().to_string(),
        status: TableStatus::Skipped {
            reason: format!("{failed_table} failed to load"),
        },
        rows_inserted: 0,
        rows_unresolved: 0,
    }
}

fn overall_status(outcomes: &[TableLoadOutcome]) -> LoadStatus {
    let all_clean = outcomes
        .iter()
        .all(|outcome| outcome.status.is_loaded() && outcome.rows_unresolved == 0);
    let any_rows = outcomes.iter().any(|outcome| outcome.rows_inserted > 0);

    if all_clean {
        LoadStatus::Success
    } else if any_rows {
        LoadStatus::Partial
    } else {
        LoadStatus::Failed
    }
}
