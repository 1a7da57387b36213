//! Splitting the cleaned unified table into the seven table projections.

use crate::error::{EtlError, Result, ResultExt};
use crate::schema::{ADDRESS_INFO, ADDRESS_KEY, DEPENDENT_TABLES, PROPERTY, TableSchema};
use crate::types::SqlValue;
use polars::prelude::*;
use tracing::{debug, info};

/// One table's rows, ready for the loader.
#[derive(Debug, Clone)]
pub struct TableFrame {
    pub schema: &'static TableSchema,
    /// `Address` join key of each row.
    pub keys: Vec<String>,
    /// Columns of `rows`, in insert order, without the foreign key.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl TableFrame {
    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All seven projections of one cleaned frame.
#[derive(Debug, Clone)]
pub struct SplitTables {
    pub address: TableFrame,
    pub property: TableFrame,
    /// Leads, Valuation, Rehab, HOA and Taxes, in load order.
    pub dependents: Vec<TableFrame>,
}

impl SplitTables {
    /// Every projection in load order.
    pub fn iter(&self) -> impl Iterator<Item = &TableFrame> {
        [&self.address, &self.property]
            .into_iter()
            .chain(self.dependents.iter())
    }
}

/// Projects the fixed table schemas out of the unified table.
pub struct TableSplitter;

impl TableSplitter {
    /// Split `df` into the seven table projections.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::MissingJoinKey`] if any projected row has a null `Address`.
    pub fn split(&self, df: &DataFrame) -> Result<SplitTables> {
        info!("Splitting {} cleaned rows into table projections", df.height());

        let address = self
            .project(df, &ADDRESS_INFO)
            .context(format!("Projecting {}", ADDRESS_INFO.name))?;
        let property = self
            .project(df, &PROPERTY)
            .context(format!("Projecting {}", PROPERTY.name))?;

        let mut dependents = Vec::with_capacity(DEPENDENT_TABLES.len());
        for schema in DEPENDENT_TABLES {
            dependents.push(
                self.project(df, schema)
                    .context(format!("Projecting {}", schema.name))?,
            );
        }

        let tables = SplitTables {
            address,
            property,
            dependents,
        };
        for table in tables.iter() {
            debug!("  {}: {} rows", table.name(), table.len());
        }
        Ok(tables)
    }

    /// Project one schema, deduplicating on `Address` where the schema asks for it.
    pub fn project(&self, df: &DataFrame, schema: &'static TableSchema) -> Result<TableFrame> {
        let mut projected = df.select(schema.columns.iter().copied())?;
        if schema.dedup_by_address {
            let subset = [ADDRESS_KEY.to_string()];
            projected =
                projected.unique_stable(Some(&subset), UniqueKeepStrategy::First, None)?;
        }

        let key_series = projected.column(ADDRESS_KEY)?.as_materialized_series();
        let key_text = key_series.cast(&DataType::String)?;
        let mut keys = Vec::with_capacity(projected.height());
        for (row, opt_key) in key_text.str()?.into_iter().enumerate() {
            match opt_key {
                Some(key) => keys.push(key.to_string()),
                None => {
                    return Err(EtlError::MissingJoinKey {
                        table: schema.name.to_string(),
                        row,
                    });
                }
            }
        }

        let columns: Vec<String> = schema
            .columns
            .iter()
            .filter(|col| schema.stores_address() || **col != ADDRESS_KEY)
            .map(|col| col.to_string())
            .collect();

        let mut cells: Vec<Vec<SqlValue>> = Vec::with_capacity(columns.len());
        for col_name in &columns {
            cells.push(series_to_values(
                projected.column(col_name)?.as_materialized_series(),
            )?);
        }

        let rows = (0..projected.height())
            .map(|idx| cells.iter().map(|column| column[idx].clone()).collect())
            .collect();

        Ok(TableFrame {
            schema,
            keys,
            columns,
            rows,
        })
    }
}

/// Convert one column to bindable values. Unhandled dtypes are bound as text.
fn series_to_values(series: &Series) -> Result<Vec<SqlValue>> {
    let values = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, SqlValue::Boolean))
            .collect(),
        DataType::Float32 | DataType::Float64 => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, SqlValue::Real))
            .collect(),
        dt if dt.is_integer() => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(SqlValue::from)
            .collect(),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, |s| SqlValue::Text(s.to_string())))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, |s| SqlValue::Text(s.to_string())))
            .collect(),
    };
    Ok(values)
}
