//! Fixed table contracts for the seven target tables.
//!
//! Every projection, every rounding rule and the address join key are named
//! here once. [`validate_columns`] checks an extracted frame against all of
//! them before any transform work starts.

use crate::error::{EtlError, Result};
use polars::prelude::*;
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::debug;

/// Natural key shared by the unified table and every projection.
pub const ADDRESS_KEY: &str = "Address";

/// Decimal columns rounded by the transform stage.
pub const ROUNDED_COLUMNS: [&str; 4] = ["Tax_Rate", "Net_Yield", "IRR", "School_Average"];

/// Flag column that does not follow the `Flag` suffix convention.
pub const BASEMENT_FLAG_COLUMN: &str = "BasementYesNo";

/// Suffix marking a yes/no flag column.
pub const FLAG_SUFFIX: &str = "Flag";

/// Check whether a column is a yes/no flag column.
#[inline]
pub fn is_flag_column(name: &str) -> bool {
    name.ends_with(FLAG_SUFFIX) || name == BASEMENT_FLAG_COLUMN
}

/// Check whether a column belongs to the rounded decimal set.
#[inline]
pub fn is_rounded_column(name: &str) -> bool {
    ROUNDED_COLUMNS.contains(&name)
}

/// How a table's rows reference their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// Root table, keeps the `Address` text itself
    None,
    /// References `Address_info` through `Address_ID`
    Address,
    /// References `Property` through `Property_ID`
    Property,
}

/// Contract for one target table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name in the database.
    pub name: &'static str,
    /// Columns projected from the unified table, `Address` first.
    pub columns: &'static [&'static str],
    /// Generated surrogate key, when later tables depend on it.
    pub generated_key: Option<&'static str>,
    /// Parent reference resolved during the load.
    pub parent: Parent,
    /// Keep only the first row per `Address`.
    pub dedup_by_address: bool,
}

impl TableSchema {
    /// Name of the foreign key column appended during the load, if any.
    pub fn foreign_key(&self) -> Option<&'static str> {
        match self.parent {
            Parent::None => None,
            Parent::Address => ADDRESS_INFO.generated_key,
            Parent::Property => PROPERTY.generated_key,
        }
    }

    /// Whether the `Address` text is stored in this table.
    pub fn stores_address(&self) -> bool {
        self.parent == Parent::None
    }

    /// Columns written to the database, in insert order.
    pub fn insert_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .columns
            .iter()
            .filter(|col| self.stores_address() || **col != ADDRESS_KEY)
            .map(|col| col.to_string())
            .collect();
        if let Some(fk) = self.foreign_key() {
            columns.push(fk.to_string());
        }
        columns
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for SQLite.
    pub fn create_table_sql(&self) -> String {
        let key = self
            .generated_key
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_ID", self.name));
        let mut defs = vec![format!("\"{key}\" INTEGER PRIMARY KEY AUTOINCREMENT")];

        for col in self.columns {
            if *col == ADDRESS_KEY {
                if self.stores_address() {
                    defs.push(format!("\"{col}\" TEXT NOT NULL"));
                }
                continue;
            }
            defs.push(format!("\"{col}\""));
        }

        match self.parent {
            Parent::None => {}
            Parent::Address => defs.push(
                "\"Address_ID\" INTEGER REFERENCES \"Address_info\"(\"Address_ID\")".to_string(),
            ),
            Parent::Property => defs.push(
                "\"Property_ID\" INTEGER REFERENCES \"Property\"(\"Property_ID\")".to_string(),
            ),
        }

        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
            self.name,
            defs.join(",\n    ")
        )
    }
}

pub const ADDRESS_INFO: TableSchema = TableSchema {
    name: "Address_info",
    columns: &["Address", "Street_Address", "City", "State", "Zip"],
    generated_key: Some("Address_ID"),
    parent: Parent::None,
    dedup_by_address: true,
};

pub const PROPERTY: TableSchema = TableSchema {
    name: "Property",
    columns: &[
        "Address",
        "Property_Title",
        "Property_Type",
        "Market",
        "Flood",
        "Highway",
        "Train",
        "Tax_Rate",
        "SQFT_Basement",
        "HTW",
        "Pool",
        "Commercial",
        "Water",
        "Sewage",
        "Year_Built",
        "SQFT_MU",
        "SQFT_Total",
        "Parking",
        "Bed",
        "Bath",
        "BasementYesNo",
        "Layout",
        "Rent_Restricted",
        "Neighborhood_Rating",
        "Latitude",
        "Longitude",
        "Subdivision",
        "School_Average",
    ],
    generated_key: Some("Property_ID"),
    parent: Parent::Address,
    dedup_by_address: true,
};

pub const LEADS: TableSchema = TableSchema {
    name: "Leads",
    columns: &[
        "Address",
        "Reviewed_Status",
        "Most_Recent_Status",
        "Source",
        "Occupancy",
        "Net_Yield",
        "IRR",
        "Selling_Reason",
        "Seller_Retained_Broker",
        "Final_Reviewer",
    ],
    generated_key: None,
    parent: Parent::Property,
    dedup_by_address: false,
};

pub const VALUATION: TableSchema = TableSchema {
    name: "Valuation",
    columns: &[
        "Address",
        "Previous_Rent",
        "List_Price",
        "Zestimate",
        "ARV",
        "Expected_Rent",
        "Rent_Zestimate",
        "Low_FMR",
        "High_FMR",
        "Redfin_Value",
    ],
    generated_key: None,
    parent: Parent::Property,
    dedup_by_address: false,
};

pub const HOA: TableSchema = TableSchema {
    name: "HOA",
    columns: &["Address", "HOA", "HOA_Flag"],
    generated_key: None,
    parent: Parent::Property,
    dedup_by_address: false,
};

pub const REHAB: TableSchema = TableSchema {
    name: "Rehab",
    columns: &[
        "Address",
        "Underwriting_Rehab",
        "Rehab_Calculation",
        "Paint",
        "Flooring_Flag",
        "Foundation_Flag",
        "Roof_Flag",
        "HVAC_Flag",
        "Kitchen_Flag",
        "Bathroom_Flag",
        "Appliances_Flag",
        "Windows_Flag",
        "Landscaping_Flag",
        "Trashout_Flag",
    ],
    generated_key: None,
    parent: Parent::Property,
    dedup_by_address: false,
};

pub const TAXES: TableSchema = TableSchema {
    name: "Taxes",
    columns: &["Address", "Taxes"],
    generated_key: None,
    parent: Parent::Property,
    dedup_by_address: false,
};

/// Tables keyed off `Property_ID`, in load order.
pub const DEPENDENT_TABLES: [&TableSchema; 5] = [&LEADS, &VALUATION, &REHAB, &HOA, &TAXES];

/// Every table in load order.
pub const ALL_TABLES: [&TableSchema; 7] = [
    &ADDRESS_INFO,
    &PROPERTY,
    &LEADS,
    &VALUATION,
    &REHAB,
    &HOA,
    &TAXES,
];

/// Verify that every column any table projects exists in `df`.
///
/// Reports the first table with missing columns, listing all of them.
pub fn validate_columns(df: &DataFrame) -> Result<()> {
    let present: HashSet<&str> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();

    for table in ALL_TABLES {
        let missing: Vec<String> = table
            .columns
            .iter()
            .filter(|col| !present.contains(**col))
            .map(|col| col.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(EtlError::MissingColumns {
                table: table.name.to_string(),
                columns: missing,
            });
        }
    }

    debug!("All {} table schemas satisfied by input columns", ALL_TABLES.len());
    Ok(())
}

/// Create all seven tables on an empty database.
pub fn create_tables(conn: &Connection) -> Result<()> {
    let ddl: Vec<String> = ALL_TABLES
        .iter()
        .map(|table| format!("{};", table.create_table_sql()))
        .collect();
    conn.execute_batch(&ddl.join("\n"))?;
    debug!("Ensured {} target tables exist", ALL_TABLES.len());
    Ok(())
}
