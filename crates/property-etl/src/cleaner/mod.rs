//! Transform stage for the unified property table.
//!
//! This module provides functionality for:
//! - Content-based type normalization
//! - Text trimming
//! - Rounding the fixed decimal columns
//! - Flag and text default imputation
//! - Negative-row filtering
//! - Exact duplicate removal

mod converters;
mod filters;
mod sanitizers;
mod type_normalizer;

pub use sanitizers::{FLAG_DEFAULT, TEXT_DEFAULT};
pub use type_normalizer::TypeNormalizer;

use crate::config::TransformConfig;
use crate::error::{Result, ResultExt};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Row counts and step log of one transform run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSummary {
    /// One human-readable line per step.
    pub actions: Vec<String>,
    /// Rows in the extracted frame.
    pub rows_before: usize,
    /// Rows dropped because an integer column was negative.
    pub negative_rows_removed: usize,
    /// Rows dropped as exact duplicates.
    pub duplicates_removed: usize,
    /// Rows in the cleaned frame.
    pub rows_after: usize,
}

/// Cleaned unified table plus what was done to it.
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub frame: DataFrame,
    pub summary: TransformSummary,
}

/// Runs the seven cleaning steps in their fixed order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    config: TransformConfig,
}

impl Transformer {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Clean the unified table.
    ///
    /// Steps:
    /// 1. Normalize column types
    /// 2. Trim text cells
    /// 3. Round the decimal columns
    /// 4. Default blank flags to `"No"`
    /// 5. Default other blank text to `"Unknown"`
    /// 6. Drop rows with a negative integer
    /// 7. Drop exact duplicate rows
    pub fn transform(&self, df: DataFrame) -> Result<TransformOutcome> {
        let mut summary = TransformSummary {
            rows_before: df.height(),
            ..Default::default()
        };

        info!("Transforming {} rows...", summary.rows_before);

        // 1. Types
        let (df, conversions) = TypeNormalizer
            .normalize(df)
            .context("During type normalization")?;
        if conversions.is_empty() {
            summary.actions.push("No column type changes needed".to_string());
        } else {
            summary.actions.push(format!(
                "Normalized types of {} columns",
                conversions.len()
            ));
        }

        // 2. Trim
        let (df, trimmed) = sanitizers::trim_text_columns(df)?;
        summary
            .actions
            .push(format!("Trimmed whitespace in {} text cells", trimmed));

        // 3. Round
        let (df, rounded) = filters::round_decimal_columns(
            df,
            self.config.rounding_decimals,
            self.config.rounding_mode,
        )
        .context("During rounding")?;
        summary.actions.push(format!(
            "Rounded {} columns to {} decimals",
            rounded.len(),
            self.config.rounding_decimals
        ));

        // 4. Flags
        let (df, flags_filled) = sanitizers::impute_flag_defaults(df)?;
        summary.actions.push(format!(
            "Filled {} blank flag cells with '{}'",
            flags_filled, FLAG_DEFAULT
        ));

        // 5. Text
        let (df, text_filled) = sanitizers::impute_text_defaults(df)?;
        summary.actions.push(format!(
            "Filled {} blank text cells with '{}'",
            text_filled, TEXT_DEFAULT
        ));

        // 6. Negative rows
        let (df, negative) = filters::drop_negative_rows(df)?;
        summary.negative_rows_removed = negative;
        if negative > 0 {
            summary
                .actions
                .push(format!("Removed {} rows with negative values", negative));
        } else {
            summary
                .actions
                .push("No rows with negative values found".to_string());
        }

        // 7. Duplicates
        let (df, duplicates) = filters::drop_duplicate_rows(df)?;
        summary.duplicates_removed = duplicates;
        if duplicates > 0 {
            summary
                .actions
                .push(format!("Removed {} duplicate rows", duplicates));
        } else {
            summary.actions.push("No duplicate rows found".to_string());
        }
        debug!("Removed {} duplicate rows", duplicates);

        summary.rows_after = df.height();
        info!(
            "Transform complete: {} -> {} rows",
            summary.rows_before, summary.rows_after
        );

        Ok(TransformOutcome { frame: df, summary })
    }
}
