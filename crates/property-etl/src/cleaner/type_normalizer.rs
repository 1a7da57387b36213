//! Content-based type normalization for the unified table.

use super::converters::{
    LiteralKind, float_to_integer, infer_literal_kind, string_to_boolean, string_to_float,
    string_to_float_strict, string_to_integer,
};
use crate::error::{EtlError, Result};
use crate::schema::{is_flag_column, is_rounded_column};
use crate::utils::{is_float_dtype, is_integral, is_numeric_dtype};
use polars::prelude::*;
use tracing::debug;

/// Converts every column to its best-fit type: integer, float, boolean or text.
///
/// Two column families are pinned regardless of content: flag columns stay
/// text so they can take the `"No"` default, and the rounded decimal columns
/// are always Float64.
pub struct TypeNormalizer;

impl TypeNormalizer {
    /// Normalize all column types, returning the new frame and one step per change.
    pub fn normalize(&self, df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let mut df = df;
        let mut steps = Vec::new();

        debug!("Normalizing column types...");

        let column_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        for col_name in &column_names {
            let series = df.column(col_name)?.as_materialized_series();
            let before = series.dtype().clone();

            if let Some(converted) = self.normalize_series(series)? {
                let step = format!(
                    "Converted '{}' from {} to {}",
                    col_name,
                    before,
                    converted.dtype()
                );
                debug!("  {}", step);
                steps.push(step);
                df.replace(col_name, converted)?;
            }
        }

        Ok((df, steps))
    }

    /// Compute the normalized version of one column, or `None` when it is already right.
    fn normalize_series(&self, series: &Series) -> Result<Option<Series>> {
        let name = series.name().as_str();
        let dtype = series.dtype();

        if is_flag_column(name) {
            return match dtype {
                DataType::String => Ok(None),
                DataType::Boolean => Ok(Some(boolean_to_flag_text(series)?)),
                _ => Ok(Some(series.cast(&DataType::String)?)),
            };
        }

        if is_rounded_column(name) {
            return match dtype {
                DataType::Float64 => Ok(None),
                DataType::String => Ok(Some(string_to_float_strict(series)?)),
                dt if is_numeric_dtype(dt) => Ok(Some(series.cast(&DataType::Float64)?)),
                DataType::Null => Ok(Some(series.cast(&DataType::Float64)?)),
                other => Err(EtlError::NonNumericColumn {
                    column: name.to_string(),
                    dtype: other.to_string(),
                }),
            };
        }

        match dtype {
            DataType::String => self.normalize_text(series),
            dt if is_float_dtype(dt) => {
                if holds_only_whole_numbers(series)? {
                    Ok(Some(float_to_integer(series)?))
                } else {
                    Ok(None)
                }
            }
            DataType::Null => Ok(Some(series.cast(&DataType::String)?)),
            _ => Ok(None),
        }
    }

    /// Promote a text column whose values are all literals of one kind.
    fn normalize_text(&self, series: &Series) -> Result<Option<Series>> {
        let Some(kind) = infer_literal_kind(series.str()?) else {
            return Ok(None);
        };

        let converted = match kind {
            LiteralKind::Integer => string_to_integer(series)?,
            LiteralKind::Float => {
                let floats = string_to_float(series)?;
                if holds_only_whole_numbers(&floats)? {
                    float_to_integer(&floats)?
                } else {
                    floats
                }
            }
            LiteralKind::Boolean => string_to_boolean(series)?,
        };
        Ok(Some(converted))
    }
}

/// Render a boolean flag column as `"True"`/`"False"` text.
fn boolean_to_flag_text(series: &Series) -> Result<Series> {
    let values: Vec<Option<&str>> = series
        .bool()?
        .into_iter()
        .map(|opt_val| opt_val.map(|v| if v { "True" } else { "False" }))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// True when a float column has at least one value and every value is a whole number.
fn holds_only_whole_numbers(series: &Series) -> Result<bool> {
    let floats = series.cast(&DataType::Float64)?;
    let mut seen_any = false;
    for value in floats.f64()?.into_iter().flatten() {
        if !is_integral(value) {
            return Ok(false);
        }
        seen_any = true;
    }
    Ok(seen_any)
}
