//! Numeric rounding and row filters.

use crate::config::RoundingMode;
use crate::error::{EtlError, Result};
use crate::schema::ROUNDED_COLUMNS;
use crate::utils::{
    columns_where, is_float_dtype, is_integer_dtype, is_signed_integer_dtype, round_to,
};
use polars::prelude::*;
use tracing::debug;

/// Round every rounded decimal column to `decimals` places.
///
/// Integer columns already hold whole numbers and are left untouched.
///
/// # Errors
///
/// Returns [`EtlError::ColumnNotFound`] if a rounded column is absent and
/// [`EtlError::NonNumericColumn`] if one holds text or booleans.
pub(crate) fn round_decimal_columns(
    df: DataFrame,
    decimals: u32,
    mode: RoundingMode,
) -> Result<(DataFrame, Vec<String>)> {
    let mut df = df;
    let mut rounded = Vec::new();

    for col_name in ROUNDED_COLUMNS {
        let series = df
            .column(col_name)
            .map_err(|_| EtlError::ColumnNotFound(col_name.to_string()))?
            .as_materialized_series();
        let dtype = series.dtype().clone();

        if is_integer_dtype(&dtype) {
            continue;
        }
        if !is_float_dtype(&dtype) {
            return Err(EtlError::NonNumericColumn {
                column: col_name.to_string(),
                dtype: dtype.to_string(),
            });
        }

        let floats = series.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = floats
            .f64()?
            .into_iter()
            .map(|opt_val| opt_val.map(|v| round_to(v, decimals, mode)))
            .collect();
        df.replace(col_name, Series::new(col_name.into(), values))?;
        rounded.push(col_name.to_string());
    }

    debug!("Rounded {:?} to {} decimals ({:?})", rounded, decimals, mode);
    Ok((df, rounded))
}

/// Drop every row where any integer column holds a negative value.
///
/// Nulls are not negative. Without integer columns the frame is returned unchanged.
pub(crate) fn drop_negative_rows(df: DataFrame) -> Result<(DataFrame, usize)> {
    let signed_columns = columns_where(&df, is_signed_integer_dtype);
    if signed_columns.is_empty() || df.height() == 0 {
        return Ok((df, 0));
    }

    let mut keep = vec![true; df.height()];
    for col_name in &signed_columns {
        let series = df.column(col_name)?.as_materialized_series();
        let ints = series.cast(&DataType::Int64)?;
        for (idx, opt_val) in ints.i64()?.into_iter().enumerate() {
            if matches!(opt_val, Some(v) if v < 0) {
                keep[idx] = false;
            }
        }
    }

    let removed = keep.iter().filter(|k| !**k).count();
    if removed == 0 {
        return Ok((df, 0));
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let df = df.filter(&mask)?;
    debug!(
        "Removed {} rows with negative values in {} integer columns",
        removed,
        signed_columns.len()
    );
    Ok((df, removed))
}

/// Remove exact duplicate rows, keeping the first occurrence in row order.
pub(crate) fn drop_duplicate_rows(df: DataFrame) -> Result<(DataFrame, usize)> {
    let before = df.height();
    let df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let removed = before - df.height();
    Ok((df, removed))
}
