//! Column conversion functions used by type normalization.
//!
//! Every converter treats a cell that is blank after trimming as null.

use crate::error::{EtlError, Result};
use crate::utils::{is_integral, parse_boolean, parse_finite_float, parse_integer};
use polars::prelude::*;

/// Literal kinds a text column can be promoted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LiteralKind {
    Integer,
    Float,
    Boolean,
}

/// Decide which literal kind every non-blank value of a text column shares.
///
/// Returns `None` when the column has no non-blank values or the values are mixed text.
pub(crate) fn infer_literal_kind(series: &StringChunked) -> Option<LiteralKind> {
    let mut seen_any = false;
    let mut all_integer = true;
    let mut all_float = true;
    let mut all_boolean = true;

    for val in series.into_iter().flatten() {
        let trimmed = val.trim();
        if trimmed.is_empty() {
            continue;
        }
        seen_any = true;

        if all_integer && parse_integer(trimmed).is_none() {
            all_integer = false;
        }
        if all_float && parse_finite_float(trimmed).is_none() {
            all_float = false;
        }
        if all_boolean && parse_boolean(trimmed).is_none() {
            all_boolean = false;
        }
        if !all_integer && !all_float && !all_boolean {
            return None;
        }
    }

    if !seen_any {
        None
    } else if all_integer {
        Some(LiteralKind::Integer)
    } else if all_float {
        Some(LiteralKind::Float)
    } else if all_boolean {
        Some(LiteralKind::Boolean)
    } else {
        None
    }
}

/// Convert a text series to Int64. Unparseable cells become null.
pub(crate) fn string_to_integer(series: &Series) -> Result<Series> {
    let values: Vec<Option<i64>> = series
        .str()?
        .into_iter()
        .map(|opt_val| opt_val.and_then(parse_integer))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Convert a text series to Float64. Unparseable cells become null.
pub(crate) fn string_to_float(series: &Series) -> Result<Series> {
    let values: Vec<Option<f64>> = series
        .str()?
        .into_iter()
        .map(|opt_val| opt_val.and_then(parse_finite_float))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Convert a text series to Float64, failing on any non-blank non-number.
pub(crate) fn string_to_float_strict(series: &Series) -> Result<Series> {
    let str_series = series.str()?;
    let mut values: Vec<Option<f64>> = Vec::with_capacity(str_series.len());

    for opt_val in str_series.into_iter() {
        match opt_val.map(str::trim) {
            Some(trimmed) if !trimmed.is_empty() => match parse_finite_float(trimmed) {
                Some(v) => values.push(Some(v)),
                None => {
                    return Err(EtlError::NonNumericColumn {
                        column: series.name().to_string(),
                        dtype: format!("text (value '{trimmed}')"),
                    });
                }
            },
            _ => values.push(None),
        }
    }

    Ok(Series::new(series.name().clone(), values))
}

/// Convert a text series of `true`/`false` literals to Boolean.
pub(crate) fn string_to_boolean(series: &Series) -> Result<Series> {
    let values: Vec<Option<bool>> = series
        .str()?
        .into_iter()
        .map(|opt_val| opt_val.and_then(parse_boolean))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Convert a float series holding only whole numbers to Int64.
///
/// A value that is not a whole number in the `i64` range becomes null.
pub(crate) fn float_to_integer(series: &Series) -> Result<Series> {
    let floats = series.cast(&DataType::Float64)?;
    let values: Vec<Option<i64>> = floats
        .f64()?
        .into_iter()
        .map(|opt_val| opt_val.filter(|v| is_integral(*v)).map(|v| v as i64))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}
