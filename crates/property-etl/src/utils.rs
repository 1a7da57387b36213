//! Shared utilities for the ETL pipeline.
//!
//! This module contains dtype checks, blank-cell detection and the pinned
//! rounding arithmetic used by several stages.

use crate::config::RoundingMode;
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is a signed or unsigned integer.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is a signed integer (the only kind that can be negative).
#[inline]
pub fn is_signed_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
    )
}

/// Check if a DataType is a floating point type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || is_float_dtype(dtype)
}

/// Names of all columns whose dtype satisfies `predicate`.
pub fn columns_where(df: &DataFrame, predicate: impl Fn(&DataType) -> bool) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| predicate(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

// =============================================================================
// String Utilities
// =============================================================================

/// A cell the imputation steps treat as missing: `""` or a single space.
#[inline]
pub fn is_blank(value: &str) -> bool {
    value.is_empty() || value == " "
}

/// Parse a whole-number literal such as `"42"` or `"-7"`.
pub fn parse_integer(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}

/// Parse a finite decimal literal; `"inf"` and `"NaN"` are not numbers here.
pub fn parse_finite_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a `true`/`false` literal in any letter case.
pub fn parse_boolean(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Whether a float holds a whole number that converts to `i64` exactly.
#[inline]
pub fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64
}

/// Round `value` to `decimals` places under `mode`.
///
/// The value is scaled by `10^decimals`, rounded to a whole number, and scaled
/// back. Ties are judged on the scaled binary value, so `1.005` (stored as
/// `1.00499999999999989...`) rounds to `1.0` in both modes.
pub fn round_to(value: f64, decimals: u32, mode: RoundingMode) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let rounded = match mode {
        RoundingMode::HalfToEven => scaled.round_ties_even(),
        RoundingMode::HalfAwayFromZero => scaled.round(),
    };
    rounded / factor
}

// =============================================================================
// Tests
// =============================================================================
