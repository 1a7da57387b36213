//! CSV extraction into a polars `DataFrame`.

use crate::error::{EtlError, Result, ResultExt};
use once_cell::sync::Lazy;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Cell contents read as missing, matching common spreadsheet/pandas exports.
///
/// `"Unknown"` is deliberately absent: it is a real value in this dataset.
pub const MISSING_VALUE_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

static MISSING_TOKENS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| MISSING_VALUE_TOKENS.iter().copied().collect());

/// Check whether a raw cell is a missing-value token (exact, case-sensitive).
#[inline]
pub fn is_missing_token(value: &str) -> bool {
    MISSING_TOKENS.contains(value)
}

/// Load a header-ful CSV file, inferring column types from the whole file.
///
/// # Errors
///
/// Returns [`EtlError::InputNotFound`] when the file does not exist and
/// [`EtlError::Polars`] when it cannot be parsed.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(EtlError::InputNotFound(path.display().to_string()));
    }

    info!("Loading dataset from: {}", path.display());

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Opening {}", path.display()))?
        .finish()
        .context(format!("Parsing {}", path.display()))?;

    let df = null_missing_tokens(df)?;
    info!("Dataset loaded successfully: {:?}", df.shape());
    Ok(df)
}

/// Replace missing-value tokens in every string column with null.
///
/// The CSV reader parses `NaN` and `inf` cells of numeric columns as float
/// values rather than text, so non-finite floats are nulled as well.
pub fn null_missing_tokens(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut total_replacements = 0;

    for col_name in &column_names {
        let series = df.column(col_name)?.as_materialized_series();
        let (replaced, cleaned) = match series.dtype() {
            DataType::String => null_text_tokens(series)?,
            DataType::Float32 | DataType::Float64 => null_non_finite(series)?,
            _ => continue,
        };

        if replaced > 0 {
            total_replacements += replaced;
            debug!("Nulled {} missing values in '{}'", replaced, col_name);
            df.replace(col_name, cleaned)?;
        }
    }

    if total_replacements > 0 {
        debug!("Replaced {} missing values with null", total_replacements);
    }

    Ok(df)
}

fn null_text_tokens(series: &Series) -> Result<(usize, Series)> {
    let mut replaced = 0;
    let values: Vec<Option<String>> = series
        .str()?
        .into_iter()
        .map(|opt_val| match opt_val {
            Some(val) if is_missing_token(val) => {
                replaced += 1;
                None
            }
            Some(val) => Some(val.to_string()),
            None => None,
        })
        .collect();
    Ok((replaced, Series::new(series.name().clone(), values)))
}

fn null_non_finite(series: &Series) -> Result<(usize, Series)> {
    let floats = series.cast(&DataType::Float64)?;
    let mut replaced = 0;
    let values: Vec<Option<f64>> = floats
        .f64()?
        .into_iter()
        .map(|opt_val| match opt_val {
            Some(v) if !v.is_finite() => {
                replaced += 1;
                None
            }
            other => other,
        })
        .collect();
    Ok((replaced, Series::new(series.name().clone(), values)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_tokens() {
        assert!(is_missing_token("N/A"));
        assert!(is_missing_token("NULL"));
        assert!(is_missing_token(""));
        assert!(!is_missing_token("Unknown"));
        assert!(!is_missing_token("No"));
        assert!(!is_missing_token(" null "));
    }

    #[test]
    fn test_load_csv_missing_file() {
        let result = load_csv("definitely/not/here.csv");
        assert!(matches!(result, Err(EtlError::InputNotFound(_))));
    }

    #[test]
    fn test_load_csv_infers_types_and_nulls_tokens() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Address,Bed,IRR,Pool").unwrap();
        writeln!(file, "1 Main St,3,0.125,Yes").unwrap();
        writeln!(file, "2 Main St,,N/A,NULL").unwrap();
        file.flush().unwrap();

        let df = load_csv(file.path()).unwrap();
        assert_eq!(df.shape(), (2, 4));
        assert_eq!(df.column("Bed").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("Bed").unwrap().null_count(), 1);
        // "N/A" keeps IRR a string column until type normalization, but the cell is gone
        assert_eq!(df.column("IRR").unwrap().null_count(), 1);
        assert_eq!(df.column("Pool").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_csv_nulls_nan_in_numeric_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Address,Bed,Taxes").unwrap();
        writeln!(file, "1 Main St,3,1500.5").unwrap();
        writeln!(file, "2 Main St,NaN,NaN").unwrap();
        writeln!(file, "3 Main St,-1,900.0").unwrap();
        file.flush().unwrap();

        let df = load_csv(file.path()).unwrap();
        assert_eq!(df.column("Bed").unwrap().null_count(), 1);
        assert_eq!(df.column("Taxes").unwrap().null_count(), 1);
    }

    #[test]
    fn test_null_missing_tokens_clears_non_finite_floats() {
        let df = df![
            "Bed" => [Some(3.0), Some(f64::NAN), None, Some(f64::NEG_INFINITY), Some(-1.0)],
        ]
        .unwrap();

        let df = null_missing_tokens(df).unwrap();
        let beds: Vec<Option<f64>> = df
            .column("Bed")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(beds, vec![Some(3.0), None, None, None, Some(-1.0)]);
    }

    #[test]
    fn test_null_missing_tokens_leaves_other_values() {
        let df = df![
            "City" => [Some("Austin"), Some("NA"), None, Some("Unknown")],
        ]
        .unwrap();

        let df = null_missing_tokens(df).unwrap();
        let city = df.column("City").unwrap().as_materialized_series();
        let values: Vec<Option<&str>> = city.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("Austin"), None, None, Some("Unknown")]);
    }
}
