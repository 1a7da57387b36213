//! Text sanitization: trimming and default-value imputation.

use crate::error::Result;
use crate::schema::is_flag_column;
use crate::utils::is_blank;
use polars::prelude::*;
use tracing::debug;

/// Default for a blank yes/no flag.
pub const FLAG_DEFAULT: &str = "No";

/// Default for any other blank text cell.
pub const TEXT_DEFAULT: &str = "Unknown";

/// Names of all text-typed columns.
fn text_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| col.dtype() == &DataType::String)
        .map(|col| col.name().to_string())
        .collect()
}

/// Trim leading and trailing whitespace from every text cell.
pub(crate) fn trim_text_columns(df: DataFrame) -> Result<(DataFrame, usize)> {
    let mut df = df;
    let mut trimmed_cells = 0;

    for col_name in text_columns(&df) {
        let series = df.column(&col_name)?.as_materialized_series();
        let mut changed = 0;
        let values: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|opt_val| {
                opt_val.map(|val| {
                    let trimmed = val.trim();
                    if trimmed.len() != val.len() {
                        changed += 1;
                    }
                    trimmed.to_string()
                })
            })
            .collect();

        if changed > 0 {
            trimmed_cells += changed;
            df.replace(&col_name, Series::new(col_name.as_str().into(), values))?;
        }
    }

    debug!("Trimmed whitespace in {} cells", trimmed_cells);
    Ok((df, trimmed_cells))
}

/// Replace null, `""` and `" "` in one text column with `fill`.
///
/// Returns the filled series and how many cells were replaced.
pub(crate) fn fill_blank_text(series: &Series, fill: &str) -> Result<(Series, usize)> {
    let mut filled = 0;
    let values: Vec<String> = series
        .str()?
        .into_iter()
        .map(|opt_val| match opt_val {
            Some(val) if !is_blank(val) => val.to_string(),
            _ => {
                filled += 1;
                fill.to_string()
            }
        })
        .collect();
    Ok((Series::new(series.name().clone(), values), filled))
}

/// Impute flag columns with `"No"`.
pub(crate) fn impute_flag_defaults(df: DataFrame) -> Result<(DataFrame, usize)> {
    impute_where(df, FLAG_DEFAULT, |name| is_flag_column(name))
}

/// Impute every non-flag text column with `"Unknown"`.
pub(crate) fn impute_text_defaults(df: DataFrame) -> Result<(DataFrame, usize)> {
    impute_where(df, TEXT_DEFAULT, |name| !is_flag_column(name))
}

fn impute_where(
    df: DataFrame,
    fill: &str,
    selects: impl Fn(&str) -> bool,
) -> Result<(DataFrame, usize)> {
    let mut df = df;
    let mut total = 0;

    for col_name in text_columns(&df) {
        if !selects(&col_name) {
            continue;
        }
        let series = df.column(&col_name)?.as_materialized_series();
        let (filled_series, filled) = fill_blank_text(series, fill)?;
        if filled > 0 {
            debug!("Filled {} blank cells in '{}' with '{}'", filled, col_name, fill);
            total += filled;
            df.replace(&col_name, filled_series)?;
        }
    }

    Ok((df, total))
}
