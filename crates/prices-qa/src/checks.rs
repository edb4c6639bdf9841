//! Data-quality checks over a [`DataFrame`].

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use polars::prelude::*;
use prices_core::{ColumnProfile, DataError, QaSummary, Result};
use regex::Regex;
use tracing::{debug, warn};

static STATE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").unwrap());

fn polars_err(e: PolarsError) -> DataError {
    DataError::Parse(e.to_string())
}

fn is_float(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

fn float_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(polars_err)?;
    Ok(series.f64().map_err(polars_err)?.into_iter().collect())
}

/// Number of missing cells in a column: nulls, plus NaN in float columns.
fn missing_count(column: &Column) -> Result<usize> {
    if !is_float(column.dtype()) {
        return Ok(column.null_count());
    }
    Ok(float_values(column)?
        .into_iter()
        .filter(|v| v.is_none_or(f64::is_nan))
        .count())
}

/// Number of distinct non-missing values in a column.
fn distinct_count(column: &Column) -> Result<usize> {
    if is_float(column.dtype()) {
        let distinct: HashSet<u64> = float_values(column)?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            // -0.0 and 0.0 are the same value
            .map(|v| (v + 0.0).to_bits())
            .collect();
        return Ok(distinct.len());
    }
    column
        .as_materialized_series()
        .drop_nulls()
        .n_unique()
        .map_err(polars_err)
}

/// Counts rows that are identical to an earlier row.
fn duplicate_count(df: &DataFrame) -> Result<usize> {
    let mut keys = vec![String::new(); df.height()];
    for column in df.get_columns() {
        if is_float(column.dtype()) {
            let values = float_values(column)?;
            for (key, value) in keys.iter_mut().zip(values) {
                // -0.0 and 0.0 are the same value
                let value = value.map(|v| v + 0.0);
                write!(key, "{value:?}\u{1f}").map_err(|e| DataError::Other(e.to_string()))?;
            }
            continue;
        }
        for (row, key) in keys.iter_mut().enumerate() {
            let value = column.get(row).map_err(polars_err)?;
            write!(key, "{value:?}\u{1f}").map_err(|e| DataError::Other(e.to_string()))?;
        }
    }

    let mut seen = HashSet::with_capacity(keys.len());
    let mut duplicates = 0;
    for key in keys {
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

/// Summarizes size, duplication and missingness of a table.
///
/// `missing_pct` is the mean over columns of each column's missing fraction,
/// and `0.0` for a table with no cells.
///
/// # Errors
/// Returns [`DataError::Parse`] if a column cannot be inspected.
pub fn qa_overview(df: &DataFrame, name: &str) -> Result<QaSummary> {
    let rows = df.height();
    let cols = df.width();

    let mut missing_cells = 0;
    let mut fraction_sum = 0.0;
    for column in df.get_columns() {
        let missing = missing_count(column)?;
        missing_cells += missing;
        if rows > 0 {
            fraction_sum += missing as f64 / rows as f64;
        }
    }

    let missing_pct = if rows == 0 || cols == 0 {
        0.0
    } else {
        fraction_sum / cols as f64
    };

    let summary = QaSummary {
        dataset: name.to_string(),
        rows,
        cols,
        duplicate_rows: duplicate_count(df)?,
        missing_cells,
        missing_pct,
    };
    debug!(?summary, "QA overview");
    Ok(summary)
}

/// Profiles every column, sorted by `pct_missing` then `n_unique`, both
/// descending. Ties keep the table's column order.
///
/// # Errors
/// Returns [`DataError::Parse`] if a column cannot be inspected.
pub fn qa_column_profile(df: &DataFrame) -> Result<Vec<ColumnProfile>> {
    let rows = df.height();

    let mut profiles = df
        .get_columns()
        .iter()
        .map(|column| {
            let n_missing = missing_count(column)?;
            Ok(ColumnProfile {
                column: column.name().to_string(),
                dtype: column.dtype().to_string(),
                n_missing,
                pct_missing: if rows == 0 {
                    0.0
                } else {
                    n_missing as f64 / rows as f64
                },
                n_unique: distinct_count(column)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    profiles.sort_by(|a, b| {
        b.pct_missing
            .total_cmp(&a.pct_missing)
            .then_with(|| b.n_unique.cmp(&a.n_unique))
    });
    Ok(profiles)
}

/// Lays out column profiles as a table with one row per column.
///
/// # Errors
/// Returns [`DataError::Parse`] if the table cannot be assembled.
pub fn column_profile_frame(profiles: &[ColumnProfile]) -> Result<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "column".into(),
            profiles.iter().map(|p| p.column.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "dtype".into(),
            profiles.iter().map(|p| p.dtype.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "n_missing".into(),
            profiles.iter().map(|p| p.n_missing as u64).collect::<Vec<_>>(),
        ),
        Column::new(
            "pct_missing".into(),
            profiles.iter().map(|p| p.pct_missing).collect::<Vec<_>>(),
        ),
        Column::new(
            "n_unique".into(),
            profiles.iter().map(|p| p.n_unique as u64).collect::<Vec<_>>(),
        ),
    ])
    .map_err(polars_err)
}

/// Fails if any of `required` is not a column of `df`.
///
/// # Errors
/// Returns [`DataError::Validation`] listing the absent columns in the order
/// they were requested.
pub fn assert_required_columns(df: &DataFrame, required: &[&str], name: &str) -> Result<()> {
    let present: HashSet<&str> = df
        .get_column_names()
        .into_iter()
        .map(|n| n.as_str())
        .collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| (*c).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::Validation {
            dataset: name.to_string(),
            missing,
        })
    }
}

/// Returns the values that are not two-letter state codes.
///
/// Values are compared as text; missing values (nulls, and NaN in float
/// series) are never reported. A warning naming the dataset is logged when
/// anything is found.
///
/// # Errors
/// Returns [`DataError::Parse`] if the series cannot be cast to text.
pub fn check_state_codes(series: &Series, name: &str) -> Result<Series> {
    let nan: Vec<bool> = if is_float(series.dtype()) {
        float_values(&Column::from(series.clone()))?
            .into_iter()
            .map(|v| v.is_some_and(f64::is_nan))
            .collect()
    } else {
        vec![false; series.len()]
    };

    let text = series.cast(&DataType::String).map_err(polars_err)?;
    let mask: BooleanChunked = text
        .str()
        .map_err(polars_err)?
        .into_iter()
        .zip(nan)
        .map(|(v, is_nan)| !is_nan && v.is_some_and(|s| !STATE_CODE.is_match(s)))
        .collect();

    let bad = series.filter(&mask).map_err(polars_err)?;
    if !bad.is_empty() {
        warn!(
            dataset = name,
            count = bad.len(),
            "Found values that are not two-letter state codes"
        );
    }
    Ok(bad)
}
