//! Minimal HTML profiling report.

use std::fs;
use std::path::Path;

use askama::Template;
use polars::prelude::*;
use prices_core::{ColumnProfile, DataError, QaSummary, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::checks::{qa_column_profile, qa_overview};

/// Rows profiled by default; larger tables are sampled down to this size.
pub const DEFAULT_PROFILE_SAMPLE: usize = 200_000;

/// Seed of the row sampler, so repeated runs profile the same rows.
pub const PROFILE_SEED: u64 = 42;

#[derive(Debug, Template)]
#[template(path = "profile.html")]
struct ProfileTemplate<'a> {
    title: &'a str,
    sample_note: Option<String>,
    summary: QaSummary,
    missing_pct: String,
    columns: Vec<ColumnSection>,
}

#[derive(Debug)]
struct ColumnSection {
    name: String,
    dtype: String,
    n_missing: usize,
    pct_missing: String,
    n_unique: usize,
    stats: Option<NumericStats>,
}

#[derive(Debug)]
struct NumericStats {
    min: String,
    mean: String,
    max: String,
}

/// Renders a profiling report of `df` to `out_html`.
///
/// With `sample = Some(n)`, `n > 0`, and more than `n` rows, a fixed-seed
/// random sample of `n` rows is profiled (in their original order). Otherwise
/// the whole table is used. Parent directories are created as needed.
///
/// # Errors
/// Returns [`DataError::Io`] if the report cannot be written and
/// [`DataError::Report`] if rendering fails.
pub fn write_profile_report(
    df: &DataFrame,
    out_html: impl AsRef<Path>,
    title: &str,
    sample: Option<usize>,
) -> Result<()> {
    let out_html = out_html.as_ref();
    let profiled = sample_rows(df, sample)?;

    let sample_note = (profiled.height() < df.height()).then(|| {
        format!(
            "Profiled a random sample of {} of {} rows (seed {}).",
            profiled.height(),
            df.height(),
            PROFILE_SEED
        )
    });

    let summary = qa_overview(&profiled, title)?;
    let columns = qa_column_profile(&profiled)?
        .into_iter()
        .map(|profile| column_section(&profiled, profile))
        .collect::<Result<Vec<_>>>()?;

    let template = ProfileTemplate {
        title,
        sample_note,
        missing_pct: format_pct(summary.missing_pct),
        summary,
        columns,
    };
    let html = template
        .render()
        .map_err(|e| DataError::Report(e.to_string()))?;

    if let Some(parent) = out_html.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| DataError::Io(format!("{}: {e}", parent.display())))?;
    }
    fs::write(out_html, html).map_err(|e| DataError::Io(format!("{}: {e}", out_html.display())))?;

    info!(
        path = %out_html.display(),
        rows = profiled.height(),
        "Wrote profiling report"
    );
    Ok(())
}

/// Draws the fixed-seed sample, or returns the whole table.
fn sample_rows(df: &DataFrame, sample: Option<usize>) -> Result<DataFrame> {
    match sample {
        Some(n) if n > 0 && df.height() > n => {
            let mut rng = StdRng::seed_from_u64(PROFILE_SEED);
            let mut indices: Vec<IdxSize> = rand::seq::index::sample(&mut rng, df.height(), n)
                .into_iter()
                .map(|i| i as IdxSize)
                .collect();
            indices.sort_unstable();
            debug!(rows = df.height(), sample = n, "Sampling rows for profile");

            let indices = IdxCa::from_vec("index".into(), indices);
            df.take(&indices)
                .map_err(|e| DataError::Other(e.to_string()))
        }
        _ => Ok(df.clone()),
    }
}

fn column_section(df: &DataFrame, profile: ColumnProfile) -> Result<ColumnSection> {
    let column = df
        .column(&profile.column)
        .map_err(|e| DataError::Other(e.to_string()))?;

    Ok(ColumnSection {
        stats: numeric_stats(column)?,
        name: profile.column,
        dtype: profile.dtype,
        n_missing: profile.n_missing,
        pct_missing: format_pct(profile.pct_missing),
        n_unique: profile.n_unique,
    })
}

fn numeric_stats(column: &Column) -> Result<Option<NumericStats>> {
    if !matches!(
        column.dtype(),
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    ) {
        return Ok(None);
    }

    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| DataError::Other(e.to_string()))?;
    let values: Vec<f64> = series
        .f64()
        .map_err(|e| DataError::Other(e.to_string()))?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();

    if values.is_empty() {
        return Ok(None);
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    Ok(Some(NumericStats {
        min: format_number(min),
        mean: format_number(mean),
        max: format_number(max),
    }))
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.4}")
    }
}

fn format_pct(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}
