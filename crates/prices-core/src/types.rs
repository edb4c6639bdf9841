//! Core value types produced by the pipeline.
//!
//! - [`EiaResult`] - Concatenated pages of an EIA v2 query
//! - [`QaSummary`] - Dataset-level data-quality statistics
//! - [`ColumnProfile`] - Column-level data-quality statistics
//! - [`CachedResponse`] - A stored HTTP response body

use std::time::Duration;

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// All pages of an EIA v2 query concatenated into one table.
#[derive(Clone, Debug)]
pub struct EiaResult {
    /// One row per API record, in page order then row order.
    pub frame: DataFrame,
    /// Total row count declared by the API (0 if the response never had one).
    pub total: usize,
}

impl EiaResult {
    /// Returns the number of rows actually fetched.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.frame.height()
    }

    /// Returns true if every declared row was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.frame.height() >= self.total
    }
}

/// Dataset-level data-quality statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QaSummary {
    /// Name of the dataset.
    pub dataset: String,
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub cols: usize,
    /// Rows that exactly repeat an earlier row.
    pub duplicate_rows: usize,
    /// Cells that are null (or NaN in float columns).
    pub missing_cells: usize,
    /// Mean of the per-column missing fractions; 0.0 for a table without cells.
    pub missing_pct: f64,
}

/// Column-level data-quality statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name as it appears in the table.
    pub column: String,
    /// Data type label.
    pub dtype: String,
    /// Missing cell count.
    pub n_missing: usize,
    /// Missing fraction of the column (0.0 for an empty table).
    pub pct_missing: f64,
    /// Distinct non-missing values.
    pub n_unique: usize,
}

/// A successful GET response kept by an [`HttpCache`](crate::cache::HttpCache).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Requested URL, without query parameters.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// When the response was stored.
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
            cached_at: Utc::now(),
        }
    }

    /// Returns true if the entry is older than `expire_after`.
    #[must_use]
    pub fn is_expired(&self, expire_after: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > chrono::TimeDelta::from_std(expire_after).unwrap_or(chrono::TimeDelta::MAX)
    }
}
