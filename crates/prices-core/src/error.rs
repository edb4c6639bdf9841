//! Error types for pipeline operations.
//!
//! This module defines [`DataError`] which covers all error cases that can occur
//! when locating the workspace, fetching from the EIA API, caching responses,
//! loading tables, or validating them.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Configuration problems (missing API key, repository root not found).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors (connection failures, broken transfers).
    #[error("Network error: {0}")]
    Network(String),

    /// A request exceeded its timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The server answered with a non-success status code.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Status code returned by the server.
        status: u16,
        /// URL that was requested, without query parameters.
        url: String,
    },

    /// Error parsing a response body, CSV file, or response shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A dataset is missing columns its consumers require.
    #[error("{dataset}: missing required columns: {missing:?}")]
    Validation {
        /// Name of the dataset being validated.
        dataset: String,
        /// Required columns that were absent, in the order they were required.
        missing: Vec<String>,
    },

    /// Error interacting with the response cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Error rendering a report.
    #[error("Report error: {0}")]
    Report(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl DataError {
    /// Returns true for failures worth retrying: transport errors, timeouts,
    /// throttling (429) and server-side (5xx) statuses.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
