#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/dc-prices/dc-prices/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Data-quality tooling.
//!
//! - [`load_fractracker_csv`] and [`snake_case`] - CSV loading with normalized headers
//! - [`qa_overview`] and [`qa_column_profile`] - Table and per-column summaries
//! - [`assert_required_columns`] and [`check_state_codes`] - Validation helpers
//! - [`write_profile_report`] - HTML profiling report

/// Data-quality checks.
pub mod checks;
/// CSV loading with header normalization.
pub mod csv;
/// HTML profiling report.
pub mod report;

pub use checks::{
    assert_required_columns, check_state_codes, column_profile_frame, qa_column_profile,
    qa_overview,
};
pub use csv::{load_fractracker_csv, snake_case};
pub use report::{DEFAULT_PROFILE_SAMPLE, PROFILE_SEED, write_profile_report};
