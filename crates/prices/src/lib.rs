#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/dc-prices/dc-prices/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Electricity price ETL and data-quality toolkit.
//!
//! This crate re-exports the workspace crates and provides an
//! [`EiaPipeline`] that ties paths, settings, and the HTTP session together.
//!
//! # Example
//!
//! ```rust,ignore
//! use prices::{EiaPipeline, DEFAULT_PROFILE_SAMPLE};
//!
//! #[tokio::main]
//! async fn main() -> prices::Result<()> {
//!     let pipeline = EiaPipeline::from_env(None)?;
//!
//!     let params = vec![("frequency".to_string(), "monthly".to_string())];
//!     let result = pipeline.fetch("electricity/retail-sales/data", &params).await?;
//!
//!     let summary = pipeline.qa_report(&result.frame, "retail_sales")?;
//!     println!("{summary:?}");
//!
//!     pipeline.profile(&result.frame, "retail_sales", Some(DEFAULT_PROFILE_SAMPLE))?;
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use prices_core::*;

// Cache implementations
pub use prices_cache::{InMemoryCache, NoopCache, SqliteCache};

// EIA client
pub use prices_eia::{
    CachedSession, DEFAULT_CACHE_NAME, DEFAULT_EXPIRE_AFTER, EIA_V2_BASE_URL, RetryPolicy,
    fetch_eia_v2_all_pages, get_json, make_cached_session, route_url,
};

// QA
pub use prices_qa::{
    DEFAULT_PROFILE_SAMPLE, PROFILE_SEED, assert_required_columns, check_state_codes,
    column_profile_frame, load_fractracker_csv, qa_column_profile, qa_overview, snake_case,
    write_profile_report,
};

mod pipeline;
pub use pipeline::{
    EiaPipeline, cache_path, clear_cache, profile_report, prune_cache, qa_report, read_table,
    write_parquet,
};
