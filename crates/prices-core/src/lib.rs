#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/dc-prices/dc-prices/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the electricity price pipeline.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`ProjectPaths`](config::ProjectPaths) and [`Settings`](config::Settings) - Workspace layout and API settings
//! - [`HttpSession`](session::HttpSession) - One JSON GET request
//! - [`HttpCache`](cache::HttpCache) - Response caching abstraction
//! - [`DataError`](error::DataError) - Error taxonomy shared by every crate

/// Cache trait for storing fetched responses.
pub mod cache;
/// Repository paths and runtime settings.
pub mod config;
/// Error types for pipeline operations.
pub mod error;
/// Session trait for JSON GET requests.
pub mod session;
/// Core value types (EiaResult, QaSummary, ColumnProfile, ...).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::HttpCache;
pub use config::{
    DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT, EIA_API_KEY_VAR, ProjectPaths, REPO_MARKERS, Settings,
    find_repo_root, find_repo_root_with_markers, get_paths, load_settings,
};
pub use error::{DataError, Result};
pub use session::{HttpSession, QueryParams};
pub use types::{CachedResponse, ColumnProfile, EiaResult, QaSummary};
