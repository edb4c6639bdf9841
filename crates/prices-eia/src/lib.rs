#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/dc-prices/dc-prices/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! EIA v2 API client.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prices_core::load_settings;
//! use prices_eia::{CachedSession, fetch_eia_v2_all_pages, route_url};
//!
//! #[tokio::main]
//! async fn main() -> prices_core::Result<()> {
//!     let settings = load_settings(true)?;
//!     let session = CachedSession::uncached();
//!
//!     let params = vec![
//!         ("frequency".to_string(), "monthly".to_string()),
//!         ("data[]".to_string(), "price".to_string()),
//!     ];
//!     let result = fetch_eia_v2_all_pages(
//!         &session,
//!         &route_url("electricity/retail-sales/data"),
//!         &params,
//!         &settings.eia_api_key,
//!         settings.eia_page_size,
//!         settings.eia_timeout,
//!     )
//!     .await?;
//!
//!     println!("{} of {} rows", result.rows(), result.total);
//!     Ok(())
//! }
//! ```

mod frame;
mod pagination;
mod retry;
mod session;

pub use frame::records_to_frame;
pub use pagination::{fetch_eia_v2_all_pages, set_param};
pub use retry::{RetryPolicy, get_json, get_json_with_policy};
pub use session::{
    CachedSession, DEFAULT_CACHE_NAME, DEFAULT_EXPIRE_AFTER, make_cached_session,
    request_signature,
};

/// Base URL of the EIA API v2.
pub const EIA_V2_BASE_URL: &str = "https://api.eia.gov/v2";

/// Joins a route such as `electricity/retail-sales/data` onto [`EIA_V2_BASE_URL`].
#[must_use]
pub fn route_url(route: &str) -> String {
    format!("{}/{}", EIA_V2_BASE_URL, route.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_url() {
        assert_eq!(
            route_url("electricity/retail-sales/data"),
            "https://api.eia.gov/v2/electricity/retail-sales/data"
        );
        assert_eq!(
            route_url("/electricity/rto/region-data/data/"),
            "https://api.eia.gov/v2/electricity/rto/region-data/data"
        );
    }
}
