//! Session trait for issuing JSON GET requests.
//!
//! [`HttpSession`] is the seam between the pagination loop and the transport:
//! the real implementation lives in `prices-eia` (reqwest plus a response
//! cache), while tests drive the loop with scripted fakes.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::time::Duration;

use crate::error::Result;

/// Ordered query parameters. Keys may repeat (EIA facets such as
/// `facets[stateid][]` are sent once per value).
pub type QueryParams = Vec<(String, String)>;

/// A session able to perform a single GET and decode its JSON body.
#[async_trait]
pub trait HttpSession: Send + Sync + Debug {
    /// Issues one GET request.
    ///
    /// Implementations return [`DataError::HttpStatus`](crate::DataError::HttpStatus)
    /// for non-success statuses and
    /// [`DataError::Parse`](crate::DataError::Parse) when the body is not JSON.
    /// They do not retry; see `prices_eia::get_json` for the retrying wrapper.
    async fn get(&self, url: &str, params: &[(String, String)], timeout: Duration)
    -> Result<Value>;
}
