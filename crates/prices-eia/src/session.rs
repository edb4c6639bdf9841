//! Cached HTTP session.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prices_cache::{NoopCache, SqliteCache};
use prices_core::{CachedResponse, DataError, HttpCache, HttpSession, Result};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, warn};

/// Default cache file stem, created relative to the caller's directory.
pub const DEFAULT_CACHE_NAME: &str = "http_cache";

/// Default lifetime of a cached response.
pub const DEFAULT_EXPIRE_AFTER: Duration = Duration::from_secs(24 * 3600);

/// Query parameters left out of the cache key so credentials never reach the
/// cache file.
const IGNORED_PARAMS: &[&str] = &["api_key", "access_token", "Authorization", "X-API-KEY"];

/// HTTP session backed by a response cache.
///
/// The session only issues GET requests, so only GET responses are ever
/// cached. Fresh cache entries are served without touching the network. When a
/// request fails transiently and an expired entry exists, the expired entry is
/// served instead (stale-if-error).
#[derive(Clone)]
pub struct CachedSession {
    client: Client,
    cache: Arc<dyn HttpCache>,
    expire_after: Duration,
    stale_if_error: bool,
}

impl fmt::Debug for CachedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSession")
            .field("expire_after", &self.expire_after)
            .field("stale_if_error", &self.stale_if_error)
            .finish_non_exhaustive()
    }
}

impl CachedSession {
    /// Create a session over the given cache.
    #[must_use]
    pub fn new(cache: Arc<dyn HttpCache>, expire_after: Duration) -> Self {
        Self::with_client(Client::new(), cache, expire_after)
    }

    /// Create a session with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, cache: Arc<dyn HttpCache>, expire_after: Duration) -> Self {
        Self {
            client,
            cache,
            expire_after,
            stale_if_error: true,
        }
    }

    /// Create a session that never caches.
    #[must_use]
    pub fn uncached() -> Self {
        Self::new(Arc::new(NoopCache::new()), Duration::ZERO)
    }

    /// Enable or disable serving expired entries when the network fails.
    #[must_use]
    pub const fn with_stale_if_error(mut self, enabled: bool) -> Self {
        self.stale_if_error = enabled;
        self
    }

    /// Returns the lifetime of cached responses.
    #[must_use]
    pub const fn expire_after(&self) -> Duration {
        self.expire_after
    }

    /// Returns the underlying cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn HttpCache> {
        &self.cache
    }

    /// Send one GET and return the body of a successful response.
    async fn send(&self, url: &str, params: &[(String, String)], timeout: Duration) -> Result<String> {
        debug!(url, "EIA request");

        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(classify)
    }
}

#[async_trait]
impl HttpSession for CachedSession {
    async fn get(&self, url: &str, params: &[(String, String)], timeout: Duration) -> Result<Value> {
        let key = request_signature(&Method::GET, url, params);

        let cached = match self.cache.get(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Cache lookup failed, fetching from network");
                None
            }
        };

        if let Some(entry) = &cached {
            if !entry.is_expired(self.expire_after) {
                debug!(url, "Serving cached response");
                return parse_body(&entry.body);
            }
        }

        match self.send(url, params, timeout).await {
            Ok(body) => {
                let value = parse_body(&body)?;
                let entry = CachedResponse::new(url, 200, body);
                if let Err(e) = self.cache.put(&key, &entry).await {
                    warn!(error = %e, "Failed to cache response");
                }
                Ok(value)
            }
            Err(e) if e.is_transient() && self.stale_if_error => match cached {
                Some(entry) => {
                    warn!(url, error = %e, "Request failed, serving stale cached response");
                    parse_body(&entry.body)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

/// Creates a session backed by a SQLite cache file.
///
/// # Errors
/// Returns [`DataError::Cache`] if the cache file cannot be opened.
pub fn make_cached_session(
    cache_path: impl AsRef<Path>,
    expire_after: Duration,
) -> Result<CachedSession> {
    let cache = SqliteCache::new(cache_path.as_ref())?;
    debug!(path = %cache_path.as_ref().display(), ?expire_after, "Opened response cache");
    Ok(CachedSession::new(Arc::new(cache), expire_after))
}

/// Builds the cache key of a request: method, URL, and query parameters
/// sorted by key then value, with credentials left out.
#[must_use]
pub fn request_signature(method: &Method, url: &str, params: &[(String, String)]) -> String {
    let mut kept: Vec<&(String, String)> = params
        .iter()
        .filter(|(k, _)| !IGNORED_PARAMS.contains(&k.as_str()))
        .collect();
    kept.sort();

    let query = kept
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        format!("{method} {url}")
    } else {
        format!("{method} {url}?{query}")
    }
}

fn parse_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| DataError::Parse(e.to_string()))
}

/// Maps a transport error, dropping the URL so the API key stays out of logs.
fn classify(e: reqwest::Error) -> DataError {
    let e = e.without_url();
    if e.is_timeout() {
        DataError::Timeout(e.to_string())
    } else if e.is_decode() {
        DataError::Parse(e.to_string())
    } else {
        DataError::Network(e.to_string())
    }
}
