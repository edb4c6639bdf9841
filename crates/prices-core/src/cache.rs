//! Cache trait for storing fetched HTTP responses.
//!
//! This module defines the [`HttpCache`] trait, a keyed store of response
//! bodies. Keys are request signatures built by the session; the cache itself
//! knows nothing about HTTP.

use async_trait::async_trait;
use std::time::Duration;

use crate::{error::Result, types::CachedResponse};

/// Trait for caching GET responses by request signature.
///
/// Implementations can store data in various backends (SQLite, in-memory, etc.)
/// to avoid repeated API calls across runs. Entries are returned regardless of
/// age; freshness is decided by the caller so that expired entries remain
/// available as a fallback when the network fails.
#[async_trait]
pub trait HttpCache: Send + Sync {
    /// Retrieves the response stored under `key`.
    ///
    /// Returns `Ok(Some(response))` if an entry exists, `Ok(None)` if not.
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>>;

    /// Stores a response under `key`, replacing any previous entry.
    async fn put(&self, key: &str, response: &CachedResponse) -> Result<()>;

    /// Removes entries older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all cached responses.
    async fn clear(&self) -> Result<()>;
}
