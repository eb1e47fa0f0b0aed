//! Cache abstraction and the read-through helper used by providers.

use crate::core::currency::Currency;
use crate::core::error::{RateError, RateResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default lifetime of a latest-rates entry.
pub const LATEST_TTL: Duration = Duration::from_secs(5 * 60);

/// Default lifetime of a historical-range entry.
pub const HISTORICAL_TTL: Duration = Duration::from_secs(60 * 60);

#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Returns a live entry. Expired entries read as absent.
    async fn get(&self, key: &K) -> Option<V>;
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
}

/// Returns the live value under `key`, or runs `fetch` and stores its result
/// for `ttl`. Failed fetches are not cached. Concurrent misses on the same key
/// may each run `fetch`; the last successful write wins.
pub async fn get_or_fetch<C, K, V, F, Fut>(
    cache: &C,
    key: K,
    ttl: Duration,
    cancel: &CancellationToken,
    fetch: F,
) -> RateResult<V>
where
    C: Cache<K, V> + ?Sized,
    K: Eq + Hash + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = RateResult<V>> + Send,
{
    if cancel.is_cancelled() {
        return Err(RateError::Canceled);
    }

    if let Some(hit) = cache.get(&key).await {
        return Ok(hit);
    }

    debug!(?key, "Fetching value for cache miss");
    let value = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RateError::Canceled),
        result = fetch() => result?,
    };

    cache.put(key, value.clone(), Some(ttl)).await;
    Ok(value)
}

pub fn latest_key(base: &Currency) -> String {
    format!("latest:{}", base.code())
}

pub fn historical_key(base: &Currency, from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "historical:{}:{}:{}",
        base.code(),
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    )
}
