use crate::core::cache::{self, Cache, HISTORICAL_TTL, LATEST_TTL};
use crate::core::currency::Currency;
use crate::core::error::RateResult;
use crate::core::provider::ExchangeRateProvider;
use crate::core::rates::ExchangeRateSnapshot;
use crate::store::memory::MemoryCache;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Read-through cache in front of a provider. Cache hits never reach the
/// inner provider, so they bypass its retry and circuit breaker as well.
pub struct CachingProvider<P: ExchangeRateProvider> {
    inner: P,
    latest: MemoryCache<String, ExchangeRateSnapshot>,
    historical: MemoryCache<String, Vec<ExchangeRateSnapshot>>,
    latest_ttl: Duration,
    historical_ttl: Duration,
}

impl<P: ExchangeRateProvider> CachingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttls(inner, LATEST_TTL, HISTORICAL_TTL)
    }

    pub fn with_ttls(inner: P, latest_ttl: Duration, historical_ttl: Duration) -> Self {
        Self {
            inner,
            latest: MemoryCache::new(),
            historical: MemoryCache::new(),
            latest_ttl,
            historical_ttl,
        }
    }
}

#[async_trait]
impl<P: ExchangeRateProvider> ExchangeRateProvider for CachingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_latest(
        &self,
        base: &Currency,
        cancel: &CancellationToken,
    ) -> RateResult<ExchangeRateSnapshot> {
        cache::get_or_fetch(
            &self.latest,
            cache::latest_key(base),
            self.latest_ttl,
            cancel,
            || self.inner.get_latest(base, cancel),
        )
        .await
    }

    async fn get_historical(
        &self,
        base: &Currency,
        from: NaiveDate,
        to: NaiveDate,
        cancel: &CancellationToken,
    ) -> RateResult<Vec<ExchangeRateSnapshot>> {
        cache::get_or_fetch(
            &self.historical,
            cache::historical_key(base, from, to),
            self.historical_ttl,
            cancel,
            || self.inner.get_historical(base, from, to, cancel),
        )
        .await
    }
}
