pub mod caching;
pub mod circuit_breaker;
pub mod frankfurter;
pub mod resilience;
pub mod resolver;

use crate::core::config::AppConfig;
use crate::core::error::RateResult;
use crate::core::provider::ExchangeRateProvider;
use caching::CachingProvider;
use frankfurter::FrankfurterProvider;
use resilience::ResilientClient;
use std::sync::Arc;
use tracing::debug;

/// One cached, resilient provider per configured name. Each gets its own
/// HTTP client, circuit breaker and caches.
pub fn build_providers(config: &AppConfig) -> RateResult<Vec<Arc<dyn ExchangeRateProvider>>> {
    let resilience = &config.resilience;

    config
        .providers
        .iter()
        .map(|(name, provider)| -> RateResult<Arc<dyn ExchangeRateProvider>> {
            debug!("Registering provider {} at {}", name, provider.base_url);
            let client = ResilientClient::new(
                name,
                &provider.base_url,
                resilience.retry_policy(),
                resilience.breaker_config(),
                resilience.request_timeout(),
            )?;
            let cached = CachingProvider::with_ttls(
                FrankfurterProvider::new(client),
                config.cache.latest_ttl(),
                config.cache.historical_ttl(),
            );
            Ok(Arc::new(cached))
        })
        .collect()
}
