use crate::core::config::ProviderConfig;
use crate::core::error::{RateError, RateResult};
use crate::core::provider::ExchangeRateProvider;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Maps provider names to providers, with one configured default.
///
/// Names are matched case-insensitively. The registry is immutable after
/// construction.
pub struct ProviderResolver {
    providers: HashMap<String, Arc<dyn ExchangeRateProvider>>,
    default_name: String,
}

impl std::fmt::Debug for ProviderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.providers.keys().collect();
        names.sort();
        f.debug_struct("ProviderResolver")
            .field("providers", &names)
            .field("default_name", &self.default_name)
            .finish()
    }
}

impl ProviderResolver {
    /// Fails unless exactly one configured provider is the default and that
    /// provider is registered.
    pub fn new(
        providers: Vec<Arc<dyn ExchangeRateProvider>>,
        config: &BTreeMap<String, ProviderConfig>,
    ) -> RateResult<Self> {
        let mut registry = HashMap::with_capacity(providers.len());
        for provider in providers {
            let key = provider.name().to_lowercase();
            if registry.insert(key, Arc::clone(&provider)).is_some() {
                return Err(RateError::Configuration(format!(
                    "Provider '{}' is registered more than once",
                    provider.name()
                )));
            }
        }

        let defaults: Vec<&String> = config
            .iter()
            .filter(|(_, provider)| provider.is_default)
            .map(|(name, _)| name)
            .collect();

        let default_name = match defaults.as_slice() {
            [name] => name.to_lowercase(),
            [] => {
                return Err(RateError::Configuration(
                    "No default exchange rate provider is configured".to_string(),
                ));
            }
            many => {
                let names: Vec<&str> = many.iter().map(|name| name.as_str()).collect();
                return Err(RateError::Configuration(format!(
                    "Only one default exchange rate provider is allowed, found: {}",
                    names.join(", ")
                )));
            }
        };

        if !registry.contains_key(&default_name) {
            return Err(RateError::Configuration(format!(
                "Default provider '{default_name}' is not registered"
            )));
        }

        debug!(
            providers = registry.len(),
            default = %default_name,
            "Provider resolver ready"
        );
        Ok(Self {
            providers: registry,
            default_name,
        })
    }

    /// Resolves `name`, falling back to the default when it is absent or blank.
    pub fn get(&self, name: Option<&str>) -> RateResult<Arc<dyn ExchangeRateProvider>> {
        let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
            return Ok(self.default_provider());
        };

        self.providers
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| RateError::ProviderNotFound(name.to_string()))
    }

    pub fn default_provider(&self) -> Arc<dyn ExchangeRateProvider> {
        // Presence of the default is checked in `new`.
        Arc::clone(&self.providers[&self.default_name])
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use crate::core::rates::ExchangeRateSnapshot;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio_util::sync::CancellationToken;

    struct NamedProvider(&'static str);

    #[async_trait]
    impl ExchangeRateProvider for NamedProvider {
        fn name(&self) -> &str {
            self.0
        }

        async fn get_latest(
            &self,
            _base: &Currency,
            _cancel: &CancellationToken,
        ) -> RateResult<ExchangeRateSnapshot> {
            Err(RateError::upstream(self.0, "not used", false))
        }

        async fn get_historical(
            &self,
            _base: &Currency,
            _from: NaiveDate,
            _to: NaiveDate,
            _cancel: &CancellationToken,
        ) -> RateResult<Vec<ExchangeRateSnapshot>> {
            Ok(Vec::new())
        }
    }

    fn config(entries: &[(&str, bool)]) -> BTreeMap<String, ProviderConfig> {
        entries
            .iter()
            .map(|(name, is_default)| {
                (
                    name.to_string(),
                    ProviderConfig {
                        base_url: format!("http://{name}.test"),
                        is_default: *is_default,
                    },
                )
            })
            .collect()
    }

    fn providers(names: &[&'static str]) -> Vec<Arc<dyn ExchangeRateProvider>> {
        names
            .iter()
            .map(|name| Arc::new(NamedProvider(name)) as Arc<dyn ExchangeRateProvider>)
            .collect()
    }

    fn resolver() -> ProviderResolver {
        ProviderResolver::new(
            providers(&["Frankfurter", "mirror"]),
            &config(&[("frankfurter", true), ("mirror", false)]),
        )
        .unwrap()
    }

    #[test]
    fn test_absent_or_blank_name_resolves_default() {
        let resolver = resolver();
        assert_eq!(resolver.get(None).unwrap().name(), "Frankfurter");
        assert_eq!(resolver.get(Some("")).unwrap().name(), "Frankfurter");
        assert_eq!(resolver.get(Some("   ")).unwrap().name(), "Frankfurter");
        assert_eq!(resolver.default_name(), "frankfurter");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let resolver = resolver();
        assert_eq!(resolver.get(Some("MIRROR")).unwrap().name(), "mirror");
        assert_eq!(resolver.get(Some("frankfurter")).unwrap().name(), "Frankfurter");
        assert_eq!(resolver.names(), vec!["frankfurter", "mirror"]);
    }

    #[test]
    fn test_unknown_provider_is_not_found() {
        let Err(err) = resolver().get(Some("unknown-xyz")) else {
            panic!("unknown provider name resolved");
        };
        assert!(matches!(&err, RateError::ProviderNotFound(name) if name == "unknown-xyz"));
        assert!(err.to_string().contains("unknown-xyz"));
    }

    #[test]
    fn test_missing_default_fails_construction() {
        let result = ProviderResolver::new(
            providers(&["frankfurter"]),
            &config(&[("frankfurter", false)]),
        );
        assert!(matches!(result, Err(RateError::Configuration(_))));
    }

    #[test]
    fn test_multiple_defaults_fail_construction() {
        let result = ProviderResolver::new(
            providers(&["frankfurter", "mirror"]),
            &config(&[("frankfurter", true), ("mirror", true)]),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("frankfurter, mirror"));
    }

    #[test]
    fn test_unregistered_default_fails_construction() {
        let result = ProviderResolver::new(
            providers(&["mirror"]),
            &config(&[("frankfurter", true), ("mirror", false)]),
        );
        assert!(matches!(result, Err(RateError::Configuration(msg)) if msg.contains("frankfurter")));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = ProviderResolver::new(
            providers(&["mirror", "MIRROR"]),
            &config(&[("mirror", true)]),
        );
        assert!(result.is_err());
    }
}
