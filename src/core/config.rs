use crate::core::cache::{HISTORICAL_TTL, LATEST_TTL};
use crate::core::currency::Blacklist;
use crate::core::error::RateResult;
use crate::providers::circuit_breaker::CircuitBreakerConfig;
use crate::providers::frankfurter::DEFAULT_BASE_URL;
use crate::providers::resilience::RetryPolicy;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_PROVIDER: &str = "frankfurter";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub latest_ttl_secs: u64,
    pub historical_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            latest_ttl_secs: LATEST_TTL.as_secs(),
            historical_ttl_secs: HISTORICAL_TTL.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn latest_ttl(&self) -> Duration {
        Duration::from_secs(self.latest_ttl_secs)
    }

    pub fn historical_ttl(&self) -> Duration {
        Duration::from_secs(self.historical_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ResilienceConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub failure_threshold: u32,
    pub break_duration_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        ResilienceConfig {
            max_retries: 3,
            base_delay_ms: 1000,
            max_jitter_ms: 100,
            failure_threshold: 5,
            break_duration_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

impl ResilienceConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold.max(1),
            break_duration: Duration::from_secs(self.break_duration_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub providers: BTreeMap<String, ProviderConfig>,
    pub blacklisted_currencies: Vec<String>,
    pub cache: CacheConfig,
    pub resilience: ResilienceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: BTreeMap::from([(
                DEFAULT_PROVIDER.to_string(),
                ProviderConfig {
                    base_url: DEFAULT_BASE_URL.to_string(),
                    is_default: true,
                },
            )]),
            blacklisted_currencies: Vec::new(),
            cache: CacheConfig::default(),
            resilience: ResilienceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or the built-in defaults
    /// when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "xrates", "xrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn blacklist(&self) -> RateResult<Blacklist> {
        Blacklist::from_codes(&self.blacklisted_currencies)
    }
}
