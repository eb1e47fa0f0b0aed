use crate::core::error::{RateError, RateResult};
use crate::providers::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry budget and backoff shape for transient upstream failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Retry `n` waits `2^n * base_delay` plus jitter.
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random jitter added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Backoff without jitter before retry number `retry` (1-based).
    pub fn base_delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.min(16))
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.base_delay_for(retry) + jitter
    }
}

/// HTTP client for one named provider.
///
/// Every request goes through the retry loop, and every attempt through the
/// provider's circuit breaker. The breaker is owned here, so all calls made
/// with this client share it.
pub struct ResilientClient {
    provider: String,
    base_url: String,
    http: reqwest::Client,
    policy: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientClient {
    pub fn new(
        provider: &str,
        base_url: &str,
        policy: RetryPolicy,
        breaker: CircuitBreakerConfig,
        timeout: Duration,
    ) -> RateResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("xrates/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RateError::Configuration(format!("HTTP client for {provider}: {e}"))
            })?;

        Ok(Self {
            provider: provider.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            policy,
            breaker: CircuitBreaker::with_config(provider, breaker),
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// GETs `{base_url}{path}` and returns the body of a 2xx response.
    pub async fn get_text(&self, path: &str, cancel: &CancellationToken) -> RateResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut retry = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RateError::Canceled);
            }

            self.breaker.try_acquire()?;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.breaker.release_probe();
                    return Err(RateError::Canceled);
                }
                result = self.attempt(&url) => result,
            };

            match result {
                Ok(body) => {
                    self.breaker.record_success();
                    return Ok(body);
                }
                Err(err) if err.is_transient() => {
                    self.breaker.record_failure();
                    if retry >= self.policy.max_retries {
                        warn!(
                            provider = %self.provider,
                            attempts = retry + 1,
                            error = %err,
                            "Retries exhausted"
                        );
                        return Err(err);
                    }

                    retry += 1;
                    let delay = self.policy.delay_for(retry);
                    debug!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}...",
                        retry,
                        self.policy.max_retries + 1,
                        err,
                        delay
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RateError::Canceled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => {
                    // The upstream answered; only transient failures count against it.
                    self.breaker.record_success();
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> RateResult<String> {
        debug!("Requesting {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::upstream(
                &self.provider,
                format!("HTTP error: {status} for {url}"),
                is_transient_status(status),
            ));
        }

        response.text().await.map_err(|e| self.request_error(e))
    }

    fn request_error(&self, err: reqwest::Error) -> RateError {
        let transient = err.is_timeout() || err.is_connect() || err.is_request() || err.is_body();
        RateError::upstream(&self.provider, format!("Request error: {err}"), transient)
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::circuit_breaker::CircuitState;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
        }
    }

    fn client(server: &MockServer, breaker: CircuitBreakerConfig) -> ResilientClient {
        ResilientClient::new(
            "frankfurter",
            &server.uri(),
            fast_policy(),
            breaker,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_backoff_doubles_per_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.base_delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.base_delay_for(3), Duration::from_secs(8));

        for retry in 1..=3 {
            let delay = policy.delay_for(retry);
            assert!(delay >= policy.base_delay_for(retry));
            assert!(delay < policy.base_delay_for(retry) + Duration::from_millis(100));
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::REQUEST_TIMEOUT));
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_two_failures_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/latest"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, CircuitBreakerConfig::default());
        let body = client
            .get_text("/v1/latest?base=EUR", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(body, "ok");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
        assert_eq!(client.breaker().state(), CircuitState::Closed);
        assert_eq!(client.breaker().failure_count(), Some(0));
    }

    #[tokio::test]
    async fn test_circuit_opens_and_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let client = client(
            &server,
            CircuitBreakerConfig {
                failure_threshold: 5,
                break_duration: Duration::from_secs(60),
            },
        );
        let cancel = CancellationToken::new();

        // Initial attempt plus three retries, all failing.
        let first = client.get_text("/v1/latest", &cancel).await.unwrap_err();
        assert!(matches!(first, RateError::Upstream { transient: true, .. }));
        assert_eq!(client.breaker().failure_count(), Some(4));

        // Fifth failure opens the circuit; the retry is refused without a request.
        let second = client.get_text("/v1/latest", &cancel).await.unwrap_err();
        assert!(matches!(second, RateError::CircuitOpen { .. }));
        assert_eq!(client.breaker().state(), CircuitState::Open);

        let third = client.get_text("/v1/latest", &cancel).await.unwrap_err();
        assert!(matches!(third, RateError::CircuitOpen { .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_trial_call_closes_circuit_after_break() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("back"))
            .mount(&server)
            .await;

        let client = ResilientClient::new(
            "frankfurter",
            &server.uri(),
            RetryPolicy {
                max_retries: 0,
                ..fast_policy()
            },
            CircuitBreakerConfig {
                failure_threshold: 1,
                break_duration: Duration::from_millis(50),
            },
            Duration::from_secs(5),
        )
        .unwrap();
        let cancel = CancellationToken::new();

        assert!(client.get_text("/v1/latest", &cancel).await.is_err());
        assert!(matches!(
            client.get_text("/v1/latest", &cancel).await,
            Err(RateError::CircuitOpen { .. })
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(client.get_text("/v1/latest", &cancel).await.unwrap(), "back");
        assert_eq!(client.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, CircuitBreakerConfig::default());
        let err = client
            .get_text("/v1/latest", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RateError::Upstream { transient: false, .. }));
        assert!(err.to_string().contains("404"));
        assert_eq!(client.breaker().failure_count(), Some(0));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let client = client(&server, CircuitBreakerConfig::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = client.get_text("/v1/latest", &cancel).await;

        assert!(matches!(result, Err(RateError::Canceled)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(client.breaker().failure_count(), Some(0));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = ResilientClient::new(
            "frankfurter",
            &server.uri(),
            RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_secs(30),
                max_jitter: Duration::ZERO,
            },
            CircuitBreakerConfig::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = client.get_text("/v1/latest", &cancel).await;
        assert!(matches!(result, Err(RateError::Canceled)));
    }
}
