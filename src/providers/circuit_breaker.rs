//! Circuit breaker guarding one named provider.
//!
//! - **Closed**: calls go through; consecutive failures are counted.
//! - **Open**: calls fail fast until the break duration has elapsed.
//! - **HalfOpen**: exactly one trial call is let through. Its success closes
//!   the circuit, its failure opens it again.
//!
//! State lives in memory and is shared by every call to the provider.

use crate::core::error::{RateError, RateResult};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_BREAK_DURATION: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

#[derive(Debug)]
enum Circuit {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen { probe_in_flight: bool },
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call.
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            break_duration: DEFAULT_BREAK_DURATION,
        }
    }
}

pub struct CircuitBreaker {
    provider: String,
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(provider: &str) -> Self {
        Self::with_config(provider, CircuitBreakerConfig::default())
    }

    pub fn with_config(provider: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            provider: provider.to_string(),
            circuit: Mutex::new(Circuit::Closed { failures: 0 }),
            config,
        }
    }

    fn lock_circuit(&self) -> MutexGuard<'_, Circuit> {
        // A poisoned breaker is still a usable breaker.
        self.circuit.lock().unwrap_or_else(|poisoned| {
            warn!(provider = %self.provider, "Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Admits a call or fails fast with [`RateError::CircuitOpen`].
    ///
    /// An open circuit whose break has elapsed moves to HalfOpen and admits
    /// the caller as its single trial call.
    pub fn try_acquire(&self) -> RateResult<()> {
        let mut circuit = self.lock_circuit();

        match *circuit {
            Circuit::Closed { .. } => Ok(()),
            Circuit::Open { until } if Instant::now() >= until => {
                info!(provider = %self.provider, "Circuit breaker: Open -> HalfOpen, admitting trial call");
                *circuit = Circuit::HalfOpen {
                    probe_in_flight: true,
                };
                Ok(())
            }
            Circuit::HalfOpen {
                probe_in_flight: false,
            } => {
                *circuit = Circuit::HalfOpen {
                    probe_in_flight: true,
                };
                Ok(())
            }
            Circuit::Open { .. } | Circuit::HalfOpen { .. } => Err(RateError::CircuitOpen {
                provider: self.provider.clone(),
            }),
        }
    }

    pub fn record_success(&self) {
        let mut circuit = self.lock_circuit();

        match *circuit {
            Circuit::Closed { failures } if failures > 0 => {
                debug!(provider = %self.provider, "Circuit breaker: success, failure count reset");
                *circuit = Circuit::Closed { failures: 0 };
            }
            Circuit::HalfOpen { .. } => {
                info!(provider = %self.provider, "Circuit breaker: trial call succeeded, closing");
                *circuit = Circuit::Closed { failures: 0 };
            }
            _ => {}
        }
    }

    pub fn record_failure(&self) {
        let mut circuit = self.lock_circuit();

        match *circuit {
            Circuit::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.config.failure_threshold {
                    warn!(
                        provider = %self.provider,
                        failures,
                        break_secs = self.config.break_duration.as_secs_f64(),
                        "Circuit breaker: opening"
                    );
                    *circuit = Circuit::Open {
                        until: Instant::now() + self.config.break_duration,
                    };
                } else {
                    debug!(
                        provider = %self.provider,
                        "Circuit breaker: failure {}/{}",
                        failures,
                        self.config.failure_threshold
                    );
                    *circuit = Circuit::Closed { failures };
                }
            }
            Circuit::HalfOpen { .. } => {
                warn!(provider = %self.provider, "Circuit breaker: trial call failed, reopening");
                *circuit = Circuit::Open {
                    until: Instant::now() + self.config.break_duration,
                };
            }
            Circuit::Open { .. } => {}
        }
    }

    /// Gives back a trial slot whose call ended without an outcome, e.g. on
    /// cancellation, so the next caller may probe instead.
    pub fn release_probe(&self) {
        let mut circuit = self.lock_circuit();
        if let Circuit::HalfOpen {
            probe_in_flight: true,
        } = *circuit
        {
            *circuit = Circuit::HalfOpen {
                probe_in_flight: false,
            };
        }
    }

    /// Current state. An open circuit past its break still reports Open until
    /// the next call moves it.
    pub fn state(&self) -> CircuitState {
        match *self.lock_circuit() {
            Circuit::Closed { .. } => CircuitState::Closed,
            Circuit::Open { .. } => CircuitState::Open,
            Circuit::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Consecutive failures counted while closed; `None` while open or half-open.
    pub fn failure_count(&self) -> Option<u32> {
        match *self.lock_circuit() {
            Circuit::Closed { failures } => Some(failures),
            Circuit::Open { .. } | Circuit::HalfOpen { .. } => None,
        }
    }
}
