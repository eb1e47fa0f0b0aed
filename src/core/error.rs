//! Error taxonomy for rate lookups and conversions.

use thiserror::Error;

/// How a caller should surface a [`RateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input: bad code, amount, page, or a blacklisted currency.
    InvalidInput,
    /// The requested provider is not registered.
    UnknownProvider,
    /// Upstream failed or its circuit is open.
    ServiceUnavailable,
    /// The caller gave up.
    Canceled,
    /// Programming or configuration error.
    Internal,
}

#[derive(Debug, Error)]
pub enum RateError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    OutOfRange(String),

    #[error("Unknown exchange rate provider: '{0}'")]
    ProviderNotFound(String),

    #[error("Upstream error from {provider}: {message}")]
    Upstream {
        provider: String,
        message: String,
        /// Network errors, timeouts and 5xx responses. Only these are retried.
        transient: bool,
    },

    #[error("Circuit open for provider {provider}")]
    CircuitOpen { provider: String },

    #[error("Operation was canceled")]
    Canceled,

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl RateError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(provider: &str, message: impl Into<String>, transient: bool) -> Self {
        Self::Upstream {
            provider: provider.to_string(),
            message: message.into(),
            transient,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::OutOfRange(_) => ErrorKind::InvalidInput,
            Self::ProviderNotFound(_) => ErrorKind::UnknownProvider,
            Self::Upstream { .. } | Self::CircuitOpen { .. } => ErrorKind::ServiceUnavailable,
            Self::Canceled => ErrorKind::Canceled,
            Self::MissingArgument(_) | Self::Configuration(_) => ErrorKind::Internal,
        }
    }

    /// True when the retry loop may try the same call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream { transient: true, .. })
    }
}

pub type RateResult<T> = Result<T, RateError>;
