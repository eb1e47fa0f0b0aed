//! Domain values, contracts and ambient configuration

pub mod cache;
pub mod calendar;
pub mod config;
pub mod conversion;
pub mod currency;
pub mod error;
pub mod log;
pub mod paging;
pub mod provider;
pub mod rates;

pub use currency::{Blacklist, Currency};
pub use error::{ErrorKind, RateError, RateResult};
pub use provider::ExchangeRateProvider;
pub use rates::ExchangeRateSnapshot;
