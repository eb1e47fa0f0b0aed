//! Currency codes and the conversion blacklist.

use crate::core::error::{RateError, RateResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

/// A validated, upper-cased three letter currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Trims `code`, requires exactly three ASCII letters and upper-cases them.
    pub fn new(code: &str) -> RateResult<Self> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(RateError::validation("Currency code is required."));
        }

        if trimmed.len() != 3 || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(RateError::validation(format!(
                "Invalid currency code: '{}'",
                trimmed.to_uppercase()
            )));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = RateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Currencies that may be neither source nor target of a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist(HashSet<Currency>);

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a blacklist from configured codes, failing on the first invalid one.
    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> RateResult<Self> {
        codes
            .iter()
            .map(|code| Currency::new(code.as_ref()))
            .collect::<RateResult<HashSet<_>>>()
            .map(Self)
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.0.contains(currency)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Currency> for Blacklist {
    fn from_iter<T: IntoIterator<Item = Currency>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
