//! Exchange rate snapshots.

use crate::core::currency::Currency;
use crate::core::error::{RateError, RateResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rates for one base currency as of one date. `1 base = rate target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRateSnapshot {
    base_currency: Currency,
    date: NaiveDate,
    rates: BTreeMap<Currency, Decimal>,
}

impl ExchangeRateSnapshot {
    /// Fails when `rates` is empty.
    pub fn new(
        base_currency: Currency,
        date: NaiveDate,
        rates: BTreeMap<Currency, Decimal>,
    ) -> RateResult<Self> {
        if rates.is_empty() {
            return Err(RateError::validation("Rates must not be empty"));
        }

        Ok(Self {
            base_currency,
            date,
            rates,
        })
    }

    pub fn base_currency(&self) -> &Currency {
        &self.base_currency
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn rates(&self) -> &BTreeMap<Currency, Decimal> {
        &self.rates
    }

    pub fn rate(&self, target: &Currency) -> Option<Decimal> {
        self.rates.get(target).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_rates_are_rejected() {
        let result = ExchangeRateSnapshot::new(
            Currency::eur(),
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(RateError::Validation(_))));
    }

    #[test]
    fn test_rate_lookup() {
        let usd = Currency::new("USD").unwrap();
        let snapshot = ExchangeRateSnapshot::new(
            Currency::eur(),
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            BTreeMap::from([(usd.clone(), dec!(1.1193))]),
        )
        .unwrap();

        assert_eq!(snapshot.rate(&usd), Some(dec!(1.1193)));
        assert_eq!(snapshot.rate(&Currency::new("GBP").unwrap()), None);
        assert_eq!(snapshot.base_currency(), &Currency::eur());
    }

    #[test]
    fn test_serializes_codes_as_keys() {
        let snapshot = ExchangeRateSnapshot::new(
            Currency::eur(),
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            BTreeMap::from([(Currency::new("USD").unwrap(), dec!(1.5))]),
        )
        .unwrap();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["base_currency"], "EUR");
        assert_eq!(json["date"], "2020-01-02");
        assert_eq!(json["rates"]["USD"], "1.5");
    }
}
