//! Currency conversion against a rate snapshot.

use crate::core::currency::{Blacklist, Currency};
use crate::core::error::{RateError, RateResult};
use crate::core::rates::ExchangeRateSnapshot;
use rust_decimal::Decimal;

/// Stateless conversion rules.
pub struct ConversionEngine;

impl ConversionEngine {
    /// Converts `amount` of `source` into `target`.
    ///
    /// The snapshot is trusted to be quoted against `source`. Checks run in a
    /// fixed order and the first failure wins:
    ///
    /// 1. negative amount
    /// 2. blacklisted source
    /// 3. blacklisted target
    /// 4. target neither the snapshot base nor among its rates
    pub fn convert(
        source: &Currency,
        target: &Currency,
        amount: Decimal,
        snapshot: &ExchangeRateSnapshot,
        blacklist: &Blacklist,
    ) -> RateResult<Decimal> {
        if amount < Decimal::ZERO {
            return Err(RateError::OutOfRange(
                "Amount must be non-negative.".to_string(),
            ));
        }

        if blacklist.contains(source) {
            return Err(RateError::validation(format!(
                "Source currency '{source}' is not supported."
            )));
        }

        if blacklist.contains(target) {
            return Err(RateError::validation(format!(
                "Target currency '{target}' is not supported."
            )));
        }

        let rate = snapshot.rate(target);
        if target != snapshot.base_currency() && rate.is_none() {
            return Err(RateError::validation(format!(
                "Currency '{target}' is not available in the provided rates."
            )));
        }

        if source == target {
            return Ok(amount);
        }

        let rate = rate.ok_or_else(|| {
            RateError::validation(format!(
                "Currency '{target}' is not available in the provided rates."
            ))
        })?;

        amount.checked_mul(rate).ok_or_else(|| {
            RateError::OutOfRange(format!(
                "Converting {amount} {source} to {target} overflows."
            ))
        })
    }

    pub fn builder<'a>() -> ConversionBuilder<'a> {
        ConversionBuilder::default()
    }
}

/// Collects conversion inputs that may be wired in from different places.
///
/// Missing collaborators surface as [`RateError::MissingArgument`] before any
/// input is validated.
#[derive(Default)]
pub struct ConversionBuilder<'a> {
    source: Option<Currency>,
    target: Option<Currency>,
    amount: Option<Decimal>,
    snapshot: Option<&'a ExchangeRateSnapshot>,
    blacklist: Option<&'a Blacklist>,
}

impl<'a> ConversionBuilder<'a> {
    pub fn from(mut self, source: Currency) -> Self {
        self.source = Some(source);
        self
    }

    pub fn to(mut self, target: Currency) -> Self {
        self.target = Some(target);
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn rates(mut self, snapshot: &'a ExchangeRateSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn blacklist(mut self, blacklist: &'a Blacklist) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    pub fn convert(self) -> RateResult<Decimal> {
        let snapshot = self.snapshot.ok_or(RateError::MissingArgument("snapshot"))?;
        let blacklist = self
            .blacklist
            .ok_or(RateError::MissingArgument("blacklist"))?;
        let source = self.source.ok_or(RateError::MissingArgument("source"))?;
        let target = self.target.ok_or(RateError::MissingArgument("target"))?;
        let amount = self.amount.ok_or(RateError::MissingArgument("amount"))?;

        ConversionEngine::convert(&source, &target, amount, snapshot, blacklist)
    }
}
