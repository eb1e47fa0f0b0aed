//! Exchange rate provider abstraction

use crate::core::currency::Currency;
use crate::core::error::RateResult;
use crate::core::rates::ExchangeRateSnapshot;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Registration key, matched case-insensitively by the resolver.
    fn name(&self) -> &str;

    async fn get_latest(
        &self,
        base: &Currency,
        cancel: &CancellationToken,
    ) -> RateResult<ExchangeRateSnapshot>;

    /// Snapshots for `[from, to]`, ascending by date, one per day with data.
    async fn get_historical(
        &self,
        base: &Currency,
        from: NaiveDate,
        to: NaiveDate,
        cancel: &CancellationToken,
    ) -> RateResult<Vec<ExchangeRateSnapshot>>;
}
