pub mod setup;

use crate::service::{ConvertRequest, ExchangeService, HistoricalQuery};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

fn render<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize result")
}

pub async fn convert(
    service: &ExchangeService,
    from: &str,
    to: &str,
    amount: Decimal,
    provider: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String> {
    let request = ConvertRequest {
        from: from.to_string(),
        to: to.to_string(),
        amount,
    };
    let result = service.convert(&request, provider, cancel).await?;
    render(&result)
}

pub async fn rates(
    service: &ExchangeService,
    base: Option<&str>,
    provider: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String> {
    let snapshot = service.latest(base, provider, cancel).await?;
    render(&snapshot)
}

pub async fn history(
    service: &ExchangeService,
    query: &HistoricalQuery,
    provider: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String> {
    let page = service.historical(query, provider, cancel).await?;
    render(&page)
}

pub fn providers(service: &ExchangeService) -> Result<String> {
    render(&service.providers())
}

pub async fn on(
    service: &ExchangeService,
    base: Option<&str>,
    date: NaiveDate,
    provider: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String> {
    let snapshot = service.rates_on(base, date, provider, cancel).await?;
    render(&snapshot)
}
