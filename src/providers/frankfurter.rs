use crate::core::currency::Currency;
use crate::core::error::{RateError, RateResult};
use crate::core::provider::ExchangeRateProvider;
use crate::core::rates::ExchangeRateSnapshot;
use crate::providers::resilience::ResilientClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.dev";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Provider for the Frankfurter API and any upstream speaking the same contract.
pub struct FrankfurterProvider {
    name: String,
    client: ResilientClient,
}

impl FrankfurterProvider {
    pub fn new(client: ResilientClient) -> Self {
        Self {
            name: client.provider().to_string(),
            client,
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> RateResult<T> {
        let body = self.client.get_text(path, cancel).await?;
        decode(&self.name, &body)
    }
}

#[derive(Deserialize, Debug)]
struct LatestResponse {
    base: String,
    date: NaiveDate,
    rates: BTreeMap<String, Decimal>,
}

#[derive(Deserialize, Debug)]
struct HistoricalResponse {
    base: String,
    #[allow(dead_code)]
    start_date: Option<NaiveDate>,
    #[allow(dead_code)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    rates: BTreeMap<String, BTreeMap<String, Decimal>>,
}

fn invalid_payload(provider: &str, detail: impl std::fmt::Display) -> RateError {
    RateError::upstream(provider, format!("Invalid response payload: {detail}"), false)
}

/// Lowercases the top-level keys so `Base`, `BASE` and `base` all decode.
fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), value))
                .collect(),
        ),
        other => other,
    }
}

fn decode<T: DeserializeOwned>(provider: &str, body: &str) -> RateResult<T> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| invalid_payload(provider, e))?;
    serde_json::from_value(lowercase_keys(value)).map_err(|e| invalid_payload(provider, e))
}

fn snapshot(
    provider: &str,
    base: &str,
    date: NaiveDate,
    rates: BTreeMap<String, Decimal>,
) -> RateResult<ExchangeRateSnapshot> {
    let base = Currency::new(base).map_err(|e| invalid_payload(provider, e))?;
    let rates = rates
        .into_iter()
        .map(|(code, rate)| Currency::new(&code).map(|code| (code, rate)))
        .collect::<RateResult<BTreeMap<_, _>>>()
        .map_err(|e| invalid_payload(provider, e))?;

    ExchangeRateSnapshot::new(base, date, rates).map_err(|e| invalid_payload(provider, e))
}

#[async_trait]
impl ExchangeRateProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "FrankfurterLatest",
        skip(self, cancel),
        fields(provider = %self.name, base = %base)
    )]
    async fn get_latest(
        &self,
        base: &Currency,
        cancel: &CancellationToken,
    ) -> RateResult<ExchangeRateSnapshot> {
        let path = format!("/v1/latest?base={}", base.code());
        let response: LatestResponse = self.fetch(&path, cancel).await?;
        debug!(
            "Received {} rates for {} as of {}",
            response.rates.len(),
            response.base,
            response.date
        );

        snapshot(&self.name, &response.base, response.date, response.rates)
    }

    #[instrument(
        name = "FrankfurterHistorical",
        skip(self, cancel),
        fields(provider = %self.name, base = %base, from = %from, to = %to)
    )]
    async fn get_historical(
        &self,
        base: &Currency,
        from: NaiveDate,
        to: NaiveDate,
        cancel: &CancellationToken,
    ) -> RateResult<Vec<ExchangeRateSnapshot>> {
        let path = format!(
            "/v1/{}..{}?base={}",
            from.format(DATE_FORMAT),
            to.format(DATE_FORMAT),
            base.code()
        );
        let response: HistoricalResponse = self.fetch(&path, cancel).await?;

        let mut snapshots = Vec::with_capacity(response.rates.len());
        for (day, rates) in response.rates {
            let date = NaiveDate::parse_from_str(&day, DATE_FORMAT)
                .map_err(|e| invalid_payload(&self.name, format!("date '{day}': {e}")))?;
            if rates.is_empty() {
                debug!("No rates for {}, skipping", date);
                continue;
            }
            snapshots.push(snapshot(&self.name, &response.base, date, rates)?);
        }
        snapshots.sort_by_key(ExchangeRateSnapshot::date);

        debug!("Received {} daily snapshots", snapshots.len());
        Ok(snapshots)
    }
}
