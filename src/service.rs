//! Request-level operations: conversion, latest rates and paged history.

use crate::core::calendar::BusinessDayCalendar;
use crate::core::config::AppConfig;
use crate::core::conversion::ConversionEngine;
use crate::core::currency::{Blacklist, Currency};
use crate::core::error::{RateError, RateResult};
use crate::core::paging::Paginator;
use crate::core::rates::ExchangeRateSnapshot;
use crate::providers::build_providers;
use crate::providers::resolver::ProviderResolver;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

pub const DEFAULT_BASE: &str = "EUR";
pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub from: Currency,
    pub to: Currency,
    pub amount: Decimal,
    pub rate: Decimal,
    pub converted_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalQuery {
    #[serde(default = "default_base")]
    pub base: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_base() -> String {
    DEFAULT_BASE.to_string()
}

fn default_page() -> i64 {
    DEFAULT_PAGE
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl HistoricalQuery {
    /// First page of EUR rates for `[from, to]`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            base: default_base(),
            from,
            to,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalPage {
    pub base: Currency,
    /// Earliest date with rates on this page.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: i64,
    pub page_size: i64,
    pub total_business_days: usize,
    pub rates: BTreeMap<NaiveDate, BTreeMap<Currency, Decimal>>,
}

/// Registered provider names, lower-cased and sorted, and the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderListing {
    pub default: String,
    pub providers: Vec<String>,
}

pub struct ExchangeService {
    resolver: ProviderResolver,
    blacklist: Blacklist,
}

impl ExchangeService {
    pub fn new(resolver: ProviderResolver, blacklist: Blacklist) -> Self {
        Self {
            resolver,
            blacklist,
        }
    }

    /// Builds every configured provider and the resolver over them.
    pub fn from_config(config: &AppConfig) -> RateResult<Self> {
        let providers = build_providers(config)?;
        let resolver = ProviderResolver::new(providers, &config.providers)?;
        Ok(Self::new(resolver, config.blacklist()?))
    }

    pub fn providers(&self) -> ProviderListing {
        ProviderListing {
            default: self.resolver.default_name().to_string(),
            providers: self
                .resolver
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    #[instrument(skip(self, cancel), fields(from = %request.from, to = %request.to))]
    pub async fn convert(
        &self,
        request: &ConvertRequest,
        provider: Option<&str>,
        cancel: &CancellationToken,
    ) -> RateResult<ConversionResult> {
        let source = Currency::new(&request.from)?;
        let target = Currency::new(&request.to)?;
        if request.amount <= Decimal::ZERO {
            return Err(RateError::validation("Amount must be greater than 0."));
        }

        let provider = self.resolver.get(provider)?;
        let snapshot = provider.get_latest(&source, cancel).await?;

        let converted_amount = ConversionEngine::builder()
            .from(source.clone())
            .to(target.clone())
            .amount(request.amount)
            .rates(&snapshot)
            .blacklist(&self.blacklist)
            .convert()?;

        let rate = if source == target {
            Decimal::ONE
        } else {
            snapshot.rate(&target).ok_or_else(|| {
                RateError::validation(format!(
                    "Currency '{target}' is not available in the provided rates."
                ))
            })?
        };
        debug!("Converted {} {} at {}", request.amount, source, rate);

        Ok(ConversionResult {
            from: source,
            to: target,
            amount: request.amount,
            rate,
            converted_amount,
        })
    }

    pub async fn latest(
        &self,
        base: Option<&str>,
        provider: Option<&str>,
        cancel: &CancellationToken,
    ) -> RateResult<ExchangeRateSnapshot> {
        let base = Currency::new(base.unwrap_or(DEFAULT_BASE))?;
        let provider = self.resolver.get(provider)?;
        provider.get_latest(&base, cancel).await
    }

    /// One page of business-day rates. The provider is asked once, for the
    /// range spanning the page; an empty page makes no upstream call.
    #[instrument(skip(self, cancel), fields(base = %query.base, page = query.page))]
    pub async fn historical(
        &self,
        query: &HistoricalQuery,
        provider: Option<&str>,
        cancel: &CancellationToken,
    ) -> RateResult<HistoricalPage> {
        let base = Currency::new(&query.base)?;
        if query.from > query.to {
            return Err(RateError::validation(
                "From date must be on or before To date.",
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&query.page_size) {
            return Err(RateError::validation(format!(
                "PageSize must be between 1 and {MAX_PAGE_SIZE}."
            )));
        }

        let provider = self.resolver.get(provider)?;

        let from = BusinessDayCalendar::last_business_day_on_or_before(query.from);
        let days = BusinessDayCalendar::business_days_in_range(from, query.to);
        let slice = Paginator::page(&days, query.page, query.page_size)?;

        let mut page = HistoricalPage {
            base: base.clone(),
            start_date: None,
            end_date: None,
            page: query.page,
            page_size: query.page_size,
            total_business_days: days.len(),
            rates: BTreeMap::new(),
        };

        let Some((first, last)) = slice.fetch_range() else {
            debug!("Page {} is past the last business day", query.page);
            return Ok(page);
        };

        let snapshots = provider.get_historical(&base, first, last, cancel).await?;
        page.rates = snapshots
            .into_iter()
            .filter(|snapshot| slice.contains(&snapshot.date()))
            .map(|snapshot| (snapshot.date(), snapshot.rates().clone()))
            .collect();
        page.start_date = page.rates.keys().next().copied();
        page.end_date = page.rates.keys().next_back().copied();

        Ok(page)
    }

    /// Rates in effect on `date`. Weekends resolve to the preceding Friday.
    pub async fn rates_on(
        &self,
        base: Option<&str>,
        date: NaiveDate,
        provider: Option<&str>,
        cancel: &CancellationToken,
    ) -> RateResult<ExchangeRateSnapshot> {
        let base = Currency::new(base.unwrap_or(DEFAULT_BASE))?;
        let provider = self.resolver.get(provider)?;
        let day = BusinessDayCalendar::last_business_day_on_or_before(date);

        provider
            .get_historical(&base, day, day, cancel)
            .await?
            .pop()
            .ok_or_else(|| {
                RateError::upstream(
                    provider.name(),
                    format!("No rates available for {base} on {day}"),
                    false,
                )
            })
    }
}
