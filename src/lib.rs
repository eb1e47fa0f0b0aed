pub mod cli;
pub mod core;
pub mod providers;
pub mod service;
pub mod store;

pub use crate::core::config;

use crate::service::{ExchangeService, HistoricalQuery};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Commands that need a configured [`ExchangeService`].
#[derive(Debug, Clone)]
pub enum AppCommand {
    Convert {
        from: String,
        to: String,
        amount: Decimal,
        provider: Option<String>,
    },
    Rates {
        base: Option<String>,
        provider: Option<String>,
    },
    History {
        query: HistoricalQuery,
        provider: Option<String>,
    },
    On {
        date: NaiveDate,
        base: Option<String>,
        provider: Option<String>,
    },
    Providers,
}

/// Runs `command` and returns its JSON output.
pub async fn execute(
    command: &AppCommand,
    service: &ExchangeService,
    cancel: &CancellationToken,
) -> Result<String> {
    match command {
        AppCommand::Convert {
            from,
            to,
            amount,
            provider,
        } => cli::convert(service, from, to, *amount, provider.as_deref(), cancel).await,
        AppCommand::Rates { base, provider } => {
            cli::rates(service, base.as_deref(), provider.as_deref(), cancel).await
        }
        AppCommand::History { query, provider } => {
            cli::history(service, query, provider.as_deref(), cancel).await
        }
        AppCommand::On {
            date,
            base,
            provider,
        } => cli::on(service, base.as_deref(), *date, provider.as_deref(), cancel).await,
        AppCommand::Providers => cli::providers(service),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xrates starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let service =
        ExchangeService::from_config(&config).context("Failed to set up exchange rate providers")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, canceling");
            on_interrupt.cancel();
        }
    });

    let output = execute(&command, &service, &cancel).await?;
    println!("{output}");
    Ok(())
}
