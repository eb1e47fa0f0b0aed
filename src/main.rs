use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use xrates::core::log::init_logging;
use xrates::service::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, HistoricalQuery};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount using the latest rates
    Convert {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: Decimal,
        /// Provider name, defaults to the configured default
        #[arg(long)]
        provider: Option<String>,
    },
    /// Show the latest rates for a base currency
    Rates {
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        provider: Option<String>,
    },
    /// Show one page of business-day rates for a date range
    History {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value = "EUR")]
        base: String,
        #[arg(long, default_value_t = DEFAULT_PAGE)]
        page: i64,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: i64,
        #[arg(long)]
        provider: Option<String>,
    },
    /// List configured providers and the default
    Providers,
    /// Show the rates in effect on a date
    On {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        provider: Option<String>,
    },
}

impl From<Commands> for xrates::AppCommand {
    fn from(cmd: Commands) -> xrates::AppCommand {
        match cmd {
            Commands::Convert {
                from,
                to,
                amount,
                provider,
            } => xrates::AppCommand::Convert {
                from,
                to,
                amount,
                provider,
            },
            Commands::Rates { base, provider } => xrates::AppCommand::Rates { base, provider },
            Commands::History {
                from,
                to,
                base,
                page,
                page_size,
                provider,
            } => xrates::AppCommand::History {
                query: HistoricalQuery {
                    base,
                    from,
                    to,
                    page,
                    page_size,
                },
                provider,
            },
            Commands::On {
                date,
                base,
                provider,
            } => xrates::AppCommand::On {
                date,
                base,
                provider,
            },
            Commands::Providers => xrates::AppCommand::Providers,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => xrates::cli::setup::setup_at_path(path),
            None => xrates::cli::setup::setup(),
        },
        Some(cmd) => xrates::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
