use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use market_engine::{
    config::{self, CONFIG_FILE_PATH},
    logger::{self, LogLevel, LogTag, LoggerConfig},
    MarketDataEngine,
};
use serde::Serialize;
use std::path::PathBuf;

/// Market-data engine CLI
///
/// Fetches confidence-filtered prices, holder/market metrics and AMM health
/// and prints them as JSON.
#[derive(Parser)]
#[command(name = "market_engine")]
#[command(about = "Batched, rate-limited, cached market data for token sets", long_about = None)]
struct Args {
    /// Configuration file (TOML); defaults are used if it does not exist
    #[arg(long, global = true, default_value = CONFIG_FILE_PATH)]
    config: PathBuf,

    /// Enable debug output for a tag (prices, api, cache, rate-limit, retry, metrics, health, all)
    #[arg(long, global = true, value_name = "TAG")]
    debug: Vec<String>,

    /// Verbose output for every tag
    #[arg(long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Plain console output
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    /// Also append log lines to this file
    #[arg(long = "log-file", global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Confidence-filtered prices for one or more token ids
    Prices {
        #[arg(required = true)]
        ids: Vec<String>,

        /// Include failed batches in the output
        #[arg(long)]
        detailed: bool,
    },
    /// Supply, holder distribution, volume and liquidity for a mint
    Metrics { mint: String },
    /// AMM health score for a token set
    Health {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_with(logger_config(&args));

    if let Err(e) = run(args).await {
        logger::error(LogTag::System, &format!("{:#}", e));
        logger::flush();
        std::process::exit(1);
    }

    logger::flush();
}

fn logger_config(args: &Args) -> LoggerConfig {
    let mut config = LoggerConfig {
        debug_tags: args.debug.iter().map(|tag| tag.to_lowercase()).collect(),
        log_file: args.log_file.clone(),
        colors: !args.no_color,
        ..LoggerConfig::default()
    };

    if args.verbose {
        config.min_level = LogLevel::Verbose;
    } else if args.quiet {
        config.min_level = LogLevel::Warning;
    }
    if !config.debug_tags.is_empty() && config.min_level < LogLevel::Debug {
        config.min_level = LogLevel::Debug;
    }

    config
}

async fn run(args: Args) -> Result<()> {
    let config = config::load_config_from_path(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    if let Command::Config = args.command {
        return print_json(&config);
    }

    let engine = MarketDataEngine::new(config).context("building market engine")?;
    engine.start();

    let result = match args.command {
        Command::Prices { ids, detailed } => {
            if detailed {
                let report = engine.prices().get_prices_detailed(&ids[..]).await?;
                print_json(&report)
            } else {
                let quotes = engine.prices().get_prices(&ids[..]).await?;
                print_json(&quotes)
            }
        }
        Command::Metrics { mint } => {
            let metrics = engine.metrics().compute_metrics(&mint).await?;
            print_json(&metrics)
        }
        Command::Health { ids } => {
            let report = engine.health().report(&ids[..]).await;
            print_json(&report)
        }
        Command::Config => Ok(()),
    };

    engine.shutdown();
    result
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{}", json);
    Ok(())
}
