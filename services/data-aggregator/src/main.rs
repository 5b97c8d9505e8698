//! Data Aggregator CLI
//!
//! Fetches recent trades for a currency pair and prints them, or the
//! candles aggregated from them:
//! - `candles`: OHLC, VWAP, volume and trade count per interval
//! - `trades`: the deduplicated raw trade series
//! - `options`: selectable pairs, timeframes and depths

use anyhow::Result;
use clap::{Parser, Subcommand};
use data_aggregator::{AggregatorConfig, CandleTable, KrakenSource, PairSession, SessionManager};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "data-aggregator";

/// Trade-to-candle aggregation CLI
#[derive(Parser)]
#[clap(name = "data-aggregator")]
#[clap(about = "Aggregate recent trades into OHLC/VWAP candles")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Configuration file (toml, json or yaml)
    #[clap(long, global = true)]
    config: Option<String>,
}

/// Pair, timeframe and depth selection
#[derive(clap::Args)]
struct Selection {
    /// Currency pair, BASE/QUOTE
    #[clap(long)]
    pair: Option<String>,

    /// Candle width: 1m, 5m, 15m, 30m
    #[clap(long)]
    timeframe: Option<String>,

    /// Historical depth in minutes
    #[clap(long)]
    depth_minutes: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print aggregated candles
    Candles {
        #[clap(flatten)]
        selection: Selection,

        /// Decimals for prices and VWAP
        #[clap(long)]
        precision: Option<u32>,

        /// Emit JSON instead of a text table
        #[clap(long)]
        json: bool,
    },

    /// Print the raw trade series
    Trades {
        #[clap(flatten)]
        selection: Selection,

        /// Emit JSON instead of text lines
        #[clap(long)]
        json: bool,
    },

    /// List selectable pairs, timeframes and depths
    Options,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let mut config = AggregatorConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Options => print_options(&config),
        Commands::Candles {
            selection,
            precision,
            json,
        } => {
            if let Some(precision) = precision {
                config.display_precision = precision;
                config.validate()?;
            }
            let session = open_session(config, &selection).await?;
            print_candles(&session, json)?;
        }
        Commands::Trades { selection, json } => {
            let session = open_session(config, &selection).await?;
            print_trades(&session, json)?;
        }
    }

    Ok(())
}

async fn open_session(config: AggregatorConfig, selection: &Selection) -> Result<PairSession> {
    let pair = selection.pair.clone().unwrap_or_else(|| config.default_pair.clone());
    let timeframe = selection
        .timeframe
        .clone()
        .unwrap_or_else(|| config.default_timeframe.clone());
    let depth = selection.depth_minutes.unwrap_or(config.default_depth_minutes);

    info!(
        "Starting {} v{} for {} {} over {} min",
        SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
        pair,
        timeframe,
        depth
    );

    let source = KrakenSource::new(config.source.clone())?;
    let mut manager = SessionManager::new(source, config);
    let session = manager.open(&pair, &timeframe, depth).await?;
    Ok((*session).clone())
}

fn print_options(config: &AggregatorConfig) {
    println!("Pairs:      {}", config.pairs.join(", "));
    println!("Timeframes: {}", config.timeframes.join(", "));
    for depth in &config.depths {
        println!("Depth:      {:<10} {} min", depth.label, depth.minutes);
    }
}

fn print_candles(session: &PairSession, json: bool) -> Result<()> {
    let table: &CandleTable = &session.display;

    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
        return Ok(());
    }

    println!(
        "{} {} candles ({} price)",
        session.pair,
        session.timeframe,
        session.pair.quote_symbol()
    );
    println!(
        "{:<20} {:>11} {:>14} {:>14} {:>14} {:>14} {:>14} {:>16} {:>6}",
        "interval", "time", "open", "high", "low", "close", "vwap", "volume", "count"
    );
    for candle in table.iter() {
        println!(
            "{:<20} {:>11} {:>14} {:>14} {:>14} {:>14} {:>14} {:>16} {:>6}",
            candle.interval_start.format("%Y-%m-%d %H:%M:%S"),
            candle.time,
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.vwap,
            candle.volume,
            candle.trade_count
        );
    }

    Ok(())
}

fn print_trades(session: &PairSession, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(session.trades.as_ref())?);
        return Ok(());
    }

    for trade in session.trades.iter() {
        println!(
            "{} {:>14} {:>16}",
            trade.timestamp.format("%Y-%m-%d %H:%M:%S%.9f"),
            trade.price,
            trade.volume
        );
    }

    Ok(())
}

/// Initialize tracing with environment filter
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", SERVICE_NAME.replace('-', "_")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    Ok(())
}
