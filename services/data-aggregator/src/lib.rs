//! Data Aggregator Service
//!
//! Turns raw trade executions for a currency pair into fixed-interval candles:
//! - Paged, deduplicated historical trade retrieval
//! - Epoch-aligned interval boundaries
//! - OHLC, VWAP, volume and trade count per interval
//! - Carry-forward imputation for intervals without trades

pub mod aggregators;
pub mod config;
pub mod fetcher;
pub mod session;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use services_common::{SECS_PER_DAY, SECS_PER_HOUR, SECS_PER_MIN, ServiceError};
use std::fmt;
use std::str::FromStr;

pub use aggregators::{CandleAggregator, calculate_vwap, interval_starts, round_up};
pub use config::AggregatorConfig;
pub use fetcher::{KrakenSource, MarketDataSource, TradeFetcher, TradePage};
pub use session::{Pair, PairSession, SessionManager};

/// Candle width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1 minute bars
    M1,
    /// 5 minute bars
    M5,
    /// 15 minute bars
    M15,
    /// 30 minute bars
    M30,
    /// 1 hour bars
    H1,
    /// 4 hour bars
    H4,
    /// Daily bars
    D1,
}

impl Timeframe {
    /// Every supported timeframe, narrowest first
    pub const ALL: [Self; 7] = [
        Self::M1,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H4,
        Self::D1,
    ];

    /// Get duration in seconds
    #[must_use]
    pub const fn duration_seconds(&self) -> i64 {
        match self {
            Self::M1 => SECS_PER_MIN,
            Self::M5 => 5 * SECS_PER_MIN,
            Self::M15 => 15 * SECS_PER_MIN,
            Self::M30 => 30 * SECS_PER_MIN,
            Self::H1 => SECS_PER_HOUR,
            Self::H4 => 4 * SECS_PER_HOUR,
            Self::D1 => SECS_PER_DAY,
        }
    }

    /// Get chrono duration
    #[must_use]
    pub fn to_duration(&self) -> Duration {
        Duration::seconds(self.duration_seconds())
    }

    /// Short label used by configuration and the CLI
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|timeframe| timeframe.label() == s.trim())
            .ok_or_else(|| ServiceError::InvalidRequest(format!("unknown timeframe '{s}'")))
    }
}

/// Single trade execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Execution time (nanosecond precision)
    pub timestamp: DateTime<Utc>,
    /// Execution price
    pub price: Decimal,
    /// Executed volume in base currency
    pub volume: Decimal,
}

impl Trade {
    /// Create new trade
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, price: Decimal, volume: Decimal) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }
}

/// Time-ordered trades with unique timestamps
///
/// The only constructor deduplicates and sorts, so every `TradeSeries`
/// satisfies the ordering invariant regardless of what the source returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TradeSeries {
    trades: Vec<Trade>,
}

impl TradeSeries {
    /// Build a series from trades in any order, possibly with repeats.
    ///
    /// The first trade seen for a timestamp wins; later ones are dropped.
    /// Survivors are stably sorted by timestamp.
    #[must_use]
    pub fn from_unordered(trades: Vec<Trade>) -> Self {
        let mut seen = FxHashSet::default();
        let mut unique: Vec<Trade> = trades
            .into_iter()
            .filter(|trade| seen.insert(trade.timestamp))
            .collect();
        unique.sort_by_key(|trade| trade.timestamp);
        Self { trades: unique }
    }

    /// Trades as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }

    /// Iterate trades in time order
    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    /// Number of trades
    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// True when no trades were retrieved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Earliest trade
    #[must_use]
    pub fn first(&self) -> Option<&Trade> {
        self.trades.first()
    }

    /// Latest trade
    #[must_use]
    pub fn last(&self) -> Option<&Trade> {
        self.trades.last()
    }
}

impl<'a> IntoIterator for &'a TradeSeries {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

/// OHLC candle with VWAP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Interval start (epoch aligned)
    pub interval_start: DateTime<Utc>,
    /// Interval start in Unix seconds
    pub time: i64,
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price
    pub close: Decimal,
    /// Volume-weighted average price
    pub vwap: Decimal,
    /// Volume
    pub volume: Decimal,
    /// Number of trades
    pub trade_count: u64,
}

impl Candle {
    /// Build a candle from the trades of one interval, `None` if there are none
    #[must_use]
    pub fn from_bucket(interval_start: DateTime<Utc>, bucket: &[Trade]) -> Option<Self> {
        let (first, last) = (bucket.first()?, bucket.last()?);
        let mut high = first.price;
        let mut low = first.price;
        let mut volume = Decimal::ZERO;

        for trade in bucket {
            high = high.max(trade.price);
            low = low.min(trade.price);
            volume += trade.volume;
        }

        Some(Self {
            interval_start,
            time: interval_start.timestamp(),
            open: first.price,
            high,
            low,
            close: last.price,
            vwap: calculate_vwap(bucket),
            volume,
            trade_count: bucket.len() as u64,
        })
    }

    /// Flat candle at `price` with no activity
    #[must_use]
    pub fn flat(interval_start: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            interval_start,
            time: interval_start.timestamp(),
            open: price,
            high: price,
            low: price,
            close: price,
            vwap: price,
            volume: Decimal::ZERO,
            trade_count: 0,
        }
    }

    /// Copy of this candle's prices for a later, tradeless interval
    #[must_use]
    pub fn carried_forward(&self, interval_start: DateTime<Utc>) -> Self {
        Self {
            interval_start,
            time: interval_start.timestamp(),
            volume: Decimal::ZERO,
            trade_count: 0,
            ..*self
        }
    }

    /// True if no trade fell into this interval
    #[must_use]
    pub const fn is_imputed(&self) -> bool {
        self.trade_count == 0
    }
}

/// Contiguous candles at a fixed timeframe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandleTable {
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleTable {
    pub(crate) const fn new(timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        Self { timeframe, candles }
    }

    /// Candle width
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Candles in interval order
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Iterate candles in interval order
    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    /// Number of intervals
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false for tables built by the aggregator
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Start of the first interval
    #[must_use]
    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.candles.first().map(|candle| candle.interval_start)
    }

    /// Start of the last interval
    #[must_use]
    pub fn till(&self) -> Option<DateTime<Utc>> {
        self.candles.last().map(|candle| candle.interval_start)
    }

    /// Rounded copy for display, see [`aggregators::format`]
    #[must_use]
    pub fn to_display(&self, precision: u32) -> Self {
        aggregators::format::format_table(self, precision)
    }
}
