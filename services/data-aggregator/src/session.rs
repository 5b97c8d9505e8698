//! Pair sessions and selection handling
//!
//! A [`PairSession`] is an immutable snapshot of one pair's trades and
//! candles. The [`SessionManager`] reacts to pair, timeframe and depth
//! selections by building a complete new session and swapping it in only
//! after every step succeeded.

use crate::aggregators::CandleAggregator;
use crate::config::AggregatorConfig;
use crate::fetcher::{MarketDataSource, TradeFetcher};
use crate::{CandleTable, Timeframe, TradeSeries};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use services_common::{ServiceError, ServiceResult};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Currency pair such as `BTC/USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    base: String,
    quote: String,
}

impl Pair {
    /// Base asset ticker, e.g. `BTC`
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Quote currency, e.g. `USD`
    #[must_use]
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Form expected by the market-data source (`BTCUSD`)
    #[must_use]
    pub fn query(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Currency sign for price axes
    #[must_use]
    pub fn quote_symbol(&self) -> &'static str {
        if self.quote == "USD" { "$" } else { "€" }
    }
}

impl FromStr for Pair {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ServiceError::InvalidRequest(format!("pair '{s}' is not BASE/QUOTE"));
        let (base, quote) = s.trim().split_once('/').ok_or_else(invalid)?;
        let valid = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric());

        if !valid(base) || !valid(quote) {
            return Err(invalid());
        }

        Ok(Self {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        })
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Snapshot of one pair at one timeframe and depth
#[derive(Debug, Clone)]
pub struct PairSession {
    /// Selected pair
    pub pair: Pair,
    /// Candle width
    pub timeframe: Timeframe,
    /// Historical depth in minutes
    pub depth_minutes: u32,
    /// Retrieved trades
    pub trades: Arc<TradeSeries>,
    /// Aggregated candles, full precision
    pub candles: Arc<CandleTable>,
    /// Candles rounded for display
    pub display: Arc<CandleTable>,
}

/// Applies selection events to the current session
#[derive(Debug)]
pub struct SessionManager<S> {
    fetcher: TradeFetcher<S>,
    aggregator: CandleAggregator,
    config: AggregatorConfig,
    current: Option<Arc<PairSession>>,
}

impl<S: MarketDataSource> SessionManager<S> {
    /// Create a manager without a session
    pub fn new(source: S, config: AggregatorConfig) -> Self {
        let fetcher = TradeFetcher::new(source).with_max_pages(config.max_pages);
        Self {
            fetcher,
            aggregator: CandleAggregator::new(),
            config,
            current: None,
        }
    }

    /// Current session, if one was built
    pub fn current(&self) -> Option<&Arc<PairSession>> {
        self.current.as_ref()
    }

    /// Active configuration
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Build the first session from configured defaults
    ///
    /// # Errors
    /// See [`SessionManager::open`]
    pub async fn open_default(&mut self) -> ServiceResult<Arc<PairSession>> {
        let pair = self.config.default_pair.clone();
        let timeframe = self.config.default_timeframe.clone();
        let depth = self.config.default_depth_minutes;
        self.open(&pair, &timeframe, depth).await
    }

    /// Fetch and aggregate a new session, replacing the current one on success.
    ///
    /// # Errors
    /// `InvalidRequest` for selections outside the configured options; fetch
    /// and aggregation errors pass through and leave the current session as is.
    pub async fn open(
        &mut self,
        pair: &str,
        timeframe: &str,
        depth_minutes: u32,
    ) -> ServiceResult<Arc<PairSession>> {
        let pair = self.config.pair(pair)?;
        let timeframe = self.config.timeframe(timeframe)?;
        self.config.check_depth(depth_minutes)?;

        let trades = Arc::new(self.fetch_window(&pair, depth_minutes).await?);
        self.install(pair, timeframe, depth_minutes, trades)
    }

    /// Switch pair: refetch at the current timeframe and depth
    ///
    /// # Errors
    /// See [`SessionManager::open`]
    pub async fn select_pair(&mut self, pair: &str) -> ServiceResult<Arc<PairSession>> {
        let requested = self.config.pair(pair)?;
        let (timeframe, depth) = self.selection();
        if let Some(current) = &self.current {
            if current.pair == requested {
                return Ok(Arc::clone(current));
            }
        }
        self.open(&requested.to_string(), timeframe.label(), depth).await
    }

    /// Switch timeframe: re-aggregate the trades already held
    ///
    /// # Errors
    /// `InvalidRequest` for unknown labels or when no session exists yet;
    /// aggregation errors leave the current session as is.
    pub fn select_timeframe(&mut self, timeframe: &str) -> ServiceResult<Arc<PairSession>> {
        let timeframe = self.config.timeframe(timeframe)?;
        let current = self.require_current()?;
        let (pair, depth, trades) = (
            current.pair.clone(),
            current.depth_minutes,
            Arc::clone(&current.trades),
        );
        self.install(pair, timeframe, depth, trades)
    }

    /// Switch depth: refetch when it differs from the current one
    ///
    /// # Errors
    /// See [`SessionManager::open`]
    pub async fn select_depth(&mut self, depth_minutes: u32) -> ServiceResult<Arc<PairSession>> {
        self.config.check_depth(depth_minutes)?;
        let current = self.require_current()?;
        if current.depth_minutes == depth_minutes {
            return Ok(Arc::clone(current));
        }

        let (pair, timeframe) = (current.pair.clone(), current.timeframe);
        let trades = Arc::new(self.fetch_window(&pair, depth_minutes).await?);
        self.install(pair, timeframe, depth_minutes, trades)
    }

    fn selection(&self) -> (Timeframe, u32) {
        match &self.current {
            Some(current) => (current.timeframe, current.depth_minutes),
            None => (
                self.config
                    .default_timeframe
                    .parse()
                    .unwrap_or(Timeframe::M1),
                self.config.default_depth_minutes,
            ),
        }
    }

    fn require_current(&self) -> ServiceResult<&Arc<PairSession>> {
        self.current
            .as_ref()
            .ok_or_else(|| ServiceError::InvalidRequest("no pair selected yet".to_string()))
    }

    fn window(&self, depth_minutes: u32, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let since = now - Duration::minutes(i64::from(depth_minutes));
        let until = now - Duration::seconds(self.config.until_margin_secs);
        (since, until)
    }

    async fn fetch_window(&self, pair: &Pair, depth_minutes: u32) -> ServiceResult<TradeSeries> {
        let (since, until) = self.window(depth_minutes, Utc::now());
        self.fetcher.fetch(pair, since, until).await
    }

    fn install(
        &mut self,
        pair: Pair,
        timeframe: Timeframe,
        depth_minutes: u32,
        trades: Arc<TradeSeries>,
    ) -> ServiceResult<Arc<PairSession>> {
        let candles = self.aggregator.aggregate(&trades, timeframe)?;
        let display = candles.to_display(self.config.display_precision);

        let session = Arc::new(PairSession {
            pair,
            timeframe,
            depth_minutes,
            trades,
            candles: Arc::new(candles),
            display: Arc::new(display),
        });

        info!(
            "Session {} {} over {} min: {} trades, {} candles",
            session.pair,
            session.timeframe,
            session.depth_minutes,
            session.trades.len(),
            session.candles.len()
        );

        self.current = Some(Arc::clone(&session));
        Ok(session)
    }
}
