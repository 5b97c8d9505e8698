//! Data aggregator configuration

use crate::Timeframe;
use crate::session::Pair;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use services_common::{
    DEFAULT_MAX_PAGES, DEFAULT_PRICE_PRECISION, DEFAULT_UNTIL_MARGIN_SECS, SECS_PER_MIN,
    ServiceError, ServiceResult, SourceEndpoint,
};

const ENV_PREFIX: &str = "AGGREGATOR";

/// Selectable historical depth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthOption {
    /// Menu label, e.g. `2 hours`
    pub label: String,
    /// Depth in minutes
    pub minutes: u32,
}

impl DepthOption {
    fn new(label: &str, minutes: u32) -> Self {
        Self {
            label: label.to_string(),
            minutes,
        }
    }
}

/// Data aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Market-data source endpoint
    pub source: SourceEndpoint,

    /// Selectable pairs, `BASE/QUOTE`
    pub pairs: Vec<String>,

    /// Selectable timeframe labels
    pub timeframes: Vec<String>,

    /// Selectable depths, in menu order
    pub depths: Vec<DepthOption>,

    /// Pair opened at startup
    pub default_pair: String,

    /// Timeframe used at startup
    pub default_timeframe: String,

    /// Depth used at startup, in minutes
    pub default_depth_minutes: u32,

    /// Decimals kept for prices and VWAP in the display table
    pub display_precision: u32,

    /// Gap between "now" and the end of the fetch window, in seconds
    pub until_margin_secs: i64,

    /// Maximum page requests per fetch
    pub max_pages: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source: SourceEndpoint::default(),
            pairs: [
                "BTC/EUR", "BTC/USD", "ETH/EUR", "ETH/USD", "SOL/EUR", "SOL/USD", "LTC/EUR",
                "LTC/USD",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            timeframes: vec![
                "1m".to_string(),
                "5m".to_string(),
                "15m".to_string(),
                "30m".to_string(),
            ],
            depths: vec![
                DepthOption::new("1 hour", 60),
                DepthOption::new("2 hours", 120),
                DepthOption::new("3 hours", 180),
                DepthOption::new("5 hours", 300),
                DepthOption::new("12 hours", 720),
                DepthOption::new("1 day", 1440),
            ],
            default_pair: "BTC/USD".to_string(),
            default_timeframe: "1m".to_string(),
            default_depth_minutes: 60,
            display_precision: DEFAULT_PRICE_PRECISION,
            until_margin_secs: DEFAULT_UNTIL_MARGIN_SECS,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from file, overridable by `AGGREGATOR_*` variables
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(Some(path))
    }

    /// Defaults, then the optional file, then `AGGREGATOR_*` variables.
    ///
    /// Nested keys use a double underscore: `AGGREGATOR_SOURCE__BASE_URL`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`AggregatorConfig::load`], reading variables from `vars`
    /// instead of the process environment when given
    pub fn load_with_env(path: Option<&str>, vars: Option<::config::Map<String, String>>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check option lists and defaults for consistency
    ///
    /// # Errors
    /// `Config` describing the first problem found
    pub fn validate(&self) -> ServiceResult<()> {
        let invalid = |reason: String| Err(ServiceError::Config(reason));

        if self.pairs.is_empty() {
            return invalid("no pairs configured".to_string());
        }
        for pair in &self.pairs {
            pair.parse::<Pair>()
                .map_err(|e| ServiceError::Config(e.to_string()))?;
        }
        for label in &self.timeframes {
            label
                .parse::<Timeframe>()
                .map_err(|e| ServiceError::Config(e.to_string()))?;
        }
        if self.timeframes.is_empty() {
            return invalid("no timeframes configured".to_string());
        }
        if self.depths.is_empty() || self.depths.iter().any(|depth| depth.minutes == 0) {
            return invalid("depths must be non-empty and positive".to_string());
        }
        if self.max_pages == 0 {
            return invalid("max_pages must be positive".to_string());
        }
        if self.display_precision > Decimal::MAX_SCALE {
            return invalid(format!(
                "display_precision {} exceeds {} decimals",
                self.display_precision,
                Decimal::MAX_SCALE
            ));
        }
        if self.until_margin_secs < 0 {
            return invalid("until_margin_secs must not be negative".to_string());
        }
        let shallowest = self.depths.iter().map(|depth| depth.minutes).min().unwrap_or(0);
        if self.until_margin_secs >= i64::from(shallowest) * SECS_PER_MIN {
            return invalid(format!(
                "until_margin_secs {} leaves no window for a {shallowest} minute depth",
                self.until_margin_secs
            ));
        }

        self.pair(&self.default_pair)
            .and_then(|_| self.timeframe(&self.default_timeframe))
            .and_then(|_| self.check_depth(self.default_depth_minutes))
            .map_err(|e| ServiceError::Config(format!("default selection: {e}")))?;

        Ok(())
    }

    /// Configured pair matching `input`
    ///
    /// # Errors
    /// `InvalidRequest` for malformed or unlisted pairs
    pub fn pair(&self, input: &str) -> ServiceResult<Pair> {
        let pair: Pair = input.parse()?;
        if self.pairs.iter().any(|listed| listed.parse::<Pair>().is_ok_and(|p| p == pair)) {
            Ok(pair)
        } else {
            Err(ServiceError::InvalidRequest(format!("pair {pair} is not offered")))
        }
    }

    /// Configured timeframe matching `label`
    ///
    /// # Errors
    /// `InvalidRequest` for unknown or unlisted labels
    pub fn timeframe(&self, label: &str) -> ServiceResult<Timeframe> {
        let timeframe: Timeframe = label.parse()?;
        if self.timeframes.iter().any(|listed| listed.trim() == timeframe.label()) {
            Ok(timeframe)
        } else {
            Err(ServiceError::InvalidRequest(format!(
                "timeframe {timeframe} is not offered"
            )))
        }
    }

    /// Ensure `minutes` is one of the configured depths
    ///
    /// # Errors
    /// `InvalidRequest` for unlisted depths
    pub fn check_depth(&self, minutes: u32) -> ServiceResult<()> {
        if self.depths.iter().any(|depth| depth.minutes == minutes) {
            Ok(())
        } else {
            Err(ServiceError::InvalidRequest(format!(
                "depth of {minutes} minutes is not offered"
            )))
        }
    }

    /// Depth in minutes for a menu label such as `3 hours`
    #[must_use]
    pub fn depth_minutes(&self, label: &str) -> Option<u32> {
        self.depths
            .iter()
            .find(|depth| depth.label == label.trim())
            .map(|depth| depth.minutes)
    }
}
