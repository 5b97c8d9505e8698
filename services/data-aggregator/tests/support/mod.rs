//! Shared helpers for data-aggregator tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use data_aggregator::{MarketDataSource, Pair, Trade, TradePage};
use rust_decimal::Decimal;
use services_common::{ServiceError, ServiceResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source that replays scripted pages and records every `since` it was asked for
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pages: Mutex<VecDeque<ServiceResult<TradePage>>>,
    requests: Mutex<Vec<DateTime<Utc>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful page
    pub fn push_page(&self, trades: Vec<Trade>) -> &Self {
        self.pages.lock().unwrap().push_back(Ok(TradePage {
            trades,
            last: None,
        }));
        self
    }

    /// Queue a failing request
    pub fn push_error(&self, message: &str) -> &Self {
        self.pages
            .lock()
            .unwrap()
            .push_back(Err(ServiceError::DataUnavailable(message.to_string())));
        self
    }

    /// `since` values requested so far
    pub fn requests(&self) -> Vec<DateTime<Utc>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn get_recent_trades(&self, _pair: &Pair, since: DateTime<Utc>) -> ServiceResult<TradePage> {
        self.requests.lock().unwrap().push(since);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TradePage::default()))
    }
}

/// 2021-12-05 13:38:49.240554 UTC, an unaligned instant
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 12, 5, 13, 38, 49).unwrap() + Duration::microseconds(240_554)
}

/// Trade `offset_secs` after `base`
pub fn trade_at(base: DateTime<Utc>, offset_secs: i64, price: &str, volume: &str) -> Trade {
    Trade::new(
        base + Duration::seconds(offset_secs),
        price.parse::<Decimal>().unwrap(),
        volume.parse::<Decimal>().unwrap(),
    )
}

pub fn btc_usd() -> Pair {
    "BTC/USD".parse().unwrap()
}
