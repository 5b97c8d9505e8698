//! Kraken public trades endpoint

use super::{MarketDataSource, TradePage};
use crate::Trade;
use crate::session::Pair;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use services_common::{NANOS_PER_SEC, ServiceError, ServiceResult, SourceEndpoint};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Raw `/0/public/Trades` envelope
#[derive(Debug, Deserialize)]
struct TradesResponse {
    #[serde(default)]
    error: Vec<String>,
    result: Option<FxHashMap<String, Value>>,
}

/// Kraken REST market-data source
#[derive(Debug, Clone)]
pub struct KrakenSource {
    client: Client,
    endpoint: SourceEndpoint,
}

impl KrakenSource {
    /// Create a source for `endpoint`
    ///
    /// # Errors
    /// Returns `Config` if the HTTP client cannot be built
    pub fn new(endpoint: SourceEndpoint) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoint.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// Endpoint this source talks to
    #[must_use]
    pub const fn endpoint(&self) -> &SourceEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl MarketDataSource for KrakenSource {
    async fn get_recent_trades(&self, pair: &Pair, since: DateTime<Utc>) -> ServiceResult<TradePage> {
        let since_nanos = since.timestamp_nanos_opt().ok_or_else(|| {
            ServiceError::InvalidRequest(format!("since {since} out of nanosecond range"))
        })?;

        let response = self
            .client
            .get(self.endpoint.trades_url())
            .query(&[("pair", pair.query()), ("since", since_nanos.to_string())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ServiceError::DataUnavailable(format!("trades request for {pair}: {e}")))?;

        let body: TradesResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::DataUnavailable(format!("trades body for {pair}: {e}")))?;

        let page = parse_page(body)?;
        debug!("Kraken returned {} trades for {}", page.trades.len(), pair);
        Ok(page)
    }
}

fn parse_page(body: TradesResponse) -> ServiceResult<TradePage> {
    if !body.error.is_empty() {
        return Err(ServiceError::DataUnavailable(body.error.join("; ")));
    }

    let result = body
        .result
        .ok_or_else(|| ServiceError::DataUnavailable("response has no result".to_string()))?;

    let mut page = TradePage::default();
    for (key, value) in result {
        if key == "last" {
            page.last = match value {
                Value::String(last) => Some(last),
                other => Some(other.to_string()),
            };
            continue;
        }

        let rows = value
            .as_array()
            .ok_or_else(|| ServiceError::DataUnavailable(format!("'{key}' is not a trade list")))?;
        for row in rows {
            page.trades.push(parse_trade(row)?);
        }
    }

    Ok(page)
}

/// `[price, volume, time, side, order type, misc, trade id]`
fn parse_trade(row: &Value) -> ServiceResult<Trade> {
    let malformed = || ServiceError::DataUnavailable(format!("malformed trade row {row}"));
    let fields = row.as_array().ok_or_else(malformed)?;
    if fields.len() < 3 {
        return Err(malformed());
    }

    let price = decimal_field(&fields[0]).ok_or_else(malformed)?;
    let volume = decimal_field(&fields[1]).ok_or_else(malformed)?;
    let seconds = decimal_field(&fields[2]).ok_or_else(malformed)?;
    let nanos = (seconds * Decimal::from(NANOS_PER_SEC))
        .trunc()
        .to_i64()
        .ok_or_else(malformed)?;

    Ok(Trade::new(DateTime::from_timestamp_nanos(nanos), price, volume))
}

fn decimal_field(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(text) => Decimal::from_str(text).ok(),
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        _ => None,
    }
}
