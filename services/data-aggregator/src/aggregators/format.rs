//! Display formatting for candle tables

use crate::{Candle, CandleTable};
use chrono::SubsecRound;
use rust_decimal::{Decimal, RoundingStrategy};
use services_common::{ServiceError, ServiceResult, VOLUME_PRECISION};
use tracing::warn;

/// Round `value` half-to-even to `precision` decimals.
///
/// Trailing zeros are kept where the result has room for them, so
/// `7` at precision 2 becomes `7.00`.
///
/// # Errors
/// `NumericFormat` if `precision` exceeds [`Decimal::MAX_SCALE`].
pub fn coerce(column: &'static str, value: Decimal, precision: u32) -> ServiceResult<Decimal> {
    if precision > Decimal::MAX_SCALE {
        return Err(ServiceError::NumericFormat {
            column,
            value: format!("{value} at {precision} decimals"),
        });
    }

    let mut rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(precision);
    Ok(rounded)
}

fn coerce_or_keep(column: &'static str, value: Decimal, precision: u32) -> Decimal {
    coerce(column, value, precision).unwrap_or_else(|e| {
        warn!("{}; leaving value unrounded", e);
        value
    })
}

fn format_candle(candle: &Candle, precision: u32) -> Candle {
    let interval_start = candle.interval_start.trunc_subsecs(0);

    Candle {
        interval_start,
        time: interval_start.timestamp(),
        open: coerce_or_keep("open", candle.open, precision),
        high: coerce_or_keep("high", candle.high, precision),
        low: coerce_or_keep("low", candle.low, precision),
        close: coerce_or_keep("close", candle.close, precision),
        vwap: coerce_or_keep("vwap", candle.vwap, precision),
        volume: coerce_or_keep("volume", candle.volume, VOLUME_PRECISION),
        trade_count: candle.trade_count,
    }
}

/// Copy of `table` rounded for presentation
///
/// Prices and VWAP go to `precision` decimals, volume to six, and interval
/// starts lose any sub-second part. Columns that fail to coerce are kept as
/// they were.
#[must_use]
pub fn format_table(table: &CandleTable, precision: u32) -> CandleTable {
    let candles = table
        .iter()
        .map(|candle| format_candle(candle, precision))
        .collect();

    CandleTable::new(table.timeframe(), candles)
}
