//! Candle aggregator implementation

use super::interval::{interval_starts, round_up};
use crate::{Candle, CandleTable, Timeframe, Trade, TradeSeries};
use rust_decimal::Decimal;
use services_common::{ServiceError, ServiceResult};
use tracing::debug;

/// Volume-weighted average price of `trades`, zero when total volume is zero
#[must_use]
pub fn calculate_vwap(trades: &[Trade]) -> Decimal {
    let (notional, volume) = trades
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(notional, volume), trade| {
            (notional + trade.price * trade.volume, volume + trade.volume)
        });

    notional.checked_div(volume).unwrap_or(Decimal::ZERO)
}

/// Aggregator for candle data processing
///
/// Stateless: the same series and timeframe always produce the same table.
#[derive(Debug, Default, Clone, Copy)]
pub struct CandleAggregator;

impl CandleAggregator {
    /// Create a new candle aggregator
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Bucket `trades` into contiguous `timeframe` candles.
    ///
    /// The table spans `round_up(first)` to `round_up(last)`. Interval `t`
    /// holds trades in `[t, t + width)`. Intervals without trades repeat the
    /// previous interval's prices with zero volume.
    ///
    /// # Errors
    /// `EmptyInput` for an empty series, `InvalidRequest` when a trade has no
    /// boundary in range after it, `MissingCarrySeed` if the first interval is
    /// empty with nothing before it to carry forward.
    pub fn aggregate(&self, trades: &TradeSeries, timeframe: Timeframe) -> ServiceResult<CandleTable> {
        let (Some(first), Some(last)) = (trades.first(), trades.last()) else {
            return Err(ServiceError::EmptyInput(format!(
                "cannot aggregate {timeframe} candles from zero trades"
            )));
        };

        let since = round_up(first.timestamp, timeframe)?;
        let till = round_up(last.timestamp, timeframe)?;
        let width = timeframe.to_duration();

        let all = trades.as_slice();
        // Trades in [first, since) precede the window; the latest of them
        // seeds the first interval if it turns out empty.
        let mut cursor = all.partition_point(|trade| trade.timestamp < since);
        let seed = cursor.checked_sub(1).map(|index| all[index]);

        let starts = interval_starts(since, till, timeframe);
        let mut candles: Vec<Candle> = Vec::with_capacity(starts.len());
        let mut imputed = 0usize;

        for start in starts {
            let rest = &all[cursor..];
            let taken = match start.checked_add_signed(width) {
                Some(end) => rest.partition_point(|trade| trade.timestamp < end),
                None => rest.len(),
            };
            let bucket = &all[cursor..cursor + taken];
            cursor += taken;

            let candle = match Candle::from_bucket(start, bucket) {
                Some(candle) => candle,
                None => {
                    imputed += 1;
                    match candles.last() {
                        Some(previous) => previous.carried_forward(start),
                        None => {
                            let seed = seed.ok_or(ServiceError::MissingCarrySeed(start))?;
                            Candle::flat(start, seed.price)
                        }
                    }
                }
            };
            candles.push(candle);
        }

        debug!(
            "Aggregated {} trades into {} {} candles ({} imputed)",
            trades.len(),
            candles.len(),
            timeframe,
            imputed
        );

        Ok(CandleTable::new(timeframe, candles))
    }
}
