//! Aggregator implementations

pub mod candle;
pub mod format;
pub mod interval;

pub use candle::{CandleAggregator, calculate_vwap};
pub use format::format_table;
pub use interval::{interval_count, interval_starts, round_up};
