//! Common constants used across all services
//!
//! Single source of truth for magic numbers

// Time constants
pub const NANOS_PER_SEC: i64 = 1_000_000_000;
pub const SECS_PER_MIN: i64 = 60;
pub const SECS_PER_HOUR: i64 = SECS_PER_MIN * 60;
pub const SECS_PER_DAY: i64 = SECS_PER_HOUR * 24;

// Market-data source
/// Pause between consecutive trade page requests (source quota)
pub const PAGE_REQUEST_DELAY_SECS: u64 = 3;
/// Keeps the fetch window's end behind "now" so sparse recent data cannot stall paging
pub const DEFAULT_UNTIL_MARGIN_SECS: i64 = 30;
/// Hard ceiling on pages per fetch
pub const DEFAULT_MAX_PAGES: usize = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// Display precision
pub const DEFAULT_PRICE_PRECISION: u32 = 1;
pub const VOLUME_PRECISION: u32 = 6;
