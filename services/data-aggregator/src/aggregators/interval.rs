//! Epoch-aligned interval boundaries
//!
//! Boundaries are multiples of the timeframe width counted from the Unix
//! epoch. Every supported width divides a day, so a boundary at one midnight
//! is a boundary at every midnight.

use crate::Timeframe;
use chrono::{DateTime, Utc};
use services_common::{ServiceError, ServiceResult};

/// Smallest timeframe boundary that is `>= t`
///
/// Already aligned instants are returned unchanged, which makes the
/// function idempotent.
///
/// # Errors
/// `InvalidRequest` if that boundary lies past the last representable instant.
pub fn round_up(t: DateTime<Utc>, timeframe: Timeframe) -> ServiceResult<DateTime<Utc>> {
    let width = timeframe.duration_seconds();
    let secs = t.timestamp();
    let offset = secs.rem_euclid(width);

    if offset == 0 && t.timestamp_subsec_nanos() == 0 {
        return Ok(t);
    }

    (secs - offset)
        .checked_add(width)
        .and_then(|boundary| DateTime::from_timestamp(boundary, 0))
        .ok_or_else(|| {
            ServiceError::InvalidRequest(format!("no {timeframe} boundary in range after {t}"))
        })
}

/// Number of boundaries in the closed range `[since, till]`
#[must_use]
pub fn interval_count(since: DateTime<Utc>, till: DateTime<Utc>, timeframe: Timeframe) -> usize {
    if till < since {
        return 0;
    }
    let spans = (till - since).num_seconds() / timeframe.duration_seconds();
    usize::try_from(spans).map_or(0, |spans| spans + 1)
}

/// Boundaries `since, since + g, ..., till`
#[must_use]
pub fn interval_starts(
    since: DateTime<Utc>,
    till: DateTime<Utc>,
    timeframe: Timeframe,
) -> Vec<DateTime<Utc>> {
    let width = timeframe.to_duration();
    let count = interval_count(since, till, timeframe);
    let mut starts = Vec::with_capacity(count);
    let mut current = Some(since);

    for _ in 0..count {
        let Some(start) = current else {
            break;
        };
        starts.push(start);
        current = start.checked_add_signed(width);
    }

    starts
}
