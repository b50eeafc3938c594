//! Local wall-clock to UTC conversion for schedule edges.
//!
//! Business hours are stored as local wall-clock times. Each occurrence is
//! converted on its own date, so a DST switch inside a window moves the UTC
//! edges of the affected days only.
//!
//! - Ambiguous local times (fall-back, the wall time occurs twice) resolve
//!   according to [`DstPolicy`].
//! - Nonexistent local times (spring-forward gap) move forward minute by
//!   minute to the first valid instant, capped at three hours.

use crate::domain::error::{DomainError, Result};
use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Maximum forward shift when a local time falls into a DST gap
const MAX_GAP_SHIFT_MINUTES: i64 = 180;

/// Policy for ambiguous (fall-back) local times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstPolicy {
    /// Pick the earlier instant (typically the DST occurrence)
    PreferEarliest,
    /// Pick the later instant (typically the standard-time occurrence)
    PreferLatest,
}

/// Convert a naive local timestamp in `tz` to UTC.
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Result<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, latest) => Ok(match policy {
            DstPolicy::PreferEarliest => earliest.with_timezone(&Utc),
            DstPolicy::PreferLatest => latest.with_timezone(&Utc),
        }),
        LocalResult::None => {
            let mut shifted = naive;
            for _ in 0..MAX_GAP_SHIFT_MINUTES {
                shifted += Duration::minutes(1);
                match tz.from_local_datetime(&shifted) {
                    LocalResult::Single(dt) => return Ok(dt.with_timezone(&Utc)),
                    LocalResult::Ambiguous(earliest, _) => return Ok(earliest.with_timezone(&Utc)),
                    LocalResult::None => continue,
                }
            }
            Err(DomainError::UnrepresentableLocalTime(format!(
                "{} in {}",
                naive,
                tz.name()
            )))
        }
    }
}
