// Schedule Domain Model (business hours + timezone)

use crate::domain::error::{DomainError, Result};
use chrono::{NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Zone applied when a store has no timezone record
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";

pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Raw business-hours record: `[start_local, end_local)` on one weekday.
///
/// `weekday` is 0 = Monday .. 6 = Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenInterval {
    pub weekday: u8,
    pub start_local: NaiveTime,
    pub end_local: NaiveTime,
}

impl OpenInterval {
    pub fn new(weekday: u8, start_local: NaiveTime, end_local: NaiveTime) -> Self {
        Self {
            weekday,
            start_local,
            end_local,
        }
    }
}

/// Half-open local span within one day, in seconds since local midnight.
///
/// `end_secs` may be [`SECONDS_PER_DAY`] (the following midnight).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySpan {
    start_secs: u32,
    end_secs: u32,
}

impl DailySpan {
    pub fn new(start_secs: u32, end_secs: u32) -> Result<Self> {
        if start_secs >= end_secs || end_secs > SECONDS_PER_DAY {
            return Err(DomainError::MalformedSchedule(format!(
                "invalid daily span {}s..{}s",
                start_secs, end_secs
            )));
        }
        Ok(Self {
            start_secs,
            end_secs,
        })
    }

    pub fn full_day() -> Self {
        Self {
            start_secs: 0,
            end_secs: SECONDS_PER_DAY,
        }
    }

    pub fn start_secs(&self) -> u32 {
        self.start_secs
    }

    pub fn end_secs(&self) -> u32 {
        self.end_secs
    }
}

/// Last whole second of the day, the usual way to write "until closing at midnight"
const LAST_SECOND_OF_DAY: u32 = SECONDS_PER_DAY - 1;

/// Seconds since midnight for an interval end. A `00:00:00` end after a later
/// start, and a `23:59:59` end, both mean the following midnight.
fn end_of_interval_secs(start_secs: u32, end_local: NaiveTime) -> u32 {
    let end = end_local.num_seconds_from_midnight();
    let whole_second = end_local.nanosecond() == 0;
    match end {
        0 if start_secs > 0 => SECONDS_PER_DAY,
        LAST_SECOND_OF_DAY if whole_second => SECONDS_PER_DAY,
        _ => end,
    }
}

/// Schedule after default substitution.
///
/// Produced once per store by the schedule resolver; downstream code never
/// has to care whether the timezone or hours were missing.
#[derive(Debug, Clone)]
pub struct ResolvedSchedule {
    timezone: Tz,
    days: [Vec<DailySpan>; 7],
    always_open: bool,
}

impl ResolvedSchedule {
    /// Open 24x7 in the given zone
    pub fn always_open(timezone: Tz) -> Self {
        Self {
            timezone,
            days: std::array::from_fn(|_| vec![DailySpan::full_day()]),
            always_open: true,
        }
    }

    /// Build from raw intervals. No intervals at all means always open;
    /// otherwise weekdays without intervals are closed.
    pub fn from_intervals(timezone: Tz, intervals: &[OpenInterval]) -> Result<Self> {
        if intervals.is_empty() {
            return Ok(Self::always_open(timezone));
        }

        let mut days: [Vec<DailySpan>; 7] = Default::default();
        for interval in intervals {
            if interval.weekday > 6 {
                return Err(DomainError::MalformedSchedule(format!(
                    "weekday {} out of range 0..=6",
                    interval.weekday
                )));
            }
            let start = interval.start_local.num_seconds_from_midnight();
            let end = end_of_interval_secs(start, interval.end_local);
            if start > end {
                return Err(DomainError::MalformedSchedule(format!(
                    "interval ends before it starts ({} > {}) on weekday {}",
                    interval.start_local, interval.end_local, interval.weekday
                )));
            }
            if start == end {
                continue; // empty
            }
            days[interval.weekday as usize].push(DailySpan::new(start, end)?);
        }

        for spans in days.iter_mut() {
            spans.sort_by_key(|s| s.start_secs);
        }

        Ok(Self {
            timezone,
            days,
            always_open: false,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn is_always_open(&self) -> bool {
        self.always_open
    }

    pub fn spans_for(&self, weekday: Weekday) -> &[DailySpan] {
        &self.days[weekday.num_days_from_monday() as usize]
    }
}

/// Parse an IANA zone name, substituting the default when absent.
pub fn parse_timezone(name: Option<&str>) -> Result<Tz> {
    let name = match name.map(str::trim) {
        Some(n) if !n.is_empty() => n,
        _ => DEFAULT_TIMEZONE,
    };
    name.parse::<Tz>()
        .map_err(|_| DomainError::InvalidTimezone(name.to_string()))
}
