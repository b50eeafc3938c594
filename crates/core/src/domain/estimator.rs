//! Interval Estimator - uptime/downtime from sparse status samples
//!
//! Status is modelled as a right-continuous step function: the status seen at
//! `t` holds on `[t, next)`, and the last sample in a window holds until the
//! window end. That step function is intersected with the store's business
//! hours (mapped to UTC per local date) and the overlaps are summed per
//! status. Only spans covered by the step function count; anything outside
//! its domain contributes to neither figure.

use crate::domain::error::Result;
use crate::domain::local_time::{local_to_utc, DstPolicy};
use crate::domain::observation::{Observation, StoreStatus};
use crate::domain::report::{ReportWindow, WindowEstimate};
use crate::domain::schedule::ResolvedSchedule;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

/// Half-open UTC span `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UtcSpan {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Intersection, or `None` when the spans do not overlap
    pub fn intersect(&self, other: &UtcSpan) -> Option<UtcSpan> {
        let span = UtcSpan::new(self.start.max(other.start), self.end.min(other.end));
        (!span.is_empty()).then_some(span)
    }

    pub fn length(&self) -> Duration {
        if self.is_empty() {
            Duration::zero()
        } else {
            self.end - self.start
        }
    }
}

/// Constant-status piece of the step function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSegment {
    pub span: UtcSpan,
    pub status: StoreStatus,
}

/// Tunables for the estimator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EstimatorPolicy {
    /// With no observation before the window, apply the first in-window
    /// status backward to the window start. Off: that span stays unknown.
    pub backfill_before_first: bool,
}

/// Business-open sub-spans of `window`, in UTC, ordered and non-overlapping.
pub fn business_spans(schedule: &ResolvedSchedule, window: &UtcSpan) -> Result<Vec<UtcSpan>> {
    if window.is_empty() {
        return Ok(Vec::new());
    }
    if schedule.is_always_open() {
        return Ok(vec![*window]);
    }

    let tz = schedule.timezone();
    // one extra local day on each side covers spans crossing UTC midnight
    let first_day = window.start.with_timezone(&tz).date_naive();
    let first_day = first_day.pred_opt().unwrap_or(first_day);
    let last_day = window.end.with_timezone(&tz).date_naive();
    let last_day = last_day.succ_opt().unwrap_or(last_day);

    let mut spans = Vec::new();
    for day in first_day.iter_days().take_while(|d| *d <= last_day) {
        let midnight = day.and_time(NaiveTime::MIN);
        for daily in schedule.spans_for(day.weekday()) {
            let start = local_to_utc(
                midnight + Duration::seconds(i64::from(daily.start_secs())),
                tz,
                DstPolicy::PreferEarliest,
            )?;
            let end = local_to_utc(
                midnight + Duration::seconds(i64::from(daily.end_secs())),
                tz,
                DstPolicy::PreferLatest,
            )?;
            if let Some(clipped) = UtcSpan::new(start, end).intersect(window) {
                spans.push(clipped);
            }
        }
    }

    Ok(merge_spans(spans))
}

fn merge_spans(mut spans: Vec<UtcSpan>) -> Vec<UtcSpan> {
    spans.sort_by_key(|s| s.start);
    let mut merged: Vec<UtcSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// Step function restricted to `window`.
///
/// `observations` must be ordered by timestamp with unique timestamps. The
/// last observation strictly before the window seeds the span up to the
/// first in-window sample; observations after the window end are ignored.
pub fn status_segments(
    observations: &[Observation],
    window: &UtcSpan,
    policy: EstimatorPolicy,
) -> Vec<StatusSegment> {
    let first = observations.partition_point(|o| o.timestamp < window.start);
    let last = observations.partition_point(|o| o.timestamp <= window.end);
    let in_window = &observations[first..last.max(first)];
    let seed = first.checked_sub(1).map(|i| &observations[i]);

    let mut segments = Vec::with_capacity(in_window.len() + 1);
    let mut push = |start: DateTime<Utc>, end: DateTime<Utc>, status: StoreStatus| {
        let span = UtcSpan::new(start, end);
        if !span.is_empty() {
            segments.push(StatusSegment { span, status });
        }
    };

    let lead_status = match (seed, in_window.first()) {
        (Some(prior), _) => Some(prior.status),
        (None, Some(first_obs)) if policy.backfill_before_first => Some(first_obs.status),
        _ => None,
    };
    if let Some(status) = lead_status {
        let until = in_window.first().map_or(window.end, |o| o.timestamp);
        push(window.start, until, status);
    }

    for (i, obs) in in_window.iter().enumerate() {
        let until = in_window.get(i + 1).map_or(window.end, |next| next.timestamp);
        push(obs.timestamp, until, obs.status);
    }

    segments
}

/// Uptime/downtime of one store over one trailing window ending at `anchor`.
pub fn estimate(
    observations: &[Observation],
    schedule: &ResolvedSchedule,
    anchor: DateTime<Utc>,
    window: ReportWindow,
    policy: EstimatorPolicy,
) -> Result<WindowEstimate> {
    let bounds = UtcSpan::new(window.start(anchor), anchor);
    let segments = status_segments(observations, &bounds, policy);
    if segments.is_empty() {
        return Ok(WindowEstimate::default());
    }

    let open = business_spans(schedule, &bounds)?;

    let mut active = Duration::zero();
    let mut inactive = Duration::zero();
    for span in &open {
        for segment in &segments {
            if segment.span.start >= span.end {
                break;
            }
            if let Some(overlap) = span.intersect(&segment.span) {
                match segment.status {
                    StoreStatus::Active => active += overlap.length(),
                    StoreStatus::Inactive => inactive += overlap.length(),
                }
            }
        }
    }

    // single conversion at the end
    let unit_ms = window.unit().seconds() * 1000.0;
    Ok(WindowEstimate {
        uptime: active.num_milliseconds() as f64 / unit_ms,
        downtime: inactive.num_milliseconds() as f64 / unit_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::OpenInterval;
    use chrono::TimeZone;

    const EPS: f64 = 1e-9;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, d, h, m, 0).unwrap()
    }

    fn obs(ts: DateTime<Utc>, status: StoreStatus) -> Observation {
        Observation::new("s1", ts, status)
    }

    fn always_open() -> ResolvedSchedule {
        ResolvedSchedule::always_open(chrono_tz::UTC)
    }

    fn hours(start: (u32, u32), end: (u32, u32)) -> ResolvedSchedule {
        let intervals: Vec<_> = (0..7)
            .map(|wd| {
                OpenInterval::new(
                    wd,
                    NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
                    NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
                )
            })
            .collect();
        ResolvedSchedule::from_intervals(chrono_tz::UTC, &intervals).unwrap()
    }

    #[test]
    fn test_forward_extrapolation_of_last_status() {
        // (t0, active), (t0+40m, inactive), anchor t0+50m
        let t0 = utc(24, 10, 0);
        let anchor = t0 + Duration::minutes(50);
        let data = vec![
            obs(t0, StoreStatus::Active),
            obs(t0 + Duration::minutes(40), StoreStatus::Inactive),
        ];

        let est = estimate(
            &data,
            &always_open(),
            anchor,
            ReportWindow::LastHour,
            EstimatorPolicy::default(),
        )
        .unwrap();

        assert!((est.uptime - 40.0).abs() < EPS);
        assert!((est.downtime - 10.0).abs() < EPS);
    }

    #[test]
    fn test_no_observations_yields_zero() {
        let est = estimate(
            &[],
            &always_open(),
            utc(24, 10, 0),
            ReportWindow::LastWeek,
            EstimatorPolicy::default(),
        )
        .unwrap();
        assert_eq!(est, WindowEstimate::default());
    }

    #[test]
    fn test_single_sample_at_window_start_fills_window_only() {
        let anchor = utc(24, 10, 0);
        let data = vec![obs(anchor - Duration::hours(1), StoreStatus::Active)];
        let schedule = always_open();
        let policy = EstimatorPolicy::default();

        let hour = estimate(&data, &schedule, anchor, ReportWindow::LastHour, policy).unwrap();
        assert!((hour.uptime - 60.0).abs() < EPS);
        assert_eq!(hour.downtime, 0.0);

        // nothing is inferred for the 23h before the first sample
        let day = estimate(&data, &schedule, anchor, ReportWindow::LastDay, policy).unwrap();
        assert!((day.uptime - 1.0).abs() < EPS);
        assert_eq!(day.downtime, 0.0);
    }

    #[test]
    fn test_backfill_policy_extends_first_status_to_window_start() {
        let anchor = utc(24, 10, 0);
        let data = vec![obs(anchor - Duration::hours(1), StoreStatus::Inactive)];
        let policy = EstimatorPolicy {
            backfill_before_first: true,
        };

        let day = estimate(&data, &always_open(), anchor, ReportWindow::LastDay, policy).unwrap();
        assert_eq!(day.uptime, 0.0);
        assert!((day.downtime - 24.0).abs() < EPS);
    }

    #[test]
    fn test_prior_observation_seeds_window_start() {
        let anchor = utc(24, 10, 0);
        let data = vec![
            obs(utc(24, 8, 0), StoreStatus::Inactive),
            obs(utc(24, 9, 30), StoreStatus::Active),
        ];

        let hour = estimate(
            &data,
            &always_open(),
            anchor,
            ReportWindow::LastHour,
            EstimatorPolicy::default(),
        )
        .unwrap();

        // 09:00-09:30 inactive via seed, 09:30-10:00 active
        assert!((hour.uptime - 30.0).abs() < EPS);
        assert!((hour.downtime - 30.0).abs() < EPS);
    }

    #[test]
    fn test_sample_at_close_time_is_outside_open_interval() {
        // open 09:00-17:00 UTC; active from 12:00, inactive exactly at 17:00
        let anchor = utc(24, 18, 0);
        let data = vec![
            obs(utc(24, 12, 0), StoreStatus::Active),
            obs(utc(24, 17, 0), StoreStatus::Inactive),
        ];

        let day = estimate(
            &data,
            &hours((9, 0), (17, 0)),
            anchor,
            ReportWindow::LastDay,
            EstimatorPolicy::default(),
        )
        .unwrap();

        assert!((day.uptime - 5.0).abs() < EPS);
        assert_eq!(day.downtime, 0.0);
    }

    #[test]
    fn test_closed_hours_do_not_count() {
        // open 09:00-17:00; inactive all night, active from 09:00
        let anchor = utc(24, 10, 0);
        let data = vec![
            obs(utc(23, 20, 0), StoreStatus::Inactive),
            obs(utc(24, 9, 0), StoreStatus::Active),
        ];

        let day = estimate(
            &data,
            &hours((9, 0), (17, 0)),
            anchor,
            ReportWindow::LastDay,
            EstimatorPolicy::default(),
        )
        .unwrap();

        // 23rd 10:00-17:00 carries no sample yet (first at 20:00): unknown
        assert!((day.uptime - 1.0).abs() < EPS);
        assert_eq!(day.downtime, 0.0);
    }

    #[test]
    fn test_sum_never_exceeds_window() {
        let anchor = utc(24, 10, 0);
        let data: Vec<_> = (0..48)
            .map(|i| {
                let status = if i % 3 == 0 {
                    StoreStatus::Inactive
                } else {
                    StoreStatus::Active
                };
                obs(anchor - Duration::hours(30) + Duration::minutes(37 * i), status)
            })
            .collect();

        for window in ReportWindow::ALL {
            let est = estimate(
                &data,
                &always_open(),
                anchor,
                window,
                EstimatorPolicy::default(),
            )
            .unwrap();
            let capacity =
                window.duration().num_seconds() as f64 / window.unit().seconds();
            assert!(est.uptime + est.downtime <= capacity + EPS);
        }

        // seeded before the day window: full coverage
        let day = estimate(
            &data,
            &always_open(),
            anchor,
            ReportWindow::LastDay,
            EstimatorPolicy::default(),
        )
        .unwrap();
        assert!((day.uptime + day.downtime - 24.0).abs() < EPS);
    }

    #[test]
    fn test_business_spans_follow_dst_per_date() {
        // Chicago 09:00-17:00 across the 2023-03-12 spring-forward
        let intervals: Vec<_> = (0..7)
            .map(|wd| {
                OpenInterval::new(
                    wd,
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                )
            })
            .collect();
        let schedule =
            ResolvedSchedule::from_intervals(chrono_tz::America::Chicago, &intervals).unwrap();
        let window = UtcSpan::new(
            Utc.with_ymd_and_hms(2023, 3, 11, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 13, 0, 0, 0).unwrap(),
        );

        let spans = business_spans(&schedule, &window).unwrap();

        assert_eq!(
            spans,
            vec![
                // CST (-06:00)
                UtcSpan::new(
                    Utc.with_ymd_and_hms(2023, 3, 11, 15, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2023, 3, 11, 23, 0, 0).unwrap(),
                ),
                // CDT (-05:00)
                UtcSpan::new(
                    Utc.with_ymd_and_hms(2023, 3, 12, 14, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2023, 3, 12, 22, 0, 0).unwrap(),
                ),
            ]
        );
    }

    #[test]
    fn test_overlapping_intervals_are_merged() {
        let spans = merge_spans(vec![
            UtcSpan::new(utc(24, 12, 0), utc(24, 14, 0)),
            UtcSpan::new(utc(24, 9, 0), utc(24, 13, 0)),
            UtcSpan::new(utc(24, 15, 0), utc(24, 16, 0)),
        ]);
        assert_eq!(
            spans,
            vec![
                UtcSpan::new(utc(24, 9, 0), utc(24, 14, 0)),
                UtcSpan::new(utc(24, 15, 0), utc(24, 16, 0)),
            ]
        );
    }
    #[test]
    fn test_last_second_schedule_counts_full_week() {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        let intervals: Vec<_> = (0..7)
            .map(|wd| OpenInterval::new(wd, NaiveTime::MIN, last_second))
            .collect();
        let schedule = ResolvedSchedule::from_intervals(chrono_tz::UTC, &intervals).unwrap();

        let anchor = utc(25, 18, 0);
        let data = vec![
            obs(anchor - Duration::days(8), StoreStatus::Active),
            obs(anchor, StoreStatus::Active),
        ];

        let week = estimate(
            &data,
            &schedule,
            anchor,
            ReportWindow::LastWeek,
            EstimatorPolicy::default(),
        )
        .unwrap();
        assert_eq!(week.uptime, 168.0);
        assert_eq!(week.downtime, 0.0);
    }

    #[test]
    fn test_interval_closing_at_midnight() {
        // Wednesday 2023-01-25, open 09:00 until midnight
        let schedule = ResolvedSchedule::from_intervals(
            chrono_tz::UTC,
            &[OpenInterval::new(
                2,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::MIN,
            )],
        )
        .unwrap();

        let anchor = utc(26, 2, 0);
        let data = vec![
            obs(utc(24, 0, 0), StoreStatus::Active),
            obs(utc(25, 23, 0), StoreStatus::Inactive),
        ];

        let day = estimate(
            &data,
            &schedule,
            anchor,
            ReportWindow::LastDay,
            EstimatorPolicy::default(),
        )
        .unwrap();
        assert!((day.uptime - 14.0).abs() < EPS);
        assert!((day.downtime - 1.0).abs() < EPS);
    }
}
