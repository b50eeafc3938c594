// Schedule Resolver - raw schedule records to a ResolvedSchedule

use crate::domain::{parse_timezone, ResolvedSchedule};
use crate::error::Result;
use crate::port::ScheduleSource;
use std::sync::Arc;
use tracing::debug;

/// Applies the absence defaults: no timezone record means the default
/// zone, no business-hours records at all means always open.
#[derive(Clone)]
pub struct ScheduleResolver {
    source: Arc<dyn ScheduleSource>,
}

impl ScheduleResolver {
    pub fn new(source: Arc<dyn ScheduleSource>) -> Self {
        Self { source }
    }

    /// # Errors
    /// - `AppError::Domain` for an unknown zone name or malformed interval
    /// - whatever the source returns for a failed read
    pub async fn resolve(&self, store_id: &str) -> Result<ResolvedSchedule> {
        let tz_name = self.source.timezone(store_id).await?;
        let timezone = parse_timezone(tz_name.as_deref())?;

        let intervals = self.source.open_intervals(store_id).await?;
        if intervals.is_empty() {
            debug!(store_id = %store_id, timezone = %timezone, "No business hours, always open");
            return Ok(ResolvedSchedule::always_open(timezone));
        }

        Ok(ResolvedSchedule::from_intervals(timezone, &intervals)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, OpenInterval};
    use crate::error::AppError;
    use crate::port::observation_source::mocks::InMemoryStoreData;
    use chrono::{NaiveTime, Weekday};

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_for_unknown_store() {
        let data = Arc::new(InMemoryStoreData::new());
        let resolver = ScheduleResolver::new(data);

        let schedule = resolver.resolve("ghost").await.unwrap();
        assert!(schedule.is_always_open());
        assert_eq!(schedule.timezone(), chrono_tz::America::Chicago);
    }

    #[tokio::test]
    async fn test_partial_week_closes_missing_days() {
        let data = Arc::new(InMemoryStoreData::new());
        data.set_timezone("s1", "Asia/Tokyo");
        data.add_interval("s1", OpenInterval::new(0, t(9), t(17)));
        let resolver = ScheduleResolver::new(data);

        let schedule = resolver.resolve("s1").await.unwrap();
        assert!(!schedule.is_always_open());
        assert_eq!(schedule.timezone(), chrono_tz::Asia::Tokyo);
        assert_eq!(schedule.spans_for(Weekday::Mon).len(), 1);
        assert!(schedule.spans_for(Weekday::Tue).is_empty());
    }

    #[tokio::test]
    async fn test_bad_timezone_is_domain_error() {
        let data = Arc::new(InMemoryStoreData::new());
        data.set_timezone("s1", "Mars/Olympus");
        let resolver = ScheduleResolver::new(data);

        let err = resolver.resolve("s1").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidTimezone(_))
        ));
    }

    #[tokio::test]
    async fn test_inverted_interval_is_malformed() {
        let data = Arc::new(InMemoryStoreData::new());
        data.add_interval("s1", OpenInterval::new(2, t(18), t(9)));
        let resolver = ScheduleResolver::new(data);

        let err = resolver.resolve("s1").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::MalformedSchedule(_))
        ));
    }
    #[tokio::test]
    async fn test_midnight_close_resolves_to_end_of_day() {
        let data = Arc::new(InMemoryStoreData::new());
        data.add_interval("s1", OpenInterval::new(2, t(9), t(0)));
        let resolver = ScheduleResolver::new(data);

        let schedule = resolver.resolve("s1").await.unwrap();
        let spans = schedule.spans_for(Weekday::Wed);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end_secs(), 24 * 3600);
    }
}
