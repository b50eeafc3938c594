// SQLite store data: observations, business hours, timezones
// Implements: ObservationSource, ScheduleSource

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::SqlitePool;
use storewatch_core::domain::{DomainError, Observation, OpenInterval, StoreId, StoreStatus};
use storewatch_core::error::{AppError, Result};
use storewatch_core::port::{ObservationSource, ScheduleSource};
use tracing::debug;

const TIME_FORMAT: &str = "%H:%M:%S";

pub struct SqliteStoreData {
    pool: SqlitePool,
}

impl SqliteStoreData {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert observations in one transaction. A sample with an existing
    /// `(store_id, timestamp)` replaces the stored status.
    pub async fn insert_observations(&self, observations: &[Observation]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for obs in observations {
            sqlx::query(
                r#"
                INSERT INTO store_status (store_id, timestamp_utc, status)
                VALUES (?, ?, ?)
                ON CONFLICT (store_id, timestamp_utc) DO UPDATE SET status = excluded.status
                "#,
            )
            .bind(&obs.store_id)
            .bind(obs.timestamp.timestamp_micros())
            .bind(obs.status.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(count = observations.len(), "Observations stored");
        Ok(observations.len() as u64)
    }

    /// Replace the business hours of every store present in `hours`.
    ///
    /// All intervals of a store must arrive in the same call.
    pub async fn replace_business_hours(&self, hours: &[(StoreId, OpenInterval)]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let mut stores: Vec<&str> = hours.iter().map(|(s, _)| s.as_str()).collect();
        stores.sort_unstable();
        stores.dedup();
        for store_id in stores {
            sqlx::query("DELETE FROM business_hours WHERE store_id = ?")
                .bind(store_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        for (store_id, interval) in hours {
            sqlx::query(
                r#"
                INSERT INTO business_hours (store_id, day_of_week, start_time_local, end_time_local)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(store_id)
            .bind(interval.weekday as i64)
            .bind(interval.start_local.format(TIME_FORMAT).to_string())
            .bind(interval.end_local.format(TIME_FORMAT).to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(hours.len() as u64)
    }

    /// Upsert timezone records (`store_id`, IANA name)
    pub async fn upsert_timezones(&self, timezones: &[(StoreId, String)]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for (store_id, timezone) in timezones {
            sqlx::query(
                r#"
                INSERT INTO store_timezone (store_id, timezone_str)
                VALUES (?, ?)
                ON CONFLICT (store_id) DO UPDATE SET timezone_str = excluded.timezone_str
                "#,
            )
            .bind(store_id)
            .bind(timezone)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(timezones.len() as u64)
    }
}

fn to_observation(store_id: String, timestamp_us: i64, status: String) -> Result<Observation> {
    let timestamp = DateTime::<Utc>::from_timestamp_micros(timestamp_us).ok_or_else(|| {
        AppError::Database(format!("timestamp {} out of range for {}", timestamp_us, store_id))
    })?;
    let status: StoreStatus = status.parse()?;
    Ok(Observation::new(store_id, timestamp, status))
}

fn parse_local_time(raw: &str) -> std::result::Result<NaiveTime, DomainError> {
    raw.trim()
        .parse::<NaiveTime>()
        .map_err(|e| DomainError::MalformedSchedule(format!("bad local time '{}': {}", raw, e)))
}

#[async_trait]
impl ObservationSource for SqliteStoreData {
    async fn known_stores(&self) -> Result<Vec<StoreId>> {
        sqlx::query_scalar(
            r#"
            SELECT store_id FROM store_status
            UNION SELECT store_id FROM business_hours
            UNION SELECT store_id FROM store_timezone
            ORDER BY store_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let max_us: Option<i64> = sqlx::query_scalar("SELECT MAX(timestamp_utc) FROM store_status")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        max_us
            .map(|us| {
                DateTime::<Utc>::from_timestamp_micros(us)
                    .ok_or_else(|| AppError::Database(format!("timestamp {} out of range", us)))
            })
            .transpose()
    }

    async fn list(
        &self,
        store_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Observation>> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            r#"
            SELECT store_id, timestamp_utc, status FROM store_status
            WHERE store_id = ? AND timestamp_utc >= ? AND timestamp_utc <= ?
            ORDER BY timestamp_utc ASC
            "#,
        )
        .bind(store_id)
        .bind(from.timestamp_micros())
        .bind(to.timestamp_micros())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(store, ts, status)| to_observation(store, ts, status))
            .collect()
    }

    async fn latest_before(
        &self,
        store_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Observation>> {
        let row: Option<(String, i64, String)> = sqlx::query_as(
            r#"
            SELECT store_id, timestamp_utc, status FROM store_status
            WHERE store_id = ? AND timestamp_utc < ?
            ORDER BY timestamp_utc DESC
            LIMIT 1
            "#,
        )
        .bind(store_id)
        .bind(before.timestamp_micros())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|(store, ts, status)| to_observation(store, ts, status))
            .transpose()
    }
}

#[async_trait]
impl ScheduleSource for SqliteStoreData {
    async fn timezone(&self, store_id: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT timezone_str FROM store_timezone WHERE store_id = ?")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn open_intervals(&self, store_id: &str) -> Result<Vec<OpenInterval>> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            r#"
            SELECT day_of_week, start_time_local, end_time_local FROM business_hours
            WHERE store_id = ?
            ORDER BY day_of_week, start_time_local
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut intervals = Vec::with_capacity(rows.len());
        for (day, start, end) in rows {
            let weekday = u8::try_from(day).map_err(|_| {
                DomainError::MalformedSchedule(format!("weekday {} out of range 0..=6", day))
            })?;
            intervals.push(OpenInterval::new(
                weekday,
                parse_local_time(&start)?,
                parse_local_time(&end)?,
            ));
        }
        Ok(intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use chrono::{Duration, TimeZone};

    async fn setup() -> SqliteStoreData {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteStoreData::new(pool)
    }

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 24, h, m, 0).unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_list_is_inclusive_and_sorted() {
        let data = setup().await;
        data.insert_observations(&[
            Observation::new("s1", ts(10, 30), StoreStatus::Inactive),
            Observation::new("s1", ts(10, 0), StoreStatus::Active),
            Observation::new("s1", ts(11, 0), StoreStatus::Active),
            Observation::new("s2", ts(10, 15), StoreStatus::Active),
        ])
        .await
        .unwrap();

        let obs = data.list("s1", ts(10, 0), ts(10, 30)).await.unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].timestamp, ts(10, 0));
        assert_eq!(obs[1].status, StoreStatus::Inactive);

        assert_eq!(data.latest_timestamp().await.unwrap(), Some(ts(11, 0)));
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_last_write_wins() {
        let data = setup().await;
        data.insert_observations(&[Observation::new("s1", ts(9, 0), StoreStatus::Active)])
            .await
            .unwrap();
        data.insert_observations(&[Observation::new("s1", ts(9, 0), StoreStatus::Inactive)])
            .await
            .unwrap();

        let obs = data.list("s1", ts(0, 0), ts(23, 0)).await.unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].status, StoreStatus::Inactive);
    }

    #[tokio::test]
    async fn test_sub_millisecond_samples_stay_distinct() {
        let data = setup().await;
        let first = ts(9, 0) + Duration::microseconds(388_884);
        let second = first + Duration::microseconds(200);
        data.insert_observations(&[
            Observation::new("s1", first, StoreStatus::Active),
            Observation::new("s1", second, StoreStatus::Inactive),
        ])
        .await
        .unwrap();

        let obs = data.list("s1", ts(0, 0), ts(23, 0)).await.unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].timestamp, first);
        assert_eq!(obs[1].timestamp, second);
        assert_eq!(data.latest_timestamp().await.unwrap(), Some(second));
        assert_eq!(
            data.latest_before("s1", second).await.unwrap().map(|o| o.timestamp),
            Some(first)
        );
    }

    #[tokio::test]
    async fn test_latest_before_is_strict() {
        let data = setup().await;
        data.insert_observations(&[
            Observation::new("s1", ts(8, 0), StoreStatus::Inactive),
            Observation::new("s1", ts(9, 0), StoreStatus::Active),
        ])
        .await
        .unwrap();

        let seed = data.latest_before("s1", ts(9, 0)).await.unwrap().unwrap();
        assert_eq!(seed.timestamp, ts(8, 0));
        assert!(data
            .latest_before("s1", ts(8, 0))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_known_stores_spans_all_tables() {
        let data = setup().await;
        assert!(data.latest_timestamp().await.unwrap().is_none());

        data.insert_observations(&[Observation::new("b", ts(9, 0), StoreStatus::Active)])
            .await
            .unwrap();
        data.replace_business_hours(&[("c".to_string(), OpenInterval::new(0, t(9), t(17)))])
            .await
            .unwrap();
        data.upsert_timezones(&[
            ("a".to_string(), "Asia/Tokyo".to_string()),
            ("b".to_string(), "America/Denver".to_string()),
        ])
        .await
        .unwrap();

        assert_eq!(data.known_stores().await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_schedule_roundtrip_and_replace() {
        let data = setup().await;
        data.replace_business_hours(&[
            ("s1".to_string(), OpenInterval::new(4, t(18), t(23))),
            ("s1".to_string(), OpenInterval::new(0, t(9), t(17))),
        ])
        .await
        .unwrap();

        let intervals = data.open_intervals("s1").await.unwrap();
        assert_eq!(intervals[0], OpenInterval::new(0, t(9), t(17)));
        assert_eq!(intervals.len(), 2);

        data.replace_business_hours(&[("s1".to_string(), OpenInterval::new(2, t(6), t(7)))])
            .await
            .unwrap();
        assert_eq!(
            data.open_intervals("s1").await.unwrap(),
            vec![OpenInterval::new(2, t(6), t(7))]
        );

        data.upsert_timezones(&[("s1".to_string(), "Europe/Paris".to_string())])
            .await
            .unwrap();
        assert_eq!(
            data.timezone("s1").await.unwrap().as_deref(),
            Some("Europe/Paris")
        );
        assert!(data.timezone("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_time_is_domain_error() {
        let data = setup().await;
        sqlx::query(
            "INSERT INTO business_hours (store_id, day_of_week, start_time_local, end_time_local) VALUES ('s1', 1, 'nine', '17:00:00')",
        )
        .execute(&data.pool)
        .await
        .unwrap();

        let err = data.open_intervals("s1").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::MalformedSchedule(_))
        ));
    }

    #[tokio::test]
    async fn test_list_outside_range_is_empty() {
        let data = setup().await;
        data.insert_observations(&[Observation::new("s1", ts(9, 0), StoreStatus::Active)])
            .await
            .unwrap();
        let later = ts(9, 0) + Duration::hours(1);
        assert!(data.list("s1", later, later + Duration::hours(1)).await.unwrap().is_empty());
    }
}
