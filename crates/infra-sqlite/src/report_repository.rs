// SQLite ReportRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use storewatch_core::domain::{ReportJob, ReportState, StoreFault, WindowResult};
use storewatch_core::error::{AppError, Result};
use storewatch_core::port::ReportRepository;

pub struct SqliteReportRepository {
    pool: SqlitePool,
}

impl SqliteReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_rows(&self, report_id: &str) -> Result<Vec<WindowResult>> {
        let rows = sqlx::query_as::<_, WindowRow>(
            r#"
            SELECT store_id, uptime_last_hour, downtime_last_hour, uptime_last_day,
                   downtime_last_day, uptime_last_week, downtime_last_week
            FROM report_rows WHERE report_id = ?
            ORDER BY store_id
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(WindowRow::into_result).collect())
    }

    async fn load_faults(&self, report_id: &str) -> Result<Vec<StoreFault>> {
        let faults: Vec<(String, String)> = sqlx::query_as(
            "SELECT store_id, message FROM report_store_faults WHERE report_id = ? ORDER BY rowid",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(faults
            .into_iter()
            .map(|(store_id, message)| StoreFault::new(store_id, message))
            .collect())
    }
}

#[async_trait]
impl ReportRepository for SqliteReportRepository {
    async fn insert(&self, job: &ReportJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, state, created_at, finished_at, anchor_time, artifact, error)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.state.to_string())
        .bind(job.created_at)
        .bind(job.finished_at)
        .bind(job.anchor_time.map(|t| t.timestamp_millis()))
        .bind(&job.artifact)
        .bind(&job.error)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ReportJob>> {
        let row = sqlx::query_as::<_, ReportRow>("SELECT * FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut job = row.into_job()?;
        if job.state == ReportState::Complete {
            job.rows = self.load_rows(id).await?;
            job.store_faults = self.load_faults(id).await?;
        }
        Ok(Some(job))
    }

    async fn finish(&self, job: &ReportJob) -> Result<()> {
        // State, rows and faults land together or not at all
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE reports
            SET state = ?, finished_at = ?, anchor_time = ?, artifact = ?, error = ?
            WHERE id = ?
              AND state = 'RUNNING'
            "#,
        )
        .bind(job.state.to_string())
        .bind(job.finished_at)
        .bind(job.anchor_time.map(|t| t.timestamp_millis()))
        .bind(&job.artifact)
        .bind(&job.error)
        .bind(&job.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            let current: Option<String> = sqlx::query_scalar("SELECT state FROM reports WHERE id = ?")
                .bind(&job.id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            return match current {
                None => Err(AppError::NotFound(format!("Report {} not found", job.id))),
                Some(current_state) => Err(AppError::InvalidState(format!(
                    "Cannot update report {} from {} to {}",
                    job.id, current_state, job.state
                ))),
            };
        }

        for row in &job.rows {
            sqlx::query(
                r#"
                INSERT INTO report_rows (
                    report_id, store_id, uptime_last_hour, downtime_last_hour,
                    uptime_last_day, downtime_last_day, uptime_last_week, downtime_last_week
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&job.id)
            .bind(&row.store_id)
            .bind(row.uptime_last_hour)
            .bind(row.downtime_last_hour)
            .bind(row.uptime_last_day)
            .bind(row.downtime_last_day)
            .bind(row.uptime_last_week)
            .bind(row.downtime_last_week)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        for fault in &job.store_faults {
            sqlx::query(
                "INSERT INTO report_store_faults (report_id, store_id, message) VALUES (?, ?, ?)",
            )
            .bind(&job.id)
            .bind(&fault.store_id)
            .bind(&fault.message)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_by_state(&self, state: ReportState) -> Result<Vec<ReportJob>> {
        let rows = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT * FROM reports
            WHERE state = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(ReportRow::into_job).collect()
    }

    async fn count_by_state(&self, state: ReportState) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE state = ?")
            .bind(state.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: String,
    state: String,
    created_at: i64,
    finished_at: Option<i64>,
    anchor_time: Option<i64>,
    artifact: Option<String>,
    error: Option<String>,
}

impl ReportRow {
    fn into_job(self) -> Result<ReportJob> {
        let state: ReportState = self.state.parse()?;
        let anchor_time = self
            .anchor_time
            .map(|ms| {
                DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
                    AppError::Database(format!("anchor time {} out of range", ms))
                })
            })
            .transpose()?;

        Ok(ReportJob {
            id: self.id,
            state,
            created_at: self.created_at,
            finished_at: self.finished_at,
            anchor_time,
            rows: Vec::new(),
            store_faults: Vec::new(),
            artifact: self.artifact,
            error: self.error,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WindowRow {
    store_id: String,
    uptime_last_hour: f64,
    downtime_last_hour: f64,
    uptime_last_day: f64,
    downtime_last_day: f64,
    uptime_last_week: f64,
    downtime_last_week: f64,
}

impl WindowRow {
    fn into_result(self) -> WindowResult {
        WindowResult {
            store_id: self.store_id,
            uptime_last_hour: self.uptime_last_hour,
            downtime_last_hour: self.downtime_last_hour,
            uptime_last_day: self.uptime_last_day,
            downtime_last_day: self.downtime_last_day,
            uptime_last_week: self.uptime_last_week,
            downtime_last_week: self.downtime_last_week,
        }
    }
}
