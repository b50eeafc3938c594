// SQLite Maintenance Implementation
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use storewatch_core::error::{AppError, Result};
use storewatch_core::port::{Maintenance, MaintenanceStats, TimeProvider};
use tracing::{info, warn};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// SQLite maintenance implementation
pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// (page_count, page_size, freelist_count)
    async fn page_stats(&self) -> Result<(i64, i64, i64)> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get page count: {}", e)))?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get page size: {}", e)))?;

        let freelist: i64 = sqlx::query_scalar("PRAGMA freelist_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get freelist count: {}", e)))?;

        Ok((page_count, page_size, freelist))
    }

    /// Get DB size in MB
    async fn get_db_size(&self) -> Result<f64> {
        let (page_count, page_size, _) = self.page_stats().await?;
        Ok((page_count * page_size) as f64 / (1024.0 * 1024.0))
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    fn cutoff(&self, retention_days: i64) -> i64 {
        self.time_provider.now_millis() - retention_days * MS_PER_DAY
    }
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        info!("Running VACUUM to optimize database...");

        let size_before = self.get_db_size().await?;

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("VACUUM failed: {}", e)))?;

        let size_after = self.get_db_size().await?;
        let reclaimed = (size_before - size_after).max(0.0);

        info!(
            size_before_mb = size_before,
            size_after_mb = size_after,
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn gc_finished_reports(&self, retention_days: i64) -> Result<i64> {
        let cutoff_time = self.cutoff(retention_days);

        info!(
            retention_days = retention_days,
            cutoff_time = cutoff_time,
            "Running finished report GC"
        );

        // rows and store faults cascade
        let result = sqlx::query(
            r#"
            DELETE FROM reports
            WHERE state IN ('COMPLETE', 'FAILED')
            AND finished_at IS NOT NULL
            AND finished_at < ?
            "#,
        )
        .bind(cutoff_time)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Report GC failed: {}", e)))?;

        let deleted = result.rows_affected() as i64;

        info!(deleted_reports = deleted, "Finished report GC completed");

        Ok(deleted)
    }

    async fn gc_artifacts(&self, retention_days: i64) -> Result<usize> {
        let cutoff_time = self.cutoff(retention_days);

        info!(
            retention_days = retention_days,
            cutoff_time = cutoff_time,
            "Running artifact GC"
        );

        let artifacts: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT artifact FROM reports
            WHERE state = 'COMPLETE'
            AND finished_at IS NOT NULL
            AND finished_at < ?
            AND artifact IS NOT NULL
            "#,
        )
        .bind(cutoff_time)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to query artifacts: {}", e)))?;

        let mut deleted_count = 0;

        for artifact in artifacts {
            match tokio::fs::remove_file(&artifact).await {
                Ok(_) => {
                    deleted_count += 1;
                    info!(path = %artifact, "Deleted report artifact");
                }
                Err(e) => {
                    // Not critical: the file may already be gone
                    warn!(path = %artifact, error = %e, "Failed to delete report artifact");
                }
            }
        }

        info!(deleted_artifacts = deleted_count, "Artifact GC completed");

        Ok(deleted_count)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let (page_count, page_size, freelist) = self.page_stats().await?;
        let db_size_bytes = page_count * page_size;
        let db_size_mb = db_size_bytes as f64 / (1024.0 * 1024.0);

        let report_count = self.count("SELECT COUNT(*) FROM reports").await?;
        let running_count = self
            .count("SELECT COUNT(*) FROM reports WHERE state = 'RUNNING'")
            .await?;
        let complete_count = self
            .count("SELECT COUNT(*) FROM reports WHERE state = 'COMPLETE'")
            .await?;
        let failed_count = self
            .count("SELECT COUNT(*) FROM reports WHERE state = 'FAILED'")
            .await?;
        let artifact_count = self
            .count("SELECT COUNT(*) FROM reports WHERE artifact IS NOT NULL")
            .await?;

        let observation_count = self.count("SELECT COUNT(*) FROM store_status").await?;
        let business_hour_count = self.count("SELECT COUNT(*) FROM business_hours").await?;
        let timezone_count = self.count("SELECT COUNT(*) FROM store_timezone").await?;

        let fragmentation_percent = if page_count > 0 {
            (freelist as f64 / page_count as f64) * 100.0
        } else {
            0.0
        };

        Ok(MaintenanceStats {
            db_size_mb,
            db_size_bytes,
            report_count,
            finished_report_count: complete_count + failed_count,
            running_count,
            complete_count,
            failed_count,
            observation_count,
            business_hour_count,
            timezone_count,
            artifact_count: artifact_count as usize,
            fragmentation_percent,
        })
    }
}
