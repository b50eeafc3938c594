// Store maintenance port (report retention, artifact cleanup, VACUUM)
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Database maintenance statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub report_count: i64,
    pub finished_report_count: i64,
    pub running_count: i64,
    pub complete_count: i64,
    pub failed_count: i64,
    pub observation_count: i64,
    pub business_hour_count: i64,
    pub timezone_count: i64,
    pub artifact_count: usize,
    pub fragmentation_percent: f64,
}

/// Maintenance configuration
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Retention period for finished reports (days)
    pub finished_report_retention_days: i64,

    /// Maximum DB size before forcing VACUUM (MB)
    pub max_db_size_mb: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            finished_report_retention_days: 7,
            max_db_size_mb: 1000.0, // 1GB max
        }
    }
}

/// Database maintenance operations
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Run VACUUM to reclaim space and optimize DB
    ///
    /// # Returns
    /// Space reclaimed in MB
    async fn vacuum(&self) -> Result<f64>;

    /// Delete finished reports (rows and faults included) older than the
    /// retention period. Running reports are never touched.
    ///
    /// # Returns
    /// Number of reports deleted
    async fn gc_finished_reports(&self, retention_days: i64) -> Result<i64>;

    /// Delete artifact files of reports that are about to be collected
    ///
    /// # Returns
    /// Number of artifacts deleted
    async fn gc_artifacts(&self, retention_days: i64) -> Result<usize>;

    /// Get maintenance statistics
    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// Run full maintenance (artifact GC, report GC, VACUUM when oversized)
    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<MaintenanceStats> {
        let stats_before = self.get_stats().await?;

        // Artifacts first: their paths live on the report rows we delete next
        let deleted_artifacts = self
            .gc_artifacts(config.finished_report_retention_days)
            .await?;

        let deleted_reports = self
            .gc_finished_reports(config.finished_report_retention_days)
            .await?;

        let reclaimed_mb = if stats_before.db_size_mb > config.max_db_size_mb {
            self.vacuum().await?
        } else {
            0.0
        };

        let stats_after = self.get_stats().await?;

        tracing::info!(
            deleted_reports = deleted_reports,
            deleted_artifacts = deleted_artifacts,
            reclaimed_mb = reclaimed_mb,
            db_size_mb = stats_after.db_size_mb,
            "Maintenance completed"
        );

        Ok(stats_after)
    }
}
