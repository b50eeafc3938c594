// Maintenance Service
// Scheduled report retention and DB upkeep

use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, MaintenanceStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Maintenance scheduler
///
/// Runs periodic maintenance operations (artifact GC, report GC, VACUUM)
/// in the background until shutdown is signalled.
pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    period: Duration,
}

impl MaintenanceScheduler {
    /// # Arguments
    /// * `maintenance` - Maintenance implementation
    /// * `config` - Maintenance configuration
    /// * `period` - How often to run maintenance
    pub fn new(maintenance: Arc<dyn Maintenance>, config: MaintenanceConfig, period: Duration) -> Self {
        Self {
            maintenance,
            config,
            period,
        }
    }

    /// Run maintenance loop (spawn with tokio::spawn).
    ///
    /// The first pass runs immediately.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            period_secs = self.period.as_secs(),
            retention_days = self.config.finished_report_retention_days,
            "Maintenance scheduler started"
        );

        let mut tick = interval(self.period);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => {
                    info!("Maintenance scheduler stopped");
                    return;
                }
            }

            info!("Running scheduled maintenance...");

            match self.maintenance.run_full_maintenance(&self.config).await {
                Ok(stats) => {
                    info!(
                        db_size_mb = stats.db_size_mb,
                        report_count = stats.report_count,
                        finished_reports = stats.finished_report_count,
                        artifacts = stats.artifact_count,
                        "Scheduled maintenance completed successfully"
                    );
                }
                Err(e) => {
                    error!(error = ?e, "Scheduled maintenance failed");
                }
            }
        }
    }

    /// Run maintenance immediately (for manual trigger)
    pub async fn run_now(&self) -> Result<MaintenanceStats> {
        info!("Running manual maintenance...");
        let stats = self.maintenance.run_full_maintenance(&self.config).await?;
        info!(
            db_size_mb = stats.db_size_mb,
            report_count = stats.report_count,
            "Manual maintenance completed"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingMaintenance {
        gc_runs: AtomicUsize,
        vacuums: AtomicUsize,
    }

    #[async_trait]
    impl Maintenance for CountingMaintenance {
        async fn vacuum(&self) -> Result<f64> {
            self.vacuums.fetch_add(1, Ordering::SeqCst);
            Ok(0.5)
        }

        async fn gc_finished_reports(&self, _retention_days: i64) -> Result<i64> {
            self.gc_runs.fetch_add(1, Ordering::SeqCst);
            Ok(3)
        }

        async fn gc_artifacts(&self, _retention_days: i64) -> Result<usize> {
            Ok(3)
        }

        async fn get_stats(&self) -> Result<MaintenanceStats> {
            Ok(MaintenanceStats {
                db_size_mb: 10.0,
                ..MaintenanceStats::default()
            })
        }
    }

    #[tokio::test]
    async fn test_run_now_skips_vacuum_below_threshold() {
        let maintenance = Arc::new(CountingMaintenance::default());
        let scheduler = MaintenanceScheduler::new(
            maintenance.clone(),
            MaintenanceConfig::default(),
            Duration::from_secs(3600),
        );

        scheduler.run_now().await.unwrap();
        assert_eq!(maintenance.gc_runs.load(Ordering::SeqCst), 1);
        assert_eq!(maintenance.vacuums.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_db_is_vacuumed() {
        let maintenance = Arc::new(CountingMaintenance::default());
        let config = MaintenanceConfig {
            max_db_size_mb: 1.0,
            ..MaintenanceConfig::default()
        };
        let scheduler = MaintenanceScheduler::new(maintenance.clone(), config, Duration::from_secs(3600));

        scheduler.run_now().await.unwrap();
        assert_eq!(maintenance.vacuums.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loop_runs_once_then_stops_on_shutdown() {
        let maintenance = Arc::new(CountingMaintenance::default());
        let scheduler = MaintenanceScheduler::new(
            maintenance.clone(),
            MaintenanceConfig::default(),
            Duration::from_secs(3600),
        );
        let (tx, token) = shutdown_channel();

        let handle = tokio::spawn(scheduler.run(token));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.shutdown();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(maintenance.gc_runs.load(Ordering::SeqCst), 1);
    }
}
