//! RPC Method Handlers

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    GetReportRequest, MaintenanceRequest, MaintenanceResponse, ReportStatusResponse,
    StatsResponse, TriggerResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use storewatch_core::application::ReportService;
use storewatch_core::port::{Maintenance, MaintenanceConfig};
use tracing::{debug, warn};

/// VACUUM runs on manual maintenance once the free list passes this share
const VACUUM_FRAGMENTATION_PERCENT: f64 = 10.0;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    reports: Arc<ReportService>,
    maintenance: Arc<dyn Maintenance>,
    maintenance_config: MaintenanceConfig,
    rate_limiter: RateLimiter,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        reports: Arc<ReportService>,
        maintenance: Arc<dyn Maintenance>,
        maintenance_config: MaintenanceConfig,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            reports,
            maintenance,
            maintenance_config,
            rate_limiter,
            start_time: Instant::now(),
        }
    }

    /// report.trigger.v1
    pub async fn trigger(&self) -> Result<TriggerResponse, ErrorObjectOwned> {
        if !self.rate_limiter.check().await {
            warn!("Report trigger throttled");
            return Err(throttled());
        }

        let report_id = self.reports.trigger().await.map_err(to_rpc_error)?;
        Ok(TriggerResponse { report_id })
    }

    /// report.get.v1
    pub async fn get_report(
        &self,
        params: GetReportRequest,
    ) -> Result<ReportStatusResponse, ErrorObjectOwned> {
        debug!(report_id = %params.report_id, "Report polled");
        self.reports
            .poll(&params.report_id)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> Result<StatsResponse, ErrorObjectOwned> {
        let stats = self.maintenance.get_stats().await.map_err(to_rpc_error)?;

        Ok(StatsResponse {
            total_reports: stats.report_count,
            running_reports: stats.running_count,
            complete_reports: stats.complete_count,
            failed_reports: stats.failed_count,
            observation_count: stats.observation_count,
            business_hour_count: stats.business_hour_count,
            timezone_count: stats.timezone_count,
            artifact_count: stats.artifact_count as i64,
            db_size_bytes: stats.db_size_bytes,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }

    /// admin.maintenance.v1
    pub async fn maintenance(
        &self,
        params: MaintenanceRequest,
    ) -> Result<MaintenanceResponse, ErrorObjectOwned> {
        let stats_before = self.maintenance.get_stats().await.map_err(to_rpc_error)?;
        let retention_days = self.maintenance_config.finished_report_retention_days;

        // Artifact paths live on the report rows, so files go first
        let artifacts_deleted = self
            .maintenance
            .gc_artifacts(retention_days)
            .await
            .map_err(to_rpc_error)?;

        let reports_deleted = self
            .maintenance
            .gc_finished_reports(retention_days)
            .await
            .map_err(to_rpc_error)?;

        let vacuum_run = params.force_vacuum
            || stats_before.fragmentation_percent > VACUUM_FRAGMENTATION_PERCENT
            || stats_before.db_size_mb > self.maintenance_config.max_db_size_mb;
        if vacuum_run {
            self.maintenance.vacuum().await.map_err(to_rpc_error)?;
        }

        let stats_after = self.maintenance.get_stats().await.map_err(to_rpc_error)?;

        Ok(MaintenanceResponse {
            vacuum_run,
            reports_deleted,
            artifacts_deleted: artifacts_deleted as i64,
            db_size_before: stats_before.db_size_bytes,
            db_size_after: stats_after.db_size_bytes,
        })
    }
}
