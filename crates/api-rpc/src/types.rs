//! RPC Request/Response Types

use serde::{Deserialize, Serialize};

/// report.get.v1 result: `{status: "Running" | "Complete" | "Failed", ...}`
pub use storewatch_core::domain::ReportStatus as ReportStatusResponse;

/// report.trigger.v1 - Start a report (no parameters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub report_id: String,
}

/// report.get.v1 - Poll a report
#[derive(Debug, Deserialize)]
pub struct GetReportRequest {
    pub report_id: String,
}

/// admin.stats.v1 - Store and report statistics (no parameters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_reports: i64,
    pub running_reports: i64,
    pub complete_reports: i64,
    pub failed_reports: i64,
    pub observation_count: i64,
    pub business_hour_count: i64,
    pub timezone_count: i64,
    pub artifact_count: i64,
    pub db_size_bytes: i64,
    pub uptime_seconds: i64,
}

/// admin.maintenance.v1 - Run manual maintenance
#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub force_vacuum: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceResponse {
    pub vacuum_run: bool,
    pub reports_deleted: i64,
    pub artifacts_deleted: i64,
    pub db_size_before: i64,
    pub db_size_after: i64,
}
