//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from api-rpc crate.

use serde::{Deserialize, Serialize};

/// Response from report.trigger.v1
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerResponse {
    pub report_id: String,
}

/// Poll result from report.get.v1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ReportStatus {
    Running,
    Complete { file: String, store_faults: usize },
    Failed { error: String },
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Running)
    }
}

/// Response from admin.stats.v1
#[derive(Debug, Clone, Deserialize)]
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

/// Response from admin.maintenance.v1
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceResponse {
    pub vacuum_run: bool,
    pub reports_deleted: i64,
    pub artifacts_deleted: i64,
    pub db_size_before: i64,
    pub db_size_after: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_status_wire_format() {
        let running: ReportStatus = serde_json::from_value(json!({"status": "Running"})).unwrap();
        assert_eq!(running, ReportStatus::Running);
        assert!(!running.is_terminal());

        let complete: ReportStatus = serde_json::from_value(json!({
            "status": "Complete",
            "file": "/tmp/report_r.csv",
            "store_faults": 2
        }))
        .unwrap();
        assert_eq!(
            complete,
            ReportStatus::Complete {
                file: "/tmp/report_r.csv".to_string(),
                store_faults: 2
            }
        );
        assert!(complete.is_terminal());
    }
}
