// Report Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::observation::StoreId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Report ID (UUID v4, opaque to callers)
pub type ReportId = String;

/// Output columns, in order
pub const REPORT_COLUMNS: [&str; 7] = [
    "store_id",
    "uptime_last_hour",
    "downtime_last_hour",
    "uptime_last_day",
    "downtime_last_day",
    "uptime_last_week",
    "downtime_last_week",
];

/// Trailing window measured back from the anchor time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportWindow {
    LastHour,
    LastDay,
    LastWeek,
}

/// Reporting unit of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Minutes,
    Hours,
}

impl WindowUnit {
    pub fn seconds(&self) -> f64 {
        match self {
            WindowUnit::Minutes => 60.0,
            WindowUnit::Hours => 3600.0,
        }
    }
}

impl ReportWindow {
    pub const ALL: [ReportWindow; 3] = [
        ReportWindow::LastHour,
        ReportWindow::LastDay,
        ReportWindow::LastWeek,
    ];

    pub fn duration(&self) -> Duration {
        match self {
            ReportWindow::LastHour => Duration::hours(1),
            ReportWindow::LastDay => Duration::days(1),
            ReportWindow::LastWeek => Duration::weeks(1),
        }
    }

    /// Minutes for the hour window, hours for day and week.
    pub fn unit(&self) -> WindowUnit {
        match self {
            ReportWindow::LastHour => WindowUnit::Minutes,
            ReportWindow::LastDay | ReportWindow::LastWeek => WindowUnit::Hours,
        }
    }

    /// Window start for a given anchor
    pub fn start(&self, anchor: DateTime<Utc>) -> DateTime<Utc> {
        anchor - self.duration()
    }
}

/// Uptime/downtime for one window, already in the window's unit
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowEstimate {
    pub uptime: f64,
    pub downtime: f64,
}

/// One report row per store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub store_id: StoreId,
    pub uptime_last_hour: f64,
    pub downtime_last_hour: f64,
    pub uptime_last_day: f64,
    pub downtime_last_day: f64,
    pub uptime_last_week: f64,
    pub downtime_last_week: f64,
}

impl WindowResult {
    /// Row with every figure at zero
    pub fn zero(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            uptime_last_hour: 0.0,
            downtime_last_hour: 0.0,
            uptime_last_day: 0.0,
            downtime_last_day: 0.0,
            uptime_last_week: 0.0,
            downtime_last_week: 0.0,
        }
    }

    pub fn record(&mut self, window: ReportWindow, estimate: WindowEstimate) {
        let (up, down) = match window {
            ReportWindow::LastHour => (&mut self.uptime_last_hour, &mut self.downtime_last_hour),
            ReportWindow::LastDay => (&mut self.uptime_last_day, &mut self.downtime_last_day),
            ReportWindow::LastWeek => (&mut self.uptime_last_week, &mut self.downtime_last_week),
        };
        *up = estimate.uptime;
        *down = estimate.downtime;
    }

    pub fn get(&self, window: ReportWindow) -> WindowEstimate {
        let (uptime, downtime) = match window {
            ReportWindow::LastHour => (self.uptime_last_hour, self.downtime_last_hour),
            ReportWindow::LastDay => (self.uptime_last_day, self.downtime_last_day),
            ReportWindow::LastWeek => (self.uptime_last_week, self.downtime_last_week),
        };
        WindowEstimate { uptime, downtime }
    }
}

/// Diagnostic for a store whose row could not be computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFault {
    pub store_id: StoreId,
    pub message: String,
}

impl StoreFault {
    pub fn new(store_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            message: message.into(),
        }
    }
}

/// Report job state. `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportState {
    Running,
    Complete,
    Failed,
}

impl ReportState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportState::Running)
    }
}

impl std::fmt::Display for ReportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportState::Running => write!(f, "RUNNING"),
            ReportState::Complete => write!(f, "COMPLETE"),
            ReportState::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for ReportState {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(ReportState::Running),
            "COMPLETE" => Ok(ReportState::Complete),
            "FAILED" => Ok(ReportState::Failed),
            other => Err(DomainError::ValidationError(format!(
                "unknown report state '{}'",
                other
            ))),
        }
    }
}

/// Report Job Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportJob {
    pub id: ReportId,
    pub state: ReportState,

    pub created_at: i64, // epoch ms
    pub finished_at: Option<i64>,

    /// Latest observation across all stores, frozen at execution start.
    /// `None` when there were no observations at all.
    pub anchor_time: Option<DateTime<Utc>>,

    pub rows: Vec<WindowResult>,
    pub store_faults: Vec<StoreFault>,

    pub artifact: Option<String>,
    pub error: Option<String>,
}

impl ReportJob {
    /// Create a new job in `Running` state
    ///
    /// # Arguments
    ///
    /// * `id` - Unique report ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            state: ReportState::Running,
            created_at,
            finished_at: None,
            anchor_time: None,
            rows: Vec::new(),
            store_faults: Vec::new(),
            artifact: None,
            error: None,
        }
    }

    /// Transition to Complete, attaching rows and the artifact handle
    pub fn complete(
        &mut self,
        now_millis: i64,
        anchor_time: Option<DateTime<Utc>>,
        rows: Vec<WindowResult>,
        store_faults: Vec<StoreFault>,
        artifact: impl Into<String>,
    ) -> Result<()> {
        self.ensure_running(ReportState::Complete)?;
        self.state = ReportState::Complete;
        self.finished_at = Some(now_millis);
        self.anchor_time = anchor_time;
        self.rows = rows;
        self.store_faults = store_faults;
        self.artifact = Some(artifact.into());
        Ok(())
    }

    /// Transition to Failed with a diagnostic. No rows are exposed.
    pub fn fail(&mut self, now_millis: i64, error: impl Into<String>) -> Result<()> {
        self.ensure_running(ReportState::Failed)?;
        self.state = ReportState::Failed;
        self.finished_at = Some(now_millis);
        self.rows.clear();
        self.store_faults.clear();
        self.artifact = None;
        self.error = Some(error.into());
        Ok(())
    }

    fn ensure_running(&self, to: ReportState) -> Result<()> {
        if self.state != ReportState::Running {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

/// Poll snapshot of a report job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ReportStatus {
    Running,
    Complete { file: String, store_faults: usize },
    Failed { error: String },
}

impl From<&ReportJob> for ReportStatus {
    fn from(job: &ReportJob) -> Self {
        match job.state {
            ReportState::Running => ReportStatus::Running,
            ReportState::Complete => ReportStatus::Complete {
                file: job.artifact.clone().unwrap_or_default(),
                store_faults: job.store_faults.len(),
            },
            ReportState::Failed => ReportStatus::Failed {
                error: job
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
        }
    }
}
