// Report Job Orchestrator - trigger/poll over the job table

mod runner;

pub use runner::{ReportRunner, StoreEstimator};

use crate::application::constants::DEFAULT_REPORT_WORKERS;
use crate::application::schedule_resolver::ScheduleResolver;
use crate::domain::{EstimatorPolicy, ReportId, ReportJob, ReportStatus};
use crate::error::{AppError, Result};
use crate::port::{
    IdProvider, ObservationSource, ReportRepository, ReportSink, ScheduleSource, TimeProvider,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Orchestrator tuning
#[derive(Debug, Clone, Copy)]
pub struct ReportConfig {
    /// Max stores estimated concurrently
    pub workers: usize,
    pub policy: EstimatorPolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_REPORT_WORKERS,
            policy: EstimatorPolicy::default(),
        }
    }
}

/// Report service
///
/// `trigger` records a `Running` job and hands execution to a background
/// task; completion is communicated through the job table only.
pub struct ReportService {
    report_repo: Arc<dyn ReportRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    runner: Arc<ReportRunner>,
}

impl ReportService {
    pub fn new(
        report_repo: Arc<dyn ReportRepository>,
        observations: Arc<dyn ObservationSource>,
        schedules: Arc<dyn ScheduleSource>,
        sink: Arc<dyn ReportSink>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: ReportConfig,
    ) -> Self {
        let estimator = StoreEstimator::new(
            Arc::clone(&observations),
            ScheduleResolver::new(schedules),
            config.policy,
        );
        let runner = ReportRunner::new(
            Arc::clone(&report_repo),
            observations,
            sink,
            Arc::clone(&time_provider),
            estimator,
            config.workers,
        );

        Self {
            report_repo,
            id_provider,
            time_provider,
            runner: Arc::new(runner),
        }
    }

    /// Start a new report. Returns as soon as the job is recorded.
    pub async fn trigger(&self) -> Result<ReportId> {
        let id = self.id_provider.generate_id();
        let job = ReportJob::new(id.clone(), self.time_provider.now_millis());
        self.report_repo.insert(&job).await?;

        info!(report_id = %id, "Report triggered");

        let runner = Arc::clone(&self.runner);
        let repo = Arc::clone(&self.report_repo);
        let time_provider = Arc::clone(&self.time_provider);
        tokio::spawn(supervise(runner, repo, time_provider, job));

        Ok(id)
    }

    /// Snapshot of a job's state. Never blocks on execution.
    ///
    /// # Errors
    /// `AppError::NotFound` for an unknown report ID
    pub async fn poll(&self, report_id: &str) -> Result<ReportStatus> {
        let job = self.get(report_id).await?;
        Ok(ReportStatus::from(&job))
    }

    /// Full job record, rows and store faults included
    pub async fn get(&self, report_id: &str) -> Result<ReportJob> {
        self.report_repo
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))
    }
}

/// Runs the job in its own task so a panic anywhere in execution still
/// leaves the job terminal.
async fn supervise(
    runner: Arc<ReportRunner>,
    repo: Arc<dyn ReportRepository>,
    time_provider: Arc<dyn TimeProvider>,
    job: ReportJob,
) {
    let report_id = job.id.clone();
    let outcome = tokio::spawn({
        let job = job.clone();
        async move { runner.execute(job).await }
    })
    .await;

    let diagnostic = match outcome {
        Ok(Ok(_)) => return,
        Ok(Err(e)) => format!("report execution failed: {}", e),
        Err(join_err) => format!("report execution aborted: {}", join_err),
    };

    error!(report_id = %report_id, error = %diagnostic, "Marking report as failed");
    let mut failed = job;
    if let Err(e) = failed.fail(time_provider.now_millis(), diagnostic) {
        error!(report_id = %report_id, error = %e, "Cannot build failed state");
        return;
    }
    match repo.finish(&failed).await {
        Ok(()) => {}
        Err(AppError::InvalidState(_)) => {
            warn!(report_id = %report_id, "Report already terminal");
        }
        Err(e) => {
            error!(report_id = %report_id, error = %e, "Cannot persist failed state");
        }
    }
}

#[cfg(test)]
mod report_test;
