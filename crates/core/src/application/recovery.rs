// Crash recovery: reports orphaned by a daemon restart
use crate::application::constants::INTERRUPTED_BY_RESTART;
use crate::domain::ReportState;
use crate::error::{AppError, Result};
use crate::port::{ReportRepository, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Crash recovery service
///
/// Report execution lives in the daemon process, so a job that was
/// `Running` when the daemon stopped can never finish. On startup every
/// such job is moved to `Failed`.
pub struct RecoveryService {
    report_repo: Arc<dyn ReportRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RecoveryService {
    pub fn new(report_repo: Arc<dyn ReportRepository>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            report_repo,
            time_provider,
        }
    }

    /// Must run before the trigger surface is served.
    ///
    /// # Returns
    /// Number of reports recovered
    pub async fn recover_interrupted_reports(&self) -> Result<usize> {
        let running = self.report_repo.find_by_state(ReportState::Running).await?;
        info!(running = running.len(), "Starting interrupted report recovery");

        let mut recovered = 0;
        for mut job in running {
            job.fail(self.time_provider.now_millis(), INTERRUPTED_BY_RESTART)?;
            match self.report_repo.finish(&job).await {
                Ok(()) => {
                    info!(report_id = %job.id, "Interrupted report marked as FAILED");
                    recovered += 1;
                }
                Err(AppError::InvalidState(_)) => {
                    warn!(report_id = %job.id, "Report finished concurrently, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        info!(recovered_count = recovered, "Interrupted report recovery complete");
        Ok(recovered)
    }
}
