// Report Repository Port (the job table)

use crate::domain::{ReportJob, ReportState};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for report jobs.
///
/// The job table is the only shared mutable state of the orchestrator.
/// Implementations must make `finish` atomic: a reader sees either the
/// running job without rows or the terminal job with everything attached.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a new (running) job
    async fn insert(&self, job: &ReportJob) -> Result<()>;

    /// Find job by ID, rows and store faults included
    async fn find_by_id(&self, id: &str) -> Result<Option<ReportJob>>;

    /// Persist a terminal transition (state, rows, faults, artifact, error).
    ///
    /// # Errors
    /// - `AppError::NotFound` if the job does not exist
    /// - `AppError::InvalidState` if the stored job is already terminal
    async fn finish(&self, job: &ReportJob) -> Result<()>;

    /// Find all jobs in a state, rows not loaded (for recovery)
    async fn find_by_state(&self, state: ReportState) -> Result<Vec<ReportJob>>;

    /// Count jobs by state
    async fn count_by_state(&self, state: ReportState) -> Result<i64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Arena of jobs keyed by report ID behind one lock
    #[derive(Default)]
    pub struct InMemoryReportRepository {
        jobs: Mutex<HashMap<String, ReportJob>>,
    }

    impl InMemoryReportRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ReportRepository for InMemoryReportRepository {
        async fn insert(&self, job: &ReportJob) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(AppError::Conflict(format!("Report {} already exists", job.id)));
            }
            jobs.insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<ReportJob>> {
            Ok(self.jobs.lock().unwrap().get(id).cloned())
        }

        async fn finish(&self, job: &ReportJob) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            let stored = jobs
                .get_mut(&job.id)
                .ok_or_else(|| AppError::NotFound(format!("Report {} not found", job.id)))?;
            if stored.state.is_terminal() {
                return Err(AppError::InvalidState(format!(
                    "Cannot update report {} from {} to {}",
                    job.id, stored.state, job.state
                )));
            }
            *stored = job.clone();
            Ok(())
        }

        async fn find_by_state(&self, state: ReportState) -> Result<Vec<ReportJob>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|j| j.state == state)
                .map(|j| ReportJob {
                    rows: Vec::new(),
                    ..j.clone()
                })
                .collect())
        }

        async fn count_by_state(&self, state: ReportState) -> Result<i64> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|j| j.state == state)
                .count() as i64)
        }
    }
}
