// Report execution body: anchor, per-store fan-out, sink, terminal transition

use crate::application::schedule_resolver::ScheduleResolver;
use crate::domain::{
    dedupe_by_timestamp, estimate, EstimatorPolicy, ReportJob, ReportWindow, StoreFault, WindowResult,
};
use crate::error::{AppError, Result};
use crate::port::{ObservationSource, ReportRepository, ReportSink, TimeProvider};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Computes the row of one store against a frozen anchor.
///
/// Reads only that store's observations and schedule, so instances can be
/// cloned into independent tasks.
#[derive(Clone)]
pub struct StoreEstimator {
    observations: Arc<dyn ObservationSource>,
    resolver: ScheduleResolver,
    policy: EstimatorPolicy,
}

impl StoreEstimator {
    pub fn new(
        observations: Arc<dyn ObservationSource>,
        resolver: ScheduleResolver,
        policy: EstimatorPolicy,
    ) -> Self {
        Self {
            observations,
            resolver,
            policy,
        }
    }

    pub async fn estimate_store(&self, store_id: &str, anchor: DateTime<Utc>) -> Result<WindowResult> {
        let schedule = self.resolver.resolve(store_id).await?;

        // The week window covers the other two; one read serves all three.
        let week_start = ReportWindow::LastWeek.start(anchor);
        let seed = self.observations.latest_before(store_id, week_start).await?;
        let mut observations = self.observations.list(store_id, week_start, anchor).await?;
        if let Some(seed) = seed {
            observations.insert(0, seed);
        }
        let observations = dedupe_by_timestamp(observations);

        let mut row = WindowResult::zero(store_id);
        for window in ReportWindow::ALL {
            let est = estimate(&observations, &schedule, anchor, window, self.policy)?;
            row.record(window, est);
        }

        debug!(
            store_id = %store_id,
            samples = observations.len(),
            uptime_last_day = row.uptime_last_day,
            downtime_last_day = row.downtime_last_day,
            "Store estimated"
        );
        Ok(row)
    }
}

/// Output of the estimation phase of one job
struct Estimation {
    anchor: Option<DateTime<Utc>>,
    rows: Vec<WindowResult>,
    faults: Vec<StoreFault>,
}

/// Runs one report job to a terminal state
pub struct ReportRunner {
    report_repo: Arc<dyn ReportRepository>,
    observations: Arc<dyn ObservationSource>,
    sink: Arc<dyn ReportSink>,
    time_provider: Arc<dyn TimeProvider>,
    estimator: StoreEstimator,
    workers: Arc<Semaphore>,
}

impl ReportRunner {
    pub fn new(
        report_repo: Arc<dyn ReportRepository>,
        observations: Arc<dyn ObservationSource>,
        sink: Arc<dyn ReportSink>,
        time_provider: Arc<dyn TimeProvider>,
        estimator: StoreEstimator,
        workers: usize,
    ) -> Self {
        Self {
            report_repo,
            observations,
            sink,
            time_provider,
            estimator,
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Execute a `Running` job and persist its terminal state.
    ///
    /// Infrastructure failures (store list, anchor, sink) end in `Failed`;
    /// per-store failures only add a store fault. Returns the terminal job.
    ///
    /// # Errors
    /// Only when the terminal transition itself cannot be persisted.
    pub async fn execute(&self, mut job: ReportJob) -> Result<ReportJob> {
        let started = Instant::now();

        match self.estimate_all(&job.id).await {
            Ok(estimation) => match self.sink.write(&job.id, &estimation.rows).await {
                Ok(artifact) => {
                    let now = self.time_provider.now_millis();
                    let row_count = estimation.rows.len();
                    let fault_count = estimation.faults.len();
                    job.complete(
                        now,
                        estimation.anchor,
                        estimation.rows,
                        estimation.faults,
                        artifact,
                    )?;
                    info!(
                        report_id = %job.id,
                        rows = row_count,
                        store_faults = fault_count,
                        artifact = job.artifact.as_deref().unwrap_or_default(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Report complete"
                    );
                }
                Err(e) => {
                    error!(report_id = %job.id, error = %e, "Report sink failed");
                    job.fail(
                        self.time_provider.now_millis(),
                        format!("cannot write report artifact: {}", e),
                    )?;
                }
            },
            Err(e) => {
                error!(report_id = %job.id, error = %e, "Report failed");
                job.fail(self.time_provider.now_millis(), e.to_string())?;
            }
        }

        self.report_repo.finish(&job).await?;
        Ok(job)
    }

    async fn estimate_all(&self, report_id: &str) -> Result<Estimation> {
        // Anchor first: stores ingested after it are still listed, but every
        // read is bounded by the anchor.
        let anchor = self
            .observations
            .latest_timestamp()
            .await
            .map_err(|e| AppError::Internal(format!("cannot determine anchor time: {}", e)))?;
        let stores = self
            .observations
            .known_stores()
            .await
            .map_err(|e| AppError::Internal(format!("cannot obtain store list: {}", e)))?;

        info!(
            report_id = %report_id,
            anchor = ?anchor,
            stores = stores.len(),
            "Report started"
        );

        let Some(anchor) = anchor else {
            // nothing observed: every known store gets a zero row
            let rows = stores.iter().map(WindowResult::zero).collect();
            return Ok(Estimation {
                anchor: None,
                rows,
                faults: Vec::new(),
            });
        };

        let mut handles = Vec::with_capacity(stores.len());
        for store_id in stores {
            let estimator = self.estimator.clone();
            let workers = Arc::clone(&self.workers);
            let task_store = store_id.clone();
            let handle = tokio::spawn(async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Internal(format!("worker pool closed: {}", e)))?;
                estimator.estimate_store(&task_store, anchor).await
            });
            handles.push((store_id, handle));
        }

        let mut rows = Vec::with_capacity(handles.len());
        let mut faults = Vec::new();
        for (store_id, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(join_err) => Err(format!("estimation task aborted: {}", join_err)),
            };
            match outcome {
                Ok(row) => rows.push(row),
                Err(message) => {
                    warn!(
                        report_id = %report_id,
                        store_id = %store_id,
                        error = %message,
                        "Store fault, emitting zero row"
                    );
                    rows.push(WindowResult::zero(store_id.clone()));
                    faults.push(StoreFault::new(store_id, message));
                }
            }
        }

        rows.sort_by(|a, b| a.store_id.cmp(&b.store_id));
        Ok(Estimation {
            anchor: Some(anchor),
            rows,
            faults,
        })
    }
}

