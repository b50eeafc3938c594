// Report Sink Port (artifact persistence)

use crate::domain::WindowResult;
use crate::error::Result;
use async_trait::async_trait;

/// Location of a finished artifact (file path, object key, ...)
pub type ArtifactHandle = String;

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist the rows of a finished report.
    ///
    /// Must be idempotent: retrying with the same report ID and identical
    /// rows returns the same handle and leaves the same artifact.
    async fn write(&self, report_id: &str, rows: &[WindowResult]) -> Result<ArtifactHandle>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Keeps written rows in memory; can be switched to fail
    #[derive(Default)]
    pub struct MemorySink {
        written: Mutex<HashMap<String, Vec<WindowResult>>>,
        failing: AtomicBool,
        write_count: AtomicUsize,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn new_failing() -> Self {
            let sink = Self::default();
            sink.failing.store(true, Ordering::SeqCst);
            sink
        }

        pub fn rows(&self, report_id: &str) -> Option<Vec<WindowResult>> {
            self.written.lock().unwrap().get(report_id).cloned()
        }

        pub fn write_count(&self) -> usize {
            self.write_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReportSink for MemorySink {
        async fn write(&self, report_id: &str, rows: &[WindowResult]) -> Result<ArtifactHandle> {
            self.write_count.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Sink("disk full".to_string()));
            }
            self.written
                .lock()
                .unwrap()
                .insert(report_id.to_string(), rows.to_vec());
            Ok(format!("memory://report_{}.csv", report_id))
        }
    }
}
