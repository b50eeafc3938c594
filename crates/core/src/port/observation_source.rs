// Observation Source Port (read contract over ingested status samples)

use crate::domain::{Observation, StoreId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Every known store: referenced by an observation, a business-hours
    /// record or a timezone record. Sorted, unique.
    async fn known_stores(&self) -> Result<Vec<StoreId>>;

    /// Latest observation timestamp across all stores
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>>;

    /// Observations of one store with `from <= timestamp <= to`,
    /// ascending by timestamp. Empty is valid.
    async fn list(
        &self,
        store_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Observation>>;

    /// Nearest observation strictly before `before`
    async fn latest_before(
        &self,
        store_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Observation>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{OpenInterval, StoreStatus};
    use crate::error::AppError;
    use crate::port::ScheduleSource;
    use std::collections::{BTreeSet, HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Inner {
        observations: Vec<Observation>,
        intervals: HashMap<StoreId, Vec<OpenInterval>>,
        timezones: HashMap<StoreId, String>,
        fail_store_list: bool,
        failing_stores: HashSet<StoreId>,
        read_delay: Option<Duration>,
    }

    /// In-memory store data implementing both read ports
    #[derive(Default)]
    pub struct InMemoryStoreData {
        inner: Mutex<Inner>,
    }

    impl InMemoryStoreData {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_observation(&self, store_id: &str, timestamp: DateTime<Utc>, status: StoreStatus) {
            self.inner
                .lock()
                .unwrap()
                .observations
                .push(Observation::new(store_id, timestamp, status));
        }

        pub fn add_interval(&self, store_id: &str, interval: OpenInterval) {
            self.inner
                .lock()
                .unwrap()
                .intervals
                .entry(store_id.to_string())
                .or_default()
                .push(interval);
        }

        pub fn set_timezone(&self, store_id: &str, timezone: &str) {
            self.inner
                .lock()
                .unwrap()
                .timezones
                .insert(store_id.to_string(), timezone.to_string());
        }

        /// `known_stores` fails from now on
        pub fn fail_store_list(&self) {
            self.inner.lock().unwrap().fail_store_list = true;
        }

        /// Every per-store read for `store_id` fails from now on
        pub fn fail_reads_for(&self, store_id: &str) {
            self.inner
                .lock()
                .unwrap()
                .failing_stores
                .insert(store_id.to_string());
        }

        /// Delay applied to `known_stores`, to keep jobs observable as Running
        pub fn set_read_delay(&self, delay: Duration) {
            self.inner.lock().unwrap().read_delay = Some(delay);
        }

        fn check_store(&self, store_id: &str) -> Result<()> {
            if self.inner.lock().unwrap().failing_stores.contains(store_id) {
                return Err(AppError::Database(format!(
                    "read failed for store {}",
                    store_id
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ObservationSource for InMemoryStoreData {
        async fn known_stores(&self) -> Result<Vec<StoreId>> {
            let delay = self.inner.lock().unwrap().read_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let inner = self.inner.lock().unwrap();
            if inner.fail_store_list {
                return Err(AppError::Database("store list unavailable".to_string()));
            }
            let stores: BTreeSet<StoreId> = inner
                .observations
                .iter()
                .map(|o| o.store_id.clone())
                .chain(inner.intervals.keys().cloned())
                .chain(inner.timezones.keys().cloned())
                .collect();
            Ok(stores.into_iter().collect())
        }

        async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner.observations.iter().map(|o| o.timestamp).max())
        }

        async fn list(
            &self,
            store_id: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<Observation>> {
            self.check_store(store_id)?;
            let inner = self.inner.lock().unwrap();
            let mut out: Vec<Observation> = inner
                .observations
                .iter()
                .filter(|o| o.store_id == store_id && o.timestamp >= from && o.timestamp <= to)
                .cloned()
                .collect();
            out.sort_by_key(|o| o.timestamp);
            Ok(out)
        }

        async fn latest_before(
            &self,
            store_id: &str,
            before: DateTime<Utc>,
        ) -> Result<Option<Observation>> {
            self.check_store(store_id)?;
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .observations
                .iter()
                .filter(|o| o.store_id == store_id && o.timestamp < before)
                .max_by_key(|o| o.timestamp)
                .cloned())
        }
    }

    #[async_trait]
    impl ScheduleSource for InMemoryStoreData {
        async fn timezone(&self, store_id: &str) -> Result<Option<String>> {
            self.check_store(store_id)?;
            Ok(self.inner.lock().unwrap().timezones.get(store_id).cloned())
        }

        async fn open_intervals(&self, store_id: &str) -> Result<Vec<OpenInterval>> {
            self.check_store(store_id)?;
            Ok(self
                .inner
                .lock()
                .unwrap()
                .intervals
                .get(store_id)
                .cloned()
                .unwrap_or_default())
        }
    }
}
