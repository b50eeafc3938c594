// Schedule Source Port (raw business hours + timezone records)

use crate::domain::OpenInterval;
use crate::error::Result;
use async_trait::async_trait;

/// Raw schedule data for one store. Absence is reported as-is; default
/// substitution happens in the schedule resolver.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// IANA zone name, if the store has a timezone record
    async fn timezone(&self, store_id: &str) -> Result<Option<String>>;

    /// All business-hours records of the store (any weekday)
    async fn open_intervals(&self, store_id: &str) -> Result<Vec<OpenInterval>>;
}
