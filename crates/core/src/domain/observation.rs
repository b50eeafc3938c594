// Observation Domain Model

use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Store identifier (opaque, as found in the source data)
pub type StoreId = String;

/// Polled store status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Active,
    Inactive,
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreStatus::Active => write!(f, "active"),
            StoreStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for StoreStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StoreStatus::Active),
            "inactive" => Ok(StoreStatus::Inactive),
            other => Err(DomainError::ValidationError(format!(
                "unknown store status '{}'",
                other
            ))),
        }
    }
}

/// A single point-in-time status sample for one store.
///
/// Immutable once ingested. Timestamps are UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub store_id: StoreId,
    pub timestamp: DateTime<Utc>,
    pub status: StoreStatus,
}

impl Observation {
    pub fn new(store_id: impl Into<String>, timestamp: DateTime<Utc>, status: StoreStatus) -> Self {
        Self {
            store_id: store_id.into(),
            timestamp,
            status,
        }
    }
}

/// Order observations by timestamp and collapse duplicates.
///
/// When two observations share a timestamp the one that appears later in the
/// input wins (last-write-wins).
pub fn dedupe_by_timestamp(mut observations: Vec<Observation>) -> Vec<Observation> {
    // stable: equal timestamps keep input order
    observations.sort_by_key(|o| o.timestamp);

    let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
    for obs in observations {
        match deduped.last_mut() {
            Some(last) if last.timestamp == obs.timestamp => *last = obs,
            _ => deduped.push(obs),
        }
    }
    deduped
}
