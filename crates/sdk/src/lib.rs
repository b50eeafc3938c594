//! Storewatch SDK - Rust Client Library
//!
//! Client for triggering and polling store uptime reports on a Storewatch daemon.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use storewatch_sdk::{ReportStatus, StorewatchClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StorewatchClient::connect("http://127.0.0.1:9630").await?;
//!
//!     let report_id = client.trigger_report().await?;
//!     let status = client
//!         .wait_for_report(&report_id, Duration::from_secs(1), Duration::from_secs(600))
//!         .await?;
//!
//!     if let ReportStatus::Complete { file, store_faults } = status {
//!         println!("{} ({} store faults)", file, store_faults);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::StorewatchClient;
pub use error::{Result, SdkError};
pub use types::{MaintenanceResponse, ReportStatus, StatsResponse, TriggerResponse};
