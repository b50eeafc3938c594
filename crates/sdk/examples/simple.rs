//! Simple SDK Example
//!
//! Triggers a report, waits for it and prints the daemon statistics.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    STOREWATCH_IMPORT_DIR=./data cargo run --package storewatch-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --package storewatch-sdk --example simple
//!    ```

use std::time::Duration;
use storewatch_sdk::{ReportStatus, StorewatchClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Storewatch SDK - Simple Example");
    println!("===============================\n");

    println!("1. Connecting to daemon...");
    let client = StorewatchClient::connect("http://127.0.0.1:9630").await?;
    println!("   ✓ Connected\n");

    println!("2. Triggering a report...");
    let report_id = client.trigger_report().await?;
    println!("   ✓ Report ID: {}\n", report_id);

    println!("3. Waiting for completion...");
    let status = client
        .wait_for_report(&report_id, Duration::from_millis(500), Duration::from_secs(600))
        .await?;
    match status {
        ReportStatus::Complete { file, store_faults } => {
            println!("   ✓ Complete: {}", file);
            if store_faults > 0 {
                println!("   ⚠ {} stores reported as zero rows", store_faults);
            }
        }
        ReportStatus::Failed { error } => println!("   ✗ Failed: {}", error),
        ReportStatus::Running => unreachable!("wait_for_report returns terminal states"),
    }
    println!();

    println!("4. Daemon statistics...");
    let stats = client.stats().await?;
    println!("     - Observations: {}", stats.observation_count);
    println!("     - Reports: {} ({} complete)", stats.total_reports, stats.complete_reports);
    println!("     - DB size: {} bytes", stats.db_size_bytes);

    println!("\n✓ Example completed successfully!");

    Ok(())
}
