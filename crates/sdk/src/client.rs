//! Storewatch Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{MaintenanceResponse, ReportStatus, StatsResponse, TriggerResponse};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use std::time::Duration;
use tokio::time::Instant;

/// Storewatch daemon client
///
/// # Example
///
/// ```no_run
/// use storewatch_sdk::StorewatchClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = StorewatchClient::connect("http://127.0.0.1:9630").await?;
/// # Ok(())
/// # }
/// ```
pub struct StorewatchClient {
    client: HttpClient,
}

impl StorewatchClient {
    /// Connect to the daemon
    ///
    /// * `url` - RPC endpoint URL (e.g., `http://127.0.0.1:9630`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self { client })
    }

    /// Start a new report run; returns its id immediately
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use storewatch_sdk::StorewatchClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = StorewatchClient::connect("http://127.0.0.1:9630").await?;
    /// let report_id = client.trigger_report().await?;
    /// println!("Report: {}", report_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn trigger_report(&self) -> Result<String> {
        let response: TriggerResponse = self
            .client
            .request("report.trigger.v1", rpc_params![])
            .await?;
        Ok(response.report_id)
    }

    /// Current status of a report. An unknown id is `SdkError::NotFound`.
    pub async fn get_report(&self, report_id: impl Into<String>) -> Result<ReportStatus> {
        let mut params = ObjectParams::new();
        params.insert("report_id", report_id.into())?;
        let status: ReportStatus = self.client.request("report.get.v1", params).await?;
        Ok(status)
    }

    /// Poll until the report leaves `Running` or `timeout` elapses
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use storewatch_sdk::{ReportStatus, StorewatchClient};
    /// # use std::time::Duration;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = StorewatchClient::connect("http://127.0.0.1:9630").await?;
    /// let id = client.trigger_report().await?;
    /// match client
    ///     .wait_for_report(&id, Duration::from_millis(500), Duration::from_secs(300))
    ///     .await?
    /// {
    ///     ReportStatus::Complete { file, .. } => println!("CSV at {}", file),
    ///     other => println!("{:?}", other),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn wait_for_report(
        &self,
        report_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<ReportStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.get_report(report_id).await?;
            if status.is_terminal() {
                return Ok(status);
            }
            if Instant::now() + poll_interval > deadline {
                return Err(SdkError::Timeout(format!(
                    "report {} still running after {:?}",
                    report_id, timeout
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Daemon statistics
    pub async fn stats(&self) -> Result<StatsResponse> {
        let response: StatsResponse = self
            .client
            .request("admin.stats.v1", rpc_params![])
            .await?;
        Ok(response)
    }

    /// Run maintenance now (report GC, optional VACUUM)
    pub async fn maintenance(&self, force_vacuum: bool) -> Result<MaintenanceResponse> {
        let mut params = ObjectParams::new();
        params.insert("force_vacuum", force_vacuum)?;
        let response: MaintenanceResponse =
            self.client.request("admin.maintenance.v1", params).await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result = StorewatchClient::connect("not a url").await;
        assert!(matches!(result, Err(SdkError::Connection(_))));
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_transport_error() {
        // Port 1 on localhost is never a JSON-RPC server
        let client = StorewatchClient::connect("http://127.0.0.1:1").await.unwrap();
        let err = client.trigger_report().await.unwrap_err();
        assert!(matches!(err, SdkError::Transport(_)));
    }
}
