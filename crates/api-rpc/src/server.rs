//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP on a localhost TCP port.

use crate::handler::RpcHandler;
use crate::rate_limiter::RateLimiter;
use crate::types::{GetReportRequest, MaintenanceRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use storewatch_core::application::ReportService;
use storewatch_core::port::{Maintenance, MaintenanceConfig};
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;
const DEFAULT_RATE_LIMIT_BURST: u32 = 20;
const DEFAULT_RATE_LIMIT_RATE: u32 = 5;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 binds an ephemeral port
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            rate_limit_rate: DEFAULT_RATE_LIMIT_RATE,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        reports: Arc<ReportService>,
        maintenance: Arc<dyn Maintenance>,
        maintenance_config: MaintenanceConfig,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_burst, config.rate_limit_rate);
        Self {
            config,
            handler: Arc::new(RpcHandler::new(
                reports,
                maintenance,
                maintenance_config,
                rate_limiter,
            )),
        }
    }

    /// Start the JSON-RPC server, returning its handle and the bound address
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("report.trigger.v1", move |_params, _, _| {
                let handler = handler.clone();
                async move { handler.trigger().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("report.get.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: GetReportRequest = params.parse()?;
                    handler.get_report(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.stats.v1", move |_params, _, _| {
                let handler = handler.clone();
                async move { handler.stats().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.maintenance.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    // absent params arrive as null
                    let req: Option<MaintenanceRequest> = params.parse()?;
                    handler.maintenance(req.unwrap_or_default()).await
                }
            })
            .map_err(|e| e.to_string())?;

        info!(address = %local_addr, "JSON-RPC server started");

        let handle = server.start(module);
        Ok((handle, local_addr))
    }
}
