//! Storewatch daemon - composition root

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use config::DaemonConfig;
use storewatch_api_rpc::{RpcServer, RpcServerConfig};
use storewatch_core::application::{
    shutdown_channel, MaintenanceScheduler, RecoveryService, ReportConfig, ReportService,
};
use storewatch_core::domain::EstimatorPolicy;
use storewatch_core::port::{MaintenanceConfig, SystemTimeProvider, UuidProvider};
use storewatch_infra_fs::CsvReportSink;
use storewatch_infra_sqlite::{
    create_pool, import_directory, run_migrations, SqliteMaintenance, SqliteReportRepository,
    SqliteStoreData,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::from_env().context("Failed to load configuration")?;

    telemetry::init_tracing(config.json_logs).context("Failed to initialize logging")?;

    info!("Storewatch v{} starting...", VERSION);
    info!(db_path = %config.db_path, "Initializing database...");

    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create database directory {}", parent.display()))?;
    }

    let pool = create_pool(&config.db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // DI wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let report_repo = Arc::new(SqliteReportRepository::new(pool.clone()));
    let store_data = Arc::new(SqliteStoreData::new(pool.clone()));
    let sink = Arc::new(CsvReportSink::new(config.report_dir.clone()));
    let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), time_provider.clone()));

    info!("Running crash recovery...");
    let recovery = RecoveryService::new(report_repo.clone(), time_provider.clone());
    match recovery.recover_interrupted_reports().await {
        Ok(count) => info!(recovered_reports = count, "Crash recovery completed"),
        Err(e) => error!(error = ?e, "Crash recovery failed"),
    }

    if let Some(dir) = &config.import_dir {
        info!(dir = %dir.display(), "Importing source data...");
        let summary = import_directory(&store_data, dir)
            .await
            .map_err(|e| anyhow::anyhow!("Import from {} failed: {}", dir.display(), e))?;
        info!(
            observations = summary.store_status.loaded,
            business_hours = summary.menu_hours.loaded,
            timezones = summary.timezones.loaded,
            skipped = summary.store_status.skipped + summary.menu_hours.skipped + summary.timezones.skipped,
            "Import completed"
        );
    }

    let reports = Arc::new(ReportService::new(
        report_repo,
        store_data.clone(),
        store_data,
        sink,
        Arc::new(UuidProvider),
        time_provider,
        ReportConfig {
            workers: config.report_workers,
            policy: EstimatorPolicy {
                backfill_before_first: config.backfill_before_first,
            },
        },
    ));

    let maintenance_config = MaintenanceConfig {
        finished_report_retention_days: config.retention_days,
        ..MaintenanceConfig::default()
    };

    info!("Starting JSON-RPC server...");
    let rpc_server = RpcServer::new(
        RpcServerConfig {
            host: config.rpc_host.clone(),
            port: config.rpc_port,
            rate_limit_burst: config.rate_limit_burst,
            rate_limit_rate: config.rate_limit_rate,
        },
        reports,
        maintenance.clone(),
        maintenance_config.clone(),
    );
    let (rpc_handle, rpc_addr) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    info!(
        interval_secs = config.maintenance_interval.as_secs(),
        "Starting maintenance scheduler..."
    );
    let maintenance_scheduler =
        MaintenanceScheduler::new(maintenance, maintenance_config, config.maintenance_interval);
    let maintenance_handle = tokio::spawn(maintenance_scheduler.run(shutdown_rx));

    info!(address = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(Duration::from_secs(5), maintenance_handle)
        .await
        .is_err()
    {
        warn!("Maintenance loop did not stop in time");
    }
    pool.close().await;

    info!("Shutdown complete.");

    Ok(())
}
