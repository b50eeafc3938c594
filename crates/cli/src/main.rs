//! Storewatch CLI - trigger and poll store uptime reports

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "storewatch-cli")]
#[command(about = "Storewatch report CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "STOREWATCH_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new report run
    Trigger,

    /// Show the status of a report
    Get {
        /// Report ID
        report_id: String,
    },

    /// Poll a report until it completes or fails
    Wait {
        /// Report ID
        report_id: String,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Give up after this many seconds
        #[arg(long, default_value = "600")]
        timeout_secs: u64,
    },

    /// Show daemon statistics
    Stats,

    /// Run maintenance operations
    Maintenance {
        /// Force VACUUM even if not needed
        #[arg(long)]
        force_vacuum: bool,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Tabled)]
struct StatusRow {
    report_id: String,
    status: String,
    detail: String,
}

impl StatusRow {
    fn from_result(report_id: &str, result: &serde_json::Value) -> Self {
        let status = result["status"].as_str().unwrap_or("Unknown").to_string();
        let detail = match status.as_str() {
            "Complete" => format!(
                "{} ({} store faults)",
                result["file"].as_str().unwrap_or("-"),
                result["store_faults"].as_u64().unwrap_or(0)
            ),
            "Failed" => result["error"].as_str().unwrap_or("-").to_string(),
            _ => String::new(),
        };
        Self {
            report_id: report_id.to_string(),
            status,
            detail,
        }
    }

    fn print(self) {
        let headline = match self.status.as_str() {
            "Complete" => "✓ Report complete".green().bold(),
            "Failed" => "✗ Report failed".red().bold(),
            _ => "… Report running".yellow().bold(),
        };
        println!("{}", headline);
        println!();
        println!("{}", Table::new(vec![self]));
    }
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn mb(bytes: &serde_json::Value) -> f64 {
    bytes.as_i64().unwrap_or(0) as f64 / (1024.0 * 1024.0)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Trigger => {
            let result = call_rpc(&cli.rpc_url, "report.trigger.v1", json!({})).await?;
            let report_id = result["report_id"]
                .as_str()
                .context("Missing report_id in response")?;

            println!("{}", "✓ Report triggered".green().bold());
            println!("  {} {}", "Report ID:".bold(), report_id);
        }

        Commands::Get { report_id } => {
            let result = call_rpc(&cli.rpc_url, "report.get.v1", json!({ "report_id": report_id })).await?;
            StatusRow::from_result(&report_id, &result).print();
        }

        Commands::Wait {
            report_id,
            interval_ms,
            timeout_secs,
        } => {
            let started = Instant::now();
            let timeout = Duration::from_secs(timeout_secs);
            loop {
                let result =
                    call_rpc(&cli.rpc_url, "report.get.v1", json!({ "report_id": report_id })).await?;
                if result["status"] != "Running" {
                    StatusRow::from_result(&report_id, &result).print();
                    break;
                }
                if started.elapsed() >= timeout {
                    anyhow::bail!("report {} still running after {}s", report_id, timeout_secs);
                }
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }
        }

        Commands::Stats => {
            println!("{}", "Daemon Status".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Observations:".bold(), stats["observation_count"]);
                    println!("  {} {}", "Business hours:".bold(), stats["business_hour_count"]);
                    println!("  {} {}", "Timezones:".bold(), stats["timezone_count"]);
                    println!();
                    println!("  {} {}", "Total Reports:".bold(), stats["total_reports"]);
                    println!("  {} {}", "Running:".bold(), stats["running_reports"]);
                    println!("  {} {}", "Complete:".bold(), stats["complete_reports"]);
                    println!("  {} {}", "Failed:".bold(), stats["failed_reports"]);
                    println!();
                    println!("  {} {:.2} MB", "DB Size:".bold(), mb(&stats["db_size_bytes"]));
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Maintenance { force_vacuum } => {
            println!("{}", "Running maintenance...".cyan().bold());
            println!();

            if force_vacuum {
                println!("  {} Force VACUUM enabled", "•".bold());
            }

            let params = json!({ "force_vacuum": force_vacuum });
            let result = call_rpc(&cli.rpc_url, "admin.maintenance.v1", params).await?;

            println!("  ✓ Maintenance completed");
            println!();
            if result["vacuum_run"].as_bool().unwrap_or(false) {
                println!("  {} VACUUM executed", "✓".green());
            } else {
                println!("  ○ VACUUM skipped (not needed)");
            }
            println!("  {} {} reports deleted", "✓".green(), result["reports_deleted"]);
            println!("  {} {} artifacts deleted", "✓".green(), result["artifacts_deleted"]);
            println!();
            println!(
                "  {} {:.2} MB → {:.2} MB",
                "DB Size:".bold(),
                mb(&result["db_size_before"]),
                mb(&result["db_size_after"])
            );
        }
    }

    Ok(())
}
