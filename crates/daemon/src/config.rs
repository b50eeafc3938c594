//! Daemon configuration, read once from the environment at startup

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.storewatch/storewatch.db";
const DEFAULT_REPORT_DIR: &str = "~/.storewatch/reports";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;
const DEFAULT_REPORT_WORKERS: usize = 8;
const DEFAULT_RETENTION_DAYS: i64 = 7;
const DEFAULT_MAINTENANCE_INTERVAL_HOURS: u64 = 24;
const DEFAULT_RATE_LIMIT_BURST: u32 = 20;
const DEFAULT_RATE_LIMIT_RATE: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub report_dir: PathBuf,
    pub report_workers: usize,
    pub backfill_before_first: bool,
    pub import_dir: Option<PathBuf>,
    pub retention_days: i64,
    pub maintenance_interval: Duration,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
    pub json_logs: bool,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expand = |raw: String| shellexpand::tilde(&raw).into_owned();

        let report_workers: usize = parse_or(&lookup, "STOREWATCH_REPORT_WORKERS", DEFAULT_REPORT_WORKERS)?;
        if report_workers == 0 {
            anyhow::bail!("STOREWATCH_REPORT_WORKERS must be at least 1");
        }

        let interval_hours: u64 = parse_or(
            &lookup,
            "STOREWATCH_MAINTENANCE_INTERVAL_HOURS",
            DEFAULT_MAINTENANCE_INTERVAL_HOURS,
        )?;
        if interval_hours == 0 {
            anyhow::bail!("STOREWATCH_MAINTENANCE_INTERVAL_HOURS must be at least 1");
        }

        Ok(Self {
            db_path: expand(lookup("STOREWATCH_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string())),
            rpc_host: lookup("STOREWATCH_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            rpc_port: parse_or(&lookup, "STOREWATCH_RPC_PORT", DEFAULT_RPC_PORT)?,
            report_dir: expand(
                lookup("STOREWATCH_REPORT_DIR").unwrap_or_else(|| DEFAULT_REPORT_DIR.to_string()),
            )
            .into(),
            report_workers,
            backfill_before_first: parse_or(&lookup, "STOREWATCH_BACKFILL_FIRST", false)?,
            import_dir: lookup("STOREWATCH_IMPORT_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(|s| PathBuf::from(expand(s))),
            retention_days: parse_or(&lookup, "STOREWATCH_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
            maintenance_interval: Duration::from_secs(interval_hours * 3600),
            rate_limit_burst: parse_or(&lookup, "STOREWATCH_RATE_LIMIT_BURST", DEFAULT_RATE_LIMIT_BURST)?,
            rate_limit_rate: parse_or(&lookup, "STOREWATCH_RATE_LIMIT_RATE", DEFAULT_RATE_LIMIT_RATE)?,
            json_logs: lookup("STOREWATCH_LOG_FORMAT").as_deref() == Some("json"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
    }
}
