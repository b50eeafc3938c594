// Application constants (no magic values)
use std::time::Duration;

/// Default upper bound on stores estimated concurrently within one report
pub const DEFAULT_REPORT_WORKERS: usize = 8;

/// Diagnostic stored on reports orphaned by a daemon restart
pub const INTERRUPTED_BY_RESTART: &str = "interrupted by daemon restart";

/// Default maintenance period (24 hours)
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(24 * 3600);
