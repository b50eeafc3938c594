// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod maintenance;
pub mod recovery;
pub mod report;
pub mod schedule_resolver;
pub mod shutdown;

// Re-exports
pub use maintenance::MaintenanceScheduler;
pub use recovery::RecoveryService;
pub use report::{ReportConfig, ReportService};
pub use schedule_resolver::ScheduleResolver;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
