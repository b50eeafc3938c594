// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod maintenance;
pub mod observation_source;
pub mod report_repository;
pub mod report_sink;
pub mod schedule_source;
pub mod time_provider;

// Re-exports
pub use id_provider::{IdProvider, UuidProvider};
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceStats};
pub use observation_source::ObservationSource;
pub use report_repository::ReportRepository;
pub use report_sink::{ArtifactHandle, ReportSink};
pub use schedule_source::ScheduleSource;
pub use time_provider::{SystemTimeProvider, TimeProvider};
