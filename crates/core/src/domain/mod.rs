// Domain Layer - Pure business logic and entities

pub mod error;
pub mod estimator;
pub mod local_time;
pub mod observation;
pub mod report;
pub mod schedule;

// Re-exports
pub use error::DomainError;
pub use estimator::{estimate, EstimatorPolicy, UtcSpan};
pub use observation::{dedupe_by_timestamp, Observation, StoreId, StoreStatus};
pub use report::{
    ReportId, ReportJob, ReportState, ReportStatus, ReportWindow, StoreFault, WindowEstimate,
    WindowResult, REPORT_COLUMNS,
};
pub use schedule::{parse_timezone, OpenInterval, ResolvedSchedule, DEFAULT_TIMEZONE};
