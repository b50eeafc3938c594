// Storewatch Infrastructure - SQLite Adapter
// Implements: ObservationSource, ScheduleSource, ReportRepository, Maintenance

mod connection;
mod error;
mod import;
mod maintenance_impl;
mod migration;
mod report_repository;
mod store_data;

pub use connection::create_pool;
pub use import::{
    import_directory, parse_timestamp, FileImport, ImportSummary, MENU_HOURS_FILE,
    STORE_STATUS_FILE, TIMEZONES_FILE,
};
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;
pub use report_repository::SqliteReportRepository;
pub use store_data::SqliteStoreData;

// Note: sqlx::Error conversion is handled by error::map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
