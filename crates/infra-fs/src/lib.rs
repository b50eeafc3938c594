// Storewatch Infrastructure - Filesystem Adapters
// Implements: ReportSink

pub mod csv_sink;

pub use csv_sink::{render_csv, CsvReportSink};
