// CSV report sink
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use storewatch_core::domain::{WindowResult, REPORT_COLUMNS};
use storewatch_core::error::{AppError, Result};
use storewatch_core::port::{ArtifactHandle, ReportSink};
use tracing::info;

/// Writes `<dir>/report_<id>.csv`, one row per store.
///
/// The file appears atomically: content goes to a hidden temp file in the
/// same directory which is then renamed over the target.
pub struct CsvReportSink {
    dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, report_id: &str) -> PathBuf {
        self.dir.join(format!("report_{}.csv", report_id))
    }
}

/// Header plus one line per row, figures with two decimals
pub fn render_csv(rows: &[WindowResult]) -> String {
    let mut out = REPORT_COLUMNS.join(",");
    out.push('\n');
    for row in rows {
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            "{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
            row.store_id,
            row.uptime_last_hour,
            row.downtime_last_hour,
            row.uptime_last_day,
            row.downtime_last_day,
            row.uptime_last_week,
            row.downtime_last_week,
        );
    }
    out
}

fn validate_report_id(report_id: &str) -> Result<()> {
    let valid = !report_id.is_empty()
        && report_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::Validation(format!(
            "report id '{}' is not usable as a file name",
            report_id
        )));
    }
    Ok(())
}

#[async_trait]
impl ReportSink for CsvReportSink {
    async fn write(&self, report_id: &str, rows: &[WindowResult]) -> Result<ArtifactHandle> {
        validate_report_id(report_id)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Sink(format!("cannot create {}: {}", self.dir.display(), e)))?;

        let target = self.artifact_path(report_id);
        let temp = self.dir.join(format!(".report_{}.csv.tmp", report_id));
        let content = render_csv(rows);

        tokio::fs::write(&temp, content.as_bytes())
            .await
            .map_err(|e| AppError::Sink(format!("cannot write {}: {}", temp.display(), e)))?;
        tokio::fs::rename(&temp, &target)
            .await
            .map_err(|e| AppError::Sink(format!("cannot publish {}: {}", target.display(), e)))?;

        info!(
            report_id = %report_id,
            path = %target.display(),
            rows = rows.len(),
            bytes = content.len(),
            "Report artifact written"
        );
        Ok(target.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(store_id: &str) -> WindowResult {
        WindowResult {
            uptime_last_hour: 40.0,
            downtime_last_hour: 20.0,
            uptime_last_day: 7.333333,
            downtime_last_day: 0.666667,
            uptime_last_week: 51.006,
            downtime_last_week: 0.0,
            ..WindowResult::zero(store_id)
        }
    }

    #[test]
    fn test_render_header_and_rounding() {
        let csv = render_csv(&[row("s1")]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("store_id,uptime_last_hour,downtime_last_hour,uptime_last_day,downtime_last_day,uptime_last_week,downtime_last_week")
        );
        assert_eq!(lines.next(), Some("s1,40.00,20.00,7.33,0.67,51.01,0.00"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_render_empty_is_header_only() {
        assert_eq!(render_csv(&[]).lines().count(), 1);
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvReportSink::new(dir.path().join("reports"));
        let rows = vec![row("a"), row("b")];

        let first = sink.write("r-1", &rows).await.unwrap();
        let bytes = std::fs::read(&first).unwrap();
        let second = sink.write("r-1", &rows).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), bytes);
        assert!(first.ends_with("report_r-1.csv"));

        // no temp leftovers
        let entries: Vec<_> = std::fs::read_dir(sink.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvReportSink::new(dir.path());
        let err = sink.write("../escape", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let sink = CsvReportSink::new(blocker.join("reports"));

        let err = sink.write("r-1", &[row("a")]).await.unwrap_err();
        assert!(matches!(err, AppError::Sink(_)));
    }
}
