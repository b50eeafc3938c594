// CSV bulk import of the three source files into the store tables

use crate::store_data::SqliteStoreData;
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use storewatch_core::domain::{Observation, OpenInterval, StoreId, StoreStatus};
use storewatch_core::error::{AppError, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub const STORE_STATUS_FILE: &str = "store_status.csv";
pub const MENU_HOURS_FILE: &str = "menu_hours.csv";
pub const TIMEZONES_FILE: &str = "timezones.csv";

/// Observations are flushed in transactions of this size
const OBSERVATION_BATCH: usize = 5_000;

/// Outcome for one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileImport {
    pub present: bool,
    pub loaded: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub store_status: FileImport,
    pub menu_hours: FileImport,
    pub timezones: FileImport,
}

/// Load whichever of the three source files exist in `dir`.
///
/// Bad rows are skipped and counted. A missing required column fails the
/// whole import.
pub async fn import_directory(store: &SqliteStoreData, dir: &Path) -> Result<ImportSummary> {
    info!(dir = %dir.display(), "Importing store data");

    let summary = ImportSummary {
        timezones: import_timezones(store, &dir.join(TIMEZONES_FILE)).await?,
        menu_hours: import_menu_hours(store, &dir.join(MENU_HOURS_FILE)).await?,
        store_status: import_store_status(store, &dir.join(STORE_STATUS_FILE)).await?,
    };

    info!(
        observations = summary.store_status.loaded,
        observations_skipped = summary.store_status.skipped,
        business_hours = summary.menu_hours.loaded,
        business_hours_skipped = summary.menu_hours.skipped,
        timezones = summary.timezones.loaded,
        timezones_skipped = summary.timezones.skipped,
        "Import complete"
    );
    Ok(summary)
}

async fn import_store_status(store: &SqliteStoreData, path: &Path) -> Result<FileImport> {
    let Some(mut reader) = CsvReader::open(path).await? else {
        return Ok(FileImport::default());
    };
    let store_col = reader.column("store_id")?;
    let status_col = reader.column("status")?;
    let ts_col = reader.column("timestamp_utc")?;

    let mut result = FileImport {
        present: true,
        ..FileImport::default()
    };
    let mut batch = Vec::with_capacity(OBSERVATION_BATCH);

    while let Some((line_no, fields)) = reader.next_record().await? {
        let parsed = (|| {
            let store_id = field(&fields, store_col)?;
            let status: StoreStatus = field(&fields, status_col)?.parse().ok()?;
            let timestamp = parse_timestamp(field(&fields, ts_col)?)?;
            Some(Observation::new(store_id, timestamp, status))
        })();

        match parsed {
            Some(obs) => batch.push(obs),
            None => {
                warn!(file = STORE_STATUS_FILE, line = line_no, "Skipping unparseable row");
                result.skipped += 1;
            }
        }

        if batch.len() >= OBSERVATION_BATCH {
            result.loaded += store.insert_observations(&batch).await?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        result.loaded += store.insert_observations(&batch).await?;
    }
    Ok(result)
}

async fn import_menu_hours(store: &SqliteStoreData, path: &Path) -> Result<FileImport> {
    let Some(mut reader) = CsvReader::open(path).await? else {
        return Ok(FileImport::default());
    };
    let store_col = reader.column("store_id")?;
    let day_col = reader.column("dayOfWeek").or_else(|_| reader.column("day"))?;
    let start_col = reader.column("start_time_local")?;
    let end_col = reader.column("end_time_local")?;

    let mut result = FileImport {
        present: true,
        ..FileImport::default()
    };
    let mut hours: Vec<(StoreId, OpenInterval)> = Vec::new();

    while let Some((line_no, fields)) = reader.next_record().await? {
        let parsed = (|| {
            let store_id = field(&fields, store_col)?;
            let weekday: u8 = field(&fields, day_col)?.parse().ok()?;
            let start: NaiveTime = field(&fields, start_col)?.parse().ok()?;
            let end: NaiveTime = field(&fields, end_col)?.parse().ok()?;
            Some((store_id.to_string(), OpenInterval::new(weekday, start, end)))
        })();

        match parsed {
            Some(entry) => hours.push(entry),
            None => {
                warn!(file = MENU_HOURS_FILE, line = line_no, "Skipping unparseable row");
                result.skipped += 1;
            }
        }
    }

    // one call: replacement is per store and a store's rows may be anywhere in the file
    result.loaded = store.replace_business_hours(&hours).await?;
    Ok(result)
}

async fn import_timezones(store: &SqliteStoreData, path: &Path) -> Result<FileImport> {
    let Some(mut reader) = CsvReader::open(path).await? else {
        return Ok(FileImport::default());
    };
    let store_col = reader.column("store_id")?;
    let tz_col = reader.column("timezone_str")?;

    let mut result = FileImport {
        present: true,
        ..FileImport::default()
    };
    let mut timezones: Vec<(StoreId, String)> = Vec::new();

    while let Some((line_no, fields)) = reader.next_record().await? {
        match (field(&fields, store_col), field(&fields, tz_col)) {
            (Some(store_id), Some(tz)) => timezones.push((store_id.to_string(), tz.to_string())),
            _ => {
                warn!(file = TIMEZONES_FILE, line = line_no, "Skipping unparseable row");
                result.skipped += 1;
            }
        }
    }

    result.loaded = store.upsert_timezones(&timezones).await?;
    Ok(result)
}

/// Non-empty trimmed field at `index`
fn field(fields: &[String], index: usize) -> Option<&str> {
    fields
        .get(index)
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
}

/// `2023-01-22 12:09:39.388884 UTC`; the ` UTC` suffix and the fraction
/// are optional. RFC 3339 is accepted as well.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    let naive = trimmed.strip_suffix("UTC").unwrap_or(trimmed).trim_end();
    if let Ok(ts) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Line-oriented CSV reader with header lookup
struct CsvReader {
    path: String,
    header: Vec<String>,
    lines: tokio::io::Lines<BufReader<File>>,
    line_no: u64,
}

impl CsvReader {
    /// `None` when the file does not exist
    async fn open(path: &Path) -> Result<Option<Self>> {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Source file absent, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut lines = BufReader::new(file).lines();
        let header = match lines.next_line().await? {
            Some(line) => split_record(line.trim_start_matches('\u{feff}')),
            None => Vec::new(),
        };

        Ok(Some(Self {
            path: path.display().to_string(),
            header,
            lines,
            line_no: 1,
        }))
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| {
                AppError::Validation(format!("{}: missing column '{}'", self.path, name))
            })
    }

    /// Next non-blank record with the 1-based line number it starts on.
    ///
    /// A quoted field may span lines; the record continues until its quotes
    /// balance or the file ends.
    async fn next_record(&mut self) -> Result<Option<(u64, Vec<String>)>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let start_line = self.line_no;
            let mut record = line;
            while has_open_quote(&record) {
                let Some(next) = self.lines.next_line().await? else {
                    break;
                };
                self.line_no += 1;
                record.push('\n');
                record.push_str(&next);
            }
            return Ok(Some((start_line, split_record(&record))));
        }
        Ok(None)
    }
}

/// An escaped `""` counts twice, so odd parity means a field is still open
fn has_open_quote(record: &str) -> bool {
    record.chars().filter(|&c| c == '"').count() % 2 == 1
}

/// Split one CSV record; double quotes group and `""` escapes a quote.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
