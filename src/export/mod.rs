//! Entry List / Export
//!
//! One-shot, local transformation of the displayed entries into tabular
//! rows, written as a spreadsheet (XLSX) or CSV. No backend round trip.
//!
//! ```text
//! Truck ID | Weight (tons) | Comments | Date       | Start Time | Stop Time
//! T-12     | 4.5           | ok       | 2024-03-14 | 08:30:00   | 08:31:30
//! ```

mod csv_file;
mod excel;
mod table;

pub use csv_file::{write_csv, write_csv_to};
pub use excel::{write_xlsx, xlsx_bytes, COLUMN_WIDTHS, SHEET_NAME};
pub use table::render_table;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::entries::TruckEntry;

/// Fixed column headers
pub const HEADERS: [&str; 6] = [
    "Truck ID",
    "Weight (tons)",
    "Comments",
    "Date",
    "Start Time",
    "Stop Time",
];

/// Rendered in place of a missing stop time
pub const MISSING_STOP_TIME: &str = "-";

/// One exported row, all columns already formatted except weight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub truck_id: String,
    pub weight: f64,
    pub comments: String,
    pub date: String,
    pub start_time: String,
    pub stop_time: String,
}

impl ExportRow {
    /// Format an entry's timestamps in the given time zone
    pub fn from_entry<Tz>(entry: &TruckEntry, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let start = entry.start_time.with_timezone(tz);

        Self {
            truck_id: entry.truck_id.clone(),
            weight: entry.weight,
            comments: entry.comments.clone(),
            date: start.format("%Y-%m-%d").to_string(),
            start_time: start.format("%H:%M:%S").to_string(),
            stop_time: entry
                .stop_time
                .map(|stop| stop.with_timezone(tz).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| MISSING_STOP_TIME.to_string()),
        }
    }

    /// Columns in header order, weight rendered as text
    pub fn cells(&self) -> [String; 6] {
        [
            self.truck_id.clone(),
            self.weight.to_string(),
            self.comments.clone(),
            self.date.clone(),
            self.start_time.clone(),
            self.stop_time.clone(),
        ]
    }
}

/// Time zone used to render dates and times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportZone {
    /// The machine's local zone
    #[default]
    Local,
    Utc,
}

impl ExportZone {
    /// Project entries into rows, preserving order
    pub fn rows(self, entries: &[TruckEntry]) -> Vec<ExportRow> {
        match self {
            ExportZone::Local => entries.iter().map(|e| ExportRow::from_entry(e, &Local)).collect(),
            ExportZone::Utc => entries.iter().map(|e| ExportRow::from_entry(e, &Utc)).collect(),
        }
    }

    /// Today's date in this zone
    pub fn today(self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            ExportZone::Local => now.with_timezone(&Local).date_naive(),
            ExportZone::Utc => now.date_naive(),
        }
    }
}

impl std::str::FromStr for ExportZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ExportZone::Local),
            "utc" => Ok(ExportZone::Utc),
            other => Err(format!("Unknown time zone: {} (expected local or utc)", other)),
        }
    }
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Unknown export format: {} (expected xlsx or csv)", other)),
        }
    }
}

/// `truck-entries-<YYYY-MM-DD>.<ext>`
pub fn export_filename(today: NaiveDate, format: ExportFormat) -> String {
    format!("truck-entries-{}.{}", today.format("%Y-%m-%d"), format.extension())
}

/// Errors that can occur while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the entries into `dir` under today's dated filename.
///
/// Returns the path of the written file.
pub fn export_entries(
    entries: &[TruckEntry],
    dir: &Path,
    format: ExportFormat,
    zone: ExportZone,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(export_filename(zone.today(Utc::now()), format));
    let rows = zone.rows(entries);

    match format {
        ExportFormat::Xlsx => write_xlsx(&rows, &path)?,
        ExportFormat::Csv => write_csv(&rows, &path)?,
    }

    tracing::info!(path = %path.display(), rows = rows.len(), format = %format, "Exported entries");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use tempfile::tempdir;

    fn entry(stop: bool) -> TruckEntry {
        let start = Utc.with_ymd_and_hms(2024, 3, 14, 23, 30, 5).unwrap();
        TruckEntry {
            id: "e-1".to_string(),
            truck_id: "T-12".to_string(),
            weight: 4.5,
            comments: "ok".to_string(),
            start_time: start,
            stop_time: stop.then(|| start + chrono::Duration::seconds(90)),
        }
    }

    #[test]
    fn test_row_from_entry_utc() {
        let row = ExportRow::from_entry(&entry(true), &Utc);
        assert_eq!(row.truck_id, "T-12");
        assert_eq!(row.weight, 4.5);
        assert_eq!(row.comments, "ok");
        assert_eq!(row.date, "2024-03-14");
        assert_eq!(row.start_time, "23:30:05");
        assert_eq!(row.stop_time, "23:31:35");
    }

    #[test]
    fn test_row_missing_stop_time() {
        let row = ExportRow::from_entry(&entry(false), &Utc);
        assert_eq!(row.stop_time, "-");
    }

    #[test]
    fn test_row_uses_zone_for_date() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let row = ExportRow::from_entry(&entry(true), &plus_two);
        assert_eq!(row.date, "2024-03-15");
        assert_eq!(row.start_time, "01:30:05");
    }

    #[test]
    fn test_rows_match_displayed_entries() {
        let mut second = entry(false);
        second.id = "e-2".to_string();
        second.truck_id = "T-13".to_string();
        let entries = vec![entry(true), second];

        let rows = ExportZone::Utc.rows(&entries);
        assert_eq!(rows.len(), entries.len());
        for (row, entry) in rows.iter().zip(&entries) {
            assert_eq!(row.truck_id, entry.truck_id);
            assert_eq!(row.weight, entry.weight);
            assert_eq!(row.comments, entry.comments);
        }
        assert_eq!(rows[1].stop_time, "-");
    }

    #[test]
    fn test_export_filename() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        assert_eq!(
            export_filename(today, ExportFormat::Xlsx),
            "truck-entries-2024-03-14.xlsx"
        );
        assert_eq!(
            export_filename(today, ExportFormat::Csv),
            "truck-entries-2024-03-14.csv"
        );
    }

    #[test]
    fn test_format_and_zone_parse() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!("utc".parse::<ExportZone>().unwrap(), ExportZone::Utc);
        assert!("mars".parse::<ExportZone>().is_err());
    }

    #[test]
    fn test_export_entries_writes_dated_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("exports");

        let path =
            export_entries(&[entry(true)], &out, ExportFormat::Csv, ExportZone::Utc).unwrap();

        let expected = export_filename(Utc::now().date_naive(), ExportFormat::Csv);
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);
        assert!(path.exists());
    }
}
