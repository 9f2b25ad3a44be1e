//! CSV export

use std::io::Write;
use std::path::Path;

use super::{ExportRow, HEADERS};

/// Write rows to a CSV file at `path`
pub fn write_csv(rows: &[ExportRow], path: &Path) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_csv_to(rows, file)
}

/// Write the header line and one record per row to any writer
pub fn write_csv_to<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(HEADERS)?;
    for row in rows {
        wtr.write_record(row.cells())?;
    }

    wtr.flush()?;
    Ok(())
}
