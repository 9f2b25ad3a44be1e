//! Spreadsheet (XLSX) export

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;

use super::{ExportRow, HEADERS};

/// Name of the single worksheet
pub const SHEET_NAME: &str = "Truck Entries";

/// Character widths, in header order
pub const COLUMN_WIDTHS: [f64; 6] = [15.0, 12.0, 30.0, 12.0, 12.0, 12.0];

/// Write rows to an XLSX file at `path`
pub fn write_xlsx(rows: &[ExportRow], path: &Path) -> Result<(), XlsxError> {
    let mut workbook = build_workbook(rows)?;
    workbook.save(path)
}

/// Render rows into an in-memory XLSX document
pub fn xlsx_bytes(rows: &[ExportRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = build_workbook(rows)?;
    workbook.save_to_buffer()
}

fn build_workbook(rows: &[ExportRow]) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    write_entries_sheet(sheet, rows)?;
    Ok(workbook)
}

fn write_entries_sheet(sheet: &mut Worksheet, rows: &[ExportRow]) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold();

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &row.truck_id)?;
        sheet.write_number(r, 1, row.weight)?;
        sheet.write_string(r, 2, &row.comments)?;
        sheet.write_string(r, 3, &row.date)?;
        sheet.write_string(r, 4, &row.start_time)?;
        sheet.write_string(r, 5, &row.stop_time)?;
    }

    Ok(())
}
