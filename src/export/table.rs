//! Terminal rendering of the entry list

use std::fmt::Write;

use super::ExportZone;
use crate::entries::TruckEntry;

const COMMENT_WIDTH: usize = 30;

/// Render entries as a fixed-width table, newest first as given.
///
/// The id column is included so rows can be targeted for deletion.
pub fn render_table(entries: &[TruckEntry], zone: ExportZone) -> String {
    let mut out = String::new();

    if entries.is_empty() {
        out.push_str("No entries recorded yet.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<36} {:<15} {:>13} {:<30} {:<10} {:<10} {:<10}",
        "ID", "Truck ID", "Weight (tons)", "Comments", "Date", "Start", "Stop"
    );
    let _ = writeln!(out, "{}", "-".repeat(130));

    for (entry, row) in entries.iter().zip(zone.rows(entries)) {
        let _ = writeln!(
            out,
            "{:<36} {:<15} {:>13} {:<30} {:<10} {:<10} {:<10}",
            entry.id,
            row.truck_id,
            row.weight,
            truncate(&row.comments, COMMENT_WIDTH),
            row.date,
            row.start_time,
            row.stop_time
        );
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
