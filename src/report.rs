use std::fs::File;
use std::io::Write;
use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::db::{self, ReportRow};
use crate::error::EtlError;

const HEADER: [&str; 5] = ["description", "price", "currency", "stock", "location"];

/// Render report rows as delimited text. Fields holding the delimiter, a
/// quote, or a line break are quoted; embedded quotes are doubled.
pub fn render<W: Write>(rows: &[ReportRow], out: W) -> Result<(), EtlError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;
    for row in rows {
        let price = row.price.to_string();
        let stock = row.stock.to_string();
        writer.write_record([
            row.description.as_str(),
            price.as_str(),
            row.currency.as_str(),
            stock.as_str(),
            row.location.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Run the join first and create the file after, so a failed query
/// leaves no output file behind.
pub fn write_report(conn: &Connection, path: &Path) -> Result<usize, EtlError> {
    let rows = db::fetch_report_rows(conn)?;
    let file = File::create(path)?;
    render(&rows, file)?;
    info!("wrote {} report rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

// ── Tests ──
