//! Spreadsheet ingestion.
//!
//! Reads one portal export (one row per affected subscriber) and replaces
//! that day's snapshot. Per-row problems are logged and skipped; only a
//! missing file or an unreadable workbook is fatal.

use crate::{
    config::TrackerConfig,
    error::{TrackError, TrackResult},
    normalizer::normalize_opt,
    store::ReportStore,
    types::{ReportDate, SubscriberId},
};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Days;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One parsed report row, normalized and ready for the snapshot table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub subscriber_id: SubscriberId,
    pub technician_raw: Option<String>,
    pub technician: Option<String>,
    pub team: Option<String>,
    pub device: Option<String>,
    pub port: Option<String>,
    pub status: Option<String>,
}

/// A report parsed off disk: the date it covers and its rows.
#[derive(Debug, Clone)]
pub struct ParsedReport {
    pub report_date: ReportDate,
    pub rows: Vec<SnapshotRow>,
    pub skipped_rows: usize,
}

/// Ingest one day's report: parse, then delete-and-replace the day's
/// snapshot rows in a single transaction. Returns the report date and the
/// number of rows written.
pub fn ingest_report(
    store: &ReportStore,
    config: &TrackerConfig,
    path: &Path,
    date_override: Option<ReportDate>,
) -> TrackResult<(ReportDate, usize)> {
    let report = read_report(config, path, date_override)?;
    let written = store.run_in_transaction(|store| {
        store.replace_snapshot(report.report_date, &report.rows)
    })?;
    log::info!(
        "ingested {written} rows for {} from {} ({} skipped)",
        report.report_date,
        path.display(),
        report.skipped_rows,
    );
    Ok((report.report_date, written))
}

/// Parse a report file without touching the store.
pub fn read_report(
    config: &TrackerConfig,
    path: &Path,
    date_override: Option<ReportDate>,
) -> TrackResult<ParsedReport> {
    if !path.exists() {
        return Err(TrackError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = match &config.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(TrackError::Parse {
                what: "workbook",
                value: "no worksheets".into(),
            })?,
    };
    let range = workbook.worksheet_range(&sheet_name)?;

    // Portal exports sometimes carry preamble rows above the real header:
    // scan for the row containing the subscriber-id label.
    let columns = &config.columns;
    let mut header_row = None;
    for (idx, row) in range.rows().enumerate() {
        if row
            .iter()
            .any(|cell| cell_text(cell).as_deref() == Some(columns.subscriber_id.as_str()))
        {
            header_row = Some((idx, row));
            break;
        }
    }
    let (header_idx, header) = header_row.ok_or(TrackError::Parse {
        what: "header row",
        value: format!("no column named {:?}", columns.subscriber_id),
    })?;

    let find = |label: &str| {
        header
            .iter()
            .position(|cell| cell_text(cell).as_deref() == Some(label))
    };
    let idx_id = find(&columns.subscriber_id).ok_or(TrackError::Parse {
        what: "header row",
        value: columns.subscriber_id.clone(),
    })?;
    let idx_technician = find(&columns.technician);
    let idx_team = find(&columns.team);
    let idx_device = find(&columns.device);
    let idx_port = find(&columns.port);
    let idx_status = find(&columns.status);
    let idx_date = find(&columns.report_date);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    let mut report_date = None;

    for (offset, row) in range.rows().skip(header_idx + 1).enumerate() {
        let row_no = header_idx + 2 + offset;
        let subscriber_id = match row.get(idx_id).and_then(cell_text) {
            Some(id) => id,
            None => {
                log::warn!("{}: row {row_no} has no subscriber id, skipping", path.display());
                skipped += 1;
                continue;
            }
        };

        if report_date.is_none() {
            report_date = idx_date
                .and_then(|i| row.get(i))
                .and_then(cell_date);
        }

        let technician_raw = idx_technician.and_then(|i| row.get(i)).and_then(cell_text);
        rows.push(SnapshotRow {
            technician: normalize_opt(technician_raw.as_deref()),
            technician_raw,
            subscriber_id,
            team: idx_team.and_then(|i| row.get(i)).and_then(cell_text),
            device: idx_device.and_then(|i| row.get(i)).and_then(cell_text),
            port: idx_port.and_then(|i| row.get(i)).and_then(cell_text),
            status: idx_status.and_then(|i| row.get(i)).and_then(cell_text),
        });
    }

    let report_date = match (report_date, date_override) {
        (_, Some(given)) => given,
        (Some(parsed), None) => parsed,
        (None, None) => {
            let today = chrono::Local::now().date_naive();
            log::warn!(
                "{}: no parsable report date, falling back to {today}",
                path.display(),
            );
            today
        }
    };

    Ok(ParsedReport {
        report_date,
        rows,
        skipped_rows: skipped,
    })
}

/// Trimmed text of a cell; Empty and blank cells are None.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        other => {
            let text = other.to_string().trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
    }
}

/// Report date from a cell: Excel datetime serials and the date formats the
/// portal has been seen to emit.
fn cell_date(cell: &Data) -> Option<ReportDate> {
    match cell {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::Float(serial) => excel_serial_to_date(*serial),
        Data::Int(serial) => excel_serial_to_date(*serial as f64),
        other => {
            let text = cell_text(other)?;
            parse_date_text(&text)
        }
    }
}

// Excel serial day 1 = 1900-01-01, with the fictitious 1900-02-29 baked in,
// so the usable epoch is 1899-12-30.
fn excel_serial_to_date(serial: f64) -> Option<ReportDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = ReportDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial as u64))
}

fn parse_date_text(text: &str) -> Option<ReportDate> {
    const FORMATS: [&str; 6] = [
        "%Y-%m-%d",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| ReportDate::parse_from_str(text, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_text_formats() {
        let expected = ReportDate::from_ymd_opt(2024, 2, 5).unwrap();
        assert_eq!(parse_date_text("2024-02-05"), Some(expected));
        assert_eq!(parse_date_text("05/02/2024"), Some(expected));
        assert_eq!(parse_date_text("05-02-2024"), Some(expected));
        assert_eq!(parse_date_text("not a date"), None);
    }

    #[test]
    fn excel_serial_round_numbers() {
        // 45000 = 2023-03-15 in the 1900 date system.
        assert_eq!(
            excel_serial_to_date(45000.0),
            ReportDate::from_ymd_opt(2023, 3, 15)
        );
        assert_eq!(excel_serial_to_date(-3.0), None);
    }
}
