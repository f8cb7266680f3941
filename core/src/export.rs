//! Trend export workbook.
//!
//! One sheet per period grouping (daily / weekly / monthly summaries over
//! the requested range), then one sheet per technician listing that
//! technician's currently affected subscribers, longest-running first.

use crate::{
    error::TrackResult,
    store::{ReportStore, TrackingRow},
    summary::{month_buckets, rebuild_rollups, week_buckets, SummaryRow},
    types::ReportDate,
};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::BTreeMap;
use std::path::Path;

const SUMMARY_HEADER: [&str; 6] = [
    "Team",
    "Technician",
    "New",
    "Ended",
    "Persisting",
    "Total current",
];

/// Build and save the export for [from, to]. Weekly/monthly rollup tables
/// are rebuilt first so the export never shows stale buckets.
pub fn write_trend_export(
    store: &ReportStore,
    from: ReportDate,
    to: ReportDate,
    path: &Path,
) -> TrackResult<()> {
    rebuild_rollups(store, from, to)?;

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    write_daily_sheet(workbook.add_worksheet(), store, from, to, &bold)?;
    write_period_sheet(
        workbook.add_worksheet(),
        "Weekly",
        week_buckets(from, to)
            .iter()
            .map(|b| Ok((b.label.clone(), store.weekly_summaries(&b.label)?)))
            .collect::<TrackResult<Vec<_>>>()?,
        &bold,
    )?;
    write_period_sheet(
        workbook.add_worksheet(),
        "Monthly",
        month_buckets(from, to)
            .iter()
            .map(|b| Ok((b.label.clone(), store.monthly_summaries(&b.label)?)))
            .collect::<TrackResult<Vec<_>>>()?,
        &bold,
    )?;

    write_technician_sheets(&mut workbook, store, &bold)?;

    workbook.save(path)?;
    log::info!("trend export written to {}", path.display());
    Ok(())
}

fn write_daily_sheet(
    sheet: &mut Worksheet,
    store: &ReportStore,
    from: ReportDate,
    to: ReportDate,
    bold: &Format,
) -> TrackResult<()> {
    sheet.set_name("Daily")?;
    sheet.write_with_format(0, 0, "Date", bold)?;
    for (col, label) in SUMMARY_HEADER.iter().enumerate() {
        sheet.write_with_format(0, col as u16 + 1, *label, bold)?;
    }
    for (i, (date, row)) in store.daily_summaries_between(from, to)?.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write(r, 0, date.to_string())?;
        write_summary_cells(sheet, r, 1, row)?;
    }
    Ok(())
}

fn write_period_sheet(
    sheet: &mut Worksheet,
    name: &str,
    periods: Vec<(String, Vec<SummaryRow>)>,
    bold: &Format,
) -> TrackResult<()> {
    sheet.set_name(name)?;
    sheet.write_with_format(0, 0, "Period", bold)?;
    for (col, label) in SUMMARY_HEADER.iter().enumerate() {
        sheet.write_with_format(0, col as u16 + 1, *label, bold)?;
    }
    let mut r = 1u32;
    for (label, rows) in periods {
        for row in rows {
            sheet.write(r, 0, label.as_str())?;
            write_summary_cells(sheet, r, 1, &row)?;
            r += 1;
        }
    }
    Ok(())
}

fn write_summary_cells(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    summary: &SummaryRow,
) -> TrackResult<()> {
    sheet.write(row, col, summary.team.as_deref().unwrap_or(""))?;
    sheet.write(row, col + 1, summary.technician.as_deref().unwrap_or(""))?;
    sheet.write(row, col + 2, summary.count_new)?;
    sheet.write(row, col + 3, summary.count_ended)?;
    sheet.write(row, col + 4, summary.count_persisting)?;
    sheet.write(row, col + 5, summary.total_current)?;
    Ok(())
}

fn write_technician_sheets(
    workbook: &mut Workbook,
    store: &ReportStore,
    bold: &Format,
) -> TrackResult<()> {
    // active_tracking_rows is already ordered by consecutive_days desc.
    let mut by_technician: BTreeMap<String, Vec<TrackingRow>> = BTreeMap::new();
    for row in store.active_tracking_rows()? {
        let key = row
            .technician
            .clone()
            .unwrap_or_else(|| "Unassigned".to_string());
        by_technician.entry(key).or_default().push(row);
    }

    let mut used_names = vec!["Daily".to_string(), "Weekly".to_string(), "Monthly".to_string()];
    for (technician, rows) in by_technician {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&sheet_name(&technician, &mut used_names))?;
        for (col, label) in ["Subscriber", "Team", "Days", "First seen", "Last seen"]
            .iter()
            .enumerate()
        {
            sheet.write_with_format(0, col as u16, *label, bold)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            sheet.write(r, 0, row.subscriber_id.as_str())?;
            sheet.write(r, 1, row.team.as_deref().unwrap_or(""))?;
            sheet.write(r, 2, row.consecutive_days)?;
            sheet.write(r, 3, row.first_seen.to_string())?;
            sheet.write(r, 4, row.last_seen.to_string())?;
        }
    }
    Ok(())
}

// Worksheet names: 31 chars max, no []:*?/\ and no leading/trailing quote.
// Collisions get a numeric suffix.
fn sheet_name(raw: &str, used: &mut Vec<String>) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\' | '\''))
        .collect();
    let cleaned = cleaned.trim();
    let base: String = if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned.chars().take(28).collect::<String>().trim().to_string()
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while used.iter().any(|u| u.eq_ignore_ascii_case(&candidate)) {
        candidate = format!("{base} {n}");
        n += 1;
    }
    used.push(candidate.clone());
    candidate
}
