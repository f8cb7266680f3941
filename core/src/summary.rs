//! Group-by-count aggregation over change records.

use crate::diff::ChangeRecord;
use crate::error::TrackResult;
use crate::store::ReportStore;
use crate::types::{ChangeKind, ReportDate};
use chrono::{Datelike, Days};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts for one (team, technician) group. A NULL team or technician forms
/// its own group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub team: Option<String>,
    pub technician: Option<String>,
    pub count_new: i64,
    pub count_ended: i64,
    pub count_persisting: i64,
    /// new + persisting: subscribers affected right now.
    pub total_current: i64,
}

/// Pure group-by-count; ordering is deterministic (team, then technician).
pub fn summarize(changes: &[ChangeRecord]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(Option<String>, Option<String>), SummaryRow> = BTreeMap::new();

    for change in changes {
        let key = (change.team.clone(), change.technician.clone());
        let row = groups.entry(key).or_insert_with(|| SummaryRow {
            team: change.team.clone(),
            technician: change.technician.clone(),
            ..SummaryRow::default()
        });
        match change.kind {
            ChangeKind::New => row.count_new += 1,
            ChangeKind::Ended => row.count_ended += 1,
            ChangeKind::Persisting => row.count_persisting += 1,
        }
    }

    let mut rows: Vec<SummaryRow> = groups.into_values().collect();
    for row in &mut rows {
        row.total_current = row.count_new + row.count_persisting;
    }
    rows
}

/// A period bucket with its inclusive date bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodBucket {
    pub label: String,
    pub start: ReportDate,
    pub end: ReportDate,
}

/// ISO-week buckets ('YYYY-Www') intersecting [from, to].
pub fn week_buckets(from: ReportDate, to: ReportDate) -> Vec<PeriodBucket> {
    let mut buckets = Vec::new();
    let mut cursor = from - Days::new(from.weekday().num_days_from_monday() as u64);
    while cursor <= to {
        let iso = cursor.iso_week();
        buckets.push(PeriodBucket {
            label: format!("{}-W{:02}", iso.year(), iso.week()),
            start: cursor,
            end: cursor + Days::new(6),
        });
        cursor = cursor + Days::new(7);
    }
    buckets
}

/// Month buckets ('YYYY-MM') intersecting [from, to].
pub fn month_buckets(from: ReportDate, to: ReportDate) -> Vec<PeriodBucket> {
    let mut buckets = Vec::new();
    let mut year = from.year();
    let mut month = from.month();
    loop {
        let start = ReportDate::from_ymd_opt(year, month, 1)
            .expect("first of month is always valid");
        if start > to {
            break;
        }
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let end = ReportDate::from_ymd_opt(next_year, next_month, 1)
            .expect("first of month is always valid")
            - Days::new(1);
        if end >= from {
            buckets.push(PeriodBucket {
                label: format!("{year:04}-{month:02}"),
                start,
                end,
            });
        }
        year = next_year;
        month = next_month;
    }
    buckets
}

/// Rebuild the weekly and monthly rollup tables for every bucket touching
/// [from, to]. Each bucket is delete-then-insert, so re-running is safe.
pub fn rebuild_rollups(store: &ReportStore, from: ReportDate, to: ReportDate) -> TrackResult<()> {
    store.run_in_transaction(|store| {
        for bucket in week_buckets(from, to) {
            store.rebuild_weekly_summary(&bucket.label, bucket.start, bucket.end)?;
        }
        for bucket in month_buckets(from, to) {
            store.rebuild_monthly_summary(&bucket.label, bucket.start, bucket.end)?;
        }
        Ok(())
    })
}
