//! Per-day snapshot queries.

use super::{parse_date, ReportStore};
use crate::error::TrackResult;
use crate::ingest::SnapshotRow;
use crate::types::{ReportDate, SubscriberId};
use rusqlite::params;
use std::collections::BTreeSet;

/// A snapshot row as persisted, date included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshotRow {
    pub report_date: ReportDate,
    pub subscriber_id: SubscriberId,
    pub technician_raw: Option<String>,
    pub technician: Option<String>,
    pub team: Option<String>,
    pub device: Option<String>,
    pub port: Option<String>,
    pub status: Option<String>,
}

impl ReportStore {
    /// Delete-then-insert the whole day. Caller wraps this in a transaction.
    pub fn replace_snapshot(&self, date: ReportDate, rows: &[SnapshotRow]) -> TrackResult<usize> {
        self.conn.execute(
            "DELETE FROM snapshot WHERE report_date = ?1",
            params![date.to_string()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO snapshot (
                report_date, subscriber_id, technician_raw, technician,
                team, device, port, status
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        let mut inserted = 0usize;
        for row in rows {
            stmt.execute(params![
                date.to_string(),
                row.subscriber_id,
                row.technician_raw,
                row.technician,
                row.team,
                row.device,
                row.port,
                row.status,
            ])?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Subscriber ids present on a date. Empty/whitespace ids are excluded
    /// here so they never reach the diff.
    pub fn subscriber_ids_on(&self, date: ReportDate) -> TrackResult<BTreeSet<SubscriberId>> {
        let mut stmt = self.conn.prepare(
            "SELECT subscriber_id FROM snapshot
             WHERE report_date = ?1 AND TRIM(subscriber_id) <> ''",
        )?;
        let ids = stmt
            .query_map(params![date.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(ids)
    }

    pub fn snapshot_rows_on(&self, date: ReportDate) -> TrackResult<Vec<StoredSnapshotRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT report_date, subscriber_id, technician_raw, technician,
                    team, device, port, status
             FROM snapshot WHERE report_date = ?1
             ORDER BY subscriber_id ASC",
        )?;
        let raw = stmt
            .query_map(params![date.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(d, id, traw, tech, team, device, port, status)| {
                Ok(StoredSnapshotRow {
                    report_date: parse_date(&d)?,
                    subscriber_id: id,
                    technician_raw: traw,
                    technician: tech,
                    team,
                    device,
                    port,
                    status,
                })
            })
            .collect()
    }

    pub fn snapshot_count_on(&self, date: ReportDate) -> TrackResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM snapshot WHERE report_date = ?1",
            params![date.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn snapshot_dates(&self) -> TrackResult<Vec<ReportDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT report_date FROM snapshot ORDER BY report_date ASC")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter().map(|s| parse_date(s)).collect()
    }

    pub fn latest_snapshot_date(&self) -> TrackResult<Option<ReportDate>> {
        let raw: Option<String> = self.conn.query_row(
            "SELECT MAX(report_date) FROM snapshot",
            [],
            |row| row.get(0),
        )?;
        raw.as_deref().map(parse_date).transpose()
    }
}
