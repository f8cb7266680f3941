//! Continuity tracking queries.

use super::{parse_date, ReportStore};
use crate::error::{TrackError, TrackResult};
use crate::types::{ReportDate, SubscriberId, TrackingStatus};
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRow {
    pub subscriber_id: SubscriberId,
    pub first_seen: ReportDate,
    pub episode_start: ReportDate,
    pub last_seen: ReportDate,
    pub consecutive_days: i64,
    pub team: Option<String>,
    pub technician: Option<String>,
    pub status: TrackingStatus,
}

type RawTrackingRow = (
    String,
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    String,
);

fn into_row(raw: RawTrackingRow) -> TrackResult<TrackingRow> {
    let (id, first, episode, last, days, team, technician, status) = raw;
    Ok(TrackingRow {
        subscriber_id: id,
        first_seen: parse_date(&first)?,
        episode_start: parse_date(&episode)?,
        last_seen: parse_date(&last)?,
        consecutive_days: days,
        team,
        technician,
        status: TrackingStatus::parse(&status).ok_or(TrackError::Parse {
            what: "tracking status",
            value: status,
        })?,
    })
}

const TRACKING_COLUMNS: &str = "subscriber_id, first_seen, episode_start, last_seen,
                    consecutive_days, team, technician, status";

fn map_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTrackingRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

impl ReportStore {
    pub fn get_tracking(&self, subscriber_id: &str) -> TrackResult<Option<TrackingRow>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {TRACKING_COLUMNS} FROM tracking WHERE subscriber_id = ?1"),
                params![subscriber_id],
                map_raw,
            )
            .optional()?;
        raw.map(into_row).transpose()
    }

    /// Insert-or-replace the full row. All counter arithmetic happens in the
    /// diff engine; the store only persists what it is given.
    pub fn upsert_tracking(&self, row: &TrackingRow) -> TrackResult<()> {
        self.conn.execute(
            "INSERT INTO tracking (
                subscriber_id, first_seen, episode_start, last_seen,
                consecutive_days, team, technician, status
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(subscriber_id) DO UPDATE SET
                first_seen = excluded.first_seen,
                episode_start = excluded.episode_start,
                last_seen = excluded.last_seen,
                consecutive_days = excluded.consecutive_days,
                team = excluded.team,
                technician = excluded.technician,
                status = excluded.status",
            params![
                row.subscriber_id,
                row.first_seen.to_string(),
                row.episode_start.to_string(),
                row.last_seen.to_string(),
                row.consecutive_days,
                row.team,
                row.technician,
                row.status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Freeze a subscriber: status flips to ended, counter and last_seen keep
    /// their final values.
    pub fn mark_tracking_ended(&self, subscriber_id: &str) -> TrackResult<()> {
        self.conn.execute(
            "UPDATE tracking SET status = 'ended' WHERE subscriber_id = ?1",
            params![subscriber_id],
        )?;
        Ok(())
    }

    pub fn active_tracking_rows(&self) -> TrackResult<Vec<TrackingRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRACKING_COLUMNS} FROM tracking
             WHERE status = 'active'
             ORDER BY consecutive_days DESC, subscriber_id ASC"
        ))?;
        let raw = stmt
            .query_map([], map_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(into_row).collect()
    }

    pub fn tracking_count(&self, status: Option<TrackingStatus>) -> TrackResult<i64> {
        let count: i64 = match status {
            Some(s) => self.conn.query_row(
                "SELECT COUNT(*) FROM tracking WHERE status = ?1",
                params![s.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM tracking", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    pub fn max_consecutive_days(&self) -> TrackResult<i64> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(consecutive_days) FROM tracking",
            [],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }
}
