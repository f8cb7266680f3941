//! Summary table queries and period rollups.

use super::{parse_date, ReportStore};
use crate::error::TrackResult;
use crate::summary::SummaryRow;
use crate::types::ReportDate;
use rusqlite::params;

/// Whole-store statistics for the `stats` entry point.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub snapshot_days: i64,
    pub snapshot_rows: i64,
    pub first_date: Option<ReportDate>,
    pub last_date: Option<ReportDate>,
    pub tracked_subscribers: i64,
    pub active_subscribers: i64,
    pub ended_subscribers: i64,
    pub max_consecutive_days: i64,
}

fn map_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<SummaryRow> {
    Ok(SummaryRow {
        team: row.get(0)?,
        technician: row.get(1)?,
        count_new: row.get(2)?,
        count_ended: row.get(3)?,
        count_persisting: row.get(4)?,
        total_current: row.get(5)?,
    })
}

impl ReportStore {
    pub fn delete_daily_summary_on(&self, date: ReportDate) -> TrackResult<()> {
        self.conn.execute(
            "DELETE FROM daily_summary WHERE report_date = ?1",
            params![date.to_string()],
        )?;
        Ok(())
    }

    pub fn insert_daily_summary(&self, date: ReportDate, row: &SummaryRow) -> TrackResult<()> {
        self.conn.execute(
            "INSERT INTO daily_summary (
                report_date, team, technician,
                count_new, count_ended, count_persisting, total_current
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                date.to_string(),
                row.team,
                row.technician,
                row.count_new,
                row.count_ended,
                row.count_persisting,
                row.total_current,
            ],
        )?;
        Ok(())
    }

    pub fn daily_summaries_between(
        &self,
        from: ReportDate,
        to: ReportDate,
    ) -> TrackResult<Vec<(ReportDate, SummaryRow)>> {
        let mut stmt = self.conn.prepare(
            "SELECT report_date, team, technician,
                    count_new, count_ended, count_persisting, total_current
             FROM daily_summary
             WHERE report_date >= ?1 AND report_date <= ?2
             ORDER BY report_date ASC, team ASC, technician ASC",
        )?;
        let raw = stmt
            .query_map(params![from.to_string(), to.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    SummaryRow {
                        team: row.get(1)?,
                        technician: row.get(2)?,
                        count_new: row.get(3)?,
                        count_ended: row.get(4)?,
                        count_persisting: row.get(5)?,
                        total_current: row.get(6)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(d, row)| Ok((parse_date(&d)?, row)))
            .collect()
    }

    /// Delete-then-insert one period bucket of a rollup table, aggregating
    /// daily_change rows in [start, end].
    fn rebuild_period(
        &self,
        table: &str,
        period: &str,
        start: ReportDate,
        end: ReportDate,
    ) -> TrackResult<()> {
        // Table name is one of two compile-time constants, never user input.
        self.conn.execute(
            &format!("DELETE FROM {table} WHERE period = ?1"),
            params![period],
        )?;
        self.conn.execute(
            &format!(
                "INSERT INTO {table} (
                    period, team, technician,
                    count_new, count_ended, count_persisting, total_current
                 )
                 SELECT ?1, team, technician,
                        SUM(change_kind = 'new'),
                        SUM(change_kind = 'ended'),
                        SUM(change_kind = 'persisting'),
                        SUM(change_kind = 'new') + SUM(change_kind = 'persisting')
                 FROM daily_change
                 WHERE report_date >= ?2 AND report_date <= ?3
                 GROUP BY team, technician"
            ),
            params![period, start.to_string(), end.to_string()],
        )?;
        Ok(())
    }

    pub fn rebuild_weekly_summary(
        &self,
        period: &str,
        start: ReportDate,
        end: ReportDate,
    ) -> TrackResult<()> {
        self.rebuild_period("weekly_summary", period, start, end)
    }

    pub fn rebuild_monthly_summary(
        &self,
        period: &str,
        start: ReportDate,
        end: ReportDate,
    ) -> TrackResult<()> {
        self.rebuild_period("monthly_summary", period, start, end)
    }

    fn period_summaries(&self, table: &str, period: &str) -> TrackResult<Vec<SummaryRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT team, technician,
                    count_new, count_ended, count_persisting, total_current
             FROM {table}
             WHERE period = ?1
             ORDER BY team ASC, technician ASC"
        ))?;
        let rows = stmt
            .query_map(params![period], map_summary)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn weekly_summaries(&self, period: &str) -> TrackResult<Vec<SummaryRow>> {
        self.period_summaries("weekly_summary", period)
    }

    pub fn monthly_summaries(&self, period: &str) -> TrackResult<Vec<SummaryRow>> {
        self.period_summaries("monthly_summary", period)
    }

    pub fn stats(&self) -> TrackResult<StoreStats> {
        let (snapshot_days, snapshot_rows, first, last): (i64, i64, Option<String>, Option<String>) =
            self.conn.query_row(
                "SELECT COUNT(DISTINCT report_date), COUNT(*),
                        MIN(report_date), MAX(report_date)
                 FROM snapshot",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        Ok(StoreStats {
            snapshot_days,
            snapshot_rows,
            first_date: first.as_deref().map(parse_date).transpose()?,
            last_date: last.as_deref().map(parse_date).transpose()?,
            tracked_subscribers: self.tracking_count(None)?,
            active_subscribers: self.tracking_count(Some(crate::types::TrackingStatus::Active))?,
            ended_subscribers: self.tracking_count(Some(crate::types::TrackingStatus::Ended))?,
            max_consecutive_days: self.max_consecutive_days()?,
        })
    }
}
