//! Daily change record queries.

use super::{parse_date, ReportStore};
use crate::diff::ChangeRecord;
use crate::error::{TrackError, TrackResult};
use crate::types::{ChangeKind, ReportDate};
use rusqlite::params;

type RawChange = (String, String, String, Option<String>, Option<String>);

fn into_record(raw: RawChange) -> TrackResult<ChangeRecord> {
    let (date, id, kind, team, technician) = raw;
    Ok(ChangeRecord {
        report_date: parse_date(&date)?,
        subscriber_id: id,
        kind: ChangeKind::parse(&kind).ok_or(TrackError::Parse {
            what: "change kind",
            value: kind,
        })?,
        team,
        technician,
    })
}

impl ReportStore {
    pub fn delete_changes_on(&self, date: ReportDate) -> TrackResult<()> {
        self.conn.execute(
            "DELETE FROM daily_change WHERE report_date = ?1",
            params![date.to_string()],
        )?;
        Ok(())
    }

    pub fn insert_change(&self, record: &ChangeRecord) -> TrackResult<()> {
        self.conn.execute(
            "INSERT INTO daily_change (report_date, subscriber_id, change_kind, team, technician)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.report_date.to_string(),
                record.subscriber_id,
                record.kind.as_str(),
                record.team,
                record.technician,
            ],
        )?;
        Ok(())
    }

    pub fn changes_on(&self, date: ReportDate) -> TrackResult<Vec<ChangeRecord>> {
        self.changes_between(date, date)
    }

    pub fn changes_between(
        &self,
        from: ReportDate,
        to: ReportDate,
    ) -> TrackResult<Vec<ChangeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT report_date, subscriber_id, change_kind, team, technician
             FROM daily_change
             WHERE report_date >= ?1 AND report_date <= ?2
             ORDER BY report_date ASC, subscriber_id ASC, change_kind ASC",
        )?;
        let raw = stmt
            .query_map(params![from.to_string(), to.to_string()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<Result<Vec<RawChange>, _>>()?;
        raw.into_iter().map(into_record).collect()
    }
}
