//! Day-over-day snapshot diffing and continuity tracking.
//!
//! Given today's subscriber-id set and yesterday's, partition into
//! New / Ended / Persisting and update the tracking table accordingly.
//! All side effects for one date are applied in a single transaction:
//! a crash mid-run leaves nothing half-written, and re-running a date
//! produces byte-identical state.

use crate::{
    config::{ReappearancePolicy, TrackerConfig},
    error::TrackResult,
    store::{ReportStore, TrackingRow},
    summary::summarize,
    types::{ChangeKind, ReportDate, SubscriberId, TrackingStatus},
};
use chrono::Days;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One derived classification row, the unit the summaries aggregate over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub report_date: ReportDate,
    pub subscriber_id: SubscriberId,
    pub kind: ChangeKind,
    pub team: Option<String>,
    pub technician: Option<String>,
}

/// Disjoint partitions of today's and yesterday's subscriber-id sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyDiff {
    pub new: BTreeSet<SubscriberId>,
    pub ended: BTreeSet<SubscriberId>,
    pub persisting: BTreeSet<SubscriberId>,
}

/// Pure set arithmetic. Empty/whitespace ids are dropped before diffing.
pub fn compute_daily_diff(
    today_ids: &BTreeSet<SubscriberId>,
    yesterday_ids: &BTreeSet<SubscriberId>,
) -> DailyDiff {
    let valid = |id: &&SubscriberId| !id.trim().is_empty();
    let today: BTreeSet<_> = today_ids.iter().filter(valid).cloned().collect();
    let yesterday: BTreeSet<_> = yesterday_ids.iter().filter(valid).cloned().collect();

    DailyDiff {
        new: today.difference(&yesterday).cloned().collect(),
        ended: yesterday.difference(&today).cloned().collect(),
        persisting: today.intersection(&yesterday).cloned().collect(),
    }
}

/// Counts reported back to the caller after a date run.
#[derive(Debug, Clone, Default)]
pub struct DiffOutcome {
    pub new: usize,
    pub ended: usize,
    pub persisting: usize,
    pub skipped: usize,
}

pub struct DiffEngine<'a> {
    store: &'a ReportStore,
    config: TrackerConfig,
}

impl<'a> DiffEngine<'a> {
    pub fn new(store: &'a ReportStore, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Diff `date` against `prev` (default: the calendar day before) and
    /// persist tracking updates, change records and the daily summary.
    ///
    /// A missing prior snapshot means an empty yesterday set: every
    /// subscriber today is classified NEW.
    pub fn run_for_date(
        &self,
        date: ReportDate,
        prev: Option<ReportDate>,
    ) -> TrackResult<DiffOutcome> {
        let prev = prev.unwrap_or_else(|| date - Days::new(1));

        self.store.run_in_transaction(|store| {
            let today_ids = store.subscriber_ids_on(date)?;
            let yesterday_ids = store.subscriber_ids_on(prev)?;
            let diff = compute_daily_diff(&today_ids, &yesterday_ids);

            log::info!(
                "diff {date} vs {prev}: {} new, {} ended, {} persisting",
                diff.new.len(),
                diff.ended.len(),
                diff.persisting.len(),
            );

            // Derived tables are recomputed, never appended to.
            store.delete_changes_on(date)?;
            store.delete_daily_summary_on(date)?;

            // Today's raw rows, for team/technician lookups.
            let today_rows: BTreeMap<SubscriberId, (Option<String>, Option<String>)> = store
                .snapshot_rows_on(date)?
                .into_iter()
                .map(|r| (r.subscriber_id.clone(), (r.team, r.technician)))
                .collect();

            let mut changes: Vec<ChangeRecord> = Vec::new();
            let mut outcome = DiffOutcome::default();

            for id in &diff.new {
                let Some((team, technician)) = today_rows.get(id).cloned() else {
                    // Diffed id with no matching raw row for the day.
                    log::warn!("{date}: new subscriber {id} has no snapshot row, skipping");
                    outcome.skipped += 1;
                    continue;
                };
                self.apply_new(store, date, id, team.clone(), technician.clone())?;
                changes.push(ChangeRecord {
                    report_date: date,
                    subscriber_id: id.clone(),
                    kind: ChangeKind::New,
                    team,
                    technician,
                });
                outcome.new += 1;
            }

            for id in &diff.persisting {
                let (team, technician) = today_rows.get(id).cloned().unwrap_or_default();
                self.apply_persisting(store, date, prev, id, team.clone(), technician.clone())?;
                changes.push(ChangeRecord {
                    report_date: date,
                    subscriber_id: id.clone(),
                    kind: ChangeKind::Persisting,
                    team,
                    technician,
                });
                outcome.persisting += 1;
            }

            for id in &diff.ended {
                store.mark_tracking_ended(id)?;
                // Subscriber is absent today; last-known values come from
                // the tracking row.
                let (team, technician) = match store.get_tracking(id)? {
                    Some(row) => (row.team, row.technician),
                    None => (None, None),
                };
                changes.push(ChangeRecord {
                    report_date: date,
                    subscriber_id: id.clone(),
                    kind: ChangeKind::Ended,
                    team,
                    technician,
                });
                outcome.ended += 1;
            }

            for record in &changes {
                store.insert_change(record)?;
            }

            for row in summarize(&changes) {
                store.insert_daily_summary(date, &row)?;
            }

            Ok(outcome)
        })
    }

    fn apply_new(
        &self,
        store: &ReportStore,
        date: ReportDate,
        id: &str,
        team: Option<String>,
        technician: Option<String>,
    ) -> TrackResult<()> {
        match store.get_tracking(id)? {
            None => store.upsert_tracking(&TrackingRow {
                subscriber_id: id.to_string(),
                first_seen: date,
                episode_start: date,
                last_seen: date,
                consecutive_days: 1,
                team,
                technician,
                status: TrackingStatus::Active,
            }),
            // Reappearance after a gap. last_seen >= date means this date was
            // already applied; doing nothing keeps the run idempotent.
            Some(existing) if existing.last_seen < date => {
                let (episode_start, consecutive_days) = match self.config.reappearance {
                    ReappearancePolicy::NewEpisode => (date, 1),
                    ReappearancePolicy::ContinueCounter => {
                        let days = existing.consecutive_days + 1;
                        // Back-date the episode anchor so the computed
                        // counter stays consistent on later persisting days.
                        (date - Days::new((days - 1) as u64), days)
                    }
                };
                store.upsert_tracking(&TrackingRow {
                    subscriber_id: id.to_string(),
                    first_seen: existing.first_seen,
                    episode_start,
                    last_seen: date,
                    consecutive_days,
                    team,
                    technician,
                    status: TrackingStatus::Active,
                })
            }
            Some(_) => Ok(()),
        }
    }

    fn apply_persisting(
        &self,
        store: &ReportStore,
        date: ReportDate,
        prev: ReportDate,
        id: &str,
        team: Option<String>,
        technician: Option<String>,
    ) -> TrackResult<()> {
        match store.get_tracking(id)? {
            Some(existing) => {
                // Counter is computed, not incremented: re-running the same
                // date cannot inflate it.
                let consecutive_days =
                    ((date - existing.episode_start).num_days() + 1).max(1);
                store.upsert_tracking(&TrackingRow {
                    subscriber_id: id.to_string(),
                    first_seen: existing.first_seen,
                    episode_start: existing.episode_start,
                    last_seen: date,
                    consecutive_days,
                    team,
                    technician,
                    status: TrackingStatus::Active,
                })
            }
            // Persisting id with no tracking row: snapshots predate the
            // tracker. Treat the visible episode as starting on the prior
            // snapshot's date.
            None => store.upsert_tracking(&TrackingRow {
                subscriber_id: id.to_string(),
                first_seen: prev,
                episode_start: prev,
                last_seen: date,
                consecutive_days: (date - prev).num_days() + 1,
                team,
                technician,
                status: TrackingStatus::Active,
            }),
        }
    }
}
