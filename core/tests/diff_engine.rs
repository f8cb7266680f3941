//! Integration tests for the diff engine.
//!
//! Covers the core partition arithmetic, the missing-prior-snapshot case,
//! exclusion of blank subscriber ids, and double-run idempotence of the
//! whole date pipeline.

use chrono::NaiveDate;
use fibertrack_core::{
    config::TrackerConfig,
    diff::{compute_daily_diff, DiffEngine},
    ingest::SnapshotRow,
    store::ReportStore,
    types::ChangeKind,
};
use std::collections::BTreeSet;

fn store() -> ReportStore {
    let store = ReportStore::in_memory().expect("in_memory failed");
    store.migrate().expect("migrate failed");
    store
}

fn d(s: &str) -> NaiveDate {
    s.parse().expect("bad test date")
}

fn row(id: &str) -> SnapshotRow {
    SnapshotRow {
        subscriber_id: id.to_string(),
        team: Some("Team A".to_string()),
        technician: Some("Tech 1".to_string()),
        ..SnapshotRow::default()
    }
}

fn ids(raw: &[&str]) -> BTreeSet<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Pure partition arithmetic
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn partitions_are_disjoint_and_complete() {
    let diff = compute_daily_diff(&ids(&["1", "2", "3"]), &ids(&["2", "3", "4"]));
    assert_eq!(diff.new, ids(&["1"]));
    assert_eq!(diff.ended, ids(&["4"]));
    assert_eq!(diff.persisting, ids(&["2", "3"]));
}

#[test]
fn empty_yesterday_means_everything_is_new() {
    let diff = compute_daily_diff(&ids(&["1", "2"]), &BTreeSet::new());
    assert_eq!(diff.new, ids(&["1", "2"]));
    assert!(diff.ended.is_empty());
    assert!(diff.persisting.is_empty());
}

#[test]
fn blank_ids_are_excluded_before_diffing() {
    let diff = compute_daily_diff(&ids(&["1", "  ", ""]), &ids(&["", "2"]));
    assert_eq!(diff.new, ids(&["1"]));
    assert_eq!(diff.ended, ids(&["2"]));
    assert!(diff.persisting.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// End-to-end over the store
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn run_for_date_classifies_and_persists_changes() {
    let store = store();
    store
        .replace_snapshot(d("2024-02-04"), &[row("2"), row("3"), row("4")])
        .unwrap();
    store
        .replace_snapshot(d("2024-02-05"), &[row("1"), row("2"), row("3")])
        .unwrap();

    let engine = DiffEngine::new(&store, TrackerConfig::default());
    let outcome = engine.run_for_date(d("2024-02-05"), None).unwrap();
    assert_eq!((outcome.new, outcome.ended, outcome.persisting), (1, 1, 2));

    let changes = store.changes_on(d("2024-02-05")).unwrap();
    let kind_of = |id: &str| {
        changes
            .iter()
            .find(|c| c.subscriber_id == id)
            .map(|c| c.kind)
    };
    assert_eq!(kind_of("1"), Some(ChangeKind::New));
    assert_eq!(kind_of("4"), Some(ChangeKind::Ended));
    assert_eq!(kind_of("2"), Some(ChangeKind::Persisting));
    assert_eq!(kind_of("3"), Some(ChangeKind::Persisting));
}

#[test]
fn missing_prior_snapshot_classifies_all_new() {
    let store = store();
    store
        .replace_snapshot(d("2024-02-05"), &[row("1"), row("2")])
        .unwrap();

    let engine = DiffEngine::new(&store, TrackerConfig::default());
    let outcome = engine.run_for_date(d("2024-02-05"), None).unwrap();
    assert_eq!((outcome.new, outcome.ended, outcome.persisting), (2, 0, 0));
}

#[test]
fn rerunning_a_date_is_idempotent() {
    let store = store();
    store
        .replace_snapshot(d("2024-02-04"), &[row("2"), row("3")])
        .unwrap();
    store
        .replace_snapshot(d("2024-02-05"), &[row("1"), row("2"), row("3")])
        .unwrap();

    let engine = DiffEngine::new(&store, TrackerConfig::default());
    engine.run_for_date(d("2024-02-05"), None).unwrap();

    let changes_first = store.changes_on(d("2024-02-05")).unwrap();
    let summary_first = store
        .daily_summaries_between(d("2024-02-05"), d("2024-02-05"))
        .unwrap();
    let tracking_first = store.get_tracking("2").unwrap().unwrap();

    engine.run_for_date(d("2024-02-05"), None).unwrap();

    assert_eq!(store.changes_on(d("2024-02-05")).unwrap(), changes_first);
    assert_eq!(
        store
            .daily_summaries_between(d("2024-02-05"), d("2024-02-05"))
            .unwrap(),
        summary_first
    );
    assert_eq!(store.get_tracking("2").unwrap().unwrap(), tracking_first);
}

#[test]
fn explicit_prev_date_overrides_the_calendar_rule() {
    let store = store();
    // A weekend gap: Friday snapshot, then Monday.
    store
        .replace_snapshot(d("2024-02-02"), &[row("1"), row("2")])
        .unwrap();
    store
        .replace_snapshot(d("2024-02-05"), &[row("1")])
        .unwrap();

    let engine = DiffEngine::new(&store, TrackerConfig::default());

    // Implicit prev (2024-02-04) has no snapshot: everything is NEW.
    let implicit = engine.run_for_date(d("2024-02-05"), None).unwrap();
    assert_eq!((implicit.new, implicit.ended, implicit.persisting), (1, 0, 0));

    // Explicit prev diffs against Friday.
    let explicit = engine
        .run_for_date(d("2024-02-05"), Some(d("2024-02-02")))
        .unwrap();
    assert_eq!((explicit.new, explicit.ended, explicit.persisting), (0, 1, 1));
}
