//! Shared primitive types used across the tracker.

use serde::{Deserialize, Serialize};

/// A subscriber identifier as it appears in the portal export.
pub type SubscriberId = String;

/// Calendar date a report was generated for. One report = one day.
pub type ReportDate = chrono::NaiveDate;

/// How a subscriber moved between yesterday's and today's snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    New,
    Ended,
    Persisting,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::New => "new",
            ChangeKind::Ended => "ended",
            ChangeKind::Persisting => "persisting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(ChangeKind::New),
            "ended" => Some(ChangeKind::Ended),
            "persisting" => Some(ChangeKind::Persisting),
            _ => None,
        }
    }
}

/// Lifecycle of a tracking row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Active,
    Ended,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Active => "active",
            TrackingStatus::Ended => "ended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TrackingStatus::Active),
            "ended" => Some(TrackingStatus::Ended),
            _ => None,
        }
    }
}
