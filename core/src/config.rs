//! Runtime configuration for ingestion and tracking.
//!
//! Loaded from a single JSON file; every field has a default so a missing
//! config file is not an error. In tests, use `TrackerConfig::default()`.

use serde::{Deserialize, Serialize};

/// Header labels of the logical columns in the portal export.
///
/// The portal occasionally renames headers between releases, so the mapping
/// is configuration rather than code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub subscriber_id: String,
    pub technician: String,
    pub team: String,
    pub device: String,
    pub port: String,
    pub status: String,
    pub report_date: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            subscriber_id: "Account".into(),
            technician: "Nhan vien".into(),
            team: "To".into(),
            device: "Device".into(),
            port: "Port".into(),
            status: "Status".into(),
            report_date: "Ngay".into(),
        }
    }
}

/// What to do when a subscriber reappears after an ended gap.
///
/// The two historical import paths disagreed on this, so it is surfaced as
/// an explicit flag instead of silently picking one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReappearancePolicy {
    /// Resume the old counter: day N of the old episode becomes day N+1.
    ContinueCounter,
    /// Start a fresh episode at day 1 (first_seen is kept for history).
    NewEpisode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub columns: ColumnMap,
    pub reappearance: ReappearancePolicy,
    /// Worksheet to read; None means the first sheet in the workbook.
    pub sheet: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            reappearance: ReappearancePolicy::ContinueCounter,
            sheet: None,
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: TrackerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
