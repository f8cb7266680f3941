//! fibertrack-core: snapshot tracking for high-attenuation subscriber
//! reports.
//!
//! Daily portal exports are ingested into per-day snapshots; a diff engine
//! classifies every subscriber as new / ended / persisting against the prior
//! day, maintains a continuity counter per subscriber, and feeds
//! daily/weekly/monthly summaries and a trend export workbook.

pub mod config;
pub mod diff;
pub mod error;
pub mod export;
pub mod ingest;
pub mod normalizer;
pub mod store;
pub mod summary;
pub mod types;
