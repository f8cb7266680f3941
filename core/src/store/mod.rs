//! SQLite persistence layer.
//!
//! RULE: Only the store modules talk to the database.
//! Everything else calls store methods — it never executes SQL directly.

use crate::error::{TrackError, TrackResult};
use crate::types::ReportDate;
use rusqlite::Connection;

mod changes;
mod snapshot;
mod summary;
mod tracking;

pub use snapshot::StoredSnapshotRow;
pub use summary::StoreStats;
pub use tracking::TrackingRow;

pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    pub fn open(path: &str) -> TrackResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> TrackResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> TrackResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_snapshots.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_tracking.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_summaries.sql"))?;
        Ok(())
    }

    /// Run `f` inside a single transaction: commit on Ok, roll back entirely
    /// on Err. One date-processing run = one transaction.
    pub fn run_in_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> TrackResult<T>,
    ) -> TrackResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                // Drop rolls the transaction back.
                drop(tx);
                Err(e)
            }
        }
    }
}

/// Dates are stored as ISO-8601 TEXT.
fn parse_date(s: &str) -> TrackResult<ReportDate> {
    s.parse::<ReportDate>().map_err(|_| TrackError::Parse {
        what: "report date",
        value: s.to_string(),
    })
}
