//! Storage Module
//!
//! Keyed persistence for schedule records:
//! - [`ScheduleStore`] trait, one record per `(user, concept)`
//! - [`MemoryStore`] for tests and embedding
//! - [`SqliteStore`] with versioned migrations for production

mod memory;
mod migrations;
mod sqlite;

use chrono::{DateTime, Utc};

use crate::schedule::{ScheduleKey, ScheduleRecord};

pub use memory::MemoryStore;
pub use migrations::{apply_migrations, get_current_version, Migration, MIGRATIONS};
pub use sqlite::SqliteStore;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// A lock guarding store state was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable keyed storage for schedule records
///
/// Implementations must make `put` atomic per key: a concurrent `get`
/// observes either the previous record or the new one, never a mix.
/// Stores never retry internally; errors reach the caller as-is.
pub trait ScheduleStore: Send + Sync {
    /// Fetch the record for `key`. An unknown key is `Ok(None)`.
    fn get(&self, key: &ScheduleKey) -> Result<Option<ScheduleRecord>>;

    /// Insert or fully replace the record for its key
    fn put(&self, record: &ScheduleRecord) -> Result<()>;

    /// Atomic read-modify-write of the record for `key`
    ///
    /// `apply` receives the current record (`None` if absent) and returns the
    /// record to store, which is also returned. No other `update` or `put`
    /// of the same key may interleave between the read and the write, even
    /// from another store handle over the same backing storage. `apply` is
    /// called exactly once.
    fn update(
        &self,
        key: &ScheduleKey,
        apply: &mut dyn FnMut(Option<ScheduleRecord>) -> ScheduleRecord,
    ) -> Result<ScheduleRecord>;

    /// All records for a user, in no particular order
    ///
    /// Every call re-reads the store, so the scan can be repeated to pick up
    /// later writes.
    fn scan_by_user(&self, user_id: &str) -> Result<Vec<ScheduleRecord>>;

    /// Records for a user whose next review is at or before `now`
    ///
    /// Order is unspecified. Stores with an index on the due timestamp
    /// should override this.
    fn due_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ScheduleRecord>> {
        Ok(self
            .scan_by_user(user_id)?
            .into_iter()
            .filter(|record| record.is_due(now))
            .collect())
    }
}
