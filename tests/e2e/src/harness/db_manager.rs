//! Test Database Manager
//!
//! Provides isolated engine instances for testing:
//! - Temporary SQLite databases that are automatically cleaned up
//! - Pre-seeded learners with reviewed concepts
//! - Reopening the same file to check persistence
//! - Per-learner snapshots and restoration

use std::path::PathBuf;
use std::sync::Arc;

use cadence_core::{
    Engine, Quality, ReviewObservation, ScheduleRecord, ScheduleStore, SchedulerConfig,
    SqliteStore,
};
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates an isolated SQLite-backed engine for each test to prevent
/// interference. Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
///
/// db.engine.record_review("u1", "c1", ReviewObservation::new(Quality::new(5)))?;
///
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// The engine under test
    pub engine: Engine<SqliteStore>,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
    /// Configuration reused on reopen
    config: SchedulerConfig,
    /// Snapshot data for restore operations
    snapshot: Option<Vec<ScheduleRecord>>,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    ///
    /// The database is automatically deleted when the manager is dropped.
    pub fn new_temp() -> Self {
        Self::new_temp_with_config(SchedulerConfig::default())
    }

    /// Temporary database with a custom scheduler configuration
    pub fn new_temp_with_config(config: SchedulerConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_cadence.db");

        Self {
            engine: Self::open_engine(&db_path, &config),
            _temp_dir: Some(temp_dir),
            db_path,
            config,
            snapshot: None,
        }
    }

    /// Create a test database at a specific path
    ///
    /// The database is NOT automatically deleted.
    pub fn new_at_path(path: PathBuf) -> Self {
        let config = SchedulerConfig::default();
        Self {
            engine: Self::open_engine(&path, &config),
            _temp_dir: None,
            db_path: path,
            config,
            snapshot: None,
        }
    }

    fn open_engine(path: &PathBuf, config: &SchedulerConfig) -> Engine<SqliteStore> {
        let store = SqliteStore::open(Some(path.clone())).expect("Failed to open test store");
        Engine::with_config(Arc::new(store), config.clone()).expect("Invalid test config")
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// The underlying store
    pub fn store(&self) -> &SqliteStore {
        self.engine.store()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Get the number of schedule records in the database
    pub fn record_count(&self) -> i64 {
        self.store().count().unwrap_or(0)
    }

    /// Drop the engine and open a fresh one over the same file
    pub fn reopen(&mut self) {
        self.engine = Self::open_engine(&self.db_path, &self.config);
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Review `count` concepts once each at `now` with the given quality
    pub fn seed_concepts(
        &self,
        user_id: &str,
        count: usize,
        quality: i64,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);

        for i in 0..count {
            let concept_id = format!("concept-{:03}", i);
            let observation = ReviewObservation::new(Quality::new(quality));
            if self
                .engine
                .record_review_at(user_id, &concept_id, observation, now)
                .is_ok()
            {
                ids.push(concept_id);
            }
        }

        ids
    }

    /// Seed a learner with concepts in distinct schedule states
    ///
    /// Returns `(mastered, learning, lapsed)` concept ids. At `now` the
    /// lapsed concept is due, the others are not.
    pub fn seed_with_schedule_states(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> (String, String, String) {
        let mastered = "mastered".to_string();
        let learning = "learning".to_string();
        let lapsed = "lapsed".to_string();

        // Three perfect reviews, each on time: intervals 1, 6, 16
        let start = now - Duration::days(7);
        for day in [0, 1, 7] {
            self.engine
                .record_review_at(
                    user_id,
                    &mastered,
                    ReviewObservation::new(Quality::new(5)),
                    start + Duration::days(day),
                )
                .expect("Failed to seed mastered review");
        }

        self.engine
            .record_review_at(
                user_id,
                &learning,
                ReviewObservation::new(Quality::new(4)),
                now,
            )
            .expect("Failed to seed learning review");

        self.engine
            .record_review_at(
                user_id,
                &lapsed,
                ReviewObservation::new(Quality::new(1)),
                now - Duration::days(2),
            )
            .expect("Failed to seed lapsed review");

        (mastered, learning, lapsed)
    }

    // ========================================================================
    // SNAPSHOT / RESTORE
    // ========================================================================

    /// Remember every record of a learner
    pub fn take_snapshot(&mut self, user_id: &str) {
        self.snapshot = self.store().scan_by_user(user_id).ok();
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Put the snapshot records back
    pub fn restore_snapshot(&mut self) -> bool {
        let Some(records) = self.snapshot.take() else {
            return false;
        };
        for record in &records {
            if self.store().put(record).is_err() {
                return false;
            }
        }
        true
    }

    /// Delete every record of a learner
    pub fn clear_user(&self, user_id: &str) {
        let records = self
            .store()
            .scan_by_user(user_id)
            .expect("Failed to scan learner records");
        for record in records {
            self.store()
                .delete(&record.key())
                .expect("Failed to delete learner record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_database_creation() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.is_empty());
        assert!(db.path().exists());
    }

    #[test]
    fn test_seed_concepts() {
        let db = TestDatabaseManager::new_temp();
        let ids = db.seed_concepts("u1", 10, 4, Utc::now());

        assert_eq!(ids.len(), 10);
        assert_eq!(db.record_count(), 10);
    }

    #[test]
    fn test_seed_schedule_states() {
        let db = TestDatabaseManager::new_temp();
        let now = Utc::now();
        let (mastered, _, lapsed) = db.seed_with_schedule_states("u1", now);

        assert_eq!(db.record_count(), 3);
        let record = db.engine.get_record("u1", &mastered).unwrap().unwrap();
        assert!(record.is_mastered());
        assert_eq!(record.performance_history.len(), 3);

        let due = db.engine.get_due("u1", now).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].concept_id, lapsed);
    }

    #[test]
    fn test_clear_user() {
        let db = TestDatabaseManager::new_temp();
        db.seed_concepts("u1", 5, 3, Utc::now());
        db.seed_concepts("u2", 2, 3, Utc::now());
        assert_eq!(db.record_count(), 7);

        db.clear_user("u1");
        assert_eq!(db.record_count(), 2);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut db = TestDatabaseManager::new_temp();
        db.seed_concepts("u1", 5, 5, Utc::now());

        db.take_snapshot("u1");
        assert!(db.has_snapshot());

        db.clear_user("u1");
        assert!(db.is_empty());

        assert!(db.restore_snapshot());
        assert_eq!(db.record_count(), 5);
        let record = db.engine.get_record("u1", "concept-000").unwrap().unwrap();
        assert_eq!(record.performance_history.len(), 1);
    }
}
