//! Persistence Journey Tests
//!
//! Schedule records survive process restarts, backups and restores
//! exactly as they were written.

use cadence_core::{ReviewObservation, ScheduleKey, ScheduleStore, SqliteStore};
use cadence_e2e_tests::{ReviewScript, TestDataFactory, TestDatabaseManager};
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

#[test]
fn test_records_survive_reopen() {
    let mut db = TestDatabaseManager::new_temp();
    let start = Utc::now() - Duration::days(30);

    let written = TestDataFactory::replay(
        &db.engine,
        "u1",
        "c1",
        &ReviewScript::lapse_then_recover().late_by(5),
        start,
    )
    .unwrap();
    db.engine
        .record_review(
            "u1",
            "c2",
            ReviewObservation::new(4i64).with_response_time_ms(1234),
        )
        .unwrap();

    db.reopen();

    let reloaded = db.engine.get_record("u1", "c1").unwrap().unwrap();
    assert_eq!(&reloaded, written.last().unwrap());
    assert_eq!(reloaded.performance_history.len(), 7);

    let c2 = db.engine.get_record("u1", "c2").unwrap().unwrap();
    assert_eq!(c2.performance_history[0].response_time_ms, Some(1234));

    // Reviews continue from the persisted state
    let next = db
        .engine
        .record_review_at("u1", "c1", TestDataFactory::observation(5), reloaded.next_review)
        .unwrap();
    assert_eq!(next.repetitions, reloaded.repetitions + 1);
    assert_eq!(next.performance_history.len(), 8);
}

#[test]
fn test_schema_is_current_after_reopen() {
    let mut db = TestDatabaseManager::new_temp();
    let version = db.store().schema_version().unwrap();
    assert!(version >= 2);

    db.reopen();
    assert_eq!(db.store().schema_version().unwrap(), version);
}

#[test]
fn test_backup_is_a_complete_copy() {
    let db = TestDatabaseManager::new_temp();
    let now = Utc::now();
    let ids = db.seed_concepts("u1", 6, 4, now);

    let backup_dir = TempDir::new().unwrap();
    let backup_path = backup_dir.path().join("backup.db");
    db.store().backup_to(&backup_path).unwrap();

    let copy = SqliteStore::open(Some(backup_path)).unwrap();
    assert_eq!(copy.count().unwrap(), 6);
    for id in &ids {
        let key = ScheduleKey::new("u1", id.as_str());
        assert_eq!(copy.get(&key).unwrap(), db.store().get(&key).unwrap());
    }
}

#[test]
fn test_delete_removes_record_and_history() {
    let db = TestDatabaseManager::new_temp();
    TestDataFactory::replay(&db.engine, "u1", "c1", &ReviewScript::perfect(3), Utc::now()).unwrap();
    let key = ScheduleKey::new("u1", "c1");

    assert!(db.store().delete(&key).unwrap());
    assert!(!db.store().delete(&key).unwrap());
    assert!(db.engine.get_record("u1", "c1").unwrap().is_none());

    // A new review starts over from the default state
    let record = db
        .engine
        .record_review("u1", "c1", TestDataFactory::observation(5))
        .unwrap();
    assert_eq!(record.repetitions, 1);
    assert_eq!(record.performance_history.len(), 1);
}

#[test]
fn test_snapshot_round_trip_through_store() {
    let mut db = TestDatabaseManager::new_temp();
    let (mastered, _, _) = db.seed_with_schedule_states("u1", Utc::now());
    let before = db.engine.get_record("u1", &mastered).unwrap();

    db.take_snapshot("u1");
    db.clear_user("u1");
    assert!(db.is_empty());

    assert!(db.restore_snapshot());
    assert_eq!(db.engine.get_record("u1", &mastered).unwrap(), before);
}

#[test]
fn test_far_future_schedule_stays_queryable() {
    let mut db = TestDatabaseManager::new_temp();
    let latest = DateTime::from_timestamp_millis(253_402_300_799_999).unwrap();
    let start = latest - Duration::days(400);

    let records =
        TestDataFactory::replay(&db.engine, "u1", "c1", &ReviewScript::perfect(6), start).unwrap();
    assert_eq!(records.last().unwrap().next_review, latest);

    db.reopen();

    let reloaded = db.engine.get_record("u1", "c1").unwrap().unwrap();
    assert_eq!(reloaded.next_review, latest);
    assert!(db.engine.get_due("u1", start).unwrap().is_empty());
    assert_eq!(db.engine.get_due("u1", latest).unwrap().len(), 1);
    assert_eq!(db.engine.get_stats("u1", latest).unwrap().due_now, 1);
}
