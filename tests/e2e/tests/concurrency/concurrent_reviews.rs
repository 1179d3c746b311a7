//! Concurrent Review Tests
//!
//! Reviews are submitted from many tasks at once. Reviews of one
//! `(user, concept)` pair must serialize without lost updates; reviews of
//! different pairs must not interfere.

use std::sync::Arc;

use cadence_core::{Engine, MemoryStore, ScheduleStore, SqliteStore};
use cadence_e2e_tests::{TestDataFactory, TestDatabaseManager};

const PARALLEL_REVIEWS: usize = 32;

async fn review_in_parallel<S>(engine: Arc<Engine<S>>, user: &str, concepts: &[String], quality: i64)
where
    S: ScheduleStore + 'static,
{
    let mut handles = Vec::new();
    for concept in concepts {
        let engine = Arc::clone(&engine);
        let user = user.to_string();
        let concept = concept.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            engine.record_review(&user, &concept, TestDataFactory::observation(quality))
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_same_key_reviews_are_not_lost_in_memory() {
    let engine = Arc::new(Engine::new(MemoryStore::new()));
    let concepts = vec!["c1".to_string(); PARALLEL_REVIEWS];

    review_in_parallel(Arc::clone(&engine), "u1", &concepts, 5).await;

    let record = engine.get_record("u1", "c1").unwrap().unwrap();
    assert_eq!(record.performance_history.len(), PARALLEL_REVIEWS);
    assert_eq!(record.repetitions as usize, PARALLEL_REVIEWS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_same_key_reviews_are_not_lost_in_sqlite() {
    let db = TestDatabaseManager::new_temp();
    let engine = Arc::new(Engine::from_arc(Arc::clone(db.engine.store())));
    let concepts = vec!["c1".to_string(); PARALLEL_REVIEWS];

    review_in_parallel(Arc::clone(&engine), "u1", &concepts, 4).await;

    let record = engine.get_record("u1", "c1").unwrap().unwrap();
    assert_eq!(record.performance_history.len(), PARALLEL_REVIEWS);
    assert_eq!(record.repetitions as usize, PARALLEL_REVIEWS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_engines_sharing_a_store_lose_no_updates() {
    let store = Arc::new(MemoryStore::new());
    let first = Arc::new(Engine::from_arc(Arc::clone(&store)));
    let second = Arc::new(Engine::from_arc(Arc::clone(&store)));
    let concepts = vec!["c1".to_string(); PARALLEL_REVIEWS];

    tokio::join!(
        review_in_parallel(Arc::clone(&first), "u1", &concepts, 5),
        review_in_parallel(Arc::clone(&second), "u1", &concepts, 5),
    );

    let record = first.get_record("u1", "c1").unwrap().unwrap();
    assert_eq!(record.performance_history.len(), 2 * PARALLEL_REVIEWS);
    assert_eq!(record.repetitions as usize, 2 * PARALLEL_REVIEWS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_separate_connections_to_one_file_lose_no_updates() {
    // Two independently opened stores behave like two processes on one database
    let db = TestDatabaseManager::new_temp();
    let other = SqliteStore::open(Some(db.path().clone())).unwrap();
    let first = Arc::new(Engine::from_arc(Arc::clone(db.engine.store())));
    let second = Arc::new(Engine::new(other));
    let concepts = vec!["c1".to_string(); PARALLEL_REVIEWS];

    tokio::join!(
        review_in_parallel(Arc::clone(&first), "u1", &concepts, 4),
        review_in_parallel(Arc::clone(&second), "u1", &concepts, 4),
    );

    let record = db.engine.get_record("u1", "c1").unwrap().unwrap();
    assert_eq!(record.performance_history.len(), 2 * PARALLEL_REVIEWS);
    assert_eq!(record.repetitions as usize, 2 * PARALLEL_REVIEWS);
    assert_eq!(second.get_record("u1", "c1").unwrap().unwrap(), record);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_different_keys_progress_independently() {
    let db = TestDatabaseManager::new_temp();
    let engine = Arc::new(Engine::from_arc(Arc::clone(db.engine.store())));
    let concepts = TestDataFactory::concept_ids("topic", 16);

    // Every concept is reviewed three times, in interleaved rounds
    for _ in 0..3 {
        review_in_parallel(Arc::clone(&engine), "u1", &concepts, 5).await;
    }

    let records = db.store().scan_by_user("u1").unwrap();
    assert_eq!(records.len(), concepts.len());
    for record in &records {
        assert_eq!(record.repetitions, 3);
        assert_eq!(record.performance_history.len(), 3);
        assert_eq!(record.interval, 16);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_during_writes_see_whole_records() {
    let engine = Arc::new(Engine::new(MemoryStore::new()));
    let writer = {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            for _ in 0..200 {
                engine
                    .record_review("u1", "c1", TestDataFactory::observation(5))
                    .unwrap();
            }
        })
    };

    let reader = {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            for _ in 0..200 {
                if let Some(record) = engine.get_record("u1", "c1").unwrap() {
                    assert_eq!(record.repetitions as usize, record.performance_history.len());
                }
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
}
