//! # Cadence Core
//!
//! Spaced-repetition scheduling engine. For every (learner, concept) pair it
//! decides when the concept should next be reviewed, driven by 0-5 recall
//! quality feedback:
//!
//! - **SM-2 scheduling**: 1 day, 6 days, then interval × ease factor
//! - **Self-correcting ease factor**: low-quality recalls cost more than
//!   high-quality recalls earn, floored at 1.3
//! - **Per-key atomic reviews**: concurrent reviews of one pair never lose
//!   updates; different pairs never wait on each other
//! - **Due queues and mastery stats** derived from the learner's records
//! - **Pluggable storage**: in-memory for tests, SQLite for production
//!
//! ## Quick Start
//!
//! ```rust
//! use cadence_core::{Engine, MemoryStore, Quality, ReviewObservation};
//! use chrono::Utc;
//!
//! let engine = Engine::new(MemoryStore::new());
//!
//! // The first review creates the schedule record
//! let record = engine
//!     .record_review("learner-1", "photosynthesis", ReviewObservation::new(Quality::new(5)))
//!     .unwrap();
//! assert_eq!(record.interval, 1);
//!
//! // Nothing is due until tomorrow
//! assert!(engine.get_due("learner-1", Utc::now()).unwrap().is_empty());
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite into the crate
//! - `encryption`: SQLCipher; the key is read from `CADENCE_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod due;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod scheduler;
pub mod sm2;
pub mod stats;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Engine
pub use engine::Engine;
pub use error::{EngineError, Result};

// Components
pub use due::DueSetQuery;
pub use scheduler::{ReviewPreview, ReviewScheduler};
pub use stats::StatsAggregator;

// Schedule types
pub use schedule::{
    PerformanceEntry, ScheduleKey, ScheduleRecord, ScheduleStats, MASTERY_MIN_EASE_FACTOR,
    MASTERY_MIN_REPETITIONS,
};

// SM-2 algorithm
pub use sm2::{
    next_ease_factor, next_state, success_interval, HistoryRetention, Quality, ReviewObservation,
    SchedulerConfig, Sm2State, DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR, SUCCESS_THRESHOLD,
};

// Storage layer
pub use storage::{MemoryStore, ScheduleStore, SqliteStore, StorageError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Engine, EngineError, MemoryStore, Quality, ReviewObservation, ScheduleKey, ScheduleRecord,
        ScheduleStats, ScheduleStore, SchedulerConfig, SqliteStore, StorageError,
    };
}
