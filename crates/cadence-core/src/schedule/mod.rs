//! Schedule module - Core types and data structures
//!
//! Implements the per-learner review schedule model with:
//! - Structured `(user, concept)` keys
//! - SM-2 scheduling state (ease factor, interval, repetitions)
//! - Append-only performance history
//! - Aggregate statistics over a learner's schedule set

mod record;

pub use record::{PerformanceEntry, ScheduleKey, ScheduleRecord};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// MASTERY
// ============================================================================

/// Repetitions a concept must survive before it can count as mastered
pub const MASTERY_MIN_REPETITIONS: u32 = 3;

/// Ease factor a concept must hold on to before it can count as mastered
pub const MASTERY_MIN_EASE_FACTOR: f64 = 2.5;

// ============================================================================
// SCHEDULE STATS
// ============================================================================

/// Summary of a learner's schedule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStats {
    /// Number of concepts with a schedule record
    pub total_concepts: u64,
    /// Records whose next review has elapsed
    pub due_now: u64,
    /// Records with enough repetitions and an undegraded ease factor
    pub mastered_concepts: u64,
    /// Mastered share as a percentage (0-100)
    pub retention_rate: f64,
    /// Mean interval in days
    pub average_interval: f64,
}

impl Default for ScheduleStats {
    fn default() -> Self {
        Self {
            total_concepts: 0,
            due_now: 0,
            mastered_concepts: 0,
            retention_rate: 0.0,
            average_interval: 0.0,
        }
    }
}

impl ScheduleStats {
    /// Derive stats from a set of records as seen at `now`
    pub fn from_records<'a, I>(records: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a ScheduleRecord>,
    {
        let mut stats = Self::default();
        let mut interval_sum: u64 = 0;

        for record in records {
            stats.total_concepts += 1;
            interval_sum += u64::from(record.interval);
            if record.is_due(now) {
                stats.due_now += 1;
            }
            if record.is_mastered() {
                stats.mastered_concepts += 1;
            }
        }

        if stats.total_concepts > 0 {
            let total = stats.total_concepts as f64;
            stats.retention_rate = stats.mastered_concepts as f64 / total * 100.0;
            stats.average_interval = interval_sum as f64 / total;
        }

        stats
    }
}
