//! Schedule Record - The unit of scheduling state
//!
//! One record exists per (learner, concept) pair. It carries:
//! - SM-2 state (ease factor, interval, repetitions)
//! - Review timestamps (last and next)
//! - The ordered history of quality observations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MASTERY_MIN_EASE_FACTOR, MASTERY_MIN_REPETITIONS};
use crate::sm2::Quality;

// ============================================================================
// KEY
// ============================================================================

/// Identity of a schedule record: the learner and the concept being learned
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleKey {
    /// Opaque learner identifier
    pub user_id: String,
    /// Opaque concept identifier
    pub concept_id: String,
}

impl ScheduleKey {
    pub fn new(user_id: impl Into<String>, concept_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            concept_id: concept_id.into(),
        }
    }
}

impl std::fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.concept_id)
    }
}

// ============================================================================
// PERFORMANCE HISTORY
// ============================================================================

/// A single recorded review observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
    /// Clamped recall quality (0-5)
    pub quality: Quality,
    /// When the review was recorded
    pub timestamp: DateTime<Utc>,
    /// How long the learner took to answer, in milliseconds
    #[serde(rename = "responseTime", default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

// ============================================================================
// SCHEDULE RECORD
// ============================================================================

/// Scheduling state for one (learner, concept) pair
///
/// Serializes as the camelCase JSON the review handlers forward to clients:
/// `conceptId`, `easeFactor`, `interval`, `repetitions`, `nextReview`,
/// `lastReview` and `performance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub user_id: String,
    pub concept_id: String,
    /// SM-2 ease factor, never below the configured minimum
    pub ease_factor: f64,
    /// Days between `last_review` and `next_review`; 0 before the first review
    pub interval: u32,
    /// Consecutive successful reviews since the last lapse
    pub repetitions: u32,
    /// The record is due once the clock reaches this instant
    pub next_review: DateTime<Utc>,
    /// None until the first review is recorded
    pub last_review: Option<DateTime<Utc>>,
    /// Ordered, append-only review observations
    #[serde(rename = "performance", default)]
    pub performance_history: Vec<PerformanceEntry>,
}

impl ScheduleRecord {
    /// Default state for a pair that has never been reviewed
    pub fn initial(key: ScheduleKey, ease_factor: f64, now: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id,
            concept_id: key.concept_id,
            ease_factor,
            interval: 0,
            repetitions: 0,
            next_review: now,
            last_review: None,
            performance_history: Vec::new(),
        }
    }

    pub fn key(&self) -> ScheduleKey {
        ScheduleKey::new(self.user_id.clone(), self.concept_id.clone())
    }

    /// Whether the review is due at `now` (inclusive)
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }

    /// Survived three consecutive spaced reviews without dropping below the
    /// neutral ease factor
    pub fn is_mastered(&self) -> bool {
        self.repetitions >= MASTERY_MIN_REPETITIONS && self.ease_factor >= MASTERY_MIN_EASE_FACTOR
    }

    pub fn has_been_reviewed(&self) -> bool {
        self.last_review.is_some()
    }

    /// Most recent observation, if any
    pub fn last_observation(&self) -> Option<&PerformanceEntry> {
        self.performance_history.last()
    }
}
