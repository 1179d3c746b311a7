//! Review Scheduler
//!
//! Turns a quality observation into the next schedule for a
//! `(user, concept)` pair and persists it.
//!
//! Each review is a read-modify-write on a single record, executed through
//! [`ScheduleStore::update`]: two reviews of the same pair never interleave,
//! even when issued by separate schedulers or processes sharing the storage.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::schedule::{PerformanceEntry, ScheduleKey, ScheduleRecord};
use crate::sm2::{next_state, Quality, ReviewObservation, SchedulerConfig, Sm2State};
use crate::storage::ScheduleStore;

/// Latest representable review time, 9999-12-31T23:59:59.999Z
///
/// Later instants have no four-digit-year RFC 3339 form.
const LATEST_NEXT_REVIEW_MS: i64 = 253_402_300_799_999;

/// What a review of a given quality would produce, without recording it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPreview {
    pub quality: Quality,
    pub ease_factor: f64,
    pub interval: u32,
    pub repetitions: u32,
    pub next_review: DateTime<Utc>,
}

/// Quality-driven scheduler over a [`ScheduleStore`]
pub struct ReviewScheduler<S: ScheduleStore + ?Sized> {
    store: Arc<S>,
    config: SchedulerConfig,
}

impl<S: ScheduleStore + ?Sized> ReviewScheduler<S> {
    /// Scheduler with the standard SM-2 configuration
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: SchedulerConfig::default(),
        }
    }

    /// Scheduler with a custom, validated configuration
    pub fn with_config(store: Arc<S>, config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record a review at the current time
    ///
    /// See [`Self::record_review_at`].
    pub fn record_review(
        &self,
        user_id: &str,
        concept_id: &str,
        observation: ReviewObservation,
    ) -> Result<ScheduleRecord> {
        self.record_review_at(user_id, concept_id, observation, Utc::now())
    }

    /// Record a review observed at `now` and return the updated record
    ///
    /// A pair without a record starts from the default state (initial ease
    /// factor, no repetitions); the first review is what creates the record.
    /// `now` is truncated to millisecond precision. Storage errors are
    /// returned unchanged and leave the previous record in place.
    pub fn record_review_at(
        &self,
        user_id: &str,
        concept_id: &str,
        observation: ReviewObservation,
        now: DateTime<Utc>,
    ) -> Result<ScheduleRecord> {
        let key = ScheduleKey::new(user_id, concept_id);
        let now = now.trunc_subsecs(3);

        let record = self
            .store
            .update(&key, &mut |current| self.apply(current, &key, observation, now))?;

        debug!(
            key = %key,
            quality = observation.quality.value(),
            interval = record.interval,
            repetitions = record.repetitions,
            ease_factor = record.ease_factor,
            "Review recorded"
        );

        Ok(record)
    }

    /// Outcome of every quality for the pair, computed against its current
    /// record. Nothing is persisted.
    pub fn preview_at(
        &self,
        user_id: &str,
        concept_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewPreview>> {
        let key = ScheduleKey::new(user_id, concept_id);
        let now = now.trunc_subsecs(3);
        let current = self.store.get(&key)?;

        Ok(Quality::all()
            .map(|quality| {
                let next = self.apply(current.clone(), &key, ReviewObservation::new(quality), now);
                ReviewPreview {
                    quality,
                    ease_factor: next.ease_factor,
                    interval: next.interval,
                    repetitions: next.repetitions,
                    next_review: next.next_review,
                }
            })
            .collect())
    }

    /// Pure transition from the current record (or its absence) to the next one
    fn apply(
        &self,
        current: Option<ScheduleRecord>,
        key: &ScheduleKey,
        observation: ReviewObservation,
        now: DateTime<Utc>,
    ) -> ScheduleRecord {
        let mut record = current.unwrap_or_else(|| {
            ScheduleRecord::initial(key.clone(), self.config.initial_ease_factor, now)
        });

        record.performance_history.push(PerformanceEntry {
            quality: observation.quality,
            timestamp: now,
            response_time_ms: observation.response_time_ms,
        });
        self.config.history_retention.apply(&mut record.performance_history);

        let next = next_state(
            Sm2State {
                ease_factor: record.ease_factor,
                interval: record.interval,
                repetitions: record.repetitions,
            },
            observation.quality,
            &self.config,
        );

        record.ease_factor = next.ease_factor;
        record.interval = next.interval;
        record.repetitions = next.repetitions;
        record.last_review = Some(now);
        let latest = DateTime::from_timestamp_millis(LATEST_NEXT_REVIEW_MS)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        record.next_review = now
            .checked_add_signed(Duration::days(i64::from(next.interval)))
            .map_or(latest, |next_review| next_review.min(latest));

        record
    }
}
