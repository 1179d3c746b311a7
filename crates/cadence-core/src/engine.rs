//! Engine facade
//!
//! Bundles the scheduler, due query and stats aggregator over one shared
//! store, which is how request handlers usually hold the engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::due::DueSetQuery;
use crate::error::Result;
use crate::schedule::{ScheduleKey, ScheduleRecord, ScheduleStats};
use crate::scheduler::{ReviewPreview, ReviewScheduler};
use crate::sm2::{ReviewObservation, SchedulerConfig};
use crate::stats::StatsAggregator;
use crate::storage::ScheduleStore;

/// The scheduling engine over a single store
///
/// `Engine` is `Send + Sync` whenever the store is; share it as `Arc<Engine<_>>`.
pub struct Engine<S: ScheduleStore + ?Sized> {
    store: Arc<S>,
    scheduler: ReviewScheduler<S>,
    due: DueSetQuery<S>,
    stats: StatsAggregator<S>,
}

impl<S: ScheduleStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }
}

impl<S: ScheduleStore + ?Sized> Engine<S> {
    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            scheduler: ReviewScheduler::new(Arc::clone(&store)),
            due: DueSetQuery::new(Arc::clone(&store)),
            stats: StatsAggregator::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn with_config(store: Arc<S>, config: SchedulerConfig) -> Result<Self> {
        Ok(Self {
            scheduler: ReviewScheduler::with_config(Arc::clone(&store), config)?,
            due: DueSetQuery::new(Arc::clone(&store)),
            stats: StatsAggregator::new(Arc::clone(&store)),
            store,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn scheduler(&self) -> &ReviewScheduler<S> {
        &self.scheduler
    }

    pub fn record_review(
        &self,
        user_id: &str,
        concept_id: &str,
        observation: ReviewObservation,
    ) -> Result<ScheduleRecord> {
        self.scheduler.record_review(user_id, concept_id, observation)
    }

    pub fn record_review_at(
        &self,
        user_id: &str,
        concept_id: &str,
        observation: ReviewObservation,
        now: DateTime<Utc>,
    ) -> Result<ScheduleRecord> {
        self.scheduler.record_review_at(user_id, concept_id, observation, now)
    }

    pub fn preview_at(
        &self,
        user_id: &str,
        concept_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewPreview>> {
        self.scheduler.preview_at(user_id, concept_id, now)
    }

    pub fn get_record(&self, user_id: &str, concept_id: &str) -> Result<Option<ScheduleRecord>> {
        Ok(self.store.get(&ScheduleKey::new(user_id, concept_id))?)
    }

    pub fn get_due(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ScheduleRecord>> {
        Ok(self.due.get_due(user_id, now)?)
    }

    pub fn get_due_limited(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduleRecord>> {
        Ok(self.due.get_due_limited(user_id, now, limit)?)
    }

    pub fn get_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<ScheduleStats> {
        Ok(self.stats.get_stats(user_id, now)?)
    }
}
