//! Per-learner schedule statistics

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::schedule::ScheduleStats;
use crate::storage::{Result, ScheduleStore};

/// Read-only aggregation of a learner's schedule set
pub struct StatsAggregator<S: ScheduleStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ScheduleStore + ?Sized> StatsAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Totals, due count, mastery, retention rate and mean interval at `now`
    pub fn get_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<ScheduleStats> {
        let records = self.store.scan_by_user(user_id)?;
        Ok(ScheduleStats::from_records(&records, now))
    }
}
