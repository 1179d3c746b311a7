//! Due-set query: what a learner should review right now

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::schedule::ScheduleRecord;
use crate::storage::{Result, ScheduleStore};

/// Read-only view over a store returning due records, most overdue first
pub struct DueSetQuery<S: ScheduleStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ScheduleStore + ?Sized> DueSetQuery<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records with `next_review <= now`, ascending by `next_review`
    ///
    /// Ties are ordered by concept id. An empty result is not an error.
    pub fn get_due(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ScheduleRecord>> {
        let mut due = self.store.due_for_user(user_id, now)?;
        due.sort_by(|a, b| {
            a.next_review
                .cmp(&b.next_review)
                .then_with(|| a.concept_id.cmp(&b.concept_id))
        });
        Ok(due)
    }

    /// The `limit` most overdue records
    pub fn get_due_limited(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduleRecord>> {
        let mut due = self.get_due(user_id, now)?;
        due.truncate(limit);
        Ok(due)
    }
}
