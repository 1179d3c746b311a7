//! In-memory schedule store

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::{Result, ScheduleStore, StorageError};
use crate::schedule::{ScheduleKey, ScheduleRecord};

/// Process-local store backed by a map of learners to their records
///
/// Each `put` swaps a whole record under the write lock, so readers never
/// see a partially written record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, BTreeMap<String, ScheduleRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all learners
    pub fn len(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::Lock("Memory store lock poisoned".into()))?;
        Ok(records.values().map(BTreeMap::len).sum())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl ScheduleStore for MemoryStore {
    fn get(&self, key: &ScheduleKey) -> Result<Option<ScheduleRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::Lock("Memory store lock poisoned".into()))?;
        Ok(records
            .get(&key.user_id)
            .and_then(|concepts| concepts.get(&key.concept_id))
            .cloned())
    }

    fn put(&self, record: &ScheduleRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::Lock("Memory store lock poisoned".into()))?;
        records
            .entry(record.user_id.clone())
            .or_default()
            .insert(record.concept_id.clone(), record.clone());
        Ok(())
    }

    fn update(
        &self,
        key: &ScheduleKey,
        apply: &mut dyn FnMut(Option<ScheduleRecord>) -> ScheduleRecord,
    ) -> Result<ScheduleRecord> {
        // Held across read and write so concurrent updates cannot interleave
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::Lock("Memory store lock poisoned".into()))?;
        let concepts = records.entry(key.user_id.clone()).or_default();
        let record = apply(concepts.get(&key.concept_id).cloned());
        concepts.insert(key.concept_id.clone(), record.clone());
        Ok(record)
    }

    fn scan_by_user(&self, user_id: &str) -> Result<Vec<ScheduleRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::Lock("Memory store lock poisoned".into()))?;
        Ok(records
            .get(user_id)
            .map(|concepts| concepts.values().cloned().collect())
            .unwrap_or_default())
    }
}
