use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::{ConversionKey, ConversionRecord, ConversionStore, StoreError};

/// Process-local store. Records are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<ConversionKey, ConversionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ConversionStore for MemoryStore {
    async fn get(&self, key: &ConversionKey) -> Result<Option<ConversionRecord>, StoreError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn merge(
        &self,
        key: &ConversionKey,
        units: &BTreeMap<String, f64>,
    ) -> Result<ConversionRecord, StoreError> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let mut entry = self
            .records
            .entry(key.clone())
            .or_insert_with(|| ConversionRecord::empty(key));
        entry.merge(units);
        Ok(entry.value().clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
