use dashmap::{mapref::entry::Entry, DashMap};
use std::time::SystemTime;

use super::NoteStore;
use crate::errors::StoreError;
use crate::models::note::NoteRecord;

/// Process-local store on a sharded map. Each id only ever contends with
/// ids hashed into the same shard.
#[derive(Debug, Default)]
pub struct MemoryStore {
    notes: DashMap<String, NoteRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Reads without consuming. Only meant for inspecting stored state.
    pub fn peek(&self, id: &str) -> Option<NoteRecord> {
        self.notes.get(id).map(|entry| entry.value().clone())
    }
}

impl NoteStore for MemoryStore {
    fn create(&self, record: &NoteRecord) -> Result<(), StoreError> {
        match self.notes.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateId(record.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    fn fetch_and_delete(
        &self,
        id: &str,
        now: SystemTime,
    ) -> Result<Option<NoteRecord>, StoreError> {
        Ok(self
            .notes
            .remove(id)
            .map(|(_, record)| record)
            .filter(|record| !record.is_expired(now)))
    }

    fn expire_older_than(&self, now: SystemTime) -> Result<usize, StoreError> {
        let mut expired = 0;
        self.notes.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                expired += 1;
            }
            keep
        });
        Ok(expired)
    }
}
