//! In-memory registry of staged logical streams

use crate::sorter::StreamRecord;
use crate::stream::StreamBacking;
use std::collections::HashMap;
use std::sync::Arc;

struct TableSlot {
    sequence: u64,
    backing: Arc<StreamBacking>,
}

/// Maps logical stream names to their staged backing.
///
/// Every entry carries a creation sequence number so the default packing
/// order is deterministic. Truncating an existing stream keeps its original
/// sequence.
#[derive(Default)]
pub struct StreamTable {
    entries: HashMap<String, TableSlot>,
    next_sequence: u64,
}

impl StreamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, backing: Arc<StreamBacking>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.insert(name, TableSlot { sequence, backing });
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Arc<StreamBacking>> {
        self.entries.get(name).map(|slot| &slot.backing)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Arc<StreamBacking>> {
        self.entries.remove(name).map(|slot| slot.backing)
    }

    pub(crate) fn backings(&self) -> impl Iterator<Item = &Arc<StreamBacking>> {
        self.entries.values().map(|slot| &slot.backing)
    }

    /// Snapshot of every staged stream, in creation order.
    pub fn records(&self) -> Vec<StreamRecord> {
        let mut records: Vec<StreamRecord> = self
            .entries
            .iter()
            .map(|(name, slot)| StreamRecord {
                name: name.clone(),
                sequence: slot.sequence,
                size: slot.backing.len(),
            })
            .collect();
        records.sort_by_key(|record| record.sequence);
        records
    }
}
