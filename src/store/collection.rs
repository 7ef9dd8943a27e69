//! Insertion-ordered keyed collection of records.

use std::collections::HashMap;

use crate::record::Record;

/// Records of one kind, keyed by id, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    order: Vec<u64>,
    records: HashMap<u64, Record>,
}

impl Collection {
    pub fn get(&self, id: u64) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Record> {
        self.records.get_mut(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.records.contains_key(&id)
    }

    /// Insert or overwrite. Overwriting keeps the original position.
    pub fn put(&mut self, id: u64, record: Record) {
        if self.records.insert(id, record).is_none() {
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<Record> {
        let removed = self.records.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
    }
}
