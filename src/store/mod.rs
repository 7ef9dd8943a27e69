//! In-memory entity store.
//!
//! Holds one [`Collection`] per [`ResourceKind`] plus the shared id
//! allocator. The store performs no relational checks; the constraint engine
//! runs its validators against a [`StoreState`] borrowed under the write
//! lock, so validation and commit happen in one critical section.

mod allocator;
mod collection;

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::kind::ResourceKind;
use crate::record::Record;

pub use allocator::IdAllocator;
pub use collection::Collection;

/// Unlocked store contents.
#[derive(Debug, Default)]
pub struct StoreState {
    ids: IdAllocator,
    collections: HashMap<ResourceKind, Collection>,
}

impl StoreState {
    /// Allocate the next record id.
    pub fn next_id(&self) -> u64 {
        self.ids.next()
    }

    /// Exact lookup, returning a borrowed record.
    pub fn find(&self, kind: ResourceKind, id: u64) -> Option<&Record> {
        self.collections.get(&kind).and_then(|c| c.get(id))
    }

    /// Exact lookup, returning an independent copy.
    pub fn get(&self, kind: ResourceKind, id: u64) -> Option<Record> {
        self.find(kind, id).cloned()
    }

    /// Returns true if the record exists.
    pub fn contains(&self, kind: ResourceKind, id: u64) -> bool {
        self.collections.get(&kind).is_some_and(|c| c.contains(id))
    }

    /// Borrowing iterator over a collection in insertion order.
    pub fn iter(&self, kind: ResourceKind) -> impl Iterator<Item = &Record> {
        self.collections.get(&kind).into_iter().flat_map(Collection::iter)
    }

    /// Snapshot of a whole collection in insertion order.
    pub fn all(&self, kind: ResourceKind) -> Vec<Record> {
        self.iter(kind).cloned().collect()
    }

    /// Number of records of a kind.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.collections.get(&kind).map_or(0, Collection::len)
    }

    /// Insert or overwrite a record keyed by its `id` field.
    ///
    /// Records without an id are ignored and `false` is returned.
    pub fn put(&mut self, kind: ResourceKind, record: Record) -> bool {
        let Some(id) = record.id() else {
            return false;
        };
        self.collections.entry(kind).or_default().put(id, record);
        true
    }

    /// Mutable access to a stored record.
    pub fn get_mut(&mut self, kind: ResourceKind, id: u64) -> Option<&mut Record> {
        self.collections.get_mut(&kind).and_then(|c| c.get_mut(id))
    }

    /// Remove a record, returning it if it existed.
    pub fn remove(&mut self, kind: ResourceKind, id: u64) -> Option<Record> {
        self.collections.get_mut(&kind).and_then(|c| c.remove(id))
    }

    /// Remove a record; true if something was removed.
    pub fn delete(&mut self, kind: ResourceKind, id: u64) -> bool {
        self.remove(kind, id).is_some()
    }

    /// Empty every collection. The allocator keeps counting.
    pub fn clear(&mut self) {
        for collection in self.collections.values_mut() {
            collection.clear();
        }
    }
}

/// Thread-safe entity store.
///
/// Readers share the lock; every mutation holds the write lock for its whole
/// duration, so a reader sees either the state before a mutation or after it.
#[derive(Debug, Default)]
pub struct EntityStore {
    state: RwLock<StoreState>,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with shared access to the state.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.state.read())
    }

    /// Run `f` with exclusive access to the state.
    pub fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        f(&mut self.state.write())
    }

    /// Exact lookup.
    pub fn get(&self, kind: ResourceKind, id: u64) -> Option<Record> {
        self.read(|state| state.get(kind, id))
    }

    /// Full snapshot of a collection in insertion order.
    pub fn all(&self, kind: ResourceKind) -> Vec<Record> {
        self.read(|state| state.all(kind))
    }

    /// Insert or overwrite a record keyed by its `id`.
    pub fn put(&self, kind: ResourceKind, record: Record) -> bool {
        self.write(|state| state.put(kind, record))
    }

    /// Remove a record; true if it existed.
    pub fn delete(&self, kind: ResourceKind, id: u64) -> bool {
        self.write(|state| state.delete(kind, id))
    }

    /// Drop every record. Ids are not reused after a reset.
    pub fn reset(&self) {
        self.write(StoreState::clear);
        tracing::debug!("store reset");
    }
}
