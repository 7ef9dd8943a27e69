//! Identifier allocation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Issues strictly increasing record ids, starting at 1.
///
/// Ids are never handed out twice, including ids consumed by creates that
/// later fail validation.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}
