//! Per-core sharded bump allocator.

use std::cell::Cell;
use std::ptr::NonNull;

use parking_lot::Mutex;

use crate::core_local::{access_index, CoreLocalArray};
use crate::memory::BlockAllocator;

#[derive(Default)]
struct Shard {
    allocator: Mutex<BlockAllocator>,
}

thread_local! {
    // Cached CPU index; refreshed whenever the cached shard is contended.
    static CACHED_CORE: Cell<usize> = const { Cell::new(usize::MAX) };
}

/// Thread-safe bump allocator: a core-local array of mutex-guarded
/// [`BlockAllocator`] shards.
///
/// Each allocation try-locks the shard for the caller's cached CPU index;
/// on contention the index is refreshed and the call blocks on the new
/// shard. The lock is only held for the O(1) bump, so allocations stay
/// CPU-local without a global lock.
///
/// Addresses remain valid until the `CoreLocalAllocator` itself is dropped.
pub struct CoreLocalAllocator {
    shards: CoreLocalArray<Shard>,
}

impl CoreLocalAllocator {
    pub fn new() -> Self {
        Self {
            shards: CoreLocalArray::new(),
        }
    }

    /// Allocates `size` bytes aligned to [`crate::config::ALLOC_ALIGNMENT`].
    pub fn allocate(&self, size: usize) -> NonNull<u8> {
        assert!(size > 0, "allocation size must be greater than zero");

        let cached = CACHED_CORE.get();
        let index = if cached == usize::MAX {
            let index = access_index();
            CACHED_CORE.set(index);
            index
        } else {
            cached
        };

        let shard = self.shards.at(index);
        let mut guard = match shard.allocator.try_lock() {
            Some(guard) => guard,
            None => {
                let index = access_index();
                CACHED_CORE.set(index);
                self.shards.at(index).allocator.lock()
            }
        };

        guard.allocate(size)
    }

    /// Number of shards backing this allocator.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl Default for CoreLocalAllocator {
    fn default() -> Self {
        Self::new()
    }
}
