//! Single-threaded bump allocator over a chain of heap blocks.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

use crate::config::{ALLOC_ALIGNMENT, ALLOC_BLOCK_SIZE, LARGE_ALLOCATION_THRESHOLD};

/// Bump allocator: carves aligned runs out of 4 KiB blocks, giving oversized
/// requests their own block. Individual allocations cannot be freed; every
/// block is released when the allocator is dropped.
pub struct BlockAllocator {
    blocks: Vec<(NonNull<u8>, Layout)>,
    current: *mut u8,
    remaining: usize,
}

// SAFETY: the allocator owns all of its blocks exclusively; the raw cursor
// pointers are only touched through &mut self.
unsafe impl Send for BlockAllocator {}

impl BlockAllocator {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            current: std::ptr::null_mut(),
            remaining: 0,
        }
    }

    /// Allocates `size` bytes aligned to [`ALLOC_ALIGNMENT`].
    ///
    /// Infallible by contract: heap exhaustion aborts via
    /// `handle_alloc_error`. `size` must be non-zero.
    pub fn allocate(&mut self, size: usize) -> NonNull<u8> {
        assert!(size > 0, "allocation size must be greater than zero");

        if size > LARGE_ALLOCATION_THRESHOLD {
            return self.new_block(size);
        }
        self.allocate_small(size)
    }

    /// Total number of blocks acquired so far.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn allocate_small(&mut self, size: usize) -> NonNull<u8> {
        // Round up so the next carve stays aligned.
        let size = size + (size.wrapping_neg() & (ALLOC_ALIGNMENT - 1));

        if size > self.remaining {
            let block = self.new_block(ALLOC_BLOCK_SIZE);
            self.current = block.as_ptr();
            self.remaining = ALLOC_BLOCK_SIZE;
        }

        // SAFETY: `current` points into a live block with at least
        // `remaining >= size` bytes left past it.
        let address = self.current;
        self.current = unsafe { self.current.add(size) };
        self.remaining -= size;

        // SAFETY: block pointers are non-null (checked at acquisition).
        unsafe { NonNull::new_unchecked(address) }
    }

    fn new_block(&mut self, size: usize) -> NonNull<u8> {
        let layout = Layout::from_size_align(size, ALLOC_ALIGNMENT)
            .expect("allocation size overflows layout");

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc(layout) };
        let Some(block) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };

        self.blocks.push((block, layout));
        block
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BlockAllocator {
    fn drop(&mut self) {
        for &(block, layout) in &self.blocks {
            // SAFETY: each (pointer, layout) pair came from `alloc` with
            // exactly this layout and is freed exactly once.
            unsafe { dealloc(block.as_ptr(), layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_aligned_addresses() {
        let mut allocator = BlockAllocator::new();
        for size in [1, 3, 17, 100, 1000] {
            let ptr = allocator.allocate(size);
            assert_eq!(ptr.as_ptr() as usize % ALLOC_ALIGNMENT, 0);
        }
    }

    #[test]
    fn small_allocations_share_a_block() {
        let mut allocator = BlockAllocator::new();
        let a = allocator.allocate(64);
        let b = allocator.allocate(64);
        assert_eq!(allocator.block_count(), 1);
        assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 64);
    }

    #[test]
    fn large_allocation_gets_dedicated_block() {
        let mut allocator = BlockAllocator::new();
        let _small = allocator.allocate(16);
        assert_eq!(allocator.block_count(), 1);
        let _large = allocator.allocate(LARGE_ALLOCATION_THRESHOLD + 1);
        assert_eq!(allocator.block_count(), 2);
        // The bump block is untouched by the detour.
        let _small2 = allocator.allocate(16);
        assert_eq!(allocator.block_count(), 2);
    }

    #[test]
    fn exhausted_block_is_replaced() {
        let mut allocator = BlockAllocator::new();
        let per_alloc = LARGE_ALLOCATION_THRESHOLD;
        let fits = ALLOC_BLOCK_SIZE / per_alloc;
        for _ in 0..fits {
            allocator.allocate(per_alloc);
        }
        assert_eq!(allocator.block_count(), 1);
        allocator.allocate(per_alloc);
        assert_eq!(allocator.block_count(), 2);
    }

    #[test]
    fn allocations_are_writable_and_distinct() {
        let mut allocator = BlockAllocator::new();
        let ptrs: Vec<NonNull<u8>> = (0..100).map(|_| allocator.allocate(8)).collect();
        for (i, ptr) in ptrs.iter().enumerate() {
            // SAFETY: each pointer refers to at least 8 owned bytes.
            unsafe { ptr.as_ptr().cast::<u64>().write(i as u64) };
        }
        for (i, ptr) in ptrs.iter().enumerate() {
            let value = unsafe { ptr.as_ptr().cast::<u64>().read() };
            assert_eq!(value, i as u64);
        }
    }
}
