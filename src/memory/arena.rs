//! Fixed-capacity scratch arena.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

use crate::config::ALLOC_ALIGNMENT;

/// A single contiguous region drained linearly. No growth, no individual
/// free; the whole region is released on drop. Intended for bounded scratch
/// work where the caller can size the arena up front.
pub struct FixedArena {
    base: NonNull<u8>,
    layout: Layout,
    cursor: usize,
}

// SAFETY: the arena owns its region exclusively; the cursor is only moved
// through &mut self.
unsafe impl Send for FixedArena {}

impl FixedArena {
    /// Allocates a region of `capacity` bytes. `capacity` must be non-zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "arena capacity must be greater than zero");

        let layout = Layout::from_size_align(capacity, ALLOC_ALIGNMENT)
            .expect("arena capacity overflows layout");
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc(layout) };
        let Some(base) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };

        Self {
            base,
            layout,
            cursor: 0,
        }
    }

    /// Carves `size` bytes off the front of the remaining region.
    ///
    /// Exceeding the arena's capacity is a precondition violation and
    /// panics; callers size the arena for their whole scratch workload.
    pub fn allocate(&mut self, size: usize) -> NonNull<u8> {
        assert!(size > 0, "allocation size must be greater than zero");
        assert!(
            size <= self.remaining(),
            "allocation of {} bytes exceeds remaining arena capacity {}",
            size,
            self.remaining()
        );

        // SAFETY: cursor + size <= capacity, so the offset stays inside the
        // owned region.
        let address = unsafe { self.base.as_ptr().add(self.cursor) };
        self.cursor += size;
        // SAFETY: offsets into a non-null region are non-null.
        unsafe { NonNull::new_unchecked(address) }
    }

    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    pub fn remaining(&self) -> usize {
        self.layout.size() - self.cursor
    }
}

impl Drop for FixedArena {
    fn drop(&mut self) {
        // SAFETY: base/layout came from `alloc` and are freed exactly once.
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_linearly() {
        let mut arena = FixedArena::with_capacity(256);
        let a = arena.allocate(100);
        let b = arena.allocate(100);
        assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 100);
        assert_eq!(arena.remaining(), 56);
    }

    #[test]
    fn base_is_aligned() {
        let mut arena = FixedArena::with_capacity(64);
        let ptr = arena.allocate(8);
        assert_eq!(ptr.as_ptr() as usize % ALLOC_ALIGNMENT, 0);
    }

    #[test]
    #[should_panic(expected = "exceeds remaining arena capacity")]
    fn overflow_panics() {
        let mut arena = FixedArena::with_capacity(16);
        arena.allocate(17);
    }
}
