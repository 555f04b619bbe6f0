//! # Slab Allocators
//!
//! Coarse bump allocators serving aligned byte runs that are all freed
//! together when the allocator is dropped. There is deliberately no
//! per-object free: the consumers (skip-list nodes and entries, scratch
//! buffers) live exactly as long as their owner, so wholesale release is
//! both simpler and faster than reference-counted bookkeeping.
//!
//! Three shapes:
//!
//! - [`BlockAllocator`]: single-threaded chain of 4 KiB blocks; requests
//!   above 1 KiB get a dedicated block.
//! - [`CoreLocalAllocator`]: one mutex-guarded `BlockAllocator` per CPU
//!   core, with a try-lock fast path that migrates to another shard on
//!   contention. This is what the concurrent skip list allocates from.
//! - [`FixedArena`]: a fixed-capacity linear carve for scratch space.
//!
//! All returned addresses satisfy [`crate::config::ALLOC_ALIGNMENT`] and
//! stay valid until the owning allocator is dropped.

mod arena;
mod block;
mod shard;

pub use arena::FixedArena;
pub use block::BlockAllocator;
pub use shard::CoreLocalAllocator;
