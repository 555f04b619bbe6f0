//! # Configuration Constants
//!
//! All leafdb tunables in one place. When changing any constant, check the
//! dependency notes below: interdependent values are co-located and pinned
//! with compile-time assertions so a mismatch fails the build instead of
//! corrupting a file or deadlocking an allocator.
//!
//! ```text
//! ALLOC_BLOCK_SIZE (4096 bytes)
//!       │
//!       ├─> LARGE_ALLOCATION_THRESHOLD (block size / 4)
//!       │     Requests above the threshold bypass the bump block and get a
//!       │     dedicated block; the threshold must stay below the block size
//!       │     or small-path allocations could overrun their block.
//!       │
//!       └─> ALLOC_ALIGNMENT (16 bytes, max_align_t)
//!             Small requests are rounded up to this alignment, so it must
//!             divide the block size evenly.
//!
//! SKIP_LIST_HEIGHT (16 levels)
//!       │
//!       └─> level 0 is the data level; the geometric level draw is capped
//!           at SKIP_LIST_HEIGHT - 1.
//!
//! KEY_PAD_CHUNK (32 bytes)
//!       │
//!       └─> skip-list keys are zero-padded to a multiple of this, keeping
//!           chunked key compares in-bounds. Must be a power of two.
//!
//! INITIAL_FILE_SIZE (1 MiB)
//!       └─> fresh read-write storage starts at this length and doubles on
//!           demand; finish() truncates back to the exact data size.
//! ```

/// Magic number identifying a packed B-tree file. Reads as "LEAF 1111".
pub const PBT_MAGIC: u32 = 0x1EAF_1111;

/// Initial length of a freshly opened read-write storage file.
pub const INITIAL_FILE_SIZE: u64 = 1024 * 1024;

/// Default maximum number of children per packed B-tree node.
pub const DEFAULT_BRANCH_FACTOR: u32 = 8;

/// Upper bound on tree height accepted by the reader. With a branch factor
/// of at least 2 a tree of 2^32 items stays well below this.
pub const MAX_TREE_DEPTH: u32 = 32;

/// Size of a bump-allocator block.
pub const ALLOC_BLOCK_SIZE: usize = 4096;

/// Requests larger than this get a dedicated block instead of being carved
/// from the current bump block.
pub const LARGE_ALLOCATION_THRESHOLD: usize = ALLOC_BLOCK_SIZE / 4;

/// Alignment of every address handed out by the allocators (max_align_t on
/// the supported 64-bit targets).
pub const ALLOC_ALIGNMENT: usize = 16;

/// Number of levels in the skip list; level 0 is the data level.
pub const SKIP_LIST_HEIGHT: usize = 16;

/// Skip-list keys are zero-padded to a multiple of this chunk size.
pub const KEY_PAD_CHUNK: usize = 32;

/// Minimum number of shards in a core-local array, regardless of how few
/// CPUs the machine reports.
pub const MIN_CORE_SHARDS: usize = 8;

const _: () = assert!(LARGE_ALLOCATION_THRESHOLD < ALLOC_BLOCK_SIZE);
const _: () = assert!(ALLOC_ALIGNMENT.is_power_of_two());
const _: () = assert!(ALLOC_BLOCK_SIZE % ALLOC_ALIGNMENT == 0);
const _: () = assert!(KEY_PAD_CHUNK.is_power_of_two());
const _: () = assert!(SKIP_LIST_HEIGHT >= 2);
const _: () = assert!(MIN_CORE_SHARDS.is_power_of_two());
const _: () = assert!(DEFAULT_BRANCH_FACTOR >= 2);
