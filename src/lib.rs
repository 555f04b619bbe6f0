//! # leafdb: Embeddable Ordered Key-Value Storage
//!
//! leafdb packs two cooperating cores into one small library:
//!
//! - **Packed B-tree (PBT) files**: immutable, memory-mapped on-disk maps
//!   from opaque byte-string keys to byte-string values, sorted by a
//!   caller-supplied comparator. A file is bulk-loaded once from sorted
//!   input, sealed, then served read-only with zero-copy point lookup,
//!   positional lookup, ordered iteration, and N-way merge.
//! - **Concurrent skip list**: a lock-free in-memory ordered map used as
//!   the mutable staging structure whose contents are later flushed into
//!   PBT files.
//!
//! ## Quick Start
//!
//! ```no_run
//! use leafdb::{Environment, SkipList};
//!
//! # fn main() -> eyre::Result<()> {
//! // Stage writes concurrently.
//! let staged = SkipList::new();
//! staged.put(b"apple", b"red");
//! staged.put(b"banana", b"yellow");
//!
//! // Flush into an immutable packed tree.
//! let env = Environment::with_defaults("fruit.pbt");
//! let mut writer = env.writer()?;
//! for (key, value) in staged.iter() {
//!     writer.add(key, value)?;
//! }
//! writer.finish()?;
//!
//! // Serve reads zero-copy.
//! let reader = env.reader()?;
//! assert_eq!(reader.get(b"apple")?, Some(&b"red"[..]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! writes:  caller -> SkipList (concurrent) -> Writer -> Appender -> MappedFile
//! reads:   caller -> Reader -> MappedFile (zero-copy slices out)
//! ```
//!
//! ## Module Overview
//!
//! - [`pbt`]: on-disk format, bulk-load writer, zero-copy reader, merge
//! - [`skiplist`]: lock-free ordered map with tombstone deletion
//! - [`storage`]: memory-mapped file region under everything
//! - [`memory`]: bump allocators with bulk free-on-drop
//! - [`core_local`]: per-CPU shard table used as a locality hint
//! - [`encoding`]: comparator abstraction and varint helpers
//! - [`config`]: all tunables in one place

pub mod config;
pub mod core_local;
pub mod encoding;
pub mod memory;
pub mod pbt;
pub mod skiplist;
pub mod storage;

pub use encoding::Comparator;
pub use pbt::{Environment, Options, Reader, Writer};
pub use skiplist::SkipList;
