//! # Storage Module
//!
//! The foundation under the packed B-tree: a file-backed byte region served
//! through memory mapping. Instead of copying data between kernel and user
//! space, the file is mapped straight into the process address space, so
//! reads hand out `&[u8]` slices pointing at the page cache and writes go
//! through the same mapping.
//!
//! ## Safety Model
//!
//! A mapping becomes invalid whenever the file is resized and remapped.
//! Rather than guarding that with epochs or reference counting, the borrow
//! checker enforces it at compile time:
//!
//! ```text
//! MappedFile::as_slice(&self) -> &[u8]          // shared borrow
//! MappedFile::resize(&mut self, n)              // exclusive borrow
//! ```
//!
//! No slice can be live across a `resize` or mode switch, with zero runtime
//! cost.
//!
//! ## Module Organization
//!
//! - `mapped`: the [`MappedFile`] handle (create/grow/shrink, read-only ⇄
//!   read-write remap, async flush, prefetch hints).

mod mapped;

pub use mapped::MappedFile;
