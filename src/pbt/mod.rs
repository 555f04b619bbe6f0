//! # Packed B-Tree (PBT)
//!
//! An immutable, memory-mapped on-disk associative container mapping opaque
//! byte-string keys to opaque byte-string values, sorted by a caller-supplied
//! comparator. A file is built once from sorted input, sealed, then served
//! read-only with zero-copy point lookup, positional lookup, ordered
//! iteration, and N-way merge into a fresh file.
//!
//! ## File Layout
//!
//! ```text
//! +-----------------------+
//! | Header (44 bytes)     |  magic, depth, node/item counts, offsets
//! +-----------------------+
//! | Key-value items       |  variable length, in key order
//! +-----------------------+
//! | Leaf nodes            |  one child reference per item
//! +-----------------------+
//! | Internal nodes        |  bottom-up levels; last node is the root
//! +-----------------------+
//! ```
//!
//! Every reference points backwards in the file, which is what lets the
//! bulk load run as a single forward pass: items are appended first, then
//! leaves over the items, then each internal level over the level below it,
//! and finally the header is patched with the root offset and counts.
//!
//! ## Lifecycle
//!
//! [`Environment::open`] names a file and fixes its [`Options`] (branch
//! factor and comparator). [`Environment::writer`] creates/truncates the
//! file and returns a [`Writer`]; `add` appends items in strictly ascending
//! key order and `finish` seals the file. [`Environment::reader`] maps a
//! sealed file read-only and returns a [`Reader`]; readers are `Send + Sync`
//! and every operation takes `&self`.
//!
//! ## Module Organization
//!
//! - `format`: packed record layouts and bounds-checked zero-copy accessors
//! - `appender`: grow-on-demand sequential writer into mapped storage
//! - `writer`: bulk-load builder and N-way merge
//! - `reader`: zero-copy lookups and iteration over a sealed file
//! - `environment` / `options`: per-file entry point and build options

mod appender;
mod environment;
mod format;
mod options;
mod reader;
mod writer;

pub use environment::Environment;
pub use format::{Header, ItemRef, Items, HEADER_SIZE};
pub use options::Options;
pub use reader::Reader;
pub use writer::Writer;
