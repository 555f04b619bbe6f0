//! # Key Comparator
//!
//! A comparator is a total ordering over byte strings, supplied when a
//! packed B-tree file is created and consulted again by point lookup and
//! merge. The on-disk format is comparator-agnostic: only the routing
//! decisions depend on it, so a file must always be read with the
//! comparator it was written with.
//!
//! Comparators are shared function objects rather than a generic parameter,
//! keeping readers, writers, and merge sources object-safe and letting one
//! environment hand the same comparator to all of them.

use std::cmp::Ordering;
use std::sync::Arc;

/// Total ordering over opaque byte-string keys.
pub type Comparator = Arc<dyn Fn(&[u8], &[u8]) -> Ordering + Send + Sync>;

/// The default comparator: unsigned byte-wise lexicographic order.
pub fn lexical() -> Comparator {
    Arc::new(|a: &[u8], b: &[u8]| a.cmp(b))
}
