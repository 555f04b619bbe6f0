//! Build and lookup options for a packed-tree file.

use std::fmt;

use crate::config::DEFAULT_BRANCH_FACTOR;
use crate::encoding::{lexical, Comparator};

/// Options fixed at [`Environment::open`](crate::pbt::Environment::open)
/// time and shared by the file's writer, readers, and merges.
///
/// The comparator must match the order the file was written in; the on-disk
/// format does not record it.
#[derive(Clone)]
pub struct Options {
    /// Maximum number of children per node. Must be at least 2.
    pub branch_factor: u32,
    /// Total ordering over keys; defaults to unsigned lexicographic.
    pub comparator: Comparator,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            branch_factor: DEFAULT_BRANCH_FACTOR,
            comparator: lexical(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("branch_factor", &self.branch_factor)
            .finish_non_exhaustive()
    }
}
