//! Zero-copy lookups and iteration over a sealed packed-tree file.

use std::cmp::Ordering;
use std::path::Path;

use eyre::{ensure, Result};

use crate::config::MAX_TREE_DEPTH;
use crate::pbt::format::{item_at, node_at, Header, ItemRef, Items, HEADER_SIZE};
use crate::pbt::Options;
use crate::storage::MappedFile;

/// Read-only view of a sealed packed-tree file.
///
/// All returned keys and values are slices borrowing the mapping: nothing
/// is copied, and their lifetime is bounded by the reader. Every operation
/// takes `&self` and touches no shared mutable state, so one reader can be
/// used from any number of threads (`Reader` is `Send + Sync`).
///
/// Header fields are validated and copied out once at open; a bad magic or
/// inconsistent offsets fail `open` rather than surfacing later.
pub struct Reader {
    storage: MappedFile,
    options: Options,
    depth: u32,
    num_items: u64,
    num_leaf_nodes: u32,
    num_internal_nodes: u32,
    root_offset: u64,
    first_node_offset: u64,
    begin_items_offset: u64,
}

impl Reader {
    pub(crate) fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let storage = MappedFile::open(path.as_ref(), true)?;

        ensure!(
            storage.size() >= HEADER_SIZE as u64,
            "'{}' is too short for a packed-tree header: {} < {}",
            path.as_ref().display(),
            storage.size(),
            HEADER_SIZE
        );

        let header = Header::from_bytes(storage.as_slice())?;
        let depth = header.depth();
        let num_items = u64::from(header.num_items());
        let num_leaf_nodes = header.num_leaf_nodes();
        let num_internal_nodes = header.num_internal_nodes();
        let root_offset = header.root_offset();
        let first_node_offset = header.first_node_offset();
        let begin_items_offset = header.begin_items_offset();

        let size = storage.size();
        ensure!(
            depth <= MAX_TREE_DEPTH,
            "header depth {} exceeds supported maximum",
            depth
        );
        ensure!(
            begin_items_offset == HEADER_SIZE as u64,
            "items do not start right after the header (offset {})",
            begin_items_offset
        );
        ensure!(
            begin_items_offset <= first_node_offset && first_node_offset <= size,
            "node region [{}, ..) is inconsistent with file size {}",
            first_node_offset,
            size
        );
        if num_items > 0 {
            ensure!(
                first_node_offset <= root_offset && root_offset < size,
                "root offset {} lies outside the node region [{}, {})",
                root_offset,
                first_node_offset,
                size
            );
        }

        Ok(Self {
            storage,
            options,
            depth,
            num_items,
            num_leaf_nodes,
            num_internal_nodes,
            root_offset,
            first_node_offset,
            begin_items_offset,
        })
    }

    pub fn num_items(&self) -> u64 {
        self.num_items
    }

    /// Height of the root; 0 means the root is a leaf (or the file is
    /// empty).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn num_leaf_nodes(&self) -> u32 {
        self.num_leaf_nodes
    }

    pub fn num_internal_nodes(&self) -> u32 {
        self.num_internal_nodes
    }

    pub fn root_offset(&self) -> u64 {
        self.root_offset
    }

    pub(crate) fn first_node_offset(&self) -> u64 {
        self.first_node_offset
    }

    fn data(&self) -> &[u8] {
        self.storage.as_slice()
    }

    /// Looks up `key`, returning its value as a slice into the mapping.
    pub fn get(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        match self.locate_key(key)? {
            None => Ok(None),
            Some(offset) => Ok(Some(item_at(self.data(), offset)?.value)),
        }
    }

    /// Returns the item at position `index` in key order, or `None` when
    /// `index >= num_items`.
    pub fn at(&self, index: u64) -> Result<Option<ItemRef<'_>>> {
        match self.locate_index(index)? {
            None => Ok(None),
            Some(offset) => Ok(Some(item_at(self.data(), offset)?)),
        }
    }

    /// Iterator over all items in key order.
    pub fn iter(&self) -> Items<'_> {
        Items::new(self.data(), self.begin_items_offset, self.first_node_offset)
    }

    /// Iterator positioned at `key`, or the exhausted iterator when the key
    /// is absent. Note: an absent key does *not* position at the
    /// next-greater item.
    pub fn seek(&self, key: &[u8]) -> Result<Items<'_>> {
        match self.locate_key(key)? {
            None => Ok(self.end()),
            Some(offset) => Ok(Items::new(self.data(), offset, self.first_node_offset)),
        }
    }

    /// Iterator positioned at the item with position `index`, or the
    /// exhausted iterator when out of range.
    pub fn seek_at(&self, index: u64) -> Result<Items<'_>> {
        match self.locate_index(index)? {
            None => Ok(self.end()),
            Some(offset) => Ok(Items::new(self.data(), offset, self.first_node_offset)),
        }
    }

    /// The exhausted iterator; `seek` on absent keys compares equal to it.
    pub fn end(&self) -> Items<'_> {
        Items::new(self.data(), self.first_node_offset, self.first_node_offset)
    }

    /// Hints the kernel that the whole item region will be read soon.
    pub fn prefetch(&self) {
        self.storage.advise_willneed(
            self.begin_items_offset,
            self.first_node_offset - self.begin_items_offset,
        );
    }

    /// Tree descent for `key`: at each internal level pick the rightmost
    /// child whose routing key is <= the target; accept at the leaf only on
    /// equality. Offset 0 (the header) doubles as the "no child selected"
    /// sentinel, exactly as the format's descent defines it.
    fn locate_key(&self, key: &[u8]) -> Result<Option<u64>> {
        if self.num_items == 0 {
            return Ok(None);
        }

        let buf = self.data();
        let comparator = &self.options.comparator;

        let mut offset = self.root_offset;
        let mut depth = self.depth;
        while depth > 0 && offset != 0 {
            let node = node_at(buf, offset)?;
            offset = 0;
            for child in node.children() {
                let child = child?;
                if comparator(key, child.key) != Ordering::Less {
                    offset = child.offset;
                } else {
                    break;
                }
            }
            depth -= 1;
        }

        if offset == 0 {
            return Ok(None);
        }

        let leaf = node_at(buf, offset)?;
        for child in leaf.children() {
            let child = child?;
            if comparator(key, child.key) == Ordering::Equal {
                return Ok(Some(child.offset));
            }
        }

        Ok(None)
    }

    /// Positional descent: subtract preceding subtree counts until the
    /// target child is found.
    fn locate_index(&self, index: u64) -> Result<Option<u64>> {
        if index >= self.num_items {
            return Ok(None);
        }

        let buf = self.data();
        let mut remaining = index;
        let mut offset = self.root_offset;
        let mut depth = self.depth;
        while depth > 0 && offset != 0 {
            let node = node_at(buf, offset)?;
            offset = 0;
            for child in node.children() {
                let child = child?;
                if remaining >= child.num_items {
                    remaining -= child.num_items;
                } else {
                    offset = child.offset;
                    break;
                }
            }
            depth -= 1;
        }

        if offset == 0 {
            return Ok(None);
        }

        let leaf = node_at(buf, offset)?;
        for child in leaf.children() {
            let child = child?;
            if remaining == 0 {
                return Ok(Some(child.offset));
            }
            remaining -= 1;
        }

        Ok(None)
    }
}
