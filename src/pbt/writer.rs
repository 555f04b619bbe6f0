//! Bulk-load builder and N-way merge.

use std::cmp::Ordering;

use eyre::{ensure, Result};
use smallvec::SmallVec;
use tracing::debug;

use crate::config::MAX_TREE_DEPTH;
use crate::pbt::appender::Appender;
use crate::pbt::format::{Header, ItemCursor, ItemRef, Items, NodeCursor};
use crate::pbt::{Options, Reader};
use crate::storage::MappedFile;

/// Builds a packed-tree file from sorted input in a single forward pass.
///
/// `add` appends items in strictly ascending key order under the
/// environment's comparator; out-of-order input produces an undefined tree
/// (checked as a debug assertion, not at runtime). [`Writer::finish`] then
/// writes leaf nodes over the items, internal levels bottom-up, patches the
/// header, and truncates the file to its exact size. Because `finish` and
/// [`Writer::merge`] consume the writer, "add after finish" cannot be
/// expressed.
///
/// A writer is owned by one thread from creation to finish; readers opened
/// on the same path before `finish` returns observe undefined state.
pub struct Writer {
    appender: Appender,
    options: Options,
    begin_items_offset: u64,
    num_items: u64,
    #[cfg(debug_assertions)]
    last_key: Option<Vec<u8>>,
}

impl Writer {
    pub(crate) fn new(storage: MappedFile, options: Options) -> Result<Self> {
        ensure!(
            options.branch_factor >= 2,
            "branch factor must be at least 2, got {}",
            options.branch_factor
        );

        let mut appender = Appender::new(storage);
        appender.append_header()?;
        let begin_items_offset = appender.offset();

        Ok(Self {
            appender,
            options,
            begin_items_offset,
            num_items: 0,
            #[cfg(debug_assertions)]
            last_key: None,
        })
    }

    /// Number of items appended so far.
    pub fn num_items(&self) -> u64 {
        self.num_items
    }

    /// Appends one key-value pair. `key` must be strictly greater than every
    /// previously added key; merge feeds duplicates through here, so the
    /// debug check only rejects keys that move backwards.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        #[cfg(debug_assertions)]
        {
            if let Some(last) = &self.last_key {
                debug_assert!(
                    (self.options.comparator)(key, last) != Ordering::Less,
                    "keys must be added in ascending order"
                );
            }
            self.last_key = Some(key.to_vec());
        }

        self.appender.append_item(key, value)?;
        self.num_items += 1;
        Ok(())
    }

    /// Feeds this writer from `sources` in sorted order and seals it.
    /// Exclusive with [`Writer::add`]: the writer must still be empty.
    ///
    /// Equal keys across sources are all kept, in source order (the source
    /// with the lowest index wins ties). Point lookup on the merged file
    /// then resolves a duplicated key to the copy from the later source;
    /// whether that is the intended policy is an open question inherited
    /// from the format; the merge itself never deduplicates.
    pub fn merge(mut self, sources: &[&Reader]) -> Result<()> {
        ensure!(
            self.num_items == 0,
            "merge requires a writer with no items added"
        );

        let comparator = self.options.comparator.clone();

        let mut iters: SmallVec<[Items<'_>; 4]> =
            sources.iter().map(|reader| reader.iter()).collect();
        let mut heads: SmallVec<[Option<ItemRef<'_>>; 4]> = SmallVec::new();
        for iter in &mut iters {
            heads.push(iter.next().transpose()?);
        }

        loop {
            let mut min: Option<(usize, ItemRef<'_>)> = None;
            for (index, head) in heads.iter().enumerate() {
                if let Some(item) = *head {
                    let better = match &min {
                        None => true,
                        Some((_, best)) => comparator(item.key, best.key) == Ordering::Less,
                    };
                    if better {
                        min = Some((index, item));
                    }
                }
            }

            let Some((index, item)) = min else { break };
            self.add(item.key, item.value)?;
            heads[index] = iters[index].next().transpose()?;
        }

        debug!(
            sources = sources.len(),
            items = self.num_items,
            "merged packed trees"
        );
        self.finish()
    }

    /// Builds the tree over the appended items, patches the header, flushes,
    /// and truncates the file to its exact data size.
    pub fn finish(mut self) -> Result<()> {
        self.finish_inner()
    }

    fn finish_inner(&mut self) -> Result<()> {
        let branch = u64::from(self.options.branch_factor);
        let num_items = self.num_items;
        ensure!(
            num_items <= u64::from(u32::MAX),
            "item count {} overflows the header field",
            num_items
        );

        let first_node_offset = self.appender.offset();
        let mut items = ItemCursor {
            offset: self.begin_items_offset,
        };
        let mut nodes = NodeCursor {
            offset: first_node_offset,
        };

        // Leaf pass: one node per run of up to `branch` items.
        let mut last_node_offset = 0u64;
        let mut i = 0u64;
        while i < num_items {
            let item_start = i as u32;
            let item_end = (i + branch).min(num_items) as u32;
            last_node_offset = self.appender.offset();
            self.appender.append_leaf(item_start, item_end, &mut items)?;
            i += branch;
        }

        // Internal passes: shrink each level by the branch factor until a
        // single root remains. The node cursor keeps walking forward over
        // the level just written.
        let num_leaf_nodes = num_items.div_ceil(branch);
        let mut level_count = num_leaf_nodes;
        let mut num_internal_nodes = 0u64;
        let mut depth = 0u32;
        while level_count > 1 {
            let mut j = 0u64;
            while j < level_count {
                let num_children = ((j + branch).min(level_count) - j) as u32;
                last_node_offset = self.appender.offset();
                self.appender.append_internal(num_children, &mut nodes)?;
                j += branch;
            }
            level_count = level_count.div_ceil(branch);
            num_internal_nodes += level_count;
            depth += 1;
            ensure!(
                depth <= MAX_TREE_DEPTH,
                "tree depth {} exceeds supported maximum {}",
                depth,
                MAX_TREE_DEPTH
            );
        }

        let data_len = self.appender.offset();
        {
            let buf = self.appender.storage_mut().as_mut_slice()?;
            let header = Header::from_bytes_mut(buf)?;
            header.set_depth(depth);
            header.set_num_leaf_nodes(num_leaf_nodes as u32);
            header.set_num_internal_nodes(num_internal_nodes as u32);
            header.set_num_items(num_items as u32);
            header.set_root_offset(last_node_offset);
            header.set_first_node_offset(first_node_offset);
            header.set_begin_items_offset(self.begin_items_offset);
        }

        debug!(
            num_items,
            depth, num_leaf_nodes, num_internal_nodes, data_len, "sealed packed tree"
        );

        self.appender.storage_mut().flush()?;
        self.appender.storage_mut().resize(data_len)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbt::Environment;
    use tempfile::tempdir;

    #[test]
    fn empty_finish_writes_header_only() {
        let dir = tempdir().unwrap();
        let env = Environment::with_defaults(dir.path().join("empty.pbt"));
        env.writer().unwrap().finish().unwrap();

        let len = std::fs::metadata(env.path()).unwrap().len();
        assert_eq!(len, crate::pbt::HEADER_SIZE as u64);

        let reader = env.reader().unwrap();
        assert_eq!(reader.num_items(), 0);
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.root_offset(), 0);
    }

    #[test]
    fn single_leaf_tree() {
        let dir = tempdir().unwrap();
        let env = Environment::with_defaults(dir.path().join("leaf.pbt"));
        let mut writer = env.writer().unwrap();
        writer.add(b"k0", b"v0").unwrap();
        writer.add(b"k1", b"v1").unwrap();
        writer.add(b"k2", b"v2").unwrap();
        writer.finish().unwrap();

        let reader = env.reader().unwrap();
        assert_eq!(reader.num_items(), 3);
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.num_leaf_nodes(), 1);
        assert_eq!(reader.num_internal_nodes(), 0);
        // With a single leaf the root is the first (and only) node.
        assert_eq!(reader.root_offset(), reader.first_node_offset());
    }

    #[test]
    fn file_is_truncated_to_exact_size() {
        let dir = tempdir().unwrap();
        let env = Environment::with_defaults(dir.path().join("exact.pbt"));
        let mut writer = env.writer().unwrap();
        writer.add(b"a", b"1").unwrap();
        writer.finish().unwrap();

        let len = std::fs::metadata(env.path()).unwrap().len();
        assert!(len < crate::config::INITIAL_FILE_SIZE);

        // header + item(16+1+1) + leaf(20 + child(24+1))
        let expected = crate::pbt::HEADER_SIZE as u64 + 18 + 45;
        assert_eq!(len, expected);
    }

    #[test]
    fn merge_requires_empty_writer() {
        let dir = tempdir().unwrap();
        let env = Environment::with_defaults(dir.path().join("a.pbt"));
        let mut writer = env.writer().unwrap();
        writer.add(b"x", b"1").unwrap();
        writer.finish().unwrap();
        let reader = env.reader().unwrap();

        let target_env = Environment::with_defaults(dir.path().join("t.pbt"));
        let mut target = target_env.writer().unwrap();
        target.add(b"pre", b"0").unwrap();
        assert!(target.merge(&[&reader]).is_err());
    }
}
