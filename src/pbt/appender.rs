//! Sequential append cursor over mapped storage.
//!
//! The appender is the only component that writes to a packed-tree file.
//! It keeps a byte cursor, grows the backing storage on demand with a
//! doubling policy, and appends one fully-initialized record at a time.
//!
//! Node appends read records written earlier in the same file (items for a
//! leaf, lower-level nodes for an internal node). Each such append runs in
//! two passes: a measuring pass over the input cursor sizes the node
//! exactly, storage is grown if needed (which may remap), and only then is
//! the node written through a `split_at_mut` at the cursor: the read half
//! covers everything already appended, the write half is the fresh node, so
//! the two never alias.

use eyre::{ensure, Result};
use zerocopy::IntoBytes;

use crate::pbt::format::{
    child_encoded_len, item_encoded_len, write_child, write_item, write_node_header, Header,
    ItemCursor, NodeCursor, HEADER_SIZE, NODE_FIXED_LEN,
};
use crate::storage::MappedFile;

pub(crate) struct Appender {
    storage: MappedFile,
    offset: u64,
}

impl Appender {
    pub fn new(storage: MappedFile) -> Self {
        Self { storage, offset: 0 }
    }

    /// Current append cursor.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn storage(&self) -> &MappedFile {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut MappedFile {
        &mut self.storage
    }

    /// Grows storage so at least `additional` bytes fit past the cursor.
    fn ensure(&mut self, additional: u64) -> Result<()> {
        let needed = self.offset + additional;
        if self.storage.size() < needed {
            self.storage.resize(needed.max(2 * self.storage.size()))?;
        }
        Ok(())
    }

    /// Appends a zeroed header carrying only the magic; the writer patches
    /// the real field values in at finish.
    pub fn append_header(&mut self) -> Result<()> {
        self.ensure(HEADER_SIZE as u64)?;
        let start = offset_to_usize(self.offset)?;
        let buf = self.storage.as_mut_slice()?;
        buf[start..start + HEADER_SIZE].copy_from_slice(Header::new().as_bytes());
        self.offset += HEADER_SIZE as u64;
        Ok(())
    }

    pub fn append_item(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let total = item_encoded_len(key.len() as u64, value.len() as u64);
        self.ensure(total)?;
        let start = offset_to_usize(self.offset)?;
        let buf = self.storage.as_mut_slice()?;
        write_item(&mut buf[start..], key, value);
        self.offset += total;
        Ok(())
    }

    /// Appends a leaf node covering items `[item_start, item_end)`; `items`
    /// must sit at the first covered item and is left at the first item past
    /// the node.
    pub fn append_leaf(
        &mut self,
        item_start: u32,
        item_end: u32,
        items: &mut ItemCursor,
    ) -> Result<()> {
        let count = item_end - item_start;

        let total = {
            let buf = self.storage.as_slice();
            let mut probe = *items;
            let mut size = NODE_FIXED_LEN as u64;
            for _ in 0..count {
                let item = probe.read(buf)?;
                size += child_encoded_len(item.key.len() as u64);
                probe.offset += item.encoded_len();
            }
            size
        };
        ensure!(
            total <= u64::from(u32::MAX),
            "leaf node size {} overflows the node_size field",
            total
        );
        self.ensure(total)?;

        let node_offset = offset_to_usize(self.offset)?;
        let buf = self.storage.as_mut_slice()?;
        let (src, dst) = buf.split_at_mut(node_offset);

        write_node_header(dst, 0, item_start, item_end, count, total as u32);
        let mut data = NODE_FIXED_LEN;
        for _ in 0..count {
            let item_offset = items.offset;
            let item = items.read(src)?;
            // Leaf children always cover exactly one item.
            data += write_child(&mut dst[data..], item.key, item_offset, 1);
            items.offset += item.encoded_len();
        }

        self.offset += total;
        Ok(())
    }

    /// Appends an internal node over the next `num_children` nodes under
    /// `nodes`, which is left at the first node past them.
    pub fn append_internal(&mut self, num_children: u32, nodes: &mut NodeCursor) -> Result<()> {
        let total = {
            let buf = self.storage.as_slice();
            let mut probe = *nodes;
            let mut size = NODE_FIXED_LEN as u64;
            for _ in 0..num_children {
                let node = probe.read(buf)?;
                let first = node.first_child()?;
                size += child_encoded_len(first.key.len() as u64);
                probe.offset += u64::from(node.node_size);
            }
            size
        };
        ensure!(
            total <= u64::from(u32::MAX),
            "internal node size {} overflows the node_size field",
            total
        );
        self.ensure(total)?;

        let node_offset = offset_to_usize(self.offset)?;
        let buf = self.storage.as_mut_slice()?;
        let (src, dst) = buf.split_at_mut(node_offset);

        let mut depth = 0u32;
        let mut item_start = 0u32;
        let mut item_end = 0u32;
        let mut data = NODE_FIXED_LEN;
        for i in 0..num_children {
            let child_offset = nodes.offset;
            let child = nodes.read(src)?;
            let min_key = child.first_child()?.key;
            data += write_child(&mut dst[data..], min_key, child_offset, child.num_items());

            depth = depth.max(child.depth + 1);
            if i == 0 {
                item_start = child.item_start;
            }
            item_end = child.item_end;
            nodes.offset += u64::from(child.node_size);
        }
        write_node_header(dst, depth, item_start, item_end, num_children, total as u32);

        self.offset += total;
        Ok(())
    }
}

fn offset_to_usize(offset: u64) -> Result<usize> {
    usize::try_from(offset).map_err(|_| eyre::eyre!("offset {} exceeds address space", offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbt::format::{item_at, node_at};
    use tempfile::tempdir;

    fn appender() -> (tempfile::TempDir, Appender) {
        let dir = tempdir().unwrap();
        let storage = MappedFile::open(dir.path().join("append.pbt"), false).unwrap();
        (dir, Appender::new(storage))
    }

    #[test]
    fn header_then_items_advance_cursor() {
        let (_dir, mut appender) = appender();
        appender.append_header().unwrap();
        assert_eq!(appender.offset(), HEADER_SIZE as u64);

        appender.append_item(b"a", b"1").unwrap();
        assert_eq!(appender.offset(), HEADER_SIZE as u64 + 16 + 2);

        let item = item_at(appender.storage().as_slice(), HEADER_SIZE as u64).unwrap();
        assert_eq!(item.key, b"a");
        assert_eq!(item.value, b"1");
    }

    #[test]
    fn leaf_references_point_at_items() {
        let (_dir, mut appender) = appender();
        appender.append_header().unwrap();
        let first_item = appender.offset();
        appender.append_item(b"a", b"1").unwrap();
        appender.append_item(b"b", b"2").unwrap();

        let leaf_offset = appender.offset();
        let mut cursor = ItemCursor { offset: first_item };
        appender.append_leaf(0, 2, &mut cursor).unwrap();
        assert_eq!(cursor.offset, leaf_offset);

        let buf = appender.storage().as_slice();
        let leaf = node_at(buf, leaf_offset).unwrap();
        assert_eq!(leaf.depth, 0);
        assert_eq!(leaf.num_children, 2);
        assert_eq!(leaf.num_items(), 2);

        for child in leaf.children() {
            let child = child.unwrap();
            assert_eq!(child.num_items, 1);
            let item = item_at(buf, child.offset).unwrap();
            assert_eq!(item.key, child.key);
        }
    }

    #[test]
    fn internal_node_aggregates_children() {
        let (_dir, mut appender) = appender();
        appender.append_header().unwrap();
        let first_item = appender.offset();
        for (key, value) in [(b"a", b"1"), (b"b", b"2"), (b"c", b"3")] {
            appender.append_item(key, value).unwrap();
        }

        let first_leaf = appender.offset();
        let mut items = ItemCursor { offset: first_item };
        appender.append_leaf(0, 2, &mut items).unwrap();
        appender.append_leaf(2, 3, &mut items).unwrap();

        let internal_offset = appender.offset();
        let mut nodes = NodeCursor { offset: first_leaf };
        appender.append_internal(2, &mut nodes).unwrap();
        assert_eq!(nodes.offset, internal_offset);

        let buf = appender.storage().as_slice();
        let internal = node_at(buf, internal_offset).unwrap();
        assert_eq!(internal.depth, 1);
        assert_eq!(internal.item_start, 0);
        assert_eq!(internal.item_end, 3);

        let children: Vec<_> = internal.children().collect::<Result<_>>().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].key, b"a");
        assert_eq!(children[0].num_items, 2);
        assert_eq!(children[1].key, b"c");
        assert_eq!(children[1].num_items, 1);
        assert_eq!(children[0].offset, first_leaf);
    }

    #[test]
    fn ensure_doubles_storage() {
        let (_dir, mut appender) = appender();
        appender.append_header().unwrap();
        let initial = appender.storage().size();
        let big_value = vec![0xCD; initial as usize];
        appender.append_item(b"big", &big_value).unwrap();
        assert!(appender.storage().size() >= 2 * initial);

        let item = item_at(appender.storage().as_slice(), HEADER_SIZE as u64).unwrap();
        assert_eq!(item.value, &big_value[..]);
    }
}
