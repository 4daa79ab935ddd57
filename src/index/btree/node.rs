//! Node records and their fixed-length encoding.
//!
//! A node is read into a [`Node`], mutated in memory, and written back to
//! the same offset. [`NodeLayout`] owns the byte layout.

use crate::common::config::{node_record_len, CHILD_PTR_SIZE, NODE_HEADER_SIZE};
use crate::common::{Error, NodeId, Result};
use crate::index::btree::key::Key;

/// One key slot.
///
/// `child` is the subtree holding keys strictly greater than `key` and
/// strictly less than the next slot's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub child: Option<NodeId>,
    pub key: Vec<u8>,
}

/// A decoded tree node.
///
/// `least` is the subtree holding keys smaller than the first slot's key.
/// Deletions can leave `None` holes in internal nodes, so a node is a
/// leaf only when it has no child pointer at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// Storage offset; `None` until the node is first written.
    pub id: Option<NodeId>,
    pub least: Option<NodeId>,
    pub entries: Vec<Entry>,
}

/// Outcome of searching one node for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    /// The key is stored in this slot.
    Found(usize),
    /// The key is absent; holds the rightmost slot with a smaller key.
    Below(Option<usize>),
}

impl Search {
    /// Slot index at which an absent key would be inserted.
    #[inline]
    pub fn insert_pos(below: Option<usize>) -> usize {
        below.map_or(0, |i| i + 1)
    }
}

impl Node {
    /// A node with no keys and no children.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset for error messages (0 for a node not yet written).
    #[inline]
    pub fn offset(&self) -> u64 {
        self.id.map_or(0, |id| id.offset())
    }

    #[inline]
    pub fn key(&self, i: usize) -> &[u8] {
        &self.entries[i].key
    }

    /// Binary search over the sorted slots.
    pub fn search<K: Key>(&self, key: &K) -> Search {
        match self
            .entries
            .binary_search_by(|entry| key.compare(&entry.key).reverse())
        {
            Ok(i) => Search::Found(i),
            Err(i) => Search::Below(i.checked_sub(1)),
        }
    }

    /// Subtree to descend into for a key that is absent here.
    #[inline]
    pub fn child_below(&self, below: Option<usize>) -> Option<NodeId> {
        match below {
            None => self.least,
            Some(i) => self.entries[i].child,
        }
    }

    /// Insert a slot at `pos`, shifting later slots right.
    pub fn insert_at(&mut self, pos: usize, key: Vec<u8>, child: Option<NodeId>) {
        self.entries.insert(pos, Entry { child, key });
    }
}

/// Byte layout of node records for one store.
///
/// # Layout (little-endian, fixed length)
/// ```text
/// ┌────────────┬────────────┬─────────────────────────┬─────┬──────────────┐
/// │ least: i32 │ count: u32 │ child: i32 │ key bytes  │ ... │ zero padding │
/// └────────────┴────────────┴─────────────────────────┴─────┴──────────────┘
///                            ◀──── slot (count times) ───▶
/// ```
/// Record length is `8 + capacity × (key_size + 4)`. A pointer of `-1`
/// means "no subtree".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    key_size: usize,
    capacity: usize,
}

impl NodeLayout {
    pub fn new(key_size: usize, capacity: usize) -> Self {
        Self { key_size, capacity }
    }

    #[inline]
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length of one encoded slot.
    #[inline]
    pub fn slot_len(&self) -> usize {
        CHILD_PTR_SIZE + self.key_size
    }

    /// Length of every node record.
    #[inline]
    pub fn record_len(&self) -> usize {
        node_record_len(self.key_size, self.capacity)
    }

    /// Encoded empty node.
    pub fn blank(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.record_len()];
        buf[..4].copy_from_slice(&(-1i32).to_le_bytes());
        buf
    }

    /// Decode the record read from `id`.
    ///
    /// # Errors
    /// Returns `Error::CorruptNode` if the buffer has the wrong length or the
    /// count exceeds the capacity.
    pub fn decode(&self, id: NodeId, buf: &[u8]) -> Result<Node> {
        if buf.len() != self.record_len() {
            return Err(Error::corrupt_node(
                id.offset(),
                format!("record is {} bytes, expected {}", buf.len(), self.record_len()),
            ));
        }

        let least = NodeId::from_ptr(read_i32(buf, 0));
        let count = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
        if count > self.capacity {
            return Err(Error::corrupt_node(
                id.offset(),
                format!("count {count} exceeds capacity {}", self.capacity),
            ));
        }

        let entries = buf[NODE_HEADER_SIZE..]
            .chunks_exact(self.slot_len())
            .take(count)
            .map(|slot| Entry {
                child: NodeId::from_ptr(read_i32(slot, 0)),
                key: slot[CHILD_PTR_SIZE..].to_vec(),
            })
            .collect();

        Ok(Node {
            id: Some(id),
            least,
            entries,
        })
    }

    /// Encode `node` into a full-length record.
    ///
    /// # Errors
    /// Returns `Error::CorruptNode` if the node overflows the capacity or a
    /// key has the wrong length, and `Error::OffsetOverflow` if a child
    /// pointer does not fit.
    pub fn encode(&self, node: &Node) -> Result<Vec<u8>> {
        if node.len() > self.capacity {
            return Err(Error::corrupt_node(
                node.offset(),
                format!("{} keys exceed capacity {}", node.len(), self.capacity),
            ));
        }

        let mut buf = vec![0u8; self.record_len()];
        buf[..4].copy_from_slice(&NodeId::to_ptr(node.least)?.to_le_bytes());
        buf[4..8].copy_from_slice(&(node.len() as u32).to_le_bytes());

        for (entry, slot) in node
            .entries
            .iter()
            .zip(buf[NODE_HEADER_SIZE..].chunks_exact_mut(self.slot_len()))
        {
            if entry.key.len() != self.key_size {
                return Err(Error::corrupt_node(
                    node.offset(),
                    format!("key of {} bytes, expected {}", entry.key.len(), self.key_size),
                ));
            }
            slot[..CHILD_PTR_SIZE].copy_from_slice(&NodeId::to_ptr(entry.child)?.to_le_bytes());
            slot[CHILD_PTR_SIZE..].copy_from_slice(&entry.key);
        }
        Ok(buf)
    }
}

fn read_i32(buf: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: u32) -> Vec<u8> {
        k.to_le_bytes().to_vec()
    }

    fn node(keys: &[u32]) -> Node {
        Node {
            id: None,
            least: None,
            entries: keys
                .iter()
                .map(|&k| Entry {
                    child: None,
                    key: key(k),
                })
                .collect(),
        }
    }

    // --- Search tests ---

    #[test]
    fn test_search_found() {
        let n = node(&[10, 20, 30]);
        assert_eq!(n.search(&10u32), Search::Found(0));
        assert_eq!(n.search(&30u32), Search::Found(2));
    }

    #[test]
    fn test_search_below() {
        let n = node(&[10, 20, 30]);
        assert_eq!(n.search(&5u32), Search::Below(None));
        assert_eq!(n.search(&15u32), Search::Below(Some(0)));
        assert_eq!(n.search(&99u32), Search::Below(Some(2)));
        assert_eq!(Node::empty().search(&1u32), Search::Below(None));
    }

    #[test]
    fn test_insert_pos() {
        assert_eq!(Search::insert_pos(None), 0);
        assert_eq!(Search::insert_pos(Some(2)), 3);
    }

    #[test]
    fn test_child_below() {
        let mut n = node(&[10, 20]);
        n.least = Some(NodeId(100));
        n.entries[1].child = Some(NodeId(200));
        assert_eq!(n.child_below(None), Some(NodeId(100)));
        assert_eq!(n.child_below(Some(0)), None);
        assert_eq!(n.child_below(Some(1)), Some(NodeId(200)));
    }

    // --- Codec tests ---

    #[test]
    fn test_record_len() {
        let layout = NodeLayout::new(8, 4);
        assert_eq!(layout.slot_len(), 12);
        assert_eq!(layout.record_len(), 8 + 4 * 12);
        assert_eq!(layout.blank().len(), layout.record_len());
    }

    #[test]
    fn test_blank_decodes_as_empty_leaf() {
        let layout = NodeLayout::new(4, 2);
        let n = layout.decode(NodeId(44), &layout.blank()).unwrap();
        assert!(n.is_empty());
        assert_eq!(n.least, None);
        assert_eq!(n.id, Some(NodeId(44)));
    }

    #[test]
    fn test_encode_decode() {
        let layout = NodeLayout::new(4, 4);
        let mut n = node(&[1, 2, 3]);
        n.least = Some(NodeId(76));
        n.entries[2].child = Some(NodeId(108));

        let buf = layout.encode(&n).unwrap();
        let back = layout.decode(NodeId(44), &buf).unwrap();
        assert_eq!(back.least, n.least);
        assert_eq!(back.entries, n.entries);
    }

    #[test]
    fn test_byte_layout() {
        let layout = NodeLayout::new(4, 2);
        let mut n = node(&[0x0A0B0C0D]);
        n.entries[0].child = Some(NodeId(0x44));

        let buf = layout.encode(&n).unwrap();
        assert_eq!(&buf[0..4], &[0xFF; 4]); // least = -1
        assert_eq!(&buf[4..8], &[1, 0, 0, 0]); // count
        assert_eq!(&buf[8..12], &[0x44, 0, 0, 0]); // child
        assert_eq!(&buf[12..16], &[0x0D, 0x0C, 0x0B, 0x0A]); // key
        assert_eq!(&buf[16..], &[0u8; 8]); // unused slot
    }

    #[test]
    fn test_encode_rejects_overflow() {
        let layout = NodeLayout::new(4, 2);
        assert!(matches!(
            layout.encode(&node(&[1, 2, 3])),
            Err(Error::CorruptNode { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_count() {
        let layout = NodeLayout::new(4, 2);
        let mut buf = layout.blank();
        buf[4..8].copy_from_slice(&3u32.to_le_bytes());
        assert!(matches!(
            layout.decode(NodeId(44), &buf),
            Err(Error::CorruptNode { offset: 44, .. })
        ));
    }
}
