//! Insert-if-absent with node splitting.

use tracing::trace;

use crate::common::{Error, NodeId, Result};
use crate::index::btree::key::Key;
use crate::index::btree::node::{Entry, Node, Search};
use crate::index::btree::stats::TreeStats;
use crate::index::btree::tree::BTree;
use crate::storage::Store;

/// An ancestor on the descent path and the slot position the descent
/// went through, which is where a promoted key lands.
type PathStep = (NodeId, usize);

impl<S: Store, K: Key> BTree<S, K> {
    /// Insert a key unless an equal key is already stored.
    ///
    /// Returns `None` when the key was inserted, or the stored key (left
    /// untouched) when a duplicate exists.
    ///
    /// # Errors
    /// - `Error::NoWriter` if the store cannot be written
    /// - `Error::KeySizeMismatch` if the key has the wrong size
    pub fn insert(&mut self, key: &K) -> Result<Option<K>> {
        self.require_writer()?;
        self.check_key(key)?;

        let capacity = self.layout.capacity();
        let mut path: Vec<PathStep> = Vec::new();
        // Consecutive full nodes ending at the current node.
        let mut full_run = 0usize;

        let mut node = match self.root() {
            Some(root) => self.read_node(root)?,
            None => Node::empty(),
        };

        let pos = loop {
            let below = match node.search(key) {
                Search::Found(i) => return Ok(Some(K::read_from(node.key(i))?)),
                Search::Below(below) => below,
            };
            full_run = if node.len() >= capacity { full_run + 1 } else { 0 };

            let pos = Search::insert_pos(below);
            match node.child_below(below) {
                Some(child) => {
                    let id = node
                        .id
                        .ok_or_else(|| Error::corrupt_node(0, "unwritten node has children"))?;
                    path.push((id, pos));
                    node = self.read_node(child)?;
                }
                None => break pos,
            }
        };

        // Every full node on the path splits and needs a sibling; a full root
        // also needs a new root above it.
        if full_run > 0 {
            let needed = full_run + usize::from(full_run > path.len());
            let blank = self.layout.blank();
            self.alloc.reserve(&mut self.store, needed, &blank)?;
        }

        let raw = self.encode_key(key)?;
        node.insert_at(pos, raw, None);

        if node.len() <= capacity {
            let id = self.write_node(&mut node)?;
            if self.root().is_none() {
                self.alloc.set_root(&mut self.store, Some(id))?;
                trace!(target: "diskbtree::insert", root = id.offset(), "planted root");
            }
            return Ok(None);
        }

        self.split(node, path)?;
        Ok(None)
    }

    /// Split an overflowing node and push its middle key upwards until an
    /// ancestor absorbs it or a new root is made.
    fn split(&mut self, mut node: Node, mut path: Vec<PathStep>) -> Result<()> {
        let capacity = self.layout.capacity();
        let half = capacity / 2;

        loop {
            debug_assert_eq!(node.len(), capacity + 1);
            let upper = node.entries.split_off(half + 1);
            let middle = node
                .entries
                .pop()
                .ok_or_else(|| Error::corrupt_node(node.offset(), "split of an empty node"))?;

            let mut sibling = Node {
                id: None,
                least: middle.child,
                entries: upper,
            };
            let sibling_id = self.write_node(&mut sibling)?;
            let node_id = self.write_node(&mut node)?;
            TreeStats::bump(&self.stats.splits);
            trace!(
                target: "diskbtree::insert",
                node = node_id.offset(),
                sibling = sibling_id.offset(),
                "split node"
            );

            let Some((parent_id, pos)) = path.pop() else {
                let mut root = Node {
                    id: None,
                    least: Some(node_id),
                    entries: vec![Entry {
                        child: Some(sibling_id),
                        key: middle.key,
                    }],
                };
                let root_id = self.write_node(&mut root)?;
                self.alloc.set_root(&mut self.store, Some(root_id))?;
                TreeStats::bump(&self.stats.root_promotions);
                trace!(target: "diskbtree::insert", root = root_id.offset(), "promoted new root");
                return Ok(());
            };

            let mut parent = self.read_node(parent_id)?;
            parent.insert_at(pos, middle.key, Some(sibling_id));
            if parent.len() <= capacity {
                self.write_node(&mut parent)?;
                return Ok(());
            }
            node = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::common::config::MAGIC_LEN;
    use crate::index::btree::node::Node;
    use crate::storage::{MemStore, ReadOnlyStore, Store};
    use crate::{BTree, Error};
    use std::io::Cursor;

    const MAGIC: [u8; MAGIC_LEN] = *b"InsertTests\0\0\0\0\0";

    fn tree(capacity: u32) -> BTree<MemStore, u32> {
        BTree::create(MemStore::in_memory(), MAGIC, &0u32, capacity).unwrap()
    }

    fn root_node(t: &mut BTree<MemStore, u32>) -> Node {
        let root = t.root().unwrap();
        t.read_node(root).unwrap()
    }

    #[test]
    fn test_insert_into_empty_tree() {
        let mut t = tree(4);
        assert_eq!(t.insert(&42).unwrap(), None);
        assert_eq!(t.find(&42).unwrap(), Some(42));
        assert_eq!(root_node(&mut t).len(), 1);
    }

    #[test]
    fn test_duplicate_returns_existing() {
        let mut t = tree(4);
        t.insert(&7).unwrap();
        let before = t.store().bytes().to_vec();

        assert_eq!(t.insert(&7).unwrap(), Some(7));
        assert_eq!(t.store().bytes(), &before[..]);
    }

    #[test]
    fn test_keys_stay_sorted_in_node() {
        let mut t = tree(4);
        for k in [30, 10, 40, 20] {
            t.insert(&k).unwrap();
        }
        let keys: Vec<u32> = root_node(&mut t)
            .entries
            .iter()
            .map(|e| u32::from_le_bytes(e.key[..].try_into().unwrap()))
            .collect();
        assert_eq!(keys, vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_split_promotes_middle_key() {
        let mut t = tree(2);
        for k in [1, 2, 3] {
            t.insert(&k).unwrap();
        }

        let root = root_node(&mut t);
        assert_eq!(root.len(), 1);
        assert_eq!(root.key(0), &2u32.to_le_bytes());
        assert!(root.least.is_some());
        assert!(root.entries[0].child.is_some());

        let snapshot = t.stats().snapshot();
        assert_eq!(snapshot.splits, 1);
        assert_eq!(snapshot.root_promotions, 1);
    }

    #[test]
    fn test_split_uses_reserved_slots() {
        let mut t = tree(2);
        t.insert(&1).unwrap();
        t.insert(&2).unwrap();
        let end_before = t.store.end().unwrap();

        // Leaf is full and is the root: sibling + new root are reserved.
        t.insert(&3).unwrap();
        assert_eq!(t.free_nodes(), 0);
        assert!(t.store.end().unwrap() > end_before);
        // Reserved slots were never freed, so they do not count as reuse.
        let stats = t.stats().snapshot();
        assert_eq!(stats.nodes_allocated, 3);
        assert_eq!(stats.nodes_reused, 0);
    }

    #[test]
    fn test_ascending_inserts_promote_root() {
        let mut t = tree(2);
        t.insert(&0).unwrap();
        let first = t.root().unwrap();

        for k in 1..10 {
            t.insert(&k).unwrap();
        }
        assert_ne!(t.root().unwrap(), first);
        assert!(t.stats().snapshot().splits >= 2);

        for k in 0..10 {
            assert_eq!(t.find(&k).unwrap(), Some(k));
        }
    }

    #[test]
    fn test_insert_needs_writer() {
        let bytes = tree(2).into_store().into_inner().into_inner();
        let mut t: BTree<_, u32> =
            BTree::open(ReadOnlyStore::new(Cursor::new(bytes)), MAGIC, &0u32).unwrap();
        assert!(matches!(t.insert(&1), Err(Error::NoWriter)));
    }

    #[test]
    fn test_insert_key_size_mismatch() {
        let mut t: BTree<MemStore, Vec<u8>> =
            BTree::create(MemStore::in_memory(), MAGIC, &vec![0u8; 4], 2).unwrap();
        assert_eq!(t.insert(&b"abcd".to_vec()).unwrap(), None);
        assert!(matches!(
            t.insert(&b"abc".to_vec()),
            Err(Error::KeySizeMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }
}
