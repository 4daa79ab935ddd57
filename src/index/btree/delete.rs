//! Deletion with successor replacement.
//!
//! Nodes are never merged. A removed slot that owns a subtree is refilled
//! with the smallest key of that subtree, and a node left less than half
//! full pulls a key up from one of its subtrees. Only a leaf that runs out
//! of keys is unlinked from its parent and handed to the free list.

use tracing::trace;

use crate::common::{Error, NodeId, Result};
use crate::index::btree::key::Key;
use crate::index::btree::node::{Node, Search};
use crate::index::btree::stats::TreeStats;
use crate::index::btree::tree::BTree;
use crate::storage::Store;

/// Which pointer of the parent leads to the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Least,
    Child(usize),
}

impl Link {
    fn below(below: Option<usize>) -> Self {
        below.map_or(Link::Least, Link::Child)
    }
}

#[derive(Debug)]
struct Parent {
    node: Node,
    link: Link,
}

impl Parent {
    fn clear_link(&mut self) {
        match self.link {
            Link::Least => self.node.least = None,
            Link::Child(i) => self.node.entries[i].child = None,
        }
    }
}

impl<S: Store, K: Key> BTree<S, K> {
    /// Remove a key.
    ///
    /// Returns the removed key, or `None` (without writing anything) if the
    /// key is absent.
    ///
    /// # Errors
    /// - `Error::NoWriter` if the store cannot be written
    /// - `Error::KeySizeMismatch` if the key has the wrong size
    pub fn delete(&mut self, key: &K) -> Result<Option<K>> {
        self.require_writer()?;
        self.check_key(key)?;

        let mut parent = None;
        let mut at = self.root();
        let (node, index) = loop {
            let Some(id) = at else {
                return Ok(None);
            };
            let node = self.read_node(id)?;
            match node.search(key) {
                Search::Found(i) => break (node, i),
                Search::Below(below) => {
                    at = node.child_below(below);
                    parent = Some(Parent {
                        node,
                        link: Link::below(below),
                    });
                }
            }
        };

        let removed = K::read_from(node.key(index))?;
        self.remove_slot(node, index, parent)?;
        Ok(Some(removed))
    }

    fn remove_slot(&mut self, mut node: Node, mut index: usize, mut parent: Option<Parent>) -> Result<()> {
        let half = self.layout.capacity() / 2;

        loop {
            let slot_child = node.entries[index].child;
            if let Some(child) = slot_child {
                // The successor takes over the slot and its subtree.
                let (next, next_parent) = self.leftmost(child)?;
                node.entries[index].key = next.key(0).to_vec();
                self.write_node(&mut node)?;
                parent = Some(next_parent.unwrap_or(Parent {
                    node,
                    link: Link::Child(index),
                }));
                node = next;
                index = 0;
                continue;
            }

            node.entries.remove(index);
            if node.len() >= half {
                self.write_node(&mut node)?;
                return Ok(());
            }
            let Some((child, pos)) = detach_child(&mut node) else {
                return self.finish_leaf(node, parent);
            };

            // Refill the underfull node from the subtree it just let go of.
            let (next, next_parent) = self.leftmost(child)?;
            node.insert_at(pos, next.key(0).to_vec(), Some(child));
            self.write_node(&mut node)?;
            trace!(
                target: "diskbtree::delete",
                node = node.offset(),
                from = child.offset(),
                "refilled underfull node"
            );
            parent = Some(next_parent.unwrap_or(Parent {
                node,
                link: Link::Child(pos),
            }));
            node = next;
            index = 0;
        }
    }

    /// Follow `least` pointers from `id` to the node holding the smallest
    /// key of that subtree. The parent is returned when it lies below `id`.
    fn leftmost(&mut self, id: NodeId) -> Result<(Node, Option<Parent>)> {
        let mut node = self.read_node(id)?;
        let mut parent = None;
        while let Some(least) = node.least {
            let next = self.read_node(least)?;
            parent = Some(Parent {
                node,
                link: Link::Least,
            });
            node = next;
        }
        if node.is_empty() {
            return Err(Error::corrupt_node(node.offset(), "empty node inside the tree"));
        }
        Ok((node, parent))
    }

    /// Write back a leaf that lost a key, releasing it once it is empty.
    fn finish_leaf(&mut self, mut node: Node, parent: Option<Parent>) -> Result<()> {
        if !node.is_empty() {
            self.write_node(&mut node)?;
            return Ok(());
        }

        let id = node
            .id
            .ok_or_else(|| Error::corrupt_node(0, "unwritten leaf in the tree"))?;
        match parent {
            Some(mut parent) => {
                parent.clear_link();
                self.write_node(&mut parent.node)?;
            }
            None => self.alloc.set_root(&mut self.store, None)?,
        }
        self.alloc.release(&mut self.store, id)?;
        TreeStats::bump(&self.stats.nodes_freed);
        trace!(target: "diskbtree::delete", node = id.offset(), "released empty leaf");
        Ok(())
    }
}

/// Take the first subtree pointer out of `node`.
///
/// Returns the subtree and the slot position its smallest key should be
/// inserted at, or `None` for a leaf.
fn detach_child(node: &mut Node) -> Option<(NodeId, usize)> {
    if let Some(least) = node.least.take() {
        return Some((least, 0));
    }
    node.entries
        .iter_mut()
        .enumerate()
        .find_map(|(i, entry)| entry.child.take().map(|child| (child, i + 1)))
}
