//! Ascending and descending traversal.
//!
//! Both iterators keep an explicit stack of partly consumed nodes, so they
//! hold no recursion state between calls and read each node once.

use crate::common::{NodeId, Result};
use crate::index::btree::key::Key;
use crate::index::btree::node::{Node, Search};
use crate::index::btree::tree::BTree;
use crate::storage::Store;

/// A node on the traversal stack and the slot boundary reached so far.
///
/// Ascending: `at` is the next slot to yield. Descending: `at` is the
/// number of slots not yet yielded.
#[derive(Debug)]
struct Frame {
    node: Node,
    at: usize,
}

/// Ascending iterator over the keys of a [`BTree`].
///
/// Created by [`BTree::iter`] and [`BTree::iter_from`]. Yields `Err` at most
/// once and then stops.
pub struct Iter<'a, S, K> {
    tree: &'a mut BTree<S, K>,
    stack: Vec<Frame>,
    pending: Option<NodeId>,
    seek: Option<&'a K>,
    done: bool,
}

/// Descending iterator over the keys of a [`BTree`].
///
/// Created by [`BTree::rev_iter`] and [`BTree::rev_iter_from`].
pub struct RevIter<'a, S, K> {
    tree: &'a mut BTree<S, K>,
    stack: Vec<Frame>,
    pending: Option<NodeId>,
    seek: Option<&'a K>,
    done: bool,
}

impl<S: Store, K: Key> BTree<S, K> {
    /// Iterate over all keys in ascending order.
    ///
    /// # Example
    /// ```
    /// use diskbtree::{BTree, MemStore};
    ///
    /// let mut tree = BTree::create(MemStore::in_memory(), [0; 16], &0u32, 2).unwrap();
    /// for k in [30u32, 10, 20] {
    ///     tree.insert(&k).unwrap();
    /// }
    ///
    /// let keys: Vec<u32> = tree.iter().map(|k| k.unwrap()).collect();
    /// assert_eq!(keys, vec![10, 20, 30]);
    ///
    /// let from: Vec<u32> = tree.iter_from(Some(&15)).unwrap().map(|k| k.unwrap()).collect();
    /// assert_eq!(from, vec![20, 30]);
    /// ```
    pub fn iter(&mut self) -> Iter<'_, S, K> {
        let pending = self.root();
        Iter {
            tree: self,
            stack: Vec::new(),
            pending,
            seek: None,
            done: false,
        }
    }

    /// Iterate in ascending order starting at the first key `>= start`, or
    /// at the smallest key when `start` is `None`.
    ///
    /// # Errors
    /// Returns `Error::KeySizeMismatch` if `start` has the wrong size.
    pub fn iter_from<'a>(&'a mut self, start: Option<&'a K>) -> Result<Iter<'a, S, K>> {
        if let Some(key) = start {
            self.check_key(key)?;
        }
        let mut iter = self.iter();
        iter.seek = start;
        Ok(iter)
    }

    /// Iterate over all keys in descending order.
    pub fn rev_iter(&mut self) -> RevIter<'_, S, K> {
        let pending = self.root();
        RevIter {
            tree: self,
            stack: Vec::new(),
            pending,
            seek: None,
            done: false,
        }
    }

    /// Iterate in descending order starting at the last key `<= start`, or
    /// at the largest key when `start` is `None`.
    ///
    /// # Errors
    /// Returns `Error::KeySizeMismatch` if `start` has the wrong size.
    pub fn rev_iter_from<'a>(&'a mut self, start: Option<&'a K>) -> Result<RevIter<'a, S, K>> {
        if let Some(key) = start {
            self.check_key(key)?;
        }
        let mut iter = self.rev_iter();
        iter.seek = start;
        Ok(iter)
    }
}

impl<S: Store, K: Key> Iter<'_, S, K> {
    /// Read `id` and push it, positioned for the seek key if one is left.
    fn descend(&mut self, id: NodeId) -> Result<()> {
        let node = self.tree.read_node(id)?;
        let at = match self.seek.map(|key| node.search(key)) {
            Some(Search::Found(i)) => {
                self.seek = None;
                self.pending = None;
                i
            }
            Some(Search::Below(below)) => {
                self.pending = node.child_below(below);
                if self.pending.is_none() {
                    // Positioned at a leaf; later subtrees are walked whole.
                    self.seek = None;
                }
                Search::insert_pos(below)
            }
            None => {
                self.pending = node.least;
                0
            }
        };
        self.stack.push(Frame { node, at });
        Ok(())
    }

    fn step(&mut self) -> Result<Option<K>> {
        loop {
            if let Some(id) = self.pending.take() {
                self.descend(id)?;
                continue;
            }

            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };
            if frame.at < frame.node.len() {
                let entry = &frame.node.entries[frame.at];
                frame.at += 1;
                self.pending = entry.child;
                return K::read_from(&entry.key).map(Some);
            }
            self.stack.pop();
        }
    }
}

impl<S: Store, K: Key> Iterator for Iter<'_, S, K> {
    type Item = Result<K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(key)) => Some(Ok(key)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: Store, K: Key> std::iter::FusedIterator for Iter<'_, S, K> {}

impl<S: Store, K: Key> RevIter<'_, S, K> {
    fn descend(&mut self, id: NodeId) -> Result<()> {
        let node = self.tree.read_node(id)?;
        let at = match self.seek.map(|key| node.search(key)) {
            // Keys above the match are out of range, so its subtree is skipped.
            Some(Search::Found(i)) => {
                self.seek = None;
                self.pending = None;
                i + 1
            }
            Some(Search::Below(below)) => {
                self.pending = node.child_below(below);
                if self.pending.is_none() {
                    // Positioned at a leaf; later subtrees are walked whole.
                    self.seek = None;
                }
                Search::insert_pos(below)
            }
            None => {
                self.pending = node.child_below(node.len().checked_sub(1));
                node.len()
            }
        };
        self.stack.push(Frame { node, at });
        Ok(())
    }

    fn step(&mut self) -> Result<Option<K>> {
        loop {
            if let Some(id) = self.pending.take() {
                self.descend(id)?;
                continue;
            }

            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };
            if frame.at > 0 {
                frame.at -= 1;
                self.pending = frame.node.child_below(frame.at.checked_sub(1));
                return K::read_from(frame.node.key(frame.at)).map(Some);
            }
            self.stack.pop();
        }
    }
}

impl<S: Store, K: Key> Iterator for RevIter<'_, S, K> {
    type Item = Result<K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(key)) => Some(Ok(key)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: Store, K: Key> std::iter::FusedIterator for RevIter<'_, S, K> {}
