//! A thread-safe handle around a [`BTree`].

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::common::Result;
use crate::index::btree::key::Key;
use crate::index::btree::tree::BTree;
use crate::storage::Store;

/// A cloneable handle that serializes every call on one tree.
///
/// A split or a delete rewrites several records plus the header, and an
/// iterator must not see the tree change under it. Each method therefore
/// runs as a single critical section. Range reads collect their keys while
/// holding the lock instead of handing out a live iterator.
///
/// # Example
/// ```
/// use diskbtree::{BTree, MemStore, SharedBTree};
/// use std::thread;
///
/// let tree = BTree::create(MemStore::in_memory(), [0; 16], &0u64, 4).unwrap();
/// let shared = SharedBTree::new(tree);
///
/// let handles: Vec<_> = (0..4u64)
///     .map(|t| {
///         let shared = shared.clone();
///         thread::spawn(move || {
///             for k in 0..25 {
///                 shared.insert(&(t * 100 + k)).unwrap();
///             }
///         })
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(shared.collect_from(None, usize::MAX).unwrap().len(), 100);
/// ```
pub struct SharedBTree<S, K> {
    inner: Arc<Mutex<BTree<S, K>>>,
}

impl<S, K> Clone for SharedBTree<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store, K: Key> SharedBTree<S, K> {
    pub fn new(tree: BTree<S, K>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tree)),
        }
    }

    /// Lock the tree for a sequence of calls, such as a live iterator.
    pub fn lock(&self) -> MutexGuard<'_, BTree<S, K>> {
        self.inner.lock()
    }

    pub fn find(&self, key: &K) -> Result<Option<K>> {
        self.inner.lock().find(key)
    }

    pub fn insert(&self, key: &K) -> Result<Option<K>> {
        self.inner.lock().insert(key)
    }

    pub fn update(&self, key: &K) -> Result<Option<K>> {
        self.inner.lock().update(key)
    }

    pub fn delete(&self, key: &K) -> Result<Option<K>> {
        self.inner.lock().delete(key)
    }

    /// Up to `limit` keys in ascending order, starting at the first key
    /// `>= start` (or the smallest key).
    pub fn collect_from(&self, start: Option<&K>, limit: usize) -> Result<Vec<K>> {
        let mut tree = self.inner.lock();
        let iter = tree.iter_from(start)?;
        iter.take(limit).collect()
    }

    /// Up to `limit` keys in descending order, starting at the last key
    /// `<= start` (or the largest key).
    pub fn collect_rev_from(&self, start: Option<&K>, limit: usize) -> Result<Vec<K>> {
        let mut tree = self.inner.lock();
        let iter = tree.rev_iter_from(start)?;
        iter.take(limit).collect()
    }

    /// Unwrap the tree if this is the last handle.
    pub fn into_inner(self) -> Option<BTree<S, K>> {
        Arc::into_inner(self.inner).map(Mutex::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::MAGIC_LEN;
    use crate::storage::MemStore;
    use std::thread;

    const MAGIC: [u8; MAGIC_LEN] = *b"SharedTests\0\0\0\0\0";

    fn shared() -> SharedBTree<MemStore, u32> {
        SharedBTree::new(BTree::create(MemStore::in_memory(), MAGIC, &0u32, 4).unwrap())
    }

    #[test]
    fn test_basic_calls() {
        let tree = shared();
        assert_eq!(tree.insert(&5).unwrap(), None);
        assert_eq!(tree.insert(&5).unwrap(), Some(5));
        assert_eq!(tree.find(&5).unwrap(), Some(5));
        assert_eq!(tree.update(&5).unwrap(), Some(5));
        assert_eq!(tree.delete(&5).unwrap(), Some(5));
        assert_eq!(tree.find(&5).unwrap(), None);
    }

    #[test]
    fn test_collect_ranges() {
        let tree = shared();
        for k in 0..20 {
            tree.insert(&k).unwrap();
        }
        assert_eq!(tree.collect_from(Some(&15), 3).unwrap(), vec![15, 16, 17]);
        assert_eq!(tree.collect_rev_from(Some(&2), 10).unwrap(), vec![2, 1, 0]);
        assert_eq!(tree.collect_from(None, usize::MAX).unwrap().len(), 20);
    }

    #[test]
    fn test_concurrent_inserts_and_deletes() {
        let tree = shared();
        let mut handles = vec![];

        for t in 0..8u32 {
            let tree = tree.clone();
            handles.push(thread::spawn(move || {
                for k in 0..50 {
                    tree.insert(&(t * 1000 + k)).unwrap();
                }
                for k in (0..50).step_by(2) {
                    assert_eq!(tree.delete(&(t * 1000 + k)).unwrap(), Some(t * 1000 + k));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let keys = tree.collect_from(None, usize::MAX).unwrap();
        assert_eq!(keys.len(), 8 * 25);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(keys.iter().all(|k| k % 2 == 1));
    }

    #[test]
    fn test_into_inner_needs_last_handle() {
        let tree = shared();
        let other = tree.clone();
        assert!(other.into_inner().is_none());
        assert!(tree.into_inner().is_some());
    }
}
