//! The B-tree handle: bootstrap, lookup and in-place update.
//!
//! Insertion lives in `insert.rs`, deletion in `delete.rs` and traversal in
//! `iter.rs`; they all extend [`BTree`].

use std::marker::PhantomData;

use tracing::debug;

use crate::common::config::MAGIC_LEN;
use crate::common::{Error, NodeId, Result};
use crate::index::btree::key::Key;
use crate::index::btree::node::{Node, NodeLayout, Search};
use crate::index::btree::stats::TreeStats;
use crate::storage::{Allocator, FileHeader, Store};

/// A B-tree of fixed-size keys stored in a byte store.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │                      BTree<S, K>                         │
/// │  find / insert / update / delete / iter / rev_iter       │
/// │        │                         │                       │
/// │  ┌─────▼──────┐           ┌──────▼──────┐                │
/// │  │ NodeLayout │           │  Allocator  │ header + free  │
/// │  │ node codec │           │             │ node list      │
/// │  └─────┬──────┘           └──────┬──────┘                │
/// │        └────────────┬────────────┘                       │
/// │               ┌─────▼─────┐                              │
/// │               │  Store S  │ read_at / write_at / end     │
/// │               └───────────┘                              │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// Every node is read from the store when visited and written back as
/// soon as it changes; nothing is cached between calls.
///
/// # Concurrency
/// A `BTree` is single-threaded. A split or a successor replacement
/// rewrites several records and the header without atomicity, so one
/// `insert`/`update`/`delete` must never overlap another. Use
/// [`SharedBTree`](crate::SharedBTree) to share a tree between threads.
///
/// # Example
/// ```
/// use diskbtree::{BTree, MemStore};
///
/// let magic = *b"example-tree\0\0\0\0";
/// let mut tree = BTree::create(MemStore::in_memory(), magic, &0u64, 4).unwrap();
///
/// for k in [5u64, 3, 8, 1] {
///     assert_eq!(tree.insert(&k).unwrap(), None);
/// }
/// assert_eq!(tree.find(&3).unwrap(), Some(3));
///
/// let keys: Vec<u64> = tree.iter().collect::<Result<_, _>>().unwrap();
/// assert_eq!(keys, vec![1, 3, 5, 8]);
/// ```
pub struct BTree<S, K> {
    pub(super) store: S,
    pub(super) alloc: Allocator,
    pub(super) layout: NodeLayout,
    pub(super) stats: TreeStats,
    _key: PhantomData<fn() -> K>,
}

impl<S: Store, K: Key> BTree<S, K> {
    /// Write a fresh header to `store` and return an empty tree.
    ///
    /// `sample` fixes the key size; `capacity` is the maximum number of keys
    /// per node and must be even.
    ///
    /// # Errors
    /// - `Error::NoWriter` if the store cannot be written
    /// - `Error::OddCapacity` / `Error::ZeroCapacity` for a bad capacity
    pub fn create(mut store: S, magic: [u8; MAGIC_LEN], sample: &K, capacity: u32) -> Result<Self> {
        if !store.access().can_write() {
            return Err(Error::NoWriter);
        }
        if capacity % 2 == 1 {
            return Err(Error::OddCapacity(capacity));
        }
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        let key_size = u32::try_from(sample.size())
            .map_err(|_| Error::InvalidKey(format!("key size {} is too large", sample.size())))?;

        let layout = NodeLayout::new(sample.size(), capacity as usize);
        let header = FileHeader::new(magic, key_size, capacity);
        let alloc = Allocator::create(&mut store, header, layout.record_len())?;
        store.sync()?;

        debug!(key_size, capacity, node_len = layout.record_len(), "created tree");
        Ok(Self::assemble(store, alloc, layout))
    }

    /// Open a tree previously written with [`BTree::create`].
    ///
    /// Opening a read-only store is allowed; modifying calls then fail with
    /// `Error::NoWriter`.
    ///
    /// # Errors
    /// - `Error::NoReader` if the store cannot be read
    /// - `Error::MagicMismatch` if the stored magic differs from `magic`
    /// - `Error::KeySizeMismatch` if `sample` has a different size
    /// - `Error::CorruptHeader` if the header fails validation
    pub fn open(mut store: S, magic: [u8; MAGIC_LEN], sample: &K) -> Result<Self> {
        if !store.access().can_read() {
            return Err(Error::NoReader);
        }

        let (header, free, region) = Allocator::open(&mut store)?;
        if header.magic != magic {
            return Err(Error::MagicMismatch);
        }
        if header.key_size as usize != sample.size() {
            return Err(Error::KeySizeMismatch {
                expected: header.key_size as usize,
                actual: sample.size(),
            });
        }

        let layout = NodeLayout::new(header.key_size as usize, header.capacity as usize);
        debug!(
            root = NodeId::to_i64(header.root),
            free_nodes = free.len(),
            capacity = header.capacity,
            "opened tree"
        );
        let alloc = Allocator::from_parts(header, free, region, layout.record_len());
        Ok(Self::assemble(store, alloc, layout))
    }

    fn assemble(store: S, alloc: Allocator, layout: NodeLayout) -> Self {
        Self {
            store,
            alloc,
            layout,
            stats: TreeStats::new(),
            _key: PhantomData,
        }
    }

    // ========================================================================
    // Public API: Lookup and update
    // ========================================================================

    /// Look up a key.
    ///
    /// Returns the stored key (which may carry payload bytes that differ
    /// from `key`) or `None`.
    pub fn find(&mut self, key: &K) -> Result<Option<K>> {
        self.check_key(key)?;
        match self.locate(key)? {
            Some((node, i)) => Ok(Some(K::read_from(node.key(i))?)),
            None => Ok(None),
        }
    }

    /// Overwrite the stored bytes of an existing key.
    ///
    /// The key keeps its slot and child pointer, so `key` must compare equal
    /// to the stored key. Returns the previous value, or `None` if absent.
    ///
    /// # Errors
    /// - `Error::NoWriter` if the store cannot be written
    /// - `Error::KeySizeMismatch` if the key has the wrong size
    pub fn update(&mut self, key: &K) -> Result<Option<K>> {
        self.require_writer()?;
        self.check_key(key)?;

        let Some((mut node, i)) = self.locate(key)? else {
            return Ok(None);
        };
        let previous = K::read_from(node.key(i))?;
        key.write_to(&mut node.entries[i].key)?;
        self.write_node(&mut node)?;
        Ok(Some(previous))
    }

    // ========================================================================
    // Public API: Accessors
    // ========================================================================

    /// Size of every key in bytes.
    #[inline]
    pub fn key_size(&self) -> usize {
        self.layout.key_size()
    }

    /// Maximum number of keys per node.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    /// The file magic.
    #[inline]
    pub fn magic(&self) -> [u8; MAGIC_LEN] {
        self.alloc.header().magic
    }

    /// Current root node, `None` for an empty tree.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.alloc.root()
    }

    /// Whether the tree holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root().is_none()
    }

    /// Length of one node record in bytes.
    #[inline]
    pub fn node_len(&self) -> usize {
        self.layout.record_len()
    }

    /// Number of node slots waiting to be reused.
    #[inline]
    pub fn free_nodes(&self) -> usize {
        self.alloc.free_count()
    }

    /// Operation counters.
    #[inline]
    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    /// Borrow the underlying store.
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Flush the store.
    pub fn sync(&mut self) -> Result<()> {
        self.store.sync()
    }

    /// Give back the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    // ========================================================================
    // Internal: Node I/O
    // ========================================================================

    pub(super) fn check_key(&self, key: &K) -> Result<()> {
        if key.size() != self.layout.key_size() {
            return Err(Error::KeySizeMismatch {
                expected: self.layout.key_size(),
                actual: key.size(),
            });
        }
        Ok(())
    }

    pub(super) fn require_writer(&self) -> Result<()> {
        if !self.store.access().can_write() {
            return Err(Error::NoWriter);
        }
        Ok(())
    }

    /// Encode `key` into a fresh slot buffer.
    pub(super) fn encode_key(&self, key: &K) -> Result<Vec<u8>> {
        let mut raw = vec![0u8; self.layout.key_size()];
        key.write_to(&mut raw)?;
        Ok(raw)
    }

    pub(super) fn read_node(&mut self, id: NodeId) -> Result<Node> {
        let mut buf = vec![0u8; self.layout.record_len()];
        self.store.read_at(id.offset(), &mut buf)?;
        TreeStats::bump(&self.stats.nodes_read);
        self.layout.decode(id, &buf)
    }

    /// Write `node` back to its offset, allocating one first if it has none.
    pub(super) fn write_node(&mut self, node: &mut Node) -> Result<NodeId> {
        let id = match node.id {
            Some(id) => id,
            None => {
                let placement = self.alloc.allocate(&mut self.store)?;
                TreeStats::bump(&self.stats.nodes_allocated);
                if placement.is_reuse() {
                    TreeStats::bump(&self.stats.nodes_reused);
                }
                node.id = Some(placement.id());
                placement.id()
            }
        };

        let buf = self.layout.encode(node)?;
        self.store.write_at(id.offset(), &buf)?;
        TreeStats::bump(&self.stats.nodes_written);
        Ok(id)
    }

    /// Descend from the root to the node holding `key`.
    pub(super) fn locate(&mut self, key: &K) -> Result<Option<(Node, usize)>> {
        let mut at = self.root();
        while let Some(id) = at {
            let node = self.read_node(id)?;
            at = match node.search(key) {
                Search::Found(i) => return Ok(Some((node, i))),
                Search::Below(below) => node.child_below(below),
            };
        }
        Ok(None)
    }
}

// ============================================================================
// TESTS
// ============================================================================
