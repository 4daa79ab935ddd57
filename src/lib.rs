//! diskbtree - An embedded, disk-resident B-tree over fixed-size keys.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           diskbtree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   BTree: find / insert / update / delete / iterators    │   │
//! │  │   SharedBTree: one critical section per call            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Node codec (index/btree/node)               │   │
//! │  │      least | count | (child, key) × capacity             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │   FileHeader + Allocator (root, free-node list)          │   │
//! │  │   Store: FileStore | IoStore | ReadOnly/WriteOnlyStore   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every node is a fixed-length record at a fixed byte offset. Changes are
//! written through to the store as they happen; there is no cache and no
//! log, so a failure in the middle of a split or a delete can leave the
//! store inconsistent.
//!
//! # Modules
//! - [`common`] - Shared primitives (NodeId, Error, format constants)
//! - [`storage`] - Byte stores, the file header and node allocation
//! - [`index`] - The B-tree engine
//!
//! # Quick Start
//! ```no_run
//! use diskbtree::{BTree, FileStore};
//!
//! let magic = *b"my-index-v1\0\0\0\0\0";
//! let store = FileStore::create("my_index.bt").unwrap();
//! let mut tree = BTree::create(store, magic, &0u64, 64).unwrap();
//!
//! tree.insert(&42).unwrap();
//! assert_eq!(tree.find(&42).unwrap(), Some(42));
//!
//! // Later, from another process
//! let store = FileStore::open("my_index.bt").unwrap();
//! let mut tree = BTree::open(store, magic, &0u64).unwrap();
//! for key in tree.iter_from(Some(&40)).unwrap() {
//!     println!("{}", key.unwrap());
//! }
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DEFAULT_CAPACITY, HEADER_SIZE, MAGIC_LEN};
pub use common::{Error, NodeId, Result};

pub use index::btree::{BTree, Iter, Key, RevIter, SharedBTree, StatsSnapshot, TreeStats};
pub use storage::{Durability, FileStore, IoStore, MemStore, ReadOnlyStore, Store, WriteOnlyStore};
