//! B-tree index over fixed-size keys.
//!
//! - [`BTree`] - The engine: bootstrap, find, insert, update, delete
//! - [`Key`] - What a key type must provide
//! - [`Iter`] / [`RevIter`] - Ascending and descending traversal
//! - [`SharedBTree`] - A mutex-guarded handle for use across threads
//! - [`TreeStats`] - Operation counters

mod delete;
mod insert;
mod iter;
mod key;
mod node;
mod shared;
mod stats;
mod tree;

pub use iter::{Iter, RevIter};
pub use key::Key;
pub use node::{Entry, Node, NodeLayout, Search};
pub use shared::SharedBTree;
pub use stats::{StatsSnapshot, TreeStats};
pub use tree::BTree;
