//! Storage layer - byte stores, the file header and node-slot allocation.
//!
//! This module handles persistent storage:
//! - [`Store`] - The seek/read/write boundary, plus `std::io` adapters
//! - [`FileStore`] - A store backed by one file
//! - [`FileHeader`] - The header record at offset 0
//! - [`Allocator`] - Root tracking and free-node reuse

mod allocator;
mod file_store;
pub mod free_list;
mod header;
mod store;

pub use allocator::{Allocator, Placement};
pub use file_store::{Durability, FileStore};
pub use free_list::FreeRegion;
pub use header::FileHeader;
pub use store::{Access, IoStore, ReadOnlyStore, Store, WriteOnlyStore};

#[cfg(test)]
pub(crate) use store::testing::FarEndStore;

/// In-memory store, handy for tests and scratch trees.
pub type MemStore = IoStore<std::io::Cursor<Vec<u8>>>;
