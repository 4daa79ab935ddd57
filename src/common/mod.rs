//! Common types shared across diskbtree.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Format constants
//! - Error types
//! - Node identifiers (byte offsets)

pub mod config;
pub mod error;
mod node_id;

pub use error::{Error, Result};
pub use node_id::NodeId;
