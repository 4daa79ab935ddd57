//! Node identifier type.

use std::fmt;

use crate::common::config::NIL_OFFSET;
use crate::common::{Error, Result};

/// Identifies a node by its byte offset in the store.
///
/// Offsets are the node's identity: there is no indirection table, so a
/// freed offset can host any future node (all records share one length).
///
/// On disk a missing node is written as `-1`; in memory it is `None`.
/// Child pointers inside node records are 32 bits wide, so offsets above
/// `i32::MAX` cannot be referenced from a node.
///
/// # Example
/// ```
/// use diskbtree::NodeId;
///
/// let id = NodeId::new(44);
/// assert_eq!(id.offset(), 44);
/// assert_eq!(NodeId::from_i64(-1), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId.
    #[inline]
    pub fn new(offset: u64) -> Self {
        NodeId(offset)
    }

    /// Byte offset of the node record.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.0
    }

    /// Decode a 64-bit header field; any negative value means "none".
    #[inline]
    pub fn from_i64(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().map(NodeId)
    }

    /// Encode an optional node as a 64-bit header field.
    #[inline]
    pub fn to_i64(id: Option<Self>) -> i64 {
        match id {
            Some(id) => id.0 as i64,
            None => NIL_OFFSET,
        }
    }

    /// Decode a 32-bit child pointer (sign-extended, negative means "none").
    #[inline]
    pub fn from_ptr(raw: i32) -> Option<Self> {
        Self::from_i64(i64::from(raw))
    }

    /// Encode an optional node as a 32-bit child pointer.
    ///
    /// # Errors
    /// Returns `Error::OffsetOverflow` if the offset does not fit.
    pub fn to_ptr(id: Option<Self>) -> Result<i32> {
        match id {
            Some(id) => i32::try_from(id.0).map_err(|_| Error::OffsetOverflow(id.0)),
            None => Ok(NIL_OFFSET as i32),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node(@{})", self.0)
    }
}
