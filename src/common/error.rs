//! Error types for diskbtree.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the tree and its stores.
///
/// Configuration errors (`OddCapacity`, `ZeroCapacity`, `MagicMismatch`,
/// `KeySizeMismatch`) are detected eagerly and never corrected. Capability
/// errors (`NoReader`, `NoWriter`) mean the store lacks the access mode an
/// operation needs. I/O errors are passed through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying byte store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store cannot be read.
    #[error("store is not readable")]
    NoReader,

    /// The store cannot be written, but the operation modifies the tree.
    #[error("store is not writable")]
    NoWriter,

    /// Node capacity must be even so a split divides it evenly.
    #[error("capacity must be even, got {0}")]
    OddCapacity(u32),

    /// A node must hold at least one key pair.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    /// The magic stored in the file differs from the one requested.
    #[error("magic mismatch")]
    MagicMismatch,

    /// The key's declared size differs from the store's key size.
    #[error("key size mismatch: store uses {expected} bytes, key has {actual}")]
    KeySizeMismatch { expected: usize, actual: usize },

    /// The header record failed validation.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// A node record failed validation.
    #[error("corrupt node at offset {offset}: {reason}")]
    CorruptNode { offset: u64, reason: String },

    /// A node offset does not fit in the 32-bit on-disk pointer.
    #[error("offset {0} does not fit in a node pointer")]
    OffsetOverflow(u64),

    /// A key could not be encoded or decoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl Error {
    pub(crate) fn corrupt_node(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptNode {
            offset,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::OddCapacity(3);
        assert_eq!(format!("{}", err), "capacity must be even, got 3");

        let err = Error::KeySizeMismatch {
            expected: 8,
            actual: 4,
        };
        assert_eq!(
            format!("{}", err),
            "key size mismatch: store uses 8 bytes, key has 4"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err = Error::from(io_err);
        assert!(err.source().is_some());
        assert!(Error::NoWriter.source().is_none());
    }

    #[test]
    fn test_corrupt_node_helper() {
        let err = Error::corrupt_node(44, "count 9 exceeds capacity 8");
        assert_eq!(
            format!("{}", err),
            "corrupt node at offset 44: count 9 exceeds capacity 8"
        );
    }
}
