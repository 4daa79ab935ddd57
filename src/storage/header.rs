//! File header stored at offset 0 of every tree file.
//!
//! The [`FileHeader`] carries:
//! - the caller's 16-byte magic and the fixed key size (immutable)
//! - the node capacity (immutable)
//! - the root node offset and the free-list record offset (mutable)
//! - a CRC32 over the fields above

use crate::common::config::{HEADER_SIZE, MAGIC_LEN};
use crate::common::{Error, NodeId, Result};

/// Metadata persisted at the beginning of the store.
///
/// # Layout (44 bytes, little-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       16    magic
/// 16      4     key_size
/// 20      4     capacity
/// 24      8     root (-1 = empty tree)
/// 32      8     empty_nodes (-1 = no free-list record)
/// 40      4     crc32 of bytes 0..40
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Caller-chosen file tag.
    pub magic: [u8; MAGIC_LEN],
    /// Size of every key in bytes.
    pub key_size: u32,
    /// Maximum keys per node.
    pub capacity: u32,
    /// Current root node.
    pub root: Option<NodeId>,
    /// Offset of the persisted free-list record.
    pub empty_nodes: Option<NodeId>,
}

impl FileHeader {
    /// Offset of each field within the header.
    pub const OFFSET_MAGIC: usize = 0;
    pub const OFFSET_KEY_SIZE: usize = 16;
    pub const OFFSET_CAPACITY: usize = 20;
    pub const OFFSET_ROOT: usize = 24;
    pub const OFFSET_EMPTY_NODES: usize = 32;
    pub const OFFSET_CHECKSUM: usize = 40;

    /// Header of a freshly created, empty tree.
    pub fn new(magic: [u8; MAGIC_LEN], key_size: u32, capacity: u32) -> Self {
        Self {
            magic,
            key_size,
            capacity,
            root: None,
            empty_nodes: None,
        }
    }

    /// Encode the header, checksum included.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut data = [0u8; HEADER_SIZE];

        data[Self::OFFSET_MAGIC..Self::OFFSET_KEY_SIZE].copy_from_slice(&self.magic);
        data[Self::OFFSET_KEY_SIZE..Self::OFFSET_CAPACITY]
            .copy_from_slice(&self.key_size.to_le_bytes());
        data[Self::OFFSET_CAPACITY..Self::OFFSET_ROOT]
            .copy_from_slice(&self.capacity.to_le_bytes());
        data[Self::OFFSET_ROOT..Self::OFFSET_EMPTY_NODES]
            .copy_from_slice(&NodeId::to_i64(self.root).to_le_bytes());
        data[Self::OFFSET_EMPTY_NODES..Self::OFFSET_CHECKSUM]
            .copy_from_slice(&NodeId::to_i64(self.empty_nodes).to_le_bytes());

        let checksum = Self::compute_checksum(&data);
        data[Self::OFFSET_CHECKSUM..].copy_from_slice(&checksum.to_le_bytes());
        data
    }

    /// Decode and validate a header.
    ///
    /// # Errors
    /// Returns `Error::CorruptHeader` if the checksum does not match, the
    /// capacity is zero or odd, or an offset field holds a negative value
    /// other than `-1`.
    pub fn from_bytes(data: &[u8; HEADER_SIZE]) -> Result<Self> {
        let stored = u32::from_le_bytes(read_array(data, Self::OFFSET_CHECKSUM));
        let computed = Self::compute_checksum(data);
        if stored != computed {
            return Err(Error::CorruptHeader(format!(
                "checksum {stored:#010x} does not match {computed:#010x}"
            )));
        }

        let magic: [u8; MAGIC_LEN] = read_array(data, Self::OFFSET_MAGIC);
        let key_size = u32::from_le_bytes(read_array(data, Self::OFFSET_KEY_SIZE));
        let capacity = u32::from_le_bytes(read_array(data, Self::OFFSET_CAPACITY));
        let root = i64::from_le_bytes(read_array(data, Self::OFFSET_ROOT));
        let empty_nodes = i64::from_le_bytes(read_array(data, Self::OFFSET_EMPTY_NODES));

        if capacity == 0 || capacity % 2 == 1 {
            return Err(Error::CorruptHeader(format!("invalid capacity {capacity}")));
        }
        if root < -1 || empty_nodes < -1 {
            return Err(Error::CorruptHeader(format!(
                "invalid offsets root={root} empty_nodes={empty_nodes}"
            )));
        }

        Ok(Self {
            magic,
            key_size,
            capacity,
            root: NodeId::from_i64(root),
            empty_nodes: NodeId::from_i64(empty_nodes),
        })
    }

    /// Compute the CRC32 of the header fields (everything before the checksum).
    pub fn compute_checksum(data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&data[..Self::OFFSET_CHECKSUM]);
        hasher.finalize()
    }
}

fn read_array<const N: usize>(data: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[at..at + N]);
    out
}

// ============================================================================
// TESTS
// ============================================================================
