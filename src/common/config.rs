//! Format constants for diskbtree files.

/// Length of the caller-chosen file magic in bytes.
pub const MAGIC_LEN: usize = 16;

/// Size of the file header at offset 0.
///
/// # Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       16    magic
/// 16      4     key_size (u32)
/// 20      4     capacity (u32)
/// 24      8     root (i64, -1 = empty tree)
/// 32      8     empty_nodes (i64, -1 = no free-list record)
/// 40      4     crc32 of bytes 0..40
/// ```
pub const HEADER_SIZE: usize = 44;

/// On-disk sentinel for "no node".
pub const NIL_OFFSET: i64 = -1;

/// Size of a node's `least` pointer plus its `count` field.
pub const NODE_HEADER_SIZE: usize = 8;

/// Size of a child pointer stored in front of every key slot.
pub const CHILD_PTR_SIZE: usize = 4;

/// Size of one offset entry in the persisted free list.
pub const FREE_ENTRY_SIZE: usize = 8;

/// Size of the `count` prefix of the persisted free list.
pub const FREE_COUNT_SIZE: usize = 4;

/// Smallest number of slots reserved when a free-list record is relocated.
pub const FREE_LIST_MIN_SLOTS: usize = 8;

/// A reasonable node capacity when the caller has no better idea.
pub const DEFAULT_CAPACITY: u32 = 64;

/// Record length of a node holding up to `capacity` keys of `key_size` bytes.
#[inline]
pub const fn node_record_len(key_size: usize, capacity: usize) -> usize {
    NODE_HEADER_SIZE + capacity * (key_size + CHILD_PTR_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields_fit() {
        assert_eq!(HEADER_SIZE, MAGIC_LEN + 4 + 4 + 8 + 8 + 4);
    }

    #[test]
    fn test_node_record_len() {
        assert_eq!(node_record_len(8, 2), 8 + 2 * 12);
        assert_eq!(node_record_len(4, 0), NODE_HEADER_SIZE);
    }

    #[test]
    fn test_default_capacity_is_even() {
        assert_eq!(DEFAULT_CAPACITY % 2, 0);
    }
}
