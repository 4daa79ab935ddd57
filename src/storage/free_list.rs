//! Persisted list of reusable node offsets.

use crate::common::config::{FREE_COUNT_SIZE, FREE_ENTRY_SIZE};
use crate::common::{Error, NodeId, Result};
use crate::storage::store::Store;

/// Where the free-list record lives and how many entries it can hold.
///
/// # Layout (little-endian)
/// ```text
/// ┌────────────┬───────────────┬─────┬───────────────┬──────────────┐
/// │ count: i32 │ offset 0: i64 │ ... │ offset n: i64 │ zero padding │
/// └────────────┴───────────────┴─────┴───────────────┴──────────────┘
///               ◀───────────── slots × 8 bytes ──────────────────▶
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRegion {
    /// Offset of the record.
    pub at: NodeId,
    /// Number of offsets the record can hold without moving.
    pub slots: usize,
}

impl FreeRegion {
    /// Total bytes reserved for the record.
    #[inline]
    pub fn byte_len(&self) -> u64 {
        (FREE_COUNT_SIZE + self.slots * FREE_ENTRY_SIZE) as u64
    }

    /// Offset one past the last reserved byte.
    #[inline]
    pub fn end(&self) -> u64 {
        self.at.offset() + self.byte_len()
    }

    /// Slots that fit in `byte_len` bytes.
    pub fn slots_for(byte_len: u64) -> usize {
        (byte_len.saturating_sub(FREE_COUNT_SIZE as u64) / FREE_ENTRY_SIZE as u64) as usize
    }
}

/// Encode `offsets` into a record padded to `slots` entries.
pub fn encode(offsets: &[NodeId], slots: usize) -> Vec<u8> {
    debug_assert!(offsets.len() <= slots);
    let mut buf = vec![0u8; FREE_COUNT_SIZE + slots * FREE_ENTRY_SIZE];

    buf[..FREE_COUNT_SIZE].copy_from_slice(&(offsets.len() as i32).to_le_bytes());
    for (i, id) in offsets.iter().enumerate() {
        let at = FREE_COUNT_SIZE + i * FREE_ENTRY_SIZE;
        buf[at..at + FREE_ENTRY_SIZE].copy_from_slice(&(id.offset() as i64).to_le_bytes());
    }
    buf
}

/// Read the free-list record at `at`.
///
/// The returned region only claims as many slots as there are entries;
/// any padding written earlier is not trusted.
///
/// # Errors
/// Returns `Error::CorruptHeader` if the count or an entry is negative, or
/// the count claims more entries than the store holds.
pub fn load<S: Store>(store: &mut S, at: NodeId) -> Result<(Vec<NodeId>, FreeRegion)> {
    let mut count_buf = [0u8; FREE_COUNT_SIZE];
    store.read_at(at.offset(), &mut count_buf)?;
    let count = i32::from_le_bytes(count_buf);
    let count = usize::try_from(count)
        .map_err(|_| Error::CorruptHeader(format!("free list at {at} has count {count}")))?;

    // The record is not covered by the header checksum.
    let stored = store
        .end()?
        .saturating_sub(at.offset() + FREE_COUNT_SIZE as u64)
        / FREE_ENTRY_SIZE as u64;
    if count as u64 > stored {
        return Err(Error::CorruptHeader(format!(
            "free list at {at} claims {count} entries, store holds at most {stored}"
        )));
    }

    let mut entries = vec![0u8; count * FREE_ENTRY_SIZE];
    store.read_at(at.offset() + FREE_COUNT_SIZE as u64, &mut entries)?;

    let offsets = entries
        .chunks_exact(FREE_ENTRY_SIZE)
        .map(|chunk| {
            let mut raw = [0u8; FREE_ENTRY_SIZE];
            raw.copy_from_slice(chunk);
            let raw = i64::from_le_bytes(raw);
            NodeId::from_i64(raw).ok_or_else(|| {
                Error::CorruptHeader(format!("free list at {at} holds offset {raw}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((offsets, FreeRegion { at, slots: count }))
}
