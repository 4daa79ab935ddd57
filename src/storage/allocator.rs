//! Header bootstrap and node-slot allocation.
//!
//! The [`Allocator`] owns the in-memory copy of the [`FileHeader`] and the
//! list of reusable node offsets, and is the only writer of both.

use tracing::trace;

use crate::common::config::{FREE_LIST_MIN_SLOTS, HEADER_SIZE};
use crate::common::{NodeId, Result};
use crate::storage::free_list::{self, FreeRegion};
use crate::storage::header::FileHeader;
use crate::storage::store::Store;

/// Where a newly allocated node slot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Popped from the free list.
    Recycled(NodeId),
    /// Carved out of a drained free-list record.
    FreeRegion(NodeId),
    /// Appended at the end of the store.
    Appended(NodeId),
}

impl Placement {
    /// The allocated offset.
    #[inline]
    pub fn id(self) -> NodeId {
        match self {
            Placement::Recycled(id) | Placement::FreeRegion(id) | Placement::Appended(id) => id,
        }
    }

    /// Whether the slot reused space already inside the store.
    #[inline]
    pub fn is_reuse(self) -> bool {
        !matches!(self, Placement::Appended(_))
    }
}

/// Tracks the root and the free node slots of one store.
///
/// # Persistence order
/// Whenever the free list changes, the free-list record is written first
/// and the header second, so a header on disk never points at a record
/// that has not been written yet.
#[derive(Debug)]
pub struct Allocator {
    header: FileHeader,
    /// Free node offsets, most recently freed last.
    free: Vec<NodeId>,
    /// Current home of the persisted free list, if any.
    region: Option<FreeRegion>,
    /// Slots added by [`Allocator::reserve`] and not yet handed out, with
    /// where they originally came from.
    reserved: Vec<Placement>,
    /// Length of one node record.
    node_len: u64,
}

impl Allocator {
    /// Write a fresh header and start with no free slots.
    pub fn create<S: Store>(store: &mut S, header: FileHeader, node_len: usize) -> Result<Self> {
        let mut alloc = Self {
            header,
            free: Vec::new(),
            region: None,
            reserved: Vec::new(),
            node_len: node_len as u64,
        };
        alloc.write_header(store)?;
        Ok(alloc)
    }

    /// Read and validate the header and load the persisted free list.
    ///
    /// `node_len` is derived from the header by the caller.
    pub fn open<S: Store>(store: &mut S) -> Result<(FileHeader, Vec<NodeId>, Option<FreeRegion>)> {
        let mut raw = [0u8; HEADER_SIZE];
        store.read_at(0, &mut raw)?;
        let header = FileHeader::from_bytes(&raw)?;

        let (free, region) = match header.empty_nodes {
            Some(at) => {
                let (free, region) = free_list::load(store, at)?;
                (free, Some(region))
            }
            None => (Vec::new(), None),
        };
        Ok((header, free, region))
    }

    /// Assemble an allocator from the pieces returned by [`Allocator::open`].
    pub fn from_parts(
        header: FileHeader,
        free: Vec<NodeId>,
        region: Option<FreeRegion>,
        node_len: usize,
    ) -> Self {
        Self {
            header,
            free,
            region,
            reserved: Vec::new(),
            node_len: node_len as u64,
        }
    }

    /// The in-memory header.
    #[inline]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Current root node.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.header.root
    }

    /// Number of reusable node slots.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Point the header at a new root and persist it.
    pub fn set_root<S: Store>(&mut self, store: &mut S, root: Option<NodeId>) -> Result<()> {
        self.header.root = root;
        self.write_header(store)
    }

    /// Choose a storage offset for a new node.
    ///
    /// Priority: the free list, then the drained free-list record itself,
    /// then the end of the store. The caller must write the node before
    /// allocating again. A slot set aside by [`Allocator::reserve`] reports
    /// the placement it was reserved with.
    ///
    /// # Errors
    /// Returns `Error::OffsetOverflow`, with nothing changed, if the chosen
    /// offset does not fit a child pointer.
    pub fn allocate<S: Store>(&mut self, store: &mut S) -> Result<Placement> {
        if let Some(&id) = self.free.last() {
            pointable(id)?;
            self.free.pop();
            self.persist(store)?;
            trace!(target: "diskbtree::alloc", node = id.offset(), "reused free node");
            return Ok(match self.reserved.iter().position(|p| p.id() == id) {
                Some(at) => self.reserved.swap_remove(at),
                None => Placement::Recycled(id),
            });
        }
        self.allocate_fresh(store)
    }

    /// Return a node slot to the free list and persist the list.
    pub fn release<S: Store>(&mut self, store: &mut S, id: NodeId) -> Result<()> {
        trace!(target: "diskbtree::alloc", node = id.offset(), "freed node");
        self.free.push(id);
        self.persist(store)
    }

    /// Make sure at least `count` free slots exist.
    ///
    /// Missing slots are allocated outside the free list, filled with
    /// `blank`, and added to it. If an offset overflows part way, the slots
    /// already written still join the free list before the error returns.
    pub fn reserve<S: Store>(&mut self, store: &mut S, count: usize, blank: &[u8]) -> Result<()> {
        if self.free.len() >= count {
            return Ok(());
        }

        let missing = count - self.free.len();
        let mut reserved = Vec::with_capacity(missing);
        let mut failure = None;
        for _ in 0..missing {
            match self.allocate_fresh(store) {
                Ok(placement) => {
                    store.write_at(placement.id().offset(), blank)?;
                    reserved.push(placement);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        trace!(target: "diskbtree::alloc", count = reserved.len(), "reserved node slots");

        // Keep the lowest offsets on top so they are used first.
        reserved.reverse();
        self.free.extend(reserved.iter().map(|p| p.id()));
        self.reserved.extend(reserved);
        self.persist(store)?;
        failure.map_or(Ok(()), Err)
    }

    /// Write the free-list record (if any) and then the header.
    pub fn persist<S: Store>(&mut self, store: &mut S) -> Result<()> {
        if !self.free.is_empty() || self.region.is_some() {
            self.write_free_list(store)?;
        }
        self.write_header(store)
    }

    fn allocate_fresh<S: Store>(&mut self, store: &mut S) -> Result<Placement> {
        if let Some(region) = self.region {
            if self.free.is_empty() && region.byte_len() >= self.node_len {
                let id = pointable(region.at)?;
                let remaining = region.byte_len() - self.node_len;
                self.region = if remaining >= self.node_len {
                    Some(FreeRegion {
                        at: NodeId::new(id.offset() + self.node_len),
                        slots: FreeRegion::slots_for(remaining),
                    })
                } else {
                    None
                };
                self.header.empty_nodes = self.region.map(|r| r.at);
                self.persist(store)?;
                trace!(target: "diskbtree::alloc", node = id.offset(), "placed node in free-list record");
                return Ok(Placement::FreeRegion(id));
            }
        }

        let id = pointable(NodeId::new(store.end()?))?;
        Ok(Placement::Appended(id))
    }

    fn write_free_list<S: Store>(&mut self, store: &mut S) -> Result<()> {
        let needed = self.free.len();
        let region = match self.region {
            Some(region) if needed <= region.slots => region,
            Some(region) if region.end() == store.end()? => FreeRegion {
                at: region.at,
                slots: (needed * 2).max(FREE_LIST_MIN_SLOTS),
            },
            old => {
                if let Some(old) = old {
                    if old.byte_len() >= self.node_len {
                        self.free.push(old.at);
                    }
                }
                let at = NodeId::new(store.end()?);
                trace!(target: "diskbtree::alloc", at = at.offset(), "relocated free list");
                FreeRegion {
                    at,
                    slots: (self.free.len() * 2).max(FREE_LIST_MIN_SLOTS),
                }
            }
        };

        store.write_at(region.at.offset(), &free_list::encode(&self.free, region.slots))?;
        self.region = Some(region);
        self.header.empty_nodes = Some(region.at);
        Ok(())
    }

    fn write_header<S: Store>(&mut self, store: &mut S) -> Result<()> {
        store.write_at(0, &self.header.to_bytes())
    }
}

/// Parents store 32-bit pointers, so a node must sit where one can reach it.
fn pointable(id: NodeId) -> Result<NodeId> {
    NodeId::to_ptr(Some(id))?;
    Ok(id)
}
