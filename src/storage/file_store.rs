//! File Store - a [`Store`] backed by a single file on disk.
//!
//! The [`FileStore`] handles all direct file operations:
//! - Creating, opening and read-only opening of the tree file
//! - Positioned reads and writes of header, node and free-list records
//! - Optional `fsync()` after every write

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::common::{Error, Result};
use crate::storage::store::{Access, Store};

/// When written bytes are forced to stable storage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// `fsync()` after every write.
    #[default]
    Fsync,
    /// Leave flushing to the OS page cache.
    OsBuffered,
}

/// Stores a tree in a single file.
///
/// # File Layout
/// ```text
/// ┌────────────┬────────┬────────┬───────────┬────────┬─────┐
/// │ Header     │ Node   │ Node   │ Free list │ Node   │ ... │
/// │ (44 bytes) │        │        │ (record)  │        │     │
/// └────────────┴────────┴────────┴───────────┴────────┴─────┘
/// ```
///
/// Records are addressed by byte offset; there is no page grid.
///
/// # Thread Safety
/// `FileStore` is **single-threaded**. Wrap the tree in a `SharedBTree`
/// to serialize access from several threads.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    access: Access,
    durability: Durability,
}

impl FileStore {
    /// Create a new tree file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        debug!(path = %path.as_ref().display(), "created tree file");
        Ok(Self {
            file,
            access: Access::ReadWrite,
            durability: Durability::default(),
        })
    }

    /// Open an existing tree file for reading and writing.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        Ok(Self {
            file,
            access: Access::ReadWrite,
            durability: Durability::default(),
        })
    }

    /// Open an existing tree file for reading only.
    ///
    /// Any operation that modifies the tree fails with `Error::NoWriter`.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(&path)?;

        Ok(Self {
            file,
            access: Access::ReadOnly,
            durability: Durability::default(),
        })
    }

    /// Open an existing tree file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Set the durability policy.
    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Get the total size of the file in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

impl Store for FileStore {
    fn access(&self) -> Access {
        self.access
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Write bytes at `offset`.
    ///
    /// # Durability
    /// With `Durability::Fsync` this calls `fsync()` before returning.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        if !self.access.can_write() {
            return Err(Error::NoWriter);
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        if self.durability == Durability::Fsync {
            self.file.sync_all()?; // fsync for durability
        }

        Ok(())
    }

    fn end(&mut self) -> Result<u64> {
        Ok(self.file.seek(SeekFrom::End(0))?)
    }

    fn sync(&mut self) -> Result<()> {
        if self.access.can_write() {
            self.file.sync_all()?;
        }
        Ok(())
    }
}
