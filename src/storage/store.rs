//! Byte-store boundary.
//!
//! The tree only needs positioned reads and writes plus the current end of
//! the store. [`Store`] captures that, and the wrappers here adapt anything
//! implementing the `std::io` traits.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::common::{Error, Result};

/// Access modes a store supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads only; any write fails with `Error::NoWriter`.
    ReadOnly,
    /// Writes only; any read fails with `Error::NoReader`.
    WriteOnly,
    /// Both reads and writes.
    ReadWrite,
}

impl Access {
    /// Whether reads are allowed.
    #[inline]
    pub fn can_read(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    /// Whether writes are allowed.
    #[inline]
    pub fn can_write(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

/// A seekable, random-access byte store holding one tree.
///
/// Implementations perform synchronous I/O; the tree issues no other kind.
pub trait Store {
    /// Access modes supported by this store.
    fn access(&self) -> Access;

    /// Fill `buf` with the bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write all of `buf` starting at `offset`, extending the store if needed.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Current length of the store in bytes.
    fn end(&mut self) -> Result<u64>;

    /// Flush written bytes to durable storage.
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Store + ?Sized> Store for &mut S {
    fn access(&self) -> Access {
        (**self).access()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        (**self).write_at(offset, buf)
    }

    fn end(&mut self) -> Result<u64> {
        (**self).end()
    }

    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }
}

/// Read-write store over any `Read + Write + Seek` handle.
///
/// # Example
/// ```
/// use diskbtree::storage::{IoStore, Store};
///
/// let mut store = IoStore::in_memory();
/// store.write_at(4, b"abc").unwrap();
/// assert_eq!(store.end().unwrap(), 7);
/// ```
#[derive(Debug)]
pub struct IoStore<T> {
    inner: T,
}

impl<T: Read + Write + Seek> IoStore<T> {
    /// Wrap a handle.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Unwrap the handle.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl IoStore<Cursor<Vec<u8>>> {
    /// An empty store backed by a growable buffer.
    pub fn in_memory() -> Self {
        Self::new(Cursor::new(Vec::new()))
    }

    /// The store's bytes.
    pub fn bytes(&self) -> &[u8] {
        self.inner.get_ref()
    }
}

impl<T: Read + Write + Seek> Store for IoStore<T> {
    fn access(&self) -> Access {
        Access::ReadWrite
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(buf)?;
        Ok(())
    }

    fn end(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Store over a `Read + Seek` handle. Writes fail with `Error::NoWriter`.
#[derive(Debug)]
pub struct ReadOnlyStore<T> {
    inner: T,
}

impl<T: Read + Seek> ReadOnlyStore<T> {
    /// Wrap a handle.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Unwrap the handle.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Seek> Store for ReadOnlyStore<T> {
    fn access(&self) -> Access {
        Access::ReadOnly
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, _offset: u64, _buf: &[u8]) -> Result<()> {
        Err(Error::NoWriter)
    }

    fn end(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }
}

/// Store over a `Write + Seek` handle. Reads fail with `Error::NoReader`.
#[derive(Debug)]
pub struct WriteOnlyStore<T> {
    inner: T,
}

impl<T: Write + Seek> WriteOnlyStore<T> {
    /// Wrap a handle.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Unwrap the handle.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Write + Seek> Store for WriteOnlyStore<T> {
    fn access(&self) -> Access {
        Access::WriteOnly
    }

    fn read_at(&mut self, _offset: u64, _buf: &mut [u8]) -> Result<()> {
        Err(Error::NoReader)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(buf)?;
        Ok(())
    }

    fn end(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_modes() {
        assert!(Access::ReadWrite.can_read());
        assert!(Access::ReadWrite.can_write());
        assert!(Access::ReadOnly.can_read());
        assert!(!Access::ReadOnly.can_write());
        assert!(!Access::WriteOnly.can_read());
        assert!(Access::WriteOnly.can_write());
    }

    #[test]
    fn test_in_memory_write_and_read() {
        let mut store = IoStore::in_memory();
        store.write_at(0, &[1, 2, 3, 4]).unwrap();
        store.write_at(10, &[9]).unwrap();

        // Gap is zero-filled
        assert_eq!(store.end().unwrap(), 11);
        let mut buf = [0xFFu8; 6];
        store.read_at(4, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 0, 0, 0]);

        let mut buf = [0u8; 2];
        store.read_at(2, &mut buf).unwrap();
        assert_eq!(buf, [3, 4]);
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut store = IoStore::in_memory();
        store.write_at(0, &[1, 2]).unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(store.read_at(0, &mut buf), Err(Error::Io(_))));
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let mut store = ReadOnlyStore::new(Cursor::new(vec![7u8; 8]));
        assert_eq!(store.access(), Access::ReadOnly);
        assert!(matches!(store.write_at(0, &[1]), Err(Error::NoWriter)));

        let mut buf = [0u8; 2];
        store.read_at(6, &mut buf).unwrap();
        assert_eq!(buf, [7, 7]);
        assert_eq!(store.end().unwrap(), 8);
    }

    #[test]
    fn test_write_only_rejects_reads() {
        let mut store = WriteOnlyStore::new(Cursor::new(Vec::new()));
        store.write_at(0, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 1];
        assert!(matches!(store.read_at(0, &mut buf), Err(Error::NoReader)));
        assert_eq!(store.into_inner().into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn test_mut_ref_is_a_store() {
        fn write_through<S: Store>(mut store: S) {
            store.write_at(0, b"xy").unwrap();
        }

        let mut store = IoStore::in_memory();
        write_through(&mut store);
        assert_eq!(store.bytes(), b"xy");
    }
}
