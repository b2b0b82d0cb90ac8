//! Byte-addressable storage underneath every file handle.
//!
//! A handle never touches `std::fs` directly: it owns one boxed [`Storage`] and drives
//! it through read/write/seek plus the length and advisory lock primitives below.

use crate::file_handle::OpenAccess;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::Path;

/// Seekable byte storage owned exclusively by one handle.
pub trait Storage: Read + Write + Seek + fmt::Debug + Send {
    /// Current length in bytes
    fn len(&mut self) -> io::Result<u64>;

    /// Grow or shrink the storage
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Take an advisory lock on a byte range
    fn lock(&mut self, range: Range<u64>) -> io::Result<()>;

    /// Release a lock previously taken with [`Storage::lock`]
    fn unlock(&mut self, range: Range<u64>) -> io::Result<()>;
}

/// How a missing target is treated when storage is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePolicy {
    /// Fail with `NotFound` unless the file exists
    OpenExisting,
    /// Open the file, creating it when missing
    OpenOrCreate,
    /// Open or create, then drop any existing content
    Truncate,
}

/// Byte ranges currently locked through one storage object.
#[derive(Debug, Default)]
struct LockSet {
    ranges: Vec<Range<u64>>,
}

impl LockSet {
    fn lock(&mut self, range: Range<u64>) -> io::Result<()> {
        if self
            .ranges
            .iter()
            .any(|held| held.start < range.end && range.start < held.end)
        {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("bytes {}..{} are already locked", range.start, range.end),
            ));
        }
        self.ranges.push(range);
        Ok(())
    }

    fn unlock(&mut self, range: Range<u64>) -> io::Result<()> {
        match self.ranges.iter().position(|held| *held == range) {
            Some(index) => {
                self.ranges.swap_remove(index);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bytes {}..{} are not locked", range.start, range.end),
            )),
        }
    }
}

/// Storage backed by a file on disk
#[derive(Debug)]
pub struct FileStorage {
    file: File,
    locks: LockSet,
}

impl FileStorage {
    /// Open `path` with the read/write rights implied by `access`.
    pub fn open(path: &Path, policy: CreatePolicy, access: OpenAccess) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.read(access.can_read()).write(access.can_write());
        match policy {
            CreatePolicy::OpenExisting => {}
            CreatePolicy::OpenOrCreate => {
                options.create(true);
            }
            CreatePolicy::Truncate => {
                options.create(true).truncate(true);
            }
        }

        Ok(Self {
            file: options.open(path)?,
            locks: LockSet::default(),
        })
    }
}

impl Read for FileStorage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileStorage {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileStorage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Storage for FileStorage {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    fn lock(&mut self, range: Range<u64>) -> io::Result<()> {
        self.locks.lock(range)
    }

    fn unlock(&mut self, range: Range<u64>) -> io::Result<()> {
        self.locks.unlock(range)
    }
}

/// Storage kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStorage {
    cursor: Cursor<Vec<u8>>,
    locks: LockSet,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing content, cursor at offset 0
    pub fn with_content(content: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(content),
            locks: LockSet::default(),
        }
    }

    pub fn content(&self) -> &[u8] {
        self.cursor.get_ref()
    }
}

impl Read for MemoryStorage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemoryStorage {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStorage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl Storage for MemoryStorage {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds memory"))?;
        self.cursor.get_mut().resize(len, 0);
        Ok(())
    }

    fn lock(&mut self, range: Range<u64>) -> io::Result<()> {
        self.locks.lock(range)
    }

    fn unlock(&mut self, range: Range<u64>) -> io::Result<()> {
        self.locks.unlock(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_set_len_grows_with_zeros() {
        let mut storage = MemoryStorage::with_content(b"abc".to_vec());
        storage.set_len(5).unwrap();
        assert_eq!(storage.content(), b"abc\0\0");
        assert_eq!(storage.len().unwrap(), 5);
    }

    #[test]
    fn test_overlapping_locks_conflict() {
        let mut storage = MemoryStorage::new();
        storage.lock(0..10).unwrap();
        assert!(storage.lock(5..15).is_err());
        storage.lock(10..20).unwrap();

        storage.unlock(0..10).unwrap();
        storage.lock(5..8).unwrap();
        assert!(storage.unlock(0..10).is_err());
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("missing.dat");

        let err = FileStorage::open(&path, CreatePolicy::OpenExisting, OpenAccess::Read)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let mut storage =
            FileStorage::open(&path, CreatePolicy::OpenOrCreate, OpenAccess::ReadWrite).unwrap();
        storage.write_all(b"hello").unwrap();
        assert_eq!(storage.len().unwrap(), 5);
    }

    #[test]
    fn test_truncate_discards_content() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("out.txt");
        std::fs::write(&path, b"old content").unwrap();

        let mut storage =
            FileStorage::open(&path, CreatePolicy::Truncate, OpenAccess::Write).unwrap();
        assert_eq!(storage.len().unwrap(), 0);
    }
}
