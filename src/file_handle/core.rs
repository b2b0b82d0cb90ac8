//! State and algorithms shared by every discipline.
//!
//! [`FileCore`] owns the storage, the declared mode/access/record length and the
//! record cursor. The discipline types hold one and layer their own statements on it.

use crate::convert::latin1_decode;
use crate::error::{FileIoError, Result};
use crate::file_handle::tokenizer::ByteSource;
use crate::file_handle::{OpenAccess, OpenMode, RecordRange, CURRENT_RECORD};
use crate::storage::Storage;
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Record length meaning "no fixed record, byte addressed"
pub const UNBOUNDED_RECORD: i32 = -1;

#[derive(Debug)]
pub(crate) struct FileCore {
    storage: Option<Box<dyn Storage>>,
    path: PathBuf,
    mode: OpenMode,
    access: OpenAccess,
    /// -1 unbounded, 0 none, >0 fixed
    record_length: i32,
    record_start: u64,
    end_of_file: bool,
}

impl FileCore {
    pub(crate) fn new(
        storage: Box<dyn Storage>,
        path: PathBuf,
        mode: OpenMode,
        access: OpenAccess,
        record_length: i32,
    ) -> Self {
        Self {
            storage: Some(storage),
            path,
            mode,
            access,
            record_length,
            record_start: 0,
            end_of_file: false,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn mode(&self) -> OpenMode {
        self.mode
    }

    pub(crate) fn access(&self) -> OpenAccess {
        self.access
    }

    pub(crate) fn record_length(&self) -> i32 {
        self.record_length
    }

    pub(crate) fn is_open(&self) -> bool {
        self.storage.is_some()
    }

    pub(crate) fn storage(&mut self) -> Result<&mut (dyn Storage + 'static)> {
        self.storage.as_deref_mut().ok_or(FileIoError::FileClosed)
    }

    pub(crate) fn position(&mut self) -> Result<u64> {
        Ok(self.storage()?.stream_position()?)
    }

    pub(crate) fn set_position(&mut self, position: u64) -> Result<()> {
        log::trace!("{}: seek to byte {}", self.path.display(), position);
        self.storage()?.seek(SeekFrom::Start(position))?;
        self.end_of_file = false;
        Ok(())
    }

    pub(crate) fn len(&mut self) -> Result<u64> {
        Ok(self.storage()?.len()?)
    }

    /// Move the cursor to the start of a record.
    ///
    /// Record 0 (and any record when there is no record length) leaves the cursor
    /// alone. [`CURRENT_RECORD`] rounds the cursor up to the next record boundary.
    /// Without a fixed length the record number is a 1-based byte position.
    pub(crate) fn set_record(&mut self, record_number: i64) -> Result<()> {
        if self.record_length == 0 || record_number == 0 {
            return Ok(());
        }
        if record_number < CURRENT_RECORD {
            return Err(FileIoError::BadRecordNumber { record_number });
        }
        if self.record_length < 0 && record_number == CURRENT_RECORD {
            return Ok(());
        }

        let target = if self.record_length < 0 {
            (record_number - 1) as u64
        } else {
            let length = self.record_length as u64;
            if record_number == CURRENT_RECORD {
                let current = self.position()?;
                current.div_ceil(length) * length
            } else {
                (record_number as u64 - 1)
                    .checked_mul(length)
                    .ok_or(FileIoError::BadRecordNumber { record_number })?
            }
        };

        log::trace!(
            "{}: record {} starts at byte {}",
            self.path.display(),
            record_number,
            target
        );
        self.storage()?.seek(SeekFrom::Start(target))?;
        self.record_start = target;
        self.end_of_file = false;
        Ok(())
    }

    /// Snapshot of the cursor and record start, for rolling back a rejected statement.
    pub(crate) fn cursor(&mut self) -> Result<(u64, u64)> {
        Ok((self.position()?, self.record_start))
    }

    pub(crate) fn restore_cursor(&mut self, (position, record_start): (u64, u64)) -> Result<()> {
        self.storage()?.seek(SeekFrom::Start(position))?;
        self.record_start = record_start;
        Ok(())
    }

    /// Fail with `BadRecordLength` unless `length` more bytes fit in the current record.
    pub(crate) fn check_length(&mut self, length: u64) -> Result<()> {
        if self.record_length == UNBOUNDED_RECORD {
            return Ok(());
        }
        let record_length = self.record_length.max(0) as u64;
        let position = self.position()?;
        if length > record_length || position + length > self.record_start + record_length {
            return Err(FileIoError::BadRecordLength {
                length,
                record_length: self.record_length,
            });
        }
        Ok(())
    }

    pub(crate) fn check_read_permission(&self) -> Result<()> {
        if self.access.can_read() {
            Ok(())
        } else {
            Err(FileIoError::FileAccessDenied {
                access: self.access,
            })
        }
    }

    pub(crate) fn check_write_permission(&self) -> Result<()> {
        if self.access.can_write() {
            Ok(())
        } else {
            Err(FileIoError::FileAccessDenied {
                access: self.access,
            })
        }
    }

    /// Byte-exact end of file: nothing left between the cursor and the end.
    pub(crate) fn is_end_of_file(&mut self) -> Result<bool> {
        if self.end_of_file {
            return Ok(true);
        }
        let position = self.position()?;
        Ok(self.len()? <= position)
    }

    /// Read up to `buf.len()` bytes; a short read zero-fills the rest and flags end of file.
    pub(crate) fn read_field(&mut self, buf: &mut [u8]) -> Result<()> {
        let storage = self.storage()?;
        let mut filled = 0;
        while filled < buf.len() {
            let read = storage.read(&mut buf[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        if filled < buf.len() {
            buf[filled..].fill(0);
            self.end_of_file = true;
        }
        Ok(())
    }

    /// Write and flush in one step so the bytes are visible once the statement ends.
    pub(crate) fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let storage = self.storage()?;
        storage.write_all(bytes)?;
        storage.flush()?;
        Ok(())
    }

    /// Translate a record range into the byte range the storage locks.
    ///
    /// Text disciplines always lock the whole file.
    pub(crate) fn lock_range(&self, range: RecordRange) -> Result<Range<u64>> {
        if self.mode.is_sequential() {
            return Ok(0..u64::MAX);
        }
        let (from, to) = match range {
            RecordRange::Whole => return Ok(0..u64::MAX),
            RecordRange::Record(record) => (record, record),
            RecordRange::Span(from, to) => (from, to),
        };
        if from < 1 {
            return Err(FileIoError::BadRecordNumber {
                record_number: from,
            });
        }
        if to < from {
            return Err(FileIoError::BadRecordNumber { record_number: to });
        }

        let width = if self.record_length > 0 {
            self.record_length as u64
        } else {
            1
        };
        Ok((from as u64 - 1) * width..to as u64 * width)
    }

    pub(crate) fn lock(&mut self, range: RecordRange) -> Result<()> {
        let bytes = self.lock_range(range)?;
        self.storage()?.lock(bytes)?;
        Ok(())
    }

    pub(crate) fn unlock(&mut self, range: RecordRange) -> Result<()> {
        let bytes = self.lock_range(range)?;
        self.storage()?.unlock(bytes)?;
        Ok(())
    }

    /// Release the storage. Closing twice is a no-op.
    pub(crate) fn close(&mut self) -> Result<()> {
        if let Some(mut storage) = self.storage.take() {
            log::debug!("closing {} ({})", self.path.display(), self.mode);
            storage.flush()?;
        }
        Ok(())
    }
}

/// Raw byte reads straight from the storage cursor, used by Binary mode `Input`.
impl ByteSource for FileCore {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let read = self.storage()?.read(&mut byte)?;
        Ok((read == 1).then_some(byte[0]))
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        let next = self.next_byte()?;
        if next.is_some() {
            self.storage()?.seek(SeekFrom::Current(-1))?;
        }
        Ok(next)
    }

    /// Binary files hold Latin-1 text, the same encoding `Get` and `Put` use.
    fn decode(&self, bytes: &[u8]) -> String {
        latin1_decode(bytes)
    }
}
