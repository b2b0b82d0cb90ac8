//! Binary mode: byte-addressed `Get`/`Put` plus `Input` tokenizing on the same cursor.
//!
//! Record numbers are 1-based byte positions. Strings are stored without a length
//! prefix, so a `Get` reads as many characters as the destination already holds.
//! `Input` goes through the lenient legacy parser and numeric fields also end at a space.

use crate::convert::{latin1_decode, LegacyParser};
use crate::error::{FileIoError, Result};
use crate::file_handle::core::FileCore;
use crate::file_handle::random::{RecordFile, StringLayout};
use crate::file_handle::tokenizer::{input_field, read_line, ByteSource};
use crate::file_handle::{delegate_to_core, BasicFile};
use crate::value::Value;

/// Marks the end of text data in legacy files
const EOF_MARKER: u8 = 0x1A;

/// A file opened in Binary mode.
#[derive(Debug)]
pub struct BinaryFile {
    records: RecordFile,
}

impl BinaryFile {
    pub(crate) fn new(core: FileCore) -> Self {
        Self {
            records: RecordFile::with_layout(core, StringLayout::Raw),
        }
    }

    fn core(&mut self) -> &mut FileCore {
        &mut self.records.core
    }
}

impl BasicFile for BinaryFile {
    delegate_to_core!(records.core);

    fn close(&mut self) -> Result<()> {
        self.core().close()
    }

    /// Byte position of the cursor
    fn location(&mut self) -> Result<i64> {
        Ok(self.core().position()? as i64)
    }

    fn is_end_of_file(&mut self) -> Result<bool> {
        self.core().is_end_of_file()
    }

    fn seek(&mut self) -> Result<i64> {
        Ok(self.core().position()? as i64 + 1)
    }

    fn seek_to(&mut self, position: i64) -> Result<()> {
        if position < 1 {
            return Err(FileIoError::BadRecordNumber {
                record_number: position,
            });
        }
        self.core().set_position(position as u64 - 1)
    }

    fn get(&mut self, target: &mut Value, record_number: i64, fixed_length: bool) -> Result<()> {
        self.records.get_field(target, record_number, fixed_length)
    }

    fn put(&mut self, value: &Value, record_number: i64, fixed_length: bool) -> Result<()> {
        self.records.put_field(value, record_number, fixed_length)
    }

    fn input(&mut self, target: &mut Value) -> Result<()> {
        let core = self.core();
        core.check_read_permission()?;
        input_field(core, &LegacyParser, target)
    }

    /// Exactly `count` raw bytes. Hitting the end marker or the end of the data fails
    /// and leaves the cursor where it was.
    fn input_string(&mut self, count: usize) -> Result<String> {
        let core = self.core();
        core.check_read_permission()?;
        let start = core.position()?;

        let mut bytes = Vec::with_capacity(count);
        while bytes.len() < count {
            match core.next_byte()? {
                Some(byte) if byte != EOF_MARKER => bytes.push(byte),
                _ => {
                    core.set_position(start)?;
                    return Err(FileIoError::EndOfFile);
                }
            }
        }
        Ok(latin1_decode(&bytes))
    }

    fn line_input(&mut self) -> Result<String> {
        let core = self.core();
        core.check_read_permission()?;
        read_line(core)?.ok_or(FileIoError::EndOfFile)
    }
}
