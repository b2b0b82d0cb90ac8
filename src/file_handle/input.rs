//! Input mode: buffered, quote-aware text reading.

use crate::convert::StandardParser;
use crate::error::{FileIoError, Result};
use crate::file_handle::core::FileCore;
use crate::file_handle::tokenizer::{input_field, read_line, ByteSource};
use crate::file_handle::{delegate_to_core, BasicFile};
use crate::value::Value;
use memchr::memchr3;
use std::io::Read;

const READ_AHEAD: usize = 4096;

/// Legacy `Loc` unit for text files
const BLOCK_SIZE: u64 = 128;

/// A file opened for Input.
///
/// Fields are parsed with the strict standard parser, so `&H` literals or a
/// fractional value for an integer field are type mismatches here even though Binary
/// mode accepts them.
#[derive(Debug)]
pub struct SequentialReader {
    core: FileCore,
    buffer: Vec<u8>,
    cursor: usize,
}

impl SequentialReader {
    pub(crate) fn new(core: FileCore) -> Self {
        Self {
            core,
            buffer: Vec::with_capacity(READ_AHEAD),
            cursor: 0,
        }
    }

    /// Make sure at least one byte is buffered. False at end of input.
    fn fill(&mut self) -> Result<bool> {
        if self.cursor < self.buffer.len() {
            return Ok(true);
        }
        self.buffer.resize(READ_AHEAD, 0);
        let read = self.core.storage()?.read(&mut self.buffer)?;
        self.buffer.truncate(read);
        self.cursor = 0;
        Ok(read > 0)
    }

    fn discard_buffer(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Logical position: what the caller has consumed, not what was read ahead
    fn position(&mut self) -> Result<u64> {
        let buffered = (self.buffer.len() - self.cursor) as u64;
        Ok(self.core.position()? - buffered)
    }
}

impl ByteSource for SequentialReader {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        if !self.fill()? {
            return Ok(None);
        }
        let byte = self.buffer[self.cursor];
        self.cursor += 1;
        Ok(Some(byte))
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buffer[self.cursor]))
    }

    fn take_until(&mut self, stops: [u8; 3], out: &mut Vec<u8>) -> Result<()> {
        while self.fill()? {
            let rest = &self.buffer[self.cursor..];
            match memchr3(stops[0], stops[1], stops[2], rest) {
                Some(index) => {
                    out.extend_from_slice(&rest[..index]);
                    self.cursor += index;
                    return Ok(());
                }
                None => {
                    out.extend_from_slice(rest);
                    self.cursor = self.buffer.len();
                }
            }
        }
        Ok(())
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

impl BasicFile for SequentialReader {
    delegate_to_core!(core);

    fn close(&mut self) -> Result<()> {
        self.discard_buffer();
        self.core.close()
    }

    fn location(&mut self) -> Result<i64> {
        Ok((self.position()? / BLOCK_SIZE) as i64)
    }

    /// True once the reader has nothing left to hand out
    fn is_end_of_file(&mut self) -> Result<bool> {
        Ok(self.peek_byte()?.is_none())
    }

    fn seek(&mut self) -> Result<i64> {
        Ok(self.position()? as i64 + 1)
    }

    /// Move to a 1-based byte position; a position past the end grows the file.
    fn seek_to(&mut self, position: i64) -> Result<()> {
        if position < 1 {
            return Err(FileIoError::BadRecordNumber {
                record_number: position,
            });
        }
        let offset = position as u64 - 1;
        if offset > self.core.len()? {
            self.core.storage()?.set_len(offset)?;
        }
        self.discard_buffer();
        self.core.set_position(offset)
    }

    fn input(&mut self, target: &mut Value) -> Result<()> {
        self.core.check_read_permission()?;
        input_field(self, &StandardParser, target)
    }

    /// Exactly `count` characters of UTF-8 text. Running out of data fails and leaves
    /// the cursor where it was.
    fn input_string(&mut self, count: usize) -> Result<String> {
        self.core.check_read_permission()?;
        let start = self.position()?;
        let mut bytes = Vec::with_capacity(count);
        let mut chars = 0;
        while chars < count || matches!(self.peek_byte()?, Some(byte) if is_continuation(byte)) {
            let Some(byte) = self.next_byte()? else {
                self.discard_buffer();
                self.core.set_position(start)?;
                return Err(FileIoError::EndOfFile);
            };
            if !is_continuation(byte) {
                chars += 1;
            }
            bytes.push(byte);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn line_input(&mut self) -> Result<String> {
        self.core.check_read_permission()?;
        read_line(self)?.ok_or(FileIoError::EndOfFile)
    }
}
