//! Legacy file handles: one open file in one of the five disciplines.
//!
//! [`FileHandleFactory`] validates the open parameters and picks the discipline type:
//!
//! - Random: [`RecordFile`], fixed-length binary records
//! - Binary: [`BinaryFile`], byte-addressed fields plus `Input` tokenizing
//! - Input: [`SequentialReader`], quote-aware text tokens
//! - Output / Append: [`SequentialWriter`], column-tracked `Print` and `Write`
//!
//! Every handle is used through the [`BasicFile`] trait. Statements a discipline does
//! not support fail with [`FileIoError::WrongFileMode`].

use crate::error::{FileIoError, Result};
use crate::value::{FieldType, Value};
use std::fmt;
use std::path::Path;

/// Implements the [`BasicFile`] bookkeeping methods by delegating to a `FileCore`.
macro_rules! delegate_to_core {
    ($($core:ident).+) => {
        fn path(&self) -> &std::path::Path {
            self.$($core).+.path()
        }

        fn mode(&self) -> crate::file_handle::OpenMode {
            self.$($core).+.mode()
        }

        fn access(&self) -> crate::file_handle::OpenAccess {
            self.$($core).+.access()
        }

        fn record_length(&self) -> i32 {
            self.$($core).+.record_length()
        }

        fn is_open(&self) -> bool {
            self.$($core).+.is_open()
        }

        fn length(&mut self) -> crate::error::Result<u64> {
            self.$($core).+.len()
        }

        fn lock(&mut self, range: crate::file_handle::RecordRange) -> crate::error::Result<()> {
            self.$($core).+.lock(range)
        }

        fn unlock(&mut self, range: crate::file_handle::RecordRange) -> crate::error::Result<()> {
            self.$($core).+.unlock(range)
        }
    };
}

pub(crate) use delegate_to_core;

// Core modules
pub(crate) mod core;
pub(crate) mod tokenizer;

// Disciplines
pub mod binary;
pub mod input;
pub mod output;
pub mod random;

// Construction
pub mod factory;
pub mod validation;

// Re-export commonly used types for convenience
pub use self::core::UNBOUNDED_RECORD;
pub use binary::BinaryFile;
pub use factory::FileHandleFactory;
pub use input::SequentialReader;
pub use output::SequentialWriter;
pub use random::RecordFile;

/// Record number meaning "the record at (or after) the current position"
pub const CURRENT_RECORD: i64 = -1;

/// Open mode, i.e. the file discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    Input,
    Output,
    Random,
    Append,
    Binary,
}

impl OpenMode {
    /// Legacy numeric code
    pub fn code(self) -> i32 {
        match self {
            OpenMode::Input => 1,
            OpenMode::Output => 2,
            OpenMode::Random => 4,
            OpenMode::Append => 8,
            OpenMode::Binary => 32,
        }
    }

    /// Text disciplines without records
    pub fn is_sequential(self) -> bool {
        matches!(self, OpenMode::Input | OpenMode::Output | OpenMode::Append)
    }
}

impl TryFrom<i32> for OpenMode {
    type Error = FileIoError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(OpenMode::Input),
            2 => Ok(OpenMode::Output),
            4 => Ok(OpenMode::Random),
            8 => Ok(OpenMode::Append),
            32 => Ok(OpenMode::Binary),
            other => Err(FileIoError::invalid_argument(format!(
                "{other} is not a valid open mode"
            ))),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpenMode::Input => "Input",
            OpenMode::Output => "Output",
            OpenMode::Random => "Random",
            OpenMode::Append => "Append",
            OpenMode::Binary => "Binary",
        };
        f.write_str(name)
    }
}

/// Directions a handle may transfer data in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenAccess {
    Read,
    Write,
    ReadWrite,
}

impl OpenAccess {
    /// Code meaning "pick the default access for the mode"
    pub const DEFAULT_CODE: i32 = -1;

    pub fn code(self) -> i32 {
        match self {
            OpenAccess::Read => 1,
            OpenAccess::Write => 2,
            OpenAccess::ReadWrite => 3,
        }
    }

    pub fn default_for(mode: OpenMode) -> Self {
        match mode {
            OpenMode::Input => OpenAccess::Read,
            OpenMode::Output | OpenMode::Append => OpenAccess::Write,
            OpenMode::Random | OpenMode::Binary => OpenAccess::ReadWrite,
        }
    }

    pub fn can_read(self) -> bool {
        matches!(self, OpenAccess::Read | OpenAccess::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, OpenAccess::Write | OpenAccess::ReadWrite)
    }
}

impl TryFrom<i32> for OpenAccess {
    type Error = FileIoError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(OpenAccess::Read),
            2 => Ok(OpenAccess::Write),
            3 => Ok(OpenAccess::ReadWrite),
            other => Err(FileIoError::invalid_argument(format!(
                "{other} is not a valid access"
            ))),
        }
    }
}

impl fmt::Display for OpenAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpenAccess::Read => "Read",
            OpenAccess::Write => "Write",
            OpenAccess::ReadWrite => "ReadWrite",
        };
        f.write_str(name)
    }
}

/// Records covered by `Lock`/`Unlock`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRange {
    Whole,
    Record(i64),
    /// Inclusive on both ends
    Span(i64, i64),
}

fn wrong_mode(operation: &'static str, mode: OpenMode) -> FileIoError {
    FileIoError::WrongFileMode { operation, mode }
}

/// Statements available on an open file.
///
/// Record numbers are 1-based; `0` keeps the current position and
/// [`CURRENT_RECORD`] moves to the next record boundary. `fixed_length` marks string
/// fields (and string arrays) as fixed-width instead of length-prefixed.
pub trait BasicFile: fmt::Debug + Send {
    fn path(&self) -> &Path;

    fn mode(&self) -> OpenMode;

    fn access(&self) -> OpenAccess;

    fn record_length(&self) -> i32;

    fn is_open(&self) -> bool;

    /// Release the storage; closing twice is a no-op
    fn close(&mut self) -> Result<()>;

    /// Length of the file in bytes (LOF)
    fn length(&mut self) -> Result<u64>;

    /// Current location (Loc): record number, byte position or 128-byte block
    fn location(&mut self) -> Result<i64>;

    fn is_end_of_file(&mut self) -> Result<bool>;

    /// 1-based position of the next read or write
    fn seek(&mut self) -> Result<i64>;

    /// Reposition the handle; see each discipline for the unit
    fn seek_to(&mut self, position: i64) -> Result<()>;

    fn lock(&mut self, range: RecordRange) -> Result<()>;

    fn unlock(&mut self, range: RecordRange) -> Result<()>;

    /// Read one field into `target`, whose variant selects the layout
    fn get(&mut self, target: &mut Value, record_number: i64, fixed_length: bool) -> Result<()> {
        let _ = (target, record_number, fixed_length);
        Err(wrong_mode("Get", self.mode()))
    }

    /// Write one field
    fn put(&mut self, value: &Value, record_number: i64, fixed_length: bool) -> Result<()> {
        let _ = (value, record_number, fixed_length);
        Err(wrong_mode("Put", self.mode()))
    }

    /// Read the next `Input` token into `target`.
    ///
    /// `Empty`/`Null` targets take the type the token looks like; `#NULL#` gives `Null`.
    fn input(&mut self, target: &mut Value) -> Result<()> {
        let _ = target;
        Err(wrong_mode("Input", self.mode()))
    }

    /// Read exactly `count` characters
    fn input_string(&mut self, count: usize) -> Result<String> {
        let _ = count;
        Err(wrong_mode("InputString", self.mode()))
    }

    fn line_input(&mut self) -> Result<String> {
        Err(wrong_mode("LineInput", self.mode()))
    }

    fn print(&mut self, values: &[Value]) -> Result<()> {
        let _ = values;
        Err(wrong_mode("Print", self.mode()))
    }

    fn print_line(&mut self, values: &[Value]) -> Result<()> {
        let _ = values;
        Err(wrong_mode("PrintLine", self.mode()))
    }

    fn write(&mut self, values: &[Value]) -> Result<()> {
        let _ = values;
        Err(wrong_mode("Write", self.mode()))
    }

    fn write_line(&mut self, values: &[Value]) -> Result<()> {
        let _ = values;
        Err(wrong_mode("WriteLine", self.mode()))
    }

    /// Output line width; 0 means unlimited
    fn set_width(&mut self, width: i32) -> Result<()> {
        let _ = width;
        Err(wrong_mode("Width", self.mode()))
    }
}

/// Typed conveniences over the dynamic statements
impl dyn BasicFile + '_ {
    pub fn get_as<T: FieldType>(&mut self, record_number: i64) -> Result<T> {
        let mut value = T::placeholder();
        self.get(&mut value, record_number, false)?;
        T::from_value(value)
            .ok_or_else(|| FileIoError::internal(format!("Get did not produce a {}", T::TYPE_NAME)))
    }

    /// Read a fixed-length string field of `width` characters
    pub fn get_fixed_string(&mut self, width: usize, record_number: i64) -> Result<String> {
        if width == 0 {
            return Err(FileIoError::InvalidFixedLengthString);
        }
        let mut value = Value::String(" ".repeat(width));
        self.get(&mut value, record_number, true)?;
        String::from_value(value)
            .ok_or_else(|| FileIoError::internal("Get did not produce a String"))
    }

    pub fn input_as<T: FieldType>(&mut self) -> Result<T> {
        let mut value = T::placeholder();
        self.input(&mut value)?;
        match value {
            Value::Null => Err(FileIoError::type_mismatch("#NULL#", T::TYPE_NAME)),
            other => T::from_value(other).ok_or_else(|| {
                FileIoError::internal(format!("Input did not produce a {}", T::TYPE_NAME))
            }),
        }
    }
}
