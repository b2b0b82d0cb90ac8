//! # basic-fileio - Legacy BASIC File Access
//!
//! The file statements of classic BASIC dialects (`Open`, `Get`, `Put`, `Input`,
//! `LineInput`, `Print`, `Write`, `Seek`, `EOF`, `LOF`, `Loc`, `Lock`) over ordinary
//! byte-oriented files, byte-compatible with the files those programs produce.
//!
//! ## Disciplines
//!
//! - **Random**: fixed-length records of little-endian binary fields
//! - **Binary**: byte-addressed fields plus `Input` tokenizing
//! - **Input**: comma/CR delimited, quote-aware text fields
//! - **Output / Append**: `Print` zones and `Write` literals with column tracking
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and the legacy error numbers
//! - [`file_handle`] - The [`BasicFile`] trait, one type per discipline, and the factory
//! - [`file_table`] - File numbers `#1`..`#255`
//! - [`storage`] - The byte storage a handle drives
//! - [`value`], [`convert`], [`format`] - Field values and their binary and text forms
//! - [`config`] - Settings applied when files are opened

// Core modules
pub mod config;
pub mod error;
pub mod storage;

// Field values and their encodings
pub mod convert;
pub mod format;
pub mod value;

// File handles
pub mod file_handle;
pub mod file_table;

// Re-export commonly used types for convenience
pub use config::Settings;
pub use error::{FileIoError, Result};
pub use file_handle::{
    BasicFile, FileHandleFactory, OpenAccess, OpenMode, RecordRange, CURRENT_RECORD,
    UNBOUNDED_RECORD,
};
pub use file_table::FileTable;
pub use storage::{MemoryStorage, Storage};
pub use value::{FieldType, Value, ValueArray};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
