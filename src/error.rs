//! Error types and handling infrastructure for basic-fileio.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. Every failure a legacy file statement can raise has its own
//! variant, so callers branch on the kind instead of parsing messages.
//!
//! ## Design Principles
//!
//! - **One kind per legacy failure**: `Bad file mode`, `Bad record length`, ... each map
//!   to a variant and to the classic error number via [`FileIoError::error_number`]
//! - **Context preservation**: Include relevant information for debugging
//! - **Consistency**: Standardized Result type across all modules

use crate::file_handle::{OpenAccess, OpenMode};
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for basic-fileio operations.
#[derive(Error, Debug)]
pub enum FileIoError {
    /// File system related errors (permission denied, disk full, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (Input mode requires an existing file)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Bad mode, access, record length or width argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Operation is not supported by the handle's discipline
    #[error("Bad file mode: {operation} is not supported in {mode} mode")]
    WrongFileMode {
        operation: &'static str,
        mode: OpenMode,
    },

    /// Read on a write-only handle or write on a read-only handle
    #[error("Path/File access error: handle was opened for {access}")]
    FileAccessDenied { access: OpenAccess },

    /// Field does not fit in the fixed record
    #[error("Bad record length: {length} bytes do not fit in a {record_length}-byte record")]
    BadRecordLength { length: u64, record_length: i32 },

    #[error("Bad record number: {record_number}")]
    BadRecordNumber { record_number: i64 },

    /// Read past the end of the data or hit the 0x1A end-of-file marker
    #[error("Input past end of file")]
    EndOfFile,

    #[error("Illegal function call: {message}")]
    IllegalFunctionCall { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Only one- and two-dimensional arrays are supported, got rank {rank}")]
    UnsupportedArrayDimensions { rank: usize },

    #[error("Fixed-length string field has zero width")]
    InvalidFixedLengthString,

    /// Value has no literal or binary representation
    #[error("Unsupported type for file I/O: {type_name}")]
    UnsupportedIoType { type_name: &'static str },

    /// Input token could not be converted to the requested type
    #[error("Type mismatch: cannot convert {token:?} to {target}")]
    TypeMismatch { token: String, target: &'static str },

    #[error("Overflow: {token:?} does not fit in {target}")]
    Overflow { token: String, target: &'static str },

    /// File number outside 1..=255 or not open
    #[error("Bad file name or number: {number}")]
    BadFileNumber { number: i32 },

    #[error("File already open: {path}")]
    FileAlreadyOpen { path: PathBuf },

    #[error("Too many files")]
    TooManyFiles,

    /// Operation on a handle after close
    #[error("File is closed")]
    FileClosed,

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Standard Result type for basic-fileio operations.
pub type Result<T> = std::result::Result<T, FileIoError>;

impl FileIoError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an IllegalFunctionCall error with a descriptive message
    pub fn illegal_call(message: impl Into<String>) -> Self {
        Self::IllegalFunctionCall {
            message: message.into(),
        }
    }

    /// Create an InternalError with a descriptive message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn type_mismatch(token: impl Into<String>, target: &'static str) -> Self {
        Self::TypeMismatch {
            token: token.into(),
            target,
        }
    }

    pub fn overflow(token: impl Into<String>, target: &'static str) -> Self {
        Self::Overflow {
            token: token.into(),
            target,
        }
    }

    /// The classic runtime error number for this failure.
    pub fn error_number(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. }
            | Self::IllegalFunctionCall { .. }
            | Self::UnsupportedArrayDimensions { .. }
            | Self::InvalidFixedLengthString
            | Self::UnsupportedIoType { .. }
            | Self::ConfigError { .. } => 5,
            Self::Overflow { .. } => 6,
            Self::TypeMismatch { .. } => 13,
            Self::InternalError { .. } => 51,
            Self::BadFileNumber { .. } | Self::FileClosed => 52,
            Self::FileNotFound { .. } => 53,
            Self::WrongFileMode { .. } => 54,
            Self::FileAlreadyOpen { .. } => 55,
            Self::FileError { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => 53,
                std::io::ErrorKind::PermissionDenied => 70,
                _ => 57,
            },
            Self::BadRecordLength { .. } => 59,
            Self::EndOfFile => 62,
            Self::BadRecordNumber { .. } => 63,
            Self::TooManyFiles => 67,
            Self::NotAFile { .. } | Self::FileAccessDenied { .. } => 75,
        }
    }
}

// Automatic conversion from io::Error to FileIoError
impl From<std::io::Error> for FileIoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}
