//! Open-parameter validation.
//!
//! These checks run before any storage is touched, so a rejected `Open` never creates
//! or truncates a file.

use crate::config::{Settings, MAX_RECORD_LENGTH};
use crate::error::{FileIoError, Result};
use crate::file_handle::{OpenAccess, OpenMode, UNBOUNDED_RECORD};
use std::path::Path;

/// Resolve a legacy access code; [`OpenAccess::DEFAULT_CODE`] picks the mode's default.
pub fn resolve_access(mode: OpenMode, code: i32) -> Result<OpenAccess> {
    if code == OpenAccess::DEFAULT_CODE {
        Ok(OpenAccess::default_for(mode))
    } else {
        OpenAccess::try_from(code)
    }
}

/// Check that `access` allows the direction `mode` transfers data in
pub fn validate_access(mode: OpenMode, access: OpenAccess) -> Result<()> {
    let compatible = match mode {
        OpenMode::Input => access.can_read(),
        OpenMode::Output | OpenMode::Append => access.can_write(),
        OpenMode::Random | OpenMode::Binary => true,
    };
    if compatible {
        Ok(())
    } else {
        Err(FileIoError::invalid_argument(format!(
            "{mode} mode cannot be opened with {access} access"
        )))
    }
}

/// The record length a handle actually runs with.
///
/// Random files take `record_length` (or the configured default for -1). Binary files
/// are always byte addressed. Text files accept a buffer length for compatibility but
/// have no records.
pub fn resolve_record_length(mode: OpenMode, record_length: i32, settings: &Settings) -> Result<i32> {
    let in_range = (1..=MAX_RECORD_LENGTH).contains(&record_length);
    match mode {
        OpenMode::Binary => Ok(UNBOUNDED_RECORD),
        OpenMode::Random if record_length == UNBOUNDED_RECORD => Ok(settings.default_record_length),
        OpenMode::Random if in_range => Ok(record_length),
        _ if !mode.is_sequential() => Err(FileIoError::invalid_argument(format!(
            "record length {record_length} is outside 1..={MAX_RECORD_LENGTH}"
        ))),
        _ if record_length == UNBOUNDED_RECORD || in_range => Ok(0),
        _ => Err(FileIoError::invalid_argument(format!(
            "record length {record_length} is outside 1..={MAX_RECORD_LENGTH}"
        ))),
    }
}

/// Validate that `path` can be opened in `mode`
///
/// # Error Cases
/// - Path points to a directory (`NotAFile`)
/// - File does not exist and the handle cannot create it: Input mode or read-only
///   access (`FileNotFound`)
pub fn validate_file_path(path: &Path, mode: OpenMode, access: OpenAccess) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) if !metadata.is_file() => Err(FileIoError::NotAFile {
            path: path.to_path_buf(),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if mode == OpenMode::Input || !access.can_write() {
                Err(FileIoError::FileNotFound {
                    path: path.to_path_buf(),
                })
            } else {
                Ok(())
            }
        }
        Err(e) => Err(FileIoError::file_error(
            format!("Failed to read file metadata: {}", path.display()),
            e,
        )),
    }
}
