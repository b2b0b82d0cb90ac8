//! Factory for opening file handles.
//!
//! [`FileHandleFactory`] validates the open parameters, opens the storage with the
//! create policy the mode implies and wraps it in the discipline type for the mode.

use crate::config::Settings;
use crate::error::{FileIoError, Result};
use crate::file_handle::core::FileCore;
use crate::file_handle::validation::{
    resolve_access, resolve_record_length, validate_access, validate_file_path,
};
use crate::file_handle::{
    BasicFile, BinaryFile, OpenAccess, OpenMode, RecordFile, SequentialReader, SequentialWriter,
};
use crate::storage::{CreatePolicy, FileStorage, Storage};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Opens [`BasicFile`] handles.
///
/// # Create policy
/// - Input, or any read-only open: the file must exist
/// - Output: created or truncated
/// - Append: created if missing, cursor at the end
/// - Random / Binary: created if missing
#[derive(Debug, Clone, Default)]
pub struct FileHandleFactory {
    settings: Settings,
}

/// Parameters after validation
struct OpenPlan {
    mode: OpenMode,
    access: OpenAccess,
    record_length: i32,
}

impl FileHandleFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn plan(&self, mode: OpenMode, access: Option<OpenAccess>, record_length: i32) -> Result<OpenPlan> {
        let access = access.unwrap_or_else(|| OpenAccess::default_for(mode));
        validate_access(mode, access)?;
        let record_length = resolve_record_length(mode, record_length, &self.settings)?;
        Ok(OpenPlan {
            mode,
            access,
            record_length,
        })
    }

    /// Open `path` in `mode`.
    ///
    /// `access` of `None` uses the mode's default. `record_length` -1 means "default":
    /// the configured length for Random files, unbounded for the rest.
    ///
    /// # Errors
    /// * `InvalidArgument` for an access the mode cannot use or a bad record length
    /// * `NotAFile` / `FileNotFound` from path validation
    /// * `FileError` when the storage cannot be opened
    pub fn open(
        &self,
        path: impl AsRef<Path>,
        mode: OpenMode,
        access: Option<OpenAccess>,
        record_length: i32,
    ) -> Result<Box<dyn BasicFile>> {
        let path = path.as_ref();
        let plan = self.plan(mode, access, record_length)?;
        validate_file_path(path, plan.mode, plan.access)?;

        let policy = match plan.mode {
            _ if plan.mode == OpenMode::Input || !plan.access.can_write() => {
                CreatePolicy::OpenExisting
            }
            OpenMode::Output => CreatePolicy::Truncate,
            _ => CreatePolicy::OpenOrCreate,
        };
        let storage = FileStorage::open(path, policy, plan.access).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FileIoError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                FileIoError::file_error(format!("Failed to open file: {}", path.display()), e)
            }
        })?;

        self.finish(Box::new(storage), path.to_path_buf(), plan)
    }

    /// Open with the legacy numeric mode and access codes.
    ///
    /// An access code of [`OpenAccess::DEFAULT_CODE`] picks the mode's default.
    pub fn open_codes(
        &self,
        path: impl AsRef<Path>,
        mode: i32,
        access: i32,
        record_length: i32,
    ) -> Result<Box<dyn BasicFile>> {
        let mode = OpenMode::try_from(mode)?;
        let access = resolve_access(mode, access)?;
        self.open(path, mode, Some(access), record_length)
    }

    /// Open any discipline over caller-supplied storage.
    ///
    /// Output truncates the storage and Append moves to its end, as with files.
    pub fn open_storage(
        &self,
        mut storage: Box<dyn Storage>,
        path: impl Into<PathBuf>,
        mode: OpenMode,
        access: Option<OpenAccess>,
        record_length: i32,
    ) -> Result<Box<dyn BasicFile>> {
        let plan = self.plan(mode, access, record_length)?;
        if plan.mode == OpenMode::Output {
            storage.set_len(0)?;
        }
        self.finish(storage, path.into(), plan)
    }

    fn finish(
        &self,
        mut storage: Box<dyn Storage>,
        path: PathBuf,
        plan: OpenPlan,
    ) -> Result<Box<dyn BasicFile>> {
        if plan.mode == OpenMode::Append {
            storage.seek(SeekFrom::End(0))?;
        }

        log::debug!(
            "opened {} for {} (access {}, record length {})",
            path.display(),
            plan.mode,
            plan.access,
            plan.record_length
        );

        let core = FileCore::new(storage, path, plan.mode, plan.access, plan.record_length);
        Ok(match plan.mode {
            OpenMode::Random => Box::new(RecordFile::new(core)),
            OpenMode::Binary => Box::new(BinaryFile::new(core)),
            OpenMode::Input => Box::new(SequentialReader::new(core)),
            OpenMode::Output | OpenMode::Append => Box::new(SequentialWriter::new(
                core,
                self.settings.zone_width,
                self.settings.line_terminator.clone(),
            )),
        })
    }
}
