//! Legacy file numbers (`#1` .. `#255`) mapped to open handles.

use crate::error::{FileIoError, Result};
use crate::file_handle::{BasicFile, FileHandleFactory, OpenAccess, OpenMode};
use std::collections::BTreeMap;
use std::path::Path;

pub const MAX_FILE_NUMBER: i32 = 255;

/// The set of files a program has open, keyed by file number.
#[derive(Debug, Default)]
pub struct FileTable {
    factory: FileHandleFactory,
    handles: BTreeMap<i32, Box<dyn BasicFile>>,
}

fn check_number(number: i32) -> Result<()> {
    if (1..=MAX_FILE_NUMBER).contains(&number) {
        Ok(())
    } else {
        Err(FileIoError::BadFileNumber { number })
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(factory: FileHandleFactory) -> Self {
        Self {
            factory,
            handles: BTreeMap::new(),
        }
    }

    /// Lowest file number not in use (FreeFile)
    pub fn free_file(&self) -> Result<i32> {
        (1..=MAX_FILE_NUMBER)
            .find(|number| !self.handles.contains_key(number))
            .ok_or(FileIoError::TooManyFiles)
    }

    pub fn is_open(&self, number: i32) -> bool {
        self.handles.contains_key(&number)
    }

    /// Open `path` under `number`.
    ///
    /// A path may be open under several numbers only when every one of them is Input.
    pub fn open(
        &mut self,
        number: i32,
        path: impl AsRef<Path>,
        mode: OpenMode,
        access: Option<OpenAccess>,
        record_length: i32,
    ) -> Result<()> {
        let path = path.as_ref();
        check_number(number)?;
        if self.handles.contains_key(&number) {
            return Err(FileIoError::FileAlreadyOpen {
                path: path.to_path_buf(),
            });
        }
        let conflict = self.handles.values().any(|open| {
            (mode != OpenMode::Input || open.mode() != OpenMode::Input)
                && same_file(open.path(), path)
        });
        if conflict {
            return Err(FileIoError::FileAlreadyOpen {
                path: path.to_path_buf(),
            });
        }

        let handle = self.factory.open(path, mode, access, record_length)?;
        self.handles.insert(number, handle);
        Ok(())
    }

    /// The handle open under `number`
    pub fn file(&mut self, number: i32) -> Result<&mut (dyn BasicFile + 'static)> {
        check_number(number)?;
        self.handles
            .get_mut(&number)
            .map(|handle| handle.as_mut())
            .ok_or(FileIoError::BadFileNumber { number })
    }

    pub fn close(&mut self, number: i32) -> Result<()> {
        check_number(number)?;
        let mut handle = self
            .handles
            .remove(&number)
            .ok_or(FileIoError::BadFileNumber { number })?;
        handle.close()
    }

    /// Close every open file (Reset). Every handle is closed even when one fails; the
    /// first failure is returned.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for (number, mut handle) in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.close() {
                log::debug!("closing file #{number} failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// EOF(number)
    pub fn eof(&mut self, number: i32) -> Result<bool> {
        self.file(number)?.is_end_of_file()
    }

    /// LOF(number)
    pub fn lof(&mut self, number: i32) -> Result<u64> {
        self.file(number)?.length()
    }

    /// Loc(number)
    pub fn loc(&mut self, number: i32) -> Result<i64> {
        self.file(number)?.location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use tempfile::TempDir;

    #[test]
    fn test_free_file_and_numbers() {
        let dir = TempDir::new().unwrap();
        let mut table = FileTable::new();
        assert_eq!(table.free_file().unwrap(), 1);

        table
            .open(1, dir.path().join("a.dat"), OpenMode::Random, None, 16)
            .unwrap();
        assert_eq!(table.free_file().unwrap(), 2);
        assert!(table.is_open(1));

        assert!(matches!(
            table.open(0, dir.path().join("b.dat"), OpenMode::Random, None, 16),
            Err(FileIoError::BadFileNumber { number: 0 })
        ));
        assert!(matches!(
            table.open(1, dir.path().join("b.dat"), OpenMode::Random, None, 16),
            Err(FileIoError::FileAlreadyOpen { .. })
        ));
        assert!(matches!(
            table.file(2),
            Err(FileIoError::BadFileNumber { number: 2 })
        ));
    }

    #[test]
    fn test_same_path_conflicts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.txt");
        std::fs::write(&path, "1,2\r\n").unwrap();

        let mut table = FileTable::new();
        table.open(1, &path, OpenMode::Input, None, -1).unwrap();
        table.open(2, &path, OpenMode::Input, None, -1).unwrap();
        assert!(matches!(
            table.open(3, &path, OpenMode::Append, None, -1),
            Err(FileIoError::FileAlreadyOpen { .. })
        ));

        assert_eq!(table.file(1).unwrap().input_as::<i32>().unwrap(), 1);
        assert_eq!(table.file(2).unwrap().input_as::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_eof_lof_loc_and_close() {
        let dir = TempDir::new().unwrap();
        let mut table = FileTable::new();
        let number = table.free_file().unwrap();
        table
            .open(number, dir.path().join("r.dat"), OpenMode::Random, None, 4)
            .unwrap();

        table.file(number).unwrap().put(&Value::Integer(9), 3, false).unwrap();
        assert_eq!(table.lof(number).unwrap(), 12);
        assert_eq!(table.loc(number).unwrap(), 3);
        assert!(table.eof(number).unwrap());

        table.close(number).unwrap();
        assert!(!table.is_open(number));
        assert!(matches!(
            table.close(number),
            Err(FileIoError::BadFileNumber { .. })
        ));
    }

    #[test]
    fn test_close_all() {
        let dir = TempDir::new().unwrap();
        let mut table = FileTable::new();
        for number in 1..=3 {
            table
                .open(number, dir.path().join(format!("{number}.bin")), OpenMode::Binary, None, -1)
                .unwrap();
        }
        table.close_all().unwrap();
        assert_eq!(table.free_file().unwrap(), 1);
    }

    #[test]
    fn test_too_many_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("many.txt");
        std::fs::write(&path, "x").unwrap();

        let mut table = FileTable::new();
        for number in 1..=MAX_FILE_NUMBER {
            table.open(number, &path, OpenMode::Input, None, -1).unwrap();
        }
        assert!(matches!(table.free_file(), Err(FileIoError::TooManyFiles)));
        table.close_all().unwrap();
    }
}
