//! Output and Append modes: column-tracked `Print` and `Write`.
//!
//! Every statement is formatted into a [`LineBuilder`] first and written in one go, so
//! a value without a literal form fails before anything reaches the file and the
//! column only moves once the bytes are out.

use crate::error::{FileIoError, Result};
use crate::file_handle::core::FileCore;
use crate::file_handle::{delegate_to_core, BasicFile};
use crate::format::{print_literal, write_literal};
use crate::value::Value;
use std::iter;

const MAX_WIDTH: i32 = 255;

/// Legacy `Loc` unit for text files
const BLOCK_SIZE: u64 = 128;

/// A file opened for Output or Append.
#[derive(Debug)]
pub struct SequentialWriter {
    core: FileCore,
    /// 0-based output column, reset by every line break
    column: usize,
    /// 0 means unlimited
    width: usize,
    zone_width: usize,
    line_terminator: String,
}

/// Text of one statement plus the column it leaves behind
struct LineBuilder<'a> {
    text: String,
    column: usize,
    width: usize,
    zone_width: usize,
    terminator: &'a str,
}

impl LineBuilder<'_> {
    fn new_line(&mut self) {
        self.text.push_str(self.terminator);
        self.column = 0;
    }

    /// Append without wrapping; the column moves by the UTF-8 byte length
    fn push(&mut self, text: &str) {
        self.text.push_str(text);
        self.column += text.len();
    }

    fn spaces(&mut self, count: usize) {
        self.text.extend(iter::repeat(' ').take(count));
        self.column += count;
    }

    /// Append, breaking the line whenever the width is reached
    fn push_wrapped(&mut self, text: &str) {
        if self.width == 0 {
            self.push(text);
            return;
        }

        let mut rest = text;
        while !rest.is_empty() {
            let room = self.width.saturating_sub(self.column);
            if rest.len() <= room {
                self.push(rest);
                return;
            }

            let mut split = room;
            while !rest.is_char_boundary(split) {
                split -= 1;
            }
            if split == 0 {
                if self.column > 0 {
                    self.new_line();
                    continue;
                }
                // A character wider than the whole line still has to go somewhere
                split = rest.chars().next().map_or(rest.len(), char::len_utf8);
            }

            self.push(&rest[..split]);
            self.new_line();
            rest = &rest[split..];
        }
    }

    fn spc(&mut self, count: i16) {
        let mut count = count.max(0) as usize;
        if self.width > 0 {
            count %= self.width;
        }
        self.push_wrapped(&" ".repeat(count));
    }

    /// `Tab(n)` pads to 1-based column `n`, or breaks the line when that column is
    /// already behind. `Tab` without a column moves to the next print zone.
    fn tab(&mut self, column: Option<i16>) {
        let target = match column {
            Some(column) => {
                let mut column = column.max(1) as usize;
                if self.width > 0 {
                    column = (column - 1) % self.width + 1;
                }
                column - 1
            }
            None => {
                let next_zone = (self.column / self.zone_width + 1) * self.zone_width;
                if self.width > 0 && next_zone > self.width {
                    self.new_line();
                    return;
                }
                next_zone
            }
        };

        if target < self.column {
            self.new_line();
        } else {
            self.spaces(target - self.column);
        }
    }

    fn finish(self) -> (String, usize) {
        (self.text, self.column)
    }
}

fn is_directive(value: &Value) -> bool {
    matches!(value, Value::Tab(_) | Value::Spc(_))
}

impl SequentialWriter {
    pub(crate) fn new(core: FileCore, zone_width: usize, line_terminator: impl Into<String>) -> Self {
        Self {
            core,
            column: 0,
            width: 0,
            zone_width: zone_width.max(1),
            line_terminator: line_terminator.into(),
        }
    }

    /// Current 0-based output column
    pub fn column(&self) -> usize {
        self.column
    }

    fn line(&self) -> LineBuilder<'_> {
        LineBuilder {
            text: String::new(),
            column: self.column,
            width: self.width,
            zone_width: self.zone_width,
            terminator: &self.line_terminator,
        }
    }

    fn commit(&mut self, (text, column): (String, usize)) -> Result<()> {
        self.core.write_all(text.as_bytes())?;
        self.column = column;
        Ok(())
    }

    /// `Write` / `WriteLine`: delimited literals separated by commas
    fn format_write(&self, values: &[Value], end_of_line: bool) -> Result<(String, usize)> {
        let mut line = self.line();
        let last = values.len().saturating_sub(1);
        for (index, value) in values.iter().enumerate() {
            match value {
                Value::Spc(count) => line.spc(*count),
                Value::Tab(column) => line.tab(*column),
                other => {
                    line.push(&write_literal(other)?);
                    if index != last {
                        line.push(",");
                    }
                }
            }
        }
        if end_of_line {
            line.new_line();
        }
        Ok(line.finish())
    }

    /// `Print`: readable text laid out in zones, wrapped at the width
    fn format_print(&self, values: &[Value]) -> Result<(String, usize)> {
        let mut line = self.line();
        for (index, value) in values.iter().enumerate() {
            match value {
                Value::Spc(count) => line.spc(*count),
                Value::Tab(column) => line.tab(*column),
                other => {
                    line.push_wrapped(&print_literal(other)?);
                    if values.get(index + 1).is_some_and(|next| !is_directive(next)) {
                        line.tab(None);
                    }
                }
            }
        }
        Ok(line.finish())
    }

    fn position(&mut self) -> Result<u64> {
        self.core.position()
    }
}

impl BasicFile for SequentialWriter {
    delegate_to_core!(core);

    fn close(&mut self) -> Result<()> {
        self.core.close()
    }

    fn location(&mut self) -> Result<i64> {
        Ok((self.position()? / BLOCK_SIZE) as i64)
    }

    fn is_end_of_file(&mut self) -> Result<bool> {
        self.core.is_end_of_file()
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
        self.core.set_position(offset)
    }

    fn print(&mut self, values: &[Value]) -> Result<()> {
        self.core.check_write_permission()?;
        let line = self.format_print(values)?;
        self.commit(line)
    }

    fn print_line(&mut self, values: &[Value]) -> Result<()> {
        self.core.check_write_permission()?;
        let (mut text, mut column) = self.format_print(values)?;
        let explicit_blank = matches!(values, [Value::String(only)] if only.is_empty());
        if column != 0 || values.is_empty() || explicit_blank {
            text.push_str(&self.line_terminator);
            column = 0;
        }
        self.commit((text, column))
    }

    fn write(&mut self, values: &[Value]) -> Result<()> {
        self.core.check_write_permission()?;
        let line = self.format_write(values, false)?;
        self.commit(line)
    }

    fn write_line(&mut self, values: &[Value]) -> Result<()> {
        self.core.check_write_permission()?;
        let line = self.format_write(values, true)?;
        self.commit(line)
    }

    fn set_width(&mut self, width: i32) -> Result<()> {
        if !(0..=MAX_WIDTH).contains(&width) {
            return Err(FileIoError::illegal_call(format!(
                "width {width} is outside 0..={MAX_WIDTH}"
            )));
        }
        log::debug!("{}: width set to {}", self.core.path().display(), width);
        self.width = width as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_handle::{OpenAccess, OpenMode};
    use crate::storage::MemoryStorage;
    use crate::value::ValueArray;
    use std::io::{Read, Seek, SeekFrom};
    use std::path::PathBuf;

    fn writer() -> SequentialWriter {
        SequentialWriter::new(
            FileCore::new(
                Box::new(MemoryStorage::new()),
                PathBuf::from("report.txt"),
                OpenMode::Output,
                OpenAccess::Write,
                0,
            ),
            14,
            "\r\n",
        )
    }

    fn contents(file: &mut SequentialWriter) -> String {
        let storage = file.core.storage().unwrap();
        let end = storage.stream_position().unwrap();
        let mut text = String::new();
        storage.seek(SeekFrom::Start(0)).unwrap();
        storage.read_to_string(&mut text).unwrap();
        storage.seek(SeekFrom::Start(end)).unwrap();
        text
    }

    #[test]
    fn test_write_line_literals() {
        let mut file = writer();
        file.write_line(&[Value::Bool(true), Value::from("ab"), Value::Double(3.5)])
            .unwrap();
        assert_eq!(contents(&mut file), "#True#,\"ab\",3.5\r\n");
        assert_eq!(file.column(), 0);
    }

    #[test]
    fn test_write_without_line_end_keeps_column() {
        let mut file = writer();
        file.write(&[Value::Integer(1), Value::Char('x')]).unwrap();
        assert_eq!(contents(&mut file), "1,\"x\"");
        assert_eq!(file.column(), 5);

        file.write_line(&[]).unwrap();
        file.write(&[]).unwrap();
        assert_eq!(contents(&mut file), "1,\"x\"\r\n");
        assert_eq!(file.column(), 0);
    }

    #[test]
    fn test_write_directives_take_no_comma() {
        let mut file = writer();
        file.write_line(&[Value::from("a"), Value::Spc(2), Value::Integer(1)])
            .unwrap();
        assert_eq!(contents(&mut file), "\"a\",  1\r\n");
    }

    #[test]
    fn test_unsupported_value_writes_nothing() {
        let mut file = writer();
        file.print(&[Value::from("ok")]).unwrap();
        let array = Value::Array(ValueArray::from_vec(vec![Value::Integer(1)]));
        assert!(matches!(
            file.write_line(&[Value::Integer(1), array]),
            Err(FileIoError::UnsupportedIoType { type_name: "Array" })
        ));
        assert_eq!(contents(&mut file), "ok");
        assert_eq!(file.column(), 2);
    }

    #[test]
    fn test_print_wraps_at_width() {
        let mut file = writer();
        file.set_width(14).unwrap();
        file.print(&[Value::from("1234567890123456")]).unwrap();
        let text = contents(&mut file);
        assert_eq!(text, "12345678901234\r\n56");
        assert!(text.split("\r\n").all(|line| line.len() <= 14));
        assert_eq!(file.column(), 2);
    }

    #[test]
    fn test_tab_behind_column_breaks_line() {
        let mut file = writer();
        file.set_width(14).unwrap();
        file.print(&[Value::from("1234567890")]).unwrap();
        assert_eq!(file.column(), 10);

        file.print(&[Value::Tab(Some(5))]).unwrap();
        assert_eq!(contents(&mut file), "1234567890\r\n");
        assert_eq!(file.column(), 0);
    }

    #[test]
    fn test_tab_ahead_pads() {
        let mut file = writer();
        file.print(&[Value::from("ab"), Value::Tab(Some(6)), Value::from("c")])
            .unwrap();
        assert_eq!(contents(&mut file), "ab   c");

        let mut file = writer();
        file.print(&[Value::from("ab"), Value::Tab(None), Value::from("c")])
            .unwrap();
        assert_eq!(contents(&mut file), format!("ab{}c", " ".repeat(12)));
    }

    #[test]
    fn test_print_zones() {
        let mut file = writer();
        file.print_line(&[Value::Integer(1), Value::from("x"), Value::Integer(-2)])
            .unwrap();
        let expected = format!(" 1 {}x{}-2 \r\n", " ".repeat(11), " ".repeat(13));
        assert_eq!(contents(&mut file), expected);
        assert_eq!(file.column(), 0);
    }

    #[test]
    fn test_spc_wraps_modulo_width() {
        let mut file = writer();
        file.print(&[Value::Spc(3), Value::from("x")]).unwrap();
        assert_eq!(contents(&mut file), "   x");

        let mut file = writer();
        file.set_width(5).unwrap();
        file.print(&[Value::Spc(7), Value::from("x")]).unwrap();
        assert_eq!(contents(&mut file), "  x");
    }

    #[test]
    fn test_spc_breaks_at_width() {
        let mut file = writer();
        file.set_width(5).unwrap();
        file.print(&[Value::from("abcd"), Value::Spc(4), Value::from("x")])
            .unwrap();
        assert_eq!(contents(&mut file), "abcd \r\n   x");
        assert_eq!(file.column(), 4);
    }

    #[test]
    fn test_print_line_termination_rules() {
        let mut file = writer();
        file.print_line(&[]).unwrap();
        file.print_line(&[Value::from("")]).unwrap();
        file.print_line(&[Value::from("a")]).unwrap();
        assert_eq!(contents(&mut file), "\r\n\r\na\r\n");

        // a directive that already broke the line adds no second break
        let mut file = writer();
        file.print(&[Value::from("abc")]).unwrap();
        file.print_line(&[Value::Tab(Some(1))]).unwrap();
        assert_eq!(contents(&mut file), "abc\r\n");
    }

    #[test]
    fn test_custom_line_terminator() {
        let mut file = SequentialWriter::new(
            FileCore::new(
                Box::new(MemoryStorage::new()),
                PathBuf::from("unix.txt"),
                OpenMode::Output,
                OpenAccess::Write,
                0,
            ),
            8,
            "\n",
        );
        file.print_line(&[Value::from("a"), Value::from("b")]).unwrap();
        assert_eq!(contents(&mut file), format!("a{}b\n", " ".repeat(7)));
    }

    #[test]
    fn test_width_limits() {
        let mut file = writer();
        assert!(matches!(
            file.set_width(256),
            Err(FileIoError::IllegalFunctionCall { .. })
        ));
        assert!(file.set_width(-1).is_err());
        file.set_width(255).unwrap();
        file.set_width(0).unwrap();
    }

    #[test]
    fn test_seek_grows_file_and_location() {
        let mut file = writer();
        file.print(&[Value::from("x".repeat(300))]).unwrap();
        assert_eq!(file.location().unwrap(), 2);
        assert_eq!(file.seek().unwrap(), 301);

        file.seek_to(401).unwrap();
        assert_eq!(file.length().unwrap(), 400);
        file.print(&[Value::from("y")]).unwrap();
        assert_eq!(file.length().unwrap(), 401);
        assert!(file.seek_to(0).is_err());
    }

    #[test]
    fn test_reading_is_wrong_mode() {
        let mut file = writer();
        let mut target = Value::Empty;
        assert!(matches!(
            file.input(&mut target),
            Err(FileIoError::WrongFileMode {
                operation: "Input",
                mode: OpenMode::Output
            })
        ));
        assert!(file.get(&mut target, 1, false).is_err());
        assert!(file.line_input().is_err());
    }
}
