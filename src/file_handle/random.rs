//! Random mode: typed binary fields inside fixed-length records.
//!
//! Scalars use their native little-endian width (Boolean, Byte and Char 1 byte, Short 2,
//! Integer and Single 4, Long and Double 8, Decimal 16). Dates are stored as the 8-byte
//! OLE automation double. Variable-length strings carry a 2-byte length prefix; fixed
//! strings are stored bare, one Latin-1 byte per character.

use crate::convert::{
    decimal_from_bytes, decimal_to_bytes, from_oa_date, latin1_decode, latin1_encode,
    to_oa_date,
};
use crate::error::{FileIoError, Result};
use crate::file_handle::core::FileCore;
use crate::file_handle::{delegate_to_core, BasicFile};
use crate::value::{Value, ValueArray};

/// How variable-length (non-fixed) strings are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringLayout {
    /// 2-byte length, then the characters (Random mode)
    LengthPrefixed,
    /// Characters only; reads take the destination's length (Binary mode)
    Raw,
}

/// A file opened for Random access.
#[derive(Debug)]
pub struct RecordFile {
    pub(crate) core: FileCore,
    layout: StringLayout,
}

/// Copy a field-sized slice into a fixed array
fn le<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(&bytes[..N]);
    array
}

/// Stored width of a scalar, `None` for anything that is not a scalar
fn scalar_width(value: &Value) -> Option<usize> {
    Some(match value {
        Value::Bool(_) | Value::Byte(_) | Value::Char(_) => 1,
        Value::Short(_) => 2,
        Value::Integer(_) | Value::Single(_) => 4,
        Value::Long(_) | Value::Double(_) | Value::Date(_) => 8,
        Value::Decimal(_) => 16,
        _ => return None,
    })
}

fn encode_scalar(value: &Value) -> Option<Vec<u8>> {
    Some(match value {
        Value::Bool(v) => vec![u8::from(*v)],
        Value::Byte(v) => vec![*v],
        Value::Char(v) => latin1_encode(&v.to_string()),
        Value::Short(v) => v.to_le_bytes().to_vec(),
        Value::Integer(v) => v.to_le_bytes().to_vec(),
        Value::Long(v) => v.to_le_bytes().to_vec(),
        Value::Single(v) => v.to_le_bytes().to_vec(),
        Value::Double(v) => v.to_le_bytes().to_vec(),
        Value::Decimal(v) => decimal_to_bytes(v).to_vec(),
        Value::Date(v) => to_oa_date(v).to_le_bytes().to_vec(),
        _ => return None,
    })
}

/// Decode `bytes` (exactly `scalar_width(target)` long) into the variant of `target`
fn decode_scalar(target: &Value, bytes: &[u8]) -> Result<Value> {
    Ok(match target {
        Value::Bool(_) => Value::Bool(bytes[0] != 0),
        Value::Byte(_) => Value::Byte(bytes[0]),
        Value::Char(_) => Value::Char(char::from(bytes[0])),
        Value::Short(_) => Value::Short(i16::from_le_bytes(le(bytes))),
        Value::Integer(_) => Value::Integer(i32::from_le_bytes(le(bytes))),
        Value::Long(_) => Value::Long(i64::from_le_bytes(le(bytes))),
        Value::Single(_) => Value::Single(f32::from_le_bytes(le(bytes))),
        Value::Double(_) => Value::Double(f64::from_le_bytes(le(bytes))),
        Value::Decimal(_) => Value::Decimal(decimal_from_bytes(le(bytes))),
        Value::Date(_) => Value::Date(from_oa_date(f64::from_le_bytes(le(bytes)))?),
        other => return Err(other.unsupported()),
    })
}

fn check_rank(array: &ValueArray) -> Result<()> {
    match array.rank() {
        1 | 2 => Ok(()),
        rank => Err(FileIoError::UnsupportedArrayDimensions { rank }),
    }
}

/// Common width of a fixed-length string array, taken from its first element.
///
/// `None` when the array does not hold strings.
fn fixed_string_width(array: &ValueArray) -> Result<Option<usize>> {
    match array.items().first() {
        Some(Value::String(first)) => {
            let width = first.chars().count();
            if width == 0 {
                return Err(FileIoError::InvalidFixedLengthString);
            }
            Ok(Some(width))
        }
        _ => Ok(None),
    }
}

/// Space-pad or cut `text` to exactly `width` characters
fn fit_to_width(text: &str, width: usize) -> String {
    let mut fitted: String = text.chars().take(width).collect();
    let short = width - fitted.chars().count();
    fitted.extend(std::iter::repeat(' ').take(short));
    fitted
}

impl RecordFile {
    pub(crate) fn new(core: FileCore) -> Self {
        Self::with_layout(core, StringLayout::LengthPrefixed)
    }

    pub(crate) fn with_layout(core: FileCore, layout: StringLayout) -> Self {
        Self { core, layout }
    }

    fn encode_string(&self, text: &str, fixed_length: bool) -> Result<Vec<u8>> {
        let bytes = latin1_encode(text);
        if fixed_length || self.layout == StringLayout::Raw {
            return Ok(bytes);
        }

        let prefix = u16::try_from(bytes.len()).map_err(|_| FileIoError::BadRecordLength {
            length: bytes.len() as u64 + 2,
            record_length: self.core.record_length(),
        })?;
        let mut field = Vec::with_capacity(bytes.len() + 2);
        field.extend_from_slice(&prefix.to_le_bytes());
        field.extend_from_slice(&bytes);
        Ok(field)
    }

    /// Encode a whole field up front so nothing is written unless all of it is valid.
    fn encode_field(&self, value: &Value, fixed_length: bool) -> Result<Vec<u8>> {
        if let Some(bytes) = encode_scalar(value) {
            return Ok(bytes);
        }
        match value {
            Value::String(text) => self.encode_string(text, fixed_length),
            Value::Array(array) => {
                check_rank(array)?;
                let width = if fixed_length {
                    fixed_string_width(array)?
                } else {
                    None
                };

                let mut bytes = Vec::new();
                for item in array.items() {
                    match (item, width) {
                        (Value::String(text), Some(width)) => {
                            bytes.extend(latin1_encode(&fit_to_width(text, width)));
                        }
                        (Value::Array(_), _) => return Err(item.unsupported()),
                        _ => bytes.extend(self.encode_field(item, false)?),
                    }
                }
                Ok(bytes)
            }
            other => Err(other.unsupported()),
        }
    }

    /// Reject destinations that cannot be read before the cursor moves
    fn check_target(target: &Value, fixed_length: bool) -> Result<()> {
        match target {
            Value::String(_) => Ok(()),
            Value::Array(array) => {
                check_rank(array)?;
                if fixed_length {
                    fixed_string_width(array)?;
                }
                match array
                    .items()
                    .iter()
                    .find(|item| !matches!(item, Value::String(_)) && scalar_width(item).is_none())
                {
                    Some(item) => Err(item.unsupported()),
                    None => Ok(()),
                }
            }
            other if scalar_width(other).is_some() => Ok(()),
            other => Err(other.unsupported()),
        }
    }

    fn read_string(&mut self, current: &str, fixed_width: Option<usize>) -> Result<String> {
        let length = match fixed_width {
            Some(width) => width,
            None if !current.is_empty() => current.chars().count(),
            None if self.layout == StringLayout::Raw => 0,
            None => {
                let mut prefix = [0u8; 2];
                self.core.read_field(&mut prefix)?;
                usize::from(u16::from_le_bytes(prefix))
            }
        };

        let mut bytes = vec![0u8; length];
        self.core.read_field(&mut bytes)?;
        Ok(latin1_decode(&bytes))
    }

    fn read_into(&mut self, target: &mut Value, fixed_length: bool) -> Result<()> {
        match target {
            Value::String(text) => {
                let read = self.read_string(text, None)?;
                *text = read;
            }
            Value::Array(array) => {
                let width = if fixed_length {
                    fixed_string_width(array)?
                } else {
                    None
                };
                for item in array.items_mut() {
                    match item {
                        Value::String(text) => {
                            let read = self.read_string(text, width)?;
                            *text = read;
                        }
                        scalar => self.read_into(scalar, false)?,
                    }
                }
            }
            scalar => {
                let width = scalar_width(scalar).ok_or_else(|| scalar.unsupported())?;
                let mut bytes = vec![0u8; width];
                self.core.read_field(&mut bytes)?;
                *scalar = decode_scalar(scalar, &bytes)?;
            }
        }
        Ok(())
    }

    pub(crate) fn get_field(
        &mut self,
        target: &mut Value,
        record_number: i64,
        fixed_length: bool,
    ) -> Result<()> {
        self.core.check_read_permission()?;
        Self::check_target(target, fixed_length)?;
        self.core.set_record(record_number)?;
        self.read_into(target, fixed_length)
    }

    pub(crate) fn put_field(
        &mut self,
        value: &Value,
        record_number: i64,
        fixed_length: bool,
    ) -> Result<()> {
        self.core.check_write_permission()?;
        let bytes = self.encode_field(value, fixed_length)?;
        let saved = self.core.cursor()?;
        self.core.set_record(record_number)?;
        if let Err(e) = self.core.check_length(bytes.len() as u64) {
            self.core.restore_cursor(saved)?;
            return Err(e);
        }
        self.core.write_all(&bytes)
    }
}

impl BasicFile for RecordFile {
    delegate_to_core!(core);

    fn close(&mut self) -> Result<()> {
        self.core.close()
    }

    /// Last record touched: `position / record_length`
    fn location(&mut self) -> Result<i64> {
        let record_length = self.core.record_length();
        if record_length <= 0 {
            return Err(FileIoError::internal("Random file without a record length"));
        }
        Ok((self.core.position()? / record_length as u64) as i64)
    }

    fn is_end_of_file(&mut self) -> Result<bool> {
        self.core.is_end_of_file()
    }

    /// Current record number, rounded up: `ceil(position / record_length)`
    fn seek(&mut self) -> Result<i64> {
        let record_length = self.core.record_length();
        if record_length == 0 {
            return Err(FileIoError::internal("record length is zero"));
        }
        let position = self.core.position()?;
        Ok(position.div_ceil(record_length.unsigned_abs() as u64) as i64)
    }

    /// Move the raw byte cursor, bypassing record arithmetic
    fn seek_to(&mut self, position: i64) -> Result<()> {
        if position < 0 {
            return Err(FileIoError::BadRecordNumber {
                record_number: position,
            });
        }
        self.core.set_position(position as u64)
    }

    fn get(&mut self, target: &mut Value, record_number: i64, fixed_length: bool) -> Result<()> {
        self.get_field(target, record_number, fixed_length)
    }

    fn put(&mut self, value: &Value, record_number: i64, fixed_length: bool) -> Result<()> {
        self.put_field(value, record_number, fixed_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_handle::{OpenAccess, OpenMode, CURRENT_RECORD};
    use crate::storage::MemoryStorage;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::path::PathBuf;

    fn record_file(record_length: i32) -> Box<dyn BasicFile> {
        Box::new(RecordFile::new(FileCore::new(
            Box::new(MemoryStorage::new()),
            PathBuf::from("records.dat"),
            OpenMode::Random,
            OpenAccess::ReadWrite,
            record_length,
        )))
    }

    #[test]
    fn test_scalar_round_trips() {
        let date = NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let values = vec![
            Value::Bool(true),
            Value::Byte(200),
            Value::Short(-12345),
            Value::Integer(i32::MIN),
            Value::Long(1 << 40),
            Value::Single(1.5),
            Value::Double(-2.25e-3),
            Value::Decimal(Decimal::new(-98765, 3)),
            Value::Date(date),
            Value::Char('Z'),
        ];

        let mut file = record_file(16);
        for (index, value) in values.iter().enumerate() {
            file.put(value, index as i64 + 1, false).unwrap();
        }
        for (index, value) in values.iter().enumerate() {
            let mut target = match value {
                Value::Bool(_) => Value::Bool(false),
                Value::Char(_) => Value::Char(' '),
                Value::Date(_) => Value::Date(Default::default()),
                other => crate::convert::zero_like(other),
            };
            file.get(&mut target, index as i64 + 1, false).unwrap();
            assert_eq!(&target, value);
        }
    }

    #[test]
    fn test_typed_helpers() {
        let mut file = record_file(8);
        file.put(&Value::from(42i32), 3, false).unwrap();
        assert_eq!(file.get_as::<i32>(3).unwrap(), 42);
        assert_eq!(file.length().unwrap(), 20);
    }

    #[test]
    fn test_variable_string_uses_length_prefix() {
        let mut file = record_file(10);
        file.put(&Value::from("hello"), 1, false).unwrap();
        assert_eq!(file.get_as::<String>(1).unwrap(), "hello");

        // 2 + 9 bytes do not fit in 10
        assert!(matches!(
            file.put(&Value::from("123456789"), 2, false),
            Err(FileIoError::BadRecordLength { length: 11, .. })
        ));
        assert_eq!(file.length().unwrap(), 7);
    }

    #[test]
    fn test_rejected_put_keeps_cursor() {
        let mut file = record_file(10);
        file.put(&Value::Integer(1), 1, false).unwrap();
        assert!(matches!(
            file.put(&Value::from("123456789"), 3, false),
            Err(FileIoError::BadRecordLength { length: 11, .. })
        ));
        assert_eq!(file.seek().unwrap(), 1);

        // record 0 still continues record 1
        file.put(&Value::Short(7), 0, false).unwrap();
        assert_eq!(file.length().unwrap(), 6);
        assert_eq!(file.get_as::<i32>(1).unwrap(), 1);
        assert_eq!(file.get_as::<i16>(0).unwrap(), 7);
    }

    #[test]
    fn test_fixed_string_round_trip() {
        let mut file = record_file(10);
        file.put(&Value::from("ABCDEFGHIJ"), 2, true).unwrap();
        assert_eq!(file.get_fixed_string(10, 2).unwrap(), "ABCDEFGHIJ");

        let mut target = Value::from("xxx");
        file.get(&mut target, 2, true).unwrap();
        assert_eq!(target, Value::from("ABC"));
    }

    #[test]
    fn test_fixed_string_too_long_fails() {
        let mut file = record_file(10);
        assert!(matches!(
            file.put(&Value::from("ABCDEFGHIJK"), 1, true),
            Err(FileIoError::BadRecordLength { length: 11, record_length: 10 })
        ));
        assert_eq!(file.length().unwrap(), 0);
    }

    #[test]
    fn test_arrays_share_the_base_record() {
        let mut file = record_file(8);
        let matrix = ValueArray::matrix(
            2,
            2,
            vec![
                Value::Short(1),
                Value::Short(2),
                Value::Short(3),
                Value::Short(4),
            ],
        )
        .unwrap();
        file.put(&Value::Array(matrix.clone()), 2, false).unwrap();

        let mut target = Value::Array(
            ValueArray::matrix(2, 2, vec![Value::Short(0); 4]).unwrap(),
        );
        file.get(&mut target, 2, false).unwrap();
        assert_eq!(target, Value::Array(matrix));
        assert_eq!(file.length().unwrap(), 16);
    }

    #[test]
    fn test_fixed_string_array_uses_first_width() {
        let mut file = record_file(9);
        let names = ValueArray::from_vec(vec![
            Value::from("abc"),
            Value::from("de"),
            Value::from("fghij"),
        ]);
        file.put(&Value::Array(names), 1, true).unwrap();

        let mut target = Value::Array(ValueArray::from_vec(vec![Value::from("   "); 3]));
        file.get(&mut target, 1, true).unwrap();
        assert_eq!(
            target,
            Value::Array(ValueArray::from_vec(vec![
                Value::from("abc"),
                Value::from("de "),
                Value::from("fgh"),
            ]))
        );
    }

    #[test]
    fn test_zero_width_fixed_string_array() {
        let mut file = record_file(9);
        let empty = ValueArray::from_vec(vec![Value::from(""), Value::from("x")]);
        assert!(matches!(
            file.put(&Value::Array(empty), 1, true),
            Err(FileIoError::InvalidFixedLengthString)
        ));
    }

    #[test]
    fn test_rank_three_is_rejected() {
        let mut file = record_file(64);
        let cube = ValueArray::with_dimensions(vec![2, 2, 2], vec![Value::Byte(0); 8]).unwrap();
        assert!(matches!(
            file.put(&Value::Array(cube.clone()), 1, false),
            Err(FileIoError::UnsupportedArrayDimensions { rank: 3 })
        ));
        let mut target = Value::Array(cube);
        assert!(matches!(
            file.get(&mut target, 1, false),
            Err(FileIoError::UnsupportedArrayDimensions { rank: 3 })
        ));
    }

    #[test]
    fn test_unsupported_values() {
        let mut file = record_file(8);
        assert!(matches!(
            file.put(&Value::Null, 1, false),
            Err(FileIoError::UnsupportedIoType { type_name: "Null" })
        ));
        assert!(matches!(
            file.put(&Value::Spc(2), 1, false),
            Err(FileIoError::UnsupportedIoType { .. })
        ));
    }

    #[test]
    fn test_current_record_moves_to_next_boundary() {
        let mut file = record_file(10);
        file.put(&Value::Integer(1), 1, false).unwrap();
        file.put(&Value::Integer(2), CURRENT_RECORD, false).unwrap();
        assert_eq!(file.length().unwrap(), 14);
        assert_eq!(file.get_as::<i32>(2).unwrap(), 2);
    }

    #[test]
    fn test_record_zero_continues_inside_record() {
        let mut file = record_file(10);
        file.put(&Value::Integer(7), 1, false).unwrap();
        file.put(&Value::Integer(8), 0, false).unwrap();
        file.put(&Value::Short(9), 0, false).unwrap();
        assert!(matches!(
            file.put(&Value::Integer(10), 0, false),
            Err(FileIoError::BadRecordLength { .. })
        ));

        assert_eq!(file.get_as::<i32>(1).unwrap(), 7);
        assert_eq!(file.get_as::<i32>(0).unwrap(), 8);
        assert_eq!(file.get_as::<i16>(0).unwrap(), 9);
    }

    #[test]
    fn test_seek_and_location() {
        let mut file = record_file(10);
        assert_eq!(file.seek().unwrap(), 0);
        file.put(&Value::Integer(1), 3, false).unwrap();
        assert_eq!(file.seek().unwrap(), 3);
        assert_eq!(file.location().unwrap(), 2);

        file.seek_to(5).unwrap();
        assert_eq!(file.seek().unwrap(), 1);
        assert!(file.seek_to(-1).is_err());
    }

    #[test]
    fn test_reading_past_end_gives_zero_and_eof() {
        let mut file = record_file(4);
        file.put(&Value::Integer(5), 1, false).unwrap();
        assert!(file.is_end_of_file().unwrap());

        assert_eq!(file.get_as::<i32>(1).unwrap(), 5);
        assert_eq!(file.get_as::<i32>(2).unwrap(), 0);
        assert!(file.is_end_of_file().unwrap());
    }

    #[test]
    fn test_text_statements_are_wrong_mode() {
        let mut file = record_file(4);
        assert!(matches!(
            file.print(&[Value::Integer(1)]),
            Err(FileIoError::WrongFileMode { operation: "Print", mode: OpenMode::Random })
        ));
        let mut target = Value::Empty;
        assert!(matches!(
            file.input(&mut target),
            Err(FileIoError::WrongFileMode { .. })
        ));
        assert!(file.set_width(80).is_err());
    }
}
