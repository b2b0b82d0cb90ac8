//! Values exchanged with file statements.
//!
//! `Get`/`Put` take a destination or source [`Value`] whose variant selects the binary
//! layout, and `Print`/`Write` take a slice of values that may include the [`Value::Tab`]
//! and [`Value::Spc`] formatting directives.

use crate::error::{FileIoError, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// A scalar, string, array or formatting directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Uninitialized; Input infers the type from the token
    Empty,
    /// Database null, written as `#NULL#`
    Null,
    Bool(bool),
    Byte(u8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    Date(NaiveDateTime),
    Char(char),
    String(String),
    Array(ValueArray),
    /// Move to a column; `None` moves to the next print zone
    Tab(Option<i16>),
    /// Emit the given number of spaces
    Spc(i16),
}

impl Value {
    /// Name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "Empty",
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Byte(_) => "Byte",
            Value::Short(_) => "Short",
            Value::Integer(_) => "Integer",
            Value::Long(_) => "Long",
            Value::Single(_) => "Single",
            Value::Double(_) => "Double",
            Value::Decimal(_) => "Decimal",
            Value::Date(_) => "Date",
            Value::Char(_) => "Char",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Tab(_) => "TabInfo",
            Value::Spc(_) => "SpcInfo",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Short(_)
                | Value::Integer(_)
                | Value::Long(_)
                | Value::Single(_)
                | Value::Double(_)
                | Value::Decimal(_)
        )
    }

    pub(crate) fn unsupported(&self) -> FileIoError {
        FileIoError::UnsupportedIoType {
            type_name: self.type_name(),
        }
    }
}

/// A rank-1 or rank-2 (or, to be rejected, higher) array stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueArray {
    dimensions: Vec<usize>,
    items: Vec<Value>,
}

impl ValueArray {
    /// Build an array with explicit dimensions.
    ///
    /// Fails with `InvalidArgument` when the element count does not match the
    /// product of the dimensions.
    pub fn with_dimensions(dimensions: Vec<usize>, items: Vec<Value>) -> Result<Self> {
        let expected: usize = dimensions.iter().product();
        if dimensions.is_empty() || expected != items.len() {
            return Err(FileIoError::invalid_argument(format!(
                "array of dimensions {:?} cannot hold {} elements",
                dimensions,
                items.len()
            )));
        }
        Ok(Self { dimensions, items })
    }

    /// One-dimensional array
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            dimensions: vec![items.len()],
            items,
        }
    }

    /// Two-dimensional array, `items` in row-major order
    pub fn matrix(rows: usize, columns: usize, items: Vec<Value>) -> Result<Self> {
        Self::with_dimensions(vec![rows, columns], items)
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Value] {
        &mut self.items
    }
}

/// Rust types that map onto a single [`Value`] variant.
pub trait FieldType: Sized {
    const TYPE_NAME: &'static str;

    /// Destination value whose variant selects the layout on `Get`/`Input`
    fn placeholder() -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! field_type {
    ($ty:ty, $variant:ident, $name:literal, $zero:expr) => {
        impl FieldType for $ty {
            const TYPE_NAME: &'static str = $name;

            fn placeholder() -> Value {
                Value::$variant($zero)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

field_type!(bool, Bool, "Boolean", false);
field_type!(u8, Byte, "Byte", 0);
field_type!(i16, Short, "Short", 0);
field_type!(i32, Integer, "Integer", 0);
field_type!(i64, Long, "Long", 0);
field_type!(f32, Single, "Single", 0.0);
field_type!(f64, Double, "Double", 0.0);
field_type!(Decimal, Decimal, "Decimal", Decimal::ZERO);
field_type!(NaiveDateTime, Date, "Date", NaiveDateTime::default());
field_type!(char, Char, "Char", '\0');
field_type!(String, String, "String", String::new());

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<ValueArray> for Value {
    fn from(value: ValueArray) -> Self {
        Value::Array(value)
    }
}
