//! Scalar conversions shared by the disciplines.
//!
//! Two token parsers live here on purpose: Binary-mode `Input` goes through the
//! lenient legacy parser ([`LegacyParser`]: `&H`/`&O` literals, rounding of fractional
//! values into integer fields, `#...#` markers) while Input-mode `Input` uses the strict
//! `FromStr` based [`StandardParser`].

use crate::error::{FileIoError, Result};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use std::str::FromStr;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Days between the OLE automation epoch (1899-12-30) and 1970-01-01
const OA_EPOCH_TO_UNIX_DAYS: i64 = 25_569;

/// Encode a date as an OLE automation date (days since 1899-12-30).
///
/// Dates before the epoch keep a positive time-of-day fraction, so -1.25 is
/// 1899-12-29 06:00.
pub fn to_oa_date(date: &NaiveDateTime) -> f64 {
    let mut millis = date.and_utc().timestamp_millis() + OA_EPOCH_TO_UNIX_DAYS * MILLIS_PER_DAY;
    if millis < 0 {
        let frac = millis % MILLIS_PER_DAY;
        if frac != 0 {
            millis -= (MILLIS_PER_DAY + frac) * 2;
        }
    }
    millis as f64 / MILLIS_PER_DAY as f64
}

/// Decode an OLE automation date.
pub fn from_oa_date(value: f64) -> Result<NaiveDateTime> {
    // 0001-01-01 .. 9999-12-31
    if !(value > -657_435.0 && value < 2_958_466.0) {
        return Err(FileIoError::invalid_argument(format!(
            "{value} is not a valid OLE automation date"
        )));
    }

    let rounding = if value >= 0.0 { 0.5 } else { -0.5 };
    let mut millis = (value * MILLIS_PER_DAY as f64 + rounding) as i64;
    if millis < 0 {
        millis -= (millis % MILLIS_PER_DAY) * 2;
    }
    millis -= OA_EPOCH_TO_UNIX_DAYS * MILLIS_PER_DAY;

    DateTime::from_timestamp_millis(millis)
        .map(|date| date.naive_utc())
        .ok_or_else(|| FileIoError::invalid_argument(format!("{value} is out of date range")))
}

/// 16-byte decimal layout: lo, mid, hi, flags (each little-endian u32).
pub fn decimal_to_bytes(value: &Decimal) -> [u8; 16] {
    // rust_decimal serializes flags first
    let serialized = value.serialize();
    let mut bytes = [0u8; 16];
    bytes[..12].copy_from_slice(&serialized[4..]);
    bytes[12..].copy_from_slice(&serialized[..4]);
    bytes
}

pub fn decimal_from_bytes(bytes: [u8; 16]) -> Decimal {
    let mut serialized = [0u8; 16];
    serialized[..4].copy_from_slice(&bytes[12..]);
    serialized[4..].copy_from_slice(&bytes[..12]);
    Decimal::deserialize(serialized)
}

/// Single-byte text encoding used for record strings; unmappable characters become `?`.
pub fn latin1_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// True when the date has no time-of-day component
pub fn is_midnight(date: &NaiveDateTime) -> bool {
    date.num_seconds_from_midnight() == 0 && date.nanosecond() == 0
}

/// Remove one pair of `#` markers, if present.
pub fn strip_hash_markers(token: &str) -> &str {
    let trimmed = token.trim();
    if trimmed.len() > 1 && trimmed.starts_with('#') && trimmed.ends_with('#') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Parse `yyyy-MM-dd` or `yyyy-MM-dd HH:mm:ss`, with or without `#` markers.
pub fn parse_date_literal(token: &str) -> Result<NaiveDateTime> {
    let text = strip_hash_markers(token);
    if let Ok(date) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(date);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| FileIoError::type_mismatch(token, "Date"))
}

/// Converts an Input token into the variant of a destination value.
pub trait TokenParser {
    fn parse_bool(&self, token: &str) -> Result<bool>;

    /// Parse into the same variant as `target`; string-like targets never reach here.
    fn parse_numeric(&self, token: &str, target: &Value) -> Result<Value>;

    /// Parse a token into a floating value when the destination has no type
    fn parse_untyped_number(&self, token: &str) -> Option<f64>;

    /// Whether numeric fields also end at a space
    fn numbers_end_at_space(&self) -> bool;
}

/// Strict `FromStr` based parsing used by Input mode
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardParser;

/// Lenient legacy parsing used by Binary mode
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyParser;

fn parse_std<T: FromStr>(token: &str, target: &'static str) -> Result<T> {
    token
        .parse::<T>()
        .map_err(|_| FileIoError::type_mismatch(token, target))
}

impl TokenParser for StandardParser {
    fn parse_bool(&self, token: &str) -> Result<bool> {
        let text = strip_hash_markers(token);
        if text.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if text.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(FileIoError::type_mismatch(token, "Boolean"))
        }
    }

    fn parse_numeric(&self, token: &str, target: &Value) -> Result<Value> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(zero_like(target));
        }
        Ok(match target {
            Value::Byte(_) => Value::Byte(parse_std(token, "Byte")?),
            Value::Short(_) => Value::Short(parse_std(token, "Short")?),
            Value::Integer(_) => Value::Integer(parse_std(token, "Integer")?),
            Value::Long(_) => Value::Long(parse_std(token, "Long")?),
            Value::Single(_) => Value::Single(parse_std(token, "Single")?),
            Value::Double(_) => Value::Double(parse_std(token, "Double")?),
            Value::Decimal(_) => Value::Decimal(parse_std(token, "Decimal")?),
            other => return Err(other.unsupported()),
        })
    }

    fn parse_untyped_number(&self, token: &str) -> Option<f64> {
        token.trim().parse::<f64>().ok()
    }

    fn numbers_end_at_space(&self) -> bool {
        false
    }
}

/// Parse a legacy numeric literal (`&H` hex, `&O` octal, decimal with optional exponent).
pub fn parse_legacy_number(token: &str) -> Result<f64> {
    let text = token.trim();
    if text.is_empty() {
        return Ok(0.0);
    }

    let radix_literal = |digits: &str, radix: u32| {
        i64::from_str_radix(digits, radix)
            .map(|v| v as f64)
            .map_err(|_| FileIoError::type_mismatch(token, "Double"))
    };

    if let Some(hex) = text.strip_prefix("&H").or_else(|| text.strip_prefix("&h")) {
        return radix_literal(hex, 16);
    }
    if let Some(octal) = text.strip_prefix("&O").or_else(|| text.strip_prefix("&o")) {
        return radix_literal(octal, 8);
    }

    let number = text
        .strip_prefix('+')
        .unwrap_or(text)
        .parse::<f64>()
        .map_err(|_| FileIoError::type_mismatch(token, "Double"))?;
    if number.is_finite() {
        Ok(number)
    } else if text.bytes().any(|b| b.is_ascii_digit()) {
        // an exponent past the Double range
        Err(FileIoError::overflow(token, "Double"))
    } else {
        // "NaN", "inf" and "infinity" are not numeric literals
        Err(FileIoError::type_mismatch(token, "Double"))
    }
}

/// Round half to even, then range check into an integer field.
fn legacy_integer(token: &str, min: f64, max: f64, target: &'static str) -> Result<f64> {
    let rounded = parse_legacy_number(token)?.round_ties_even();
    if rounded < min || rounded > max {
        return Err(FileIoError::overflow(token, target));
    }
    Ok(rounded)
}

impl TokenParser for LegacyParser {
    fn parse_bool(&self, token: &str) -> Result<bool> {
        let text = strip_hash_markers(token);
        if text.eq_ignore_ascii_case("true") {
            return Ok(true);
        }
        if text.eq_ignore_ascii_case("false") || text.is_empty() {
            return Ok(false);
        }
        parse_legacy_number(text)
            .map(|number| number != 0.0)
            .map_err(|_| FileIoError::type_mismatch(token, "Boolean"))
    }

    fn parse_numeric(&self, token: &str, target: &Value) -> Result<Value> {
        Ok(match target {
            Value::Byte(_) => Value::Byte(legacy_integer(token, 0.0, 255.0, "Byte")? as u8),
            Value::Short(_) => Value::Short(legacy_integer(
                token,
                f64::from(i16::MIN),
                f64::from(i16::MAX),
                "Short",
            )? as i16),
            Value::Integer(_) => Value::Integer(legacy_integer(
                token,
                f64::from(i32::MIN),
                f64::from(i32::MAX),
                "Integer",
            )? as i32),
            Value::Long(_) => Value::Long(legacy_integer(
                token,
                i64::MIN as f64,
                i64::MAX as f64,
                "Long",
            )? as i64),
            Value::Single(_) => {
                let number = parse_legacy_number(token)?;
                if number.is_finite() && number.abs() > f64::from(f32::MAX) {
                    return Err(FileIoError::overflow(token, "Single"));
                }
                Value::Single(number as f32)
            }
            Value::Double(_) => Value::Double(parse_legacy_number(token)?),
            Value::Decimal(_) => Value::Decimal(parse_legacy_decimal(token)?),
            other => return Err(other.unsupported()),
        })
    }

    fn parse_untyped_number(&self, token: &str) -> Option<f64> {
        parse_legacy_number(token).ok()
    }

    fn numbers_end_at_space(&self) -> bool {
        true
    }
}

fn parse_legacy_decimal(token: &str) -> Result<Decimal> {
    let text = token.trim();
    if text.is_empty() {
        return Ok(Decimal::ZERO);
    }
    if text.starts_with('&') {
        let number = parse_legacy_number(text)?;
        return Decimal::try_from(number).map_err(|_| FileIoError::overflow(token, "Decimal"));
    }
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    Decimal::from_str(unsigned)
        .or_else(|_| Decimal::from_scientific(unsigned))
        .map_err(|_| FileIoError::type_mismatch(token, "Decimal"))
}

/// The zero of the destination's numeric type
pub fn zero_like(target: &Value) -> Value {
    match target {
        Value::Byte(_) => Value::Byte(0),
        Value::Short(_) => Value::Short(0),
        Value::Integer(_) => Value::Integer(0),
        Value::Long(_) => Value::Long(0),
        Value::Single(_) => Value::Single(0.0),
        Value::Double(_) => Value::Double(0.0),
        Value::Decimal(_) => Value::Decimal(Decimal::ZERO),
        other => other.clone(),
    }
}
