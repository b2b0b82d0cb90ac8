//! Literal formatting for `Write` and `Print`.

use crate::convert::is_midnight;
use crate::error::Result;
use crate::value::Value;
use std::fmt::{Display, LowerExp};

/// Format a floating value the legacy way: plain digits for moderate magnitudes,
/// otherwise `1.5E+20` / `1E-05` style scientific notation.
pub fn format_float<F>(value: F) -> String
where
    F: Display + LowerExp + Into<f64> + Copy,
{
    let wide: f64 = value.into();
    if wide.is_nan() {
        return "NaN".to_string();
    }
    if wide.is_infinite() {
        return if wide > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = wide.abs();
    if magnitude != 0.0 && !(1e-4..1e15).contains(&magnitude) {
        let scientific = format!("{value:e}");
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            return format!("{mantissa}E{sign}{:02}", exponent.abs());
        }
        return scientific;
    }
    value.to_string()
}

/// Plain rendering of a numeric value, without padding.
fn number_text(value: &Value) -> Option<String> {
    Some(match value {
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Single(v) => format_float(*v),
        Value::Double(v) => format_float(*v),
        Value::Decimal(v) => v.to_string(),
        _ => return None,
    })
}

fn date_text(value: &Value) -> Option<String> {
    match value {
        Value::Date(date) if is_midnight(date) => Some(date.format("%Y-%m-%d").to_string()),
        Value::Date(date) => Some(date.format("%Y-%m-%d %H:%M:%S").to_string()),
        _ => None,
    }
}

/// The delimited literal `Write` emits for a value.
///
/// `Tab`/`Spc` directives and arrays have no literal form.
pub fn write_literal(value: &Value) -> Result<String> {
    if let Some(number) = number_text(value) {
        return Ok(number);
    }
    if let Some(date) = date_text(value) {
        return Ok(format!("#{date}#"));
    }
    match value {
        Value::Empty => Ok(String::new()),
        Value::Null => Ok("#NULL#".to_string()),
        Value::Bool(true) => Ok("#True#".to_string()),
        Value::Bool(false) => Ok("#False#".to_string()),
        Value::Char(c) => Ok(format!("\"{c}\"")),
        Value::String(s) => Ok(format!("\"{s}\"")),
        other => Err(other.unsupported()),
    }
}

/// The human-readable text `Print` emits for a value.
///
/// Numbers and dates carry a sign position (a space unless the text starts with
/// `-`) and one trailing space.
pub fn print_literal(value: &Value) -> Result<String> {
    if let Some(text) = number_text(value).or_else(|| date_text(value)) {
        let lead = if text.starts_with('-') { "" } else { " " };
        return Ok(format!("{lead}{text} "));
    }
    match value {
        Value::Empty => Ok(String::new()),
        Value::Null => Ok("Null".to_string()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        Value::Char(c) => Ok(c.to_string()),
        Value::String(s) => Ok(s.clone()),
        other => Err(other.unsupported()),
    }
}
