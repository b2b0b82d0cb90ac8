//! `Input` statement tokenizer shared by Binary and Input modes.
//!
//! A token ends at an unquoted comma or at a carriage return (which also swallows
//! one following line feed). Inside `"..."` commas are literal, and a closing quote
//! directly followed by a comma consumes that comma as the delimiter. A token wrapped
//! in a single pair of quotes comes back without them, but only when it is longer than
//! one byte, so a lone `"` survives.

use crate::convert::{parse_date_literal, TokenParser};
use crate::error::{FileIoError, Result};
use crate::value::Value;

const QUOTE: u8 = b'"';
const COMMA: u8 = b',';
const CR: u8 = b'\r';
const LF: u8 = b'\n';
const SPACE: u8 = b' ';

/// Byte-at-a-time access to the text being tokenized.
pub(crate) trait ByteSource {
    fn next_byte(&mut self) -> Result<Option<u8>>;

    fn peek_byte(&mut self) -> Result<Option<u8>>;

    /// Move bytes into `out` until one of `stops` (not consumed) or end of input.
    fn take_until(&mut self, stops: [u8; 3], out: &mut Vec<u8>) -> Result<()> {
        while let Some(byte) = self.peek_byte()? {
            if stops.contains(&byte) {
                break;
            }
            out.push(byte);
            self.next_byte()?;
        }
        Ok(())
    }

    /// Turn token bytes into text. UTF-8 unless the source stores another encoding.
    fn decode(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// One field read by `Input`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) text: String,
    /// The field was wrapped in quotes that have been stripped
    pub(crate) quoted: bool,
}

impl Token {
    /// Quoted text verbatim, unquoted text trimmed
    pub(crate) fn field_text(&self) -> &str {
        if self.quoted {
            &self.text
        } else {
            self.text.trim()
        }
    }

    fn from_raw(raw: &[u8], decode: impl FnOnce(&[u8]) -> String) -> Self {
        let quoted = raw.len() > 1 && raw[0] == QUOTE && raw[raw.len() - 1] == QUOTE;
        let body = if quoted { &raw[1..raw.len() - 1] } else { raw };
        Self {
            text: decode(body),
            quoted,
        }
    }
}

/// Skip blanks left between fields. Returns false at end of input.
fn skip_blanks<S: ByteSource + ?Sized>(source: &mut S) -> Result<bool> {
    loop {
        match source.peek_byte()? {
            None => return Ok(false),
            Some(SPACE) | Some(b'\t') | Some(LF) => {
                source.next_byte()?;
            }
            Some(_) => return Ok(true),
        }
    }
}

fn finish_line<S: ByteSource + ?Sized>(source: &mut S) -> Result<()> {
    if source.peek_byte()? == Some(LF) {
        source.next_byte()?;
    }
    Ok(())
}

/// Read a string field. `None` when no field is left.
pub(crate) fn read_string<S: ByteSource + ?Sized>(source: &mut S) -> Result<Option<Token>> {
    if !skip_blanks(source)? {
        return Ok(None);
    }

    let mut raw = Vec::new();
    let mut in_quotes = false;
    loop {
        let stops = if in_quotes {
            [QUOTE, CR, QUOTE]
        } else {
            [QUOTE, CR, COMMA]
        };
        source.take_until(stops, &mut raw)?;

        match source.next_byte()? {
            None => break,
            Some(QUOTE) => {
                raw.push(QUOTE);
                in_quotes = !in_quotes;
                if !in_quotes && source.peek_byte()? == Some(COMMA) {
                    source.next_byte()?;
                    break;
                }
            }
            Some(CR) => {
                finish_line(source)?;
                break;
            }
            Some(COMMA) => break,
            Some(other) => raw.push(other),
        }
    }

    Ok(Some(Token::from_raw(&raw, |bytes| source.decode(bytes))))
}

/// Read a numeric field: like [`read_string`] without quoting, also ending at a space.
pub(crate) fn read_number<S: ByteSource + ?Sized>(source: &mut S) -> Result<Option<String>> {
    if !skip_blanks(source)? {
        return Ok(None);
    }

    let mut raw = Vec::new();
    source.take_until([COMMA, CR, SPACE], &mut raw)?;
    match source.next_byte()? {
        Some(CR) => finish_line(source)?,
        Some(SPACE) => {
            // "1 , 2" and "1 \r\n" still count as one delimiter
            while source.peek_byte()? == Some(SPACE) {
                source.next_byte()?;
            }
            match source.peek_byte()? {
                Some(COMMA) => {
                    source.next_byte()?;
                }
                Some(CR) => {
                    source.next_byte()?;
                    finish_line(source)?;
                }
                _ => {}
            }
        }
        _ => {}
    }

    Ok(Some(source.decode(&raw)))
}

/// Read through the end of the current line (CR, CRLF or LF). `None` at end of input.
pub(crate) fn read_line<S: ByteSource + ?Sized>(source: &mut S) -> Result<Option<String>> {
    if source.peek_byte()?.is_none() {
        return Ok(None);
    }

    let mut raw = Vec::new();
    source.take_until([CR, LF, LF], &mut raw)?;
    if source.next_byte()? == Some(CR) {
        finish_line(source)?;
    }
    Ok(Some(source.decode(&raw)))
}

/// Type an untyped field by what the token looks like.
fn infer_value<P: TokenParser + ?Sized>(token: Token, parser: &P) -> Value {
    if token.quoted {
        return Value::String(token.text);
    }

    let text = token.field_text();
    if text.is_empty() {
        return Value::String(String::new());
    }
    if text.eq_ignore_ascii_case("#NULL#") {
        return Value::Null;
    }
    if text.len() > 1 && text.starts_with('#') && text.ends_with('#') {
        let inner = &text[1..text.len() - 1];
        if inner.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if inner.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        return match parse_date_literal(text) {
            Ok(date) => Value::Date(date),
            Err(_) => Value::String(text.to_string()),
        };
    }

    match parser.parse_untyped_number(text) {
        Some(number) => Value::Double(number),
        None => Value::String(text.to_string()),
    }
}

/// Read the next `Input` field into `target`, converting with `parser`.
pub(crate) fn input_field<S, P>(source: &mut S, parser: &P, target: &mut Value) -> Result<()>
where
    S: ByteSource + ?Sized,
    P: TokenParser + ?Sized,
{
    if matches!(target, Value::Array(_) | Value::Tab(_) | Value::Spc(_)) {
        return Err(target.unsupported());
    }

    if target.is_numeric() {
        let token = if parser.numbers_end_at_space() {
            read_number(source)?
        } else {
            read_string(source)?.map(|token| token.text)
        };
        let token = token.ok_or(FileIoError::EndOfFile)?;
        *target = parser.parse_numeric(&token, target)?;
        return Ok(());
    }

    let token = read_string(source)?.ok_or(FileIoError::EndOfFile)?;
    *target = match target {
        Value::String(_) => Value::String(token.field_text().to_string()),
        Value::Char(_) => Value::Char(token.field_text().chars().next().unwrap_or('\0')),
        Value::Bool(_) => Value::Bool(parser.parse_bool(&token.text)?),
        Value::Date(_) => Value::Date(parse_date_literal(&token.text)?),
        _ => infer_value(token, parser),
    };
    Ok(())
}
