//! RESP wire protocol reading and writing.
//!
//! Commands arrive either as RESP arrays of bulk strings (`*N` followed by
//! `$len` payloads) or as inline commands, a single line split on
//! whitespace. Replies use the standard RESP types: simple strings,
//! errors, integers, bulk strings, the null bulk string, and arrays.

use crate::error::{Error, Result};
use std::io::{BufRead, Read, Write};

/// Upper bound on any declared array or bulk-string length. Lengths past
/// this are treated as a malformed stream rather than honored.
const MAX_LENGTH: usize = 16 * 1024 * 1024;

/// Read one command from `reader`.
///
/// Returns `Ok(None)` when the peer closed the connection at a command
/// boundary, and the command's arguments otherwise. Blank lines between
/// commands are skipped.
///
/// # Errors
///
/// Returns `Error::Protocol` for malformed framing: bad length prefixes,
/// missing CRLF terminators, or lengths past the allowed maximum.
pub fn read_command<R: BufRead>(reader: &mut R) -> Result<Option<Vec<Vec<u8>>>> {
    let line = loop {
        let line = match read_line(reader)? {
            Some(line) => line,
            None => return Ok(None),
        };
        if !line.is_empty() {
            break line;
        }
    };

    if let Some(rest) = line.strip_prefix('*') {
        let count = parse_length(rest, "array")?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(read_bulk(reader)?);
        }
        return Ok(Some(args));
    }

    // Inline command: one whitespace-separated line.
    let args = line
        .split_whitespace()
        .map(|part| part.as_bytes().to_vec())
        .collect();
    Ok(Some(args))
}

/// Read one `$len`-prefixed bulk string, including its trailing CRLF.
fn read_bulk<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let line = read_line(reader)?
        .ok_or_else(|| Error::protocol("unexpected end of stream in array"))?;
    let len = match line.strip_prefix('$') {
        Some(rest) => parse_length(rest, "bulk string")?,
        None => {
            return Err(Error::protocol(format!(
                "expected bulk string, got {:?}",
                line
            )))
        }
    };

    let mut buf = vec![0u8; len + 2];
    reader.read_exact(&mut buf)?;
    if &buf[len..] != b"\r\n" {
        return Err(Error::protocol("bulk string missing CRLF terminator"));
    }
    buf.truncate(len);
    Ok(buf)
}

/// Read one CRLF-terminated line, `None` on end of stream.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn parse_length(text: &str, what: &str) -> Result<usize> {
    let len = text
        .parse::<usize>()
        .map_err(|_| Error::protocol(format!("invalid {} length: {:?}", what, text)))?;
    if len > MAX_LENGTH {
        return Err(Error::protocol(format!(
            "{} length {} exceeds maximum",
            what, len
        )));
    }
    Ok(len)
}

/// Write a simple string reply, e.g. `+OK`.
pub fn write_simple<W: Write>(writer: &mut W, text: &str) -> Result<()> {
    write!(writer, "+{}\r\n", text)?;
    Ok(())
}

/// Write an error reply, e.g. `-ERR unknown command`.
pub fn write_error<W: Write>(writer: &mut W, message: &str) -> Result<()> {
    write!(writer, "-{}\r\n", message)?;
    Ok(())
}

/// Write an integer reply, e.g. `:1`.
pub fn write_integer<W: Write>(writer: &mut W, value: i64) -> Result<()> {
    write!(writer, ":{}\r\n", value)?;
    Ok(())
}

/// Write a bulk string reply carrying arbitrary bytes.
pub fn write_bulk<W: Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    write!(writer, "${}\r\n", data.len())?;
    writer.write_all(data)?;
    writer.write_all(b"\r\n")?;
    Ok(())
}

/// Write the null bulk string, the reply for a missing key.
pub fn write_null<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(b"$-1\r\n")?;
    Ok(())
}

/// Write an array header; the caller writes the `count` elements after it.
pub fn write_array_header<W: Write>(writer: &mut W, count: usize) -> Result<()> {
    write!(writer, "*{}\r\n", count)?;
    Ok(())
}
