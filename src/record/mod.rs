//! On-disk record format.
//!
//! Each record consists of:
//! - Header (25 bytes): kind tag, key length, compressed value length,
//!   MD5 digest of the compressed value
//! - Expiry (8 bytes, WithExpiry records only): absolute millisecond epoch
//! - Key (raw bytes)
//! - Value (snappy-compressed bytes; empty for tombstones)
//!
//! Records are immutable once appended. Updates and deletes are new
//! records; a zero-length value payload marks a tombstone.

mod header;

pub use header::{Header, Kind, CHECKSUM_SIZE, HEADER_SIZE};

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Read;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time as a millisecond unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Verify the stored digest and decompress a value payload read from disk.
///
/// An empty payload (tombstone) decodes to an empty value without touching
/// the digest, which is all zeroes for tombstones.
pub fn decode_value(header: &Header, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    if md5::compute(payload).0 != header.checksum {
        return Err(Error::corruption("value digest mismatch"));
    }

    snap::raw::Decoder::new()
        .decompress_vec(payload)
        .map_err(|e| Error::corruption(format!("decompression failed: {}", e)))
}

/// A single log record.
#[derive(Debug, Clone)]
pub struct Record {
    /// The user key.
    pub key: String,
    /// The raw (decompressed) value. Empty for tombstones.
    pub value: Vec<u8>,
    /// Absolute expiry as a millisecond epoch, for WithExpiry records.
    pub expires_at: Option<u64>,

    /// On-disk size, populated when the record is decoded from the log.
    disk_size: u64,
}

impl Record {
    /// Build a record for a write. `ttl = None` yields a Persistence record.
    pub fn new(key: &str, value: &[u8], ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|t| now_millis() + t.as_millis() as u64);
        Self {
            key: key.to_string(),
            value: value.to_vec(),
            expires_at,
            disk_size: 0,
        }
    }

    /// Build a tombstone record marking `key` as deleted.
    pub fn tombstone(key: &str) -> Self {
        Self::new(key, &[], None)
    }

    /// Encode the record to its on-disk layout.
    ///
    /// Non-empty values are snappy-compressed before the length and digest
    /// are computed; tombstones skip compression and carry a zero digest.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut checksum = [0u8; CHECKSUM_SIZE];
        let payload = if self.value.is_empty() {
            Vec::new()
        } else {
            let compressed = snap::raw::Encoder::new()
                .compress_vec(&self.value)
                .map_err(|e| Error::invalid_argument(format!("compression failed: {}", e)))?;
            checksum = md5::compute(&compressed).0;
            compressed
        };

        let kind = if self.expires_at.is_some() {
            Kind::WithExpiry
        } else {
            Kind::Persistence
        };
        let header = Header {
            kind,
            key_len: self.key.len() as u32,
            value_len: payload.len() as u32,
            checksum,
        };

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + header.body_size() as usize);
        header.encode(&mut buf);
        if let Some(expires_at) = self.expires_at {
            buf.put_u64_le(expires_at);
        }
        buf.put_slice(self.key.as_bytes());
        buf.put_slice(&payload);

        Ok(buf.to_vec())
    }

    /// Decode one record from `reader`.
    ///
    /// Returns `Ok(None)` on a clean end-of-file at a record boundary.
    /// End-of-file in the middle of a record, a digest mismatch, or
    /// otherwise malformed bytes are corruption.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        match read_full(reader, &mut header_bytes)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => {
                return Err(Error::corruption(format!(
                    "truncated record header: {} of {} bytes",
                    n, HEADER_SIZE
                )))
            }
            _ => {}
        }
        let header = Header::decode(&header_bytes)?;

        let body_size = header.body_size() as usize;
        let mut body = vec![0u8; body_size];
        let n = read_full(reader, &mut body)?;
        if n < body_size {
            return Err(Error::corruption(format!(
                "truncated record body: {} of {} bytes",
                n, body_size
            )));
        }

        let mut body = body.as_slice();
        let expires_at = if header.kind == Kind::WithExpiry {
            Some(body.get_u64_le())
        } else {
            None
        };

        let key_len = header.key_len as usize;
        let key = std::str::from_utf8(&body[..key_len])
            .map_err(|_| Error::corruption("record key is not valid UTF-8"))?
            .to_string();
        let value = decode_value(&header, &body[key_len..])?;

        Ok(Some(Self {
            key,
            value,
            expires_at,
            disk_size: HEADER_SIZE as u64 + header.body_size(),
        }))
    }

    /// On-disk size (header + body) of a record decoded via [`read_from`].
    ///
    /// [`read_from`]: Record::read_from
    pub fn size(&self) -> u64 {
        self.disk_size
    }

    /// Whether this record still denotes a live key at `now_ms`.
    ///
    /// False for tombstones and for records whose expiry is at or before
    /// `now_ms`; every caller treats the two cases identically.
    pub fn is_valid(&self, now_ms: u64) -> bool {
        if self.value.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > now_ms,
            None => true,
        }
    }
}

/// Read up to `buf.len()` bytes, returning how many were read.
///
/// Unlike `read_exact`, a short count distinguishes a clean end-of-file
/// (zero bytes) from a mid-record truncation.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match reader.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(read)
}
