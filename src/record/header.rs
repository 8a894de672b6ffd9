//! Fixed-size record header.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};

/// Size of the digest stored in every header.
pub const CHECKSUM_SIZE: usize = 16;

/// Size of the fixed header: kind tag + key length + value length + digest.
pub const HEADER_SIZE: usize = 1 + 4 + 4 + CHECKSUM_SIZE;

/// Record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    /// A record with no expiry.
    Persistence = 0,
    /// A record carrying an absolute expiry timestamp.
    WithExpiry = 1,
}

impl Kind {
    /// Convert from u8 to Kind.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Kind::Persistence),
            1 => Ok(Kind::WithExpiry),
            _ => Err(Error::corruption(format!("invalid record kind: {}", value))),
        }
    }
}

/// The fixed-size header preceding every record in the log.
///
/// Layout: `[kind: u8][key_len: u32 le][value_len: u32 le][checksum: 16 bytes]`.
/// The checksum is an MD5 digest of the compressed value payload; it is
/// all zeroes for tombstones, whose payload is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Kind tag deciding whether an expiry field follows the header.
    pub kind: Kind,
    /// Length of the raw key bytes.
    pub key_len: u32,
    /// Length of the compressed value payload. Zero denotes a tombstone.
    pub value_len: u32,
    /// MD5 digest of the compressed value payload.
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl Header {
    /// Encode the header into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.kind as u8);
        buf.put_u32_le(self.key_len);
        buf.put_u32_le(self.value_len);
        buf.put_slice(&self.checksum);
    }

    /// Decode a header from its `HEADER_SIZE` leading bytes.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::corruption(format!(
                "header too short: {} bytes",
                data.len()
            )));
        }

        let kind = Kind::from_u8(data.get_u8())?;
        let key_len = data.get_u32_le();
        let value_len = data.get_u32_le();
        let mut checksum = [0u8; CHECKSUM_SIZE];
        data.copy_to_slice(&mut checksum);

        Ok(Self { kind, key_len, value_len, checksum })
    }

    /// Size of the body that follows this header on disk: key bytes plus
    /// compressed value bytes plus the 8-byte expiry for WithExpiry records.
    pub fn body_size(&self) -> u64 {
        let mut size = self.key_len as u64 + self.value_len as u64;
        if self.kind == Kind::WithExpiry {
            size += 8;
        }
        size
    }

    /// Whether this header marks a tombstone (logical delete).
    pub fn is_tombstone(&self) -> bool {
        self.value_len == 0
    }
}
