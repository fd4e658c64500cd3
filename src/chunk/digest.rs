//! Block digest types.

use std::fmt;

/// A 16-byte MD5 digest of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; 16]);

impl Digest {
    /// The size of the digest in bytes.
    pub const SIZE: usize = 16;

    /// Creates a digest from a byte array.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Creates a digest from a slice.
    ///
    /// Returns `None` if the slice is not exactly 16 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 16]>::try_from(slice).ok().map(Self)
    }

    /// Returns the digest as a byte array.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns the digest as lowercase hex (32 chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 32-char hex string.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex_str, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl From<md5::Digest> for Digest {
    fn from(digest: md5::Digest) -> Self {
        Self(digest.0)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The digest of one block, tagged with the block's sequence number.
///
/// Produced by a worker; released by the reorder buffer in sequence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDigest {
    /// Sequence number of the block this digest was computed over.
    pub sequence: u64,
    /// The digest value.
    pub digest: Digest,
}
