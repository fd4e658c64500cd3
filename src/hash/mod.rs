//! Block hashing.
//!
//! - [`BlockHasher`] - Computes the digest of one block
//! - [`Md5Hasher`] - MD5, the block digest written by the pipeline

mod md5;

pub use self::md5::Md5Hasher;

use crate::chunk::Digest;

/// Computes the 16-byte digest of a block.
///
/// Implementations must be pure: the same bytes always produce the same
/// digest, and a call never fails. Workers share one hasher by reference,
/// so it must be `Sync`.
pub trait BlockHasher: Send + Sync {
    /// Returns the digest of `block`.
    fn digest(&self, block: &[u8]) -> Digest;
}

impl<H: BlockHasher + ?Sized> BlockHasher for &H {
    fn digest(&self, block: &[u8]) -> Digest {
        (**self).digest(block)
    }
}
