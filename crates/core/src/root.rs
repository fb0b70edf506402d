//! Merkle-sum tree root decoding
//!
//! A claim root is the concatenation of the tree digest, the big-endian
//! sum of all leaf weights (compute units) and the big-endian leaf count
//! (relays).

use crate::error::{CoreError, Result};

/// Size of the tree digest prefix
pub const ROOT_DIGEST_SIZE: usize = 32;

/// Size of the big-endian sum field
pub const ROOT_SUM_SIZE: usize = 8;

/// Size of the big-endian count field
pub const ROOT_COUNT_SIZE: usize = 8;

/// Total encoded root size
pub const ROOT_SIZE: usize = ROOT_DIGEST_SIZE + ROOT_SUM_SIZE + ROOT_COUNT_SIZE;

/// Decoded Merkle-sum root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleSumRoot {
    pub digest: [u8; ROOT_DIGEST_SIZE],
    pub sum: u64,
    pub count: u64,
}

impl MerkleSumRoot {
    pub fn new(digest: [u8; ROOT_DIGEST_SIZE], sum: u64, count: u64) -> Self {
        Self { digest, sum, count }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ROOT_SIZE {
            return Err(CoreError::InvalidRootHash {
                expected: ROOT_SIZE,
                actual: bytes.len(),
            });
        }

        let mut digest = [0u8; ROOT_DIGEST_SIZE];
        digest.copy_from_slice(&bytes[..ROOT_DIGEST_SIZE]);

        let mut sum = [0u8; ROOT_SUM_SIZE];
        sum.copy_from_slice(&bytes[ROOT_DIGEST_SIZE..ROOT_DIGEST_SIZE + ROOT_SUM_SIZE]);

        let mut count = [0u8; ROOT_COUNT_SIZE];
        count.copy_from_slice(&bytes[ROOT_DIGEST_SIZE + ROOT_SUM_SIZE..]);

        Ok(Self {
            digest,
            sum: u64::from_be_bytes(sum),
            count: u64::from_be_bytes(count),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ROOT_SIZE);
        out.extend_from_slice(&self.digest);
        out.extend_from_slice(&self.sum.to_be_bytes());
        out.extend_from_slice(&self.count.to_be_bytes());
        out
    }

    /// A root with a zero sum carries no work and must be discarded.
    pub fn is_faulty(&self) -> bool {
        self.sum == 0
    }
}
