//! Output commitment
//!
//! The guest's ABI-packed output is bound by its Keccak256 hash, carried as
//! two 128-bit limbs so each fits one field element.

use crate::field::Fr;
use crate::hashing::keccak256;
use crate::types::{Hash, U256};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Keccak256 of the guest output as `{hi, lo}` 128-bit limbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputCommitment {
    /// First 16 bytes of the hash, big-endian
    pub hi: Fr,
    /// Last 16 bytes of the hash, big-endian
    pub lo: Fr,
}

impl OutputCommitment {
    pub fn from_hash(hash: &Hash) -> Self {
        let limb = |bytes: &[u8]| Fr::from_u256_reduced(U256::from_be_slice(bytes));
        Self {
            hi: limb(&hash[..16]),
            lo: limb(&hash[16..]),
        }
    }

    /// Commitment of concrete output bytes.
    pub fn of_output(output: &[u8]) -> Self {
        Self::from_hash(&keccak256(output))
    }

    /// Commitment of a guest that emitted nothing.
    pub fn empty() -> Self {
        Self::of_output(&[])
    }

    /// The 32-byte word consumed on-chain.
    pub fn hash(&self) -> Hash {
        let mut word = [0u8; 32];
        word[..16].copy_from_slice(&self.hi.to_b256()[16..]);
        word[16..].copy_from_slice(&self.lo.to_b256()[16..]);
        Hash::from(word)
    }
}

impl fmt::Display for OutputCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hash())
    }
}
