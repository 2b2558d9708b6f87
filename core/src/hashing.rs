//! Hashing utilities for Shadow-Query
//!
//! Keccak256 binds the guest output to on-chain consumers and derives cache
//! keys and storage slots. MiMC is the algebraic hash used for per-slot input
//! commitments and Merkle aggregation; [`crate::gadgets::mimc`] computes the
//! same function inside a circuit.

use crate::errors::Result;
use crate::field::Fr;
use crate::types::{Hash, B256, U256};
use sha3::{Digest, Keccak256};
use std::sync::OnceLock;

/// Rounds of the MiMC permutation
pub const MIMC_ROUNDS: usize = 110;

/// Seed of the MiMC round constants
pub const MIMC_SEED: &[u8] = b"seed";

/// Compute Keccak256 hash of arbitrary data
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    B256::from_slice(&hasher.finalize())
}

/// Hash a serializable struct
///
/// Uses bincode for deterministic serialization before hashing.
pub fn hash_struct<T: serde::Serialize>(value: &T) -> Result<Hash> {
    let bytes = bincode::serialize(value)?;
    Ok(keccak256(&bytes))
}

/// Hash multiple values together
///
/// Concatenates all byte slices and hashes the result.
pub fn hash_concat(values: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for value in values {
        hasher.update(value);
    }
    B256::from_slice(&hasher.finalize())
}

/// Storage slot of `mapping[key]` for a mapping declared at `slot`.
pub fn mapping_slot(key: B256, slot: B256) -> B256 {
    hash_concat(&[key.as_slice(), slot.as_slice()])
}

/// Storage slot of a nested mapping `m[k0][k1]..`.
pub fn nested_mapping_slot(keys: &[B256], slot: B256) -> B256 {
    keys.iter().fold(slot, |slot, key| mapping_slot(*key, slot))
}

/// Storage slot of element `index` of a dynamic array declared at `slot`.
pub fn array_element_slot(slot: B256, index: U256) -> B256 {
    let base = U256::from_be_bytes(keccak256(slot.as_slice()).0);
    B256::from(base.wrapping_add(index))
}

/// Round constants: `c0 = keccak256(seed)`, `c(i+1) = keccak256(c(i))`,
/// each reduced into the field.
pub fn mimc_constants() -> &'static [Fr] {
    static CONSTANTS: OnceLock<Vec<Fr>> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        let mut digest = keccak256(MIMC_SEED);
        let mut constants = Vec::with_capacity(MIMC_ROUNDS);
        for _ in 0..MIMC_ROUNDS {
            constants.push(Fr::from_be_bytes_reduced(&digest.0));
            digest = keccak256(digest.as_slice());
        }
        constants
    })
}

fn pow5(x: Fr) -> Fr {
    let x2 = x * x;
    let x4 = x2 * x2;
    x4 * x
}

fn mimc_encrypt(message: Fr, key: Fr) -> Fr {
    let mut x = message;
    for c in mimc_constants() {
        x = pow5(x + key + *c);
    }
    x + key
}

/// MiMC hash in Miyaguchi-Preneel mode: `h = E(m, h) + h + m` per element.
pub fn mimc_hash(elements: &[Fr]) -> Fr {
    elements
        .iter()
        .fold(Fr::ZERO, |h, m| mimc_encrypt(*m, h) + h + *m)
}

/// Root of a binary MiMC Merkle tree.
///
/// Panics unless the leaf count is a non-zero power of two.
pub fn merkle_root(leaves: &[Fr]) -> Fr {
    assert!(
        leaves.len().is_power_of_two(),
        "merkle tree needs a power-of-two leaf count, got {}",
        leaves.len()
    );
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| mimc_hash(&[pair[0], pair[1]]))
            .collect();
    }
    level[0]
}
