//! Reusable in-circuit gadgets
//!
//! - [`mimc`] - MiMC hash and Merkle root, matching [`crate::hashing`]
//! - [`keccak`] - Keccak256 over a bit string, used for the output commitment

pub mod keccak;
pub mod mimc;

pub use keccak::{keccak256_bits, Bit};
pub use mimc::{mimc_hash, merkle_root};
