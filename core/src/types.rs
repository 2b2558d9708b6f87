//! Core type definitions for Shadow-Query
//!
//! Uses alloy-primitives for Ethereum-compatible types.

pub use alloy_primitives::{Address, Bytes, FixedBytes, B256, I256, U256};

/// 32-byte hash (Keccak256 output)
pub type Hash = B256;

/// EVM chain identifier
pub type ChainId = u64;

/// Integers wide enough to hold a product of two 521-bit values
pub type Wide = alloy_primitives::Uint<1152, 18>;
