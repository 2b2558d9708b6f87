//! BN254 scalar field element
//!
//! Every wire of a circuit carries one `Fr`. Arithmetic is arkworks'
//! `ark_bn254::Fr`; this wrapper adds the integer views the gadgets need
//! (bits, limbs, `U256`) and serializes as a `0x` hex integer.

use crate::types::{B256, U256};
use ark_ff::{AdditiveGroup, BigInt, BigInteger, Field, PrimeField, Zero};
use core::fmt;
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use serde::{Deserialize, Serialize};

/// Bit length of the field modulus.
pub const FIELD_BITS: usize = 254;

/// Largest chunk that always fits below the modulus when packing bit strings.
pub const PACK_CHUNK_BITS: usize = FIELD_BITS - 1;

/// Element of the BN254 scalar field.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "U256", into = "U256")]
pub struct Fr(ark_bn254::Fr);

/// A raw integer that is not a canonical field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotInField(pub U256);

impl fmt::Display for NotInField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x} is not below the field modulus", self.0)
    }
}

impl std::error::Error for NotInField {}

impl Fr {
    /// r = 21888242871839275222246405745257275088548364400416034343698204186575808495617
    pub const MODULUS: U256 = U256::from_limbs(<ark_bn254::Fr as PrimeField>::MODULUS.0);

    pub const ZERO: Self = Self(<ark_bn254::Fr as AdditiveGroup>::ZERO);
    pub const ONE: Self = Self(<ark_bn254::Fr as Field>::ONE);

    /// Reduce an arbitrary 256-bit integer into the field.
    pub fn from_u256_reduced(value: U256) -> Self {
        Self(ark_bn254::Fr::from_le_bytes_mod_order(
            &value.to_le_bytes::<32>(),
        ))
    }

    /// Interpret 32 big-endian bytes as an integer and reduce it.
    pub fn from_be_bytes_reduced(bytes: &[u8; 32]) -> Self {
        Self(ark_bn254::Fr::from_be_bytes_mod_order(bytes))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(ark_bn254::Fr::from(value))
    }

    /// `2^exp`, for exponents below the field size.
    pub fn pow2(exp: usize) -> Self {
        debug_assert!(exp < FIELD_BITS);
        Self::from_u256_reduced(U256::from(1u8) << exp)
    }

    /// Canonical integer below the modulus.
    pub fn as_u256(&self) -> U256 {
        U256::from_limbs(self.0.into_bigint().0)
    }

    /// Big-endian 32-byte encoding.
    pub fn to_b256(&self) -> B256 {
        B256::from(self.as_u256())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Low 64 bits of the canonical integer.
    pub fn low_u64(&self) -> u64 {
        self.0.into_bigint().0[0]
    }

    pub fn bit(&self, index: usize) -> bool {
        self.0.into_bigint().get_bit(index)
    }

    /// Number of significant bits of the canonical integer.
    pub fn bit_len(&self) -> usize {
        self.0.into_bigint().num_bits() as usize
    }

    /// Multiplicative inverse, `None` for zero.
    pub fn inverse(&self) -> Option<Self> {
        self.0.inverse().map(Self)
    }

    /// Little-endian bits of the canonical integer, truncated to `n`.
    pub fn to_bits_le(&self, n: usize) -> Vec<bool> {
        let mut bits = self.0.into_bigint().to_bits_le();
        bits.resize(n, false);
        bits
    }

    /// Recompose little-endian bits. Panics on more than 253 bits, which could
    /// exceed the modulus.
    pub fn from_bits_le(bits: &[bool]) -> Self {
        assert!(
            bits.len() <= PACK_CHUNK_BITS,
            "bit string of {} bits does not fit a field element",
            bits.len()
        );
        Self(ark_bn254::Fr::from_bigint(BigInt::from_bits_le(bits)).unwrap_or_default())
    }
}

impl TryFrom<U256> for Fr {
    type Error = NotInField;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        ark_bn254::Fr::from_bigint(BigInt::new(value.into_limbs()))
            .map(Self)
            .ok_or(NotInField(value))
    }
}

impl From<Fr> for U256 {
    fn from(value: Fr) -> Self {
        value.as_u256()
    }
}

impl From<u64> for Fr {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<u32> for Fr {
    fn from(value: u32) -> Self {
        Self::from_u64(value as u64)
    }
}

impl From<bool> for Fr {
    fn from(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }
}

impl Add for Fr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Fr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for Fr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Neg for Fr {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl AddAssign for Fr {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Fr {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl MulAssign for Fr {
    fn mul_assign(&mut self, rhs: Self) {
        self.0 *= rhs.0;
    }
}

impl fmt::Debug for Fr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fr(0x{:x})", self.as_u256())
    }
}

impl fmt::Display for Fr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.as_u256())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulus_value() {
        let expected = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";
        assert_eq!(hex::encode(B256::from(Fr::MODULUS)), expected);
        assert_eq!(Fr::MODULUS.bit_len(), FIELD_BITS);
    }

    #[test]
    fn test_wraps_at_modulus() {
        let minus_one = -Fr::ONE;
        assert_eq!(minus_one + Fr::ONE, Fr::ZERO);
        assert_eq!(Fr::ZERO - Fr::ONE, minus_one);
        assert_eq!(minus_one.as_u256(), Fr::MODULUS - U256::from(1u8));
    }

    #[test]
    fn test_reduces_wide_integers() {
        let over = Fr::MODULUS + U256::from(5u8);
        assert_eq!(Fr::from_u256_reduced(over), Fr::from(5u64));
        let bytes = B256::from(over);
        assert_eq!(Fr::from_be_bytes_reduced(&bytes.0), Fr::from(5u64));
    }

    #[test]
    fn test_inverse() {
        let a = Fr::from(12345u64);
        let inv = a.inverse().unwrap();
        assert_eq!(a * inv, Fr::ONE);
        assert!(Fr::ZERO.inverse().is_none());
    }

    #[test]
    fn test_try_from_rejects_modulus() {
        assert!(Fr::try_from(Fr::MODULUS).is_err());
        assert!(Fr::try_from(Fr::MODULUS - U256::from(1u8)).is_ok());
    }

    #[test]
    fn test_bits_roundtrip() {
        let a = Fr::from(0b1011_0010u64);
        let bits = a.to_bits_le(8);
        assert_eq!(bits, vec![false, true, false, false, true, true, false, true]);
        assert_eq!(Fr::from_bits_le(&bits), a);
        assert_eq!(a.bit_len(), 8);
        assert!(!a.bit(300));
    }

    #[test]
    fn test_order_follows_integers() {
        assert!(Fr::from(3u64) < Fr::from(7u64));
        assert!(Fr::pow2(200) < -Fr::ONE);
    }

    #[test]
    fn test_bincode_roundtrip() {
        let a = Fr::from(255u64);
        let bytes = bincode::serialize(&a).unwrap();
        let back: Fr = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, a);
        assert_eq!(a.to_string(), "0xff");
    }

    #[test]
    fn test_json_is_hex_integer() {
        let json = serde_json::to_string(&Fr::from(255u64)).unwrap();
        assert_eq!(json, "\"0xff\"");
        let out_of_field = format!("\"0x{:x}\"", Fr::MODULUS);
        assert!(serde_json::from_str::<Fr>(&out_of_field).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_fr() -> impl Strategy<Value = Fr> {
        any::<[u64; 4]>().prop_map(|limbs| Fr::from_u256_reduced(U256::from_limbs(limbs)))
    }

    proptest! {
        #[test]
        fn test_mul_distributes(a in arb_fr(), b in arb_fr(), c in arb_fr()) {
            prop_assert_eq!(a * (b + c), a * b + a * c);
        }

        #[test]
        fn test_sub_inverts_add(a in arb_fr(), b in arb_fr()) {
            prop_assert_eq!((a + b) - b, a);
        }

        #[test]
        fn test_u256_roundtrip(a in arb_fr()) {
            prop_assert_eq!(Fr::try_from(a.as_u256()), Ok(a));
        }
    }
}
