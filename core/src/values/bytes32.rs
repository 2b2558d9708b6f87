//! 32-byte words
//!
//! A word is split into two limbs that each fit one field element: `lo`
//! holds the low 248 bits (bytes 1..32 big-endian), `hi` the top byte.

use super::{select, CircuitValue, Uint248};
use crate::builder::{CircuitBuilder, Variable};
use crate::errors::{CircuitError, Result};
use crate::field::Fr;
use crate::types::{B256, U256};

/// Bits in the low limb
pub const LO_BITS: usize = 248;

/// Bits in the high limb
pub const HI_BITS: usize = 8;

/// 32-byte value as `{lo: 248 bits, hi: 8 bits}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bytes32 {
    pub(crate) lo: Variable,
    pub(crate) hi: Variable,
}

impl Bytes32 {
    pub fn lo(&self) -> Variable {
        self.lo
    }

    pub fn hi(&self) -> Variable {
        self.hi
    }
}

impl CircuitValue for Bytes32 {
    fn values(&self) -> Vec<Variable> {
        vec![self.lo, self.hi]
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        Self {
            lo: values[0],
            hi: values[1],
        }
    }
}

/// Native limbs of a word, `(lo, hi)`.
pub fn split_word(word: &B256) -> (Fr, Fr) {
    let mut lo = [0u8; 32];
    lo[1..].copy_from_slice(&word[1..]);
    (
        Fr::from_u256_reduced(U256::from_be_bytes(lo)),
        Fr::from(word[0] as u64),
    )
}

/// Operations on [`Bytes32`]
pub struct Bytes32Api<'a, B> {
    b: &'a mut B,
}

impl<'a, B: CircuitBuilder> Bytes32Api<'a, B> {
    pub(crate) fn new(b: &'a mut B) -> Self {
        Self { b }
    }

    pub fn constant(&mut self, word: B256) -> Bytes32 {
        let (lo, hi) = split_word(&word);
        Bytes32 {
            lo: self.b.constant(lo),
            hi: self.b.constant(hi),
        }
    }

    /// Secret word; limb widths are asserted.
    pub fn witness(&mut self, word: B256) -> Bytes32 {
        let (lo, hi) = split_word(&word);
        let lo = self.b.secret_input(lo);
        let hi = self.b.secret_input(hi);
        self.b.assert_in_range(lo, LO_BITS);
        self.b.assert_in_range(hi, HI_BITS);
        Bytes32 { lo, hi }
    }

    /// 256 little-endian bits: 248 from `lo`, then 8 from `hi`.
    pub fn to_binary(&mut self, v: Bytes32) -> Vec<Uint248> {
        let mut bits = self.b.to_binary(v.lo, LO_BITS);
        bits.extend(self.b.to_binary(v.hi, HI_BITS));
        bits.into_iter().map(Uint248).collect()
    }

    /// Inverse of [`Self::to_binary`]; shorter inputs are zero-extended.
    pub fn from_binary(&mut self, bits: &[Uint248]) -> Result<Bytes32> {
        if bits.len() > LO_BITS + HI_BITS {
            return Err(CircuitError::ValueOutOfRange(format!(
                "{} bits do not fit Bytes32",
                bits.len()
            )));
        }
        let wires: Vec<Variable> = bits.iter().map(|bit| bit.0).collect();
        let split = wires.len().min(LO_BITS);
        let lo = self.b.from_binary(&wires[..split]);
        let hi = self.b.from_binary(&wires[split..]);
        Ok(Bytes32 { lo, hi })
    }

    pub fn is_equal(&mut self, a: Bytes32, c: Bytes32) -> Uint248 {
        let lo = self.b.is_equal(a.lo, c.lo);
        let hi = self.b.is_equal(a.hi, c.hi);
        Uint248(self.b.and(lo, hi))
    }

    pub fn is_zero(&mut self, a: Bytes32) -> Uint248 {
        let lo = self.b.is_zero(a.lo);
        let hi = self.b.is_zero(a.hi);
        Uint248(self.b.and(lo, hi))
    }

    pub fn select(&mut self, s: Uint248, a: Bytes32, c: Bytes32) -> Bytes32 {
        select(self.b, s.0, &a, &c)
    }

    pub fn assert_is_equal(&mut self, a: Bytes32, c: Bytes32) {
        self.b.assert_is_equal(a.lo, c.lo);
        self.b.assert_is_equal(a.hi, c.hi);
    }

    pub fn assert_is_different(&mut self, a: Bytes32, c: Bytes32) {
        let eq = self.is_equal(a, c);
        let zero = self.b.zero();
        self.b.assert_is_equal(eq.0, zero);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    #[test]
    fn test_split_word() {
        let word = B256::from_slice(&[0xab; 32]);
        let (lo, hi) = split_word(&word);
        assert_eq!(hi, Fr::from(0xabu64));
        assert_eq!(lo.bit_len(), 248);
    }

    #[test]
    fn test_bits_match_big_endian_word() {
        let mut word = [0u8; 32];
        word[0] = 0x80;
        word[31] = 0x01;
        let mut s = Solver::new();
        let mut api = Bytes32Api::new(&mut s);
        let v = api.witness(B256::from(word));
        let bits = api.to_binary(v);
        assert_eq!(bits.len(), 256);
        let set: Vec<usize> = bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| s.value(bit.0) == Some(Fr::ONE))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(set, vec![0, 255]);
    }

    #[test]
    fn test_binary_roundtrip_and_equality() {
        let mut s = Solver::new();
        let mut api = Bytes32Api::new(&mut s);
        let v = api.constant(B256::repeat_byte(0x5a));
        let bits = api.to_binary(v);
        let back = api.from_binary(&bits).unwrap();
        let eq = api.is_equal(v, back);
        api.assert_is_equal(v, back);
        let zero = api.constant(B256::ZERO);
        let z = api.is_zero(zero);
        api.assert_is_different(v, zero);
        assert_eq!(s.value(eq.0), Some(Fr::ONE));
        assert_eq!(s.value(z.0), Some(Fr::ONE));
        assert!(s.is_satisfied());
    }
}
