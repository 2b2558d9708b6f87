//! Signed 248-bit integers
//!
//! The wire holds the two's-complement encoding modulo `2^248`; bit 247 is
//! the sign. The sign bit is decomposed on first use and cached on the value.

use super::{less_than, select, CircuitValue, Uint248};
use crate::builder::{CircuitBuilder, Variable};
use crate::errors::{CircuitError, Result};
use crate::field::Fr;
use crate::types::{I256, U256};
use core::cell::Cell;

pub const INT_BITS: usize = 248;

/// Two's-complement signed integer with a lazily cached sign bit
#[derive(Debug, Clone)]
pub struct Int248 {
    pub(crate) v: Variable,
    sign: Cell<Option<Variable>>,
}

impl Int248 {
    pub(crate) fn new(v: Variable) -> Self {
        Self {
            v,
            sign: Cell::new(None),
        }
    }

    pub fn variable(&self) -> Variable {
        self.v
    }

    /// Sign bit, if already materialized.
    pub fn cached_sign(&self) -> Option<Variable> {
        self.sign.get()
    }
}

impl CircuitValue for Int248 {
    fn values(&self) -> Vec<Variable> {
        vec![self.v]
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        Self::new(values[0])
    }
}

/// Encoding of a signed integer modulo `2^248`, `None` when out of range.
pub fn encode_i248(value: I256) -> Option<Fr> {
    let bound = I256::from_raw(U256::from(1u8) << (INT_BITS - 1));
    if value >= bound || value < -bound {
        return None;
    }
    let modulus = U256::from(1u8) << INT_BITS;
    let raw = value.into_raw() & (modulus - U256::from(1u8));
    Some(Fr::from_u256_reduced(raw))
}

/// Operations on [`Int248`]
pub struct Int248Api<'a, B> {
    b: &'a mut B,
}

impl<'a, B: CircuitBuilder> Int248Api<'a, B> {
    pub(crate) fn new(b: &'a mut B) -> Self {
        Self { b }
    }

    pub fn constant(&mut self, value: i64) -> Int248 {
        let encoded = encode_i248(I256::try_from(value).unwrap_or(I256::ZERO));
        Int248::new(self.b.constant(encoded.unwrap_or(Fr::ZERO)))
    }

    pub fn try_constant(&mut self, value: I256) -> Result<Int248> {
        let encoded = encode_i248(value).ok_or_else(|| {
            CircuitError::ValueOutOfRange(format!("{value} does not fit Int248"))
        })?;
        Ok(Int248::new(self.b.constant(encoded)))
    }

    /// Take an untrusted two's-complement wire, asserting its width.
    pub fn from_variable(&mut self, v: Variable) -> Int248 {
        let value = Int248::new(v);
        self.sign_bit(&value);
        value
    }

    /// Decompose once and cache bit 247.
    pub fn sign_bit(&mut self, a: &Int248) -> Variable {
        if let Some(sign) = a.sign.get() {
            return sign;
        }
        let bits = self.b.to_binary(a.v, INT_BITS);
        let sign = bits[INT_BITS - 1];
        a.sign.set(Some(sign));
        sign
    }

    pub fn is_negative(&mut self, a: &Int248) -> Uint248 {
        Uint248(self.sign_bit(a))
    }

    pub fn is_equal(&mut self, a: &Int248, c: &Int248) -> Uint248 {
        Uint248(self.b.is_equal(a.v, c.v))
    }

    pub fn is_zero(&mut self, a: &Int248) -> Uint248 {
        Uint248(self.b.is_zero(a.v))
    }

    /// Signed `a < c`: a negative left side against a non-negative right
    /// side is less, the reverse is not, and equal signs compare the
    /// encodings as unsigned values.
    pub fn is_less_than(&mut self, a: &Int248, c: &Int248) -> Uint248 {
        let sa = self.sign_bit(a);
        let sc = self.sign_bit(c);
        let signs_differ = self.b.xor(sa, sc);
        let unsigned = less_than(self.b, a.v, c.v, INT_BITS);
        Uint248(self.b.select(signs_differ, sa, unsigned))
    }

    pub fn is_greater_than(&mut self, a: &Int248, c: &Int248) -> Uint248 {
        self.is_less_than(c, a)
    }

    /// `(a + c) mod 2^248`
    pub fn add(&mut self, a: &Int248, c: &Int248) -> Int248 {
        let sum = self.b.add(a.v, c.v);
        self.truncate(sum)
    }

    /// `(a - c) mod 2^248`
    pub fn sub(&mut self, a: &Int248, c: &Int248) -> Int248 {
        let shifted = self.b.add_const(a.v, Fr::pow2(INT_BITS));
        let diff = self.b.sub(shifted, c.v);
        self.truncate(diff)
    }

    pub fn neg(&mut self, a: &Int248) -> Int248 {
        let zero = Int248::new(self.b.zero());
        self.sub(&zero, a)
    }

    fn truncate(&mut self, v: Variable) -> Int248 {
        let bits = self.b.to_binary(v, INT_BITS + 1);
        let low = self.b.from_binary(&bits[..INT_BITS]);
        let out = Int248::new(low);
        out.sign.set(Some(bits[INT_BITS - 1]));
        out
    }

    pub fn select(&mut self, s: Uint248, a: &Int248, c: &Int248) -> Int248 {
        select(self.b, s.0, a, c)
    }

    pub fn assert_is_equal(&mut self, a: &Int248, c: &Int248) {
        self.b.assert_is_equal(a.v, c.v);
    }

    pub fn assert_is_different(&mut self, a: &Int248, c: &Int248) {
        let eq = self.b.is_equal(a.v, c.v);
        let zero = self.b.zero();
        self.b.assert_is_equal(eq, zero);
    }

    /// Little-endian two's-complement bits.
    pub fn to_binary(&mut self, a: &Int248) -> Vec<Uint248> {
        let bits = self.b.to_binary(a.v, INT_BITS);
        a.sign.set(Some(bits[INT_BITS - 1]));
        bits.into_iter().map(Uint248).collect()
    }

    pub fn from_binary(&mut self, bits: &[Uint248]) -> Result<Int248> {
        if bits.len() != INT_BITS {
            return Err(CircuitError::ValueOutOfRange(format!(
                "Int248 needs {INT_BITS} bits, got {}",
                bits.len()
            )));
        }
        let wires: Vec<Variable> = bits.iter().map(|bit| bit.0).collect();
        let out = Int248::new(self.b.from_binary(&wires));
        out.sign.set(Some(wires[INT_BITS - 1]));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    fn flag(s: &Solver, v: Uint248) -> bool {
        s.value(v.0) == Some(Fr::ONE)
    }

    #[test]
    fn test_encoding() {
        assert_eq!(encode_i248(I256::ZERO), Some(Fr::ZERO));
        let minus_one = encode_i248(I256::MINUS_ONE).unwrap();
        assert_eq!(minus_one.bit_len(), INT_BITS);
        let too_big = I256::from_raw(U256::from(1u8) << 247);
        assert!(encode_i248(too_big).is_none());
    }

    #[test]
    fn test_signed_comparison_cases() {
        let mut s = Solver::new();
        let mut api = Int248Api::new(&mut s);
        let neg = api.constant(-5);
        let pos = api.constant(3);
        let neg_big = api.constant(-1);
        let a = api.is_less_than(&neg, &pos);
        let b = api.is_less_than(&pos, &neg);
        let c = api.is_less_than(&neg, &neg_big);
        let d = api.is_greater_than(&pos, &neg_big);
        let n = api.is_negative(&neg);
        assert!(flag(&s, a));
        assert!(!flag(&s, b));
        assert!(flag(&s, c));
        assert!(flag(&s, d));
        assert!(flag(&s, n));
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_sign_bit_is_cached() {
        let mut s = Solver::new();
        let mut api = Int248Api::new(&mut s);
        let v = api.constant(-7);
        assert!(v.cached_sign().is_none());
        let first = api.sign_bit(&v);
        let before = s.constraint_count();
        let mut api = Int248Api::new(&mut s);
        let second = api.sign_bit(&v);
        assert_eq!(first, second);
        assert_eq!(s.constraint_count(), before);
    }

    #[test]
    fn test_wrapping_add_sub() {
        let mut s = Solver::new();
        let mut api = Int248Api::new(&mut s);
        let a = api.constant(-10);
        let b = api.constant(4);
        let sum = api.add(&a, &b);
        let expected = api.constant(-6);
        api.assert_is_equal(&sum, &expected);
        let diff = api.sub(&b, &a);
        let expected = api.constant(14);
        api.assert_is_equal(&diff, &expected);
        let negated = api.neg(&b);
        let expected = api.constant(-4);
        api.assert_is_equal(&negated, &expected);
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_select_and_binary() {
        let mut s = Solver::new();
        let one = s.one();
        let mut api = Int248Api::new(&mut s);
        let a = api.constant(-2);
        let b = api.constant(2);
        let picked = api.select(Uint248(one), &a, &b);
        api.assert_is_equal(&picked, &a);
        let bits = api.to_binary(&a);
        let back = api.from_binary(&bits).unwrap();
        api.assert_is_equal(&back, &a);
        api.assert_is_different(&a, &b);
        assert!(s.is_satisfied());
    }
}
