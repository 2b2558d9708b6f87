//! Integers modulo `2^521 - 1`
//!
//! Emulated over six 96-bit limbs, least significant first. Every value
//! produced here is canonical: limbs are range-checked (the top limb to 41
//! bits) and the value differs from the modulus. Results of `add`, `sub`,
//! `mul` and `div` come from hints and are verified with a limb-wise carry
//! identity, exact over the integers because every column stays far below
//! the field modulus.

use super::{select, CircuitValue, Uint248};
use crate::builder::{CircuitBuilder, Variable};
use crate::errors::{CircuitError, Result};
use crate::field::Fr;
use crate::hints::{
    p521, wide_to_limbs, HintId, CARRY_OFFSET_BITS, WIDE_LIMBS, WIDE_LIMB_BITS,
};
use crate::types::Wide;

/// Significant bits of a canonical value
pub const UINT521_BITS: usize = 521;

const TOP_LIMB_BITS: usize = UINT521_BITS - WIDE_LIMB_BITS * (WIDE_LIMBS - 1);

/// Canonical integer modulo `2^521 - 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uint521 {
    pub(crate) limbs: [Variable; WIDE_LIMBS],
}

impl Uint521 {
    pub fn limbs(&self) -> &[Variable; WIDE_LIMBS] {
        &self.limbs
    }

    fn from_slice(limbs: &[Variable]) -> Self {
        let mut out = [limbs[0]; WIDE_LIMBS];
        out.copy_from_slice(&limbs[..WIDE_LIMBS]);
        Self { limbs: out }
    }
}

impl CircuitValue for Uint521 {
    fn values(&self) -> Vec<Variable> {
        self.limbs.to_vec()
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        Self::from_slice(values)
    }
}

fn limb_bits(i: usize) -> usize {
    if i == WIDE_LIMBS - 1 {
        TOP_LIMB_BITS
    } else {
        WIDE_LIMB_BITS
    }
}

/// Operations on [`Uint521`]
pub struct Uint521Api<'a, B> {
    b: &'a mut B,
}

impl<'a, B: CircuitBuilder> Uint521Api<'a, B> {
    pub(crate) fn new(b: &'a mut B) -> Self {
        Self { b }
    }

    pub fn constant(&mut self, value: Wide) -> Result<Uint521> {
        if value >= p521() {
            return Err(CircuitError::ValueOutOfRange(
                "constant is not below 2^521 - 1".into(),
            ));
        }
        let limbs: Vec<Variable> = wide_to_limbs(value, WIDE_LIMBS)
            .into_iter()
            .map(|limb| self.b.constant(limb))
            .collect();
        Ok(Uint521::from_slice(&limbs))
    }

    pub fn const_u64(&mut self, value: u64) -> Uint521 {
        let zero = self.b.zero();
        let mut limbs = [zero; WIDE_LIMBS];
        limbs[0] = self.b.constant(Fr::from(value));
        Uint521 { limbs }
    }

    /// Recompose up to 521 little-endian bits.
    pub fn from_binary(&mut self, bits: &[Uint248]) -> Result<Uint521> {
        if bits.len() > UINT521_BITS {
            return Err(CircuitError::ValueOutOfRange(format!(
                "{} bits do not fit Uint521",
                bits.len()
            )));
        }
        let wires: Vec<Variable> = bits.iter().map(|bit| bit.0).collect();
        let mut limbs = Vec::with_capacity(WIDE_LIMBS);
        for i in 0..WIDE_LIMBS {
            let start = (i * WIDE_LIMB_BITS).min(wires.len());
            let end = (start + limb_bits(i)).min(wires.len());
            limbs.push(self.b.from_binary(&wires[start..end]));
        }
        let out = Uint521::from_slice(&limbs);
        self.assert_not_modulus(&out);
        Ok(out)
    }

    /// First `n` little-endian bits; bits beyond `n` are asserted zero.
    pub fn to_binary(&mut self, v: Uint521, n: usize) -> Vec<Uint248> {
        let mut bits = Vec::with_capacity(UINT521_BITS);
        for (i, limb) in v.limbs.iter().enumerate() {
            bits.extend(self.b.to_binary(*limb, limb_bits(i)));
        }
        let zero = self.b.zero();
        for bit in bits.iter().skip(n) {
            self.b.assert_is_equal(*bit, zero);
        }
        bits.resize(n, zero);
        bits.into_iter().map(Uint248).collect()
    }

    pub fn add(&mut self, a: Uint521, c: Uint521) -> Uint521 {
        let out = self.hint_operands(HintId::WideAddMod, &a, &c, 1 + WIDE_LIMBS);
        let q = out[0];
        self.b.assert_is_boolean(q);
        let r = self.canonical(&out[1..]);
        // a + c == q * p + r
        let lhs: Vec<Variable> = (0..WIDE_LIMBS).map(|k| self.b.add(a.limbs[k], c.limbs[k])).collect();
        let qp = self.scaled_modulus(&[q]);
        let rhs = self.add_columns(&qp, &r.limbs);
        self.assert_columns_equal(&lhs, &rhs);
        r
    }

    pub fn sub(&mut self, a: Uint521, c: Uint521) -> Uint521 {
        let out = self.hint_operands(HintId::WideSubMod, &a, &c, 1 + WIDE_LIMBS);
        let q = out[0];
        self.b.assert_is_boolean(q);
        let r = self.canonical(&out[1..]);
        // c + r == a + q * p
        let lhs: Vec<Variable> = (0..WIDE_LIMBS).map(|k| self.b.add(c.limbs[k], r.limbs[k])).collect();
        let qp = self.scaled_modulus(&[q]);
        let rhs = self.add_columns(&qp, &a.limbs);
        self.assert_columns_equal(&lhs, &rhs);
        r
    }

    pub fn mul(&mut self, a: Uint521, c: Uint521) -> Uint521 {
        let out = self.hint_operands(HintId::WideMulMod, &a, &c, 2 * WIDE_LIMBS);
        let q = self.canonical(&out[..WIDE_LIMBS]);
        let r = self.canonical(&out[WIDE_LIMBS..]);
        // a * c == q * p + r
        let lhs = self.product_columns(&a.limbs, &c.limbs);
        let qp = self.scaled_modulus(&q.limbs);
        let rhs = self.add_columns(&qp, &r.limbs);
        self.assert_columns_equal(&lhs, &rhs);
        r
    }

    /// Integer quotient and remainder; a zero divisor is unsatisfiable.
    pub fn div(&mut self, a: Uint521, d: Uint521) -> (Uint521, Uint521) {
        let out = self.hint_operands(HintId::WideQuoRem, &a, &d, 2 * WIDE_LIMBS);
        let q = self.canonical(&out[..WIDE_LIMBS]);
        let r = self.canonical(&out[WIDE_LIMBS..]);
        // a == q * d + r
        let qd = self.product_columns(&q.limbs, &d.limbs);
        let rhs = self.add_columns(&qd, &r.limbs);
        self.assert_columns_equal(&a.limbs, &rhs);
        // d != 0 and r <= d - 1
        let zero = self.const_u64(0);
        let is_zero = self.is_equal(d, zero);
        let no = self.b.zero();
        self.b.assert_is_equal(is_zero.0, no);
        let one = self.const_u64(1);
        let bound = self.sub(d, one);
        self.assert_is_less_or_equal(r, bound);
        (q, r)
    }

    pub fn is_equal(&mut self, a: Uint521, c: Uint521) -> Uint248 {
        let mut acc = self.b.one();
        for k in 0..WIDE_LIMBS {
            let eq = self.b.is_equal(a.limbs[k], c.limbs[k]);
            acc = self.b.and(acc, eq);
        }
        Uint248(acc)
    }

    pub fn select(&mut self, s: Uint248, a: Uint521, c: Uint521) -> Uint521 {
        select(self.b, s.0, &a, &c)
    }

    pub fn assert_is_equal(&mut self, a: Uint521, c: Uint521) {
        for k in 0..WIDE_LIMBS {
            self.b.assert_is_equal(a.limbs[k], c.limbs[k]);
        }
    }

    pub fn assert_is_less_or_equal(&mut self, a: Uint521, c: Uint521) {
        // c - a as an integer; a wrapped difference breaks the identity
        let out = self.hint_operands(HintId::WideSubMod, &c, &a, 1 + WIDE_LIMBS);
        let d = self.canonical(&out[1..]);
        let lhs = self.add_columns(&a.limbs, &d.limbs);
        self.assert_columns_equal(&lhs, &c.limbs);
    }

    fn hint_operands(&mut self, id: HintId, a: &Uint521, c: &Uint521, n_out: usize) -> Vec<Variable> {
        let mut inputs = a.limbs.to_vec();
        inputs.extend_from_slice(&c.limbs);
        self.b.hint(id, &inputs, n_out)
    }

    /// Range-check hinted limbs and reject the modulus itself.
    fn canonical(&mut self, limbs: &[Variable]) -> Uint521 {
        for (i, limb) in limbs.iter().enumerate() {
            self.b.assert_in_range(*limb, limb_bits(i));
        }
        let out = Uint521::from_slice(limbs);
        self.assert_not_modulus(&out);
        out
    }

    fn assert_not_modulus(&mut self, v: &Uint521) {
        let mut all = self.b.one();
        for (i, limb) in v.limbs.iter().enumerate() {
            let max = Fr::pow2(limb_bits(i)) - Fr::ONE;
            let k = self.b.constant(max);
            let eq = self.b.is_equal(*limb, k);
            all = self.b.and(all, eq);
        }
        let zero = self.b.zero();
        self.b.assert_is_equal(all, zero);
    }

    fn modulus_limbs() -> Vec<Fr> {
        (0..WIDE_LIMBS)
            .map(|i| Fr::pow2(limb_bits(i)) - Fr::ONE)
            .collect()
    }

    fn product_columns(&mut self, a: &[Variable], c: &[Variable]) -> Vec<Variable> {
        let mut columns: Vec<Option<Variable>> = vec![None; a.len() + c.len() - 1];
        for (i, x) in a.iter().enumerate() {
            for (j, y) in c.iter().enumerate() {
                let term = self.b.mul(*x, *y);
                columns[i + j] = Some(match columns[i + j] {
                    Some(acc) => self.b.add(acc, term),
                    None => term,
                });
            }
        }
        columns.into_iter().flatten().collect()
    }

    fn scaled_modulus(&mut self, q: &[Variable]) -> Vec<Variable> {
        let p = Self::modulus_limbs();
        let mut columns: Vec<Option<Variable>> = vec![None; q.len() + p.len() - 1];
        for (i, x) in q.iter().enumerate() {
            for (j, k) in p.iter().enumerate() {
                let term = self.b.mul_const(*x, *k);
                columns[i + j] = Some(match columns[i + j] {
                    Some(acc) => self.b.add(acc, term),
                    None => term,
                });
            }
        }
        columns.into_iter().flatten().collect()
    }

    fn add_columns(&mut self, x: &[Variable], y: &[Variable]) -> Vec<Variable> {
        (0..x.len().max(y.len()))
            .map(|k| match (x.get(k), y.get(k)) {
                (Some(l), Some(r)) => self.b.add(*l, *r),
                (Some(v), None) | (None, Some(v)) => *v,
                (None, None) => unreachable!("column index within both lengths"),
            })
            .collect()
    }

    /// Assert `sum(lhs[k] * 2^(96k)) == sum(rhs[k] * 2^(96k))` over the
    /// integers, using hinted carries shifted by `2^104`.
    fn assert_columns_equal(&mut self, lhs: &[Variable], rhs: &[Variable]) {
        let n = lhs.len().max(rhs.len());
        let diffs: Vec<Variable> = (0..n)
            .map(|k| match (lhs.get(k), rhs.get(k)) {
                (Some(l), Some(r)) => self.b.sub(*l, *r),
                (Some(l), None) => *l,
                (None, Some(r)) => self.b.neg(*r),
                (None, None) => unreachable!("column index within both lengths"),
            })
            .collect();
        let carries = self.b.hint(HintId::WideCarries, &diffs, n);
        let offset = Fr::pow2(CARRY_OFFSET_BITS);
        let shift = Fr::pow2(WIDE_LIMB_BITS);
        let mut carry_in = self.b.constant(offset);
        for (diff, carry) in diffs.iter().zip(&carries) {
            self.b.assert_in_range(*carry, CARRY_OFFSET_BITS + 1);
            let t = self.b.add(*diff, carry_in);
            let t = self.b.add_const(t, -offset);
            let out = self.b.add_const(*carry, -offset);
            let out = self.b.mul_const(out, shift);
            self.b.assert_is_equal(t, out);
            carry_in = *carry;
        }
        let settled = self.b.constant(offset);
        self.b.assert_is_equal(carry_in, settled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::limbs_to_wide;
    use crate::solver::Solver;

    fn read(s: &Solver, v: &Uint521) -> Wide {
        let limbs: Vec<Fr> = v.limbs.iter().map(|l| s.value(*l).unwrap_or_default()).collect();
        limbs_to_wide(&limbs)
    }

    fn big(seed: u64) -> Wide {
        // a value spanning every limb
        (p521() / Wide::from(seed)) + Wide::from(seed * 7919)
    }

    #[test]
    fn test_mul_matches_native() {
        let (x, y) = (big(3), big(5));
        let mut s = Solver::new();
        let mut api = Uint521Api::new(&mut s);
        let a = api.constant(x).unwrap();
        let c = api.constant(y).unwrap();
        let r = api.mul(a, c);
        assert_eq!(read(&s, &r), (x * y) % p521());
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_add_and_sub_wrap() {
        let x = p521() - Wide::from(2u64);
        let mut s = Solver::new();
        let mut api = Uint521Api::new(&mut s);
        let a = api.constant(x).unwrap();
        let five = api.const_u64(5);
        let sum = api.add(a, five);
        let back = api.sub(sum, five);
        api.assert_is_equal(back, a);
        let under = api.sub(five, a);
        assert_eq!(read(&s, &sum), Wide::from(3u64));
        assert_eq!(read(&s, &under), Wide::from(7u64));
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_integer_division() {
        let x = big(11);
        let mut s = Solver::new();
        let mut api = Uint521Api::new(&mut s);
        let a = api.constant(x).unwrap();
        let d = api.const_u64(1_000_003);
        let (q, r) = api.div(a, d);
        assert_eq!(read(&s, &q), x / Wide::from(1_000_003u64));
        assert_eq!(read(&s, &r), x % Wide::from(1_000_003u64));
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_division_by_zero_unsatisfiable() {
        let mut s = Solver::new();
        let mut api = Uint521Api::new(&mut s);
        let a = api.const_u64(10);
        let d = api.const_u64(0);
        api.div(a, d);
        assert!(!s.is_satisfied());
    }

    #[test]
    fn test_less_or_equal() {
        let mut s = Solver::new();
        let mut api = Uint521Api::new(&mut s);
        let small = api.const_u64(4);
        let large = api.constant(big(2)).unwrap();
        api.assert_is_less_or_equal(small, large);
        api.assert_is_less_or_equal(small, small);
        assert!(s.is_satisfied());

        let mut api = Uint521Api::new(&mut s);
        api.assert_is_less_or_equal(large, small);
        assert!(!s.is_satisfied());
    }

    #[test]
    fn test_binary_roundtrip() {
        let x = big(13);
        let mut s = Solver::new();
        let mut api = Uint521Api::new(&mut s);
        let a = api.constant(x).unwrap();
        let bits = api.to_binary(a, UINT521_BITS);
        let back = api.from_binary(&bits).unwrap();
        let eq = api.is_equal(a, back);
        assert_eq!(s.value(eq.0), Some(Fr::ONE));
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_constant_rejects_modulus() {
        let mut s = Solver::new();
        let mut api = Uint521Api::new(&mut s);
        assert!(api.constant(p521()).is_err());
    }
}
