//! Fixed-width unsigned integers
//!
//! `add`, `sub` and `mul` are plain field operations: they wrap modulo the
//! field, not modulo `2^BITS`, and overflow checks are left to the circuit
//! author. Division, square root and comparison take their result from a
//! hint and re-check it in-circuit.

use super::{less_than, select, CircuitValue};
use crate::builder::{CircuitBuilder, Variable};
use crate::errors::{CircuitError, Result};
use crate::field::{Fr, PACK_CHUNK_BITS};
use crate::hints::HintId;
use crate::types::U256;
use core::marker::PhantomData;

/// Unsigned integer carried by one wire, below `2^BITS`
pub trait Unsigned: CircuitValue + Copy {
    const BITS: usize;
    const NAME: &'static str;

    /// Wrap a wire whose width is already enforced.
    fn wrap(v: Variable) -> Self;

    fn variable(&self) -> Variable;
}

macro_rules! unsigned {
    ($name:ident, $bits:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub(crate) Variable);

        impl Unsigned for $name {
            const BITS: usize = $bits;
            const NAME: &'static str = stringify!($name);

            fn wrap(v: Variable) -> Self {
                Self(v)
            }

            fn variable(&self) -> Variable {
                self.0
            }
        }

        impl CircuitValue for $name {
            fn values(&self) -> Vec<Variable> {
                vec![self.0]
            }

            fn with_values(&self, values: &[Variable]) -> Self {
                Self(values[0])
            }
        }
    };
}

unsigned!(Uint32, 32, "32-bit unsigned integer");
unsigned!(Uint64, 64, "64-bit unsigned integer");
unsigned!(Uint248, 248, "248-bit unsigned integer, also used for 0/1 flags");

/// Operations on one unsigned type
pub struct UintApi<'a, B, T> {
    b: &'a mut B,
    _ty: PhantomData<T>,
}

impl<'a, B: CircuitBuilder, T: Unsigned> UintApi<'a, B, T> {
    pub(crate) fn new(b: &'a mut B) -> Self {
        Self {
            b,
            _ty: PhantomData,
        }
    }

    /// Checked constant.
    pub fn try_constant(&mut self, value: U256) -> Result<T> {
        if value.bit_len() > T::BITS {
            return Err(CircuitError::ValueOutOfRange(format!(
                "0x{value:x} does not fit {}",
                T::NAME
            )));
        }
        Ok(T::wrap(self.b.constant(Fr::from_u256_reduced(value))))
    }

    pub fn zero(&mut self) -> T {
        T::wrap(self.b.zero())
    }

    pub fn one(&mut self) -> T {
        T::wrap(self.b.one())
    }

    /// `2^BITS - 1`
    pub fn max_value(&mut self) -> T {
        let max = (U256::from(1u8) << T::BITS) - U256::from(1u8);
        T::wrap(self.b.constant(Fr::from_u256_reduced(max)))
    }

    /// Take an untrusted wire, asserting it fits the type.
    pub fn from_variable(&mut self, v: Variable) -> T {
        self.b.assert_in_range(v, T::BITS);
        T::wrap(v)
    }

    pub fn add(&mut self, a: T, c: T) -> T {
        T::wrap(self.b.add(a.variable(), c.variable()))
    }

    pub fn sub(&mut self, a: T, c: T) -> T {
        T::wrap(self.b.sub(a.variable(), c.variable()))
    }

    pub fn mul(&mut self, a: T, c: T) -> T {
        T::wrap(self.b.mul(a.variable(), c.variable()))
    }

    /// Quotient and remainder.
    ///
    /// Asserts `q * d + r == a`, `r < d` and the width of `q`, so a zero
    /// divisor makes the circuit unsatisfiable. When `q * d` could wrap the
    /// field, the product is first bounded limb-wise so the identity holds
    /// over the integers.
    pub fn div(&mut self, a: T, d: T) -> (T, T) {
        let out = self.b.hint(HintId::QuoRem, &[a.variable(), d.variable()], 2);
        let (q, r) = (out[0], out[1]);
        self.b.assert_in_range(q, T::BITS);
        self.b.assert_in_range(r, T::BITS);
        if 2 * T::BITS >= PACK_CHUNK_BITS {
            self.assert_product_bounded(q, d.variable());
        }
        let product = self.b.mul(q, d.variable());
        let total = self.b.add(product, r);
        self.b.assert_is_equal(total, a.variable());
        let remainder_ok = less_than(self.b, r, d.variable(), T::BITS);
        let one = self.b.one();
        self.b.assert_is_equal(remainder_ok, one);
        (T::wrap(q), T::wrap(r))
    }

    /// Assert `x * y < 2^(BITS + 1)` over the integers for `x, y < 2^BITS`.
    ///
    /// With `x = x0 + x1 * 2^h` and `y = y0 + y1 * 2^h`: `x1 * y1 == 0` and
    /// `x0 * y1 + x1 * y0 < 2^(BITS - h)`. No term involved reaches the
    /// modulus, so both checks are exact.
    fn assert_product_bounded(&mut self, x: Variable, y: Variable) {
        let h = T::BITS.div_ceil(2);
        let (x0, x1) = self.split(x, h);
        let (y0, y1) = self.split(y, h);
        let high = self.b.mul(x1, y1);
        let zero = self.b.zero();
        self.b.assert_is_equal(high, zero);
        let left = self.b.mul(x0, y1);
        let right = self.b.mul(x1, y0);
        let cross = self.b.add(left, right);
        self.b.assert_in_range(cross, T::BITS - h);
    }

    /// `v = lo + hi * 2^bits`, both halves range-checked.
    fn split(&mut self, v: Variable, bits: usize) -> (Variable, Variable) {
        let base = self.b.constant(Fr::pow2(bits));
        let out = self.b.hint(HintId::QuoRem, &[v, base], 2);
        let (hi, lo) = (out[0], out[1]);
        self.b.assert_in_range(lo, bits);
        self.b.assert_in_range(hi, T::BITS - bits);
        let shifted = self.b.mul_const(hi, Fr::pow2(bits));
        let total = self.b.add(shifted, lo);
        self.b.assert_is_equal(total, v);
        (lo, hi)
    }

    /// Floor of the square root.
    pub fn sqrt(&mut self, a: T) -> T {
        let s = self.b.hint(HintId::Sqrt, &[a.variable()], 1)[0];
        self.b.assert_in_range(s, T::BITS / 2 + 1);
        let one = self.b.one();
        // s^2 <= a
        let square = self.b.mul(s, s);
        let above = less_than(self.b, a.variable(), square, T::BITS + 2);
        let zero = self.b.zero();
        self.b.assert_is_equal(above, zero);
        // a < (s + 1)^2
        let next = self.b.add(s, one);
        let next_square = self.b.mul(next, next);
        let below = less_than(self.b, a.variable(), next_square, T::BITS + 2);
        self.b.assert_is_equal(below, one);
        T::wrap(s)
    }

    /// Three-way comparison: `-1`, `0` or `1` as a field element.
    pub fn cmp(&mut self, a: T, c: T) -> Variable {
        let lt = less_than(self.b, a.variable(), c.variable(), T::BITS);
        let gt = less_than(self.b, c.variable(), a.variable(), T::BITS);
        self.b.sub(gt, lt)
    }

    pub fn is_less_than(&mut self, a: T, c: T) -> Uint248 {
        Uint248(less_than(self.b, a.variable(), c.variable(), T::BITS))
    }

    pub fn is_greater_than(&mut self, a: T, c: T) -> Uint248 {
        Uint248(less_than(self.b, c.variable(), a.variable(), T::BITS))
    }

    pub fn is_less_or_equal(&mut self, a: T, c: T) -> Uint248 {
        let gt = less_than(self.b, c.variable(), a.variable(), T::BITS);
        Uint248(self.b.not(gt))
    }

    pub fn is_greater_or_equal(&mut self, a: T, c: T) -> Uint248 {
        let lt = less_than(self.b, a.variable(), c.variable(), T::BITS);
        Uint248(self.b.not(lt))
    }

    pub fn is_equal(&mut self, a: T, c: T) -> Uint248 {
        Uint248(self.b.is_equal(a.variable(), c.variable()))
    }

    pub fn is_zero(&mut self, a: T) -> Uint248 {
        Uint248(self.b.is_zero(a.variable()))
    }

    pub fn select(&mut self, s: Uint248, a: T, c: T) -> T {
        select(self.b, s.0, &a, &c)
    }

    pub fn assert_is_equal(&mut self, a: T, c: T) {
        self.b.assert_is_equal(a.variable(), c.variable());
    }

    pub fn assert_is_different(&mut self, a: T, c: T) {
        let eq = self.b.is_equal(a.variable(), c.variable());
        let zero = self.b.zero();
        self.b.assert_is_equal(eq, zero);
    }

    pub fn assert_is_less_or_equal(&mut self, a: T, c: T) {
        let gt = less_than(self.b, c.variable(), a.variable(), T::BITS);
        let zero = self.b.zero();
        self.b.assert_is_equal(gt, zero);
    }

    /// Little-endian bits of `a`, asserting `a < 2^n`.
    pub fn to_binary(&mut self, a: T, n: usize) -> Vec<Uint248> {
        self.b
            .to_binary(a.variable(), n)
            .into_iter()
            .map(Uint248)
            .collect()
    }

    pub fn from_binary(&mut self, bits: &[Uint248]) -> Result<T> {
        if bits.len() > T::BITS {
            return Err(CircuitError::ValueOutOfRange(format!(
                "{} bits do not fit {}",
                bits.len(),
                T::NAME
            )));
        }
        let wires: Vec<Variable> = bits.iter().map(|bit| bit.0).collect();
        Ok(T::wrap(self.b.from_binary(&wires)))
    }
}

impl<'a, B: CircuitBuilder> UintApi<'a, B, Uint32> {
    pub fn constant(&mut self, value: u32) -> Uint32 {
        Uint32(self.b.constant(Fr::from(value)))
    }
}

impl<'a, B: CircuitBuilder> UintApi<'a, B, Uint64> {
    pub fn constant(&mut self, value: u64) -> Uint64 {
        Uint64(self.b.constant(Fr::from(value)))
    }
}

impl<'a, B: CircuitBuilder> UintApi<'a, B, Uint248> {
    pub fn constant(&mut self, value: u64) -> Uint248 {
        Uint248(self.b.constant(Fr::from(value)))
    }

    /// Logical AND of 0/1 flags.
    pub fn and(&mut self, a: Uint248, c: Uint248) -> Uint248 {
        Uint248(self.b.and(a.0, c.0))
    }

    pub fn or(&mut self, a: Uint248, c: Uint248) -> Uint248 {
        Uint248(self.b.or(a.0, c.0))
    }

    pub fn not(&mut self, a: Uint248) -> Uint248 {
        Uint248(self.b.not(a.0))
    }

    pub fn assert_is_true(&mut self, a: Uint248) {
        let one = self.b.one();
        self.b.assert_is_equal(a.0, one);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConstraintKind;
    use crate::solver::Solver;

    fn val(s: &Solver, v: impl Unsigned) -> u64 {
        s.value(v.variable()).map(|f| f.low_u64()).unwrap_or(u64::MAX)
    }

    #[test]
    fn test_div_and_remainder() {
        let mut s = Solver::new();
        let mut api = UintApi::<_, Uint248>::new(&mut s);
        let a = api.constant(100);
        let d = api.constant(7);
        let (q, r) = api.div(a, d);
        assert_eq!(val(&s, q), 14);
        assert_eq!(val(&s, r), 2);
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_div_by_zero_is_unsatisfiable() {
        let mut s = Solver::new();
        let mut api = UintApi::<_, Uint64>::new(&mut s);
        let a = api.constant(5);
        let d = api.constant(0);
        api.div(a, d);
        assert!(!s.is_satisfied());
    }

    #[test]
    fn test_div_with_wide_operands() {
        let mut s = Solver::new();
        let mut api = UintApi::<_, Uint248>::new(&mut s);
        let a = api
            .try_constant((U256::from(1u8) << 247) + U256::from(5u8))
            .unwrap();
        let d = api.try_constant(U256::from(1u8) << 130).unwrap();
        let (q, r) = api.div(a, d);
        assert_eq!(s.value(q.variable()), Some(Fr::pow2(117)));
        assert_eq!(val(&s, r), 5);

        let mut api = UintApi::<_, Uint248>::new(&mut s);
        let big = api.try_constant(U256::from(1u8) << 240).unwrap();
        let (q, r) = api.div(big, big);
        assert_eq!(val(&s, q), 1);
        assert_eq!(val(&s, r), 0);
        assert!(s.is_satisfied());
    }

    /// Solver whose quotient hint answers one chosen division with a fixed pair
    struct ForgedQuotient {
        inner: Solver,
        operands: (Fr, Fr),
        answer: (Fr, Fr),
    }

    impl CircuitBuilder for ForgedQuotient {
        fn constant(&mut self, value: Fr) -> Variable {
            self.inner.constant(value)
        }

        fn public_input(&mut self, value: Fr) -> Variable {
            self.inner.public_input(value)
        }

        fn secret_input(&mut self, value: Fr) -> Variable {
            self.inner.secret_input(value)
        }

        fn add(&mut self, a: Variable, b: Variable) -> Variable {
            self.inner.add(a, b)
        }

        fn sub(&mut self, a: Variable, b: Variable) -> Variable {
            self.inner.sub(a, b)
        }

        fn mul(&mut self, a: Variable, b: Variable) -> Variable {
            self.inner.mul(a, b)
        }

        fn mul_const(&mut self, a: Variable, k: Fr) -> Variable {
            self.inner.mul_const(a, k)
        }

        fn is_zero(&mut self, a: Variable) -> Variable {
            self.inner.is_zero(a)
        }

        fn select(&mut self, s: Variable, a: Variable, b: Variable) -> Variable {
            self.inner.select(s, a, b)
        }

        fn to_binary(&mut self, a: Variable, n: usize) -> Vec<Variable> {
            self.inner.to_binary(a, n)
        }

        fn from_binary(&mut self, bits: &[Variable]) -> Variable {
            self.inner.from_binary(bits)
        }

        fn assert_is_equal(&mut self, a: Variable, b: Variable) {
            self.inner.assert_is_equal(a, b)
        }

        fn assert_is_boolean(&mut self, a: Variable) {
            self.inner.assert_is_boolean(a)
        }

        fn assert_in_range(&mut self, a: Variable, bits: usize) {
            self.inner.assert_in_range(a, bits)
        }

        fn hint(&mut self, id: HintId, inputs: &[Variable], n_out: usize) -> Vec<Variable> {
            let values: Vec<Option<Fr>> = inputs.iter().map(|v| self.inner.value(*v)).collect();
            let (a, d) = self.operands;
            if id == HintId::QuoRem && values == [Some(a), Some(d)] {
                let (q, r) = self.answer;
                return vec![self.inner.secret_input(q), self.inner.secret_input(r)];
            }
            self.inner.hint(id, inputs, n_out)
        }

        fn value(&self, a: Variable) -> Option<Fr> {
            self.inner.value(a)
        }

        fn constraint_count(&self) -> usize {
            self.inner.constraint_count()
        }
    }

    /// A pair `(q, r)` with `q * 2^shift + r == a` in the field, `r` small and
    /// `q` a 248-bit integer that is not the true quotient.
    fn wrapped_quotient(a: u64, shift: usize) -> (Fr, Fr) {
        let inv = Fr::pow2(shift).inverse().unwrap();
        (0..1u64 << 20)
            .filter(|r| *r != a)
            .map(|r| ((Fr::from(a) - Fr::from(r)) * inv, Fr::from(r)))
            .find(|(q, _)| q.bit_len() <= 248)
            .unwrap()
    }

    #[test]
    fn test_div_rejects_quotient_wrapping_the_field() {
        let (q, r) = wrapped_quotient(100, 200);
        assert_eq!(q * Fr::pow2(200) + r, Fr::from(100u64));
        assert!(!q.is_zero());

        let mut b = ForgedQuotient {
            inner: Solver::new(),
            operands: (Fr::from(100u64), Fr::pow2(200)),
            answer: (q, r),
        };
        let mut api = UintApi::<_, Uint248>::new(&mut b);
        let a = api.constant(100);
        let d = api.try_constant(U256::from(1u8) << 200).unwrap();
        let (got, _) = api.div(a, d);
        assert_eq!(b.value(got.variable()), Some(q));
        assert!(!b.inner.is_satisfied());
    }

    #[test]
    fn test_sqrt_floor() {
        let mut s = Solver::new();
        for (input, root) in [(0u64, 0u64), (1, 1), (15, 3), (16, 4), (1 << 40, 1 << 20)] {
            let mut api = UintApi::<_, Uint248>::new(&mut s);
            let a = api.constant(input);
            let r = api.sqrt(a);
            assert_eq!(val(&s, r), root);
        }
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_comparisons() {
        let mut s = Solver::new();
        let mut api = UintApi::<_, Uint32>::new(&mut s);
        let a = api.constant(3);
        let c = api.constant(9);
        let lt = api.is_less_than(a, c);
        let gt = api.is_greater_than(a, c);
        let le = api.is_less_or_equal(a, a);
        let ord = api.cmp(c, a);
        assert_eq!(val(&s, lt), 1);
        assert_eq!(val(&s, gt), 0);
        assert_eq!(val(&s, le), 1);
        assert_eq!(s.value(ord), Some(Fr::ONE));
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_comparison_at_width_edge() {
        let mut s = Solver::new();
        let mut api = UintApi::<_, Uint64>::new(&mut s);
        let max = api.max_value();
        let zero = api.zero();
        let lt = api.is_less_than(zero, max);
        assert_eq!(val(&s, lt), 1);
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_from_variable_enforces_width() {
        let mut s = Solver::new();
        let wide = s.secret_input(Fr::from(1u64 << 33));
        let mut api = UintApi::<_, Uint32>::new(&mut s);
        api.from_variable(wide);
        assert_eq!(s.first_failure().map(|f| f.kind), Some(ConstraintKind::Range));
    }

    #[test]
    fn test_try_constant_rejects_wide_values() {
        let mut s = Solver::new();
        let mut api = UintApi::<_, Uint32>::new(&mut s);
        assert!(api.try_constant(U256::from(1u64 << 32)).is_err());
        assert!(api.try_constant(U256::from(u32::MAX)).is_ok());
    }

    #[test]
    fn test_binary_roundtrip() {
        let mut s = Solver::new();
        let mut api = UintApi::<_, Uint64>::new(&mut s);
        let a = api.constant(0xdead_beef);
        let bits = api.to_binary(a, 64);
        let back = api.from_binary(&bits).unwrap();
        api.assert_is_equal(a, back);
        assert!(api.from_binary(&vec![bits[0]; 65]).is_err());
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_select_emits_same_constraints() {
        let run = |flag: u64| {
            let mut s = Solver::new();
            let t = s.secret_input(Fr::from(flag));
            let mut api = UintApi::<_, Uint248>::new(&mut s);
            let a = api.constant(1);
            let c = api.constant(2);
            api.select(Uint248(t), a, c);
            s.fingerprint()
        };
        assert_eq!(run(0), run(1));
    }
}
