//! Typed circuit values
//!
//! Each type wraps one or more wires with a bit-width contract:
//!
//! - [`Uint32`], [`Uint64`], [`Uint248`] - fixed-width unsigned integers
//! - [`Int248`] - two's-complement signed integer with a cached sign bit
//! - [`Bytes32`] - 32-byte word split into a 248-bit and an 8-bit limb
//! - [`Uint521`] - integer modulo `2^521 - 1` emulated over six 96-bit limbs
//!
//! Values built from untrusted wires go through a range assertion; only
//! constants whose width is checked at construction skip it.

pub mod bytes32;
pub mod int248;
pub mod uint;
pub mod uint521;

pub use bytes32::{Bytes32, Bytes32Api};
pub use int248::{Int248, Int248Api};
pub use uint::{UintApi, Uint248, Uint32, Uint64, Unsigned};
pub use uint521::{Uint521, Uint521Api};

use crate::builder::{CircuitBuilder, Variable};
use crate::field::Fr;
use crate::hints::HintId;

/// A value made of a fixed number of wires
///
/// `values` lists the wires in a stable order; `with_values` rebuilds a value
/// of the same shape as `self` from replacement wires.
pub trait CircuitValue: Clone {
    fn values(&self) -> Vec<Variable>;

    fn with_values(&self, values: &[Variable]) -> Self;

    fn num_values(&self) -> usize {
        self.values().len()
    }
}

impl CircuitValue for Variable {
    fn values(&self) -> Vec<Variable> {
        vec![*self]
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        values[0]
    }
}

impl<T: CircuitValue> CircuitValue for Vec<T> {
    fn values(&self) -> Vec<Variable> {
        self.iter().flat_map(|v| v.values()).collect()
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        let mut offset = 0;
        self.iter()
            .map(|item| {
                let n = item.num_values();
                let out = item.with_values(&values[offset..offset + n]);
                offset += n;
                out
            })
            .collect()
    }
}

impl<A: CircuitValue, C: CircuitValue> CircuitValue for (A, C) {
    fn values(&self) -> Vec<Variable> {
        let mut out = self.0.values();
        out.extend(self.1.values());
        out
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        let n = self.0.num_values();
        (self.0.with_values(&values[..n]), self.1.with_values(&values[n..]))
    }
}

/// Closed set of value kinds, used where a value's concrete type decides
/// how it is cast or serialized.
#[derive(Debug, Clone)]
pub enum Value {
    Uint32(Uint32),
    Uint64(Uint64),
    Uint248(Uint248),
    Int248(Int248),
    Bytes32(Bytes32),
    Uint521(Uint521),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Uint32(_) => "Uint32",
            Value::Uint64(_) => "Uint64",
            Value::Uint248(_) => "Uint248",
            Value::Int248(_) => "Int248",
            Value::Bytes32(_) => "Bytes32",
            Value::Uint521(_) => "Uint521",
        }
    }
}

macro_rules! value_from {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$ty(v)
                }
            }
        )*
    };
}

value_from!(Uint32, Uint64, Uint248, Int248, Bytes32, Uint521);

/// Wire-wise arithmetic select between two values of the same shape.
pub fn select<B: CircuitBuilder, T: CircuitValue>(b: &mut B, s: Variable, a: &T, c: &T) -> T {
    let left = a.values();
    let right = c.values();
    assert_eq!(left.len(), right.len(), "select between values of different shapes");
    let out: Vec<Variable> = left
        .iter()
        .zip(&right)
        .map(|(x, y)| b.select(s, *x, *y))
        .collect();
    a.with_values(&out)
}

/// `x < y` for operands known to be below `2^bits`.
///
/// The bit comes from a hint; the range check of the signed difference
/// rejects a wrong answer.
pub(crate) fn less_than<B: CircuitBuilder>(
    b: &mut B,
    x: Variable,
    y: Variable,
    bits: usize,
) -> Variable {
    let lt = b.hint(HintId::LessThan, &[x, y], 1)[0];
    b.assert_is_boolean(lt);
    // lt: y - x - 1 >= 0, otherwise x - y >= 0
    let forward = b.sub(y, x);
    let forward = b.add_const(forward, -Fr::ONE);
    let backward = b.sub(x, y);
    let diff = b.select(lt, forward, backward);
    b.assert_in_range(diff, bits);
    lt
}
