//! Capability interface of a constraint-system backend
//!
//! Gadgets in this crate are written against [`CircuitBuilder`] only. A
//! backend allocates wires, emits constraints for each operation and runs
//! hints. The bundled [`Solver`](crate::solver::Solver) evaluates everything
//! on concrete values.

use crate::field::Fr;
use crate::hints::HintId;

/// Handle to a wire of the circuit under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(pub(crate) u32);

impl Variable {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Field arithmetic, assertions, bit decomposition and hints
///
/// Every operation must emit the same constraints whatever the runtime
/// values are; `select` in particular is arithmetic, never a branch.
pub trait CircuitBuilder {
    fn constant(&mut self, value: Fr) -> Variable;

    /// Allocate a wire whose value becomes part of the public statement.
    fn public_input(&mut self, value: Fr) -> Variable;

    fn secret_input(&mut self, value: Fr) -> Variable;

    fn add(&mut self, a: Variable, b: Variable) -> Variable;

    fn sub(&mut self, a: Variable, b: Variable) -> Variable;

    fn mul(&mut self, a: Variable, b: Variable) -> Variable;

    fn mul_const(&mut self, a: Variable, k: Fr) -> Variable;

    /// 1 when `a == 0`, else 0.
    fn is_zero(&mut self, a: Variable) -> Variable;

    /// `s * (a - b) + b`, with `s` asserted boolean.
    fn select(&mut self, s: Variable, a: Variable, b: Variable) -> Variable;

    /// Little-endian decomposition into `n` bits. Also asserts `a < 2^n`.
    fn to_binary(&mut self, a: Variable, n: usize) -> Vec<Variable>;

    /// Recompose little-endian bits, asserting each one boolean.
    fn from_binary(&mut self, bits: &[Variable]) -> Variable;

    fn assert_is_equal(&mut self, a: Variable, b: Variable);

    fn assert_is_boolean(&mut self, a: Variable);

    /// Assert `a < 2^bits`.
    fn assert_in_range(&mut self, a: Variable, bits: usize);

    /// Run an off-circuit hint; outputs are fresh, unconstrained wires.
    fn hint(&mut self, id: HintId, inputs: &[Variable], n_out: usize) -> Vec<Variable>;

    /// Concrete value of a wire, when the backend knows it.
    fn value(&self, a: Variable) -> Option<Fr>;

    fn constraint_count(&self) -> usize;

    fn zero(&mut self) -> Variable {
        self.constant(Fr::ZERO)
    }

    fn one(&mut self) -> Variable {
        self.constant(Fr::ONE)
    }

    fn neg(&mut self, a: Variable) -> Variable {
        self.mul_const(a, -Fr::ONE)
    }

    fn add_const(&mut self, a: Variable, k: Fr) -> Variable {
        let k = self.constant(k);
        self.add(a, k)
    }

    fn and(&mut self, a: Variable, b: Variable) -> Variable {
        self.mul(a, b)
    }

    fn or(&mut self, a: Variable, b: Variable) -> Variable {
        let sum = self.add(a, b);
        let both = self.mul(a, b);
        self.sub(sum, both)
    }

    fn xor(&mut self, a: Variable, b: Variable) -> Variable {
        let sum = self.add(a, b);
        let both = self.mul(a, b);
        let twice = self.mul_const(both, Fr::from(2u64));
        self.sub(sum, twice)
    }

    fn not(&mut self, a: Variable) -> Variable {
        let one = self.one();
        self.sub(one, a)
    }

    fn is_equal(&mut self, a: Variable, b: Variable) -> Variable {
        let diff = self.sub(a, b);
        self.is_zero(diff)
    }

    fn sum(&mut self, terms: &[Variable]) -> Variable {
        let mut acc = self.zero();
        for term in terms {
            acc = self.add(acc, *term);
        }
        acc
    }
}
