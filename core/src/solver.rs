//! Solving backend
//!
//! Evaluates a circuit on concrete values. Each operation computes its output
//! immediately; each assertion is checked and failures are recorded instead
//! of aborting, so a full evaluation always completes. Alongside the values
//! the solver folds the constraint *structure* (opcodes, wire indices and
//! constants, never witness values) into a Keccak fingerprint.

use crate::builder::{CircuitBuilder, Variable};
use crate::errors::{CircuitError, ConstraintKind, Result};
use crate::field::Fr;
use crate::hints::{register_hints, HintId, HintRegistry};
use crate::types::B256;
use sha3::{Digest, Keccak256};

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum Op {
    Constant = 1,
    Public,
    Secret,
    Add,
    Sub,
    Mul,
    MulConst,
    IsZero,
    Select,
    ToBinary,
    FromBinary,
    AssertEqual,
    AssertBoolean,
    AssertRange,
    Hint,
    Xor,
    Or,
    Not,
}

/// First failed constraint of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub constraint: usize,
    pub kind: ConstraintKind,
}

/// Concrete-value backend
pub struct Solver {
    values: Vec<Fr>,
    public: Vec<Variable>,
    constraints: usize,
    first_failure: Option<Failure>,
    failures: usize,
    digest: Keccak256,
    hints: &'static HintRegistry,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            public: Vec::new(),
            constraints: 0,
            first_failure: None,
            failures: 0,
            digest: Keccak256::new(),
            hints: register_hints(),
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.failures == 0
    }

    pub fn first_failure(&self) -> Option<Failure> {
        self.first_failure
    }

    /// `Ok` when every constraint held.
    pub fn check(&self) -> Result<()> {
        match self.first_failure {
            None => Ok(()),
            Some(failure) => Err(CircuitError::Unsatisfied {
                constraint: failure.constraint,
                kind: failure.kind,
                failures: self.failures,
            }),
        }
    }

    /// Fingerprint of the constraint structure emitted so far.
    pub fn fingerprint(&self) -> B256 {
        B256::from_slice(&self.digest.clone().finalize())
    }

    pub fn public_values(&self) -> Vec<Fr> {
        self.public.iter().map(|v| self.values[v.index()]).collect()
    }

    pub fn num_wires(&self) -> usize {
        self.values.len()
    }

    fn get(&self, v: Variable) -> Fr {
        self.values[v.index()]
    }

    fn push(&mut self, value: Fr) -> Variable {
        let index = u32::try_from(self.values.len()).unwrap_or(u32::MAX);
        assert!(index < u32::MAX, "wire index space exhausted");
        self.values.push(value);
        Variable(index)
    }

    fn record(&mut self, op: Op, wires: &[Variable], constant: Option<Fr>) {
        self.digest.update([op as u8]);
        for wire in wires {
            self.digest.update(wire.0.to_le_bytes());
        }
        if let Some(k) = constant {
            self.digest.update(k.to_b256());
        }
    }

    fn constrain(&mut self, holds: bool, kind: ConstraintKind) {
        if !holds {
            self.failures += 1;
            if self.first_failure.is_none() {
                tracing::debug!(constraint = self.constraints, %kind, "constraint failed");
                self.first_failure = Some(Failure {
                    constraint: self.constraints,
                    kind,
                });
            }
        }
        self.constraints += 1;
    }

    fn fits(value: Fr, bits: usize) -> bool {
        value.bit_len() <= bits
    }
}

impl CircuitBuilder for Solver {
    fn constant(&mut self, value: Fr) -> Variable {
        let out = self.push(value);
        self.record(Op::Constant, &[out], Some(value));
        out
    }

    fn public_input(&mut self, value: Fr) -> Variable {
        let out = self.push(value);
        self.record(Op::Public, &[out], None);
        self.public.push(out);
        out
    }

    fn secret_input(&mut self, value: Fr) -> Variable {
        let out = self.push(value);
        self.record(Op::Secret, &[out], None);
        out
    }

    fn add(&mut self, a: Variable, b: Variable) -> Variable {
        let out = self.push(self.get(a) + self.get(b));
        self.record(Op::Add, &[a, b, out], None);
        out
    }

    fn sub(&mut self, a: Variable, b: Variable) -> Variable {
        let out = self.push(self.get(a) - self.get(b));
        self.record(Op::Sub, &[a, b, out], None);
        out
    }

    fn mul(&mut self, a: Variable, b: Variable) -> Variable {
        let out = self.push(self.get(a) * self.get(b));
        self.record(Op::Mul, &[a, b, out], None);
        self.constraints += 1;
        out
    }

    fn mul_const(&mut self, a: Variable, k: Fr) -> Variable {
        let out = self.push(self.get(a) * k);
        self.record(Op::MulConst, &[a, out], Some(k));
        out
    }

    fn is_zero(&mut self, a: Variable) -> Variable {
        let out = self.push(Fr::from(self.get(a).is_zero()));
        self.record(Op::IsZero, &[a, out], None);
        self.constraints += 2;
        out
    }

    fn select(&mut self, s: Variable, a: Variable, b: Variable) -> Variable {
        let cond = self.get(s);
        self.constrain(cond == Fr::ZERO || cond == Fr::ONE, ConstraintKind::Boolean);
        let (va, vb) = (self.get(a), self.get(b));
        let out = self.push(cond * (va - vb) + vb);
        self.record(Op::Select, &[s, a, b, out], None);
        self.constraints += 1;
        out
    }

    fn to_binary(&mut self, a: Variable, n: usize) -> Vec<Variable> {
        let value = self.get(a);
        self.constrain(Self::fits(value, n), ConstraintKind::Binary);
        let bits: Vec<Variable> = value
            .to_bits_le(n)
            .into_iter()
            .map(|bit| self.push(Fr::from(bit)))
            .collect();
        self.record(Op::ToBinary, &[a], Some(Fr::from(n as u64)));
        if let (Some(first), Some(last)) = (bits.first(), bits.last()) {
            self.record(Op::ToBinary, &[*first, *last], None);
        }
        self.constraints += n;
        bits
    }

    fn from_binary(&mut self, bits: &[Variable]) -> Variable {
        let mut acc = Fr::ZERO;
        let mut weight = Fr::ONE;
        let two = Fr::from(2u64);
        for bit in bits {
            let value = self.get(*bit);
            self.constrain(value == Fr::ZERO || value == Fr::ONE, ConstraintKind::Boolean);
            acc += value * weight;
            weight *= two;
        }
        let out = self.push(acc);
        self.record(Op::FromBinary, bits, None);
        self.record(Op::FromBinary, &[out], None);
        out
    }

    fn assert_is_equal(&mut self, a: Variable, b: Variable) {
        let holds = self.get(a) == self.get(b);
        self.record(Op::AssertEqual, &[a, b], None);
        self.constrain(holds, ConstraintKind::Equal);
    }

    fn assert_is_boolean(&mut self, a: Variable) {
        let value = self.get(a);
        self.record(Op::AssertBoolean, &[a], None);
        self.constrain(value == Fr::ZERO || value == Fr::ONE, ConstraintKind::Boolean);
    }

    fn assert_in_range(&mut self, a: Variable, bits: usize) {
        let holds = Self::fits(self.get(a), bits);
        self.record(Op::AssertRange, &[a], Some(Fr::from(bits as u64)));
        self.constrain(holds, ConstraintKind::Range);
    }

    fn hint(&mut self, id: HintId, inputs: &[Variable], n_out: usize) -> Vec<Variable> {
        let args: Vec<Fr> = inputs.iter().map(|v| self.get(*v)).collect();
        let results = match self.hints.run(id, &args, n_out) {
            Ok(results) => results,
            Err(err) => panic!("hint {id:?} failed: {err}"),
        };
        let outputs: Vec<Variable> = results.into_iter().map(|v| self.push(v)).collect();
        self.record(Op::Hint, inputs, Some(Fr::from(id.tag() as u64)));
        self.record(Op::Hint, &outputs, None);
        outputs
    }

    fn value(&self, a: Variable) -> Option<Fr> {
        self.values.get(a.index()).copied()
    }

    fn constraint_count(&self) -> usize {
        self.constraints
    }

    fn xor(&mut self, a: Variable, b: Variable) -> Variable {
        let (va, vb) = (self.get(a), self.get(b));
        let out = self.push(va + vb - Fr::from(2u64) * va * vb);
        self.record(Op::Xor, &[a, b, out], None);
        self.constraints += 1;
        out
    }

    fn or(&mut self, a: Variable, b: Variable) -> Variable {
        let (va, vb) = (self.get(a), self.get(b));
        let out = self.push(va + vb - va * vb);
        self.record(Op::Or, &[a, b, out], None);
        self.constraints += 1;
        out
    }

    fn not(&mut self, a: Variable) -> Variable {
        let out = self.push(Fr::ONE - self.get(a));
        self.record(Op::Not, &[a, out], None);
        out
    }
}
