//! Off-circuit hint functions
//!
//! A hint computes a value the circuit cannot cheaply derive (a quotient, a
//! square root, a comparison bit) and injects it as a fresh witness. Every
//! caller re-checks the result with constraints, so hints are trusted for
//! completeness only.
//!
//! The registry is built once per process by [`register_hints`]; calling it
//! again returns the same registry.

use crate::field::Fr;
use crate::types::{Wide, I256, U256};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Bits per limb of an emulated 521-bit integer
pub const WIDE_LIMB_BITS: usize = 96;

/// Limbs of an emulated 521-bit integer
pub const WIDE_LIMBS: usize = 6;

/// Offset keeping hinted carries non-negative
pub const CARRY_OFFSET_BITS: usize = 104;

/// Identifier of a registered hint function
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HintId {
    /// `[a, b] -> [a / b, a % b]`, `[0, a]` when `b == 0`
    QuoRem,
    /// `[a] -> [floor(sqrt(a))]`
    Sqrt,
    /// `[a, b] -> [a < b]`
    LessThan,
    /// `[a] -> [a^-1]`, zero maps to zero
    Inverse,
    /// `[n, values.., toggles..] -> [distinct active values.., present flags..]`
    GroupValues,
    /// `[a.., b..] -> [q.., r..]` with `a * b = q * p + r`
    WideMulMod,
    /// `[a.., b..] -> [q, r..]` with `a + b = q * p + r`
    WideAddMod,
    /// `[a.., b..] -> [q, r..]` with `b + r = a + q * p`
    WideSubMod,
    /// `[a.., b..] -> [q.., r..]` with `a = q * b + r`, integer division
    WideQuoRem,
    /// `[column differences..] -> [offset carries..]`
    WideCarries,
}

impl HintId {
    /// Stable tag mixed into constraint fingerprints
    pub fn tag(&self) -> u8 {
        *self as u8
    }
}

/// Errors returned by hint functions
///
/// A hint error is a programming error in the calling gadget; backends treat
/// it as fatal.
#[derive(Debug, Error)]
pub enum HintError {
    #[error("hint {hint:?} expects {expected} inputs, got {got}")]
    Arity {
        hint: HintId,
        expected: usize,
        got: usize,
    },

    #[error("hint {hint:?} produced {got} outputs, caller expected {expected}")]
    Outputs {
        hint: HintId,
        expected: usize,
        got: usize,
    },

    #[error("hint {0:?} is not registered")]
    Unregistered(HintId),

    #[error("hint {hint:?}: {reason}")]
    Invalid { hint: HintId, reason: String },
}

/// Signature shared by all hint functions
pub type HintFn = fn(&[Fr]) -> Result<Vec<Fr>, HintError>;

/// Immutable table of hint functions
#[derive(Debug)]
pub struct HintRegistry {
    fns: BTreeMap<HintId, HintFn>,
}

impl HintRegistry {
    /// Run a hint and check its output arity
    pub fn run(&self, id: HintId, inputs: &[Fr], n_out: usize) -> Result<Vec<Fr>, HintError> {
        let f = self.fns.get(&id).ok_or(HintError::Unregistered(id))?;
        let out = f(inputs)?;
        if out.len() != n_out {
            return Err(HintError::Outputs {
                hint: id,
                expected: n_out,
                got: out.len(),
            });
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }
}

static REGISTRY: OnceLock<HintRegistry> = OnceLock::new();

/// Install every hint exactly once and return the registry.
pub fn register_hints() -> &'static HintRegistry {
    REGISTRY.get_or_init(|| {
        let mut fns: BTreeMap<HintId, HintFn> = BTreeMap::new();
        fns.insert(HintId::QuoRem, quo_rem);
        fns.insert(HintId::Sqrt, sqrt);
        fns.insert(HintId::LessThan, less_than);
        fns.insert(HintId::Inverse, inverse);
        fns.insert(HintId::GroupValues, group_values);
        fns.insert(HintId::WideMulMod, wide_mul_mod);
        fns.insert(HintId::WideAddMod, wide_add_mod);
        fns.insert(HintId::WideSubMod, wide_sub_mod);
        fns.insert(HintId::WideQuoRem, wide_quo_rem);
        fns.insert(HintId::WideCarries, wide_carries);
        tracing::debug!(count = fns.len(), "registered hint functions");
        HintRegistry { fns }
    })
}

fn arity(hint: HintId, inputs: &[Fr], expected: usize) -> Result<(), HintError> {
    if inputs.len() != expected {
        return Err(HintError::Arity {
            hint,
            expected,
            got: inputs.len(),
        });
    }
    Ok(())
}

fn quo_rem(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    arity(HintId::QuoRem, inputs, 2)?;
    let (a, b) = (inputs[0].as_u256(), inputs[1].as_u256());
    if b.is_zero() {
        return Ok(vec![Fr::ZERO, inputs[0]]);
    }
    let (q, r) = a.div_rem(b);
    Ok(vec![Fr::from_u256_reduced(q), Fr::from_u256_reduced(r)])
}

fn sqrt(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    arity(HintId::Sqrt, inputs, 1)?;
    let root = inputs[0].as_u256().root(2);
    Ok(vec![Fr::from_u256_reduced(root)])
}

fn less_than(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    arity(HintId::LessThan, inputs, 2)?;
    Ok(vec![Fr::from(inputs[0] < inputs[1])])
}

fn inverse(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    arity(HintId::Inverse, inputs, 1)?;
    Ok(vec![inputs[0].inverse().unwrap_or(Fr::ZERO)])
}

fn group_values(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    let n = inputs.first().map(|n| n.low_u64() as usize).unwrap_or_default();
    arity(HintId::GroupValues, inputs, 1 + 2 * n)?;
    let values = &inputs[1..1 + n];
    let toggles = &inputs[1 + n..];

    let mut unique: Vec<Fr> = Vec::with_capacity(n);
    for (value, toggle) in values.iter().zip(toggles) {
        if toggle.is_zero() || unique.contains(value) {
            continue;
        }
        unique.push(*value);
    }
    let found = unique.len();
    unique.resize(n, Fr::ZERO);
    unique.extend((0..n).map(|i| Fr::from(i < found)));
    Ok(unique)
}

/// `2^521 - 1`
pub(crate) fn p521() -> Wide {
    (Wide::from(1u64) << 521) - Wide::from(1u64)
}

/// Recompose 96-bit limbs (least significant first) into an integer.
pub(crate) fn limbs_to_wide(limbs: &[Fr]) -> Wide {
    limbs.iter().rev().fold(Wide::ZERO, |acc, limb| {
        (acc << WIDE_LIMB_BITS) + u256_to_wide(limb.as_u256())
    })
}

/// Split an integer into `n` limbs of 96 bits.
pub(crate) fn wide_to_limbs(value: Wide, n: usize) -> Vec<Fr> {
    let mask = (Wide::from(1u64) << WIDE_LIMB_BITS) - Wide::from(1u64);
    (0..n)
        .map(|i| {
            let limb = (value >> (i * WIDE_LIMB_BITS)) & mask;
            let words = limb.as_limbs();
            Fr::from_u256_reduced(U256::from_limbs([words[0], words[1], words[2], words[3]]))
        })
        .collect()
}

pub(crate) fn u256_to_wide(value: U256) -> Wide {
    let mut words = [0u64; 18];
    words[..4].copy_from_slice(value.as_limbs());
    Wide::from_limbs(words)
}

fn split_operands(hint: HintId, inputs: &[Fr]) -> Result<(Wide, Wide), HintError> {
    arity(hint, inputs, 2 * WIDE_LIMBS)?;
    Ok((
        limbs_to_wide(&inputs[..WIDE_LIMBS]),
        limbs_to_wide(&inputs[WIDE_LIMBS..]),
    ))
}

fn wide_mul_mod(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    let (a, b) = split_operands(HintId::WideMulMod, inputs)?;
    let p = p521();
    let product = a * b;
    let mut out = wide_to_limbs(product / p, WIDE_LIMBS);
    out.extend(wide_to_limbs(product % p, WIDE_LIMBS));
    Ok(out)
}

fn wide_add_mod(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    let (a, b) = split_operands(HintId::WideAddMod, inputs)?;
    let p = p521();
    let sum = a + b;
    let mut out = vec![Fr::from_u64((sum / p).as_limbs()[0])];
    out.extend(wide_to_limbs(sum % p, WIDE_LIMBS));
    Ok(out)
}

fn wide_sub_mod(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    let (a, b) = split_operands(HintId::WideSubMod, inputs)?;
    let p = p521();
    if a >= p || b >= p {
        return Err(HintError::Invalid {
            hint: HintId::WideSubMod,
            reason: "operands must be reduced".into(),
        });
    }
    let (q, r) = if a >= b { (0u64, a - b) } else { (1u64, a + p - b) };
    let mut out = vec![Fr::from_u64(q)];
    out.extend(wide_to_limbs(r, WIDE_LIMBS));
    Ok(out)
}

fn wide_quo_rem(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    let (a, b) = split_operands(HintId::WideQuoRem, inputs)?;
    let (q, r) = if b.is_zero() {
        (Wide::ZERO, a)
    } else {
        (a / b, a % b)
    };
    let mut out = wide_to_limbs(q, WIDE_LIMBS);
    out.extend(wide_to_limbs(r, WIDE_LIMBS));
    Ok(out)
}

/// Interpret a field element as a signed integer centered on zero.
fn signed(value: Fr) -> I256 {
    let half = Fr::MODULUS >> 1;
    if value.as_u256() > half {
        -I256::from_raw(Fr::MODULUS - value.as_u256())
    } else {
        I256::from_raw(value.as_u256())
    }
}

fn wide_carries(inputs: &[Fr]) -> Result<Vec<Fr>, HintError> {
    let offset = I256::from_raw(U256::from(1u8) << CARRY_OFFSET_BITS);
    let mut carry = I256::ZERO;
    let mut out = Vec::with_capacity(inputs.len());
    for diff in inputs {
        let total = signed(*diff) + carry;
        carry = total.asr(WIDE_LIMB_BITS);
        let shifted = carry + offset;
        if shifted.is_negative() {
            return Err(HintError::Invalid {
                hint: HintId::WideCarries,
                reason: "carry below offset".into(),
            });
        }
        out.push(Fr::from_u256_reduced(shifted.into_raw()));
    }
    Ok(out)
}
