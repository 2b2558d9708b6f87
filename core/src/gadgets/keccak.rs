//! Keccak256 over a bit string
//!
//! Bits follow the Keccak byte convention: bit `8 * i + j` is bit `j` (least
//! significant first) of message byte `i`. Padding bits are constants, so a
//! [`Bit`] folds constant operands instead of emitting constraints for them.

use crate::builder::{CircuitBuilder, Variable};
use crate::field::Fr;

/// Rate of Keccak256 in bits
pub const RATE_BITS: usize = 1088;

const LANES: usize = 25;
const LANE_BITS: usize = 64;

const ROUND_CONSTANTS: [u64; 24] = [
    0x0000_0000_0000_0001,
    0x0000_0000_0000_8082,
    0x8000_0000_0000_808a,
    0x8000_0000_8000_8000,
    0x0000_0000_0000_808b,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8009,
    0x0000_0000_0000_008a,
    0x0000_0000_0000_0088,
    0x0000_0000_8000_8009,
    0x0000_0000_8000_000a,
    0x0000_0000_8000_808b,
    0x8000_0000_0000_008b,
    0x8000_0000_0000_8089,
    0x8000_0000_0000_8003,
    0x8000_0000_0000_8002,
    0x8000_0000_0000_0080,
    0x0000_0000_0000_800a,
    0x8000_0000_8000_000a,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8080,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8008,
];

/// Rotation offsets indexed by `x + 5 * y`
const ROTATIONS: [usize; LANES] = [
    0, 1, 62, 28, 27, //
    36, 44, 6, 55, 20, //
    3, 10, 43, 25, 39, //
    41, 45, 15, 21, 8, //
    18, 2, 61, 56, 14,
];

/// A bit that is either known at definition time or carried by a wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bit {
    Const(bool),
    Var(Variable),
}

impl Bit {
    pub fn to_variable<B: CircuitBuilder>(self, b: &mut B) -> Variable {
        match self {
            Bit::Const(bit) => b.constant(Fr::from(bit)),
            Bit::Var(v) => v,
        }
    }

    fn xor<B: CircuitBuilder>(self, other: Bit, b: &mut B) -> Bit {
        match (self, other) {
            (Bit::Const(x), Bit::Const(y)) => Bit::Const(x ^ y),
            (Bit::Const(false), v) | (v, Bit::Const(false)) => v,
            (Bit::Const(true), Bit::Var(v)) | (Bit::Var(v), Bit::Const(true)) => Bit::Var(b.not(v)),
            (Bit::Var(x), Bit::Var(y)) => Bit::Var(b.xor(x, y)),
        }
    }

    /// `!self & other`
    fn and_not<B: CircuitBuilder>(self, other: Bit, b: &mut B) -> Bit {
        match (self, other) {
            (Bit::Const(true), _) | (_, Bit::Const(false)) => Bit::Const(false),
            (Bit::Const(false), o) => o,
            (Bit::Var(x), Bit::Const(true)) => Bit::Var(b.not(x)),
            (Bit::Var(x), Bit::Var(y)) => {
                let nx = b.not(x);
                Bit::Var(b.and(nx, y))
            }
        }
    }
}

type State = Vec<Bit>;

fn at(x: usize, y: usize, z: usize) -> usize {
    ((x % 5) + 5 * (y % 5)) * LANE_BITS + z
}

fn keccak_f<B: CircuitBuilder>(b: &mut B, state: &mut State) {
    for rc in ROUND_CONSTANTS {
        // theta
        let mut parity = vec![Bit::Const(false); 5 * LANE_BITS];
        for x in 0..5 {
            for z in 0..LANE_BITS {
                let mut acc = state[at(x, 0, z)];
                for y in 1..5 {
                    acc = acc.xor(state[at(x, y, z)], b);
                }
                parity[x * LANE_BITS + z] = acc;
            }
        }
        for x in 0..5 {
            for z in 0..LANE_BITS {
                let left = parity[((x + 4) % 5) * LANE_BITS + z];
                let right = parity[((x + 1) % 5) * LANE_BITS + (z + LANE_BITS - 1) % LANE_BITS];
                let d = left.xor(right, b);
                for y in 0..5 {
                    let i = at(x, y, z);
                    state[i] = state[i].xor(d, b);
                }
            }
        }

        // rho and pi
        let mut moved = vec![Bit::Const(false); LANES * LANE_BITS];
        for x in 0..5 {
            for y in 0..5 {
                let r = ROTATIONS[x + 5 * y];
                for z in 0..LANE_BITS {
                    moved[at(y, 2 * x + 3 * y, (z + r) % LANE_BITS)] = state[at(x, y, z)];
                }
            }
        }

        // chi
        for x in 0..5 {
            for y in 0..5 {
                for z in 0..LANE_BITS {
                    let t = moved[at(x + 1, y, z)].and_not(moved[at(x + 2, y, z)], b);
                    state[at(x, y, z)] = moved[at(x, y, z)].xor(t, b);
                }
            }
        }

        // iota
        for z in 0..LANE_BITS {
            if (rc >> z) & 1 == 1 {
                state[z] = state[z].xor(Bit::Const(true), b);
            }
        }
    }
}

/// Pad a message with `1 0* 1` to whole blocks of [`RATE_BITS`].
pub fn pad(message: &[Bit]) -> Vec<Bit> {
    let blocks = message.len() / RATE_BITS + 1;
    let mut padded = message.to_vec();
    padded.resize(blocks * RATE_BITS, Bit::Const(false));
    padded[message.len()] = Bit::Const(true);
    let last = padded.len() - 1;
    padded[last] = Bit::Const(true);
    padded
}

/// Keccak256 of a byte-aligned bit string, returned as 256 bits in the same
/// byte convention as the input.
pub fn keccak256_bits<B: CircuitBuilder>(b: &mut B, message: &[Bit]) -> Vec<Bit> {
    assert!(
        message.len() % 8 == 0,
        "keccak input of {} bits is not byte aligned",
        message.len()
    );
    let padded = pad(message);
    let mut state: State = vec![Bit::Const(false); LANES * LANE_BITS];
    for block in padded.chunks(RATE_BITS) {
        for (i, bit) in block.iter().enumerate() {
            state[i] = state[i].xor(*bit, b);
        }
        keccak_f(b, &mut state);
    }
    state.truncate(256);
    state
}
