//! Bit packing of records into field elements
//!
//! Subfields are appended as little-endian bit strings in declaration order;
//! the concatenation is then cut into [`PACK_CHUNK_BITS`]-bit groups, each
//! recomposed little-endian into one field element. [`BitPacker`] works on
//! native values, [`VarPacker`] on wires, and both produce the same chunks.

use crate::builder::{CircuitBuilder, Variable};
use crate::field::{Fr, PACK_CHUNK_BITS};
use crate::types::{Address, B256, U256};
use crate::values::{Bytes32, Bytes32Api};

/// Number of field elements a packed bit string of `bits` bits occupies.
pub const fn packed_len(bits: usize) -> usize {
    bits.div_ceil(PACK_CHUNK_BITS)
}

/// Native packer
#[derive(Debug, Default, Clone)]
pub struct BitPacker {
    bits: Vec<bool>,
}

impl BitPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Low `n` bits of `value`.
    pub fn push_u64(&mut self, value: u64, n: usize) -> &mut Self {
        self.bits.extend((0..n).map(|i| i < 64 && (value >> i) & 1 == 1));
        self
    }

    /// Low `n` bits of `value`.
    pub fn push_u256(&mut self, value: U256, n: usize) -> &mut Self {
        self.bits.extend((0..n).map(|i| value.bit(i)));
        self
    }

    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.bits.push(value);
        self
    }

    /// 160 bits of the address read as a big-endian integer.
    pub fn push_address(&mut self, address: &Address) -> &mut Self {
        self.push_u256(U256::from_be_slice(address.as_slice()), 160)
    }

    /// 256 bits of the word read as a big-endian integer.
    pub fn push_word(&mut self, word: &B256) -> &mut Self {
        self.push_u256(U256::from_be_bytes(word.0), 256)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn finish(&self) -> Vec<Fr> {
        self.bits.chunks(PACK_CHUNK_BITS).map(Fr::from_bits_le).collect()
    }
}

/// In-circuit packer
///
/// Every pushed wire is decomposed with `to_binary`, so packing also asserts
/// the width of each subfield.
pub struct VarPacker<'a, B> {
    b: &'a mut B,
    bits: Vec<Variable>,
}

impl<'a, B: CircuitBuilder> VarPacker<'a, B> {
    pub fn new(b: &'a mut B) -> Self {
        Self {
            b,
            bits: Vec::new(),
        }
    }

    pub fn push(&mut self, v: Variable, n: usize) -> &mut Self {
        let bits = self.b.to_binary(v, n);
        self.bits.extend(bits);
        self
    }

    pub fn push_bytes32(&mut self, v: Bytes32) -> &mut Self {
        let bits = Bytes32Api::new(&mut *self.b).to_binary(v);
        self.bits.extend(bits.into_iter().map(|bit| bit.0));
        self
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn finish(self) -> Vec<Variable> {
        let Self { b, bits } = self;
        bits.chunks(PACK_CHUNK_BITS)
            .map(|chunk| b.from_binary(chunk))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    #[test]
    fn test_packed_len() {
        assert_eq!(packed_len(253), 1);
        assert_eq!(packed_len(254), 2);
        assert_eq!(packed_len(704), 3);
        assert_eq!(packed_len(832), 4);
        assert_eq!(packed_len(1448), 6);
    }

    #[test]
    fn test_native_chunking() {
        let mut packer = BitPacker::new();
        packer.push_u64(0b101, 3).push_u256(U256::ZERO, 250).push_bool(true);
        let chunks = packer.finish();
        assert_eq!(chunks, vec![Fr::from(5u64), Fr::ONE]);
    }

    #[test]
    fn test_word_bits_are_integer_bits() {
        let mut word = [0u8; 32];
        word[31] = 1;
        let mut packer = BitPacker::new();
        packer.push_word(&B256::from(word));
        assert_eq!(packer.finish()[0], Fr::ONE);
    }

    #[test]
    fn test_circuit_matches_native() {
        let word = B256::repeat_byte(0xc3);
        let address = Address::repeat_byte(0x11);

        let mut native = BitPacker::new();
        native
            .push_u64(77, 32)
            .push_address(&address)
            .push_word(&word);
        let expected = native.finish();

        let mut s = Solver::new();
        let block = s.constant(Fr::from(77u64));
        let contract = s.constant(Fr::from_u256_reduced(U256::from_be_slice(address.as_slice())));
        let value = Bytes32Api::new(&mut s).constant(word);
        let mut packer = VarPacker::new(&mut s);
        packer.push(block, 32).push(contract, 160).push_bytes32(value);
        assert_eq!(packer.len(), native.len());
        let chunks = packer.finish();
        let got: Vec<Fr> = chunks.iter().map(|c| s.value(*c).unwrap()).collect();
        assert_eq!(got, expected);
        assert!(s.is_satisfied());
    }

    #[test]
    fn test_oversized_subfield_is_unsatisfied() {
        let mut s = Solver::new();
        let v = s.secret_input(Fr::from(1u64 << 40));
        let mut packer = VarPacker::new(&mut s);
        packer.push(v, 32);
        packer.finish();
        assert!(!s.is_satisfied());
    }
}
