//! Guest-facing circuit API
//!
//! [`CircuitApi`] owns the backend and the guest's append-only output
//! buffer. Typed operations are reached through short-lived sub-APIs
//! (`api.uint248()`, `api.bytes32()`, ...), casts go through the closed
//! [`Value`] enum, and `output_*` methods append ABI-packed bytes.

use crate::builder::{CircuitBuilder, Variable};
use crate::errors::{CircuitError, Result};
use crate::field::Fr;
use crate::values::bytes32::{HI_BITS, LO_BITS};
use crate::values::int248::INT_BITS;
use crate::values::{
    select, Bytes32, Bytes32Api, CircuitValue, Int248, Int248Api, Uint248, Uint32, Uint521,
    Uint521Api, Uint64, UintApi, Unsigned, Value,
};

/// Output size assumed for guests that do not declare one
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 4096;

/// Pre-sized, append-only buffer of output bits
///
/// Bytes appear in order; within a byte bits are least significant first,
/// the layout the Keccak gadget consumes.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    bits: Vec<Variable>,
    max_bytes: usize,
}

impl OutputBuffer {
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            bits: Vec::with_capacity(max_bytes * 8),
            max_bytes,
        }
    }

    pub fn bits(&self) -> &[Variable] {
        &self.bits
    }

    pub fn len_bytes(&self) -> usize {
        self.bits.len() / 8
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn append(&mut self, bits: &[Variable]) -> Result<()> {
        let attempted = (self.bits.len() + bits.len()) / 8;
        if attempted > self.max_bytes {
            return Err(CircuitError::OutputOverflow {
                attempted,
                max: self.max_bytes,
            });
        }
        self.bits.extend_from_slice(bits);
        Ok(())
    }

    /// Concrete output bytes, when the backend knows the wire values.
    pub fn to_bytes<B: CircuitBuilder>(&self, builder: &B) -> Option<Vec<u8>> {
        self.bits
            .chunks(8)
            .map(|byte| {
                byte.iter().enumerate().try_fold(0u8, |acc, (j, bit)| {
                    let value = builder.value(*bit)?;
                    Some(acc | ((value == Fr::ONE) as u8) << j)
                })
            })
            .collect()
    }
}

/// Backend plus output buffer, handed to guest circuits
pub struct CircuitApi<B> {
    builder: B,
    output: OutputBuffer,
}

impl<B: CircuitBuilder> CircuitApi<B> {
    pub fn new(builder: B, max_output_bytes: usize) -> Self {
        Self {
            builder,
            output: OutputBuffer::with_max_bytes(max_output_bytes),
        }
    }

    pub fn builder(&mut self) -> &mut B {
        &mut self.builder
    }

    pub fn builder_ref(&self) -> &B {
        &self.builder
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn into_parts(self) -> (B, OutputBuffer) {
        (self.builder, self.output)
    }

    pub fn uint32(&mut self) -> UintApi<'_, B, Uint32> {
        UintApi::new(&mut self.builder)
    }

    pub fn uint64(&mut self) -> UintApi<'_, B, Uint64> {
        UintApi::new(&mut self.builder)
    }

    pub fn uint248(&mut self) -> UintApi<'_, B, Uint248> {
        UintApi::new(&mut self.builder)
    }

    pub fn int248(&mut self) -> Int248Api<'_, B> {
        Int248Api::new(&mut self.builder)
    }

    pub fn bytes32(&mut self) -> Bytes32Api<'_, B> {
        Bytes32Api::new(&mut self.builder)
    }

    pub fn uint521(&mut self) -> Uint521Api<'_, B> {
        Uint521Api::new(&mut self.builder)
    }

    /// Arithmetic select for any value shape.
    pub fn select<T: CircuitValue>(&mut self, s: Uint248, a: &T, c: &T) -> T {
        select(&mut self.builder, s.0, a, c)
    }

    // casts

    pub fn to_uint248(&mut self, v: impl Into<Value>) -> Result<Uint248> {
        match v.into() {
            Value::Uint32(x) => Ok(Uint248(x.variable())),
            Value::Uint64(x) => Ok(Uint248(x.variable())),
            Value::Uint248(x) => Ok(x),
            Value::Int248(x) => {
                let sign = self.int248().sign_bit(&x);
                let zero = self.builder.zero();
                self.builder.assert_is_equal(sign, zero);
                Ok(Uint248(x.variable()))
            }
            Value::Bytes32(x) => {
                let zero = self.builder.zero();
                self.builder.assert_is_equal(x.hi, zero);
                Ok(Uint248(x.lo))
            }
            Value::Uint521(x) => {
                let bits = self.uint521().to_binary(x, 248);
                self.uint248().from_binary(&bits)
            }
        }
    }

    /// Unsigned values and `Int248` are zero- and sign-extended respectively.
    pub fn to_bytes32(&mut self, v: impl Into<Value>) -> Result<Bytes32> {
        match v.into() {
            Value::Uint32(x) => Ok(self.unsigned_word(x.variable())),
            Value::Uint64(x) => Ok(self.unsigned_word(x.variable())),
            Value::Uint248(x) => Ok(self.unsigned_word(x.variable())),
            Value::Int248(x) => {
                let sign = self.int248().sign_bit(&x);
                let hi = self.builder.mul_const(sign, Fr::from(0xffu64));
                Ok(Bytes32 {
                    lo: x.variable(),
                    hi,
                })
            }
            Value::Bytes32(x) => Ok(x),
            Value::Uint521(x) => {
                let bits = self.uint521().to_binary(x, LO_BITS + HI_BITS);
                self.bytes32().from_binary(&bits)
            }
        }
    }

    pub fn to_int248(&mut self, v: impl Into<Value>) -> Result<Int248> {
        match v.into() {
            Value::Uint32(x) => Ok(Int248::new(x.variable())),
            Value::Uint64(x) => Ok(Int248::new(x.variable())),
            Value::Uint248(x) => {
                self.builder.assert_in_range(x.variable(), INT_BITS - 1);
                Ok(Int248::new(x.variable()))
            }
            Value::Int248(x) => Ok(x),
            Value::Bytes32(x) => {
                // hi must repeat the sign bit of lo
                let out = Int248::new(x.lo);
                let sign = self.int248().sign_bit(&out);
                let extended = self.builder.mul_const(sign, Fr::from(0xffu64));
                self.builder.assert_is_equal(x.hi, extended);
                Ok(out)
            }
            Value::Uint521(x) => {
                let bits = self.uint521().to_binary(x, INT_BITS - 1);
                let wires: Vec<Variable> = bits.iter().map(|bit| bit.0).collect();
                Ok(Int248::new(self.builder.from_binary(&wires)))
            }
        }
    }

    pub fn to_uint521(&mut self, v: impl Into<Value>) -> Result<Uint521> {
        let bits = match v.into() {
            Value::Uint32(x) => self.uint32().to_binary(x, Uint32::BITS),
            Value::Uint64(x) => self.uint64().to_binary(x, Uint64::BITS),
            Value::Uint248(x) => self.uint248().to_binary(x, Uint248::BITS),
            Value::Int248(x) => {
                let as_unsigned = self.to_uint248(x)?;
                self.uint248().to_binary(as_unsigned, Uint248::BITS)
            }
            Value::Bytes32(x) => self.bytes32().to_binary(x),
            Value::Uint521(x) => return Ok(x),
        };
        self.uint521().from_binary(&bits)
    }

    fn unsigned_word(&mut self, lo: Variable) -> Bytes32 {
        let hi = self.builder.zero();
        Bytes32 { lo, hi }
    }

    // output

    /// Append `le_bits.len() / 8` bytes, most significant byte first.
    fn append_big_endian(&mut self, le_bits: &[Variable]) -> Result<()> {
        let bytes = le_bits.len() / 8;
        let mut ordered = Vec::with_capacity(le_bits.len());
        for k in (0..bytes).rev() {
            ordered.extend_from_slice(&le_bits[k * 8..(k + 1) * 8]);
        }
        self.output.append(&ordered)
    }

    /// Append `v` as a `uint<bits>`, asserting it fits.
    pub fn output_uint(&mut self, bits: usize, v: Uint248) -> Result<()> {
        if bits == 0 || bits % 8 != 0 || bits > Uint248::BITS {
            return Err(CircuitError::ValueOutOfRange(format!(
                "cannot output a uint{bits}"
            )));
        }
        let le: Vec<Variable> = self.builder.to_binary(v.variable(), bits);
        self.append_big_endian(&le)
    }

    pub fn output_uint32(&mut self, v: Uint32) -> Result<()> {
        self.output_uint(Uint32::BITS, Uint248(v.variable()))
    }

    pub fn output_uint64(&mut self, v: Uint64) -> Result<()> {
        self.output_uint(Uint64::BITS, Uint248(v.variable()))
    }

    pub fn output_address(&mut self, v: Uint248) -> Result<()> {
        self.output_uint(160, v)
    }

    /// One byte, 0 or 1.
    pub fn output_bool(&mut self, v: Uint248) -> Result<()> {
        self.builder.assert_is_boolean(v.variable());
        self.output_uint(8, v)
    }

    pub fn output_bytes32(&mut self, v: Bytes32) -> Result<()> {
        let le: Vec<Variable> = self
            .bytes32()
            .to_binary(v)
            .into_iter()
            .map(|bit| bit.0)
            .collect();
        self.append_big_endian(&le)
    }

    /// 31 bytes of two's complement.
    pub fn output_int248(&mut self, v: &Int248) -> Result<()> {
        let le: Vec<Variable> = self
            .int248()
            .to_binary(v)
            .into_iter()
            .map(|bit| bit.0)
            .collect();
        self.append_big_endian(&le)
    }
}
