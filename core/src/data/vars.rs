//! In-circuit record types
//!
//! Each native record has a wire-level twin built from typed values. Secret
//! wires are allocated by [`Assign::assign`]; their widths are enforced when
//! the host circuit packs the record for its input commitment.

use super::pack::VarPacker;
use super::records::{FieldIndex, LogField, Receipt, Record, StorageSlot, Transaction};
use super::NUM_MAX_LOG_FIELDS;
use crate::builder::{CircuitBuilder, Variable};
use crate::field::Fr;
use crate::types::{Address, U256};
use crate::values::{Bytes32, Bytes32Api, CircuitValue, Uint248, Uint32, Uint64};

/// Field element holding an address as a big-endian integer.
pub fn address_to_fr(address: &Address) -> Fr {
    Fr::from_u256_reduced(U256::from_be_slice(address.as_slice()))
}

/// Record made of wires, packable in-circuit
pub trait RecordVar: CircuitValue {
    /// Same chunks as the native [`Record::pack`] of the assigned record.
    fn pack<B: CircuitBuilder>(&self, b: &mut B) -> Vec<Variable>;
}

/// Native record that can be assigned to secret wires
pub trait Assign: Record {
    type Var: RecordVar;

    fn assign<B: CircuitBuilder>(&self, b: &mut B) -> Self::Var;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFieldVar {
    pub contract: Uint248,
    pub event_id: Uint248,
    pub is_topic: Uint248,
    pub index: Uint248,
    pub value: Bytes32,
}

impl LogFieldVar {
    fn assign<B: CircuitBuilder>(field: &LogField, b: &mut B) -> Self {
        let mut event_id = [0u8; 8];
        event_id[2..].copy_from_slice(field.event_id.as_slice());
        Self {
            contract: Uint248(b.secret_input(address_to_fr(&field.contract))),
            event_id: Uint248(b.secret_input(Fr::from(u64::from_be_bytes(event_id)))),
            is_topic: Uint248(b.secret_input(Fr::from(field.is_topic))),
            index: Uint248(b.secret_input(Fr::from(field.index.get() as u64))),
            value: Bytes32Api::new(b).witness(field.value),
        }
    }

    fn pack_into<B: CircuitBuilder>(&self, packer: &mut VarPacker<'_, B>) {
        packer
            .push(self.contract.0, 160)
            .push(self.event_id.0, 48)
            .push(self.is_topic.0, 1)
            .push(self.index.0, FieldIndex::BITS)
            .push_bytes32(self.value);
    }
}

impl CircuitValue for LogFieldVar {
    fn values(&self) -> Vec<Variable> {
        vec![
            self.contract.0,
            self.event_id.0,
            self.is_topic.0,
            self.index.0,
            self.value.lo,
            self.value.hi,
        ]
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        Self {
            contract: Uint248(values[0]),
            event_id: Uint248(values[1]),
            is_topic: Uint248(values[2]),
            index: Uint248(values[3]),
            value: Bytes32 {
                lo: values[4],
                hi: values[5],
            },
        }
    }
}

const LOG_FIELD_WIRES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptVar {
    pub block_num: Uint32,
    pub fields: [LogFieldVar; NUM_MAX_LOG_FIELDS],
}

impl CircuitValue for ReceiptVar {
    fn values(&self) -> Vec<Variable> {
        let mut out = vec![self.block_num.0];
        for field in &self.fields {
            out.extend(field.values());
        }
        out
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        Self {
            block_num: Uint32(values[0]),
            fields: core::array::from_fn(|i| {
                let start = 1 + i * LOG_FIELD_WIRES;
                self.fields[i].with_values(&values[start..start + LOG_FIELD_WIRES])
            }),
        }
    }
}

impl RecordVar for ReceiptVar {
    fn pack<B: CircuitBuilder>(&self, b: &mut B) -> Vec<Variable> {
        let mut packer = VarPacker::new(b);
        packer.push(self.block_num.0, 32);
        for field in &self.fields {
            field.pack_into(&mut packer);
        }
        packer.finish()
    }
}

impl Assign for Receipt {
    type Var = ReceiptVar;

    fn assign<B: CircuitBuilder>(&self, b: &mut B) -> ReceiptVar {
        let block_num = Uint32(b.secret_input(Fr::from(self.block_num)));
        let fields = self.fields.map(|field| LogFieldVar::assign(&field, b));
        ReceiptVar { block_num, fields }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageSlotVar {
    pub block_num: Uint32,
    pub contract: Uint248,
    pub key: Bytes32,
    pub value: Bytes32,
}

impl CircuitValue for StorageSlotVar {
    fn values(&self) -> Vec<Variable> {
        vec![
            self.block_num.0,
            self.contract.0,
            self.key.lo,
            self.key.hi,
            self.value.lo,
            self.value.hi,
        ]
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        Self {
            block_num: Uint32(values[0]),
            contract: Uint248(values[1]),
            key: Bytes32 {
                lo: values[2],
                hi: values[3],
            },
            value: Bytes32 {
                lo: values[4],
                hi: values[5],
            },
        }
    }
}

impl RecordVar for StorageSlotVar {
    fn pack<B: CircuitBuilder>(&self, b: &mut B) -> Vec<Variable> {
        let mut packer = VarPacker::new(b);
        packer
            .push(self.block_num.0, 32)
            .push(self.contract.0, 160)
            .push_bytes32(self.key)
            .push_bytes32(self.value);
        packer.finish()
    }
}

impl Assign for StorageSlot {
    type Var = StorageSlotVar;

    fn assign<B: CircuitBuilder>(&self, b: &mut B) -> StorageSlotVar {
        StorageSlotVar {
            block_num: Uint32(b.secret_input(Fr::from(self.block_num))),
            contract: Uint248(b.secret_input(address_to_fr(&self.contract))),
            key: Bytes32Api::new(b).witness(self.key),
            value: Bytes32Api::new(b).witness(self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionVar {
    pub block_num: Uint32,
    pub chain_id: Uint32,
    pub nonce: Uint32,
    pub max_priority_fee_per_gas: Uint64,
    pub gas_price_or_fee_cap: Uint64,
    pub gas_limit: Uint32,
    pub from: Uint248,
    pub to: Uint248,
    pub value: Bytes32,
}

impl CircuitValue for TransactionVar {
    fn values(&self) -> Vec<Variable> {
        vec![
            self.block_num.0,
            self.chain_id.0,
            self.nonce.0,
            self.max_priority_fee_per_gas.0,
            self.gas_price_or_fee_cap.0,
            self.gas_limit.0,
            self.from.0,
            self.to.0,
            self.value.lo,
            self.value.hi,
        ]
    }

    fn with_values(&self, values: &[Variable]) -> Self {
        Self {
            block_num: Uint32(values[0]),
            chain_id: Uint32(values[1]),
            nonce: Uint32(values[2]),
            max_priority_fee_per_gas: Uint64(values[3]),
            gas_price_or_fee_cap: Uint64(values[4]),
            gas_limit: Uint32(values[5]),
            from: Uint248(values[6]),
            to: Uint248(values[7]),
            value: Bytes32 {
                lo: values[8],
                hi: values[9],
            },
        }
    }
}

impl RecordVar for TransactionVar {
    fn pack<B: CircuitBuilder>(&self, b: &mut B) -> Vec<Variable> {
        let mut packer = VarPacker::new(b);
        packer
            .push(self.block_num.0, 32)
            .push(self.chain_id.0, 32)
            .push(self.nonce.0, 32)
            .push(self.max_priority_fee_per_gas.0, 64)
            .push(self.gas_price_or_fee_cap.0, 64)
            .push(self.gas_limit.0, 32)
            .push(self.from.0, 160)
            .push(self.to.0, 160)
            .push_bytes32(self.value);
        packer.finish()
    }
}

impl Assign for Transaction {
    type Var = TransactionVar;

    fn assign<B: CircuitBuilder>(&self, b: &mut B) -> TransactionVar {
        TransactionVar {
            block_num: Uint32(b.secret_input(Fr::from(self.block_num))),
            chain_id: Uint32(b.secret_input(Fr::from(self.chain_id))),
            nonce: Uint32(b.secret_input(Fr::from(self.nonce))),
            max_priority_fee_per_gas: Uint64(b.secret_input(Fr::from(
                self.max_priority_fee_per_gas,
            ))),
            gas_price_or_fee_cap: Uint64(b.secret_input(Fr::from(self.gas_price_or_fee_cap))),
            gas_limit: Uint32(b.secret_input(Fr::from(self.gas_limit))),
            from: Uint248(b.secret_input(address_to_fr(&self.from))),
            to: Uint248(b.secret_input(address_to_fr(&self.to))),
            value: Bytes32Api::new(b).witness(self.value),
        }
    }
}
