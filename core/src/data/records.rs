//! Native record types
//!
//! These are the off-circuit forms of the data a guest consumes. Each field
//! uses the narrowest Rust integer that holds its packed width, so a record
//! that type-checks always packs without truncation.

use super::pack::{packed_len, BitPacker};
use super::NUM_MAX_LOG_FIELDS;
use crate::field::Fr;
use crate::types::{Address, FixedBytes, B256};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Packed width of a [`LogField`]
pub const LOG_FIELD_BITS: usize = 160 + 48 + 1 + 7 + 256;

/// Packed width of a [`Receipt`]
pub const RECEIPT_BITS: usize = 32 + NUM_MAX_LOG_FIELDS * LOG_FIELD_BITS;

/// Packed width of a [`StorageSlot`]
pub const STORAGE_SLOT_BITS: usize = 32 + 160 + 256 + 256;

/// Packed width of a [`Transaction`]
pub const TRANSACTION_BITS: usize = 32 + 32 + 32 + 64 + 64 + 32 + 160 + 160 + 256;

/// First 6 bytes of a log's `topics[0]`
pub type EventId = FixedBytes<6>;

/// The three kinds of data a guest can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Receipt,
    Storage,
    Transaction,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Receipt, Category::Storage, Category::Transaction];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Receipt => "receipt",
            Category::Storage => "storage",
            Category::Transaction => "transaction",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of a value inside a log: topic index or 32-byte data word index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FieldIndex(u8);

impl FieldIndex {
    pub const BITS: usize = 7;
    pub const MAX: u8 = (1 << Self::BITS) - 1;

    pub fn new(index: u8) -> Option<Self> {
        (index <= Self::MAX).then_some(Self(index))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

/// Index does not fit 7 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIndexTooLarge(pub u8);

impl fmt::Display for FieldIndexTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log field index {} exceeds {}", self.0, FieldIndex::MAX)
    }
}

impl std::error::Error for FieldIndexTooLarge {}

impl TryFrom<u8> for FieldIndex {
    type Error = FieldIndexTooLarge;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index).ok_or(FieldIndexTooLarge(index))
    }
}

impl From<FieldIndex> for u8 {
    fn from(index: FieldIndex) -> Self {
        index.0
    }
}

/// One value extracted from a receipt's log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogField {
    /// Contract that emitted the log
    pub contract: Address,
    /// Event signature prefix
    pub event_id: EventId,
    /// The value is a topic rather than a data word
    pub is_topic: bool,
    /// Topic index or data word index
    pub index: FieldIndex,
    /// The extracted 32-byte value
    pub value: B256,
}

impl LogField {
    fn pack_into(&self, packer: &mut BitPacker) {
        packer
            .push_address(&self.contract)
            .push_u64(u64::from_be_bytes(pad_event_id(&self.event_id)), 48)
            .push_bool(self.is_topic)
            .push_u64(self.index.get() as u64, FieldIndex::BITS)
            .push_word(&self.value);
    }
}

fn pad_event_id(id: &EventId) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes[2..].copy_from_slice(id.as_slice());
    bytes
}

/// Transaction receipt reduced to up to three log fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Receipt {
    pub block_num: u32,
    /// Unused fields stay all-zero
    pub fields: [LogField; NUM_MAX_LOG_FIELDS],
}

/// Value of one storage slot at a block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageSlot {
    pub block_num: u32,
    pub contract: Address,
    pub key: B256,
    pub value: B256,
}

/// Transaction fields a guest can reason about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub block_num: u32,
    pub chain_id: u32,
    pub nonce: u32,
    /// Zero for transactions without dynamic fees
    pub max_priority_fee_per_gas: u64,
    /// Gas price for legacy transactions, fee cap for dynamic-fee ones
    pub gas_price_or_fee_cap: u64,
    pub gas_limit: u32,
    pub from: Address,
    /// Zero address for contract creation
    pub to: Address,
    pub value: B256,
}

/// Canonical packing of a native record
pub trait Record:
    Clone + Default + PartialEq + fmt::Debug + Serialize + for<'de> Deserialize<'de>
{
    const CATEGORY: Category;

    /// Packed width in bits
    const BITS: usize;

    /// Number of field elements of the packed form
    const PACKED_LEN: usize = packed_len(Self::BITS);

    fn pack(&self) -> Vec<Fr>;
}

impl Record for Receipt {
    const CATEGORY: Category = Category::Receipt;
    const BITS: usize = RECEIPT_BITS;

    fn pack(&self) -> Vec<Fr> {
        let mut packer = BitPacker::new();
        packer.push_u64(self.block_num as u64, 32);
        for field in &self.fields {
            field.pack_into(&mut packer);
        }
        packer.finish()
    }
}

impl Record for StorageSlot {
    const CATEGORY: Category = Category::Storage;
    const BITS: usize = STORAGE_SLOT_BITS;

    fn pack(&self) -> Vec<Fr> {
        let mut packer = BitPacker::new();
        packer
            .push_u64(self.block_num as u64, 32)
            .push_address(&self.contract)
            .push_word(&self.key)
            .push_word(&self.value);
        packer.finish()
    }
}

impl Record for Transaction {
    const CATEGORY: Category = Category::Transaction;
    const BITS: usize = TRANSACTION_BITS;

    fn pack(&self) -> Vec<Fr> {
        let mut packer = BitPacker::new();
        packer
            .push_u64(self.block_num as u64, 32)
            .push_u64(self.chain_id as u64, 32)
            .push_u64(self.nonce as u64, 32)
            .push_u64(self.max_priority_fee_per_gas, 64)
            .push_u64(self.gas_price_or_fee_cap, 64)
            .push_u64(self.gas_limit as u64, 32)
            .push_address(&self.from)
            .push_address(&self.to)
            .push_word(&self.value);
        packer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_sizes() {
        assert_eq!(RECEIPT_BITS, 1448);
        assert_eq!(Receipt::PACKED_LEN, 6);
        assert_eq!(StorageSlot::PACKED_LEN, 3);
        assert_eq!(Transaction::PACKED_LEN, 4);
        assert_eq!(Receipt::default().pack().len(), 6);
        assert_eq!(StorageSlot::default().pack().len(), 3);
        assert_eq!(Transaction::default().pack().len(), 4);
    }

    #[test]
    fn test_block_number_is_lowest_bits() {
        let slot = StorageSlot {
            block_num: 0x1234,
            ..Default::default()
        };
        let packed = slot.pack();
        assert_eq!(packed[0], Fr::from(0x1234u64));
        assert!(packed[1..].iter().all(Fr::is_zero));
    }

    #[test]
    fn test_field_index_bounds() {
        assert!(FieldIndex::new(127).is_some());
        assert!(FieldIndex::new(128).is_none());
        assert_eq!(FieldIndex::try_from(200u8), Err(FieldIndexTooLarge(200)));
        let parsed: Result<FieldIndex, _> = serde_json::from_str("128");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_event_id_position() {
        let mut receipt = Receipt::default();
        receipt.fields[0].event_id = EventId::from([0, 0, 0, 0, 0, 1]);
        let packed = receipt.pack();
        // block number (32) + contract (160) come first
        assert_eq!(packed[0], Fr::pow2(192));
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&Category::Storage).unwrap();
        assert_eq!(json, "\"storage\"");
        assert_eq!(Category::Transaction.to_string(), "transaction");
    }
}
