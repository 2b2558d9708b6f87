//! Chain data source
//!
//! The querier only talks to the chain through [`ChainSource`]. Records come
//! back in chain shape ([`ChainReceipt`], [`ChainTransaction`]) and are
//! narrowed to circuit records by the `to_*` conversions, which enforce the
//! packed widths.

use crate::errors::{QuerierError, Result};
use serde::{Deserialize, Serialize};
use shadow_query_core::data::{EventId, FieldIndex, LogField, Receipt, StorageSlot, Transaction};
use shadow_query_core::types::{Address, Bytes, Hash, B256, U256};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Errors reported by a chain source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Not yet included in a block
    #[error("pending: {0}")]
    Pending(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Event log (from the EVM)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log
    pub address: Address,
    /// Log topics (indexed parameters)
    pub topics: Vec<Hash>,
    /// Non-indexed data
    pub data: Bytes,
}

/// Receipt as returned by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReceipt {
    pub tx_hash: Hash,
    /// `None` while pending
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

/// Transaction as returned by a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub hash: Hash,
    /// `None` while pending
    pub block_number: Option<u64>,
    pub chain_id: u64,
    pub nonce: u64,
    #[serde(default)]
    pub gas_price: Option<u128>,
    #[serde(default)]
    pub max_fee_per_gas: Option<u128>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<u128>,
    pub gas_limit: u64,
    pub from: Address,
    /// `None` for contract creation
    #[serde(default)]
    pub to: Option<Address>,
    pub value: U256,
}

/// Where the querier gets chain data from
pub trait ChainSource: Send + Sync + 'static {
    fn fetch_receipt(
        &self,
        tx_hash: Hash,
    ) -> impl Future<Output = std::result::Result<ChainReceipt, SourceError>> + Send;

    fn fetch_storage(
        &self,
        address: Address,
        slot: B256,
        block: u64,
    ) -> impl Future<Output = std::result::Result<B256, SourceError>> + Send;

    fn fetch_transaction(
        &self,
        tx_hash: Hash,
    ) -> impl Future<Output = std::result::Result<ChainTransaction, SourceError>> + Send;
}

/// Selects one value of one log of a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogFieldQuery {
    /// Position of the log in the receipt
    pub log_index: usize,
    /// Read `topics[field_index]` rather than data word `field_index`
    pub is_topic: bool,
    pub field_index: u8,
}

fn narrow<T: TryFrom<u128>>(
    query: &str,
    field: &'static str,
    value: u128,
    bits: usize,
) -> Result<T> {
    T::try_from(value).map_err(|_| QuerierError::FieldOutOfRange {
        query: query.to_string(),
        field,
        value: value.to_string(),
        bits,
    })
}

fn finalized(query: &str, block_number: Option<u64>) -> Result<u32> {
    let block = block_number.ok_or_else(|| QuerierError::Fetch {
        query: query.to_string(),
        source: SourceError::Pending(query.to_string()),
    })?;
    narrow(query, "block_number", block as u128, 32)
}

fn extract_field(query: &str, log: &Log, sel: &LogFieldQuery) -> Result<LogField> {
    let out_of_range = |what: String| QuerierError::Fetch {
        query: query.to_string(),
        source: SourceError::Invalid(what),
    };
    let index = FieldIndex::new(sel.field_index).ok_or_else(|| QuerierError::FieldOutOfRange {
        query: query.to_string(),
        field: "field_index",
        value: sel.field_index.to_string(),
        bits: FieldIndex::BITS,
    })?;
    let signature = log
        .topics
        .first()
        .ok_or_else(|| out_of_range(format!("log {} is anonymous", sel.log_index)))?;
    let i = sel.field_index as usize;
    let value = if sel.is_topic {
        *log.topics
            .get(i)
            .ok_or_else(|| out_of_range(format!("log {} has no topic {i}", sel.log_index)))?
    } else {
        let word = log
            .data
            .get(32 * i..32 * i + 32)
            .ok_or_else(|| out_of_range(format!("log {} has no data word {i}", sel.log_index)))?;
        B256::from_slice(word)
    };
    Ok(LogField {
        contract: log.address,
        event_id: EventId::from_slice(&signature[..6]),
        is_topic: sel.is_topic,
        index,
        value,
    })
}

/// Narrow a receipt to the requested log fields.
pub fn to_receipt(query: &str, receipt: &ChainReceipt, fields: &[LogFieldQuery]) -> Result<Receipt> {
    let mut out = Receipt {
        block_num: finalized(query, receipt.block_number)?,
        ..Default::default()
    };
    if fields.len() > out.fields.len() {
        return Err(QuerierError::TooManyLogFields {
            requested: fields.len(),
            max: out.fields.len(),
        });
    }
    for (slot, sel) in out.fields.iter_mut().zip(fields) {
        let log = receipt.logs.get(sel.log_index).ok_or_else(|| QuerierError::Fetch {
            query: query.to_string(),
            source: SourceError::Invalid(format!(
                "receipt has {} logs, log {} requested",
                receipt.logs.len(),
                sel.log_index
            )),
        })?;
        *slot = extract_field(query, log, sel)?;
    }
    Ok(out)
}

pub fn to_storage_slot(
    query: &str,
    address: Address,
    key: B256,
    block: u64,
    value: B256,
) -> Result<StorageSlot> {
    Ok(StorageSlot {
        block_num: finalized(query, Some(block))?,
        contract: address,
        key,
        value,
    })
}

pub fn to_transaction(query: &str, tx: &ChainTransaction) -> Result<Transaction> {
    let fee_cap = tx.max_fee_per_gas.or(tx.gas_price).unwrap_or_default();
    Ok(Transaction {
        block_num: finalized(query, tx.block_number)?,
        chain_id: narrow(query, "chain_id", tx.chain_id as u128, 32)?,
        nonce: narrow(query, "nonce", tx.nonce as u128, 32)?,
        max_priority_fee_per_gas: narrow(
            query,
            "max_priority_fee_per_gas",
            tx.max_priority_fee_per_gas.unwrap_or_default(),
            64,
        )?,
        gas_price_or_fee_cap: narrow(query, "gas_price_or_fee_cap", fee_cap, 64)?,
        gas_limit: narrow(query, "gas_limit", tx.gas_limit as u128, 32)?,
        from: tx.from,
        to: tx.to.unwrap_or(Address::ZERO),
        value: B256::from(tx.value),
    })
}

/// Storage value in a fixture file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub address: Address,
    pub slot: B256,
    pub block: u64,
    pub value: B256,
}

/// Chain data of a [`MemorySource`], as stored in JSON fixtures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub receipts: Vec<ChainReceipt>,
    pub storage: Vec<StorageEntry>,
    pub transactions: Vec<ChainTransaction>,
}

/// In-memory chain source for tests and offline commitments
#[derive(Debug, Default)]
pub struct MemorySource {
    receipts: HashMap<Hash, ChainReceipt>,
    storage: HashMap<(Address, B256, u64), B256>,
    transactions: HashMap<Hash, ChainTransaction>,
    calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(fixtures: Fixtures) -> Self {
        let mut source = Self::default();
        for receipt in fixtures.receipts {
            source.insert_receipt(receipt);
        }
        for entry in fixtures.storage {
            source.insert_storage(entry);
        }
        for tx in fixtures.transactions {
            source.insert_transaction(tx);
        }
        source
    }

    /// Load fixtures from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| QuerierError::Config(format!("{}: {e}", path.display())))?;
        let fixtures: Fixtures = serde_json::from_str(&json)
            .map_err(|e| QuerierError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::new(fixtures))
    }

    pub fn insert_receipt(&mut self, receipt: ChainReceipt) {
        self.receipts.insert(receipt.tx_hash, receipt);
    }

    pub fn insert_storage(&mut self, entry: StorageEntry) {
        self.storage
            .insert((entry.address, entry.slot, entry.block), entry.value);
    }

    pub fn insert_transaction(&mut self, tx: ChainTransaction) {
        self.transactions.insert(tx.hash, tx);
    }

    /// Number of fetches served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn served(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

impl ChainSource for MemorySource {
    async fn fetch_receipt(&self, tx_hash: Hash) -> std::result::Result<ChainReceipt, SourceError> {
        self.served();
        self.receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("receipt {tx_hash}")))
    }

    async fn fetch_storage(
        &self,
        address: Address,
        slot: B256,
        block: u64,
    ) -> std::result::Result<B256, SourceError> {
        self.served();
        self.storage
            .get(&(address, slot, block))
            .copied()
            .ok_or_else(|| SourceError::NotFound(format!("slot {slot} of {address} at {block}")))
    }

    async fn fetch_transaction(
        &self,
        tx_hash: Hash,
    ) -> std::result::Result<ChainTransaction, SourceError> {
        self.served();
        self.transactions
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("transaction {tx_hash}")))
    }
}
