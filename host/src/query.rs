//! Queries and their placement
//!
//! Each query names one on-chain fact. It resolves to one circuit record,
//! either through a [`ChainSource`] or directly from mock data attached at
//! construction.

use crate::errors::{QuerierError, Result};
use crate::source::{to_receipt, to_storage_slot, to_transaction, ChainSource, LogFieldQuery};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shadow_query_core::data::{
    Category, Receipt, Record, StorageSlot, Transaction, NUM_MAX_LOG_FIELDS,
};
use shadow_query_core::types::{Address, Hash, B256};
use shadow_query_core::Allocation;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// Where a query result lands in its category's array
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// First slot not taken by a pinned or earlier query
    #[default]
    Ordered,
    /// A fixed slot
    Pinned(usize),
}

/// Log fields of one transaction receipt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptQuery {
    pub tx_hash: Hash,
    pub fields: Vec<LogFieldQuery>,
}

/// One storage slot of a contract at a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageQuery {
    pub block_num: u64,
    pub address: Address,
    pub slot: B256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub tx_hash: Hash,
}

impl ReceiptQuery {
    /// Rejects more than [`NUM_MAX_LOG_FIELDS`] fields.
    pub fn new(tx_hash: Hash, fields: Vec<LogFieldQuery>) -> Result<Self> {
        let query = Self { tx_hash, fields };
        query.validate()?;
        Ok(query)
    }
}

/// A record resolved by any query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "record", rename_all = "lowercase")]
pub enum Fetched {
    Receipt(Receipt),
    Storage(StorageSlot),
    Transaction(Transaction),
}

impl Fetched {
    pub fn category(&self) -> Category {
        match self {
            Fetched::Receipt(_) => Category::Receipt,
            Fetched::Storage(_) => Category::Storage,
            Fetched::Transaction(_) => Category::Transaction,
        }
    }
}

/// A query resolvable against a chain source
pub trait Query:
    Clone + fmt::Debug + Serialize + DeserializeOwned + PartialEq + Send + Sync + 'static
{
    type Output: Record + Send + 'static;

    const CATEGORY: Category;

    /// Checks independent of any chain data.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn fetch<S: ChainSource>(
        &self,
        chain: &S,
    ) -> impl Future<Output = Result<Self::Output>> + Send;

    fn into_fetched(record: Self::Output) -> Fetched;

    fn from_fetched(fetched: Fetched) -> Option<Self::Output>;

    /// Label used in errors and logs.
    fn describe(&self) -> String {
        format!("{} {:?}", Self::CATEGORY, self)
    }
}

impl Query for ReceiptQuery {
    type Output = Receipt;
    const CATEGORY: Category = Category::Receipt;

    fn validate(&self) -> Result<()> {
        if self.fields.len() > NUM_MAX_LOG_FIELDS {
            return Err(QuerierError::TooManyLogFields {
                requested: self.fields.len(),
                max: NUM_MAX_LOG_FIELDS,
            });
        }
        Ok(())
    }

    async fn fetch<S: ChainSource>(&self, chain: &S) -> Result<Receipt> {
        let label = self.describe();
        let receipt = chain
            .fetch_receipt(self.tx_hash)
            .await
            .map_err(|source| QuerierError::Fetch {
                query: label.clone(),
                source,
            })?;
        to_receipt(&label, &receipt, &self.fields)
    }

    fn into_fetched(record: Receipt) -> Fetched {
        Fetched::Receipt(record)
    }

    fn from_fetched(fetched: Fetched) -> Option<Receipt> {
        match fetched {
            Fetched::Receipt(r) => Some(r),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        format!("receipt {}", self.tx_hash)
    }
}

impl Query for StorageQuery {
    type Output = StorageSlot;
    const CATEGORY: Category = Category::Storage;

    async fn fetch<S: ChainSource>(&self, chain: &S) -> Result<StorageSlot> {
        let label = self.describe();
        let value = chain
            .fetch_storage(self.address, self.slot, self.block_num)
            .await
            .map_err(|source| QuerierError::Fetch {
                query: label.clone(),
                source,
            })?;
        to_storage_slot(&label, self.address, self.slot, self.block_num, value)
    }

    fn into_fetched(record: StorageSlot) -> Fetched {
        Fetched::Storage(record)
    }

    fn from_fetched(fetched: Fetched) -> Option<StorageSlot> {
        match fetched {
            Fetched::Storage(s) => Some(s),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        format!("storage {} of {} at {}", self.slot, self.address, self.block_num)
    }
}

impl Query for TransactionQuery {
    type Output = Transaction;
    const CATEGORY: Category = Category::Transaction;

    async fn fetch<S: ChainSource>(&self, chain: &S) -> Result<Transaction> {
        let label = self.describe();
        let tx = chain
            .fetch_transaction(self.tx_hash)
            .await
            .map_err(|source| QuerierError::Fetch {
                query: label.clone(),
                source,
            })?;
        to_transaction(&label, &tx)
    }

    fn into_fetched(record: Transaction) -> Fetched {
        Fetched::Transaction(record)
    }

    fn from_fetched(fetched: Fetched) -> Option<Transaction> {
        match fetched {
            Fetched::Transaction(t) => Some(t),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        format!("transaction {}", self.tx_hash)
    }
}

/// A query to run, or the record it stands for
#[derive(Debug, Clone, PartialEq)]
pub enum Request<Q: Query> {
    Live(Q),
    Mock(Q::Output),
}

impl<Q: Query> Request<Q> {
    pub fn is_mock(&self) -> bool {
        matches!(self, Request::Mock(_))
    }
}

/// Queries of one category with their placements
#[derive(Debug, Clone)]
pub struct QuerySet<Q: Query> {
    ordered: Vec<Request<Q>>,
    pinned: BTreeMap<usize, Request<Q>>,
}

impl<Q: Query> Default for QuerySet<Q> {
    fn default() -> Self {
        Self {
            ordered: Vec::new(),
            pinned: BTreeMap::new(),
        }
    }
}

impl<Q: Query> QuerySet<Q> {
    /// Add a request; a slot can be pinned once.
    pub fn add(&mut self, request: Request<Q>, placement: Placement) -> Result<()> {
        if let Request::Live(query) = &request {
            query.validate()?;
        }
        match placement {
            Placement::Ordered => self.ordered.push(request),
            Placement::Pinned(index) => {
                if self.pinned.contains_key(&index) {
                    return Err(QuerierError::DuplicatePinnedIndex {
                        category: Q::CATEGORY,
                        index,
                    });
                }
                self.pinned.insert(index, request);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ordered.len() + self.pinned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_mock(&self) -> usize {
        self.requests().filter(|r| r.is_mock()).count()
    }

    fn requests(&self) -> impl Iterator<Item = &Request<Q>> {
        self.pinned.values().chain(self.ordered.iter())
    }

    /// Check the set fits an allocation of `allocated` slots.
    pub fn check(&self, allocated: usize) -> Result<()> {
        if let Some((&index, _)) = self.pinned.range(allocated..).next() {
            return Err(QuerierError::PinnedIndexOutOfRange {
                category: Q::CATEGORY,
                index,
                allocated,
            });
        }
        if self.len() > allocated {
            return Err(QuerierError::AllocationExceeded {
                category: Q::CATEGORY,
                queries: self.len(),
                allocated,
            });
        }
        Ok(())
    }

    /// Slot of every request: pinned ones first, ordered ones fill the
    /// lowest free slots in insertion order.
    pub fn layout(&self) -> Vec<(usize, &Request<Q>)> {
        let mut out: Vec<(usize, &Request<Q>)> =
            self.pinned.iter().map(|(i, r)| (*i, r)).collect();
        let mut next = 0;
        for request in &self.ordered {
            while self.pinned.contains_key(&next) {
                next += 1;
            }
            out.push((next, request));
            next += 1;
        }
        out
    }

    /// Live queries that appear more than once.
    pub fn duplicates(&self) -> Vec<&Q> {
        let live: Vec<&Q> = self
            .requests()
            .filter_map(|r| match r {
                Request::Live(q) => Some(q),
                Request::Mock(_) => None,
            })
            .collect();
        let mut out = Vec::new();
        for (i, q) in live.iter().enumerate() {
            if live[..i].contains(q) && !out.contains(q) {
                out.push(*q);
            }
        }
        out
    }
}

/// A query with its placement, as written in a query file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placed<Q> {
    #[serde(flatten)]
    pub query: Q,
    #[serde(default)]
    pub placement: Placement,
}

/// Queries of one circuit, loaded by the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFile {
    pub allocation: Allocation,
    pub receipts: Vec<Placed<ReceiptQuery>>,
    pub storage: Vec<Placed<StorageQuery>>,
    pub transactions: Vec<Placed<TransactionQuery>>,
}
