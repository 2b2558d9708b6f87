//! Native input commitments
//!
//! Mirrors what the host circuit proves: one MiMC commitment per slot (or the
//! category's dummy constant for an inactive slot), a Merkle root over all
//! slots padded to a power of two, and a Merkle root over the toggle bitmap.

use crate::data::{Allocation, Category, DataInput, DataPoints, Record};
use crate::errors::{CircuitError, Result};
use crate::field::Fr;
use crate::hashing::{merkle_root, mimc_hash};
use crate::types::{ChainId, U256};
use alloy_primitives::uint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Toggles recomposed into one toggle-tree leaf
pub const TOGGLES_PER_LEAF: usize = 32;

/// Commitments standing in for inactive slots of one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyCommitments {
    pub receipt: Fr,
    pub storage: Fr,
    pub transaction: Fr,
}

impl DummyCommitments {
    pub fn of(&self, category: Category) -> Fr {
        match category {
            Category::Receipt => self.receipt,
            Category::Storage => self.storage,
            Category::Transaction => self.transaction,
        }
    }

    /// Constant committed for slots past the allocation.
    pub fn padding(&self) -> Fr {
        self.transaction
    }
}

/// Built-in dummy commitments as `(chain, [receipt, storage, transaction])`
const BUILTIN_DUMMIES: [(ChainId, [U256; 3]); 2] = [
    (
        1,
        [
            uint!(0x127d5d805cfd68acd5c88659d1cf96bcec545959ed27b8d654e90a8d9165501d_U256),
            uint!(0x23f3a31138685cdf359df5193c2615577a0cb7ec6e8f6a7b8c722bbdc255605b_U256),
            uint!(0xe4dda4409fbd8fd88485c70167bc1cfe55753b147aeb1725a2dee8aa59ba92_U256),
        ],
    ),
    (
        11_155_111,
        [
            uint!(0x247798fb66851e5debc66ef1e5971749cfcf539104bc7510641672a4fdc90a90_U256),
            uint!(0x2336cce9e3b665975faa856aede7417b3f79918e8cdbd5cb965dad2cd338588c_U256),
            uint!(0x260aeaed3bc908862d4a07909019735656df7d6cedd66bde5d0dba6d02f115bc_U256),
        ],
    ),
];

/// Dummy commitments per chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyTable {
    chains: BTreeMap<ChainId, DummyCommitments>,
}

impl DummyTable {
    /// Ethereum mainnet and Sepolia.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (chain_id, [receipt, storage, transaction]) in BUILTIN_DUMMIES {
            table.insert(
                chain_id,
                DummyCommitments {
                    receipt: Fr::from_u256_reduced(receipt),
                    storage: Fr::from_u256_reduced(storage),
                    transaction: Fr::from_u256_reduced(transaction),
                },
            );
        }
        table
    }

    pub fn insert(&mut self, chain_id: ChainId, dummies: DummyCommitments) {
        self.chains.insert(chain_id, dummies);
    }

    /// Entries of `other` replace ours.
    pub fn merge(&mut self, other: &DummyTable) {
        self.chains.extend(other.chains.iter().map(|(k, v)| (*k, *v)));
    }

    pub fn get(&self, chain_id: ChainId) -> Option<&DummyCommitments> {
        self.chains.get(&chain_id)
    }

    pub fn chains(&self) -> impl Iterator<Item = (&ChainId, &DummyCommitments)> {
        self.chains.iter()
    }

    /// Dummies for a circuit on `chain_id`; the missing category reported is
    /// the first one the allocation uses.
    pub fn resolve(&self, chain_id: ChainId, allocation: &Allocation) -> Result<DummyCommitments> {
        self.get(chain_id).copied().ok_or_else(|| {
            let category = Category::ALL
                .into_iter()
                .find(|c| allocation.of(*c) > 0)
                .unwrap_or(Category::Transaction);
            CircuitError::MissingDummyCommitment {
                chain_id,
                category: category.name(),
            }
        })
    }
}

fn commit_points<T: Record>(points: &DataPoints<T>, dummy: Fr, out: &mut Vec<Fr>) {
    for (record, on) in points.raw().iter().zip(points.toggles()) {
        out.push(if *on { record_commitment(record) } else { dummy });
    }
}

/// Commitment of one active record.
pub fn record_commitment<T: Record>(record: &T) -> Fr {
    mimc_hash(&record.pack())
}

/// Per-slot commitments in order receipts, storage, transactions, padded
/// with the padding dummy to `allocation.data_points()`.
pub fn slot_commitments(
    data: &DataInput,
    allocation: &Allocation,
    dummies: &DummyCommitments,
) -> Result<Vec<Fr>> {
    data.check_shape(allocation)?;
    let data_points = allocation.data_points();
    let mut out = Vec::with_capacity(data_points);
    commit_points(&data.receipts, dummies.receipt, &mut out);
    commit_points(&data.storage_slots, dummies.storage, &mut out);
    commit_points(&data.transactions, dummies.transaction, &mut out);
    out.resize(data_points, dummies.padding());
    Ok(out)
}

/// Leaves of the toggle tree: toggles padded to `data_points`, 32 per leaf,
/// least significant bit first.
pub fn toggle_words(toggles: &[bool], data_points: usize) -> Vec<Fr> {
    let mut padded = toggles.to_vec();
    padded.resize(data_points, false);
    padded.chunks(TOGGLES_PER_LEAF).map(Fr::from_bits_le).collect()
}

pub fn toggles_commitment(toggles: &[bool], data_points: usize) -> Fr {
    let leaves: Vec<Fr> = toggle_words(toggles, data_points)
        .into_iter()
        .map(|word| mimc_hash(&[word]))
        .collect();
    merkle_root(&leaves)
}

/// All input-side commitments of a circuit input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCommitments {
    pub slots: Vec<Fr>,
    pub root: Fr,
    pub toggles: Fr,
}

impl InputCommitments {
    pub fn compute(
        data: &DataInput,
        allocation: &Allocation,
        dummies: &DummyCommitments,
    ) -> Result<Self> {
        let slots = slot_commitments(data, allocation, dummies)?;
        let root = merkle_root(&slots);
        let toggles = toggles_commitment(&data.toggles(), allocation.data_points());
        Ok(Self {
            slots,
            root,
            toggles,
        })
    }
}
