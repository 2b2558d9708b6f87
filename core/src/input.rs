//! Circuit input
//!
//! A [`CircuitInput`] is the complete witness assignment of a host circuit:
//! the toggled data arrays plus every commitment the circuit re-derives.
//! It is frozen once built; the dry run fills in the output side through
//! [`CircuitInput::with_output`].

use crate::commitment::{DummyCommitments, InputCommitments};
use crate::data::{Allocation, DataInput};
use crate::errors::{CircuitError, Result};
use crate::field::Fr;
use crate::hashing::hash_struct;
use crate::output::OutputCommitment;
use crate::types::{ChainId, Hash};
use serde::{Deserialize, Serialize};

/// Data, commitments and dry-run output of one circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitInput {
    chain_id: ChainId,
    allocation: Allocation,
    data: DataInput,
    dummies: DummyCommitments,
    input_commitments: Vec<Fr>,
    input_commitments_root: Fr,
    toggles_commitment: Fr,
    output_commitment: Option<OutputCommitment>,
    output: Vec<u8>,
}

impl CircuitInput {
    /// Validate the allocation and shape of `data` and compute the input
    /// commitments.
    pub fn commit(
        chain_id: ChainId,
        data: DataInput,
        allocation: Allocation,
        dummies: DummyCommitments,
    ) -> Result<Self> {
        allocation.validate()?;
        let commitments = InputCommitments::compute(&data, &allocation, &dummies)?;
        Ok(Self {
            chain_id,
            allocation,
            data,
            dummies,
            input_commitments: commitments.slots,
            input_commitments_root: commitments.root,
            toggles_commitment: commitments.toggles,
            output_commitment: None,
            output: Vec::new(),
        })
    }

    /// Attach the output produced by a dry run.
    pub fn with_output(mut self, commitment: OutputCommitment, output: Vec<u8>) -> Self {
        self.output_commitment = Some(commitment);
        self.output = output;
        self
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    pub fn data(&self) -> &DataInput {
        &self.data
    }

    pub fn dummies(&self) -> &DummyCommitments {
        &self.dummies
    }

    pub fn input_commitments(&self) -> &[Fr] {
        &self.input_commitments
    }

    pub fn input_commitments_root(&self) -> Fr {
        self.input_commitments_root
    }

    pub fn toggles_commitment(&self) -> Fr {
        self.toggles_commitment
    }

    pub fn output_commitment(&self) -> Option<OutputCommitment> {
        self.output_commitment
    }

    /// ABI-packed guest output, empty before the dry run.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn data_points(&self) -> usize {
        self.allocation.data_points()
    }

    /// Shape checks shared by every evaluation of this input.
    pub fn check_shape(&self, allocation: &Allocation) -> Result<()> {
        if *allocation != self.allocation {
            return Err(CircuitError::InputShape(format!(
                "input built for {:?}, guest allocates {:?}",
                self.allocation, allocation
            )));
        }
        self.data.check_shape(allocation)?;
        if self.input_commitments.len() != allocation.data_points() {
            return Err(CircuitError::InputShape(format!(
                "{} input commitments for {} data points",
                self.input_commitments.len(),
                allocation.data_points()
            )));
        }
        Ok(())
    }

    /// Digest identifying this input.
    pub fn hash(&self) -> Result<Hash> {
        hash_struct(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::DummyTable;
    use crate::data::StorageSlot;

    fn input() -> CircuitInput {
        let allocation = Allocation::new(0, 32, 0);
        let mut data = DataInput::new(&allocation);
        data.storage_slots
            .set(0, StorageSlot {
                block_num: 9,
                ..Default::default()
            })
            .unwrap();
        let dummies = DummyTable::builtin().resolve(1, &allocation).unwrap();
        CircuitInput::commit(1, data, allocation, dummies).unwrap()
    }

    #[test]
    fn test_commit_fills_commitments() {
        let input = input();
        assert_eq!(input.input_commitments().len(), 32);
        assert_eq!(input.data_points(), 32);
        assert!(input.output_commitment().is_none());
        assert!(input.output().is_empty());
        assert!(input.check_shape(&Allocation::new(0, 32, 0)).is_ok());
        assert!(input.check_shape(&Allocation::new(32, 0, 0)).is_err());
    }

    #[test]
    fn test_invalid_allocation_rejected() {
        let allocation = Allocation::new(0, 16, 0);
        let data = DataInput::new(&allocation);
        let dummies = *DummyTable::builtin().get(1).unwrap();
        let err = CircuitInput::commit(1, data, allocation, dummies).unwrap_err();
        assert!(matches!(err, CircuitError::InvalidAllocation(_)));
    }

    #[test]
    fn test_with_output_changes_hash() {
        let input = input();
        let before = input.hash().unwrap();
        let done = input.with_output(OutputCommitment::empty(), Vec::new());
        assert_eq!(done.output_commitment(), Some(OutputCommitment::empty()));
        assert_ne!(done.hash().unwrap(), before);
    }

    #[test]
    fn test_json_roundtrip() {
        let input = input().with_output(OutputCommitment::of_output(&[1]), vec![1]);
        let json = serde_json::to_string(&input).unwrap();
        let back: CircuitInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, input);
    }
}
