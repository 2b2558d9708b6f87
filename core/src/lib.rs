//! # Shadow-Query Core
//!
//! Verifiable historical Ethereum data for zero-knowledge guest circuits.
//!
//! A guest circuit consumes fixed-size arrays of receipts, storage slots and
//! transactions. This crate provides the typed values and iteration helpers
//! a guest is written with, and the host circuit that binds the guest's data
//! and output to public commitments:
//!
//! ```text
//! ┌─────────────────┐
//! │  CircuitInput   │ ── toggled data arrays + input commitments
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   HostCircuit   │ ── pack + MiMC per slot, Merkle roots, toggle root
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   AppCircuit    │ ── guest logic over DataStream / typed values
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ OutputCommit-   │ ── Keccak256(output) as {hi, lo}
//! │     ment        │
//! └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shadow_query_core::prelude::*;
//!
//! struct CountSlots;
//!
//! impl AppCircuit for CountSlots {
//!     fn allocate(&self) -> Allocation {
//!         Allocation::new(0, 32, 0)
//!     }
//!
//!     fn define<B: CircuitBuilder>(&self, api: &mut CircuitApi<B>, data: &DataInputVars) -> Result<()> {
//!         let slots = DataStream::from_points(&data.storage_slots);
//!         let count = slots.count(api);
//!         api.output_uint(32, count)
//!     }
//! }
//!
//! let input = CircuitInput::commit(1, data, CountSlots.allocate(), dummies)?;
//! let input = complete(input, &CountSlots)?;
//! println!("output commitment: {}", input.output_commitment().unwrap());
//! ```
//!
//! ## Modules
//!
//! - [`field`] - BN254 scalar field element
//! - [`builder`] - backend capability trait
//! - [`solver`] - concrete-value backend with constraint fingerprinting
//! - [`hints`] - off-circuit hint functions
//! - [`values`] - typed circuit values
//! - [`circuit_api`] - guest-facing API and output buffer
//! - [`gadgets`] - MiMC, Merkle and Keccak gadgets
//! - [`data`] - records, toggled arrays and packing
//! - [`datastream`] - map / filter / reduce over toggled arrays
//! - [`commitment`] - dummy constants and native input commitments
//! - [`input`] / [`output`] - circuit input and output commitment
//! - [`host_circuit`] - the commitment protocol around a guest

pub mod builder;
pub mod circuit_api;
pub mod commitment;
pub mod data;
pub mod datastream;
pub mod errors;
pub mod field;
pub mod gadgets;
pub mod hashing;
pub mod hints;
pub mod host_circuit;
pub mod input;
pub mod output;
pub mod solver;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use builder::{CircuitBuilder, Variable};
pub use circuit_api::CircuitApi;
pub use commitment::{DummyCommitments, DummyTable, InputCommitments};
pub use data::{
    Allocation, DataInput, DataInputVars, DataPoints, Receipt, StorageSlot, Transaction,
};
pub use datastream::DataStream;
pub use errors::{CircuitError, Result};
pub use field::Fr;
pub use hashing::{keccak256, mimc_hash};
pub use host_circuit::{check_satisfied, complete, dry_run, AppCircuit, Evaluation, HostCircuit};
pub use input::CircuitInput;
pub use output::OutputCommitment;
pub use solver::Solver;
pub use types::{Address, ChainId, Hash, B256, U256};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::{
        Category, EventId, FieldIndex, LogField, LogFieldVar, ReceiptVar, StorageSlotVar,
        TransactionVar,
    };
    pub use crate::values::{Bytes32, Int248, Uint248, Uint32, Uint521, Uint64, Unsigned};
    pub use crate::{
        check_satisfied, complete, dry_run, Address, Allocation, AppCircuit, CircuitApi,
        CircuitBuilder, CircuitError, CircuitInput, DataInput, DataInputVars, DataStream,
        DummyTable, Fr, OutputCommitment, Receipt, Result, StorageSlot, Transaction, B256, U256,
    };
}

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use crate::commitment::record_commitment;
    use crate::hashing::{merkle_root, mimc_hash};

    struct ReceiptGuest;

    impl AppCircuit for ReceiptGuest {
        fn allocate(&self) -> Allocation {
            Allocation::new(32, 0, 0)
        }

        fn define<B: CircuitBuilder>(
            &self,
            api: &mut CircuitApi<B>,
            data: &DataInputVars,
        ) -> Result<()> {
            let receipts = DataStream::from_points(&data.receipts);
            let receipt = receipts.get(api, 5)?;
            api.output_uint32(receipt.block_num)?;
            api.output_bytes32(receipt.fields[0].value)
        }
    }

    struct Silent;

    impl AppCircuit for Silent {
        fn allocate(&self) -> Allocation {
            Allocation::new(0, 32, 32)
        }

        fn define<B: CircuitBuilder>(&self, _: &mut CircuitApi<B>, _: &DataInputVars) -> Result<()> {
            Ok(())
        }
    }

    struct DivideByZero;

    impl AppCircuit for DivideByZero {
        fn allocate(&self) -> Allocation {
            Allocation::new(0, 0, 32)
        }

        fn define<B: CircuitBuilder>(&self, api: &mut CircuitApi<B>, _: &DataInputVars) -> Result<()> {
            let a = api.uint248().constant(10);
            let zero = api.uint248().zero();
            let (q, _) = api.uint248().div(a, zero);
            api.output_uint(248, q)
        }
    }

    fn dummies(allocation: &Allocation) -> crate::DummyCommitments {
        DummyTable::builtin().resolve(1, allocation).unwrap()
    }

    fn receipt_input() -> (CircuitInput, Receipt) {
        let allocation = ReceiptGuest.allocate();
        let mut data = DataInput::new(&allocation);
        let mut receipt = Receipt {
            block_num: 18_500_000,
            ..Default::default()
        };
        receipt.fields[0] = LogField {
            contract: Address::repeat_byte(0x42),
            event_id: EventId::from([0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2]),
            is_topic: false,
            index: FieldIndex::new(0).unwrap(),
            value: B256::with_last_byte(99),
        };
        data.receipts.set(5, receipt).unwrap();
        let input = CircuitInput::commit(1, data, allocation, dummies(&allocation)).unwrap();
        (input, receipt)
    }

    /// One real receipt at index 5 of a 32-slot allocation
    #[test]
    fn test_single_receipt_commitments() {
        let (input, receipt) = receipt_input();
        let dummy = dummies(&ReceiptGuest.allocate()).receipt;
        for (i, slot) in input.input_commitments().iter().enumerate() {
            let expected = if i == 5 { record_commitment(&receipt) } else { dummy };
            assert_eq!(*slot, expected, "slot {i}");
        }
        assert_eq!(
            input.input_commitments_root(),
            merkle_root(input.input_commitments())
        );
        assert_eq!(input.toggles_commitment(), mimc_hash(&[Fr::from(1u64 << 5)]));

        let input = complete(input, &ReceiptGuest).unwrap();
        let mut expected = 18_500_000u32.to_be_bytes().to_vec();
        expected.extend_from_slice(B256::with_last_byte(99).as_slice());
        assert_eq!(input.output(), expected.as_slice());
        check_satisfied(&input, &ReceiptGuest).unwrap();
    }

    #[test]
    fn test_empty_output_commitment() {
        let allocation = Silent.allocate();
        let data = DataInput::new(&allocation);
        let input = CircuitInput::commit(11_155_111, data, allocation, {
            DummyTable::builtin().resolve(11_155_111, &allocation).unwrap()
        })
        .unwrap();
        let (commitment, output) = dry_run(&input, &Silent).unwrap();
        assert!(output.is_empty());
        assert_eq!(commitment, OutputCommitment::empty());
        assert_eq!(commitment.hash(), crate::keccak256(&[]));
    }

    #[test]
    fn test_divide_by_zero_is_unsatisfied() {
        let allocation = DivideByZero.allocate();
        let data = DataInput::new(&allocation);
        let input = CircuitInput::commit(1, data, allocation, dummies(&allocation)).unwrap();
        let err = dry_run(&input, &DivideByZero).unwrap_err();
        assert!(matches!(err, CircuitError::Unsatisfied { .. }));
    }

    #[test]
    fn test_guest_error_has_no_output_commitment() {
        let (input, _) = receipt_input();
        struct Failing;
        impl AppCircuit for Failing {
            fn allocate(&self) -> Allocation {
                Allocation::new(32, 0, 0)
            }
            fn define<B: CircuitBuilder>(
                &self,
                _: &mut CircuitApi<B>,
                _: &DataInputVars,
            ) -> Result<()> {
                Err(CircuitError::Guest("not implemented".into()))
            }
        }
        let err = dry_run(&input, &Failing).unwrap_err();
        assert!(matches!(err, CircuitError::NoOutputCommitment(_)));
    }

    #[test]
    fn test_evaluations_are_deterministic() {
        let (input, _) = receipt_input();
        let input = complete(input, &ReceiptGuest).unwrap();
        let first = check_satisfied(&input, &ReceiptGuest).unwrap();
        let second = check_satisfied(&input, &ReceiptGuest).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_tampered_inputs_are_unsatisfied() {
        let (input, _) = receipt_input();
        let input = complete(input, &ReceiptGuest).unwrap();
        let mut json = serde_json::to_value(&input).unwrap();

        let mut toggles = json.clone();
        toggles["toggles_commitment"] = serde_json::to_value(Fr::from(7u64)).unwrap();
        let tampered: CircuitInput = serde_json::from_value(toggles).unwrap();
        let err = check_satisfied(&tampered, &ReceiptGuest).unwrap_err();
        assert!(matches!(err, CircuitError::Unsatisfied { .. }));

        // swap the real receipt for another one without recommitting
        json["data"]["receipts"]["raw"][5]["block_num"] = serde_json::json!(1);
        let tampered: CircuitInput = serde_json::from_value(json).unwrap();
        let err = check_satisfied(&tampered, &ReceiptGuest).unwrap_err();
        assert!(matches!(err, CircuitError::Unsatisfied { .. }));
    }
}
