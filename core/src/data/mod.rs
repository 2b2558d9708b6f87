//! Data model
//!
//! A guest declares how many slots of each [`Category`] it needs
//! ([`Allocation`]). The input is three fixed-size toggled arrays
//! ([`DataPoints`]); a slot whose toggle is off holds a dummy record and is
//! committed to with the category's dummy constant.
//!
//! - [`records`] - native records and their canonical packing
//! - [`vars`] - in-circuit twins of the records
//! - [`pack`] - bit packers shared by both forms

pub mod pack;
pub mod records;
pub mod vars;

pub use records::{
    Category, EventId, FieldIndex, LogField, Receipt, Record, StorageSlot, Transaction,
};
pub use vars::{
    Assign, LogFieldVar, ReceiptVar, RecordVar, StorageSlotVar, TransactionVar,
};

use crate::builder::{CircuitBuilder, Variable};
use crate::errors::{CircuitError, Result};
use crate::field::Fr;
use serde::{Deserialize, Serialize};

/// Log fields carried by one receipt
pub const NUM_MAX_LOG_FIELDS: usize = 3;

/// Upper bound on the total number of slots of a circuit
pub const NUM_MAX_DATA_POINTS: usize = 512;

/// Every per-category allocation is a multiple of this
pub const ALLOCATION_ALIGN: usize = 32;

/// Slots a guest reserves per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub receipts: usize,
    pub storage: usize,
    pub transactions: usize,
}

impl Allocation {
    pub fn new(receipts: usize, storage: usize, transactions: usize) -> Self {
        Self {
            receipts,
            storage,
            transactions,
        }
    }

    pub fn of(&self, category: Category) -> usize {
        match category {
            Category::Receipt => self.receipts,
            Category::Storage => self.storage,
            Category::Transaction => self.transactions,
        }
    }

    pub fn total(&self) -> usize {
        self.receipts + self.storage + self.transactions
    }

    /// Leaves of the input commitment tree
    pub fn data_points(&self) -> usize {
        self.total().next_power_of_two()
    }

    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            let n = self.of(category);
            if n % ALLOCATION_ALIGN != 0 {
                return Err(CircuitError::InvalidAllocation(format!(
                    "{category} allocation {n} is not a multiple of {ALLOCATION_ALIGN}"
                )));
            }
        }
        if self.total() == 0 {
            return Err(CircuitError::InvalidAllocation(
                "at least one category must be allocated".into(),
            ));
        }
        if self.total() > NUM_MAX_DATA_POINTS {
            return Err(CircuitError::InvalidAllocation(format!(
                "{} slots exceed the maximum of {NUM_MAX_DATA_POINTS}",
                self.total()
            )));
        }
        Ok(())
    }
}

/// Fixed-size array of records with a validity toggle per slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Record")]
pub struct DataPoints<T> {
    raw: Vec<T>,
    toggles: Vec<bool>,
}

impl<T: Record> DataPoints<T> {
    /// `len` dummy slots, all toggled off.
    pub fn with_len(len: usize) -> Self {
        Self {
            raw: vec![T::default(); len],
            toggles: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &[T] {
        &self.raw
    }

    pub fn toggles(&self) -> &[bool] {
        &self.toggles
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.toggles
            .get(index)
            .copied()
            .filter(|on| *on)
            .map(|_| &self.raw[index])
    }

    /// Store `record` at `index` and toggle the slot on.
    pub fn set(&mut self, index: usize, record: T) -> Result<()> {
        if index >= self.raw.len() {
            return Err(CircuitError::InputShape(format!(
                "{} slot {index} outside an allocation of {}",
                T::CATEGORY,
                self.raw.len()
            )));
        }
        self.raw[index] = record;
        self.toggles[index] = true;
        Ok(())
    }

    pub fn first_free(&self) -> Option<usize> {
        self.toggles.iter().position(|on| !on)
    }

    pub fn active(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.raw
            .iter()
            .enumerate()
            .filter(|(i, _)| self.toggles[*i])
    }

    pub fn num_active(&self) -> usize {
        self.toggles.iter().filter(|on| **on).count()
    }

    fn check_len(&self, expected: usize) -> Result<()> {
        if self.raw.len() != self.toggles.len() || self.raw.len() != expected {
            return Err(CircuitError::InputShape(format!(
                "{} input has {} records and {} toggles, allocation is {expected}",
                T::CATEGORY,
                self.raw.len(),
                self.toggles.len()
            )));
        }
        Ok(())
    }
}

impl<T: Assign> DataPoints<T> {
    pub fn assign<B: CircuitBuilder>(&self, b: &mut B) -> DataPointVars<T::Var> {
        DataPointVars {
            raw: self.raw.iter().map(|record| record.assign(b)).collect(),
            toggles: self
                .toggles
                .iter()
                .map(|on| b.secret_input(Fr::from(*on)))
                .collect(),
        }
    }
}

/// In-circuit toggled array
#[derive(Debug, Clone)]
pub struct DataPointVars<V> {
    pub raw: Vec<V>,
    pub toggles: Vec<Variable>,
}

impl<V> DataPointVars<V> {
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Native data handed to a guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInput {
    pub receipts: DataPoints<Receipt>,
    pub storage_slots: DataPoints<StorageSlot>,
    pub transactions: DataPoints<Transaction>,
}

impl DataInput {
    /// All-dummy input sized for `allocation`.
    pub fn new(allocation: &Allocation) -> Self {
        Self {
            receipts: DataPoints::with_len(allocation.receipts),
            storage_slots: DataPoints::with_len(allocation.storage),
            transactions: DataPoints::with_len(allocation.transactions),
        }
    }

    pub fn allocation(&self) -> Allocation {
        Allocation::new(
            self.receipts.len(),
            self.storage_slots.len(),
            self.transactions.len(),
        )
    }

    /// Array lengths must equal the allocation exactly.
    pub fn check_shape(&self, allocation: &Allocation) -> Result<()> {
        self.receipts.check_len(allocation.receipts)?;
        self.storage_slots.check_len(allocation.storage)?;
        self.transactions.check_len(allocation.transactions)
    }

    /// Toggles of all slots in commitment order: receipts, storage, transactions.
    pub fn toggles(&self) -> Vec<bool> {
        let mut out = self.receipts.toggles().to_vec();
        out.extend_from_slice(self.storage_slots.toggles());
        out.extend_from_slice(self.transactions.toggles());
        out
    }

    pub fn assign<B: CircuitBuilder>(&self, b: &mut B) -> DataInputVars {
        DataInputVars {
            receipts: self.receipts.assign(b),
            storage_slots: self.storage_slots.assign(b),
            transactions: self.transactions.assign(b),
        }
    }
}

/// In-circuit data handed to a guest
#[derive(Debug, Clone)]
pub struct DataInputVars {
    pub receipts: DataPointVars<ReceiptVar>,
    pub storage_slots: DataPointVars<StorageSlotVar>,
    pub transactions: DataPointVars<TransactionVar>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    #[test]
    fn test_allocation_rules() {
        assert!(Allocation::new(32, 0, 0).validate().is_ok());
        assert!(Allocation::new(32, 64, 32).validate().is_ok());
        assert!(Allocation::new(0, 0, 0).validate().is_err());
        assert!(Allocation::new(33, 0, 0).validate().is_err());
        assert!(Allocation::new(256, 256, 32).validate().is_err());
        assert!(Allocation::new(256, 256, 0).validate().is_ok());
    }

    #[test]
    fn test_data_points_count() {
        assert_eq!(Allocation::new(32, 0, 0).data_points(), 32);
        assert_eq!(Allocation::new(32, 32, 32).data_points(), 128);
        assert_eq!(Allocation::new(64, 64, 0).data_points(), 128);
    }

    #[test]
    fn test_slot_placement() {
        let mut points = DataPoints::<StorageSlot>::with_len(4);
        assert_eq!(points.first_free(), Some(0));
        points.set(0, StorageSlot::default()).unwrap();
        points.set(2, StorageSlot::default()).unwrap();
        assert_eq!(points.first_free(), Some(1));
        assert_eq!(points.num_active(), 2);
        assert!(points.get(1).is_none());
        assert!(points.get(2).is_some());
        assert!(points.set(4, StorageSlot::default()).is_err());
        let indices: Vec<usize> = points.active().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_shape_check() {
        let allocation = Allocation::new(32, 0, 32);
        let input = DataInput::new(&allocation);
        assert!(input.check_shape(&allocation).is_ok());
        assert_eq!(input.allocation(), allocation);
        let err = input.check_shape(&Allocation::new(64, 0, 32)).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(input.toggles().len(), 64);
    }

    #[test]
    fn test_assign_toggles() {
        let mut input = DataInput::new(&Allocation::new(0, 32, 0));
        input.storage_slots.set(3, StorageSlot::default()).unwrap();
        let mut s = Solver::new();
        let vars = input.assign(&mut s);
        assert_eq!(vars.storage_slots.len(), 32);
        assert_eq!(s.value(vars.storage_slots.toggles[3]), Some(Fr::ONE));
        assert_eq!(s.value(vars.storage_slots.toggles[4]), Some(Fr::ZERO));
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut input = DataInput::new(&Allocation::new(32, 0, 0));
        input.receipts.set(5, Receipt::default()).unwrap();
        let json = serde_json::to_string(&input).unwrap();
        let back: DataInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, input);
    }
}
