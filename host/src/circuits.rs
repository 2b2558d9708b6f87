//! Built-in guest used by the CLI

use shadow_query_core::prelude::*;
use shadow_query_core::values::CircuitValue;

/// Reports how many slots of each category are active and the latest block
/// any active record comes from.
///
/// Output: three `uint32` counts (receipts, storage, transactions) followed
/// by the latest block number as `uint32`.
#[derive(Debug, Clone, Copy)]
pub struct SlotSummary {
    pub allocation: Allocation,
}

impl SlotSummary {
    pub fn new(allocation: Allocation) -> Self {
        Self { allocation }
    }
}

fn latest<B: CircuitBuilder, T: CircuitValue>(
    api: &mut CircuitApi<B>,
    stream: &DataStream<T>,
    block_num: impl Fn(&T) -> Uint32,
) -> Uint248 {
    stream
        .map(api, |api, item| api.uint248().from_variable(block_num(item).variable()))
        .max(api)
}

impl AppCircuit for SlotSummary {
    fn allocate(&self) -> Allocation {
        self.allocation
    }

    fn define<B: CircuitBuilder>(
        &self,
        api: &mut CircuitApi<B>,
        data: &DataInputVars,
    ) -> Result<()> {
        let receipts = DataStream::from_points(&data.receipts);
        let slots = DataStream::from_points(&data.storage_slots);
        let txs = DataStream::from_points(&data.transactions);

        let counts = [receipts.count(api), slots.count(api), txs.count(api)];
        for count in counts {
            api.output_uint(32, count)?;
        }

        let mut newest = latest(api, &receipts, |r| r.block_num);
        for candidate in [
            latest(api, &slots, |s| s.block_num),
            latest(api, &txs, |t| t.block_num),
        ] {
            let newer = api.uint248().is_greater_than(candidate, newest);
            newest = api.select(newer, &candidate, &newest);
        }
        api.output_uint(32, newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_query_core::data::DataInput;

    #[test]
    fn test_summary_output() {
        let allocation = Allocation::new(32, 32, 0);
        let mut data = DataInput::new(&allocation);
        data.receipts
            .set(3, Receipt { block_num: 90, ..Default::default() })
            .unwrap();
        data.storage_slots
            .set(0, StorageSlot { block_num: 120, ..Default::default() })
            .unwrap();
        data.storage_slots
            .set(1, StorageSlot { block_num: 100, ..Default::default() })
            .unwrap();
        let dummies = DummyTable::builtin().resolve(1, &allocation).unwrap();
        let input = CircuitInput::commit(1, data, allocation, dummies).unwrap();

        let guest = SlotSummary::new(allocation);
        let (_, output) = dry_run(&input, &guest).unwrap();
        let words: Vec<u32> = output
            .chunks(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(words, vec![1, 2, 0, 120]);
    }
}
