//! Querier / witness assembler
//!
//! Collects queries, resolves them against a [`ChainSource`] with bounded
//! concurrency, lays the records out in the guest's allocation and produces
//! a committed, dry-run [`CircuitInput`].
//!
//! ```text
//! add_* ──► QuerySet ──► check allocation ──► fetch (JoinSet + Semaphore)
//!                                                  │
//!                      CircuitInput ◄── dry run ◄── commit ◄── assign
//! ```

use crate::config::QuerierConfig;
use crate::errors::{QuerierError, Result};
use crate::query::{
    Fetched, Placement, Query, QueryFile, QuerySet, ReceiptQuery, Request, StorageQuery,
    TransactionQuery,
};
use crate::source::ChainSource;
use crate::store::ResultCache;
use shadow_query_core::data::{Receipt, StorageSlot, Transaction, ALLOCATION_ALIGN};
use shadow_query_core::types::ChainId;
use shadow_query_core::{complete, Allocation, AppCircuit, CircuitInput, DataInput, DummyTable};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};

/// Shared state of one fetch phase
struct FetchContext<S> {
    source: Arc<S>,
    cache: Option<Arc<ResultCache>>,
    chain_id: ChainId,
    permits: Arc<Semaphore>,
}

/// Counts reported after the fetch phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub live: usize,
    pub cached: usize,
    pub mock: usize,
}

type Slot = (usize, Fetched);

/// Queue every request of `set`. Mock and cached records are ready at once;
/// the rest become tasks.
fn schedule<S: ChainSource, Q: Query>(
    ctx: &FetchContext<S>,
    set: &QuerySet<Q>,
    tasks: &mut JoinSet<Result<Slot>>,
    ready: &mut Vec<Slot>,
    stats: &mut FetchStats,
) {
    for (index, request) in set.layout() {
        let query = match request {
            Request::Mock(record) => {
                stats.mock += 1;
                ready.push((index, Q::into_fetched(record.clone())));
                continue;
            }
            Request::Live(query) => query.clone(),
        };
        if let Some(record) = ctx.cache.as_ref().and_then(|c| c.get(ctx.chain_id, &query)) {
            debug!(query = %query.describe(), index, "cache hit");
            stats.cached += 1;
            ready.push((index, Q::into_fetched(record)));
            continue;
        }
        stats.live += 1;
        let source = Arc::clone(&ctx.source);
        let permits = Arc::clone(&ctx.permits);
        let cache = ctx.cache.clone();
        let chain_id = ctx.chain_id;
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| QuerierError::Worker(e.to_string()))?;
            let record = query.fetch(&*source).await?;
            if let Some(cache) = cache {
                cache.insert(chain_id, &query, record.clone())?;
            }
            Ok::<_, QuerierError>((index, Q::into_fetched(record)))
        });
    }
}

async fn join_all(tasks: &mut JoinSet<Result<Slot>>, out: &mut Vec<Slot>) -> Result<()> {
    while let Some(joined) = tasks.join_next().await {
        let slot = joined.map_err(|e| QuerierError::Worker(e.to_string()))??;
        out.push(slot);
    }
    Ok(())
}

fn check_set<Q: Query>(set: &QuerySet<Q>, allocation: &Allocation) -> Result<()> {
    let allocated = allocation.of(Q::CATEGORY);
    if allocated % ALLOCATION_ALIGN != 0 {
        return Err(QuerierError::AllocationNotAligned {
            category: Q::CATEGORY,
            allocated,
        });
    }
    set.check(allocated)
}

fn warn_duplicates<Q: Query>(set: &QuerySet<Q>) {
    for query in set.duplicates() {
        warn!(query = %query.describe(), "duplicate query, its record is committed more than once");
    }
}

/// Assembles circuit inputs from queries
pub struct Querier<S> {
    source: Arc<S>,
    config: QuerierConfig,
    dummies: DummyTable,
    cache: Option<Arc<ResultCache>>,
    receipts: QuerySet<ReceiptQuery>,
    storage: QuerySet<StorageQuery>,
    transactions: QuerySet<TransactionQuery>,
    last_input: Option<CircuitInput>,
}

impl<S: ChainSource> Querier<S> {
    pub fn new(source: Arc<S>, config: QuerierConfig) -> Result<Self> {
        config.validate()?;
        let cache = config
            .cache_path
            .as_ref()
            .map(|path| Arc::new(ResultCache::open(path)));
        Ok(Self {
            source,
            dummies: config.dummy_table(),
            config,
            cache,
            receipts: QuerySet::default(),
            storage: QuerySet::default(),
            transactions: QuerySet::default(),
            last_input: None,
        })
    }

    pub fn config(&self) -> &QuerierConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_deref()
    }

    pub fn add_receipt(&mut self, query: ReceiptQuery, placement: Placement) -> Result<()> {
        self.receipts.add(Request::Live(query), placement)
    }

    pub fn add_storage(&mut self, query: StorageQuery, placement: Placement) -> Result<()> {
        self.storage.add(Request::Live(query), placement)
    }

    pub fn add_transaction(&mut self, query: TransactionQuery, placement: Placement) -> Result<()> {
        self.transactions.add(Request::Live(query), placement)
    }

    /// Use `receipt` as is, without asking the source.
    pub fn add_receipt_with_data(&mut self, receipt: Receipt, placement: Placement) -> Result<()> {
        self.receipts.add(Request::Mock(receipt), placement)
    }

    pub fn add_storage_with_data(&mut self, slot: StorageSlot, placement: Placement) -> Result<()> {
        self.storage.add(Request::Mock(slot), placement)
    }

    pub fn add_transaction_with_data(
        &mut self,
        tx: Transaction,
        placement: Placement,
    ) -> Result<()> {
        self.transactions.add(Request::Mock(tx), placement)
    }

    /// Add every query of `file`; returns the allocation it declares.
    pub fn add_query_file(&mut self, file: QueryFile) -> Result<Allocation> {
        for placed in file.receipts {
            self.add_receipt(placed.query, placed.placement)?;
        }
        for placed in file.storage {
            self.add_storage(placed.query, placed.placement)?;
        }
        for placed in file.transactions {
            self.add_transaction(placed.query, placed.placement)?;
        }
        Ok(file.allocation)
    }

    pub fn num_queries(&self) -> usize {
        self.receipts.len() + self.storage.len() + self.transactions.len()
    }

    /// Input produced by the last successful build
    pub fn last_circuit_input(&self) -> Option<&CircuitInput> {
        self.last_input.as_ref()
    }

    /// Every check that can fail without touching the source.
    pub fn check_allocation(&self, allocation: &Allocation) -> Result<()> {
        check_set(&self.receipts, allocation)?;
        check_set(&self.storage, allocation)?;
        check_set(&self.transactions, allocation)?;
        allocation.validate()?;
        let mock =
            self.receipts.num_mock() + self.storage.num_mock() + self.transactions.num_mock();
        if mock > 0 && mock < self.num_queries() {
            return Err(QuerierError::Config(
                "real and mock data cannot be mixed in one circuit".into(),
            ));
        }
        Ok(())
    }

    /// Resolve every query into its slot.
    pub async fn fetch(&self, allocation: &Allocation) -> Result<(DataInput, FetchStats)> {
        let ctx = FetchContext {
            source: Arc::clone(&self.source),
            cache: self.cache.clone(),
            chain_id: self.config.chain_id,
            permits: Arc::new(Semaphore::new(self.config.max_concurrency)),
        };
        let mut tasks = JoinSet::new();
        let mut slots = Vec::with_capacity(self.num_queries());
        let mut stats = FetchStats::default();
        schedule(&ctx, &self.receipts, &mut tasks, &mut slots, &mut stats);
        schedule(&ctx, &self.storage, &mut tasks, &mut slots, &mut stats);
        schedule(&ctx, &self.transactions, &mut tasks, &mut slots, &mut stats);

        let joined = join_all(&mut tasks, &mut slots);
        match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, joined)
                .await
                .map_err(|_| QuerierError::Timeout(limit))??,
            None => joined.await?,
        }
        info!(live = stats.live, cached = stats.cached, mock = stats.mock, "queries resolved");

        let mut data = DataInput::new(allocation);
        for (index, fetched) in slots {
            match fetched {
                Fetched::Receipt(r) => data.receipts.set(index, r)?,
                Fetched::Storage(s) => data.storage_slots.set(index, s)?,
                Fetched::Transaction(t) => data.transactions.set(index, t)?,
            }
        }
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.flush() {
                warn!(path = %cache.path().display(), error = %e, "result cache not saved");
            }
        }
        Ok((data, stats))
    }

    /// Fetch, commit and dry-run `guest`.
    ///
    /// The completed input is kept for [`Querier::last_circuit_input`].
    pub async fn build_circuit_input<G: AppCircuit>(
        &mut self,
        guest: &G,
    ) -> Result<CircuitInput> {
        let allocation = guest.allocate();
        let span = info_span!(
            "build_circuit_input",
            chain_id = self.config.chain_id,
            receipts = allocation.receipts,
            storage = allocation.storage,
            transactions = allocation.transactions,
        );
        let input = self.assemble(guest, allocation).instrument(span).await?;
        self.last_input = Some(input.clone());
        Ok(input)
    }

    async fn assemble<G: AppCircuit>(
        &self,
        guest: &G,
        allocation: Allocation,
    ) -> Result<CircuitInput> {
        self.check_allocation(&allocation)?;
        let dummies = self.dummies.resolve(self.config.chain_id, &allocation)?;
        warn_duplicates(&self.receipts);
        warn_duplicates(&self.storage);
        warn_duplicates(&self.transactions);

        let (data, _) = self.fetch(&allocation).await?;
        debug!(
            receipts = data.receipts.num_active(),
            storage = data.storage_slots.num_active(),
            transactions = data.transactions.num_active(),
            "slots assigned"
        );

        let input = CircuitInput::commit(self.config.chain_id, data, allocation, dummies)?;
        info!(
            input_root = %input.input_commitments_root(),
            toggles = %input.toggles_commitment(),
            data_points = input.data_points(),
            "input committed"
        );
        let input = complete(input, guest)?;
        if let Some(commitment) = input.output_commitment() {
            info!(output = %commitment, bytes = input.output().len(), "dry run complete");
        }
        Ok(input)
    }
}
