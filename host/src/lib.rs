//! # Shadow-Query Host
//!
//! Turns a set of on-chain queries into a committed, dry-run
//! [`CircuitInput`](shadow_query_core::CircuitInput):
//!
//! ```rust,ignore
//! use shadow_query_host::prelude::*;
//!
//! let source = Arc::new(MemorySource::load("fixtures.json")?);
//! let mut querier = Querier::new(source, QuerierConfig::default())?;
//! querier.add_storage(query, Placement::Pinned(0))?;
//! let input = querier.build_circuit_input(&guest).await?;
//! ```
//!
//! ## Modules
//!
//! - [`source`] - chain source interface, fixture source and record conversion
//! - [`query`] - query types and placement
//! - [`querier`] - fetch, assign, commit and dry run
//! - [`store`] - JSON result cache
//! - [`config`] - querier configuration
//! - [`circuits`] - built-in guest of the CLI
//! - [`io`] - file helpers and display formatting

pub mod circuits;
pub mod config;
pub mod errors;
pub mod io;
pub mod querier;
pub mod query;
pub mod source;
pub mod store;

pub use config::QuerierConfig;
pub use errors::{QuerierError, Result};
pub use querier::{FetchStats, Querier};
pub use query::{Placement, QueryFile, ReceiptQuery, StorageQuery, TransactionQuery};
pub use source::{ChainSource, Fixtures, LogFieldQuery, MemorySource, SourceError};
pub use store::ResultCache;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ChainSource, MemorySource, Placement, Querier, QuerierConfig, QuerierError,
        ReceiptQuery, StorageQuery, TransactionQuery,
    };
    pub use std::sync::Arc;
}
