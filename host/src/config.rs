//! Querier configuration
//!
//! Loaded from JSON; every field has a default so an empty object is a
//! valid configuration.

use crate::errors::{QuerierError, Result};
use serde::{Deserialize, Serialize};
use shadow_query_core::types::ChainId;
use shadow_query_core::DummyTable;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of queries in flight
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerierConfig {
    /// Chain the queried data lives on
    pub chain_id: ChainId,
    pub max_concurrency: usize,
    /// Bound on the whole fetch phase
    pub timeout_secs: Option<u64>,
    /// Result cache file, none to always query the source
    pub cache_path: Option<PathBuf>,
    /// Dummy commitments added to or replacing the built-in table
    pub dummy_overrides: DummyTable,
}

impl Default for QuerierConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_secs: None,
            cache_path: None,
            dummy_overrides: DummyTable::default(),
        }
    }
}

impl QuerierConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| QuerierError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| QuerierError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(QuerierError::Config("max_concurrency must be positive".into()));
        }
        if self.timeout_secs == Some(0) {
            return Err(QuerierError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Built-in dummy table with the overrides applied
    pub fn dummy_table(&self) -> DummyTable {
        let mut table = DummyTable::builtin();
        table.merge(&self.dummy_overrides);
        table
    }
}
