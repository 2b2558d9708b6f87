//! Result cache
//!
//! Resolved records are kept in one JSON file keyed by
//! `keccak256(chain_id || bincode(query))`. The cache never fails a build:
//! an unreadable file or a mismatched entry is logged and treated as a miss.

use crate::errors::{QuerierError, Result};
use crate::query::{Fetched, Query};
use parking_lot::Mutex;
use shadow_query_core::hashing::hash_concat;
use shadow_query_core::types::{ChainId, Hash};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Cache key of a query on a chain.
pub fn cache_key<Q: Query>(chain_id: ChainId, query: &Q) -> Result<Hash> {
    let encoded = bincode::serialize(query).map_err(|e| QuerierError::Store(e.to_string()))?;
    Ok(hash_concat(&[&chain_id.to_be_bytes(), &encoded]))
}

impl Fetched {
    /// Included in a block, so the value can no longer change.
    ///
    /// Pending records are already rejected by the source conversion; a zero
    /// block number marks a mock or default record, so genesis-block facts
    /// are never cached and are always fetched live.
    fn is_finalized(&self) -> bool {
        let block = match self {
            Fetched::Receipt(r) => r.block_num,
            Fetched::Storage(s) => s.block_num,
            Fetched::Transaction(t) => t.block_num,
        };
        block > 0
    }
}

/// JSON file of resolved records
#[derive(Debug)]
pub struct ResultCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Fetched>>,
}

impl ResultCache {
    /// Open the cache at `path`; a missing or corrupt file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring corrupt result cache");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "result cache unreadable");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "opened result cache");
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn get<Q: Query>(&self, chain_id: ChainId, query: &Q) -> Option<Q::Output> {
        let key = cache_key(chain_id, query).ok()?.to_string();
        let fetched = self.entries.lock().get(&key).cloned()?;
        let category = fetched.category();
        let record = Q::from_fetched(fetched);
        if record.is_none() {
            warn!(%key, %category, expected = %Q::CATEGORY, "cache entry of wrong category");
        }
        record
    }

    /// Remember a finalized record; anything else is skipped.
    pub fn insert<Q: Query>(
        &self,
        chain_id: ChainId,
        query: &Q,
        record: Q::Output,
    ) -> Result<bool> {
        let fetched = Q::into_fetched(record);
        if !fetched.is_finalized() {
            return Ok(false);
        }
        let key = cache_key(chain_id, query)?.to_string();
        self.entries.lock().insert(key, fetched);
        Ok(true)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Entries per category
    pub fn stats(&self) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for fetched in self.entries.lock().values() {
            *out.entry(fetched.category().to_string()).or_default() += 1;
        }
        out
    }

    /// Write the cache through a temp file in the same directory.
    pub fn flush(&self) -> Result<()> {
        let json = {
            let entries = self.entries.lock();
            serde_json::to_vec_pretty(&*entries).map_err(|e| QuerierError::Store(e.to_string()))?
        };
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.persist(&self.path)
            .map_err(|e| QuerierError::Store(e.to_string()))?;
        debug!(path = %self.path.display(), "flushed result cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{StorageQuery, TransactionQuery};
    use shadow_query_core::data::{StorageSlot, Transaction};
    use shadow_query_core::types::{Address, B256};
    use tempfile::tempdir;

    fn query() -> StorageQuery {
        StorageQuery {
            block_num: 100,
            address: Address::repeat_byte(3),
            slot: B256::with_last_byte(1),
        }
    }

    fn slot() -> StorageSlot {
        StorageSlot {
            block_num: 100,
            contract: Address::repeat_byte(3),
            key: B256::with_last_byte(1),
            value: B256::with_last_byte(42),
        }
    }

    #[test]
    fn test_key_depends_on_chain() {
        assert_ne!(cache_key(1, &query()).unwrap(), cache_key(5, &query()).unwrap());
        assert_eq!(cache_key(1, &query()).unwrap(), cache_key(1, &query()).unwrap());
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = ResultCache::open(&path);
        assert!(cache.is_empty());
        assert!(cache.insert(1, &query(), slot()).unwrap());
        cache.flush().unwrap();

        let reopened = ResultCache::open(&path);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(1, &query()), Some(slot()));
        assert_eq!(reopened.get(5, &query()), None);
        assert_eq!(reopened.stats().get("storage"), Some(&1));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cache = ResultCache::open(&path);
        assert!(cache.is_empty());
        cache.insert(1, &query(), slot()).unwrap();
        cache.flush().unwrap();
        assert_eq!(ResultCache::open(&path).len(), 1);
    }

    #[test]
    fn test_unfinalized_not_stored() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::open(dir.path().join("cache.json"));
        let query = TransactionQuery {
            tx_hash: B256::ZERO,
        };
        assert!(!cache.insert(1, &query, Transaction::default()).unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::open(dir.path().join("cache.json"));
        cache.insert(1, &query(), slot()).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
