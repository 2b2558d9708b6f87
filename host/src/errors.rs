/*
Error types for the querier.
Configuration problems are raised before any query touches the chain
source; fetch errors name the query that failed.
*/

use crate::source::SourceError;
use shadow_query_core::data::Category;
use shadow_query_core::CircuitError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while assembling a circuit input
#[derive(Debug, Error)]
pub enum QuerierError {
    /// A category allocation is not a multiple of 32
    #[error("{category} allocation {allocated} is not a multiple of 32")]
    AllocationNotAligned { category: Category, allocated: usize },

    /// More queries than slots in a category
    #[error("{queries} {category} queries exceed the allocation of {allocated}")]
    AllocationExceeded {
        category: Category,
        queries: usize,
        allocated: usize,
    },

    /// A pinned query targets a slot past the allocation
    #[error("{category} query pinned to slot {index}, allocation is {allocated}")]
    PinnedIndexOutOfRange {
        category: Category,
        index: usize,
        allocated: usize,
    },

    /// Two queries pinned to the same slot
    #[error("{category} slot {index} is already pinned")]
    DuplicatePinnedIndex { category: Category, index: usize },

    /// A receipt query asks for more log fields than a receipt carries
    #[error("receipt query has {requested} log fields, at most {max} are supported")]
    TooManyLogFields { requested: usize, max: usize },

    /// Invalid configuration or query set
    #[error("configuration error: {0}")]
    Config(String),

    /// The chain source could not answer a query
    #[error("query {query} failed: {source}")]
    Fetch {
        query: String,
        #[source]
        source: SourceError,
    },

    /// A fetched value does not fit its packed width
    #[error("{field} = {value} does not fit in {bits} bits ({query})")]
    FieldOutOfRange {
        query: String,
        field: &'static str,
        value: String,
        bits: usize,
    },

    /// A query task panicked or was cancelled
    #[error("query worker failed: {0}")]
    Worker(String),

    /// The fetch phase did not finish in time
    #[error("queries did not finish within {0:?}")]
    Timeout(Duration),

    /// Commitment or dry-run failure
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    /// Result cache could not be written
    #[error("result cache error: {0}")]
    Store(String),
}

/// Result type for querier operations
pub type Result<T> = std::result::Result<T, QuerierError>;

impl QuerierError {
    /// True for errors detected before any query was sent
    pub fn is_configuration(&self) -> bool {
        match self {
            QuerierError::AllocationNotAligned { .. }
            | QuerierError::AllocationExceeded { .. }
            | QuerierError::PinnedIndexOutOfRange { .. }
            | QuerierError::DuplicatePinnedIndex { .. }
            | QuerierError::TooManyLogFields { .. }
            | QuerierError::Config(_) => true,
            QuerierError::Circuit(err) => err.is_configuration(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for QuerierError {
    fn from(err: std::io::Error) -> Self {
        QuerierError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuerierError::PinnedIndexOutOfRange {
            category: Category::Storage,
            index: 40,
            allocated: 32,
        };
        assert_eq!(
            err.to_string(),
            "storage query pinned to slot 40, allocation is 32"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_fetch_error_names_query() {
        let err = QuerierError::Fetch {
            query: "transaction 0xab".into(),
            source: SourceError::Pending("0xab".into()),
        };
        assert!(err.to_string().contains("transaction 0xab"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_circuit_configuration_passes_through() {
        let err: QuerierError = CircuitError::InvalidAllocation("empty".into()).into();
        assert!(err.is_configuration());
    }
}
