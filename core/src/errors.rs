/*
Error types for circuit construction and evaluation.
Configuration problems are reported before any constraint is emitted;
unsatisfied constraints are reported after a full evaluation.
*/

use thiserror::Error;

/// Kind of constraint that failed during an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Equal,
    Boolean,
    Range,
    Binary,
}

impl core::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ConstraintKind::Equal => "equality",
            ConstraintKind::Boolean => "boolean",
            ConstraintKind::Range => "range",
            ConstraintKind::Binary => "binary decomposition",
        };
        f.write_str(name)
    }
}

/// Errors raised while defining, solving or committing a circuit
#[derive(Debug, Error)]
pub enum CircuitError {
    /// Guest allocation violates the batching or size rules
    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),

    /// No dummy commitment known for a chain/category pair
    #[error("no dummy commitment for {category} on chain {chain_id}")]
    MissingDummyCommitment {
        chain_id: u64,
        category: &'static str,
    },

    /// Input arrays disagree with the guest allocation
    #[error("input shape mismatch: {0}")]
    InputShape(String),

    /// A value does not fit the width of its target type
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    /// At least one constraint did not hold
    #[error("circuit unsatisfied: {kind} constraint #{constraint} failed ({failures} total)")]
    Unsatisfied {
        constraint: usize,
        kind: ConstraintKind,
        failures: usize,
    },

    /// The dry run never reached the output commitment stage
    #[error("dry run produced no output commitment: {0}")]
    NoOutputCommitment(Box<CircuitError>),

    /// Guest wrote more output than it declared
    #[error("output of {attempted} bytes exceeds the declared maximum of {max} bytes")]
    OutputOverflow { attempted: usize, max: usize },

    /// Guest circuit reported an error while being defined
    #[error("error building guest circuit: {0}")]
    Guest(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for circuit operations
pub type Result<T> = core::result::Result<T, CircuitError>;

impl From<bincode::Error> for CircuitError {
    fn from(err: bincode::Error) -> Self {
        CircuitError::Serialization(err.to_string())
    }
}

impl CircuitError {
    /// True for errors detected before any circuit work started
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CircuitError::InvalidAllocation(_)
                | CircuitError::MissingDummyCommitment { .. }
                | CircuitError::InputShape(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CircuitError::MissingDummyCommitment {
            chain_id: 5,
            category: "receipt",
        };
        assert!(err.to_string().contains("no dummy commitment for receipt on chain 5"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unsatisfied_display() {
        let err = CircuitError::Unsatisfied {
            constraint: 7,
            kind: ConstraintKind::Range,
            failures: 2,
        };
        assert!(err.to_string().contains("range constraint #7"));
        assert!(!err.is_configuration());
    }
}
