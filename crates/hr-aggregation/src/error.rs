//! Error types for aggregate construction.

use hr_core::{HrError, PortId};
use hr_graph::GraphError;
use thiserror::Error;

/// Errors that abort building an aggregate.
///
/// A candidate that merely fails a matcher's predicate is not an error; it
/// is left out of the match list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Elements are not a straight chain ({found} edge ports)")]
    NotStrait { found: usize },

    #[error("Ambiguous topology: expected {expected} {what}, found {found}")]
    AmbiguousTopology {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Found {found} edge ports, need at least two")]
    TooFewEdgePorts { found: usize },

    #[error("Match has no elements")]
    EmptyMatch,

    #[error("Port {port} is not owned by any member of the aggregate")]
    ForeignPort { port: PortId },
}

pub type AggregationResult<T> = Result<T, AggregationError>;

impl From<AggregationError> for HrError {
    fn from(e: AggregationError) -> Self {
        match e {
            AggregationError::Graph(g) => g.into(),
            other => HrError::Invariant {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AggregationError::AmbiguousTopology {
            what: "edge elements",
            expected: 2,
            found: 3,
        };
        assert!(err.to_string().contains("expected 2 edge elements, found 3"));
    }

    #[test]
    fn error_conversion() {
        let hr: HrError = AggregationError::EmptyMatch.into();
        assert!(matches!(hr, HrError::Invariant { .. }));
    }
}
