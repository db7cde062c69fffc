//! Cell runtime error types

use crate::graph::NodeId;
use thiserror::Error;

/// Errors reported by the reactive runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    /// The runtime that owned the cell has been dropped
    #[error("runtime dropped; value stored without propagation")]
    RuntimeDropped,

    /// The node was disposed
    #[error("node {0} is disposed")]
    Disposed(NodeId),

    /// A computation tried to evaluate itself
    #[error("dependency cycle through node {0}")]
    Cycle(NodeId),

    /// A pass recomputed more nodes than allowed and was abandoned
    #[error("propagation pass exceeded {limit} recomputations")]
    PassLimit {
        /// Configured limit
        limit: usize,
    },
}

/// Result alias for cell operations
pub type CellResult<T> = Result<T, CellError>;
