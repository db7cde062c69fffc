//! Promise error types

use thiserror::Error;

/// Why a promise node has no fulfilment value to hand out
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromiseError<E> {
    /// Not settled yet
    #[error("promise is still pending")]
    Pending,

    /// Settled on the reject path
    #[error("promise was rejected")]
    Rejected(E),

    /// Disposed before it settled
    #[error("promise was disposed before it settled")]
    Disposed,
}

impl<E> PromiseError<E> {
    /// Rejection reason, if this error carries one
    pub fn reason(&self) -> Option<&E> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    /// Consume the error and return the rejection reason, if any
    pub fn into_reason(self) -> Option<E> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}
