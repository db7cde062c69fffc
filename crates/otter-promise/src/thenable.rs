//! Contract for promises implemented outside the reactive graph

/// Fulfilment callback handed to [`Thenable::subscribe`]
pub type OnFulfilled<T> = Box<dyn FnOnce(T) + Send>;

/// Rejection callback handed to [`Thenable::subscribe`]
pub type OnRejected<E> = Box<dyn FnOnce(E) + Send>;

/// A promise that can report its settlement through callbacks.
///
/// Implementations call at most one of the two callbacks, at most once,
/// either synchronously from `subscribe` or later.
pub trait Thenable<T, E>: Send + Sync {
    /// Register settlement callbacks
    fn subscribe(&self, on_fulfilled: OnFulfilled<T>, on_rejected: OnRejected<E>);
}
