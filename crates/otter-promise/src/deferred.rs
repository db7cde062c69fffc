//! Callback-based promise settled from outside the reactive graph

use parking_lot::Mutex;
use std::sync::Arc;

use otter_cell::CellValue;
use tracing::debug;

use crate::queue::JobQueue;
use crate::state::{Settlement, State};
use crate::thenable::{OnFulfilled, OnRejected, Thenable};

struct Shared<T, E> {
    settlement: Settlement<T, E>,
    on_fulfilled: Vec<OnFulfilled<T>>,
    on_rejected: Vec<OnRejected<E>>,
}

/// A promise settled by calling [`Deferred::resolve`] or [`Deferred::reject`].
///
/// Callbacks run synchronously on the settling (or subscribing) thread, or,
/// for a deferred built with [`Deferred::with_queue`], when the queue is
/// drained.
pub struct Deferred<T, E> {
    shared: Arc<Mutex<Shared<T, E>>>,
    queue: Option<Arc<JobQueue>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            queue: self.queue.clone(),
        }
    }
}

impl<T: CellValue, E: CellValue> Deferred<T, E> {
    /// Create a pending deferred that delivers callbacks synchronously
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a pending deferred that delivers callbacks through `queue`
    pub fn with_queue(queue: Arc<JobQueue>) -> Self {
        Self::build(Some(queue))
    }

    fn build(queue: Option<Arc<JobQueue>>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                settlement: Settlement::Pending,
                on_fulfilled: Vec::new(),
                on_rejected: Vec::new(),
            })),
            queue,
        }
    }

    /// Fulfil with `value`. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        let callbacks = {
            let mut shared = self.shared.lock();
            if !shared.settlement.settle(Settlement::Fulfilled(value.clone())) {
                return false;
            }
            shared.on_rejected.clear();
            std::mem::take(&mut shared.on_fulfilled)
        };
        debug!(callbacks = callbacks.len(), "deferred fulfilled");
        for callback in callbacks {
            self.deliver(callback, value.clone());
        }
        true
    }

    /// Reject with `reason`. Returns `false` if already settled.
    pub fn reject(&self, reason: E) -> bool {
        let callbacks = {
            let mut shared = self.shared.lock();
            if !shared.settlement.settle(Settlement::Rejected(reason.clone())) {
                return false;
            }
            shared.on_fulfilled.clear();
            std::mem::take(&mut shared.on_rejected)
        };
        debug!(callbacks = callbacks.len(), "deferred rejected");
        for callback in callbacks {
            self.deliver(callback, reason.clone());
        }
        true
    }

    /// Current state
    pub fn state(&self) -> State {
        self.shared.lock().settlement.state()
    }

    /// Snapshot of the settlement
    pub fn settlement(&self) -> Settlement<T, E> {
        self.shared.lock().settlement.clone()
    }

    fn deliver<A: Send + 'static>(&self, callback: Box<dyn FnOnce(A) + Send>, arg: A) {
        match &self.queue {
            Some(queue) => queue.enqueue(move || callback(arg)),
            None => callback(arg),
        }
    }
}

impl<T: CellValue, E: CellValue> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CellValue, E: CellValue> Thenable<T, E> for Deferred<T, E> {
    fn subscribe(&self, on_fulfilled: OnFulfilled<T>, on_rejected: OnRejected<E>) {
        let settled = {
            let mut shared = self.shared.lock();
            if !shared.settlement.is_settled() {
                shared.on_fulfilled.push(on_fulfilled);
                shared.on_rejected.push(on_rejected);
                return;
            }
            shared.settlement.clone()
        };
        match settled {
            Settlement::Fulfilled(value) => self.deliver(on_fulfilled, value),
            Settlement::Rejected(reason) => self.deliver(on_rejected, reason),
            Settlement::Pending => {}
        }
    }
}

impl<T, E> std::fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.shared.lock().settlement.state())
            .field("queued", &self.queue.is_some())
            .finish()
    }
}
