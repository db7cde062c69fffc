//! Settlement state and the derived state computation
//!
//! A node's state is a function of its value and reject cells, but latched:
//! once it leaves `Pending` it never goes back, whatever happens to the cells
//! afterwards.

use std::sync::Arc;

use otter_cell::{CellValue, Computed, Runtime, Signal};
use parking_lot::Mutex;
use tracing::debug;

/// Settlement state of a promise node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Neither cell holds a value yet
    Pending,
    /// Settled through the value cell
    Fulfilled,
    /// Settled through the reject cell
    Rejected,
}

impl State {
    /// Lowercase name, as used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Fulfilled => "fulfilled",
            State::Rejected => "rejected",
        }
    }

    /// Whether this is a terminal state
    pub fn is_settled(self) -> bool {
        self != State::Pending
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latched settlement, carrying the value or reason that settled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T, E> {
    /// Not settled
    Pending,
    /// Fulfilled with a value
    Fulfilled(T),
    /// Rejected with a reason
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    /// State without payload
    pub fn state(&self) -> State {
        match self {
            Settlement::Pending => State::Pending,
            Settlement::Fulfilled(_) => State::Fulfilled,
            Settlement::Rejected(_) => State::Rejected,
        }
    }

    /// Whether the latch has left `Pending`
    pub fn is_settled(&self) -> bool {
        !matches!(self, Settlement::Pending)
    }

    /// Apply a transition.
    ///
    /// Only `Pending -> Fulfilled` and `Pending -> Rejected` are accepted;
    /// everything else leaves the latch untouched and returns `false`.
    pub fn settle(&mut self, next: Settlement<T, E>) -> bool {
        if self.is_settled() || !next.is_settled() {
            return false;
        }
        *self = next;
        true
    }

    /// Fulfilment value, if fulfilled
    pub fn value(&self) -> Option<&T> {
        match self {
            Settlement::Fulfilled(value) => Some(value),
            _ => None,
        }
    }

    /// Rejection reason, if rejected
    pub fn reason(&self) -> Option<&E> {
        match self {
            Settlement::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

impl<T, E> Default for Settlement<T, E> {
    fn default() -> Self {
        Settlement::Pending
    }
}

/// What a settled node delivered, handed to `always` and `on_settled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The value path fired
    Fulfilled(T),
    /// The reject path fired
    Rejected(E),
}

impl<T, E> Outcome<T, E> {
    /// Matching state
    pub fn state(&self) -> State {
        match self {
            Outcome::Fulfilled(_) => State::Fulfilled,
            Outcome::Rejected(_) => State::Rejected,
        }
    }

    /// Convert into a `Result`
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Fulfilled(value) => Ok(value),
            Outcome::Rejected(reason) => Err(reason),
        }
    }
}

pub(crate) type Latch<T, E> = Arc<Mutex<Settlement<T, E>>>;

/// Build the state computation for a value/reject pair.
///
/// With `start_fulfilled` the latch begins fulfilled with whatever the value
/// cell holds right now.
pub(crate) fn derive_state<T: CellValue, E: CellValue>(
    rt: &Runtime,
    value: Signal<T>,
    reject: Signal<E>,
    start_fulfilled: bool,
) -> (Computed<State>, Latch<T, E>) {
    let latch: Latch<T, E> = Arc::new(Mutex::new(Settlement::Pending));
    if start_fulfilled {
        if let Some(initial) = value.peek() {
            latch.lock().settle(Settlement::Fulfilled(initial));
        }
    }

    let state = {
        let latch = Arc::clone(&latch);
        let value_id = value.id();
        Computed::new(rt, move || {
            let current = latch.lock().state();
            if current.is_settled() {
                return Some(current);
            }
            let next = if let Some(v) = value.get() {
                Settlement::Fulfilled(v)
            } else if let Some(e) = reject.get() {
                Settlement::Rejected(e)
            } else {
                return Some(State::Pending);
            };
            let state = next.state();
            if latch.lock().settle(next) {
                debug!(value = %value_id, state = %state, "promise settled");
            }
            Some(state)
        })
    };
    (state, latch)
}
