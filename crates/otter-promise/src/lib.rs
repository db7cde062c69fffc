//! # Otter Promise
//!
//! Promises that are also reactive cells. A [`PromiseNode`] is a value cell,
//! a reject cell and a latched state derived from the two, living in an
//! [`otter_cell`] graph:
//! - `then`/`done`/`catch`/`always` build new nodes out of resolver
//!   computations instead of callback queues
//! - [`all`]/[`when`] and [`race`] aggregate nodes, cells, plain values and
//!   foreign promises
//! - [`Deferred`] is a callback-style promise that can feed the graph,
//!   optionally through a [`JobQueue`]
//!
//! Settlement is monotonic: once a node leaves [`State::Pending`] it never
//! changes again, and every chained callback runs at most once.
//!
//! ```
//! use otter_cell::{Cell, Runtime};
//! use otter_promise::{State, to_promise};
//!
//! let rt = Runtime::new();
//! let cell = Cell::empty(&rt);
//! let node = to_promise::<_, String>(&rt, &cell).done(|n: u32| Some(n * 2));
//!
//! cell.set(21);
//! assert_eq!(node.state(), State::Fulfilled);
//! assert_eq!(node.peek(), Some(42));
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod combinators;
pub mod deferred;
pub mod error;
pub mod input;
pub mod node;
pub mod queue;
mod resolver;
pub mod state;
pub mod thenable;
pub mod write_once;

pub use combinators::{all, race, when};
pub use deferred::Deferred;
pub use error::PromiseError;
pub use input::{Input, rejected, resolved, to_promise};
pub use node::PromiseNode;
pub use queue::{Job, JobQueue};
pub use state::{Outcome, Settlement, State};
pub use thenable::{OnFulfilled, OnRejected, Thenable};
pub use write_once::WriteOnce;

/// Variadic [`all`]: `all!(&rt, a, b, Input::value(3))`.
///
/// Each argument goes through `Input::from`.
#[macro_export]
macro_rules! all {
    ($rt:expr $(, $input:expr)* $(,)?) => {
        $crate::all($rt, [$($crate::Input::from($input)),*])
    };
}

/// Variadic [`when`]
#[macro_export]
macro_rules! when {
    ($rt:expr $(, $input:expr)* $(,)?) => {
        $crate::when($rt, [$($crate::Input::from($input)),*])
    };
}

/// Variadic [`race`]
#[macro_export]
macro_rules! race {
    ($rt:expr $(, $input:expr)* $(,)?) => {
        $crate::race($rt, [$($crate::Input::from($input)),*])
    };
}
