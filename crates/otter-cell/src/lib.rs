//! # Otter Cell
//!
//! Reactive cells for Otter, providing:
//! - Writable source cells holding an optional value
//! - Memoized derived computations with dynamic dependency tracking
//! - An explicit subscriber graph drained in dependency order
//! - Idempotent disposal of computations
//!
//! Writing a cell recomputes every dependent computation synchronously, on
//! the writer's stack, before the write returns.
//!
//! ```
//! use otter_cell::{Cell, Computed, Runtime};
//!
//! let rt = Runtime::new();
//! let count = Cell::new(&rt, 2);
//! let doubled = {
//!     let count = count.clone();
//!     Computed::new(&rt, move || count.get().map(|n| n * 2))
//! };
//!
//! count.set(21);
//! assert_eq!(doubled.get(), Some(42));
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod cell;
pub mod computed;
pub mod config;
pub mod error;
mod graph;
pub mod runtime;
pub mod signal;
pub mod stats;

pub use cell::Cell;
pub use computed::Computed;
pub use config::{RuntimeBuilder, RuntimeConfig};
pub use error::CellError;
pub use graph::NodeId;
pub use runtime::{Runtime, WeakRuntime};
pub use signal::Signal;
pub use stats::{RuntimeStats, RuntimeStatsSnapshot};

/// Bound shared by every value stored in a cell.
pub trait CellValue: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> CellValue for T {}

/// Something that owns graph resources and can release them.
///
/// Disposal must be idempotent.
pub trait Dispose: Send + Sync {
    /// Release the resources. Calling this more than once is a no-op.
    fn dispose(&self);
}
