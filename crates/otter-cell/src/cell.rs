//! Writable source cells

use tracing::{debug, warn};

use crate::CellValue;
use crate::error::{CellError, CellResult};
use crate::graph::NodeId;
use crate::runtime::Runtime;
use crate::signal::Signal;

/// A writable reactive cell holding an optional value.
///
/// Every write recomputes the dependent computations before returning.
/// Cloning yields another handle to the same cell.
pub struct Cell<T> {
    signal: Signal<T>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: CellValue> Cell<T> {
    /// Create a cell holding `value`
    pub fn new(rt: &Runtime, value: T) -> Self {
        Self::with_value(rt, Some(value))
    }

    /// Create a cell holding the empty sentinel
    pub fn empty(rt: &Runtime) -> Self {
        Self::with_value(rt, None)
    }

    fn with_value(rt: &Runtime, value: Option<T>) -> Self {
        let id = rt.register_source();
        Self {
            signal: Signal::new(id, value, rt.downgrade()),
        }
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.signal.id()
    }

    /// Tracked read
    pub fn get(&self) -> Option<T> {
        self.signal.get()
    }

    /// Untracked read
    pub fn peek(&self) -> Option<T> {
        self.signal.peek()
    }

    /// Whether the cell holds the empty sentinel (untracked)
    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// Read-only view of this cell
    pub fn signal(&self) -> Signal<T> {
        self.signal.clone()
    }

    /// Store `value` and propagate
    pub fn set(&self, value: T) {
        if let Err(err) = self.write(Some(value)) {
            debug!(node = %self.id(), %err, "cell write did not complete");
        }
    }

    /// Store `value` and propagate, reporting propagation failures
    pub fn try_set(&self, value: T) -> CellResult<()> {
        self.write(Some(value))
    }

    /// Reset the cell to the empty sentinel and propagate
    pub fn clear(&self) {
        if let Err(err) = self.write(None) {
            debug!(node = %self.id(), %err, "cell clear did not complete");
        }
    }

    /// Store `value` only if the cell is empty. Returns whether it was stored.
    pub fn set_if_empty(&self, value: T) -> bool {
        let rt = self.signal.slot.rt.upgrade();
        let _turn = rt.as_ref().map(Runtime::turn);
        {
            let mut slot = self.signal.slot.value.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        if let Err(err) = self.propagate(rt.as_ref()) {
            debug!(node = %self.id(), %err, "cell write did not complete");
        }
        true
    }

    /// Modify the held value in place and propagate.
    ///
    /// Returns `false` without notifying anyone if the cell is empty.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let rt = self.signal.slot.rt.upgrade();
        let _turn = rt.as_ref().map(Runtime::turn);
        {
            let mut slot = self.signal.slot.value.lock();
            match slot.as_mut() {
                Some(value) => f(value),
                None => return false,
            }
        }
        if let Err(err) = self.propagate(rt.as_ref()) {
            debug!(node = %self.id(), %err, "cell update did not complete");
        }
        true
    }

    fn write(&self, value: Option<T>) -> CellResult<()> {
        let rt = self.signal.slot.rt.upgrade();
        let _turn = rt.as_ref().map(Runtime::turn);
        let _previous = std::mem::replace(&mut *self.signal.slot.value.lock(), value);
        self.propagate(rt.as_ref())
    }

    fn propagate(&self, rt: Option<&Runtime>) -> CellResult<()> {
        match rt {
            Some(rt) => {
                rt.record_write();
                rt.notify(self.id()).map(|_| ())
            }
            None => {
                warn!(node = %self.id(), "cell written after its runtime was dropped");
                Err(CellError::RuntimeDropped)
            }
        }
    }
}

impl<T: CellValue + std::fmt::Debug> std::fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Cell").field(&self.signal).finish()
    }
}

impl<T> From<Cell<T>> for Signal<T> {
    fn from(cell: Cell<T>) -> Self {
        cell.signal
    }
}

impl<T> From<&Cell<T>> for Signal<T> {
    fn from(cell: &Cell<T>) -> Self {
        cell.signal.clone()
    }
}
