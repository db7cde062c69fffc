//! Cells that accept only their first write

use otter_cell::{Cell, CellValue, NodeId, Runtime, Signal};

/// A cell that latches its first value; later writes are ignored.
pub struct WriteOnce<T> {
    cell: Cell<T>,
}

impl<T> Clone for WriteOnce<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: CellValue> WriteOnce<T> {
    /// Create an empty write-once cell
    pub fn new(rt: &Runtime) -> Self {
        Self {
            cell: Cell::empty(rt),
        }
    }

    /// Store `value` unless a value is already latched.
    ///
    /// Returns whether this call was the one that landed.
    pub fn set(&self, value: T) -> bool {
        self.cell.set_if_empty(value)
    }

    /// Tracked read
    pub fn get(&self) -> Option<T> {
        self.cell.get()
    }

    /// Untracked read
    pub fn peek(&self) -> Option<T> {
        self.cell.peek()
    }

    /// Whether a value has been latched (untracked)
    pub fn is_written(&self) -> bool {
        !self.cell.is_empty()
    }

    /// Read-only view
    pub fn signal(&self) -> Signal<T> {
        self.cell.signal()
    }

    /// Node id of the underlying cell
    pub fn id(&self) -> NodeId {
        self.cell.id()
    }
}

impl<T: CellValue + std::fmt::Debug> std::fmt::Debug for WriteOnce<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WriteOnce").field(&self.cell).finish()
    }
}

impl<T> From<&WriteOnce<T>> for Signal<T> {
    fn from(cell: &WriteOnce<T>) -> Self {
        Signal::from(&cell.cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otter_cell::Computed;

    #[test]
    fn test_only_first_write_lands() {
        let rt = Runtime::new();
        let cell = WriteOnce::new(&rt);
        assert!(!cell.is_written());

        assert!(cell.set("first"));
        assert!(!cell.set("second"));
        assert_eq!(cell.get(), Some("first"));
        assert!(cell.is_written());
    }

    #[test]
    fn test_ignored_write_does_not_propagate() {
        let rt = Runtime::new();
        let cell = WriteOnce::new(&rt);
        let mirror = {
            let cell = cell.clone();
            Computed::new(&rt, move || cell.get())
        };

        cell.set(1);
        let before = rt.stats();
        cell.set(2);
        assert_eq!(rt.stats().recomputations_since(&before), 0);
        assert_eq!(mirror.peek(), Some(1));
    }
}
