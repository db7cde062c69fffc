//! Read-only view over a graph node's value

use std::sync::Arc;

use parking_lot::Mutex;

use crate::CellValue;
use crate::graph::NodeId;
use crate::runtime::{Runtime, WeakRuntime};

/// Value storage shared by every handle to one node
pub(crate) struct Slot<T> {
    pub(crate) id: NodeId,
    pub(crate) value: Mutex<Option<T>>,
    pub(crate) rt: WeakRuntime,
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        // Derived nodes are kept alive by their hook, so only sources get here
        // while still registered.
        if let Some(rt) = self.rt.upgrade() {
            rt.remove(self.id);
        }
    }
}

/// Read-only handle to a cell or computation.
///
/// `None` is the empty sentinel: the node holds no value yet.
pub struct Signal<T> {
    pub(crate) slot: Arc<Slot<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: CellValue> Signal<T> {
    pub(crate) fn new(id: NodeId, value: Option<T>, rt: WeakRuntime) -> Self {
        Self {
            slot: Arc::new(Slot {
                id,
                value: Mutex::new(value),
                rt,
            }),
        }
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.slot.id
    }

    /// Read the value, recording a dependency for the running evaluation
    pub fn get(&self) -> Option<T> {
        self.with(|value| value.cloned())
    }

    /// Read the value without recording a dependency
    pub fn peek(&self) -> Option<T> {
        self.slot.value.lock().clone()
    }

    /// Whether the node holds the empty sentinel (untracked)
    pub fn is_empty(&self) -> bool {
        self.slot.value.lock().is_none()
    }

    /// Tracked read through a borrow, avoiding a clone.
    ///
    /// The value stays locked while `f` runs; `f` must not touch this node.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let rt = self.slot.rt.upgrade();
        let _turn = rt.as_ref().map(Runtime::turn);
        if let Some(rt) = &rt {
            rt.track(self.slot.id);
        }
        let value = self.slot.value.lock();
        f(value.as_ref())
    }

    /// Owning runtime, if still alive
    pub fn runtime(&self) -> Option<Runtime> {
        self.slot.rt.upgrade()
    }

    /// Whether two handles point at the same node
    pub fn ptr_eq(a: &Signal<T>, b: &Signal<T>) -> bool {
        Arc::ptr_eq(&a.slot, &b.slot)
    }
}

impl<T: CellValue + std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.slot.id)
            .field("value", &*self.slot.value.lock())
            .finish()
    }
}
