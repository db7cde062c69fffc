//! Memoized derived computations
//!
//! A computation is evaluated once when created and again whenever a node it
//! read during its previous evaluation changes. The dependency set is
//! rebuilt on every evaluation, so branches that stop reading a node stop
//! depending on it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{CellError, CellResult};
use crate::graph::NodeId;
use crate::runtime::Runtime;
use crate::signal::Signal;
use crate::{CellValue, Dispose};

type Evaluator = Arc<dyn Fn() -> CellResult<()> + Send + Sync>;

struct ComputedState {
    evaluator: Mutex<Option<Evaluator>>,
    disposed: AtomicBool,
}

/// A derived, memoized reactive value.
///
/// Cloning yields another handle to the same computation. The computation
/// stays registered until [`Computed::dispose`] is called, even when every
/// handle is dropped.
pub struct Computed<T> {
    signal: Signal<T>,
    state: Arc<ComputedState>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: CellValue> Computed<T> {
    /// Create and immediately evaluate a computation.
    ///
    /// `f` returns `None` while it has nothing to report.
    pub fn new<F>(rt: &Runtime, f: F) -> Self
    where
        F: FnMut() -> Option<T> + Send + 'static,
    {
        let _turn = rt.turn();
        let id = rt.register_derived();
        let signal = Signal::new(id, None, rt.downgrade());

        let evaluator: Evaluator = {
            let slot = Arc::clone(&signal.slot);
            let weak = rt.downgrade();
            let f = Mutex::new(f);
            Arc::new(move || {
                let rt = weak.upgrade().ok_or(CellError::RuntimeDropped)?;
                let mut f = f.try_lock().ok_or(CellError::Cycle(id))?;
                let next = rt.evaluate(id, || (*f)());
                drop(f);
                let _previous = std::mem::replace(&mut *slot.value.lock(), next);
                rt.notify(id).map(|_| ())
            })
        };

        let hook = Arc::clone(&evaluator);
        rt.install(
            id,
            Arc::new(move || {
                if let Err(err) = hook() {
                    warn!(node = %id, %err, "computation failed to re-evaluate");
                }
            }),
        );

        if let Err(err) = evaluator() {
            warn!(node = %id, %err, "computation failed to evaluate");
        }

        Self {
            signal,
            state: Arc::new(ComputedState {
                evaluator: Mutex::new(Some(evaluator)),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.signal.id()
    }

    /// Tracked read of the memoized value
    pub fn get(&self) -> Option<T> {
        self.signal.get()
    }

    /// Untracked read of the memoized value
    pub fn peek(&self) -> Option<T> {
        self.signal.peek()
    }

    /// Read-only view of this computation
    pub fn signal(&self) -> Signal<T> {
        self.signal.clone()
    }

    /// Force a re-evaluation outside of normal propagation
    pub fn refresh(&self) -> CellResult<()> {
        let evaluator = self
            .state
            .evaluator
            .lock()
            .clone()
            .ok_or(CellError::Disposed(self.id()))?;
        evaluator()
    }

    /// Whether [`Computed::dispose`] has been called
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }

    /// Unsubscribe from every dependency and drop the computation.
    ///
    /// The last value remains readable. Idempotent.
    pub fn dispose(&self) {
        if self.state.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let evaluator = self.state.evaluator.lock().take();
        if let Some(rt) = self.signal.runtime() {
            rt.remove(self.id());
        }
        drop(evaluator);
        debug!(node = %self.id(), "computation disposed");
    }
}

impl<T: CellValue> Dispose for Computed<T> {
    fn dispose(&self) {
        Computed::dispose(self);
    }
}

impl<T: CellValue + std::fmt::Debug> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("signal", &self.signal)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<T> From<Computed<T>> for Signal<T> {
    fn from(computed: Computed<T>) -> Self {
        computed.signal
    }
}

impl<T> From<&Computed<T>> for Signal<T> {
    fn from(computed: &Computed<T>) -> Self {
        computed.signal.clone()
    }
}
