//! Reactive runtime
//!
//! ## Propagation
//!
//! Writing a source marks its subscribers dirty and drains a min-heap keyed
//! by node level (sources are level 0, a derived node sits one level above
//! its highest dependency). Dependencies are therefore recomputed before
//! their dependents within a pass.
//!
//! A write performed while a pass is running (for example from a callback
//! invoked by a derived node) only queues its subscribers; the running pass
//! picks them up. The outermost writer returns once the graph is quiescent.
//!
//! ## Tracking
//!
//! Every evaluation pushes a frame on the tracking stack. Tracked reads
//! record the node into the top frame; when the evaluation returns, the
//! recorded set replaces the node's previous dependencies.
//!
//! ## Turn lock
//!
//! All graph activity happens under a reentrant per-runtime lock, so one
//! thread at a time drives the graph and nested calls on that thread are
//! free.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::{trace, trace_span, warn};

use crate::config::{RuntimeBuilder, RuntimeConfig};
use crate::error::{CellError, CellResult};
use crate::graph::{Graph, NodeId, NodeList, Recompute};
use crate::stats::{RuntimeStats, RuntimeStatsSnapshot};

/// One evaluation on the tracking stack
struct Frame {
    tracked: bool,
    deps: NodeList,
}

impl Frame {
    fn tracked() -> Self {
        Self {
            tracked: true,
            deps: NodeList::new(),
        }
    }

    fn untracked() -> Self {
        Self {
            tracked: false,
            deps: NodeList::new(),
        }
    }
}

pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    turn: ReentrantMutex<()>,
    graph: Mutex<Graph>,
    tracking: Mutex<Vec<Frame>>,
    running: AtomicBool,
    stats: RuntimeStats,
}

/// Handle to a reactive runtime.
///
/// Cloning is cheap; every clone refers to the same graph.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

/// Non-owning runtime handle held by cells and computations.
#[derive(Clone, Default)]
pub struct WeakRuntime {
    inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
    /// Upgrade to a strong handle if the runtime is still alive
    pub fn upgrade(&self) -> Option<Runtime> {
        self.inner.upgrade().map(|inner| Runtime { inner })
    }
}

impl Runtime {
    /// Create a runtime with default configuration
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                turn: ReentrantMutex::new(()),
                graph: Mutex::new(Graph::new()),
                tracking: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
                stats: RuntimeStats::new(),
            }),
        }
    }

    /// Start a [`RuntimeBuilder`]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same runtime
    pub fn ptr_eq(a: &Runtime, b: &Runtime) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Snapshot of propagation counters
    pub fn stats(&self) -> RuntimeStatsSnapshot {
        let live = self.inner.graph.lock().len();
        self.inner.stats.snapshot(live)
    }

    /// Number of nodes registered in the graph
    pub fn node_count(&self) -> usize {
        self.inner.graph.lock().len()
    }

    /// Whether `id` is still registered
    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.graph.lock().contains(id)
    }

    /// Nodes read by the last evaluation of `id`
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.graph.lock().dependencies(id).into_vec()
    }

    /// Nodes that read `id` during their last evaluation
    pub fn subscribers(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.graph.lock().subscribers(id).into_vec()
    }

    /// Height of `id` in the graph; sources sit at level 0
    pub fn level(&self, id: NodeId) -> Option<u32> {
        self.inner.graph.lock().level(id)
    }

    /// Whether a propagation pass is currently draining
    pub fn is_propagating(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Run `f` without recording any dependency for the enclosing evaluation
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _turn = self.turn();
        self.inner.tracking.lock().push(Frame::untracked());
        let _pop = scopeguard::guard((), |()| {
            self.inner.tracking.lock().pop();
        });
        f()
    }

    /// Drain nodes left queued, e.g. after a callback panicked mid-pass.
    ///
    /// Returns the number of recomputations performed.
    pub fn try_flush(&self) -> CellResult<usize> {
        let _turn = self.turn();
        if !self.inner.graph.lock().has_dirty() {
            return Ok(0);
        }
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return Ok(0);
        }
        let _reset = scopeguard::guard((), |()| {
            self.inner.running.store(false, Ordering::Release);
        });
        self.drain()
    }

    pub(crate) fn turn(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.turn.lock()
    }

    pub(crate) fn register_source(&self) -> NodeId {
        let _turn = self.turn();
        self.inner.graph.lock().insert_source()
    }

    pub(crate) fn register_derived(&self) -> NodeId {
        let _turn = self.turn();
        self.inner.graph.lock().insert_derived()
    }

    pub(crate) fn install(&self, id: NodeId, recompute: Recompute) {
        let _turn = self.turn();
        self.inner.graph.lock().set_recompute(id, recompute);
    }

    pub(crate) fn record_write(&self) {
        self.inner.stats.record_write();
    }

    /// Record `id` as a dependency of the evaluation on top of the stack
    pub(crate) fn track(&self, id: NodeId) {
        let mut tracking = self.inner.tracking.lock();
        if let Some(frame) = tracking.last_mut() {
            if frame.tracked && !frame.deps.contains(&id) {
                frame.deps.push(id);
            }
        }
    }

    /// Evaluate `f` on behalf of `id`, then rewire `id` to what it read.
    pub(crate) fn evaluate<R>(&self, id: NodeId, f: impl FnOnce() -> R) -> R {
        let _turn = self.turn();
        self.inner.tracking.lock().push(Frame::tracked());
        let unwind = scopeguard::guard((), |()| {
            self.inner.tracking.lock().pop();
        });

        let result = f();

        scopeguard::ScopeGuard::into_inner(unwind);
        let frame = self.inner.tracking.lock().pop();
        if let Some(frame) = frame {
            trace!(node = %id, deps = frame.deps.len(), "evaluated");
            self.inner.graph.lock().rewire(id, frame.deps);
        }
        self.inner.stats.record_recomputation();
        result
    }

    /// Queue the subscribers of `id`; drain them unless a pass is already running.
    pub(crate) fn notify(&self, id: NodeId) -> CellResult<usize> {
        let _turn = self.turn();
        self.inner.graph.lock().mark_subscribers_dirty(id);
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return Ok(0);
        }
        let _reset = scopeguard::guard((), |()| {
            self.inner.running.store(false, Ordering::Release);
        });
        self.drain()
    }

    /// Remove `id` from the graph. Returns whether it was registered.
    pub(crate) fn remove(&self, id: NodeId) -> bool {
        let _turn = self.turn();
        let meta = self.inner.graph.lock().remove(id);
        let removed = meta.is_some();
        // Hooks may hold the last handle to other nodes, whose drop re-enters the graph.
        drop(meta);
        removed
    }

    fn drain(&self) -> CellResult<usize> {
        let limit = self.inner.config.max_recomputations_per_pass;
        let span = trace_span!("pass", runtime = %self.inner.config.name);
        let _enter = span.enter();

        let mut recomputed = 0usize;
        loop {
            let next = self.inner.graph.lock().pop_dirty();
            let Some((id, recompute)) = next else {
                break;
            };
            if recomputed >= limit {
                let dropped = self.inner.graph.lock().clear_dirty() + 1;
                self.inner.stats.record_abort();
                warn!(
                    runtime = %self.inner.config.name,
                    node = %id,
                    limit,
                    dropped,
                    "propagation pass abandoned"
                );
                return Err(CellError::PassLimit { limit });
            }
            recomputed += 1;
            recompute();
        }

        self.inner.stats.record_pass();
        trace!(recomputed, "pass complete");
        Ok(recomputed)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("name", &self.inner.config.name)
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl std::fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakRuntime")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_frames_record_nothing() {
        let rt = Runtime::new();
        let source = rt.register_source();
        let node = rt.register_derived();

        rt.evaluate(node, || {
            rt.untracked(|| rt.track(source));
        });
        assert!(rt.dependencies(node).is_empty());

        rt.evaluate(node, || rt.track(source));
        assert_eq!(rt.dependencies(node), vec![source]);
    }

    #[test]
    fn test_evaluate_pops_frame_on_panic() {
        let rt = Runtime::new();
        let node = rt.register_derived();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            rt.evaluate(node, || panic!("boom"));
        }));
        assert!(outcome.is_err());
        assert!(rt.inner.tracking.lock().is_empty());
    }

    #[test]
    fn test_weak_runtime_upgrade() {
        let rt = Runtime::new();
        let weak = rt.downgrade();
        assert!(weak.upgrade().is_some());
        drop(rt);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_try_flush_with_nothing_queued() {
        let rt = Runtime::new();
        assert_eq!(rt.try_flush(), Ok(0));
        assert!(!rt.is_propagating());
    }
}
