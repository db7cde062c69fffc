//! Promise nodes
//!
//! A [`PromiseNode`] is a value cell and a reject cell plus a latched state
//! derived from them. Chaining does not queue callbacks: `then` builds two
//! resolver computations over this node's cells and wraps them as a new node,
//! so a callback runs inside the propagation pass that settles its parent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use otter_cell::{Cell, CellValue, Computed, Dispose, NodeId, Runtime, Signal};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::PromiseError;
use crate::resolver::{Transform, resolve, resolve_map};
use crate::state::{Latch, Outcome, Settlement, State, derive_state};
use crate::thenable::{OnFulfilled, OnRejected, Thenable};

struct NodeInner<T, E> {
    rt: Runtime,
    value: Signal<T>,
    reject: Signal<E>,
    state: Computed<State>,
    latch: Latch<T, E>,
    /// Computations and links created for this node, torn down by `dispose`
    owned: Mutex<Vec<Box<dyn Dispose>>>,
    disposed: AtomicBool,
}

/// A promise backed by a value cell and a reject cell.
///
/// Cloning yields another handle to the same node. Nodes stay live in the
/// graph until [`PromiseNode::dispose`] is called.
pub struct PromiseNode<T, E> {
    inner: Arc<NodeInner<T, E>>,
}

impl<T, E> Clone for PromiseNode<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: CellValue, E: CellValue> PromiseNode<T, E> {
    /// Wrap a value/reject pair.
    ///
    /// A missing reject cell is created. `owned` lists the resources this
    /// node tears down on dispose; cells passed in are never among them.
    pub(crate) fn wrap(
        rt: &Runtime,
        value: Signal<T>,
        reject: Option<Signal<E>>,
        already_fulfilled: bool,
        owned: Vec<Box<dyn Dispose>>,
    ) -> Self {
        let reject = reject.unwrap_or_else(|| Cell::empty(rt).signal());
        let (state, latch) = derive_state(rt, value.clone(), reject.clone(), already_fulfilled);
        Self {
            inner: Arc::new(NodeInner {
                rt: rt.clone(),
                value,
                reject,
                state,
                latch,
                owned: Mutex::new(owned),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Chain handlers for both paths.
    ///
    /// Each handler runs at most once. Returning `None` passes the original
    /// value (or reason) through unchanged. A rejection handler's result stays
    /// on the reject path.
    pub fn then<F, R>(&self, on_fulfilled: F, on_rejected: R) -> Self
    where
        F: FnOnce(T) -> Option<T> + Send + 'static,
        R: FnOnce(E) -> Option<E> + Send + 'static,
    {
        self.chain(Some(Box::new(on_fulfilled)), Some(Box::new(on_rejected)))
    }

    /// Chain a fulfilment handler; rejections pass through
    pub fn done<F>(&self, on_fulfilled: F) -> Self
    where
        F: FnOnce(T) -> Option<T> + Send + 'static,
    {
        self.chain(Some(Box::new(on_fulfilled)), None)
    }

    /// Chain a rejection handler; values pass through
    pub fn catch<R>(&self, on_rejected: R) -> Self
    where
        R: FnOnce(E) -> Option<E> + Send + 'static,
    {
        self.chain(None, Some(Box::new(on_rejected)))
    }

    /// Alias of [`PromiseNode::catch`]
    pub fn fail<R>(&self, on_rejected: R) -> Self
    where
        R: FnOnce(E) -> Option<E> + Send + 'static,
    {
        self.catch(on_rejected)
    }

    /// Run `f` on whichever path settles, passing the settlement through.
    ///
    /// `f` only observes: the returned node settles exactly like this one.
    /// Use [`PromiseNode::then`] to replace the value or reason.
    pub fn always<F>(&self, f: F) -> Self
    where
        F: Fn(Outcome<T, E>) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let on_rejected = {
            let f = Arc::clone(&f);
            move |reason: E| -> Option<E> {
                f(Outcome::Rejected(reason));
                None
            }
        };
        self.then(
            move |value| {
                f(Outcome::Fulfilled(value));
                None
            },
            on_rejected,
        )
    }

    /// Like [`PromiseNode::always`], for a callback that can only run once.
    pub fn on_settled<F>(&self, f: F) -> Self
    where
        F: FnOnce(Outcome<T, E>) + Send + 'static,
    {
        let pending = Arc::new(Mutex::new(Some(f)));
        let on_rejected = {
            let pending = Arc::clone(&pending);
            move |reason: E| -> Option<E> {
                let f = pending.lock().take();
                if let Some(f) = f {
                    f(Outcome::Rejected(reason));
                }
                None
            }
        };
        self.then(
            move |value| {
                let f = pending.lock().take();
                if let Some(f) = f {
                    f(Outcome::Fulfilled(value));
                }
                None
            },
            on_rejected,
        )
    }

    /// Transform the fulfilment value into another type
    pub fn map<U, F>(&self, f: F) -> PromiseNode<U, E>
    where
        U: CellValue,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let rt = &self.inner.rt;
        let state = self.inner.state.signal();
        let value = resolve_map(
            rt,
            Box::new(move |input| Some(f(input))),
            self.settled_value(),
            state.clone(),
            State::Fulfilled,
        );
        let reject = resolve(rt, None, self.settled_reason(), state, State::Rejected);
        PromiseNode::wrap(
            rt,
            value.signal(),
            Some(reject.signal()),
            false,
            vec![Box::new(reject), Box::new(value)],
        )
    }

    fn chain(
        &self,
        on_fulfilled: Option<Transform<T, T>>,
        on_rejected: Option<Transform<E, E>>,
    ) -> Self {
        let rt = &self.inner.rt;
        let state = self.inner.state.signal();
        let value = resolve(
            rt,
            on_fulfilled,
            self.settled_value(),
            state.clone(),
            State::Fulfilled,
        );
        let reject = resolve(
            rt,
            on_rejected,
            self.settled_reason(),
            state,
            State::Rejected,
        );
        Self::wrap(
            rt,
            value.signal(),
            Some(reject.signal()),
            false,
            vec![Box::new(reject), Box::new(value)],
        )
    }

    /// Current state (tracked)
    pub fn state(&self) -> State {
        self.inner.state.get().unwrap_or(State::Pending)
    }

    /// The state computation as a signal
    pub fn state_signal(&self) -> Signal<State> {
        self.inner.state.signal()
    }

    /// Snapshot of the settlement latch
    pub fn settlement(&self) -> Settlement<T, E> {
        self.inner.latch.lock().clone()
    }

    /// Settled value as a `Result`
    pub fn result(&self) -> Result<T, PromiseError<E>> {
        match self.settlement() {
            Settlement::Fulfilled(value) => Ok(value),
            Settlement::Rejected(reason) => Err(PromiseError::Rejected(reason)),
            Settlement::Pending if self.is_disposed() => Err(PromiseError::Disposed),
            Settlement::Pending => Err(PromiseError::Pending),
        }
    }

    /// Fulfilment value this node settled with.
    ///
    /// Tracked through the state, so a computation reading it re-runs when
    /// the node settles. Rewriting a shared input cell afterwards does not
    /// change it.
    pub fn get(&self) -> Option<T> {
        match self.state() {
            State::Fulfilled => self.inner.latch.lock().value().cloned(),
            _ => None,
        }
    }

    /// Untracked [`PromiseNode::get`]
    pub fn peek(&self) -> Option<T> {
        self.inner.latch.lock().value().cloned()
    }

    /// Rejection reason this node settled with (untracked)
    pub fn reason(&self) -> Option<E> {
        self.inner.latch.lock().reason().cloned()
    }

    /// The backing value cell.
    ///
    /// For a node wrapping a shared cell this is that cell, which may move on
    /// after settlement; [`PromiseNode::get`] keeps the settled value.
    pub fn signal(&self) -> Signal<T> {
        self.inner.value.clone()
    }

    /// The backing reject cell
    pub fn reject_signal(&self) -> Signal<E> {
        self.inner.reject.clone()
    }

    fn settled_value(&self) -> impl Fn() -> Option<T> + Send + use<T, E> {
        let latch = Arc::clone(&self.inner.latch);
        move || latch.lock().value().cloned()
    }

    fn settled_reason(&self) -> impl Fn() -> Option<E> + Send + use<T, E> {
        let latch = Arc::clone(&self.inner.latch);
        move || latch.lock().reason().cloned()
    }

    /// Node id of the state computation
    pub fn id(&self) -> NodeId {
        self.inner.state.id()
    }

    /// Runtime this node lives in
    pub fn runtime(&self) -> &Runtime {
        &self.inner.rt
    }

    /// Tear down the state computation and everything this node created.
    ///
    /// Cells supplied from outside are left alone. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.state.dispose();
        let owned = std::mem::take(&mut *self.inner.owned.lock());
        for resource in &owned {
            resource.dispose();
        }
        debug!(node = %self.id(), owned = owned.len(), "promise disposed");
    }

    /// Whether [`PromiseNode::dispose`] has been called
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Whether two handles point at the same node
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Hand `resource` to this node so it is disposed along with it.
    pub(crate) fn adopt(&self, resource: Box<dyn Dispose>) {
        if self.is_disposed() {
            resource.dispose();
            return;
        }
        self.inner.owned.lock().push(resource);
    }
}

impl<T: CellValue, E: CellValue> Dispose for PromiseNode<T, E> {
    fn dispose(&self) {
        PromiseNode::dispose(self);
    }
}

impl<T: CellValue, E: CellValue> Thenable<T, E> for PromiseNode<T, E> {
    fn subscribe(&self, on_fulfilled: OnFulfilled<T>, on_rejected: OnRejected<E>) {
        let link = self.on_settled(move |outcome| match outcome {
            Outcome::Fulfilled(value) => on_fulfilled(value),
            Outcome::Rejected(reason) => on_rejected(reason),
        });
        self.adopt(Box::new(link));
    }
}

impl<T: CellValue + std::fmt::Debug, E: CellValue + std::fmt::Debug> std::fmt::Debug
    for PromiseNode<T, E>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromiseNode")
            .field("id", &self.id())
            .field("settlement", &*self.inner.latch.lock())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn pending_node(rt: &Runtime) -> (Cell<i32>, Cell<String>, PromiseNode<i32, String>) {
        let value = Cell::empty(rt);
        let reject = Cell::empty(rt);
        let node = PromiseNode::wrap(rt, value.signal(), Some(reject.signal()), false, Vec::new());
        (value, reject, node)
    }

    #[test]
    fn test_rejection_passes_through_done() {
        let rt = Runtime::new();
        let (_, reject, node) = pending_node(&rt);
        let chained = node.done(|v| Some(v + 1));

        reject.set("boom".to_string());
        assert_eq!(chained.state(), State::Rejected);
        assert_eq!(chained.reason().as_deref(), Some("boom"));
        assert_eq!(chained.peek(), None);
    }

    #[test]
    fn test_catch_result_stays_rejected() {
        let rt = Runtime::new();
        let (_, reject, node) = pending_node(&rt);
        let handled = node.catch(|e| Some(format!("handled {e}")));

        reject.set("boom".to_string());
        assert_eq!(
            handled.result(),
            Err(PromiseError::Rejected("handled boom".to_string()))
        );
    }

    #[test]
    fn test_on_settled_runs_once() {
        let rt = Runtime::new();
        let (value, _, node) = pending_node(&rt);
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            node.on_settled(move |outcome| {
                assert_eq!(outcome, Outcome::Fulfilled(5));
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        value.set(5);
        value.set(6);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_map_changes_type() {
        let rt = Runtime::new();
        let (value, _, node) = pending_node(&rt);
        let text = node.map(|n| format!("n={n}"));

        value.set(3);
        assert_eq!(text.result(), Ok("n=3".to_string()));
    }

    #[test]
    fn test_result_of_disposed_pending_node() {
        let rt = Runtime::new();
        let (_, _, node) = pending_node(&rt);
        assert_eq!(node.result(), Err(PromiseError::Pending));
        node.dispose();
        assert_eq!(node.result(), Err(PromiseError::Disposed));
    }

    #[test]
    fn test_subscribe_link_is_owned() {
        let rt = Runtime::new();
        let (value, _, node) = pending_node(&rt);
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            node.subscribe(
                Box::new(move |v| *seen.lock() = Some(v)),
                Box::new(|_| panic!("not rejected")),
            );
        }
        assert_eq!(node.inner.owned.lock().len(), 1);

        value.set(8);
        assert_eq!(*seen.lock(), Some(8));

        node.dispose();
        assert!(node.inner.owned.lock().is_empty());
    }
}
