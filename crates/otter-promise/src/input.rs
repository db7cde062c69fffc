//! Converting values, cells and foreign promises into promise nodes

use otter_cell::{Cell, CellValue, Computed, Runtime, Signal};
use tracing::debug;

use crate::deferred::Deferred;
use crate::node::PromiseNode;
use crate::thenable::Thenable;

/// Anything that can become a [`PromiseNode`].
pub enum Input<T, E> {
    /// Plain value; the node is fulfilled from the start
    Value(T),
    /// A cell or computation; the node fulfils on its first value
    Cell(Signal<T>),
    /// Promise living outside the graph
    Promise(Box<dyn Thenable<T, E>>),
    /// Already a node; used as is
    Node(PromiseNode<T, E>),
}

impl<T, E> Input<T, E> {
    /// Tag a plain value
    pub fn value(value: T) -> Self {
        Input::Value(value)
    }

    /// Tag a foreign promise
    pub fn promise(promise: impl Thenable<T, E> + 'static) -> Self {
        Input::Promise(Box::new(promise))
    }
}

impl<T, E> From<Signal<T>> for Input<T, E> {
    fn from(signal: Signal<T>) -> Self {
        Input::Cell(signal)
    }
}

impl<T, E> From<&Signal<T>> for Input<T, E> {
    fn from(signal: &Signal<T>) -> Self {
        Input::Cell(signal.clone())
    }
}

impl<T, E> From<Cell<T>> for Input<T, E> {
    fn from(cell: Cell<T>) -> Self {
        Input::Cell(cell.into())
    }
}

impl<T, E> From<&Cell<T>> for Input<T, E> {
    fn from(cell: &Cell<T>) -> Self {
        Input::Cell(cell.into())
    }
}

impl<T, E> From<Computed<T>> for Input<T, E> {
    fn from(computed: Computed<T>) -> Self {
        Input::Cell(computed.into())
    }
}

impl<T, E> From<&Computed<T>> for Input<T, E> {
    fn from(computed: &Computed<T>) -> Self {
        Input::Cell(computed.into())
    }
}

impl<T, E> From<PromiseNode<T, E>> for Input<T, E> {
    fn from(node: PromiseNode<T, E>) -> Self {
        Input::Node(node)
    }
}

impl<T, E> From<&PromiseNode<T, E>> for Input<T, E> {
    fn from(node: &PromiseNode<T, E>) -> Self {
        Input::Node(node.clone())
    }
}

impl<T: CellValue, E: CellValue> From<Deferred<T, E>> for Input<T, E> {
    fn from(deferred: Deferred<T, E>) -> Self {
        Input::Promise(Box::new(deferred))
    }
}

impl<T: CellValue, E: CellValue> From<&Deferred<T, E>> for Input<T, E> {
    fn from(deferred: &Deferred<T, E>) -> Self {
        Input::Promise(Box::new(deferred.clone()))
    }
}

/// Convert `input` into a promise node.
///
/// An existing node comes back unchanged. A foreign promise gets a fresh
/// pair of cells that its callbacks write into. A cell is wrapped without
/// taking ownership of it. A plain value yields a node that is fulfilled
/// from the start.
pub fn to_promise<T, E>(rt: &Runtime, input: impl Into<Input<T, E>>) -> PromiseNode<T, E>
where
    T: CellValue,
    E: CellValue,
{
    match input.into() {
        Input::Node(node) => node,
        Input::Promise(promise) => {
            let value = Cell::empty(rt);
            let reject = Cell::empty(rt);
            let node = PromiseNode::wrap(rt, value.signal(), Some(reject.signal()), false, Vec::new());
            debug!(node = %node.id(), "adopting foreign promise");
            promise.subscribe(
                Box::new(move |v| value.set(v)),
                Box::new(move |e| reject.set(e)),
            );
            node
        }
        Input::Cell(signal) => PromiseNode::wrap(rt, signal, None, false, Vec::new()),
        Input::Value(value) => {
            let cell = Cell::new(rt, value);
            PromiseNode::wrap(rt, cell.signal(), None, true, Vec::new())
        }
    }
}

/// A node fulfilled with `value`
pub fn resolved<T: CellValue, E: CellValue>(rt: &Runtime, value: T) -> PromiseNode<T, E> {
    to_promise(rt, Input::Value(value))
}

/// A node rejected with `reason`
pub fn rejected<T: CellValue, E: CellValue>(rt: &Runtime, reason: E) -> PromiseNode<T, E> {
    let value = Cell::empty(rt);
    let reject = Cell::new(rt, reason);
    PromiseNode::wrap(rt, value.signal(), Some(reject.signal()), false, Vec::new())
}
