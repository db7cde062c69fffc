//! Aggregation over many inputs: `all`/`when` and `race`

use std::sync::Arc;

use otter_cell::{Cell, CellValue, Computed, Dispose, Runtime};
use parking_lot::Mutex;
use tracing::debug;

use crate::input::{Input, to_promise};
use crate::node::PromiseNode;
use crate::write_once::WriteOnce;

/// Convert `input` and record whether the caller handed us an existing node,
/// which the aggregate must not dispose.
fn adopt_input<T: CellValue, E: CellValue>(
    rt: &Runtime,
    input: Input<T, E>,
) -> (PromiseNode<T, E>, bool) {
    let borrowed = matches!(input, Input::Node(_));
    (to_promise(rt, input), borrowed)
}

/// Fulfil with every input's value, in input order, once all are fulfilled.
///
/// The first rejection rejects the aggregate with that reason; later
/// settlements are ignored. No inputs fulfils immediately with an empty vec.
pub fn all<T, E, I>(rt: &Runtime, inputs: I) -> PromiseNode<Vec<T>, E>
where
    T: CellValue,
    E: CellValue,
    I: IntoIterator<Item = Input<T, E>>,
{
    let inputs: Vec<Input<T, E>> = inputs.into_iter().collect();
    let count = inputs.len();
    let slots: Arc<Mutex<Vec<Option<T>>>> = Arc::new(Mutex::new(vec![None; count]));
    let pending = Cell::new(rt, count);
    let reject = WriteOnce::new(rt);
    let mut links: Vec<Box<dyn Dispose>> = Vec::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let input = match input {
            Input::Value(value) => {
                slots.lock()[index] = Some(value);
                pending.update(|n| *n = n.saturating_sub(1));
                continue;
            }
            other => other,
        };

        let (node, borrowed) = adopt_input(rt, input);
        let link = {
            let (slots, pending, reject) = (Arc::clone(&slots), pending.clone(), reject.clone());
            node.then(
                move |value| {
                    slots.lock()[index] = Some(value);
                    pending.update(|n| *n = n.saturating_sub(1));
                    None
                },
                move |reason| {
                    reject.set(reason);
                    None
                },
            )
        };
        links.push(Box::new(link));
        if !borrowed {
            links.push(Box::new(node));
        }
    }

    let collected = {
        let slots = Arc::clone(&slots);
        Computed::new(rt, move || {
            if pending.get()? != 0 {
                return None;
            }
            slots.lock().iter().cloned().collect::<Option<Vec<T>>>()
        })
    };
    debug!(inputs = count, node = %collected.id(), "all created");

    let mut owned: Vec<Box<dyn Dispose>> = vec![Box::new(collected.clone())];
    owned.extend(links);
    PromiseNode::wrap(rt, collected.signal(), Some(reject.signal()), false, owned)
}

/// Alias of [`all`]
pub fn when<T, E, I>(rt: &Runtime, inputs: I) -> PromiseNode<Vec<T>, E>
where
    T: CellValue,
    E: CellValue,
    I: IntoIterator<Item = Input<T, E>>,
{
    all(rt, inputs)
}

/// Settle like whichever input settles first.
///
/// A plain value wins on the spot and the remaining inputs are not looked
/// at. No inputs leaves the node pending forever.
pub fn race<T, E, I>(rt: &Runtime, inputs: I) -> PromiseNode<T, E>
where
    T: CellValue,
    E: CellValue,
    I: IntoIterator<Item = Input<T, E>>,
{
    let value = WriteOnce::new(rt);
    let reject = WriteOnce::new(rt);
    let mut links: Vec<Box<dyn Dispose>> = Vec::new();
    let mut entrants = 0usize;

    for input in inputs {
        entrants += 1;
        let input = match input {
            Input::Value(v) => {
                if !reject.is_written() {
                    value.set(v);
                }
                break;
            }
            other => other,
        };

        let (node, borrowed) = adopt_input(rt, input);
        let link = {
            let (on_value, value_seen) = (value.clone(), value.clone());
            let (on_reject, reject_seen) = (reject.clone(), reject.clone());
            node.then(
                move |v| {
                    if !reject_seen.is_written() {
                        on_value.set(v);
                    }
                    None
                },
                move |reason| {
                    if !value_seen.is_written() {
                        on_reject.set(reason);
                    }
                    None
                },
            )
        };
        links.push(Box::new(link));
        if !borrowed {
            links.push(Box::new(node));
        }
    }
    debug!(entrants, "race created");

    PromiseNode::wrap(rt, value.signal(), Some(reject.signal()), false, links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;

    #[test]
    fn test_all_of_nothing_is_fulfilled() {
        let rt = Runtime::new();
        let node = all::<u8, (), _>(&rt, []);
        assert_eq!(node.result(), Ok(Vec::new()));
    }

    #[test]
    fn test_race_of_nothing_stays_pending() {
        let rt = Runtime::new();
        let node = race::<u8, (), _>(&rt, []);
        assert_eq!(node.state(), State::Pending);
    }

    #[test]
    fn test_all_keeps_first_rejection() {
        let rt = Runtime::new();
        let reasons: Vec<Cell<&str>> = (0..2).map(|_| Cell::empty(&rt)).collect();
        let nodes: Vec<PromiseNode<u8, &str>> = reasons
            .iter()
            .map(|reason| {
                let value = Cell::<u8>::empty(&rt);
                PromiseNode::wrap(&rt, value.signal(), Some(reason.signal()), false, Vec::new())
            })
            .collect();

        let aggregate = all(&rt, nodes.iter().map(Input::from));
        reasons[1].set("second");
        reasons[0].set("first");

        assert_eq!(aggregate.state(), State::Rejected);
        assert_eq!(aggregate.reason(), Some("second"));
    }
}
