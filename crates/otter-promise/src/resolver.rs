//! Resolver nodes: run a callback once, when a node reaches a given state

use otter_cell::{CellValue, Computed, Runtime, Signal};

use crate::state::State;

/// One-shot transform applied by a resolver
pub(crate) type Transform<S, U> = Box<dyn FnOnce(S) -> Option<U> + Send>;

struct Resolver<S, U> {
    callback: Option<Transform<S, U>>,
    fallback: fn(S) -> Option<U>,
    fired: bool,
    resolved: Option<U>,
}

/// Same-type resolver: an empty callback result falls back to the source value.
///
/// `source` is read untracked once `state` reaches `target`; the resolver
/// only depends on `state`.
pub(crate) fn resolve<T, P>(
    rt: &Runtime,
    callback: Option<Transform<T, T>>,
    source: P,
    state: Signal<State>,
    target: State,
) -> Computed<T>
where
    T: CellValue,
    P: Fn() -> Option<T> + Send + 'static,
{
    resolve_with(rt, callback, Some, source, state, target)
}

/// Type-changing resolver used by `map`. Without a callback it never resolves.
pub(crate) fn resolve_map<S, U, P>(
    rt: &Runtime,
    callback: Transform<S, U>,
    source: P,
    state: Signal<State>,
    target: State,
) -> Computed<U>
where
    S: CellValue,
    U: CellValue,
    P: Fn() -> Option<S> + Send + 'static,
{
    resolve_with(rt, Some(callback), |_| None, source, state, target)
}

fn resolve_with<S, U, P>(
    rt: &Runtime,
    callback: Option<Transform<S, U>>,
    fallback: fn(S) -> Option<U>,
    source: P,
    state: Signal<State>,
    target: State,
) -> Computed<U>
where
    S: CellValue,
    U: CellValue,
    P: Fn() -> Option<S> + Send + 'static,
{
    let weak = rt.downgrade();
    let mut resolver = Resolver {
        callback,
        fallback,
        fired: false,
        resolved: None,
    };

    Computed::new(rt, move || {
        if state.get()? != target {
            return None;
        }
        if resolver.fired {
            return resolver.resolved.clone();
        }
        let rt = weak.upgrade();
        let read = || match &rt {
            Some(rt) => rt.untracked(&source),
            None => source(),
        };
        // No payload yet: fire on the next state change
        let input = read()?;
        resolver.fired = true;

        let produced = match resolver.callback.take() {
            Some(callback) => {
                let arg = input.clone();
                match &rt {
                    Some(rt) => rt.untracked(|| callback(arg)),
                    None => callback(arg),
                }
            }
            None => None,
        };
        resolver.resolved = produced.or_else(|| (resolver.fallback)(input));
        resolver.resolved.clone()
    })
}
