//! `all`/`when` and `race` over mixed inputs

use std::sync::Arc;

use otter_cell::{Cell, Runtime};
use otter_promise::{
    Deferred, Input, PromiseError, PromiseNode, State, all, race, resolved, to_promise, when,
};
use parking_lot::Mutex;

#[test]
fn test_all_preserves_input_order() {
    let rt = Runtime::new();
    let first = Deferred::<&str, &str>::new();
    let second = Deferred::<&str, &str>::new();
    let node = all(&rt, [Input::from(&first), Input::from(&second)]);

    second.resolve("b");
    assert_eq!(node.state(), State::Pending);
    first.resolve("a");

    assert_eq!(node.result(), Ok(vec!["a", "b"]));
}

#[test]
fn test_all_waits_for_every_cell() {
    let rt = Runtime::new();
    let a = Cell::empty(&rt);
    let b = Cell::empty(&rt);
    let node: PromiseNode<Vec<&str>, ()> = otter_promise::when!(&rt, &a, &b);
    let seen = Arc::new(Mutex::new(None));
    {
        let seen = Arc::clone(&seen);
        node.done(move |values| {
            *seen.lock() = Some(values);
            None
        });
    }

    a.set("p");
    assert_eq!(node.state(), State::Pending);
    assert!(seen.lock().is_none());

    b.set("q");
    assert_eq!(*seen.lock(), Some(vec!["p", "q"]));
}

#[test]
fn test_all_mixes_values_and_promises() {
    let rt = Runtime::new();
    let deferred = Deferred::<i32, String>::new();
    let node = otter_promise::all!(&rt, Input::value(5), &deferred);

    assert_eq!(node.state(), State::Pending);
    deferred.resolve(7);
    assert_eq!(node.result(), Ok(vec![5, 7]));
}

#[test]
fn test_all_rejects_with_first_reason() {
    let rt = Runtime::new();
    let deferred = Deferred::<&str, &str>::new();
    let cell = Cell::empty(&rt);
    let node = when(&rt, [Input::from(&deferred), Input::from(&cell)]);
    let seen = Arc::new(Mutex::new(None));
    {
        let seen = Arc::clone(&seen);
        node.fail(move |reason| {
            *seen.lock() = Some(reason);
            None
        });
    }

    deferred.reject("foo");
    cell.set("late");

    assert_eq!(*seen.lock(), Some("foo"));
    assert_eq!(node.result(), Err(PromiseError::Rejected("foo")));
}

#[test]
fn test_all_of_settled_nodes() {
    let rt = Runtime::new();
    let a: PromiseNode<u8, ()> = resolved(&rt, 1);
    let b: PromiseNode<u8, ()> = resolved(&rt, 2);
    let node = otter_promise::all!(&rt, &a, &b);
    assert_eq!(node.result(), Ok(vec![1, 2]));
}

#[test]
fn test_disposing_aggregate_keeps_borrowed_nodes() {
    let rt = Runtime::new();
    let cell = Cell::empty(&rt);
    let input: PromiseNode<u8, ()> = to_promise(&rt, &cell);
    let node = otter_promise::all!(&rt, &input);

    node.dispose();
    node.dispose();
    assert!(!input.is_disposed());

    cell.set(1);
    assert_eq!(input.state(), State::Fulfilled);
    assert_eq!(node.state(), State::Pending);
}

#[test]
fn test_race_literal_wins_immediately() {
    let rt = Runtime::new();
    let first = Deferred::<String, String>::new();
    let last = Deferred::<String, String>::new();
    let node = otter_promise::race!(&rt, &first, Input::value("foo".to_string()), &last);
    assert_eq!(node.state(), State::Fulfilled);

    first.resolve("bar".to_string());
    last.resolve("baz".to_string());
    assert_eq!(node.result(), Ok("foo".to_string()));
}

#[test]
fn test_race_of_literals_takes_first() {
    let rt = Runtime::new();
    let node: PromiseNode<&str, ()> =
        otter_promise::race!(&rt, Input::value("foo"), Input::value("bar"));
    assert_eq!(node.peek(), Some("foo"));
}

#[test]
fn test_race_first_settlement_wins() {
    let rt = Runtime::new();
    let a = Deferred::<&str, &str>::new();
    let b = Deferred::<&str, &str>::new();
    let node = race(&rt, [Input::from(&a), Input::from(&b)]);

    b.resolve("b");
    a.resolve("a");
    a.reject("ignored");

    assert_eq!(node.result(), Ok("b"));
}

#[test]
fn test_race_rejection_wins_and_blocks_later_values() {
    let rt = Runtime::new();
    let deferred = Deferred::<&str, &str>::new();
    let cell = Cell::empty(&rt);
    let node = race(&rt, [Input::from(&deferred), Input::from(&cell)]);
    let seen = Arc::new(Mutex::new(None));
    {
        let seen = Arc::clone(&seen);
        node.fail(move |reason| {
            *seen.lock() = Some(reason);
            None
        });
    }

    deferred.reject("foo");
    cell.set("late");

    assert_eq!(*seen.lock(), Some("foo"));
    assert_eq!(node.state(), State::Rejected);
    assert_eq!(node.peek(), None);
}

#[test]
fn test_race_of_nothing_is_pending() {
    let rt = Runtime::new();
    let node: PromiseNode<u8, ()> = otter_promise::race!(&rt);
    assert_eq!(node.state(), State::Pending);
}
