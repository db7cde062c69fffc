//! Propagation order, dynamic dependencies and disposal

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use otter_cell::{Cell, CellError, Computed, Runtime, RuntimeBuilder};
use parking_lot::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn counted<T, F>(rt: &Runtime, counter: &Arc<AtomicUsize>, mut f: F) -> Computed<T>
where
    T: Clone + Send + 'static,
    F: FnMut() -> Option<T> + Send + 'static,
{
    let counter = Arc::clone(counter);
    Computed::new(rt, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        f()
    })
}

#[test]
fn test_diamond_recomputes_each_node_once() {
    init_tracing();
    let rt = Runtime::new();
    let a = Cell::new(&rt, 1);

    let b = {
        let a = a.clone();
        Computed::new(&rt, move || a.get().map(|n| n + 1))
    };
    let c = {
        let a = a.clone();
        Computed::new(&rt, move || a.get().map(|n| n * 2))
    };
    let seen = Arc::new(Mutex::new(Vec::new()));
    let d = {
        let (b, c, seen) = (b.clone(), c.clone(), Arc::clone(&seen));
        Computed::new(&rt, move || {
            let sum = b.get()? + c.get()?;
            seen.lock().push(sum);
            Some(sum)
        })
    };

    let before = rt.stats();
    a.set(10);
    let after = rt.stats();

    assert_eq!(rt.level(a.id()), Some(0));
    assert_eq!(rt.level(b.id()), Some(1));
    assert_eq!(rt.level(d.id()), Some(2));
    assert_eq!(after.recomputations_since(&before), 3);
    assert_eq!(d.peek(), Some(31));
    // No glitch: d never saw a mix of old and new inputs
    assert_eq!(*seen.lock(), vec![4, 31]);
}

#[test]
fn test_unread_branch_stops_recomputing() {
    let rt = Runtime::new();
    let use_left = Cell::new(&rt, true);
    let left = Cell::new(&rt, 1);
    let right = Cell::new(&rt, 100);
    let runs = Arc::new(AtomicUsize::new(0));

    let picked = {
        let (use_left, left, right) = (use_left.clone(), left.clone(), right.clone());
        counted(&rt, &runs, move || {
            if use_left.get()? { left.get() } else { right.get() }
        })
    };
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    right.set(200);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    use_left.set(false);
    assert_eq!(picked.peek(), Some(200));
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    left.set(2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_disposed_computation_stops_recomputing() {
    let rt = Runtime::new();
    let source = Cell::new(&rt, 1);
    let runs = Arc::new(AtomicUsize::new(0));

    let doubled = {
        let source = source.clone();
        counted(&rt, &runs, move || source.get().map(|n| n * 2))
    };
    source.set(2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    doubled.dispose();
    source.set(3);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(doubled.peek(), Some(4));
    assert!(rt.subscribers(source.id()).is_empty());
}

#[test]
fn test_write_during_pass_joins_it() {
    let rt = Runtime::new();
    let source = Cell::new(&rt, 1);
    let echo = Cell::empty(&rt);

    let _writer = {
        let (source, echo) = (source.clone(), echo.clone());
        Computed::new(&rt, move || {
            let value = source.get()?;
            echo.set(value * 10);
            Some(())
        })
    };
    let watcher = {
        let echo = echo.clone();
        Computed::new(&rt, move || echo.get())
    };
    assert_eq!(watcher.peek(), Some(10));

    let before = rt.stats();
    source.set(5);
    let after = rt.stats();

    assert_eq!(watcher.peek(), Some(50));
    assert_eq!(after.passes - before.passes, 1);
}

#[test]
fn test_runaway_pass_is_abandoned() {
    init_tracing();
    let rt = RuntimeBuilder::new().max_recomputations_per_pass(10).build();
    let counter = Cell::new(&rt, 0u32);

    let _feedback = {
        let counter = counter.clone();
        Computed::new(&rt, move || {
            let n = counter.get()?;
            counter.update(|value| *value += 1);
            Some(n)
        })
    };

    assert_eq!(counter.try_set(0), Err(CellError::PassLimit { limit: 10 }));
    assert_eq!(rt.stats().aborted_passes, 1);
    assert!(!rt.is_propagating());
    assert_eq!(rt.try_flush(), Ok(0));
}

#[test]
fn test_untracked_reads_do_not_subscribe() {
    let rt = Runtime::new();
    let tracked = Cell::new(&rt, 1);
    let ignored = Cell::new(&rt, 1);
    let runs = Arc::new(AtomicUsize::new(0));

    let sum = {
        let (tracked, ignored, rt2) = (tracked.clone(), ignored.clone(), rt.clone());
        counted(&rt, &runs, move || {
            let extra = rt2.untracked(|| ignored.get())?;
            Some(tracked.get()? + extra)
        })
    };

    ignored.set(5);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(sum.peek(), Some(2));

    tracked.set(2);
    assert_eq!(sum.peek(), Some(7));
    assert_eq!(rt.dependencies(sum.id()), vec![tracked.id()]);
}

#[test]
fn test_panicking_computation_leaves_queue_for_flush() {
    init_tracing();
    let rt = Runtime::new();
    let source = Cell::new(&rt, 1);

    let _fragile = {
        let source = source.clone();
        Computed::new(&rt, move || {
            let n = source.get()?;
            if n == 13 {
                panic!("unlucky");
            }
            Some(n)
        })
    };
    let sturdy = {
        let source = source.clone();
        Computed::new(&rt, move || source.get())
    };

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| source.set(13)));
    assert!(outcome.is_err());
    assert!(!rt.is_propagating());
    assert_eq!(sturdy.peek(), Some(1));

    assert_eq!(rt.try_flush(), Ok(1));
    assert_eq!(sturdy.peek(), Some(13));
}

#[test]
fn test_writes_from_another_thread() {
    let rt = Runtime::new();
    let source = Cell::new(&rt, 0u64);
    let total = {
        let source = source.clone();
        Computed::new(&rt, move || source.get().map(|n| n * 3))
    };

    let writer = {
        let source = source.clone();
        thread::spawn(move || {
            for n in 1..=100 {
                source.set(n);
            }
        })
    };
    writer.join().expect("writer thread failed");

    assert_eq!(total.get(), Some(300));
}

#[test]
fn test_dropping_handles_keeps_computation_registered() {
    let rt = Runtime::new();
    let source = Cell::new(&rt, 1);
    let runs = Arc::new(AtomicUsize::new(0));

    let id = {
        let source = source.clone();
        counted(&rt, &runs, move || source.get()).id()
    };
    assert!(rt.contains(id));

    source.set(2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}
