//! FIFO job queue for deferred promise callbacks
//!
//! ## Ordering
//!
//! - FIFO: first queued, first run
//! - `drain` keeps going until the queue is empty, so jobs queued by a
//!   running job run in the same drain

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::trace;

/// Queued callback
pub type Job = Box<dyn FnOnce() + Send>;

/// Queue of settlement callbacks waiting to run
pub struct JobQueue {
    queue: Mutex<VecDeque<(u64, Job)>>,
    len: AtomicUsize,
    sequence: AtomicU64,
}

impl JobQueue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    /// Add a job to the back of the queue
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.queue.lock().push_back((seq, Box::new(job)));
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the next job
    pub fn dequeue(&self) -> Option<Job> {
        let job = self.queue.lock().pop_front().map(|(_, job)| job);
        if job.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        job
    }

    /// Run jobs until the queue is empty. Returns how many ran.
    ///
    /// The lock is released while each job runs.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while let Some(job) = self.dequeue() {
            job();
            ran += 1;
        }
        if ran != 0 {
            trace!(ran, "job queue drained");
        }
        ran
    }

    /// Sequence number of the next job, if any
    pub fn peek_seq(&self) -> Option<u64> {
        self.queue.lock().front().map(|(seq, _)| *seq)
    }

    /// Number of queued jobs
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all queued jobs without running them
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.queue.lock());
        self.len.fetch_sub(dropped.len(), Ordering::Relaxed);
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue").field("len", &self.len()).finish()
    }
}
