//! Bounded, blocking, multi-producer/multi-consumer string queue.
//!
//! The queue is the unit every [`crate::stage::Stage`] owns: one ring of
//! capacity `C`, guarded by a single mutex, with three [`Monitor`]s layered
//! on top of it (`not_empty`, `not_full`, `finished`). `put` blocks while the
//! ring is full, `get` blocks while it is empty, and `signal_finished` is a
//! one-way door - once it fires, no further `put` succeeds, though `get`
//! keeps draining whatever is still buffered.
//!
//! Unlike [`crate::ring`]'s lock-free cousin, this ring trades throughput for
//! the blocking semantics the pipeline's consumer loop depends on: a stage
//! worker should sleep, not spin, while its upstream neighbour is slow.

use std::collections::VecDeque;
use std::sync::Mutex;

use crossbeam_utils::CachePadded;

use crate::error::{PipelineError, Result};
use crate::monitor::Monitor;

struct Ring {
    items: VecDeque<String>,
    capacity: usize,
}

impl Ring {
    fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A fixed-capacity FIFO of owned strings with block-on-full / block-on-empty
/// semantics and a sticky "finished" signal.
///
/// See the module docs and spec §4.2 for the full put/get state machine.
pub struct BoundedQueue {
    ring: Mutex<Ring>,
    not_empty: CachePadded<Monitor>,
    not_full: CachePadded<Monitor>,
    finished: CachePadded<Monitor>,
}

impl BoundedQueue {
    /// Creates a queue with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidArgument(
                "queue capacity must be positive".into(),
            ));
        }
        Ok(Self {
            ring: Mutex::new(Ring {
                items: VecDeque::with_capacity(capacity),
                capacity,
            }),
            not_empty: CachePadded::new(Monitor::new()),
            not_full: CachePadded::new(Monitor::new()),
            finished: CachePadded::new(Monitor::new()),
        })
    }

    /// Enqueues `item`, blocking while the ring is full.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Closed`] if [`BoundedQueue::signal_finished`]
    /// has already been called, whether before this call started or while it
    /// was blocked waiting for space.
    pub fn put(&self, item: String) -> Result<()> {
        if self.finished.is_signaled() {
            return Err(PipelineError::Closed);
        }

        let mut ring = self.ring.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if self.finished.is_signaled() {
                return Err(PipelineError::Closed);
            }
            if !ring.is_full() {
                break;
            }
            self.not_full.reset();
            drop(ring);
            self.not_full.wait();
            ring = self.ring.lock().unwrap_or_else(|e| e.into_inner());
        }

        ring.items.push_back(item);
        drop(ring);
        self.not_empty.signal();
        Ok(())
    }

    /// Dequeues the oldest item, blocking while the ring is empty.
    ///
    /// Returns `None` exactly when the queue is both empty and finished;
    /// calling `get` again afterwards keeps returning `None` (end-of-stream
    /// is idempotent for every consumer).
    pub fn get(&self) -> Option<String> {
        let mut ring = self.ring.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if !ring.is_empty() {
                break;
            }
            if self.finished.is_signaled() {
                return None;
            }
            self.not_empty.reset();
            drop(ring);
            self.not_empty.wait();
            ring = self.ring.lock().unwrap_or_else(|e| e.into_inner());
        }

        let item = ring.items.pop_front();
        drop(ring);
        self.not_full.signal();
        item
    }

    /// Marks the queue finished: no further `put` will succeed, and any
    /// consumer blocked in `get` on an empty queue is woken to observe
    /// end-of-stream.
    ///
    /// Idempotent.
    pub fn signal_finished(&self) {
        self.finished.signal();
        self.not_empty.signal();
    }

    /// Blocks until [`BoundedQueue::signal_finished`] has been called.
    ///
    /// Returns immediately if it was already called before this call began.
    pub fn wait_finished(&self) {
        self.finished.wait_sticky();
    }

    /// Number of items currently buffered. For diagnostics/tests only: the
    /// count may change the instant this returns under concurrent access.
    pub fn len(&self) -> usize {
        self.ring.lock().unwrap_or_else(|e| e.into_inner()).items.len()
    }

    /// True if no items are currently buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed capacity this queue was created with.
    pub fn capacity(&self) -> usize {
        self.ring.lock().unwrap_or_else(|e| e.into_inner()).capacity
    }
}
