//! Manual-reset event.
//!
//! A [`Monitor`] is a one-bit, level-triggered signal: once [`Monitor::signal`]
//! has fired, every call to [`Monitor::wait`] that has not yet observed the bit
//! unblocks, even if the calling thread started waiting *after* the signal was
//! raised. This "sticky" behaviour is what lets [`crate::queue::BoundedQueue`]
//! implement `signal_finished` without a race between the signalling thread and
//! late-arriving waiters.
//!
//! A bare [`Condvar`] only wakes threads that are already parked on it at the
//! moment of `notify_all`; it has no memory of a signal that fired before
//! anyone was waiting. [`Monitor`] adds that memory via a guarded `bool`.

use std::sync::{Condvar, Mutex};

use crossbeam_utils::CachePadded;

/// A manual-reset, level-triggered one-bit event.
///
/// `signal` sets the bit and wakes every waiter; `wait` blocks until the bit
/// is set, then clears it before returning; `reset` clears the bit without
/// waking anyone. See the module docs for why this differs from a plain
/// condition variable.
pub struct Monitor {
    state: CachePadded<Mutex<bool>>,
    condvar: Condvar,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    /// Creates an unsignalled monitor.
    pub fn new() -> Self {
        Self {
            state: CachePadded::new(Mutex::new(false)),
            condvar: Condvar::new(),
        }
    }

    /// Sets the signal and wakes every thread blocked in [`Monitor::wait`].
    ///
    /// Idempotent: signalling an already-signalled monitor is a no-op beyond
    /// the (harmless) wakeup broadcast.
    pub fn signal(&self) {
        let mut signaled = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *signaled = true;
        self.condvar.notify_all();
    }

    /// Clears the signal without waking anyone.
    ///
    /// Idempotent: resetting an already-clear monitor is a no-op.
    pub fn reset(&self) {
        let mut signaled = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *signaled = false;
    }

    /// Blocks until the signal is observed set, then clears it and returns.
    ///
    /// Tolerates spurious wakeups by re-checking the predicate under the
    /// lock, per standard condition-variable discipline. This is the flavour
    /// [`crate::queue::BoundedQueue`] uses for `not_empty`/`not_full`, whose
    /// predicate loop resets the monitor itself before each wait (see
    /// spec §4.2) and so does not depend on which side clears the bit.
    pub fn wait(&self) {
        let guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = self
            .condvar
            .wait_while(guard, |signaled| !*signaled)
            .unwrap_or_else(|e| e.into_inner());
        *guard = false;
    }

    /// Blocks until the signal is observed set, like [`Monitor::wait`], but
    /// leaves it set on return.
    ///
    /// Used for monitors whose signal is permanent once raised - the queue's
    /// `finished` monitor never un-finishes, so every caller of
    /// [`crate::queue::BoundedQueue::wait_finished`], including one that
    /// arrives after the first has already returned, must keep observing the
    /// signal.
    pub fn wait_sticky(&self) {
        let guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = self
            .condvar
            .wait_while(guard, |signaled| !*signaled)
            .unwrap_or_else(|e| e.into_inner());
    }

    /// Returns the current state of the signal without blocking or
    /// consuming it.
    pub fn is_signaled(&self) -> bool {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
