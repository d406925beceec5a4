//! The per-stage consumer loop.
//!
//! A [`Stage`] bundles a name, an owned [`BoundedQueue`], a worker thread,
//! a user-supplied transform, and an optional downstream submit handle. It
//! is the runtime every dynamically loaded plugin binds to exactly once
//! (see spec §4.3 and §9 "Global per-stage state"); [`crate::abi`] is the
//! thin layer that exposes a [`Stage`] across an FFI boundary.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::{PipelineError, Result};
use crate::monitor::Monitor;
use crate::queue::BoundedQueue;

/// The literal line that, once observed by a stage, forwards downstream and
/// then closes that stage's queue.
pub const SENTINEL: &str = "<END>";

/// A stage's transformation function: pure, side-effect-free with respect to
/// the pipeline (logging aside), `None` on failure.
pub type Transform = dyn Fn(&str) -> Option<String> + Send + Sync;

/// A downstream neighbour's `place_work`, as seen by the stage upstream of it.
pub type Submit = dyn Fn(String) -> Result<()> + Send + Sync;

/// One transformation step: owns a worker thread and an input queue.
pub struct Stage {
    name: Arc<str>,
    queue: Arc<BoundedQueue>,
    worker: Mutex<Option<JoinHandle<()>>>,
    downstream: Arc<Mutex<Option<Arc<Submit>>>>,
    initialized: Arc<Monitor>,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Stage {
    /// Allocates the stage's queue, spawns its worker, and blocks until the
    /// worker has signalled that it is running before returning.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `name` is empty or
    /// `capacity` is zero, or [`PipelineError::SpawnFailed`] if the worker
    /// thread could not be created.
    pub fn spawn<F>(name: impl Into<String>, transform: F, capacity: usize) -> Result<Self>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let name: Arc<str> = {
            let name = name.into();
            if name.is_empty() {
                return Err(PipelineError::InvalidArgument(
                    "stage name must not be empty".into(),
                ));
            }
            Arc::from(name)
        };

        let queue = Arc::new(BoundedQueue::new(capacity)?);
        let downstream: Arc<Mutex<Option<Arc<Submit>>>> = Arc::new(Mutex::new(None));
        let initialized = Arc::new(Monitor::new());

        let worker = thread::Builder::new()
            .name(format!("stage:{name}"))
            .spawn({
                let name = name.clone();
                let queue = queue.clone();
                let downstream = downstream.clone();
                let initialized = initialized.clone();
                move || run_worker(&name, &queue, &downstream, &initialized, &transform)
            })?;

        // Block until the worker has set `initialized`: a `place_work` call
        // that races a still-spawning worker is otherwise harmless (the item
        // just queues), but blocking here keeps `Stage::spawn`'s contract
        // ("becomes live when its worker sets initialised") synchronous and
        // observable, matching the original's init-time busy-wait.
        initialized.wait_sticky();

        Ok(Self {
            name,
            queue,
            worker: Mutex::new(Some(worker)),
            downstream,
            initialized,
        })
    }

    /// Enqueues one item, blocking while the stage's queue is full.
    pub fn place_work(&self, item: impl Into<String>) -> Result<()> {
        self.queue.put(item.into())
    }

    /// Chains this stage's output to a downstream neighbour's `place_work`.
    ///
    /// Must be called at most once, before any data flows.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if a downstream handle is
    /// already attached.
    pub fn attach<S>(&self, submit: S) -> Result<()>
    where
        S: Fn(String) -> Result<()> + Send + Sync + 'static,
    {
        let mut slot = self.downstream.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Err(PipelineError::InvalidArgument(
                "stage already has a downstream attached".into(),
            ));
        }
        *slot = Some(Arc::new(submit));
        Ok(())
    }

    /// Blocks until the worker has processed the sentinel (or observed
    /// upstream closure) and marked its queue finished.
    pub fn wait_finished(&self) {
        self.queue.wait_finished();
    }

    /// Joins the worker thread. Idempotent: a second call is a no-op.
    ///
    /// The worker must already be finishing or finished - call
    /// [`Stage::wait_finished`] first if that is not yet guaranteed.
    pub fn fini(&self) {
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("stage '{}' worker panicked", self.name);
            }
        }
    }

    /// The stage's diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the worker has entered its running state.
    pub fn is_initialized(&self) -> bool {
        self.initialized.is_signaled()
    }
}

fn run_worker(
    name: &str,
    queue: &BoundedQueue,
    downstream: &Mutex<Option<Arc<Submit>>>,
    initialized: &Monitor,
    transform: &(dyn Fn(&str) -> Option<String> + Send + Sync),
) {
    initialized.signal();

    loop {
        let Some(item) = queue.get() else {
            // Upstream closed the queue directly, with no sentinel observed.
            break;
        };

        if item == SENTINEL {
            forward(name, downstream, item);
            queue.signal_finished();
            break;
        }

        match transform(&item) {
            Some(out) => forward(name, downstream, out),
            None => log::error!("stage '{name}' transform failed on input {item:?}"),
        }
    }
}

fn forward(name: &str, downstream: &Mutex<Option<Arc<Submit>>>, item: String) {
    let submit = downstream.lock().unwrap_or_else(|e| e.into_inner()).clone();
    if let Some(submit) = submit {
        if let Err(err) = submit(item) {
            log::error!("stage '{name}' failed to submit downstream: {err}");
        }
    }
}
