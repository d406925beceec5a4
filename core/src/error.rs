//! Error types returned by the pipeline substrate.
//!
//! Every fallible core operation returns a reason rather than aborting
//! (see spec §7): allocation/thread-spawn failure, invalid arguments, and a
//! `put` that arrives after the queue has been marked finished are all
//! ordinary, recoverable [`PipelineError`] values.

use thiserror::Error;

/// Errors surfaced by [`crate::queue::BoundedQueue`] and
/// [`crate::stage::Stage`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A constructor argument failed validation (non-positive capacity, an
    /// empty stage name, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `put` was called after [`crate::queue::BoundedQueue::signal_finished`].
    #[error("closed")]
    Closed,

    /// The worker thread could not be spawned.
    #[error("failed to spawn stage worker: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

/// Convenience alias for fallible core operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
