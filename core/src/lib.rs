//! Concurrent pipeline substrate.
//!
//! This crate is the hard-correctness core of a modular string-processing
//! pipeline: a bounded, blocking, FIFO [`queue::BoundedQueue`] built on a
//! manual-reset [`monitor::Monitor`], plus the per-stage [`stage::Stage`]
//! consumer loop that drains a queue, applies a transform, forwards
//! downstream, and propagates the sentinel (`"<END>"`) that drives orderly
//! shutdown.
//!
//! It deliberately does not parse a command line, dynamically load plugin
//! objects, or read stdin - those concerns live in `pipeloom-abi` (the FFI
//! bridge for dynamically loaded stages) and the `analyzer` binary.

pub mod error;
pub mod monitor;
pub mod queue;
pub mod stage;

pub use error::{PipelineError, Result};
pub use monitor::Monitor;
pub use queue::BoundedQueue;
pub use stage::{Stage, Submit, Transform, SENTINEL};
