//! The worker engine.
//!
//! A worker drives the stepper over one assigned workload at a time and
//! answers the supervisor's control requests between steps. The engine is
//! layered:
//!
//! - [`WorkerCore`] is the synchronous state machine: start a workload,
//!   take one step, compute progress updates, carve off stolen workloads.
//!   It has no channels and no runtime, which is what the deterministic
//!   scheduler tests drive directly.
//! - [`WorkerActor`] wraps a core in a tokio task: it runs bounded step
//!   batches, drains its FIFO request channel between batches and at every
//!   yield instruction, catches user-code panics, and reports everything
//!   over its outbound channel.

mod actor;
mod core;

pub use actor::{WorkerActor, DEFAULT_STEPS_BETWEEN_POLLS};
pub use core::{WorkerCore, WorkerStep};

use crate::tree::WalkError;
use thiserror::Error;

/// Errors from driving a worker core.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// A workload was started while another one was active.
    #[error("worker already has a workload")]
    AlreadyHasWorkload,

    /// Walking or stepping the tree failed.
    #[error(transparent)]
    Walk(#[from] WalkError),
}
