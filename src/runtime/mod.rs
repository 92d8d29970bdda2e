//! The in-process run driver.
//!
//! Wires a [`Supervisor`](crate::supervisor::Supervisor) and a set of
//! [`WorkerActor`](crate::worker::WorkerActor)s over tokio channels and
//! runs the whole exploration to an outcome. This is the reference
//! controller implementation; pipe- or socket-backed transports live
//! outside this crate but speak the same messages.

mod local;

pub use local::{
    explore, explore_with_abort, explore_with_checkpoint_file, LocalOutcome, RuntimeError,
};
