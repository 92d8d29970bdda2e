//! treesweep — parallel exhaustive exploration of lazy search trees.
//!
//! A user program describes a potentially astronomical search space as a
//! lazy binary choice tree ([`tree`]); treesweep distributes its
//! exploration across workers, steals unexplored sub-trees between them,
//! folds leaf results through a user-supplied associative combiner, and
//! checkpoints progress durably so interrupted runs resume.
//!
//! # High-level API
//!
//! ```ignore
//! use treesweep::mode::AllMode;
//! use treesweep::progress::Sum;
//! use treesweep::config::ExplorationSettings;
//! use treesweep::runtime::explore;
//! use treesweep::tree::{balanced_choice, Tree};
//!
//! let source = || balanced_choice((1..=100).map(Sum).collect());
//! let outcome = explore(
//!     AllMode::<Sum>::new(),
//!     source,
//!     ExplorationSettings::with_workers(4),
//! ).await?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        runtime                              │
//! │  event loop: worker messages, update ticks, abort           │
//! ├────────────────────────────────────────────────────────────┤
//! │                       supervisor                            │
//! │  workers, workloads, stealing policy, progress, outcome     │
//! ├───────────────────────┬────────────────────────────────────┤
//! │      worker (actor)   │  messages over FIFO channels        │
//! │      worker (core)    │  stepper + checkpoint algebra       │
//! ├───────────────────────┴────────────────────────────────────┤
//! │        tree · path · checkpoint · stepper · progress        │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The supervisor is a serial state machine behind the
//! [`supervisor::SupervisorController`] callback trait; the bundled
//! [`runtime`] drives it over in-process tokio channels, and the same
//! message shapes ([`message`]) work over any reliable FIFO transport.

pub mod checkpoint;
pub mod config;
pub mod logging;
pub mod message;
pub mod mode;
pub mod path;
pub mod persist;
pub mod progress;
pub mod runtime;
pub mod stats;
pub mod stepper;
pub mod supervisor;
pub mod tree;
pub mod worker;
pub mod workload;

/// Version of the treesweep library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
