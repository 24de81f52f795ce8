//! Event-driven simulator for piecewise deterministic Markov processes.
//!
//! [`Simulator`] freezes a [`Pdmp`](pdmp_graph::Pdmp), compiles its
//! dependency graph once, and then simulates it exactly: between events
//! every coordinate follows its deterministic flow, and only the sparse
//! neighbourhood of each event is brought up to date.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod queue;
pub mod simulator;

pub use config::{ConfigError, SimulatorConfig, StoppingCriteria};
pub use metrics::{RunSummary, SimulationStats, StopReason};
pub use queue::{EventQueue, QueueError, NUDGE_EPSILON};
pub use simulator::{SimulationError, Simulator};
