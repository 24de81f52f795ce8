//! PDMP model assembly and dependency-graph compilation.
//!
//! [`Pdmp`] is the mutable model the modelling layer fills with
//! coordinates, jump processes and processors. [`DependencyGraph::compile`]
//! runs once against a finished model, validates every declaration, and
//! produces the sparse lookup tables the simulator consults on each event.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compile;
pub mod model;

pub use compile::{DependencyGraph, Entity, GraphError};
pub use model::{JumpProcess, Pdmp, PdmpMut};
