//! Core types and traits for PDMP simulation.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the abstractions every other crate in the workspace builds on:
//! handles, index sets, proposed event times, scoped state access,
//! error types, and the plug-in traits implemented by model code.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod delta;
pub mod error;
pub mod id;
pub mod index;
pub mod state;
pub mod traits;

pub use delta::{DeltaTime, Trigger};
pub use error::ModelError;
pub use id::{JumpId, PdmpInstanceId, ProcessorId, VarId, VarList};
pub use index::{IndexSet, IndexSetIter};
pub use state::{StateMut, StateView};
pub use traits::{Clock, Coordinate, JumpKernel, Processor, StateDependent};
