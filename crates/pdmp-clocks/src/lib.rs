//! Reference clocks for PDMP simulation.
//!
//! - [`AdaptiveThinning`] samples an inhomogeneous Poisson process from an
//!   [`Intensity`] by thinning against a locally adapted constant bound.
//!   This is the clock behind bouncy-particle style samplers.
//! - [`ExponentialClock`] fires at a constant rate.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod exponential;
pub mod thinning;

pub use exponential::ExponentialClock;
pub use thinning::{
    AdaptiveThinning, AdaptiveThinningBuilder, Intensity, ThinningStats, HIGH_EXPECTED, JITTER,
    LOW_EXPECTED,
};
