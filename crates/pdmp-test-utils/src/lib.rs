//! Test fixtures for PDMP development.
//!
//! Provides small coordinate types with closed-form flows, clocks with
//! known behaviour, a velocity-flip kernel, and a [`SegmentRecorder`]
//! processor whose log can be inspected after the simulator is gone.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    ExponentialTestClock, FailingClock, FixedDelayClock, FlipVelocity, NoopKernel, Particle,
    Segment, SegmentLog, SegmentRecorder, Stopwatch,
};
