//! Proposed event times and segment triggers.

use std::fmt;

use crate::id::JumpId;

/// A clock's proposal for the time until its next event, measured from
/// the current logical time.
///
/// The distinction between the two variants is what lets clocks use
/// thinning: a [`LowerBound`](DeltaTime::LowerBound) is only a checkpoint
/// at which the engine re-asks the clock, never an event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeltaTime {
    /// Under deterministic continuation the process fires after exactly
    /// this much time.
    Exact(f64),
    /// No event happens before this much time has elapsed; the clock must
    /// be re-evaluated there.
    LowerBound(f64),
}

impl DeltaTime {
    /// An exact event `delta` from now.
    pub fn exact(delta: f64) -> Self {
        Self::Exact(delta)
    }

    /// A re-evaluation checkpoint `delta` from now.
    pub fn lower_bound(delta: f64) -> Self {
        Self::LowerBound(delta)
    }

    /// The process never fires under the current state.
    ///
    /// Nothing is scheduled; the clock is re-asked only if a kernel
    /// changes one of its variables.
    pub fn never() -> Self {
        Self::Exact(f64::INFINITY)
    }

    /// The proposed time offset, regardless of variant.
    pub fn value(&self) -> f64 {
        match *self {
            Self::Exact(t) | Self::LowerBound(t) => t,
        }
    }

    /// Whether this proposal is only a lower bound.
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, Self::LowerBound(_))
    }

    /// Whether the offset is usable for scheduling: non-negative and not
    /// NaN. Positive infinity is valid and means "never".
    pub fn is_valid(&self) -> bool {
        let t = self.value();
        !t.is_nan() && t >= 0.0
    }
}

impl fmt::Display for DeltaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(t) => write!(f, "exact({t})"),
            Self::LowerBound(t) => write!(f, "lower-bound({t})"),
        }
    }
}

/// What closed a coordinate's deterministic segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A confirmed jump of this process is about to modify the coordinate.
    Jump(JumpId),
    /// The simulation stopped (chunk end, queue exhausted, or budget hit)
    /// and every open segment was flushed.
    Flush,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jump(j) => write!(f, "jump {j}"),
            Self::Flush => write!(f, "flush"),
        }
    }
}
