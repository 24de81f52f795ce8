//! Run statistics for the simulator.
//!
//! [`SimulationStats`] accumulates over the lifetime of a
//! [`Simulator`](crate::Simulator); [`RunSummary`] describes one
//! [`simulate`](crate::Simulator::simulate) call.

use std::fmt;

/// Counters accumulated across every `simulate` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationStats {
    /// Events removed from the queue.
    pub queue_polls: u64,
    /// Confirmed jumps (kernels executed).
    pub jumps: u64,
    /// Lower-bound checkpoints re-evaluated without a jump.
    pub bound_refreshes: u64,
    /// Calls to any clock's `next`.
    pub clock_evaluations: u64,
    /// Scheduled times moved forward to break a tie.
    pub nudged_events: u64,
    /// Chunks started.
    pub chunks: u64,
    /// Total stochastic time simulated.
    pub stochastic_time: f64,
}

/// Why a `simulate` call returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The requested stochastic time was reached, or no process will
    /// ever fire again.
    StochasticTime,
    /// The wall-clock budget ran out.
    WallClock,
    /// The queue-poll budget ran out.
    QueuePolls,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StochasticTime => write!(f, "stochastic time"),
            Self::WallClock => write!(f, "wall clock"),
            Self::QueuePolls => write!(f, "queue polls"),
        }
    }
}

/// Outcome of one `simulate` call.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Stochastic time simulated by this call.
    pub elapsed: f64,
    /// Which budget ended the run.
    pub stop: StopReason,
    /// Queue polls performed by this call.
    pub queue_polls: u64,
    /// Jumps confirmed by this call.
    pub jumps: u64,
    /// Wall-clock duration of this call, in microseconds.
    pub wall_clock_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = SimulationStats::default();
        assert_eq!(s.queue_polls, 0);
        assert_eq!(s.jumps, 0);
        assert_eq!(s.bound_refreshes, 0);
        assert_eq!(s.clock_evaluations, 0);
        assert_eq!(s.nudged_events, 0);
        assert_eq!(s.chunks, 0);
        assert_eq!(s.stochastic_time, 0.0);
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(StopReason::WallClock.to_string(), "wall clock");
        assert_eq!(StopReason::QueuePolls.to_string(), "queue polls");
    }
}
