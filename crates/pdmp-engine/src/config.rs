//! Simulator configuration, stopping criteria, and error types.
//!
//! [`SimulatorConfig`] is fixed when a [`Simulator`](crate::Simulator) is
//! built; [`StoppingCriteria`] is passed per
//! [`simulate`](crate::Simulator::simulate) call. Both validate eagerly so
//! that bad values fail before any clock is evaluated.

use std::error::Error;
use std::fmt;

use pdmp_graph::GraphError;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building a simulator or starting a run.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The model's variable declarations are inconsistent.
    Graph(GraphError),
    /// `max_chunk_length` is NaN, infinite, zero, or negative.
    InvalidChunkLength {
        /// The invalid value.
        value: f64,
    },
    /// `stochastic_time` is NaN or negative.
    InvalidStoppingTime {
        /// The invalid value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "dependency graph: {e}"),
            Self::InvalidChunkLength { value } => {
                write!(f, "max_chunk_length must be finite and positive, got {value}")
            }
            Self::InvalidStoppingTime { value } => {
                write!(f, "stochastic_time must be non-negative, got {value}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GraphError> for ConfigError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

// ── SimulatorConfig ────────────────────────────────────────────────

/// Construction-time settings for a [`Simulator`](crate::Simulator).
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorConfig {
    /// Longest stretch of stochastic time simulated before the queue and
    /// commit times are reinitialized. Keeps chunk-local times small so
    /// that absolute-time roundoff stays bounded. Default: 1000.0.
    pub max_chunk_length: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: 1000.0,
        }
    }
}

impl SimulatorConfig {
    /// Check that every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = self.max_chunk_length;
        if !v.is_finite() || v <= 0.0 {
            return Err(ConfigError::InvalidChunkLength { value: v });
        }
        Ok(())
    }
}

// ── StoppingCriteria ───────────────────────────────────────────────

/// Budgets for one [`simulate`](crate::Simulator::simulate) call.
///
/// The run ends as soon as any one budget is spent. The defaults are
/// unbounded, so at least one budget should be set.
#[derive(Clone, Debug, PartialEq)]
pub struct StoppingCriteria {
    /// Stochastic time to simulate. Default: `f64::INFINITY`.
    pub stochastic_time: f64,
    /// Wall-clock budget in milliseconds. Default: `u64::MAX`.
    pub wall_clock_millis: u64,
    /// Maximum number of events polled from the queue. Default: `u64::MAX`.
    pub max_queue_polls: u64,
}

impl Default for StoppingCriteria {
    fn default() -> Self {
        Self {
            stochastic_time: f64::INFINITY,
            wall_clock_millis: u64::MAX,
            max_queue_polls: u64::MAX,
        }
    }
}

impl StoppingCriteria {
    /// Simulate exactly `stochastic_time` units, with no other budget.
    pub fn for_time(stochastic_time: f64) -> Self {
        Self {
            stochastic_time,
            ..Self::default()
        }
    }

    /// Also stop after `millis` milliseconds of wall-clock time.
    pub fn with_wall_clock_millis(mut self, millis: u64) -> Self {
        self.wall_clock_millis = millis;
        self
    }

    /// Also stop after `polls` queue polls.
    pub fn with_max_queue_polls(mut self, polls: u64) -> Self {
        self.max_queue_polls = polls;
        self
    }

    /// Check that the stochastic horizon is usable.
    ///
    /// `+∞` is allowed; the run then ends on another budget or when every
    /// clock reports that it will never fire.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.stochastic_time;
        if t.is_nan() || t < 0.0 {
            return Err(ConfigError::InvalidStoppingTime { value: t });
        }
        Ok(())
    }
}
