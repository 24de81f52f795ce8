//! Errors raised by model-layer plug-ins.
//!
//! Clocks and kernels return [`ModelError`]; the simulator wraps it with
//! the failing jump process and aborts the run. Configuration and engine
//! errors live next to the code that detects them (`pdmp-graph`,
//! `pdmp-engine`).

use std::error::Error;
use std::fmt;

use crate::id::VarId;

/// Failure inside a [`Clock`](crate::Clock) or
/// [`JumpKernel`](crate::JumpKernel).
///
/// Always fatal: the engine does not interpret or retry these.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// The plug-in's own computation failed (e.g. a root finder could not
    /// bracket an interval).
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The plug-in asked for a coordinate it did not declare in
    /// `required_variables()`.
    UndeclaredVariable {
        /// The handle that was requested.
        var: VarId,
    },
    /// A quantity that must be finite and non-negative was not.
    NonFinite {
        /// What was being computed.
        quantity: &'static str,
        /// The offending value.
        value: f64,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::UndeclaredVariable { var } => {
                write!(f, "variable {var} was not declared as required")
            }
            Self::NonFinite { quantity, value } => {
                write!(f, "{quantity} must be finite and non-negative, got {value}")
            }
        }
    }
}

impl Error for ModelError {}
