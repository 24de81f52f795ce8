//! Plug-in traits implemented by model code.
//!
//! A PDMP is assembled from four kinds of objects: [`Coordinate`]s (state
//! with a deterministic flow), [`Clock`]s and [`JumpKernel`]s (paired into
//! jump processes), and [`Processor`]s (observers of completed segments).
//! All of them except coordinates are [`StateDependent`]: they declare once
//! which coordinates they touch, and the engine compiles its sparse update
//! tables from those declarations.

use rand::RngCore;

use crate::delta::{DeltaTime, Trigger};
use crate::error::ModelError;
use crate::id::VarList;
use crate::state::{StateMut, StateView};

/// A unit of mutable state with an in-place deterministic flow.
///
/// # Contract
///
/// `extrapolate(dt)` followed by `extrapolate(-dt)` must restore the
/// original state up to floating-point roundoff. The engine relies on
/// this to undo speculative updates.
pub trait Coordinate: Send + 'static {
    /// Advance the state along its flow by `delta` (which may be negative).
    fn extrapolate(&mut self, delta: f64);
}

/// An object whose behaviour depends on a fixed set of coordinates.
pub trait StateDependent {
    /// The coordinates this object reads or writes, without repetition.
    ///
    /// Called once when the dependency graph is compiled; the answer must
    /// not change afterwards.
    fn required_variables(&self) -> VarList;
}

/// Proposes the time of the next event of one jump process.
///
/// # Examples
///
/// A clock firing at a constant rate, independent of any state:
///
/// ```
/// use pdmp_core::{Clock, DeltaTime, ModelError, StateDependent, StateView, VarList};
/// use rand::{Rng, RngCore};
///
/// struct Poisson { rate: f64 }
///
/// impl StateDependent for Poisson {
///     fn required_variables(&self) -> VarList { VarList::new() }
/// }
///
/// impl Clock<f64> for Poisson {
///     fn next(
///         &mut self,
///         _state: &StateView<'_, f64>,
///         rng: &mut dyn RngCore,
///     ) -> Result<DeltaTime, ModelError> {
///         let u: f64 = rng.random();
///         Ok(DeltaTime::exact(-(1.0 - u).ln() / self.rate))
///     }
/// }
///
/// assert!(Poisson { rate: 2.0 }.required_variables().is_empty());
/// ```
pub trait Clock<C>: StateDependent + Send + 'static {
    /// Sample the time until the next candidate event, given the current
    /// (up-to-date) values of the declared coordinates.
    fn next(&mut self, state: &StateView<'_, C>, rng: &mut dyn RngCore)
        -> Result<DeltaTime, ModelError>;
}

/// The instantaneous state change applied when a jump is confirmed.
pub trait JumpKernel<C>: StateDependent + Send + 'static {
    /// Transform the declared coordinates in place.
    fn simulate(&mut self, state: &mut StateMut<'_, C>, rng: &mut dyn RngCore)
        -> Result<(), ModelError>;
}

/// Observer of the deterministic segments of one coordinate.
///
/// `required_variables()` must name exactly one coordinate. The engine
/// calls [`process`](Processor::process) every time a segment of that
/// coordinate closes, in time order.
pub trait Processor<C>: StateDependent + Send + 'static {
    /// A segment of length `delta` has closed. `coordinate` holds the
    /// state at the start of the segment; `trigger` says what closed it.
    fn process(&mut self, coordinate: &C, delta: f64, trigger: Trigger);
}
