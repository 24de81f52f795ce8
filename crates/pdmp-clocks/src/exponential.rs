//! Homogeneous Poisson clock.

use pdmp_core::{Clock, DeltaTime, ModelError, StateDependent, StateView, VarId, VarList};
use rand::{Rng, RngCore};

/// Draw from `Exp(rate)` by inversion. `rate` must be positive.
///
/// `1 - u` lies in `(0, 1]`, so the logarithm is finite.
pub(crate) fn sample_exponential(rng: &mut dyn RngCore, rate: f64) -> f64 {
    let u: f64 = rng.random();
    -(1.0 - u).ln() / rate
}

/// A clock firing at a constant rate, independent of state.
///
/// Always returns an exact proposal, so the simulator never has to
/// refresh it. A rate of zero means the process never fires.
///
/// The declared variables only shape the dependency graph: listing a
/// coordinate makes the clock resample whenever a jump modifies it.
#[derive(Clone, Debug)]
pub struct ExponentialClock {
    rate: f64,
    vars: VarList,
}

impl ExponentialClock {
    /// A clock with the given rate and no declared variables.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `rate` is negative, NaN or infinite.
    pub fn new(rate: f64) -> Result<Self, String> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(format!("rate must be finite and >= 0, got {rate}"));
        }
        Ok(Self {
            rate,
            vars: VarList::new(),
        })
    }

    /// Declare the coordinates whose jumps should resample this clock.
    pub fn with_variables(mut self, vars: impl IntoIterator<Item = VarId>) -> Self {
        self.vars = vars.into_iter().collect();
        self
    }

    /// Events per unit time.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl StateDependent for ExponentialClock {
    fn required_variables(&self) -> VarList {
        self.vars.clone()
    }
}

impl<C> Clock<C> for ExponentialClock {
    fn next(
        &mut self,
        _state: &StateView<'_, C>,
        rng: &mut dyn RngCore,
    ) -> Result<DeltaTime, ModelError> {
        if self.rate == 0.0 {
            return Ok(DeltaTime::never());
        }
        Ok(DeltaTime::exact(sample_exponential(rng, self.rate)))
    }
}
