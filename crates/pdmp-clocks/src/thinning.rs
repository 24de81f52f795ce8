//! Adaptive-bound thinning clock.
//!
//! Samples the first event of an inhomogeneous Poisson process with
//! intensity `λ(t)` by thinning: propose from a homogeneous process with a
//! constant rate that dominates `λ` over a short window, then accept each
//! proposal with probability `λ(τ) / rate`.
//!
//! The window ("step") adapts between calls so that the expected number of
//! proposals per window stays in `[LOW_EXPECTED, HIGH_EXPECTED]`. Too short
//! a window wastes clock evaluations on checkpoints; too long a window makes
//! the bound loose and wastes them on rejections.
//!
//! # Precondition
//!
//! Over any window `[0, step]` the intensity must be bounded by
//! `max(λ(0), λ(step))`. This holds for monotone and for convex
//! intensities, which covers the bouncy particle sampler on log-concave
//! targets. It is not checked.
//!
//! Constructed via the builder pattern: [`AdaptiveThinning::builder`].

use pdmp_core::{Clock, DeltaTime, ModelError, StateDependent, StateView, VarList};
use rand::{Rng, RngCore};

use crate::exponential::sample_exponential;

/// Lower end of the target band for `rate * step`.
pub const LOW_EXPECTED: f64 = 0.5;

/// Upper end of the target band for `rate * step`.
pub const HIGH_EXPECTED: f64 = 2.0;

/// Relative jitter applied once to the initial step, so that many clocks
/// built with the same settings do not propose checkpoints in lockstep.
pub const JITTER: f64 = 0.1;

/// Maximum doublings or halvings of the step in a single call.
const MAX_ADAPTATIONS: u32 = 5;

/// An intensity function evaluated along the deterministic flow.
///
/// `state` holds the declared coordinates at the current time; `t` is an
/// offset into the future. Implementations typically extrapolate a copy of
/// the coordinates by `t` and evaluate a rate there.
pub trait Intensity<C>: StateDependent + Send + 'static {
    /// `λ(t)`: the event rate `t` time units from now.
    fn intensity(&self, state: &StateView<'_, C>, t: f64) -> Result<f64, ModelError>;
}

/// Counters for tuning a thinning clock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThinningStats {
    /// Candidate times drawn inside the window.
    pub proposals: u64,
    /// Candidates accepted as exact events.
    pub acceptances: u64,
    /// Candidates rejected (returned as lower bounds).
    pub rejections: u64,
    /// Draws that fell past the window.
    pub window_misses: u64,
}

/// Thinning clock with a self-tuning proposal window.
///
/// Returns [`DeltaTime::Exact`] only for accepted proposals; every other
/// outcome is a [`DeltaTime::LowerBound`] the simulator re-evaluates.
#[derive(Debug)]
pub struct AdaptiveThinning<I> {
    intensity: I,
    step: f64,
    max_step: f64,
    stats: ThinningStats,
}

/// Builder for [`AdaptiveThinning`].
pub struct AdaptiveThinningBuilder<I> {
    intensity: I,
    initial_step: f64,
    max_step: f64,
}

impl<I> AdaptiveThinning<I> {
    /// Create a new builder around `intensity`.
    pub fn builder(intensity: I) -> AdaptiveThinningBuilder<I> {
        AdaptiveThinningBuilder {
            intensity,
            initial_step: 1.0,
            max_step: 1e6,
        }
    }

    /// The current proposal window.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Counters accumulated since construction.
    pub fn stats(&self) -> &ThinningStats {
        &self.stats
    }

    /// The wrapped intensity.
    pub fn intensity(&self) -> &I {
        &self.intensity
    }
}

impl<I> AdaptiveThinningBuilder<I> {
    /// Set the nominal first window (default: 1.0). Must be finite and > 0.
    pub fn initial_step(mut self, step: f64) -> Self {
        self.initial_step = step;
        self
    }

    /// Set the largest window the clock may grow to (default: 1e6).
    ///
    /// Caps growth while the intensity is identically zero.
    pub fn max_step(mut self, step: f64) -> Self {
        self.max_step = step;
        self
    }

    /// Build the clock, drawing its one-time jitter from `rng`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if either step is not finite and positive, or if
    /// `initial_step` exceeds `max_step`.
    pub fn build(self, rng: &mut dyn RngCore) -> Result<AdaptiveThinning<I>, String> {
        let s = self.initial_step;
        if !s.is_finite() || s <= 0.0 {
            return Err(format!("initial_step must be finite and > 0, got {s}"));
        }
        let m = self.max_step;
        if !m.is_finite() || m <= 0.0 {
            return Err(format!("max_step must be finite and > 0, got {m}"));
        }
        if s > m {
            return Err(format!("initial_step ({s}) exceeds max_step ({m})"));
        }
        let u: f64 = rng.random();
        Ok(AdaptiveThinning {
            intensity: self.intensity,
            step: (s * (1.0 + JITTER * u)).min(m),
            max_step: m,
            stats: ThinningStats::default(),
        })
    }
}

impl<I> AdaptiveThinning<I> {
    fn rate_at<C>(&self, state: &StateView<'_, C>, t: f64) -> Result<f64, ModelError>
    where
        I: Intensity<C>,
    {
        let value = self.intensity.intensity(state, t)?;
        if !value.is_finite() || value < 0.0 {
            return Err(ModelError::NonFinite {
                quantity: "intensity",
                value,
            });
        }
        Ok(value)
    }

    /// Grow or shrink the window until `rate * step` is in band, and
    /// return the dominating rate for the final window.
    fn adapt<C>(&mut self, state: &StateView<'_, C>, at_zero: f64) -> Result<f64, ModelError>
    where
        I: Intensity<C>,
    {
        let mut rate = at_zero.max(self.rate_at(state, self.step)?);
        let expected = rate * self.step;

        if expected < LOW_EXPECTED {
            for _ in 0..MAX_ADAPTATIONS {
                let wider = self.step * 2.0;
                if wider > self.max_step {
                    break;
                }
                let wider_rate = at_zero.max(self.rate_at(state, wider)?);
                if wider_rate * wider > HIGH_EXPECTED {
                    // Overshot the band: stay one halving back.
                    break;
                }
                self.step = wider;
                rate = wider_rate;
                if rate * self.step >= LOW_EXPECTED {
                    break;
                }
            }
        } else if expected > HIGH_EXPECTED {
            for _ in 0..MAX_ADAPTATIONS {
                self.step *= 0.5;
                rate = at_zero.max(self.rate_at(state, self.step)?);
                if rate * self.step <= HIGH_EXPECTED {
                    break;
                }
            }
        }
        Ok(rate)
    }
}

impl<I: StateDependent> StateDependent for AdaptiveThinning<I> {
    fn required_variables(&self) -> VarList {
        self.intensity.required_variables()
    }
}

impl<C, I> Clock<C> for AdaptiveThinning<I>
where
    I: Intensity<C>,
{
    fn next(
        &mut self,
        state: &StateView<'_, C>,
        rng: &mut dyn RngCore,
    ) -> Result<DeltaTime, ModelError> {
        let at_zero = self.rate_at(state, 0.0)?;
        let rate = self.adapt(state, at_zero)?;
        if rate == 0.0 {
            self.stats.window_misses += 1;
            return Ok(DeltaTime::lower_bound(self.step));
        }

        let tau = sample_exponential(rng, rate);
        if tau > self.step {
            self.stats.window_misses += 1;
            return Ok(DeltaTime::lower_bound(self.step));
        }

        self.stats.proposals += 1;
        let at_tau = self.rate_at(state, tau)?;
        let u: f64 = rng.random();
        if u * rate < at_tau {
            self.stats.acceptances += 1;
            Ok(DeltaTime::exact(tau))
        } else {
            self.stats.rejections += 1;
            Ok(DeltaTime::lower_bound(tau))
        }
    }
}
