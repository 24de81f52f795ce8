//! Reusable model fixtures.
//!
//! - [`Particle`]: position/velocity pair under linear flow.
//! - [`Stopwatch`]: a coordinate that is just elapsed time.
//! - [`ExponentialTestClock`]: exact exponential waiting times.
//! - [`FixedDelayClock`]: the same [`DeltaTime`] on every call.
//! - [`FailingClock`]: fails deterministically after N calls.
//! - [`FlipVelocity`] / [`NoopKernel`]: kernels.
//! - [`SegmentRecorder`]: processor logging every closed segment.

use std::sync::{Arc, Mutex};

use pdmp_core::{
    Clock, Coordinate, DeltaTime, JumpKernel, ModelError, Processor, StateDependent, StateMut,
    StateView, Trigger, VarId, VarList,
};
use rand::{Rng, RngCore};

// ── Coordinates ─────────────────────────────────────────────────────

/// One-dimensional particle: `position += delta * velocity`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: f64,
    pub velocity: f64,
}

impl Particle {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }
}

impl Coordinate for Particle {
    fn extrapolate(&mut self, delta: f64) {
        self.position += delta * self.velocity;
    }
}

/// Time elapsed since construction or the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stopwatch {
    pub elapsed: f64,
}

impl Coordinate for Stopwatch {
    fn extrapolate(&mut self, delta: f64) {
        self.elapsed += delta;
    }
}

// ── Clocks ──────────────────────────────────────────────────────────

/// Homogeneous Poisson clock: always `Exact(Exp(rate))`.
///
/// Declares `vars` without reading them, to shape the dependency graph.
pub struct ExponentialTestClock {
    pub rate: f64,
    vars: VarList,
}

impl ExponentialTestClock {
    pub fn new(rate: f64, vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            rate,
            vars: vars.into_iter().collect(),
        }
    }
}

impl StateDependent for ExponentialTestClock {
    fn required_variables(&self) -> VarList {
        self.vars.clone()
    }
}

impl<C> Clock<C> for ExponentialTestClock {
    fn next(
        &mut self,
        _state: &StateView<'_, C>,
        rng: &mut dyn RngCore,
    ) -> Result<DeltaTime, ModelError> {
        let u: f64 = rng.random();
        Ok(DeltaTime::exact(-(1.0 - u).ln() / self.rate))
    }
}

/// Returns the same proposal on every call.
pub struct FixedDelayClock {
    pub delta: DeltaTime,
    vars: VarList,
}

impl FixedDelayClock {
    pub fn new(delta: DeltaTime, vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            delta,
            vars: vars.into_iter().collect(),
        }
    }
}

impl StateDependent for FixedDelayClock {
    fn required_variables(&self) -> VarList {
        self.vars.clone()
    }
}

impl<C> Clock<C> for FixedDelayClock {
    fn next(
        &mut self,
        _state: &StateView<'_, C>,
        _rng: &mut dyn RngCore,
    ) -> Result<DeltaTime, ModelError> {
        Ok(self.delta)
    }
}

/// Succeeds with `Exact(delay)` for `succeed_count` calls, then fails.
pub struct FailingClock {
    pub delay: f64,
    pub succeed_count: usize,
    calls: usize,
}

impl FailingClock {
    pub fn new(delay: f64, succeed_count: usize) -> Self {
        Self {
            delay,
            succeed_count,
            calls: 0,
        }
    }
}

impl StateDependent for FailingClock {
    fn required_variables(&self) -> VarList {
        VarList::new()
    }
}

impl<C> Clock<C> for FailingClock {
    fn next(
        &mut self,
        _state: &StateView<'_, C>,
        _rng: &mut dyn RngCore,
    ) -> Result<DeltaTime, ModelError> {
        self.calls += 1;
        if self.calls > self.succeed_count {
            return Err(ModelError::ExecutionFailed {
                reason: format!("failing clock tripped on call {}", self.calls),
            });
        }
        Ok(DeltaTime::exact(self.delay))
    }
}

// ── Kernels ─────────────────────────────────────────────────────────

/// Negates the velocity of every declared particle.
pub struct FlipVelocity {
    vars: VarList,
}

impl FlipVelocity {
    pub fn new(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            vars: vars.into_iter().collect(),
        }
    }
}

impl StateDependent for FlipVelocity {
    fn required_variables(&self) -> VarList {
        self.vars.clone()
    }
}

impl JumpKernel<Particle> for FlipVelocity {
    fn simulate(
        &mut self,
        state: &mut StateMut<'_, Particle>,
        _rng: &mut dyn RngCore,
    ) -> Result<(), ModelError> {
        for &var in &self.vars {
            let p = state.require_mut(var)?;
            p.velocity = -p.velocity;
        }
        Ok(())
    }
}

/// Declares variables but leaves them untouched.
pub struct NoopKernel {
    vars: VarList,
}

impl NoopKernel {
    pub fn new(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            vars: vars.into_iter().collect(),
        }
    }
}

impl StateDependent for NoopKernel {
    fn required_variables(&self) -> VarList {
        self.vars.clone()
    }
}

impl<C> JumpKernel<C> for NoopKernel {
    fn simulate(
        &mut self,
        _state: &mut StateMut<'_, C>,
        _rng: &mut dyn RngCore,
    ) -> Result<(), ModelError> {
        Ok(())
    }
}

// ── Processors ──────────────────────────────────────────────────────

/// One closed deterministic segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub delta: f64,
    pub trigger: Trigger,
}

/// Shared handle to the segments seen by a [`SegmentRecorder`].
///
/// Clones share the same log, so the test keeps one while the
/// simulator owns the recorder.
#[derive(Clone, Debug, Default)]
pub struct SegmentLog(Arc<Mutex<Vec<Segment>>>);

impl SegmentLog {
    fn push(&self, segment: Segment) {
        self.0.lock().expect("segment log poisoned").push(segment);
    }

    /// Copy of every segment, in call order.
    pub fn segments(&self) -> Vec<Segment> {
        self.0.lock().expect("segment log poisoned").clone()
    }

    /// Sum of all segment lengths.
    pub fn total(&self) -> f64 {
        self.segments().iter().map(|s| s.delta).sum()
    }

    pub fn len(&self) -> usize {
        self.0.lock().expect("segment log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cumulative end time of each segment.
    pub fn commit_times(&self) -> Vec<f64> {
        let mut t = 0.0;
        self.segments()
            .iter()
            .map(|s| {
                t += s.delta;
                t
            })
            .collect()
    }

    /// Number of segments closed by a jump rather than a flush.
    pub fn jump_count(&self) -> usize {
        self.segments()
            .iter()
            .filter(|s| matches!(s.trigger, Trigger::Jump(_)))
            .count()
    }
}

/// Processor appending every `(delta, trigger)` to a [`SegmentLog`].
pub struct SegmentRecorder {
    vars: VarList,
    log: SegmentLog,
}

impl SegmentRecorder {
    /// A recorder observing `var`, plus the handle to its log.
    pub fn new(var: VarId) -> (Self, SegmentLog) {
        Self::observing([var])
    }

    /// A recorder with an arbitrary declaration, for arity tests.
    pub fn observing(vars: impl IntoIterator<Item = VarId>) -> (Self, SegmentLog) {
        let log = SegmentLog::default();
        let recorder = Self {
            vars: vars.into_iter().collect(),
            log: log.clone(),
        };
        (recorder, log)
    }
}

impl StateDependent for SegmentRecorder {
    fn required_variables(&self) -> VarList {
        self.vars.clone()
    }
}

impl<C> Processor<C> for SegmentRecorder {
    fn process(&mut self, _coordinate: &C, delta: f64, trigger: Trigger) {
        self.log.push(Segment { delta, trigger });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdmp_core::JumpId;

    #[test]
    fn particle_flow_is_linear() {
        let mut p = Particle::new(1.0, -2.0);
        p.extrapolate(0.5);
        assert_eq!(p.position, 0.0);
        p.extrapolate(-0.5);
        assert_eq!(p.position, 1.0);
    }

    #[test]
    fn log_accumulates() {
        let log = SegmentLog::default();
        log.push(Segment {
            delta: 1.0,
            trigger: Trigger::Jump(JumpId(0)),
        });
        log.push(Segment {
            delta: 0.5,
            trigger: Trigger::Flush,
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.total(), 1.5);
        assert_eq!(log.commit_times(), vec![1.0, 1.5]);
        assert_eq!(log.jump_count(), 1);
    }
}
