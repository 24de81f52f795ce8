//! Benchmark models for the PDMP simulation engine.
//!
//! - [`sparse_chain`]: `n` particles, one exponential-rate flip per
//!   adjacent pair. Cheap clocks, so it measures engine overhead.
//! - [`bouncy_chain`]: a bouncy particle sampler on a Gaussian chain,
//!   with one adaptive thinning clock per adjacent pair.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use pdmp_clocks::{AdaptiveThinning, ExponentialClock, Intensity};
use pdmp_core::{
    JumpKernel, ModelError, StateDependent, StateMut, StateView, VarId, VarList,
};
use pdmp_graph::Pdmp;
use pdmp_test_utils::{FlipVelocity, Particle};
use rand::RngCore;

/// `n` particles with one rate-`rate` velocity flip per adjacent pair.
///
/// # Panics
///
/// If `rate` is negative or not finite.
pub fn sparse_chain(n: usize, rate: f64) -> Pdmp<Particle> {
    let mut pdmp = Pdmp::new();
    let vars = place(&mut pdmp, n);
    for pair in vars.windows(2) {
        let clock = ExponentialClock::new(rate)
            .expect("rate must be finite and >= 0")
            .with_variables(pair.iter().copied());
        pdmp.add_jump(clock, FlipVelocity::new(pair.iter().copied()));
    }
    pdmp
}

/// Bouncy particle sampler for `U(x) = ½ Σ (x_i − x_{i+1})²`.
///
/// Each pair term gets its own thinning clock. A bounce reflects the
/// velocity off the pair's gradient, which for this potential swaps the
/// two velocities. A slow per-particle flip keeps the chain ergodic.
pub fn bouncy_chain(n: usize, rng: &mut dyn RngCore) -> Pdmp<Particle> {
    let mut pdmp = Pdmp::new();
    let vars = place(&mut pdmp, n);
    for pair in vars.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let clock = AdaptiveThinning::builder(PairEnergy { a, b })
            .initial_step(0.5)
            .build(rng)
            .expect("fixed thinning parameters are valid");
        pdmp.add_jump(clock, SwapVelocities { a, b });
    }
    for &v in &vars {
        let clock = ExponentialClock::new(0.1)
            .expect("fixed refresh rate is valid")
            .with_variables([v]);
        pdmp.add_jump(clock, FlipVelocity::new([v]));
    }
    pdmp
}

/// Alternating positions and velocities, so pair rates start nonzero.
fn place(pdmp: &mut Pdmp<Particle>, n: usize) -> Vec<VarId> {
    (0..n)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            pdmp.add_coordinate(Particle::new(0.1 * sign, sign))
        })
        .collect()
}

/// Bounce rate `max(0, ⟨∇U_ab, v⟩)` for one pair term.
///
/// Along the flow the gap grows linearly, so the rate is monotone in `t`.
struct PairEnergy {
    a: VarId,
    b: VarId,
}

impl StateDependent for PairEnergy {
    fn required_variables(&self) -> VarList {
        [self.a, self.b].into_iter().collect()
    }
}

impl Intensity<Particle> for PairEnergy {
    fn intensity(&self, state: &StateView<'_, Particle>, t: f64) -> Result<f64, ModelError> {
        let pa = state.require(self.a)?;
        let pb = state.require(self.b)?;
        let dv = pa.velocity - pb.velocity;
        let dx = pa.position - pb.position + dv * t;
        Ok((dx * dv).max(0.0))
    }
}

/// Reflection off the pair gradient: exchanges the two velocities.
struct SwapVelocities {
    a: VarId,
    b: VarId,
}

impl StateDependent for SwapVelocities {
    fn required_variables(&self) -> VarList {
        [self.a, self.b].into_iter().collect()
    }
}

impl JumpKernel<Particle> for SwapVelocities {
    fn simulate(
        &mut self,
        state: &mut StateMut<'_, Particle>,
        _rng: &mut dyn RngCore,
    ) -> Result<(), ModelError> {
        let va = state.require_mut(self.a)?.velocity;
        let vb = std::mem::replace(&mut state.require_mut(self.b)?.velocity, va);
        state.require_mut(self.a)?.velocity = vb;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdmp_core::{IndexSet, PdmpInstanceId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn sparse_chain_shape() {
        let pdmp = sparse_chain(10, 1.0);
        assert_eq!(pdmp.num_variables(), 10);
        assert_eq!(pdmp.num_jump_processes(), 9);
    }

    #[test]
    #[should_panic(expected = "rate must be finite")]
    fn sparse_chain_rejects_negative_rate() {
        sparse_chain(3, -1.0);
    }

    #[test]
    fn bouncy_chain_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pdmp = bouncy_chain(10, &mut rng);
        assert_eq!(pdmp.num_variables(), 10);
        assert_eq!(pdmp.num_jump_processes(), 19);
    }

    #[test]
    fn pair_rate_tracks_closing_gap() {
        let owner = PdmpInstanceId::next();
        let (a, b) = (VarId::new(owner, 0), VarId::new(owner, 1));
        let coords = [Particle::new(1.0, 1.0), Particle::new(0.0, -1.0)];
        let visible = IndexSet::all(2);
        let view = StateView::new(owner, &coords, &visible);
        let energy = PairEnergy { a, b };
        // Moving apart: dx = 1, dv = 2.
        assert_eq!(energy.intensity(&view, 0.0).unwrap(), 2.0);
        assert_eq!(energy.intensity(&view, 1.0).unwrap(), 6.0);
    }

    #[test]
    fn swap_exchanges_velocities() {
        let owner = PdmpInstanceId::next();
        let (a, b) = (VarId::new(owner, 0), VarId::new(owner, 1));
        let mut coords = [Particle::new(0.0, 1.0), Particle::new(0.0, -3.0)];
        let writable = IndexSet::all(2);
        let mut state = StateMut::new(owner, &mut coords, &writable);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        SwapVelocities { a, b }.simulate(&mut state, &mut rng).unwrap();
        assert_eq!(coords[0].velocity, -3.0);
        assert_eq!(coords[1].velocity, 1.0);
    }
}
