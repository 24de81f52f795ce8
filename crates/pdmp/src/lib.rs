//! Exact event-driven simulation of piecewise deterministic Markov
//! processes (PDMPs), the machinery behind bouncy-particle style samplers.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use pdmp::prelude::*;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! // A particle drifting along a line.
//! struct Particle { position: f64, velocity: f64 }
//! impl Coordinate for Particle {
//!     fn extrapolate(&mut self, delta: f64) {
//!         self.position += delta * self.velocity;
//!     }
//! }
//!
//! // Reverses the particle when the jump fires.
//! struct Flip(VarId);
//! impl StateDependent for Flip {
//!     fn required_variables(&self) -> VarList { [self.0].into_iter().collect() }
//! }
//! impl JumpKernel<Particle> for Flip {
//!     fn simulate(
//!         &mut self,
//!         state: &mut StateMut<'_, Particle>,
//!         _rng: &mut dyn rand::RngCore,
//!     ) -> Result<(), ModelError> {
//!         let p = state.require_mut(self.0)?;
//!         p.velocity = -p.velocity;
//!         Ok(())
//!     }
//! }
//!
//! let mut model = Pdmp::new();
//! let x = model.add_coordinate(Particle { position: 0.0, velocity: 1.0 });
//! let clock = ExponentialClock::new(1.0).unwrap().with_variables([x]);
//! model.add_jump(clock, Flip(x));
//!
//! let mut sim = Simulator::new(model).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let summary = sim.simulate(&mut rng, &StoppingCriteria::for_time(10.0)).unwrap();
//! assert_eq!(summary.elapsed, 10.0);
//! assert!(sim.coordinate(x).unwrap().position.abs() <= 10.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `pdmp-core` | Plug-in traits, handles, `DeltaTime`, index sets, state views |
//! | [`model`] | `pdmp-graph` | The `Pdmp` builder and the dependency graph compiler |
//! | [`engine`] | `pdmp-engine` | Event queue, simulator, configuration, run statistics |
//! | [`clocks`] | `pdmp-clocks` | Adaptive thinning and exponential clocks |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Plug-in traits, handles, and shared types (`pdmp-core`).
///
/// Implement [`types::Coordinate`], [`types::Clock`],
/// [`types::JumpKernel`] and [`types::Processor`] to describe a model.
pub use pdmp_core as types;

/// Model assembly and dependency compilation (`pdmp-graph`).
pub use pdmp_graph as model;

/// The event-driven simulator (`pdmp-engine`).
///
/// [`engine::Simulator`] runs a frozen model; [`engine::EventQueue`] is
/// exposed for custom schedulers and benchmarks.
pub use pdmp_engine as engine;

/// Reference clocks (`pdmp-clocks`).
pub use pdmp_clocks as clocks;

/// Common imports for typical usage.
///
/// ```rust
/// use pdmp::prelude::*;
/// ```
pub mod prelude {
    // Core traits and types
    pub use pdmp_core::{
        Clock, Coordinate, DeltaTime, JumpId, JumpKernel, Processor, ProcessorId, StateDependent,
        StateMut, StateView, Trigger, VarId, VarList,
    };

    // Errors
    pub use pdmp_core::ModelError;
    pub use pdmp_engine::{ConfigError, SimulationError};
    pub use pdmp_graph::GraphError;

    // Model
    pub use pdmp_graph::{JumpProcess, Pdmp};

    // Engine
    pub use pdmp_engine::{
        RunSummary, SimulationStats, Simulator, SimulatorConfig, StopReason, StoppingCriteria,
    };

    // Clocks
    pub use pdmp_clocks::{AdaptiveThinning, ExponentialClock, Intensity};
}
