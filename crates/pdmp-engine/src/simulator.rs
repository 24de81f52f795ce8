//! The event-driven simulation loop.
//!
//! [`Simulator`] owns a frozen [`Pdmp`] and its compiled
//! [`DependencyGraph`]. Each call to [`simulate`](Simulator::simulate)
//! advances stochastic time in chunks. Within a chunk the loop repeatedly
//! polls the earliest scheduled event and either
//!
//! - re-asks a clock whose last proposal was only a lower bound, with its
//!   variables speculatively advanced to the current time and rolled back
//!   afterwards, or
//! - confirms a jump: the kernel's variables are committed (closing their
//!   segments and notifying processors), the kernel runs, and every clock
//!   that reads a modified variable is resampled.
//!
//! Variables not touched by an event stay at their last commit time. They
//! are only brought forward when an event needs them, and all of them are
//! flushed when a chunk or run ends.

use std::error::Error;
use std::fmt;
use std::time::Instant;

use pdmp_core::{
    Coordinate, DeltaTime, IndexSet, JumpId, ModelError, StateMut, StateView, Trigger, VarId,
};
use pdmp_graph::{DependencyGraph, Pdmp, PdmpMut};
use rand::RngCore;

use crate::config::{ConfigError, SimulatorConfig, StoppingCriteria};
use crate::metrics::{RunSummary, SimulationStats, StopReason};
use crate::queue::{EventQueue, QueueError};

// ── SimulationError ────────────────────────────────────────────────

/// Errors that abort [`Simulator::simulate`] or construction.
///
/// None of these are recoverable mid-run: coordinates may be left part way
/// through a chunk, and the simulator should be discarded.
#[derive(Clone, Debug, PartialEq)]
pub enum SimulationError {
    /// Invalid configuration or stopping criteria.
    Config(ConfigError),
    /// A clock returned an error.
    ClockFailed {
        /// The jump process whose clock failed.
        jump: JumpId,
        /// The underlying model error.
        reason: ModelError,
    },
    /// A kernel returned an error.
    KernelFailed {
        /// The jump process whose kernel failed.
        jump: JumpId,
        /// The underlying model error.
        reason: ModelError,
    },
    /// A clock proposed a negative or NaN delay.
    InvalidDeltaTime {
        /// The jump process whose clock misbehaved.
        jump: JumpId,
        /// The rejected proposal.
        delta: DeltaTime,
    },
    /// The event queue could not place an event.
    Queue(QueueError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::ClockFailed { jump, reason } => {
                write!(f, "clock of jump process {jump} failed: {reason}")
            }
            Self::KernelFailed { jump, reason } => {
                write!(f, "kernel of jump process {jump} failed: {reason}")
            }
            Self::InvalidDeltaTime { jump, delta } => {
                write!(f, "clock of jump process {jump} proposed invalid delay {delta}")
            }
            Self::Queue(e) => write!(f, "event queue: {e}"),
        }
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::ClockFailed { reason, .. } | Self::KernelFailed { reason, .. } => Some(reason),
            Self::Queue(e) => Some(e),
            Self::InvalidDeltaTime { .. } => None,
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<QueueError> for SimulationError {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ── Budget ─────────────────────────────────────────────────────────

/// Per-call budget tracking.
struct Budget {
    start: Instant,
    wall_clock_millis: u64,
    max_polls: u64,
    polls: u64,
    jumps: u64,
}

impl Budget {
    fn new(criteria: &StoppingCriteria) -> Self {
        Self {
            start: Instant::now(),
            wall_clock_millis: criteria.wall_clock_millis,
            max_polls: criteria.max_queue_polls,
            polls: 0,
            jumps: 0,
        }
    }

    fn exhausted(&self) -> Option<StopReason> {
        if self.polls >= self.max_polls {
            return Some(StopReason::QueuePolls);
        }
        if self.start.elapsed().as_millis() >= u128::from(self.wall_clock_millis) {
            return Some(StopReason::WallClock);
        }
        None
    }

    fn wall_clock_us(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// How a chunk ended.
enum ChunkEnd {
    /// Reached its planned length.
    Horizon,
    /// No process will ever fire again.
    Idle,
    /// A wall-clock or poll budget ran out.
    Interrupted(StopReason),
}

// ── ChunkState ─────────────────────────────────────────────────────

/// Mutable per-chunk state. Times are local to the chunk.
struct ChunkState {
    queue: EventQueue,
    time: f64,
    /// Time each variable was last committed to.
    last_commit: Vec<f64>,
    /// Whether each jump's pending schedule is only a lower bound.
    bounded: Vec<bool>,
}

/// Registration indices of a compiled model always fit in `u32`.
fn jump_id(index: usize) -> JumpId {
    JumpId(index as u32)
}

impl ChunkState {
    fn new(num_variables: usize, num_jumps: usize) -> Self {
        Self {
            queue: EventQueue::new(num_jumps),
            time: 0.0,
            last_commit: vec![0.0; num_variables],
            bounded: vec![false; num_jumps],
        }
    }

    /// Start a chunk at local time zero and schedule every clock.
    fn reset<C: Coordinate>(
        &mut self,
        parts: &mut PdmpMut<'_, C>,
        graph: &DependencyGraph,
        rng: &mut dyn RngCore,
        stats: &mut SimulationStats,
    ) -> Result<(), SimulationError> {
        self.time = 0.0;
        self.last_commit.fill(0.0);
        self.bounded.fill(false);
        self.queue.clear();
        for k in 0..graph.num_jump_processes() {
            self.schedule(jump_id(k), parts, graph, rng, stats)?;
        }
        Ok(())
    }

    /// Ask `jump`'s clock for its next proposal and (re)insert it.
    ///
    /// The clock's variables must already be at `self.time`.
    fn schedule<C: Coordinate>(
        &mut self,
        jump: JumpId,
        parts: &mut PdmpMut<'_, C>,
        graph: &DependencyGraph,
        rng: &mut dyn RngCore,
        stats: &mut SimulationStats,
    ) -> Result<(), SimulationError> {
        let view = StateView::new(graph.owner(), &*parts.coordinates, graph.clock_vars(jump));
        stats.clock_evaluations += 1;
        let delta = parts.jump_processes[jump.index()]
            .clock
            .next(&view, rng)
            .map_err(|reason| SimulationError::ClockFailed { jump, reason })?;
        if !delta.is_valid() {
            return Err(SimulationError::InvalidDeltaTime { jump, delta });
        }

        self.bounded[jump.index()] = delta.is_lower_bound();
        let offset = delta.value();
        if offset.is_infinite() {
            self.queue.remove(jump);
            return Ok(());
        }
        let target = self.time + offset;
        let actual = self.queue.add(jump, target)?;
        if actual != target {
            stats.nudged_events += 1;
        }
        Ok(())
    }

    /// Advance (`sign = 1.0`) or roll back (`sign = -1.0`) `vars` between
    /// their last commit time and `self.time`, without committing.
    fn speculate<C: Coordinate>(&self, coordinates: &mut [C], vars: &IndexSet, sign: f64) {
        for v in vars {
            let delta = self.time - self.last_commit[v];
            if delta != 0.0 {
                coordinates[v].extrapolate(sign * delta);
            }
        }
    }

    /// Close variable `v`'s segment at `to`: notify its processors with the
    /// segment-start state, then advance it.
    fn commit<C: Coordinate>(
        &mut self,
        parts: &mut PdmpMut<'_, C>,
        graph: &DependencyGraph,
        v: usize,
        to: f64,
        trigger: Trigger,
    ) {
        let delta = to - self.last_commit[v];
        if delta > 0.0 {
            let coordinate = &mut parts.coordinates[v];
            for &p in graph.processors_of(v) {
                parts.processors[p].process(coordinate, delta, trigger);
            }
            coordinate.extrapolate(delta);
        }
        self.last_commit[v] = to;
    }

    /// Commit every variable to `to` and move logical time there.
    fn flush<C: Coordinate>(&mut self, parts: &mut PdmpMut<'_, C>, graph: &DependencyGraph, to: f64) {
        for v in 0..graph.num_variables() {
            self.commit(parts, graph, v, to, Trigger::Flush);
        }
        self.time = to;
    }

    /// Poll and handle one event. Returns whether a jump was confirmed.
    fn step<C: Coordinate>(
        &mut self,
        parts: &mut PdmpMut<'_, C>,
        graph: &DependencyGraph,
        rng: &mut dyn RngCore,
        stats: &mut SimulationStats,
    ) -> Result<bool, SimulationError> {
        let Some((t, jump)) = self.queue.poll_min() else {
            return Ok(false);
        };
        self.time = t;

        if self.bounded[jump.index()] {
            stats.bound_refreshes += 1;
            self.refresh_bound(jump, parts, graph, rng, stats)?;
            return Ok(false);
        }

        stats.jumps += 1;
        for v in graph.kernel_vars(jump) {
            self.commit(parts, graph, v, t, Trigger::Jump(jump));
        }
        let extended = graph.extended_vars(jump);
        self.speculate(parts.coordinates, extended, 1.0);
        let result = self.jump(jump, parts, graph, rng, stats);
        self.speculate(parts.coordinates, extended, -1.0);
        result?;
        Ok(true)
    }

    /// Re-evaluate a clock at its lower-bound checkpoint.
    fn refresh_bound<C: Coordinate>(
        &mut self,
        jump: JumpId,
        parts: &mut PdmpMut<'_, C>,
        graph: &DependencyGraph,
        rng: &mut dyn RngCore,
        stats: &mut SimulationStats,
    ) -> Result<(), SimulationError> {
        let vars = graph.clock_vars(jump);
        self.speculate(parts.coordinates, vars, 1.0);
        let result = self.schedule(jump, parts, graph, rng, stats);
        self.speculate(parts.coordinates, vars, -1.0);
        result
    }

    /// Run `jump`'s kernel and resample every clock it may have affected.
    ///
    /// The kernel's variables are committed and the extended set is
    /// speculatively current when this is called.
    fn jump<C: Coordinate>(
        &mut self,
        jump: JumpId,
        parts: &mut PdmpMut<'_, C>,
        graph: &DependencyGraph,
        rng: &mut dyn RngCore,
        stats: &mut SimulationStats,
    ) -> Result<(), SimulationError> {
        let mut state = StateMut::new(graph.owner(), &mut *parts.coordinates, graph.kernel_vars(jump));
        parts.jump_processes[jump.index()]
            .kernel
            .simulate(&mut state, rng)
            .map_err(|reason| SimulationError::KernelFailed { jump, reason })?;
        for k in graph.resampled_after(jump) {
            self.schedule(jump_id(k), parts, graph, rng, stats)?;
        }
        Ok(())
    }
}

// ── Simulator ──────────────────────────────────────────────────────

/// Exact event-driven simulator for one [`Pdmp`].
///
/// Construction compiles the dependency graph; the model's structure is
/// frozen from then on. Coordinates are mutated in place by
/// [`simulate`](Self::simulate) and can be read back between runs or
/// recovered with [`into_pdmp`](Self::into_pdmp).
pub struct Simulator<C> {
    pdmp: Pdmp<C>,
    graph: DependencyGraph,
    config: SimulatorConfig,
    chunk: ChunkState,
    stats: SimulationStats,
}

impl<C: Coordinate> Simulator<C> {
    /// Freeze `pdmp` with the default [`SimulatorConfig`].
    pub fn new(pdmp: Pdmp<C>) -> Result<Self, ConfigError> {
        Self::with_config(pdmp, SimulatorConfig::default())
    }

    /// Freeze `pdmp`, validating `config` and compiling the graph.
    pub fn with_config(pdmp: Pdmp<C>, config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let graph = DependencyGraph::compile(&pdmp)?;
        let chunk = ChunkState::new(graph.num_variables(), graph.num_jump_processes());
        Ok(Self {
            pdmp,
            graph,
            config,
            chunk,
            stats: SimulationStats::default(),
        })
    }

    /// Simulate until one of `criteria`'s budgets is spent.
    ///
    /// On return every coordinate has been committed to the stopping time,
    /// so each processor has seen segments summing to
    /// [`RunSummary::elapsed`]. With an infinite horizon the run also ends
    /// once no clock has anything scheduled.
    pub fn simulate<R: RngCore>(
        &mut self,
        rng: &mut R,
        criteria: &StoppingCriteria,
    ) -> Result<RunSummary, SimulationError> {
        criteria.validate()?;
        let rng: &mut dyn RngCore = rng;
        let horizon = criteria.stochastic_time;
        let mut budget = Budget::new(criteria);
        let mut elapsed = 0.0;

        let stop = loop {
            let remaining = horizon - elapsed;
            if remaining <= 0.0 {
                break StopReason::StochasticTime;
            }
            if let Some(reason) = budget.exhausted() {
                break reason;
            }
            let last = remaining <= self.config.max_chunk_length;
            let length = if last {
                remaining
            } else {
                self.config.max_chunk_length
            };
            let (done, end) = self.run_chunk(length, horizon.is_infinite(), rng, &mut budget)?;
            match end {
                ChunkEnd::Horizon if last => {
                    elapsed = horizon;
                    break StopReason::StochasticTime;
                }
                ChunkEnd::Horizon => elapsed += done,
                ChunkEnd::Idle => {
                    elapsed += done;
                    break StopReason::StochasticTime;
                }
                ChunkEnd::Interrupted(reason) => {
                    elapsed += done;
                    break reason;
                }
            }
        };

        self.stats.stochastic_time += elapsed;
        let summary = RunSummary {
            elapsed,
            stop,
            queue_polls: budget.polls,
            jumps: budget.jumps,
            wall_clock_us: budget.wall_clock_us(),
        };
        tracing::info!(
            elapsed,
            stop = %stop,
            polls = summary.queue_polls,
            jumps = summary.jumps,
            wall_clock_us = summary.wall_clock_us,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Simulate one chunk of at most `length` and return the stochastic
    /// time it covered.
    fn run_chunk(
        &mut self,
        length: f64,
        open_ended: bool,
        rng: &mut dyn RngCore,
        budget: &mut Budget,
    ) -> Result<(f64, ChunkEnd), SimulationError> {
        let Self {
            pdmp,
            graph,
            chunk,
            stats,
            ..
        } = self;
        let mut parts = pdmp.split_mut();
        stats.chunks += 1;
        let index = stats.chunks;
        let polls_before = budget.polls;
        tracing::debug!(chunk = index, length, "chunk started");

        chunk.reset(&mut parts, graph, rng, stats)?;
        let end = loop {
            if let Some(reason) = budget.exhausted() {
                let now = chunk.time;
                chunk.flush(&mut parts, graph, now);
                break ChunkEnd::Interrupted(reason);
            }
            match chunk.queue.peek_min() {
                None if open_ended => {
                    let now = chunk.time;
                    chunk.flush(&mut parts, graph, now);
                    break ChunkEnd::Idle;
                }
                None => {
                    chunk.flush(&mut parts, graph, length);
                    break ChunkEnd::Horizon;
                }
                Some((t, _)) if t > length => {
                    chunk.flush(&mut parts, graph, length);
                    break ChunkEnd::Horizon;
                }
                Some(_) => {}
            }
            budget.polls += 1;
            stats.queue_polls += 1;
            if chunk.step(&mut parts, graph, rng, stats)? {
                budget.jumps += 1;
            }
        };

        tracing::debug!(
            chunk = index,
            elapsed = chunk.time,
            polls = budget.polls - polls_before,
            "chunk finished"
        );
        Ok((chunk.time, end))
    }
}

impl<C> Simulator<C> {
    /// The simulated model.
    pub fn pdmp(&self) -> &Pdmp<C> {
        &self.pdmp
    }

    /// Current coordinate values, in arena order.
    pub fn coordinates(&self) -> &[C] {
        self.pdmp.coordinates()
    }

    /// Read one coordinate by handle.
    pub fn coordinate(&self, var: VarId) -> Option<&C> {
        self.pdmp.coordinate(var)
    }

    /// The compiled dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Counters accumulated over every run so far.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// The configuration this simulator was built with.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Hand the model (and its processors) back to the caller.
    pub fn into_pdmp(self) -> Pdmp<C> {
        self.pdmp
    }
}
