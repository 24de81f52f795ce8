//! Dependency-graph compilation.
//!
//! [`DependencyGraph::compile`] runs once per model, before simulation,
//! to validate every `required_variables()` declaration and build the
//! sparse tables the simulator consults on each event. With `nd(j)` the
//! clock variables of jump `j`, `nk(j)` its kernel variables and `Nd(v)`
//! the jumps whose clock reads variable `v`:
//!
//! | Table | Contents | Used when |
//! |-------|----------|-----------|
//! | [`clock_vars`](DependencyGraph::clock_vars) | `nd(j)` | re-evaluating a lower bound |
//! | [`kernel_vars`](DependencyGraph::kernel_vars) | `nk(j)` | committing before a jump |
//! | [`clocks_reading`](DependencyGraph::clocks_reading) | `Nd(v)` | building the tables below |
//! | [`resampled_after`](DependencyGraph::resampled_after) | `Nd(nk(j)) ∪ {j}` | after a jump |
//! | [`extended_vars`](DependencyGraph::extended_vars) | `nd(Nd(nk(j)) ∪ {j}) \ nk(j)` | speculative update after a jump |
//! | [`processors_of`](DependencyGraph::processors_of) | processors observing `v` | committing `v` |

use indexmap::IndexSet as OrderedSet;
use pdmp_core::{IndexSet, JumpId, PdmpInstanceId, ProcessorId, VarId, VarList};

use crate::model::Pdmp;

use std::error::Error;
use std::fmt;

// ── Errors ─────────────────────────────────────────────────────────

/// The declaring object named in a [`GraphError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    /// The clock of a jump process.
    Clock(JumpId),
    /// The kernel of a jump process.
    Kernel(JumpId),
    /// A processor.
    Processor(ProcessorId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clock(j) => write!(f, "clock of jump process {j}"),
            Self::Kernel(j) => write!(f, "kernel of jump process {j}"),
            Self::Processor(p) => write!(f, "processor {p}"),
        }
    }
}

/// Structural errors found while compiling (construction-time, fatal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A declaration names a handle issued by a different PDMP.
    ForeignVariable {
        /// Who declared it.
        entity: Entity,
        /// The offending handle.
        var: VarId,
    },
    /// A declaration names a handle past the end of the coordinate arena.
    UnknownVariable {
        /// Who declared it.
        entity: Entity,
        /// The offending handle.
        var: VarId,
    },
    /// A declaration lists the same coordinate twice.
    DuplicateVariable {
        /// Who declared it.
        entity: Entity,
        /// The repeated handle.
        var: VarId,
    },
    /// A processor does not depend on exactly one coordinate.
    ProcessorArity {
        /// Which processor.
        processor: ProcessorId,
        /// How many variables it declared.
        count: usize,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignVariable { entity, var } => {
                write!(f, "{entity} references variable {var} of another model")
            }
            Self::UnknownVariable { entity, var } => {
                write!(f, "{entity} references undefined variable {var}")
            }
            Self::DuplicateVariable { entity, var } => {
                write!(f, "{entity} declares variable {var} more than once")
            }
            Self::ProcessorArity { processor, count } => {
                write!(
                    f,
                    "processor {processor} must depend on exactly one variable, declared {count}"
                )
            }
        }
    }
}

impl Error for GraphError {}

// ── DependencyGraph ────────────────────────────────────────────────

/// Compiled, read-only dependency tables for one PDMP.
///
/// Built once by [`compile`](DependencyGraph::compile) and reusable for
/// any number of simulation chunks of the same model.
#[derive(Debug, Clone)]
#[must_use]
pub struct DependencyGraph {
    owner: PdmpInstanceId,
    num_variables: usize,
    clock_vars: Vec<IndexSet>,
    kernel_vars: Vec<IndexSet>,
    clocks_reading: Vec<IndexSet>,
    resampled_after: Vec<IndexSet>,
    extended_vars: Vec<IndexSet>,
    processors_of: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Validate all declarations of `pdmp` and build the tables.
    ///
    /// Checks performed:
    ///
    /// 1. Every declared handle was issued by `pdmp` and is in range.
    /// 2. No declaration repeats a coordinate.
    /// 3. Every processor declares exactly one coordinate.
    pub fn compile<C>(pdmp: &Pdmp<C>) -> Result<Self, GraphError> {
        let owner = pdmp.instance_id();
        let num_variables = pdmp.num_variables();
        let num_jumps = pdmp.num_jump_processes();

        // 1-2. Resolve clock and kernel declarations.
        let mut clock_vars = Vec::with_capacity(num_jumps);
        let mut kernel_vars = Vec::with_capacity(num_jumps);
        for (j, process) in pdmp.jump_processes().iter().enumerate() {
            let id = JumpId(j as u32);
            clock_vars.push(resolve(
                owner,
                num_variables,
                Entity::Clock(id),
                process.clock.required_variables(),
            )?);
            kernel_vars.push(resolve(
                owner,
                num_variables,
                Entity::Kernel(id),
                process.kernel.required_variables(),
            )?);
        }

        // 3. Processors: exactly one variable each.
        let mut processors_of = vec![Vec::new(); num_variables];
        for (p, processor) in pdmp.processors().iter().enumerate() {
            let id = ProcessorId(p as u32);
            let declared = processor.required_variables();
            if declared.len() != 1 {
                return Err(GraphError::ProcessorArity {
                    processor: id,
                    count: declared.len(),
                });
            }
            let var = resolve(owner, num_variables, Entity::Processor(id), declared)?;
            for v in var.iter() {
                processors_of[v].push(p);
            }
        }

        // Nd(v): inverse of the clock declarations.
        let mut readers: Vec<Vec<usize>> = vec![Vec::new(); num_variables];
        for (j, vars) in clock_vars.iter().enumerate() {
            for v in vars.iter() {
                readers[v].push(j);
            }
        }
        let clocks_reading: Vec<IndexSet> = readers
            .into_iter()
            .map(|js| IndexSet::from_indices(js, num_jumps))
            .collect();

        // Nd(nk(j)) ∪ {j}, and the variables those clocks need current
        // minus the ones the jump commits itself. A stamp buffer keeps the
        // variable pass linear in the neighbourhood size.
        let mut resampled_after = Vec::with_capacity(num_jumps);
        let mut extended_vars = Vec::with_capacity(num_jumps);
        let mut var_stamp = vec![usize::MAX; num_variables];
        for j in 0..num_jumps {
            let resampled = kernel_vars[j]
                .iter()
                .fold(IndexSet::from_indices([j], num_jumps), |acc, v| {
                    acc.union(&clocks_reading[v], num_jumps)
                });

            let mut vars = Vec::new();
            for k in resampled.iter() {
                for v in clock_vars[k].iter() {
                    if var_stamp[v] != j {
                        var_stamp[v] = j;
                        vars.push(v);
                    }
                }
            }
            let needed = IndexSet::from_indices(vars, num_variables);
            extended_vars.push(needed.difference(&kernel_vars[j], num_variables));
            resampled_after.push(resampled);
        }

        let graph = Self {
            owner,
            num_variables,
            clock_vars,
            kernel_vars,
            clocks_reading,
            resampled_after,
            extended_vars,
            processors_of,
        };
        tracing::debug!(
            variables = num_variables,
            jump_processes = num_jumps,
            processors = pdmp.num_processors(),
            global_neighbourhoods = graph.resampled_after.iter().filter(|s| s.is_all()).count(),
            mean_neighbourhood = graph.mean_neighbourhood(),
            "compiled dependency graph"
        );
        Ok(graph)
    }

    /// Instance ID of the model this graph was compiled from.
    pub fn owner(&self) -> PdmpInstanceId {
        self.owner
    }

    /// Number of coordinates in the model.
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Number of jump processes in the model.
    pub fn num_jump_processes(&self) -> usize {
        self.clock_vars.len()
    }

    /// `nd(j)`: variables read by the clock of `j`.
    pub fn clock_vars(&self, j: JumpId) -> &IndexSet {
        &self.clock_vars[j.index()]
    }

    /// `nk(j)`: variables touched by the kernel of `j`.
    pub fn kernel_vars(&self, j: JumpId) -> &IndexSet {
        &self.kernel_vars[j.index()]
    }

    /// `Nd(v)`: jump processes whose clock reads variable `v`.
    pub fn clocks_reading(&self, var: usize) -> &IndexSet {
        &self.clocks_reading[var]
    }

    /// `Nd(nk(j)) ∪ {j}`: clocks to resample after `j` fires.
    pub fn resampled_after(&self, j: JumpId) -> &IndexSet {
        &self.resampled_after[j.index()]
    }

    /// Variables to bring up to date, without committing, before the
    /// clocks of [`resampled_after`](Self::resampled_after) are asked
    /// again. Excludes `nk(j)`, which is committed instead.
    pub fn extended_vars(&self, j: JumpId) -> &IndexSet {
        &self.extended_vars[j.index()]
    }

    /// Processors observing variable `var`, by processor index.
    pub fn processors_of(&self, var: usize) -> &[usize] {
        &self.processors_of[var]
    }

    /// Average size of `resampled_after` over all jump processes.
    pub fn mean_neighbourhood(&self) -> f64 {
        if self.resampled_after.is_empty() {
            return 0.0;
        }
        let total: usize = self.resampled_after.iter().map(IndexSet::len).sum();
        total as f64 / self.resampled_after.len() as f64
    }
}

/// Check a declaration against the arena and turn it into an index set.
fn resolve(
    owner: PdmpInstanceId,
    num_variables: usize,
    entity: Entity,
    declared: VarList,
) -> Result<IndexSet, GraphError> {
    let mut seen: OrderedSet<usize> = OrderedSet::with_capacity(declared.len());
    for var in declared {
        if var.owner() != owner {
            return Err(GraphError::ForeignVariable { entity, var });
        }
        if var.index() >= num_variables {
            return Err(GraphError::UnknownVariable { entity, var });
        }
        if !seen.insert(var.index()) {
            return Err(GraphError::DuplicateVariable { entity, var });
        }
    }
    Ok(IndexSet::from_indices(seen, num_variables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdmp_core::VarId;
    use pdmp_test_utils::{ExponentialTestClock, FlipVelocity, Particle, SegmentRecorder};

    fn particles(n: usize) -> (Pdmp<Particle>, Vec<VarId>) {
        let mut pdmp = Pdmp::new();
        let vars = (0..n)
            .map(|i| pdmp.add_coordinate(Particle::new(i as f64, 1.0)))
            .collect();
        (pdmp, vars)
    }

    // ── Valid graphs ───────────────────────────────────────────

    /// Chain: jump i's clock reads {x_i, x_{i+1}}, its kernel flips x_i.
    fn chain(n: usize) -> Pdmp<Particle> {
        let (mut pdmp, x) = particles(n);
        for i in 0..n - 1 {
            pdmp.add_jump(
                ExponentialTestClock::new(1.0, [x[i], x[i + 1]]),
                FlipVelocity::new([x[i]]),
            );
        }
        pdmp
    }

    #[test]
    fn chain_tables() {
        let pdmp = chain(5);
        let g = DependencyGraph::compile(&pdmp).unwrap();
        assert_eq!(g.num_variables(), 5);
        assert_eq!(g.num_jump_processes(), 4);

        assert_eq!(g.clock_vars(JumpId(1)).to_vec(), vec![1, 2]);
        assert_eq!(g.kernel_vars(JumpId(1)).to_vec(), vec![1]);

        // x_2 is read by the clocks of jumps 1 and 2.
        assert_eq!(g.clocks_reading(2).to_vec(), vec![1, 2]);
        // x_0 only by jump 0; x_4 only by jump 3.
        assert_eq!(g.clocks_reading(0).to_vec(), vec![0]);
        assert_eq!(g.clocks_reading(4).to_vec(), vec![3]);

        // Jump 2 flips x_2, read by clocks 1 and 2.
        assert_eq!(g.resampled_after(JumpId(2)).to_vec(), vec![1, 2]);
        // Those clocks read x_1, x_2, x_3; x_2 is committed, not extended.
        assert_eq!(g.extended_vars(JumpId(2)).to_vec(), vec![1, 3]);
    }

    #[test]
    fn jump_always_resamples_itself() {
        // Kernel touches a variable the clock doesn't read.
        let (mut pdmp, x) = particles(2);
        pdmp.add_jump(
            ExponentialTestClock::new(1.0, [x[0]]),
            FlipVelocity::new([x[1]]),
        );
        let g = DependencyGraph::compile(&pdmp).unwrap();
        assert!(g.clocks_reading(1).is_empty());
        assert_eq!(g.resampled_after(JumpId(0)).to_vec(), vec![0]);
        assert_eq!(g.extended_vars(JumpId(0)).to_vec(), vec![0]);
    }

    #[test]
    fn global_clock_collapses_to_all() {
        let (mut pdmp, x) = particles(3);
        pdmp.add_jump(
            ExponentialTestClock::new(1.0, x.clone()),
            FlipVelocity::new(x.clone()),
        );
        pdmp.add_jump(
            ExponentialTestClock::new(1.0, [x[0]]),
            FlipVelocity::new([x[0]]),
        );
        let g = DependencyGraph::compile(&pdmp).unwrap();
        assert!(g.clock_vars(JumpId(0)).is_all());
        assert!(g.kernel_vars(JumpId(0)).is_all());
        // Every variable is committed by jump 0, so nothing is extended.
        assert!(g.extended_vars(JumpId(0)).is_empty());
        // Jump 0 flips x_0, read by both clocks.
        assert!(g.resampled_after(JumpId(0)).is_all());
        // Jump 1 flips x_0: both clocks resample; clock 0 reads x_1, x_2.
        assert_eq!(g.extended_vars(JumpId(1)).to_vec(), vec![1, 2]);
        assert_eq!(g.mean_neighbourhood(), 2.0);
    }

    #[test]
    fn processors_indexed_by_variable() {
        let (mut pdmp, x) = particles(2);
        let (r0, _) = SegmentRecorder::new(x[1]);
        let (r1, _) = SegmentRecorder::new(x[1]);
        pdmp.add_processor(r0);
        pdmp.add_processor(r1);
        let g = DependencyGraph::compile(&pdmp).unwrap();
        assert!(g.processors_of(0).is_empty());
        assert_eq!(g.processors_of(1), &[0, 1]);
    }

    #[test]
    fn empty_model_compiles() {
        let pdmp: Pdmp<Particle> = Pdmp::new();
        let g = DependencyGraph::compile(&pdmp).unwrap();
        assert_eq!(g.num_jump_processes(), 0);
        assert_eq!(g.mean_neighbourhood(), 0.0);
    }

    // ── Declaration errors ─────────────────────────────────────

    #[test]
    fn duplicate_variable_rejected() {
        let (mut pdmp, x) = particles(2);
        pdmp.add_jump(
            ExponentialTestClock::new(1.0, [x[0], x[1], x[0]]),
            FlipVelocity::new([x[0]]),
        );
        match DependencyGraph::compile(&pdmp) {
            Err(GraphError::DuplicateVariable { entity, var }) => {
                assert_eq!(entity, Entity::Clock(JumpId(0)));
                assert_eq!(var, x[0]);
            }
            other => panic!("expected DuplicateVariable, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_in_kernel_rejected() {
        let (mut pdmp, x) = particles(1);
        pdmp.add_jump(
            ExponentialTestClock::new(1.0, [x[0]]),
            FlipVelocity::new([x[0], x[0]]),
        );
        assert!(matches!(
            DependencyGraph::compile(&pdmp),
            Err(GraphError::DuplicateVariable {
                entity: Entity::Kernel(JumpId(0)),
                ..
            })
        ));
    }

    #[test]
    fn foreign_variable_rejected() {
        let (_other, foreign) = particles(1);
        let (mut pdmp, x) = particles(1);
        pdmp.add_jump(
            ExponentialTestClock::new(1.0, [x[0]]),
            FlipVelocity::new([foreign[0]]),
        );
        match DependencyGraph::compile(&pdmp) {
            Err(GraphError::ForeignVariable { entity, var }) => {
                assert_eq!(entity, Entity::Kernel(JumpId(0)));
                assert_eq!(var, foreign[0]);
            }
            other => panic!("expected ForeignVariable, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_variable_rejected() {
        let (mut pdmp, _x) = particles(1);
        let bogus = VarId::new(pdmp.instance_id(), 9);
        pdmp.add_jump(
            ExponentialTestClock::new(1.0, [bogus]),
            FlipVelocity::new([]),
        );
        assert!(matches!(
            DependencyGraph::compile(&pdmp),
            Err(GraphError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn processor_must_have_one_variable() {
        let (mut pdmp, x) = particles(2);
        let (recorder, _) = SegmentRecorder::observing([x[0], x[1]]);
        pdmp.add_processor(recorder);
        match DependencyGraph::compile(&pdmp) {
            Err(GraphError::ProcessorArity { processor, count }) => {
                assert_eq!(processor, ProcessorId(0));
                assert_eq!(count, 2);
            }
            other => panic!("expected ProcessorArity, got {other:?}"),
        }
    }

    #[test]
    fn processor_with_no_variable_rejected() {
        let (mut pdmp, _x) = particles(1);
        let (recorder, _) = SegmentRecorder::observing([]);
        pdmp.add_processor(recorder);
        assert!(matches!(
            DependencyGraph::compile(&pdmp),
            Err(GraphError::ProcessorArity { count: 0, .. })
        ));
    }

    #[test]
    fn error_messages_name_the_entity() {
        let v = VarId::new(PdmpInstanceId::next(), 3);
        let e = GraphError::DuplicateVariable {
            entity: Entity::Kernel(JumpId(7)),
            var: v,
        };
        assert!(e.to_string().contains("kernel of jump process 7"));
        let e = GraphError::ProcessorArity {
            processor: ProcessorId(2),
            count: 0,
        };
        assert!(e.to_string().contains("exactly one"));
    }

    // ── Properties ─────────────────────────────────────────────

    mod props {
        use super::*;
        use proptest::prelude::*;

        /// Random sparse models: each jump reads 1-3 variables, flips 1-2.
        fn arb_model() -> impl Strategy<Value = (usize, Vec<(Vec<usize>, Vec<usize>)>)> {
            (4usize..12).prop_flat_map(|n| {
                let decl = prop::collection::btree_set(0..n, 1..=3)
                    .prop_map(|s| s.into_iter().collect::<Vec<_>>());
                let kern = prop::collection::btree_set(0..n, 1..=2)
                    .prop_map(|s| s.into_iter().collect::<Vec<_>>());
                (Just(n), prop::collection::vec((decl, kern), 1..10))
            })
        }

        proptest! {
            #[test]
            fn tables_match_brute_force((n, jumps) in arb_model()) {
                let (mut pdmp, x) = particles(n);
                for (reads, flips) in &jumps {
                    pdmp.add_jump(
                        ExponentialTestClock::new(1.0, reads.iter().map(|&i| x[i])),
                        FlipVelocity::new(flips.iter().map(|&i| x[i])),
                    );
                }
                let g = DependencyGraph::compile(&pdmp).unwrap();

                for (j, (_, flips)) in jumps.iter().enumerate() {
                    let id = JumpId(j as u32);
                    // Brute-force Nd(nk(j)) ∪ {j}.
                    let mut expect: Vec<usize> = (0..jumps.len())
                        .filter(|&k| k == j || jumps[k].0.iter().any(|v| flips.contains(v)))
                        .collect();
                    expect.sort_unstable();
                    prop_assert_eq!(g.resampled_after(id).to_vec(), expect.clone());

                    let mut ext: Vec<usize> = expect
                        .iter()
                        .flat_map(|&k| jumps[k].0.iter().copied())
                        .filter(|v| !flips.contains(v))
                        .collect();
                    ext.sort_unstable();
                    ext.dedup();
                    prop_assert_eq!(g.extended_vars(id).to_vec(), ext);
                }
            }
        }
    }
}
