//! The [`Pdmp`] model: a coordinate arena plus jump processes and
//! processors referring to it by handle.

use pdmp_core::{
    Clock, Coordinate, JumpId, JumpKernel, PdmpInstanceId, Processor, ProcessorId, VarId,
};

/// One source of random events: a clock proposing times and the kernel
/// applied when a proposal is confirmed.
///
/// The two halves may declare different variables: a clock can read
/// coordinates the kernel never touches, and vice versa.
pub struct JumpProcess<C> {
    /// Proposes candidate event times.
    pub clock: Box<dyn Clock<C>>,
    /// Transforms state when an event is confirmed.
    pub kernel: Box<dyn JumpKernel<C>>,
}

impl<C> JumpProcess<C> {
    /// Pair a clock with a kernel.
    pub fn new(clock: impl Clock<C>, kernel: impl JumpKernel<C>) -> Self {
        Self {
            clock: Box::new(clock),
            kernel: Box::new(kernel),
        }
    }
}

/// A piecewise deterministic Markov process under assembly.
///
/// Coordinates are owned by the model and addressed through the
/// [`VarId`] handles returned by [`add_coordinate`](Pdmp::add_coordinate).
/// Because the arena owns each coordinate exactly once, two variables can
/// never alias the same storage; the remaining partition checks (repeated
/// or foreign handles in a declaration) happen in
/// [`DependencyGraph::compile`](crate::DependencyGraph::compile).
pub struct Pdmp<C> {
    instance: PdmpInstanceId,
    coordinates: Vec<C>,
    jump_processes: Vec<JumpProcess<C>>,
    processors: Vec<Box<dyn Processor<C>>>,
}

/// Split mutable borrow of a [`Pdmp`]'s three collections.
///
/// The simulator needs to run a clock or kernel against the coordinate
/// arena while holding both mutably; this hands out disjoint borrows.
pub struct PdmpMut<'a, C> {
    /// The coordinate arena, indexed by [`VarId::index`].
    pub coordinates: &'a mut [C],
    /// Jump processes, indexed by [`JumpId::index`].
    pub jump_processes: &'a mut [JumpProcess<C>],
    /// Processors, indexed by [`ProcessorId::index`].
    pub processors: &'a mut [Box<dyn Processor<C>>],
}

impl<C: Coordinate> Pdmp<C> {
    /// An empty model with a fresh instance ID.
    pub fn new() -> Self {
        Self {
            instance: PdmpInstanceId::next(),
            coordinates: Vec::new(),
            jump_processes: Vec::new(),
            processors: Vec::new(),
        }
    }

    /// A model holding `coordinates`, in order.
    ///
    /// Handles for them are `self.var(0)`, `self.var(1)`, ...
    pub fn from_coordinates(coordinates: Vec<C>) -> Self {
        Self {
            coordinates,
            ..Self::new()
        }
    }

    /// Move a coordinate into the model and return its handle.
    pub fn add_coordinate(&mut self, coordinate: C) -> VarId {
        let index = u32::try_from(self.coordinates.len()).expect("coordinate count exceeds u32");
        self.coordinates.push(coordinate);
        VarId::new(self.instance, index)
    }

    /// Register a jump process.
    pub fn add_jump_process(&mut self, process: JumpProcess<C>) -> JumpId {
        let index =
            u32::try_from(self.jump_processes.len()).expect("jump process count exceeds u32");
        self.jump_processes.push(process);
        JumpId(index)
    }

    /// Register a clock/kernel pair; shorthand for
    /// [`add_jump_process`](Self::add_jump_process).
    pub fn add_jump(&mut self, clock: impl Clock<C>, kernel: impl JumpKernel<C>) -> JumpId {
        self.add_jump_process(JumpProcess::new(clock, kernel))
    }

    /// Attach a processor.
    pub fn add_processor(&mut self, processor: impl Processor<C>) -> ProcessorId {
        let index = u32::try_from(self.processors.len()).expect("processor count exceeds u32");
        self.processors.push(Box::new(processor));
        ProcessorId(index)
    }
}

impl<C> Pdmp<C> {
    /// The instance ID stamped into every handle this model issues.
    pub fn instance_id(&self) -> PdmpInstanceId {
        self.instance
    }

    /// Handle of the coordinate at arena slot `index`, if it exists.
    pub fn var(&self, index: usize) -> Option<VarId> {
        if index >= self.coordinates.len() {
            return None;
        }
        u32::try_from(index)
            .ok()
            .map(|i| VarId::new(self.instance, i))
    }

    /// Handles of all coordinates, in arena order.
    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.coordinates.len()).filter_map(|i| self.var(i))
    }

    /// Read a coordinate by handle.
    pub fn coordinate(&self, var: VarId) -> Option<&C> {
        if var.owner() != self.instance {
            return None;
        }
        self.coordinates.get(var.index())
    }

    /// All coordinates, in arena order.
    pub fn coordinates(&self) -> &[C] {
        &self.coordinates
    }

    /// All jump processes, in registration order.
    pub fn jump_processes(&self) -> &[JumpProcess<C>] {
        &self.jump_processes
    }

    /// All processors, in registration order.
    pub fn processors(&self) -> &[Box<dyn Processor<C>>] {
        &self.processors
    }

    /// Number of coordinates.
    pub fn num_variables(&self) -> usize {
        self.coordinates.len()
    }

    /// Number of jump processes.
    pub fn num_jump_processes(&self) -> usize {
        self.jump_processes.len()
    }

    /// Number of processors.
    pub fn num_processors(&self) -> usize {
        self.processors.len()
    }

    /// Borrow coordinates, jump processes and processors mutably at once.
    pub fn split_mut(&mut self) -> PdmpMut<'_, C> {
        PdmpMut {
            coordinates: &mut self.coordinates,
            jump_processes: &mut self.jump_processes,
            processors: &mut self.processors,
        }
    }
}

impl<C: Coordinate> Default for Pdmp<C> {
    fn default() -> Self {
        Self::new()
    }
}
