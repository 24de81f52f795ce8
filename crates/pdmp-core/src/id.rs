//! Strongly-typed handles and the [`VarList`] type alias.

use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`PdmpInstanceId`] allocation.
static PDMP_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a PDMP under assembly.
///
/// Allocated from a monotonic atomic counter via [`PdmpInstanceId::next`].
/// Every [`VarId`] carries the instance ID of the PDMP that issued it, so
/// a handle leaking from one model into another is caught at compile time
/// of the dependency graph instead of silently aliasing a coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PdmpInstanceId(u64);

impl PdmpInstanceId {
    /// Allocate a fresh, unique instance ID.
    ///
    /// Each call returns a new ID that has never been returned before
    /// within this process. Thread-safe.
    pub fn next() -> Self {
        Self(PDMP_INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PdmpInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to one coordinate of a PDMP.
///
/// Issued when a coordinate is added to a model. The dense `index` is the
/// coordinate's position in the PDMP's variable arena and is the key used
/// by every compiled dependency table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId {
    owner: PdmpInstanceId,
    index: u32,
}

impl VarId {
    /// Build a handle for arena slot `index` of the PDMP `owner`.
    ///
    /// Only model builders should need this; handles that do not match
    /// a real slot are rejected when the dependency graph is compiled.
    pub fn new(owner: PdmpInstanceId, index: u32) -> Self {
        Self { owner, index }
    }

    /// The PDMP instance that issued this handle.
    pub fn owner(&self) -> PdmpInstanceId {
        self.owner
    }

    /// Dense arena index of the coordinate.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}@{}", self.index, self.owner)
    }
}

/// Identifies a jump process (clock + kernel pair) within a PDMP.
///
/// `JumpId(n)` corresponds to the n-th jump process added to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JumpId(pub u32);

impl JumpId {
    /// Position of the jump process in the model's list.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for JumpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for JumpId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a processor attached to a PDMP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessorId(pub u32);

impl ProcessorId {
    /// Position of the processor in the model's list.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessorId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// The ordered variable declaration of a state-dependent entity.
///
/// Uses `SmallVec<[VarId; 4]>` to avoid heap allocation for the common
/// case of clocks and kernels touching a handful of coordinates. Global
/// entities spill to the heap transparently.
pub type VarList = SmallVec<[VarId; 4]>;
