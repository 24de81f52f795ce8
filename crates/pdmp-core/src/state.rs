//! Scoped access to coordinate state for clocks and kernels.
//!
//! The simulator owns every coordinate. When it calls a plug-in it lends
//! out a view restricted to the variables that plug-in declared, so an
//! undeclared read or write is a `None` at the call site rather than a
//! silent dependency the compiled graph does not know about.

use crate::error::ModelError;
use crate::id::{PdmpInstanceId, VarId};
use crate::index::IndexSet;

/// Read-only view of the declared coordinates of one clock.
pub struct StateView<'a, C> {
    owner: PdmpInstanceId,
    coordinates: &'a [C],
    visible: &'a IndexSet,
}

impl<'a, C> StateView<'a, C> {
    /// Create a view over `coordinates` exposing only `visible` indices.
    pub fn new(owner: PdmpInstanceId, coordinates: &'a [C], visible: &'a IndexSet) -> Self {
        Self {
            owner,
            coordinates,
            visible,
        }
    }

    /// Read a coordinate.
    ///
    /// Returns `None` if the handle belongs to another PDMP or was not
    /// declared by the plug-in this view was built for.
    pub fn get(&self, var: VarId) -> Option<&'a C> {
        if var.owner() != self.owner || !self.visible.contains(var.index()) {
            return None;
        }
        self.coordinates.get(var.index())
    }

    /// Like [`get`](Self::get), but as a [`ModelError`] for `?` use.
    pub fn require(&self, var: VarId) -> Result<&'a C, ModelError> {
        self.get(var).ok_or(ModelError::UndeclaredVariable { var })
    }

    /// Number of coordinates visible through this view.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    /// Whether the view exposes no coordinates.
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

/// Mutable view of the declared coordinates of one kernel.
pub struct StateMut<'a, C> {
    owner: PdmpInstanceId,
    coordinates: &'a mut [C],
    writable: &'a IndexSet,
}

impl<'a, C> StateMut<'a, C> {
    /// Create a view over `coordinates` exposing only `writable` indices.
    pub fn new(owner: PdmpInstanceId, coordinates: &'a mut [C], writable: &'a IndexSet) -> Self {
        Self {
            owner,
            coordinates,
            writable,
        }
    }

    fn permits(&self, var: VarId) -> bool {
        var.owner() == self.owner && self.writable.contains(var.index())
    }

    /// Read a declared coordinate.
    pub fn get(&self, var: VarId) -> Option<&C> {
        if !self.permits(var) {
            return None;
        }
        self.coordinates.get(var.index())
    }

    /// Mutate a declared coordinate.
    ///
    /// Returns `None` if the handle belongs to another PDMP or was not
    /// declared by the kernel.
    pub fn get_mut(&mut self, var: VarId) -> Option<&mut C> {
        if !self.permits(var) {
            return None;
        }
        self.coordinates.get_mut(var.index())
    }

    /// Like [`get_mut`](Self::get_mut), but as a [`ModelError`] for `?` use.
    pub fn require_mut(&mut self, var: VarId) -> Result<&mut C, ModelError> {
        self.get_mut(var).ok_or(ModelError::UndeclaredVariable { var })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_hides_undeclared() {
        let owner = PdmpInstanceId::next();
        let data = [10.0_f64, 20.0, 30.0];
        let visible = IndexSet::from_indices([1], 3);
        let view = StateView::new(owner, &data, &visible);

        assert_eq!(view.get(VarId::new(owner, 1)), Some(&20.0));
        assert_eq!(view.get(VarId::new(owner, 0)), None);
        assert_eq!(view.len(), 1);
        assert!(matches!(
            view.require(VarId::new(owner, 2)),
            Err(ModelError::UndeclaredVariable { .. })
        ));
    }

    #[test]
    fn view_rejects_foreign_handles() {
        let owner = PdmpInstanceId::next();
        let data = [1.0_f64];
        let visible = IndexSet::all(1);
        let view = StateView::new(owner, &data, &visible);
        assert_eq!(view.get(VarId::new(PdmpInstanceId::next(), 0)), None);
    }

    #[test]
    fn mut_view_writes_declared_only() {
        let owner = PdmpInstanceId::next();
        let mut data = [1.0_f64, 2.0];
        let writable = IndexSet::from_indices([0], 2);
        {
            let mut state = StateMut::new(owner, &mut data, &writable);
            *state.get_mut(VarId::new(owner, 0)).unwrap() = -1.0;
            assert!(state.get_mut(VarId::new(owner, 1)).is_none());
            assert!(state.require_mut(VarId::new(owner, 1)).is_err());
            assert_eq!(state.get(VarId::new(owner, 0)), Some(&-1.0));
        }
        assert_eq!(data, [-1.0, 2.0]);
    }
}
