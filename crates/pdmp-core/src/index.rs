//! [`IndexSet`]: compact sets of variable or jump-process indices.
//!
//! Dependency tables are stored as one `IndexSet` per entry. Global
//! dependencies (a clock that reads every coordinate, a kernel whose
//! neighbourhood is the whole model) collapse to [`IndexSet::All`], which
//! costs nothing to store and iterates as a plain range.

use std::iter::Copied;
use std::ops::Range;
use std::slice;

/// A set of indices drawn from a domain `0..len`.
///
/// Invariant: a `Sparse` list is strictly ascending, and a set covering
/// the whole (non-empty) domain is always represented as `All`. The
/// constructors below maintain both, so derived equality is set equality
/// as long as both sides were built against the same domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexSet {
    /// Every index of the domain.
    All {
        /// Size of the domain.
        len: usize,
    },
    /// An explicit, strictly ascending subset.
    Sparse(Vec<usize>),
}

impl IndexSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self::Sparse(Vec::new())
    }

    /// The whole domain `0..len`.
    pub fn all(len: usize) -> Self {
        if len == 0 {
            Self::empty()
        } else {
            Self::All { len }
        }
    }

    /// Build a set from arbitrary (possibly repeated, unordered) indices.
    ///
    /// Every index must be `< domain_len`. The result collapses to `All`
    /// when it covers the domain.
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I, domain_len: usize) -> Self {
        let mut v: Vec<usize> = indices.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        debug_assert!(v.last().is_none_or(|&i| i < domain_len));
        if domain_len > 0 && v.len() == domain_len {
            Self::All { len: domain_len }
        } else {
            Self::Sparse(v)
        }
    }

    /// Number of indices in the set.
    pub fn len(&self) -> usize {
        match self {
            Self::All { len } => *len,
            Self::Sparse(v) => v.len(),
        }
    }

    /// Returns `true` if the set contains no indices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for the `All` fast path.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All { .. })
    }

    /// Membership test. O(1) for `All`, O(log n) for `Sparse`.
    pub fn contains(&self, index: usize) -> bool {
        match self {
            Self::All { len } => index < *len,
            Self::Sparse(v) => v.binary_search(&index).is_ok(),
        }
    }

    /// Iterate over the indices in ascending order.
    pub fn iter(&self) -> IndexSetIter<'_> {
        match self {
            Self::All { len } => IndexSetIter::Range(0..*len),
            Self::Sparse(v) => IndexSetIter::Slice(v.iter().copied()),
        }
    }

    /// Set union over a domain of size `domain_len`.
    pub fn union(&self, other: &Self, domain_len: usize) -> Self {
        if self.is_all() || other.is_all() {
            return Self::all(domain_len);
        }
        Self::from_indices(self.iter().chain(other.iter()), domain_len)
    }

    /// Set difference (`self - other`) over a domain of size `domain_len`.
    pub fn difference(&self, other: &Self, domain_len: usize) -> Self {
        if other.is_all() {
            return Self::empty();
        }
        Self::from_indices(self.iter().filter(|&i| !other.contains(i)), domain_len)
    }

    /// Materialize the indices as a vector.
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

impl Default for IndexSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> IntoIterator for &'a IndexSet {
    type Item = usize;
    type IntoIter = IndexSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the indices of an [`IndexSet`], in ascending order.
#[derive(Clone, Debug)]
pub enum IndexSetIter<'a> {
    /// Iterating an `All` set.
    Range(Range<usize>),
    /// Iterating a `Sparse` set.
    Slice(Copied<slice::Iter<'a, usize>>),
}

impl Iterator for IndexSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Range(r) => r.next(),
            Self::Slice(s) => s.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Range(r) => r.size_hint(),
            Self::Slice(s) => s.size_hint(),
        }
    }
}

impl ExactSizeIterator for IndexSetIter<'_> {}
