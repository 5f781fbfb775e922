// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

/// A bounded lattice of abstract values.
///
/// `join` must be commutative, associative and idempotent, with `bottom` as its identity and
/// `top` as its absorbing element. `is_subset_of` is the partial order induced by `join`:
/// `a.is_subset_of(b)` holds exactly when `a.join(b) == b`.
pub trait Lattice: Clone + Debug + PartialEq {
    /// No information, or unreachable.
    fn bottom() -> Self;

    /// Unknown.
    fn top() -> Self;

    #[must_use]
    fn join(&self, other: &Self) -> Self;

    #[must_use]
    fn meet(&self, other: &Self) -> Self;

    fn is_subset_of(&self, other: &Self) -> bool;

    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }

    fn is_top(&self) -> bool {
        *self == Self::top()
    }
}

/// Joins two sequences element-wise. The sequences must have the same length.
#[must_use]
pub fn join_all<L: Lattice>(lhs: &[L], rhs: &[L]) -> Vec<L> {
    debug_assert_eq!(lhs.len(), rhs.len(), "joined sequences should have equal length");
    lhs.iter().zip(rhs).map(|(l, r)| l.join(r)).collect()
}
