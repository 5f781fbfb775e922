// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(test)]
mod tests;

use std::collections::hash_map::Entry;

use qcc_ir::{const_fold::Const, ir::ValueId};
use rustc_hash::FxHashMap;

use crate::lattice::Lattice;

/// A lattice value together with the constant it is known to equal, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct Fact<L> {
    pub value: L,
    pub constant: Option<Const>,
}

impl<L: Lattice> Fact<L> {
    #[must_use]
    pub fn new(value: L) -> Self {
        Self {
            value,
            constant: None,
        }
    }

    #[must_use]
    pub fn with_constant(value: L, constant: Option<Const>) -> Self {
        Self { value, constant }
    }

    /// Joins the values. The constant survives only if both sides agree on it.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            value: self.value.join(&other.value),
            constant: if self.constant == other.constant {
                self.constant.clone()
            } else {
                None
            },
        }
    }

    #[must_use]
    pub fn widen(&self) -> Self {
        Self::new(L::top())
    }
}

/// A value whose lattice value is temporarily refined along one path of a branch.
#[derive(Clone, Debug, PartialEq)]
pub struct Assumption<L> {
    pub value: ValueId,
    pub fact: Fact<L>,
}

/// The environment of an analysis. Reads fall through to the parent frame, writes stay local.
#[derive(Debug)]
pub struct Frame<'p, L> {
    parent: Option<&'p Frame<'p, L>>,
    values: FxHashMap<ValueId, L>,
    constants: FxHashMap<ValueId, Const>,
    assumption: Option<Assumption<L>>,
}

impl<L: Lattice> Default for Frame<'_, L> {
    fn default() -> Self {
        Self::root()
    }
}

impl<L: Lattice> Frame<'_, L> {
    #[must_use]
    pub fn root() -> Self {
        Self {
            parent: None,
            values: FxHashMap::default(),
            constants: FxHashMap::default(),
            assumption: None,
        }
    }

    #[must_use]
    pub fn child(&self) -> Frame<'_, L> {
        Frame {
            parent: Some(self),
            values: FxHashMap::default(),
            constants: FxHashMap::default(),
            assumption: None,
        }
    }

    #[must_use]
    pub fn value(&self, id: ValueId) -> Option<&L> {
        if let Some(assumption) = &self.assumption
            && assumption.value == id
        {
            return Some(&assumption.fact.value);
        }
        self.values
            .get(&id)
            .or_else(|| self.parent.and_then(|parent| parent.value(id)))
    }

    #[must_use]
    pub fn constant(&self, id: ValueId) -> Option<&Const> {
        if let Some(assumption) = &self.assumption
            && assumption.value == id
        {
            return assumption.fact.constant.as_ref();
        }
        self.constants
            .get(&id)
            .or_else(|| self.parent.and_then(|parent| parent.constant(id)))
    }

    /// Returns `true` if the value was written in this frame or one of its ancestors.
    #[must_use]
    pub fn contains(&self, id: ValueId) -> bool {
        self.values.contains_key(&id) || self.parent.is_some_and(|parent| parent.contains(id))
    }

    pub fn write(&mut self, id: ValueId, fact: Fact<L>) {
        match fact.constant {
            Some(constant) => self.constants.insert(id, constant),
            None => self.constants.remove(&id),
        };
        self.values.insert(id, fact.value);
    }

    pub fn write_value(&mut self, id: ValueId, value: L) {
        self.constants.remove(&id);
        self.values.insert(id, value);
    }

    /// Refines one value for the block about to run. Replaces any previous refinement.
    pub fn assume(&mut self, assumption: Option<Assumption<L>>) {
        self.assumption = assumption;
    }

    /// Joins values computed in a child frame into this frame.
    pub fn merge(&mut self, values: FxHashMap<ValueId, L>) {
        for (id, value) in values {
            match self.values.entry(id) {
                Entry::Occupied(mut entry) => {
                    let joined = entry.get().join(&value);
                    entry.insert(joined);
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
    }

    #[must_use]
    pub fn into_values(self) -> FxHashMap<ValueId, L> {
        self.values
    }
}
