// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The constant-folding oracle. Analyses only ever query it through [`ConstLookup`]; the
//! [`ConstantTable`] shipped here folds the statically evident constants of a package ahead of
//! time.


use std::fmt::{self, Display, Formatter};

use qcc_data_structures::display::Bracketed;
use rustc_hash::FxHashMap;

use crate::ir::{BinOp, Literal, OpKind, Operation, Package, Region, ValueId};

/// A compile-time known value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Const {
    Int(i64),
    Bool(bool),
    Range(IntRange),
    Slice(SliceBounds),
    Tuple(Vec<Const>),
}

impl Const {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Const::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Const::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The elements produced by iterating over this constant, if it is iterable.
    #[must_use]
    pub fn items(&self) -> Option<Vec<Const>> {
        match self {
            Const::Range(range) => Some(range.iter().map(Const::Int).collect()),
            Const::Tuple(elems) => Some(elems.clone()),
            _ => None,
        }
    }

    /// The number of items produced by iterating over this constant, if it is iterable.
    #[must_use]
    pub fn iteration_count(&self) -> Option<usize> {
        match self {
            Const::Range(range) => Some(range.len()),
            Const::Tuple(elems) => Some(elems.len()),
            _ => None,
        }
    }
}

impl Display for Const {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(value) => write!(f, "{value}"),
            Const::Bool(value) => write!(f, "{value}"),
            Const::Range(range) => write!(f, "{range}"),
            Const::Slice(slice) => write!(f, "{slice}"),
            Const::Tuple(elems) => write!(f, "{}", Bracketed(elems)),
        }
    }
}

/// A half-open integer range with a non-zero step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntRange {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl IntRange {
    #[must_use]
    pub fn new(start: i64, stop: i64, step: i64) -> Option<Self> {
        (step != 0).then_some(Self { start, stop, step })
    }

    /// The number of items, saturating at `usize::MAX`.
    #[must_use]
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            i128::from(self.stop) - i128::from(self.start)
        } else {
            i128::from(self.start) - i128::from(self.stop)
        };
        if span <= 0 {
            return 0;
        }
        let count = span.unsigned_abs().div_ceil(u128::from(self.step.unsigned_abs()));
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + use<> {
        let Self { start, step, .. } = *self;
        (0..self.len()).map_while(move |i| {
            let offset = i128::from(step) * i128::try_from(i).ok()?;
            i64::try_from(i128::from(start) + offset).ok()
        })
    }
}

impl Display for IntRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "range({}, {}, {})", self.start, self.stop, self.step)
    }
}

/// Python-style slice bounds. Missing bounds take their usual defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SliceBounds {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceBounds {
    /// The positions selected by this slice in a sequence of `len` elements, or `None` if the step
    /// is zero.
    #[must_use]
    pub fn indices(&self, len: usize) -> Option<Vec<usize>> {
        let len = i64::try_from(len).ok()?;
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return None;
        }
        let clamp = |bound: i64, lower: i64, upper: i64| {
            let bound = if bound < 0 { bound + len } else { bound };
            bound.clamp(lower, upper)
        };
        let (start, stop) = if step > 0 {
            (
                self.start.map_or(0, |start| clamp(start, 0, len)),
                self.stop.map_or(len, |stop| clamp(stop, 0, len)),
            )
        } else {
            (
                self.start.map_or(len - 1, |start| clamp(start, -1, len - 1)),
                self.stop.map_or(-1, |stop| clamp(stop, -1, len - 1)),
            )
        };

        let mut indices = Vec::new();
        let mut index = Some(start);
        while let Some(current) = index
            && ((step > 0 && current < stop) || (step < 0 && current > stop))
        {
            indices.push(usize::try_from(current).ok()?);
            index = current.checked_add(step);
        }
        Some(indices)
    }
}

impl Display for SliceBounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let show = |bound: Option<i64>| bound.map_or(String::new(), |b| b.to_string());
        write!(f, "{}:{}", show(self.start), show(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

/// Resolves a possibly negative index into a sequence of `len` elements.
#[must_use]
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

/// Answers "is this value a compile-time constant, and which one?".
pub trait ConstLookup {
    fn constant(&self, value: ValueId) -> Option<&Const>;
}

/// An oracle that knows no constants.
pub struct NoConstants;

impl ConstLookup for NoConstants {
    fn constant(&self, _value: ValueId) -> Option<&Const> {
        None
    }
}

/// Constants found by folding a package once, ahead of any analysis.
#[derive(Clone, Debug, Default)]
pub struct ConstantTable {
    constants: FxHashMap<ValueId, Const>,
}

impl ConstLookup for ConstantTable {
    fn constant(&self, value: ValueId) -> Option<&Const> {
        self.constants.get(&value)
    }
}

impl ConstantTable {
    /// Folds every callable of the package. Folding never looks through calls or block
    /// parameters, so only values that are constant in every context are recorded.
    #[must_use]
    pub fn fold(package: &Package) -> Self {
        let mut table = Self::default();
        for (_, callable) in package.callables.iter() {
            table.fold_region(&callable.body);
        }
        table
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    fn fold_region(&mut self, region: &Region) {
        for (_, block) in region.blocks.iter() {
            for op in &block.ops {
                self.fold_op(op);
                for nested in op.kind.regions() {
                    self.fold_region(nested);
                }
            }
        }
    }

    fn fold_op(&mut self, op: &Operation) {
        let [result] = op.results.as_slice() else {
            return;
        };
        if let Some(constant) = self.eval(&op.kind) {
            self.constants.insert(*result, constant);
        }
    }

    fn get(&self, value: ValueId) -> Option<&Const> {
        self.constants.get(&value)
    }

    fn int(&self, value: ValueId) -> Option<i64> {
        self.get(value).and_then(Const::as_int)
    }

    fn eval(&self, kind: &OpKind) -> Option<Const> {
        match kind {
            OpKind::Literal(Literal::Int(value)) => Some(Const::Int(*value)),
            OpKind::Literal(Literal::Bool(value)) => Some(Const::Bool(*value)),
            OpKind::NewTuple(elems) | OpKind::NewList(elems) => elems
                .iter()
                .map(|elem| self.get(*elem).cloned())
                .collect::<Option<Vec<_>>>()
                .map(Const::Tuple),
            OpKind::Range { start, stop, step } => {
                IntRange::new(self.int(*start)?, self.int(*stop)?, self.int(*step)?)
                    .map(Const::Range)
            }
            OpKind::Slice { start, stop, step } => {
                let bound = |value: &Option<ValueId>| match value {
                    Some(value) => self.int(*value).map(Some),
                    None => Some(None),
                };
                Some(Const::Slice(SliceBounds {
                    start: bound(start)?,
                    stop: bound(stop)?,
                    step: bound(step)?,
                }))
            }
            OpKind::Binary(op, lhs, rhs) => eval_binary(*op, self.get(*lhs)?, self.get(*rhs)?),
            OpKind::Not(value) => Some(Const::Bool(!self.get(*value)?.as_bool()?)),
            OpKind::GetItem { obj, index } => {
                let Const::Tuple(elems) = self.get(*obj)? else {
                    return None;
                };
                match self.get(*index)? {
                    Const::Int(index) => elems.get(normalize_index(*index, elems.len())?).cloned(),
                    Const::Slice(slice) => Some(Const::Tuple(
                        slice
                            .indices(elems.len())?
                            .into_iter()
                            .map(|i| elems[i].clone())
                            .collect(),
                    )),
                    _ => None,
                }
            }
            OpKind::Concat(lhs, rhs) => match (self.get(*lhs)?, self.get(*rhs)?) {
                (Const::Tuple(lhs), Const::Tuple(rhs)) => {
                    Some(Const::Tuple(lhs.iter().chain(rhs).cloned().collect()))
                }
                _ => None,
            },
            OpKind::Alias(value) => self.get(*value).cloned(),
            _ => None,
        }
    }
}

fn eval_binary(op: BinOp, lhs: &Const, rhs: &Const) -> Option<Const> {
    match (lhs, rhs) {
        (Const::Int(lhs), Const::Int(rhs)) => match op {
            BinOp::Add => lhs.checked_add(*rhs).map(Const::Int),
            BinOp::Sub => lhs.checked_sub(*rhs).map(Const::Int),
            BinOp::Mul => lhs.checked_mul(*rhs).map(Const::Int),
            BinOp::Eq => Some(Const::Bool(lhs == rhs)),
            BinOp::Ne => Some(Const::Bool(lhs != rhs)),
            BinOp::Lt => Some(Const::Bool(lhs < rhs)),
            BinOp::Le => Some(Const::Bool(lhs <= rhs)),
            BinOp::And | BinOp::Or | BinOp::Xor => None,
        },
        (Const::Bool(lhs), Const::Bool(rhs)) => match op {
            BinOp::And => Some(Const::Bool(*lhs && *rhs)),
            BinOp::Or => Some(Const::Bool(*lhs || *rhs)),
            BinOp::Xor | BinOp::Ne => Some(Const::Bool(lhs != rhs)),
            BinOp::Eq => Some(Const::Bool(lhs == rhs)),
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Lt | BinOp::Le => None,
        },
        _ => None,
    }
}
