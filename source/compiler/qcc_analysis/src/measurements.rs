// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Measurement identifier tracking. Values holding measurement outcomes are mapped to cells of a
//! shared [`RecordState`], whose offsets are the relative record indices of the outcomes once the
//! analysis finishes.

#[cfg(test)]
mod tests;

mod accumulator;
pub mod record;

use std::fmt::{self, Display, Formatter, Write};

use indenter::indented;
use log::debug;
use qcc_data_structures::display::{set_indentation, write_list};
use qcc_dataflow::{
    AnalysisConfig, AnalysisResult, Engine, Error, EvalContext, Lattice, LoopRunner, Transfer,
};
use qcc_ir::{
    const_fold::{Const, ConstLookup, SliceBounds, normalize_index},
    ir::{CallableId, OpKind, Operation, Package, Predicate, ValueId},
    ty::Ty,
};

use self::record::{CellId, RecordState};

/// A compile-time known index into a tuple of measurements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexOrSlice {
    Index(i64),
    Slice(SliceBounds),
}

impl Display for IndexOrSlice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IndexOrSlice::Index(index) => write!(f, "index({index})"),
            IndexOrSlice::Slice(bounds) => write!(f, "slice({bounds})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MeasurementId {
    Invalid,
    Any,
    /// A value unrelated to measurement.
    NotAMeasurement,
    /// One measurement outcome, optionally viewed through a predicate.
    Raw(CellId, Option<Predicate>),
    Tuple {
        elems: Vec<MeasurementId>,
        predicate: Option<Predicate>,
        /// Set once the tuple has been sealed into a detector or observable.
        immutable: bool,
    },
    ConstantIndexOrSlice(IndexOrSlice),
}

impl MeasurementId {
    /// A mutable tuple without a predicate.
    #[must_use]
    pub fn tuple(elems: Vec<MeasurementId>) -> Self {
        MeasurementId::Tuple {
            elems,
            predicate: None,
            immutable: false,
        }
    }

    /// The elements of a tuple.
    #[must_use]
    pub fn elements(&self) -> Option<&[MeasurementId]> {
        match self {
            MeasurementId::Tuple { elems, .. } => Some(elems),
            _ => None,
        }
    }

    /// Every cell referred to by this value, in order.
    #[must_use]
    pub fn cells(&self) -> Vec<CellId> {
        match self {
            MeasurementId::Raw(cell, _) => vec![*cell],
            MeasurementId::Tuple { elems, .. } => elems.iter().flat_map(Self::cells).collect(),
            _ => Vec::new(),
        }
    }

    /// Displays the value with every cell replaced by its current record offset.
    #[must_use]
    pub fn resolve<'a>(&'a self, record: &'a RecordState) -> Resolved<'a> {
        Resolved {
            value: self,
            record,
        }
    }

    fn is_known_empty(&self) -> bool {
        matches!(self, MeasurementId::Tuple { elems, .. } if elems.is_empty())
    }

    fn carries_measurement(&self) -> bool {
        matches!(
            self,
            MeasurementId::Any | MeasurementId::Raw(..) | MeasurementId::Tuple { .. }
        )
    }

    fn zip_with(&self, other: &Self, f: impl Fn(&Self, &Self) -> Self) -> Option<Self> {
        match (self, other) {
            (
                MeasurementId::Tuple {
                    elems: lhs,
                    predicate: lhs_predicate,
                    immutable: lhs_immutable,
                },
                MeasurementId::Tuple {
                    elems: rhs,
                    predicate: rhs_predicate,
                    immutable: rhs_immutable,
                },
            ) if lhs.len() == rhs.len()
                && lhs_predicate == rhs_predicate
                && lhs_immutable == rhs_immutable =>
            {
                Some(MeasurementId::Tuple {
                    elems: lhs.iter().zip(rhs).map(|(l, r)| f(l, r)).collect(),
                    predicate: *lhs_predicate,
                    immutable: *lhs_immutable,
                })
            }
            _ => None,
        }
    }
}

impl Lattice for MeasurementId {
    fn bottom() -> Self {
        MeasurementId::Invalid
    }

    fn top() -> Self {
        MeasurementId::Any
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            _ if self == other => self.clone(),
            (MeasurementId::Invalid, value) | (value, MeasurementId::Invalid) => value.clone(),
            _ => self
                .zip_with(other, Self::join)
                .unwrap_or(MeasurementId::Any),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            _ if self == other => self.clone(),
            (MeasurementId::Any, value) | (value, MeasurementId::Any) => value.clone(),
            _ => self
                .zip_with(other, Self::meet)
                .unwrap_or(MeasurementId::Invalid),
        }
    }

    fn is_subset_of(&self, other: &Self) -> bool {
        match (self, other) {
            _ if self == other => true,
            (MeasurementId::Invalid, _) | (_, MeasurementId::Any) => true,
            (
                MeasurementId::Tuple {
                    elems: lhs,
                    predicate: lhs_predicate,
                    immutable: lhs_immutable,
                },
                MeasurementId::Tuple {
                    elems: rhs,
                    predicate: rhs_predicate,
                    immutable: rhs_immutable,
                },
            ) => {
                lhs.len() == rhs.len()
                    && lhs_predicate == rhs_predicate
                    && lhs_immutable == rhs_immutable
                    && lhs.iter().zip(rhs).all(|(l, r)| l.is_subset_of(r))
            }
            _ => false,
        }
    }
}

impl Display for MeasurementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementId::Invalid => write!(f, "invalid"),
            MeasurementId::Any => write!(f, "?"),
            MeasurementId::NotAMeasurement => write!(f, "_"),
            MeasurementId::Raw(cell, predicate) => write_raw(f, cell, *predicate),
            MeasurementId::Tuple {
                elems, immutable, ..
            } => write_tuple(f, elems, *immutable),
            MeasurementId::ConstantIndexOrSlice(index) => write!(f, "{index}"),
        }
    }
}

/// A measurement identifier displayed with record offsets.
pub struct Resolved<'a> {
    value: &'a MeasurementId,
    record: &'a RecordState,
}

impl Display for Resolved<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.value {
            MeasurementId::Raw(cell, predicate) => {
                let offset = self
                    .record
                    .offset(*cell)
                    .map_or_else(|| "?".to_string(), |offset| offset.to_string());
                write_raw(f, format_args!("rec[{offset}]"), *predicate)
            }
            MeasurementId::Tuple {
                elems, immutable, ..
            } => write_tuple(
                f,
                elems.iter().map(|elem| elem.resolve(self.record)),
                *immutable,
            ),
            other => write!(f, "{other}"),
        }
    }
}

fn write_raw(
    f: &mut Formatter<'_>,
    cell: impl Display,
    predicate: Option<Predicate>,
) -> fmt::Result {
    match predicate {
        Some(predicate) => write!(f, "{predicate}({cell})"),
        None => write!(f, "{cell}"),
    }
}

fn write_tuple<T: Display>(
    f: &mut Formatter<'_>,
    elems: impl IntoIterator<Item = T>,
    immutable: bool,
) -> fmt::Result {
    if immutable {
        write!(f, "sealed")?;
    }
    write!(f, "[")?;
    write_list(f, elems)?;
    write!(f, "]")
}

/// The measurement semantics of the operations. Owns the record of the run.
#[derive(Debug, Default)]
pub struct MeasurementTransfer {
    record: RecordState,
}

impl MeasurementTransfer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn record(&self) -> &RecordState {
        &self.record
    }

    #[must_use]
    pub fn into_record(self) -> RecordState {
        self.record
    }

    fn measure(&mut self, ty: &Ty) -> MeasurementId {
        if measured_count(ty).is_some() {
            self.allocate_shape(ty)
        } else {
            MeasurementId::Any
        }
    }

    fn allocate_shape(&mut self, ty: &Ty) -> MeasurementId {
        match ty {
            Ty::Qubit | Ty::Wire => MeasurementId::Raw(self.record.allocate(), None),
            Ty::Array(elem, Some(len)) => {
                MeasurementId::tuple((0..*len).map(|_| self.allocate_shape(elem)).collect())
            }
            Ty::Tuple(elems) => {
                MeasurementId::tuple(elems.iter().map(|elem| self.allocate_shape(elem)).collect())
            }
            _ => MeasurementId::Any,
        }
    }

    fn seal(&mut self, value: &MeasurementId) -> MeasurementId {
        match value {
            MeasurementId::Raw(..) => MeasurementId::Tuple {
                elems: vec![self.freeze(value)],
                predicate: None,
                immutable: true,
            },
            MeasurementId::Tuple { .. } => self.freeze(value),
            MeasurementId::Any => MeasurementId::Any,
            _ => MeasurementId::Invalid,
        }
    }

    fn freeze(&mut self, value: &MeasurementId) -> MeasurementId {
        match value {
            MeasurementId::Raw(cell, predicate) => {
                MeasurementId::Raw(self.record.freeze(*cell), *predicate)
            }
            MeasurementId::Tuple {
                elems, predicate, ..
            } => MeasurementId::Tuple {
                elems: elems.iter().map(|elem| self.freeze(elem)).collect(),
                predicate: *predicate,
                immutable: true,
            },
            other => other.clone(),
        }
    }
}

impl Transfer for MeasurementTransfer {
    type Value = MeasurementId;

    fn eval(
        &mut self,
        ctx: &EvalContext<'_, MeasurementId>,
        op: &Operation,
    ) -> Option<Vec<MeasurementId>> {
        let value = match &op.kind {
            OpKind::Literal(_) | OpKind::Range { .. } | OpKind::Slice { .. } => scalar(ctx, op),
            OpKind::Binary(_, lhs, rhs) => {
                if ctx.value(*lhs).carries_measurement() || ctx.value(*rhs).carries_measurement() {
                    MeasurementId::Any
                } else {
                    scalar(ctx, op)
                }
            }
            OpKind::Not(value) => {
                if ctx.value(*value).carries_measurement() {
                    MeasurementId::Any
                } else {
                    scalar(ctx, op)
                }
            }
            OpKind::NewTuple(elems) | OpKind::NewList(elems) => {
                let elems = elems.iter().map(|elem| ctx.value(*elem)).collect::<Vec<_>>();
                if !elems.is_empty() && elems.iter().all(|e| *e == MeasurementId::NotAMeasurement) {
                    MeasurementId::NotAMeasurement
                } else {
                    MeasurementId::tuple(elems)
                }
            }
            OpKind::GetItem { obj, index } => get_item(ctx, *obj, *index),
            OpKind::Concat(lhs, rhs) => concat(ctx, *lhs, *rhs),
            OpKind::NewQubits(_)
            | OpKind::Unwrap(_)
            | OpKind::Wrap(_)
            | OpKind::FunctionRef(_) => MeasurementId::NotAMeasurement,
            OpKind::Gate { .. } => {
                return Some(vec![MeasurementId::NotAMeasurement; op.results.len()]);
            }
            OpKind::Measure(target) => self.measure(ctx.ty(*target)),
            OpKind::Predicate(predicate, value) => apply_predicate(*predicate, ctx.value(*value)),
            OpKind::Detector(value) | OpKind::Observable(value) => self.seal(&ctx.value(*value)),
            OpKind::Alias(_)
            | OpKind::Call { .. }
            | OpKind::Invoke { .. }
            | OpKind::IfElse { .. }
            | OpKind::For { .. }
            | OpKind::Opaque { .. } => return None,
        };
        Some(vec![value])
    }

    fn fallback(&self, ty: &Ty) -> MeasurementId {
        if ty.contains_bit() || *ty == Ty::Unknown {
            MeasurementId::Any
        } else {
            MeasurementId::NotAMeasurement
        }
    }

    fn from_constant(&self, constant: &Const, _ty: &Ty) -> MeasurementId {
        from_constant(constant)
    }

    fn iteration_items(
        &self,
        ctx: &EvalContext<'_, MeasurementId>,
        iterable: ValueId,
    ) -> Option<Vec<MeasurementId>> {
        ctx.value(iterable).elements().map(<[_]>::to_vec)
    }

    fn unresolved_loop(
        &mut self,
        runner: &mut LoopRunner<'_, '_, '_, MeasurementId>,
    ) -> Result<Option<Vec<MeasurementId>>, Error> {
        accumulator::expand_loop(self, runner)
    }
}

/// The number of outcomes produced by measuring a value of the type.
fn measured_count(ty: &Ty) -> Option<usize> {
    match ty {
        Ty::Qubit | Ty::Wire => Some(1),
        Ty::Array(elem, Some(len)) => measured_count(elem).map(|count| count * len),
        Ty::Tuple(elems) => elems.iter().map(measured_count).sum(),
        _ => None,
    }
}

fn from_constant(constant: &Const) -> MeasurementId {
    match constant {
        Const::Int(index) => MeasurementId::ConstantIndexOrSlice(IndexOrSlice::Index(*index)),
        Const::Slice(bounds) => MeasurementId::ConstantIndexOrSlice(IndexOrSlice::Slice(*bounds)),
        _ => MeasurementId::NotAMeasurement,
    }
}

fn scalar(ctx: &EvalContext<'_, MeasurementId>, op: &Operation) -> MeasurementId {
    op.results
        .first()
        .and_then(|result| ctx.constant(*result))
        .map_or(MeasurementId::NotAMeasurement, from_constant)
}

fn index_of(ctx: &EvalContext<'_, MeasurementId>, index: ValueId) -> Option<IndexOrSlice> {
    match ctx.constant(index) {
        Some(Const::Int(index)) => Some(IndexOrSlice::Index(*index)),
        Some(Const::Slice(bounds)) => Some(IndexOrSlice::Slice(*bounds)),
        _ => match ctx.value(index) {
            MeasurementId::ConstantIndexOrSlice(index) => Some(index),
            _ => None,
        },
    }
}

fn get_item(ctx: &EvalContext<'_, MeasurementId>, obj: ValueId, index: ValueId) -> MeasurementId {
    match ctx.value(obj) {
        MeasurementId::Tuple {
            elems,
            predicate,
            immutable,
        } => match index_of(ctx, index) {
            Some(IndexOrSlice::Index(index)) => normalize_index(index, elems.len())
                .and_then(|index| elems.into_iter().nth(index))
                .unwrap_or(MeasurementId::Invalid),
            Some(IndexOrSlice::Slice(bounds)) => match bounds.indices(elems.len()) {
                Some(indices) => MeasurementId::Tuple {
                    elems: indices.into_iter().map(|i| elems[i].clone()).collect(),
                    predicate,
                    immutable,
                },
                None => MeasurementId::Invalid,
            },
            None => MeasurementId::Invalid,
        },
        MeasurementId::Any => MeasurementId::Any,
        MeasurementId::NotAMeasurement => MeasurementId::NotAMeasurement,
        _ => MeasurementId::Invalid,
    }
}

fn concat(ctx: &EvalContext<'_, MeasurementId>, lhs: ValueId, rhs: ValueId) -> MeasurementId {
    let known_empty = |value: ValueId| {
        ctx.value(value).is_known_empty() || ctx.ty(value).len() == Some(0)
    };
    if known_empty(lhs) {
        return ctx.value(rhs);
    }
    if known_empty(rhs) {
        return ctx.value(lhs);
    }
    match (ctx.value(lhs), ctx.value(rhs)) {
        (MeasurementId::Invalid, _) | (_, MeasurementId::Invalid) => MeasurementId::Invalid,
        (MeasurementId::Any, _) | (_, MeasurementId::Any) => MeasurementId::Any,
        (
            MeasurementId::Tuple {
                elems: mut lhs,
                predicate,
                immutable,
            },
            MeasurementId::Tuple {
                elems: rhs,
                predicate: rhs_predicate,
                immutable: rhs_immutable,
            },
        ) if predicate == rhs_predicate && immutable == rhs_immutable => {
            lhs.extend(rhs);
            MeasurementId::Tuple {
                elems: lhs,
                predicate,
                immutable,
            }
        }
        (MeasurementId::NotAMeasurement, MeasurementId::NotAMeasurement) => {
            MeasurementId::NotAMeasurement
        }
        _ => MeasurementId::Invalid,
    }
}

fn apply_predicate(predicate: Predicate, value: MeasurementId) -> MeasurementId {
    match value {
        MeasurementId::Raw(cell, None) => MeasurementId::Raw(cell, Some(predicate)),
        MeasurementId::Tuple {
            elems,
            predicate: None,
            immutable,
        } => elems
            .into_iter()
            .map(|elem| match elem {
                MeasurementId::Raw(cell, None) => Some(MeasurementId::Raw(cell, Some(predicate))),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map_or(MeasurementId::Invalid, |elems| MeasurementId::Tuple {
                elems,
                predicate: Some(predicate),
                immutable,
            }),
        MeasurementId::Any => MeasurementId::Any,
        _ => MeasurementId::Invalid,
    }
}

/// The outcome of the measurement analysis: the analysis result and the final record, whose
/// counter is the total number of measurements and whose cell offsets resolve every `Raw` value.
#[derive(Clone, Debug)]
pub struct MeasurementAnalysis {
    pub result: AnalysisResult<MeasurementId>,
    pub record: RecordState,
}

impl MeasurementAnalysis {
    #[must_use]
    pub fn measurement_count(&self) -> usize {
        self.record.counter()
    }

    #[must_use]
    pub fn value(&self, id: ValueId) -> Option<Resolved<'_>> {
        self.result.value(id).map(|value| value.resolve(&self.record))
    }

    #[must_use]
    pub fn ret(&self) -> Resolved<'_> {
        self.result.ret.resolve(&self.record)
    }
}

impl Display for MeasurementAnalysis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        write!(indent, "MeasurementAnalysis:")?;
        indent = set_indentation(indent, 1);
        write!(indent, "\nmeasurements: {}", self.measurement_count())?;
        write!(indent, "\nreturn: {}", self.ret())?;
        write!(indent, "\nvalues:")?;
        indent = set_indentation(indent, 2);
        for (id, value) in self.result.values.iter() {
            write!(indent, "\n{id}: {}", value.resolve(&self.record))?;
        }
        if !self.result.warnings.is_empty() {
            indent = set_indentation(indent, 1);
            write!(indent, "\nwarnings:")?;
            indent = set_indentation(indent, 2);
            for warning in &self.result.warnings {
                write!(indent, "\n{warning}")?;
            }
        }
        Ok(())
    }
}

/// Runs the measurement identifier analysis over a callable.
pub fn analyze_measurements(
    package: &Package,
    constants: &dyn ConstLookup,
    callable: CallableId,
    config: AnalysisConfig,
) -> Result<MeasurementAnalysis, Error> {
    let mut transfer = MeasurementTransfer::new();
    let result = Engine::new(package, constants, config).analyze(&mut transfer, callable, &[])?;
    let record = transfer.into_record();
    debug!("measurement analysis recorded {} measurements", record.counter());
    Ok(MeasurementAnalysis { result, record })
}
