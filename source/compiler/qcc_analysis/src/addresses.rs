// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Qubit identity tracking. Every value is mapped to the concrete qubits it denotes so that later
//! passes can reason about aliasing.

#[cfg(test)]
mod tests;

use std::{
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

use log::debug;
use qcc_data_structures::display::write_list;
use qcc_dataflow::{AnalysisConfig, AnalysisResult, Engine, Error, EvalContext, Lattice, Transfer};
use qcc_ir::{
    const_fold::{Const, ConstLookup, normalize_index},
    ir::{CallableId, OpKind, Operation, Package, ValueId},
};

/// Identifies a qubit by the order in which it was allocated.
pub type QubitId = usize;

/// Sequences compare by their elements, so a `Tuple` of single qubits equals the `Register` of
/// the same qubits.
#[derive(Clone, Debug, Eq)]
pub enum Address {
    /// Definitely not a qubit-carrying value.
    NotQubit,
    /// A qubit-carrying value whose qubits are unknown.
    AnyAddress,
    Qubit(QubitId),
    /// A non-empty sequence of single qubits.
    Register(Vec<QubitId>),
    /// Any other sequence, including the empty one.
    Tuple(Vec<Address>),
    /// A wire view of a qubit.
    Wire(QubitId),
    Function(CallableId),
}

impl Address {
    /// Builds a sequence in its canonical form: `Register` when every element is a single qubit,
    /// `Tuple` otherwise.
    #[must_use]
    pub fn sequence(elems: Vec<Address>) -> Self {
        if elems.is_empty() {
            return Address::Tuple(elems);
        }
        let ids = elems
            .iter()
            .map(|elem| match elem {
                Address::Qubit(id) => Some(*id),
                _ => None,
            })
            .collect::<Option<Vec<_>>>();
        match ids {
            Some(ids) => Address::Register(ids),
            None => Address::Tuple(elems),
        }
    }

    /// The elements of a sequence.
    #[must_use]
    pub fn elements(&self) -> Option<Vec<Address>> {
        match self {
            Address::Register(ids) => Some(ids.iter().copied().map(Address::Qubit).collect()),
            Address::Tuple(elems) => Some(elems.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty_sequence(&self) -> bool {
        match self {
            Address::Register(ids) => ids.is_empty(),
            Address::Tuple(elems) => elems.is_empty(),
            _ => false,
        }
    }

    /// Every qubit this value denotes, in order, or `None` if some of them are unknown.
    #[must_use]
    pub fn qubits(&self) -> Option<Vec<QubitId>> {
        match self {
            Address::NotQubit | Address::Function(_) => Some(Vec::new()),
            Address::AnyAddress => None,
            Address::Qubit(id) | Address::Wire(id) => Some(vec![*id]),
            Address::Register(ids) => Some(ids.clone()),
            Address::Tuple(elems) => {
                let mut qubits = Vec::new();
                for elem in elems {
                    qubits.extend(elem.qubits()?);
                }
                Some(qubits)
            }
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(&Self, &Self) -> Self) -> Option<Self> {
        let (lhs, rhs) = (self.elements()?, other.elements()?);
        (lhs.len() == rhs.len()).then(|| {
            Address::sequence(lhs.iter().zip(&rhs).map(|(l, r)| f(l, r)).collect())
        })
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Address::NotQubit, Address::NotQubit) | (Address::AnyAddress, Address::AnyAddress) => {
                true
            }
            (Address::Qubit(lhs), Address::Qubit(rhs))
            | (Address::Wire(lhs), Address::Wire(rhs)) => lhs == rhs,
            (Address::Function(lhs), Address::Function(rhs)) => lhs == rhs,
            (Address::Register(lhs), Address::Register(rhs)) => lhs == rhs,
            (Address::Tuple(lhs), Address::Tuple(rhs)) => lhs == rhs,
            (Address::Register(ids), Address::Tuple(elems))
            | (Address::Tuple(elems), Address::Register(ids)) => {
                ids.len() == elems.len()
                    && ids
                        .iter()
                        .zip(elems)
                        .all(|(id, elem)| matches!(elem, Address::Qubit(qubit) if qubit == id))
            }
            _ => false,
        }
    }
}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Address::NotQubit => 0u8.hash(state),
            Address::AnyAddress => 1u8.hash(state),
            Address::Qubit(id) => {
                2u8.hash(state);
                id.hash(state);
            }
            Address::Register(ids) => {
                3u8.hash(state);
                ids.len().hash(state);
                for id in ids {
                    Address::Qubit(*id).hash(state);
                }
            }
            Address::Tuple(elems) => {
                3u8.hash(state);
                elems.len().hash(state);
                for elem in elems {
                    elem.hash(state);
                }
            }
            Address::Wire(id) => {
                4u8.hash(state);
                id.hash(state);
            }
            Address::Function(id) => {
                5u8.hash(state);
                id.hash(state);
            }
        }
    }
}

impl Lattice for Address {
    fn bottom() -> Self {
        Address::NotQubit
    }

    fn top() -> Self {
        Address::AnyAddress
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            _ if self == other => self.clone(),
            (Address::NotQubit, value) | (value, Address::NotQubit) => value.clone(),
            (Address::AnyAddress, _) | (_, Address::AnyAddress) => Address::AnyAddress,
            _ => self
                .zip_with(other, Self::join)
                .unwrap_or(Address::AnyAddress),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            _ if self == other => self.clone(),
            (Address::AnyAddress, value) | (value, Address::AnyAddress) => value.clone(),
            (Address::NotQubit, _) | (_, Address::NotQubit) => Address::NotQubit,
            _ => self
                .zip_with(other, Self::meet)
                .unwrap_or(Address::NotQubit),
        }
    }

    fn is_subset_of(&self, other: &Self) -> bool {
        match (self, other) {
            _ if self == other => true,
            (Address::NotQubit, _) | (_, Address::AnyAddress) => true,
            _ => match (self.elements(), other.elements()) {
                (Some(lhs), Some(rhs)) => {
                    lhs.len() == rhs.len() && lhs.iter().zip(&rhs).all(|(l, r)| l.is_subset_of(r))
                }
                _ => false,
            },
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Address::NotQubit => write!(f, "_"),
            Address::AnyAddress => write!(f, "?"),
            Address::Qubit(id) => write!(f, "q{id}"),
            Address::Register(ids) => {
                write!(f, "[")?;
                write_list(f, ids.iter().map(|id| format!("q{id}")))?;
                write!(f, "]")
            }
            Address::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                write!(f, ")")
            }
            Address::Wire(id) => write!(f, "wire(q{id})"),
            Address::Function(id) => write!(f, "fn {id}"),
        }
    }
}

/// The address semantics of the operations. Qubit ids are handed out in allocation order.
#[derive(Debug, Default)]
pub struct AddressTransfer {
    next_qubit: QubitId,
}

impl AddressTransfer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of qubits allocated so far.
    #[must_use]
    pub fn qubit_count(&self) -> usize {
        self.next_qubit
    }

    fn allocate(&mut self, count: usize) -> Address {
        let base = self.next_qubit;
        self.next_qubit += count;
        Address::sequence((base..self.next_qubit).map(Address::Qubit).collect())
    }
}

impl Transfer for AddressTransfer {
    type Value = Address;

    fn eval(&mut self, ctx: &EvalContext<'_, Address>, op: &Operation) -> Option<Vec<Address>> {
        let value = match &op.kind {
            OpKind::Literal(_)
            | OpKind::Range { .. }
            | OpKind::Slice { .. }
            | OpKind::Binary(..)
            | OpKind::Not(_)
            | OpKind::Measure(_)
            | OpKind::Predicate(..)
            | OpKind::Detector(_)
            | OpKind::Observable(_) => Address::NotQubit,
            OpKind::NewTuple(elems) | OpKind::NewList(elems) => {
                let elems = elems.iter().map(|elem| ctx.value(*elem)).collect::<Vec<_>>();
                if !elems.is_empty() && elems.iter().all(|elem| *elem == Address::NotQubit) {
                    Address::NotQubit
                } else {
                    Address::sequence(elems)
                }
            }
            OpKind::GetItem { obj, index } => get_item(ctx.value(*obj), ctx.constant(*index)),
            OpKind::Concat(lhs, rhs) => concat(ctx, *lhs, *rhs),
            OpKind::NewQubits(count) => {
                match ctx.int(*count).and_then(|count| usize::try_from(count).ok()) {
                    Some(count) => self.allocate(count),
                    None => Address::AnyAddress,
                }
            }
            OpKind::Unwrap(qubit) => match ctx.value(*qubit) {
                Address::Qubit(id) => Address::Wire(id),
                _ => Address::AnyAddress,
            },
            OpKind::Wrap(wire) => match ctx.value(*wire) {
                Address::Wire(id) => Address::Qubit(id),
                _ => Address::AnyAddress,
            },
            OpKind::Gate { targets, .. } => {
                return Some(
                    targets
                        .iter()
                        .filter(|target| ctx.ty(**target).contains_wire())
                        .map(|target| ctx.value(*target))
                        .collect(),
                );
            }
            OpKind::FunctionRef(callee) => Address::Function(*callee),
            OpKind::Alias(_)
            | OpKind::Call { .. }
            | OpKind::Invoke { .. }
            | OpKind::IfElse { .. }
            | OpKind::For { .. }
            | OpKind::Opaque { .. } => return None,
        };
        Some(vec![value])
    }

    fn iteration_items(
        &self,
        ctx: &EvalContext<'_, Address>,
        iterable: ValueId,
    ) -> Option<Vec<Address>> {
        ctx.value(iterable).elements()
    }

    fn resolve_callee(&self, callee: &Address) -> Option<CallableId> {
        match callee {
            Address::Function(id) => Some(*id),
            _ => None,
        }
    }
}

fn get_item(obj: Address, index: Option<&Const>) -> Address {
    let Some(elems) = obj.elements() else {
        return match obj {
            Address::NotQubit => Address::NotQubit,
            _ => Address::AnyAddress,
        };
    };
    match index {
        Some(Const::Int(index)) => normalize_index(*index, elems.len())
            .and_then(|index| elems.into_iter().nth(index))
            .unwrap_or(Address::NotQubit),
        Some(Const::Slice(bounds)) => match bounds.indices(elems.len()) {
            Some(indices) => {
                Address::sequence(indices.into_iter().map(|i| elems[i].clone()).collect())
            }
            None => Address::NotQubit,
        },
        _ => Address::AnyAddress,
    }
}

fn concat(ctx: &EvalContext<'_, Address>, lhs: ValueId, rhs: ValueId) -> Address {
    let known_empty =
        |value: ValueId| ctx.value(value).is_empty_sequence() || ctx.ty(value).len() == Some(0);
    if known_empty(lhs) {
        return ctx.value(rhs);
    }
    if known_empty(rhs) {
        return ctx.value(lhs);
    }
    let (lhs, rhs) = (ctx.value(lhs), ctx.value(rhs));
    match (lhs.elements(), rhs.elements()) {
        (Some(mut elems), Some(rest)) => {
            elems.extend(rest);
            Address::sequence(elems)
        }
        _ if lhs == Address::NotQubit && rhs == Address::NotQubit => Address::NotQubit,
        _ => Address::AnyAddress,
    }
}

/// Runs the address analysis over a callable.
pub fn analyze_addresses(
    package: &Package,
    constants: &dyn ConstLookup,
    callable: CallableId,
    config: AnalysisConfig,
) -> Result<AnalysisResult<Address>, Error> {
    let mut transfer = AddressTransfer::new();
    let result = Engine::new(package, constants, config).analyze(&mut transfer, callable, &[])?;
    debug!("address analysis allocated {} qubits", transfer.qubit_count());
    Ok(result)
}
