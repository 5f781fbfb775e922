// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.


use std::fmt::{self, Display, Formatter};

use qcc_data_structures::display::write_list;

/// The static type of a program value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Qubit,
    /// A linear view of exactly one qubit.
    Wire,
    /// The outcome of a single measurement.
    Bit,
    Bool,
    Int,
    Float,
    Range,
    Slice,
    /// A homogeneous list, with its length when it is statically known.
    Array(Box<Ty>, Option<usize>),
    Tuple(Vec<Ty>),
    Function,
    Detector,
    Observable,
    Unknown,
}

impl Ty {
    #[must_use]
    pub fn array(elem: Ty, len: Option<usize>) -> Self {
        Ty::Array(Box::new(elem), len)
    }

    /// Returns `true` if a value of this type carries at least one qubit or wire.
    #[must_use]
    pub fn contains_qubit(&self) -> bool {
        match self {
            Ty::Qubit | Ty::Wire => true,
            Ty::Array(elem, _) => elem.contains_qubit(),
            Ty::Tuple(elems) => elems.iter().any(Ty::contains_qubit),
            _ => false,
        }
    }

    /// Returns `true` if a value of this type carries at least one measurement outcome.
    #[must_use]
    pub fn contains_bit(&self) -> bool {
        match self {
            Ty::Bit | Ty::Detector | Ty::Observable => true,
            Ty::Array(elem, _) => elem.contains_bit(),
            Ty::Tuple(elems) => elems.iter().any(Ty::contains_bit),
            _ => false,
        }
    }

    /// The statically known number of elements of a list or tuple type.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Ty::Array(_, len) => *len,
            Ty::Tuple(elems) => Some(elems.len()),
            _ => None,
        }
    }

    /// The type of the items produced when iterating over a value of this type.
    #[must_use]
    pub fn item(&self) -> Ty {
        match self {
            Ty::Range => Ty::Int,
            Ty::Array(elem, _) => (**elem).clone(),
            Ty::Tuple(elems) => match elems.split_first() {
                Some((first, rest)) if rest.iter().all(|ty| ty == first) => first.clone(),
                _ => Ty::Unknown,
            },
            _ => Ty::Unknown,
        }
    }

    /// Returns `true` if a value of this type carries at least one wire.
    #[must_use]
    pub fn contains_wire(&self) -> bool {
        match self {
            Ty::Wire => true,
            Ty::Array(elem, _) => elem.contains_wire(),
            Ty::Tuple(elems) => elems.iter().any(Ty::contains_wire),
            _ => false,
        }
    }

    /// Forgets any statically known length, used for values that change shape across loop
    /// iterations.
    #[must_use]
    pub fn erase_len(&self) -> Ty {
        match self {
            Ty::Array(elem, _) => Ty::array((**elem).clone(), None),
            Ty::Tuple(elems) => match elems.split_first() {
                None => Ty::array(Ty::Unknown, None),
                Some((first, rest)) if rest.iter().all(|ty| ty == first) => {
                    Ty::array(first.clone(), None)
                }
                _ => self.clone(),
            },
            _ => self.clone(),
        }
    }

    /// The most precise type describing values of both `self` and `other`.
    #[must_use]
    pub fn unify(&self, other: &Ty) -> Ty {
        match (self, other) {
            _ if self == other => self.clone(),
            (Ty::Unknown, known) | (known, Ty::Unknown) => known.clone(),
            (Ty::Array(lhs, lhs_len), Ty::Array(rhs, rhs_len)) => Ty::array(
                lhs.unify(rhs),
                if lhs_len == rhs_len { *lhs_len } else { None },
            ),
            (Ty::Tuple(lhs), Ty::Tuple(rhs)) if lhs.len() == rhs.len() => {
                Ty::Tuple(lhs.iter().zip(rhs).map(|(l, r)| l.unify(r)).collect())
            }
            (Ty::Tuple(_) | Ty::Array(..), Ty::Tuple(_) | Ty::Array(..)) => {
                match (self.erase_len(), other.erase_len()) {
                    (lhs @ Ty::Array(..), rhs @ Ty::Array(..)) => lhs.unify(&rhs),
                    _ => Ty::Unknown,
                }
            }
            _ => Ty::Unknown,
        }
    }

    /// The type of the concatenation of a value of this type with a value of `other`.
    #[must_use]
    pub fn concat(&self, other: &Ty) -> Ty {
        match (self, other) {
            (Ty::Tuple(lhs), Ty::Tuple(rhs)) => Ty::Tuple(lhs.iter().chain(rhs).cloned().collect()),
            _ => {
                let len = self.len().zip(other.len()).map(|(lhs, rhs)| lhs + rhs);
                Ty::array(self.item().unify(&other.item()), len)
            }
        }
    }

    /// The type of the outcomes of measuring a value of this type.
    #[must_use]
    pub fn measured(&self) -> Ty {
        match self {
            Ty::Qubit | Ty::Wire => Ty::Bit,
            Ty::Array(elem, len) => Ty::array(elem.measured(), *len),
            Ty::Tuple(elems) => Ty::Tuple(elems.iter().map(Ty::measured).collect()),
            _ => Ty::Unknown,
        }
    }

    /// Replaces every measurement outcome in the type with a boolean.
    #[must_use]
    pub fn with_bits_as_bools(&self) -> Ty {
        match self {
            Ty::Bit => Ty::Bool,
            Ty::Array(elem, len) => Ty::array(elem.with_bits_as_bools(), *len),
            Ty::Tuple(elems) => Ty::Tuple(elems.iter().map(Ty::with_bits_as_bools).collect()),
            _ => self.clone(),
        }
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Qubit => write!(f, "Qubit"),
            Ty::Wire => write!(f, "Wire"),
            Ty::Bit => write!(f, "Bit"),
            Ty::Bool => write!(f, "Bool"),
            Ty::Int => write!(f, "Int"),
            Ty::Float => write!(f, "Float"),
            Ty::Range => write!(f, "Range"),
            Ty::Slice => write!(f, "Slice"),
            Ty::Array(elem, Some(len)) => write!(f, "{elem}[{len}]"),
            Ty::Array(elem, None) => write!(f, "{elem}[]"),
            Ty::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                write!(f, ")")
            }
            Ty::Function => write!(f, "Function"),
            Ty::Detector => write!(f, "Detector"),
            Ty::Observable => write!(f, "Observable"),
            Ty::Unknown => write!(f, "?"),
        }
    }
}
