// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A generic forward abstract interpretation engine over the structured program model of
//! `qcc_ir`. Client analyses supply a [`Lattice`] and a [`Transfer`] and receive an
//! [`AnalysisResult`] mapping every reached value to its abstract value.

pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod lattice;

use std::fmt::{self, Display, Formatter, Write};

use indenter::indented;
use qcc_data_structures::{display::set_indentation, index_map::IndexMap};
use qcc_ir::ir::ValueId;

pub use config::AnalysisConfig;
pub use engine::{Engine, EvalContext, IterationExit, LoopRunner, Transfer};
pub use error::{Error, Warning};
pub use lattice::Lattice;

/// The final state of an analysis run.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult<L> {
    /// The value of every program value reached, including values inside structured regions.
    pub values: IndexMap<ValueId, L>,
    /// The join of every value returned by the analyzed callable.
    pub ret: L,
    pub warnings: Vec<Warning>,
}

impl<L> AnalysisResult<L> {
    #[must_use]
    pub fn value(&self, id: ValueId) -> Option<&L> {
        self.values.get(id)
    }
}

impl<L: Display> Display for AnalysisResult<L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        write!(indent, "AnalysisResult:")?;
        indent = set_indentation(indent, 1);
        write!(indent, "\nreturn: {}", self.ret)?;
        write!(indent, "\nvalues:")?;
        indent = set_indentation(indent, 2);
        for (id, value) in self.values.iter() {
            write!(indent, "\n{id}: {value}")?;
        }
        if !self.warnings.is_empty() {
            indent = set_indentation(indent, 1);
            write!(indent, "\nwarnings:")?;
            indent = set_indentation(indent, 2);
            for warning in &self.warnings {
                write!(indent, "\n{warning}")?;
            }
        }
        Ok(())
    }
}
