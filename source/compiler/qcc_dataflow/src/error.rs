// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use miette::Diagnostic;
use qcc_ir::ir::{CallableId, OpId};
use thiserror::Error;

/// Conditions that abort an analysis run.
#[derive(Clone, Debug, Diagnostic, Error, PartialEq, Eq)]
pub enum Error {
    #[error("analysis of `{0}` exceeds the maximum call depth of {1}")]
    #[diagnostic(
        code("Qcc.Dataflow.RecursionLimit"),
        help("recursive callables can only be analyzed up to a fixed inlining depth")
    )]
    RecursionLimit(String, usize),

    #[error("callable {0} is not defined in the package")]
    #[diagnostic(code("Qcc.Dataflow.MissingCallable"))]
    MissingCallable(CallableId),
}

/// Conditions that reduce the precision of an analysis run without stopping it.
#[derive(Clone, Debug, Diagnostic, Error, PartialEq, Eq)]
pub enum Warning {
    #[error("operation `{1}` ({0}) is not recognized by the analysis")]
    #[diagnostic(code("Qcc.Dataflow.UnknownOperation"), severity(Warning))]
    UnknownOperation(OpId, String),
}
