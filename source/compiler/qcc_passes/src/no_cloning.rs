// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(test)]
mod tests;

use log::debug;
use miette::Diagnostic;
use qcc_analysis::{Address, QubitId, analyze_addresses};
use qcc_dataflow::{AnalysisConfig, AnalysisResult};
use qcc_ir::{
    const_fold::ConstLookup,
    ir::{CallableId, OpId, OpKind, Package, Region, ValueId},
};
use rustc_hash::FxHashSet;
use thiserror::Error;

#[derive(Clone, Debug, Diagnostic, Error, PartialEq, Eq)]
pub enum Error {
    #[error("qubit q{0} is used more than once by gate `{1}` ({2})")]
    #[diagnostic(
        code("Qcc.NoCloning.DuplicateQubit"),
        help("a quantum state cannot be copied, so a gate must act on distinct qubits")
    )]
    DuplicateQubit(QubitId, String, OpId),

    #[error("the qubits used by gate `{0}` ({1}) could not be determined")]
    #[diagnostic(code("Qcc.NoCloning.UnresolvedOperand"), severity(Warning))]
    UnresolvedOperand(String, OpId),
}

/// Checks every gate reached by the address analysis of `callable`, including gates in nested
/// regions. Gates inside callees are checked when their callables are analyzed themselves.
///
/// A gate in a loop body is checked once against the join of its operands over every iteration,
/// so a body whose qubits change per iteration reports [`Error::UnresolvedOperand`] even when the
/// loop was unrolled.
#[must_use]
pub fn check_no_cloning(
    package: &Package,
    callable: CallableId,
    addresses: &AnalysisResult<Address>,
) -> Vec<Error> {
    let mut errors = Vec::new();
    check_region(&package.get_callable(callable).body, addresses, &mut errors);
    errors
}

/// Runs the address analysis over `callable` and checks its gates.
pub fn validate_no_cloning(
    package: &Package,
    constants: &dyn ConstLookup,
    callable: CallableId,
    config: AnalysisConfig,
) -> Result<Vec<Error>, qcc_dataflow::Error> {
    let addresses = analyze_addresses(package, constants, callable, config)?;
    Ok(check_no_cloning(package, callable, &addresses))
}

fn check_region(region: &Region, addresses: &AnalysisResult<Address>, errors: &mut Vec<Error>) {
    for block in region.blocks.values() {
        for op in &block.ops {
            if let OpKind::Gate { name, targets, .. } = &op.kind {
                check_gate(name, op.id, targets, addresses, errors);
            }
            for nested in op.kind.regions() {
                check_region(nested, addresses, errors);
            }
        }
    }
}

fn check_gate(
    name: &str,
    id: OpId,
    targets: &[ValueId],
    addresses: &AnalysisResult<Address>,
    errors: &mut Vec<Error>,
) {
    // Unreached gates have no operand values.
    let Some(operands) = targets
        .iter()
        .map(|target| addresses.value(*target))
        .collect::<Option<Vec<_>>>()
    else {
        debug!("skipping unreached gate `{name}` ({id})");
        return;
    };

    let mut seen = FxHashSet::default();
    let mut reported = FxHashSet::default();
    let mut unresolved = false;
    for operand in operands {
        let Some(qubits) = operand.qubits() else {
            unresolved = true;
            continue;
        };
        for qubit in qubits {
            if !seen.insert(qubit) && reported.insert(qubit) {
                errors.push(Error::DuplicateQubit(qubit, name.to_string(), id));
            }
        }
    }
    if unresolved {
        errors.push(Error::UnresolvedOperand(name.to_string(), id));
    }
}
