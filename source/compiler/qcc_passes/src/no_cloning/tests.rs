// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use expect_test::{Expect, expect};
use qcc_dataflow::AnalysisConfig;
use qcc_ir::{
    builder::{Builder, PackageBuilder},
    const_fold::ConstantTable,
    ir::{OpId, ValueId},
    ty::Ty,
};

use super::{Error, validate_no_cloning};

fn validate(params: &[Ty], body: impl FnOnce(&mut Builder<'_>, &[ValueId])) -> Vec<Error> {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", params, Ty::Unknown, |b, params| {
        body(b, params);
        let none = b.none();
        b.ret(none);
    });
    let package = builder.finish();
    let constants = ConstantTable::fold(&package);
    validate_no_cloning(&package, &constants, main, AnalysisConfig::default())
        .expect("analysis should succeed")
}

fn check(params: &[Ty], body: impl FnOnce(&mut Builder<'_>, &[ValueId]), expect: &Expect) {
    expect.assert_debug_eq(&validate(params, body));
}

#[test]
fn same_qubit_twice_in_one_gate_is_reported() {
    check(
        &[],
        |b, _| {
            let two = b.int(2);
            let qs = b.new_qubits(two);
            let zero = b.int(0);
            let qubit = b.get_item(qs, zero);
            b.gate("cx", &[qubit, qubit], &[]);
        },
        &expect![[r#"
            [
                DuplicateQubit(
                    0,
                    "cx",
                    OpId(
                        4,
                    ),
                ),
            ]
        "#]],
    );
}

#[test]
fn distinct_qubits_are_accepted() {
    check(
        &[],
        |b, _| {
            let two = b.int(2);
            let qs = b.new_qubits(two);
            let zero = b.int(0);
            let one = b.int(1);
            let control = b.get_item(qs, zero);
            let target = b.get_item(qs, one);
            b.gate("cx", &[control, target], &[]);
        },
        &expect![[r#"
            []
        "#]],
    );
}

#[test]
fn reusing_a_qubit_across_gates_is_accepted() {
    check(
        &[],
        |b, _| {
            let one = b.int(1);
            let qs = b.new_qubits(one);
            let zero = b.int(0);
            let qubit = b.get_item(qs, zero);
            b.gate("h", &[qubit], &[]);
            b.gate("x", &[qubit], &[]);
        },
        &expect![[r#"
            []
        "#]],
    );
}

#[test]
fn register_overlapping_a_qubit_is_reported() {
    let errors = validate(&[], |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let one = b.int(1);
        let qubit = b.get_item(qs, one);
        b.gate("multi", &[qs, qubit], &[]);
    });
    assert!(matches!(
        errors.as_slice(),
        [Error::DuplicateQubit(1, name, _)] if name == "multi"
    ));
}

#[test]
fn each_duplicate_is_reported_once_per_gate() {
    let errors = validate(&[], |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        b.gate("multi", &[qs, qs, qs], &[]);
    });
    assert_eq!(
        errors,
        vec![
            Error::DuplicateQubit(0, "multi".to_string(), OpId(2)),
            Error::DuplicateQubit(1, "multi".to_string(), OpId(2)),
        ]
    );
}

#[test]
fn wires_of_the_same_qubit_are_reported() {
    let errors = validate(&[], |b, _| {
        let one = b.int(1);
        let qs = b.new_qubits(one);
        let zero = b.int(0);
        let qubit = b.get_item(qs, zero);
        let wire = b.unwrap(qubit);
        b.gate("cz", &[wire, wire], &[]);
    });
    assert!(matches!(
        errors.as_slice(),
        [Error::DuplicateQubit(0, name, _)] if name == "cz"
    ));
}

#[test]
fn unknown_operand_is_a_potential_violation() {
    check(
        &[Ty::Int],
        |b, params| {
            let two = b.int(2);
            let qs = b.new_qubits(two);
            let zero = b.int(0);
            let first = b.get_item(qs, zero);
            let picked = b.get_item(qs, params[0]);
            b.gate("cx", &[first, picked], &[]);
        },
        &expect![[r#"
            [
                UnresolvedOperand(
                    "cx",
                    OpId(
                        5,
                    ),
                ),
            ]
        "#]],
    );
}

#[test]
fn gates_in_nested_regions_are_checked() {
    let errors = validate(&[Ty::Bool], |b, params| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let zero = b.int(0);
        let qubit = b.get_item(qs, zero);
        b.if_else(
            params[0],
            |b| {
                b.gate("cx", &[qubit, qubit], &[]);
                b.yield_values(&[]);
            },
            |b| b.yield_values(&[]),
        );
    });
    assert!(matches!(
        errors.as_slice(),
        [Error::DuplicateQubit(0, name, _)] if name == "cx"
    ));
}

#[test]
fn gates_in_unrolled_loops_see_every_iteration() {
    let errors = validate(&[], |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        b.for_loop(qs, &[], |b, qubit, _| {
            let zero = b.int(0);
            let first = b.get_item(qs, zero);
            b.gate("cx", &[qubit, first], &[]);
            b.yield_values(&[]);
        });
    });
    assert!(matches!(
        errors.as_slice(),
        [Error::UnresolvedOperand(name, _)] if name == "cx"
    ));
}

#[test]
fn diagnostics_have_stable_codes() {
    use miette::Diagnostic;

    let duplicate = Error::DuplicateQubit(3, "cx".to_string(), OpId(7));
    assert_eq!(
        duplicate.to_string(),
        "qubit q3 is used more than once by gate `cx` (op7)"
    );
    assert_eq!(
        duplicate.code().map(|code| code.to_string()).as_deref(),
        Some("Qcc.NoCloning.DuplicateQubit")
    );
    let unresolved = Error::UnresolvedOperand("cx".to_string(), OpId(7));
    assert_eq!(unresolved.severity(), Some(miette::Severity::Warning));
}
