// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use expect_test::expect;
use qcc_dataflow::{AnalysisConfig, AnalysisResult, Lattice};
use qcc_ir::{
    builder::PackageBuilder,
    const_fold::ConstantTable,
    ir::{CallableId, Package},
    ty::Ty,
};

use super::{Address, analyze_addresses};

fn analyze_with(
    package: &Package,
    callable: CallableId,
    config: AnalysisConfig,
) -> AnalysisResult<Address> {
    let constants = ConstantTable::fold(package);
    analyze_addresses(package, &constants, callable, config).expect("analysis should succeed")
}

fn analyze(package: &Package, callable: CallableId) -> AnalysisResult<Address> {
    analyze_with(package, callable, AnalysisConfig::default())
}

#[test]
fn allocated_qubits_read_back_in_order() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let three = b.int(3);
        let qs = b.new_qubits(three);
        let zero = b.int(0);
        let first = b.get_item(qs, zero);
        let last = b.int(-1);
        let third = b.get_item(qs, last);
        let pair = b.tuple(&[first, third]);
        b.ret(pair);
    });
    let result = analyze(&builder.finish(), main);
    expect![[r#"
        AnalysisResult:
            return: [q0, q2]
            values:
                %0: _
                %1: [q0, q1, q2]
                %2: _
                %3: q0
                %4: _
                %5: q2
                %6: [q0, q2]"#]]
    .assert_eq(&result.to_string());
}

#[test]
fn sequential_allocations_are_disjoint() {
    let mut builder = PackageBuilder::new();
    let mut ids = Vec::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let three = b.int(3);
        let first = b.new_qubits(three);
        let two = b.int(2);
        let second = b.new_qubits(two);
        let both = b.concat(first, second);
        ids.extend([first, second]);
        b.ret(both);
    });
    let result = analyze(&builder.finish(), main);
    assert_eq!(result.value(ids[0]), Some(&Address::Register(vec![0, 1, 2])));
    assert_eq!(result.value(ids[1]), Some(&Address::Register(vec![3, 4])));
    assert_eq!(result.ret, Address::Register(vec![0, 1, 2, 3, 4]));
}

#[test]
fn concat_with_known_empty_is_identity() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let empty_tuple = b.tuple(&[]);
        let empty_list = b.list(&[]);
        let lhs = b.concat(qs, empty_tuple);
        let both = b.concat(empty_list, lhs);
        b.ret(both);
    });
    let result = analyze(&builder.finish(), main);
    assert_eq!(result.ret, Address::Register(vec![0, 1]));
}

#[test]
fn slicing_a_register_selects_qubits() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let four = b.int(4);
        let qs = b.new_qubits(four);
        let one = b.int(1);
        let two = b.int(2);
        let odd = b.slice(Some(one), None, Some(two));
        let picked = b.get_item(qs, odd);
        b.ret(picked);
    });
    let result = analyze(&builder.finish(), main);
    assert_eq!(result.ret, Address::Register(vec![1, 3]));
}

#[test]
fn unknown_index_gives_any_address() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[Ty::Int], Ty::Qubit, |b, params| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let picked = b.get_item(qs, params[0]);
        b.ret(picked);
    });
    let result = analyze(&builder.finish(), main);
    assert_eq!(result.ret, Address::AnyAddress);
}

#[test]
fn out_of_range_index_is_not_a_qubit() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Qubit, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let five = b.int(5);
        let picked = b.get_item(qs, five);
        b.ret(picked);
    });
    let result = analyze(&builder.finish(), main);
    assert_eq!(result.ret, Address::NotQubit);
}

#[test]
fn wires_keep_their_origin_through_gates() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Qubit, |b, _| {
        let one = b.int(1);
        let qs = b.new_qubits(one);
        let zero = b.int(0);
        let qubit = b.get_item(qs, zero);
        let wire = b.unwrap(qubit);
        let out = b.gate("h", &[wire], &[]);
        let back = b.wrap(out[0]);
        b.ret(back);
    });
    let result = analyze(&builder.finish(), main);
    expect![[r#"
        AnalysisResult:
            return: q0
            values:
                %0: _
                %1: [q0]
                %2: _
                %3: q0
                %4: wire(q0)
                %5: wire(q0)
                %6: q0"#]]
    .assert_eq(&result.to_string());
}

#[test]
fn invoke_through_function_value_is_inlined() {
    let mut builder = PackageBuilder::new();
    let first = builder.callable(
        "first",
        &[Ty::array(Ty::Qubit, None)],
        Ty::Qubit,
        |b, params| {
            let zero = b.int(0);
            let qubit = b.get_item(params[0], zero);
            b.ret(qubit);
        },
    );
    let main = builder.callable("main", &[], Ty::Qubit, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let one = b.int(1);
        let rest = b.slice(Some(one), None, None);
        let tail = b.get_item(qs, rest);
        let f = b.function_ref(first);
        let qubit = b.invoke(f, &[tail], Ty::Qubit);
        b.ret(qubit);
    });
    let result = analyze(&builder.finish(), main);
    assert_eq!(result.ret, Address::Qubit(1));
}

fn pick_one(known: Option<bool>) -> (Package, CallableId) {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[Ty::Bool], Ty::Qubit, |b, params| {
        let cond = match known {
            Some(value) => b.bool(value),
            None => params[0],
        };
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let zero = b.int(0);
        let one = b.int(1);
        let first = b.get_item(qs, zero);
        let second = b.get_item(qs, one);
        let picked = b.if_else(
            cond,
            |b| b.yield_values(&[first]),
            |b| b.yield_values(&[second]),
        );
        b.ret(picked[0]);
    });
    (builder.finish(), main)
}

#[test]
fn unknown_condition_joins_both_qubits() {
    let (package, main) = pick_one(None);
    assert_eq!(analyze(&package, main).ret, Address::AnyAddress);
}

#[test]
fn known_condition_keeps_the_selected_qubit() {
    let (package, main) = pick_one(Some(true));
    assert_eq!(analyze(&package, main).ret, Address::Qubit(0));
    let (package, main) = pick_one(Some(false));
    assert_eq!(analyze(&package, main).ret, Address::Qubit(1));
}

fn collect_into_list() -> (Package, CallableId) {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let three = b.int(3);
        let qs = b.new_qubits(three);
        let empty = b.list(&[]);
        let acc = b.for_loop(qs, &[empty], |b, qubit, carried| {
            let single = b.list(&[qubit]);
            let next = b.concat(carried[0], single);
            b.yield_values(&[next]);
        });
        b.ret(acc[0]);
    });
    (builder.finish(), main)
}

#[test]
fn loop_over_register_is_unrolled() {
    let (package, main) = collect_into_list();
    assert_eq!(analyze(&package, main).ret, Address::Register(vec![0, 1, 2]));
}

#[test]
fn loop_that_is_not_unrolled_loses_the_register() {
    let (package, main) = collect_into_list();
    let config = AnalysisConfig {
        max_unroll: 0,
        ..AnalysisConfig::default()
    };
    assert_eq!(analyze_with(&package, main, config).ret, Address::AnyAddress);
}

#[test]
fn register_carried_through_the_widest_range_is_kept() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let start = b.int(i64::MIN);
        let stop = b.int(i64::MAX);
        let one = b.int(1);
        let trips = b.range(start, stop, one);
        let carried = b.for_loop(trips, &[qs], |b, _, carried| {
            b.yield_values(&[carried[0]]);
        });
        b.ret(carried[0]);
    });
    let result = analyze(&builder.finish(), main);
    assert_eq!(result.ret, Address::Register(vec![0, 1]));
}

#[test]
fn unknown_operation_degrades_qubit_results() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Qubit, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let out = b.opaque("mystery", &[qs], &[Ty::Qubit, Ty::Int]);
        let pair = b.tuple(&out);
        b.ret(pair);
    });
    let result = analyze(&builder.finish(), main);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.ret.to_string(), "(?, _)");
}

#[test]
fn join_is_element_wise_for_equal_shapes() {
    let lhs = Address::Register(vec![0, 1]);
    let rhs = Address::Register(vec![0, 2]);
    assert_eq!(lhs.join(&rhs).to_string(), "(q0, ?)");
    assert_eq!(lhs.join(&Address::Register(vec![0])), Address::AnyAddress);
    assert_eq!(lhs.meet(&rhs).to_string(), "(q0, _)");
}

#[test]
fn sequences_of_single_qubits_are_registers() {
    let seq = Address::sequence(vec![Address::Qubit(4), Address::Qubit(2)]);
    assert_eq!(seq, Address::Register(vec![4, 2]));
    assert_eq!(Address::sequence(Vec::new()), Address::Tuple(Vec::new()));
    let mixed = Address::sequence(vec![Address::Qubit(0), Address::Wire(1)]);
    assert_eq!(mixed.qubits(), Some(vec![0, 1]));
    let unknown = Address::sequence(vec![Address::Qubit(0), Address::AnyAddress]);
    assert_eq!(unknown.qubits(), None);
}

#[test]
fn sequences_with_the_same_elements_are_equal() {
    use std::hash::{BuildHasher, RandomState};

    let hasher = RandomState::new();
    let pairs = [
        (Address::Tuple(vec![Address::Qubit(0)]), Address::Register(vec![0])),
        (Address::Tuple(Vec::new()), Address::Register(Vec::new())),
        (
            Address::Tuple(vec![Address::Tuple(vec![Address::Qubit(1), Address::Qubit(2)])]),
            Address::Tuple(vec![Address::Register(vec![1, 2])]),
        ),
    ];
    for (tuple, register) in &pairs {
        assert_eq!(tuple, register);
        assert_eq!(hasher.hash_one(tuple), hasher.hash_one(register));
        assert!(tuple.is_subset_of(register));
        assert!(register.is_subset_of(tuple));
        assert_eq!(tuple.join(register), *register);
        assert_eq!(register.join(tuple), *tuple);
    }
    assert_ne!(
        Address::Tuple(vec![Address::Wire(0)]),
        Address::Register(vec![0])
    );
}

