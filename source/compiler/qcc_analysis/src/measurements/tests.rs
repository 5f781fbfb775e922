// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use expect_test::expect;
use indoc::indoc;
use qcc_dataflow::AnalysisConfig;
use qcc_ir::{
    builder::PackageBuilder,
    const_fold::ConstantTable,
    ir::{CallableId, Package, Predicate},
    ty::Ty,
};

use super::{MeasurementAnalysis, MeasurementId, analyze_measurements};

fn analyze_with(
    package: &Package,
    callable: CallableId,
    config: AnalysisConfig,
) -> MeasurementAnalysis {
    let constants = ConstantTable::fold(package);
    analyze_measurements(package, &constants, callable, config).expect("analysis should succeed")
}

fn analyze(package: &Package, callable: CallableId) -> MeasurementAnalysis {
    analyze_with(package, callable, AnalysisConfig::default())
}

fn no_unrolling() -> AnalysisConfig {
    AnalysisConfig {
        max_unroll: 0,
        ..AnalysisConfig::default()
    }
}

#[test]
fn measuring_a_pair_returns_two_raw_cells() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let ms = b.measure(qs);
        b.ret(ms);
    });
    let analysis = analyze(&builder.finish(), main);
    expect![[r#"
        MeasurementAnalysis:
            measurements: 2
            return: [rec[-2], rec[-1]]
            values:
                %0: index(2)
                %1: _
                %2: [rec[-2], rec[-1]]"#]]
    .assert_eq(&analysis.to_string());
}

#[test]
fn predicate_keeps_the_measured_cells() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let ms = b.measure(qs);
        let ones = b.predicate(Predicate::IsOne, ms);
        b.ret(ones);
    });
    let analysis = analyze(&builder.finish(), main);
    expect![[r#"
        MeasurementAnalysis:
            measurements: 2
            return: [is_one(rec[-2]), is_one(rec[-1])]
            values:
                %0: index(2)
                %1: _
                %2: [rec[-2], rec[-1]]
                %3: [is_one(rec[-2]), is_one(rec[-1])]"#]]
    .assert_eq(&analysis.to_string());
}

#[test]
fn sealed_values_display_their_record_offsets() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let one = b.int(1);
        let qs = b.new_qubits(one);
        let zero = b.int(0);
        let qubit = b.get_item(qs, zero);
        let bit = b.measure(qubit);
        let observable = b.observable(bit);
        b.ret(observable);
    });
    let analysis = analyze(&builder.finish(), main);
    assert_eq!(
        analysis.to_string(),
        indoc! {"
            MeasurementAnalysis:
                measurements: 1
                return: sealed[rec[-1]]
                values:
                    %0: index(1)
                    %1: _
                    %2: index(0)
                    %3: _
                    %4: rec[-1]
                    %5: sealed[rec[-1]]"}
    );
}

#[test]
fn later_measurements_shift_earlier_cells() {
    let mut builder = PackageBuilder::new();
    let mut ids = Vec::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let first_qs = b.new_qubits(two);
        let first = b.measure(first_qs);
        let three = b.int(3);
        let second_qs = b.new_qubits(three);
        let second = b.measure(second_qs);
        ids.extend([first, second]);
        b.ret(first);
    });
    let analysis = analyze(&builder.finish(), main);
    let resolved = |id| analysis.value(id).map(|value| value.to_string());
    assert_eq!(resolved(ids[0]).as_deref(), Some("[rec[-5], rec[-4]]"));
    assert_eq!(
        resolved(ids[1]).as_deref(),
        Some("[rec[-3], rec[-2], rec[-1]]")
    );
    assert_eq!(analysis.measurement_count(), 5);
}

#[test]
fn single_qubit_measurement_is_a_bare_cell() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Bit, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let one = b.int(1);
        let qubit = b.get_item(qs, one);
        let bit = b.measure(qubit);
        b.ret(bit);
    });
    let analysis = analyze(&builder.finish(), main);
    assert!(matches!(analysis.result.ret, MeasurementId::Raw(_, None)));
    assert_eq!(analysis.ret().to_string(), "rec[-1]");
}

fn accumulate(prepend: bool) -> (Package, CallableId) {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let zero = b.int(0);
        let three = b.int(3);
        let one = b.int(1);
        let trips = b.range(zero, three, one);
        let empty = b.list(&[]);
        let acc = b.for_loop(trips, &[empty], |b, _, carried| {
            let two = b.int(2);
            let qs = b.new_qubits(two);
            let ms = b.measure(qs);
            let next = if prepend {
                b.concat(ms, carried[0])
            } else {
                b.concat(carried[0], ms)
            };
            b.yield_values(&[next]);
        });
        b.ret(acc[0]);
    });
    (builder.finish(), main)
}

#[test]
fn appending_accumulator_is_chronological() {
    let (package, main) = accumulate(false);
    for config in [AnalysisConfig::default(), no_unrolling()] {
        let analysis = analyze_with(&package, main, config);
        assert_eq!(
            analysis.ret().to_string(),
            "[rec[-6], rec[-5], rec[-4], rec[-3], rec[-2], rec[-1]]"
        );
        assert_eq!(analysis.measurement_count(), 6);
    }
}

#[test]
fn prepending_accumulator_is_staggered() {
    let (package, main) = accumulate(true);
    for config in [AnalysisConfig::default(), no_unrolling()] {
        let analysis = analyze_with(&package, main, config);
        assert_eq!(
            analysis.ret().to_string(),
            "[rec[-2], rec[-1], rec[-4], rec[-3], rec[-6], rec[-5]]"
        );
        assert_eq!(analysis.measurement_count(), 6);
    }
}

#[test]
fn expanded_loop_body_is_covered() {
    let (package, main) = accumulate(false);
    let analysis = analyze_with(&package, main, no_unrolling());
    expect![[r#"
        MeasurementAnalysis:
            measurements: 6
            return: [rec[-6], rec[-5], rec[-4], rec[-3], rec[-2], rec[-1]]
            values:
                %0: index(0)
                %1: index(3)
                %2: index(1)
                %3: _
                %4: []
                %5: ?
                %6: ?
                %7: ?
                %8: ?
                %9: ?
                %10: ?
                %11: [rec[-6], rec[-5], rec[-4], rec[-3], rec[-2], rec[-1]]"#]]
    .assert_eq(&analysis.to_string());
}

#[test]
fn accumulator_with_unknown_trip_count_is_any() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable(
        "main",
        &[Ty::array(Ty::Int, None)],
        Ty::Unknown,
        |b, params| {
            let empty = b.list(&[]);
            let acc = b.for_loop(params[0], &[empty], |b, _, carried| {
                let one = b.int(1);
                let qs = b.new_qubits(one);
                let ms = b.measure(qs);
                let next = b.concat(carried[0], ms);
                b.yield_values(&[next]);
            });
            b.ret(acc[0]);
        },
    );
    let analysis = analyze(&builder.finish(), main);
    assert_eq!(analysis.result.ret, MeasurementId::Any);
}

#[test]
fn accumulator_too_long_to_lay_out_is_any() {
    for (start, stop) in [(0, 1_000_000_000), (i64::MIN, i64::MAX)] {
        let mut builder = PackageBuilder::new();
        let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
            let start = b.int(start);
            let stop = b.int(stop);
            let one = b.int(1);
            let trips = b.range(start, stop, one);
            let empty = b.list(&[]);
            let acc = b.for_loop(trips, &[empty], |b, _, carried| {
                let qs = b.new_qubits(one);
                let ms = b.measure(qs);
                let next = b.concat(carried[0], ms);
                b.yield_values(&[next]);
            });
            b.ret(acc[0]);
        });
        let analysis = analyze(&builder.finish(), main);
        assert_eq!(analysis.result.ret, MeasurementId::Any);
    }
}

#[test]
fn expansion_limit_is_configurable() {
    let (package, main) = accumulate(false);
    let config = AnalysisConfig {
        max_expansion: 5,
        ..no_unrolling()
    };
    let analysis = analyze_with(&package, main, config);
    assert_eq!(analysis.result.ret, MeasurementId::Any);
}

#[test]
fn loop_over_measured_bits_is_unrolled() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let ms = b.measure(qs);
        let empty = b.list(&[]);
        let acc = b.for_loop(ms, &[empty], |b, bit, carried| {
            let single = b.list(&[bit]);
            let next = b.concat(single, carried[0]);
            b.yield_values(&[next]);
        });
        b.ret(acc[0]);
    });
    let analysis = analyze(&builder.finish(), main);
    assert_eq!(analysis.ret().to_string(), "[rec[-1], rec[-2]]");
}

#[test]
fn sealed_slice_is_not_renumbered() {
    let mut builder = PackageBuilder::new();
    let mut ids = Vec::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let ms = b.measure(qs);
        let detector = b.detector(ms);
        let zero = b.int(0);
        let one = b.int(1);
        let head = b.slice(Some(zero), Some(one), None);
        let first = b.get_item(detector, head);
        let three = b.int(3);
        let more = b.new_qubits(three);
        b.measure(more);
        ids.extend([ms, detector]);
        b.ret(first);
    });
    let analysis = analyze(&builder.finish(), main);
    assert_eq!(analysis.ret().to_string(), "sealed[rec[-2]]");
    let resolved = |id| analysis.value(id).map(|value| value.to_string());
    assert_eq!(resolved(ids[0]).as_deref(), Some("[rec[-5], rec[-4]]"));
    assert_eq!(
        resolved(ids[1]).as_deref(),
        Some("sealed[rec[-2], rec[-1]]")
    );
}

#[test]
fn unresolved_index_is_invalid() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[Ty::Int], Ty::Bit, |b, params| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let ms = b.measure(qs);
        let picked = b.get_item(ms, params[0]);
        b.ret(picked);
    });
    let analysis = analyze(&builder.finish(), main);
    assert_eq!(analysis.result.ret, MeasurementId::Invalid);
}

#[test]
fn predicates_do_not_compose() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let ms = b.measure(qs);
        let zeros = b.predicate(Predicate::IsZero, ms);
        let twice = b.predicate(Predicate::IsOne, zeros);
        b.ret(twice);
    });
    let analysis = analyze(&builder.finish(), main);
    assert_eq!(analysis.result.ret, MeasurementId::Invalid);
}

#[test]
fn concat_of_mismatched_kinds_is_invalid() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let ms = b.measure(qs);
        let detector = b.detector(ms);
        let mixed = b.concat(detector, ms);
        b.ret(mixed);
    });
    let analysis = analyze(&builder.finish(), main);
    assert_eq!(analysis.result.ret, MeasurementId::Invalid);
}

#[test]
fn unknown_operation_is_reported() {
    let mut builder = PackageBuilder::new();
    let main = builder.callable("main", &[], Ty::Unknown, |b, _| {
        let two = b.int(2);
        let qs = b.new_qubits(two);
        let out = b.opaque("mystery", &[qs], &[Ty::Bit]);
        b.ret(out[0]);
    });
    let analysis = analyze(&builder.finish(), main);
    expect![[r#"
        MeasurementAnalysis:
            measurements: 0
            return: ?
            values:
                %0: index(2)
                %1: _
                %2: ?
            warnings:
                operation `mystery` (op2) is not recognized by the analysis"#]]
    .assert_eq(&analysis.to_string());
}
