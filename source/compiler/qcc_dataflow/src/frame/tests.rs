// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use qcc_ir::{const_fold::Const, ir::ValueId};

use super::{Assumption, Fact, Frame};
use crate::lattice::Lattice;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Level(u8);

impl Lattice for Level {
    fn bottom() -> Self {
        Level(0)
    }

    fn top() -> Self {
        Level(u8::MAX)
    }

    fn join(&self, other: &Self) -> Self {
        Level(self.0.max(other.0))
    }

    fn meet(&self, other: &Self) -> Self {
        Level(self.0.min(other.0))
    }

    fn is_subset_of(&self, other: &Self) -> bool {
        self.0 <= other.0
    }
}

#[test]
fn child_reads_through_and_writes_locally() {
    let mut root = Frame::root();
    root.write(ValueId(0), Fact::with_constant(Level(1), Some(Const::Int(7))));
    let mut child = root.child();
    child.write_value(ValueId(1), Level(2));
    assert_eq!(child.value(ValueId(0)), Some(&Level(1)));
    assert_eq!(child.constant(ValueId(0)), Some(&Const::Int(7)));
    assert!(child.contains(ValueId(1)));

    let values = child.into_values();
    assert_eq!(root.value(ValueId(1)), None);
    root.merge(values);
    assert_eq!(root.value(ValueId(1)), Some(&Level(2)));
}

#[test]
fn merge_joins_existing_values() {
    let mut root = Frame::root();
    root.write_value(ValueId(0), Level(3));
    let mut child = root.child();
    child.write_value(ValueId(0), Level(5));
    let values = child.into_values();
    root.merge(values);
    assert_eq!(root.value(ValueId(0)), Some(&Level(5)));
}

#[test]
fn assumption_shadows_only_its_value() {
    let mut frame = Frame::root();
    frame.write_value(ValueId(0), Level(9));
    frame.write_value(ValueId(1), Level(4));
    frame.assume(Some(Assumption {
        value: ValueId(0),
        fact: Fact::with_constant(Level(1), Some(Const::Bool(true))),
    }));
    assert_eq!(frame.value(ValueId(0)), Some(&Level(1)));
    assert_eq!(frame.constant(ValueId(0)), Some(&Const::Bool(true)));
    assert_eq!(frame.value(ValueId(1)), Some(&Level(4)));

    frame.assume(None);
    assert_eq!(frame.value(ValueId(0)), Some(&Level(9)));
    assert_eq!(frame.constant(ValueId(0)), None);
}

#[test]
fn rewriting_without_constant_forgets_it() {
    let mut frame = Frame::root();
    frame.write(ValueId(0), Fact::with_constant(Level(1), Some(Const::Int(1))));
    frame.write(ValueId(0), Fact::new(Level(2)));
    assert_eq!(frame.constant(ValueId(0)), None);
}

#[test]
fn fact_join_keeps_agreeing_constants() {
    let one = Fact::with_constant(Level(1), Some(Const::Int(1)));
    let also_one = Fact::with_constant(Level(2), Some(Const::Int(1)));
    let two = Fact::with_constant(Level(2), Some(Const::Int(2)));
    assert_eq!(one.join(&also_one).constant, Some(Const::Int(1)));
    assert_eq!(one.join(&two).constant, None);
    assert_eq!(one.join(&two).value, Level(2));
}
