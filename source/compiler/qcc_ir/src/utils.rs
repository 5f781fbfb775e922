// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ir::{OpKind, Operation, Region, Terminator, ValueId};

/// Finds the operation in the region's own blocks (not nested regions) that defines `value`.
#[must_use]
pub fn find_defining_op(region: &Region, value: ValueId) -> Option<&Operation> {
    region
        .blocks
        .values()
        .flat_map(|block| &block.ops)
        .find(|op| op.results.contains(&value))
}

/// Follows `Alias` operations in the region back to the value they copy.
#[must_use]
pub fn resolve_alias(region: &Region, mut value: ValueId) -> ValueId {
    while let Some(op) = find_defining_op(region, value)
        && let OpKind::Alias(source) = op.kind
    {
        value = source;
    }
    value
}

/// The values passed to the first `Yield` of the region, in block order.
#[must_use]
pub fn yielded_values(region: &Region) -> Option<&[ValueId]> {
    region.blocks.values().find_map(|block| match &block.terminator {
        Terminator::Yield(values) => Some(values.as_slice()),
        _ => None,
    })
}
