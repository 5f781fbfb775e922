// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Growing accumulators: loop-carried tuples that gain the same fresh measurements on every
//! iteration, as in `acc = acc + measure(qs)` or `acc = measure(qs) + acc`. When the trip count is
//! known, the final accumulator is laid out directly instead of approximating the loop.

use log::debug;
use qcc_dataflow::{Error, IterationExit, LoopRunner};
use qcc_ir::{
    ir::{OpKind, Predicate, Region},
    utils::{find_defining_op, resolve_alias, yielded_values},
};

use super::{
    MeasurementId, MeasurementTransfer,
    record::{CellId, RecordState},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Append,
    Prepend,
}

#[derive(Debug)]
struct Accumulator {
    direction: Direction,
    initial: Vec<MeasurementId>,
    /// Every element added by one iteration, as the position of its measurement among the
    /// iteration's measurements and its predicate.
    chunk: Vec<(usize, Option<Predicate>)>,
    predicate: Option<Predicate>,
}

impl Accumulator {
    fn expand(&self, cells: &[CellId], per_iteration: usize, trips: usize) -> MeasurementId {
        let mut elems = Vec::with_capacity(self.initial.len() + trips * self.chunk.len());
        match self.direction {
            Direction::Append => {
                elems.extend(self.initial.iter().cloned());
                for iteration in 0..trips {
                    elems.extend(self.chunk(cells, iteration * per_iteration));
                }
            }
            Direction::Prepend => {
                for iteration in (0..trips).rev() {
                    elems.extend(self.chunk(cells, iteration * per_iteration));
                }
                elems.extend(self.initial.iter().cloned());
            }
        }
        MeasurementId::Tuple {
            elems,
            predicate: self.predicate,
            immutable: false,
        }
    }

    fn chunk<'a>(
        &'a self,
        cells: &'a [CellId],
        start: usize,
    ) -> impl Iterator<Item = MeasurementId> + 'a {
        self.chunk
            .iter()
            .map(move |(offset, predicate)| MeasurementId::Raw(cells[start + offset], *predicate))
    }
}

/// The loop-carried values after two speculative iterations.
struct Trace {
    first: Vec<MeasurementId>,
    second: Vec<MeasurementId>,
    /// The record counter before the first iteration, between the iterations and after them.
    marks: [usize; 3],
}

impl Trace {
    fn per_iteration(&self) -> usize {
        self.marks[1] - self.marks[0]
    }
}

pub(super) fn expand_loop(
    transfer: &mut MeasurementTransfer,
    runner: &mut LoopRunner<'_, '_, '_, MeasurementId>,
) -> Result<Option<Vec<MeasurementId>>, Error> {
    let checkpoint = transfer.record.checkpoint();
    let inits = runner.inits().to_vec();
    let trace = speculate(transfer, runner, &inits)?;
    let slots = match &trace {
        Some(trace) => (0..inits.len())
            .map(|slot| classify(runner.body(), slot, &inits[slot], trace, &transfer.record))
            .collect::<Vec<_>>(),
        None => Vec::new(),
    };
    transfer.record.rollback(checkpoint);

    let Some(trace) = trace.filter(|_| slots.iter().any(Option::is_some)) else {
        return runner.approximate(transfer);
    };
    let per_iteration = trace.per_iteration();
    let max_expansion = runner.config().max_expansion;
    let expansion = runner
        .trip_count()
        .and_then(|trips| Some((trips, trips.checked_mul(per_iteration)?)))
        .filter(|(_, count)| *count <= max_expansion);
    let Some((trips, count)) = expansion else {
        debug!(
            "loop {} grows an accumulator an unknown or unbounded number of times",
            runner.op().id
        );
        let carried = runner.approximate(transfer)?;
        return Ok(carried.map(|values| {
            values
                .into_iter()
                .zip(&slots)
                .map(|(value, slot)| match slot {
                    Some(_) => MeasurementId::Any,
                    None => value,
                })
                .collect()
        }));
    };

    debug!(
        "expanding loop {} over {trips} iterations of {per_iteration} measurements",
        runner.op().id
    );
    let cells = transfer.record.allocate_batch(count);
    let carried = slots
        .iter()
        .enumerate()
        .map(|(slot, accumulator)| match accumulator {
            Some(accumulator) => accumulator.expand(&cells, per_iteration, trips),
            None if inits[slot] == trace.first[slot] && inits[slot] == trace.second[slot] => {
                inits[slot].clone()
            }
            None => MeasurementId::Any,
        })
        .collect();
    runner.cover_body();
    Ok(Some(carried))
}

fn speculate(
    transfer: &mut MeasurementTransfer,
    runner: &mut LoopRunner<'_, '_, '_, MeasurementId>,
    inits: &[MeasurementId],
) -> Result<Option<Trace>, Error> {
    let start = transfer.record.counter();
    let Some(first) = completed(runner.speculate(transfer, inits)?) else {
        return Ok(None);
    };
    let middle = transfer.record.counter();
    let Some(second) = completed(runner.speculate(transfer, &first)?) else {
        return Ok(None);
    };
    let end = transfer.record.counter();
    if middle - start != end - middle {
        return Ok(None);
    }
    Ok(Some(Trace {
        first,
        second,
        marks: [start, middle, end],
    }))
}

/// The carried values of an iteration that finished without returning.
fn completed(exit: IterationExit<MeasurementId>) -> Option<Vec<MeasurementId>> {
    match exit {
        IterationExit {
            yielded: Some(values),
            returned: None,
        } => Some(values),
        _ => None,
    }
}

fn classify(
    body: &Region,
    slot: usize,
    init: &MeasurementId,
    trace: &Trace,
    record: &RecordState,
) -> Option<Accumulator> {
    let initial = init.elements()?;
    let (
        MeasurementId::Tuple {
            elems: first,
            predicate,
            immutable: false,
        },
        MeasurementId::Tuple {
            elems: second,
            predicate: second_predicate,
            immutable: false,
        },
    ) = (&trace.first[slot], &trace.second[slot])
    else {
        return None;
    };
    let growth = first.len().checked_sub(initial.len())?;
    if growth == 0 || second.len() != first.len() + growth || predicate != second_predicate {
        return None;
    }

    let direction = concat_direction(body, slot)?;
    let chunk = added_chunk(direction, initial, first, record, trace.marks[0])?;
    if added_chunk(direction, first, second, record, trace.marks[1])? != chunk {
        return None;
    }
    debug!("carried value {slot} is an accumulator growing by {growth} ({direction:?})");
    Some(Accumulator {
        direction,
        initial: initial.to_vec(),
        chunk,
        predicate: *predicate,
    })
}

/// Finds whether the carried value is the left or the right operand of the concatenation that
/// produces its next value.
fn concat_direction(body: &Region, slot: usize) -> Option<Direction> {
    let carried = *body.entry().params.get(slot + 1)?;
    let next = *yielded_values(body)?.get(slot)?;
    let op = find_defining_op(body, resolve_alias(body, next))?;
    let OpKind::Concat(lhs, rhs) = op.kind else {
        return None;
    };
    if resolve_alias(body, lhs) == carried {
        Some(Direction::Append)
    } else if resolve_alias(body, rhs) == carried {
        Some(Direction::Prepend)
    } else {
        None
    }
}

/// The elements an iteration added to `before`, located by the order of their measurements
/// within the iteration starting at measurement `start`.
fn added_chunk(
    direction: Direction,
    before: &[MeasurementId],
    after: &[MeasurementId],
    record: &RecordState,
    start: usize,
) -> Option<Vec<(usize, Option<Predicate>)>> {
    let growth = after.len().checked_sub(before.len())?;
    let (kept, added) = match direction {
        Direction::Append => after.split_at(before.len()),
        Direction::Prepend => {
            let (added, kept) = after.split_at(growth);
            (kept, added)
        }
    };
    if kept != before {
        return None;
    }
    added
        .iter()
        .map(|elem| match elem {
            MeasurementId::Raw(cell, predicate) => {
                let offset = record.ordinal(*cell)?.checked_sub(start)?;
                Some((offset, *predicate))
            }
            _ => None,
        })
        .collect()
}
