// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The measurement record of one analysis run. Every measurement owns a cell holding its offset
//! from the end of the record. Allocating or releasing a measurement renumbers the live cells in
//! place, so every lattice value referring to a cell observes the change.


use std::fmt::{self, Display, Formatter};

use log::trace;
use qcc_data_structures::index_map::IndexMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub usize);

impl CellId {
    #[must_use]
    pub fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<usize> for CellId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl From<CellId> for usize {
    fn from(value: CellId) -> Self {
        value.0
    }
}

impl Display for CellId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    /// Renumbered by every allocation and release.
    Live,
    /// A snapshot taken when a measurement was sealed. Never renumbered.
    Frozen,
    /// No longer part of the record.
    Released,
}

#[derive(Clone, Debug, PartialEq)]
struct Cell {
    offset: i64,
    state: CellState,
    /// The position of the measurement in program order.
    ordinal: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordState {
    cells: IndexMap<CellId, Cell>,
    next_cell: CellId,
    counter: usize,
}

/// A saved record that can be restored with [`RecordState::rollback`].
#[derive(Clone, Debug)]
pub struct Checkpoint(RecordState);

impl RecordState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of measurements allocated so far.
    #[must_use]
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// The number of live cells.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.cells
            .values()
            .filter(|cell| cell.state == CellState::Live)
            .count()
    }

    /// Records one new measurement. Every live cell moves one further from the end.
    pub fn allocate(&mut self) -> CellId {
        self.shift_live(-1);
        let id = self.push(Cell {
            offset: -1,
            state: CellState::Live,
            ordinal: self.counter,
        });
        self.counter += 1;
        trace!("allocated {id}, {} measurements recorded", self.counter);
        id
    }

    /// Records `count` measurements at once. The cells are returned in chronological order and
    /// hold the same offsets as if they had been allocated one by one.
    pub fn allocate_batch(&mut self, count: usize) -> Vec<CellId> {
        let len = i64::try_from(count).expect("batch size should fit in an i64");
        self.shift_live(-len);
        let cells = (0..len)
            .map(|index| {
                let id = self.push(Cell {
                    offset: index - len,
                    state: CellState::Live,
                    ordinal: self.counter,
                });
                self.counter += 1;
                id
            })
            .collect();
        trace!("allocated {count} cells, {} measurements recorded", self.counter);
        cells
    }

    /// Removes a live cell from the record. Older live cells move one closer to the end.
    pub fn release(&mut self, cell: CellId) {
        let Some(released) = self.cells.get_mut(cell) else {
            return;
        };
        if released.state != CellState::Live {
            return;
        }
        released.state = CellState::Released;
        let offset = released.offset;
        for other in self.cells.values_mut() {
            if other.state == CellState::Live && other.offset < offset {
                other.offset += 1;
            }
        }
        trace!("released {cell}");
    }

    /// Returns a frozen snapshot of the cell that keeps its current offset forever. Frozen cells
    /// are returned unchanged.
    pub fn freeze(&mut self, cell: CellId) -> CellId {
        let Some(source) = self.cells.get(cell) else {
            return cell;
        };
        if source.state == CellState::Frozen {
            return cell;
        }
        let snapshot = Cell {
            offset: source.offset,
            state: CellState::Frozen,
            ordinal: source.ordinal,
        };
        let id = self.push(snapshot);
        trace!("froze {cell} as {id}");
        id
    }

    /// The offset of the cell from the end of the record.
    #[must_use]
    pub fn offset(&self, cell: CellId) -> Option<i64> {
        self.cells.get(cell).map(|cell| cell.offset)
    }

    #[must_use]
    pub fn state(&self, cell: CellId) -> Option<CellState> {
        self.cells.get(cell).map(|cell| cell.state)
    }

    /// The position of the cell's measurement in program order, counting from zero.
    #[must_use]
    pub fn ordinal(&self, cell: CellId) -> Option<usize> {
        self.cells.get(cell).map(|cell| cell.ordinal)
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.clone())
    }

    /// Forgets everything recorded since the checkpoint was taken.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        trace!(
            "rolling back {} measurements",
            self.counter.saturating_sub(checkpoint.0.counter)
        );
        *self = checkpoint.0;
    }

    fn shift_live(&mut self, by: i64) {
        for cell in self.cells.values_mut() {
            if cell.state == CellState::Live {
                cell.offset += by;
            }
        }
    }

    fn push(&mut self, cell: Cell) -> CellId {
        let id = self.next_cell;
        self.next_cell = id.successor();
        self.cells.insert(id, cell);
        id
    }
}
