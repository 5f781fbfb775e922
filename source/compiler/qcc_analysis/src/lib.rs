// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Client analyses of the dataflow engine: qubit addresses and measurement identifiers.

pub mod addresses;
pub mod measurements;

pub use addresses::{Address, AddressTransfer, QubitId, analyze_addresses};
pub use measurements::{
    IndexOrSlice, MeasurementAnalysis, MeasurementId, MeasurementTransfer, Resolved,
    analyze_measurements,
    record::{CellId, CellState, Checkpoint, RecordState},
};
