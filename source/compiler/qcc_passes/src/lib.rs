// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validation passes that consume the results of `qcc_analysis`.

pub mod no_cloning;

pub use no_cloning::{check_no_cloning, validate_no_cloning};
