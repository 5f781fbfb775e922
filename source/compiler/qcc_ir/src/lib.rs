// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod builder;
pub mod const_fold;
pub mod ir;
pub mod ty;
pub mod utils;
