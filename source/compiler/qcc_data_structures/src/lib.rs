// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod display;
pub mod index_map;
