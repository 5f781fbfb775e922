// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub use index_map::{IndexMap, IntoIter, Iter, IterMut};
