// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Maximum depth of nested call inlining before the analysis gives up
    pub max_depth: usize,
    /// Loops with a statically known sequence of at most this many items are unrolled
    pub max_unroll: usize,
    /// Number of times a block may be revisited through the worklist before its entry
    /// values are widened to top
    pub widening_delay: usize,
    /// Largest number of measurements a client may lay out at once when it expands a loop
    /// without running it
    pub max_expansion: usize,
}

impl AnalysisConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 128;
    pub const DEFAULT_MAX_UNROLL: usize = 256;
    pub const DEFAULT_WIDENING_DELAY: usize = 8;
    pub const DEFAULT_MAX_EXPANSION: usize = 1 << 20;
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_unroll: Self::DEFAULT_MAX_UNROLL,
            widening_delay: Self::DEFAULT_WIDENING_DELAY,
            max_expansion: Self::DEFAULT_MAX_EXPANSION,
        }
    }
}
