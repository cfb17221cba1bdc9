// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Somewhat arbitrary constants used to limit things in the value machinery that may
// take too long or use too much memory.

/// Symbolic expressions whose combined operand complexity reaches this bound are not built.
/// The result of such an operation is modeled as unknown.
pub const MAX_SYMBOL_COMPLEXITY: usize = 10_000;

/// Regions nested more deeply than this usually mean that something is looping.
pub const MAX_REGION_DEPTH: usize = 300;

/// Bounds the number of regions visited by a single reachability scan.
pub const MAX_SCAN_REGIONS: usize = 100_000;
