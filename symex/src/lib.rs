// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The value layer of a path sensitive symbolic execution engine: canonical memory regions and
//! symbols, abstract values and the operations on them, a region based store, and the liveness
//! pass that decides which symbols and bindings are still needed at a program point.

#[macro_use]
extern crate log;

pub mod ast;
pub mod concrete_int;
pub mod environment;
pub mod k_limits;
pub mod location_context;
pub mod memory_region;
pub mod options;
pub mod printer;
pub mod program_state;
pub mod scenario;
pub mod store;
pub mod sval_builder;
pub mod svals;
pub mod symbol;
pub mod symbol_reaper;
pub mod types;
