// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::ExprId;
use crate::location_context::StackFrameContext;
use crate::memory_region::RegionId;
use crate::program_state::{ProgramState, SymbolVisitor};
use crate::svals::SVal;
use crate::symbol::SymbolId;
use crate::symbol_reaper::SymbolReaper;

use log_derive::{logfn, logfn_inputs};
use rpds::HashTrieMap;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// An expression evaluated in a particular stack frame.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct EnvironmentEntry {
    pub frame: Rc<StackFrameContext>,
    pub expr: ExprId,
}

/// Maps the expressions whose values are still needed to those values.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Environment {
    bindings: HashTrieMap<EnvironmentEntry, SVal>,
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut entries: Vec<(&EnvironmentEntry, &SVal)> = self.bindings.iter().collect();
        entries.sort();
        f.debug_map().entries(entries.into_iter()).finish()
    }
}

/// Marks everything a value can reach as live.
struct MarkLive<'r, 'a> {
    reaper: &'r mut SymbolReaper<'a>,
}

impl SymbolVisitor for MarkLive<'_, '_> {
    fn visit_symbol(&mut self, symbol: SymbolId) -> bool {
        self.reaper.mark_live(symbol);
        true
    }

    fn visit_region(&mut self, region: RegionId) -> bool {
        self.reaper.mark_live_region(region);
        true
    }
}

impl Environment {
    pub fn len(&self) -> usize {
        self.bindings.size()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns an environment in which the expression has the given value. Binding Unknown
    /// removes the expression, since a missing entry reads as Unknown anyway.
    #[logfn_inputs(TRACE)]
    pub fn bind_expr(&self, expr: ExprId, frame: &Rc<StackFrameContext>, val: SVal) -> Environment {
        let entry = EnvironmentEntry {
            frame: frame.clone(),
            expr,
        };
        let bindings = if val.is_unknown() {
            self.bindings.remove(&entry)
        } else {
            self.bindings.insert(entry, val)
        };
        Environment { bindings }
    }

    #[logfn(TRACE)]
    pub fn get_sval(&self, expr: ExprId, frame: &Rc<StackFrameContext>) -> SVal {
        let entry = EnvironmentEntry {
            frame: frame.clone(),
            expr,
        };
        self.bindings.get(&entry).cloned().unwrap_or(SVal::Unknown)
    }

    /// All bindings, ordered by frame and expression.
    pub fn bindings(&self) -> Vec<(EnvironmentEntry, SVal)> {
        let mut entries: Vec<(EnvironmentEntry, SVal)> = self
            .bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Drops the bindings of expressions that are no longer live. Everything reachable from
    /// a live binding is marked live in the reaper, the symbols of dropped bindings are
    /// reported as maybe dead.
    #[logfn_inputs(TRACE)]
    pub fn remove_dead_bindings(
        &self,
        reaper: &mut SymbolReaper<'_>,
        state: &ProgramState,
    ) -> Environment {
        let regions = reaper.regions();
        let symbols = reaper.symbols();
        let mut result = HashTrieMap::new();
        for (entry, val) in self.bindings() {
            if reaper.is_live_expr(entry.expr, &entry.frame) {
                let mut visitor = MarkLive {
                    reaper: &mut *reaper,
                };
                if !state.scan_reachable_symbols(&val, regions, symbols, &mut visitor) {
                    reaper.mark_incomplete();
                }
                result.insert_mut(entry, val);
            } else {
                debug!("dropping dead expression {:?}", entry.expr);
                for symbol in reaper.symbols_of(&val) {
                    reaper.maybe_dead(symbol);
                }
            }
        }
        Environment { bindings: result }
    }
}
