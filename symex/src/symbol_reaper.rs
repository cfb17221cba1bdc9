// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::{ExprId, StmtId, VarDecl};
use crate::location_context::StackFrameContext;
use crate::memory_region::{MemRegionManager, RegionId, RegionKind};
use crate::store::{Store, StoreManager};
use crate::svals::SVal;
use crate::symbol::{SymbolId, SymbolKind, SymbolManager};

use log_derive::*;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// Answers liveness questions about variables and expressions at a program point.
pub trait LiveVariables: Debug {
    fn is_live_var(&self, frame: &StackFrameContext, stmt: StmtId, decl: &VarDecl) -> bool;
    fn is_live_expr(&self, frame: &StackFrameContext, stmt: StmtId, expr: ExprId) -> bool;
}

/// A liveness oracle that is simply told which variables and expressions are live where.
#[derive(Clone, Debug, Default)]
pub struct ExplicitLiveness {
    live_vars: HashSet<(u32, StmtId, u32)>,
    live_exprs: HashSet<(u32, StmtId, ExprId)>,
}

impl ExplicitLiveness {
    pub fn new() -> ExplicitLiveness {
        ExplicitLiveness::default()
    }

    pub fn add_live_var(&mut self, frame: &StackFrameContext, stmt: StmtId, decl: &VarDecl) {
        self.live_vars.insert((frame.id, stmt, decl.id));
    }

    pub fn add_live_expr(&mut self, frame: &StackFrameContext, stmt: StmtId, expr: ExprId) {
        self.live_exprs.insert((frame.id, stmt, expr));
    }
}

impl LiveVariables for ExplicitLiveness {
    fn is_live_var(&self, frame: &StackFrameContext, stmt: StmtId, decl: &VarDecl) -> bool {
        self.live_vars.contains(&(frame.id, stmt, decl.id))
    }

    fn is_live_expr(&self, frame: &StackFrameContext, stmt: StmtId, expr: ExprId) -> bool {
        self.live_exprs.contains(&(frame.id, stmt, expr))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SymbolStatus {
    NotProcessed,
    HaveMarkedDependents,
}

/// Computes which symbols and regions are still live at a program point.
/// A reaper is used for a single pass: first the environment and store mark what they can
/// reach, then symbols that were reported as maybe dead and turned out not to be live are dead.
pub struct SymbolReaper<'a> {
    frame: Option<Rc<StackFrameContext>>,
    stmt: Option<StmtId>,
    regions: &'a MemRegionManager,
    symbols: &'a SymbolManager,
    liveness: &'a dyn LiveVariables,
    the_living: HashMap<SymbolId, SymbolStatus>,
    the_dead: HashSet<SymbolId>,
    region_roots: HashSet<RegionId>,
    metadata_in_use: HashSet<SymbolId>,
    included_region_cache: HashMap<RegionId, bool>,
    reaped_store: Option<(Store, Rc<dyn StoreManager>)>,
    incomplete: bool,
}

impl Debug for SymbolReaper<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!(
            "SymbolReaper({:?}, {:?}, live: {}, dead: {})",
            self.frame,
            self.stmt,
            self.the_living.len(),
            self.the_dead.len()
        ))
    }
}

impl<'a> SymbolReaper<'a> {
    /// A reaper for the given frame and statement. If stmt is None, every variable and
    /// expression of the frame (and its parents) is considered live.
    pub fn new(
        frame: Option<Rc<StackFrameContext>>,
        stmt: Option<StmtId>,
        regions: &'a MemRegionManager,
        symbols: &'a SymbolManager,
        liveness: &'a dyn LiveVariables,
    ) -> SymbolReaper<'a> {
        SymbolReaper {
            frame,
            stmt,
            regions,
            symbols,
            liveness,
            the_living: HashMap::new(),
            the_dead: HashSet::new(),
            region_roots: HashSet::new(),
            metadata_in_use: HashSet::new(),
            included_region_cache: HashMap::new(),
            reaped_store: None,
            incomplete: false,
        }
    }

    pub fn regions(&self) -> &'a MemRegionManager {
        self.regions
    }

    pub fn symbols(&self) -> &'a SymbolManager {
        self.symbols
    }

    pub fn stack_frame(&self) -> Option<&Rc<StackFrameContext>> {
        self.frame.as_ref()
    }

    /// Makes the store that survived reaping available for queries about variables
    /// that are only reachable through bindings.
    pub fn set_reaped_store(&mut self, store: Store, store_manager: Rc<dyn StoreManager>) {
        self.reaped_store = Some((store, store_manager));
    }

    /// Records that not everything reachable from the live roots could be visited.
    /// Nothing may be reaped in this pass.
    pub fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// The symbols that occur in the value.
    pub fn symbols_of(&self, val: &SVal) -> Vec<SymbolId> {
        val.symbols(self.regions, self.symbols)
    }

    /// The base regions marked live, in id order.
    pub fn region_roots(&self) -> Vec<RegionId> {
        let mut roots: Vec<RegionId> = self.region_roots.iter().cloned().collect();
        roots.sort();
        roots
    }

    /// The dead symbols found so far, in id order.
    pub fn dead_symbols(&self) -> Vec<SymbolId> {
        let mut dead: Vec<SymbolId> = self.the_dead.iter().cloned().collect();
        dead.sort();
        dead
    }

    pub fn has_dead_symbols(&self) -> bool {
        !self.the_dead.is_empty()
    }

    pub fn is_dead(&self, symbol: SymbolId) -> bool {
        self.the_dead.contains(&symbol)
    }
}

/// Marking
impl<'a> SymbolReaper<'a> {
    /// Unconditionally marks a symbol as live, along with everything that depends on it.
    #[logfn_inputs(TRACE)]
    pub fn mark_live(&mut self, symbol: SymbolId) {
        self.the_living.insert(symbol, SymbolStatus::NotProcessed);
        self.the_dead.remove(&symbol);
        self.mark_dependents_live(symbol);
    }

    /// Marks the base of the region as a live root. Symbols in the indices of the region's
    /// element layers are live too.
    #[logfn_inputs(TRACE)]
    pub fn mark_live_region(&mut self, region: RegionId) {
        self.region_roots.insert(self.regions.base_region(region));
        self.mark_element_indices_live(region);
    }

    /// Marks a metadata symbol as still in use. Other symbols are ignored, since their
    /// liveness follows from what they are derived from.
    #[logfn_inputs(TRACE)]
    pub fn mark_in_use(&mut self, symbol: SymbolId) {
        if let SymbolKind::Metadata { .. } = self.symbols.kind(symbol) {
            self.metadata_in_use.insert(symbol);
        }
    }

    pub fn mark_element_indices_live(&mut self, region: RegionId) {
        let regions = self.regions;
        for layer in regions.region_chain(region) {
            if let Some(index) = regions.element_index(layer) {
                let index = SVal::NonLoc(index.clone());
                for symbol in self.symbols_of(&index) {
                    self.mark_live(symbol);
                }
            }
        }
    }

    /// Marks the symbol as dead unless it is already known to be live.
    /// Returns true if the symbol was marked dead.
    #[logfn_inputs(TRACE)]
    pub fn maybe_dead(&mut self, symbol: SymbolId) -> bool {
        if self.is_live(symbol) {
            return false;
        }
        self.the_dead.insert(symbol);
        true
    }

    /// Marks every symbol that depends on symbol as live. Each symbol has its dependents
    /// processed at most once, so cycles in the dependency graph terminate.
    fn mark_dependents_live(&mut self, symbol: SymbolId) {
        let mut work_list = vec![symbol];
        while let Some(symbol) = work_list.pop() {
            match self.the_living.get_mut(&symbol) {
                Some(status) if *status == SymbolStatus::NotProcessed => {
                    *status = SymbolStatus::HaveMarkedDependents;
                }
                _ => continue,
            }
            for dependent in self.symbols.dependent_symbols(symbol) {
                if self.the_living.contains_key(&dependent) {
                    continue;
                }
                self.the_living.insert(dependent, SymbolStatus::NotProcessed);
                self.the_dead.remove(&dependent);
                work_list.push(dependent);
            }
        }
    }
}

/// Liveness queries
impl<'a> SymbolReaper<'a> {
    /// Determines if the symbol is live, marking it live if it is. The answer for a
    /// composite symbol is derived from the symbols and regions it is built from.
    #[logfn_inputs(TRACE)]
    pub fn is_live(&mut self, symbol: SymbolId) -> bool {
        if self.the_living.contains_key(&symbol) {
            self.mark_dependents_live(symbol);
            return true;
        }
        let symbols = self.symbols;
        let known_live = match symbols.kind(symbol) {
            SymbolKind::RegionValue { region } => self.is_readable_region(*region),
            SymbolKind::Conjured { .. } => false,
            SymbolKind::Derived { parent, .. } => self.is_live(*parent),
            SymbolKind::Extent { region } => self.is_live_region(*region),
            SymbolKind::Metadata { region, .. } => {
                // Metadata stays live only while someone claims it, and each claim is used up.
                let in_use = self.metadata_in_use.contains(&symbol) && self.is_live_region(*region);
                if in_use {
                    self.metadata_in_use.remove(&symbol);
                }
                in_use
            }
            SymbolKind::Cast { operand, .. } => self.is_live(*operand),
            SymbolKind::SymInt { lhs, .. } => self.is_live(*lhs),
            SymbolKind::IntSym { rhs, .. } => self.is_live(*rhs),
            SymbolKind::SymSym { lhs, rhs, .. } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.is_live(lhs) && self.is_live(rhs)
            }
        };
        if known_live {
            self.mark_live(symbol);
        }
        known_live
    }

    /// Determines if the base of the region is live.
    #[logfn_inputs(TRACE)]
    pub fn is_live_region(&mut self, region: RegionId) -> bool {
        let regions = self.regions;
        let base = regions.base_region(region);
        if self.region_roots.contains(&base) {
            return true;
        }
        match regions.kind(base) {
            RegionKind::Symbolic { symbol, .. } => self.is_live(*symbol),
            RegionKind::Var { .. } => self.is_live_var_region(base, true),
            RegionKind::Alloca { .. } | RegionKind::CxxThis { .. } => true,
            kind => kind.is_memory_space() || kind.is_code_text(),
        }
    }

    /// A region is readable if it is live, or if it still occurs in the bindings of the
    /// reaped store.
    fn is_readable_region(&mut self, region: RegionId) -> bool {
        if self.is_live_region(region) {
            return true;
        }
        let base = self.regions.base_region(region);
        self.is_included_in_reaped_store(base)
    }

    fn is_included_in_reaped_store(&mut self, base: RegionId) -> bool {
        if let Some(included) = self.included_region_cache.get(&base) {
            return *included;
        }
        let included = match &self.reaped_store {
            Some((store, store_manager)) => {
                store_manager.included_in_bindings(self.regions, store, base)
            }
            None => return false,
        };
        self.included_region_cache.insert(base, included);
        included
    }

    /// Determines if the variable region is live. Regions that are not variables are never
    /// live here. Variables of parent frames are always live,
    /// variables of the current frame are live if the liveness oracle says so, or, if
    /// include_store_bindings is set, if the region occurs in the reaped store's bindings.
    #[logfn_inputs(TRACE)]
    pub fn is_live_var_region(&mut self, region: RegionId, include_store_bindings: bool) -> bool {
        let regions = self.regions;
        let decl = match regions.kind(region) {
            RegionKind::Var { decl, .. } => decl,
            _ => return false,
        };
        let var_frame = match regions.stack_frame(region) {
            Some(frame) => frame,
            // Globals are always live.
            None => return true,
        };
        let current = match &self.frame {
            Some(frame) => frame,
            None => return false,
        };
        if var_frame.id != current.id {
            return var_frame.is_parent_of(current);
        }
        let stmt = match self.stmt {
            Some(stmt) => stmt,
            None => return true,
        };
        if self.liveness.is_live_var(current, stmt, decl) {
            return true;
        }
        if !include_store_bindings {
            return false;
        }
        self.is_included_in_reaped_store(region)
    }

    /// Determines if the value of an expression evaluated in the given frame is still needed.
    #[logfn_inputs(TRACE)]
    pub fn is_live_expr(&self, expr: ExprId, expr_frame: &StackFrameContext) -> bool {
        let current = match &self.frame {
            Some(frame) => frame,
            None => return false,
        };
        if current.id != expr_frame.id {
            // Expressions of a callee that has returned are out of scope.
            return !current.is_parent_of(expr_frame);
        }
        match self.stmt {
            Some(stmt) => self.liveness.is_live_expr(current, stmt, expr),
            None => true,
        }
    }
}
