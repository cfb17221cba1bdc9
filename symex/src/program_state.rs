// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::{ExprId, StmtId};
use crate::environment::Environment;
use crate::k_limits;
use crate::location_context::StackFrameContext;
use crate::memory_region::{MemRegionManager, RegionId, RegionKind};
use crate::store::{RegionStoreManager, Store, StoreManager};
use crate::sval_builder::SValBuilder;
use crate::svals::{Loc, NonLoc, SVal};
use crate::symbol::{SymbolId, SymbolKind, SymbolManager};
use crate::symbol_reaper::{LiveVariables, SymbolReaper};
use crate::types::QualType;

use log_derive::*;
use rpds::HashTrieSet;
use std::collections::HashSet;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// The state of the program at a point on an execution path: the values of the expressions
/// that are still needed, the contents of memory and the symbols that came from untrusted
/// sources. States are persistent values, every update returns a new state.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct ProgramState {
    pub environment: Environment,
    pub store: Store,
    taint: HashTrieSet<SymbolId>,
}

impl Debug for ProgramState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("ProgramState")
            .field("environment", &self.environment)
            .field("store", &self.store)
            .field("taint", &self.tainted_symbols())
            .finish()
    }
}

/// Called for every symbol and region reached by scan_reachable_symbols.
/// Returning false stops the scan.
pub trait SymbolVisitor {
    fn visit_symbol(&mut self, symbol: SymbolId) -> bool;

    fn visit_region(&mut self, _region: RegionId) -> bool {
        true
    }
}

enum ScanItem {
    Value(SVal),
    Region(RegionId),
    Symbol(SymbolId),
}

/// Taint
impl ProgramState {
    /// The tainted symbols, in id order.
    pub fn tainted_symbols(&self) -> Vec<SymbolId> {
        let mut result: Vec<SymbolId> = self.taint.iter().cloned().collect();
        result.sort();
        result
    }

    /// Returns a state in which the symbol of the value is tainted. Casts are looked through,
    /// and a pointer to a symbolic region taints the region's symbol.
    #[logfn_inputs(TRACE)]
    pub fn add_taint(
        &self,
        val: &SVal,
        regions: &MemRegionManager,
        symbols: &SymbolManager,
    ) -> ProgramState {
        let mut symbol = match val.as_symbol(regions, false) {
            Some(symbol) => symbol,
            None => return self.clone(),
        };
        while let SymbolKind::Cast { operand, .. } = symbols.kind(symbol) {
            symbol = *operand;
        }
        debug!("tainting {:?}", symbol);
        let mut result = self.clone();
        result.taint.insert_mut(symbol);
        result
    }

    pub fn is_tainted(
        &self,
        val: &SVal,
        regions: &MemRegionManager,
        symbols: &SymbolManager,
    ) -> bool {
        if let Some(symbol) = val.as_symbol(regions, false) {
            return self.is_tainted_symbol(symbol, regions, symbols);
        }
        match val.as_region() {
            Some(region) => self.is_tainted_region(region, regions, symbols),
            None => false,
        }
    }

    /// A symbol is tainted if any data symbol in its expansion is tainted. Derived symbols
    /// inherit the taint of their parent and region values the taint of their region.
    pub fn is_tainted_symbol(
        &self,
        symbol: SymbolId,
        regions: &MemRegionManager,
        symbols: &SymbolManager,
    ) -> bool {
        for sym in symbols.symbol_iter(symbol) {
            let kind = symbols.kind(sym);
            if !kind.is_data() {
                continue;
            }
            if self.taint.contains(&sym) {
                return true;
            }
            match kind {
                SymbolKind::Derived { parent, .. } => {
                    if self.is_tainted_symbol(*parent, regions, symbols) {
                        return true;
                    }
                }
                SymbolKind::RegionValue { region } => {
                    if self.is_tainted_region(*region, regions, symbols) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    pub fn is_tainted_region(
        &self,
        region: RegionId,
        regions: &MemRegionManager,
        symbols: &SymbolManager,
    ) -> bool {
        match regions.kind(region) {
            RegionKind::Element {
                index,
                super_region,
                ..
            } => {
                self.is_tainted_region(*super_region, regions, symbols)
                    || self.is_tainted(&SVal::NonLoc(index.clone()), regions, symbols)
            }
            RegionKind::Symbolic { symbol, .. } => {
                self.is_tainted_symbol(*symbol, regions, symbols)
            }
            kind => match kind.super_region() {
                Some(super_region) => self.is_tainted_region(super_region, regions, symbols),
                None => false,
            },
        }
    }

    /// Returns a state without taint information for the given symbols.
    fn remove_taint(&self, dead: &[SymbolId]) -> ProgramState {
        let mut result = self.clone();
        for symbol in dead {
            result.taint.remove_mut(symbol);
        }
        result
    }
}

/// Reachability
impl ProgramState {
    /// Visits everything reachable from the value: the regions it points to along with their
    /// super-regions, the symbols of symbolic regions and element indices, the symbols of
    /// symbolic expressions and, for the base of each region chain, the values bound in the
    /// store. Every region and symbol is visited at most once. Returns false if the visitor
    /// stopped the scan or if more than MAX_SCAN_REGIONS regions are reachable.
    pub fn scan_reachable_symbols(
        &self,
        val: &SVal,
        regions: &MemRegionManager,
        symbols: &SymbolManager,
        visitor: &mut dyn SymbolVisitor,
    ) -> bool {
        let mut visited_regions: HashSet<RegionId> = HashSet::new();
        let mut visited_symbols: HashSet<SymbolId> = HashSet::new();
        let mut work_list = vec![ScanItem::Value(val.clone())];
        while let Some(item) = work_list.pop() {
            match item {
                ScanItem::Value(val) => match &val {
                    SVal::Loc(Loc::MemRegion(region))
                    | SVal::NonLoc(NonLoc::LocAsInteger {
                        loc: Loc::MemRegion(region),
                        ..
                    }) => work_list.push(ScanItem::Region(*region)),
                    SVal::NonLoc(NonLoc::Symbol(symbol)) => {
                        work_list.push(ScanItem::Symbol(*symbol))
                    }
                    _ => {}
                },
                ScanItem::Symbol(symbol) => {
                    for sym in symbols.symbol_iter(symbol) {
                        if !visited_symbols.insert(sym) {
                            continue;
                        }
                        if !visitor.visit_symbol(sym) {
                            return false;
                        }
                    }
                }
                ScanItem::Region(region) => {
                    if regions.is_memory_space(region) || !visited_regions.insert(region) {
                        continue;
                    }
                    if visited_regions.len() > k_limits::MAX_SCAN_REGIONS {
                        warn!("reachability scan stopped after {} regions", visited_regions.len());
                        return false;
                    }
                    if !visitor.visit_region(region) {
                        return false;
                    }
                    let kind = regions.kind(region);
                    if let RegionKind::Symbolic { symbol, .. } = kind {
                        if visited_symbols.insert(*symbol) && !visitor.visit_symbol(*symbol) {
                            return false;
                        }
                    }
                    if let RegionKind::Element { index, .. } = kind {
                        work_list.push(ScanItem::Value(SVal::NonLoc(index.clone())));
                    }
                    if let Some(super_region) = kind.super_region() {
                        if regions.is_memory_space(super_region) {
                            // The top of a chain. Everything bound inside it is reachable.
                            for val in self.store.cluster_values(region) {
                                work_list.push(ScanItem::Value(val));
                            }
                        } else {
                            work_list.push(ScanItem::Region(super_region));
                        }
                    }
                }
            }
        }
        true
    }
}

/// Creates program states and updates them, using a single value builder and store manager.
pub struct ProgramStateManager {
    pub builder: SValBuilder,
    store_manager: Rc<dyn StoreManager>,
}

impl Debug for ProgramStateManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("ProgramStateManager({:?})", self.store_manager))
    }
}

impl Default for ProgramStateManager {
    fn default() -> Self {
        ProgramStateManager::new()
    }
}

impl ProgramStateManager {
    /// A manager that uses the region store.
    pub fn new() -> ProgramStateManager {
        let store_manager: Rc<dyn StoreManager> = Rc::new(RegionStoreManager::new());
        ProgramStateManager {
            builder: SValBuilder::new(store_manager.clone()),
            store_manager,
        }
    }

    pub fn store_manager(&self) -> Rc<dyn StoreManager> {
        self.store_manager.clone()
    }

    pub fn get_initial_state(&self) -> ProgramState {
        ProgramState {
            environment: Environment::default(),
            store: self.store_manager.initial_store(),
            taint: HashTrieSet::new(),
        }
    }

    /// Returns a state in which the location holds the value. Binding to anything that is not
    /// a location leaves the state unchanged.
    #[logfn_inputs(TRACE)]
    pub fn bind_loc(&mut self, state: &ProgramState, loc: &SVal, val: SVal) -> ProgramState {
        let loc = match loc {
            SVal::Loc(loc) => loc,
            _ => return state.clone(),
        };
        let store = self
            .store_manager
            .bind(&mut self.builder, &state.store, loc, val);
        ProgramState {
            store,
            ..state.clone()
        }
    }

    #[logfn_inputs(TRACE)]
    pub fn bind_default(&mut self, state: &ProgramState, region: RegionId, val: SVal) -> ProgramState {
        let store = self
            .store_manager
            .bind_default(&mut self.builder, &state.store, region, val);
        ProgramState {
            store,
            ..state.clone()
        }
    }

    /// Returns a state without the binding of the location.
    pub fn kill_binding(&mut self, state: &ProgramState, loc: &Loc) -> ProgramState {
        let store = self
            .store_manager
            .remove_binding(&self.builder, &state.store, loc);
        ProgramState {
            store,
            ..state.clone()
        }
    }

    /// Returns the value stored at the location, read as a value of type ty when given.
    #[logfn_inputs(TRACE)]
    pub fn get_sval(&mut self, state: &ProgramState, loc: &SVal, ty: Option<&QualType>) -> SVal {
        match loc {
            SVal::Loc(loc) => {
                self.store_manager
                    .get_binding(&mut self.builder, &state.store, loc, ty)
            }
            SVal::Undefined => SVal::Undefined,
            _ => SVal::Unknown,
        }
    }

    pub fn bind_expr(
        &self,
        state: &ProgramState,
        expr: ExprId,
        frame: &Rc<StackFrameContext>,
        val: SVal,
    ) -> ProgramState {
        ProgramState {
            environment: state.environment.bind_expr(expr, frame, val),
            ..state.clone()
        }
    }

    pub fn get_expr_sval(
        &self,
        state: &ProgramState,
        expr: ExprId,
        frame: &Rc<StackFrameContext>,
    ) -> SVal {
        state.environment.get_sval(expr, frame)
    }

    pub fn add_taint(&self, state: &ProgramState, val: &SVal) -> ProgramState {
        state.add_taint(val, &self.builder.regions, &self.builder.symbols)
    }

    pub fn is_tainted(&self, state: &ProgramState, val: &SVal) -> bool {
        state.is_tainted(val, &self.builder.regions, &self.builder.symbols)
    }

    /// Drops everything that is no longer needed at the given program point: expression values
    /// that are dead, store clusters that can't be reached and the taint of dead symbols.
    /// Returns the new state and the symbols that died, in id order.
    #[logfn_inputs(TRACE)]
    pub fn remove_dead_bindings(
        &self,
        state: &ProgramState,
        frame: Option<Rc<StackFrameContext>>,
        stmt: Option<StmtId>,
        liveness: &dyn LiveVariables,
    ) -> (ProgramState, Vec<SymbolId>) {
        let mut reaper = SymbolReaper::new(
            frame,
            stmt,
            &self.builder.regions,
            &self.builder.symbols,
            liveness,
        );
        let environment = state.environment.remove_dead_bindings(&mut reaper, state);
        if reaper.is_incomplete() {
            warn!("not everything live could be visited, nothing is reaped");
            return (state.clone(), vec![]);
        }
        let store = self
            .store_manager
            .remove_dead_bindings(&state.store, &mut reaper);
        reaper.set_reaped_store(store.clone(), self.store_manager.clone());
        // Region values that are still readable through the reaped store are not dead.
        for symbol in reaper.dead_symbols() {
            if reaper.is_live(symbol) {
                trace!("{:?} survives through the reaped store", symbol);
            }
        }
        let dead = reaper.dead_symbols();
        if !dead.is_empty() {
            debug!("dead symbols {:?}", dead);
        }
        let result = ProgramState {
            environment,
            store,
            taint: state.taint.clone(),
        }
        .remove_taint(&dead);
        (result, dead)
    }
}
