// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Liveness of symbols and regions, and the removal of dead bindings from program states.

use std::rc::Rc;
use symex::ast::{
    BinaryOp, ExprId, FieldDecl, FunctionDecl, RecordDecl, StmtId, StorageClass, VarDecl,
};
use symex::k_limits;
use symex::location_context::{LocationContextManager, StackFrameContext};
use symex::memory_region::{array_index, MemRegionManager};
use symex::program_state::{ProgramStateManager, SymbolVisitor};
use symex::svals::{NonLoc, SVal};
use symex::symbol::{SymbolId, SymbolManager};
use symex::symbol_reaper::{ExplicitLiveness, SymbolReaper};
use symex::types::{QualType, TypeKind};

const STMT: StmtId = StmtId(1);

fn i32_type() -> QualType {
    TypeKind::I32.into()
}

fn function(id: u32, name: &str) -> Rc<FunctionDecl> {
    Rc::new(FunctionDecl {
        id,
        name: Rc::from(name),
        is_weak: false,
    })
}

fn var(id: u32, name: &str, storage: StorageClass) -> Rc<VarDecl> {
    Rc::new(VarDecl {
        id,
        name: Rc::from(name),
        ty: i32_type(),
        storage,
    })
}

fn global(id: u32, name: &str) -> Rc<VarDecl> {
    var(
        id,
        name,
        StorageClass::Global {
            in_system_header: false,
        },
    )
}

/// A main frame and a callee frame inlined into it.
fn frames() -> (Rc<StackFrameContext>, Rc<StackFrameContext>) {
    let mut frames = LocationContextManager::new();
    let main = frames.get_root_frame(function(100, "main"));
    let callee = frames.get_stack_frame(function(101, "callee"), Some(main.clone()), Some(ExprId(50)), 0);
    (main, callee)
}

fn conjure(symbols: &mut SymbolManager, id: u32) -> SymbolId {
    symbols.conjure_symbol(Some(ExprId(id)), None, &i32_type(), 0, None)
}

#[test]
fn marking_and_dead_symbols() {
    let mut symbols = SymbolManager::new();
    let regions = MemRegionManager::new();
    let liveness = ExplicitLiveness::new();
    let a = conjure(&mut symbols, 1);
    let b = conjure(&mut symbols, 2);
    let mut reaper = SymbolReaper::new(None, None, &regions, &symbols, &liveness);

    assert!(!reaper.is_live(a));
    assert!(reaper.maybe_dead(a));
    assert!(reaper.maybe_dead(b));
    assert!(reaper.is_dead(a));
    assert_eq!(reaper.dead_symbols(), vec![a, b]);

    reaper.mark_live(a);
    assert!(reaper.is_live(a));
    assert!(!reaper.is_dead(a));
    assert!(!reaper.maybe_dead(a));
    assert_eq!(reaper.dead_symbols(), vec![b]);
    assert!(reaper.has_dead_symbols());
}

#[test]
fn composite_symbols_follow_their_operands() {
    let mut symbols = SymbolManager::new();
    let mut regions = MemRegionManager::new();
    let liveness = ExplicitLiveness::new();
    let a = conjure(&mut symbols, 1);
    let b = conjure(&mut symbols, 2);
    let sum = symbols.get_sym_sym_expr(a, BinaryOp::Add, b, &i32_type());
    let cast = symbols.get_cast_symbol(a, &i32_type(), &QualType::char());
    let region = regions.get_symbolic_region(b);
    let derived = symbols.get_derived_symbol(b, region);
    let extent = symbols.get_extent_symbol(region);

    let mut reaper = SymbolReaper::new(None, None, &regions, &symbols, &liveness);
    reaper.mark_live(a);
    assert!(reaper.is_live(cast));
    assert!(!reaper.is_live(sum));
    assert!(!reaper.is_live(derived));
    assert!(!reaper.is_live(extent));
    assert!(!reaper.is_live_region(region));

    reaper.mark_live(b);
    assert!(reaper.is_live(sum));
    assert!(reaper.is_live(derived));
    assert!(reaper.is_live(extent));
    assert!(reaper.is_live_region(region));
}

#[test]
fn metadata_needs_a_claim_in_every_pass() {
    let mut symbols = SymbolManager::new();
    let mut regions = MemRegionManager::new();
    let liveness = ExplicitLiveness::new();
    let g = regions.get_var_region(&global(1, "g"), None);
    let length = symbols.get_metadata_symbol(g, None, &QualType::size_type(), None, 0, Some("len"));
    let other = conjure(&mut symbols, 2);

    let mut reaper = SymbolReaper::new(None, None, &regions, &symbols, &liveness);
    reaper.mark_in_use(length);
    reaper.mark_in_use(other);
    assert!(reaper.is_live(length));
    assert!(!reaper.is_live(other));
    // The claim is used up, but the symbol stays live for the rest of the pass.
    assert!(reaper.is_live(length));
    assert!(!reaper.maybe_dead(length));
    assert!(!reaper.is_dead(length));

    let mut next_pass = SymbolReaper::new(None, None, &regions, &symbols, &liveness);
    assert!(!next_pass.is_live(length));
}

#[test]
fn dependents_are_kept_alive() {
    let mut symbols = SymbolManager::new();
    let regions = MemRegionManager::new();
    let liveness = ExplicitLiveness::new();
    let a = conjure(&mut symbols, 1);
    let b = conjure(&mut symbols, 2);
    let c = conjure(&mut symbols, 3);
    let d = conjure(&mut symbols, 4);
    symbols.add_symbol_dependency(a, b);
    symbols.add_symbol_dependency(b, a);
    symbols.add_symbol_dependency(b, c);

    let mut reaper = SymbolReaper::new(None, None, &regions, &symbols, &liveness);
    assert!(reaper.maybe_dead(c));
    reaper.mark_live(a);
    assert!(reaper.is_live(b));
    assert!(reaper.is_live(c));
    assert!(!reaper.is_dead(c));
    assert!(!reaper.is_live(d));
}

#[test]
fn variable_liveness_depends_on_the_frame() {
    let (main, callee) = frames();
    let mut regions = MemRegionManager::new();
    let symbols = SymbolManager::new();
    let caller_local = var(1, "a", StorageClass::Local);
    let callee_local = var(2, "b", StorageClass::Local);
    let callee_param = var(3, "p", StorageClass::Parameter { index: 0 });
    let a = regions.get_var_region(&caller_local, Some(&main));
    let b = regions.get_var_region(&callee_local, Some(&callee));
    let p = regions.get_var_region(&callee_param, Some(&callee));
    let g = regions.get_var_region(&global(4, "g"), None);
    let b_element = regions.get_element_region(&i32_type(), array_index(1), b);
    let mut liveness = ExplicitLiveness::new();
    liveness.add_live_var(&callee, STMT, &callee_param);

    let mut in_callee = SymbolReaper::new(Some(callee.clone()), Some(STMT), &regions, &symbols, &liveness);
    assert!(in_callee.is_live_var_region(a, false));
    assert!(!in_callee.is_live_var_region(b, false));
    assert!(in_callee.is_live_var_region(p, false));
    assert!(in_callee.is_live_var_region(g, false));
    assert!(!in_callee.is_live_var_region(b_element, false));

    let mut in_main = SymbolReaper::new(Some(main.clone()), Some(STMT), &regions, &symbols, &liveness);
    assert!(!in_main.is_live_var_region(b, false));
    assert!(!in_main.is_live_var_region(a, false));

    let mut anywhere_in_callee = SymbolReaper::new(Some(callee), None, &regions, &symbols, &liveness);
    assert!(anywhere_in_callee.is_live_var_region(b, false));

    let mut without_frame = SymbolReaper::new(None, None, &regions, &symbols, &liveness);
    assert!(!without_frame.is_live_var_region(a, false));
    assert!(without_frame.is_live_var_region(g, false));
}

#[test]
fn region_values_live_with_their_region() {
    let (main, _) = frames();
    let mut regions = MemRegionManager::new();
    let mut symbols = SymbolManager::new();
    let live_local = var(1, "x", StorageClass::Local);
    let dead_local = var(2, "y", StorageClass::Local);
    let x = regions.get_var_region(&live_local, Some(&main));
    let y = regions.get_var_region(&dead_local, Some(&main));
    let x_value = symbols.get_region_value_symbol(x);
    let y_value = symbols.get_region_value_symbol(y);
    let mut liveness = ExplicitLiveness::new();
    liveness.add_live_var(&main, STMT, &live_local);

    let mut reaper = SymbolReaper::new(Some(main), Some(STMT), &regions, &symbols, &liveness);
    assert!(reaper.is_live(x_value));
    assert!(!reaper.is_live(y_value));
    reaper.mark_live_region(y);
    assert!(reaper.is_live(y_value));
    assert_eq!(reaper.region_roots(), vec![y]);
}

#[test]
fn element_indices_are_live_with_the_region() {
    let mut regions = MemRegionManager::new();
    let mut symbols = SymbolManager::new();
    let liveness = ExplicitLiveness::new();
    let buf = regions.get_var_region(&global(1, "buf"), None);
    let i = conjure(&mut symbols, 2);
    let element = regions.get_element_region(&i32_type(), NonLoc::Symbol(i), buf);

    let mut reaper = SymbolReaper::new(None, None, &regions, &symbols, &liveness);
    reaper.mark_live_region(element);
    assert!(reaper.is_live(i));
    assert_eq!(reaper.region_roots(), vec![buf]);
}

#[test]
fn expression_liveness() {
    let (main, callee) = frames();
    let regions = MemRegionManager::new();
    let symbols = SymbolManager::new();
    let mut liveness = ExplicitLiveness::new();
    liveness.add_live_expr(&main, STMT, ExprId(7));

    let in_main = SymbolReaper::new(Some(main.clone()), Some(STMT), &regions, &symbols, &liveness);
    assert!(in_main.is_live_expr(ExprId(7), &main));
    assert!(!in_main.is_live_expr(ExprId(8), &main));
    // The callee has returned.
    assert!(!in_main.is_live_expr(ExprId(9), &callee));

    let in_callee = SymbolReaper::new(Some(callee.clone()), Some(STMT), &regions, &symbols, &liveness);
    assert!(in_callee.is_live_expr(ExprId(8), &main));

    let anywhere = SymbolReaper::new(Some(main.clone()), None, &regions, &symbols, &liveness);
    assert!(anywhere.is_live_expr(ExprId(8), &main));
}

#[test]
fn dead_locals_are_removed() {
    let mut manager = ProgramStateManager::new();
    let main = manager.builder.frames.get_root_frame(function(100, "main"));
    let x = var(1, "x", StorageClass::Local);
    let g = global(2, "g");
    let store_manager = manager.store_manager();
    let x_loc = store_manager.get_lvalue_var(&mut manager.builder, &x, Some(&main));
    let g_loc = store_manager.get_lvalue_var(&mut manager.builder, &g, None);
    let in_x = manager
        .builder
        .conjure_symbol_val(None, Some(ExprId(1)), Some(&main), &i32_type(), 0);
    let in_g = manager
        .builder
        .conjure_symbol_val(None, Some(ExprId(2)), Some(&main), &i32_type(), 0);
    let state = manager.get_initial_state();
    let state = manager.bind_loc(&state, &x_loc, in_x.clone());
    let state = manager.bind_loc(&state, &g_loc, in_g.clone());
    let state = manager.add_taint(&state, &in_x);
    let state = manager.add_taint(&state, &in_g);

    let mut liveness = ExplicitLiveness::new();
    let (kept, dead) =
        manager.remove_dead_bindings(&state, Some(main.clone()), Some(STMT), &liveness);
    let in_x_symbol = in_x.as_symbolic_expression().unwrap();
    let in_g_symbol = in_g.as_symbolic_expression().unwrap();
    assert_eq!(dead, vec![in_x_symbol]);
    assert_eq!(kept.store.cluster_bases(), vec![g_loc.as_region().unwrap()]);
    assert_eq!(kept.tainted_symbols(), vec![in_g_symbol]);
    assert!(!manager.is_tainted(&kept, &in_x));
    assert!(manager.is_tainted(&kept, &in_g));

    liveness.add_live_var(&main, STMT, &x);
    let (kept, dead) = manager.remove_dead_bindings(&state, Some(main), Some(STMT), &liveness);
    assert!(dead.is_empty());
    assert_eq!(kept, state);
}

#[test]
fn reachability_through_pointers() {
    let mut manager = ProgramStateManager::new();
    let main = manager.builder.frames.get_root_frame(function(100, "main"));
    let x = Rc::new(VarDecl {
        id: 1,
        name: Rc::from("x"),
        ty: QualType::pointer_to(i32_type()),
        storage: StorageClass::Local,
    });
    let store_manager = manager.store_manager();
    let x_loc = store_manager.get_lvalue_var(&mut manager.builder, &x, Some(&main));
    let heap = manager.builder.get_conjured_heap_symbol_val(
        ExprId(1),
        Some(&main),
        &QualType::pointer_to(i32_type()),
        0,
    );
    let contents = manager
        .builder
        .conjure_symbol_val(None, Some(ExprId(2)), Some(&main), &i32_type(), 0);
    let state = manager.get_initial_state();
    let state = manager.bind_loc(&state, &x_loc, heap.clone());
    let state = manager.bind_loc(&state, &heap, contents.clone());
    let heap_symbol = manager
        .builder
        .regions
        .symbol_of(heap.as_region().unwrap())
        .unwrap();
    let contents_symbol = contents.as_symbolic_expression().unwrap();

    let mut liveness = ExplicitLiveness::new();
    liveness.add_live_var(&main, STMT, &x);
    let (kept, dead) =
        manager.remove_dead_bindings(&state, Some(main.clone()), Some(STMT), &liveness);
    assert!(dead.is_empty());
    assert_eq!(kept.store.len(), 2);

    let (reaped, dead) = manager.remove_dead_bindings(
        &state,
        Some(main),
        Some(STMT),
        &ExplicitLiveness::new(),
    );
    assert_eq!(dead, vec![heap_symbol, contents_symbol]);
    assert!(reaped.store.is_empty());
}

#[test]
fn pointers_into_symbolic_regions_keep_the_symbol_alive() {
    let mut manager = ProgramStateManager::new();
    let main = manager.builder.frames.get_root_frame(function(100, "main"));
    let record = Rc::new(RecordDecl {
        id: 1,
        name: Rc::from("S"),
        ty: QualType::record("S", false, Some(4)),
    });
    let field = Rc::new(FieldDecl {
        id: 2,
        name: Rc::from("f"),
        index: 0,
        ty: i32_type(),
        parent: record.clone(),
    });
    let pointer_type = QualType::pointer_to(record.ty.clone());
    let x = Rc::new(VarDecl {
        id: 3,
        name: Rc::from("x"),
        ty: pointer_type.clone(),
        storage: StorageClass::Local,
    });
    let g = Rc::new(VarDecl {
        id: 4,
        name: Rc::from("g"),
        ty: QualType::pointer_to(i32_type()),
        storage: StorageClass::Global {
            in_system_header: false,
        },
    });
    let store_manager = manager.store_manager();
    let x_loc = store_manager.get_lvalue_var(&mut manager.builder, &x, Some(&main));
    let g_loc = store_manager.get_lvalue_var(&mut manager.builder, &g, None);
    let pointer = manager
        .builder
        .conjure_symbol_val(None, Some(ExprId(1)), Some(&main), &pointer_type, 0);
    let pointee = pointer.as_region().unwrap();
    let pointer_symbol = manager.builder.regions.symbol_of(pointee).unwrap();
    let f = manager.builder.regions.get_field_region(&field, pointee);
    let f_loc = manager.builder.make_loc(f);
    let state = manager.get_initial_state();
    let state = manager.bind_loc(&state, &x_loc, pointer.clone());
    let state = manager.bind_loc(&state, &g_loc, f_loc);
    let state = manager.add_taint(&state, &pointer);

    let (kept, dead) = manager.remove_dead_bindings(
        &state,
        Some(main),
        Some(STMT),
        &ExplicitLiveness::new(),
    );
    assert!(dead.is_empty());
    assert_eq!(kept.store.cluster_bases(), vec![g_loc.as_region().unwrap()]);
    assert_eq!(kept.tainted_symbols(), vec![pointer_symbol]);
}

#[test]
fn reaping_gives_up_when_too_much_is_reachable() {
    let mut manager = ProgramStateManager::new();
    let main = manager.builder.frames.get_root_frame(function(100, "main"));
    let count = k_limits::MAX_SCAN_REGIONS + 1;
    let pointer_type = QualType::pointer_to(i32_type());
    let pointers = Rc::new(VarDecl {
        id: 1,
        name: Rc::from("pointers"),
        ty: QualType::array_of(pointer_type.clone(), Some(count as u64)),
        storage: StorageClass::Global {
            in_system_header: false,
        },
    });
    let targets = Rc::new(VarDecl {
        id: 2,
        name: Rc::from("targets"),
        ty: QualType::array_of(i32_type(), Some(count as u64)),
        storage: StorageClass::Global {
            in_system_header: false,
        },
    });
    let x = var(3, "x", StorageClass::Local);
    let store_manager = manager.store_manager();
    let pointers_loc = store_manager.get_lvalue_var(&mut manager.builder, &pointers, None);
    let targets_loc = store_manager.get_lvalue_var(&mut manager.builder, &targets, None);
    let x_loc = store_manager.get_lvalue_var(&mut manager.builder, &x, Some(&main));
    let pointers_region = pointers_loc.as_region().unwrap();
    let targets_region = targets_loc.as_region().unwrap();
    let mut state = manager.get_initial_state();
    for i in 0..count as i64 {
        let slot = manager
            .builder
            .regions
            .get_element_region(&pointer_type, array_index(i), pointers_region);
        let target = manager
            .builder
            .regions
            .get_element_region(&i32_type(), array_index(i), targets_region);
        let slot = manager.builder.make_loc(slot);
        let target = manager.builder.make_loc(target);
        state = manager.bind_loc(&state, &slot, target);
    }
    let in_x = manager
        .builder
        .conjure_symbol_val(None, Some(ExprId(2)), Some(&main), &i32_type(), 0);
    let state = manager.bind_loc(&state, &x_loc, in_x);
    let state = manager.bind_expr(&state, ExprId(5), &main, pointers_loc);
    let mut liveness = ExplicitLiveness::new();
    liveness.add_live_expr(&main, STMT, ExprId(5));

    let (kept, dead) = manager.remove_dead_bindings(&state, Some(main), Some(STMT), &liveness);
    assert!(dead.is_empty());
    assert_eq!(kept, state);
}

#[test]
fn region_values_survive_through_the_reaped_store() {
    let mut manager = ProgramStateManager::new();
    let main = manager.builder.frames.get_root_frame(function(100, "main"));
    let p = var(1, "p", StorageClass::Parameter { index: 0 });
    let g = Rc::new(VarDecl {
        id: 2,
        name: Rc::from("g"),
        ty: QualType::pointer_to(i32_type()),
        storage: StorageClass::Global {
            in_system_header: false,
        },
    });
    let store_manager = manager.store_manager();
    let p_loc = store_manager.get_lvalue_var(&mut manager.builder, &p, Some(&main));
    let g_loc = store_manager.get_lvalue_var(&mut manager.builder, &g, None);
    let state = manager.get_initial_state();
    let p_value = manager.get_sval(&state, &p_loc, None);
    let p_symbol = p_value.as_symbolic_expression().unwrap();
    let state = manager.bind_expr(&state, ExprId(5), &main, p_value.clone());
    let liveness = ExplicitLiveness::new();

    let (reaped, dead) =
        manager.remove_dead_bindings(&state, Some(main.clone()), Some(STMT), &liveness);
    assert_eq!(dead, vec![p_symbol]);
    assert!(reaped.environment.is_empty());

    // Once the address of p escapes into a global, its value can still be read.
    let escaped = manager.bind_loc(&state, &g_loc, p_loc);
    let (reaped, dead) = manager.remove_dead_bindings(&escaped, Some(main), Some(STMT), &liveness);
    assert!(dead.is_empty());
    assert!(reaped.environment.is_empty());
    assert_eq!(reaped.store.len(), 1);
}

#[test]
fn environment_bindings() {
    let mut manager = ProgramStateManager::new();
    let main = manager.builder.frames.get_root_frame(function(100, "main"));
    let value = manager
        .builder
        .conjure_symbol_val(None, Some(ExprId(1)), Some(&main), &i32_type(), 0);
    let state = manager.get_initial_state();
    assert!(manager.get_expr_sval(&state, ExprId(1), &main).is_unknown());

    let state = manager.bind_expr(&state, ExprId(1), &main, value.clone());
    assert_eq!(manager.get_expr_sval(&state, ExprId(1), &main), value);
    let cleared = manager.bind_expr(&state, ExprId(1), &main, SVal::Unknown);
    assert!(cleared.environment.is_empty());

    let mut liveness = ExplicitLiveness::new();
    liveness.add_live_expr(&main, STMT, ExprId(1));
    let (kept, dead) =
        manager.remove_dead_bindings(&state, Some(main.clone()), Some(STMT), &liveness);
    assert!(dead.is_empty());
    assert_eq!(kept.environment.len(), 1);

    let (reaped, dead) = manager.remove_dead_bindings(
        &state,
        Some(main),
        Some(STMT),
        &ExplicitLiveness::new(),
    );
    assert_eq!(dead, vec![value.as_symbolic_expression().unwrap()]);
    assert!(reaped.environment.is_empty());
}

#[derive(Default)]
struct Collector {
    symbols: Vec<SymbolId>,
    regions: usize,
    limit: Option<usize>,
}

impl SymbolVisitor for Collector {
    fn visit_symbol(&mut self, symbol: SymbolId) -> bool {
        self.symbols.push(symbol);
        self.limit.map_or(true, |limit| self.symbols.len() < limit)
    }

    fn visit_region(&mut self, _region: symex::memory_region::RegionId) -> bool {
        self.regions += 1;
        true
    }
}

#[test]
fn scan_reachable_symbols() {
    let mut manager = ProgramStateManager::new();
    let pointer = manager.builder.conjure_symbol_val(
        None,
        Some(ExprId(1)),
        None,
        &QualType::pointer_to(i32_type()),
        0,
    );
    let stored = manager
        .builder
        .conjure_symbol_val(None, Some(ExprId(2)), None, &i32_type(), 0);
    let index = manager
        .builder
        .symbols
        .conjure_symbol(Some(ExprId(3)), None, &QualType::array_index(), 0, None);
    let base = pointer.as_region().unwrap();
    let element = manager
        .builder
        .regions
        .get_element_region(&i32_type(), NonLoc::Symbol(index), base);
    let state = manager.get_initial_state();
    let state = manager.bind_loc(&state, &pointer, stored.clone());

    let mut collector = Collector::default();
    let val = manager.builder.make_loc(element);
    assert!(state.scan_reachable_symbols(
        &val,
        &manager.builder.regions,
        &manager.builder.symbols,
        &mut collector
    ));
    let mut found = collector.symbols.clone();
    found.sort();
    let pointer_symbol = manager.builder.regions.symbol_of(base).unwrap();
    assert_eq!(
        found,
        vec![pointer_symbol, stored.as_symbolic_expression().unwrap(), index]
    );
    assert_eq!(collector.regions, 2);

    let mut stopping = Collector {
        limit: Some(1),
        ..Collector::default()
    };
    assert!(!state.scan_reachable_symbols(
        &val,
        &manager.builder.regions,
        &manager.builder.symbols,
        &mut stopping
    ));
    assert_eq!(stopping.symbols.len(), 1);
}
