// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Canonicalization of regions and symbols, and the queries on them.

use std::rc::Rc;
use symex::ast::{FieldDecl, FunctionDecl, RecordDecl, StorageClass, VarDecl};
use symex::ast::{BinaryOp, ExprId};
use symex::concrete_int::ConcreteInt;
use symex::location_context::LocationContextManager;
use symex::memory_region::{array_index, MemRegionManager, RegionKind};
use symex::symbol::{SymbolKind, SymbolManager};
use symex::types::{QualType, TypeKind};

fn var(id: u32, name: &str, ty: QualType, storage: StorageClass) -> Rc<VarDecl> {
    Rc::new(VarDecl {
        id,
        name: Rc::from(name),
        ty,
        storage,
    })
}

fn function(id: u32, name: &str) -> Rc<FunctionDecl> {
    Rc::new(FunctionDecl {
        id,
        name: Rc::from(name),
        is_weak: false,
    })
}

fn i32_type() -> QualType {
    TypeKind::I32.into()
}

#[test]
fn var_regions_are_canonical() {
    let mut frames = LocationContextManager::new();
    let mut regions = MemRegionManager::new();
    let main = frames.get_root_frame(function(1, "main"));
    let x = var(2, "x", i32_type(), StorageClass::Local);
    let r1 = regions.get_var_region(&x, Some(&main));
    let count = regions.len();
    let r2 = regions.get_var_region(&x, Some(&main));
    assert_eq!(r1, r2);
    assert_eq!(regions.len(), count);

    // The same frame requested again is the same frame, so the region is the same too.
    let main_again = frames.get_root_frame(function(1, "main"));
    assert_eq!(main.id, main_again.id);
    assert_eq!(regions.get_var_region(&x, Some(&main_again)), r1);
}

#[test]
fn var_regions_live_in_the_right_space() {
    let mut frames = LocationContextManager::new();
    let mut regions = MemRegionManager::new();
    let f = function(1, "f");
    let frame = frames.get_root_frame(f.clone());

    let local = var(2, "l", i32_type(), StorageClass::Local);
    let param = var(3, "p", i32_type(), StorageClass::Parameter { index: 0 });
    let global = var(
        4,
        "g",
        i32_type(),
        StorageClass::Global {
            in_system_header: false,
        },
    );
    let constant = var(
        5,
        "c",
        i32_type().with_const(),
        StorageClass::Global {
            in_system_header: false,
        },
    );
    let errno = var(
        6,
        "errno",
        i32_type(),
        StorageClass::Global {
            in_system_header: true,
        },
    );
    let system = var(
        7,
        "environ",
        i32_type(),
        StorageClass::Global {
            in_system_header: true,
        },
    );
    let static_local = var(8, "s", i32_type(), StorageClass::StaticLocal);

    let r = regions.get_var_region(&local, Some(&frame));
    let space = regions.memory_space(r);
    assert!(matches!(regions.kind(space), RegionKind::StackLocalsSpace { frame: sf } if sf.id == frame.id));
    assert!(regions.has_stack_non_parameters_storage(r));

    let r = regions.get_var_region(&param, Some(&frame));
    assert!(matches!(
        regions.kind(regions.memory_space(r)),
        RegionKind::StackArgumentsSpace { .. }
    ));
    assert!(regions.has_stack_parameters_storage(r));
    assert!(regions.has_globals_or_parameters_storage(r));

    let r = regions.get_var_region(&global, None);
    assert_eq!(regions.memory_space(r), regions.get_global_internal_space());

    let r = regions.get_var_region(&constant, None);
    assert_eq!(regions.memory_space(r), regions.get_global_immutable_space());

    let r = regions.get_var_region(&errno, None);
    assert_eq!(regions.memory_space(r), regions.get_global_system_space());

    let r = regions.get_var_region(&system, None);
    assert_eq!(regions.memory_space(r), regions.get_global_immutable_space());

    let r = regions.get_var_region(&static_local, Some(&frame));
    let code = regions.get_function_code_region(&f);
    assert_eq!(regions.memory_space(r), regions.get_static_global_space(code));
    assert!(regions.stack_frame(r).is_none());

    // Without a frame a local has unknown storage.
    let r = regions.get_var_region(&local, None);
    assert_eq!(regions.memory_space(r), regions.get_unknown_space());
}

#[test]
fn element_regions_ignore_qualifiers() {
    let mut regions = MemRegionManager::new();
    let buf = var(
        1,
        "buf",
        QualType::array_of(QualType::char(), Some(8)),
        StorageClass::Global {
            in_system_header: false,
        },
    );
    let base = regions.get_var_region(&buf, None);
    let e1 = regions.get_element_region(&QualType::char(), array_index(2), base);
    let e2 = regions.get_element_region(&QualType::char().with_const(), array_index(2), base);
    let e3 = regions.get_element_region(&QualType::char(), array_index(3), base);
    assert_eq!(e1, e2);
    assert_ne!(e1, e3);
    assert_eq!(regions.value_type(e2), Some(QualType::char()));
}

#[test]
fn base_regions_and_offsets() {
    let mut regions = MemRegionManager::new();
    let record = Rc::new(RecordDecl {
        id: 1,
        name: Rc::from("S"),
        ty: QualType::record("S", false, Some(8)),
    });
    let field = Rc::new(FieldDecl {
        id: 2,
        name: Rc::from("f"),
        index: 0,
        ty: i32_type(),
        parent: record.clone(),
    });
    let s = var(
        3,
        "s",
        QualType::array_of(record.ty.clone(), Some(4)),
        StorageClass::Global {
            in_system_header: false,
        },
    );
    let base = regions.get_var_region(&s, None);
    let element = regions.get_element_region(&record.ty, array_index(1), base);
    let f = regions.get_field_region(&field, element);
    assert_eq!(regions.base_region(f), base);
    assert!(regions.is_subregion_of(f, base));
    assert!(!regions.is_subregion_of(base, f));
    assert_eq!(regions.region_chain(f).len(), 4);

    let bytes = regions.get_element_region(&QualType::char(), array_index(3), base);
    let ints = regions.get_element_region(&i32_type(), array_index(2), bytes);
    assert_eq!(regions.as_array_offset(ints), Some((base, 11)));

    // Offsets that do not fit are not known.
    let big = QualType::record("Big", false, Some(u64::MAX));
    let far = regions.get_element_region(&big, array_index(i64::MAX), base);
    let farther = regions.get_element_region(&big, array_index(i64::MAX), far);
    assert!(regions.as_array_offset(far).is_some());
    assert_eq!(regions.as_array_offset(farther), None);

    // A zero index is just a typed view.
    let view = regions.get_element_region(&i32_type(), array_index(0), base);
    assert_eq!(regions.strip_casts(view, true), base);
    assert_eq!(regions.strip_casts(ints, true), ints);
}

#[test]
fn symbolic_regions_depend_on_the_space() {
    let mut regions = MemRegionManager::new();
    let mut symbols = SymbolManager::new();
    let ptr = QualType::pointer_to(i32_type());
    let s = symbols.conjure_symbol(Some(ExprId(1)), None, &ptr, 0, None);
    let r1 = regions.get_symbolic_region(s);
    let r2 = regions.get_symbolic_heap_region(s);
    assert_ne!(r1, r2);
    assert_eq!(regions.memory_space(r1), regions.get_unknown_space());
    assert_eq!(regions.memory_space(r2), regions.get_heap_space());
    assert_eq!(regions.symbol_of(r1), Some(s));
    assert_eq!(regions.get_symbolic_region(s), r1);
}

#[test]
fn symbols_are_canonical() {
    let mut regions = MemRegionManager::new();
    let mut symbols = SymbolManager::new();
    let x = var(
        1,
        "x",
        i32_type(),
        StorageClass::Global {
            in_system_header: false,
        },
    );
    let r = regions.get_var_region(&x, None);
    let a = symbols.get_region_value_symbol(r);
    assert_eq!(symbols.get_region_value_symbol(r), a);

    let c1 = symbols.conjure_symbol(Some(ExprId(7)), None, &i32_type(), 0, None);
    let c2 = symbols.conjure_symbol(Some(ExprId(7)), None, &i32_type(), 0, None);
    let c3 = symbols.conjure_symbol(Some(ExprId(7)), None, &i32_type(), 1, None);
    let c4 = symbols.conjure_symbol(Some(ExprId(7)), None, &i32_type(), 0, Some("tag"));
    assert_eq!(c1, c2);
    assert_ne!(c1, c3);
    assert_ne!(c1, c4);

    let one = ConcreteInt::from_i128(1, &i32_type());
    let e1 = symbols.get_sym_int_expr(a, BinaryOp::Add, one, &i32_type());
    let e2 = symbols.get_sym_int_expr(a, BinaryOp::Add, one, &i32_type());
    let e3 = symbols.get_sym_int_expr(a, BinaryOp::Sub, one, &i32_type());
    assert_eq!(e1, e2);
    assert_ne!(e1, e3);
    assert!(matches!(symbols.kind(e1), SymbolKind::SymInt { lhs, .. } if *lhs == a));
    assert_eq!(symbols.symbol_type(a, &regions), i32_type());
    assert_eq!(symbols.origin_region(a), Some(r));
}

#[test]
fn complexity_counts_leaf_symbols() {
    let mut symbols = SymbolManager::new();
    let ty = i32_type();
    let a = symbols.conjure_symbol(Some(ExprId(1)), None, &ty, 0, None);
    let b = symbols.conjure_symbol(Some(ExprId(2)), None, &ty, 0, None);
    let c = symbols.conjure_symbol(Some(ExprId(3)), None, &ty, 0, None);
    assert_eq!(symbols.complexity(a), 1);

    let two = ConcreteInt::from_i128(2, &ty);
    let a_plus_2 = symbols.get_sym_int_expr(a, BinaryOp::Add, two, &ty);
    assert_eq!(symbols.complexity(a_plus_2), 1);

    let ab = symbols.get_sym_sym_expr(a, BinaryOp::Add, b, &ty);
    let ac = symbols.get_sym_sym_expr(a, BinaryOp::Add, c, &ty);
    let product = symbols.get_sym_sym_expr(ab, BinaryOp::Mul, ac, &ty);
    assert_eq!(symbols.complexity(ab), 2);
    assert_eq!(symbols.complexity(product), 4);

    let cast = symbols.get_cast_symbol(product, &ty, &QualType::char());
    assert_eq!(symbols.complexity(cast), 4);

    let walked: Vec<_> = symbols.symbol_iter(product).collect();
    assert_eq!(walked, vec![product, ab, a, b, ac, a, c]);
}

#[test]
fn what_can_be_symbolic() {
    assert!(SymbolManager::can_symbolicate(&i32_type()));
    assert!(SymbolManager::can_symbolicate(&QualType::pointer_to(
        QualType::void()
    )));
    assert!(SymbolManager::can_symbolicate(&TypeKind::Enum {
        name: Rc::from("E")
    }
    .into()));
    assert!(SymbolManager::can_symbolicate(&QualType::record(
        "S",
        false,
        Some(4)
    )));
    assert!(!SymbolManager::can_symbolicate(&QualType::record(
        "U",
        true,
        Some(4)
    )));
    assert!(!SymbolManager::can_symbolicate(&TypeKind::F64.into()));
    assert!(!SymbolManager::can_symbolicate(&QualType::array_of(
        QualType::char(),
        Some(4)
    )));
}

#[test]
fn dependencies_are_recorded_once() {
    let mut symbols = SymbolManager::new();
    let ty = i32_type();
    let a = symbols.conjure_symbol(Some(ExprId(1)), None, &ty, 0, None);
    let b = symbols.conjure_symbol(Some(ExprId(2)), None, &ty, 0, None);
    let c = symbols.conjure_symbol(Some(ExprId(3)), None, &ty, 0, None);
    symbols.add_symbol_dependency(a, b);
    symbols.add_symbol_dependency(a, c);
    symbols.add_symbol_dependency(a, b);
    assert_eq!(symbols.dependent_symbols(a), vec![b, c]);
    assert!(symbols.dependent_symbols(b).is_empty());
}

#[test]
fn frames_know_their_parents() {
    let mut frames = LocationContextManager::new();
    let main = frames.get_root_frame(function(1, "main"));
    let callee = frames.get_stack_frame(function(2, "f"), Some(main.clone()), Some(ExprId(10)), 0);
    let again = frames.get_stack_frame(function(2, "f"), Some(main.clone()), Some(ExprId(10)), 1);
    assert_ne!(callee.id, again.id);
    assert!(main.is_parent_of(&callee));
    assert!(!callee.is_parent_of(&main));
    assert!(!callee.is_parent_of(&callee));
    assert_eq!(callee.depth(), 1);
}
