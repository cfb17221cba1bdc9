// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Binding and reading values through the region store.

use std::rc::Rc;
use symex::ast::{ExprId, FieldDecl, FunctionDecl, RecordDecl, StorageClass, VarDecl};
use symex::location_context::StackFrameContext;
use symex::memory_region::array_index;
use symex::program_state::ProgramStateManager;
use symex::store::{BindingKey, BindingKind};
use symex::svals::{Loc, SVal};
use symex::symbol::SymbolKind;
use symex::types::{QualType, TypeKind};

fn i32_type() -> QualType {
    TypeKind::I32.into()
}

fn decl(id: u32, name: &str, ty: QualType, storage: StorageClass) -> Rc<VarDecl> {
    Rc::new(VarDecl {
        id,
        name: Rc::from(name),
        ty,
        storage,
    })
}

fn root_frame(manager: &mut ProgramStateManager) -> Rc<StackFrameContext> {
    let main = Rc::new(FunctionDecl {
        id: 100,
        name: Rc::from("main"),
        is_weak: false,
    });
    manager.builder.frames.get_root_frame(main)
}

fn address(
    manager: &mut ProgramStateManager,
    decl: &Rc<VarDecl>,
    frame: Option<&Rc<StackFrameContext>>,
) -> SVal {
    let store_manager = manager.store_manager();
    store_manager.get_lvalue_var(&mut manager.builder, decl, frame)
}

fn record_with_fields() -> (Rc<RecordDecl>, Rc<FieldDecl>, Rc<FieldDecl>) {
    let record = Rc::new(RecordDecl {
        id: 1,
        name: Rc::from("S"),
        ty: QualType::record("S", false, Some(8)),
    });
    let a = Rc::new(FieldDecl {
        id: 2,
        name: Rc::from("a"),
        index: 0,
        ty: i32_type(),
        parent: record.clone(),
    });
    let b = Rc::new(FieldDecl {
        id: 3,
        name: Rc::from("b"),
        index: 1,
        ty: i32_type(),
        parent: record.clone(),
    });
    (record, a, b)
}

#[test]
fn bind_then_read() {
    let mut manager = ProgramStateManager::new();
    let state = manager.get_initial_state();
    let g = decl(
        1,
        "g",
        i32_type(),
        StorageClass::Global {
            in_system_header: false,
        },
    );
    let loc = address(&mut manager, &g, None);
    let five = manager.builder.make_int_val(5, &i32_type());
    let state = manager.bind_loc(&state, &loc, five.clone());
    assert_eq!(manager.get_sval(&state, &loc, None), five);
    assert_eq!(state.store.len(), 1);

    let seven = manager.builder.make_int_val(7, &i32_type());
    let state = manager.bind_loc(&state, &loc, seven.clone());
    assert_eq!(manager.get_sval(&state, &loc, None), seven);
    assert_eq!(state.store.len(), 1);

    let state = manager.kill_binding(&state, &Loc::MemRegion(loc.as_region().unwrap()));
    assert!(state.store.is_empty());

    // Writes to concrete addresses are dropped.
    let null = manager.builder.make_null();
    let unchanged = manager.bind_loc(&state, &null, five);
    assert_eq!(unchanged, state);
}

#[test]
fn unbound_variables() {
    let mut manager = ProgramStateManager::new();
    let state = manager.get_initial_state();
    let frame = root_frame(&mut manager);
    let local = decl(1, "l", i32_type(), StorageClass::Local);
    let param = decl(2, "p", i32_type(), StorageClass::Parameter { index: 0 });
    let global = decl(
        3,
        "g",
        i32_type(),
        StorageClass::Global {
            in_system_header: false,
        },
    );
    let static_local = decl(4, "s", i32_type(), StorageClass::StaticLocal);

    let loc = address(&mut manager, &local, Some(&frame));
    assert!(manager.get_sval(&state, &loc, None).is_undef());

    let loc = address(&mut manager, &param, Some(&frame));
    let val = manager.get_sval(&state, &loc, None);
    let symbol = val.as_symbolic_expression().unwrap();
    assert!(matches!(
        manager.builder.symbols.kind(symbol),
        SymbolKind::RegionValue { region } if Some(*region) == loc.as_region()
    ));

    let loc = address(&mut manager, &global, None);
    let val = manager.get_sval(&state, &loc, None);
    assert!(val.as_symbolic_expression().is_some());
    // Reading twice yields the same symbol.
    assert_eq!(manager.get_sval(&state, &loc, None), val);

    let loc = address(&mut manager, &static_local, Some(&frame));
    assert_eq!(
        manager.get_sval(&state, &loc, None),
        manager.builder.make_int_val(0, &i32_type())
    );
}

#[test]
fn default_bindings_fill_records() {
    let mut manager = ProgramStateManager::new();
    let state = manager.get_initial_state();
    let frame = root_frame(&mut manager);
    let (record, a, b) = record_with_fields();
    let s = decl(4, "s", record.ty.clone(), StorageClass::Local);
    let s_loc = address(&mut manager, &s, Some(&frame));
    let s_region = s_loc.as_region().unwrap();
    let store_manager = manager.store_manager();
    let a_loc = store_manager.get_lvalue_field(&mut manager.builder, &a, &s_loc);
    let b_loc = store_manager.get_lvalue_field(&mut manager.builder, &b, &s_loc);

    // Locals start out undefined.
    assert!(manager.get_sval(&state, &a_loc, None).is_undef());

    let zero = manager.builder.make_int_val(0, &i32_type());
    let zeroed = manager.bind_default(&state, s_region, zero.clone());
    assert_eq!(manager.get_sval(&zeroed, &a_loc, None), zero);

    let one = manager.builder.make_int_val(1, &i32_type());
    let with_a = manager.bind_loc(&zeroed, &a_loc, one.clone());
    assert_eq!(manager.get_sval(&with_a, &a_loc, None), one);
    assert_eq!(manager.get_sval(&with_a, &b_loc, None), zero);
    assert_eq!(with_a.store.len(), 2);

    // A default binding replaces everything bound inside the region.
    let contents = manager.builder.conjure_symbol_val(
        None,
        Some(ExprId(1)),
        Some(&frame),
        &record.ty,
        0,
    );
    let replaced = manager.bind_default(&with_a, s_region, contents.clone());
    assert_eq!(replaced.store.len(), 1);
    let bindings = manager.store_manager().bindings(&replaced.store);
    assert_eq!(bindings[0].1, BindingKey::make_default(s_region));
    assert_eq!(bindings[0].1.kind, BindingKind::Default);

    // Fields of a symbolic record are derived from it.
    let read = manager.get_sval(&replaced, &b_loc, None);
    let parent = contents.as_symbolic_expression().unwrap();
    assert!(matches!(
        manager.builder.symbols.kind(read.as_symbolic_expression().unwrap()),
        SymbolKind::Derived { parent: p, region } if *p == parent && Some(*region) == b_loc.as_region()
    ));

    // Binding a whole record directly also goes through the default binding.
    let whole = manager.bind_loc(&with_a, &s_loc, contents.clone());
    assert_eq!(whole.store.len(), 1);
    assert_eq!(manager.get_sval(&whole, &s_loc, None), contents);
}

#[test]
fn string_literals_are_readable() {
    let mut manager = ProgramStateManager::new();
    let state = manager.get_initial_state();
    let region = manager
        .builder
        .regions
        .get_string_region(ExprId(1), &Rc::from("hi"));
    let base = manager.builder.make_loc(region);
    let store_manager = manager.store_manager();
    let one = manager.builder.make_int_val(1, &i32_type());
    let element =
        store_manager.get_lvalue_element(&mut manager.builder, &QualType::char(), &one, &base);
    assert_eq!(
        manager.get_sval(&state, &element, None),
        manager.builder.make_int_val(105, &QualType::char())
    );
    let two = manager.builder.make_int_val(2, &i32_type());
    let terminator =
        store_manager.get_lvalue_element(&mut manager.builder, &QualType::char(), &two, &base);
    assert_eq!(
        manager.get_sval(&state, &terminator, None),
        manager.builder.make_int_val(0, &QualType::char())
    );
}

#[test]
fn element_offsets_accumulate() {
    let mut manager = ProgramStateManager::new();
    let buf = decl(
        1,
        "buf",
        QualType::array_of(i32_type(), Some(8)),
        StorageClass::Global {
            in_system_header: false,
        },
    );
    let base = address(&mut manager, &buf, None);
    let store_manager = manager.store_manager();
    let two = manager.builder.make_int_val(2, &i32_type());
    let three = manager.builder.make_int_val(3, &i32_type());
    let e2 = store_manager.get_lvalue_element(&mut manager.builder, &i32_type(), &two, &base);
    let e5 = store_manager.get_lvalue_element(&mut manager.builder, &i32_type(), &three, &e2);
    let expected = manager.builder.regions.get_element_region(
        &i32_type(),
        array_index(5),
        base.as_region().unwrap(),
    );
    assert_eq!(e5, manager.builder.make_loc(expected));
}

#[test]
fn stores_through_symbolic_pointers() {
    let mut manager = ProgramStateManager::new();
    let state = manager.get_initial_state();
    let p = manager.builder.conjure_symbol_val(
        None,
        Some(ExprId(1)),
        None,
        &QualType::pointer_to(i32_type()),
        0,
    );
    assert!(manager.get_sval(&state, &p, None).is_non_loc());
    let three = manager.builder.make_int_val(3, &i32_type());
    let state = manager.bind_loc(&state, &p, three.clone());
    assert_eq!(manager.get_sval(&state, &p, None), three);
    assert_eq!(state.store.cluster_bases(), vec![p.as_region().unwrap()]);
}
