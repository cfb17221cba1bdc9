// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::{BinaryOp, BlockDecl, CastKind, Expr, ExprId, ExprKind, FunctionDecl};
use crate::concrete_int::ConcreteInt;
use crate::k_limits;
use crate::location_context::{LocationContextManager, StackFrameContext};
use crate::memory_region::{MemRegionManager, RegionId, RegionKind};
use crate::program_state::ProgramState;
use crate::store::StoreManager;
use crate::svals::{Loc, NonLoc, SVal};
use crate::symbol::{SymbolId, SymbolKind, SymbolManager};
use crate::types::{is_noop_cast, same_unqualified, QualType};

use log_derive::*;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// Builds abstract values. Canonical regions and symbols are obtained from the managers owned
/// by the builder. Operations that can't be modeled precisely produce SVal::Unknown.
pub struct SValBuilder {
    pub regions: MemRegionManager,
    pub symbols: SymbolManager,
    pub frames: LocationContextManager,
    store_manager: Rc<dyn StoreManager>,
    max_symbol_complexity: usize,
}

impl Debug for SValBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!(
            "SValBuilder({:?}, {:?})",
            self.regions, self.symbols
        ))
    }
}

impl SValBuilder {
    pub fn new(store_manager: Rc<dyn StoreManager>) -> SValBuilder {
        SValBuilder {
            regions: MemRegionManager::new(),
            symbols: SymbolManager::new(),
            frames: LocationContextManager::new(),
            store_manager,
            max_symbol_complexity: k_limits::MAX_SYMBOL_COMPLEXITY,
        }
    }

    pub fn store_manager(&self) -> Rc<dyn StoreManager> {
        self.store_manager.clone()
    }

    pub fn max_symbol_complexity(&self) -> usize {
        self.max_symbol_complexity
    }

    pub fn set_max_symbol_complexity(&mut self, max_symbol_complexity: usize) {
        self.max_symbol_complexity = max_symbol_complexity;
    }
}

/// Constructors for values that do not need a symbol.
impl SValBuilder {
    /// An integer of the given type. Integers of location type are concrete pointers.
    pub fn make_int_val(&self, value: i128, ty: &QualType) -> SVal {
        let val = ConcreteInt::from_i128(value, ty);
        if ty.is_loc_type() {
            SVal::Loc(Loc::ConcreteInt(val))
        } else {
            SVal::NonLoc(NonLoc::ConcreteInt(val))
        }
    }

    pub fn make_int_val_with_ptr_width(&self, value: i128, is_unsigned: bool) -> NonLoc {
        NonLoc::ConcreteInt(ConcreteInt::new(value, 64, is_unsigned))
    }

    pub fn make_truth_val(&self, b: bool, ty: &QualType) -> SVal {
        SVal::NonLoc(NonLoc::ConcreteInt(ConcreteInt::from_i128(
            i128::from(b),
            ty,
        )))
    }

    pub fn make_bool_val(&self, b: bool) -> SVal {
        self.make_truth_val(b, &QualType::bool())
    }

    pub fn make_null(&self) -> SVal {
        SVal::Loc(Loc::ConcreteInt(ConcreteInt::new(0, 64, true)))
    }

    pub fn make_loc(&self, region: RegionId) -> SVal {
        SVal::Loc(Loc::MemRegion(region))
    }

    pub fn make_label(&self, label: &Rc<str>) -> SVal {
        SVal::Loc(Loc::GotoLabel(label.clone()))
    }

    pub fn make_array_index(&self, index: i64) -> NonLoc {
        NonLoc::ConcreteInt(ConcreteInt::from_i128(
            i128::from(index),
            &QualType::array_index(),
        ))
    }

    pub fn make_zero_array_index(&self) -> NonLoc {
        self.make_array_index(0)
    }

    /// The value of a zero initialized object of the given type.
    pub fn make_zero_val(&self, ty: &QualType) -> SVal {
        if ty.is_loc_type() {
            return self.make_null();
        }
        if ty.is_integral_or_enumeration() {
            return self.make_int_val(0, ty);
        }
        SVal::Unknown
    }

    pub fn make_loc_as_integer(&self, loc: Loc, bits: u8) -> SVal {
        SVal::NonLoc(NonLoc::LocAsInteger { loc, bits })
    }

    /// Returns the value as a signed integer of the width used for array indices.
    pub fn convert_to_array_index(&mut self, val: &SVal) -> SVal {
        match val {
            SVal::Unknown | SVal::Undefined => val.clone(),
            SVal::NonLoc(NonLoc::ConcreteInt(i)) if i.width() == 64 && !i.is_unsigned() => {
                val.clone()
            }
            SVal::NonLoc(non_loc) => {
                let non_loc = non_loc.clone();
                self.eval_cast_from_non_loc(&non_loc, &QualType::array_index())
            }
            SVal::Loc(..) => SVal::Unknown,
        }
    }

    /// The known integer value of a non-location, if any.
    pub fn get_known_value(&self, val: &NonLoc) -> Option<ConcreteInt> {
        val.as_concrete_int().cloned()
    }
}

/// Constructors for symbolic values.
impl SValBuilder {
    pub fn make_sym_int(
        &mut self,
        lhs: SymbolId,
        op: BinaryOp,
        rhs: ConcreteInt,
        ty: &QualType,
    ) -> SVal {
        SVal::NonLoc(NonLoc::Symbol(
            self.symbols.get_sym_int_expr(lhs, op, rhs, ty),
        ))
    }

    pub fn make_int_sym(
        &mut self,
        lhs: ConcreteInt,
        op: BinaryOp,
        rhs: SymbolId,
        ty: &QualType,
    ) -> SVal {
        SVal::NonLoc(NonLoc::Symbol(
            self.symbols.get_int_sym_expr(lhs, op, rhs, ty),
        ))
    }

    pub fn make_sym_sym(
        &mut self,
        lhs: SymbolId,
        op: BinaryOp,
        rhs: SymbolId,
        ty: &QualType,
    ) -> SVal {
        SVal::NonLoc(NonLoc::Symbol(
            self.symbols.get_sym_sym_expr(lhs, op, rhs, ty),
        ))
    }

    pub fn make_cast_symbol(&mut self, operand: SymbolId, from: &QualType, to: &QualType) -> SVal {
        SVal::NonLoc(NonLoc::Symbol(self.symbols.get_cast_symbol(operand, from, to)))
    }

    /// Wraps a symbol of the given type in a value. Symbols of location type are pointers to
    /// the region they point to.
    fn make_symbol_val(&mut self, symbol: SymbolId, ty: &QualType) -> SVal {
        if ty.is_loc_type() {
            SVal::Loc(Loc::MemRegion(self.regions.get_symbolic_region(symbol)))
        } else {
            SVal::NonLoc(NonLoc::Symbol(symbol))
        }
    }

    /// The value the region had when the analysis first saw it.
    #[logfn_inputs(TRACE)]
    pub fn get_region_value_symbol_val(&mut self, region: RegionId) -> SVal {
        let ty = match self.regions.value_type(region) {
            Some(ty) => ty,
            None => return SVal::Unknown,
        };
        if ty.is_null_ptr_type() {
            return self.make_zero_val(&ty);
        }
        if !SymbolManager::can_symbolicate(&ty) {
            return SVal::Unknown;
        }
        let symbol = self.symbols.get_region_value_symbol(region);
        self.make_symbol_val(symbol, &ty)
    }

    /// A fresh value for the result of an expression that can't be modeled.
    #[logfn_inputs(TRACE)]
    pub fn conjure_symbol_val(
        &mut self,
        tag: Option<&str>,
        expr: Option<ExprId>,
        frame: Option<&Rc<StackFrameContext>>,
        ty: &QualType,
        count: u32,
    ) -> SVal {
        if ty.is_null_ptr_type() {
            return self.make_zero_val(ty);
        }
        if !SymbolManager::can_symbolicate(ty) {
            return SVal::Unknown;
        }
        let symbol = self.symbols.conjure_symbol(expr, frame, ty, count, tag);
        self.make_symbol_val(symbol, ty)
    }

    /// A fresh pointer to newly allocated heap memory.
    #[logfn_inputs(TRACE)]
    pub fn get_conjured_heap_symbol_val(
        &mut self,
        expr: ExprId,
        frame: Option<&Rc<StackFrameContext>>,
        ty: &QualType,
        count: u32,
    ) -> SVal {
        if ty.is_null_ptr_type() {
            return self.make_zero_val(ty);
        }
        if !ty.is_loc_type() {
            return SVal::Unknown;
        }
        let symbol = self.symbols.conjure_symbol(Some(expr), frame, ty, count, None);
        SVal::Loc(Loc::MemRegion(self.regions.get_symbolic_heap_region(symbol)))
    }

    #[logfn_inputs(TRACE)]
    pub fn get_metadata_symbol_val(
        &mut self,
        tag: Option<&str>,
        region: RegionId,
        expr: Option<ExprId>,
        ty: &QualType,
        frame: Option<&Rc<StackFrameContext>>,
        count: u32,
    ) -> SVal {
        if !SymbolManager::can_symbolicate(ty) {
            return SVal::Unknown;
        }
        let symbol = self
            .symbols
            .get_metadata_symbol(region, expr, ty, frame, count, tag);
        self.make_symbol_val(symbol, ty)
    }

    /// The value of a sub-region of memory whose contents are given by parent.
    #[logfn_inputs(TRACE)]
    pub fn get_derived_region_value_symbol_val(
        &mut self,
        parent: SymbolId,
        region: RegionId,
    ) -> SVal {
        let ty = match self.regions.value_type(region) {
            Some(ty) => ty,
            None => return SVal::Unknown,
        };
        if ty.is_null_ptr_type() {
            return self.make_zero_val(&ty);
        }
        if !SymbolManager::can_symbolicate(&ty) {
            return SVal::Unknown;
        }
        let symbol = self.symbols.get_derived_symbol(parent, region);
        self.make_symbol_val(symbol, &ty)
    }

    /// The extent of a region whose size is not known statically.
    #[logfn_inputs(TRACE)]
    pub fn get_extent_symbol_val(&mut self, region: RegionId) -> SVal {
        SVal::NonLoc(NonLoc::Symbol(self.symbols.get_extent_symbol(region)))
    }

    #[logfn_inputs(TRACE)]
    pub fn get_function_pointer(&mut self, function: &Rc<FunctionDecl>) -> SVal {
        SVal::Loc(Loc::MemRegion(
            self.regions.get_function_code_region(function),
        ))
    }

    #[logfn_inputs(TRACE)]
    pub fn get_block_pointer(
        &mut self,
        block: &Rc<BlockDecl>,
        location_type: &QualType,
        frame: Option<&Rc<StackFrameContext>>,
        block_count: u32,
    ) -> SVal {
        let code = self.regions.get_block_code_region(block, location_type);
        SVal::Loc(Loc::MemRegion(
            self.regions.get_block_data_region(code, frame, block_count),
        ))
    }
}

/// Casts
impl SValBuilder {
    /// Returns the value of converting val, a value of type original_ty, to cast_ty.
    #[logfn_inputs(TRACE)]
    pub fn eval_cast(&mut self, val: SVal, cast_ty: &QualType, original_ty: &QualType) -> SVal {
        if val.is_unknown_or_undef() || cast_ty == original_ty {
            return val;
        }

        if cast_ty.is_boolean() {
            if val.is_constant() {
                return self.make_truth_val(!val.is_zero_constant(), cast_ty);
            }
            if !original_ty.is_loc_type() && !original_ty.is_integral_or_enumeration() {
                return SVal::Unknown;
            }
            if let Some(symbol) = val.as_symbol(&self.regions, true) {
                let symbol_type = self.symbols.symbol_type(symbol, &self.regions);
                let zero = ConcreteInt::from_i128(0, &symbol_type);
                return self.make_sym_int(symbol, BinaryOp::Ne, zero, cast_ty);
            }
            // Locations are not always true, they could be weakly linked functions.
            return match &val {
                SVal::Loc(loc) | SVal::NonLoc(NonLoc::LocAsInteger { loc, .. }) => {
                    let loc = loc.clone();
                    self.eval_cast_from_loc(&loc, cast_ty)
                }
                _ => SVal::Unknown,
            };
        }

        // Casts that only change qualifiers, or cast to void, just propagate the value.
        if is_noop_cast(cast_ty, original_ty) {
            return val;
        }

        // Pointer to integer
        if cast_ty.is_integral_or_enumeration() && original_ty.is_loc_type() {
            if let SVal::Loc(loc) = &val {
                let loc = loc.clone();
                return self.eval_cast_from_loc(&loc, cast_ty);
            }
            return self.dispatch_cast(val, cast_ty);
        }

        // Integer to pointer
        if cast_ty.is_loc_type() && original_ty.is_integral_or_enumeration() {
            if let SVal::NonLoc(NonLoc::LocAsInteger { loc, .. }) = &val {
                if let Some(region) = loc.as_region() {
                    let store_manager = self.store_manager.clone();
                    return match store_manager.cast_region(self, region, cast_ty) {
                        Some(region) => SVal::Loc(Loc::MemRegion(region)),
                        None => SVal::Unknown,
                    };
                }
                return SVal::Loc(loc.clone());
            }
            return self.dispatch_cast(val, cast_ty);
        }

        // Function and block pointers are passed through.
        if original_ty.is_block_pointer() || original_ty.is_function_pointer() {
            return val;
        }

        // Arrays always decay to a pointer to their first element.
        if let Some(element_type) = original_ty.array_element() {
            let array = match &val {
                SVal::Loc(loc) => loc.clone(),
                _ => return SVal::Unknown,
            };
            let store_manager = self.store_manager.clone();
            let decayed = store_manager.array_to_pointer(self, &array, &element_type.clone());
            if cast_ty.is_any_pointer() || cast_ty.is_reference() {
                return decayed;
            }
            if cast_ty.is_integral_or_enumeration() {
                if let SVal::Loc(loc) = &decayed {
                    let loc = loc.clone();
                    return self.eval_cast_from_loc(&loc, cast_ty);
                }
            }
            return SVal::Unknown;
        }

        // Retype the region that the value points to.
        if let Some(region) = val.as_region() {
            if cast_ty.is_integral_or_enumeration() {
                return self.eval_cast_from_loc(&Loc::MemRegion(region), cast_ty);
            }
            if !cast_ty.is_loc_type() {
                return SVal::Unknown;
            }
            let store_manager = self.store_manager.clone();
            return match store_manager.cast_region(self, region, cast_ty) {
                Some(region) => SVal::Loc(Loc::MemRegion(region)),
                None => SVal::Unknown,
            };
        }

        self.dispatch_cast(val, cast_ty)
    }

    /// Casts a value when the special cases of eval_cast do not apply.
    pub fn dispatch_cast(&mut self, val: SVal, cast_ty: &QualType) -> SVal {
        match &val {
            SVal::Loc(loc) => {
                let loc = loc.clone();
                self.eval_cast_from_loc(&loc, cast_ty)
            }
            SVal::NonLoc(non_loc) => {
                let non_loc = non_loc.clone();
                self.eval_cast_from_non_loc(&non_loc, cast_ty)
            }
            _ => val,
        }
    }

    #[logfn_inputs(TRACE)]
    pub fn eval_cast_from_non_loc(&mut self, val: &NonLoc, cast_ty: &QualType) -> SVal {
        let is_loc_type = cast_ty.is_loc_type();
        match val {
            NonLoc::LocAsInteger { loc, bits } => {
                if is_loc_type {
                    return SVal::Loc(loc.clone());
                }
                let cast_size = cast_ty.bit_width();
                if cast_size == *bits {
                    return SVal::NonLoc(val.clone());
                }
                self.make_loc_as_integer(loc.clone(), cast_size)
            }
            NonLoc::Symbol(symbol) => {
                let symbol_type = self.symbols.symbol_type(*symbol, &self.regions);
                // Symbolic truncation and extension are not modeled, so integers of
                // different widths share a symbol.
                if same_unqualified(&symbol_type, cast_ty)
                    || (symbol_type.is_integral_or_enumeration()
                        && cast_ty.is_integral_or_enumeration())
                {
                    return SVal::NonLoc(val.clone());
                }
                if !is_loc_type {
                    return self.make_cast_symbol(*symbol, &symbol_type, cast_ty);
                }
                SVal::Unknown
            }
            NonLoc::ConcreteInt(i) => {
                if cast_ty.is_boolean() {
                    return self.make_truth_val(!i.is_zero(), cast_ty);
                }
                if !is_loc_type && !cast_ty.is_integral_or_enumeration() {
                    return SVal::Unknown;
                }
                let converted = i.convert_to_type(cast_ty);
                if is_loc_type {
                    SVal::Loc(Loc::ConcreteInt(converted))
                } else {
                    SVal::NonLoc(NonLoc::ConcreteInt(converted))
                }
            }
        }
    }

    #[logfn_inputs(TRACE)]
    pub fn eval_cast_from_loc(&mut self, val: &Loc, cast_ty: &QualType) -> SVal {
        if cast_ty.is_loc_type() || cast_ty.is_reference() {
            return SVal::Loc(val.clone());
        }
        if cast_ty.is_union() {
            return SVal::Unknown;
        }
        if cast_ty.is_boolean() {
            match val {
                Loc::MemRegion(region) => {
                    if let RegionKind::FunctionCode { function, .. } = self.regions.kind(*region) {
                        if function.is_weak {
                            // A weak function may be null.
                            let symbol = self.symbols.get_extent_symbol(*region);
                            return SVal::NonLoc(NonLoc::Symbol(symbol));
                        }
                    }
                    if let Some(base) = self.regions.symbolic_base(*region) {
                        if let Some(symbol) = self.regions.symbol_of(base) {
                            let zero = ConcreteInt::new(0, 64, true);
                            return self.make_sym_int(symbol, BinaryOp::Ne, zero, cast_ty);
                        }
                    }
                    return self.make_truth_val(true, cast_ty);
                }
                Loc::GotoLabel(..) => return self.make_truth_val(true, cast_ty),
                Loc::ConcreteInt(..) => {}
            }
        }
        if cast_ty.is_integral_or_enumeration() {
            return match val {
                Loc::ConcreteInt(i) => SVal::NonLoc(NonLoc::ConcreteInt(i.convert_to_type(cast_ty))),
                _ => self.make_loc_as_integer(val.clone(), cast_ty.bit_width()),
            };
        }
        SVal::Unknown
    }
}

/// Unary and binary operations
impl SValBuilder {
    #[logfn_inputs(TRACE)]
    pub fn eval_minus(&self, val: &SVal) -> SVal {
        match val {
            SVal::NonLoc(NonLoc::ConcreteInt(i)) => SVal::NonLoc(NonLoc::ConcreteInt(i.negate())),
            _ => SVal::Unknown,
        }
    }

    #[logfn_inputs(TRACE)]
    pub fn eval_complement(&self, val: &SVal) -> SVal {
        match val {
            SVal::NonLoc(NonLoc::ConcreteInt(i)) => {
                SVal::NonLoc(NonLoc::ConcreteInt(i.complement()))
            }
            _ => SVal::Unknown,
        }
    }

    /// Returns the int truth value of "lhs == rhs".
    pub fn eval_eq(&mut self, state: &ProgramState, lhs: &SVal, rhs: &SVal) -> SVal {
        self.eval_bin_op(state, BinaryOp::Eq, lhs, rhs, &QualType::int())
    }

    /// Returns the value of "lhs op rhs", where the result has type result_ty.
    #[logfn_inputs(TRACE)]
    pub fn eval_bin_op(
        &mut self,
        state: &ProgramState,
        op: BinaryOp,
        lhs: &SVal,
        rhs: &SVal,
        result_ty: &QualType,
    ) -> SVal {
        if lhs.is_undef() || rhs.is_undef() {
            return SVal::Undefined;
        }
        if lhs.is_unknown() || rhs.is_unknown() {
            return SVal::Unknown;
        }
        match (lhs, rhs) {
            (SVal::Loc(l), SVal::Loc(r)) => self.eval_bin_op_ll(state, op, l, r, result_ty),
            (SVal::Loc(l), SVal::NonLoc(r)) => self.eval_bin_op_ln(state, op, l, r, result_ty),
            // Pointer arithmetic with the addend on the left.
            (SVal::NonLoc(l), SVal::Loc(r)) if op == BinaryOp::Add => {
                self.eval_bin_op_ln(state, op, r, l, result_ty)
            }
            (SVal::NonLoc(l), SVal::NonLoc(r)) => self.eval_bin_op_nn(state, op, l, r, result_ty),
            _ => SVal::Unknown,
        }
    }

    /// Binary operation on two non-locations.
    #[logfn_inputs(TRACE)]
    pub fn eval_bin_op_nn(
        &mut self,
        state: &ProgramState,
        op: BinaryOp,
        lhs: &NonLoc,
        rhs: &NonLoc,
        result_ty: &QualType,
    ) -> SVal {
        let input_lhs = lhs;
        let input_rhs = rhs;
        let mut op = op;
        let mut lhs = lhs.clone();
        let mut rhs = rhs.clone();

        if lhs == rhs {
            use BinaryOp::*;
            match op {
                Eq | Le | Ge => return self.make_truth_val(true, result_ty),
                Lt | Gt | Ne => return self.make_truth_val(false, result_ty),
                Xor | Sub => {
                    if result_ty.is_integral_or_enumeration() {
                        return self.make_int_val(0, result_ty);
                    }
                    let zero = NonLoc::ConcreteInt(ConcreteInt::new(0, 32, false));
                    return self.eval_cast_from_non_loc(&zero, result_ty);
                }
                Or | And => return self.eval_cast_from_non_loc(&lhs, result_ty),
                _ => {}
            }
        }

        loop {
            match &lhs {
                NonLoc::LocAsInteger { loc: lhs_loc, .. } => {
                    let lhs_loc = lhs_loc.clone();
                    return match &rhs {
                        NonLoc::LocAsInteger { loc: rhs_loc, .. } => {
                            if !op.is_comparison() {
                                return SVal::Unknown;
                            }
                            let rhs_loc = rhs_loc.clone();
                            self.eval_bin_op_ll(state, op, &lhs_loc, &rhs_loc, result_ty)
                        }
                        NonLoc::ConcreteInt(i) => {
                            if !op.is_comparison() {
                                return SVal::Unknown;
                            }
                            // Compare as pointers.
                            let rhs_loc = Loc::ConcreteInt(i.convert_to(64, true));
                            self.eval_bin_op_ll(state, op, &lhs_loc, &rhs_loc, result_ty)
                        }
                        NonLoc::Symbol(..) => match op {
                            BinaryOp::Eq => self.make_truth_val(false, result_ty),
                            BinaryOp::Ne => self.make_truth_val(true, result_ty),
                            _ => self.make_sym_expr_val_nn(
                                state, op, input_lhs, input_rhs, result_ty,
                            ),
                        },
                    };
                }
                NonLoc::ConcreteInt(lhs_value) => {
                    let lhs_value = *lhs_value;
                    if let Some(rhs_value) = self.get_known_value(&rhs) {
                        let (lhs_value, rhs_value) = if op.is_comparison() {
                            // Compare in a type that is big enough for both values.
                            let (width, is_unsigned) = if lhs_value.width() == rhs_value.width() {
                                (
                                    lhs_value.width(),
                                    lhs_value.is_unsigned() || rhs_value.is_unsigned(),
                                )
                            } else if lhs_value.width() > rhs_value.width() {
                                (lhs_value.width(), lhs_value.is_unsigned())
                            } else {
                                (rhs_value.width(), rhs_value.is_unsigned())
                            };
                            (
                                lhs_value.convert_to(width, is_unsigned),
                                rhs_value.convert_to(width, is_unsigned),
                            )
                        } else if !op.is_shift() {
                            (
                                lhs_value.convert_to_type(result_ty),
                                rhs_value.convert_to_type(result_ty),
                            )
                        } else {
                            (lhs_value, rhs_value)
                        };
                        return match lhs_value.evaluate(op, &rhs_value) {
                            Some(result) => SVal::NonLoc(NonLoc::ConcreteInt(result)),
                            None => SVal::Undefined,
                        };
                    }

                    // Canonicalize by putting the symbol on the left where possible.
                    use BinaryOp::*;
                    match op {
                        Lt | Gt | Le | Ge | Eq | Ne | Add | Mul | And | Xor | Or => {
                            if let Some(commuted) = op.commuted() {
                                op = commuted;
                            }
                            std::mem::swap(&mut lhs, &mut rhs);
                            continue;
                        }
                        Shr | Shl => {
                            // (~0) >> a, 0 << a and 0 >> a
                            if (op == Shr && !lhs_value.is_unsigned() && lhs_value.complement().is_zero())
                                || lhs_value.is_zero()
                            {
                                return self.eval_cast_from_non_loc(&lhs, result_ty);
                            }
                            return self.make_sym_expr_val_nn(
                                state, op, input_lhs, input_rhs, result_ty,
                            );
                        }
                        Div | Rem => {
                            // 0 / x == 0 and 0 % x == 0
                            if lhs_value.is_zero() {
                                return self.make_zero_val(result_ty);
                            }
                            return self.make_sym_expr_val_nn(
                                state, op, input_lhs, input_rhs, result_ty,
                            );
                        }
                        _ => {
                            return self.make_sym_expr_val_nn(
                                state, op, input_lhs, input_rhs, result_ty,
                            )
                        }
                    }
                }
                NonLoc::Symbol(symbol) => {
                    let symbol = *symbol;
                    if let SymbolKind::SymInt {
                        lhs: inner,
                        op: inner_op,
                        rhs: inner_rhs,
                        ..
                    } = self.symbols.kind(symbol).clone()
                    {
                        // !x is represented as x == 0, so negate the inner comparison.
                        if op == BinaryOp::Eq && rhs.is_zero_constant() {
                            if let Some(negated) = inner_op.negated_comparison() {
                                return self.make_sym_int(inner, negated, inner_rhs, result_ty);
                            }
                        }
                        if let Some(rhs_value) = self.get_known_value(&rhs) {
                            // Fold (s + c1) + c2 and friends.
                            if op.is_additive() && inner_op.is_additive() {
                                let first = inner_rhs.convert_to_type(result_ty);
                                let second = rhs_value.convert_to_type(result_ty);
                                let folded = if inner_op == op {
                                    first.add(&second)
                                } else {
                                    first.sub(&second)
                                };
                                rhs = NonLoc::ConcreteInt(folded);
                                lhs = NonLoc::Symbol(inner);
                                op = inner_op;
                                continue;
                            }
                            return self.make_sym_int_val(symbol, op, rhs_value, result_ty);
                        }
                    }
                    if let Some(rhs_value) = self.get_known_value(&rhs) {
                        return self.make_sym_int_val(symbol, op, rhs_value, result_ty);
                    }
                    return self.make_sym_expr_val_nn(state, op, input_lhs, input_rhs, result_ty);
                }
            }
        }
    }

    /// Builds "lhs op rhs" for a symbol and a constant, after simplifying the
    /// cases with known results.
    fn make_sym_int_val(
        &mut self,
        lhs: SymbolId,
        op: BinaryOp,
        rhs: ConcreteInt,
        result_ty: &QualType,
    ) -> SVal {
        let is_all_ones = rhs.complement().is_zero();
        let mut is_idempotent = false;
        match op {
            BinaryOp::Mul => {
                if rhs.is_zero() {
                    return self.make_int_val(0, result_ty);
                } else if rhs.value() == 1 {
                    is_idempotent = true;
                }
            }
            BinaryOp::Div => {
                if rhs.is_zero() {
                    return SVal::Undefined;
                } else if rhs.value() == 1 {
                    is_idempotent = true;
                }
            }
            BinaryOp::Rem => {
                if rhs.is_zero() {
                    return SVal::Undefined;
                } else if rhs.value() == 1 {
                    return self.make_int_val(0, result_ty);
                }
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Xor => {
                if rhs.is_zero() {
                    is_idempotent = true;
                }
            }
            BinaryOp::And => {
                if rhs.is_zero() {
                    return self.make_int_val(0, result_ty);
                } else if is_all_ones {
                    is_idempotent = true;
                }
            }
            BinaryOp::Or => {
                if rhs.is_zero() {
                    is_idempotent = true;
                } else if is_all_ones {
                    return SVal::NonLoc(NonLoc::ConcreteInt(rhs.convert_to_type(result_ty)));
                }
            }
            _ => {}
        }
        if is_idempotent {
            // The operation can still change the type.
            return self.eval_cast_from_non_loc(&NonLoc::Symbol(lhs), result_ty);
        }
        let converted_rhs = if op.is_comparison() {
            // Compare in a type big enough for both the symbol and the constant.
            let symbol_type = self.symbols.symbol_type(lhs, &self.regions);
            let type_width = symbol_type.bit_width();
            if rhs.width() < type_width
                || (rhs.width() == type_width
                    && !rhs.is_unsigned()
                    && !symbol_type.is_signed_integer_or_enumeration())
            {
                rhs.convert_to_type(&symbol_type)
            } else {
                rhs
            }
        } else {
            rhs.convert_to_type(result_ty)
        };
        self.make_sym_int(lhs, op, converted_rhs, result_ty)
    }

    /// Builds a symbolic expression for an operation that could not be simplified.
    /// Such expressions are only worth tracking if they involve tainted values, and
    /// their size is bounded by the max symbol complexity.
    #[logfn_inputs(TRACE)]
    pub fn make_sym_expr_val_nn(
        &mut self,
        state: &ProgramState,
        op: BinaryOp,
        lhs: &NonLoc,
        rhs: &NonLoc,
        result_ty: &QualType,
    ) -> SVal {
        let lhs_val = SVal::NonLoc(lhs.clone());
        let rhs_val = SVal::NonLoc(rhs.clone());
        if !state.is_tainted(&rhs_val, &self.regions, &self.symbols)
            && !state.is_tainted(&lhs_val, &self.regions, &self.symbols)
        {
            return SVal::Unknown;
        }
        let max = self.max_symbol_complexity;
        let lhs_symbol = lhs.as_symbol();
        let rhs_symbol = rhs.as_symbol();
        if let (Some(l), Some(r)) = (lhs_symbol, rhs_symbol) {
            let complexity = self.symbols.complexity(l) + self.symbols.complexity(r);
            if complexity < max {
                return self.make_sym_sym(l, op, r, result_ty);
            }
            warn!("symbolic expression with complexity {} exceeds {}", complexity, max);
            return SVal::Unknown;
        }
        if let Some(l) = lhs_symbol {
            if let NonLoc::ConcreteInt(r) = rhs {
                let complexity = self.symbols.complexity(l);
                if complexity < max {
                    return self.make_sym_int(l, op, *r, result_ty);
                }
                warn!("symbolic expression with complexity {} exceeds {}", complexity, max);
            }
        }
        if let Some(r) = rhs_symbol {
            if let NonLoc::ConcreteInt(l) = lhs {
                let complexity = self.symbols.complexity(r);
                if complexity < max {
                    return self.make_int_sym(*l, op, r, result_ty);
                }
                warn!("symbolic expression with complexity {} exceeds {}", complexity, max);
            }
        }
        SVal::Unknown
    }

    /// Binary operation on two locations. Only comparisons and subtraction are meaningful.
    #[logfn_inputs(TRACE)]
    pub fn eval_bin_op_ll(
        &mut self,
        state: &ProgramState,
        op: BinaryOp,
        lhs: &Loc,
        rhs: &Loc,
        result_ty: &QualType,
    ) -> SVal {
        if !op.is_comparison() && op != BinaryOp::Sub {
            return SVal::Unknown;
        }
        if lhs == rhs {
            return match op {
                BinaryOp::Sub => self.make_zero_val(result_ty),
                BinaryOp::Eq | BinaryOp::Le | BinaryOp::Ge => self.make_truth_val(true, result_ty),
                _ => self.make_truth_val(false, result_ty),
            };
        }
        match lhs {
            Loc::GotoLabel(..) => {
                // Labels are known not to be null, and nothing else.
                if rhs.is_zero_constant() {
                    match op {
                        BinaryOp::Sub => return self.eval_cast_from_loc(lhs, result_ty),
                        BinaryOp::Eq | BinaryOp::Le | BinaryOp::Lt => {
                            return self.make_truth_val(false, result_ty)
                        }
                        BinaryOp::Ne | BinaryOp::Gt | BinaryOp::Ge => {
                            return self.make_truth_val(true, result_ty)
                        }
                        _ => {}
                    }
                }
                SVal::Unknown
            }
            Loc::ConcreteInt(lhs_value) => {
                let rhs_val = SVal::Loc(rhs.clone());
                if let Some(rhs_symbol) = rhs_val.as_loc_symbol(&self.regions, false) {
                    // Symbols must go on the left.
                    return match op.commuted() {
                        Some(commuted) if op.is_comparison() => {
                            self.make_sym_int(rhs_symbol, commuted, *lhs_value, result_ty)
                        }
                        _ => SVal::Unknown,
                    };
                }
                if let Loc::ConcreteInt(rhs_value) = rhs {
                    return match lhs_value.evaluate(op, rhs_value) {
                        Some(result) => {
                            self.eval_cast_from_non_loc(&NonLoc::ConcreteInt(result), result_ty)
                        }
                        None => SVal::Unknown,
                    };
                }
                if lhs_value.is_zero() {
                    match op {
                        BinaryOp::Eq | BinaryOp::Gt | BinaryOp::Ge => {
                            return self.make_truth_val(false, result_ty)
                        }
                        BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le => {
                            return self.make_truth_val(true, result_ty)
                        }
                        _ => {}
                    }
                }
                SVal::Unknown
            }
            Loc::MemRegion(left_region) => {
                let left_region = *left_region;
                let right_region = match rhs {
                    Loc::ConcreteInt(rhs_value) => {
                        let lhs_val = SVal::Loc(lhs.clone());
                        if let Some(lhs_symbol) = lhs_val.as_loc_symbol(&self.regions, true) {
                            if op.is_comparison() {
                                return self.make_sym_int_val(
                                    lhs_symbol, op, *rhs_value, result_ty,
                                );
                            }
                            return SVal::Unknown;
                        }
                        if rhs_value.is_zero() {
                            if op == BinaryOp::Sub {
                                return self.eval_cast_from_loc(lhs, result_ty);
                            }
                            if op.is_comparison() {
                                let bool_type = QualType::bool();
                                let l = match self.eval_cast_from_loc(lhs, &bool_type) {
                                    SVal::NonLoc(l) => l,
                                    _ => return SVal::Unknown,
                                };
                                let r = NonLoc::ConcreteInt(ConcreteInt::from_i128(0, &bool_type));
                                return self.eval_bin_op_nn(state, op, &l, &r, result_ty);
                            }
                        }
                        return SVal::Unknown;
                    }
                    Loc::GotoLabel(..) => return SVal::Unknown,
                    Loc::MemRegion(right_region) => *right_region,
                };
                self.eval_bin_op_region_region(state, op, left_region, right_region, result_ty)
            }
        }
    }

    fn eval_bin_op_region_region(
        &mut self,
        state: &ProgramState,
        op: BinaryOp,
        left_region: RegionId,
        right_region: RegionId,
        result_ty: &QualType,
    ) -> SVal {
        let left_base = self.regions.base_region(left_region);
        let right_base = self.regions.base_region(right_region);
        let left_space = self.regions.memory_space(left_base);
        let right_space = self.regions.memory_space(right_base);
        let unknown_space = self.regions.get_unknown_space();

        // Regions in different known memory spaces can't be equal. Symbolic regions
        // are assumed not to point to the stack.
        let different_spaces = left_space != right_space
            && ((left_space != unknown_space && right_space != unknown_space)
                || self.regions.kind(left_space).is_stack_space()
                || self.regions.kind(right_space).is_stack_space());
        // Different base regions don't alias, unless one of them is symbolic.
        // Heap allocations are assumed never to alias each other.
        let left_is_symbolic = matches!(self.regions.kind(left_base), RegionKind::Symbolic { .. });
        let right_is_symbolic =
            matches!(self.regions.kind(right_base), RegionKind::Symbolic { .. });
        let different_bases = left_base != right_base
            && ((!left_is_symbolic && !right_is_symbolic)
                || matches!(self.regions.kind(left_space), RegionKind::HeapSpace)
                || matches!(self.regions.kind(right_space), RegionKind::HeapSpace));
        if different_spaces || different_bases {
            return match op {
                BinaryOp::Eq => self.make_truth_val(false, result_ty),
                BinaryOp::Ne => self.make_truth_val(true, result_ty),
                _ => SVal::Unknown,
            };
        }

        // Elements of the same array compare like their indices.
        if let (
            RegionKind::Element {
                element_type: left_type,
                index: left_index,
                super_region: left_super,
            },
            RegionKind::Element {
                element_type: right_type,
                index: right_index,
                super_region: right_super,
            },
        ) = (
            self.regions.kind(left_region).clone(),
            self.regions.kind(right_region).clone(),
        ) {
            if left_super == right_super && left_type == right_type {
                let index_type = QualType::array_index();
                let left_index = match self.eval_cast_from_non_loc(&left_index, &index_type) {
                    SVal::NonLoc(index) => index,
                    _ => return SVal::Unknown,
                };
                let right_index = match self.eval_cast_from_non_loc(&right_index, &index_type) {
                    SVal::NonLoc(index) => index,
                    _ => return SVal::Unknown,
                };
                return self.eval_bin_op_nn(state, op, &left_index, &right_index, result_ty);
            }
        }

        // Fields of the same record are laid out in declaration order.
        if let (
            RegionKind::Field {
                decl: left_field,
                super_region: left_super,
            },
            RegionKind::Field {
                decl: right_field,
                super_region: right_super,
            },
        ) = (self.regions.kind(left_region), self.regions.kind(right_region))
        {
            if left_super == right_super && left_field.parent == right_field.parent {
                let left_first = left_field.index < right_field.index;
                match op {
                    BinaryOp::Eq => return self.make_truth_val(false, result_ty),
                    BinaryOp::Ne => return self.make_truth_val(true, result_ty),
                    BinaryOp::Lt | BinaryOp::Le => {
                        return self.make_truth_val(left_first, result_ty)
                    }
                    BinaryOp::Gt | BinaryOp::Ge => {
                        return self.make_truth_val(!left_first, result_ty)
                    }
                    _ => {}
                }
            }
        }

        // Compare raw offsets from a common base.
        if let (Some((left_root, left_offset)), Some((right_root, right_offset))) = (
            self.regions.as_array_offset(left_region),
            self.regions.as_array_offset(right_region),
        ) {
            if left_root == right_root {
                let result = match op {
                    BinaryOp::Lt => left_offset < right_offset,
                    BinaryOp::Gt => left_offset > right_offset,
                    BinaryOp::Le => left_offset <= right_offset,
                    BinaryOp::Ge => left_offset >= right_offset,
                    BinaryOp::Eq => left_offset == right_offset,
                    BinaryOp::Ne => left_offset != right_offset,
                    _ => return SVal::Unknown,
                };
                return self.make_truth_val(result, result_ty);
            }
        }

        // No good answer, but an expression over two symbols may still be useful.
        let left_symbol = SVal::Loc(Loc::MemRegion(left_region)).as_loc_symbol(&self.regions, false);
        let right_symbol =
            SVal::Loc(Loc::MemRegion(right_region)).as_loc_symbol(&self.regions, false);
        if let (Some(l), Some(r)) = (left_symbol, right_symbol) {
            return self.make_sym_sym(l, op, r, result_ty);
        }
        SVal::Unknown
    }

    /// Pointer arithmetic.
    #[logfn_inputs(TRACE)]
    pub fn eval_bin_op_ln(
        &mut self,
        state: &ProgramState,
        op: BinaryOp,
        lhs: &Loc,
        rhs: &NonLoc,
        result_ty: &QualType,
    ) -> SVal {
        if rhs.is_zero_constant() || lhs.is_zero_constant() {
            return SVal::Loc(lhs.clone());
        }
        if let (Loc::ConcreteInt(left), NonLoc::ConcreteInt(right)) = (lhs, rhs) {
            let element_size = result_ty
                .pointee()
                .and_then(|pointee| pointee.size_in_bytes())
                .unwrap_or(1);
            let right = right
                .convert_to(left.width(), true)
                .mul(&ConcreteInt::new(i128::from(element_size), left.width(), true));
            return match op {
                BinaryOp::Add => SVal::Loc(Loc::ConcreteInt(left.add(&right))),
                BinaryOp::Sub => SVal::Loc(Loc::ConcreteInt(left.sub(&right))),
                _ => SVal::Unknown,
            };
        }
        let region = match lhs.as_region() {
            Some(region) => region,
            None => return SVal::Unknown,
        };
        if op != BinaryOp::Add && op != BinaryOp::Sub {
            return SVal::Unknown;
        }
        let rhs = match self.convert_to_array_index(&SVal::NonLoc(rhs.clone())) {
            SVal::NonLoc(rhs) => rhs,
            _ => return SVal::Unknown,
        };
        let (index, super_region, element_type) = match self.regions.kind(region).clone() {
            RegionKind::Element {
                element_type,
                index,
                super_region,
            } => {
                let index =
                    self.eval_bin_op_nn(state, op, &index, &rhs, &QualType::array_index());
                (index, super_region, Some(element_type))
            }
            kind if kind.is_memory_space() => return SVal::Unknown,
            _ => {
                let index = if op == BinaryOp::Add {
                    SVal::NonLoc(rhs)
                } else {
                    self.eval_minus(&SVal::NonLoc(rhs))
                };
                let element_type = result_ty.pointee().cloned();
                (index, region, element_type)
            }
        };
        let element_type = match element_type {
            // Arithmetic on void pointers is arithmetic on char pointers.
            Some(element_type) if element_type.is_void() => QualType::char(),
            Some(element_type) => element_type,
            None => return SVal::Unknown,
        };
        match index {
            SVal::NonLoc(index) => SVal::Loc(Loc::MemRegion(self.regions.get_element_region(
                &element_type,
                index,
                super_region,
            ))),
            _ => SVal::Unknown,
        }
    }
}

/// Constants
impl SValBuilder {
    /// Returns the value of a constant expression, if it can be computed without looking at
    /// the program state.
    #[logfn_inputs(TRACE)]
    pub fn get_constant_val(&mut self, expr: &Expr) -> Option<SVal> {
        let expr = expr.ignore_parens();
        match &expr.kind {
            ExprKind::AddrLabel { label } => return Some(self.make_label(label)),
            ExprKind::ScalarValueInit | ExprKind::ImplicitValueInit => {
                return Some(self.make_zero_val(&expr.ty))
            }
            ExprKind::StringLiteral(text) => {
                let region = self.regions.get_string_region(expr.id, text);
                return Some(self.make_loc(region));
            }
            ExprKind::CharacterLiteral(c) => return Some(self.make_int_val(i128::from(*c), &expr.ty)),
            ExprKind::BoolLiteral(b) | ExprKind::TypeTrait(b) => {
                return Some(self.make_truth_val(*b, &expr.ty))
            }
            ExprKind::IntegerLiteral(val) => {
                return Some(SVal::NonLoc(NonLoc::ConcreteInt(ConcreteInt::from_u128(
                    *val, &expr.ty,
                ))))
            }
            ExprKind::NullPtrLiteral => return Some(self.make_null()),
            ExprKind::ImplicitCast { kind, operand } | ExprKind::CStyleCast { kind, operand } => {
                if matches!(
                    kind,
                    CastKind::ArrayToPointerDecay | CastKind::NoOp | CastKind::BitCast
                ) {
                    let val = self.get_constant_val(operand)?;
                    return Some(self.eval_cast(val, &expr.ty, &operand.ty));
                }
            }
            _ => {}
        }
        if expr.is_glvalue {
            return None;
        }
        if let Some(val) = expr.evaluate_as_int() {
            return Some(SVal::NonLoc(NonLoc::ConcreteInt(val)));
        }
        if expr.ty.is_loc_type() && expr.is_null_pointer_constant() {
            return Some(self.make_null());
        }
        None
    }
}
