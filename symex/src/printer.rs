// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Renders values, regions and symbols in the notation analyzer users are used to, for example
// `(reg_$0<i32 x>) + 1` or `&Element{buf,2,char}`. Region and symbol Debug output only
// shows ids, which is not much help when looking at a store.

use crate::concrete_int::ConcreteInt;
use crate::memory_region::{MemRegionManager, RegionId, RegionKind};
use crate::store::{BindingKind, Store, StoreManager};
use crate::svals::{Loc, NonLoc, SVal};
use crate::symbol::{SymbolId, SymbolKind, SymbolManager};

pub struct Printer<'a> {
    regions: &'a MemRegionManager,
    symbols: &'a SymbolManager,
}

fn int(val: &ConcreteInt) -> String {
    if val.is_unsigned() {
        format!("{}U", val.unsigned_value())
    } else {
        format!("{}", val.signed_value())
    }
}

impl<'a> Printer<'a> {
    pub fn new(regions: &'a MemRegionManager, symbols: &'a SymbolManager) -> Printer<'a> {
        Printer { regions, symbols }
    }

    pub fn sval(&self, val: &SVal) -> String {
        match val {
            SVal::Undefined => "Undefined".to_string(),
            SVal::Unknown => "Unknown".to_string(),
            SVal::Loc(loc) => self.loc(loc),
            SVal::NonLoc(non_loc) => self.non_loc(non_loc),
        }
    }

    pub fn loc(&self, loc: &Loc) -> String {
        match loc {
            Loc::ConcreteInt(val) => format!("{} (Loc)", int(val)),
            Loc::MemRegion(region) => format!("&{}", self.region(*region)),
            Loc::GotoLabel(label) => format!("&&{}", label),
        }
    }

    pub fn non_loc(&self, non_loc: &NonLoc) -> String {
        match non_loc {
            NonLoc::ConcreteInt(val) => int(val),
            NonLoc::Symbol(symbol) => self.symbol(*symbol),
            NonLoc::LocAsInteger { loc, bits } => {
                format!("{} [as {} bit integer]", self.loc(loc), bits)
            }
        }
    }

    pub fn region(&self, region: RegionId) -> String {
        use RegionKind::*;
        match self.regions.kind(region) {
            CodeSpace => "CodeSpace".to_string(),
            GlobalSystemSpace => "GlobalSystemSpace".to_string(),
            GlobalImmutableSpace => "GlobalImmutableSpace".to_string(),
            GlobalInternalSpace => "GlobalInternalSpace".to_string(),
            StaticGlobalSpace { code_region } => {
                format!("StaticGlobalSpace{{{}}}", self.region(*code_region))
            }
            HeapSpace => "HeapSpace".to_string(),
            UnknownSpace => "UnknownSpace".to_string(),
            StackLocalsSpace { frame } => format!("StackLocalsSpace{{{:?}}}", frame),
            StackArgumentsSpace { frame } => format!("StackArgumentsSpace{{{:?}}}", frame),
            FunctionCode { function, .. } => format!("code{{{}}}", function.name),
            BlockCode { block, .. } => format!("block_code{{{}}}", block.id),
            BlockData { code, .. } => format!("block_data{{{}}}", self.region(*code)),
            Symbolic { symbol, .. } => format!("SymRegion{{{}}}", self.symbol(*symbol)),
            Alloca { expr, count, .. } => format!("alloca{{{:?},{}}}", expr, count),
            CompoundLiteral { expr, .. } => format!("{{compound_literal {:?}}}", expr),
            String { text, .. } => format!("{:?}", text),
            Var { decl, .. } => decl.name.to_string(),
            CxxThis { .. } => "this".to_string(),
            CxxTempObject { expr, ty, .. } => format!("temp_object{{{:?},{:?}}}", ty, expr),
            CxxBaseObject {
                record,
                super_region,
                ..
            } => format!("Base{{{},{}}}", self.region(*super_region), record.name),
            Field {
                decl, super_region, ..
            } => format!("{}.{}", self.region(*super_region), decl.name),
            Element {
                element_type,
                index,
                super_region,
            } => format!(
                "Element{{{},{},{:?}}}",
                self.region(*super_region),
                self.non_loc(index),
                element_type
            ),
        }
    }

    pub fn symbol(&self, symbol: SymbolId) -> String {
        use SymbolKind::*;
        let n = symbol.0;
        match self.symbols.kind(symbol) {
            RegionValue { region } => {
                let ty = self
                    .regions
                    .value_type(*region)
                    .map(|ty| format!("{:?} ", ty))
                    .unwrap_or_default();
                format!("reg_${}<{}{}>", n, ty, self.region(*region))
            }
            Conjured { ty, tag, .. } => match tag {
                Some(tag) => format!("conj_${}{{{:?}, {}}}", n, ty, tag),
                None => format!("conj_${}{{{:?}}}", n, ty),
            },
            Derived { parent, region } => format!(
                "derived_${}{{{},{}}}",
                n,
                self.symbol(*parent),
                self.region(*region)
            ),
            Extent { region } => format!("extent_${}{{{}}}", n, self.region(*region)),
            Metadata { region, tag, .. } => match tag {
                Some(tag) => format!("meta_${}{{{},{}}}", n, self.region(*region), tag),
                None => format!("meta_${}{{{}}}", n, self.region(*region)),
            },
            Cast { operand, to, .. } => format!("({:?}) ({})", to, self.symbol(*operand)),
            SymInt { lhs, op, rhs, .. } => {
                format!("({}) {} {}", self.symbol(*lhs), op.spelling(), int(rhs))
            }
            IntSym { lhs, op, rhs, .. } => {
                format!("{} {} ({})", int(lhs), op.spelling(), self.symbol(*rhs))
            }
            SymSym { lhs, op, rhs, .. } => format!(
                "({}) {} ({})",
                self.symbol(*lhs),
                op.spelling(),
                self.symbol(*rhs)
            ),
        }
    }

    /// One line per binding, in region order: `region kind: value`.
    pub fn store(&self, store_manager: &dyn StoreManager, store: &Store) -> Vec<String> {
        store_manager
            .bindings(store)
            .iter()
            .map(|(_, key, val)| {
                let kind = match key.kind {
                    BindingKind::Direct => "direct",
                    BindingKind::Default => "default",
                };
                format!("{} {}: {}", self.region(key.region), kind, self.sval(val))
            })
            .collect()
    }
}
