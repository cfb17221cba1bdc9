// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::{BinaryOp, ExprId};
use crate::concrete_int::ConcreteInt;
use crate::location_context::StackFrameContext;
use crate::memory_region::{MemRegionManager, RegionId};
use crate::types::QualType;

use log_derive::*;
use mirai_annotations::*;
use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::{Direction, Graph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// Identifies a canonical symbol. Ids are handed out in creation order.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SymbolId(pub u32);

impl Debug for SymbolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("${}", self.0))
    }
}

/// A placeholder for a runtime value that is not known during the analysis, or an expression
/// built from such placeholders.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SymbolKind {
    /// The value that was stored in the region when the analysis first looked at it.
    RegionValue { region: RegionId },

    /// A fresh value produced by evaluating an expression whose result can't be modeled,
    /// for example the return value of an unknown function. The count distinguishes
    /// repeated evaluations of the same expression.
    Conjured {
        expr: Option<ExprId>,
        frame: Option<Rc<StackFrameContext>>,
        ty: QualType,
        count: u32,
        tag: Option<Rc<str>>,
    },

    /// The value of a sub-region of a region whose contents are given by the parent symbol.
    Derived { parent: SymbolId, region: RegionId },

    /// The size in bytes of a region whose size isn't known.
    Extent { region: RegionId },

    /// A value associated with a region by a client, such as the length of a string.
    /// It only stays alive while the client keeps marking it in use.
    Metadata {
        region: RegionId,
        expr: Option<ExprId>,
        ty: QualType,
        frame: Option<Rc<StackFrameContext>>,
        count: u32,
        tag: Option<Rc<str>>,
    },

    /// The operand converted from one type to another.
    Cast {
        operand: SymbolId,
        from: QualType,
        to: QualType,
    },

    /// symbol op constant
    SymInt {
        lhs: SymbolId,
        op: BinaryOp,
        rhs: ConcreteInt,
        ty: QualType,
    },

    /// constant op symbol
    IntSym {
        lhs: ConcreteInt,
        op: BinaryOp,
        rhs: SymbolId,
        ty: QualType,
    },

    /// symbol op symbol
    SymSym {
        lhs: SymbolId,
        op: BinaryOp,
        rhs: SymbolId,
        ty: QualType,
    },
}

impl SymbolKind {
    /// True for the symbols that are not expressions over other symbols.
    pub fn is_data(&self) -> bool {
        use self::SymbolKind::*;
        matches!(
            self,
            RegionValue { .. }
                | Conjured { .. }
                | Derived { .. }
                | Extent { .. }
                | Metadata { .. }
        )
    }

    /// The symbols that this symbol is directly built from.
    pub fn operands(&self) -> Vec<SymbolId> {
        use self::SymbolKind::*;
        match self {
            Cast { operand, .. } => vec![*operand],
            SymInt { lhs, .. } => vec![*lhs],
            IntSym { rhs, .. } => vec![*rhs],
            SymSym { lhs, rhs, .. } => vec![*lhs, *rhs],
            _ => vec![],
        }
    }
}

#[derive(Clone, Debug)]
struct Symbol {
    kind: SymbolKind,
    /// The number of data symbols in the expansion of this symbol.
    complexity: usize,
}

/// A factory for canonical symbols. Works like the MemRegionManager: an arena of symbols plus
/// a table from structural key to id. It also keeps a side index of symbol dependencies, used to
/// keep dependent symbols alive for as long as their primary symbol is alive.
#[derive(Default)]
pub struct SymbolManager {
    symbols: Vec<Symbol>,
    symbol_ids: HashMap<SymbolKind, SymbolId>,
    dependencies: Graph<SymbolId, ()>,
    dependency_nodes: HashMap<SymbolId, NodeIndex<DefaultIx>>,
}

impl Debug for SymbolManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("SymbolManager({} symbols)", self.symbols.len()))
    }
}

impl SymbolManager {
    pub fn new() -> SymbolManager {
        SymbolManager::default()
    }

    /// The number of distinct symbols created so far.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// True if values of the given type can be represented with symbols.
    /// Values of other types are modeled as unknown.
    pub fn can_symbolicate(ty: &QualType) -> bool {
        ty.is_loc_type()
            || ty.is_integral_or_enumeration()
            || (ty.is_record() && !ty.is_union())
    }

    fn intern(&mut self, kind: SymbolKind) -> SymbolId {
        if let Some(id) = self.symbol_ids.get(&kind) {
            return *id;
        }
        let complexity = if kind.is_data() {
            1
        } else {
            kind.operands()
                .iter()
                .map(|operand| self.complexity(*operand))
                .sum()
        };
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            kind: kind.clone(),
            complexity,
        });
        self.symbol_ids.insert(kind, id);
        id
    }

    #[logfn_inputs(TRACE)]
    pub fn get_region_value_symbol(&mut self, region: RegionId) -> SymbolId {
        self.intern(SymbolKind::RegionValue { region })
    }

    #[logfn_inputs(TRACE)]
    pub fn conjure_symbol(
        &mut self,
        expr: Option<ExprId>,
        frame: Option<&Rc<StackFrameContext>>,
        ty: &QualType,
        count: u32,
        tag: Option<&str>,
    ) -> SymbolId {
        self.intern(SymbolKind::Conjured {
            expr,
            frame: frame.cloned(),
            ty: ty.clone(),
            count,
            tag: tag.map(Rc::from),
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_derived_symbol(&mut self, parent: SymbolId, region: RegionId) -> SymbolId {
        self.intern(SymbolKind::Derived { parent, region })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_extent_symbol(&mut self, region: RegionId) -> SymbolId {
        self.intern(SymbolKind::Extent { region })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_metadata_symbol(
        &mut self,
        region: RegionId,
        expr: Option<ExprId>,
        ty: &QualType,
        frame: Option<&Rc<StackFrameContext>>,
        count: u32,
        tag: Option<&str>,
    ) -> SymbolId {
        self.intern(SymbolKind::Metadata {
            region,
            expr,
            ty: ty.clone(),
            frame: frame.cloned(),
            count,
            tag: tag.map(Rc::from),
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_cast_symbol(&mut self, operand: SymbolId, from: &QualType, to: &QualType) -> SymbolId {
        self.intern(SymbolKind::Cast {
            operand,
            from: from.clone(),
            to: to.clone(),
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_sym_int_expr(
        &mut self,
        lhs: SymbolId,
        op: BinaryOp,
        rhs: ConcreteInt,
        ty: &QualType,
    ) -> SymbolId {
        self.intern(SymbolKind::SymInt {
            lhs,
            op,
            rhs,
            ty: ty.clone(),
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_int_sym_expr(
        &mut self,
        lhs: ConcreteInt,
        op: BinaryOp,
        rhs: SymbolId,
        ty: &QualType,
    ) -> SymbolId {
        self.intern(SymbolKind::IntSym {
            lhs,
            op,
            rhs,
            ty: ty.clone(),
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_sym_sym_expr(
        &mut self,
        lhs: SymbolId,
        op: BinaryOp,
        rhs: SymbolId,
        ty: &QualType,
    ) -> SymbolId {
        self.intern(SymbolKind::SymSym {
            lhs,
            op,
            rhs,
            ty: ty.clone(),
        })
    }

    /// Records that dependent must be kept alive whenever primary is.
    #[logfn_inputs(TRACE)]
    pub fn add_symbol_dependency(&mut self, primary: SymbolId, dependent: SymbolId) {
        let primary_node = self.dependency_node(primary);
        let dependent_node = self.dependency_node(dependent);
        if self.dependencies.find_edge(primary_node, dependent_node).is_none() {
            self.dependencies.add_edge(primary_node, dependent_node, ());
        }
    }

    fn dependency_node(&mut self, symbol: SymbolId) -> NodeIndex<DefaultIx> {
        if let Some(node) = self.dependency_nodes.get(&symbol) {
            return *node;
        }
        let node = self.dependencies.add_node(symbol);
        self.dependency_nodes.insert(symbol, node);
        node
    }
}

/// Queries
impl SymbolManager {
    pub fn kind(&self, symbol: SymbolId) -> &SymbolKind {
        checked_assume!((symbol.0 as usize) < self.symbols.len());
        &self.symbols[symbol.0 as usize].kind
    }

    /// The number of data symbols in the expansion of the symbol.
    pub fn complexity(&self, symbol: SymbolId) -> usize {
        self.symbols[symbol.0 as usize].complexity
    }

    /// The type of the value the symbol stands for.
    pub fn symbol_type(&self, symbol: SymbolId, regions: &MemRegionManager) -> QualType {
        match self.kind(symbol) {
            SymbolKind::RegionValue { region } | SymbolKind::Derived { region, .. } => regions
                .value_type(*region)
                .unwrap_or_else(QualType::void),
            SymbolKind::Extent { .. } => QualType::size_type(),
            SymbolKind::Conjured { ty, .. }
            | SymbolKind::Metadata { ty, .. }
            | SymbolKind::SymInt { ty, .. }
            | SymbolKind::IntSym { ty, .. }
            | SymbolKind::SymSym { ty, .. } => ty.clone(),
            SymbolKind::Cast { to, .. } => to.clone(),
        }
    }

    /// The region a data symbol is associated with, if any.
    pub fn origin_region(&self, symbol: SymbolId) -> Option<RegionId> {
        match self.kind(symbol) {
            SymbolKind::RegionValue { region }
            | SymbolKind::Derived { region, .. }
            | SymbolKind::Extent { region }
            | SymbolKind::Metadata { region, .. } => Some(*region),
            _ => None,
        }
    }

    /// The symbols registered as dependents of primary, in registration order.
    pub fn dependent_symbols(&self, primary: SymbolId) -> Vec<SymbolId> {
        match self.dependency_nodes.get(&primary) {
            None => vec![],
            Some(node) => {
                let mut result: Vec<SymbolId> = self
                    .dependencies
                    .neighbors_directed(*node, Direction::Outgoing)
                    .map(|n| self.dependencies[n])
                    .collect();
                // The graph yields the most recently added edge first.
                result.reverse();
                result
            }
        }
    }

    /// Iterates over the symbol and every symbol it is built from, in pre-order.
    pub fn symbol_iter(&self, symbol: SymbolId) -> SymbolIterator<'_> {
        SymbolIterator {
            symbols: self,
            stack: vec![symbol],
        }
    }
}

/// A pre-order walk over a symbol expression.
pub struct SymbolIterator<'a> {
    symbols: &'a SymbolManager,
    stack: Vec<SymbolId>,
}

impl<'a> Iterator for SymbolIterator<'a> {
    type Item = SymbolId;

    fn next(&mut self) -> Option<SymbolId> {
        let symbol = self.stack.pop()?;
        let mut operands = self.symbols.kind(symbol).operands();
        operands.reverse();
        self.stack.extend(operands);
        Some(symbol)
    }
}
