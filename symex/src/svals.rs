// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::concrete_int::ConcreteInt;
use crate::memory_region::{MemRegionManager, RegionId};
use crate::symbol::{SymbolId, SymbolManager};

use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// An abstract value. Values are small and are passed around by value. They are never interned,
/// but the regions and symbols they refer to are.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SVal {
    /// The result of reading memory that has not been initialized, or of an operation
    /// whose result is undefined behavior.
    Undefined,
    /// A value about which nothing is known.
    Unknown,
    Loc(Loc),
    NonLoc(NonLoc),
}

/// A value that is the address of something.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Loc {
    /// A pointer with a known numeric value, such as null.
    ConcreteInt(ConcreteInt),
    MemRegion(RegionId),
    GotoLabel(Rc<str>),
}

/// A value that is not a location.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum NonLoc {
    ConcreteInt(ConcreteInt),
    Symbol(SymbolId),
    /// A location that has been converted to an integer of the given number of bits.
    LocAsInteger { loc: Loc, bits: u8 },
}

impl From<Loc> for SVal {
    fn from(loc: Loc) -> SVal {
        SVal::Loc(loc)
    }
}

impl From<NonLoc> for SVal {
    fn from(non_loc: NonLoc) -> SVal {
        SVal::NonLoc(non_loc)
    }
}

impl Loc {
    pub fn as_region(&self) -> Option<RegionId> {
        if let Loc::MemRegion(region) = self {
            Some(*region)
        } else {
            None
        }
    }

    pub fn is_zero_constant(&self) -> bool {
        matches!(self, Loc::ConcreteInt(val) if val.is_zero())
    }
}

impl NonLoc {
    pub fn as_concrete_int(&self) -> Option<&ConcreteInt> {
        if let NonLoc::ConcreteInt(val) = self {
            Some(val)
        } else {
            None
        }
    }

    pub fn is_zero_constant(&self) -> bool {
        matches!(self, NonLoc::ConcreteInt(val) if val.is_zero())
    }

    pub fn as_symbol(&self) -> Option<SymbolId> {
        if let NonLoc::Symbol(sym) = self {
            Some(*sym)
        } else {
            None
        }
    }
}

impl SVal {
    pub fn is_unknown(&self) -> bool {
        matches!(self, SVal::Unknown)
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, SVal::Undefined)
    }

    pub fn is_unknown_or_undef(&self) -> bool {
        self.is_unknown() || self.is_undef()
    }

    pub fn is_valid(&self) -> bool {
        !self.is_unknown_or_undef()
    }

    pub fn is_loc(&self) -> bool {
        matches!(self, SVal::Loc(..))
    }

    pub fn is_non_loc(&self) -> bool {
        matches!(self, SVal::NonLoc(..))
    }

    /// True if the value is a concrete integer or a concrete pointer.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            SVal::Loc(Loc::ConcreteInt(..)) | SVal::NonLoc(NonLoc::ConcreteInt(..))
        )
    }

    pub fn is_zero_constant(&self) -> bool {
        match self {
            SVal::Loc(loc) => loc.is_zero_constant(),
            SVal::NonLoc(non_loc) => non_loc.is_zero_constant(),
            _ => false,
        }
    }

    pub fn as_concrete_int(&self) -> Option<&ConcreteInt> {
        match self {
            SVal::Loc(Loc::ConcreteInt(val)) | SVal::NonLoc(NonLoc::ConcreteInt(val)) => Some(val),
            _ => None,
        }
    }

    /// The region the value points to, looking through locations cast to integers.
    pub fn as_region(&self) -> Option<RegionId> {
        match self {
            SVal::Loc(loc) | SVal::NonLoc(NonLoc::LocAsInteger { loc, .. }) => loc.as_region(),
            _ => None,
        }
    }

    /// The symbol of a pointer to a symbolic region. With include_base_regions, pointers into
    /// a sub-region of a symbolic region also give the symbol of that region.
    pub fn as_loc_symbol(
        &self,
        regions: &MemRegionManager,
        include_base_regions: bool,
    ) -> Option<SymbolId> {
        let region = regions.strip_casts(self.as_region()?, true);
        if include_base_regions {
            let base = regions.symbolic_base(region)?;
            regions.symbol_of(base)
        } else {
            regions.symbol_of(region)
        }
    }

    /// The symbol the value stands for, if it is either a symbolic non-location
    /// or a pointer to a symbolic region.
    pub fn as_symbol(
        &self,
        regions: &MemRegionManager,
        include_base_regions: bool,
    ) -> Option<SymbolId> {
        match self {
            SVal::NonLoc(NonLoc::Symbol(sym)) => Some(*sym),
            _ => self.as_loc_symbol(regions, include_base_regions),
        }
    }

    /// The symbolic expression of a non-location value, if any.
    pub fn as_symbolic_expression(&self) -> Option<SymbolId> {
        if let SVal::NonLoc(NonLoc::Symbol(sym)) = self {
            Some(*sym)
        } else {
            None
        }
    }

    /// All the symbols in the expansion of the value's symbol, in pre-order.
    pub fn symbols(&self, regions: &MemRegionManager, symbols: &SymbolManager) -> Vec<SymbolId> {
        match self.as_symbol(regions, true) {
            Some(sym) => symbols.symbol_iter(sym).collect(),
            None => vec![],
        }
    }
}
