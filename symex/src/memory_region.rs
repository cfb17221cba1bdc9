// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::{BlockDecl, ExprId, FieldDecl, FunctionDecl, RecordDecl, StorageClass, VarDecl};
use crate::concrete_int::ConcreteInt;
use crate::k_limits;
use crate::location_context::StackFrameContext;
use crate::svals::NonLoc;
use crate::symbol::SymbolId;
use crate::types::{QualType, TypeKind};

use log_derive::*;
use mirai_annotations::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// Identifies a canonical region. Two requests for structurally equal regions
/// get the same id from the same MemRegionManager.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RegionId(pub u32);

impl Debug for RegionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("R{}", self.0))
    }
}

/// A region is an abstract description of a memory location.
/// Memory spaces are the roots. Every other kind of region is a sub-region of a super region,
/// so following super regions always ends at a memory space.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum RegionKind {
    /// The memory space that holds the code of functions and blocks.
    CodeSpace,

    /// Globals that system code is known to modify, such as errno.
    GlobalSystemSpace,

    /// Globals that are assumed never to change, such as const globals of arithmetic type and
    /// most globals declared in system headers.
    GlobalImmutableSpace,

    /// All other globals of the translation unit.
    GlobalInternalSpace,

    /// Static locals of the function whose code region is given.
    StaticGlobalSpace { code_region: RegionId },

    /// Dynamically allocated memory.
    HeapSpace,

    /// Memory of which nothing is known, such as the target of a symbolic pointer.
    UnknownSpace,

    /// The automatic variables of a stack frame.
    StackLocalsSpace { frame: Rc<StackFrameContext> },

    /// The parameters of a stack frame.
    StackArgumentsSpace { frame: Rc<StackFrameContext> },

    /// The code of a function.
    FunctionCode {
        function: Rc<FunctionDecl>,
        super_region: RegionId,
    },

    /// The code of a block (closure).
    BlockCode {
        block: Rc<BlockDecl>,
        location_type: QualType,
        super_region: RegionId,
    },

    /// An instance of a block: its code together with the frame that created it.
    BlockData {
        code: RegionId,
        frame: Option<Rc<StackFrameContext>>,
        block_count: u32,
        super_region: RegionId,
    },

    /// The memory that a symbolic pointer value points to.
    Symbolic {
        symbol: SymbolId,
        super_region: RegionId,
    },

    /// Memory returned by alloca. The count distinguishes repeated executions of the same call.
    Alloca {
        expr: ExprId,
        count: u32,
        super_region: RegionId,
    },

    /// The object created by a compound literal expression.
    CompoundLiteral {
        expr: ExprId,
        ty: QualType,
        super_region: RegionId,
    },

    /// The storage of a string literal.
    String {
        expr: ExprId,
        text: Rc<str>,
        super_region: RegionId,
    },

    /// The storage of a variable.
    Var {
        decl: Rc<VarDecl>,
        super_region: RegionId,
    },

    /// The storage of the implicit this parameter.
    CxxThis {
        this_type: QualType,
        super_region: RegionId,
    },

    /// A temporary object created by the given expression.
    CxxTempObject {
        expr: ExprId,
        ty: QualType,
        super_region: RegionId,
    },

    /// The base class sub-object of the super region.
    CxxBaseObject {
        record: Rc<RecordDecl>,
        is_virtual: bool,
        super_region: RegionId,
    },

    /// A field of the record stored in the super region.
    Field {
        decl: Rc<FieldDecl>,
        super_region: RegionId,
    },

    /// An element of the array stored in the super region. Also used to layer a typed view
    /// on top of untyped memory, in which case the index is zero.
    Element {
        element_type: QualType,
        index: NonLoc,
        super_region: RegionId,
    },
}

impl RegionKind {
    /// The region that contains this one, or None if this is a memory space.
    pub fn super_region(&self) -> Option<RegionId> {
        use self::RegionKind::*;
        match self {
            CodeSpace
            | GlobalSystemSpace
            | GlobalImmutableSpace
            | GlobalInternalSpace
            | StaticGlobalSpace { .. }
            | HeapSpace
            | UnknownSpace
            | StackLocalsSpace { .. }
            | StackArgumentsSpace { .. } => None,
            FunctionCode { super_region, .. }
            | BlockCode { super_region, .. }
            | BlockData { super_region, .. }
            | Symbolic { super_region, .. }
            | Alloca { super_region, .. }
            | CompoundLiteral { super_region, .. }
            | String { super_region, .. }
            | Var { super_region, .. }
            | CxxThis { super_region, .. }
            | CxxTempObject { super_region, .. }
            | CxxBaseObject { super_region, .. }
            | Field { super_region, .. }
            | Element { super_region, .. } => Some(*super_region),
        }
    }

    pub fn is_memory_space(&self) -> bool {
        self.super_region().is_none()
    }

    /// True for the global spaces that are not tied to a particular function.
    pub fn is_non_static_global_space(&self) -> bool {
        matches!(
            self,
            RegionKind::GlobalSystemSpace
                | RegionKind::GlobalImmutableSpace
                | RegionKind::GlobalInternalSpace
        )
    }

    pub fn is_global_space(&self) -> bool {
        self.is_non_static_global_space() || matches!(self, RegionKind::StaticGlobalSpace { .. })
    }

    pub fn is_stack_space(&self) -> bool {
        matches!(
            self,
            RegionKind::StackLocalsSpace { .. } | RegionKind::StackArgumentsSpace { .. }
        )
    }

    pub fn is_code_text(&self) -> bool {
        matches!(
            self,
            RegionKind::FunctionCode { .. } | RegionKind::BlockCode { .. }
        )
    }
}

/// A node in the region arena.
#[derive(Clone, Debug)]
struct MemRegion {
    kind: RegionKind,
    /// The number of regions on the chain from this region to its memory space, inclusive.
    depth: usize,
}

/// A factory for canonical regions. Regions are allocated in an arena that lives as long as
/// the manager, and a structural key to id table ensures that requests for equal regions
/// return the same id.
#[derive(Default)]
pub struct MemRegionManager {
    regions: Vec<MemRegion>,
    region_ids: HashMap<RegionKind, RegionId>,
    code_space: Option<RegionId>,
    global_system_space: Option<RegionId>,
    global_immutable_space: Option<RegionId>,
    global_internal_space: Option<RegionId>,
    heap_space: Option<RegionId>,
    unknown_space: Option<RegionId>,
    /// Keyed by frame id.
    stack_locals_spaces: HashMap<u32, RegionId>,
    /// Keyed by frame id.
    stack_arguments_spaces: HashMap<u32, RegionId>,
    /// Keyed by the code region of the function owning the static locals.
    static_global_spaces: HashMap<RegionId, RegionId>,
}

impl Debug for MemRegionManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("MemRegionManager({} regions)", self.regions.len()))
    }
}

/// Memory spaces
impl MemRegionManager {
    pub fn new() -> MemRegionManager {
        MemRegionManager::default()
    }

    /// The number of distinct regions created so far.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Returns the id of the canonical region with the given key, allocating it if necessary.
    fn intern(&mut self, kind: RegionKind) -> RegionId {
        if let Some(id) = self.region_ids.get(&kind) {
            return *id;
        }
        let depth = match kind.super_region() {
            Some(super_region) => self.regions[super_region.0 as usize].depth + 1,
            None => 1,
        };
        if depth >= k_limits::MAX_REGION_DEPTH {
            warn!("max region depth exceeded {:?}", kind);
        }
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(MemRegion {
            kind: kind.clone(),
            depth,
        });
        self.region_ids.insert(kind, id);
        id
    }

    fn lazily_intern(
        slot: &mut Option<RegionId>,
        regions: &mut Vec<MemRegion>,
        region_ids: &mut HashMap<RegionKind, RegionId>,
        kind: RegionKind,
    ) -> RegionId {
        if let Some(id) = slot {
            return *id;
        }
        let id = RegionId(regions.len() as u32);
        regions.push(MemRegion {
            kind: kind.clone(),
            depth: 1,
        });
        region_ids.insert(kind, id);
        *slot = Some(id);
        id
    }

    #[logfn_inputs(TRACE)]
    pub fn get_code_space(&mut self) -> RegionId {
        Self::lazily_intern(
            &mut self.code_space,
            &mut self.regions,
            &mut self.region_ids,
            RegionKind::CodeSpace,
        )
    }

    #[logfn_inputs(TRACE)]
    pub fn get_heap_space(&mut self) -> RegionId {
        Self::lazily_intern(
            &mut self.heap_space,
            &mut self.regions,
            &mut self.region_ids,
            RegionKind::HeapSpace,
        )
    }

    #[logfn_inputs(TRACE)]
    pub fn get_unknown_space(&mut self) -> RegionId {
        Self::lazily_intern(
            &mut self.unknown_space,
            &mut self.regions,
            &mut self.region_ids,
            RegionKind::UnknownSpace,
        )
    }

    #[logfn_inputs(TRACE)]
    pub fn get_global_system_space(&mut self) -> RegionId {
        Self::lazily_intern(
            &mut self.global_system_space,
            &mut self.regions,
            &mut self.region_ids,
            RegionKind::GlobalSystemSpace,
        )
    }

    #[logfn_inputs(TRACE)]
    pub fn get_global_immutable_space(&mut self) -> RegionId {
        Self::lazily_intern(
            &mut self.global_immutable_space,
            &mut self.regions,
            &mut self.region_ids,
            RegionKind::GlobalImmutableSpace,
        )
    }

    #[logfn_inputs(TRACE)]
    pub fn get_global_internal_space(&mut self) -> RegionId {
        Self::lazily_intern(
            &mut self.global_internal_space,
            &mut self.regions,
            &mut self.region_ids,
            RegionKind::GlobalInternalSpace,
        )
    }

    /// The space holding the static locals of the function whose code region is given.
    #[logfn_inputs(TRACE)]
    pub fn get_static_global_space(&mut self, code_region: RegionId) -> RegionId {
        if let Some(id) = self.static_global_spaces.get(&code_region) {
            return *id;
        }
        let id = self.intern(RegionKind::StaticGlobalSpace { code_region });
        self.static_global_spaces.insert(code_region, id);
        id
    }

    #[logfn_inputs(TRACE)]
    pub fn get_stack_locals_space(&mut self, frame: &Rc<StackFrameContext>) -> RegionId {
        if let Some(id) = self.stack_locals_spaces.get(&frame.id) {
            return *id;
        }
        let id = self.intern(RegionKind::StackLocalsSpace {
            frame: frame.clone(),
        });
        self.stack_locals_spaces.insert(frame.id, id);
        id
    }

    #[logfn_inputs(TRACE)]
    pub fn get_stack_arguments_space(&mut self, frame: &Rc<StackFrameContext>) -> RegionId {
        if let Some(id) = self.stack_arguments_spaces.get(&frame.id) {
            return *id;
        }
        let id = self.intern(RegionKind::StackArgumentsSpace {
            frame: frame.clone(),
        });
        self.stack_arguments_spaces.insert(frame.id, id);
        id
    }
}

/// Sub-regions
impl MemRegionManager {
    /// Returns the region of the given variable. Globals are split by mutability, parameters
    /// and locals live in the spaces of their frame and static locals live in the static global
    /// space of the function of their frame. Without a frame, the storage of a local is unknown.
    #[logfn_inputs(TRACE)]
    pub fn get_var_region(
        &mut self,
        decl: &Rc<VarDecl>,
        frame: Option<&Rc<StackFrameContext>>,
    ) -> RegionId {
        let super_region = if decl.has_global_storage() && !decl.is_static_local() {
            if let StorageClass::Global {
                in_system_header: true,
            } = decl.storage
            {
                // System globals that are known to change are modeled as such,
                // the rest are assumed to be immutable.
                if decl.name.contains("errno") {
                    self.get_global_system_space()
                } else {
                    self.get_global_immutable_space()
                }
            } else if decl.ty.is_const
                && (decl.ty.is_integral_or_enumeration() || decl.ty.is_floating())
            {
                self.get_global_immutable_space()
            } else {
                self.get_global_internal_space()
            }
        } else {
            match frame {
                None => self.get_unknown_space(),
                Some(frame) => {
                    if decl.has_local_storage() {
                        if decl.is_parameter() {
                            self.get_stack_arguments_space(frame)
                        } else {
                            self.get_stack_locals_space(frame)
                        }
                    } else {
                        let code_region = self.get_function_code_region(&frame.function);
                        self.get_static_global_space(code_region)
                    }
                }
            }
        };
        self.intern(RegionKind::Var {
            decl: decl.clone(),
            super_region,
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_field_region(&mut self, decl: &Rc<FieldDecl>, super_region: RegionId) -> RegionId {
        self.intern(RegionKind::Field {
            decl: decl.clone(),
            super_region,
        })
    }

    /// Returns the element region. The element type is stored without qualifiers,
    /// so that the same element viewed as const and as non-const is the same region.
    #[logfn_inputs(TRACE)]
    pub fn get_element_region(
        &mut self,
        element_type: &QualType,
        index: NonLoc,
        super_region: RegionId,
    ) -> RegionId {
        self.intern(RegionKind::Element {
            element_type: element_type.unqualified(),
            index,
            super_region,
        })
    }

    /// Returns the region pointed to by a symbolic pointer of which nothing is known.
    #[logfn_inputs(TRACE)]
    pub fn get_symbolic_region(&mut self, symbol: SymbolId) -> RegionId {
        let super_region = self.get_unknown_space();
        self.intern(RegionKind::Symbolic {
            symbol,
            super_region,
        })
    }

    /// Returns the region pointed to by a symbolic pointer that is known to point into the heap.
    #[logfn_inputs(TRACE)]
    pub fn get_symbolic_heap_region(&mut self, symbol: SymbolId) -> RegionId {
        let super_region = self.get_heap_space();
        self.intern(RegionKind::Symbolic {
            symbol,
            super_region,
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_alloca_region(
        &mut self,
        expr: ExprId,
        count: u32,
        frame: &Rc<StackFrameContext>,
    ) -> RegionId {
        let super_region = self.get_stack_locals_space(frame);
        self.intern(RegionKind::Alloca {
            expr,
            count,
            super_region,
        })
    }

    /// Compound literals at file scope are globals, otherwise they live in the frame's locals.
    #[logfn_inputs(TRACE)]
    pub fn get_compound_literal_region(
        &mut self,
        expr: ExprId,
        ty: &QualType,
        frame: Option<&Rc<StackFrameContext>>,
    ) -> RegionId {
        let super_region = match frame {
            None => self.get_global_internal_space(),
            Some(frame) => self.get_stack_locals_space(frame),
        };
        self.intern(RegionKind::CompoundLiteral {
            expr,
            ty: ty.clone(),
            super_region,
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_string_region(&mut self, expr: ExprId, text: &Rc<str>) -> RegionId {
        let super_region = self.get_global_internal_space();
        self.intern(RegionKind::String {
            expr,
            text: text.clone(),
            super_region,
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_function_code_region(&mut self, function: &Rc<FunctionDecl>) -> RegionId {
        let super_region = self.get_code_space();
        self.intern(RegionKind::FunctionCode {
            function: function.clone(),
            super_region,
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_block_code_region(
        &mut self,
        block: &Rc<BlockDecl>,
        location_type: &QualType,
    ) -> RegionId {
        let super_region = self.get_code_space();
        self.intern(RegionKind::BlockCode {
            block: block.clone(),
            location_type: location_type.clone(),
            super_region,
        })
    }

    /// A block instance created in a frame lives in that frame, otherwise it is an immutable global.
    #[logfn_inputs(TRACE)]
    pub fn get_block_data_region(
        &mut self,
        code: RegionId,
        frame: Option<&Rc<StackFrameContext>>,
        block_count: u32,
    ) -> RegionId {
        precondition!(self.kind(code).is_code_text());
        let super_region = match frame {
            Some(frame) => self.get_stack_locals_space(frame),
            None => self.get_global_immutable_space(),
        };
        self.intern(RegionKind::BlockData {
            code,
            frame: frame.cloned(),
            block_count,
            super_region,
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_cxx_this_region(
        &mut self,
        this_type: &QualType,
        frame: &Rc<StackFrameContext>,
    ) -> RegionId {
        let super_region = self.get_stack_arguments_space(frame);
        self.intern(RegionKind::CxxThis {
            this_type: this_type.clone(),
            super_region,
        })
    }

    #[logfn_inputs(TRACE)]
    pub fn get_cxx_temp_object_region(
        &mut self,
        expr: ExprId,
        ty: &QualType,
        frame: &Rc<StackFrameContext>,
    ) -> RegionId {
        let super_region = self.get_stack_locals_space(frame);
        self.intern(RegionKind::CxxTempObject {
            expr,
            ty: ty.clone(),
            super_region,
        })
    }

    /// Virtual base regions are not layered on top of other base regions, since the layout
    /// rules for virtual bases differ from those of non-virtual bases.
    #[logfn_inputs(TRACE)]
    pub fn get_cxx_base_object_region(
        &mut self,
        record: &Rc<RecordDecl>,
        super_region: RegionId,
        is_virtual: bool,
    ) -> RegionId {
        let mut super_region = super_region;
        if is_virtual {
            while let RegionKind::CxxBaseObject {
                super_region: next, ..
            } = self.kind(super_region)
            {
                super_region = *next;
            }
        }
        self.intern(RegionKind::CxxBaseObject {
            record: record.clone(),
            is_virtual,
            super_region,
        })
    }
}

/// Queries
impl MemRegionManager {
    pub fn kind(&self, region: RegionId) -> &RegionKind {
        checked_assume!((region.0 as usize) < self.regions.len());
        &self.regions[region.0 as usize].kind
    }

    pub fn depth(&self, region: RegionId) -> usize {
        self.regions[region.0 as usize].depth
    }

    pub fn super_region(&self, region: RegionId) -> Option<RegionId> {
        self.kind(region).super_region()
    }

    pub fn is_memory_space(&self, region: RegionId) -> bool {
        self.kind(region).is_memory_space()
    }

    /// Returns the memory space at the root of the super region chain.
    pub fn memory_space(&self, region: RegionId) -> RegionId {
        let mut current = region;
        while let Some(super_region) = self.super_region(current) {
            current = super_region;
        }
        current
    }

    /// Strips off fields, elements and base objects to get at the region whose storage
    /// holds the given region.
    pub fn base_region(&self, region: RegionId) -> RegionId {
        let mut current = region;
        loop {
            match self.kind(current) {
                RegionKind::Field { super_region, .. }
                | RegionKind::Element { super_region, .. }
                | RegionKind::CxxBaseObject { super_region, .. } => current = *super_region,
                _ => return current,
            }
        }
    }

    /// Strips off element regions with a zero index, which are merely typed views of their
    /// super region. Optionally also strips base object regions.
    pub fn strip_casts(&self, region: RegionId, strip_base_casts: bool) -> RegionId {
        let mut current = region;
        loop {
            match self.kind(current) {
                RegionKind::Element {
                    index,
                    super_region,
                    ..
                } => {
                    if !index.is_zero_constant() {
                        return current;
                    }
                    current = *super_region;
                }
                RegionKind::CxxBaseObject { super_region, .. } if strip_base_casts => {
                    current = *super_region;
                }
                _ => return current,
            }
        }
    }

    /// Returns the closest symbolic region on the super region chain, if any.
    pub fn symbolic_base(&self, region: RegionId) -> Option<RegionId> {
        let mut current = region;
        loop {
            match self.kind(current) {
                RegionKind::Symbolic { .. } => return Some(current),
                kind => current = kind.super_region()?,
            }
        }
    }

    /// The symbol of a symbolic region.
    pub fn symbol_of(&self, region: RegionId) -> Option<SymbolId> {
        if let RegionKind::Symbolic { symbol, .. } = self.kind(region) {
            Some(*symbol)
        } else {
            None
        }
    }

    /// The frame whose stack holds the region, if it lives on the stack.
    pub fn stack_frame(&self, region: RegionId) -> Option<&Rc<StackFrameContext>> {
        match self.kind(self.memory_space(region)) {
            RegionKind::StackLocalsSpace { frame } | RegionKind::StackArgumentsSpace { frame } => {
                Some(frame)
            }
            _ => None,
        }
    }

    pub fn has_stack_storage(&self, region: RegionId) -> bool {
        self.kind(self.memory_space(region)).is_stack_space()
    }

    pub fn has_stack_non_parameters_storage(&self, region: RegionId) -> bool {
        matches!(
            self.kind(self.memory_space(region)),
            RegionKind::StackLocalsSpace { .. }
        )
    }

    pub fn has_stack_parameters_storage(&self, region: RegionId) -> bool {
        matches!(
            self.kind(self.memory_space(region)),
            RegionKind::StackArgumentsSpace { .. }
        )
    }

    pub fn has_globals_or_parameters_storage(&self, region: RegionId) -> bool {
        let space = self.kind(self.memory_space(region));
        space.is_global_space() || matches!(space, RegionKind::StackArgumentsSpace { .. })
    }

    /// True if ancestor is found on the super region chain of region (excluding region itself).
    pub fn is_subregion_of(&self, region: RegionId, ancestor: RegionId) -> bool {
        let mut current = self.super_region(region);
        while let Some(r) = current {
            if r == ancestor {
                return true;
            }
            current = self.super_region(r);
        }
        false
    }

    /// The type of the value stored in the region, if the region is typed.
    pub fn value_type(&self, region: RegionId) -> Option<QualType> {
        match self.kind(region) {
            RegionKind::Var { decl, .. } => Some(decl.ty.clone()),
            RegionKind::Field { decl, .. } => Some(decl.ty.clone()),
            RegionKind::Element { element_type, .. } => Some(element_type.clone()),
            RegionKind::CxxThis { this_type, .. } => Some(this_type.clone()),
            RegionKind::CxxTempObject { ty, .. } | RegionKind::CompoundLiteral { ty, .. } => {
                Some(ty.clone())
            }
            RegionKind::CxxBaseObject { record, .. } => Some(record.ty.clone()),
            RegionKind::String { text, .. } => Some(QualType::array_of(
                QualType::char(),
                Some(text.len() as u64 + 1),
            )),
            _ => None,
        }
    }

    /// The type of a pointer to the region, if known.
    pub fn location_type(&self, region: RegionId) -> Option<QualType> {
        match self.kind(region) {
            RegionKind::FunctionCode { function, .. } => {
                Some(QualType::pointer_to(QualType::from(TypeKind::Function {
                    name: function.name.clone(),
                })))
            }
            RegionKind::BlockCode { location_type, .. } => Some(location_type.clone()),
            _ => self.value_type(region).map(QualType::pointer_to),
        }
    }

    /// True if values can be bound to the region in the store.
    pub fn is_boundable(&self, region: RegionId) -> bool {
        let kind = self.kind(region);
        !(kind.is_memory_space() || kind.is_code_text() || matches!(kind, RegionKind::String { .. }))
    }

    /// Computes the raw byte offset of a chain of element regions with concrete indices
    /// from the first region that is not such an element. Returns None if an index is symbolic
    /// or if the offset does not fit.
    /// If an element type is incomplete, the walk stops at that element.
    pub fn as_array_offset(&self, region: RegionId) -> Option<(RegionId, i128)> {
        let mut offset: i128 = 0;
        let mut current = region;
        while let RegionKind::Element {
            element_type,
            index,
            super_region,
        } = self.kind(current)
        {
            let index = index.as_concrete_int()?.value();
            if index != 0 {
                match element_type.size_in_bytes() {
                    Some(size) => {
                        offset = index
                            .checked_mul(i128::from(size))
                            .and_then(|bytes| offset.checked_add(bytes))?
                    }
                    None => return Some((current, offset)),
                }
            }
            current = *super_region;
        }
        Some((current, offset))
    }

    /// Returns the index of an element region, if the region is an element region.
    pub fn element_index(&self, region: RegionId) -> Option<&NonLoc> {
        if let RegionKind::Element { index, .. } = self.kind(region) {
            Some(index)
        } else {
            None
        }
    }

    /// Returns all regions on the super region chain of region, starting with region itself.
    pub fn region_chain(&self, region: RegionId) -> Vec<RegionId> {
        let mut chain = vec![region];
        let mut current = region;
        while let Some(super_region) = self.super_region(current) {
            chain.push(super_region);
            current = super_region;
        }
        chain
    }
}

/// A concrete int index of the type used for array indices.
pub fn array_index(index: i64) -> NonLoc {
    NonLoc::ConcreteInt(ConcreteInt::from_i128(
        i128::from(index),
        &QualType::array_index(),
    ))
}
