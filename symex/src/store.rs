// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::{FieldDecl, VarDecl};
use crate::location_context::StackFrameContext;
use crate::memory_region::{MemRegionManager, RegionId, RegionKind};
use crate::sval_builder::SValBuilder;
use crate::svals::{Loc, NonLoc, SVal};
use crate::symbol_reaper::SymbolReaper;
use crate::types::{same_unqualified, QualType};

use log_derive::*;
use mirai_annotations::*;
use rpds::HashTrieMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// Distinguishes a value bound to exactly a region from a value that fills the region and
/// every part of it that has no binding of its own.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum BindingKind {
    Direct,
    Default,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BindingKey {
    pub region: RegionId,
    pub kind: BindingKind,
}

impl BindingKey {
    pub fn make_direct(region: RegionId) -> BindingKey {
        BindingKey {
            region,
            kind: BindingKind::Direct,
        }
    }

    pub fn make_default(region: RegionId) -> BindingKey {
        BindingKey {
            region,
            kind: BindingKind::Default,
        }
    }
}

/// The bindings of all the regions that share a base region.
pub type Cluster = HashTrieMap<BindingKey, SVal>;

/// A persistent map from locations to values. Bindings are grouped into clusters keyed by the
/// base region of the bound region, so that everything stored inside a variable or a symbolic
/// region can be found, and dropped, together.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Store {
    clusters: HashTrieMap<RegionId, Cluster>,
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut bindings: Vec<(&RegionId, Vec<(&BindingKey, &SVal)>)> = self
            .clusters
            .iter()
            .map(|(base, cluster)| {
                let mut entries: Vec<(&BindingKey, &SVal)> = cluster.iter().collect();
                entries.sort();
                (base, entries)
            })
            .collect();
        bindings.sort();
        f.debug_map().entries(bindings.into_iter()).finish()
    }
}

impl Store {
    /// The number of bindings in the store.
    pub fn len(&self) -> usize {
        self.clusters.values().map(|cluster| cluster.size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn cluster(&self, base: RegionId) -> Option<&Cluster> {
        self.clusters.get(&base)
    }

    /// The base regions that have bindings, in id order.
    pub fn cluster_bases(&self) -> Vec<RegionId> {
        let mut bases: Vec<RegionId> = self.clusters.keys().cloned().collect();
        bases.sort();
        bases
    }

    /// The values bound anywhere inside the given base region, in key order.
    pub fn cluster_values(&self, base: RegionId) -> Vec<SVal> {
        match self.clusters.get(&base) {
            None => vec![],
            Some(cluster) => {
                let mut entries: Vec<(&BindingKey, &SVal)> = cluster.iter().collect();
                entries.sort();
                entries.into_iter().map(|(_, v)| v.clone()).collect()
            }
        }
    }

    fn lookup(&self, regions: &MemRegionManager, key: &BindingKey) -> Option<&SVal> {
        self.clusters
            .get(&regions.base_region(key.region))?
            .get(key)
    }

    fn direct_binding(&self, regions: &MemRegionManager, region: RegionId) -> Option<&SVal> {
        self.lookup(regions, &BindingKey::make_direct(region))
    }

    fn default_binding(&self, regions: &MemRegionManager, region: RegionId) -> Option<&SVal> {
        self.lookup(regions, &BindingKey::make_default(region))
    }

    fn add_binding(&self, regions: &MemRegionManager, key: BindingKey, val: SVal) -> Store {
        let base = regions.base_region(key.region);
        let cluster = match self.clusters.get(&base) {
            Some(cluster) => cluster.insert(key, val),
            None => Cluster::new().insert(key, val),
        };
        Store {
            clusters: self.clusters.insert(base, cluster),
        }
    }

    fn remove_key(&self, regions: &MemRegionManager, key: &BindingKey) -> Store {
        let base = regions.base_region(key.region);
        match self.clusters.get(&base) {
            None => self.clone(),
            Some(cluster) => {
                let cluster = cluster.remove(key);
                if cluster.is_empty() {
                    Store {
                        clusters: self.clusters.remove(&base),
                    }
                } else {
                    Store {
                        clusters: self.clusters.insert(base, cluster),
                    }
                }
            }
        }
    }

    /// Removes the bindings of the region and of all of its sub-regions.
    fn remove_sub_region_bindings(&self, regions: &MemRegionManager, region: RegionId) -> Store {
        let base = regions.base_region(region);
        let cluster = match self.clusters.get(&base) {
            None => return self.clone(),
            Some(cluster) => cluster,
        };
        let mut result = cluster.clone();
        for key in cluster.keys() {
            if key.region == region || regions.is_subregion_of(key.region, region) {
                result.remove_mut(key);
            }
        }
        if result.is_empty() {
            Store {
                clusters: self.clusters.remove(&base),
            }
        } else {
            Store {
                clusters: self.clusters.insert(base, result),
            }
        }
    }

    fn remove_cluster(&self, base: RegionId) -> Store {
        Store {
            clusters: self.clusters.remove(&base),
        }
    }
}

/// Maps locations to the values stored in them. The value machinery only ever deals with stores
/// through this interface, so that different memory models can be plugged in.
pub trait StoreManager: Debug {
    /// A store without any bindings.
    fn initial_store(&self) -> Store;

    /// Returns the value stored at the given location. The type is used to read from regions
    /// that do not have a type of their own, such as symbolic regions.
    fn get_binding(
        &self,
        builder: &mut SValBuilder,
        store: &Store,
        loc: &Loc,
        ty: Option<&QualType>,
    ) -> SVal;

    /// Returns a store in which the given location holds the given value.
    fn bind(&self, builder: &mut SValBuilder, store: &Store, loc: &Loc, val: SVal) -> Store;

    /// Returns a store in which every part of the region that has no binding of its own
    /// holds the given value.
    fn bind_default(
        &self,
        builder: &mut SValBuilder,
        store: &Store,
        region: RegionId,
        val: SVal,
    ) -> Store;

    /// Returns a store without the bindings of exactly the given location.
    fn remove_binding(&self, builder: &SValBuilder, store: &Store, loc: &Loc) -> Store;

    /// Returns a store without the bindings that can no longer be reached from the roots known
    /// to the reaper. Values reachable from surviving bindings are marked live in the reaper.
    fn remove_dead_bindings(&self, store: &Store, reaper: &mut SymbolReaper<'_>) -> Store;

    /// True if the region, or a region with the same base, is a key or a value of the store.
    fn included_in_bindings(&self, regions: &MemRegionManager, store: &Store, region: RegionId)
        -> bool;

    /// The value of an array decayed to a pointer to its first element.
    fn array_to_pointer(
        &self,
        builder: &mut SValBuilder,
        array: &Loc,
        element_type: &QualType,
    ) -> SVal;

    fn get_lvalue_var(
        &self,
        builder: &mut SValBuilder,
        decl: &Rc<VarDecl>,
        frame: Option<&Rc<StackFrameContext>>,
    ) -> SVal {
        SVal::Loc(Loc::MemRegion(builder.regions.get_var_region(decl, frame)))
    }

    fn get_lvalue_field(&self, builder: &mut SValBuilder, decl: &Rc<FieldDecl>, base: &SVal)
        -> SVal;

    fn get_lvalue_element(
        &self,
        builder: &mut SValBuilder,
        element_type: &QualType,
        offset: &SVal,
        base: &SVal,
    ) -> SVal;

    /// All bindings as (base region, key, value) triples, in order.
    fn bindings(&self, store: &Store) -> Vec<(RegionId, BindingKey, SVal)> {
        let mut result = Vec::new();
        for base in store.cluster_bases() {
            if let Some(cluster) = store.cluster(base) {
                let mut entries: Vec<(&BindingKey, &SVal)> = cluster.iter().collect();
                entries.sort();
                for (key, val) in entries {
                    result.push((base, *key, val.clone()));
                }
            }
        }
        result
    }

    /// Returns the region to use for viewing the given region through a pointer of type
    /// cast_to, or None if the cast can't be modeled.
    fn cast_region(
        &self,
        builder: &mut SValBuilder,
        region: RegionId,
        cast_to: &QualType,
    ) -> Option<RegionId> {
        let kind = builder.regions.kind(region).clone();
        if cast_to.is_block_pointer() {
            if kind.is_code_text() || matches!(kind, RegionKind::Symbolic { .. }) {
                return Some(region);
            }
            return None;
        }
        let pointee = match cast_to.pointee() {
            Some(pointee) => pointee.clone(),
            None => return None,
        };
        if pointee.is_void() {
            return Some(region);
        }
        if builder.regions.is_boundable(region) {
            if let Some(value_type) = builder.regions.value_type(region) {
                if same_unqualified(&value_type, &pointee) {
                    return Some(region);
                }
            }
        }
        match kind {
            RegionKind::CodeSpace
            | RegionKind::GlobalSystemSpace
            | RegionKind::GlobalImmutableSpace
            | RegionKind::GlobalInternalSpace
            | RegionKind::StaticGlobalSpace { .. }
            | RegionKind::HeapSpace
            | RegionKind::UnknownSpace
            | RegionKind::StackLocalsSpace { .. }
            | RegionKind::StackArgumentsSpace { .. } => assume_unreachable!("invalid region cast"),
            RegionKind::CxxThis { .. } => None,
            RegionKind::FunctionCode { .. }
            | RegionKind::BlockCode { .. }
            | RegionKind::BlockData { .. }
            | RegionKind::String { .. }
            | RegionKind::Symbolic { .. }
            | RegionKind::Alloca { .. }
            | RegionKind::CompoundLiteral { .. }
            | RegionKind::Field { .. }
            | RegionKind::Var { .. }
            | RegionKind::CxxTempObject { .. }
            | RegionKind::CxxBaseObject { .. } => {
                let zero = builder.make_zero_array_index();
                Some(builder.regions.get_element_region(&pointee, zero, region))
            }
            RegionKind::Element { .. } => {
                // Re-base the view on the raw byte offset of the element from the region that
                // holds the element chain.
                let (base, offset) = builder.regions.as_array_offset(region)?;
                if offset == 0 {
                    if let Some(value_type) = builder.regions.value_type(base) {
                        if same_unqualified(&value_type, &pointee) {
                            return Some(base);
                        }
                    }
                    let zero = builder.make_zero_array_index();
                    return Some(builder.regions.get_element_region(&pointee, zero, base));
                }
                let mut new_index = 0i128;
                let mut new_super = None;
                if let Some(size) = pointee.size_in_bytes() {
                    if size != 0 && offset % i128::from(size) == 0 {
                        new_index = offset / i128::from(size);
                        new_super = Some(base);
                    }
                }
                let new_super = match new_super {
                    Some(new_super) => new_super,
                    None => {
                        let raw_offset = builder.make_array_index(offset as i64);
                        builder
                            .regions
                            .get_element_region(&QualType::char(), raw_offset, base)
                    }
                };
                let index = builder.make_array_index(new_index as i64);
                Some(builder.regions.get_element_region(&pointee, index, new_super))
            }
        }
    }
}

/// A StoreManager that binds values to regions, grouping the bindings by base region.
#[derive(Debug, Default)]
pub struct RegionStoreManager {}

impl RegionStoreManager {
    pub fn new() -> RegionStoreManager {
        RegionStoreManager {}
    }

    /// Reads the value of a region that is a field or element of a region whose binding
    /// may be a default binding on one of its ancestors.
    fn get_binding_for_field_or_element_common(
        &self,
        builder: &mut SValBuilder,
        store: &Store,
        region: RegionId,
        ty: &QualType,
    ) -> SVal {
        let mut current = region;
        while let Some(super_region) = builder.regions.super_region(current) {
            if let Some(val) = self.get_binding_for_derived_default_value(
                builder,
                store,
                super_region,
                region,
                ty,
            ) {
                return val;
            }
            current = super_region;
        }
        if builder.regions.has_stack_non_parameters_storage(region) {
            let base = builder.regions.base_region(region);
            if !matches!(builder.regions.kind(base), RegionKind::BlockData { .. }) {
                // Stack memory starts out uninitialized.
                return SVal::Undefined;
            }
        }
        builder.get_region_value_symbol_val(region)
    }

    /// If super_region has a default binding, returns the value it implies for region.
    fn get_binding_for_derived_default_value(
        &self,
        builder: &mut SValBuilder,
        store: &Store,
        super_region: RegionId,
        region: RegionId,
        ty: &QualType,
    ) -> Option<SVal> {
        let val = store.default_binding(&builder.regions, super_region)?.clone();
        if let Some(parent) = val.as_symbol(&builder.regions, false) {
            return Some(builder.get_derived_region_value_symbol_val(parent, region));
        }
        if val.is_zero_constant() {
            return Some(builder.make_zero_val(ty));
        }
        if val.is_unknown_or_undef() {
            return Some(val);
        }
        Some(SVal::Unknown)
    }

    fn get_binding_for_element(
        &self,
        builder: &mut SValBuilder,
        store: &Store,
        region: RegionId,
    ) -> SVal {
        if let Some(val) = store.direct_binding(&builder.regions, region) {
            return val.clone();
        }
        let (element_type, index, super_region) = match builder.regions.kind(region) {
            RegionKind::Element {
                element_type,
                index,
                super_region,
            } => (element_type.clone(), index.clone(), *super_region),
            _ => assume_unreachable!("expected an element region"),
        };
        if let RegionKind::String { text, .. } = builder.regions.kind(super_region) {
            if element_type == QualType::char() {
                if let Some(i) = index.as_concrete_int() {
                    let i = i.value();
                    if i < 0 {
                        return SVal::Undefined;
                    }
                    let c = text.as_bytes().get(i as usize).cloned().unwrap_or(0);
                    return builder.make_int_val(i128::from(c), &element_type);
                }
            }
        }
        let (base, _) = match builder.regions.as_array_offset(region) {
            Some(offset) => offset,
            None => return SVal::Unknown,
        };
        // A scalar viewed through a smaller scalar type.
        if let Some(base_type) = builder.regions.value_type(base) {
            if base_type.is_scalar()
                && element_type.is_scalar()
                && base_type.size_in_bytes() >= element_type.size_in_bytes()
            {
                if let Some(val) = store.direct_binding(&builder.regions, super_region).cloned() {
                    if let Some(parent) = val.as_symbol(&builder.regions, false) {
                        return builder.get_derived_region_value_symbol_val(parent, region);
                    }
                    if val.is_unknown_or_undef() {
                        return val;
                    }
                    return SVal::Unknown;
                }
            }
        }
        self.get_binding_for_field_or_element_common(builder, store, region, &element_type)
    }

    fn get_binding_for_var(
        &self,
        builder: &mut SValBuilder,
        store: &Store,
        region: RegionId,
    ) -> SVal {
        if let Some(val) = store.direct_binding(&builder.regions, region) {
            return val.clone();
        }
        let ty = builder
            .regions
            .value_type(region)
            .unwrap_or_else(QualType::void);
        let space = builder.regions.memory_space(region);
        match builder.regions.kind(space).clone() {
            // Arguments are always symbolic.
            RegionKind::StackArgumentsSpace { .. } | RegionKind::UnknownSpace => {
                builder.get_region_value_symbol_val(region)
            }
            // Static locals are zero initialized.
            RegionKind::StaticGlobalSpace { .. } => builder.make_zero_val(&ty),
            ref kind if kind.is_global_space() => {
                if let Some(val) =
                    self.get_binding_for_derived_default_value(builder, store, space, region, &ty)
                {
                    return val;
                }
                builder.get_region_value_symbol_val(region)
            }
            _ => SVal::Undefined,
        }
    }

    fn bind_aggregate(
        &self,
        regions: &MemRegionManager,
        store: &Store,
        region: RegionId,
        val: SVal,
    ) -> Store {
        store
            .remove_sub_region_bindings(regions, region)
            .add_binding(regions, BindingKey::make_default(region), val)
    }
}

impl StoreManager for RegionStoreManager {
    fn initial_store(&self) -> Store {
        Store::default()
    }

    #[logfn_inputs(TRACE)]
    fn get_binding(
        &self,
        builder: &mut SValBuilder,
        store: &Store,
        loc: &Loc,
        ty: Option<&QualType>,
    ) -> SVal {
        let mut region = match loc {
            Loc::MemRegion(region) => *region,
            Loc::ConcreteInt(..) | Loc::GotoLabel(..) => return SVal::Unknown,
        };
        let kind = builder.regions.kind(region).clone();
        if matches!(kind, RegionKind::BlockData { .. }) || kind.is_memory_space() {
            return SVal::Unknown;
        }
        if builder.regions.value_type(region).is_none() {
            // Untyped memory is read through a typed view of its first element.
            let ty = match ty {
                Some(ty) => ty.clone(),
                None => match kind {
                    RegionKind::Symbolic { symbol, .. } => {
                        let symbol_type = builder.symbols.symbol_type(symbol, &builder.regions);
                        match symbol_type.pointee() {
                            Some(pointee) => pointee.clone(),
                            None => return SVal::Unknown,
                        }
                    }
                    _ => return SVal::Unknown,
                },
            };
            if ty.is_void() || ty.is_function() {
                return SVal::Unknown;
            }
            let zero = builder.make_zero_array_index();
            region = builder.regions.get_element_region(&ty, zero, region);
        }
        let value_type = builder
            .regions
            .value_type(region)
            .unwrap_or_else(QualType::void);
        if value_type.is_record() || value_type.is_array() {
            if let Some(val) = store.direct_binding(&builder.regions, region) {
                return val.clone();
            }
            if let Some(val) = store.default_binding(&builder.regions, region) {
                return val.clone();
            }
        }
        match builder.regions.kind(region).clone() {
            RegionKind::Element { .. } => self.get_binding_for_element(builder, store, region),
            RegionKind::Field { .. } => {
                if let Some(val) = store.direct_binding(&builder.regions, region) {
                    return val.clone();
                }
                self.get_binding_for_field_or_element_common(builder, store, region, &value_type)
            }
            RegionKind::Var { .. } => self.get_binding_for_var(builder, store, region),
            _ => {
                if let Some(val) = store.direct_binding(&builder.regions, region) {
                    return val.clone();
                }
                if builder.regions.has_stack_non_parameters_storage(region) {
                    return SVal::Undefined;
                }
                builder.get_region_value_symbol_val(region)
            }
        }
    }

    #[logfn_inputs(TRACE)]
    fn bind(&self, builder: &mut SValBuilder, store: &Store, loc: &Loc, val: SVal) -> Store {
        let mut region = match loc {
            Loc::MemRegion(region) => *region,
            // Writes to concrete addresses and labels are not modeled.
            Loc::ConcreteInt(..) | Loc::GotoLabel(..) => return store.clone(),
        };
        if let Some(value_type) = builder.regions.value_type(region) {
            if value_type.is_array() || value_type.is_record() {
                let val = if val.as_symbolic_expression().is_some() {
                    val
                } else {
                    SVal::Unknown
                };
                return self.bind_aggregate(&builder.regions, store, region, val);
            }
        }
        if let Some(symbol) = builder.regions.symbol_of(region) {
            let symbol_type = builder.symbols.symbol_type(symbol, &builder.regions);
            let element_type = match symbol_type.pointee() {
                Some(pointee) if !pointee.is_void() => pointee.clone(),
                _ => QualType::char(),
            };
            let zero = builder.make_zero_array_index();
            region = builder.regions.get_element_region(&element_type, zero, region);
        }
        if !builder.regions.is_boundable(region) {
            return store.clone();
        }
        store
            .remove_sub_region_bindings(&builder.regions, region)
            .add_binding(&builder.regions, BindingKey::make_direct(region), val)
    }

    #[logfn_inputs(TRACE)]
    fn bind_default(
        &self,
        builder: &mut SValBuilder,
        store: &Store,
        region: RegionId,
        val: SVal,
    ) -> Store {
        self.bind_aggregate(&builder.regions, store, region, val)
    }

    #[logfn_inputs(TRACE)]
    fn remove_binding(&self, builder: &SValBuilder, store: &Store, loc: &Loc) -> Store {
        match loc {
            Loc::MemRegion(region) => store
                .remove_key(&builder.regions, &BindingKey::make_direct(*region))
                .remove_key(&builder.regions, &BindingKey::make_default(*region)),
            _ => store.clone(),
        }
    }

    fn remove_dead_bindings(&self, store: &Store, reaper: &mut SymbolReaper<'_>) -> Store {
        let mut worker = RemoveDeadBindingsWorker::new(store, reaper);
        worker.generate_clusters();
        for root in worker.reaper.region_roots() {
            worker.add_to_work_list(root);
        }
        loop {
            worker.run_work_list();
            if !worker.update_postponed() {
                break;
            }
        }

        let regions = worker.reaper.regions();
        let mut result = store.clone();
        for base in store.cluster_bases() {
            if worker.visited.contains(&base) {
                continue;
            }
            debug!("removing dead cluster {:?}", base);
            if let RegionKind::Symbolic { symbol, .. } = regions.kind(base) {
                worker.reaper.maybe_dead(*symbol);
            }
            for val in store.cluster_values(base) {
                for symbol in worker.reaper.symbols_of(&val) {
                    worker.reaper.maybe_dead(symbol);
                }
            }
            result = result.remove_cluster(base);
        }
        result
    }

    fn included_in_bindings(
        &self,
        regions: &MemRegionManager,
        store: &Store,
        region: RegionId,
    ) -> bool {
        let region = regions.base_region(region);
        if store.cluster(region).is_some() {
            return true;
        }
        store.clusters.values().any(|cluster| {
            cluster.values().any(|val| match val.as_region() {
                Some(r) => regions.base_region(r) == region,
                None => false,
            })
        })
    }

    #[logfn_inputs(TRACE)]
    fn array_to_pointer(
        &self,
        builder: &mut SValBuilder,
        array: &Loc,
        element_type: &QualType,
    ) -> SVal {
        match array {
            Loc::ConcreteInt(..) => SVal::Loc(array.clone()),
            Loc::MemRegion(region) => {
                let zero = builder.make_zero_array_index();
                SVal::Loc(Loc::MemRegion(builder.regions.get_element_region(
                    element_type,
                    zero,
                    *region,
                )))
            }
            Loc::GotoLabel(..) => SVal::Unknown,
        }
    }

    #[logfn_inputs(TRACE)]
    fn get_lvalue_field(
        &self,
        builder: &mut SValBuilder,
        decl: &Rc<FieldDecl>,
        base: &SVal,
    ) -> SVal {
        match base {
            SVal::Unknown | SVal::Undefined => base.clone(),
            SVal::Loc(Loc::MemRegion(region)) => {
                SVal::Loc(Loc::MemRegion(builder.regions.get_field_region(decl, *region)))
            }
            SVal::Loc(Loc::GotoLabel(..)) => SVal::Undefined,
            SVal::Loc(Loc::ConcreteInt(..)) => base.clone(),
            SVal::NonLoc(..) => SVal::Unknown,
        }
    }

    #[logfn_inputs(TRACE)]
    fn get_lvalue_element(
        &self,
        builder: &mut SValBuilder,
        element_type: &QualType,
        offset: &SVal,
        base: &SVal,
    ) -> SVal {
        let base_region = match base {
            SVal::Unknown | SVal::Undefined | SVal::Loc(Loc::ConcreteInt(..)) => {
                return base.clone()
            }
            SVal::Loc(Loc::MemRegion(region)) => *region,
            SVal::Loc(Loc::GotoLabel(..)) | SVal::NonLoc(..) => return SVal::Unknown,
        };
        let offset = match builder.convert_to_array_index(offset) {
            SVal::NonLoc(offset) => offset,
            _ => return SVal::Unknown,
        };
        let (base_index, super_region) = match builder.regions.kind(base_region) {
            RegionKind::Element {
                index,
                super_region,
                ..
            } => (index.clone(), *super_region),
            _ => {
                // Any pointer can be used as the base of an array.
                return SVal::Loc(Loc::MemRegion(builder.regions.get_element_region(
                    element_type,
                    offset,
                    base_region,
                )));
            }
        };
        let base_index = match base_index {
            NonLoc::ConcreteInt(i) => i,
            _ => return SVal::Unknown,
        };
        let offset = match offset {
            NonLoc::ConcreteInt(i) => i,
            _ => {
                // Only allow symbolic offsets if the base region has no offset itself.
                let stripped = builder.regions.strip_casts(base_region, true);
                if matches!(builder.regions.kind(stripped), RegionKind::Element { .. }) {
                    return SVal::Unknown;
                }
                return SVal::Loc(Loc::MemRegion(builder.regions.get_element_region(
                    element_type,
                    offset,
                    super_region,
                )));
            }
        };
        let index_type = QualType::array_index();
        let new_index = NonLoc::ConcreteInt(
            base_index
                .convert_to_type(&index_type)
                .add(&offset.convert_to_type(&index_type)),
        );
        SVal::Loc(Loc::MemRegion(builder.regions.get_element_region(
            element_type,
            new_index,
            super_region,
        )))
    }
}

/// Scans the clusters of a store from the live roots and records which clusters are reachable.
struct RemoveDeadBindingsWorker<'s, 'r, 'a> {
    store: &'s Store,
    reaper: &'r mut SymbolReaper<'a>,
    frame: Option<Rc<StackFrameContext>>,
    visited: HashSet<RegionId>,
    work_list: Vec<RegionId>,
    /// Symbolic clusters whose symbol was not live when first seen.
    postponed: Vec<Option<RegionId>>,
}

impl<'s, 'r, 'a> RemoveDeadBindingsWorker<'s, 'r, 'a> {
    fn new(
        store: &'s Store,
        reaper: &'r mut SymbolReaper<'a>,
    ) -> RemoveDeadBindingsWorker<'s, 'r, 'a> {
        let frame = reaper.stack_frame().cloned();
        RemoveDeadBindingsWorker {
            store,
            reaper,
            frame,
            visited: HashSet::new(),
            work_list: Vec::new(),
            postponed: Vec::new(),
        }
    }

    /// Adds the base of the region to the work list, unless it has already been added.
    fn add_to_work_list(&mut self, region: RegionId) -> bool {
        let base = self.reaper.regions().base_region(region);
        if !self.visited.insert(base) {
            return false;
        }
        self.work_list.push(base);
        true
    }

    fn generate_clusters(&mut self) {
        for base in self.store.cluster_bases() {
            self.visit_added_to_cluster(base);
        }
    }

    /// Decides if a cluster is a root.
    fn visit_added_to_cluster(&mut self, base: RegionId) {
        let regions = self.reaper.regions();
        match regions.kind(base) {
            RegionKind::Var { .. } => {
                if self.reaper.is_live_var_region(base, false) {
                    self.add_to_work_list(base);
                }
            }
            RegionKind::Symbolic { symbol, .. } => {
                if self.reaper.is_live(*symbol) {
                    self.add_to_work_list(base);
                } else {
                    self.postponed.push(Some(base));
                }
            }
            kind if kind.is_non_static_global_space() => {
                self.add_to_work_list(base);
            }
            RegionKind::CxxThis { .. } => {
                // This in the current or a parent frame is live.
                if let (Some(region_frame), Some(current)) =
                    (regions.stack_frame(base), self.frame.as_ref())
                {
                    if region_frame.id == current.id || region_frame.is_parent_of(current) {
                        self.add_to_work_list(base);
                    }
                }
            }
            _ => {}
        }
    }

    fn run_work_list(&mut self) {
        while let Some(base) = self.work_list.pop() {
            self.visit_cluster(base);
        }
    }

    fn visit_cluster(&mut self, base: RegionId) {
        let store = self.store;
        let cluster = match store.cluster(base) {
            Some(cluster) => cluster,
            None => return,
        };
        let regions = self.reaper.regions();
        // The symbol of a symbolic region with live bindings stays live.
        if let Some(symbol) = regions.symbol_of(base) {
            self.reaper.mark_live(symbol);
        }
        let mut entries: Vec<(&BindingKey, &SVal)> = cluster.iter().collect();
        entries.sort();
        for (key, val) in entries {
            self.reaper.mark_element_indices_live(key.region);
            self.visit_binding(val);
        }
    }

    fn visit_binding(&mut self, val: &SVal) {
        if let Some(region) = val.as_region() {
            self.add_to_work_list(region);
            self.reaper.mark_live_region(region);
        }
        for symbol in self.reaper.symbols_of(val) {
            self.reaper.mark_live(symbol);
        }
    }

    /// Retries the postponed symbolic clusters. Returns true if any of them became live.
    fn update_postponed(&mut self) -> bool {
        let mut changed = false;
        for i in 0..self.postponed.len() {
            if let Some(base) = self.postponed[i] {
                let symbol = match self.reaper.regions().symbol_of(base) {
                    Some(symbol) => symbol,
                    None => continue,
                };
                if self.reaper.is_live(symbol) {
                    changed |= self.add_to_work_list(base);
                    self.postponed[i] = None;
                }
            }
        }
        changed
    }
}
