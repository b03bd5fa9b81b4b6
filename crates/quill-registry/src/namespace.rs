//! Namespaces.
//!
//! A namespace maps simple names to definitions, partitioned by kind:
//! sub-namespaces, types, values and functions. One declaration may occupy
//! several partitions (an entity is both a type and a value); within a
//! partition a name is unique. Namespaces are immutable once built.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use quill_core::{
    ConstantDef, EntityDef, FunctionDef, ModuleName, OperationDef, QueryDef, RName, RType,
    StructDef,
};

use crate::system::SysFnId;

/// Deprecation marker carried by a namespace entry; surfaced as a diagnostic
/// each time the entry is resolved.
#[derive(Debug, Clone)]
pub struct Deprecation {
    pub use_instead: String,
    pub error: bool,
}

/// A value-kind namespace entry.
#[derive(Debug, Clone)]
pub enum NsValue {
    Constant(Rc<ConstantDef>),
    Entity(Rc<EntityDef>),
    Struct(Rc<StructDef>),
}

/// A function-kind namespace entry.
#[derive(Debug, Clone)]
pub enum NsFunction {
    User(Rc<FunctionDef>),
    Query(Rc<QueryDef>),
    Operation(Rc<OperationDef>),
    Sys(SysFnId),
    /// A struct name used in call position constructs the struct.
    StructCtor(Rc<StructDef>),
}

/// A namespace-kind entry: either an inline namespace or a reference to
/// another module's public namespace, resolved lazily because modules
/// assemble independently.
#[derive(Debug, Clone)]
pub enum NamespaceRef {
    Inline(Rc<Namespace>),
    Module(ModuleName),
}

/// An entry plus its markers.
#[derive(Debug, Clone)]
pub struct NsDef<T> {
    pub def: T,
    pub deprecated: Option<Deprecation>,
}

impl<T> NsDef<T> {
    pub fn plain(def: T) -> NsDef<T> {
        NsDef {
            def,
            deprecated: None,
        }
    }

    pub fn deprecated(def: T, deprecation: Deprecation) -> NsDef<T> {
        NsDef {
            def,
            deprecated: Some(deprecation),
        }
    }
}

/// An immutable namespace.
#[derive(Debug, Default)]
pub struct Namespace {
    namespaces: FxHashMap<RName, NsDef<NamespaceRef>>,
    types: FxHashMap<RName, NsDef<RType>>,
    values: FxHashMap<RName, NsDef<NsValue>>,
    functions: FxHashMap<RName, NsDef<NsFunction>>,
}

impl Namespace {
    pub fn empty() -> Rc<Namespace> {
        Rc::new(Namespace::default())
    }

    pub fn namespace(&self, name: &RName) -> Option<&NsDef<NamespaceRef>> {
        self.namespaces.get(name)
    }

    pub fn ty(&self, name: &RName) -> Option<&NsDef<RType>> {
        self.types.get(name)
    }

    pub fn value(&self, name: &RName) -> Option<&NsDef<NsValue>> {
        self.values.get(name)
    }

    pub fn function(&self, name: &RName) -> Option<&NsDef<NsFunction>> {
        self.functions.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
            && self.types.is_empty()
            && self.values.is_empty()
            && self.functions.is_empty()
    }
}

/// Mutable builder for a namespace.
///
/// Adding a name twice to the same partition is an internal invariant
/// violation: user-level conflicts must be resolved by the assembler before
/// entries reach the builder.
#[derive(Debug, Default)]
pub struct NamespaceBuilder {
    ns: Namespace,
}

impl NamespaceBuilder {
    pub fn new() -> NamespaceBuilder {
        NamespaceBuilder::default()
    }

    pub fn add_namespace(&mut self, name: RName, def: NsDef<NamespaceRef>) {
        let prev = self.ns.namespaces.insert(name.clone(), def);
        assert!(prev.is_none(), "duplicate namespace entry '{name}'");
    }

    pub fn add_type(&mut self, name: RName, def: NsDef<RType>) {
        let prev = self.ns.types.insert(name.clone(), def);
        assert!(prev.is_none(), "duplicate type entry '{name}'");
    }

    pub fn add_value(&mut self, name: RName, def: NsDef<NsValue>) {
        let prev = self.ns.values.insert(name.clone(), def);
        assert!(prev.is_none(), "duplicate value entry '{name}'");
    }

    pub fn add_function(&mut self, name: RName, def: NsDef<NsFunction>) {
        let prev = self.ns.functions.insert(name.clone(), def);
        assert!(prev.is_none(), "duplicate function entry '{name}'");
    }

    pub fn build(self) -> Rc<Namespace> {
        Rc::new(self.ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let mut b = NamespaceBuilder::new();
        b.add_type(RName::of("integer"), NsDef::plain(RType::Integer));
        b.add_function(RName::of("abs"), NsDef::plain(NsFunction::Sys(SysFnId::Abs)));
        let ns = b.build();

        assert!(ns.ty(&RName::of("integer")).is_some());
        assert!(ns.ty(&RName::of("missing")).is_none());
        assert!(ns.function(&RName::of("abs")).is_some());
        assert!(ns.value(&RName::of("abs")).is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate type entry")]
    fn duplicate_partition_entry_panics() {
        let mut b = NamespaceBuilder::new();
        b.add_type(RName::of("t"), NsDef::plain(RType::Integer));
        b.add_type(RName::of("t"), NsDef::plain(RType::Text));
    }

    #[test]
    fn same_name_in_different_partitions_is_fine() {
        // predefined names may legitimately be both a type and a namespace
        let mut b = NamespaceBuilder::new();
        b.add_type(RName::of("integer"), NsDef::plain(RType::Integer));
        b.add_namespace(
            RName::of("integer"),
            NsDef::plain(NamespaceRef::Inline(Namespace::empty())),
        );
        let ns = b.build();
        assert!(ns.ty(&RName::of("integer")).is_some());
        assert!(ns.namespace(&RName::of("integer")).is_some());
    }
}
