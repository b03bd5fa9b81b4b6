//! The frozen definition model.
//!
//! Definitions are created as shells during name declaration and filled in by
//! later compilation stages through single-shot setters (`OnceCell` slots).
//! Setting a slot twice, or reading it before its owning stage has run, is an
//! internal invariant violation and panics. Once every stage has completed the
//! whole structure is immutable and safe to share.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::expr::EvalExpr;
use crate::ids::DefHash;
use crate::name::{ModuleName, MountName, QualifiedName, RName};
use crate::stmt::RStatement;
use crate::types::{RType, TypeFlags};
use crate::value::Value;

// ============================================================================
// Attributes
// ============================================================================

/// An attribute of an entity or struct.
#[derive(Debug)]
pub struct Attribute {
    pub name: RName,
    pub ty: RType,
    pub mutable: bool,
    pub has_default: bool,
    default: OnceCell<EvalExpr>,
}

impl Attribute {
    pub fn new(name: RName, ty: RType, mutable: bool, has_default: bool) -> Attribute {
        Attribute {
            name,
            ty,
            mutable,
            has_default,
            default: OnceCell::new(),
        }
    }

    pub fn set_default(&self, expr: EvalExpr) {
        assert!(self.has_default, "attribute '{}' has no default", self.name);
        assert!(
            self.default.set(expr).is_ok(),
            "attribute '{}' default set twice",
            self.name
        );
    }

    pub fn default_expr(&self) -> Option<&EvalExpr> {
        self.default.get()
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Attributes plus key/index clauses, resolved during member resolution.
#[derive(Debug)]
pub struct EntityBody {
    pub attributes: Vec<Rc<Attribute>>,
    pub keys: Vec<Vec<RName>>,
    pub indexes: Vec<Vec<RName>>,
}

/// Structural flags derived from the dependency graph once all definitions
/// are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityFlags {
    /// Some attribute is mutable.
    pub mutable: bool,
    /// The entity participates in a reference cycle (legal: references are
    /// by rowid).
    pub cyclic: bool,
}

pub struct EntityDef {
    pub name: QualifiedName,
    pub mount: MountName,
    pub def_hash: DefHash,
    body: OnceCell<EntityBody>,
    flags: OnceCell<EntityFlags>,
}

impl EntityDef {
    pub fn new(name: QualifiedName, mount: MountName) -> EntityDef {
        let def_hash = DefHash::of(&name);
        EntityDef {
            name,
            mount,
            def_hash,
            body: OnceCell::new(),
            flags: OnceCell::new(),
        }
    }

    pub fn set_body(&self, body: EntityBody) {
        assert!(self.body.set(body).is_ok(), "entity '{}' body set twice", self.name);
    }

    pub fn body(&self) -> &EntityBody {
        self.body
            .get()
            .unwrap_or_else(|| panic!("entity '{}' body not resolved yet", self.name))
    }

    /// `None` when member resolution failed; the error is already reported.
    pub fn try_body(&self) -> Option<&EntityBody> {
        self.body.get()
    }

    pub fn attributes(&self) -> &[Rc<Attribute>] {
        &self.body().attributes
    }

    pub fn attribute(&self, name: &RName) -> Option<&Rc<Attribute>> {
        self.attributes().iter().find(|a| &a.name == name)
    }

    pub fn set_flags(&self, flags: EntityFlags) {
        assert!(self.flags.set(flags).is_ok(), "entity '{}' flags set twice", self.name);
    }

    pub fn flags(&self) -> EntityFlags {
        *self
            .flags
            .get()
            .unwrap_or_else(|| panic!("entity '{}' flags not computed yet", self.name))
    }
}

impl fmt::Debug for EntityDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {}", self.name)
    }
}

// ============================================================================
// Structs
// ============================================================================

/// Derived structural flags of a struct type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructFlags {
    /// Content flags spread over the component closure.
    pub type_flags: TypeFlags,
    /// The struct references itself through any path.
    pub cyclic: bool,
    /// The struct includes itself by value; such a struct cannot be
    /// instantiated and is reported as an error.
    pub infinite: bool,
}

pub struct StructDef {
    pub name: QualifiedName,
    pub def_hash: DefHash,
    attributes: OnceCell<Vec<Rc<Attribute>>>,
    flags: OnceCell<StructFlags>,
}

impl StructDef {
    pub fn new(name: QualifiedName) -> StructDef {
        let def_hash = DefHash::of(&name);
        StructDef {
            name,
            def_hash,
            attributes: OnceCell::new(),
            flags: OnceCell::new(),
        }
    }

    pub fn set_attributes(&self, attrs: Vec<Rc<Attribute>>) {
        assert!(
            self.attributes.set(attrs).is_ok(),
            "struct '{}' attributes set twice",
            self.name
        );
    }

    pub fn attributes(&self) -> &[Rc<Attribute>] {
        self.attributes
            .get()
            .unwrap_or_else(|| panic!("struct '{}' attributes not resolved yet", self.name))
    }

    /// `None` when member resolution failed; the error is already reported.
    pub fn try_attributes(&self) -> Option<&[Rc<Attribute>]> {
        self.attributes.get().map(Vec::as_slice)
    }

    pub fn attribute_index(&self, name: &RName) -> Option<usize> {
        self.attributes().iter().position(|a| &a.name == name)
    }

    pub fn set_flags(&self, flags: StructFlags) {
        assert!(self.flags.set(flags).is_ok(), "struct '{}' flags set twice", self.name);
    }

    pub fn flags(&self) -> StructFlags {
        *self
            .flags
            .get()
            .unwrap_or_else(|| panic!("struct '{}' flags not computed yet", self.name))
    }
}

impl fmt::Debug for StructDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "struct {}", self.name)
    }
}

// ============================================================================
// Callables
// ============================================================================

#[derive(Debug, Clone)]
pub struct Param {
    pub name: RName,
    pub ty: RType,
}

/// Resolved signature of a function or query.
#[derive(Debug)]
pub struct FnHeader {
    pub params: Vec<Param>,
    pub ret: RType,
}

/// The sealed call frame of a compiled body.
#[derive(Debug, Clone, Copy)]
pub struct RCallFrame {
    /// Number of local variable slots.
    pub size: u32,
}

/// A compiled body plus its frame.
#[derive(Debug)]
pub struct RFnBody {
    pub frame: RCallFrame,
    pub body: RStatement,
}

macro_rules! late_slot {
    ($self:ident, $field:ident, $what:literal) => {
        $self
            .$field
            .get()
            .unwrap_or_else(|| panic!(concat!("'{}' ", $what, " not resolved yet"), $self.name))
    };
}

pub struct FunctionDef {
    pub name: QualifiedName,
    pub def_hash: DefHash,
    header: OnceCell<FnHeader>,
    body: OnceCell<RFnBody>,
}

impl FunctionDef {
    pub fn new(name: QualifiedName) -> FunctionDef {
        let def_hash = DefHash::of(&name);
        FunctionDef {
            name,
            def_hash,
            header: OnceCell::new(),
            body: OnceCell::new(),
        }
    }

    pub fn set_header(&self, header: FnHeader) {
        assert!(self.header.set(header).is_ok(), "function '{}' header set twice", self.name);
    }

    pub fn header(&self) -> &FnHeader {
        late_slot!(self, header, "header")
    }

    /// Whether signature resolution succeeded.
    pub fn has_header(&self) -> bool {
        self.header.get().is_some()
    }

    pub fn set_body(&self, body: RFnBody) {
        assert!(self.body.set(body).is_ok(), "function '{}' body set twice", self.name);
    }

    pub fn body(&self) -> &RFnBody {
        late_slot!(self, body, "body")
    }

    /// Whether the body was successfully compiled. A definition that failed
    /// compiles to an error marker and stays body-less.
    pub fn has_body(&self) -> bool {
        self.body.get().is_some()
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}", self.name)
    }
}

pub struct OperationDef {
    pub name: QualifiedName,
    pub mount: MountName,
    pub def_hash: DefHash,
    params: OnceCell<Vec<Param>>,
    body: OnceCell<RFnBody>,
}

impl OperationDef {
    pub fn new(name: QualifiedName, mount: MountName) -> OperationDef {
        let def_hash = DefHash::of(&name);
        OperationDef {
            name,
            mount,
            def_hash,
            params: OnceCell::new(),
            body: OnceCell::new(),
        }
    }

    pub fn set_params(&self, params: Vec<Param>) {
        assert!(self.params.set(params).is_ok(), "operation '{}' params set twice", self.name);
    }

    pub fn params(&self) -> &[Param] {
        late_slot!(self, params, "params")
    }

    pub fn has_params(&self) -> bool {
        self.params.get().is_some()
    }

    pub fn set_body(&self, body: RFnBody) {
        assert!(self.body.set(body).is_ok(), "operation '{}' body set twice", self.name);
    }

    pub fn body(&self) -> &RFnBody {
        late_slot!(self, body, "body")
    }
}

impl fmt::Debug for OperationDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation {}", self.name)
    }
}

pub struct QueryDef {
    pub name: QualifiedName,
    pub mount: MountName,
    pub def_hash: DefHash,
    header: OnceCell<FnHeader>,
    body: OnceCell<RFnBody>,
}

impl QueryDef {
    pub fn new(name: QualifiedName, mount: MountName) -> QueryDef {
        let def_hash = DefHash::of(&name);
        QueryDef {
            name,
            mount,
            def_hash,
            header: OnceCell::new(),
            body: OnceCell::new(),
        }
    }

    pub fn set_header(&self, header: FnHeader) {
        assert!(self.header.set(header).is_ok(), "query '{}' header set twice", self.name);
    }

    pub fn header(&self) -> &FnHeader {
        late_slot!(self, header, "header")
    }

    pub fn has_header(&self) -> bool {
        self.header.get().is_some()
    }

    pub fn set_body(&self, body: RFnBody) {
        assert!(self.body.set(body).is_ok(), "query '{}' body set twice", self.name);
    }

    pub fn body(&self) -> &RFnBody {
        late_slot!(self, body, "body")
    }
}

impl fmt::Debug for QueryDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query {}", self.name)
    }
}

// ============================================================================
// Constants
// ============================================================================

pub struct ConstantDef {
    pub name: QualifiedName,
    pub def_hash: DefHash,
    content: OnceCell<(RType, Value)>,
}

impl ConstantDef {
    pub fn new(name: QualifiedName) -> ConstantDef {
        let def_hash = DefHash::of(&name);
        ConstantDef {
            name,
            def_hash,
            content: OnceCell::new(),
        }
    }

    pub fn set_content(&self, ty: RType, value: Value) {
        assert!(
            self.content.set((ty, value)).is_ok(),
            "constant '{}' evaluated twice",
            self.name
        );
    }

    /// `None` while not yet evaluated (or failed to evaluate).
    pub fn content(&self) -> Option<&(RType, Value)> {
        self.content.get()
    }
}

impl fmt::Debug for ConstantDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "const {}", self.name)
    }
}

// ============================================================================
// Modules and the app
// ============================================================================

/// The frozen contents of one compiled module.
#[derive(Debug, Default)]
pub struct RModule {
    pub name: ModuleName,
    pub entities: Vec<Rc<EntityDef>>,
    pub structs: Vec<Rc<StructDef>>,
    pub functions: Vec<Rc<FunctionDef>>,
    pub operations: Vec<Rc<OperationDef>>,
    pub queries: Vec<Rc<QueryDef>>,
    pub constants: Vec<Rc<ConstantDef>>,
}

/// The frozen program: per-module contents plus app-wide lookup maps keyed by
/// full qualified name.
#[derive(Debug, Default)]
pub struct RApp {
    pub modules: Vec<RModule>,
    pub entities: FxHashMap<String, Rc<EntityDef>>,
    pub operations: FxHashMap<String, Rc<OperationDef>>,
    pub queries: FxHashMap<String, Rc<QueryDef>>,
}

impl RApp {
    pub fn assemble(modules: Vec<RModule>) -> RApp {
        let mut app = RApp {
            modules,
            ..RApp::default()
        };
        for m in &app.modules {
            for e in &m.entities {
                app.entities.insert(e.name.str(), e.clone());
            }
            for o in &m.operations {
                app.operations.insert(o.name.str(), o.clone());
            }
            for q in &m.queries {
                app.queries.insert(q.name.str(), q.clone());
            }
        }
        app
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::ModuleName;

    fn qname(s: &str) -> QualifiedName {
        QualifiedName::new(ModuleName::root(), vec![RName::of(s)])
    }

    #[test]
    fn entity_body_lifecycle() {
        let e = EntityDef::new(qname("user"), MountName::new(vec![RName::of("user")]));
        e.set_body(EntityBody {
            attributes: vec![Rc::new(Attribute::new(RName::of("name"), RType::Text, false, false))],
            keys: vec![],
            indexes: vec![],
        });
        assert_eq!(e.attributes().len(), 1);
        assert!(e.attribute(&RName::of("name")).is_some());
        assert!(e.attribute(&RName::of("age")).is_none());
    }

    #[test]
    #[should_panic(expected = "body not resolved")]
    fn entity_body_read_before_set_panics() {
        let e = EntityDef::new(qname("user"), MountName::empty());
        let _ = e.attributes();
    }

    #[test]
    #[should_panic(expected = "set twice")]
    fn struct_attrs_sealed_once() {
        let s = StructDef::new(qname("rec"));
        s.set_attributes(vec![]);
        s.set_attributes(vec![]);
    }

    #[test]
    fn constant_content() {
        let c = ConstantDef::new(qname("max_age"));
        assert!(c.content().is_none());
        c.set_content(RType::Integer, Value::Integer(120));
        assert_eq!(c.content(), Some(&(RType::Integer, Value::Integer(120))));
    }
}
