//! Module, file and definition nodes.

use quill_core::{ModuleName, Span};

use super::expr::Expr;
use super::stmt::Stmt;
use super::ty::TypeRef;
use super::Name;

/// A parsed module: a name plus the parsed files belonging to it.
#[derive(Debug, Clone)]
pub struct ModuleAst {
    pub name: ModuleName,
    pub files: Vec<SourceFile>,
}

/// One source file's top-level definitions.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File path for diagnostics; optional for programmatically built trees.
    pub path: Option<String>,
    pub defs: Vec<Def>,
}

#[derive(Debug, Clone)]
pub enum Def {
    Entity(EntityDef),
    Struct(StructDef),
    Function(FunctionDef),
    Operation(OperationDef),
    Query(QueryDef),
    Constant(ConstantDef),
    Namespace(NamespaceDef),
    Import(ImportDef),
}

/// `entity name { ... }`
#[derive(Debug, Clone)]
pub struct EntityDef {
    pub name: Name,
    pub members: Vec<EntityMember>,
}

#[derive(Debug, Clone)]
pub enum EntityMember {
    Attr(AttrDef),
    Key(KeyClause),
    Index(KeyClause),
}

/// A `key a, b;` or `index a, b;` clause.
#[derive(Debug, Clone)]
pub struct KeyClause {
    pub pos: Span,
    pub attrs: Vec<Name>,
}

/// An attribute declaration. When `ty` is omitted the attribute's name must
/// itself resolve to a type (`user;` declares an attribute of type `user`).
#[derive(Debug, Clone)]
pub struct AttrDef {
    pub name: Name,
    pub ty: Option<TypeRef>,
    pub mutable: bool,
    /// Default-value expression.
    pub expr: Option<Expr>,
}

/// `struct name { ... }`
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: Name,
    pub attrs: Vec<AttrDef>,
}

#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: Name,
    pub ty: TypeRef,
}

/// Function/query body: expression-bodied (`= expr;`) or a block.
#[derive(Debug, Clone)]
pub enum FnBody {
    Short(Expr),
    Full(Vec<Stmt>),
}

/// `function name(params): ret { ... }`
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: Name,
    pub params: Vec<ParamDef>,
    pub ret: Option<TypeRef>,
    pub body: FnBody,
}

/// `operation name(params) { ... }`
#[derive(Debug, Clone)]
pub struct OperationDef {
    pub name: Name,
    pub params: Vec<ParamDef>,
    pub body: Vec<Stmt>,
}

/// `query name(params): ret = expr;`
#[derive(Debug, Clone)]
pub struct QueryDef {
    pub name: Name,
    pub params: Vec<ParamDef>,
    pub ret: Option<TypeRef>,
    pub body: FnBody,
}

/// `const name: ty = expr;`
#[derive(Debug, Clone)]
pub struct ConstantDef {
    pub name: Name,
    pub ty: Option<TypeRef>,
    pub expr: Expr,
}

/// `namespace name { ... }` — may be split across files; the pieces merge.
#[derive(Debug, Clone)]
pub struct NamespaceDef {
    pub name: Name,
    pub defs: Vec<Def>,
}

/// `import alias: module.path;` — file-private.
#[derive(Debug, Clone)]
pub struct ImportDef {
    pub pos: Span,
    pub alias: Option<Name>,
    pub module: Vec<Name>,
}

impl ImportDef {
    /// The name the import binds in the file: the explicit alias or the last
    /// module path segment.
    pub fn alias_name(&self) -> &Name {
        self.alias.as_ref().unwrap_or_else(|| {
            self.module.last().expect("import without module path")
        })
    }
}
