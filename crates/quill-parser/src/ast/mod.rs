//! Syntax tree nodes.
//!
//! - [`def`]: modules, files and definitions
//! - [`ty`]: type references
//! - [`stmt`]: statements
//! - [`expr`]: expressions

pub mod def;
pub mod expr;
pub mod stmt;
pub mod ty;

pub use def::{
    AttrDef, ConstantDef, Def, EntityDef, EntityMember, FnBody, FunctionDef, ImportDef,
    KeyClause, ModuleAst, NamespaceDef, OperationDef, ParamDef, QueryDef, SourceFile, StructDef,
};
pub use expr::{BinOp, CallArg, Expr, Literal, UnOp};
pub use stmt::Stmt;
pub use ty::TypeRef;

use quill_core::{RName, Span};

/// An identifier with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub str: RName,
    pub pos: Span,
}

impl Name {
    /// Build a name from a known-valid identifier literal.
    pub fn new(s: &str, pos: Span) -> Name {
        Name {
            str: RName::of(s),
            pos,
        }
    }
}

/// A dotted name path, at least one segment long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualName {
    pub parts: Vec<Name>,
}

impl QualName {
    pub fn new(parts: Vec<Name>) -> QualName {
        assert!(!parts.is_empty(), "empty qualified name");
        QualName { parts }
    }

    /// Build a path from known-valid identifier literals.
    pub fn of(parts: &[&str], pos: Span) -> QualName {
        Self::new(parts.iter().map(|p| Name::new(p, pos)).collect())
    }

    pub fn pos(&self) -> Span {
        self.parts[0].pos
    }

    pub fn last(&self) -> &Name {
        self.parts.last().unwrap()
    }

    pub fn str(&self) -> String {
        self.parts
            .iter()
            .map(|n| n.str.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}
