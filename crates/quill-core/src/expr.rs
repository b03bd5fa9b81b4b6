//! The evaluation-form expression tree.
//!
//! One of the two families a source expression compiles into: directly
//! executable in-process nodes. The other family lives in [`crate::sql`].
//! The only place a predicate-form tree may appear inside an evaluation-form
//! tree is the [`EvalExpr::At`] node — the explicit materialize wrapper that
//! runs a database query and yields its rows as an in-process value.

use std::rc::Rc;

use crate::defs::{Attribute, EntityDef, FunctionDef, StructDef};
use crate::name::RName;
use crate::sql::SqlExpr;
use crate::types::RType;
use crate::value::Value;

/// Binary operators, shared by both expression families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
}

impl BinaryOp {
    pub fn code(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Not,
}

impl UnaryOp {
    pub fn code(&self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Not => "not",
        }
    }
}

/// System functions with an in-process implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalSysFn {
    Require,
    RequireNotNull,
    Empty,
    Exists,
    Abs,
    Min,
    Max,
    Print,
    IntegerFromText,
    IntToDecimal,
    ToText,
    ToHex,
    TextSize,
    TextUpperCase,
    TextLowerCase,
    ByteArraySize,
    CollectionSize,
    CollectionEmpty,
}

/// Cardinality of an at-expression; decides the result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCardinality {
    /// `@` — exactly one row.
    One,
    /// `@?` — zero or one row.
    ZeroOne,
    /// `@*` — any number of rows.
    ZeroMany,
    /// `@+` — at least one row.
    OneMany,
}

impl AtCardinality {
    pub fn many(&self) -> bool {
        matches!(self, AtCardinality::ZeroMany | AtCardinality::OneMany)
    }

    /// The at-result type for an item type.
    pub fn result_type(&self, item: RType) -> RType {
        match self {
            AtCardinality::One => item,
            AtCardinality::ZeroOne => RType::nullable(item),
            AtCardinality::ZeroMany | AtCardinality::OneMany => RType::list(item),
        }
    }
}

/// A materialized database query: entity, cardinality, optional where-clause
/// and optional projection, all in predicate form.
#[derive(Debug, Clone)]
pub struct AtQueryExpr {
    pub entity: Rc<EntityDef>,
    pub cardinality: AtCardinality,
    /// `None` means select-all.
    pub where_clause: Option<SqlExpr>,
    /// `None` selects the entity itself; `Some` projects an expression over
    /// the iterated row.
    pub what: Option<SqlExpr>,
    pub ty: RType,
}

/// Member operations on an evaluation-form base value.
#[derive(Debug, Clone)]
pub enum RMemberOp {
    TupleField { index: usize },
    StructAttr { attr: Rc<Attribute>, index: usize },
    /// Attribute of an entity object; reads from the database at run time.
    EntityAttr { attr: Rc<Attribute> },
    /// Member system function call; the base is the receiver.
    SysFn { func: EvalSysFn, args: Vec<EvalExpr> },
}

/// An in-process executable expression node.
#[derive(Debug, Clone)]
pub enum EvalExpr {
    Constant(Value),
    LocalVar {
        name: RName,
        slot: u32,
        ty: RType,
    },
    Binary {
        op: BinaryOp,
        left: Box<EvalExpr>,
        right: Box<EvalExpr>,
        ty: RType,
    },
    Unary {
        op: UnaryOp,
        expr: Box<EvalExpr>,
        ty: RType,
    },
    /// `left ?: right` — right evaluated only when left is null.
    Elvis {
        left: Box<EvalExpr>,
        right: Box<EvalExpr>,
        ty: RType,
    },
    /// `expr!!` — fails at run time when the operand is null.
    NotNullAssert {
        expr: Box<EvalExpr>,
        ty: RType,
    },
    SysCall {
        func: EvalSysFn,
        args: Vec<EvalExpr>,
        ty: RType,
    },
    UserCall {
        func: Rc<FunctionDef>,
        args: Vec<EvalExpr>,
        ty: RType,
    },
    /// Member access or member call; `safe` short-circuits null bases.
    Member {
        base: Box<EvalExpr>,
        safe: bool,
        op: RMemberOp,
        ty: RType,
    },
    Tuple {
        fields: Vec<EvalExpr>,
        ty: RType,
    },
    ListLiteral {
        elems: Vec<EvalExpr>,
        ty: RType,
    },
    /// Struct construction; `None` arguments fall back to the attribute's
    /// default expression at run time.
    CreateStruct {
        struct_def: Rc<StructDef>,
        args: Vec<Option<EvalExpr>>,
    },
    /// Entity row insertion; only legal inside operations.
    CreateEntity {
        entity: Rc<EntityDef>,
        args: Vec<(Rc<Attribute>, Option<EvalExpr>)>,
    },
    /// The materialize wrapper: runs a predicate-form query in-process.
    At(Box<AtQueryExpr>),
    /// Error-recovery marker; never executed.
    ErrorMarker {
        ty: RType,
    },
}

impl EvalExpr {
    pub fn error() -> EvalExpr {
        EvalExpr::ErrorMarker { ty: RType::Error }
    }

    pub fn ty(&self) -> RType {
        match self {
            EvalExpr::Constant(v) => v.ty(),
            EvalExpr::LocalVar { ty, .. }
            | EvalExpr::Binary { ty, .. }
            | EvalExpr::Unary { ty, .. }
            | EvalExpr::Elvis { ty, .. }
            | EvalExpr::NotNullAssert { ty, .. }
            | EvalExpr::SysCall { ty, .. }
            | EvalExpr::UserCall { ty, .. }
            | EvalExpr::Member { ty, .. }
            | EvalExpr::Tuple { ty, .. }
            | EvalExpr::ListLiteral { ty, .. }
            | EvalExpr::ErrorMarker { ty } => ty.clone(),
            EvalExpr::CreateStruct { struct_def, .. } => RType::Struct(struct_def.clone()),
            EvalExpr::CreateEntity { entity, .. } => RType::Entity(entity.clone()),
            EvalExpr::At(q) => q.ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinality_result_types() {
        assert_eq!(AtCardinality::One.result_type(RType::Text), RType::Text);
        assert_eq!(
            AtCardinality::ZeroOne.result_type(RType::Text),
            RType::nullable(RType::Text)
        );
        assert_eq!(
            AtCardinality::ZeroMany.result_type(RType::Text),
            RType::list(RType::Text)
        );
        assert!(AtCardinality::OneMany.many());
        assert!(!AtCardinality::One.many());
    }

    #[test]
    fn expr_types() {
        let e = EvalExpr::Constant(Value::Integer(7));
        assert_eq!(e.ty(), RType::Integer);
        assert_eq!(EvalExpr::error().ty(), RType::Error);
    }
}
