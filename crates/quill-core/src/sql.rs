//! The predicate-form expression tree.
//!
//! Nodes intended to execute inside a relational query rather than
//! in-process. Invariant: every genuine node references only
//! database-representable sub-nodes. An evaluation-form expression enters
//! this family only through [`SqlExpr::Interpreted`] — it is bound as a
//! parameter of the query, which is legal as long as the surrounding
//! combination decides so (the operator and statement compilers enforce
//! that, not the leaf).

use std::rc::Rc;

use crate::defs::{Attribute, EntityDef};
use crate::expr::{BinaryOp, EvalExpr, UnaryOp};
use crate::types::RType;
use crate::value::Value;

/// System functions with a genuine predicate-form implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlSysFn {
    Abs,
    Min,
    Max,
    IntToDecimal,
    TextSize,
    TextUpperCase,
    TextLowerCase,
}

/// A predicate-form expression node.
#[derive(Debug, Clone)]
pub enum SqlExpr {
    /// The iterated row of the at-expression's entity.
    EntityRef {
        entity: Rc<EntityDef>,
    },
    /// Attribute (column) of an entity-typed predicate expression.
    Attr {
        base: Box<SqlExpr>,
        attr: Rc<Attribute>,
    },
    Constant(Value),
    Binary {
        op: BinaryOp,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
        ty: RType,
    },
    Unary {
        op: UnaryOp,
        expr: Box<SqlExpr>,
        ty: RType,
    },
    SysCall {
        func: SqlSysFn,
        args: Vec<SqlExpr>,
        ty: RType,
    },
    /// An evaluation-form expression bound as a query parameter.
    Interpreted(Box<EvalExpr>),
}

impl SqlExpr {
    pub fn ty(&self) -> RType {
        match self {
            SqlExpr::EntityRef { entity } => RType::Entity(entity.clone()),
            SqlExpr::Attr { attr, .. } => attr.ty.clone(),
            SqlExpr::Constant(v) => v.ty(),
            SqlExpr::Binary { ty, .. }
            | SqlExpr::Unary { ty, .. }
            | SqlExpr::SysCall { ty, .. } => ty.clone(),
            SqlExpr::Interpreted(e) => e.ty(),
        }
    }

    /// Whether this tree contains any genuine (non-interpreted) predicate
    /// node. A tree that is interpreted all the way down never needs the
    /// database to evaluate.
    pub fn has_genuine_node(&self) -> bool {
        match self {
            SqlExpr::EntityRef { .. } | SqlExpr::Attr { .. } => true,
            SqlExpr::Constant(_) | SqlExpr::Interpreted(_) => false,
            SqlExpr::Binary { left, right, .. } => {
                left.has_genuine_node() || right.has_genuine_node()
            }
            SqlExpr::Unary { expr, .. } => expr.has_genuine_node(),
            SqlExpr::SysCall { args, .. } => args.iter().any(SqlExpr::has_genuine_node),
        }
    }
}
