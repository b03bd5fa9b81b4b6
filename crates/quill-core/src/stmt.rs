//! The compiled statement tree.

use std::rc::Rc;

use crate::defs::Attribute;
use crate::expr::EvalExpr;
use crate::ids::BlockUid;
use crate::name::RName;

/// A resolved assignment destination.
#[derive(Debug, Clone)]
pub enum RDestination {
    LocalVar {
        name: RName,
        slot: u32,
    },
    StructAttr {
        base: EvalExpr,
        attr: Rc<Attribute>,
        index: usize,
    },
}

/// A compiled statement.
#[derive(Debug, Clone)]
pub enum RStatement {
    Expr(EvalExpr),
    VarDecl {
        name: RName,
        slot: u32,
        init: Option<EvalExpr>,
    },
    Assign {
        dst: RDestination,
        expr: EvalExpr,
    },
    Block {
        uid: BlockUid,
        stmts: Vec<RStatement>,
    },
    If {
        cond: EvalExpr,
        then_stmt: Box<RStatement>,
        else_stmt: Option<Box<RStatement>>,
    },
    While {
        cond: EvalExpr,
        body: Box<RStatement>,
    },
    Return(Option<EvalExpr>),
    /// Error-recovery marker for a statement that failed to compile.
    ErrorMarker,
}
