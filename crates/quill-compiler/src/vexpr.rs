//! Compiled expression values.
//!
//! `CValue` is what expression compilation produces: a resolved type, the
//! node in one of the two families, the variable facts the expression
//! established, and — for plain variable reads — the source binding, so
//! null checks on the value can narrow the variable.
//!
//! The form rules live here: an evaluation-form value converts to predicate
//! form freely (wrapped as an interpreted query parameter), while a genuine
//! predicate-form value can never convert back — that is the
//! `expr_sqlnotallowed` diagnostic.

use std::rc::Rc;

use quill_core::{
    CError, CResult, EvalExpr, EvalSysFn, RType, Span, SqlExpr, SqlSysFn, VarUid,
};
use quill_parser::ast;
use quill_registry::{Namespace, NsFunction};

use crate::varfact::ExprVarFacts;

#[derive(Debug, Clone)]
pub enum CValueKind {
    Eval(EvalExpr),
    /// A genuine predicate-form value (entity attribute, predicate operator
    /// over one, ...). Exists only inside database expression contexts.
    Db(SqlExpr),
}

/// A compiled expression value.
#[derive(Debug, Clone)]
pub struct CValue {
    pub pos: Span,
    pub ty: RType,
    pub kind: CValueKind,
    pub facts: ExprVarFacts,
    /// The variable this value reads, when it is a plain variable read.
    pub var_uid: Option<VarUid>,
}

impl CValue {
    pub fn eval(pos: Span, ty: RType, expr: EvalExpr, facts: ExprVarFacts) -> CValue {
        CValue {
            pos,
            ty,
            kind: CValueKind::Eval(expr),
            facts,
            var_uid: None,
        }
    }

    pub fn db(pos: Span, ty: RType, expr: SqlExpr, facts: ExprVarFacts) -> CValue {
        CValue {
            pos,
            ty,
            kind: CValueKind::Db(expr),
            facts,
            var_uid: None,
        }
    }

    /// Error-recovery value.
    pub fn error(pos: Span) -> CValue {
        CValue::eval(pos, RType::Error, EvalExpr::error(), ExprVarFacts::empty())
    }

    pub fn with_var(mut self, uid: VarUid) -> CValue {
        self.var_uid = Some(uid);
        self
    }

    /// Whether this value carries a genuine predicate form.
    pub fn is_db(&self) -> bool {
        matches!(self.kind, CValueKind::Db(_))
    }

    /// The evaluation-form node. A genuine predicate-form value has none.
    pub fn to_eval_expr(self) -> CResult<EvalExpr> {
        match self.kind {
            CValueKind::Eval(e) => Ok(e),
            CValueKind::Db(_) => Err(CError::sql_not_allowed(self.pos)),
        }
    }

    /// The predicate-form node; evaluation-form values become interpreted
    /// query parameters.
    pub fn to_sql_expr(self) -> SqlExpr {
        match self.kind {
            CValueKind::Db(e) => e,
            CValueKind::Eval(e) => SqlExpr::Interpreted(Box::new(e)),
        }
    }

    /// Apply the integer-to-decimal argument conversion.
    pub fn promote_integer_to_decimal(self) -> CValue {
        let pos = self.pos;
        let facts = self.facts.clone();
        match self.kind {
            CValueKind::Eval(e) => CValue::eval(
                pos,
                RType::Decimal,
                EvalExpr::SysCall {
                    func: EvalSysFn::IntToDecimal,
                    args: vec![e],
                    ty: RType::Decimal,
                },
                facts,
            ),
            CValueKind::Db(e) => CValue::db(
                pos,
                RType::Decimal,
                SqlExpr::SysCall {
                    func: SqlSysFn::IntToDecimal,
                    args: vec![e],
                    ty: RType::Decimal,
                },
                facts,
            ),
        }
    }
}

/// The result of compiling an expression: a value, or one of the
/// non-value expressions that only exist between a name and the
/// member/call access that consumes it.
pub enum CExpr {
    Value(CValue),
    /// A namespace; awaits member access.
    Ns {
        pos: Span,
        name: String,
        ns: Rc<Namespace>,
    },
    /// A function name; awaits the call.
    Fn {
        name: ast::Name,
        func: NsFunction,
    },
    /// A member function on a receiver; awaits the call.
    MemberFn {
        base: CValue,
        name: ast::Name,
        safe: bool,
    },
}

impl CExpr {
    pub fn pos(&self) -> Span {
        match self {
            CExpr::Value(v) => v.pos,
            CExpr::Ns { pos, .. } => *pos,
            CExpr::Fn { name, .. } => name.pos,
            CExpr::MemberFn { name, .. } => name.pos,
        }
    }

    fn kind_msg(&self) -> &'static str {
        match self {
            CExpr::Value(_) => "value",
            CExpr::Ns { .. } => "namespace",
            CExpr::Fn { .. } => "function",
            CExpr::MemberFn { .. } => "member function",
        }
    }

    /// This expression as a value; namespaces and uncalled functions are
    /// not values.
    pub fn into_value(self) -> CResult<CValue> {
        match self {
            CExpr::Value(v) => Ok(v),
            other => Err(CError::new(
                other.pos(),
                format!("expr_novalue:{}", other.kind_msg().replace(' ', "_")),
                format!("Expression is a {}, not a value", other.kind_msg()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::Value;

    #[test]
    fn eval_value_round_trips_to_sql_as_interpreted() {
        let v = CValue::eval(
            Span::default(),
            RType::Integer,
            EvalExpr::Constant(Value::Integer(1)),
            ExprVarFacts::empty(),
        );
        assert!(!v.is_db());
        let sql = v.to_sql_expr();
        assert!(matches!(sql, SqlExpr::Interpreted(_)));
    }

    #[test]
    fn db_value_cannot_become_eval() {
        let v = CValue::db(
            Span::default(),
            RType::Integer,
            SqlExpr::Constant(Value::Integer(1)),
            ExprVarFacts::empty(),
        );
        let err = v.to_eval_expr().unwrap_err();
        assert_eq!(err.code, "expr_sqlnotallowed");
    }

    #[test]
    fn promotion_builds_conversion_node() {
        let v = CValue::eval(
            Span::default(),
            RType::Integer,
            EvalExpr::Constant(Value::Integer(1)),
            ExprVarFacts::empty(),
        );
        let p = v.promote_integer_to_decimal();
        assert_eq!(p.ty, RType::Decimal);
        assert!(matches!(
            p.kind,
            CValueKind::Eval(EvalExpr::SysCall {
                func: EvalSysFn::IntToDecimal,
                ..
            })
        ));
    }
}
