//! Unary operator compilation.

use quill_core::{CError, CResult, EvalExpr, RType, Span, SqlExpr, UnaryOp};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::ExprVarFacts;
use crate::varfact::VarFacts;
use crate::vexpr::{CExpr, CValue};

impl FnCompiler<'_> {
    pub(super) fn compile_unary(
        &mut self,
        pos: Span,
        op: ast::UnOp,
        expr: &ast::Expr,
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let v = self.compile_expr_value(expr, facts)?;
        match op {
            ast::UnOp::Minus => {
                if !matches!(v.ty, RType::Integer | RType::Decimal | RType::Error) {
                    return Err(err_operand(pos, "-", &v.ty));
                }
                let facts = ExprVarFacts::for_sub_exprs(&[&v.facts]);
                let ty = v.ty.clone();
                Ok(CExpr::Value(build_unary(pos, UnaryOp::Minus, ty, v, facts)))
            }
            ast::UnOp::Not => {
                self.check_boolean(&v)?;
                // negation swaps the branch facts
                let facts = ExprVarFacts {
                    true_facts: v.facts.false_facts.clone(),
                    false_facts: v.facts.true_facts.clone(),
                    post_facts: v.facts.post_facts.clone(),
                };
                Ok(CExpr::Value(build_unary(
                    pos,
                    UnaryOp::Not,
                    RType::Boolean,
                    v,
                    facts,
                )))
            }
            ast::UnOp::NotNull => {
                if !v.ty.is_nullable() && !v.ty.is_error() {
                    return Err(err_operand(pos, "!!", &v.ty));
                }
                let ty = v.ty.unwrap_nullable().clone();
                let facts =
                    ExprVarFacts::for_null_cast(v.facts.post_facts.clone(), v.var_uid.as_ref());
                let node = EvalExpr::NotNullAssert {
                    expr: Box::new(v.to_eval_expr()?),
                    ty: ty.clone(),
                };
                Ok(CExpr::Value(CValue::eval(pos, ty, node, facts)))
            }
        }
    }
}

fn build_unary(pos: Span, op: UnaryOp, ty: RType, v: CValue, facts: ExprVarFacts) -> CValue {
    if v.is_db() {
        let node = SqlExpr::Unary {
            op,
            expr: Box::new(v.to_sql_expr()),
            ty: ty.clone(),
        };
        CValue::db(pos, ty, node, facts)
    } else {
        let node = EvalExpr::Unary {
            op,
            expr: Box::new(v.to_eval_expr().expect("eval operand")),
            ty: ty.clone(),
        };
        CValue::eval(pos, ty, node, facts)
    }
}

fn err_operand(pos: Span, op: &str, ty: &RType) -> CError {
    CError::new(
        pos,
        format!("unop_operand_type:{op}:{}", ty.name()),
        format!("Operator '{op}' undefined for type '{ty}'"),
    )
}
