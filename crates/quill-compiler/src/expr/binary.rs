//! Binary operator compilation.
//!
//! Form routing: when either operand carries a genuine predicate form the
//! operator node is predicate-form and the other side is wrapped as an
//! interpreted parameter; otherwise the node is evaluation-form. Null
//! comparisons split the fact context for nullability narrowing; `and`/`or`
//! thread their operand facts asymmetrically because the right side only
//! evaluates on one outcome.

use quill_core::{BinaryOp, CError, CResult, EvalExpr, RType, Span, SqlExpr};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::{ExprVarFacts, VarFacts};
use crate::vexpr::{CExpr, CValue};

/// How the operands type-check: the resulting type plus which side needs
/// the integer-to-decimal widening.
struct BinOpTypes {
    op: BinaryOp,
    result: RType,
    promote_left: bool,
    promote_right: bool,
}

impl FnCompiler<'_> {
    pub(super) fn compile_binary(
        &mut self,
        pos: Span,
        op: ast::BinOp,
        left: &ast::Expr,
        right: &ast::Expr,
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        match op {
            ast::BinOp::And => self.compile_and_or(pos, left, right, facts, true),
            ast::BinOp::Or => self.compile_and_or(pos, left, right, facts, false),
            ast::BinOp::Elvis => self.compile_elvis(pos, left, right, facts),
            _ => self.compile_binary_plain(pos, op, left, right, facts),
        }
    }

    fn compile_binary_plain(
        &mut self,
        pos: Span,
        op: ast::BinOp,
        left: &ast::Expr,
        right: &ast::Expr,
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let l = self.compile_expr_value(left, facts)?;
        let facts_r = facts.put(&l.facts.post_facts);
        let r = self.compile_expr_value(right, &facts_r)?;

        // `x == null` / `x != null`: a null check that narrows the variable
        let null_check = matches!(op, ast::BinOp::Eq | ast::BinOp::Ne)
            && (l.ty == RType::Null || r.ty == RType::Null);

        let types = bin_op_types(op, &l.ty, &r.ty).ok_or_else(|| {
            CError::new(
                pos,
                format!("binop_operand_type:{}:{}:{}", op_code(op), l.ty.name(), r.ty.name()),
                format!(
                    "Operator '{}' undefined for types '{}' and '{}'",
                    op_code(op),
                    l.ty,
                    r.ty
                ),
            )
        })?;

        let op_facts = if null_check {
            let checked = if l.ty == RType::Null { &r } else { &l };
            let null_if_true = op == ast::BinOp::Eq;
            ExprVarFacts::for_null_check(checked.var_uid.as_ref(), null_if_true)
                .and(&ExprVarFacts::for_sub_exprs(&[&l.facts, &r.facts]))
        } else {
            ExprVarFacts::for_sub_exprs(&[&l.facts, &r.facts])
        };

        let l = if types.promote_left {
            l.promote_integer_to_decimal()
        } else {
            l
        };
        let r = if types.promote_right {
            r.promote_integer_to_decimal()
        } else {
            r
        };

        let value = build_op_value(pos, types.op, types.result, l, r, op_facts);
        Ok(CExpr::Value(value))
    }

    fn compile_and_or(
        &mut self,
        pos: Span,
        left: &ast::Expr,
        right: &ast::Expr,
        facts: &VarFacts,
        is_and: bool,
    ) -> CResult<CExpr> {
        let l = self.compile_expr_value(left, facts)?;
        self.check_boolean(&l)?;

        // the right side only evaluates when the left decided nothing:
        // after `a and`, the left is known true; after `a or`, known false
        let branch = if is_and {
            &l.facts.true_facts
        } else {
            &l.facts.false_facts
        };
        let facts_r = facts.put(&l.facts.post_facts).put(branch);
        let r = self.compile_expr_value(right, &facts_r)?;
        self.check_boolean(&r)?;

        let op_facts = if is_and {
            ExprVarFacts {
                true_facts: l.facts.true_facts.and(&r.facts.true_facts),
                false_facts: VarFacts::empty(),
                post_facts: l.facts.post_facts.clone(),
            }
        } else {
            ExprVarFacts {
                true_facts: VarFacts::empty(),
                false_facts: l.facts.false_facts.and(&r.facts.false_facts),
                post_facts: l.facts.post_facts.clone(),
            }
        };

        let op = if is_and { BinaryOp::And } else { BinaryOp::Or };
        let value = build_op_value(pos, op, RType::Boolean, l, r, op_facts);
        Ok(CExpr::Value(value))
    }

    fn compile_elvis(
        &mut self,
        pos: Span,
        left: &ast::Expr,
        right: &ast::Expr,
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let l = self.compile_expr_value(left, facts)?;
        if !l.ty.is_nullable() && !l.ty.is_error() {
            return Err(CError::new(
                pos,
                format!("binop_elvis_type:{}", l.ty.name()),
                format!("Left side of '?:' must be nullable, got '{}'", l.ty),
            ));
        }

        let facts_r = facts.put(&l.facts.post_facts);
        let r = self.compile_expr_value(right, &facts_r)?;

        let inner = l.ty.unwrap_nullable().clone();
        let result = RType::common_type(&inner, &r.ty).ok_or_else(|| {
            CError::new(
                pos,
                format!("binop_elvis_types:{}:{}", inner.name(), r.ty.name()),
                format!("Incompatible types in '?:': '{inner}' and '{}'", r.ty),
            )
        })?;

        // right side is conditional, so only the left post-facts survive
        let op_facts = ExprVarFacts::of_post(l.facts.post_facts.clone());
        let node = EvalExpr::Elvis {
            left: Box::new(l.to_eval_expr()?),
            right: Box::new(r.to_eval_expr()?),
            ty: result.clone(),
        };
        Ok(CExpr::Value(CValue::eval(pos, result, node, op_facts)))
    }

    pub(crate) fn check_boolean(&mut self, v: &CValue) -> CResult<()> {
        if v.ty != RType::Boolean && !v.ty.is_error() {
            return Err(CError::new(
                v.pos,
                format!("expr_type_boolean:{}", v.ty.name()),
                format!("Expected 'boolean', got '{}'", v.ty),
            ));
        }
        Ok(())
    }
}

/// Emit a predicate-form node when either side is genuine predicate form,
/// an evaluation-form node otherwise.
fn build_op_value(
    pos: Span,
    op: BinaryOp,
    result: RType,
    l: CValue,
    r: CValue,
    facts: ExprVarFacts,
) -> CValue {
    if l.is_db() || r.is_db() {
        let node = SqlExpr::Binary {
            op,
            left: Box::new(l.to_sql_expr()),
            right: Box::new(r.to_sql_expr()),
            ty: result.clone(),
        };
        CValue::db(pos, result, node, facts)
    } else {
        // both evaluation form: unwrapping cannot fail
        let le = l.to_eval_expr().expect("eval operand");
        let re = r.to_eval_expr().expect("eval operand");
        let node = EvalExpr::Binary {
            op,
            left: Box::new(le),
            right: Box::new(re),
            ty: result.clone(),
        };
        CValue::eval(pos, result, node, facts)
    }
}

fn op_code(op: ast::BinOp) -> &'static str {
    match op {
        ast::BinOp::Eq => "==",
        ast::BinOp::Ne => "!=",
        ast::BinOp::Lt => "<",
        ast::BinOp::Gt => ">",
        ast::BinOp::Le => "<=",
        ast::BinOp::Ge => ">=",
        ast::BinOp::Add => "+",
        ast::BinOp::Sub => "-",
        ast::BinOp::Mul => "*",
        ast::BinOp::Div => "/",
        ast::BinOp::Mod => "%",
        ast::BinOp::And => "and",
        ast::BinOp::Or => "or",
        ast::BinOp::Elvis => "?:",
    }
}

fn core_op(op: ast::BinOp) -> BinaryOp {
    match op {
        ast::BinOp::Eq => BinaryOp::Eq,
        ast::BinOp::Ne => BinaryOp::Ne,
        ast::BinOp::Lt => BinaryOp::Lt,
        ast::BinOp::Gt => BinaryOp::Gt,
        ast::BinOp::Le => BinaryOp::Le,
        ast::BinOp::Ge => BinaryOp::Ge,
        ast::BinOp::Add => BinaryOp::Add,
        ast::BinOp::Sub => BinaryOp::Sub,
        ast::BinOp::Mul => BinaryOp::Mul,
        ast::BinOp::Div => BinaryOp::Div,
        ast::BinOp::Mod => BinaryOp::Mod,
        ast::BinOp::And => BinaryOp::And,
        ast::BinOp::Or => BinaryOp::Or,
        ast::BinOp::Elvis => unreachable!("elvis compiled separately"),
    }
}

fn bin_op_types(op: ast::BinOp, l: &RType, r: &RType) -> Option<BinOpTypes> {
    let core = core_op(op);
    let mk = |result: RType, pl: bool, pr: bool| {
        Some(BinOpTypes {
            op: core,
            result,
            promote_left: pl,
            promote_right: pr,
        })
    };

    if l.is_error() || r.is_error() {
        let result = match op {
            ast::BinOp::Eq
            | ast::BinOp::Ne
            | ast::BinOp::Lt
            | ast::BinOp::Gt
            | ast::BinOp::Le
            | ast::BinOp::Ge => RType::Boolean,
            _ => RType::Error,
        };
        return mk(result, false, false);
    }

    let numeric_promotion = |l: &RType, r: &RType| match (l, r) {
        (RType::Integer, RType::Integer) => Some((RType::Integer, false, false)),
        (RType::Decimal, RType::Decimal) => Some((RType::Decimal, false, false)),
        (RType::Integer, RType::Decimal) => Some((RType::Decimal, true, false)),
        (RType::Decimal, RType::Integer) => Some((RType::Decimal, false, true)),
        _ => None,
    };

    match op {
        ast::BinOp::Eq | ast::BinOp::Ne => {
            if RType::common_type(l, r).is_some() {
                mk(RType::Boolean, false, false)
            } else if let Some((_, pl, pr)) = numeric_promotion(l, r) {
                mk(RType::Boolean, pl, pr)
            } else {
                None
            }
        }
        ast::BinOp::Lt | ast::BinOp::Gt | ast::BinOp::Le | ast::BinOp::Ge => match (l, r) {
            (RType::Text, RType::Text) => mk(RType::Boolean, false, false),
            _ => {
                let (_, pl, pr) = numeric_promotion(l, r)?;
                mk(RType::Boolean, pl, pr)
            }
        },
        ast::BinOp::Add => match (l, r) {
            (RType::Text, RType::Text) => mk(RType::Text, false, false),
            _ => {
                let (res, pl, pr) = numeric_promotion(l, r)?;
                mk(res, pl, pr)
            }
        },
        ast::BinOp::Sub | ast::BinOp::Mul | ast::BinOp::Div | ast::BinOp::Mod => {
            let (res, pl, pr) = numeric_promotion(l, r)?;
            mk(res, pl, pr)
        }
        ast::BinOp::And | ast::BinOp::Or => {
            if *l == RType::Boolean && *r == RType::Boolean {
                mk(RType::Boolean, false, false)
            } else {
                None
            }
        }
        ast::BinOp::Elvis => unreachable!("elvis compiled separately"),
    }
}
