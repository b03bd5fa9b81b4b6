//! Constant evaluation.
//!
//! Constants are forced on demand so cross-constant and forward references
//! work regardless of task order. The "currently evaluating" set is an
//! explicit, ordered stack on the session — never ambient state — which
//! both detects recursion and names the full cycle in the diagnostic.

use std::rc::Rc;

use ordered_float::OrderedFloat;

use quill_core::{
    BinaryOp, CError, CResult, ConstantDef, EvalExpr, RType, Span, UnaryOp, Value,
};

use crate::context::{DefinitionType, PendingConst, Session};
use crate::frame::FnCompiler;
use crate::type_resolver;
use crate::varfact::VarFacts;

/// The constant's type and value, evaluating it now if needed.
pub fn force_constant(
    sess: &mut Session,
    cdef: &Rc<ConstantDef>,
    use_pos: Span,
) -> CResult<(RType, Value)> {
    if let Some((ty, value)) = cdef.content() {
        return Ok((ty.clone(), value.clone()));
    }

    let hash = cdef.def_hash;
    let simple = cdef.name.simple().as_str().to_string();

    if sess.const_stack.iter().any(|(h, _)| *h == hash) {
        let mut path: Vec<&str> = sess.const_stack.iter().map(|(_, n)| n.as_str()).collect();
        path.push(&simple);
        return Err(CError::new(
            use_pos,
            format!("const:cycle:{simple}"),
            format!("Recursive constant definition: {}", path.join(" -> ")),
        ));
    }

    let Some(pending) = sess.pending_consts.remove(&hash) else {
        // evaluation already failed; the original error is reported
        return Err(CError::new(
            use_pos,
            format!("const:eval_failed:{simple}"),
            format!("Constant '{simple}' has no value"),
        ));
    };

    sess.const_stack.push((hash, simple));
    let res = eval_pending(sess, &pending);
    sess.const_stack.pop();

    let (ty, value) = res?;
    cdef.set_content(ty.clone(), value.clone());
    Ok((ty, value))
}

fn eval_pending(sess: &mut Session, pending: &PendingConst) -> CResult<(RType, Value)> {
    let declared = pending
        .ty
        .as_ref()
        .map(|t| type_resolver::resolve_type(sess, pending.fr, t))
        .transpose()?;

    let name = pending.def.name.module_level_str();
    let (pos, value_ty, expr) = {
        let mut fc = FnCompiler::new(
            &mut *sess,
            pending.fr,
            DefinitionType::Constant,
            &name,
            None,
        );
        let v = fc.compile_expr_value(&pending.expr, &VarFacts::empty())?;
        (v.pos, v.ty.clone(), v.to_eval_expr()?)
    };

    let mut value = eval_const_expr(pos, &expr)?;
    let ty = match declared {
        Some(t) => {
            if t == RType::Decimal && value_ty == RType::Integer {
                if let Value::Integer(v) = value {
                    value = Value::decimal(v as f64);
                }
            } else if !t.is_assignable_from(&value_ty) {
                return Err(CError::type_mismatch(
                    pos,
                    &t.name(),
                    &value_ty.name(),
                    &format!("Constant '{name}'"),
                ));
            }
            t
        }
        None => value_ty,
    };
    Ok((ty, value))
}

/// Fold a compiled expression to a constant value, or report that it is not
/// constant.
pub fn eval_const_expr(pos: Span, expr: &EvalExpr) -> CResult<Value> {
    match expr {
        EvalExpr::Constant(v) => Ok(v.clone()),
        EvalExpr::Binary {
            op, left, right, ..
        } => {
            let l = eval_const_expr(pos, left)?;
            let r = eval_const_expr(pos, right)?;
            eval_binary(pos, *op, l, r)
        }
        EvalExpr::Unary { op, expr, .. } => {
            let v = eval_const_expr(pos, expr)?;
            match (op, v) {
                (UnaryOp::Minus, Value::Integer(v)) => v
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| err_overflow(pos)),
                (UnaryOp::Minus, Value::Decimal(v)) => Ok(Value::Decimal(-v)),
                (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
                _ => Err(err_not_const(pos)),
            }
        }
        EvalExpr::Elvis { left, right, .. } => {
            let l = eval_const_expr(pos, left)?;
            if l == Value::Null {
                eval_const_expr(pos, right)
            } else {
                Ok(l)
            }
        }
        EvalExpr::NotNullAssert { expr, .. } => {
            let v = eval_const_expr(pos, expr)?;
            if v == Value::Null {
                Err(CError::new(pos, "const:null", "Constant expression is null"))
            } else {
                Ok(v)
            }
        }
        _ => Err(err_not_const(pos)),
    }
}

fn eval_binary(pos: Span, op: BinaryOp, l: Value, r: Value) -> CResult<Value> {
    use Value::*;
    match (op, l, r) {
        (BinaryOp::Eq, l, r) => Ok(Boolean(l == r)),
        (BinaryOp::Ne, l, r) => Ok(Boolean(l != r)),
        (BinaryOp::And, Boolean(a), Boolean(b)) => Ok(Boolean(a && b)),
        (BinaryOp::Or, Boolean(a), Boolean(b)) => Ok(Boolean(a || b)),
        (BinaryOp::Add, Text(a), Text(b)) => Ok(Text(a + &b)),
        (op, Integer(a), Integer(b)) => eval_int_binary(pos, op, a, b),
        (op, Decimal(a), Decimal(b)) => eval_dec_binary(pos, op, a, b),
        _ => Err(err_not_const(pos)),
    }
}

fn eval_int_binary(pos: Span, op: BinaryOp, a: i64, b: i64) -> CResult<Value> {
    let arith = |v: Option<i64>| v.map(Value::Integer).ok_or_else(|| err_overflow(pos));
    match op {
        BinaryOp::Lt => Ok(Value::Boolean(a < b)),
        BinaryOp::Gt => Ok(Value::Boolean(a > b)),
        BinaryOp::Le => Ok(Value::Boolean(a <= b)),
        BinaryOp::Ge => Ok(Value::Boolean(a >= b)),
        BinaryOp::Add => arith(a.checked_add(b)),
        BinaryOp::Sub => arith(a.checked_sub(b)),
        BinaryOp::Mul => arith(a.checked_mul(b)),
        BinaryOp::Div => {
            if b == 0 {
                Err(err_div0(pos))
            } else {
                arith(a.checked_div(b))
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                Err(err_div0(pos))
            } else {
                arith(a.checked_rem(b))
            }
        }
        _ => Err(err_not_const(pos)),
    }
}

fn eval_dec_binary(
    pos: Span,
    op: BinaryOp,
    a: OrderedFloat<f64>,
    b: OrderedFloat<f64>,
) -> CResult<Value> {
    match op {
        BinaryOp::Lt => Ok(Value::Boolean(a < b)),
        BinaryOp::Gt => Ok(Value::Boolean(a > b)),
        BinaryOp::Le => Ok(Value::Boolean(a <= b)),
        BinaryOp::Ge => Ok(Value::Boolean(a >= b)),
        BinaryOp::Add => Ok(Value::Decimal(a + b)),
        BinaryOp::Sub => Ok(Value::Decimal(a - b)),
        BinaryOp::Mul => Ok(Value::Decimal(a * b)),
        BinaryOp::Div => {
            if b == OrderedFloat(0.0) {
                Err(err_div0(pos))
            } else {
                Ok(Value::Decimal(a / b))
            }
        }
        _ => Err(err_not_const(pos)),
    }
}

fn err_not_const(pos: Span) -> CError {
    CError::new(
        pos,
        "const:not_const",
        "Expression is not a compile-time constant",
    )
}

fn err_overflow(pos: Span) -> CError {
    CError::new(pos, "const:overflow", "Integer overflow in constant expression")
}

fn err_div0(pos: Span) -> CError {
    CError::new(pos, "const:div0", "Division by zero in constant expression")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> EvalExpr {
        EvalExpr::Constant(Value::Integer(v))
    }

    fn bin(op: BinaryOp, l: EvalExpr, r: EvalExpr) -> EvalExpr {
        EvalExpr::Binary {
            op,
            left: Box::new(l),
            right: Box::new(r),
            ty: RType::Integer,
        }
    }

    #[test]
    fn folds_arithmetic() {
        let e = bin(BinaryOp::Add, int(2), bin(BinaryOp::Mul, int(3), int(4)));
        assert_eq!(eval_const_expr(Span::default(), &e).unwrap(), Value::Integer(14));
    }

    #[test]
    fn overflow_is_an_error() {
        let e = bin(BinaryOp::Add, int(i64::MAX), int(1));
        let err = eval_const_expr(Span::default(), &e).unwrap_err();
        assert_eq!(err.code, "const:overflow");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let e = bin(BinaryOp::Div, int(1), int(0));
        let err = eval_const_expr(Span::default(), &e).unwrap_err();
        assert_eq!(err.code, "const:div0");
    }

    #[test]
    fn non_constant_nodes_are_rejected() {
        let e = EvalExpr::LocalVar {
            name: quill_core::RName::of("x"),
            slot: 0,
            ty: RType::Integer,
        };
        let err = eval_const_expr(Span::default(), &e).unwrap_err();
        assert_eq!(err.code, "const:not_const");
    }

    #[test]
    fn elvis_folds_on_null() {
        let e = EvalExpr::Elvis {
            left: Box::new(EvalExpr::Constant(Value::Null)),
            right: Box::new(int(7)),
            ty: RType::Integer,
        };
        assert_eq!(eval_const_expr(Span::default(), &e).unwrap(), Value::Integer(7));
    }

    #[test]
    fn text_concat_folds() {
        let e = EvalExpr::Binary {
            op: BinaryOp::Add,
            left: Box::new(EvalExpr::Constant(Value::Text("ab".into()))),
            right: Box::new(EvalExpr::Constant(Value::Text("cd".into()))),
            ty: RType::Text,
        };
        assert_eq!(
            eval_const_expr(Span::default(), &e).unwrap(),
            Value::Text("abcd".into())
        );
    }
}
