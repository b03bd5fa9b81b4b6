//! Literal, tuple and list-literal compilation.

use quill_core::{CError, CResult, EvalExpr, RType, Span, TupleField, Value};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::{ExprVarFacts, VarFacts};
use crate::vexpr::{CExpr, CValue};

impl FnCompiler<'_> {
    pub(super) fn compile_literal(&mut self, pos: Span, lit: &ast::Literal) -> CResult<CExpr> {
        let value = match lit {
            ast::Literal::Null => Value::Null,
            ast::Literal::Boolean(b) => Value::Boolean(*b),
            ast::Literal::Integer(v) => Value::Integer(*v),
            ast::Literal::Decimal(v) => Value::decimal(*v),
            ast::Literal::Text(s) => Value::Text(s.clone()),
            ast::Literal::Bytes(b) => Value::ByteArray(b.clone()),
        };
        let ty = value.ty();
        Ok(CExpr::Value(CValue::eval(
            pos,
            ty,
            EvalExpr::Constant(value),
            ExprVarFacts::empty(),
        )))
    }

    pub(super) fn compile_tuple(
        &mut self,
        pos: Span,
        fields: &[(Option<ast::Name>, ast::Expr)],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let mut cur = facts.clone();
        let mut exprs = Vec::with_capacity(fields.len());
        let mut types = Vec::with_capacity(fields.len());
        let mut sub_facts = Vec::with_capacity(fields.len());

        for (name, fexpr) in fields {
            let v = self.compile_expr_value(fexpr, &cur)?;
            cur.put_mut(&v.facts.post_facts);
            types.push(TupleField {
                name: name.as_ref().map(|n| n.str.clone()),
                ty: v.ty.clone(),
            });
            sub_facts.push(v.facts.clone());
            exprs.push(v.to_eval_expr()?);
        }

        let ty = RType::Tuple(types);
        let facts_refs: Vec<&ExprVarFacts> = sub_facts.iter().collect();
        Ok(CExpr::Value(CValue::eval(
            pos,
            ty.clone(),
            EvalExpr::Tuple { fields: exprs, ty },
            ExprVarFacts::for_sub_exprs(&facts_refs),
        )))
    }

    pub(super) fn compile_list(
        &mut self,
        pos: Span,
        elems: &[ast::Expr],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        if elems.is_empty() {
            return Err(CError::new(
                pos,
                "expr_list_empty",
                "Cannot infer the element type of an empty list literal",
            ));
        }

        let mut cur = facts.clone();
        let mut exprs = Vec::with_capacity(elems.len());
        let mut sub_facts = Vec::with_capacity(elems.len());
        let mut elem_ty: Option<RType> = None;

        for e in elems {
            let v = self.compile_expr_value(e, &cur)?;
            cur.put_mut(&v.facts.post_facts);
            elem_ty = Some(match elem_ty {
                None => v.ty.clone(),
                Some(prev) => RType::common_type(&prev, &v.ty).ok_or_else(|| {
                    CError::new(
                        v.pos,
                        format!("expr_list_itemtype:{}:{}", prev.name(), v.ty.name()),
                        format!("List items have incompatible types: '{prev}' and '{}'", v.ty),
                    )
                })?,
            });
            sub_facts.push(v.facts.clone());
            exprs.push(v.to_eval_expr()?);
        }

        let ty = RType::list(elem_ty.unwrap());
        let facts_refs: Vec<&ExprVarFacts> = sub_facts.iter().collect();
        Ok(CExpr::Value(CValue::eval(
            pos,
            ty.clone(),
            EvalExpr::ListLiteral { elems: exprs, ty },
            ExprVarFacts::for_sub_exprs(&facts_refs),
        )))
    }
}
