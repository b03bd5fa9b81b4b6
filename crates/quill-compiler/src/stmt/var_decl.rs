//! Variable declarations.

use quill_core::{CError, CResult, RStatement, RType};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::type_resolver;
use crate::varfact::{VarFact, VarFacts};

use super::StmtResult;

impl FnCompiler<'_> {
    pub(super) fn compile_val(
        &mut self,
        name: &ast::Name,
        ty: Option<&ast::TypeRef>,
        expr: &ast::Expr,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        self.compile_decl(name, ty, Some(expr), facts, false)
    }

    pub(super) fn compile_var(
        &mut self,
        name: &ast::Name,
        ty: Option<&ast::TypeRef>,
        expr: Option<&ast::Expr>,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        self.compile_decl(name, ty, expr, facts, true)
    }

    fn compile_decl(
        &mut self,
        name: &ast::Name,
        ty: Option<&ast::TypeRef>,
        expr: Option<&ast::Expr>,
        facts: &VarFacts,
        mutable: bool,
    ) -> CResult<StmtResult> {
        let declared_ty = ty
            .map(|t| type_resolver::resolve_type(self.sess, self.fr, t))
            .transpose()?;

        let value = expr
            .map(|e| self.compile_expr_value(e, facts))
            .transpose()?;

        let var_ty = match (&declared_ty, &value) {
            (Some(t), Some(v)) => {
                self.check_decl_type(name, t, &v.ty)?;
                t.clone()
            }
            (Some(t), None) => t.clone(),
            (None, Some(v)) => {
                if matches!(v.ty, RType::Null | RType::Unit) {
                    return Err(CError::new(
                        name.pos,
                        format!("stmt_var_type:{}", name.str),
                        format!("Cannot infer the type of '{}' from '{}'", name.str, v.ty),
                    ));
                }
                v.ty.clone()
            }
            (None, None) => {
                return Err(CError::new(
                    name.pos,
                    format!("stmt_var_notype:{}", name.str),
                    format!("Variable '{}' needs a type or an initializer", name.str),
                ));
            }
        };

        let value = match value {
            Some(v) if var_ty == RType::Decimal && v.ty == RType::Integer => {
                Some(v.promote_integer_to_decimal())
            }
            other => other,
        };

        let var = self.declare_var(name, var_ty.clone(), mutable)?;

        let mut out_facts = VarFacts::empty();
        let init = match value {
            Some(v) => {
                out_facts = v.facts.post_facts.clone();
                out_facts.put_mut(&VarFacts::of_inited(var.uid.clone(), VarFact::Yes));
                out_facts.put_mut(&VarFacts::var_type_to_nulled(
                    var.uid.clone(),
                    &var_ty,
                    &v.ty,
                ));
                Some(v.to_eval_expr()?)
            }
            None => None,
        };

        Ok(StmtResult::new(
            RStatement::VarDecl {
                name: name.str.clone(),
                slot: var.slot,
                init,
            },
            out_facts,
        ))
    }

    fn check_decl_type(&self, name: &ast::Name, dst: &RType, src: &RType) -> CResult<()> {
        let ok = dst.is_assignable_from(src) || (*dst == RType::Decimal && *src == RType::Integer);
        if ok {
            Ok(())
        } else {
            Err(CError::type_mismatch(
                name.pos,
                &dst.name(),
                &src.name(),
                &format!("Variable '{}'", name.str),
            ))
        }
    }
}
