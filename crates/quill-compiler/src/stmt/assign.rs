//! Assignment compilation: destination validation plus fact updates.

use quill_core::{CError, CResult, RDestination, RStatement, RType, Span};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::{VarFact, VarFacts};
use crate::vexpr::CValue;

use super::StmtResult;

impl FnCompiler<'_> {
    pub(super) fn compile_assign(
        &mut self,
        pos: Span,
        dst: &ast::Expr,
        expr: &ast::Expr,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        match dst {
            ast::Expr::Name(name) => self.compile_assign_var(pos, name, expr, facts),
            ast::Expr::Member { base, name, safe } => {
                self.compile_assign_member(pos, base, name, *safe, expr, facts)
            }
            other => Err(CError::new(
                other.pos(),
                "stmt_assign_dst",
                "Invalid assignment destination",
            )),
        }
    }

    fn compile_assign_var(
        &mut self,
        pos: Span,
        name: &ast::Name,
        expr: &ast::Expr,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        let Some(var) = self.lookup_var(&name.str) else {
            return Err(CError::unknown_name(name.pos, name.str.as_str()));
        };
        if !var.mutable {
            return Err(CError::new(
                name.pos,
                format!("stmt_assign_val:{}", name.str),
                format!("Cannot assign to immutable variable '{}'", name.str),
            ));
        }

        let value = self.compile_expr_value(expr, facts)?;
        let value = self.check_assign_type(pos, &var.ty, value, &name.str.to_string())?;

        let mut out = value.facts.post_facts.clone();
        out.put_mut(&VarFacts::of_inited(var.uid.clone(), VarFact::Yes));
        out.put_mut(&VarFacts::var_type_to_nulled(
            var.uid.clone(),
            &var.ty,
            &value.ty,
        ));

        Ok(StmtResult::new(
            RStatement::Assign {
                dst: RDestination::LocalVar {
                    name: var.name.clone(),
                    slot: var.slot,
                },
                expr: value.to_eval_expr()?,
            },
            out,
        ))
    }

    fn compile_assign_member(
        &mut self,
        pos: Span,
        base: &ast::Expr,
        name: &ast::Name,
        safe: bool,
        expr: &ast::Expr,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        if safe {
            return Err(CError::new(
                name.pos,
                "stmt_assign_dst",
                "'?.' is not a valid assignment destination",
            ));
        }

        let base_v = self.compile_expr_value(base, facts)?;
        match base_v.ty.clone() {
            RType::Struct(s) => {
                let Some(attrs) = s.try_attributes() else {
                    return Ok(StmtResult::new(RStatement::ErrorMarker, VarFacts::empty()));
                };
                let Some(index) = attrs.iter().position(|a| a.name == name.str) else {
                    return Err(CError::new(
                        name.pos,
                        format!("unknown_member:{}:{}", base_v.ty.name(), name.str),
                        format!("Type '{}' has no member '{}'", base_v.ty, name.str),
                    ));
                };
                let attr = attrs[index].clone();
                if !attr.mutable {
                    return Err(CError::new(
                        name.pos,
                        format!("attr_not_mutable:{}", name.str),
                        format!("Attribute '{}' is not mutable", name.str),
                    ));
                }

                let facts_v = facts.put(&base_v.facts.post_facts);
                let value = self.compile_expr_value(expr, &facts_v)?;
                let value =
                    self.check_assign_type(pos, &attr.ty, value, &name.str.to_string())?;

                let out = value.facts.post_facts.clone();
                Ok(StmtResult::new(
                    RStatement::Assign {
                        dst: RDestination::StructAttr {
                            base: base_v.to_eval_expr()?,
                            attr,
                            index,
                        },
                        expr: value.to_eval_expr()?,
                    },
                    out,
                ))
            }
            RType::Entity(_) => Err(CError::new(
                name.pos,
                "stmt_assign_entity_attr",
                "Entity attributes cannot be assigned here",
            )),
            RType::Error => Ok(StmtResult::new(RStatement::ErrorMarker, VarFacts::empty())),
            other => Err(CError::new(
                name.pos,
                format!("stmt_assign_dst:{}", other.name()),
                "Invalid assignment destination",
            )),
        }
    }

    fn check_assign_type(
        &self,
        pos: Span,
        dst: &RType,
        value: CValue,
        what: &str,
    ) -> CResult<CValue> {
        if dst.is_assignable_from(&value.ty) {
            Ok(value)
        } else if *dst == RType::Decimal && value.ty == RType::Integer {
            Ok(value.promote_integer_to_decimal())
        } else {
            Err(CError::type_mismatch(
                pos,
                &dst.name(),
                &value.ty.name(),
                &format!("Assignment to '{what}'"),
            ))
        }
    }
}
