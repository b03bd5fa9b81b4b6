//! Member access compilation.
//!
//! Three resolution layers, tried in order: tuple/struct field, entity
//! attribute, member function. The first layer producing a match wins.
//! Optional-access safety (`?.`) is checked once at the top, independent of
//! which layer matches. A member access directly on an at-expression with no
//! projection yet pushes the accessed attribute into the query instead.

use quill_core::{
    CError, CResult, EvalExpr, RMemberOp, RType, SqlExpr,
};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::{ExprVarFacts, VarFacts};
use crate::vexpr::{CExpr, CValue, CValueKind};

impl FnCompiler<'_> {
    pub(super) fn compile_member(
        &mut self,
        base: &ast::Expr,
        name: &ast::Name,
        safe: bool,
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let base_c = self.compile_expr(base, facts)?;
        match base_c {
            CExpr::Ns { pos, name: ns_name, ns } => {
                if safe {
                    return Err(CError::new(
                        name.pos,
                        "expr_safemem_ns",
                        format!("Cannot use '?.' on namespace '{ns_name}'"),
                    ));
                }
                if let Some(def) = ns.value(&name.str) {
                    let def = def.clone();
                    return self.value_def_to_cexpr(name, def);
                }
                if let Some(def) = ns.function(&name.str) {
                    return Ok(CExpr::Fn {
                        name: name.clone(),
                        func: def.def.clone(),
                    });
                }
                if let Some(def) = ns.namespace(&name.str) {
                    let inner = crate::scope::deref_nsref(self.sess, &def.def);
                    return Ok(CExpr::Ns {
                        pos,
                        name: format!("{ns_name}.{}", name.str),
                        ns: inner,
                    });
                }
                Err(CError::unknown_name(
                    name.pos,
                    &format!("{ns_name}.{}", name.str),
                ))
            }
            CExpr::Value(v) => self.compile_value_member(v, name, safe),
            other => {
                // a function or member function is not a value to project from
                other.into_value()?;
                unreachable!("into_value on non-value always errors")
            }
        }
    }

    fn compile_value_member(
        &mut self,
        v: CValue,
        name: &ast::Name,
        safe: bool,
    ) -> CResult<CExpr> {
        // projection: member access directly on an unprojected at-expression
        if let CValueKind::Eval(EvalExpr::At(q)) = &v.kind
            && q.what.is_none()
            && let Some(body) = q.entity.try_body()
            && let Some(attr) = body.attributes.iter().find(|a| a.name == name.str)
        {
            if safe {
                return Err(CError::new(
                    name.pos,
                    "expr_safemem_at",
                    "Cannot use '?.' on an at-expression result",
                ));
            }
            let mut q = (**q).clone();
            q.what = Some(SqlExpr::Attr {
                base: Box::new(SqlExpr::EntityRef {
                    entity: q.entity.clone(),
                }),
                attr: attr.clone(),
            });
            q.ty = q.cardinality.result_type(attr.ty.clone());
            let ty = q.ty.clone();
            let facts = v.facts.clone();
            return Ok(CExpr::Value(CValue::eval(
                v.pos,
                ty,
                EvalExpr::At(Box::new(q)),
                facts,
            )));
        }

        // optional-access safety, decided once for all layers
        let op_ty = if safe {
            match &v.ty {
                RType::Nullable(inner) => (**inner).clone(),
                RType::Error => return Ok(CExpr::Value(CValue::error(v.pos))),
                other => {
                    return Err(CError::new(
                        name.pos,
                        format!("expr_safemem_type:{}", other.name()),
                        format!("'?.' requires a nullable base, got '{other}'"),
                    ));
                }
            }
        } else {
            if v.ty.is_nullable() {
                return Err(CError::new(
                    name.pos,
                    format!("expr_mem_null:{}", name.str),
                    format!(
                        "Member access on nullable value; use '?.' or '!!' before '.{}'",
                        name.str
                    ),
                ));
            }
            v.ty.clone()
        };

        let wrap = |ty: RType| if safe { RType::nullable(ty) } else { ty };

        // layer 1: tuple field or struct attribute
        match &op_ty {
            RType::Tuple(fields) => {
                if let Some(index) = fields
                    .iter()
                    .position(|f| f.name.as_ref() == Some(&name.str))
                {
                    let ty = wrap(fields[index].ty.clone());
                    return self.member_value(v, safe, RMemberOp::TupleField { index }, ty);
                }
            }
            RType::Struct(s) => {
                if let Some(attrs) = s.try_attributes()
                    && let Some(index) = attrs.iter().position(|a| a.name == name.str)
                {
                    let attr = attrs[index].clone();
                    let ty = wrap(attr.ty.clone());
                    return self.member_value(v, safe, RMemberOp::StructAttr { attr, index }, ty);
                }
            }
            // layer 2: entity attribute
            RType::Entity(e) => {
                if let Some(body) = e.try_body()
                    && let Some(attr) = body.attributes.iter().find(|a| a.name == name.str)
                {
                    let attr = attr.clone();
                    if v.is_db() {
                        if safe {
                            return Err(CError::sql_not_allowed(name.pos));
                        }
                        let facts = v.facts.clone();
                        let pos = v.pos;
                        let ty = attr.ty.clone();
                        let node = SqlExpr::Attr {
                            base: Box::new(v.to_sql_expr()),
                            attr,
                        };
                        return Ok(CExpr::Value(CValue::db(pos, ty, node, facts)));
                    }
                    let ty = wrap(attr.ty.clone());
                    return self.member_value(v, safe, RMemberOp::EntityAttr { attr }, ty);
                }
            }
            _ => {}
        }

        // layer 3: member function, awaiting its call
        if !crate::lib_fns::member_cases(&op_ty, &name.str).is_empty() {
            return Ok(CExpr::MemberFn {
                base: v,
                name: name.clone(),
                safe,
            });
        }

        Err(CError::new(
            name.pos,
            format!("unknown_member:{}:{}", op_ty.name(), name.str),
            format!("Type '{op_ty}' has no member '{}'", name.str),
        ))
    }

    fn member_value(
        &mut self,
        v: CValue,
        safe: bool,
        op: RMemberOp,
        ty: RType,
    ) -> CResult<CExpr> {
        let pos = v.pos;
        let facts = ExprVarFacts::for_sub_exprs(&[&v.facts]);
        let node = EvalExpr::Member {
            base: Box::new(v.to_eval_expr()?),
            safe,
            op,
            ty: ty.clone(),
        };
        Ok(CExpr::Value(CValue::eval(pos, ty, node, facts)))
    }
}
