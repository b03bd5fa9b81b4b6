//! Call compilation: system function cases, user functions, member
//! functions and struct construction.
//!
//! A call is routed to the predicate form only when an argument (or the
//! member-call receiver) carries a genuine predicate form; purely
//! evaluation-form calls never attempt predicate compilation. A routed call
//! whose case has no predicate implementation fails with the
//! not-SQL-representable diagnostic. When a member call compiles to its
//! predicate form, the receiver is prepended to the argument list.

use std::rc::Rc;

use quill_core::{
    CError, CResult, EvalExpr, EvalSysFn, FunctionDef, RMemberOp, RType, Span, SqlExpr, UnaryOp,
};
use quill_parser::ast;
use quill_registry::{Deprecation, NsFunction, SysFnId};

use crate::cases::{ArgTypeMatch, CaseMatchKind};
use crate::frame::FnCompiler;
use crate::lib_fns;
use crate::scope::{self, DeprecationNote};
use crate::varfact::{ExprVarFacts, VarFacts};
use crate::vexpr::{CExpr, CValue};

impl FnCompiler<'_> {
    pub(super) fn compile_call(
        &mut self,
        pos: Span,
        base: &ast::Expr,
        args: &[ast::CallArg],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        match self.compile_expr(base, facts)? {
            CExpr::Fn { name, func } => match func {
                NsFunction::Sys(id) => self.compile_sys_call(pos, &name, id, args, facts),
                NsFunction::User(f) => self.compile_user_call(pos, &name, f, args, facts),
                NsFunction::StructCtor(s) => self.compile_struct_ctor(pos, &name, s, args, facts),
                NsFunction::Query(_) => Err(CError::new(
                    name.pos,
                    format!("expr_call:query:{}", name.str),
                    format!("Query '{}' cannot be called from code", name.str),
                )),
                NsFunction::Operation(_) => Err(CError::new(
                    name.pos,
                    format!("expr_call:operation:{}", name.str),
                    format!("Operation '{}' cannot be called from code", name.str),
                )),
            },
            CExpr::MemberFn { base, name, safe } => {
                self.compile_member_call(pos, base, &name, safe, args, facts)
            }
            CExpr::Value(v) => Err(CError::new(
                pos,
                format!("expr_call_nofn:{}", v.ty.name()),
                format!("Type '{}' is not callable", v.ty),
            )),
            CExpr::Ns { name, .. } => Err(CError::new(
                pos,
                "expr_call_nofn:namespace",
                format!("Namespace '{name}' is not callable"),
            )),
        }
    }

    /// Compile positional call arguments, threading facts left to right.
    /// Named arguments are only meaningful for construction.
    fn compile_call_args(
        &mut self,
        fn_name: &str,
        args: &[ast::CallArg],
        facts: &VarFacts,
    ) -> CResult<Vec<CValue>> {
        let mut cur = facts.clone();
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            if let Some(name) = &arg.name {
                return Err(CError::new(
                    name.pos,
                    format!("expr_call_namedarg:{fn_name}:{}", name.str),
                    format!("Function '{fn_name}' takes no named arguments"),
                ));
            }
            let v = self.compile_expr_value(&arg.expr, &cur)?;
            cur.put_mut(&v.facts.post_facts);
            values.push(v);
        }
        Ok(values)
    }

    fn report_deprecated_fn(&mut self, pos: Span, name: &str, dep: &Deprecation) {
        scope::report_deprecations(
            self.sess,
            &[DeprecationNote {
                pos,
                kind: "function",
                name: name.to_string(),
                dep: dep.clone(),
            }],
        );
    }

    fn compile_sys_call(
        &mut self,
        pos: Span,
        name: &ast::Name,
        id: SysFnId,
        args: &[ast::CallArg],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let values = self.compile_call_args(name.str.as_str(), args, facts)?;
        let arg_types: Vec<RType> = values.iter().map(|v| v.ty.clone()).collect();

        let cases = lib_fns::global_cases(id);
        let Some(m) = cases.iter().find_map(|c| c.match_args(&arg_types)) else {
            return Err(err_no_match(name.pos, name.str.as_str(), &arg_types));
        };
        if let Some(dep) = &m.deprecated {
            self.report_deprecated_fn(name.pos, name.str.as_str(), &dep.clone());
        }

        let db = values.iter().any(CValue::is_db);
        let values = apply_conversions(values, &m.conversions);
        let sub: Vec<&ExprVarFacts> = values.iter().map(|v| &v.facts).collect();
        let sub_facts = ExprVarFacts::for_sub_exprs(&sub);

        let value = match m.kind {
            CaseMatchKind::Fixed { eval, sql, ret } => {
                if db {
                    let Some(sql) = sql else {
                        return Err(CError::fn_no_sql(name.pos, name.str.as_str()));
                    };
                    let sql_args = values.into_iter().map(CValue::to_sql_expr).collect();
                    CValue::db(
                        pos,
                        ret.clone(),
                        SqlExpr::SysCall {
                            func: sql,
                            args: sql_args,
                            ty: ret,
                        },
                        sub_facts,
                    )
                } else {
                    build_eval_sys_call(pos, eval, values, ret, sub_facts)?
                }
            }
            CaseMatchKind::RequireBoolean => {
                require_not_db(db, name)?;
                build_eval_sys_call(pos, EvalSysFn::Require, values, RType::Unit, sub_facts)?
            }
            CaseMatchKind::RequireNullable { ret } => {
                require_not_db(db, name)?;
                let facts = ExprVarFacts::for_null_cast(
                    sub_facts.post_facts.clone(),
                    values[0].var_uid.as_ref(),
                );
                build_eval_sys_call(pos, EvalSysFn::RequireNotNull, values, ret, facts)?
            }
            CaseMatchKind::EmptyNullable { negated } => {
                require_not_db(db, name)?;
                // empty(x) true means x is null; exists(x) true means not
                let facts = ExprVarFacts::for_null_check(values[0].var_uid.as_ref(), !negated)
                    .and(&sub_facts);
                let func = if negated { EvalSysFn::Exists } else { EvalSysFn::Empty };
                build_eval_sys_call(pos, func, values, RType::Boolean, facts)?
            }
            CaseMatchKind::EmptyCollection { negated } => {
                require_not_db(db, name)?;
                let inner =
                    build_eval_sys_call(pos, EvalSysFn::CollectionEmpty, values, RType::Boolean, sub_facts)?;
                if negated {
                    let facts = inner.facts.clone();
                    let node = EvalExpr::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(inner.to_eval_expr()?),
                        ty: RType::Boolean,
                    };
                    CValue::eval(pos, RType::Boolean, node, facts)
                } else {
                    inner
                }
            }
            CaseMatchKind::Print => {
                require_not_db(db, name)?;
                build_eval_sys_call(pos, EvalSysFn::Print, values, RType::Unit, sub_facts)?
            }
        };
        Ok(CExpr::Value(value))
    }

    fn compile_user_call(
        &mut self,
        pos: Span,
        name: &ast::Name,
        func: Rc<FunctionDef>,
        args: &[ast::CallArg],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let values = self.compile_call_args(name.str.as_str(), args, facts)?;
        if !func.has_header() {
            // signature resolution failed; the error is already reported
            return Ok(CExpr::Value(CValue::error(pos)));
        }
        let header = func.header();

        if values.len() != header.params.len() {
            return Err(CError::new(
                name.pos,
                format!(
                    "expr_call_argcnt:{}:{}:{}",
                    name.str,
                    header.params.len(),
                    values.len()
                ),
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    name.str,
                    header.params.len(),
                    values.len()
                ),
            ));
        }

        let mut eval_args = Vec::with_capacity(values.len());
        let mut sub_facts = Vec::with_capacity(values.len());
        for (i, (v, p)) in values.into_iter().zip(header.params.iter()).enumerate() {
            if v.is_db() {
                // user functions declare no predicate implementation
                return Err(CError::fn_no_sql(name.pos, name.str.as_str()));
            }
            let v = if p.ty.is_assignable_from(&v.ty) {
                v
            } else if p.ty == RType::Decimal && v.ty == RType::Integer {
                v.promote_integer_to_decimal()
            } else {
                return Err(CError::new(
                    v.pos,
                    format!(
                        "expr_call_argtype:{}:{i}:{}:{}",
                        name.str,
                        p.ty.name(),
                        v.ty.name()
                    ),
                    format!(
                        "Argument {i} of '{}': expected '{}', got '{}'",
                        name.str, p.ty, v.ty
                    ),
                ));
            };
            sub_facts.push(v.facts.clone());
            eval_args.push(v.to_eval_expr()?);
        }

        let ret = header.ret.clone();
        let facts_refs: Vec<&ExprVarFacts> = sub_facts.iter().collect();
        let node = EvalExpr::UserCall {
            func: func.clone(),
            args: eval_args,
            ty: ret.clone(),
        };
        Ok(CExpr::Value(CValue::eval(
            pos,
            ret,
            node,
            ExprVarFacts::for_sub_exprs(&facts_refs),
        )))
    }

    fn compile_member_call(
        &mut self,
        pos: Span,
        base: CValue,
        name: &ast::Name,
        safe: bool,
        args: &[ast::CallArg],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let recv_ty = if safe {
            base.ty.unwrap_nullable().clone()
        } else {
            base.ty.clone()
        };
        let full_name = format!("{}.{}", recv_ty.name(), name.str);

        let values = self.compile_call_args(&full_name, args, facts)?;
        let arg_types: Vec<RType> = values.iter().map(|v| v.ty.clone()).collect();

        let cases = lib_fns::member_cases(&recv_ty, &name.str);
        let Some(m) = cases.iter().find_map(|c| c.match_args(&arg_types)) else {
            return Err(err_no_match(name.pos, &full_name, &arg_types));
        };
        if let Some(dep) = &m.deprecated {
            self.report_deprecated_fn(name.pos, &full_name, &dep.clone());
        }

        let db = base.is_db() || values.iter().any(CValue::is_db);
        let values = apply_conversions(values, &m.conversions);

        let mut sub: Vec<&ExprVarFacts> = vec![&base.facts];
        sub.extend(values.iter().map(|v| &v.facts));
        let sub_facts = ExprVarFacts::for_sub_exprs(&sub);

        if db {
            if safe {
                return Err(CError::sql_not_allowed(name.pos));
            }
            let Some(sql) = m.sql else {
                return Err(CError::fn_no_sql(name.pos, &full_name));
            };
            // the receiver becomes the implicit first argument
            let mut sql_args = vec![base.to_sql_expr()];
            sql_args.extend(values.into_iter().map(CValue::to_sql_expr));
            let node = SqlExpr::SysCall {
                func: sql,
                args: sql_args,
                ty: m.ret.clone(),
            };
            return Ok(CExpr::Value(CValue::db(pos, m.ret, node, sub_facts)));
        }

        let ret = if safe {
            RType::nullable(m.ret.clone())
        } else {
            m.ret.clone()
        };
        let mut eval_args = Vec::with_capacity(values.len());
        for v in values {
            eval_args.push(v.to_eval_expr()?);
        }
        let node = EvalExpr::Member {
            base: Box::new(base.to_eval_expr()?),
            safe,
            op: RMemberOp::SysFn {
                func: m.eval,
                args: eval_args,
            },
            ty: ret.clone(),
        };
        Ok(CExpr::Value(CValue::eval(pos, ret, node, sub_facts)))
    }
}

fn apply_conversions(values: Vec<CValue>, conversions: &[ArgTypeMatch]) -> Vec<CValue> {
    values
        .into_iter()
        .zip(conversions.iter())
        .map(|(v, c)| match c {
            ArgTypeMatch::Direct => v,
            ArgTypeMatch::IntegerToDecimal => v.promote_integer_to_decimal(),
        })
        .collect()
}

fn build_eval_sys_call(
    pos: Span,
    func: EvalSysFn,
    values: Vec<CValue>,
    ret: RType,
    facts: ExprVarFacts,
) -> CResult<CValue> {
    let mut args = Vec::with_capacity(values.len());
    for v in values {
        args.push(v.to_eval_expr()?);
    }
    Ok(CValue::eval(
        pos,
        ret.clone(),
        EvalExpr::SysCall {
            func,
            args,
            ty: ret,
        },
        facts,
    ))
}

fn require_not_db(db: bool, name: &ast::Name) -> CResult<()> {
    if db {
        Err(CError::fn_no_sql(name.pos, name.str.as_str()))
    } else {
        Ok(())
    }
}

fn err_no_match(pos: Span, name: &str, arg_types: &[RType]) -> CError {
    let short = arg_types
        .iter()
        .map(RType::name)
        .collect::<Vec<_>>()
        .join(",");
    CError::new(
        pos,
        format!("expr_call_argtypes:{name}:{short}"),
        format!("Function '{name}' undefined for arguments ({short})"),
    )
}
