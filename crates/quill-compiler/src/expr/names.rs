//! Name expression compilation.
//!
//! Resolution order for a bare name: attributes of the innermost
//! at-expression, then local variables (with definite-initialization
//! checking and nullability narrowing), then the file's namespace view,
//! then the system namespace.

use quill_core::{CError, CResult, EvalExpr, RType, SqlExpr};
use quill_parser::ast;
use quill_registry::{NsDef, NsValue};

use crate::const_eval;
use crate::frame::FnCompiler;
use crate::scope::{self, NsLookup};
use crate::varfact::{ExprVarFacts, VarFact, VarFacts};
use crate::vexpr::{CExpr, CValue};

impl FnCompiler<'_> {
    pub(super) fn compile_name(&mut self, name: &ast::Name, facts: &VarFacts) -> CResult<CExpr> {
        // attributes of the iterated entity shadow everything inside a
        // where-block
        if let Some(entity) = &self.at_entity
            && let Some(body) = entity.try_body()
            && let Some(attr) = body.attributes.iter().find(|a| a.name == name.str)
        {
            let sql = SqlExpr::Attr {
                base: Box::new(SqlExpr::EntityRef {
                    entity: entity.clone(),
                }),
                attr: attr.clone(),
            };
            return Ok(CExpr::Value(CValue::db(
                name.pos,
                attr.ty.clone(),
                sql,
                ExprVarFacts::empty(),
            )));
        }

        if let Some(var) = self.lookup_var(&name.str) {
            if facts.inited(&var.uid) != VarFact::Yes {
                return Err(CError::new(
                    name.pos,
                    format!("expr_var_uninit:{}", name.str),
                    format!("Variable '{}' might be uninitialized", name.str),
                ));
            }
            // smart type: a nullable variable known non-null here reads at
            // its narrowed type without changing the declared type
            let ty = match &var.ty {
                RType::Nullable(inner) if facts.nulled(&var.uid) == VarFact::No => {
                    (**inner).clone()
                }
                t => t.clone(),
            };
            let expr = EvalExpr::LocalVar {
                name: var.name.clone(),
                slot: var.slot,
                ty: ty.clone(),
            };
            return Ok(CExpr::Value(
                CValue::eval(name.pos, ty, expr, ExprVarFacts::empty()).with_var(var.uid.clone()),
            ));
        }

        let lookup = scope::lookup_name(self.sess, self.fr, &name.str);
        match lookup {
            Some(NsLookup::Value(def)) => self.value_def_to_cexpr(name, def),
            Some(NsLookup::Function(def)) => {
                if let Some(dep) = &def.deprecated {
                    let note = scope::DeprecationNote {
                        pos: name.pos,
                        kind: "function",
                        name: name.str.as_str().to_string(),
                        dep: dep.clone(),
                    };
                    scope::report_deprecations(self.sess, &[note]);
                }
                Ok(CExpr::Fn {
                    name: name.clone(),
                    func: def.def,
                })
            }
            Some(NsLookup::Namespace { deprecated, ns }) => {
                if let Some(dep) = deprecated {
                    let note = scope::DeprecationNote {
                        pos: name.pos,
                        kind: "namespace",
                        name: name.str.as_str().to_string(),
                        dep,
                    };
                    scope::report_deprecations(self.sess, &[note]);
                }
                Ok(CExpr::Ns {
                    pos: name.pos,
                    name: name.str.as_str().to_string(),
                    ns,
                })
            }
            None => Err(CError::unknown_name(name.pos, name.str.as_str())),
        }
    }

    /// Turn a value-kind namespace entry into an expression.
    pub(super) fn value_def_to_cexpr(
        &mut self,
        name: &ast::Name,
        def: NsDef<NsValue>,
    ) -> CResult<CExpr> {
        if let Some(dep) = &def.deprecated {
            let note = scope::DeprecationNote {
                pos: name.pos,
                kind: "value",
                name: name.str.as_str().to_string(),
                dep: dep.clone(),
            };
            scope::report_deprecations(self.sess, &[note]);
        }
        match def.def {
            NsValue::Constant(c) => {
                let (ty, value) = const_eval::force_constant(self.sess, &c, name.pos)?;
                Ok(CExpr::Value(CValue::eval(
                    name.pos,
                    ty,
                    EvalExpr::Constant(value),
                    ExprVarFacts::empty(),
                )))
            }
            NsValue::Entity(_) => Err(CError::new(
                name.pos,
                "expr_novalue:entity",
                format!("Entity '{}' is not a value; use it in an at-expression", name.str),
            )),
            // a struct name awaits its construction call
            NsValue::Struct(s) => Ok(CExpr::Fn {
                name: name.clone(),
                func: quill_registry::NsFunction::StructCtor(s),
            }),
        }
    }
}
