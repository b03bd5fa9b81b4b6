//! `create` expressions and struct construction.
//!
//! Both run the attribute matcher: explicit names first, then implicit
//! by-name/by-unique-type binding, with defaults filling the rest.
//! `create` additionally requires a database-modification context.

use std::rc::Rc;

use quill_core::{CResult, EvalExpr, RName, RType, Span, StructDef};
use quill_parser::ast;

use crate::attr::{self, CompiledArg};
use crate::frame::FnCompiler;
use crate::type_resolver;
use crate::varfact::{ExprVarFacts, VarFacts};
use crate::vexpr::{CExpr, CValue};

impl FnCompiler<'_> {
    pub(super) fn compile_create(
        &mut self,
        pos: Span,
        entity_path: &ast::QualName,
        args: &[ast::CallArg],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        if !self.def_type.db_update_allowed() {
            self.sess.msgs.error(
                pos,
                format!("no_db_update:{}", self.def_type.msg()),
                format!(
                    "Database modifications are not allowed in a {}",
                    self.def_type.msg()
                ),
            );
        }

        let entity = type_resolver::resolve_entity(self.sess, self.fr, entity_path)?;
        let Some(body) = entity.try_body() else {
            return Ok(CExpr::Value(CValue::error(pos)));
        };
        let attrs = body.attributes.clone();

        let (cargs, sub_facts) = self.compile_construction_args(args, facts)?;
        let slots = attr::match_attrs(pos, &entity.name.module_level_str(), &attrs, cargs)?;

        let ty = RType::Entity(entity.clone());
        let node = EvalExpr::CreateEntity {
            entity,
            args: attrs.into_iter().zip(slots).collect(),
        };
        let facts_refs: Vec<&ExprVarFacts> = sub_facts.iter().collect();
        Ok(CExpr::Value(CValue::eval(
            pos,
            ty,
            node,
            ExprVarFacts::for_sub_exprs(&facts_refs),
        )))
    }

    pub(super) fn compile_struct_ctor(
        &mut self,
        pos: Span,
        name: &ast::Name,
        struct_def: Rc<StructDef>,
        args: &[ast::CallArg],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let Some(attrs) = struct_def.try_attributes() else {
            return Ok(CExpr::Value(CValue::error(pos)));
        };
        let attrs = attrs.to_vec();

        let (cargs, sub_facts) = self.compile_construction_args(args, facts)?;
        let slots = attr::match_attrs(name.pos, name.str.as_str(), &attrs, cargs)?;

        let ty = RType::Struct(struct_def.clone());
        let node = EvalExpr::CreateStruct {
            struct_def,
            args: slots,
        };
        let facts_refs: Vec<&ExprVarFacts> = sub_facts.iter().collect();
        Ok(CExpr::Value(CValue::eval(
            pos,
            ty,
            node,
            ExprVarFacts::for_sub_exprs(&facts_refs),
        )))
    }

    /// Compile construction arguments, keeping explicit names and noting
    /// the implicit name of plain variable reads for by-name matching.
    fn compile_construction_args(
        &mut self,
        args: &[ast::CallArg],
        facts: &VarFacts,
    ) -> CResult<(Vec<CompiledArg>, Vec<ExprVarFacts>)> {
        let mut cur = facts.clone();
        let mut cargs = Vec::with_capacity(args.len());
        let mut sub_facts = Vec::with_capacity(args.len());
        for arg in args {
            let v = self.compile_expr_value(&arg.expr, &cur)?;
            cur.put_mut(&v.facts.post_facts);
            sub_facts.push(v.facts.clone());
            let implicit_name: Option<RName> = match &arg.expr {
                ast::Expr::Name(n) => Some(n.str.clone()),
                _ => None,
            };
            cargs.push(CompiledArg {
                name: arg.name.clone(),
                implicit_name,
                value: v,
            });
        }
        Ok((cargs, sub_facts))
    }
}
