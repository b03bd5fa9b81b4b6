//! At-expression compilation: the entry point of predicate-form
//! compilation.
//!
//! `entity @card { conditions }` compiles the where-block in a scope where
//! the entity's attributes resolve to genuine predicate-form column
//! references; conditions are booleans ANDed together, evaluation-form
//! conditions entering the query as interpreted parameters. The resulting
//! node is the materialize wrapper: a predicate tree embedded in an
//! evaluation-form expression.

use std::rc::Rc;

use quill_core::{
    AtCardinality, AtQueryExpr, BinaryOp, CResult, EntityDef, EvalExpr, RType, Span, SqlExpr,
};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::type_resolver;
use crate::varfact::{ExprVarFacts, VarFacts};
use crate::vexpr::{CExpr, CValue};

impl FnCompiler<'_> {
    pub(super) fn compile_at(
        &mut self,
        pos: Span,
        from: &ast::QualName,
        cardinality: AtCardinality,
        where_clause: &[ast::Expr],
        facts: &VarFacts,
    ) -> CResult<CExpr> {
        let entity = type_resolver::resolve_entity(self.sess, self.fr, from)?;
        if entity.try_body().is_none() {
            return Ok(CExpr::Value(CValue::error(pos)));
        }

        let prev = self.at_entity.replace(entity.clone());
        let res = self.compile_at_where(pos, &entity, cardinality, where_clause, facts);
        self.at_entity = prev;
        res.map(CExpr::Value)
    }

    fn compile_at_where(
        &mut self,
        pos: Span,
        entity: &Rc<EntityDef>,
        cardinality: AtCardinality,
        where_clause: &[ast::Expr],
        facts: &VarFacts,
    ) -> CResult<CValue> {
        let mut cur = facts.clone();
        let mut conds: Vec<SqlExpr> = Vec::with_capacity(where_clause.len());
        let mut sub_facts = Vec::with_capacity(where_clause.len());

        for (i, wexpr) in where_clause.iter().enumerate() {
            let v = self.compile_expr_value(wexpr, &cur)?;
            cur.put_mut(&v.facts.post_facts);
            if v.ty != RType::Boolean && !v.ty.is_error() {
                self.sess.msgs.error(
                    v.pos,
                    format!("at_where:type:{i}:{}", v.ty.name()),
                    format!("Where-condition {i} must be 'boolean', got '{}'", v.ty),
                );
                continue;
            }
            sub_facts.push(v.facts.clone());
            conds.push(v.to_sql_expr());
        }

        let where_sql = conds.into_iter().reduce(|acc, c| SqlExpr::Binary {
            op: BinaryOp::And,
            left: Box::new(acc),
            right: Box::new(c),
            ty: RType::Boolean,
        });

        let ty = cardinality.result_type(RType::Entity(entity.clone()));
        let node = EvalExpr::At(Box::new(AtQueryExpr {
            entity: entity.clone(),
            cardinality,
            where_clause: where_sql,
            what: None,
            ty: ty.clone(),
        }));

        let facts_refs: Vec<&ExprVarFacts> = sub_facts.iter().collect();
        Ok(CValue::eval(
            pos,
            ty,
            node,
            ExprVarFacts::for_sub_exprs(&facts_refs),
        ))
    }
}
