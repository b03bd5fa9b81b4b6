//! If/else compilation with branch fact merging.
//!
//! Each branch compiles under the ambient facts plus the condition's
//! corresponding branch facts. At the join, branches that always return are
//! excluded (they contribute no exit state); the rest merge against the
//! pre-branch state, so a variable is only definitely initialized afterwards
//! if it was before or is on every falling-through branch.

use quill_core::{CResult, RStatement, Span};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::VarFacts;

use super::StmtResult;

impl FnCompiler<'_> {
    pub(super) fn compile_if(
        &mut self,
        _pos: Span,
        cond: &ast::Expr,
        then_stmt: &ast::Stmt,
        else_stmt: Option<&ast::Stmt>,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        let c = self.compile_expr_value(cond, facts)?;
        self.check_boolean(&c)?;

        let base = facts.put(&c.facts.post_facts);

        let then_facts = base.put(&c.facts.true_facts);
        let then_r = self.compile_branch(then_stmt, &then_facts)?;

        let else_r = match else_stmt {
            Some(s) => {
                let else_facts = base.put(&c.facts.false_facts);
                Some(self.compile_branch(s, &else_facts)?)
            }
            None => None,
        };

        // collect exit states of the branches that can fall through
        let mut cases: Vec<VarFacts> = Vec::new();
        if !then_r.returns_always {
            cases.push(c.facts.true_facts.put(&then_r.facts));
        }
        match &else_r {
            Some(r) if r.returns_always => {}
            Some(r) => cases.push(c.facts.false_facts.put(&r.facts)),
            None => cases.push(c.facts.false_facts.clone()),
        }

        let merged = VarFacts::for_branches(&base, &cases);
        let out_facts = c.facts.post_facts.put(&merged);

        let returns_always =
            then_r.returns_always && else_r.as_ref().is_some_and(|r| r.returns_always);

        let stmt = RStatement::If {
            cond: c.to_eval_expr()?,
            then_stmt: Box::new(then_r.stmt),
            else_stmt: else_r.map(|r| Box::new(r.stmt)),
        };

        Ok(StmtResult {
            stmt,
            facts: out_facts,
            returns_always,
        })
    }
}
