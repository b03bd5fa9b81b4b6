//! While-loop compilation.
//!
//! The body may run zero times, so facts established inside it are
//! discarded; after the loop only the condition's false-branch facts hold.

use quill_core::{CResult, RStatement, Span};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::VarFacts;

use super::StmtResult;

impl FnCompiler<'_> {
    pub(super) fn compile_while(
        &mut self,
        _pos: Span,
        cond: &ast::Expr,
        body: &ast::Stmt,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        let c = self.compile_expr_value(cond, facts)?;
        self.check_boolean(&c)?;

        let body_facts = facts
            .put(&c.facts.post_facts)
            .put(&c.facts.true_facts);
        let body_r = self.compile_branch(body, &body_facts)?;

        // zero-iteration path: only the condition facts survive the loop
        let out_facts = c.facts.post_facts.put(&c.facts.false_facts);

        let stmt = RStatement::While {
            cond: c.to_eval_expr()?,
            body: Box::new(body_r.stmt),
        };

        Ok(StmtResult::new(stmt, out_facts))
    }
}
