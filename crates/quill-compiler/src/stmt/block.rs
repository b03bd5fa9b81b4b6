//! Block compilation.

use quill_core::{CResult, RStatement, Span};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::VarFacts;

use super::StmtResult;

impl FnCompiler<'_> {
    pub(crate) fn compile_block(
        &mut self,
        _pos: Span,
        stmts: &[ast::Stmt],
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        self.push_scope();
        let res = self.compile_block_stmts(stmts, facts);
        let dropped = self.pop_scope();
        let mut r = res?;
        // facts about the block's own variables do not outlive the block
        for uid in &dropped {
            r.facts.inited.remove(uid);
            r.facts.nulled.remove(uid);
        }
        Ok(r)
    }

    fn compile_block_stmts(
        &mut self,
        stmts: &[ast::Stmt],
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        let uid = self.frame.next_block_uid();
        let mut cur = facts.clone();
        let mut delta = VarFacts::empty();
        let mut compiled = Vec::with_capacity(stmts.len());
        let mut returns = false;
        let mut dead_reported = false;

        for stmt in stmts {
            if returns && !dead_reported {
                self.sess
                    .msgs
                    .error(stmt.pos(), "stmt_deadcode", "Dead code");
                dead_reported = true;
            }
            let r = self.compile_stmt(stmt, &cur)?;
            cur.put_mut(&r.facts);
            delta.put_mut(&r.facts);
            returns = returns || r.returns_always;
            compiled.push(r.stmt);
        }

        let stmt = RStatement::Block {
            uid,
            stmts: compiled,
        };
        Ok(StmtResult {
            stmt,
            facts: delta,
            returns_always: returns,
        })
    }
}
