//! The statement compiler.
//!
//! Statements thread variable facts functionally: each one receives the
//! ambient facts and returns the facts it adds plus whether it always
//! returns, which join points use to exclude non-falling-through branches.

mod assign;
mod block;
mod if_stmt;
mod return_stmt;
mod var_decl;
mod while_stmt;

use quill_core::{CResult, RStatement};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::VarFacts;

/// The outcome of compiling one statement.
pub struct StmtResult {
    pub stmt: RStatement,
    /// Facts this statement adds to the ambient context.
    pub facts: VarFacts,
    /// The statement never falls through (it returns on every path).
    pub returns_always: bool,
}

impl StmtResult {
    pub fn new(stmt: RStatement, facts: VarFacts) -> StmtResult {
        StmtResult {
            stmt,
            facts,
            returns_always: false,
        }
    }

    pub fn returning(stmt: RStatement, facts: VarFacts) -> StmtResult {
        StmtResult {
            stmt,
            facts,
            returns_always: true,
        }
    }
}

impl FnCompiler<'_> {
    pub fn compile_stmt(&mut self, stmt: &ast::Stmt, facts: &VarFacts) -> CResult<StmtResult> {
        match stmt {
            ast::Stmt::Val { name, ty, expr } => {
                self.compile_val(name, ty.as_ref(), expr, facts)
            }
            ast::Stmt::Var { name, ty, expr } => {
                self.compile_var(name, ty.as_ref(), expr.as_ref(), facts)
            }
            ast::Stmt::Assign { pos, dst, expr } => self.compile_assign(*pos, dst, expr, facts),
            ast::Stmt::If {
                pos,
                cond,
                then_stmt,
                else_stmt,
            } => self.compile_if(*pos, cond, then_stmt, else_stmt.as_deref(), facts),
            ast::Stmt::While { pos, cond, body } => self.compile_while(*pos, cond, body, facts),
            ast::Stmt::Return { pos, expr } => self.compile_return(*pos, expr.as_ref(), facts),
            ast::Stmt::Block { pos, stmts } => self.compile_block(*pos, stmts, facts),
            ast::Stmt::Expr(expr) => {
                let v = self.compile_expr_value(expr, facts)?;
                let facts = v.facts.post_facts.clone();
                Ok(StmtResult::new(RStatement::Expr(v.to_eval_expr()?), facts))
            }
        }
    }

    /// Compile a branch body (if/while arm) in its own scope, discarding
    /// facts about variables the branch declares.
    pub(super) fn compile_branch(
        &mut self,
        stmt: &ast::Stmt,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        self.push_scope();
        let res = self.compile_stmt(stmt, facts);
        let dropped = self.pop_scope();
        let mut r = res?;
        for uid in &dropped {
            r.facts.inited.remove(uid);
            r.facts.nulled.remove(uid);
        }
        Ok(r)
    }
}
