//! The dual-target expression compiler.
//!
//! Every expression compiles into an evaluation-form node and, where the
//! expression genuinely belongs to a database context, a predicate-form
//! node. The routing rules:
//!
//! - operators emit a predicate-form node when either operand carries a
//!   genuine predicate form, wrapping the other side as an interpreted
//!   query parameter; otherwise they emit an evaluation-form node
//! - calls route to the predicate form only when an argument or the
//!   receiver is predicate-form; a function without a predicate
//!   implementation then fails with the not-SQL-representable diagnostic
//! - member access tries three layers in order: tuple/struct field, entity
//!   attribute, member function — with optional-access safety checked once
//!   up front
//!
//! Compilation is flow-sensitive: every method receives the ambient
//! variable facts and the values it produces carry the facts they add.

mod at;
mod binary;
mod calls;
mod create;
mod literals;
mod member;
mod names;
mod unary;

use quill_core::CResult;
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::VarFacts;
use crate::vexpr::{CExpr, CValue};

impl FnCompiler<'_> {
    pub fn compile_expr(&mut self, expr: &ast::Expr, facts: &VarFacts) -> CResult<CExpr> {
        match expr {
            ast::Expr::Literal { pos, val } => self.compile_literal(*pos, val),
            ast::Expr::Name(name) => self.compile_name(name, facts),
            ast::Expr::Member { base, name, safe } => {
                self.compile_member(base, name, *safe, facts)
            }
            ast::Expr::Call { pos, base, args } => self.compile_call(*pos, base, args, facts),
            ast::Expr::Create { pos, entity, args } => {
                self.compile_create(*pos, entity, args, facts)
            }
            ast::Expr::Binary {
                pos,
                op,
                left,
                right,
            } => self.compile_binary(*pos, *op, left, right, facts),
            ast::Expr::Unary { pos, op, expr } => self.compile_unary(*pos, *op, expr, facts),
            ast::Expr::At {
                pos,
                from,
                cardinality,
                where_clause,
            } => self.compile_at(*pos, from, *cardinality, where_clause, facts),
            ast::Expr::Tuple { pos, fields } => self.compile_tuple(*pos, fields, facts),
            ast::Expr::ListLiteral { pos, elems } => self.compile_list(*pos, elems, facts),
        }
    }

    /// Compile an expression that must produce a value.
    pub fn compile_expr_value(&mut self, expr: &ast::Expr, facts: &VarFacts) -> CResult<CValue> {
        self.compile_expr(expr, facts)?.into_value()
    }
}
