//! Return compilation: return-type tracking.

use quill_core::{CResult, RStatement, RType, Span};
use quill_parser::ast;

use crate::frame::FnCompiler;
use crate::varfact::VarFacts;

use super::StmtResult;

impl FnCompiler<'_> {
    pub(super) fn compile_return(
        &mut self,
        pos: Span,
        expr: Option<&ast::Expr>,
        facts: &VarFacts,
    ) -> CResult<StmtResult> {
        match expr {
            Some(e) => {
                let v = self.compile_expr_value(e, facts)?;
                self.ret.match_type(pos, &v.ty)?;
                let out = v.facts.post_facts.clone();
                Ok(StmtResult::returning(
                    RStatement::Return(Some(v.to_eval_expr()?)),
                    out,
                ))
            }
            None => {
                self.ret.match_type(pos, &RType::Unit)?;
                Ok(StmtResult::returning(
                    RStatement::Return(None),
                    VarFacts::empty(),
                ))
            }
        }
    }
}
