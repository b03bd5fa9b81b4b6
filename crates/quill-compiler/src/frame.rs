//! Function frames and function-level compilation state.
//!
//! `FnCompiler` is the per-body compiler: it owns the frame (slot and uid
//! allocation), the lexical scope stack and the return-type tracker, and
//! borrows the session. Expression and statement compilation are implemented
//! as methods on it across the `expr` and `stmt` modules.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use quill_core::{
    BlockUid, CError, CResult, EntityDef, FnUid, RCallFrame, RName, RType, Span, UidGen, VarUid,
};
use quill_parser::ast;

use crate::context::{DefinitionType, FileRef, Session};

/// A local variable binding. The uid identifies the binding; the slot is its
/// storage location in the frame.
#[derive(Debug)]
pub struct LocalVar {
    pub uid: VarUid,
    pub name: RName,
    pub ty: RType,
    pub mutable: bool,
    pub slot: u32,
}

/// Uid and slot allocation for one function body. Counters are owned here,
/// handed down from the session's fn-uid counter — never global.
pub struct FrameCtx {
    pub fn_uid: FnUid,
    var_uid_gen: UidGen,
    block_uid_gen: UidGen,
    next_slot: u32,
    size: u32,
}

impl FrameCtx {
    pub fn new(fn_uid: FnUid) -> FrameCtx {
        FrameCtx {
            fn_uid,
            var_uid_gen: UidGen::new(),
            block_uid_gen: UidGen::new(),
            next_slot: 0,
            size: 0,
        }
    }

    pub fn next_var_uid(&mut self, name: &RName) -> VarUid {
        VarUid {
            id: self.var_uid_gen.next(),
            name: name.as_str().to_string(),
            fn_uid: self.fn_uid.clone(),
        }
    }

    pub fn next_block_uid(&mut self) -> BlockUid {
        BlockUid(self.block_uid_gen.next())
    }

    fn alloc_slot(&mut self) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.size = self.size.max(self.next_slot);
        slot
    }

    /// Seal the frame. Runs at the frames pass, after the body is compiled.
    pub fn seal(&self) -> RCallFrame {
        RCallFrame { size: self.size }
    }
}

/// Tracks the return type of a body: explicit declarations check every
/// `return` against the declared type; implicit ones infer a common type.
pub enum RetTypeTracker {
    Implicit(Option<RType>),
    Explicit(RType),
}

impl RetTypeTracker {
    pub fn implicit() -> RetTypeTracker {
        RetTypeTracker::Implicit(None)
    }

    pub fn explicit(ty: RType) -> RetTypeTracker {
        RetTypeTracker::Explicit(ty)
    }

    pub fn match_type(&mut self, pos: Span, ty: &RType) -> CResult<()> {
        match self {
            RetTypeTracker::Implicit(slot) => match slot {
                None => {
                    *slot = Some(ty.clone());
                    Ok(())
                }
                Some(cur) if cur.is_error() => {
                    *slot = Some(ty.clone());
                    Ok(())
                }
                Some(cur) => {
                    if ty.is_error() {
                        return Ok(());
                    }
                    match RType::common_type(cur, ty) {
                        Some(common) => {
                            *slot = Some(common);
                            Ok(())
                        }
                        None => Err(err_ret_type(pos, cur, ty)),
                    }
                }
            },
            RetTypeTracker::Explicit(exp) => {
                if exp.is_error() || ty.is_error() {
                    return Ok(());
                }
                let ok = if *exp == RType::Unit {
                    *ty == RType::Unit
                } else {
                    exp.is_assignable_from(ty)
                };
                if ok { Ok(()) } else { Err(err_ret_type(pos, exp, ty)) }
            }
        }
    }

    /// The actual return type; an implicit tracker with no `return` settles
    /// on unit.
    pub fn ret_type(&mut self) -> RType {
        match self {
            RetTypeTracker::Implicit(slot) => slot.get_or_insert(RType::Unit).clone(),
            RetTypeTracker::Explicit(exp) => exp.clone(),
        }
    }
}

fn err_ret_type(pos: Span, dst: &RType, src: &RType) -> CError {
    CError::new(
        pos,
        format!("fn_rettype:{}:{}", dst.name(), src.name()),
        format!("Return type mismatch: expected '{dst}', got '{src}'"),
    )
}

/// The per-body compiler.
pub struct FnCompiler<'s> {
    pub sess: &'s mut Session,
    pub fr: FileRef,
    pub def_type: DefinitionType,
    pub frame: FrameCtx,
    pub ret: RetTypeTracker,
    /// Innermost at-expression entity whose attributes are in scope.
    pub at_entity: Option<Rc<EntityDef>>,
    scopes: Vec<FxHashMap<RName, Rc<LocalVar>>>,
}

impl<'s> FnCompiler<'s> {
    pub fn new(
        sess: &'s mut Session,
        fr: FileRef,
        def_type: DefinitionType,
        name: &str,
        explicit_ret: Option<RType>,
    ) -> FnCompiler<'s> {
        let fn_uid = FnUid {
            id: sess.fn_uid_gen.next(),
            name: name.to_string(),
        };
        FnCompiler {
            sess,
            fr,
            def_type,
            frame: FrameCtx::new(fn_uid),
            ret: match explicit_ret {
                Some(ty) => RetTypeTracker::explicit(ty),
                None => RetTypeTracker::implicit(),
            },
            at_entity: None,
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Leave the innermost scope, returning the uids of variables it
    /// declared so their facts can be discarded.
    pub fn pop_scope(&mut self) -> Vec<VarUid> {
        let scope = self.scopes.pop().expect("scope stack underflow");
        assert!(!self.scopes.is_empty(), "popped the function root scope");
        scope.values().map(|v| v.uid.clone()).collect()
    }

    /// Declare a variable in the innermost scope. Shadowing an outer scope
    /// is allowed; redeclaring within the same scope is an error.
    pub fn declare_var(
        &mut self,
        name: &ast::Name,
        ty: RType,
        mutable: bool,
    ) -> CResult<Rc<LocalVar>> {
        let scope = self.scopes.last_mut().unwrap();
        if scope.contains_key(&name.str) {
            return Err(CError::new(
                name.pos,
                format!("var_dup:{}", name.str),
                format!("Variable '{}' is already declared", name.str),
            ));
        }
        let uid = self.frame.next_var_uid(&name.str);
        let slot = self.frame.alloc_slot();
        let var = Rc::new(LocalVar {
            uid,
            name: name.str.clone(),
            ty,
            mutable,
            slot,
        });
        self.scopes
            .last_mut()
            .unwrap()
            .insert(name.str.clone(), var.clone());
        Ok(var)
    }

    /// Declare a parameter in the function root scope. Duplicate parameter
    /// names are rejected during signature resolution, so a collision here
    /// is a programming error.
    pub fn declare_param(&mut self, name: &RName, ty: RType) -> Rc<LocalVar> {
        let uid = self.frame.next_var_uid(name);
        let slot = self.frame.alloc_slot();
        let var = Rc::new(LocalVar {
            uid,
            name: name.clone(),
            ty,
            mutable: false,
            slot,
        });
        let prev = self.scopes[0].insert(name.clone(), var.clone());
        assert!(prev.is_none(), "duplicate parameter '{name}'");
        var
    }

    pub fn lookup_var(&self, name: &RName) -> Option<Rc<LocalVar>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompilerOptions;

    fn with_compiler(f: impl FnOnce(&mut FnCompiler<'_>)) {
        let mut sess = Session::new(CompilerOptions::default());
        sess.add_module(quill_core::ModuleName::root(), 1);
        let fr = FileRef { module: 0, file: 0 };
        let mut fc = FnCompiler::new(&mut sess, fr, DefinitionType::Function, "test", None);
        f(&mut fc);
    }

    fn name(s: &str) -> ast::Name {
        ast::Name::new(s, Span::default())
    }

    #[test]
    fn declare_and_lookup() {
        with_compiler(|fc| {
            let v = fc.declare_var(&name("x"), RType::Integer, false).unwrap();
            assert_eq!(v.slot, 0);
            assert!(!v.mutable);
            let found = fc.lookup_var(&RName::of("x")).unwrap();
            assert_eq!(found.uid, v.uid);
        });
    }

    #[test]
    fn same_scope_redeclaration_is_an_error() {
        with_compiler(|fc| {
            fc.declare_var(&name("x"), RType::Integer, false).unwrap();
            let err = fc.declare_var(&name("x"), RType::Text, false).unwrap_err();
            assert_eq!(err.code, "var_dup:x");
        });
    }

    #[test]
    fn nested_scope_shadowing_is_allowed() {
        with_compiler(|fc| {
            fc.declare_var(&name("x"), RType::Integer, false).unwrap();
            fc.push_scope();
            fc.declare_var(&name("x"), RType::Text, true).unwrap();
            assert_eq!(fc.lookup_var(&RName::of("x")).unwrap().ty, RType::Text);
            let dropped = fc.pop_scope();
            assert_eq!(dropped.len(), 1);
            assert_eq!(fc.lookup_var(&RName::of("x")).unwrap().ty, RType::Integer);
        });
    }

    #[test]
    fn frame_size_counts_all_slots() {
        with_compiler(|fc| {
            fc.declare_var(&name("a"), RType::Integer, false).unwrap();
            fc.push_scope();
            fc.declare_var(&name("b"), RType::Integer, false).unwrap();
            fc.pop_scope();
            assert_eq!(fc.frame.seal().size, 2);
        });
    }

    #[test]
    fn implicit_ret_tracker_infers_common_type() {
        let mut t = RetTypeTracker::implicit();
        t.match_type(Span::default(), &RType::Integer).unwrap();
        t.match_type(Span::default(), &RType::Null).unwrap();
        assert_eq!(t.ret_type(), RType::nullable(RType::Integer));
    }

    #[test]
    fn explicit_ret_tracker_rejects_mismatch() {
        let mut t = RetTypeTracker::explicit(RType::Integer);
        assert!(t.match_type(Span::default(), &RType::Integer).is_ok());
        let err = t.match_type(Span::default(), &RType::Text).unwrap_err();
        assert_eq!(err.code, "fn_rettype:integer:text");
    }

    #[test]
    fn implicit_tracker_with_no_returns_is_unit() {
        let mut t = RetTypeTracker::implicit();
        assert_eq!(t.ret_type(), RType::Unit);
    }
}
