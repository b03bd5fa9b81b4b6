//! Quill — a semantic compiler front end for a chain-oriented data-model
//! and transaction language.
//!
//! Quill source defines typed on-chain data models (entities, structs) and
//! transactional logic (operations, queries, functions) whose expressions
//! must be executable both in-process and, where possible, as relational
//! predicates. This crate re-exports the workspace: the syntax-tree
//! contract, the staged semantic compiler and the frozen program model.
//!
//! ## Example
//!
//! ```
//! use quill::ast;
//! use quill::{compile_app, CompilerOptions, ModuleName, Span};
//! use quill_core::AtCardinality;
//!
//! // entity user { name: text; }
//! // query q() = user @* {};
//! let sp = Span::new(1, 1, 1);
//! let module = ast::ModuleAst {
//!     name: ModuleName::root(),
//!     files: vec![ast::SourceFile {
//!         path: None,
//!         defs: vec![
//!             ast::Def::Entity(ast::EntityDef {
//!                 name: ast::Name::new("user", sp),
//!                 members: vec![ast::EntityMember::Attr(ast::AttrDef {
//!                     name: ast::Name::new("name", sp),
//!                     ty: Some(ast::TypeRef::Name(ast::QualName::of(&["text"], sp))),
//!                     mutable: false,
//!                     expr: None,
//!                 })],
//!             }),
//!             ast::Def::Query(ast::QueryDef {
//!                 name: ast::Name::new("q", sp),
//!                 params: vec![],
//!                 ret: None,
//!                 body: ast::FnBody::Short(ast::Expr::At {
//!                     pos: sp,
//!                     from: ast::QualName::of(&["user"], sp),
//!                     cardinality: AtCardinality::ZeroMany,
//!                     where_clause: vec![],
//!                 }),
//!             }),
//!         ],
//!     }],
//! };
//!
//! let result = compile_app(vec![module], CompilerOptions::default());
//! assert!(result.is_valid());
//! ```

pub use quill_parser::ast;

pub use quill_compiler::{
    compile_app, CompilationResult, CompilerOptions, CompilerPass, DirGraph, Session,
};
pub use quill_core::{
    CError, CResult, Message, MessageType, Messages, ModuleName, MountName, QualifiedName, RApp,
    RName, RType, Span, Value,
};
pub use quill_registry::{Namespace, SysFnId};
