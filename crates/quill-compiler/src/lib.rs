//! Quill semantic compiler.
//!
//! A staged compiler engine: name declaration, namespace assembly, member
//! resolution, dual-target body compilation, frame sealing and structural
//! analysis, driven by a pass scheduler that preserves causal ordering
//! between dynamically registered tasks.
//!
//! ## Modules
//!
//! - [`graph`]: generic dependency-graph utility
//! - [`passes`]: the pass scheduler
//! - [`context`]: the compilation session
//! - [`scope`]: name resolution through the scope hierarchy
//! - [`varfact`]: the variable-fact engine
//! - [`cases`]: the overload-case engine
//! - [`lib_fns`]: system function case tables
//! - [`type_resolver`]: syntax type references to resolved types
//! - [`attr`]: attribute matching for construction
//! - [`vexpr`]: compiled expression values (dual-form)
//! - [`frame`]: function frames and per-body state
//! - [`expr`] / [`stmt`]: the expression and statement compilers
//! - [`const_eval`]: constant evaluation with an explicit recursion guard
//! - [`def`]: definition compilation
//! - [`app`]: the compilation driver

pub mod app;
pub mod attr;
pub mod cases;
pub mod const_eval;
pub mod context;
pub mod def;
pub mod expr;
pub mod frame;
pub mod graph;
pub mod lib_fns;
pub mod passes;
pub mod scope;
pub mod stmt;
pub mod type_resolver;
pub mod varfact;
pub mod vexpr;

pub use app::{compile_app, CompilationResult};
pub use cases::{ArgTypeMatch, ArgTypeMatcher, GlobalCase, MemberCase};
pub use context::{CompilerOptions, DefinitionType, FileRef, Session};
pub use frame::{FnCompiler, FrameCtx, LocalVar, RetTypeTracker};
pub use graph::DirGraph;
pub use passes::{CompilerPass, Scheduler};
pub use varfact::{ExprVarFacts, VarFact, VarFacts};
pub use vexpr::{CExpr, CValue, CValueKind};
