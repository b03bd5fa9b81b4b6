//! Quill core model.
//!
//! The shared vocabulary of the compiler: source spans, names and ids, the
//! diagnostics sink, the resolved type model, constant values, the frozen
//! definition model and the two compiled expression families.
//!
//! ## Modules
//!
//! - [`span`]: source locations
//! - [`name`]: identifiers, module/qualified/mount names
//! - [`ids`]: uid generators and definition hashes
//! - [`message`]: the diagnostics sink
//! - [`error`]: the user-facing compilation error
//! - [`types`]: the resolved type model
//! - [`value`]: constant values
//! - [`defs`]: the frozen definition model
//! - [`expr`]: evaluation-form expression nodes
//! - [`sql`]: predicate-form expression nodes
//! - [`stmt`]: compiled statements

pub mod defs;
pub mod error;
pub mod expr;
pub mod ids;
pub mod message;
pub mod name;
pub mod span;
pub mod sql;
pub mod stmt;
pub mod types;
pub mod value;

pub use defs::{
    Attribute, ConstantDef, EntityBody, EntityDef, EntityFlags, FnHeader, FunctionDef,
    OperationDef, Param, QueryDef, RApp, RCallFrame, RFnBody, RModule, StructDef, StructFlags,
};
pub use error::{CError, CResult};
pub use expr::{AtCardinality, AtQueryExpr, BinaryOp, EvalExpr, EvalSysFn, RMemberOp, UnaryOp};
pub use ids::{BlockUid, DefHash, FnUid, UidGen, VarUid};
pub use message::{ErrorWatcher, Message, MessageType, Messages};
pub use name::{ModuleName, MountName, QualifiedName, RName};
pub use span::Span;
pub use sql::{SqlExpr, SqlSysFn};
pub use stmt::{RDestination, RStatement};
pub use types::{RType, TupleField, TypeFlags};
pub use value::Value;
