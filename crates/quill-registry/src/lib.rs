//! Quill namespace registry.
//!
//! Namespace structures, the module assembler with its two-phase conflict
//! detection, and the predefined system namespace.

pub mod assembler;
pub mod namespace;
pub mod system;

pub use assembler::{
    assemble_file_private, assemble_module, DeclKind, DeclPayload, ModuleNsAssembly, NsEntryDecl,
};
pub use namespace::{
    Deprecation, Namespace, NamespaceBuilder, NamespaceRef, NsDef, NsFunction, NsValue,
};
pub use system::{system_namespace, SysFnId};
