//! The compilation session.
//!
//! `Session` is the single mutable state every pass task receives: the
//! diagnostics sink, the module table, the scheduler queues, uid counters
//! and the constant-evaluation recursion guard. Frozen definitions live
//! outside it behind `Rc`s; tasks capture those directly.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use quill_core::{
    ConstantDef, DefHash, EntityDef, FunctionDef, Messages, ModuleName, MountName, OperationDef,
    QueryDef, RModule, RName, RApp, Span, StructDef, UidGen,
};
use quill_parser::ast;
use quill_registry::{system_namespace, Namespace, NsEntryDecl};

use crate::passes::{CompilerPass, PassTask, Scheduler};

/// Embedder-tunable options.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    /// Treat deprecation warnings as errors.
    pub deprecated_error: bool,
}

/// What kind of definition a body belongs to; decides what the body may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionType {
    Entity,
    Struct,
    Query,
    Operation,
    Function,
    Constant,
}

impl DefinitionType {
    pub fn msg(&self) -> &'static str {
        match self {
            DefinitionType::Entity => "entity",
            DefinitionType::Struct => "struct",
            DefinitionType::Query => "query",
            DefinitionType::Operation => "operation",
            DefinitionType::Function => "function",
            DefinitionType::Constant => "constant",
        }
    }

    /// Only operations may modify the database.
    pub fn db_update_allowed(&self) -> bool {
        matches!(self, DefinitionType::Operation)
    }
}

/// Identifies one source file of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRef {
    pub module: usize,
    pub file: usize,
}

/// A constant awaiting evaluation; forced on demand so that forward and
/// cross-constant references work regardless of task order.
pub struct PendingConst {
    pub def: Rc<ConstantDef>,
    pub ty: Option<ast::TypeRef>,
    pub expr: ast::Expr,
    pub fr: FileRef,
}

/// Definitions collected for a module while declaring, frozen into an
/// `RModule` at the finish pass.
#[derive(Default)]
pub struct ModuleContents {
    pub entities: Vec<Rc<EntityDef>>,
    pub structs: Vec<Rc<StructDef>>,
    pub functions: Vec<Rc<FunctionDef>>,
    pub operations: Vec<Rc<OperationDef>>,
    pub queries: Vec<Rc<QueryDef>>,
    pub constants: Vec<Rc<ConstantDef>>,
}

/// Per-module compilation state.
pub struct ModuleState {
    pub name: ModuleName,
    pub mount: MountName,
    /// Public declarations per file; consumed by namespace assembly.
    pub public_decls: Vec<Vec<NsEntryDecl>>,
    /// Private (import) declarations per file.
    pub private_decls: Vec<Vec<NsEntryDecl>>,
    /// Accepted public names, available after assembly.
    pub public_names: FxHashMap<RName, Span>,
    pub public_ns: Option<Rc<Namespace>>,
    pub private_ns: Vec<Option<Rc<Namespace>>>,
    pub contents: ModuleContents,
}

impl ModuleState {
    fn new(name: ModuleName, n_files: usize) -> ModuleState {
        let mount = MountName::new(name.parts().to_vec());
        ModuleState {
            name,
            mount,
            public_decls: (0..n_files).map(|_| Vec::new()).collect(),
            private_decls: (0..n_files).map(|_| Vec::new()).collect(),
            public_names: FxHashMap::default(),
            public_ns: None,
            private_ns: (0..n_files).map(|_| None).collect(),
            contents: ModuleContents::default(),
        }
    }

    pub fn into_rmodule(self) -> RModule {
        RModule {
            name: self.name,
            entities: self.contents.entities,
            structs: self.contents.structs,
            functions: self.contents.functions,
            operations: self.contents.operations,
            queries: self.contents.queries,
            constants: self.contents.constants,
        }
    }
}

/// The one-per-compilation mutable state.
pub struct Session {
    pub options: CompilerOptions,
    pub msgs: Messages,
    pub(crate) scheduler: Scheduler,
    pub sys_ns: Rc<Namespace>,
    pub modules: Vec<ModuleState>,
    pub module_index: FxHashMap<ModuleName, usize>,
    pub fn_uid_gen: UidGen,
    pub all_structs: Vec<Rc<StructDef>>,
    pub all_entities: Vec<Rc<EntityDef>>,
    pub pending_consts: FxHashMap<DefHash, PendingConst>,
    /// The explicit "currently evaluating" set for constant evaluation;
    /// ordered, so cycles can be reported with their full path.
    pub const_stack: Vec<(DefHash, String)>,
    /// Declaration positions, for diagnostics reported long after the
    /// syntax tree is gone (structural-flags stage).
    pub def_positions: FxHashMap<DefHash, Span>,
    pub app: Option<Rc<RApp>>,
}

impl Session {
    pub fn new(options: CompilerOptions) -> Session {
        Session {
            options,
            msgs: Messages::new(),
            scheduler: Scheduler::new(),
            sys_ns: system_namespace(),
            modules: Vec::new(),
            module_index: FxHashMap::default(),
            fn_uid_gen: UidGen::new(),
            all_structs: Vec::new(),
            all_entities: Vec::new(),
            pending_consts: FxHashMap::default(),
            const_stack: Vec::new(),
            def_positions: FxHashMap::default(),
            app: None,
        }
    }

    pub fn add_module(&mut self, name: ModuleName, n_files: usize) -> usize {
        assert!(
            !self.module_index.contains_key(&name),
            "module '{name}' added twice"
        );
        let idx = self.modules.len();
        self.module_index.insert(name.clone(), idx);
        self.modules.push(ModuleState::new(name, n_files));
        idx
    }

    pub fn current_pass(&self) -> CompilerPass {
        self.scheduler.current()
    }

    pub fn check_pass(&self, min: Option<CompilerPass>, max: Option<CompilerPass>) {
        self.scheduler.check_pass(min, max);
    }

    pub fn on_pass(
        &mut self,
        pass: CompilerPass,
        task: impl FnOnce(&mut Session) -> quill_core::CResult<()> + 'static,
    ) {
        let boxed: PassTask = Box::new(task);
        self.scheduler.on_pass(pass, boxed);
    }

    /// Another module's public namespace; `None` while not yet assembled or
    /// for an unknown module.
    pub fn module_public_ns(&self, name: &ModuleName) -> Option<Rc<Namespace>> {
        let idx = *self.module_index.get(name)?;
        self.modules[idx].public_ns.clone()
    }

    /// Run every scheduled pass to completion. Task errors become
    /// diagnostics; compilation always reaches the last pass.
    pub fn run(&mut self) {
        self.scheduler.begin_run();
        for pass in CompilerPass::ALL {
            self.scheduler.start_pass(pass);
            while let Some(task) = self.scheduler.pop_current() {
                if let Err(e) = task(self) {
                    self.msgs.report(&e);
                }
            }
        }
    }
}
