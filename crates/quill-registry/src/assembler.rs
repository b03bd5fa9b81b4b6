//! Module namespace assembly.
//!
//! Declarations are collected per file during the declaration stage and
//! assembled here once all files are known. Conflict detection runs twice:
//! once over the module-visible set (every file's public declarations
//! together), and once per file combining that set with the file's private
//! declarations (imports) — so a private name may conflict with a public one
//! without polluting other files' view. Conflicts are diagnostics, never
//! panics; the first declaration wins and compilation continues.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use quill_core::{
    ConstantDef, EntityDef, FunctionDef, Messages, ModuleName, OperationDef, QueryDef, RName,
    RType, Span, StructDef,
};

use crate::namespace::{
    Namespace, NamespaceBuilder, NamespaceRef, NsDef, NsFunction, NsValue,
};

/// What a declaration is, for conflict messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Entity,
    Struct,
    Function,
    Operation,
    Query,
    Constant,
    Namespace,
    Import,
}

impl DeclKind {
    pub fn msg(&self) -> &'static str {
        match self {
            DeclKind::Entity => "entity",
            DeclKind::Struct => "struct",
            DeclKind::Function => "function",
            DeclKind::Operation => "operation",
            DeclKind::Query => "query",
            DeclKind::Constant => "constant",
            DeclKind::Namespace => "namespace",
            DeclKind::Import => "import",
        }
    }
}

/// The payload a declaration contributes to the namespace.
#[derive(Debug, Clone)]
pub enum DeclPayload {
    Entity(Rc<EntityDef>),
    Struct(Rc<StructDef>),
    Function(Rc<FunctionDef>),
    Operation(Rc<OperationDef>),
    Query(Rc<QueryDef>),
    Constant(Rc<ConstantDef>),
    Namespace(Vec<NsEntryDecl>),
    Import(ModuleName),
}

/// One name declaration inside a scope.
#[derive(Debug, Clone)]
pub struct NsEntryDecl {
    pub name: RName,
    pub pos: Span,
    pub kind: DeclKind,
    pub payload: DeclPayload,
}

impl NsEntryDecl {
    pub fn new(name: RName, pos: Span, kind: DeclKind, payload: DeclPayload) -> NsEntryDecl {
        NsEntryDecl {
            name,
            pos,
            kind,
            payload,
        }
    }
}

/// Result of assembling a module's public declarations.
pub struct ModuleNsAssembly {
    pub public: Rc<Namespace>,
    /// Accepted top-level public names with their declaration positions,
    /// for the per-file second conflict pass.
    pub public_names: FxHashMap<RName, Span>,
}

/// Assemble the module-public namespace from every file's public
/// declarations, reporting module-level name conflicts.
pub fn assemble_module(file_decls: Vec<Vec<NsEntryDecl>>, msgs: &mut Messages) -> ModuleNsAssembly {
    let all: Vec<NsEntryDecl> = file_decls.into_iter().flatten().collect();
    let mut public_names = FxHashMap::default();
    let public = assemble_scope(all, msgs, Some(&mut public_names));
    ModuleNsAssembly {
        public,
        public_names,
    }
}

/// Assemble one file's private namespace (imports), reporting conflicts
/// against the module-public names and among the file's own privates.
pub fn assemble_file_private(
    private_decls: Vec<NsEntryDecl>,
    public_names: &FxHashMap<RName, Span>,
    msgs: &mut Messages,
) -> Rc<Namespace> {
    let mut accepted = Vec::new();
    let mut seen: FxHashMap<RName, Span> = FxHashMap::default();
    for decl in private_decls {
        if let Some(other) = public_names.get(&decl.name) {
            report_conflict(msgs, &decl, *other);
        } else if let Some(other) = seen.get(&decl.name) {
            report_conflict(msgs, &decl, *other);
        } else {
            seen.insert(decl.name.clone(), decl.pos);
            accepted.push(decl);
        }
    }
    assemble_scope(accepted, msgs, None)
}

/// Assemble one scope level. Namespace declarations with the same name merge;
/// any other duplicate is a conflict reported against the later declaration,
/// with the first one winning.
fn assemble_scope(
    decls: Vec<NsEntryDecl>,
    msgs: &mut Messages,
    mut accepted_names: Option<&mut FxHashMap<RName, Span>>,
) -> Rc<Namespace> {
    // group by name, preserving first-seen order
    let mut order: Vec<RName> = Vec::new();
    let mut by_name: FxHashMap<RName, Vec<NsEntryDecl>> = FxHashMap::default();
    for decl in decls {
        if !by_name.contains_key(&decl.name) {
            order.push(decl.name.clone());
        }
        by_name.entry(decl.name.clone()).or_default().push(decl);
    }

    let mut b = NamespaceBuilder::new();

    for name in order {
        let group = by_name.remove(&name).unwrap();
        let first_kind = group[0].kind;
        let first_pos = group[0].pos;

        let merged = if first_kind == DeclKind::Namespace {
            // merge all namespace pieces; non-namespace decls conflict
            let mut children = Vec::new();
            for decl in group {
                match decl.payload {
                    DeclPayload::Namespace(defs) if decl.kind == DeclKind::Namespace => {
                        children.extend(defs);
                    }
                    _ => {
                        report_conflict(msgs, &decl, first_pos);
                    }
                }
            }
            NsEntryDecl::new(
                name.clone(),
                first_pos,
                DeclKind::Namespace,
                DeclPayload::Namespace(children),
            )
        } else {
            let mut it = group.into_iter();
            let winner = it.next().unwrap();
            for loser in it {
                report_conflict(msgs, &loser, winner.pos);
            }
            winner
        };

        if let Some(names) = accepted_names.as_deref_mut() {
            names.insert(name.clone(), merged.pos);
        }
        add_decl(&mut b, merged, msgs);
    }

    b.build()
}

/// Insert one accepted declaration into its partitions.
fn add_decl(b: &mut NamespaceBuilder, decl: NsEntryDecl, msgs: &mut Messages) {
    let name = decl.name;
    match decl.payload {
        DeclPayload::Entity(e) => {
            b.add_type(name.clone(), NsDef::plain(RType::Entity(e.clone())));
            b.add_value(name, NsDef::plain(NsValue::Entity(e)));
        }
        DeclPayload::Struct(s) => {
            b.add_type(name.clone(), NsDef::plain(RType::Struct(s.clone())));
            b.add_value(name.clone(), NsDef::plain(NsValue::Struct(s.clone())));
            b.add_function(name, NsDef::plain(NsFunction::StructCtor(s)));
        }
        DeclPayload::Function(f) => {
            b.add_function(name, NsDef::plain(NsFunction::User(f)));
        }
        DeclPayload::Operation(o) => {
            b.add_function(name, NsDef::plain(NsFunction::Operation(o)));
        }
        DeclPayload::Query(q) => {
            b.add_function(name, NsDef::plain(NsFunction::Query(q)));
        }
        DeclPayload::Constant(c) => {
            b.add_value(name, NsDef::plain(NsValue::Constant(c)));
        }
        DeclPayload::Namespace(defs) => {
            let inner = assemble_scope(defs, msgs, None);
            b.add_namespace(name, NsDef::plain(NamespaceRef::Inline(inner)));
        }
        DeclPayload::Import(module) => {
            b.add_namespace(name, NsDef::plain(NamespaceRef::Module(module)));
        }
    }
}

fn report_conflict(msgs: &mut Messages, decl: &NsEntryDecl, other: Span) {
    msgs.error(
        decl.pos,
        format!("name_conflict:{}", decl.name),
        format!(
            "Name conflict: {} '{}' (also declared at {})",
            decl.kind.msg(),
            decl.name,
            other
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{MountName, QualifiedName};

    fn qname(s: &str) -> QualifiedName {
        QualifiedName::new(ModuleName::root(), vec![RName::of(s)])
    }

    fn entity_decl(name: &str, line: u32) -> NsEntryDecl {
        let e = Rc::new(EntityDef::new(qname(name), MountName::empty()));
        NsEntryDecl::new(
            RName::of(name),
            Span::new(line, 1, 1),
            DeclKind::Entity,
            DeclPayload::Entity(e),
        )
    }

    fn function_decl(name: &str, line: u32) -> NsEntryDecl {
        let f = Rc::new(FunctionDef::new(qname(name)));
        NsEntryDecl::new(
            RName::of(name),
            Span::new(line, 1, 1),
            DeclKind::Function,
            DeclPayload::Function(f),
        )
    }

    #[test]
    fn entity_occupies_type_and_value() {
        let mut msgs = Messages::new();
        let asm = assemble_module(vec![vec![entity_decl("user", 1)]], &mut msgs);
        assert!(!msgs.has_errors());
        assert!(asm.public.ty(&RName::of("user")).is_some());
        assert!(asm.public.value(&RName::of("user")).is_some());
        assert!(asm.public.function(&RName::of("user")).is_none());
    }

    #[test]
    fn duplicate_entity_reports_one_conflict() {
        let mut msgs = Messages::new();
        let asm = assemble_module(
            vec![vec![entity_decl("user", 1), entity_decl("user", 5)]],
            &mut msgs,
        );
        assert_eq!(msgs.error_count(), 1);
        assert_eq!(msgs.messages()[0].code, "name_conflict:user");
        // first declaration wins
        assert!(asm.public.ty(&RName::of("user")).is_some());
    }

    #[test]
    fn cross_kind_duplicate_is_a_conflict() {
        let mut msgs = Messages::new();
        assemble_module(
            vec![vec![entity_decl("foo", 1)], vec![function_decl("foo", 2)]],
            &mut msgs,
        );
        assert_eq!(msgs.error_count(), 1);
    }

    #[test]
    fn namespaces_merge_across_files() {
        let mut msgs = Messages::new();
        let ns1 = NsEntryDecl::new(
            RName::of("app"),
            Span::new(1, 1, 1),
            DeclKind::Namespace,
            DeclPayload::Namespace(vec![entity_decl("user", 1)]),
        );
        let ns2 = NsEntryDecl::new(
            RName::of("app"),
            Span::new(1, 1, 1),
            DeclKind::Namespace,
            DeclPayload::Namespace(vec![entity_decl("account", 1)]),
        );
        let asm = assemble_module(vec![vec![ns1], vec![ns2]], &mut msgs);
        assert!(!msgs.has_errors());

        let app = asm.public.namespace(&RName::of("app")).unwrap();
        let NamespaceRef::Inline(inner) = &app.def else {
            panic!("expected inline namespace");
        };
        assert!(inner.ty(&RName::of("user")).is_some());
        assert!(inner.ty(&RName::of("account")).is_some());
    }

    #[test]
    fn private_conflicts_with_public_without_polluting_module() {
        let mut msgs = Messages::new();
        let asm = assemble_module(vec![vec![entity_decl("user", 1)]], &mut msgs);
        assert!(!msgs.has_errors());

        let import = NsEntryDecl::new(
            RName::of("user"),
            Span::new(3, 1, 1),
            DeclKind::Import,
            DeclPayload::Import(ModuleName::parse("lib").unwrap()),
        );
        let private = assemble_file_private(vec![import], &asm.public_names, &mut msgs);
        assert_eq!(msgs.error_count(), 1);
        assert_eq!(msgs.messages()[0].code, "name_conflict:user");
        // the losing import is dropped from the private view
        assert!(private.namespace(&RName::of("user")).is_none());
    }

    #[test]
    fn duplicate_imports_in_one_file_conflict() {
        let mut msgs = Messages::new();
        let mk = |line| {
            NsEntryDecl::new(
                RName::of("lib"),
                Span::new(line, 1, 1),
                DeclKind::Import,
                DeclPayload::Import(ModuleName::parse("lib").unwrap()),
            )
        };
        let private = assemble_file_private(vec![mk(1), mk(2)], &FxHashMap::default(), &mut msgs);
        assert_eq!(msgs.error_count(), 1);
        assert!(private.namespace(&RName::of("lib")).is_some());
    }
}
