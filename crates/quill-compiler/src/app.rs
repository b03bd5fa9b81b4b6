//! The compilation driver.
//!
//! `compile_app` walks every module's files (definitions pass), schedules
//! namespace assembly, lets the scheduler run the remaining passes, and
//! freezes the result. The structural-flags computation is registered
//! before anything else so that it runs ahead of every per-definition
//! structure-pass check.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use quill_core::{
    DefHash, EntityFlags, Message, RApp, Span, StructFlags, TypeFlags,
};
use quill_parser::ast;
use quill_registry as registry;

use crate::context::{CompilerOptions, FileRef, Session};
use crate::def;
use crate::graph::DirGraph;
use crate::passes::CompilerPass;

/// The result of compiling an application.
pub struct CompilationResult {
    /// The frozen program; present only when there were no errors.
    pub app: Option<Rc<RApp>>,
    pub messages: Vec<Message>,
}

impl CompilationResult {
    /// Valid when the diagnostics contain no errors; warnings never block.
    pub fn is_valid(&self) -> bool {
        self.messages
            .iter()
            .all(|m| m.ty != quill_core::MessageType::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.ty == quill_core::MessageType::Error)
    }
}

/// Compile a set of modules into a frozen application.
pub fn compile_app(modules: Vec<ast::ModuleAst>, options: CompilerOptions) -> CompilationResult {
    let mut sess = Session::new(options);

    for m in &modules {
        sess.add_module(m.name.clone(), m.files.len());
    }

    // registered first so it precedes every structure-pass check
    sess.on_pass(CompilerPass::Structure, |s| {
        compute_structure(s);
        Ok(())
    });
    sess.on_pass(CompilerPass::Finish, |s| {
        finish_app(s);
        Ok(())
    });

    for (mi, m) in modules.into_iter().enumerate() {
        for (fi, file) in m.files.into_iter().enumerate() {
            def::declare_file(&mut sess, FileRef { module: mi, file: fi }, file);
        }
        sess.on_pass(CompilerPass::Namespaces, move |s| {
            assemble_module_ns(s, mi);
            Ok(())
        });
    }

    sess.run();

    let app = if sess.msgs.has_errors() {
        None
    } else {
        sess.app.clone()
    };
    let messages = std::mem::take(&mut sess.msgs).into_messages();
    CompilationResult { app, messages }
}

/// Assemble one module's namespaces: the module-public namespace over all
/// files' public declarations, then each file's private view.
fn assemble_module_ns(sess: &mut Session, mi: usize) {
    let decls = std::mem::take(&mut sess.modules[mi].public_decls);
    let asm = registry::assemble_module(decls, &mut sess.msgs);
    sess.modules[mi].public_ns = Some(asm.public);
    sess.modules[mi].public_names = asm.public_names;

    let n_files = sess.modules[mi].private_ns.len();
    for fi in 0..n_files {
        let private = std::mem::take(&mut sess.modules[mi].private_decls[fi]);
        let names = std::mem::take(&mut sess.modules[mi].public_names);
        let ns = registry::assemble_file_private(private, &names, &mut sess.msgs);
        sess.modules[mi].public_names = names;
        sess.modules[mi].private_ns[fi] = Some(ns);
    }
}

/// Dependency-graph analysis over all record-like definitions: derived
/// struct and entity flags, struct-cycle errors.
fn compute_structure(sess: &mut Session) {
    compute_struct_flags(sess);
    compute_entity_flags(sess);
}

fn compute_struct_flags(sess: &mut Session) {
    let structs = sess.all_structs.clone();
    let by_hash: FxHashMap<DefHash, usize> = structs
        .iter()
        .enumerate()
        .map(|(i, s)| (s.def_hash, i))
        .collect();

    // full reference graph and by-value inclusion subgraph
    let mut graph: DirGraph<DefHash> = DirGraph::new();
    let mut direct: DirGraph<DefHash> = DirGraph::new();
    let mut mutable_seeds = Vec::new();
    let mut no_to_seeds = Vec::new();
    let mut no_from_seeds = Vec::new();

    for s in &structs {
        graph.add_vertex(s.def_hash);
        direct.add_vertex(s.def_hash);
    }

    for s in &structs {
        let Some(attrs) = s.try_attributes() else {
            continue;
        };
        let mut flags = TypeFlags::gtv_both();
        let mut any_mutable = false;
        for attr in attrs {
            let shallow = attr.ty.flags_shallow();
            any_mutable |= attr.mutable || shallow.contains(TypeFlags::MUTABLE);
            flags &= shallow | TypeFlags::MUTABLE;

            let mut comps = Vec::new();
            attr.ty.component_structs(&mut comps);
            for dep in comps {
                graph.add_edge(s.def_hash, dep.def_hash);
            }

            let mut incl = Vec::new();
            attr.ty.direct_inclusion_structs(&mut incl);
            for dep in incl {
                direct.add_edge(s.def_hash, dep.def_hash);
            }
        }
        if any_mutable {
            mutable_seeds.push(s.def_hash);
        }
        if !flags.contains(TypeFlags::GTV_TO) {
            no_to_seeds.push(s.def_hash);
        }
        if !flags.contains(TypeFlags::GTV_FROM) {
            no_from_seeds.push(s.def_hash);
        }
    }

    let cyclic: FxHashSet<DefHash> = graph.find_cyclic_vertices().into_iter().collect();
    let infinite: FxHashSet<DefHash> = direct.find_cyclic_vertices().into_iter().collect();

    // one error per distinct by-value cycle, against a representative member
    let mut reported: FxHashSet<Vec<DefHash>> = FxHashSet::default();
    for cycle in direct.find_cycles() {
        let mut key = cycle.clone();
        key.sort();
        if !reported.insert(key) {
            continue;
        }
        let names = cycle
            .iter()
            .rev()
            .map(|h| structs[by_hash[h]].name.module_level_str())
            .collect::<Vec<_>>()
            .join(",");
        let head = cycle.last().unwrap();
        let pos = sess
            .def_positions
            .get(head)
            .copied()
            .unwrap_or_else(Span::default);
        sess.msgs.error(
            pos,
            format!("struct_cycle:{names}"),
            format!("Struct includes itself by value: {names}"),
        );
    }

    // bad properties spread to everything that can reach a bad vertex
    let transposed = graph.transpose();
    let spread = |seeds: &[DefHash]| -> FxHashSet<DefHash> {
        transposed.closure(seeds).into_iter().collect()
    };
    let mutable_set = spread(&mutable_seeds);
    let no_to_set = spread(&no_to_seeds);
    let no_from_set = spread(&no_from_seeds);

    for s in &structs {
        let mut type_flags = TypeFlags::empty();
        if mutable_set.contains(&s.def_hash) {
            type_flags |= TypeFlags::MUTABLE;
        }
        if !no_to_set.contains(&s.def_hash) {
            type_flags |= TypeFlags::GTV_TO;
        }
        if !no_from_set.contains(&s.def_hash) {
            type_flags |= TypeFlags::GTV_FROM;
        }
        s.set_flags(StructFlags {
            type_flags,
            cyclic: cyclic.contains(&s.def_hash),
            infinite: infinite.contains(&s.def_hash),
        });
    }
}

fn compute_entity_flags(sess: &mut Session) {
    let entities = sess.all_entities.clone();
    let mut graph: DirGraph<DefHash> = DirGraph::new();

    for e in &entities {
        graph.add_vertex(e.def_hash);
    }
    for e in &entities {
        let Some(body) = e.try_body() else { continue };
        for attr in &body.attributes {
            let mut comps = Vec::new();
            attr.ty.component_entities(&mut comps);
            for dep in comps {
                graph.add_edge(e.def_hash, dep.def_hash);
            }
        }
    }

    // entity cycles are legal (references are by rowid); only flagged
    let cyclic: FxHashSet<DefHash> = graph.find_cyclic_vertices().into_iter().collect();

    for e in &entities {
        let mutable = e
            .try_body()
            .is_some_and(|b| b.attributes.iter().any(|a| a.mutable));
        e.set_flags(EntityFlags {
            mutable,
            cyclic: cyclic.contains(&e.def_hash),
        });
    }
}

/// Freeze everything into the final application structure.
fn finish_app(sess: &mut Session) {
    let states = std::mem::take(&mut sess.modules);
    let modules = states.into_iter().map(|m| m.into_rmodule()).collect();
    sess.app = Some(Rc::new(RApp::assemble(modules)));
}
