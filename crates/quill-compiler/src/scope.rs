//! Name resolution through the scope hierarchy.
//!
//! Single names search outward: file view (module-public partition plus the
//! file's private imports) and then the predefined system namespace; local
//! variables and at-expression attributes are handled by the expression
//! compiler before falling through to here. Dotted paths resolve
//! segment-by-segment through namespace entries, which requires the
//! names-known milestone to have passed.

use std::rc::Rc;

use quill_core::{CError, CResult, MessageType, RName, Span};
use quill_parser::ast;
use quill_registry::{Deprecation, Namespace, NamespaceRef, NsDef, NsFunction, NsValue};

use crate::context::{FileRef, Session};
use crate::passes::CompilerPass;

/// A deprecation hit collected during lookup; reported by the caller once
/// the immutable borrow ends.
pub struct DeprecationNote {
    pub pos: Span,
    pub kind: &'static str,
    pub name: String,
    pub dep: Deprecation,
}

pub fn report_deprecations(sess: &mut Session, notes: &[DeprecationNote]) {
    for n in notes {
        let ty = if n.dep.error || sess.options.deprecated_error {
            MessageType::Error
        } else {
            MessageType::Warning
        };
        sess.msgs.message(
            ty,
            n.pos,
            format!("deprecated:{}:{}:{}", n.kind, n.name, n.dep.use_instead),
            format!(
                "{} '{}' is deprecated, use '{}' instead",
                n.kind, n.name, n.dep.use_instead
            ),
        );
    }
}

/// What a bare name resolves to at namespace level.
pub enum NsLookup {
    Value(NsDef<NsValue>),
    Function(NsDef<NsFunction>),
    Namespace {
        deprecated: Option<Deprecation>,
        ns: Rc<Namespace>,
    },
}

pub fn file_public_ns(sess: &Session, fr: FileRef) -> Rc<Namespace> {
    sess.modules[fr.module]
        .public_ns
        .clone()
        .expect("module namespace not assembled yet")
}

pub fn file_private_ns(sess: &Session, fr: FileRef) -> Rc<Namespace> {
    sess.modules[fr.module].private_ns[fr.file]
        .clone()
        .expect("file namespace not assembled yet")
}

/// Follow a namespace entry to its namespace.
pub fn deref_nsref(sess: &Session, r: &NamespaceRef) -> Rc<Namespace> {
    match r {
        NamespaceRef::Inline(ns) => ns.clone(),
        NamespaceRef::Module(m) => sess
            .module_public_ns(m)
            .expect("imported module namespace not assembled yet"),
    }
}

/// Resolve a bare (non-variable) name: module values, functions and
/// namespaces, then imports, then the system namespace.
pub fn lookup_name(sess: &Session, fr: FileRef, name: &RName) -> Option<NsLookup> {
    sess.check_pass(Some(CompilerPass::Expressions), None);

    let public = file_public_ns(sess, fr);
    if let Some(d) = public.value(name) {
        return Some(NsLookup::Value(d.clone()));
    }
    if let Some(d) = public.function(name) {
        return Some(NsLookup::Function(d.clone()));
    }
    if let Some(d) = public.namespace(name) {
        return Some(NsLookup::Namespace {
            deprecated: d.deprecated.clone(),
            ns: deref_nsref(sess, &d.def),
        });
    }

    let private = file_private_ns(sess, fr);
    if let Some(d) = private.namespace(name) {
        return Some(NsLookup::Namespace {
            deprecated: d.deprecated.clone(),
            ns: deref_nsref(sess, &d.def),
        });
    }

    if let Some(d) = sess.sys_ns.function(name) {
        return Some(NsLookup::Function(d.clone()));
    }
    if let Some(d) = sess.sys_ns.namespace(name) {
        return Some(NsLookup::Namespace {
            deprecated: d.deprecated.clone(),
            ns: deref_nsref(sess, &d.def),
        });
    }

    None
}

/// Resolve a dotted path of namespaces. Requires the names-known milestone.
pub fn resolve_ns_chain(
    sess: &Session,
    fr: FileRef,
    parts: &[ast::Name],
    notes: &mut Vec<DeprecationNote>,
) -> CResult<Rc<Namespace>> {
    sess.check_pass(Some(CompilerPass::Members), None);
    assert!(!parts.is_empty());

    let first = &parts[0];
    let public = file_public_ns(sess, fr);
    let private = file_private_ns(sess, fr);

    let head = public
        .namespace(&first.str)
        .or_else(|| private.namespace(&first.str))
        .or_else(|| sess.sys_ns.namespace(&first.str))
        .ok_or_else(|| CError::unknown_name(first.pos, first.str.as_str()))?;

    note_deprecation(notes, first.pos, "namespace", first.str.as_str(), head);
    let mut cur = deref_nsref(sess, &head.def);

    for part in &parts[1..] {
        let next = cur
            .namespace(&part.str)
            .ok_or_else(|| CError::unknown_name(part.pos, part.str.as_str()))?;
        note_deprecation(notes, part.pos, "namespace", part.str.as_str(), next);
        cur = deref_nsref(sess, &next.def);
    }

    Ok(cur)
}

pub fn note_deprecation<T>(
    notes: &mut Vec<DeprecationNote>,
    pos: Span,
    kind: &'static str,
    name: &str,
    def: &NsDef<T>,
) {
    if let Some(dep) = &def.deprecated {
        notes.push(DeprecationNote {
            pos,
            kind,
            name: name.to_string(),
            dep: dep.clone(),
        });
    }
}
