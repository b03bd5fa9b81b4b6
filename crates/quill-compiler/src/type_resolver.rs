//! Type resolution: syntax type references to resolved types.

use std::rc::Rc;

use quill_core::{CError, CResult, EntityDef, RType, TupleField};
use quill_parser::ast;

use crate::context::{FileRef, Session};
use crate::passes::CompilerPass;
use crate::scope::{self, DeprecationNote};

/// Resolve a type reference through the file's scope chain.
pub fn resolve_type(sess: &mut Session, fr: FileRef, tref: &ast::TypeRef) -> CResult<RType> {
    sess.check_pass(Some(CompilerPass::Members), None);
    let mut notes = Vec::new();
    let res = resolve_type0(sess, fr, tref, &mut notes);
    scope::report_deprecations(sess, &notes);
    res
}

fn resolve_type0(
    sess: &Session,
    fr: FileRef,
    tref: &ast::TypeRef,
    notes: &mut Vec<DeprecationNote>,
) -> CResult<RType> {
    match tref {
        ast::TypeRef::Name(q) => resolve_type_name(sess, fr, q, notes),
        ast::TypeRef::Nullable { inner, .. } => {
            Ok(RType::nullable(resolve_type0(sess, fr, inner, notes)?))
        }
        ast::TypeRef::List { elem, .. } => {
            Ok(RType::list(resolve_type0(sess, fr, elem, notes)?))
        }
        ast::TypeRef::Set { elem, .. } => Ok(RType::Set(Box::new(resolve_type0(
            sess, fr, elem, notes,
        )?))),
        ast::TypeRef::Map { key, value, .. } => Ok(RType::map(
            resolve_type0(sess, fr, key, notes)?,
            resolve_type0(sess, fr, value, notes)?,
        )),
        ast::TypeRef::Tuple { fields, .. } => {
            let mut res = Vec::with_capacity(fields.len());
            for (name, fty) in fields {
                res.push(TupleField {
                    name: name.as_ref().map(|n| n.str.clone()),
                    ty: resolve_type0(sess, fr, fty, notes)?,
                });
            }
            Ok(RType::Tuple(res))
        }
    }
}

fn resolve_type_name(
    sess: &Session,
    fr: FileRef,
    q: &ast::QualName,
    notes: &mut Vec<DeprecationNote>,
) -> CResult<RType> {
    let last = q.last();

    let found = if q.parts.len() == 1 {
        let public = scope::file_public_ns(sess, fr);
        public
            .ty(&last.str)
            .cloned()
            .or_else(|| sess.sys_ns.ty(&last.str).cloned())
    } else {
        let ns = scope::resolve_ns_chain(sess, fr, &q.parts[..q.parts.len() - 1], notes)?;
        ns.ty(&last.str).cloned()
    };

    match found {
        Some(def) => {
            scope::note_deprecation(notes, last.pos, "type", last.str.as_str(), &def);
            Ok(def.def)
        }
        None => Err(CError::unknown_type(last.pos, &q.str())),
    }
}

/// Resolve a name path to an entity definition (at-expressions, `create`).
pub fn resolve_entity(sess: &mut Session, fr: FileRef, q: &ast::QualName) -> CResult<Rc<EntityDef>> {
    let ty = resolve_type(sess, fr, &ast::TypeRef::Name(q.clone()))?;
    match ty {
        RType::Entity(e) => Ok(e),
        _ => Err(CError::new(
            q.pos(),
            format!("unknown_entity:{}", q.str()),
            format!("'{}' is not an entity", q.str()),
        )),
    }
}
