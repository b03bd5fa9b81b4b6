//! Definition compilation.
//!
//! The declaration walk runs inline during the definitions pass: it creates
//! definition shells, records name declarations for the assembler and
//! registers the later-pass work — member/signature resolution at the
//! members pass, bodies and constant evaluation at the expressions pass,
//! frame sealing at the frames pass. Tasks capture only the definition
//! `Rc`s and the syntax they compile; everything else is read from the
//! session they receive.

use std::rc::Rc;

use quill_core::{
    Attribute, CError, CResult, ConstantDef, EntityBody, EntityDef, FnHeader, FunctionDef,
    ModuleName, MountName, OperationDef, Param, QualifiedName, QueryDef, RCallFrame, RFnBody,
    RName, RStatement, RType, Span, StructDef,
};
use quill_parser::ast;
use quill_registry::{DeclKind, DeclPayload, NsEntryDecl};

use crate::const_eval;
use crate::context::{DefinitionType, FileRef, Session};
use crate::frame::FnCompiler;
use crate::passes::CompilerPass;
use crate::type_resolver;
use crate::varfact::{VarFact, VarFacts};

/// Walk one file's definitions, filling its declaration lists and
/// registering all later-pass work.
pub fn declare_file(sess: &mut Session, fr: FileRef, file: ast::SourceFile) {
    let mut public = Vec::new();
    let mut private = Vec::new();
    declare_defs(sess, fr, &[], file.defs, &mut public, Some(&mut private));
    let module = &mut sess.modules[fr.module];
    module.public_decls[fr.file] = public;
    module.private_decls[fr.file] = private;
}

fn declare_defs(
    sess: &mut Session,
    fr: FileRef,
    ns_path: &[RName],
    defs: Vec<ast::Def>,
    public: &mut Vec<NsEntryDecl>,
    mut private: Option<&mut Vec<NsEntryDecl>>,
) {
    for def in defs {
        match def {
            ast::Def::Entity(d) => declare_entity(sess, fr, ns_path, d, public),
            ast::Def::Struct(d) => declare_struct(sess, fr, ns_path, d, public),
            ast::Def::Function(d) => declare_function(sess, fr, ns_path, d, public),
            ast::Def::Operation(d) => declare_operation(sess, fr, ns_path, d, public),
            ast::Def::Query(d) => declare_query(sess, fr, ns_path, d, public),
            ast::Def::Constant(d) => declare_constant(sess, fr, ns_path, d, public),
            ast::Def::Namespace(d) => {
                let mut child = Vec::new();
                let mut child_path = ns_path.to_vec();
                child_path.push(d.name.str.clone());
                declare_defs(sess, fr, &child_path, d.defs, &mut child, None);
                public.push(NsEntryDecl::new(
                    d.name.str,
                    d.name.pos,
                    DeclKind::Namespace,
                    DeclPayload::Namespace(child),
                ));
            }
            ast::Def::Import(d) => match private.as_deref_mut() {
                None => sess.msgs.error(
                    d.pos,
                    "import:namespace",
                    "Imports must be declared at file level",
                ),
                Some(private) => declare_import(sess, d, private),
            },
        }
    }
}

fn declare_import(sess: &mut Session, d: ast::ImportDef, private: &mut Vec<NsEntryDecl>) {
    let module = ModuleName::new(d.module.iter().map(|n| n.str.clone()).collect());
    if !sess.module_index.contains_key(&module) {
        sess.msgs.error(
            d.pos,
            format!("import_unknown_module:{module}"),
            format!("Unknown module: '{module}'"),
        );
        return;
    }
    let alias = d.alias_name().clone();
    private.push(NsEntryDecl::new(
        alias.str,
        alias.pos,
        DeclKind::Import,
        DeclPayload::Import(module),
    ));
}

/// Qualified name and mount name of a definition at the given namespace
/// path.
fn def_names(
    sess: &Session,
    fr: FileRef,
    ns_path: &[RName],
    name: &ast::Name,
) -> (QualifiedName, MountName) {
    let module = &sess.modules[fr.module];
    let mut path = ns_path.to_vec();
    path.push(name.str.clone());
    let qname = QualifiedName::new(module.name.clone(), path.clone());
    let mount = module.mount.child(&path);
    (qname, mount)
}

// ============================================================================
// Entities and structs
// ============================================================================

fn declare_entity(
    sess: &mut Session,
    fr: FileRef,
    ns_path: &[RName],
    d: ast::EntityDef,
    out: &mut Vec<NsEntryDecl>,
) {
    let (qname, mount) = def_names(sess, fr, ns_path, &d.name);
    let entity = Rc::new(EntityDef::new(qname, mount));
    sess.def_positions.insert(entity.def_hash, d.name.pos);
    sess.all_entities.push(entity.clone());
    sess.modules[fr.module].contents.entities.push(entity.clone());
    out.push(NsEntryDecl::new(
        d.name.str.clone(),
        d.name.pos,
        DeclKind::Entity,
        DeclPayload::Entity(entity.clone()),
    ));

    sess.on_pass(CompilerPass::Members, move |s| {
        compile_entity_members(s, fr, entity, d);
        Ok(())
    });
}

fn compile_entity_members(sess: &mut Session, fr: FileRef, entity: Rc<EntityDef>, d: ast::EntityDef) {
    let mut attrs: Vec<Rc<Attribute>> = Vec::new();
    let mut defaults: Vec<(Rc<Attribute>, ast::Expr)> = Vec::new();
    let mut key_clauses = Vec::new();
    let mut index_clauses = Vec::new();

    for member in d.members {
        match member {
            ast::EntityMember::Attr(a) => {
                if let Some(attr) = compile_attr(sess, fr, a, &attrs, true, &mut defaults) {
                    attrs.push(attr);
                }
            }
            ast::EntityMember::Key(c) => key_clauses.push(c),
            ast::EntityMember::Index(c) => index_clauses.push(c),
        }
    }

    let keys = check_key_clauses(sess, &attrs, key_clauses);
    let indexes = check_key_clauses(sess, &attrs, index_clauses);

    entity.set_body(EntityBody {
        attributes: attrs,
        keys,
        indexes,
    });

    schedule_defaults(sess, fr, DefinitionType::Entity, defaults);
}

fn declare_struct(
    sess: &mut Session,
    fr: FileRef,
    ns_path: &[RName],
    d: ast::StructDef,
    out: &mut Vec<NsEntryDecl>,
) {
    let (qname, _) = def_names(sess, fr, ns_path, &d.name);
    let struct_def = Rc::new(StructDef::new(qname));
    sess.def_positions.insert(struct_def.def_hash, d.name.pos);
    sess.all_structs.push(struct_def.clone());
    sess.modules[fr.module]
        .contents
        .structs
        .push(struct_def.clone());
    out.push(NsEntryDecl::new(
        d.name.str.clone(),
        d.name.pos,
        DeclKind::Struct,
        DeclPayload::Struct(struct_def.clone()),
    ));

    sess.on_pass(CompilerPass::Members, move |s| {
        let mut attrs: Vec<Rc<Attribute>> = Vec::new();
        let mut defaults = Vec::new();
        for a in d.attrs {
            if let Some(attr) = compile_attr(s, fr, a, &attrs, false, &mut defaults) {
                attrs.push(attr);
            }
        }
        struct_def.set_attributes(attrs);
        schedule_defaults(s, fr, DefinitionType::Struct, defaults);
        Ok(())
    });
}

/// Resolve one attribute declaration. An attribute without a type annotation
/// takes its name as its type.
fn compile_attr(
    sess: &mut Session,
    fr: FileRef,
    a: ast::AttrDef,
    earlier: &[Rc<Attribute>],
    require_sql: bool,
    defaults: &mut Vec<(Rc<Attribute>, ast::Expr)>,
) -> Option<Rc<Attribute>> {
    if earlier.iter().any(|x| x.name == a.name.str) {
        sess.msgs.error(
            a.name.pos,
            format!("dup_attr:{}", a.name.str),
            format!("Duplicate attribute: '{}'", a.name.str),
        );
        return None;
    }

    let ty = match &a.ty {
        Some(t) => match type_resolver::resolve_type(sess, fr, t) {
            Ok(ty) => ty,
            Err(e) => {
                sess.msgs.report(&e);
                RType::Error
            }
        },
        None => {
            let tref = ast::TypeRef::Name(ast::QualName::new(vec![a.name.clone()]));
            match type_resolver::resolve_type(sess, fr, &tref) {
                Ok(ty) => ty,
                Err(_) => {
                    sess.msgs.error(
                        a.name.pos,
                        format!("unknown_name_type:{}", a.name.str),
                        format!("Attribute '{}' has no type and its name is not a type", a.name.str),
                    );
                    RType::Error
                }
            }
        }
    };

    if require_sql && !ty.is_sql_compatible() {
        sess.msgs.error(
            a.name.pos,
            format!("entity_attr_type:{}:{}", a.name.str, ty.name()),
            format!("Attribute '{}' has non-SQL-compatible type '{ty}'", a.name.str),
        );
    }

    let attr = Rc::new(Attribute::new(
        a.name.str.clone(),
        ty,
        a.mutable,
        a.expr.is_some(),
    ));
    if let Some(expr) = a.expr {
        defaults.push((attr.clone(), expr));
    }
    Some(attr)
}

fn check_key_clauses(
    sess: &mut Session,
    attrs: &[Rc<Attribute>],
    clauses: Vec<ast::KeyClause>,
) -> Vec<Vec<RName>> {
    let mut res = Vec::new();
    for clause in clauses {
        let mut names: Vec<RName> = Vec::new();
        let mut ok = true;
        for n in &clause.attrs {
            if !attrs.iter().any(|a| a.name == n.str) {
                sess.msgs.error(
                    n.pos,
                    format!("entity_keyindex_unknown:{}", n.str),
                    format!("Unknown attribute: '{}'", n.str),
                );
                ok = false;
            } else if names.contains(&n.str) {
                sess.msgs.error(
                    n.pos,
                    format!("entity_keyindex_dup:{}", n.str),
                    format!("Duplicate attribute in key/index: '{}'", n.str),
                );
                ok = false;
            } else {
                names.push(n.str.clone());
            }
        }
        if ok && !names.is_empty() {
            res.push(names);
        }
    }
    res
}

fn schedule_defaults(
    sess: &mut Session,
    fr: FileRef,
    owner: DefinitionType,
    defaults: Vec<(Rc<Attribute>, ast::Expr)>,
) {
    if defaults.is_empty() {
        return;
    }
    sess.on_pass(CompilerPass::Expressions, move |s| {
        for (attr, expr) in defaults {
            if let Err(e) = compile_attr_default(s, fr, owner, &attr, &expr) {
                s.msgs.report(&e);
            }
        }
        Ok(())
    });
}

fn compile_attr_default(
    sess: &mut Session,
    fr: FileRef,
    owner: DefinitionType,
    attr: &Rc<Attribute>,
    expr: &ast::Expr,
) -> CResult<()> {
    let name = format!("{}.<default>", attr.name);
    let value = {
        let mut fc = FnCompiler::new(&mut *sess, fr, owner, &name, None);
        fc.compile_expr_value(expr, &VarFacts::empty())?
    };

    let value = if attr.ty.is_assignable_from(&value.ty) {
        value
    } else if attr.ty == RType::Decimal && value.ty == RType::Integer {
        value.promote_integer_to_decimal()
    } else {
        return Err(CError::type_mismatch(
            value.pos,
            &attr.ty.name(),
            &value.ty.name(),
            &format!("Default value of '{}'", attr.name),
        ));
    };

    attr.set_default(value.to_eval_expr()?);
    Ok(())
}

// ============================================================================
// Functions, operations, queries
// ============================================================================

fn resolve_params(sess: &mut Session, fr: FileRef, params: &[ast::ParamDef]) -> Vec<Param> {
    let mut res: Vec<Param> = Vec::with_capacity(params.len());
    for p in params {
        if res.iter().any(|x| x.name == p.name.str) {
            sess.msgs.error(
                p.name.pos,
                format!("dup_param:{}", p.name.str),
                format!("Duplicate parameter: '{}'", p.name.str),
            );
            continue;
        }
        let ty = match type_resolver::resolve_type(sess, fr, &p.ty) {
            Ok(ty) => ty,
            Err(e) => {
                sess.msgs.report(&e);
                RType::Error
            }
        };
        res.push(Param {
            name: p.name.str.clone(),
            ty,
        });
    }
    res
}

/// Compile a function/operation/query body into a statement tree plus its
/// sealed frame and the actual return type.
fn compile_fn_body(
    sess: &mut Session,
    fr: FileRef,
    def_type: DefinitionType,
    pos: Span,
    name: &str,
    params: &[Param],
    explicit_ret: Option<RType>,
    body: &ast::FnBody,
) -> CResult<(RStatement, RCallFrame, RType)> {
    let mut fc = FnCompiler::new(sess, fr, def_type, name, explicit_ret);

    let mut facts = VarFacts::empty();
    for p in params {
        let var = fc.declare_param(&p.name, p.ty.clone());
        facts.put_mut(&VarFacts::of_inited(var.uid.clone(), VarFact::Yes));
    }

    match body {
        ast::FnBody::Short(expr) => {
            let v = fc.compile_expr_value(expr, &facts)?;
            fc.ret.match_type(v.pos, &v.ty)?;
            let ret = fc.ret.ret_type();
            let frame = fc.frame.seal();
            Ok((RStatement::Return(Some(v.to_eval_expr()?)), frame, ret))
        }
        ast::FnBody::Full(stmts) => {
            let r = fc.compile_block(pos, stmts, &facts)?;
            let ret = fc.ret.ret_type();
            if ret != RType::Unit && !ret.is_error() && !r.returns_always {
                return Err(CError::new(
                    pos,
                    format!("fn_noreturn:{name}"),
                    format!("'{name}' does not return a value on every path"),
                ));
            }
            Ok((r.stmt, fc.frame.seal(), ret))
        }
    }
}

fn declare_function(
    sess: &mut Session,
    fr: FileRef,
    ns_path: &[RName],
    d: ast::FunctionDef,
    out: &mut Vec<NsEntryDecl>,
) {
    let (qname, _) = def_names(sess, fr, ns_path, &d.name);
    let func = Rc::new(FunctionDef::new(qname));
    sess.def_positions.insert(func.def_hash, d.name.pos);
    sess.modules[fr.module].contents.functions.push(func.clone());
    out.push(NsEntryDecl::new(
        d.name.str.clone(),
        d.name.pos,
        DeclKind::Function,
        DeclPayload::Function(func.clone()),
    ));

    let pos = d.name.pos;
    sess.on_pass(CompilerPass::Members, move |s| {
        let params = resolve_params(s, fr, &d.params);
        let ret = match &d.ret {
            Some(t) => match type_resolver::resolve_type(s, fr, t) {
                Ok(ty) => ty,
                Err(e) => {
                    s.msgs.report(&e);
                    RType::Error
                }
            },
            None => RType::Unit,
        };
        func.set_header(FnHeader {
            params: params.clone(),
            ret: ret.clone(),
        });

        let body = d.body;
        let name_str = func.name.module_level_str();
        let func2 = func.clone();
        s.on_pass(CompilerPass::Expressions, move |s| {
            let (stmt, frame, _) = compile_fn_body(
                s,
                fr,
                DefinitionType::Function,
                pos,
                &name_str,
                &params,
                Some(ret),
                &body,
            )?;
            s.on_pass(CompilerPass::Frames, move |_s| {
                func2.set_body(RFnBody { frame, body: stmt });
                Ok(())
            });
            Ok(())
        });
        Ok(())
    });
}

fn declare_operation(
    sess: &mut Session,
    fr: FileRef,
    ns_path: &[RName],
    d: ast::OperationDef,
    out: &mut Vec<NsEntryDecl>,
) {
    let (qname, mount) = def_names(sess, fr, ns_path, &d.name);
    let op = Rc::new(OperationDef::new(qname, mount));
    sess.def_positions.insert(op.def_hash, d.name.pos);
    sess.modules[fr.module].contents.operations.push(op.clone());
    out.push(NsEntryDecl::new(
        d.name.str.clone(),
        d.name.pos,
        DeclKind::Operation,
        DeclPayload::Operation(op.clone()),
    ));

    let pos = d.name.pos;
    sess.on_pass(CompilerPass::Members, move |s| {
        let params = resolve_params(s, fr, &d.params);
        op.set_params(params.clone());

        let body = ast::FnBody::Full(d.body);
        let name_str = op.name.module_level_str();
        let op2 = op.clone();
        s.on_pass(CompilerPass::Expressions, move |s| {
            let (stmt, frame, _) = compile_fn_body(
                s,
                fr,
                DefinitionType::Operation,
                pos,
                &name_str,
                &params,
                Some(RType::Unit),
                &body,
            )?;
            s.on_pass(CompilerPass::Frames, move |_s| {
                op2.set_body(RFnBody { frame, body: stmt });
                Ok(())
            });
            Ok(())
        });
        Ok(())
    });
}

fn declare_query(
    sess: &mut Session,
    fr: FileRef,
    ns_path: &[RName],
    d: ast::QueryDef,
    out: &mut Vec<NsEntryDecl>,
) {
    let (qname, mount) = def_names(sess, fr, ns_path, &d.name);
    let query = Rc::new(QueryDef::new(qname, mount));
    sess.def_positions.insert(query.def_hash, d.name.pos);
    sess.modules[fr.module].contents.queries.push(query.clone());
    out.push(NsEntryDecl::new(
        d.name.str.clone(),
        d.name.pos,
        DeclKind::Query,
        DeclPayload::Query(query.clone()),
    ));

    let pos = d.name.pos;
    sess.on_pass(CompilerPass::Members, move |s| {
        let params = resolve_params(s, fr, &d.params);
        let explicit_ret = match &d.ret {
            Some(t) => match type_resolver::resolve_type(s, fr, t) {
                Ok(ty) => Some(ty),
                Err(e) => {
                    s.msgs.report(&e);
                    Some(RType::Error)
                }
            },
            None => None,
        };

        let body = d.body;
        let name_str = query.name.module_level_str();
        let query2 = query.clone();
        s.on_pass(CompilerPass::Expressions, move |s| {
            let (stmt, frame, ret) = compile_fn_body(
                s,
                fr,
                DefinitionType::Query,
                pos,
                &name_str,
                &params,
                explicit_ret,
                &body,
            )?;

            if ret == RType::Unit {
                s.msgs.error(
                    pos,
                    format!("query_noret:{name_str}"),
                    format!("Query '{name_str}' must return a value"),
                );
            }

            query2.set_header(FnHeader {
                params,
                ret: ret.clone(),
            });

            // serialization check runs once structural flags exist
            let q_name = name_str.clone();
            let ret2 = ret.clone();
            s.on_pass(CompilerPass::Structure, move |s| {
                if !ret2.is_gtv_to() && !ret2.is_error() {
                    s.msgs.error(
                        pos,
                        format!("query_rettype_nogtv:{q_name}:{}", ret2.name()),
                        format!("Query '{q_name}' return type '{ret2}' is not serializable"),
                    );
                }
                Ok(())
            });

            let query3 = query2.clone();
            s.on_pass(CompilerPass::Frames, move |_s| {
                query3.set_body(RFnBody { frame, body: stmt });
                Ok(())
            });
            Ok(())
        });
        Ok(())
    });
}

// ============================================================================
// Constants
// ============================================================================

fn declare_constant(
    sess: &mut Session,
    fr: FileRef,
    ns_path: &[RName],
    d: ast::ConstantDef,
    out: &mut Vec<NsEntryDecl>,
) {
    let (qname, _) = def_names(sess, fr, ns_path, &d.name);
    let cdef = Rc::new(ConstantDef::new(qname));
    sess.def_positions.insert(cdef.def_hash, d.name.pos);
    sess.modules[fr.module].contents.constants.push(cdef.clone());
    out.push(NsEntryDecl::new(
        d.name.str.clone(),
        d.name.pos,
        DeclKind::Constant,
        DeclPayload::Constant(cdef.clone()),
    ));

    sess.pending_consts.insert(
        cdef.def_hash,
        crate::context::PendingConst {
            def: cdef.clone(),
            ty: d.ty,
            expr: d.expr,
            fr,
        },
    );

    let pos = d.name.pos;
    sess.on_pass(CompilerPass::Expressions, move |s| {
        const_eval::force_constant(s, &cdef, pos).map(|_| ())
    });
}
