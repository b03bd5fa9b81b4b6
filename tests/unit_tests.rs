//! End-to-end compiler tests: programmatically built syntax trees through
//! the full pass pipeline.

use quill::ast;
use quill::{compile_app, CompilationResult, CompilerOptions, MessageType, ModuleName, Span};
use quill_core::{AtCardinality, EvalExpr, RStatement, RType, SqlExpr};

const SP: Span = Span {
    line: 1,
    col: 1,
    len: 1,
};

// ============================================================================
// Builders
// ============================================================================

fn name(s: &str) -> ast::Name {
    ast::Name::new(s, SP)
}

fn tref(s: &str) -> ast::TypeRef {
    ast::TypeRef::Name(ast::QualName::of(&[s], SP))
}

fn tref_nullable(s: &str) -> ast::TypeRef {
    ast::TypeRef::Nullable {
        inner: Box::new(tref(s)),
        pos: SP,
    }
}

fn attr(n: &str, ty: &str) -> ast::EntityMember {
    ast::EntityMember::Attr(ast::AttrDef {
        name: name(n),
        ty: Some(tref(ty)),
        mutable: false,
        expr: None,
    })
}

fn entity(n: &str, members: Vec<ast::EntityMember>) -> ast::Def {
    ast::Def::Entity(ast::EntityDef {
        name: name(n),
        members,
    })
}

fn user_entity() -> ast::Def {
    entity("user", vec![attr("name", "text"), attr("age", "integer")])
}

fn param(n: &str, ty: ast::TypeRef) -> ast::ParamDef {
    ast::ParamDef { name: name(n), ty }
}

fn query_short(n: &str, params: Vec<ast::ParamDef>, ret: Option<&str>, expr: ast::Expr) -> ast::Def {
    ast::Def::Query(ast::QueryDef {
        name: name(n),
        params,
        ret: ret.map(tref),
        body: ast::FnBody::Short(expr),
    })
}

fn function_full(
    n: &str,
    params: Vec<ast::ParamDef>,
    ret: Option<&str>,
    stmts: Vec<ast::Stmt>,
) -> ast::Def {
    ast::Def::Function(ast::FunctionDef {
        name: name(n),
        params,
        ret: ret.map(tref),
        body: ast::FnBody::Full(stmts),
    })
}

fn nm(s: &str) -> ast::Expr {
    ast::Expr::Name(name(s))
}

fn lit_int(v: i64) -> ast::Expr {
    ast::Expr::Literal {
        pos: SP,
        val: ast::Literal::Integer(v),
    }
}

fn lit_text(s: &str) -> ast::Expr {
    ast::Expr::Literal {
        pos: SP,
        val: ast::Literal::Text(s.into()),
    }
}

fn lit_null() -> ast::Expr {
    ast::Expr::Literal {
        pos: SP,
        val: ast::Literal::Null,
    }
}

fn binary(op: ast::BinOp, l: ast::Expr, r: ast::Expr) -> ast::Expr {
    ast::Expr::Binary {
        pos: SP,
        op,
        left: Box::new(l),
        right: Box::new(r),
    }
}

fn at(entity: &str, cardinality: AtCardinality, where_clause: Vec<ast::Expr>) -> ast::Expr {
    ast::Expr::At {
        pos: SP,
        from: ast::QualName::of(&[entity], SP),
        cardinality,
        where_clause,
    }
}

fn member(base: ast::Expr, n: &str) -> ast::Expr {
    ast::Expr::Member {
        base: Box::new(base),
        name: name(n),
        safe: false,
    }
}

fn call(base: ast::Expr, args: Vec<ast::Expr>) -> ast::Expr {
    ast::Expr::Call {
        pos: SP,
        base: Box::new(base),
        args: args
            .into_iter()
            .map(|expr| ast::CallArg { name: None, expr })
            .collect(),
    }
}

fn compile(defs: Vec<ast::Def>) -> CompilationResult {
    compile_app(
        vec![ast::ModuleAst {
            name: ModuleName::root(),
            files: vec![ast::SourceFile { path: None, defs }],
        }],
        CompilerOptions::default(),
    )
}

fn error_codes(res: &CompilationResult) -> Vec<String> {
    res.errors().map(|m| m.code.clone()).collect()
}

fn query_body(res: &CompilationResult, qname: &str) -> RStatement {
    let app = res.app.as_ref().expect("valid app");
    app.queries[qname].body().body.clone()
}

// ============================================================================
// End-to-end: entities, queries, at-expressions
// ============================================================================

#[test]
fn select_all_query_compiles_clean() {
    let res = compile(vec![
        user_entity(),
        query_short("q", vec![], None, at("user", AtCardinality::ZeroMany, vec![])),
    ]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));

    // the predicate-form where-clause is empty: select-all
    let RStatement::Return(Some(EvalExpr::At(q))) = query_body(&res, "q") else {
        panic!("expected a returned at-expression");
    };
    assert!(q.where_clause.is_none());
    assert!(q.what.is_none());
}

#[test]
fn at_projection_narrows_query_type() {
    // user @* {}.name  ->  list<text>, projection pushed into the query
    let res = compile(vec![
        user_entity(),
        query_short(
            "names",
            vec![],
            None,
            member(at("user", AtCardinality::ZeroMany, vec![]), "name"),
        ),
    ]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));

    let app = res.app.as_ref().unwrap();
    let header = app.queries["names"].header();
    assert_eq!(header.ret, RType::list(RType::Text));

    let RStatement::Return(Some(EvalExpr::At(q))) = query_body(&res, "names") else {
        panic!("expected a returned at-expression");
    };
    assert!(q.where_clause.is_none());
    assert!(matches!(q.what, Some(SqlExpr::Attr { .. })));
}

#[test]
fn duplicate_entity_is_one_diagnostic_not_a_crash() {
    let res = compile(vec![
        user_entity(),
        user_entity(),
        query_short("q", vec![], None, at("user", AtCardinality::ZeroMany, vec![])),
    ]);
    let codes = error_codes(&res);
    assert_eq!(codes, vec!["name_conflict:user".to_string()]);
    assert!(res.app.is_none());
}

#[test]
fn where_condition_mixes_column_and_parameter() {
    // user @* { name == n }: the attribute side is a genuine predicate
    // node, the parameter side enters as an interpreted one
    let res = compile(vec![
        user_entity(),
        query_short(
            "by_name",
            vec![param("n", tref("text"))],
            None,
            at(
                "user",
                AtCardinality::ZeroMany,
                vec![binary(ast::BinOp::Eq, nm("name"), nm("n"))],
            ),
        ),
    ]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));

    let RStatement::Return(Some(EvalExpr::At(q))) = query_body(&res, "by_name") else {
        panic!("expected a returned at-expression");
    };
    let Some(SqlExpr::Binary { left, right, .. }) = q.where_clause else {
        panic!("expected a where-clause");
    };
    assert!(matches!(*left, SqlExpr::Attr { .. }));
    assert!(matches!(*right, SqlExpr::Interpreted(_)));
}

#[test]
fn non_boolean_where_condition_is_an_error() {
    let res = compile(vec![
        user_entity(),
        query_short(
            "q",
            vec![],
            None,
            at("user", AtCardinality::ZeroMany, vec![nm("age")]),
        ),
    ]);
    assert!(error_codes(&res).iter().any(|c| c.starts_with("at_where:type:0:")));
}

#[test]
fn user_function_in_predicate_context_is_not_representable() {
    // function f(t: text): boolean — no predicate implementation, so
    // calling it on a column inside a where-block must fail
    let res = compile(vec![
        user_entity(),
        ast::Def::Function(ast::FunctionDef {
            name: name("f"),
            params: vec![param("t", tref("text"))],
            ret: Some(tref("boolean")),
            body: ast::FnBody::Short(ast::Expr::Literal {
                pos: SP,
                val: ast::Literal::Boolean(true),
            }),
        }),
        query_short(
            "q",
            vec![],
            None,
            at(
                "user",
                AtCardinality::ZeroMany,
                vec![call(nm("f"), vec![nm("name")])],
            ),
        ),
    ]);
    assert!(error_codes(&res).contains(&"fn_nosql:f".to_string()));
}

// ============================================================================
// Overload resolution
// ============================================================================

#[test]
fn require_nullable_case_narrows() {
    // require(x) with x: integer? resolves to the require(T?) case and
    // yields a non-null integer
    let res = compile(vec![query_short(
        "q",
        vec![param("x", tref_nullable("integer"))],
        None,
        call(nm("require"), vec![nm("x")]),
    )]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    assert_eq!(app.queries["q"].header().ret, RType::Integer);
}

#[test]
fn require_boolean_case_wins_for_boolean() {
    // require(boolean) is registered first; a query returning its unit
    // result is rejected, which proves the boolean case matched
    let res = compile(vec![query_short(
        "q",
        vec![param("b", tref("boolean"))],
        None,
        call(nm("require"), vec![nm("b")]),
    )]);
    assert!(error_codes(&res).iter().any(|c| c.starts_with("query_noret:")));
}

#[test]
fn no_matching_overload_lists_argument_types() {
    let res = compile(vec![query_short(
        "q",
        vec![],
        None,
        call(nm("abs"), vec![lit_text("nope")]),
    )]);
    assert!(error_codes(&res).contains(&"expr_call_argtypes:abs:text".to_string()));
}

#[test]
fn integer_widens_to_decimal_in_min() {
    // min(decimal, decimal) case accepts (decimal, integer) by widening
    let res = compile(vec![query_short(
        "q",
        vec![param("d", tref("decimal"))],
        None,
        call(nm("min"), vec![nm("d"), lit_int(1)]),
    )]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    assert_eq!(app.queries["q"].header().ret, RType::Decimal);
}

#[test]
fn deprecated_member_alias_warns_but_compiles() {
    let res = compile(vec![query_short(
        "q",
        vec![param("t", tref("text"))],
        None,
        call(member(nm("t"), "len"), vec![]),
    )]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let warnings: Vec<_> = res
        .messages
        .iter()
        .filter(|m| m.ty == MessageType::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].code.starts_with("deprecated:function:text.len"));
}

// ============================================================================
// Variable facts
// ============================================================================

#[test]
fn both_branches_initialize_then_read_is_ok() {
    let res = compile(vec![function_full(
        "f",
        vec![param("b", tref("boolean"))],
        Some("integer"),
        vec![
            ast::Stmt::Var {
                name: name("x"),
                ty: Some(tref("integer")),
                expr: None,
            },
            ast::Stmt::If {
                pos: SP,
                cond: nm("b"),
                then_stmt: Box::new(ast::Stmt::Assign {
                    pos: SP,
                    dst: nm("x"),
                    expr: lit_int(1),
                }),
                else_stmt: Some(Box::new(ast::Stmt::Assign {
                    pos: SP,
                    dst: nm("x"),
                    expr: lit_int(2),
                })),
            },
            ast::Stmt::Return {
                pos: SP,
                expr: Some(nm("x")),
            },
        ],
    )]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
}

#[test]
fn one_branch_initialization_makes_read_an_error() {
    let res = compile(vec![function_full(
        "f",
        vec![param("b", tref("boolean"))],
        Some("integer"),
        vec![
            ast::Stmt::Var {
                name: name("x"),
                ty: Some(tref("integer")),
                expr: None,
            },
            ast::Stmt::If {
                pos: SP,
                cond: nm("b"),
                then_stmt: Box::new(ast::Stmt::Assign {
                    pos: SP,
                    dst: nm("x"),
                    expr: lit_int(1),
                }),
                else_stmt: None,
            },
            ast::Stmt::Return {
                pos: SP,
                expr: Some(nm("x")),
            },
        ],
    )]);
    assert!(error_codes(&res).contains(&"expr_var_uninit:x".to_string()));
}

#[test]
fn uninitialized_read_is_an_error() {
    let res = compile(vec![function_full(
        "f",
        vec![],
        Some("integer"),
        vec![
            ast::Stmt::Var {
                name: name("x"),
                ty: Some(tref("integer")),
                expr: None,
            },
            ast::Stmt::Return {
                pos: SP,
                expr: Some(nm("x")),
            },
        ],
    )]);
    assert_eq!(error_codes(&res), vec!["expr_var_uninit:x".to_string()]);
}

#[test]
fn loop_body_facts_do_not_survive_the_loop() {
    // x is assigned inside the loop body, which may run zero times
    let res = compile(vec![function_full(
        "f",
        vec![param("b", tref("boolean"))],
        Some("integer"),
        vec![
            ast::Stmt::Var {
                name: name("x"),
                ty: Some(tref("integer")),
                expr: None,
            },
            ast::Stmt::While {
                pos: SP,
                cond: nm("b"),
                body: Box::new(ast::Stmt::Assign {
                    pos: SP,
                    dst: nm("x"),
                    expr: lit_int(1),
                }),
            },
            ast::Stmt::Return {
                pos: SP,
                expr: Some(nm("x")),
            },
        ],
    )]);
    assert!(error_codes(&res).contains(&"expr_var_uninit:x".to_string()));
}

#[test]
fn dead_code_after_return_is_reported() {
    let res = compile(vec![function_full(
        "f",
        vec![],
        Some("integer"),
        vec![
            ast::Stmt::Return {
                pos: SP,
                expr: Some(lit_int(1)),
            },
            ast::Stmt::Expr(call(nm("print"), vec![lit_int(2)])),
        ],
    )]);
    assert!(error_codes(&res).contains(&"stmt_deadcode".to_string()));
}

// ============================================================================
// Nullability narrowing
// ============================================================================

#[test]
fn null_check_narrows_in_the_else_path() {
    // if (x == null) return 'empty'; return x;   -- x reads as text here
    let res = compile(vec![function_full(
        "f",
        vec![param("x", tref_nullable("text"))],
        Some("text"),
        vec![
            ast::Stmt::If {
                pos: SP,
                cond: binary(ast::BinOp::Eq, nm("x"), lit_null()),
                then_stmt: Box::new(ast::Stmt::Return {
                    pos: SP,
                    expr: Some(lit_text("empty")),
                }),
                else_stmt: None,
            },
            ast::Stmt::Return {
                pos: SP,
                expr: Some(nm("x")),
            },
        ],
    )]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
}

#[test]
fn without_null_check_the_nullable_return_is_rejected() {
    let res = compile(vec![function_full(
        "f",
        vec![param("x", tref_nullable("text"))],
        Some("text"),
        vec![ast::Stmt::Return {
            pos: SP,
            expr: Some(nm("x")),
        }],
    )]);
    assert!(error_codes(&res).contains(&"fn_rettype:text:text?".to_string()));
}

#[test]
fn dereference_in_the_null_branch_is_an_error() {
    // inside `if (x == null)` the value is known null; a plain member
    // access without a further check is rejected
    let res = compile(vec![function_full(
        "f",
        vec![param("x", tref_nullable("text"))],
        Some("integer"),
        vec![
            ast::Stmt::If {
                pos: SP,
                cond: binary(ast::BinOp::Eq, nm("x"), lit_null()),
                then_stmt: Box::new(ast::Stmt::Return {
                    pos: SP,
                    expr: Some(call(member(nm("x"), "size"), vec![])),
                }),
                else_stmt: None,
            },
            ast::Stmt::Return {
                pos: SP,
                expr: Some(lit_int(0)),
            },
        ],
    )]);
    assert!(error_codes(&res).contains(&"expr_mem_null:size".to_string()));
}

#[test]
fn safe_member_call_yields_nullable_result() {
    let res = compile(vec![query_short(
        "q",
        vec![param("x", tref_nullable("text"))],
        None,
        call(
            ast::Expr::Member {
                base: Box::new(nm("x")),
                name: name("size"),
                safe: true,
            },
            vec![],
        ),
    )]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    assert_eq!(
        app.queries["q"].header().ret,
        RType::nullable(RType::Integer)
    );
}

#[test]
fn not_null_assert_narrows() {
    let res = compile(vec![query_short(
        "q",
        vec![param("x", tref_nullable("integer"))],
        None,
        ast::Expr::Unary {
            pos: SP,
            op: ast::UnOp::NotNull,
            expr: Box::new(nm("x")),
        },
    )]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    assert_eq!(app.queries["q"].header().ret, RType::Integer);
}

// ============================================================================
// Construction and the attribute matcher
// ============================================================================

fn create_user(args: Vec<ast::CallArg>) -> ast::Expr {
    ast::Expr::Create {
        pos: SP,
        entity: ast::QualName::of(&["user"], SP),
        args,
    }
}

fn operation_with(stmts: Vec<ast::Stmt>) -> ast::Def {
    ast::Def::Operation(ast::OperationDef {
        name: name("op"),
        params: vec![param("name", tref("text")), param("age", tref("integer"))],
        body: stmts,
    })
}

#[test]
fn create_matches_implicit_args_by_name() {
    let res = compile(vec![
        user_entity(),
        operation_with(vec![ast::Stmt::Expr(create_user(vec![
            ast::CallArg {
                name: None,
                expr: nm("name"),
            },
            ast::CallArg {
                name: None,
                expr: nm("age"),
            },
        ]))]),
    ]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
}

#[test]
fn create_ambiguous_positional_arg_is_an_error() {
    // two text attributes; a positional text literal matches both
    let res = compile(vec![
        entity("pair", vec![attr("a", "text"), attr("b", "text")]),
        ast::Def::Operation(ast::OperationDef {
            name: name("op"),
            params: vec![],
            body: vec![ast::Stmt::Expr(ast::Expr::Create {
                pos: SP,
                entity: ast::QualName::of(&["pair"], SP),
                args: vec![ast::CallArg {
                    name: None,
                    expr: lit_text("x"),
                }],
            })],
        }),
    ]);
    assert!(error_codes(&res).iter().any(|c| c.starts_with("attr_ambig:0:")));
}

#[test]
fn create_missing_attribute_is_an_error() {
    let res = compile(vec![
        user_entity(),
        ast::Def::Operation(ast::OperationDef {
            name: name("op"),
            params: vec![],
            body: vec![ast::Stmt::Expr(create_user(vec![ast::CallArg {
                name: Some(name("name")),
                expr: lit_text("bob"),
            }]))],
        }),
    ]);
    assert!(error_codes(&res).contains(&"attr_missing:age".to_string()));
}

#[test]
fn create_in_a_query_is_a_db_update_error() {
    let res = compile(vec![
        user_entity(),
        query_short(
            "q",
            vec![],
            None,
            create_user(vec![
                ast::CallArg {
                    name: Some(name("name")),
                    expr: lit_text("bob"),
                },
                ast::CallArg {
                    name: Some(name("age")),
                    expr: lit_int(40),
                },
            ]),
        ),
    ]);
    assert!(error_codes(&res).contains(&"no_db_update:query".to_string()));
}

#[test]
fn struct_construction_with_defaults() {
    // struct point { x: integer; y: integer = 0; }
    let res = compile(vec![
        ast::Def::Struct(ast::StructDef {
            name: name("point"),
            attrs: vec![
                ast::AttrDef {
                    name: name("x"),
                    ty: Some(tref("integer")),
                    mutable: false,
                    expr: None,
                },
                ast::AttrDef {
                    name: name("y"),
                    ty: Some(tref("integer")),
                    mutable: false,
                    expr: Some(lit_int(0)),
                },
            ],
        }),
        query_short(
            "q",
            vec![],
            None,
            member(
                ast::Expr::Call {
                    pos: SP,
                    base: Box::new(nm("point")),
                    args: vec![ast::CallArg {
                        name: Some(name("x")),
                        expr: lit_int(3),
                    }],
                },
                "x",
            ),
        ),
    ]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    assert_eq!(app.queries["q"].header().ret, RType::Integer);
}

// ============================================================================
// Structural flags
// ============================================================================

#[test]
fn by_value_struct_cycle_is_an_error() {
    let mk = |n: &str, other: &str| {
        ast::Def::Struct(ast::StructDef {
            name: name(n),
            attrs: vec![ast::AttrDef {
                name: name("next"),
                ty: Some(tref(other)),
                mutable: false,
                expr: None,
            }],
        })
    };
    let res = compile(vec![mk("a", "b"), mk("b", "a")]);
    assert!(
        error_codes(&res).iter().any(|c| c.starts_with("struct_cycle:")),
        "errors: {:?}",
        error_codes(&res)
    );
}

#[test]
fn cycle_through_a_collection_is_flagged_but_legal() {
    // struct node { children: list<node>; }
    let res = compile(vec![ast::Def::Struct(ast::StructDef {
        name: name("node"),
        attrs: vec![ast::AttrDef {
            name: name("children"),
            ty: Some(ast::TypeRef::List {
                elem: Box::new(tref("node")),
                pos: SP,
            }),
            mutable: false,
            expr: None,
        }],
    })]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    let node = &app.modules[0].structs[0];
    let flags = node.flags();
    assert!(flags.cyclic);
    assert!(!flags.infinite);
    // a list-typed attribute makes the struct content-mutable
    assert!(flags.type_flags.contains(quill_core::TypeFlags::MUTABLE));
}

#[test]
fn mutability_spreads_through_the_component_closure() {
    // struct inner { mutable x: integer; }  struct outer { i: inner; }
    let res = compile(vec![
        ast::Def::Struct(ast::StructDef {
            name: name("inner"),
            attrs: vec![ast::AttrDef {
                name: name("x"),
                ty: Some(tref("integer")),
                mutable: true,
                expr: None,
            }],
        }),
        ast::Def::Struct(ast::StructDef {
            name: name("outer"),
            attrs: vec![ast::AttrDef {
                name: name("i"),
                ty: Some(tref("inner")),
                mutable: false,
                expr: None,
            }],
        }),
    ]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    for s in &app.modules[0].structs {
        assert!(
            s.flags().type_flags.contains(quill_core::TypeFlags::MUTABLE),
            "{} should be content-mutable",
            s.name
        );
    }
}

#[test]
fn entity_reference_cycles_are_legal_and_flagged() {
    // entity a { b; }  entity b { a; }  -- references are by rowid
    let mk = |n: &str, other: &str| entity(n, vec![attr("ref", other)]);
    let res = compile(vec![mk("a", "b"), mk("b", "a")]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    for e in &app.modules[0].entities {
        assert!(e.flags().cyclic);
    }
}

// ============================================================================
// Constants
// ============================================================================

fn constant(n: &str, expr: ast::Expr) -> ast::Def {
    ast::Def::Constant(ast::ConstantDef {
        name: name(n),
        ty: None,
        expr,
    })
}

#[test]
fn constants_fold_and_inline() {
    let res = compile(vec![
        constant("base", lit_int(10)),
        constant("limit", binary(ast::BinOp::Mul, nm("base"), lit_int(3))),
        query_short("q", vec![], None, nm("limit")),
    ]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));

    let RStatement::Return(Some(EvalExpr::Constant(v))) = query_body(&res, "q") else {
        panic!("expected an inlined constant");
    };
    assert_eq!(v, quill::Value::Integer(30));
}

#[test]
fn recursive_constants_are_a_cycle_error_not_a_hang() {
    let res = compile(vec![
        constant("a", nm("b")),
        constant("b", nm("a")),
    ]);
    assert!(
        error_codes(&res).iter().any(|c| c.starts_with("const:cycle:")),
        "errors: {:?}",
        error_codes(&res)
    );
}

// ============================================================================
// Modules and imports
// ============================================================================

#[test]
fn import_resolves_other_modules_entities() {
    let lib = ast::ModuleAst {
        name: ModuleName::parse("lib").unwrap(),
        files: vec![ast::SourceFile {
            path: None,
            defs: vec![user_entity()],
        }],
    };
    let main = ast::ModuleAst {
        name: ModuleName::root(),
        files: vec![ast::SourceFile {
            path: None,
            defs: vec![
                ast::Def::Import(ast::ImportDef {
                    pos: SP,
                    alias: None,
                    module: vec![name("lib")],
                }),
                ast::Def::Query(ast::QueryDef {
                    name: name("q"),
                    params: vec![],
                    ret: None,
                    body: ast::FnBody::Short(ast::Expr::At {
                        pos: SP,
                        from: ast::QualName::of(&["lib", "user"], SP),
                        cardinality: AtCardinality::ZeroMany,
                        where_clause: vec![],
                    }),
                }),
            ],
        }],
    };
    let res = compile_app(vec![lib, main], CompilerOptions::default());
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
}

#[test]
fn unknown_import_is_reported() {
    let res = compile(vec![ast::Def::Import(ast::ImportDef {
        pos: SP,
        alias: None,
        module: vec![name("nope")],
    })]);
    assert!(error_codes(&res).contains(&"import_unknown_module:nope".to_string()));
}

#[test]
fn namespaced_entity_resolves_by_path() {
    let res = compile(vec![
        ast::Def::Namespace(ast::NamespaceDef {
            name: name("app"),
            defs: vec![user_entity()],
        }),
        ast::Def::Query(ast::QueryDef {
            name: name("q"),
            params: vec![],
            ret: None,
            body: ast::FnBody::Short(ast::Expr::At {
                pos: SP,
                from: ast::QualName::of(&["app", "user"], SP),
                cardinality: AtCardinality::ZeroMany,
                where_clause: vec![],
            }),
        }),
    ]);
    assert!(res.is_valid(), "errors: {:?}", error_codes(&res));
    let app = res.app.as_ref().unwrap();
    // the entity mounts under its namespace path
    let e = &app.modules[0].entities[0];
    assert_eq!(e.mount.str(), "app.user");
}

// ============================================================================
// Recovery
// ============================================================================

#[test]
fn sibling_definitions_survive_one_failure() {
    // the bad query fails; the good one still compiles, one error total
    let res = compile(vec![
        user_entity(),
        query_short("bad", vec![], None, nm("missing")),
        query_short("good", vec![], None, at("user", AtCardinality::ZeroMany, vec![])),
    ]);
    assert_eq!(error_codes(&res), vec!["unknown_name:missing".to_string()]);
    assert!(res.app.is_none());
}
