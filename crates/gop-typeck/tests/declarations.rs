//! Integration tests for package-level declarations: initialization order,
//! declaration cycles, imports and reserved calls, generic instantiation and
//! selector resolution.

use gop_ast::{AstBuilder, BinaryOp, Decl, Expr, GenDecl, ImportSpec, Stmt};
use gop_typeck::config::Config;
use gop_typeck::error::TypeError;
use gop_typeck::info::{QualifiedCall, SelectionKind};
use gop_typeck::types::TypeId;
use gop_typeck::TypeckResult;

// ── Helpers ────────────────────────────────────────────────────────────

fn check_file(b: &AstBuilder, imports: Vec<ImportSpec>, decls: Vec<Decl>, report_unused: bool) -> TypeckResult {
    let config = Config {
        report_unused,
        ..Config::default()
    };
    let file = b.file("main.gop", imports, decls);
    gop_typeck::check(std::slice::from_ref(&file), &config).expect("checker failed")
}

fn check_decls(b: &AstBuilder, decls: Vec<Decl>) -> TypeckResult {
    check_file(b, Vec::new(), decls, false)
}

fn main_func(b: &AstBuilder, stmts: Vec<Stmt>) -> Decl {
    b.func_decl("main", b.sig(vec![], vec![]), Some(b.block(stmts)))
}

fn messages(result: &TypeckResult) -> Vec<String> {
    result.errors.iter().map(ToString::to_string).collect()
}

fn assert_clean(result: &TypeckResult) {
    assert!(result.errors.is_empty(), "expected no errors, got: {:?}", messages(result));
}

fn var(b: &AstBuilder, name: &str, value: Expr) -> Decl {
    Decl::Gen(b.var_decl(&[name], None, vec![value]))
}

fn type_decl(b: &AstBuilder, name: &str, ty: Expr) -> Decl {
    Decl::Gen(b.type_decl(name, ty))
}

/// Names of the variables initialised, in execution order.
fn init_names(result: &TypeckResult) -> Vec<String> {
    result
        .info
        .init_order
        .iter()
        .flat_map(|init| init.lhs.iter().map(|obj| result.objects[*obj].name.clone()))
        .collect()
}

// ── Initialization order ───────────────────────────────────────────────

#[test]
fn initializers_run_in_dependency_order() {
    let b = AstBuilder::new();
    let decls = vec![
        var(&b, "a", b.binary(BinaryOp::Add, b.name("b"), b.int(1))),
        var(&b, "b", b.int(2)),
        var(&b, "c", b.name("a")),
    ];
    let result = check_decls(&b, decls);
    assert_clean(&result);
    assert_eq!(init_names(&result), vec!["b", "a", "c"]);
}

#[test]
fn dependencies_through_functions_count() {
    let b = AstBuilder::new();
    let decls = vec![
        var(&b, "x", b.call(b.name("get"), vec![])),
        b.func_decl(
            "get",
            b.sig(vec![], vec![b.anon(b.name("int"))]),
            Some(b.block(vec![b.ret(vec![b.name("y")])])),
        ),
        var(&b, "y", b.int(1)),
    ];
    let result = check_decls(&b, decls);
    assert_clean(&result);
    assert_eq!(init_names(&result), vec!["y", "x"]);
}

#[test]
fn initialization_cycle_is_reported_once() {
    let b = AstBuilder::new();
    let decls = vec![
        var(&b, "x", b.call(b.name("f"), vec![])),
        b.func_decl(
            "f",
            b.sig(vec![], vec![b.anon(b.name("int"))]),
            Some(b.block(vec![b.ret(vec![b.name("x")])])),
        ),
    ];
    let result = check_decls(&b, decls);
    assert_eq!(messages(&result), vec!["initialization cycle for x"]);
    let TypeError::InitializationCycle { cycle, .. } = &result.errors[0] else {
        panic!("expected an initialization cycle, got {:?}", result.errors[0]);
    };
    let names: Vec<&str> = cycle.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["x", "f"]);
}

#[test]
fn alias_cycle_is_an_invalid_recursive_type() {
    let b = AstBuilder::new();
    let decls = vec![
        Decl::Gen(GenDecl::Type(vec![b.alias_spec("A", b.name("B"))])),
        Decl::Gen(GenDecl::Type(vec![b.alias_spec("B", b.name("A"))])),
    ];
    let result = check_decls(&b, decls);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::InvalidRecursiveType { .. }));
    assert_eq!(messages(&result), vec!["invalid recursive type A"]);
}

#[test]
fn defined_type_may_refer_to_itself_through_a_pointer() {
    let b = AstBuilder::new();
    let node = b.struct_ty(vec![
        b.field(&["value"], b.name("int")),
        b.field(&["next"], b.star(b.name("Node"))),
    ]);
    let result = check_decls(&b, vec![type_decl(&b, "Node", node)]);
    assert_clean(&result);
}

#[test]
fn struct_containing_itself_is_rejected() {
    let b = AstBuilder::new();
    let bad = b.struct_ty(vec![b.field(&["inner"], b.name("Bad"))]);
    let result = check_decls(&b, vec![type_decl(&b, "Bad", bad)]);
    assert_eq!(messages(&result), vec!["invalid recursive type: Bad refers to itself"]);
}

#[test]
fn redeclaration_in_package_scope() {
    let b = AstBuilder::new();
    let result = check_decls(&b, vec![var(&b, "x", b.int(1)), var(&b, "x", b.int(2))]);
    assert_eq!(messages(&result), vec!["x redeclared in this block"]);
}

#[test]
fn resolved_declarations_are_checked_once() {
    let b = AstBuilder::new();
    let first = b.name("n");
    let first_id = first.id;
    let second = b.name("n");
    let second_id = second.id;
    let decls = vec![
        var(&b, "p", first),
        var(&b, "bad", b.name("nope")),
        var(&b, "n", b.int(7)),
        var(&b, "q", second),
        var(&b, "r", b.name("bad")),
        var(&b, "s", b.name("bad")),
    ];
    let result = check_decls(&b, decls);
    assert_eq!(messages(&result), vec!["undefined: nope"]);
    assert_eq!(result.info.type_of(first_id), Some(TypeId::INT));
    assert_eq!(result.info.type_of(second_id), Some(TypeId::INT));
}

// ── Imports and reserved calls ─────────────────────────────────────────

#[test]
fn echo_rewrites_to_the_imported_module() {
    let b = AstBuilder::new();
    let fun = b.name("echo");
    let fun_id = fun.id;
    let main = main_func(&b, vec![b.expr_stmt(b.call(fun, vec![b.string("hi")]))]);
    let result = check_file(&b, vec![b.import("fmt")], vec![main], true);
    assert_clean(&result);
    assert_eq!(
        result.info.rewrites.get(&fun_id),
        Some(&QualifiedCall {
            qualifier: "fmt".into(),
            module: "fmt".into(),
            member: "Println".into(),
        })
    );
}

#[test]
fn echo_uses_the_import_alias() {
    let b = AstBuilder::new();
    let fun = b.name("echo");
    let fun_id = fun.id;
    let main = main_func(&b, vec![b.expr_stmt(b.call(fun, vec![b.int(1)]))]);
    let result = check_file(&b, vec![b.import_as("out", "fmt")], vec![main], true);
    assert_clean(&result);
    assert_eq!(result.info.rewrites[&fun_id].qualifier, "out");
}

#[test]
fn echo_without_import() {
    let b = AstBuilder::new();
    let main = main_func(&b, vec![b.expr_stmt(b.call(b.name("echo"), vec![b.string("hi")]))]);
    let result = check_decls(&b, vec![main]);
    assert_eq!(messages(&result), vec!["undefined: echo (add `import \"fmt\"` to use it)"]);
    assert!(result.info.rewrites.is_empty());
}

#[test]
fn declared_echo_shadows_the_reserved_call() {
    let b = AstBuilder::new();
    let echo = b.func_decl("echo", b.sig(vec![b.field(&["s"], b.name("string"))], vec![]), Some(b.block(vec![])));
    let main = main_func(&b, vec![b.expr_stmt(b.call(b.name("echo"), vec![b.string("hi")]))]);
    let result = check_decls(&b, vec![echo, main]);
    assert_clean(&result);
    assert!(result.info.rewrites.is_empty());
}

#[test]
fn unexported_member_is_rejected() {
    let b = AstBuilder::new();
    let main = main_func(
        &b,
        vec![b.expr_stmt(b.call(b.sel(b.name("fmt"), "newPrinter"), vec![]))],
    );
    let result = check_file(&b, vec![b.import("fmt")], vec![main], false);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::NotExported { .. }));
}

#[test]
fn unused_import_is_reported() {
    let b = AstBuilder::new();
    let result = check_file(&b, vec![b.import("strings")], vec![main_func(&b, vec![])], true);
    assert_eq!(messages(&result), vec!["\"strings\" imported and not used"]);
}

#[test]
fn unknown_import_is_reported() {
    let b = AstBuilder::new();
    let result = check_file(&b, vec![b.import("nope")], vec![main_func(&b, vec![])], false);
    assert_eq!(messages(&result), vec!["could not import \"nope\""]);
}

// ── Generics ───────────────────────────────────────────────────────────

/// `func Id[T any](x T) T { return x }`
fn id_func(b: &AstBuilder) -> Decl {
    b.func_decl(
        "Id",
        b.generic_sig(
            vec![b.field(&["T"], b.name("any"))],
            vec![b.field(&["x"], b.name("T"))],
            vec![b.anon(b.name("T"))],
        ),
        Some(b.block(vec![b.ret(vec![b.name("x")])])),
    )
}

/// `func Zero[T any]() T { var z T; return z }`
fn zero_func(b: &AstBuilder) -> Decl {
    b.func_decl(
        "Zero",
        b.generic_sig(vec![b.field(&["T"], b.name("any"))], vec![], vec![b.anon(b.name("T"))]),
        Some(b.block(vec![
            b.decl_stmt(b.var_decl(&["z"], Some(b.name("T")), vec![])),
            b.ret(vec![b.name("z")]),
        ])),
    )
}

#[test]
fn inferred_type_arguments_are_recorded() {
    let b = AstBuilder::new();
    let fun = b.name("Id");
    let fun_id = fun.id;
    let call = b.call(fun, vec![b.int(1)]);
    let call_id = call.id;
    let main = main_func(&b, vec![b.define(&["v"], vec![call])]);
    let result = check_decls(&b, vec![id_func(&b), main]);
    assert_clean(&result);
    let instance = &result.info.instances[&fun_id];
    assert_eq!(instance.type_args, vec![TypeId::INT]);
    assert_eq!(result.type_string(instance.ty), "func(int) int");
    assert_eq!(result.info.type_of(call_id), Some(TypeId::INT));
}

#[test]
fn result_only_type_parameter_cannot_be_inferred() {
    let b = AstBuilder::new();
    let main = main_func(&b, vec![b.define(&["z"], vec![b.call(b.name("Zero"), vec![])])]);
    let result = check_decls(&b, vec![zero_func(&b), main]);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::CannotInfer { .. }));
    assert_eq!(messages(&result), vec!["in call to Zero, cannot infer T"]);
}

#[test]
fn explicit_type_arguments() {
    let b = AstBuilder::new();
    let fun = b.name("Zero");
    let fun_id = fun.id;
    let call = b.call(b.instantiate(fun, vec![b.name("string")]), vec![]);
    let call_id = call.id;
    let main = main_func(&b, vec![b.define(&["z"], vec![call])]);
    let result = check_decls(&b, vec![zero_func(&b), main]);
    assert_clean(&result);
    assert_eq!(result.info.instances[&fun_id].type_args, vec![TypeId::STRING]);
    assert_eq!(result.info.type_of(call_id), Some(TypeId::STRING));
}

#[test]
fn constraint_must_be_satisfied() {
    let b = AstBuilder::new();
    let eq = b.func_decl(
        "Eq",
        b.generic_sig(
            vec![b.field(&["T"], b.name("comparable"))],
            vec![b.field(&["a", "b"], b.name("T"))],
            vec![b.anon(b.name("bool"))],
        ),
        Some(b.block(vec![b.ret(vec![b.binary(BinaryOp::Eql, b.name("a"), b.name("b"))])])),
    );
    let main = main_func(
        &b,
        vec![
            b.define(&["xs"], vec![b.composite(Some(b.slice_ty(b.name("int"))), vec![])]),
            b.define(&["same"], vec![b.call(b.name("Eq"), vec![b.name("xs"), b.name("xs")])]),
        ],
    );
    let result = check_decls(&b, vec![eq, main]);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::Unsatisfied { .. }));
    assert!(messages(&result)[0].starts_with("[]int does not satisfy comparable"));
}

#[test]
fn generic_function_needs_instantiation_as_value() {
    let b = AstBuilder::new();
    let main = main_func(&b, vec![b.define(&["f"], vec![b.name("Id")])]);
    let result = check_decls(&b, vec![id_func(&b), main]);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::GenericWithoutInstantiation { .. }));
}

#[test]
fn generic_function_argument_is_inferred() {
    let b = AstBuilder::new();
    // func Apply[T, U any](xs []T, f func(T) U) []U { var out []U; return out }
    let apply = b.func_decl(
        "Apply",
        b.generic_sig(
            vec![b.field(&["T", "U"], b.name("any"))],
            vec![
                b.field(&["xs"], b.slice_ty(b.name("T"))),
                b.field(
                    &["f"],
                    b.func_ty(b.sig(vec![b.anon(b.name("T"))], vec![b.anon(b.name("U"))])),
                ),
            ],
            vec![b.anon(b.slice_ty(b.name("U")))],
        ),
        Some(b.block(vec![
            b.decl_stmt(b.var_decl(&["out"], Some(b.slice_ty(b.name("U"))), vec![])),
            b.ret(vec![b.name("out")]),
        ])),
    );
    let arg = b.name("Id");
    let arg_id = arg.id;
    let call = b.call(
        b.name("Apply"),
        vec![b.composite(Some(b.slice_ty(b.name("int"))), vec![]), arg],
    );
    let call_id = call.id;
    let main = main_func(&b, vec![b.define(&["ys"], vec![call])]);
    let result = check_decls(&b, vec![id_func(&b), apply, main]);
    assert_clean(&result);
    let ty = result.info.type_of(call_id).expect("call has a type");
    assert_eq!(result.type_string(ty), "[]int");
    assert_eq!(result.info.instances[&arg_id].type_args, vec![TypeId::INT]);
}

#[test]
fn element_type_comes_from_the_core_type() {
    let b = AstBuilder::new();
    // func First[S ~[]E, E any](s S) E { var e E; return e }
    let first = b.func_decl(
        "First",
        b.generic_sig(
            vec![
                b.field(&["S"], b.union(vec![b.term(true, b.slice_ty(b.name("E")))])),
                b.field(&["E"], b.name("any")),
            ],
            vec![b.field(&["s"], b.name("S"))],
            vec![b.anon(b.name("E"))],
        ),
        Some(b.block(vec![
            b.decl_stmt(b.var_decl(&["e"], Some(b.name("E")), vec![])),
            b.ret(vec![b.name("e")]),
        ])),
    );
    let fun = b.name("First");
    let fun_id = fun.id;
    let call = b.call(fun, vec![b.name("xs")]);
    let call_id = call.id;
    let main = main_func(&b, vec![b.define(&["x"], vec![call])]);
    let decls = vec![
        first,
        type_decl(&b, "Ints", b.slice_ty(b.name("int"))),
        Decl::Gen(b.var_decl(&["xs"], Some(b.name("Ints")), vec![])),
        main,
    ];
    let result = check_decls(&b, decls);
    assert_clean(&result);
    let instance = &result.info.instances[&fun_id];
    assert_eq!(instance.type_args.len(), 2);
    assert_eq!(result.type_string(instance.type_args[0]), "Ints");
    assert_eq!(instance.type_args[1], TypeId::INT);
    assert_eq!(result.info.type_of(call_id), Some(TypeId::INT));
}

/// `func Pick[T any](a, b T) T { return a }`
fn pick_func(b: &AstBuilder) -> Decl {
    b.func_decl(
        "Pick",
        b.generic_sig(
            vec![b.field(&["T"], b.name("any"))],
            vec![b.field(&["a", "b"], b.name("T"))],
            vec![b.anon(b.name("T"))],
        ),
        Some(b.block(vec![b.ret(vec![b.name("a")])])),
    )
}

#[test]
fn untyped_arguments_default_to_the_largest_kind() {
    let b = AstBuilder::new();
    let call = b.call(b.name("Pick"), vec![b.int(1), b.float("2.5")]);
    let call_id = call.id;
    let main = main_func(&b, vec![b.define(&["v"], vec![call])]);
    let result = check_decls(&b, vec![pick_func(&b), main]);
    assert_clean(&result);
    assert_eq!(result.info.type_of(call_id), Some(TypeId::FLOAT64));
}

#[test]
fn untyped_arguments_of_different_kinds_cannot_mix() {
    let b = AstBuilder::new();
    let call = b.call(b.name("Pick"), vec![b.int(1), b.string("a")]);
    let main = main_func(&b, vec![b.define(&["v"], vec![call])]);
    let result = check_decls(&b, vec![pick_func(&b), main]);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::CannotInfer { .. }));
    assert_eq!(
        messages(&result),
        vec!["in call to Pick, cannot infer T (mismatched types untyped int and untyped string)"]
    );
}

#[test]
fn mutually_recursive_core_types_cannot_be_inferred() {
    let b = AstBuilder::new();
    // func H[P *Q, Q *P]() {}
    let h = b.func_decl(
        "H",
        b.generic_sig(
            vec![
                b.field(&["P"], b.star(b.name("Q"))),
                b.field(&["Q"], b.star(b.name("P"))),
            ],
            vec![],
            vec![],
        ),
        Some(b.block(vec![])),
    );
    let main = main_func(&b, vec![b.expr_stmt(b.call(b.name("H"), vec![]))]);
    let result = check_decls(&b, vec![h, main]);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::CannotInfer { .. }));
    assert_eq!(messages(&result), vec!["in call to H, cannot infer P"]);
}

#[test]
fn core_type_mentioning_a_known_parameter_is_simplified() {
    let b = AstBuilder::new();
    // func G[A any, B []A]() B { var v B; return v }
    let g = b.func_decl(
        "G",
        b.generic_sig(
            vec![b.field(&["A"], b.name("any")), b.field(&["B"], b.slice_ty(b.name("A")))],
            vec![],
            vec![b.anon(b.name("B"))],
        ),
        Some(b.block(vec![
            b.decl_stmt(b.var_decl(&["v"], Some(b.name("B")), vec![])),
            b.ret(vec![b.name("v")]),
        ])),
    );
    let fun = b.name("G");
    let fun_id = fun.id;
    let call = b.call(b.instantiate(fun, vec![b.name("int")]), vec![]);
    let call_id = call.id;
    let main = main_func(&b, vec![b.define(&["v"], vec![call])]);
    let result = check_decls(&b, vec![g, main]);
    assert_clean(&result);
    let instance = &result.info.instances[&fun_id];
    assert_eq!(instance.type_args[0], TypeId::INT);
    assert_eq!(result.type_string(instance.type_args[1]), "[]int");
    let ty = result.info.type_of(call_id).expect("call has a type");
    assert_eq!(result.type_string(ty), "[]int");
}

#[test]
fn variadic_generic_call() {
    let b = AstBuilder::new();
    // func Sum[T any](xs ...T) T { var s T; return s }
    let sum = b.func_decl(
        "Sum",
        b.generic_sig(
            vec![b.field(&["T"], b.name("any"))],
            vec![b.field(&["xs"], b.variadic(b.name("T")))],
            vec![b.anon(b.name("T"))],
        ),
        Some(b.block(vec![
            b.decl_stmt(b.var_decl(&["s"], Some(b.name("T")), vec![])),
            b.ret(vec![b.name("s")]),
        ])),
    );
    let fun = b.name("Sum");
    let fun_id = fun.id;
    let call = b.call(fun, vec![b.int(1), b.int(2), b.int(3)]);
    let call_id = call.id;
    let main = main_func(&b, vec![b.define(&["total"], vec![call])]);
    let result = check_decls(&b, vec![sum, main]);
    assert_clean(&result);
    assert_eq!(result.info.instances[&fun_id].type_args, vec![TypeId::INT]);
    assert_eq!(result.info.type_of(call_id), Some(TypeId::INT));
}

// ── Selectors ──────────────────────────────────────────────────────────

/// `type Point struct { X, Y int }` with `func (p *Point) Move(d int)`.
fn point_decls(b: &AstBuilder) -> Vec<Decl> {
    let point = b.struct_ty(vec![b.field(&["X", "Y"], b.name("int"))]);
    let shift = b.op_assign(BinaryOp::Add, b.sel(b.name("p"), "X"), b.name("d"));
    let mv = b.method_decl(
        b.field(&["p"], b.star(b.name("Point"))),
        "Move",
        b.sig(vec![b.field(&["d"], b.name("int"))], vec![]),
        Some(b.block(vec![shift])),
    );
    vec![type_decl(b, "Point", point), mv]
}

#[test]
fn field_and_method_selections_are_recorded() {
    let b = AstBuilder::new();
    let field = b.sel(b.name("p"), "Y");
    let field_id = field.id;
    let method = b.sel(b.name("p"), "Move");
    let method_id = method.id;
    let mut decls = point_decls(&b);
    decls.push(main_func(
        &b,
        vec![
            b.define(&["p"], vec![b.composite(Some(b.name("Point")), vec![])]),
            b.assign(vec![b.name("_")], vec![field]),
            b.expr_stmt(b.call(method, vec![b.int(2)])),
        ],
    ));
    let result = check_decls(&b, decls);
    assert_clean(&result);

    let field = &result.info.selections[&field_id];
    assert_eq!(field.kind, SelectionKind::FieldVal);
    assert_eq!(field.path, vec![1]);
    assert_eq!(field.ty, TypeId::INT);

    let method = &result.info.selections[&method_id];
    assert_eq!(method.kind, SelectionKind::MethodVal);
    assert_eq!(result.type_string(method.ty), "func(int)");
}

#[test]
fn pointer_method_on_unaddressable_value() {
    let b = AstBuilder::new();
    let mut decls = point_decls(&b);
    let literal = b.composite(Some(b.name("Point")), vec![]);
    decls.push(main_func(
        &b,
        vec![b.expr_stmt(b.call(b.sel(literal, "Move"), vec![b.int(1)]))],
    ));
    let result = check_decls(&b, decls);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::PointerMethod { .. }));
}

#[test]
fn promoted_field_through_embedding() {
    let b = AstBuilder::new();
    let inner = b.struct_ty(vec![b.field(&["N"], b.name("int"))]);
    let outer = b.struct_ty(vec![b.anon(b.name("Inner")), b.field(&["M"], b.name("int"))]);
    let sel = b.sel(b.name("o"), "N");
    let sel_id = sel.id;
    let decls = vec![
        type_decl(&b, "Inner", inner),
        type_decl(&b, "Outer", outer),
        main_func(
            &b,
            vec![
                b.decl_stmt(b.var_decl(&["o"], Some(b.name("Outer")), vec![])),
                b.assign(vec![b.name("_")], vec![sel]),
            ],
        ),
    ];
    let result = check_decls(&b, decls);
    assert_clean(&result);
    assert_eq!(result.info.selections[&sel_id].path, vec![0, 0]);
}

#[test]
fn ambiguous_selector_at_equal_depth() {
    let b = AstBuilder::new();
    let a = b.struct_ty(vec![b.field(&["N"], b.name("int"))]);
    let bb = b.struct_ty(vec![b.field(&["N"], b.name("int"))]);
    let both = b.struct_ty(vec![b.anon(b.name("A")), b.anon(b.name("B"))]);
    let decls = vec![
        type_decl(&b, "A", a),
        type_decl(&b, "B", bb),
        type_decl(&b, "Both", both),
        main_func(
            &b,
            vec![
                b.decl_stmt(b.var_decl(&["v"], Some(b.name("Both")), vec![])),
                b.assign(vec![b.name("_")], vec![b.sel(b.name("v"), "N")]),
            ],
        ),
    ];
    let result = check_decls(&b, decls);
    assert_eq!(messages(&result), vec!["ambiguous selector v.N"]);
}

#[test]
fn method_calls_type_check_their_arguments() {
    let b = AstBuilder::new();
    let mut decls = point_decls(&b);
    decls.push(main_func(
        &b,
        vec![
            b.define(&["p"], vec![b.composite(Some(b.name("Point")), vec![])]),
            b.expr_stmt(b.call(b.sel(b.name("p"), "Move"), vec![b.string("far")])),
        ],
    ));
    let result = check_decls(&b, decls);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(
        messages(&result)[0].contains("cannot use \"far\" (untyped string constant) as int value in argument to p.Move"),
        "{:?}",
        messages(&result)
    );
}

#[test]
fn unknown_identifier() {
    let b = AstBuilder::new();
    let result = check_decls(&b, vec![var(&b, "x", b.name("missing"))]);
    assert_eq!(messages(&result), vec!["undefined: missing"]);
}
