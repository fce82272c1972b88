//! Integration tests for the statement checker.
//!
//! These tests exercise:
//! - Missing-return detection through terminating statements
//! - Misplaced break, continue and fallthrough
//! - Duplicate cases in expression and type switches
//! - Range loops over strings, integers and channels
//! - Labels, go/defer and expression statements

use gop_ast::{AstBuilder, BinaryOp, BranchKind, ChanDir, Decl, Stmt};
use gop_typeck::config::{Config, LangVersion};
use gop_typeck::error::TypeError;
use gop_typeck::types::TypeId;
use gop_typeck::TypeckResult;

// ── Helpers ────────────────────────────────────────────────────────────

fn config() -> Config {
    Config {
        report_unused: false,
        ..Config::default()
    }
}

fn check_decls(b: &AstBuilder, decls: Vec<Decl>, config: &Config) -> TypeckResult {
    let file = b.file("main.gop", Vec::new(), decls);
    gop_typeck::check(std::slice::from_ref(&file), config).expect("checker failed")
}

/// Check `func main() { stmts }`.
fn check_main(b: &AstBuilder, stmts: Vec<Stmt>) -> TypeckResult {
    let main = b.func_decl("main", b.sig(vec![], vec![]), Some(b.block(stmts)));
    check_decls(b, vec![main], &config())
}

fn messages(result: &TypeckResult) -> Vec<String> {
    result.errors.iter().map(ToString::to_string).collect()
}

fn assert_clean(result: &TypeckResult) {
    assert!(result.errors.is_empty(), "expected no errors, got: {:?}", messages(result));
}

fn assert_has_error<F: Fn(&TypeError) -> bool>(result: &TypeckResult, pred: F, desc: &str) {
    assert!(
        result.errors.iter().any(pred),
        "expected error matching `{desc}`, got errors: {:?}",
        messages(result)
    );
}

/// `func name() int { body }`
fn int_func(b: &AstBuilder, name: &str, body: Vec<Stmt>) -> Decl {
    b.func_decl(name, b.sig(vec![], vec![b.anon(b.name("int"))]), Some(b.block(body)))
}

// ── Returns ────────────────────────────────────────────────────────────

#[test]
fn missing_return_is_reported_once() {
    let b = AstBuilder::new();
    let decls = vec![
        int_func(&b, "empty", vec![]),
        int_func(&b, "forever", vec![b.for_stmt(None, None, None, b.block(vec![]))]),
        int_func(&b, "panics", vec![b.expr_stmt(b.call(b.name("panic"), vec![b.string("no")]))]),
        int_func(&b, "returns", vec![b.ret(vec![b.int(1)])]),
    ];
    let result = check_decls(&b, decls, &config());
    let missing = result
        .errors
        .iter()
        .filter(|e| matches!(e, TypeError::MissingReturn { .. }))
        .count();
    assert_eq!(missing, 1, "{:?}", messages(&result));
}

#[test]
fn loop_with_break_does_not_terminate() {
    let b = AstBuilder::new();
    let body = vec![b.for_stmt(
        None,
        None,
        None,
        b.block(vec![b.branch(BranchKind::Break, None)]),
    )];
    let result = check_decls(&b, vec![int_func(&b, "f", body)], &config());
    assert_has_error(&result, |e| matches!(e, TypeError::MissingReturn { .. }), "missing return");
}

#[test]
fn if_else_terminates_only_when_both_branches_do() {
    let b = AstBuilder::new();
    let both = b.if_stmt(
        None,
        b.name("true"),
        b.block(vec![b.ret(vec![b.int(1)])]),
        Some(b.block_stmt(vec![b.ret(vec![b.int(2)])])),
    );
    let result = check_decls(&b, vec![int_func(&b, "f", vec![both])], &config());
    assert_clean(&result);
}

#[test]
fn return_count_mismatch() {
    let b = AstBuilder::new();
    let result = check_decls(&b, vec![int_func(&b, "f", vec![b.ret(vec![b.int(1), b.int(2)])])], &config());
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::ReturnCount { not_enough: false, .. }),
        "too many return values",
    );
}

// ── Branches ───────────────────────────────────────────────────────────

#[test]
fn break_outside_loop() {
    let b = AstBuilder::new();
    let result = check_main(&b, vec![b.branch(BranchKind::Break, None)]);
    assert_eq!(messages(&result), vec!["break is not in a loop, switch, or select"]);
}

#[test]
fn continue_inside_switch_inside_loop_is_fine() {
    let b = AstBuilder::new();
    let switch = b.switch_stmt(
        None,
        None,
        vec![b.default_case(vec![b.branch(BranchKind::Continue, None)])],
    );
    let result = check_main(&b, vec![b.for_stmt(None, None, None, b.block(vec![switch]))]);
    assert_clean(&result);
}

#[test]
fn fallthrough_placement() {
    let b = AstBuilder::new();
    let ok = b.switch_stmt(
        None,
        Some(b.int(1)),
        vec![
            b.case(vec![b.int(1)], vec![b.branch(BranchKind::Fallthrough, None)]),
            b.case(vec![b.int(2)], vec![b.branch(BranchKind::Fallthrough, None)]),
        ],
    );
    let result = check_main(&b, vec![ok]);
    assert_eq!(messages(&result), vec!["cannot fallthrough final case in switch"]);
}

#[test]
fn labels_must_be_used_and_declared() {
    let b = AstBuilder::new();
    let outer = b.labeled(
        "outer",
        b.for_stmt(
            None,
            None,
            None,
            b.block(vec![b.for_stmt(
                None,
                None,
                None,
                b.block(vec![b.branch(BranchKind::Break, Some("outer"))]),
            )]),
        ),
    );
    let unused = b.labeled("unused", b.empty());
    let missing = b.branch(BranchKind::Goto, Some("nowhere"));
    let result = check_main(&b, vec![outer, unused, missing]);
    let msgs = messages(&result);
    assert!(msgs.contains(&"label unused defined and not used".to_string()), "{msgs:?}");
    assert!(msgs.contains(&"label nowhere not declared".to_string()), "{msgs:?}");
    assert_eq!(msgs.len(), 2, "{msgs:?}");
}

#[test]
fn continue_label_must_name_a_loop() {
    let b = AstBuilder::new();
    let sw = b.labeled(
        "sw",
        b.switch_stmt(
            None,
            None,
            vec![b.default_case(vec![b.branch(BranchKind::Continue, Some("sw"))])],
        ),
    );
    let result = check_main(&b, vec![sw]);
    assert!(
        messages(&result).contains(&"invalid continue label sw".to_string()),
        "{:?}",
        messages(&result)
    );
}

// ── Switches ───────────────────────────────────────────────────────────

#[test]
fn duplicate_constant_cases() {
    let b = AstBuilder::new();
    let sw = b.switch_stmt(
        Some(b.define(&["x"], vec![b.int(3)])),
        Some(b.name("x")),
        vec![
            b.case(vec![b.int(1), b.int(2)], vec![]),
            b.case(vec![b.int(1)], vec![]),
        ],
    );
    let result = check_main(&b, vec![sw]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::DuplicateCase { type_switch: false, .. }),
        "duplicate case",
    );
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
}

#[test]
fn multiple_defaults() {
    let b = AstBuilder::new();
    let sw = b.switch_stmt(None, None, vec![b.default_case(vec![]), b.default_case(vec![])]);
    let result = check_main(&b, vec![sw]);
    assert_eq!(messages(&result), vec!["multiple defaults in switch"]);
}

#[test]
fn type_switch_binds_per_clause() {
    let b = AstBuilder::new();
    let decl = b.decl_stmt(b.var_decl(&["v"], Some(b.name("any")), vec![b.int(1)]));
    let t_use = b.name("t");
    let t_use_id = t_use.id;
    let sw = b.type_switch(
        Some("t"),
        b.name("v"),
        vec![
            b.case(vec![b.name("string")], vec![b.assign(vec![b.name("_")], vec![t_use])]),
            b.case(vec![b.name("string")], vec![]),
            b.default_case(vec![]),
        ],
    );
    let result = check_main(&b, vec![decl, sw]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::DuplicateCase { type_switch: true, .. }),
        "duplicate type case",
    );
    assert_eq!(result.info.type_of(t_use_id), Some(TypeId::STRING));
    assert!(!result.info.implicits.is_empty());
}

#[test]
fn unused_type_switch_binding() {
    let b = AstBuilder::new();
    let decl = b.decl_stmt(b.var_decl(&["v"], Some(b.name("any")), vec![b.int(1)]));
    let sw = b.type_switch(Some("t"), b.name("v"), vec![b.case(vec![b.name("int")], vec![])]);
    let main = b.func_decl("main", b.sig(vec![], vec![]), Some(b.block(vec![decl, sw])));
    let result = check_decls(&b, vec![main], &Config::default());
    assert_eq!(messages(&result), vec!["declared and not used: t"]);
}

#[test]
fn type_switch_on_non_interface() {
    let b = AstBuilder::new();
    let sw = b.type_switch(None, b.int(1), vec![b.default_case(vec![])]);
    let result = check_main(&b, vec![sw]);
    assert_has_error(
        &result,
        |e| e.to_string().ends_with("is not an interface"),
        "is not an interface",
    );
}

// ── Range ──────────────────────────────────────────────────────────────

#[test]
fn range_over_string_yields_runes() {
    let b = AstBuilder::new();
    let key = b.name("i");
    let value = b.name("c");
    let value_id = value.id;
    let body = b.block(vec![b.assign(vec![b.name("_"), b.name("_")], vec![b.name("i"), b.name("c")])]);
    let range = b.range_stmt(Some(key), Some(value), true, b.string("héllo"), body);
    let result = check_main(&b, vec![range]);
    assert_clean(&result);
    let obj = result.info.defs[&value_id];
    assert_eq!(result.objects[obj].ty, Some(TypeId::INT32));
}

#[test]
fn range_over_int_needs_go122() {
    let b = AstBuilder::new();
    let range = b.range_stmt(None, None, true, b.int(10), b.block(vec![]));
    let main = b.func_decl("main", b.sig(vec![], vec![]), Some(b.block(vec![range])));
    let old = Config {
        lang_version: LangVersion::GO1_21,
        ..config()
    };
    let result = check_decls(&b, vec![main.clone()], &old);
    assert_eq!(messages(&result), vec!["cannot range over 10 (untyped int constant): requires go1.22 or later"]);

    let result = check_decls(&b, vec![main], &config());
    assert_clean(&result);
}

#[test]
fn range_over_int_permits_one_variable() {
    let b = AstBuilder::new();
    let range = b.range_stmt(Some(b.name("i")), Some(b.name("j")), true, b.int(3), b.block(vec![]));
    let result = check_main(&b, vec![range]);
    assert_has_error(
        &result,
        |e| e.to_string().contains("permits only one iteration variable"),
        "one iteration variable",
    );
}

#[test]
fn range_over_send_only_channel() {
    let b = AstBuilder::new();
    let ch_ty = b.chan_ty(ChanDir::Send, b.name("int"));
    let decl = b.decl_stmt(b.var_decl(&["ch"], Some(ch_ty), vec![]));
    let range = b.range_stmt(Some(b.name("v")), None, true, b.name("ch"), b.block(vec![]));
    let result = check_main(&b, vec![decl, range]);
    assert_has_error(
        &result,
        |e| e.to_string().ends_with("receive from send-only channel"),
        "send-only channel",
    );
}

#[test]
fn range_define_needs_a_new_variable() {
    let b = AstBuilder::new();
    let range = b.range_stmt(Some(b.name("_")), None, true, b.string("ab"), b.block(vec![]));
    let result = check_main(&b, vec![range]);
    assert_eq!(messages(&result), vec!["no new variables on left side of :="]);
}

// ── Simple statements ──────────────────────────────────────────────────

#[test]
fn unused_expression_results() {
    let b = AstBuilder::new();
    let result = check_main(
        &b,
        vec![
            b.expr_stmt(b.binary(BinaryOp::Add, b.int(1), b.int(2))),
            b.expr_stmt(b.call(b.name("len"), vec![b.string("ab")])),
            b.expr_stmt(b.call(b.name("println"), vec![b.string("ok")])),
        ],
    );
    let not_used = result
        .errors
        .iter()
        .filter(|e| matches!(e, TypeError::NotUsed { .. }))
        .count();
    assert_eq!(not_used, 2, "{:?}", messages(&result));
}

#[test]
fn builtin_calls_record_their_results() {
    let b = AstBuilder::new();
    let length = b.call(b.name("len"), vec![b.string("ab")]);
    let length_id = length.id;
    let made = b.call(b.name("make"), vec![b.slice_ty(b.name("int")), b.int(0)]);
    let made_id = made.id;
    let result = check_main(
        &b,
        vec![
            b.define(&["n"], vec![length]),
            b.define(&["xs"], vec![made]),
            b.expr_stmt(b.call(b.name("panic"), vec![b.string("boom")])),
        ],
    );
    assert_clean(&result);
    assert_eq!(result.info.type_of(length_id), Some(TypeId::INT));
    let made_ty = result.info.type_of(made_id).expect("make has a type");
    assert_eq!(result.type_string(made_ty), "[]int");
}

#[test]
fn builtin_used_as_value() {
    let b = AstBuilder::new();
    let result = check_main(&b, vec![b.define(&["f"], vec![b.name("len")])]);
    assert_eq!(messages(&result), vec!["len (built-in) must be called"]);
}

#[test]
fn go_and_defer_need_calls() {
    let b = AstBuilder::new();
    let result = check_main(
        &b,
        vec![
            b.go(b.name("main")),
            b.defer(b.call(b.name("int"), vec![b.int(1)])),
            b.defer(b.call(b.name("len"), vec![b.string("x")])),
            b.defer(b.call(b.name("println"), vec![])),
        ],
    );
    let msgs = messages(&result);
    assert_eq!(msgs.len(), 3, "{msgs:?}");
    assert_eq!(msgs[0], "expression in go must be function call");
    assert!(msgs[1].starts_with("defer requires function call, not conversion"), "{msgs:?}");
    assert!(msgs[2].starts_with("defer discards result of"), "{msgs:?}");
}

#[test]
fn inc_dec_needs_numbers() {
    let b = AstBuilder::new();
    let result = check_main(
        &b,
        vec![
            b.define(&["s"], vec![b.string("a")]),
            b.inc(b.name("s")),
            b.define(&["n"], vec![b.int(1)]),
            b.dec(b.name("n")),
        ],
    );
    assert_eq!(messages(&result), vec!["invalid operation: s++ (non-numeric type string)"]);
}

#[test]
fn send_to_receive_only_channel() {
    let b = AstBuilder::new();
    let decl = b.decl_stmt(b.var_decl(&["ch"], Some(b.chan_ty(ChanDir::Recv, b.name("int"))), vec![]));
    let result = check_main(&b, vec![decl, b.send(b.name("ch"), b.int(1))]);
    assert_has_error(
        &result,
        |e| e.to_string().contains("cannot send to receive-only channel"),
        "receive-only send",
    );
}

#[test]
fn unused_locals_are_reported() {
    let b = AstBuilder::new();
    let main = b.func_decl(
        "main",
        b.sig(vec![], vec![]),
        Some(b.block(vec![b.define(&["x", "y"], vec![b.int(1), b.int(2)]), b.inc(b.name("y"))])),
    );
    let result = check_decls(&b, vec![main], &Config::default());
    assert_eq!(messages(&result), vec!["declared and not used: x"]);
}

#[test]
fn assert_accepts_truthy_values_and_text_messages() {
    let b = AstBuilder::new();
    let message = b.int(42);
    let message_id = message.id;
    let result = check_main(
        &b,
        vec![
            b.define(&["n"], vec![b.int(1)]),
            b.assert_stmt(b.name("n"), Some(message)),
        ],
    );
    assert_clean(&result);
    assert!(result.info.conversions.contains_key(&message_id));
}
