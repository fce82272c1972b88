//! Snapshot tests for checker diagnostics.
//!
//! Each test triggers one or more type errors and snapshots the stable code
//! and message of every diagnostic, or inspects the JSON and ariadne
//! renderings built from them.

use gop_ast::{AstBuilder, Decl, GenDecl, Stmt};
use gop_typeck::config::Config;
use gop_typeck::TypeckResult;

// ── Helpers ────────────────────────────────────────────────────────────

fn check_decls(b: &AstBuilder, decls: Vec<Decl>) -> TypeckResult {
    let file = b.file("main.gop", Vec::new(), decls);
    gop_typeck::check(std::slice::from_ref(&file), &Config::default()).expect("checker failed")
}

fn check_main(b: &AstBuilder, stmts: Vec<Stmt>) -> TypeckResult {
    let main = b.func_decl("main", b.sig(vec![], vec![]), Some(b.block(stmts)));
    check_decls(b, vec![main])
}

/// One `[code] message` line per diagnostic.
fn listing(result: &TypeckResult) -> String {
    result
        .diagnostics()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Listings ───────────────────────────────────────────────────────────

#[test]
fn diag_redeclaration_and_undefined() {
    let b = AstBuilder::new();
    let decls = vec![
        Decl::Gen(b.var_decl(&["x"], None, vec![b.int(1)])),
        Decl::Gen(b.var_decl(&["x"], None, vec![b.name("y")])),
    ];
    let result = check_decls(&b, decls);
    insta::assert_snapshot!(listing(&result), @r"
    [E0002] x redeclared in this block
    [E0001] undefined: y
    ");
}

#[test]
fn diag_unused_variable_and_missing_return() {
    let b = AstBuilder::new();
    let f = b.func_decl(
        "f",
        b.sig(vec![], vec![b.anon(b.name("int"))]),
        Some(b.block(vec![b.define(&["n"], vec![b.int(1)])])),
    );
    let result = check_decls(&b, vec![f]);
    insta::assert_snapshot!(listing(&result), @r"
    [E0020] missing return
    [E0021] declared and not used: n
    ");
}

#[test]
fn diag_misplaced_branches() {
    let b = AstBuilder::new();
    let result = check_main(
        &b,
        vec![
            b.branch(gop_ast::BranchKind::Break, None),
            b.branch(gop_ast::BranchKind::Continue, None),
        ],
    );
    insta::assert_snapshot!(listing(&result), @r"
    [E0024] break is not in a loop, switch, or select
    [E0024] continue is not in a loop
    ");
}

// ── Structured output ──────────────────────────────────────────────────

#[test]
fn redeclaration_points_at_the_first_declaration() {
    let b = AstBuilder::new();
    let first = b.var_decl(&["x"], None, vec![b.int(1)]);
    let GenDecl::Var(specs) = &first else {
        unreachable!("var_decl builds a var group");
    };
    let first_span = specs[0].names[0].span;
    let result = check_decls(
        &b,
        vec![Decl::Gen(first), Decl::Gen(b.var_decl(&["x"], None, vec![b.int(2)]))],
    );

    let diags = result.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].related.len(), 1);
    assert_eq!(diags[0].related[0].span, first_span);
    assert_eq!(diags[0].related[0].message, "other declaration of x");
}

#[test]
fn diagnostics_serialize_to_json() {
    let b = AstBuilder::new();
    let result = check_decls(&b, vec![Decl::Gen(b.var_decl(&["x"], None, vec![b.name("nope")]))]);
    let json = result.diagnostics_json().expect("diagnostics serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let entries = value.as_array().expect("a list of diagnostics");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["code"], "E0001");
    assert_eq!(entries[0]["severity"], "error");
    assert_eq!(entries[0]["message"], "undefined: nope");
    assert!(entries[0].get("related").is_none());
}

#[test]
fn cycles_list_every_step() {
    let b = AstBuilder::new();
    let decls = vec![
        Decl::Gen(GenDecl::Type(vec![b.alias_spec("A", b.name("B"))])),
        Decl::Gen(GenDecl::Type(vec![b.alias_spec("B", b.name("A"))])),
    ];
    let result = check_decls(&b, decls);
    let diags = result.diagnostics();
    assert_eq!(diags.len(), 1);
    let steps: Vec<&str> = diags[0].related.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(steps, vec!["A refers to B", "B refers to A"]);
}

#[test]
fn render_includes_code_and_message() {
    let b = AstBuilder::new();
    let result = check_decls(&b, vec![Decl::Gen(b.var_decl(&["x"], None, vec![b.name("nope")]))]);
    let source = " ".repeat(64);
    let out = result.render(&source, "main.gop");
    assert!(out.contains("[E0001]"), "{out}");
    assert!(out.contains("undefined: nope"), "{out}");
}
