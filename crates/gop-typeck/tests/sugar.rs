//! Integration tests for the language conveniences layered over the core
//! type system: text concatenation, truthiness, word and unicode operators,
//! one-based indexing and untyped container literals.

use gop_ast::{AstBuilder, BinaryOp, Decl, Delim, Expr, Stmt, UnaryOp};
use gop_typeck::config::Config;
use gop_typeck::constant::Value;
use gop_typeck::error::TypeError;
use gop_typeck::info::ImplicitConversion;
use gop_typeck::types::TypeId;
use gop_typeck::TypeckResult;

// ── Helpers ────────────────────────────────────────────────────────────

fn check_decls(b: &AstBuilder, decls: Vec<Decl>) -> TypeckResult {
    let config = Config {
        report_unused: false,
        ..Config::default()
    };
    let file = b.file("main.gop", Vec::new(), decls);
    gop_typeck::check(std::slice::from_ref(&file), &config).expect("checker failed")
}

fn check_main(b: &AstBuilder, stmts: Vec<Stmt>) -> TypeckResult {
    let main = b.func_decl("main", b.sig(vec![], vec![]), Some(b.block(stmts)));
    check_decls(b, vec![main])
}

fn messages(result: &TypeckResult) -> Vec<String> {
    result.errors.iter().map(ToString::to_string).collect()
}

fn assert_clean(result: &TypeckResult) {
    assert!(result.errors.is_empty(), "expected no errors, got: {:?}", messages(result));
}

/// `const name = value`, returning the value expression's id.
fn constant(b: &AstBuilder, name: &str, value: Expr) -> (Decl, gop_ast::NodeId) {
    let id = value.id;
    (Decl::Gen(b.const_decl(&[name], None, vec![value])), id)
}

fn type_of(result: &TypeckResult, id: gop_ast::NodeId) -> String {
    let ty = result.info.type_of(id).expect("expression has no recorded type");
    result.type_string(ty)
}

/// `_ = value`
fn discard(b: &AstBuilder, value: Expr) -> Stmt {
    b.assign(vec![b.name("_")], vec![value])
}

// ── Concatenation ──────────────────────────────────────────────────────

#[test]
fn constant_concatenation_folds() {
    let b = AstBuilder::new();
    let chain = b.binary(
        BinaryOp::Add,
        b.binary(BinaryOp::Add, b.binary(BinaryOp::Add, b.string("p"), b.int(1)), b.int(2)),
        b.string("q"),
    );
    let (d1, chain_id) = constant(&b, "chain", chain);
    let (d2, left_id) = constant(&b, "left", b.binary(BinaryOp::Add, b.int(1), b.string("b")));
    let (d3, glyph_id) = constant(&b, "glyph", b.binary(BinaryOp::Add, b.string("x"), b.name("true")));
    let (d4, cross_id) = constant(&b, "cross", b.binary(BinaryOp::Add, b.name("false"), b.string("!")));
    let result = check_decls(&b, vec![d1, d2, d3, d4]);
    assert_clean(&result);
    let text = |id| result.info.value_of(id).cloned();
    assert_eq!(text(chain_id), Some(Value::String("p12q".into())));
    assert_eq!(text(left_id), Some(Value::String("1b".into())));
    assert_eq!(text(glyph_id), Some(Value::String("x✓".into())));
    assert_eq!(text(cross_id), Some(Value::String("✗!".into())));
}

#[test]
fn rune_constants_concatenate_as_characters() {
    let b = AstBuilder::new();
    let (d1, right_id) = constant(&b, "right", b.binary(BinaryOp::Add, b.string("x"), b.char('a')));
    let (d2, left_id) = constant(&b, "left", b.binary(BinaryOp::Add, b.char('é'), b.string("!")));
    let (d3, number_id) = constant(&b, "number", b.binary(BinaryOp::Add, b.string("x"), b.int(97)));
    let result = check_decls(&b, vec![d1, d2, d3]);
    assert_clean(&result);
    let text = |id| result.info.value_of(id).cloned();
    assert_eq!(text(right_id), Some(Value::String("xa".into())));
    assert_eq!(text(left_id), Some(Value::String("é!".into())));
    assert_eq!(text(number_id), Some(Value::String("x97".into())));
}

#[test]
fn runtime_concatenation_records_text_conversion() {
    let b = AstBuilder::new();
    let n = b.name("n");
    let n_id = n.id;
    let sum = b.binary(BinaryOp::Add, b.string("n="), n);
    let sum_id = sum.id;
    let f = b.func_decl(
        "show",
        b.sig(vec![b.field(&["n"], b.name("int"))], vec![b.anon(b.name("string"))]),
        Some(b.block(vec![b.ret(vec![sum])])),
    );
    let result = check_decls(&b, vec![f]);
    assert_clean(&result);
    assert_eq!(
        result.info.conversions.get(&n_id),
        Some(&ImplicitConversion::ToText { from: TypeId::INT })
    );
    assert_eq!(result.info.type_of(sum_id), Some(TypeId::STRING));
}

#[test]
fn strings_do_not_concatenate_with_slices() {
    let b = AstBuilder::new();
    let result = check_main(
        &b,
        vec![
            b.define(&["xs"], vec![b.slice_lit(vec![b.int(1)])]),
            discard(&b, b.binary(BinaryOp::Add, b.string("a"), b.name("xs"))),
        ],
    );
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::MismatchedTypes { .. }), "{:?}", messages(&result));
}

// ── Truthiness and spellings ───────────────────────────────────────────

#[test]
fn conditions_accept_any_value() {
    let b = AstBuilder::new();
    let s = b.name("s");
    let s_id = s.id;
    let zero = b.int(0);
    let zero_id = zero.id;
    let f = b.func_decl(
        "f",
        b.sig(vec![b.field(&["s"], b.name("string"))], vec![]),
        Some(b.block(vec![
            b.if_stmt(None, s, b.block(vec![]), None),
            b.for_stmt(None, Some(zero), None, b.block(vec![])),
        ])),
    );
    let result = check_decls(&b, vec![f]);
    assert_clean(&result);
    assert_eq!(
        result.info.conversions.get(&s_id),
        Some(&ImplicitConversion::Truthy {
            from: TypeId::STRING,
            constant: None
        })
    );
    assert_eq!(
        result.info.conversions.get(&zero_id),
        Some(&ImplicitConversion::Truthy {
            from: TypeId::INT,
            constant: Some(false)
        })
    );
}

#[test]
fn plain_booleans_need_no_conversion() {
    let b = AstBuilder::new();
    let cond = b.binary(BinaryOp::Lss, b.int(1), b.int(2));
    let cond_id = cond.id;
    let result = check_main(&b, vec![b.if_stmt(None, cond, b.block(vec![]), None)]);
    assert_clean(&result);
    assert!(!result.info.conversions.contains_key(&cond_id));
}

#[test]
fn word_and_unicode_operators() {
    let b = AstBuilder::new();
    let (d1, neq_id) = constant(&b, "neq", b.binary(BinaryOp::NeqUnicode, b.int(1), b.int(2)));
    let (d2, and_id) = constant(
        &b,
        "both",
        b.binary(
            BinaryOp::AndWord,
            b.name("true"),
            b.unary(UnaryOp::NotWord, b.name("false")),
        ),
    );
    let (d3, or_id) = constant(
        &b,
        "either",
        b.binary(
            BinaryOp::OrWord,
            b.unary(UnaryOp::NotUnicode, b.name("true")),
            b.name("false"),
        ),
    );
    let result = check_decls(&b, vec![d1, d2, d3]);
    assert_clean(&result);
    assert_eq!(result.info.value_of(neq_id), Some(&Value::Bool(true)));
    assert_eq!(result.info.value_of(and_id), Some(&Value::Bool(true)));
    assert_eq!(result.info.value_of(or_id), Some(&Value::Bool(false)));
}

// ── One-based indexing ─────────────────────────────────────────────────

#[test]
fn one_based_index_types_like_plain_index() {
    let b = AstBuilder::new();
    let first = b.one_based(b.name("xs"), b.int(1));
    let first_id = first.id;
    let result = check_main(
        &b,
        vec![
            b.define(&["xs"], vec![b.slice_lit(vec![b.int(10), b.int(20), b.int(30)])]),
            discard(&b, first),
        ],
    );
    assert_clean(&result);
    assert_eq!(result.info.type_of(first_id), Some(TypeId::INT));
}

#[test]
fn one_based_index_bounds() {
    let b = AstBuilder::new();
    let array = b.decl_stmt(b.var_decl(&["a"], Some(b.array_ty(b.int(3), b.name("int"))), vec![]));
    let result = check_main(
        &b,
        vec![
            array,
            discard(&b, b.one_based(b.name("a"), b.int(0))),
            discard(&b, b.one_based(b.name("a"), b.int(3))),
            discard(&b, b.one_based(b.name("a"), b.int(4))),
        ],
    );
    assert_eq!(
        messages(&result),
        vec![
            "invalid argument: index 0 must be at least 1 in one-based index",
            "invalid argument: index 4 out of bounds [1:3]",
        ]
    );
}

#[test]
fn maps_have_no_one_based_index() {
    let b = AstBuilder::new();
    let m = b.map_lit(Delim::Brace, vec![b.bare_entry("a", b.int(1), true)]);
    let result = check_main(
        &b,
        vec![
            b.define(&["m"], vec![m]),
            discard(&b, b.one_based(b.name("m"), b.int(1))),
        ],
    );
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(messages(&result)[0].contains("one-based index on map"));
}

// ── Container literals ─────────────────────────────────────────────────

#[test]
fn untyped_slice_literals_unify_elements() {
    let b = AstBuilder::new();
    let widened = b.slice_lit(vec![b.int(1), b.float("2.5")]);
    let widened_id = widened.id;
    let mixed = b.slice_lit(vec![b.int(1), b.string("a")]);
    let mixed_id = mixed.id;
    let empty = b.slice_lit(vec![]);
    let empty_id = empty.id;
    let result = check_main(&b, vec![discard(&b, widened), discard(&b, mixed), discard(&b, empty)]);
    assert_clean(&result);
    assert_eq!(type_of(&result, widened_id), "[]float64");
    assert_eq!(type_of(&result, mixed_id), "[]any");
    assert_eq!(type_of(&result, empty_id), "[]any");
}

#[test]
fn untyped_map_literals() {
    let b = AstBuilder::new();
    let bare = b.map_lit(
        Delim::Brace,
        vec![b.bare_entry("a", b.int(1), true), b.bare_entry("b", b.int(2), false)],
    );
    let bare_id = bare.id;
    let bracket = b.map_lit(
        Delim::Bracket,
        vec![b.entry(b.int(1), b.string("one"), true), b.entry(b.int(2), b.string("two"), true)],
    );
    let bracket_id = bracket.id;
    let empty = b.map_lit(Delim::Brace, vec![]);
    let empty_id = empty.id;
    let result = check_main(&b, vec![discard(&b, bare), discard(&b, bracket), discard(&b, empty)]);
    assert_clean(&result);
    assert_eq!(type_of(&result, bare_id), "map[string]int");
    assert_eq!(type_of(&result, bracket_id), "map[int]string");
    assert_eq!(type_of(&result, empty_id), "map[string]any");
}

#[test]
fn separators_do_not_change_a_literal() {
    let b = AstBuilder::new();
    let entries = |separated: bool| {
        vec![
            b.entry(b.string("a"), b.int(1), separated),
            b.entry(b.string("b"), b.float("2.5"), separated),
        ]
    };
    let with = b.map_lit(Delim::Bracket, entries(true));
    let with_id = with.id;
    let without = b.map_lit(Delim::Bracket, entries(false));
    let without_id = without.id;
    let result = check_main(&b, vec![discard(&b, with), discard(&b, without)]);
    assert_clean(&result);
    assert_eq!(type_of(&result, with_id), "map[string]float64");
    assert_eq!(type_of(&result, with_id), type_of(&result, without_id));
    assert_eq!(result.info.types[&with_id].mode, result.info.types[&without_id].mode);
}

#[test]
fn duplicate_map_keys() {
    let b = AstBuilder::new();
    let m = b.map_lit(
        Delim::Brace,
        vec![b.bare_entry("a", b.int(1), true), b.bare_entry("a", b.int(2), true)],
    );
    let result = check_main(&b, vec![discard(&b, m)]);
    assert_eq!(result.errors.len(), 1, "{:?}", messages(&result));
    assert!(matches!(result.errors[0], TypeError::DuplicateKey { .. }));
}

#[test]
fn literal_adopts_expected_type() {
    let b = AstBuilder::new();
    let lit = b.slice_lit(vec![b.int(1), b.int(2)]);
    let lit_id = lit.id;
    let decl = b.decl_stmt(b.var_decl(
        &["xs"],
        Some(b.slice_ty(b.name("float64"))),
        vec![lit],
    ));
    let result = check_main(&b, vec![decl]);
    assert_clean(&result);
    assert_eq!(type_of(&result, lit_id), "[]float64");
}
