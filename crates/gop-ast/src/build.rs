//! Programmatic tree construction.
//!
//! `AstBuilder` hands out fresh node ids and distinct synthetic spans so
//! trees built in tests and tools look like parser output to the checker.
//! All methods take `&self`, so builder calls nest freely.

use std::cell::Cell;

use gop_common::Span;

use crate::expr::*;
use crate::item::*;
use crate::op::{BinaryOp, UnaryOp};
use crate::stmt::*;
use crate::NodeId;

#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: Cell<u32>,
    next_offset: Cell<u32>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering after an earlier builder, for multi-file packages.
    pub fn starting_at(id: u32, offset: u32) -> Self {
        Self {
            next_id: Cell::new(id),
            next_offset: Cell::new(offset),
        }
    }

    pub fn id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId(id)
    }

    pub fn span(&self) -> Span {
        let start = self.next_offset.get();
        self.next_offset.set(start + 2);
        Span::new(start, start + 1)
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            id: self.id(),
            span: self.span(),
            kind,
        }
    }

    fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.id(),
            span: self.span(),
            kind,
        }
    }

    // ── Names and literals ──────────────────────────────────────────────

    pub fn ident(&self, name: &str) -> Ident {
        Ident {
            id: self.id(),
            name: name.to_string(),
            span: self.span(),
        }
    }

    pub fn idents(&self, names: &[&str]) -> Vec<Ident> {
        names.iter().map(|n| self.ident(n)).collect()
    }

    /// An identifier used as an expression.
    pub fn name(&self, name: &str) -> Expr {
        self.expr(ExprKind::Ident(name.to_string()))
    }

    pub fn bad(&self) -> Expr {
        self.expr(ExprKind::Bad)
    }

    fn lit(&self, kind: LitKind, value: &str) -> Expr {
        self.expr(ExprKind::BasicLit(BasicLit {
            kind,
            value: value.to_string(),
        }))
    }

    pub fn int(&self, value: i64) -> Expr {
        self.lit(LitKind::Int, &value.to_string())
    }

    /// Integer literal with its exact source text (`0x1F`, `1_000`).
    pub fn int_text(&self, text: &str) -> Expr {
        self.lit(LitKind::Int, text)
    }

    pub fn float(&self, text: &str) -> Expr {
        self.lit(LitKind::Float, text)
    }

    pub fn imag(&self, text: &str) -> Expr {
        self.lit(LitKind::Imag, text)
    }

    pub fn char(&self, c: char) -> Expr {
        self.lit(LitKind::Char, &c.to_string())
    }

    pub fn string(&self, value: &str) -> Expr {
        self.lit(LitKind::String, value)
    }

    // ── Expressions ─────────────────────────────────────────────────────

    pub fn paren(&self, x: Expr) -> Expr {
        self.expr(ExprKind::Paren(Box::new(x)))
    }

    pub fn unary(&self, op: UnaryOp, x: Expr) -> Expr {
        self.expr(ExprKind::Unary(op, Box::new(x)))
    }

    pub fn binary(&self, op: BinaryOp, x: Expr, y: Expr) -> Expr {
        self.expr(ExprKind::Binary(op, Box::new(x), Box::new(y)))
    }

    pub fn call(&self, fun: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(CallExpr {
            fun: Box::new(fun),
            args,
            ellipsis: None,
        }))
    }

    /// `fun(args...)`
    pub fn call_spread(&self, fun: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(CallExpr {
            fun: Box::new(fun),
            args,
            ellipsis: Some(self.span()),
        }))
    }

    pub fn sel(&self, x: Expr, name: &str) -> Expr {
        let sel = self.ident(name);
        self.expr(ExprKind::Selector(Box::new(x), sel))
    }

    pub fn index(&self, x: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index(Box::new(x), vec![index]))
    }

    /// `f[A, B]` instantiation.
    pub fn instantiate(&self, x: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Index(Box::new(x), args))
    }

    pub fn one_based(&self, x: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::OneBasedIndex(Box::new(x), Box::new(index)))
    }

    pub fn slice_expr(
        &self,
        x: Expr,
        low: Option<Expr>,
        high: Option<Expr>,
        max: Option<Expr>,
    ) -> Expr {
        self.expr(ExprKind::Slice(SliceExpr {
            x: Box::new(x),
            low: low.map(Box::new),
            high: high.map(Box::new),
            max: max.map(Box::new),
        }))
    }

    pub fn type_assert(&self, x: Expr, ty: Expr) -> Expr {
        self.expr(ExprKind::TypeAssert(Box::new(x), Some(Box::new(ty))))
    }

    /// `x.(type)`, only valid as a type switch guard.
    pub fn type_guard(&self, x: Expr) -> Expr {
        self.expr(ExprKind::TypeAssert(Box::new(x), None))
    }

    pub fn star(&self, x: Expr) -> Expr {
        self.expr(ExprKind::Star(Box::new(x)))
    }

    pub fn addr(&self, x: Expr) -> Expr {
        self.unary(UnaryOp::Addr, x)
    }

    pub fn recv(&self, x: Expr) -> Expr {
        self.unary(UnaryOp::Recv, x)
    }

    pub fn composite(&self, ty: Option<Expr>, elts: Vec<Element>) -> Expr {
        self.expr(ExprKind::CompositeLit(CompositeLit {
            ty: ty.map(Box::new),
            elts,
        }))
    }

    pub fn elem(&self, value: Expr) -> Element {
        Element { key: None, value }
    }

    pub fn keyed(&self, key: Expr, value: Expr) -> Element {
        Element {
            key: Some(key),
            value,
        }
    }

    pub fn slice_lit(&self, elts: Vec<Expr>) -> Expr {
        self.expr(ExprKind::SliceLit(SliceLit {
            elts,
            trailing_comma: false,
        }))
    }

    pub fn map_lit(&self, delim: Delim, entries: Vec<MapEntry>) -> Expr {
        self.expr(ExprKind::MapLit(MapLit { delim, entries }))
    }

    /// An entry keyed by an expression, optionally followed by a separator.
    pub fn entry(&self, key: Expr, value: Expr, separated: bool) -> MapEntry {
        MapEntry {
            key: MapKey::Expr(key),
            value,
            separator: separated.then(|| self.span()),
        }
    }

    /// An entry keyed by a bare identifier (`{name: v}`).
    pub fn bare_entry(&self, key: &str, value: Expr, separated: bool) -> MapEntry {
        MapEntry {
            key: MapKey::Bare(self.ident(key)),
            value,
            separator: separated.then(|| self.span()),
        }
    }

    pub fn func_lit(&self, sig: FuncType, body: Block) -> Expr {
        self.expr(ExprKind::FuncLit(FuncLit { sig, body }))
    }

    // ── Type expressions ────────────────────────────────────────────────

    pub fn array_ty(&self, len: Expr, elem: Expr) -> Expr {
        self.expr(ExprKind::ArrayType(Some(Box::new(len)), Box::new(elem)))
    }

    /// `[...]T` in a composite literal.
    pub fn open_array_ty(&self, elem: Expr) -> Expr {
        let len = self.expr(ExprKind::Ellipsis(None));
        self.array_ty(len, elem)
    }

    pub fn slice_ty(&self, elem: Expr) -> Expr {
        self.expr(ExprKind::ArrayType(None, Box::new(elem)))
    }

    pub fn map_ty(&self, key: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::MapType(Box::new(key), Box::new(value)))
    }

    pub fn chan_ty(&self, dir: ChanDir, elem: Expr) -> Expr {
        self.expr(ExprKind::ChanType(dir, Box::new(elem)))
    }

    /// `...T` as the final parameter type.
    pub fn variadic(&self, elem: Expr) -> Expr {
        self.expr(ExprKind::Ellipsis(Some(Box::new(elem))))
    }

    pub fn field(&self, names: &[&str], ty: Expr) -> Field {
        Field {
            names: self.idents(names),
            ty,
            span: self.span(),
        }
    }

    /// Unnamed parameter/result, or an embedded struct field.
    pub fn anon(&self, ty: Expr) -> Field {
        Field {
            names: Vec::new(),
            ty,
            span: self.span(),
        }
    }

    pub fn sig(&self, params: Vec<Field>, results: Vec<Field>) -> FuncType {
        FuncType {
            type_params: Vec::new(),
            params,
            results,
            span: self.span(),
        }
    }

    pub fn generic_sig(
        &self,
        type_params: Vec<Field>,
        params: Vec<Field>,
        results: Vec<Field>,
    ) -> FuncType {
        FuncType {
            type_params,
            params,
            results,
            span: self.span(),
        }
    }

    pub fn func_ty(&self, sig: FuncType) -> Expr {
        self.expr(ExprKind::FuncType(sig))
    }

    pub fn struct_ty(&self, fields: Vec<Field>) -> Expr {
        self.expr(ExprKind::StructType(fields))
    }

    pub fn iface_ty(&self, elems: Vec<InterfaceElem>) -> Expr {
        self.expr(ExprKind::InterfaceType(elems))
    }

    pub fn method_elem(&self, name: &str, sig: FuncType) -> InterfaceElem {
        InterfaceElem::Method {
            name: self.ident(name),
            sig,
        }
    }

    pub fn embed_elem(&self, ty: Expr) -> InterfaceElem {
        InterfaceElem::Embedded(ty)
    }

    pub fn union(&self, terms: Vec<Term>) -> Expr {
        self.expr(ExprKind::Union(terms))
    }

    pub fn term(&self, tilde: bool, ty: Expr) -> Term {
        Term { tilde, ty }
    }

    // ── Statements ──────────────────────────────────────────────────────

    pub fn block(&self, stmts: Vec<Stmt>) -> Block {
        Block {
            id: self.id(),
            span: self.span(),
            stmts,
        }
    }

    pub fn block_stmt(&self, stmts: Vec<Stmt>) -> Stmt {
        let block = self.block(stmts);
        self.stmt(StmtKind::Block(block))
    }

    pub fn empty(&self) -> Stmt {
        self.stmt(StmtKind::Empty)
    }

    pub fn expr_stmt(&self, x: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(x))
    }

    pub fn decl_stmt(&self, decl: GenDecl) -> Stmt {
        self.stmt(StmtKind::Decl(decl))
    }

    pub fn assign(&self, lhs: Vec<Expr>, rhs: Vec<Expr>) -> Stmt {
        self.assign_tok(AssignTok::Assign, lhs, rhs)
    }

    pub fn define(&self, lhs: &[&str], rhs: Vec<Expr>) -> Stmt {
        let lhs = lhs.iter().map(|n| self.name(n)).collect();
        self.assign_tok(AssignTok::Define, lhs, rhs)
    }

    pub fn op_assign(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Stmt {
        self.assign_tok(AssignTok::Op(op), vec![lhs], vec![rhs])
    }

    pub fn assign_tok(&self, tok: AssignTok, lhs: Vec<Expr>, rhs: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Assign(AssignStmt { lhs, tok, rhs }))
    }

    pub fn inc(&self, x: Expr) -> Stmt {
        self.stmt(StmtKind::IncDec(x, true))
    }

    pub fn dec(&self, x: Expr) -> Stmt {
        self.stmt(StmtKind::IncDec(x, false))
    }

    pub fn send(&self, ch: Expr, value: Expr) -> Stmt {
        self.stmt(StmtKind::Send(ch, value))
    }

    pub fn go(&self, call: Expr) -> Stmt {
        self.stmt(StmtKind::Go(call))
    }

    pub fn defer(&self, call: Expr) -> Stmt {
        self.stmt(StmtKind::Defer(call))
    }

    pub fn ret(&self, values: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(values))
    }

    pub fn branch(&self, kind: BranchKind, label: Option<&str>) -> Stmt {
        let label = label.map(|l| self.ident(l));
        self.stmt(StmtKind::Branch(kind, label))
    }

    pub fn labeled(&self, label: &str, stmt: Stmt) -> Stmt {
        let label = self.ident(label);
        self.stmt(StmtKind::Labeled(label, Box::new(stmt)))
    }

    pub fn if_stmt(&self, init: Option<Stmt>, cond: Expr, then: Block, els: Option<Stmt>) -> Stmt {
        self.stmt(StmtKind::If(IfStmt {
            init: init.map(Box::new),
            cond,
            then,
            els: els.map(Box::new),
        }))
    }

    pub fn for_stmt(
        &self,
        init: Option<Stmt>,
        cond: Option<Expr>,
        post: Option<Stmt>,
        body: Block,
    ) -> Stmt {
        self.stmt(StmtKind::For(ForStmt {
            init: init.map(Box::new),
            cond,
            post: post.map(Box::new),
            body,
        }))
    }

    /// `for key, value := range x` (`define`) or `for key, value = range x`.
    pub fn range_stmt(
        &self,
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
        body: Block,
    ) -> Stmt {
        let tok = if key.is_none() && value.is_none() {
            None
        } else if define {
            Some(AssignTok::Define)
        } else {
            Some(AssignTok::Assign)
        };
        self.stmt(StmtKind::Range(RangeStmt {
            key,
            value,
            tok,
            x,
            body,
        }))
    }

    pub fn case(&self, list: Vec<Expr>, body: Vec<Stmt>) -> CaseClause {
        CaseClause {
            id: self.id(),
            span: self.span(),
            list: Some(list),
            body,
        }
    }

    pub fn default_case(&self, body: Vec<Stmt>) -> CaseClause {
        CaseClause {
            id: self.id(),
            span: self.span(),
            list: None,
            body,
        }
    }

    pub fn switch_stmt(&self, init: Option<Stmt>, tag: Option<Expr>, clauses: Vec<CaseClause>) -> Stmt {
        self.stmt(StmtKind::Switch(SwitchStmt {
            init: init.map(Box::new),
            tag,
            clauses,
        }))
    }

    pub fn type_switch(&self, binding: Option<&str>, x: Expr, clauses: Vec<CaseClause>) -> Stmt {
        let binding = binding.map(|n| self.ident(n));
        self.stmt(StmtKind::TypeSwitch(TypeSwitchStmt {
            init: None,
            binding,
            x,
            clauses,
        }))
    }

    pub fn comm(&self, comm: Option<Stmt>, body: Vec<Stmt>) -> CommClause {
        CommClause {
            id: self.id(),
            span: self.span(),
            comm: comm.map(Box::new),
            body,
        }
    }

    pub fn select(&self, clauses: Vec<CommClause>) -> Stmt {
        self.stmt(StmtKind::Select(clauses))
    }

    pub fn assert_stmt(&self, cond: Expr, message: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Assert(cond, message))
    }

    // ── Declarations ────────────────────────────────────────────────────

    pub fn value_spec(&self, names: &[&str], ty: Option<Expr>, values: Vec<Expr>) -> ValueSpec {
        ValueSpec {
            names: self.idents(names),
            ty,
            values,
            span: self.span(),
        }
    }

    pub fn var_decl(&self, names: &[&str], ty: Option<Expr>, values: Vec<Expr>) -> GenDecl {
        GenDecl::Var(vec![self.value_spec(names, ty, values)])
    }

    pub fn const_decl(&self, names: &[&str], ty: Option<Expr>, values: Vec<Expr>) -> GenDecl {
        GenDecl::Const(vec![self.value_spec(names, ty, values)])
    }

    pub fn type_spec(&self, name: &str, type_params: Vec<Field>, ty: Expr) -> TypeSpec {
        TypeSpec {
            name: self.ident(name),
            type_params,
            alias: false,
            ty,
            span: self.span(),
        }
    }

    pub fn alias_spec(&self, name: &str, ty: Expr) -> TypeSpec {
        TypeSpec {
            name: self.ident(name),
            type_params: Vec::new(),
            alias: true,
            ty,
            span: self.span(),
        }
    }

    pub fn type_decl(&self, name: &str, ty: Expr) -> GenDecl {
        GenDecl::Type(vec![self.type_spec(name, Vec::new(), ty)])
    }

    pub fn func_decl(&self, name: &str, sig: FuncType, body: Option<Block>) -> Decl {
        Decl::Func(FuncDecl {
            id: self.id(),
            recv: None,
            name: self.ident(name),
            ty: sig,
            body,
            span: self.span(),
        })
    }

    pub fn method_decl(&self, recv: Field, name: &str, sig: FuncType, body: Option<Block>) -> Decl {
        Decl::Func(FuncDecl {
            id: self.id(),
            recv: Some(recv),
            name: self.ident(name),
            ty: sig,
            body,
            span: self.span(),
        })
    }

    pub fn import(&self, path: &str) -> ImportSpec {
        ImportSpec {
            id: self.id(),
            alias: None,
            path: path.to_string(),
            span: self.span(),
        }
    }

    pub fn import_as(&self, alias: &str, path: &str) -> ImportSpec {
        ImportSpec {
            id: self.id(),
            alias: Some(self.ident(alias)),
            path: path.to_string(),
            span: self.span(),
        }
    }

    pub fn file(&self, name: &str, imports: Vec<ImportSpec>, decls: Vec<Decl>) -> File {
        File {
            name: name.to_string(),
            package: self.ident("main"),
            imports,
            decls,
            span: self.span(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_and_spans_are_distinct() {
        let b = AstBuilder::new();
        let x = b.name("x");
        let y = b.name("y");
        assert_ne!(x.id, y.id);
        assert!(x.span.end <= y.span.start);
    }

    #[test]
    fn continued_builder_does_not_reuse_ids() {
        let first = AstBuilder::new();
        let a = first.name("a");
        let second = AstBuilder::starting_at(100, 1000);
        let b = second.name("b");
        assert!(b.id.0 > a.id.0);
        assert_eq!(b.span, Span::new(1000, 1001));
    }

    #[test]
    fn range_without_variables_has_no_token() {
        let b = AstBuilder::new();
        let stmt = b.range_stmt(None, None, true, b.int(3), b.block(vec![]));
        match stmt.kind {
            StmtKind::Range(r) => assert!(r.tok.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
