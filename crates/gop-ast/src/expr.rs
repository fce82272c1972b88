//! Expression and type-expression nodes.

use gop_common::Span;

use crate::op::{BinaryOp, UnaryOp};
use crate::stmt::Block;
use crate::NodeId;

/// A declared name (variable, field, parameter, label, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

/// A literal token. `Int`, `Float` and `Imag` keep their source text;
/// `Char` and `String` carry the decoded contents.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicLit {
    pub kind: LitKind,
    pub value: String,
}

/// One element of a typed composite literal `T{...}`.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub key: Option<Expr>,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompositeLit {
    pub ty: Option<Box<Expr>>,
    pub elts: Vec<Element>,
}

/// Untyped sequence literal `[a, b, c]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceLit {
    pub elts: Vec<Expr>,
    pub trailing_comma: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Delim {
    Bracket,
    Brace,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MapKey {
    Expr(Expr),
    /// A bare identifier key in a brace literal, keyed by its text.
    Bare(Ident),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapEntry {
    pub key: MapKey,
    pub value: Expr,
    /// Position of the separator following the entry, if one was written.
    pub separator: Option<Span>,
}

/// Untyped associative literal `{k: v ...}` or `[k: v ...]`.
#[derive(Clone, Debug, PartialEq)]
pub struct MapLit {
    pub delim: Delim,
    pub entries: Vec<MapEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncLit {
    pub sig: FuncType,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SliceExpr {
    pub x: Box<Expr>,
    pub low: Option<Box<Expr>>,
    pub high: Option<Box<Expr>>,
    pub max: Option<Box<Expr>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub fun: Box<Expr>,
    pub args: Vec<Expr>,
    /// Position of a trailing `...` spread.
    pub ellipsis: Option<Span>,
}

/// A parameter, result, struct field or type parameter group.
/// Embedded struct fields have no names.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub names: Vec<Ident>,
    pub ty: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncType {
    pub type_params: Vec<Field>,
    pub params: Vec<Field>,
    pub results: Vec<Field>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InterfaceElem {
    Method { name: Ident, sig: FuncType },
    /// An embedded interface, type, or union of terms.
    Embedded(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub tilde: bool,
    pub ty: Expr,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Already reported by the parser.
    Bad,
    Ident(String),
    BasicLit(BasicLit),
    CompositeLit(CompositeLit),
    SliceLit(SliceLit),
    MapLit(MapLit),
    FuncLit(FuncLit),
    Paren(Box<Expr>),
    Selector(Box<Expr>, Ident),
    /// `x[i]` or an instantiation `f[int, string]`.
    Index(Box<Expr>, Vec<Expr>),
    /// `x#i`, one-based.
    OneBasedIndex(Box<Expr>, Box<Expr>),
    Slice(SliceExpr),
    /// `x.(T)`; `None` is the `x.(type)` form of a type switch guard.
    TypeAssert(Box<Expr>, Option<Box<Expr>>),
    Call(CallExpr),
    /// `*x`: dereference or pointer type.
    Star(Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `[N]T`; a `None` length is a slice type `[]T`.
    ArrayType(Option<Box<Expr>>, Box<Expr>),
    /// `...T` in a parameter list or `[...]T` length.
    Ellipsis(Option<Box<Expr>>),
    MapType(Box<Expr>, Box<Expr>),
    ChanType(ChanDir, Box<Expr>),
    FuncType(FuncType),
    StructType(Vec<Field>),
    InterfaceType(Vec<InterfaceElem>),
    Union(Vec<Term>),
}

impl Expr {
    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::Paren(inner) = &e.kind {
            e = inner;
        }
        e
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}
