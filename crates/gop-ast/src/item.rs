//! Top-level items: files, imports, and declarations.

use gop_common::Span;

use crate::expr::{Expr, Field, FuncType, Ident};
use crate::stmt::Block;
use crate::NodeId;

#[derive(Clone, Debug, PartialEq)]
pub struct File {
    pub name: String,
    pub package: Ident,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportSpec {
    pub id: NodeId,
    pub alias: Option<Ident>,
    pub path: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Gen(GenDecl),
    Func(FuncDecl),
}

/// A `const`, `var` or `type` group.
#[derive(Clone, Debug, PartialEq)]
pub enum GenDecl {
    Const(Vec<ValueSpec>),
    Var(Vec<ValueSpec>),
    Type(Vec<TypeSpec>),
}

/// `a, b T = x, y`. In a const group an empty spec repeats the previous one.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeSpec {
    pub name: Ident,
    pub type_params: Vec<Field>,
    /// `type A = B`
    pub alias: bool,
    pub ty: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub id: NodeId,
    pub recv: Option<Field>,
    pub name: Ident,
    pub ty: FuncType,
    pub body: Option<Block>,
    pub span: Span,
}
