//! Statement nodes.

use gop_common::Span;

use crate::expr::{Expr, Ident};
use crate::item::GenDecl;
use crate::op::BinaryOp;
use crate::NodeId;

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignTok {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `op=`
    Op(BinaryOp),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub lhs: Vec<Expr>,
    pub tok: AssignTok,
    pub rhs: Vec<Expr>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Expr,
    pub then: Block,
    /// Either another `if` or a block statement.
    pub els: Option<Box<Stmt>>,
}

/// `case a, b:` clause; `list == None` is `default:`.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub id: NodeId,
    pub span: Span,
    pub list: Option<Vec<Expr>>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub tag: Option<Expr>,
    pub clauses: Vec<CaseClause>,
}

/// `switch v := x.(type) { ... }`
#[derive(Clone, Debug, PartialEq)]
pub struct TypeSwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub binding: Option<Ident>,
    pub x: Expr,
    pub clauses: Vec<CaseClause>,
}

/// `case <-ch:` / `case v := <-ch:` / `case ch <- v:`; `comm == None` is `default:`.
#[derive(Clone, Debug, PartialEq)]
pub struct CommClause {
    pub id: NodeId,
    pub span: Span,
    pub comm: Option<Box<Stmt>>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub post: Option<Box<Stmt>>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RangeStmt {
    pub key: Option<Expr>,
    pub value: Option<Expr>,
    /// `None` for `for range x`.
    pub tok: Option<AssignTok>,
    pub x: Expr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Bad,
    Empty,
    Decl(GenDecl),
    Labeled(Ident, Box<Stmt>),
    Expr(Expr),
    Send(Expr, Expr),
    /// `x++` (`true`) or `x--` (`false`).
    IncDec(Expr, bool),
    Assign(AssignStmt),
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    Branch(BranchKind, Option<Ident>),
    Block(Block),
    If(IfStmt),
    Switch(SwitchStmt),
    TypeSwitch(TypeSwitchStmt),
    Select(Vec<CommClause>),
    For(ForStmt),
    Range(RangeStmt),
    /// `assert cond[, message]`
    Assert(Expr, Option<Expr>),
}
