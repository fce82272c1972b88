//! Gop syntax tree.
//!
//! The tree is produced by the external parser and consumed read-only by the
//! type checker. Every expression, statement and declared identifier carries
//! a [`NodeId`] that keys the checker's side tables, plus a byte [`Span`]
//! for diagnostics.
//!
//! - [`expr`]: expressions and type expressions
//! - [`stmt`]: statements and blocks
//! - [`item`]: files, imports and declarations
//! - [`op`]: operator kinds, including the word and unicode spellings
//! - [`printer`]: compact source rendering used in diagnostics
//! - [`build`]: programmatic tree construction
//!
//! [`Span`]: gop_common::Span

pub mod build;
pub mod expr;
pub mod item;
pub mod op;
pub mod printer;
pub mod stmt;

use serde::Serialize;

pub use build::AstBuilder;
pub use expr::*;
pub use item::*;
pub use op::{BinaryOp, UnaryOp};
pub use stmt::*;

/// Identity of a syntax node, unique within one checked package.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);
