//! Operator kinds.
//!
//! The parser keeps the spelling the user wrote (`and`, `≠`, `¬`, ...) so
//! tools can round-trip source. Semantic passes call [`BinaryOp::canonical`]
//! / [`UnaryOp::canonical`] and only ever see the conventional forms.

use std::fmt;

use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
    /// `and`
    AndWord,
    /// `or`
    OrWord,
    /// `≠`
    NeqUnicode,
}

impl BinaryOp {
    /// Map alternate spellings onto their conventional operator.
    pub fn canonical(self) -> BinaryOp {
        match self {
            BinaryOp::AndWord => BinaryOp::LAnd,
            BinaryOp::OrWord => BinaryOp::LOr,
            BinaryOp::NeqUnicode => BinaryOp::Neq,
            op => op,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self.canonical(),
            BinaryOp::Eql | BinaryOp::Neq | BinaryOp::Lss | BinaryOp::Leq | BinaryOp::Gtr | BinaryOp::Geq
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }

    pub fn is_logical(self) -> bool {
        matches!(self.canonical(), BinaryOp::LAnd | BinaryOp::LOr)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Quo => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lss => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gtr => ">",
            BinaryOp::Geq => ">=",
            BinaryOp::AndWord => "and",
            BinaryOp::OrWord => "or",
            BinaryOp::NeqUnicode => "≠",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Neg,
    /// `^x`
    Xor,
    /// `!x`
    Not,
    /// `not x`
    NotWord,
    /// `¬x`
    NotUnicode,
    /// `&x`
    Addr,
    /// `<-x`
    Recv,
}

impl UnaryOp {
    pub fn canonical(self) -> UnaryOp {
        match self {
            UnaryOp::NotWord | UnaryOp::NotUnicode => UnaryOp::Not,
            op => op,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Xor => "^",
            UnaryOp::Not => "!",
            UnaryOp::NotWord => "not ",
            UnaryOp::NotUnicode => "¬",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_and_unicode_forms_are_canonicalised() {
        assert_eq!(BinaryOp::AndWord.canonical(), BinaryOp::LAnd);
        assert_eq!(BinaryOp::OrWord.canonical(), BinaryOp::LOr);
        assert_eq!(BinaryOp::NeqUnicode.canonical(), BinaryOp::Neq);
        assert_eq!(UnaryOp::NotWord.canonical(), UnaryOp::Not);
        assert_eq!(UnaryOp::NotUnicode.canonical(), UnaryOp::Not);
        assert_eq!(BinaryOp::Add.canonical(), BinaryOp::Add);
    }

    #[test]
    fn classification_follows_canonical_form() {
        assert!(BinaryOp::NeqUnicode.is_comparison());
        assert!(BinaryOp::OrWord.is_logical());
        assert!(!BinaryOp::Shl.is_comparison());
        assert!(BinaryOp::Shr.is_shift());
    }
}
