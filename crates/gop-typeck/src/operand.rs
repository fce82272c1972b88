//! Operands: the result of evaluating one expression.

use gop_ast::printer::expr_string;
use gop_ast::Expr;
use gop_common::Span;
use serde::Serialize;

use crate::builtins::Builtin;
use crate::constant::Value;
use crate::types::{TypeId, TypeTable};

/// How an operand may be used.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Mode {
    Invalid,
    /// Call of a function without results.
    NoValue,
    Builtin(Builtin),
    TypeExpr,
    Constant,
    /// Addressable value.
    Variable,
    /// `m[k]`: assignable but not addressable; yields comma-ok.
    MapIndex,
    Value,
    /// Value that may be used as `v, ok` (type assertion, receive).
    CommaOk,
    /// Call whose last result is an error.
    CommaError,
}

impl Mode {
    fn describe(self) -> &'static str {
        match self {
            Mode::Invalid => "invalid operand",
            Mode::NoValue => "no value",
            Mode::Builtin(_) => "built-in",
            Mode::TypeExpr => "type",
            Mode::Constant => "constant",
            Mode::Variable => "variable",
            Mode::MapIndex => "map index expression",
            Mode::Value => "value",
            Mode::CommaOk => "comma, ok expression",
            Mode::CommaError => "comma, error expression",
        }
    }

    /// Modes that denote a value usable in an expression.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Mode::Constant
                | Mode::Variable
                | Mode::MapIndex
                | Mode::Value
                | Mode::CommaOk
                | Mode::CommaError
        )
    }
}

#[derive(Clone, Debug)]
pub struct Operand<'a> {
    pub mode: Mode,
    pub ty: TypeId,
    pub val: Option<Value>,
    pub expr: Option<&'a Expr>,
}

impl<'a> Operand<'a> {
    pub fn invalid(expr: Option<&'a Expr>) -> Self {
        Operand {
            mode: Mode::Invalid,
            ty: TypeId::INVALID,
            val: None,
            expr,
        }
    }

    pub fn new(mode: Mode, ty: TypeId, expr: Option<&'a Expr>) -> Self {
        Operand {
            mode,
            ty,
            val: None,
            expr,
        }
    }

    pub fn constant(ty: TypeId, val: Value, expr: Option<&'a Expr>) -> Self {
        Operand {
            mode: Mode::Constant,
            ty,
            val: Some(val),
            expr,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.mode == Mode::Invalid
    }

    pub fn is_nil(&self) -> bool {
        self.mode == Mode::Value && self.ty == TypeId::UNTYPED_NIL
    }

    pub fn invalidate(&mut self) {
        self.mode = Mode::Invalid;
    }

    pub fn span(&self) -> Span {
        self.expr.map(|e| e.span).unwrap_or_default()
    }

    /// Source text of the operand's expression.
    pub fn text(&self) -> String {
        self.expr.map(expr_string).unwrap_or_default()
    }

    /// `x (variable of type int)`, `1 + 2 (untyped int constant 3)`.
    pub fn describe(&self, types: &TypeTable) -> String {
        let text = self.text();
        if self.is_nil() {
            return if text.is_empty() {
                "untyped nil".to_string()
            } else {
                format!("{text} (untyped nil value)")
            };
        }
        let mut desc = String::new();
        let mut has_type = false;
        match self.mode {
            Mode::Invalid | Mode::NoValue | Mode::Builtin(_) | Mode::TypeExpr => {}
            _ => {
                if types.is_untyped(self.ty) {
                    desc.push_str(&types.type_string(self.ty));
                    desc.push(' ');
                } else {
                    has_type = true;
                }
            }
        }
        desc.push_str(self.mode.describe());
        if self.mode == Mode::Constant {
            if let Some(val) = &self.val {
                let shown = val.to_string();
                if shown != text {
                    desc.push(' ');
                    desc.push_str(&shown);
                }
            }
        }
        if has_type {
            if self.ty.is_valid() {
                desc.push_str(" of type ");
                desc.push_str(&types.type_string(self.ty));
                if let Some(tp) = types.type_param(self.ty) {
                    if tp.bound.is_valid() {
                        desc.push_str(" constrained by ");
                        desc.push_str(&types.type_string(tp.bound));
                    }
                }
            } else {
                desc.push_str(" with invalid type");
            }
        }
        if text.is_empty() {
            desc
        } else {
            format!("{text} ({desc})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gop_ast::{AstBuilder, BinaryOp};

    #[test]
    fn describes_constants_and_variables() {
        let b = AstBuilder::new();
        let tt = TypeTable::new();
        let one = b.int(1);
        let op = Operand::constant(TypeId::UNTYPED_INT, Value::Int(1), Some(&one));
        assert_eq!(op.describe(&tt), "1 (untyped int constant)");

        let sum = b.binary(BinaryOp::Add, b.int(1), b.int(2));
        let op = Operand::constant(TypeId::UNTYPED_INT, Value::Int(3), Some(&sum));
        assert_eq!(op.describe(&tt), "1 + 2 (untyped int constant 3)");

        let x = b.name("x");
        let op = Operand::new(Mode::Variable, TypeId::INT, Some(&x));
        assert_eq!(op.describe(&tt), "x (variable of type int)");

        let nil = b.name("nil");
        let op = Operand::new(Mode::Value, TypeId::UNTYPED_NIL, Some(&nil));
        assert_eq!(op.describe(&tt), "nil (untyped nil value)");
    }
}
