//! Expressions: evaluation entry points, untyped operands and operators.
//!
//! Every expression is evaluated into an [`Operand`] and recorded. Untyped
//! results stay provisional in [`Checker::untyped`] until the surrounding
//! context fixes their type (see [`Checker::update_expr_type`]).

use gop_ast::printer::expr_string;
use gop_ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use gop_common::Span;
use tracing::trace;

use crate::checker::Checker;
use crate::constant::{self, ConstError, ReprError, Value};
use crate::error::{ConversionFailure, Flow, TypeError};
use crate::info::ImplicitConversion;
use crate::objects::ObjKind;
use crate::operand::{Mode, Operand};
use crate::predicates::{
    all_boolean, all_integer, all_numeric, all_numeric_or_string, all_ordered, all_string, comparable, core_type, has_nil,
    identical, type_set, under_is,
};
use crate::types::{BasicKind, Type, TypeId};

/// Largest count accepted in a constant shift.
const SHIFT_BOUND: u64 = 1023 - 1 + 52;

impl<'a> Checker<'a> {
    // ── Entry points ────────────────────────────────────────────────────

    /// Evaluate `e` to a single value.
    pub(crate) fn expr(&mut self, e: &'a Expr) -> Flow<Operand<'a>> {
        self.expr_with_hint(e, None)
    }

    /// Like [`Checker::expr`]. `hint` is the type the context expects and
    /// gives untyped container literals their element types.
    pub(crate) fn expr_with_hint(&mut self, e: &'a Expr, hint: Option<TypeId>) -> Flow<Operand<'a>> {
        let mut x = self.raw_expr(e, hint, false)?;
        self.exclude(&mut x, false);
        self.single_value(&mut x);
        Ok(x)
    }

    /// Evaluate `e` as a value or a type.
    pub(crate) fn expr_or_type(&mut self, e: &'a Expr, allow_generic: bool) -> Flow<Operand<'a>> {
        let mut x = self.raw_expr(e, None, allow_generic)?;
        self.exclude(&mut x, true);
        self.single_value(&mut x);
        Ok(x)
    }

    /// Evaluate `e`, expanding a multi-value call into one operand per
    /// result. With `allow_comma_ok`, a map index, type assertion or
    /// receive yields a second `ok` operand; the flag in the result reports
    /// that it did.
    pub(crate) fn multi_expr(&mut self, e: &'a Expr, allow_comma_ok: bool) -> Flow<(Vec<Operand<'a>>, bool)> {
        let mut x = self.raw_expr(e, None, false)?;
        self.exclude(&mut x, false);
        if !x.is_invalid() {
            if let Some(elems) = self.types.tuple_elems(x.ty) {
                let list = elems
                    .iter()
                    .map(|t| Operand::new(Mode::Value, *t, Some(e)))
                    .collect();
                return Ok((list, false));
            }
        }
        if allow_comma_ok && matches!(x.mode, Mode::MapIndex | Mode::CommaOk) {
            x.mode = Mode::Value;
            let ok = Operand::new(Mode::Value, TypeId::UNTYPED_BOOL, Some(e));
            return Ok((vec![x, ok], true));
        }
        Ok((vec![x], false))
    }

    /// Evaluate a list of expressions. A single call may produce several
    /// operands.
    pub(crate) fn expr_list(&mut self, es: &'a [Expr]) -> Flow<Vec<Operand<'a>>> {
        match es {
            [] => Ok(Vec::new()),
            [single] => Ok(self.multi_expr(single, false)?.0),
            _ => es.iter().map(|e| self.expr(e)).collect(),
        }
    }

    /// Evaluate expressions only for their errors and uses, typically after
    /// an earlier error made their context meaningless. Returns false if
    /// any of them is invalid.
    pub(crate) fn use_exprs(&mut self, es: &'a [Expr]) -> Flow<bool> {
        let mut ok = true;
        for e in es {
            ok &= self.use_expr(e, false)?;
        }
        Ok(ok)
    }

    /// Like [`Checker::use_exprs`] for assignment targets: assigning to a
    /// variable does not count as using it.
    pub(crate) fn use_lhs(&mut self, es: &'a [Expr]) -> Flow<bool> {
        let mut ok = true;
        for e in es {
            ok &= self.use_expr(e, true)?;
        }
        Ok(ok)
    }

    fn use_expr(&mut self, e: &'a Expr, lhs: bool) -> Flow<bool> {
        let inner = e.unparen();
        if let ExprKind::Ident(name) = &inner.kind {
            if name == "_" {
                return Ok(true);
            }
            let var = self
                .lookup(name)
                .filter(|obj| lhs && self.objects[*obj].kind == ObjKind::Var);
            let was_used = var.map(|obj| self.objects[obj].used);
            let x = self.raw_expr(inner, None, true)?;
            if let (Some(obj), Some(used)) = (var, was_used) {
                self.objects[obj].used = used;
            }
            return Ok(!x.is_invalid());
        }
        let x = self.raw_expr(e, None, true)?;
        Ok(!x.is_invalid())
    }

    /// Evaluate `e` without restricting the operand mode and record the
    /// result.
    pub(crate) fn raw_expr(&mut self, e: &'a Expr, hint: Option<TypeId>, allow_generic: bool) -> Flow<Operand<'a>> {
        let mut x = self.expr_internal(e, hint)?;
        if !allow_generic {
            self.non_generic(&mut x);
        }
        self.record_operand(e, &x, false);
        Ok(x)
    }

    fn expr_internal(&mut self, e: &'a Expr, hint: Option<TypeId>) -> Flow<Operand<'a>> {
        let mut x = Operand::invalid(Some(e));
        match &e.kind {
            ExprKind::Bad => {}
            ExprKind::Ident(name) => self.ident(&mut x, e, name, false)?,
            ExprKind::Ellipsis(_) => self.error(TypeError::InvalidUse {
                message: "invalid use of ...".to_string(),
                span: e.span,
            }),
            ExprKind::BasicLit(lit) => x = self.basic_lit(e, lit),
            ExprKind::FuncLit(lit) => x = self.func_lit(e, lit)?,
            ExprKind::CompositeLit(lit) => x = self.composite_lit(e, lit, hint)?,
            ExprKind::SliceLit(lit) => x = self.slice_lit(e, lit, hint)?,
            ExprKind::MapLit(lit) => x = self.map_lit(e, lit, hint)?,
            ExprKind::Paren(inner) => x = self.raw_expr(inner, hint, false)?,
            ExprKind::Selector(base, sel) => self.selector(&mut x, e, base, sel, false)?,
            ExprKind::Index(base, indices) => self.index_expr(&mut x, e, base, indices)?,
            ExprKind::OneBasedIndex(base, index) => self.one_based_index(&mut x, e, base, index)?,
            ExprKind::Slice(s) => self.slice_expr(&mut x, e, s)?,
            ExprKind::TypeAssert(base, target) => self.type_assert_expr(&mut x, e, base, target.as_deref())?,
            ExprKind::Call(call) => self.call_expr(&mut x, e, call)?,
            ExprKind::Star(base) => self.star_expr(&mut x, base)?,
            ExprKind::Unary(op, operand) => {
                x = self.expr(operand)?;
                self.unary(&mut x, e, operand, *op)?;
            }
            ExprKind::Binary(op, lhs, rhs) => x = self.binary(Some(e), lhs, rhs, *op)?,
            ExprKind::ArrayType(..)
            | ExprKind::MapType(..)
            | ExprKind::ChanType(..)
            | ExprKind::FuncType(_)
            | ExprKind::StructType(_)
            | ExprKind::InterfaceType(_)
            | ExprKind::Union(_) => {
                let t = self.type_expr(e)?;
                if t.is_valid() {
                    x = Operand::new(Mode::TypeExpr, t, Some(e));
                }
            }
        }
        x.expr = Some(e);
        Ok(x)
    }

    /// Report operands that cannot be used as values. With `allow_type`
    /// the caller also accepts types and built-ins and handles them itself.
    pub(crate) fn exclude(&mut self, x: &mut Operand<'a>, allow_type: bool) {
        let message = match x.mode {
            Mode::NoValue if allow_type => format!("{} used as value or type", self.describe(x)),
            Mode::NoValue => format!("{} used as value", self.describe(x)),
            Mode::Builtin(_) if !allow_type => format!("{} must be called", self.describe(x)),
            Mode::TypeExpr if !allow_type => {
                self.error(TypeError::NotAnExpr {
                    expr: x.text(),
                    span: x.span(),
                });
                x.invalidate();
                return;
            }
            _ => return,
        };
        self.error(TypeError::InvalidUse {
            message,
            span: x.span(),
        });
        x.invalidate();
    }

    pub(crate) fn single_value(&mut self, x: &mut Operand<'a>) {
        if x.mode.is_value() && self.types.tuple_elems(x.ty).is_some() {
            self.error(TypeError::InvalidUse {
                message: format!("multiple-value {} in single-value context", self.describe(x)),
                span: x.span(),
            });
            x.invalidate();
        }
    }

    /// Generic functions and types must be instantiated before use.
    pub(crate) fn non_generic(&mut self, x: &mut Operand<'a>) {
        if x.is_invalid() || x.mode == Mode::NoValue {
            return;
        }
        let what = if x.mode == Mode::TypeExpr && self.is_generic(x.ty) {
            "type"
        } else if x.mode != Mode::TypeExpr
            && self.types.sig(x.ty).is_some_and(|s| !s.type_params.is_empty())
        {
            "function"
        } else {
            return;
        };
        self.error(TypeError::GenericWithoutInstantiation {
            what: what.to_string(),
            name: x.text(),
            span: x.span(),
        });
        x.invalidate();
        x.ty = TypeId::INVALID;
    }

    fn star_expr(&mut self, x: &mut Operand<'a>, base: &'a Expr) -> Flow<()> {
        *x = self.expr_or_type(base, false)?;
        match x.mode {
            Mode::Invalid => {}
            Mode::TypeExpr => x.ty = self.types.pointer(x.ty),
            _ => {
                if x.is_nil() {
                    self.error(TypeError::InvalidOperation {
                        message: "cannot indirect nil".to_string(),
                        span: x.span(),
                    });
                    x.invalidate();
                    return Ok(());
                }
                let elem = core_type(&self.types, x.ty).and_then(|u| match self.types.get(u) {
                    Type::Pointer(elem) => Some(*elem),
                    _ => None,
                });
                match elem {
                    Some(elem) => {
                        x.mode = Mode::Variable;
                        x.ty = elem;
                        x.val = None;
                    }
                    None => {
                        self.error(TypeError::InvalidOperation {
                            message: format!("cannot indirect {}", self.describe(x)),
                            span: x.span(),
                        });
                        x.invalidate();
                    }
                }
            }
        }
        Ok(())
    }

    // ── Conditions ──────────────────────────────────────────────────────

    /// Check the condition of an `if`, `for` or `assert`. Any value is
    /// accepted; a non-boolean one is tested for truthiness at run time and
    /// the test is recorded as an implicit conversion.
    pub(crate) fn condition(&mut self, e: &'a Expr) -> Flow<()> {
        let mut x = self.expr(e)?;
        if x.is_invalid() || all_boolean(&self.types, x.ty) {
            return Ok(());
        }
        let constant = if x.is_nil() {
            Some(false)
        } else {
            if self.types.is_untyped(x.ty) {
                let target = self.types.default_type(x.ty);
                self.convert_untyped(&mut x, target)?;
                if x.is_invalid() {
                    return Ok(());
                }
            }
            match (&x.mode, &x.val) {
                (Mode::Constant, Some(v)) => Some(v.truthy()),
                _ => None,
            }
        };
        trace!(node = e.id.0, from = %self.type_string(x.ty), ?constant, "truthy condition");
        self.record_conversion(e.id, ImplicitConversion::Truthy { from: x.ty, constant });
        Ok(())
    }

    // ── Untyped operands ────────────────────────────────────────────────

    /// Give the untyped expression `e` (and the untyped operands it was
    /// computed from) the type `ty`. A `final` type is recorded; otherwise
    /// the provisional untyped kind is only widened.
    pub(crate) fn update_expr_type(&mut self, e: &'a Expr, ty: TypeId, is_final: bool) -> Flow<()> {
        let Some(old) = self.untyped.get(&e.id).cloned() else {
            return Ok(());
        };
        match &e.kind {
            ExprKind::Paren(inner) => self.update_expr_type(inner, ty, is_final)?,
            ExprKind::Unary(_, operand) if old.val.is_none() => self.update_expr_type(operand, ty, is_final)?,
            ExprKind::Binary(op, lhs, rhs) if old.val.is_none() => {
                if op.is_comparison() {
                    // the result type does not depend on the operands
                } else if op.is_shift() {
                    self.update_expr_type(lhs, ty, is_final)?;
                } else {
                    self.update_expr_type(lhs, ty, is_final)?;
                    self.update_expr_type(rhs, ty, is_final)?;
                }
            }
            _ => {}
        }

        if !is_final && self.types.is_untyped(ty) {
            if let Some(entry) = self.untyped.get_mut(&e.id) {
                entry.ty = ty;
            }
            return Ok(());
        }

        self.untyped.remove(&e.id);
        if old.is_lhs && !all_integer(&self.types, ty) {
            self.error(TypeError::InvalidOperation {
                message: format!(
                    "shifted operand {} (type {}) must be integer",
                    expr_string(e),
                    self.type_string(ty)
                ),
                span: e.span,
            });
            return Ok(());
        }
        let mut val = old.val.clone();
        if old.val.is_some() {
            let mut c = Operand {
                mode: old.mode,
                ty: old.ty,
                val: old.val,
                expr: Some(e),
            };
            self.convert_untyped(&mut c, ty)?;
            if c.is_invalid() {
                return Ok(());
            }
            val = c.val;
        }
        self.record_type_and_value(e, old.mode, ty, val);
        Ok(())
    }

    pub(crate) fn update_expr_val(&mut self, e: &Expr, val: &Value) {
        if let Some(entry) = self.untyped.get_mut(&e.id) {
            entry.val = Some(val.clone());
        }
    }

    /// Convert an untyped operand to `target`, or to the larger untyped
    /// kind if `target` is untyped too.
    pub(crate) fn convert_untyped(&mut self, x: &mut Operand<'a>, target: TypeId) -> Flow<()> {
        match self.implicit_type_and_value(x, target) {
            Err(err) => {
                let t = if self.types.is_type_param(target) {
                    target
                } else {
                    self.types.underlying(target)
                };
                self.invalid_conversion(x, t, err);
                x.invalidate();
            }
            Ok((ty, val)) => {
                if let Some(val) = val {
                    if let Some(e) = x.expr {
                        self.update_expr_val(e, &val);
                    }
                    x.val = Some(val);
                }
                if ty != x.ty {
                    x.ty = ty;
                    if let Some(e) = x.expr {
                        self.update_expr_type(e, ty, false)?;
                    }
                }
                if x.mode == Mode::Constant && self.types.is_type_param(x.ty) {
                    x.mode = Mode::Value;
                    x.val = None;
                }
            }
        }
        Ok(())
    }

    /// The type (and, for constants, the value) an untyped operand takes
    /// when used where a `target` is expected. Typed operands are returned
    /// unchanged.
    pub(crate) fn implicit_type_and_value(
        &self,
        x: &Operand<'a>,
        target: TypeId,
    ) -> Result<(TypeId, Option<Value>), ReprError> {
        if x.is_invalid() || self.types.is_typed(x.ty) || !target.is_valid() {
            return Ok((x.ty, None));
        }
        if self.types.is_untyped(target) {
            return self
                .max_untyped(x.ty, target)
                .map(|t| (t, None))
                .ok_or(ReprError::NotRepresentable);
        }
        if x.is_nil() {
            return if has_nil(&self.types, target) {
                Ok((target, None))
            } else {
                Err(ReprError::NotRepresentable)
            };
        }
        if self.types.is_type_param(target) {
            let ok = under_is(&self.types, target, |u| self.implicit_type_and_value(x, u).is_ok());
            return if ok {
                Ok((target, None))
            } else {
                Err(ReprError::NotRepresentable)
            };
        }
        match self.types.get(self.types.underlying(target)) {
            Type::Basic(kind) => {
                if x.mode == Mode::Constant {
                    if let Some(val) = &x.val {
                        let v = constant::representable(val, *kind)?;
                        return Ok((target, Some(v)));
                    }
                    return Ok((target, None));
                }
                let fits = match self.types.basic_kind(x.ty) {
                    Some(BasicKind::UntypedBool) => kind.is_boolean(),
                    Some(BasicKind::UntypedInt | BasicKind::UntypedRune)
                    | Some(BasicKind::UntypedFloat | BasicKind::UntypedComplex) => kind.is_numeric(),
                    Some(BasicKind::UntypedString) => kind.is_string(),
                    _ => false,
                };
                if fits {
                    Ok((target, None))
                } else {
                    Err(ReprError::NotRepresentable)
                }
            }
            Type::Interface(_) => {
                if type_set(&self.types, target).is_all() {
                    Ok((self.types.default_type(x.ty), None))
                } else {
                    Err(ReprError::NotRepresentable)
                }
            }
            _ => Err(ReprError::NotRepresentable),
        }
    }

    /// Convert whichever operand is untyped to the type of the other, if
    /// the two can possibly match.
    pub(crate) fn match_types(&mut self, x: &mut Operand<'a>, y: &mut Operand<'a>) -> Flow<()> {
        if !self.may_convert(x, y) {
            return Ok(());
        }
        let yt = y.ty;
        self.convert_untyped(x, yt)?;
        if x.is_invalid() {
            return Ok(());
        }
        let xt = x.ty;
        self.convert_untyped(y, xt)?;
        if y.is_invalid() {
            x.invalidate();
        }
        Ok(())
    }

    fn may_convert(&self, x: &Operand<'a>, y: &Operand<'a>) -> bool {
        let tt = &self.types;
        if tt.is_typed(x.ty) && tt.is_typed(y.ty) {
            return false;
        }
        if all_numeric(tt, x.ty) != all_numeric(tt, y.ty)
            || all_boolean(tt, x.ty) != all_boolean(tt, y.ty)
            || all_string(tt, x.ty) != all_string(tt, y.ty)
        {
            return false;
        }
        if x.is_nil() {
            return has_nil(tt, y.ty);
        }
        if y.is_nil() {
            return has_nil(tt, x.ty);
        }
        let is_pointer = |t: TypeId| matches!(tt.get(tt.underlying(t)), Type::Pointer(_));
        !is_pointer(x.ty) && !is_pointer(y.ty)
    }

    // ── Constants ───────────────────────────────────────────────────────

    /// Check that the constant `x` fits `t` and convert its value to `t`'s
    /// representation.
    pub(crate) fn representable(&mut self, x: &mut Operand<'a>, t: TypeId) {
        let (Some(val), Some(kind)) = (&x.val, self.types.basic_kind(t)) else {
            return;
        };
        match constant::representable(val, kind) {
            Ok(v) => x.val = Some(v),
            Err(err) => {
                self.invalid_conversion(x, t, err);
                x.invalidate();
            }
        }
    }

    pub(crate) fn invalid_conversion(&mut self, x: &Operand<'a>, t: TypeId, err: ReprError) {
        let failure = match err {
            ReprError::Overflow => ConversionFailure::Overflows,
            ReprError::Truncated => ConversionFailure::Truncated,
            ReprError::NotRepresentable => ConversionFailure::Cannot,
        };
        self.error(TypeError::InvalidConversion {
            operand: self.describe(x),
            target: self.type_string(t),
            failure,
            cause: String::new(),
            span: x.span(),
        });
    }

    /// Typed constants must stay representable in their type after every
    /// operation.
    fn overflow(&mut self, x: &mut Operand<'a>) {
        if self.types.is_typed(x.ty) {
            let t = x.ty;
            self.representable(x, t);
        }
    }

    fn const_error(&mut self, x: &mut Operand<'a>, err: ConstError, span: Span) {
        let err = match err {
            ConstError::DivByZero => TypeError::DivisionByZero { span },
            ConstError::Overflow => TypeError::ConstantOverflow { span },
            ConstError::Invalid => TypeError::InvalidUse {
                message: "constant result is not representable".to_string(),
                span,
            },
        };
        self.error(err);
        x.invalidate();
    }

    // ── Operators ───────────────────────────────────────────────────────

    fn unary(&mut self, x: &mut Operand<'a>, e: &'a Expr, operand: &'a Expr, op: UnaryOp) -> Flow<()> {
        if x.is_invalid() {
            return Ok(());
        }
        let op = op.canonical();
        match op {
            UnaryOp::Addr => {
                let literal = matches!(
                    operand.unparen().kind,
                    ExprKind::CompositeLit(_) | ExprKind::SliceLit(_) | ExprKind::MapLit(_)
                );
                if !literal && x.mode != Mode::Variable {
                    self.error(TypeError::InvalidOperation {
                        message: format!("cannot take address of {}", self.describe(x)),
                        span: x.span(),
                    });
                    x.invalidate();
                    return Ok(());
                }
                x.mode = Mode::Value;
                x.ty = self.types.pointer(x.ty);
                x.val = None;
                return Ok(());
            }
            UnaryOp::Recv => {
                self.receive(x);
                return Ok(());
            }
            _ => {}
        }

        let defined = match op {
            UnaryOp::Plus | UnaryOp::Neg => all_numeric(&self.types, x.ty),
            UnaryOp::Xor => all_integer(&self.types, x.ty),
            _ => all_boolean(&self.types, x.ty),
        };
        if !defined {
            self.error(TypeError::InvalidOperation {
                message: format!("operator {} not defined on {}", op.as_str(), self.describe(x)),
                span: x.span(),
            });
            x.invalidate();
            return Ok(());
        }

        if x.mode == Mode::Constant {
            let Some(val) = x.val.clone() else {
                return Ok(());
            };
            let bits = self
                .types
                .basic_kind(x.ty)
                .filter(|k| k.is_unsigned())
                .and_then(BasicKind::bits);
            match constant::unary_op(op, &val, bits) {
                Ok(v) => {
                    x.val = Some(v);
                    x.expr = Some(e);
                    self.overflow(x);
                }
                Err(err) => self.const_error(x, err, e.span),
            }
            return Ok(());
        }
        x.mode = Mode::Value;
        x.val = None;
        Ok(())
    }

    fn receive(&mut self, x: &mut Operand<'a>) {
        let desc = self.describe(x);
        let Some(u) = core_type(&self.types, x.ty) else {
            self.error(TypeError::InvalidOperation {
                message: format!("cannot receive from {desc} (no core type)"),
                span: x.span(),
            });
            x.invalidate();
            return;
        };
        let problem = match self.types.get(u) {
            Type::Chan { dir, elem } => {
                if *dir == gop_ast::ChanDir::Send {
                    Some(format!("cannot receive from send-only channel {desc}"))
                } else {
                    x.mode = Mode::CommaOk;
                    x.ty = *elem;
                    x.val = None;
                    None
                }
            }
            _ => Some(format!("cannot receive from non-channel {desc}")),
        };
        match problem {
            Some(message) => {
                self.error(TypeError::InvalidOperation {
                    message,
                    span: x.span(),
                });
                x.invalidate();
            }
            None => self.env.has_call_or_recv = true,
        }
    }

    /// Check `lhs op rhs`. `e` is the binary expression itself, or `None`
    /// for an assignment `lhs op= rhs`.
    pub(crate) fn binary(
        &mut self,
        e: Option<&'a Expr>,
        lhs: &'a Expr,
        rhs: &'a Expr,
        op: BinaryOp,
    ) -> Flow<Operand<'a>> {
        let mut x = self.expr(lhs)?;
        let mut y = self.expr(rhs)?;
        if x.is_invalid() {
            return Ok(x);
        }
        if y.is_invalid() {
            x.invalidate();
            x.expr = y.expr;
            return Ok(x);
        }
        let op = op.canonical();
        if op.is_shift() {
            self.shift(&mut x, &mut y, e, op)?;
            return Ok(x);
        }
        if op == BinaryOp::Add && self.concatenation(&mut x, &mut y, e)? {
            return Ok(x);
        }

        self.match_types(&mut x, &mut y)?;
        if x.is_invalid() {
            return Ok(x);
        }
        if op.is_comparison() {
            self.comparison(&mut x, &mut y, op, false)?;
            return Ok(x);
        }

        if !identical(&self.types, x.ty, y.ty) {
            if x.ty.is_valid() && y.ty.is_valid() {
                let expr = match e {
                    Some(e) => expr_string(e),
                    None => format!("{} {}= {}", expr_string(lhs), op, expr_string(rhs)),
                };
                self.error(TypeError::MismatchedTypes {
                    expr,
                    left: self.type_string(x.ty),
                    right: self.type_string(y.ty),
                    span: x.span(),
                });
            }
            x.invalidate();
            return Ok(x);
        }

        if !self.binary_op_defined(&x, op) {
            x.invalidate();
            return Ok(x);
        }

        if matches!(op, BinaryOp::Quo | BinaryOp::Rem)
            && (x.mode == Mode::Constant || all_integer(&self.types, x.ty))
            && y.mode == Mode::Constant
            && y.val.as_ref().is_some_and(is_zero)
        {
            self.error(TypeError::DivisionByZero { span: y.span() });
            x.invalidate();
            return Ok(x);
        }

        if x.mode == Mode::Constant && y.mode == Mode::Constant {
            if let (Some(a), Some(b)) = (&x.val, &y.val) {
                let int_div = self.types.is_integer(x.ty);
                let span = e.map_or(x.span(), |e| e.span);
                match constant::binary_op(a, op, b, int_div) {
                    Ok(v) => {
                        x.val = Some(v);
                        x.expr = e.or(x.expr);
                        self.overflow(&mut x);
                    }
                    Err(err) => self.const_error(&mut x, err, span),
                }
            }
            return Ok(x);
        }

        x.mode = Mode::Value;
        x.val = None;
        Ok(x)
    }

    fn binary_op_defined(&mut self, x: &Operand<'a>, op: BinaryOp) -> bool {
        let tt = &self.types;
        let defined = match op {
            BinaryOp::Add => all_numeric_or_string(tt, x.ty),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Quo => all_numeric(tt, x.ty),
            BinaryOp::Rem | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::AndNot => {
                all_integer(tt, x.ty)
            }
            BinaryOp::LAnd | BinaryOp::LOr => all_boolean(tt, x.ty),
            _ => false,
        };
        if !defined {
            self.error(TypeError::InvalidOperation {
                message: format!("operator {op} not defined on {}", self.describe(x)),
                span: x.span(),
            });
        }
        defined
    }

    /// `string + number|bool` and `number|bool + string`. Constant operands
    /// fold to a string constant; otherwise the non-string operand gets a
    /// recorded text conversion. Returns false if the operands do not form
    /// such a concatenation.
    fn concatenation(&mut self, x: &mut Operand<'a>, y: &mut Operand<'a>, e: Option<&'a Expr>) -> Flow<bool> {
        let tt = &self.types;
        let textual = |t: TypeId| tt.is_numeric(t) || tt.is_boolean(t);
        let string_left = if tt.is_string(x.ty) && textual(y.ty) {
            true
        } else if tt.is_string(y.ty) && textual(x.ty) {
            false
        } else {
            return Ok(false);
        };

        if x.mode == Mode::Constant && y.mode == Mode::Constant {
            if let (Some(a), Some(b)) = (&x.val, &y.val) {
                // Untyped rune constants read as the character they spell.
                let piece = |ty: TypeId, v: &Value| match (tt.basic_kind(ty), v.to_char()) {
                    (Some(BasicKind::UntypedRune), Some(c)) => c.to_string(),
                    _ => v.to_text(),
                };
                let text = format!("{}{}", piece(x.ty, a), piece(y.ty, b));
                let ty = if string_left { x.ty } else { y.ty };
                trace!(text = %text, "folded concatenation");
                *x = Operand::constant(ty, Value::String(text), e.or(x.expr));
                return Ok(true);
            }
        }

        let (s, n) = if string_left { (&mut *x, &mut *y) } else { (&mut *y, &mut *x) };
        if self.types.is_untyped(n.ty) {
            let target = self.types.default_type(n.ty);
            self.convert_untyped(n, target)?;
        }
        if self.types.is_untyped(s.ty) {
            self.convert_untyped(s, TypeId::STRING)?;
        }
        if n.is_invalid() || s.is_invalid() {
            x.invalidate();
            return Ok(true);
        }
        if let Some(ne) = n.expr {
            self.record_conversion(ne.id, ImplicitConversion::ToText { from: n.ty });
        }
        let ty = s.ty;
        *x = Operand::new(Mode::Value, ty, e.or(x.expr));
        Ok(true)
    }

    fn shift(&mut self, x: &mut Operand<'a>, y: &mut Operand<'a>, e: Option<&'a Expr>, op: BinaryOp) -> Flow<()> {
        let xval = match x.mode {
            Mode::Constant => x.val.as_ref().and_then(Value::to_int),
            _ => None,
        };
        if !(all_integer(&self.types, x.ty) || self.types.is_untyped(x.ty) && xval.is_some()) {
            self.shift_error(x, format!("shifted operand {} must be integer", self.describe(x)), x.span());
            return Ok(());
        }

        let mut yval = None;
        if y.mode == Mode::Constant {
            yval = y.val.as_ref().and_then(Value::to_int);
            if yval.is_some_and(|v| v < 0) {
                self.shift_error(x, format!("negative shift count {}", self.describe(y)), y.span());
                return Ok(());
            }
            if self.types.is_untyped(y.ty) {
                self.representable(y, TypeId::basic(BasicKind::Uint));
                if y.is_invalid() {
                    x.invalidate();
                    return Ok(());
                }
            }
        } else if all_integer(&self.types, y.ty) {
            // ok
        } else if self.types.is_untyped(y.ty) {
            self.convert_untyped(y, TypeId::basic(BasicKind::Uint))?;
            if y.is_invalid() {
                x.invalidate();
                return Ok(());
            }
        } else {
            self.shift_error(x, format!("shift count {} must be integer", self.describe(y)), y.span());
            return Ok(());
        }

        if x.mode == Mode::Constant {
            if y.mode == Mode::Constant {
                let count = yval
                    .and_then(|v| u64::try_from(v).ok())
                    .filter(|s| *s <= SHIFT_BOUND);
                let (Some(xv), Some(s)) = (xval, count) else {
                    self.shift_error(x, format!("invalid shift count {}", self.describe(y)), y.span());
                    return Ok(());
                };
                if !self.types.is_integer(x.ty) {
                    x.ty = TypeId::UNTYPED_INT;
                }
                let span = e.map_or(x.span(), |e| e.span);
                match constant::shift(&Value::Int(xv), op, s) {
                    Ok(v) => {
                        x.val = Some(v);
                        x.expr = e.or(x.expr);
                        self.overflow(x);
                    }
                    Err(err) => self.const_error(x, err, span),
                }
                return Ok(());
            }
            if self.types.is_untyped(x.ty) {
                // The type of the shifted constant is decided by its context.
                if let Some(entry) = x.expr.and_then(|lhs| self.untyped.get_mut(&lhs.id)) {
                    entry.is_lhs = true;
                }
                x.mode = Mode::Value;
                x.val = None;
                return Ok(());
            }
        }

        if !all_integer(&self.types, x.ty) {
            self.shift_error(x, format!("shifted operand {} must be integer", self.describe(x)), x.span());
            return Ok(());
        }
        x.mode = Mode::Value;
        x.val = None;
        Ok(())
    }

    fn shift_error(&mut self, x: &mut Operand<'a>, message: String, span: Span) {
        self.error(TypeError::InvalidOperation { message, span });
        x.invalidate();
    }

    /// Check `x op y` for a comparison operator. In a switch the operands
    /// are a case value and the tag, and errors name the case.
    pub(crate) fn comparison(
        &mut self,
        x: &mut Operand<'a>,
        y: &mut Operand<'a>,
        op: BinaryOp,
        switch_case: bool,
    ) -> Flow<()> {
        if !x.ty.is_valid() || !y.ty.is_valid() {
            x.invalidate();
            return Ok(());
        }
        let op = if switch_case { BinaryOp::Eql } else { op.canonical() };

        if let Some((blame_y, cause)) = self.comparison_problem(x, y, op)? {
            let cause = if !cause.is_empty() {
                cause
            } else if self.types.is_type_param(x.ty) || self.types.is_type_param(y.ty) {
                let t = if self.types.is_type_param(x.ty) { x.ty } else { y.ty };
                format!("type parameter {} is not comparable with {op}", self.type_string(t))
            } else {
                let t = if blame_y { y.ty } else { x.ty };
                format!("operator {op} not defined on {}", self.kind_string(t))
            };
            if switch_case {
                self.error(TypeError::InvalidUse {
                    message: format!("invalid case {} in switch on {} ({cause})", x.text(), y.text()),
                    span: x.span(),
                });
            } else {
                let span = if blame_y { y.span() } else { x.span() };
                self.error(TypeError::InvalidOperation {
                    message: format!("{} {op} {} ({cause})", x.text(), y.text()),
                    span,
                });
            }
            x.invalidate();
            return Ok(());
        }

        match (&x.mode, &y.mode, &x.val, &y.val) {
            (Mode::Constant, Mode::Constant, Some(a), Some(b)) => {
                x.val = constant::compare(a, op, b).map(Value::Bool);
                if x.val.is_none() {
                    x.mode = Mode::Value;
                }
            }
            _ => {
                x.mode = Mode::Value;
                x.val = None;
                let (xt, yt) = (self.types.default_type(x.ty), self.types.default_type(y.ty));
                if let Some(e) = x.expr {
                    self.update_expr_type(e, xt, true)?;
                }
                if let Some(e) = y.expr {
                    self.update_expr_type(e, yt, true)?;
                }
            }
        }
        x.ty = TypeId::UNTYPED_BOOL;
        Ok(())
    }

    /// The operand to blame (`true` for `y`) and a cause, if the comparison
    /// is not allowed.
    fn comparison_problem(
        &mut self,
        x: &Operand<'a>,
        y: &Operand<'a>,
        op: BinaryOp,
    ) -> Flow<Option<(bool, String)>> {
        let ok = self.assignable_to(x, y.ty)?.is_ok() || self.assignable_to(y, x.ty)?.is_ok();
        if !ok {
            let cause = format!(
                "mismatched types {} and {}",
                self.type_string(x.ty),
                self.type_string(y.ty)
            );
            return Ok(Some((true, cause)));
        }
        let tt = &self.types;
        let problem = match op {
            BinaryOp::Eql | BinaryOp::Neq => {
                if x.is_nil() || y.is_nil() {
                    let t = if x.is_nil() { y.ty } else { x.ty };
                    (!has_nil(tt, t)).then(|| (true, String::new()))
                } else if !comparable(tt, x.ty, true) {
                    Some((false, self.incomparable_cause(x.ty)))
                } else if !comparable(tt, y.ty, true) {
                    Some((true, self.incomparable_cause(y.ty)))
                } else {
                    None
                }
            }
            _ => {
                if !all_ordered(tt, x.ty) {
                    Some((false, String::new()))
                } else if !all_ordered(tt, y.ty) {
                    Some((true, String::new()))
                } else {
                    None
                }
            }
        };
        Ok(problem)
    }

    fn incomparable_cause(&self, t: TypeId) -> String {
        let tt = &self.types;
        match tt.get(tt.underlying(t)) {
            Type::Slice(_) | Type::Signature(_) | Type::Map { .. } => {
                format!("{} can only be compared to nil", self.kind_string(t))
            }
            Type::Struct(fields) => fields
                .iter()
                .find(|f| !comparable(tt, f.ty, true))
                .map(|f| format!("struct containing {} cannot be compared", self.type_string(f.ty)))
                .unwrap_or_default(),
            Type::Array { .. } => format!("{} cannot be compared", self.type_string(t)),
            _ => String::new(),
        }
    }

    /// `slice`, `map`, `func`, ... for operator error messages.
    pub(crate) fn kind_string(&self, t: TypeId) -> String {
        let kind = match self.types.get(self.types.underlying(t)) {
            Type::Array { .. } => "array",
            Type::Slice(_) => "slice",
            Type::Struct(_) => "struct",
            Type::Pointer(_) => "pointer",
            Type::Signature(_) => "func",
            Type::Interface(_) => "interface",
            Type::Map { .. } => "map",
            Type::Chan { .. } => "chan",
            Type::TypeParam(_) => return format!("type parameter {}", self.type_string(t)),
            _ => return self.type_string(t),
        };
        kind.to_string()
    }
}

fn is_zero(v: &Value) -> bool {
    v.to_complex() == Some((0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_divisors_of_every_kind() {
        assert!(is_zero(&Value::Int(0)));
        assert!(is_zero(&Value::Float(0.0)));
        assert!(is_zero(&Value::Complex(0.0, 0.0)));
        assert!(!is_zero(&Value::Complex(0.0, 1.0)));
        assert!(!is_zero(&Value::String(String::new())));
    }
}
