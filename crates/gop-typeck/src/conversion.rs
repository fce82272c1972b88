//! Explicit conversions `T(x)` and type assertions `x.(T)`.

use gop_ast::printer::expr_string;
use gop_ast::Expr;
use tracing::trace;

use crate::checker::Checker;
use crate::constant::{self, Value};
use crate::error::{ConversionFailure, Flow, TypeError};
use crate::operand::{Mode, Operand};
use crate::predicates::{identical, type_set};
use crate::types::{BasicKind, Type, TypeId};

impl<'a> Checker<'a> {
    // ── Conversions ─────────────────────────────────────────────────────

    /// Convert `x` to `t`, leaving `x` invalid after reporting an error.
    pub(crate) fn conversion(&mut self, x: &mut Operand<'a>, t: TypeId) -> Flow<()> {
        let const_arg = x.mode == Mode::Constant;
        let mut cause = String::new();
        let ok = if const_arg && self.types.is_const_type(t) {
            match self.const_convertible(x, t) {
                Some(val) => {
                    x.val = Some(val);
                    true
                }
                None if self.types.is_integer(x.ty) && self.types.is_integer(t) => {
                    self.error(TypeError::InvalidConversion {
                        operand: format!("constant {}", x.val.as_ref().map(Value::to_string).unwrap_or_default()),
                        target: self.type_string(t),
                        failure: ConversionFailure::Overflows,
                        cause: String::new(),
                        span: x.span(),
                    });
                    x.invalidate();
                    return Ok(());
                }
                None => false,
            }
        } else if const_arg && self.types.is_type_param(t) {
            let ok = match type_set(&self.types, t).terms {
                None => {
                    cause = format!("{} does not contain specific types", self.type_string(t));
                    false
                }
                Some(terms) => terms.iter().all(|term| {
                    let u = self.types.underlying(term.ty);
                    if self.types.is_string(x.ty) && self.is_bytes_or_runes(u) {
                        return true;
                    }
                    if self.const_convertible(x, u).is_some() {
                        return true;
                    }
                    cause = if self.types.is_integer(x.ty) && self.types.is_integer(u) {
                        format!(
                            "constant {} overflows {} (in {})",
                            x.val.as_ref().map(Value::to_string).unwrap_or_default(),
                            self.type_string(u),
                            self.type_string(t)
                        )
                    } else {
                        format!(
                            "cannot convert {} to type {} (in {})",
                            self.describe(x),
                            self.type_string(u),
                            self.type_string(t)
                        )
                    };
                    false
                }),
            };
            x.mode = Mode::Value;
            ok
        } else {
            match self.convertible_to(x, t)? {
                Ok(()) => {
                    x.mode = Mode::Value;
                    true
                }
                Err(why) => {
                    cause = why;
                    false
                }
            }
        };

        if !ok {
            self.error(TypeError::InvalidConversion {
                operand: self.describe(x),
                target: self.type_string(t),
                failure: ConversionFailure::Cannot,
                cause,
                span: x.span(),
            });
            x.invalidate();
            return Ok(());
        }

        // The conversion gives an untyped argument its final type.
        if self.types.is_untyped(x.ty) {
            let final_ty = if x.ty == TypeId::UNTYPED_NIL {
                x.ty
            } else if (self.types.is_interface(t) && !self.types.is_type_param(t))
                || (const_arg && !self.types.is_const_type(t))
            {
                self.types.default_type(x.ty)
            } else if x.mode == Mode::Constant && self.types.is_integer(x.ty) && self.all_string(t) {
                x.ty
            } else {
                t
            };
            if let Some(e) = x.expr {
                self.update_expr_type(e, final_ty, true)?;
            }
        }
        trace!(target = %self.type_string(t), "conversion");
        x.ty = t;
        Ok(())
    }

    /// The value of constant `x` converted to the constant type `t`.
    fn const_convertible(&self, x: &Operand<'a>, t: TypeId) -> Option<Value> {
        let val = x.val.as_ref()?;
        let kind = self.types.basic_kind(self.types.underlying(t))?;
        if let Ok(v) = constant::representable(val, kind) {
            return Some(v);
        }
        if self.types.is_integer(x.ty) && kind.is_string() {
            let c = val
                .to_int()
                .and_then(|i| u32::try_from(i).ok())
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            return Some(Value::String(c.to_string()));
        }
        None
    }

    /// Whether a non-constant `x` converts to `t`, or why not.
    pub(crate) fn convertible_to(&mut self, x: &Operand<'a>, t: TypeId) -> Flow<Result<(), String>> {
        if self.assignable_to(x, t)?.is_ok() {
            return Ok(Ok(()));
        }
        let v = self.types.unalias(x.ty);
        let t = self.types.unalias(t);
        let vu = self.types.underlying(v);
        let tu = self.types.underlying(t);
        let v_param = self.types.is_type_param(v);
        let t_param = self.types.is_type_param(t);

        if identical(&self.types, vu, tu) && !v_param && !t_param {
            return Ok(Ok(()));
        }
        if let (Type::Pointer(vb), Type::Pointer(tb)) = (self.types.get(v), self.types.get(t)) {
            let (vb, tb) = (*vb, *tb);
            if identical(&self.types, self.types.underlying(vb), self.types.underlying(tb))
                && !self.types.is_type_param(vb)
                && !self.types.is_type_param(tb)
            {
                return Ok(Ok(()));
            }
        }
        let int_or_float = |k: BasicKind| k.is_integer() || k.is_float();
        if let (Some(vk), Some(tk)) = (self.types.basic_kind(vu), self.types.basic_kind(tu)) {
            if (int_or_float(vk) && int_or_float(tk)) || (vk.is_complex() && tk.is_complex()) {
                return Ok(Ok(()));
            }
        }
        if (self.types.is_integer(vu) || self.is_bytes_or_runes(vu)) && self.types.is_string(tu) {
            return Ok(Ok(()));
        }
        if self.types.is_string(vu) && self.is_bytes_or_runes(tu) {
            return Ok(Ok(()));
        }
        // Slice to array or pointer to array with identical elements.
        if let Type::Slice(se) = self.types.get(vu) {
            let se = *se;
            let array_elem = match self.types.get(tu) {
                Type::Array { elem, .. } => Some(*elem),
                Type::Pointer(p) => match self.types.get(self.types.underlying(*p)) {
                    Type::Array { elem, .. } => Some(*elem),
                    _ => None,
                },
                _ => None,
            };
            if array_elem.is_some_and(|ae| identical(&self.types, se, ae)) {
                return Ok(Ok(()));
            }
        }
        if !v_param && !t_param {
            return Ok(Err(String::new()));
        }

        let v_terms = if v_param { type_set(&self.types, v).terms } else { None };
        let t_terms = if t_param { type_set(&self.types, t).terms } else { None };
        if (v_param && v_terms.is_none()) || (t_param && t_terms.is_none()) {
            return Ok(Err(String::new()));
        }
        let vs: Vec<TypeId> = match &v_terms {
            Some(terms) => terms.iter().map(|term| term.ty).collect(),
            None => vec![v],
        };
        let ts: Vec<TypeId> = match &t_terms {
            Some(terms) => terms.iter().map(|term| term.ty).collect(),
            None => vec![t],
        };
        let mut probe = x.clone();
        for vt in &vs {
            probe.ty = *vt;
            for tt in &ts {
                if let Err(inner) = self.convertible_to(&probe, *tt)? {
                    let mut msg = match (v_param, t_param) {
                        (true, true) => format!(
                            "cannot convert {} (in {}) to type {} (in {})",
                            self.type_string(*vt),
                            self.type_string(v),
                            self.type_string(*tt),
                            self.type_string(t)
                        ),
                        (true, false) => format!(
                            "cannot convert {} (in {}) to type {}",
                            self.type_string(*vt),
                            self.type_string(v),
                            self.type_string(t)
                        ),
                        _ => format!(
                            "cannot convert {} to type {} (in {})",
                            self.type_string(x.ty),
                            self.type_string(*tt),
                            self.type_string(t)
                        ),
                    };
                    if !inner.is_empty() {
                        msg.push_str("\n\t");
                        msg.push_str(&inner);
                    }
                    return Ok(Err(msg));
                }
            }
        }
        Ok(Ok(()))
    }

    fn is_bytes_or_runes(&self, t: TypeId) -> bool {
        let Type::Slice(elem) = self.types.get(self.types.underlying(t)) else {
            return false;
        };
        matches!(
            self.types.basic_kind(self.types.underlying(*elem)),
            Some(BasicKind::Uint8 | BasicKind::Int32)
        )
    }

    fn all_string(&self, t: TypeId) -> bool {
        crate::predicates::all_string(&self.types, t)
    }

    // ── Type assertions ─────────────────────────────────────────────────

    /// `x.(T)`; `x.(type)` is only valid as a type switch guard.
    pub(crate) fn type_assert_expr(
        &mut self,
        x: &mut Operand<'a>,
        e: &'a Expr,
        base: &'a Expr,
        target: Option<&'a Expr>,
    ) -> Flow<()> {
        *x = self.expr(base)?;
        if x.is_invalid() {
            return Ok(());
        }
        let Some(target) = target else {
            self.error(TypeError::InvalidUse {
                message: "use of .(type) outside type switch".to_string(),
                span: e.span,
            });
            x.invalidate();
            return Ok(());
        };
        if self.types.is_type_param(x.ty) {
            self.error(TypeError::InvalidOperation {
                message: format!("cannot use type assertion on type parameter value {}", self.describe(x)),
                span: x.span(),
            });
            x.invalidate();
            return Ok(());
        }
        if !self.types.is_interface(x.ty) {
            self.error(TypeError::InvalidOperation {
                message: format!("{} is not an interface", self.describe(x)),
                span: x.span(),
            });
            x.invalidate();
            return Ok(());
        }
        let t = self.var_type(target)?;
        if !t.is_valid() {
            x.invalidate();
            return Ok(());
        }
        self.type_assertion(e, x, t, false)?;
        x.mode = Mode::CommaOk;
        x.ty = t;
        Ok(())
    }

    /// Report an assertion of interface operand `x` to `t` that can never
    /// succeed. `type_switch` selects the wording for a type switch case.
    pub(crate) fn type_assertion(&mut self, e: &'a Expr, x: &Operand<'a>, t: TypeId, type_switch: bool) -> Flow<()> {
        if self.types.is_interface(t) {
            return Ok(());
        }
        let Some((_, cause)) = self.missing_method(t, x.ty, false)? else {
            return Ok(());
        };
        if type_switch {
            self.error(TypeError::InvalidUse {
                message: format!(
                    "impossible type switch case: {}\n\t{} cannot have dynamic type {} ({cause})",
                    expr_string(e),
                    self.describe(x),
                    self.type_string(t)
                ),
                span: e.span,
            });
            return Ok(());
        }
        self.error(TypeError::ImpossibleAssertion {
            expr: expr_string(e),
            reason: format!(
                "{} does not implement {} ({cause})",
                self.type_string(t),
                self.type_string(x.ty)
            ),
            span: e.span,
        });
        Ok(())
    }
}
