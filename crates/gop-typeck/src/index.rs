//! Index and slice expressions, including the one-based `v#i`.

use gop_ast::{Expr, SliceExpr};
use tracing::trace;

use crate::checker::Checker;
use crate::constant::{self, Value};
use crate::error::{Flow, TypeError};
use crate::operand::{Mode, Operand};
use crate::predicates::{all_integer, core_type, identical, type_set};
use crate::types::{BasicKind, Type, TypeId};

/// What indexing an operand produces.
enum Indexed {
    /// String, array, pointer to array or slice. `len` is known for
    /// arrays and constant strings.
    Seq { elem: TypeId, mode: Mode, len: Option<i128> },
    Map { key: TypeId, elem: TypeId },
}

impl<'a> Checker<'a> {
    /// `x[i]`, or an instantiation `f[T]` / `G[T]`.
    pub(crate) fn index_expr(
        &mut self,
        x: &mut Operand<'a>,
        e: &'a Expr,
        base: &'a Expr,
        indices: &'a [Expr],
    ) -> Flow<()> {
        if self.index_or_generic(x, e, base, indices)? {
            self.func_inst(x, e, indices, true)?;
        }
        Ok(())
    }

    /// Evaluate `base[indices]`. Returns true, leaving `x` as the generic
    /// function, when the expression instantiates a function; callers decide
    /// whether the type arguments are combined with call arguments.
    pub(crate) fn index_or_generic(
        &mut self,
        x: &mut Operand<'a>,
        e: &'a Expr,
        base: &'a Expr,
        indices: &'a [Expr],
    ) -> Flow<bool> {
        *x = self.expr_or_type(base, true)?;
        match x.mode {
            Mode::Invalid => {
                self.use_exprs(indices)?;
                return Ok(false);
            }
            Mode::TypeExpr => {
                let t = self.var_type(e)?;
                *x = if t.is_valid() {
                    Operand::new(Mode::TypeExpr, t, Some(e))
                } else {
                    Operand::invalid(Some(e))
                };
                return Ok(false);
            }
            Mode::Value if self.is_generic_func(x.ty) => return Ok(true),
            _ => {}
        }
        self.non_generic(x);
        if x.is_invalid() {
            return Ok(false);
        }
        let Some(index) = self.single_index(indices) else {
            x.invalidate();
            return Ok(false);
        };
        self.index_into(x, e, index, false)?;
        Ok(false)
    }

    /// `v#i`: the element at one-based position `i`, that is `v[i-1]`.
    pub(crate) fn one_based_index(
        &mut self,
        x: &mut Operand<'a>,
        e: &'a Expr,
        base: &'a Expr,
        index: &'a Expr,
    ) -> Flow<()> {
        *x = self.expr(base)?;
        if x.is_invalid() {
            self.use_exprs(std::slice::from_ref(index))?;
            return Ok(());
        }
        self.index_into(x, e, index, true)
    }

    fn single_index(&mut self, indices: &'a [Expr]) -> Option<&'a Expr> {
        if let Some(extra) = indices.get(1) {
            self.error(TypeError::InvalidOperation {
                message: "more than one index".to_string(),
                span: extra.span,
            });
        }
        indices.first()
    }

    fn index_into(&mut self, x: &mut Operand<'a>, e: &'a Expr, index: &'a Expr, one_based: bool) -> Flow<()> {
        match self.indexed(x) {
            None => {
                self.error(TypeError::InvalidOperation {
                    message: format!("cannot index {}", self.describe(x)),
                    span: e.span,
                });
                self.use_exprs(std::slice::from_ref(index))?;
                x.invalidate();
            }
            Some(Indexed::Map { key, elem }) => {
                if one_based {
                    self.error(TypeError::InvalidOperation {
                        message: format!("cannot use one-based index on map {}", self.describe(x)),
                        span: e.span,
                    });
                    self.use_exprs(std::slice::from_ref(index))?;
                    x.invalidate();
                    return Ok(());
                }
                let mut k = self.expr_with_hint(index, Some(key))?;
                self.assignment(&mut k, Some(key), "map index")?;
                *x = Operand::new(Mode::MapIndex, elem, Some(e));
            }
            Some(Indexed::Seq { elem, mode, len }) => {
                *x = Operand::new(mode, elem, Some(e));
                self.index_value(index, len, one_based)?;
                trace!(one_based, elem = %self.type_string(elem), "index");
            }
        }
        Ok(())
    }

    /// Element type and mode of `x[i]`. For a type parameter every type in
    /// its type set must agree.
    fn indexed(&self, x: &Operand<'a>) -> Option<Indexed> {
        if self.types.is_type_param(x.ty) {
            let terms = type_set(&self.types, x.ty).terms?;
            let mut result: Option<Indexed> = None;
            for term in &terms {
                let one = self.indexed_under(x, self.types.underlying(term.ty))?;
                result = Some(match (result, one) {
                    (None, one) => one,
                    (
                        Some(Indexed::Seq { elem, mode, len }),
                        Indexed::Seq {
                            elem: e2,
                            mode: m2,
                            len: l2,
                        },
                    ) => {
                        if !identical(&self.types, elem, e2) {
                            return None;
                        }
                        let mode = if mode == Mode::Value || m2 == Mode::Value {
                            Mode::Value
                        } else {
                            Mode::Variable
                        };
                        let len = match (len, l2) {
                            (Some(a), Some(b)) => Some(a.min(b)),
                            (a, b) => a.or(b),
                        };
                        Indexed::Seq { elem, mode, len }
                    }
                    (Some(Indexed::Map { key, elem }), Indexed::Map { key: k2, elem: e2 }) => {
                        if !identical(&self.types, key, k2) || !identical(&self.types, elem, e2) {
                            return None;
                        }
                        Indexed::Map { key, elem }
                    }
                    _ => return None,
                });
            }
            return result;
        }
        self.indexed_under(x, self.types.underlying(x.ty))
    }

    fn indexed_under(&self, x: &Operand<'a>, u: TypeId) -> Option<Indexed> {
        match self.types.get(u) {
            Type::Basic(kind) if kind.is_string() => {
                let len = match (&x.mode, &x.val) {
                    (Mode::Constant, Some(Value::String(s))) => Some(s.len() as i128),
                    _ => None,
                };
                Some(Indexed::Seq {
                    elem: TypeId::UINT8,
                    mode: Mode::Value,
                    len,
                })
            }
            Type::Array { elem, len } => Some(Indexed::Seq {
                elem: *elem,
                mode: if x.mode == Mode::Variable {
                    Mode::Variable
                } else {
                    Mode::Value
                },
                len: Some(*len as i128),
            }),
            Type::Pointer(base) => match self.types.get(self.types.underlying(*base)) {
                Type::Array { elem, len } => Some(Indexed::Seq {
                    elem: *elem,
                    mode: Mode::Variable,
                    len: Some(*len as i128),
                }),
                _ => None,
            },
            Type::Slice(elem) => Some(Indexed::Seq {
                elem: *elem,
                mode: Mode::Variable,
                len: None,
            }),
            Type::Map { key, value } => Some(Indexed::Map {
                key: *key,
                elem: *value,
            }),
            _ => None,
        }
    }

    /// Check an index (or size) expression. Returns its type, `INVALID` on
    /// error, and its zero-based value if constant. `max` is the exclusive
    /// upper bound when known.
    pub(crate) fn index_value(&mut self, e: &'a Expr, max: Option<i128>, one_based: bool) -> Flow<(TypeId, Option<i128>)> {
        let mut x = self.expr(e)?;
        if !self.valid_index(&mut x, "index", false)? {
            return Ok((TypeId::INVALID, None));
        }
        if x.mode != Mode::Constant {
            return Ok((x.ty, None));
        }
        let Some(mut v) = x.val.as_ref().and_then(Value::to_int) else {
            return Ok((TypeId::INVALID, None));
        };
        let shown = x.val.as_ref().map(Value::to_string).unwrap_or_default();
        if one_based {
            if v < 1 {
                self.error(TypeError::InvalidArgument {
                    message: format!("index {shown} must be at least 1 in one-based index"),
                    span: e.span,
                });
                return Ok((TypeId::INVALID, None));
            }
            v -= 1;
        }
        if let Some(max) = max {
            if v >= max {
                let bounds = if one_based {
                    format!("[1:{max}]")
                } else {
                    format!("[0:{max}]")
                };
                self.error(TypeError::InvalidArgument {
                    message: format!("index {shown} out of bounds {bounds}"),
                    span: e.span,
                });
                return Ok((TypeId::INVALID, None));
            }
        }
        Ok((x.ty, Some(v)))
    }

    /// An index must be an integer; a constant one must also be
    /// non-negative (unless `allow_negative`) and fit in `int`.
    pub(crate) fn valid_index(&mut self, x: &mut Operand<'a>, what: &str, allow_negative: bool) -> Flow<bool> {
        if x.is_invalid() {
            return Ok(false);
        }
        self.convert_untyped(x, TypeId::INT)?;
        if x.is_invalid() {
            return Ok(false);
        }
        if !all_integer(&self.types, x.ty) {
            self.error(TypeError::InvalidArgument {
                message: format!("{what} {} must be integer", self.describe(x)),
                span: x.span(),
            });
            return Ok(false);
        }
        if x.mode == Mode::Constant {
            if let Some(val) = &x.val {
                if !allow_negative && val.is_negative() {
                    self.error(TypeError::InvalidArgument {
                        message: format!("{what} {} must not be negative", self.describe(x)),
                        span: x.span(),
                    });
                    return Ok(false);
                }
                if constant::representable(val, BasicKind::Int).is_err() {
                    self.error(TypeError::InvalidArgument {
                        message: format!("{what} {} overflows int", self.describe(x)),
                        span: x.span(),
                    });
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// `x[lo:hi]` and `x[lo:hi:max]`.
    pub(crate) fn slice_expr(&mut self, x: &mut Operand<'a>, e: &'a Expr, s: &'a SliceExpr) -> Flow<()> {
        let indices = [s.low.as_deref(), s.high.as_deref(), s.max.as_deref()];
        *x = self.expr(&s.x)?;
        if x.is_invalid() {
            for index in indices.into_iter().flatten() {
                self.use_exprs(std::slice::from_ref(index))?;
            }
            return Ok(());
        }
        let full = s.max.is_some();

        let Some(core) = core_type(&self.types, x.ty) else {
            self.error(TypeError::InvalidOperation {
                message: format!(
                    "cannot slice {}: {} has no core type",
                    self.describe(x),
                    self.type_string(x.ty)
                ),
                span: x.span(),
            });
            x.invalidate();
            return Ok(());
        };

        let mut length: Option<i128> = None;
        let mut valid = false;
        match self.types.get(core).clone() {
            Type::Basic(kind) if kind.is_string() => {
                if full {
                    let at = s.max.as_deref().map(|m| m.span).unwrap_or(e.span);
                    self.error(TypeError::InvalidOperation {
                        message: "3-index slice of string".to_string(),
                        span: at,
                    });
                    x.invalidate();
                    return Ok(());
                }
                valid = true;
                if let (Mode::Constant, Some(Value::String(text))) = (x.mode, &x.val) {
                    length = Some(text.len() as i128);
                }
                if self.types.is_untyped(x.ty) {
                    x.ty = TypeId::STRING;
                }
            }
            Type::Array { elem, len } => {
                if x.mode != Mode::Variable {
                    self.error(TypeError::InvalidOperation {
                        message: format!("cannot slice unaddressable value {}", self.describe(x)),
                        span: x.span(),
                    });
                    x.invalidate();
                    return Ok(());
                }
                valid = true;
                length = Some(len as i128);
                x.ty = self.types.slice(elem);
            }
            Type::Pointer(base) => {
                if let Type::Array { elem, len } = self.types.get(self.types.underlying(base)).clone() {
                    valid = true;
                    length = Some(len as i128);
                    x.ty = self.types.slice(elem);
                }
            }
            Type::Slice(_) => valid = true,
            _ => {}
        }
        if !valid {
            self.error(TypeError::InvalidOperation {
                message: format!("cannot slice {}", self.describe(x)),
                span: x.span(),
            });
            x.invalidate();
            return Ok(());
        }
        x.mode = Mode::Value;
        x.val = None;
        x.expr = Some(e);

        if full && s.high.is_none() {
            self.error(TypeError::InvalidOperation {
                message: "2nd and 3rd index required in 3-index slice".to_string(),
                span: e.span,
            });
            x.invalidate();
            return Ok(());
        }

        let mut values: [Option<i128>; 3] = [None; 3];
        for (i, index) in indices.iter().enumerate() {
            values[i] = match index {
                Some(index) => {
                    let max = length.map(|n| n + 1);
                    self.index_value(index, max, false)?.1
                }
                None if i == 0 => Some(0),
                None => length,
            };
        }
        // Constant indices must be in ascending order.
        'outer: for i in 0..values.len() - 1 {
            let Some(lo) = values[i].filter(|v| *v > 0) else {
                continue;
            };
            for j in i + 1..values.len() {
                if let Some(hi) = values[j].filter(|v| *v < lo) {
                    let span = indices[j].map(|ix| ix.span).unwrap_or(e.span);
                    self.error(TypeError::InvalidUse {
                        message: format!("invalid slice indices: {hi} < {lo}"),
                        span,
                    });
                    break 'outer;
                }
            }
        }
        Ok(())
    }
}
