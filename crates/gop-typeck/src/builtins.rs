//! Predeclared functions.

use gop_ast::{BinaryOp, CallExpr, ChanDir, Expr, ExprKind};
use serde::Serialize;

use crate::checker::Checker;
use crate::config::Feature;
use crate::constant::{self, Value};
use crate::error::{Flow, TypeError};
use crate::operand::{Mode, Operand};
use crate::predicates::{self, core_type, under_is};
use crate::types::{Type, TypeId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Builtin {
    Append,
    Cap,
    Clear,
    Close,
    Copy,
    Delete,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Recover,
}

impl Builtin {
    pub const ALL: [Builtin; 15] = [
        Builtin::Append,
        Builtin::Cap,
        Builtin::Clear,
        Builtin::Close,
        Builtin::Copy,
        Builtin::Delete,
        Builtin::Len,
        Builtin::Make,
        Builtin::Max,
        Builtin::Min,
        Builtin::New,
        Builtin::Panic,
        Builtin::Print,
        Builtin::Println,
        Builtin::Recover,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Append => "append",
            Builtin::Cap => "cap",
            Builtin::Clear => "clear",
            Builtin::Close => "close",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Len => "len",
            Builtin::Make => "make",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::New => "new",
            Builtin::Panic => "panic",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Recover => "recover",
        }
    }

    /// Minimum argument count and whether more are accepted.
    fn arity(self) -> (usize, bool) {
        match self {
            Builtin::Append | Builtin::Make | Builtin::Max | Builtin::Min => (1, true),
            Builtin::Print | Builtin::Println => (0, true),
            Builtin::Recover => (0, false),
            Builtin::Copy | Builtin::Delete => (2, false),
            Builtin::Cap
            | Builtin::Clear
            | Builtin::Close
            | Builtin::Len
            | Builtin::New
            | Builtin::Panic => (1, false),
        }
    }

    /// Calls that may appear as expression statements.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Builtin::Clear
                | Builtin::Close
                | Builtin::Copy
                | Builtin::Delete
                | Builtin::Panic
                | Builtin::Print
                | Builtin::Println
                | Builtin::Recover
        )
    }

    pub fn feature(self) -> Option<Feature> {
        match self {
            Builtin::Clear => Some(Feature::Clear),
            Builtin::Max => Some(Feature::Max),
            Builtin::Min => Some(Feature::Min),
            _ => None,
        }
    }

    /// Arguments are types rather than values.
    fn takes_type(self) -> bool {
        matches!(self, Builtin::Make | Builtin::New)
    }
}

impl<'a> Checker<'a> {
    fn record_builtin_type(&mut self, fun: &'a Expr, id: Builtin, sig: TypeId) {
        let mut e = fun;
        loop {
            self.record_type_and_value(e, Mode::Builtin(id), sig, None);
            match &e.kind {
                ExprKind::Paren(inner) => e = inner,
                _ => break,
            }
        }
    }

    fn builtin_arg_error(&mut self, x: &Operand<'a>, message: String) {
        self.error(TypeError::InvalidArgument {
            message,
            span: x.expr.map(|e| e.span).unwrap_or_default(),
        });
    }

    /// Check a call of a predeclared function. On success `x` holds the
    /// result; on failure it is invalid and the error has been reported.
    pub(crate) fn builtin(
        &mut self,
        x: &mut Operand<'a>,
        call: &'a Expr,
        c: &'a CallExpr,
        id: Builtin,
    ) -> Flow<()> {
        let name = id.name();
        x.expr = Some(call);
        x.mode = Mode::Invalid;
        if let Some(dots) = c.ellipsis {
            if id != Builtin::Append {
                self.error(TypeError::InvalidOperation {
                    message: format!("invalid use of ... with built-in {name}"),
                    span: dots,
                });
                self.use_exprs(&c.args)?;
                return Ok(());
            }
        }

        let saved_call = self.env.has_call_or_recv;
        if matches!(id, Builtin::Len | Builtin::Cap) {
            self.env.has_call_or_recv = false;
        }
        let mut args: Vec<Operand<'a>> = Vec::new();
        let nargs = if id.takes_type() {
            c.args.len()
        } else {
            args = self.expr_list(&c.args)?;
            if args.iter().any(Operand::is_invalid) {
                self.env.has_call_or_recv |= saved_call;
                return Ok(());
            }
            if let Some(first) = args.first() {
                *x = first.clone();
            }
            args.len()
        };
        let arg_has_call = self.env.has_call_or_recv;
        self.env.has_call_or_recv |= saved_call;

        let (want, variadic) = id.arity();
        let which = if nargs < want {
            Some("not enough")
        } else if !variadic && nargs > want {
            Some("too many")
        } else {
            None
        };
        if let Some(which) = which {
            self.error(TypeError::InvalidOperation {
                message: format!(
                    "{which} arguments for {} (expected {want}, found {nargs})",
                    gop_ast::printer::expr_string(call)
                ),
                span: call.span,
            });
            x.invalidate();
            return Ok(());
        }
        if let Some(feature) = id.feature() {
            if !self.version_ok(feature, c.fun.span) {
                x.invalidate();
                return Ok(());
            }
        }

        match id {
            Builtin::Append => {
                let s = x.ty;
                let elem = match core_type(&self.types, s).map(|u| self.types.get(u).clone()) {
                    Some(Type::Slice(elem)) => elem,
                    _ => {
                        let cause = if x.is_nil() {
                            "have untyped nil".to_string()
                        } else if self.types.is_type_param(s) {
                            match core_type(&self.types, s) {
                                Some(u) => format!(
                                    "{} has core type {}",
                                    self.describe(x),
                                    self.type_string(u)
                                ),
                                None => format!("{} has no core type", self.describe(x)),
                            }
                        } else {
                            format!("have {}", self.describe(x))
                        };
                        self.error(TypeError::InvalidArgument {
                            message: format!("first argument to append must be a slice; {cause}"),
                            span: x.expr.map(|e| e.span).unwrap_or(call.span),
                        });
                        x.invalidate();
                        return Ok(());
                    }
                };
                let elems = self.types.slice(elem);
                if c.ellipsis.is_some() {
                    let mut y = args.get(1).cloned().unwrap_or_else(|| Operand::invalid(None));
                    let bytes = self.types.slice(TypeId::UINT8);
                    let byte_string = nargs == 2
                        && self.assignable_to(x, bytes)?.is_ok()
                        && core_type(&self.types, y.ty).is_some_and(|t| self.types.is_string(t));
                    if !byte_string {
                        if nargs != 2 {
                            self.error(TypeError::InvalidOperation {
                                message: "can only use ... with final argument in list"
                                    .to_string(),
                                span: call.span,
                            });
                        } else {
                            self.assignment(&mut y, Some(elems), "argument to append")?;
                        }
                    }
                } else {
                    for a in args.iter_mut().skip(1) {
                        self.assignment(a, Some(elem), "argument to append")?;
                    }
                }
                let sig = self.types.func(vec![s, elems], vec![s], true);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::Value;
                x.ty = s;
                x.val = None;
            }

            Builtin::Len | Builtin::Cap => {
                let is_len = id == Builtin::Len;
                let mut mode = Mode::Invalid;
                let mut val = None;
                let u = self.array_ptr_deref(self.types.underlying(x.ty));
                match self.types.get(u).clone() {
                    Type::Basic(k) if k.is_string() && is_len => {
                        if let (Mode::Constant, Some(Value::String(s))) = (x.mode, &x.val) {
                            mode = Mode::Constant;
                            val = Some(Value::Int(s.len() as i128));
                        } else {
                            mode = Mode::Value;
                        }
                    }
                    Type::Array { len, .. } => {
                        mode = Mode::Value;
                        if !arg_has_call {
                            mode = Mode::Constant;
                            val = Some(Value::Int(len as i128));
                        }
                    }
                    Type::Slice(_) | Type::Chan { .. } => mode = Mode::Value,
                    Type::Map { .. } if is_len => mode = Mode::Value,
                    Type::TypeParam(_) => {
                        let ok = under_is(&self.types, x.ty, |u| {
                            let u = self.array_ptr_deref(u);
                            match self.types.get(u) {
                                Type::Basic(k) => k.is_string() && is_len,
                                Type::Array { .. } | Type::Slice(_) | Type::Chan { .. } => true,
                                Type::Map { .. } => is_len,
                                _ => false,
                            }
                        });
                        if ok {
                            mode = Mode::Value;
                        }
                    }
                    _ => {}
                }
                if mode == Mode::Invalid {
                    if x.ty.is_valid() {
                        let d = self.describe(x);
                        self.builtin_arg_error(x, format!("{d} for built-in {name}"));
                    }
                    x.invalidate();
                    return Ok(());
                }
                if mode != Mode::Constant {
                    let sig = self.types.func(vec![x.ty], vec![TypeId::INT], false);
                    self.record_builtin_type(&c.fun, id, sig);
                }
                x.mode = mode;
                x.ty = TypeId::INT;
                x.val = val;
            }

            Builtin::Clear => {
                let ok = under_is(&self.types, x.ty, |u| {
                    matches!(self.types.get(u), Type::Map { .. } | Type::Slice(_))
                });
                if !ok {
                    let d = self.describe(x);
                    self.builtin_arg_error(
                        x,
                        format!("cannot clear {d}: argument must be (or constrained by) map or slice"),
                    );
                    x.invalidate();
                    return Ok(());
                }
                let sig = self.types.func(vec![x.ty], vec![], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::NoValue;
            }

            Builtin::Close => {
                let mut problem = None;
                let ok = under_is(&self.types, x.ty, |u| match self.types.get(u) {
                    Type::Chan { dir: ChanDir::Recv, .. } => {
                        problem = Some("cannot close receive-only channel");
                        false
                    }
                    Type::Chan { .. } => true,
                    _ => {
                        problem = Some("cannot close non-channel");
                        false
                    }
                });
                if !ok {
                    let what = problem.unwrap_or("cannot close non-channel");
                    let d = self.describe(x);
                    self.error(TypeError::InvalidOperation {
                        message: format!("{what} {d}"),
                        span: x.expr.map(|e| e.span).unwrap_or(call.span),
                    });
                    x.invalidate();
                    return Ok(());
                }
                let sig = self.types.func(vec![x.ty], vec![], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::NoValue;
            }

            Builtin::Copy => {
                let y = &args[1];
                let dst = match core_type(&self.types, x.ty).map(|t| self.types.get(t).clone()) {
                    Some(Type::Slice(elem)) => Some(elem),
                    _ => None,
                };
                let src = match core_type(&self.types, y.ty) {
                    Some(t) if self.types.is_string(t) => Some(TypeId::UINT8),
                    Some(t) => match self.types.get(t) {
                        Type::Slice(elem) => Some(*elem),
                        _ => None,
                    },
                    None => None,
                };
                let (Some(dst), Some(src)) = (dst, src) else {
                    let (dx, dy) = (self.describe(x), self.describe(y));
                    self.builtin_arg_error(x, format!("copy expects slice arguments; found {dx} and {dy}"));
                    x.invalidate();
                    return Ok(());
                };
                if !predicates::identical(&self.types, dst, src) {
                    let (dx, dy) = (self.describe(x), self.describe(y));
                    let (ed, es) = (self.type_string(dst), self.type_string(src));
                    self.builtin_arg_error(
                        x,
                        format!("arguments to copy {dx} and {dy} have different element types {ed} and {es}"),
                    );
                    x.invalidate();
                    return Ok(());
                }
                let sig = self.types.func(vec![x.ty, y.ty], vec![TypeId::INT], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::Value;
                x.ty = TypeId::INT;
                x.val = None;
            }

            Builtin::Delete => {
                let map = x.ty;
                let mut key: Option<TypeId> = None;
                let mut mixed_keys = false;
                let ok = under_is(&self.types, map, |u| match self.types.get(u) {
                    Type::Map { key: k, .. } => {
                        if key.is_some_and(|prev| !predicates::identical(&self.types, prev, *k)) {
                            mixed_keys = true;
                            return false;
                        }
                        key = Some(*k);
                        true
                    }
                    _ => false,
                });
                let Some(key) = key.filter(|_| ok) else {
                    let d = self.describe(x);
                    let message = if mixed_keys {
                        format!("maps of {d} must have identical key types")
                    } else {
                        format!("{d} is not a map")
                    };
                    self.builtin_arg_error(x, message);
                    x.invalidate();
                    return Ok(());
                };
                let mut k = args[1].clone();
                self.assignment(&mut k, Some(key), "argument to delete")?;
                if k.is_invalid() {
                    x.invalidate();
                    return Ok(());
                }
                let sig = self.types.func(vec![map, key], vec![], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::NoValue;
            }

            Builtin::Make => {
                let arg0 = &c.args[0];
                let t = self.var_type(arg0)?;
                if !t.is_valid() {
                    x.invalidate();
                    return Ok(());
                }
                let min = match core_type(&self.types, t).map(|u| self.types.get(u)) {
                    Some(Type::Slice(_)) => 2,
                    Some(Type::Map { .. } | Type::Chan { .. }) => 1,
                    None => {
                        self.error(TypeError::InvalidArgument {
                            message: format!(
                                "cannot make {}: no core type",
                                gop_ast::printer::expr_string(arg0)
                            ),
                            span: arg0.span,
                        });
                        x.invalidate();
                        return Ok(());
                    }
                    Some(_) => {
                        self.error(TypeError::InvalidArgument {
                            message: format!(
                                "cannot make {}; type must be slice, map, or channel",
                                gop_ast::printer::expr_string(arg0)
                            ),
                            span: arg0.span,
                        });
                        x.invalidate();
                        return Ok(());
                    }
                };
                if nargs < min || min + 1 < nargs {
                    self.error(TypeError::InvalidOperation {
                        message: format!(
                            "{} expects {min} or {} arguments; found {nargs}",
                            gop_ast::printer::expr_string(call),
                            min + 1
                        ),
                        span: call.span,
                    });
                    x.invalidate();
                    return Ok(());
                }
                let mut params = vec![t];
                let mut sizes = Vec::new();
                for arg in &c.args[1..] {
                    let (ty, size) = self.index_value(arg, None, false)?;
                    params.push(ty);
                    sizes.extend(size);
                }
                if let [len, cap] = sizes.as_slice() {
                    if len > cap {
                        self.error(TypeError::InvalidArgument {
                            message: "length and capacity swapped".to_string(),
                            span: c.args[1].span,
                        });
                    }
                }
                let sig = self.types.func(params, vec![t], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::Value;
                x.ty = t;
                x.val = None;
            }

            Builtin::Max | Builtin::Min => {
                let op = if id == Builtin::Max {
                    BinaryOp::Gtr
                } else {
                    BinaryOp::Lss
                };
                for i in 0..args.len() {
                    let a = args[i].clone();
                    if !predicates::all_ordered(&self.types, a.ty) {
                        let d = self.describe(&a);
                        self.builtin_arg_error(&a, format!("{d} cannot be ordered"));
                        x.invalidate();
                        return Ok(());
                    }
                    if i == 0 {
                        continue;
                    }
                    let mut a = a;
                    self.match_types(x, &mut a)?;
                    if x.is_invalid() {
                        return Ok(());
                    }
                    if !predicates::identical(&self.types, x.ty, a.ty) {
                        let message = format!(
                            "mismatched types {} (previous argument) and {} (type of {})",
                            self.type_string(x.ty),
                            self.type_string(a.ty),
                            a.text()
                        );
                        self.builtin_arg_error(&a, message);
                        x.invalidate();
                        return Ok(());
                    }
                    match (x.mode, a.mode, &x.val, &a.val) {
                        (Mode::Constant, Mode::Constant, Some(xv), Some(av)) => {
                            if constant::compare(av, op, xv) == Some(true) {
                                *x = a;
                            }
                        }
                        _ => x.mode = Mode::Value,
                    }
                }
                if x.mode != Mode::Constant {
                    x.mode = Mode::Value;
                    self.assignment(x, Some(TypeId::ANY), &format!("argument to built-in {name}"))?;
                    if x.is_invalid() {
                        return Ok(());
                    }
                }
                for a in &args {
                    if let Some(e) = a.expr {
                        self.update_expr_type(e, x.ty, true)?;
                    }
                }
                if x.mode != Mode::Constant {
                    let sig = self.types.func(vec![x.ty; nargs], vec![x.ty], false);
                    self.record_builtin_type(&c.fun, id, sig);
                }
                x.expr = Some(call);
            }

            Builtin::New => {
                let t = self.var_type(&c.args[0])?;
                if !t.is_valid() {
                    x.invalidate();
                    return Ok(());
                }
                let ptr = self.types.pointer(t);
                let sig = self.types.func(vec![t], vec![ptr], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::Value;
                x.ty = ptr;
                x.val = None;
            }

            Builtin::Panic => {
                let has_results = self
                    .env
                    .sig
                    .and_then(|s| self.types.sig(s))
                    .is_some_and(|s| !s.results.is_empty());
                if has_results {
                    self.panics.insert(call.id);
                }
                self.assignment(x, Some(TypeId::ANY), "argument to panic")?;
                if x.is_invalid() {
                    return Ok(());
                }
                let sig = self.types.func(vec![TypeId::ANY], vec![], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::NoValue;
            }

            Builtin::Print | Builtin::Println => {
                let mut params = Vec::with_capacity(nargs);
                for a in args.iter_mut() {
                    self.assignment(a, None, &format!("argument to built-in {name}"))?;
                    if a.is_invalid() {
                        x.invalidate();
                        return Ok(());
                    }
                    params.push(a.ty);
                }
                let sig = self.types.func(params, vec![], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::NoValue;
            }

            Builtin::Recover => {
                let sig = self.types.func(vec![], vec![TypeId::ANY], false);
                self.record_builtin_type(&c.fun, id, sig);
                x.mode = Mode::Value;
                x.ty = TypeId::ANY;
                x.val = None;
            }
        }
        x.expr = Some(call);
        Ok(())
    }

    /// `*[N]T` behaves like `[N]T` for `len`, `cap` and ranging.
    pub(crate) fn array_ptr_deref(&self, u: TypeId) -> TypeId {
        if let Type::Pointer(base) = self.types.get(u) {
            let b = self.types.underlying(*base);
            if let Type::Array { .. } = self.types.get(b) {
                return b;
            }
        }
        u
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_and_statement_forms() {
        assert_eq!(Builtin::Append.arity(), (1, true));
        assert_eq!(Builtin::Copy.arity(), (2, false));
        assert!(Builtin::Println.is_statement());
        assert!(!Builtin::Len.is_statement());
        assert_eq!(Builtin::Min.feature(), Some(Feature::Min));
        assert_eq!(Builtin::Len.feature(), None);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = Builtin::ALL.iter().map(|b| b.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Builtin::ALL.len());
    }
}
