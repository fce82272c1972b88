//! Assignability and the assignment forms: `=`, `:=`, variable
//! initialisation and multi-value right-hand sides.

use gop_ast::printer::expr_string;
use gop_ast::{ChanDir, Expr, ExprKind};
use gop_common::Span;
use tracing::trace;

use crate::checker::Checker;
use crate::constant::ReprError;
use crate::error::{Flow, TypeError};
use crate::objects::{ObjId, ObjKind, Object};
use crate::operand::{Mode, Operand};
use crate::predicates::{identical, type_set};
use crate::types::{Type, TypeId};

impl<'a> Checker<'a> {
    // ── Assignability ───────────────────────────────────────────────────

    /// Whether `x` can be assigned to a variable of type `t`. The error is
    /// the cause, empty when there is nothing to add.
    pub(crate) fn assignable_to(&mut self, x: &Operand<'a>, t: TypeId) -> Flow<Result<(), String>> {
        if x.is_invalid() || !t.is_valid() {
            return Ok(Ok(()));
        }
        let v = x.ty;
        if identical(&self.types, v, t) {
            return Ok(Ok(()));
        }
        let vu = self.types.underlying(v);
        let tu = self.types.underlying(t);
        let v_param = self.types.is_type_param(v);
        let t_param = self.types.is_type_param(t);

        if self.types.is_untyped(vu) {
            if t_param {
                let terms = type_set(&self.types, t).terms;
                let ok = terms.is_some_and(|terms| {
                    terms
                        .iter()
                        .all(|term| self.implicit_type_and_value(x, term.ty).is_ok())
                });
                return Ok(if ok { Ok(()) } else { Err(String::new()) });
            }
            return Ok(match self.implicit_type_and_value(x, t) {
                Ok(_) => Ok(()),
                Err(_) => Err(String::new()),
            });
        }

        if identical(&self.types, vu, tu)
            && (!self.types.has_name(v) || !self.types.has_name(t))
            && !v_param
            && !t_param
        {
            return Ok(Ok(()));
        }

        let mut cause = String::new();
        if !t_param && matches!(self.types.get(tu), Type::Interface(_)) {
            match self.implements(v, t, false)? {
                Ok(()) => return Ok(Ok(())),
                Err(why) if !v_param => return Ok(Err(self.not_implemented(v, t, &why))),
                Err(_) => {}
            }
        } else if let Type::Pointer(base) = self.types.get(tu) {
            if self.types.is_plain_interface(*base) {
                let t_str = self.type_string(t);
                return Ok(Err(format!(
                    "{} does not implement {t_str} (type {t_str} is pointer to interface, not interface)",
                    self.type_string(v)
                )));
            }
        }

        if !v_param && matches!(self.types.get(vu), Type::Interface(_)) && self.implements(t, v, false)?.is_ok() {
            return Ok(Err("need type assertion".to_string()));
        }

        if let (Type::Chan { dir: ChanDir::Both, elem: ve }, Type::Chan { elem: te, .. }) =
            (self.types.get(vu), self.types.get(tu))
        {
            if identical(&self.types, *ve, *te) {
                let ok = !self.types.has_name(v) || !self.types.has_name(t);
                return Ok(if ok { Ok(()) } else { Err(String::new()) });
            }
        }

        if !v_param && !t_param {
            return Ok(Err(String::new()));
        }

        // Type parameters: every specific type must work.
        if !self.types.has_name(v) && t_param {
            let Some(terms) = type_set(&self.types, t).terms else {
                return Ok(Err(cause));
            };
            for term in terms {
                if let Err(inner) = self.assignable_to(x, term.ty)? {
                    cause = format!(
                        "cannot assign {} to {} (in {})",
                        self.type_string(v),
                        self.type_string(term.ty),
                        self.type_string(t)
                    );
                    if !inner.is_empty() {
                        cause = format!("{cause}\n\t{inner}");
                    }
                    return Ok(Err(cause));
                }
            }
            return Ok(Ok(()));
        }
        if v_param && !self.types.has_name(t) {
            let Some(terms) = type_set(&self.types, v).terms else {
                return Ok(Err(cause));
            };
            for term in terms {
                let mut each = x.clone();
                each.ty = term.ty;
                if let Err(inner) = self.assignable_to(&each, t)? {
                    cause = format!(
                        "cannot assign {} (in {}) to {}",
                        self.type_string(term.ty),
                        self.type_string(v),
                        self.type_string(t)
                    );
                    if !inner.is_empty() {
                        cause = format!("{cause}\n\t{inner}");
                    }
                    return Ok(Err(cause));
                }
            }
            return Ok(Ok(()));
        }
        Ok(Err(cause))
    }

    fn not_implemented(&self, v: TypeId, t: TypeId, why: &str) -> String {
        let head = format!("{} does not implement {}", self.type_string(v), self.type_string(t));
        if why.is_empty() {
            head
        } else {
            format!("{head} ({why})")
        }
    }

    /// Check that `x` can be assigned to a variable of type `target`
    /// (`None` for the blank identifier) and convert an untyped `x`.
    /// Invalidates `x` on failure.
    pub(crate) fn assignment(&mut self, x: &mut Operand<'a>, target: Option<TypeId>, context: &str) -> Flow<()> {
        self.single_value(x);
        if x.is_invalid() {
            return Ok(());
        }
        if !x.mode.is_value() {
            let to = target.map(|t| self.type_string(t)).unwrap_or_else(|| "_".to_string());
            self.error(TypeError::InvalidUse {
                message: format!("cannot assign {} to {to} in {context}", self.describe(x)),
                span: x.span(),
            });
            x.invalidate();
            return Ok(());
        }

        if self.types.is_untyped(x.ty) {
            let mut conv_target = target;
            if x.is_nil() {
                if target.is_none() {
                    self.error(TypeError::UntypedNil {
                        context: context.to_string(),
                        span: x.span(),
                    });
                    x.invalidate();
                    return Ok(());
                }
            } else if target.map_or(true, |t| self.types.is_plain_interface(t)) {
                conv_target = Some(self.types.default_type(x.ty));
            }
            let conv_target = conv_target.unwrap_or(TypeId::INVALID);
            match self.implicit_type_and_value(x, conv_target) {
                Err(err) => {
                    let detail = match err {
                        ReprError::Truncated => " (truncated)",
                        ReprError::Overflow => " (overflows)",
                        ReprError::NotRepresentable => "",
                    };
                    self.error(TypeError::CannotUse {
                        operand: self.describe(x),
                        target: self.type_string(conv_target),
                        context: context.to_string(),
                        detail: detail.to_string(),
                        span: x.span(),
                    });
                    x.invalidate();
                    return Ok(());
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
        }

        let generic = self
            .types
            .sig(self.types.underlying(x.ty))
            .is_some_and(|sig| !sig.type_params.is_empty());
        if generic {
            self.error(TypeError::InvalidUse {
                message: format!(
                    "cannot use generic function {} without instantiation in {context}",
                    x.text()
                ),
                span: x.span(),
            });
            x.invalidate();
            return Ok(());
        }

        let Some(t) = target else {
            return Ok(());
        };
        if let Err(cause) = self.assignable_to(x, t)? {
            let detail = if cause.is_empty() {
                String::new()
            } else {
                format!(": {cause}")
            };
            self.error(TypeError::CannotUse {
                operand: self.describe(x),
                target: self.type_string(t),
                context: context.to_string(),
                detail,
                span: x.span(),
            });
            x.invalidate();
        }
        Ok(())
    }

    // ── Initialisation ──────────────────────────────────────────────────

    /// Initialise variable `obj` with `x`. An untyped variable takes the
    /// default type of `x`.
    pub(crate) fn init_var(&mut self, obj: ObjId, x: &mut Operand<'a>, context: &str) -> Flow<()> {
        let declared = self.objects[obj].ty;
        if x.is_invalid() || !x.ty.is_valid() || declared == Some(TypeId::INVALID) {
            if declared.is_none() {
                self.objects[obj].ty = Some(TypeId::INVALID);
            }
            x.invalidate();
            return Ok(());
        }
        let t = match declared {
            Some(t) => t,
            None => {
                if x.is_nil() {
                    self.error(TypeError::UntypedNil {
                        context: context.to_string(),
                        span: x.span(),
                    });
                    self.objects[obj].ty = Some(TypeId::INVALID);
                    x.invalidate();
                    return Ok(());
                }
                let t = self.types.default_type(x.ty);
                self.objects[obj].ty = Some(t);
                t
            }
        };
        self.assignment(x, Some(t), context)
    }

    /// Initialise `lhs` from `rhs`. `return_span` is set when the
    /// variables are the results of a function and `rhs` comes from a
    /// `return` statement.
    pub(crate) fn init_vars(&mut self, lhs: &[ObjId], rhs: &'a [Expr], return_span: Option<Span>) -> Flow<()> {
        let context = if return_span.is_some() {
            "return statement"
        } else {
            "assignment"
        };
        let (l, r) = (lhs.len(), rhs.len());
        let is_call = r == 1 && matches!(rhs[0].unparen().kind, ExprKind::Call(_));

        if l == r && !is_call {
            for (&obj, e) in lhs.iter().zip(rhs) {
                let hint = self.objects[obj].ty;
                let mut x = self.expr_with_hint(e, hint)?;
                self.init_var(obj, &mut x, context)?;
            }
            return Ok(());
        }

        if r != 1 {
            match return_span {
                Some(at) => {
                    let values = self.expr_list(rhs)?;
                    if values.iter().all(|x| !x.is_invalid()) {
                        self.return_error(at, lhs, &values);
                    }
                }
                None => {
                    if self.use_exprs(rhs)? {
                        self.assign_error(rhs, l, r);
                    }
                }
            }
            self.invalidate_untyped(lhs);
            return Ok(());
        }

        let (mut values, comma_ok) = self.multi_expr(&rhs[0], l == 2 && return_span.is_none())?;
        if values.len() == l {
            for (&obj, x) in lhs.iter().zip(values.iter_mut()) {
                self.init_var(obj, x, context)?;
            }
            if comma_ok && !values[0].is_invalid() && !values[1].is_invalid() {
                self.record_comma_ok_types(&rhs[0], &values);
            }
            return Ok(());
        }

        if values.first().is_some_and(|x| !x.is_invalid()) {
            match return_span {
                Some(at) => self.return_error(at, lhs, &values),
                None => self.assign_error(rhs, l, values.len()),
            }
        }
        self.invalidate_untyped(lhs);
        Ok(())
    }

    fn invalidate_untyped(&mut self, lhs: &[ObjId]) {
        for &obj in lhs {
            if self.objects[obj].ty.is_none() {
                self.objects[obj].ty = Some(TypeId::INVALID);
            }
        }
    }

    // ── Assignment statements ───────────────────────────────────────────

    /// Evaluate an assignment target. Returns `None` for the blank
    /// identifier and `INVALID` for anything that cannot be assigned to.
    pub(crate) fn lhs_var(&mut self, lhs: &'a Expr) -> Flow<Option<TypeId>> {
        let inner = lhs.unparen();
        let ident = match &inner.kind {
            ExprKind::Ident(name) => Some(name.as_str()),
            _ => None,
        };
        if ident == Some("_") {
            return Ok(None);
        }

        // Assigning to a variable is not a use of it.
        let var = ident
            .and_then(|name| self.lookup(name))
            .filter(|obj| self.objects[*obj].kind == ObjKind::Var && self.objects[*obj].module.is_none());
        let was_used = var.map(|obj| self.objects[obj].used);
        let x = self.expr(lhs)?;
        if let (Some(obj), Some(used)) = (var, was_used) {
            self.objects[obj].used = used;
        }

        match x.mode {
            Mode::Invalid => Ok(Some(TypeId::INVALID)),
            Mode::Variable | Mode::MapIndex => Ok(Some(x.ty)),
            _ => {
                if let ExprKind::Selector(base, _) = &inner.kind {
                    let base_mode = self.info.types.get(&base.id).map(|tv| tv.mode);
                    if base_mode == Some(Mode::MapIndex) {
                        self.error(TypeError::InvalidUse {
                            message: format!("cannot assign to struct field {} in map", expr_string(inner)),
                            span: x.span(),
                        });
                        return Ok(Some(TypeId::INVALID));
                    }
                }
                self.error(TypeError::CannotAssign {
                    operand: expr_string(lhs),
                    span: lhs.span,
                });
                Ok(Some(TypeId::INVALID))
            }
        }
    }

    /// Assign `x` (or, if `None`, the value of `rhs`) to `lhs`.
    pub(crate) fn assign_var(
        &mut self,
        lhs: &'a Expr,
        rhs: Option<&'a Expr>,
        x: Option<&mut Operand<'a>>,
        context: &str,
    ) -> Flow<()> {
        let target = self.lhs_var(lhs)?;
        if target == Some(TypeId::INVALID) {
            match x {
                Some(x) => x.invalidate(),
                None => {
                    self.use_exprs(rhs.map(std::slice::from_ref).unwrap_or_default())?;
                }
            }
            return Ok(());
        }
        let context = if target.is_none() && context == "assignment" {
            "assignment to _ identifier"
        } else {
            context
        };
        match x {
            Some(x) => self.assignment(x, target, context),
            None => {
                let Some(rhs) = rhs else {
                    return Ok(());
                };
                let mut x = self.expr_with_hint(rhs, target)?;
                self.assignment(&mut x, target, context)
            }
        }
    }

    /// `a, b = x, y` and `a, b = f()`.
    pub(crate) fn assign_vars(&mut self, lhs: &'a [Expr], rhs: &'a [Expr]) -> Flow<()> {
        let (l, r) = (lhs.len(), rhs.len());
        let is_call = r == 1 && matches!(rhs[0].unparen().kind, ExprKind::Call(_));

        if l == r && !is_call {
            for (target, value) in lhs.iter().zip(rhs) {
                self.assign_var(target, Some(value), None, "assignment")?;
            }
            return Ok(());
        }

        if r != 1 {
            let ok_lhs = self.use_lhs(lhs)?;
            let ok_rhs = self.use_exprs(rhs)?;
            if ok_lhs && ok_rhs {
                self.assign_error(rhs, l, r);
            }
            return Ok(());
        }

        let (mut values, comma_ok) = self.multi_expr(&rhs[0], l == 2)?;
        if values.len() == l {
            for (target, x) in lhs.iter().zip(values.iter_mut()) {
                self.assign_var(target, None, Some(x), "assignment")?;
            }
            if comma_ok && !values[0].is_invalid() && !values[1].is_invalid() {
                self.record_comma_ok_types(&rhs[0], &values);
            }
            return Ok(());
        }

        if values.first().is_some_and(|x| !x.is_invalid()) {
            self.assign_error(rhs, l, values.len());
        }
        self.use_lhs(lhs)?;
        Ok(())
    }

    /// `a, b := x, y`. At least one name on the left must be new in the
    /// current scope; the others are assigned to.
    pub(crate) fn short_var_decl(&mut self, span: Span, lhs: &'a [Expr], rhs: &'a [Expr]) -> Flow<()> {
        let top = self.task_count();
        let scope = self.env.scope;
        let mut seen: Vec<&str> = Vec::with_capacity(lhs.len());
        let mut vars: Vec<Option<ObjId>> = Vec::with_capacity(lhs.len());
        let mut new_vars = Vec::new();
        let mut has_err = false;

        for e in lhs {
            let ExprKind::Ident(name) = &e.kind else {
                self.use_lhs(std::slice::from_ref(e))?;
                self.error(TypeError::InvalidDecl {
                    message: format!("non-name {} on left side of :=", expr_string(e)),
                    span: e.span,
                });
                has_err = true;
                vars.push(None);
                continue;
            };
            if name != "_" {
                if seen.contains(&name.as_str()) {
                    self.error(TypeError::InvalidDecl {
                        message: format!("{name} repeated on left side of :="),
                        span: e.span,
                    });
                    has_err = true;
                    vars.push(None);
                    continue;
                }
                seen.push(name);
            }
            if let Some(prev) = self.scopes.lookup_local(scope, name) {
                self.record_use(e.id, prev);
                if self.objects[prev].kind == ObjKind::Var {
                    vars.push(Some(prev));
                } else {
                    self.error(TypeError::InvalidUse {
                        message: format!("cannot assign to {name}"),
                        span: e.span,
                    });
                    has_err = true;
                    vars.push(None);
                }
                continue;
            }
            let obj = self.new_object(Object::new(ObjKind::Var, name.as_str(), e.span));
            self.info.defs.insert(e.id, obj);
            if name != "_" {
                new_vars.push(obj);
            }
            vars.push(Some(obj));
        }

        let vars: Vec<ObjId> = vars
            .into_iter()
            .zip(lhs)
            .map(|(obj, e)| obj.unwrap_or_else(|| self.new_object(Object::new(ObjKind::Var, "_", e.span))))
            .collect();
        self.init_vars(&vars, rhs, None)?;
        // Closures on the right see the scope as it was before the
        // declaration.
        self.process_tasks(top)?;

        if new_vars.is_empty() && !has_err {
            self.error(TypeError::NoNewVariables { span });
            return Ok(());
        }
        trace!(count = new_vars.len(), "short variable declaration");
        for obj in new_vars {
            self.objects.mark_black(obj);
            self.declare(scope, None, obj);
            self.locals.push(obj);
        }
        Ok(())
    }

    // ── Count mismatches ────────────────────────────────────────────────

    pub(crate) fn assign_error(&mut self, rhs: &[Expr], vars: usize, values: usize) {
        let Some(first) = rhs.first() else {
            return;
        };
        let call = match (&first.unparen().kind, rhs.len()) {
            (ExprKind::Call(c), 1) => Some(expr_string(&c.fun)),
            _ => None,
        };
        self.error(TypeError::AssignmentMismatch {
            vars,
            values,
            call,
            span: first.span,
        });
    }

    pub(crate) fn return_error(&mut self, at: Span, results: &[ObjId], values: &[Operand<'a>]) {
        let (l, r) = (results.len(), values.len());
        let not_enough = r <= l;
        let span = if r > l {
            values[l].span()
        } else if r > 0 {
            values[r - 1].span()
        } else {
            at
        };
        let have: Vec<TypeId> = values.iter().map(|x| x.ty).collect();
        let want: Vec<TypeId> = results
            .iter()
            .map(|obj| self.objects[*obj].ty_or_invalid())
            .collect();
        self.error(TypeError::ReturnCount {
            not_enough,
            have: self.types_summary(&have, false, false),
            want: self.types_summary(&want, false, false),
            span,
        });
    }

    /// `(int, string)`, with untyped numbers shown as `number`. A
    /// `variadic` list shows its last entry as `...T`; `has_dots` appends
    /// `...` to it.
    pub(crate) fn types_summary(&self, list: &[TypeId], variadic: bool, has_dots: bool) -> String {
        let last = list.len().saturating_sub(1);
        let parts: Vec<String> = list
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let mut s = if !t.is_valid() {
                    "unknown type".to_string()
                } else if self.types.is_untyped(t) {
                    if self.types.is_numeric(t) {
                        "number".to_string()
                    } else {
                        self.type_string(t).replace("untyped ", "")
                    }
                } else {
                    self.type_string(t)
                };
                if i == last {
                    if variadic {
                        s = format!("...{}", s.strip_prefix("[]").unwrap_or(&s));
                    }
                    if has_dots {
                        s.push_str("...");
                    }
                }
                s
            })
            .collect();
        format!("({})", parts.join(", "))
    }

    /// Record `v, ok := m[k]` style expressions as producing a pair.
    pub(crate) fn record_comma_ok_types(&mut self, e: &'a Expr, values: &[Operand<'a>]) {
        let [first, second] = values else {
            return;
        };
        let pair = self.types.tuple(vec![first.ty, second.ty]);
        let mut e = e;
        loop {
            if let Some(tv) = self.info.types.get_mut(&e.id) {
                tv.ty = pair;
            }
            match &e.kind {
                ExprKind::Paren(inner) => e = inner,
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::importer::StdImporter;

    #[test]
    fn summaries_hide_untyped_kinds() {
        let config = Config::default();
        let importer = StdImporter;
        let files = Vec::new();
        let checker = Checker::new(&config, &files, &importer);
        let s = checker.types_summary(&[TypeId::UNTYPED_INT, TypeId::UNTYPED_STRING, TypeId::INT], false, false);
        assert_eq!(s, "(number, string, int)");
        assert_eq!(checker.types_summary(&[TypeId::INVALID], false, true), "(unknown type...)");
    }
}
