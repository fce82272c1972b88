//! Calls, conversions `T(x)`, function instantiation and selectors.

use gop_ast::printer::expr_string;
use gop_ast::{CallExpr, Expr, ExprKind, Ident, NodeId};
use gop_common::Span;
use tracing::{debug, trace};

use crate::checker::{Checker, Task};
use crate::config::Feature;
use crate::error::{Flow, TypeError};
use crate::info::{QualifiedCall, Selection, SelectionKind};
use crate::lookup::Lookup;
use crate::objects::{ObjId, ObjKind};
use crate::operand::{Mode, Operand};
use crate::predicates::{core_type, identical, mentions, type_set};
use crate::subst::{instantiate_signature, subst, SubstMap};
use crate::types::{Signature, Type, TypeId};

impl<'a> Checker<'a> {
    // ── Calls ───────────────────────────────────────────────────────────

    pub(crate) fn call_expr(&mut self, x: &mut Operand<'a>, e: &'a Expr, call: &'a CallExpr) -> Flow<()> {
        let fun: &'a Expr = &call.fun;
        let mut inst: Option<&'a [Expr]> = None;
        match &fun.unparen().kind {
            ExprKind::Index(base, indices) => {
                let target = fun.unparen();
                if self.index_or_generic(x, target, base, indices)? {
                    inst = Some(indices.as_slice());
                }
                x.expr = Some(target);
                self.record_operand(target, x, false);
            }
            ExprKind::Ident(name) if self.reserved_candidate(name) => {
                if !self.reserved_call(x, fun, name)? {
                    self.use_exprs(&call.args)?;
                    *x = Operand::invalid(Some(e));
                    return Ok(());
                }
                self.record_operand(fun, x, false);
            }
            _ => *x = self.expr_or_type(fun, true)?,
        }

        match x.mode {
            Mode::Invalid => {
                self.use_exprs(&call.args)?;
                x.expr = Some(e);
                return Ok(());
            }
            Mode::TypeExpr => {
                self.conversion_call(x, e, call)?;
                x.expr = Some(e);
                return Ok(());
            }
            Mode::Builtin(id) => {
                self.builtin(x, e, call, id)?;
                x.expr = Some(e);
                if !x.is_invalid() && x.mode != Mode::Constant {
                    self.env.has_call_or_recv = true;
                }
                return Ok(());
            }
            _ => {}
        }

        let Some(sig_ty) = core_type(&self.types, x.ty).filter(|u| self.types.sig(*u).is_some()) else {
            self.error(TypeError::InvalidOperation {
                message: format!("cannot call non-function {}", self.describe(x)),
                span: x.span(),
            });
            self.use_exprs(&call.args)?;
            *x = Operand::invalid(Some(e));
            return Ok(());
        };
        let mut sig_ty = sig_ty;
        let was_generic = self.is_generic_func(sig_ty);

        let mut targs = Vec::new();
        let mut targ_exprs: &'a [Expr] = &[];
        if let Some(indices) = inst {
            let Some(list) = self.type_list(indices)? else {
                self.use_exprs(&call.args)?;
                *x = Operand::invalid(Some(e));
                return Ok(());
            };
            let want = self.sig_type_params(sig_ty).len();
            if list.len() > want {
                self.error(TypeError::TypeArgCount {
                    got: list.len(),
                    want,
                    name: expr_string(fun),
                    span: indices[want].span,
                });
                self.use_exprs(&call.args)?;
                *x = Operand::invalid(Some(e));
                return Ok(());
            }
            if list.len() == want && want > 0 {
                if !self.version_ok(Feature::TypeParams, fun.span) {
                    self.use_exprs(&call.args)?;
                    *x = Operand::invalid(Some(e));
                    return Ok(());
                }
                sig_ty = self.instantiate_func(fun, sig_ty, &list, indices);
            } else {
                targs = list;
                targ_exprs = indices;
            }
        }

        let mut args = self.call_args(&call.args)?;
        let sig_ty = self.arguments(call, sig_ty, targs, targ_exprs, &mut args)?;

        let Some(sig) = self.types.sig(sig_ty).cloned() else {
            *x = Operand::invalid(Some(e));
            return Ok(());
        };
        if was_generic && sig.type_params.is_empty() {
            self.record_type_and_value(fun, Mode::Value, sig_ty, None);
        }
        *x = match sig.results.as_slice() {
            [] => Operand::new(Mode::NoValue, TypeId::INVALID, Some(e)),
            [single] => Operand::new(Mode::Value, *single, Some(e)),
            [.., last] => {
                let mode = if identical(&self.types, *last, self.universe.error) {
                    Mode::CommaError
                } else {
                    Mode::Value
                };
                let tuple = self.types.tuple(sig.results.clone());
                Operand::new(mode, tuple, Some(e))
            }
        };
        self.env.has_call_or_recv = true;

        // Inference failed: a result still mentioning type parameters has no
        // meaningful type.
        if x.mode.is_value() && !sig.type_params.is_empty() && mentions(&self.types, x.ty, &sig.type_params) {
            x.invalidate();
        }
        Ok(())
    }

    /// `T(x)`.
    fn conversion_call(&mut self, x: &mut Operand<'a>, e: &'a Expr, call: &'a CallExpr) -> Flow<()> {
        self.non_generic(x);
        if x.is_invalid() {
            return Ok(());
        }
        let target = x.ty;
        *x = Operand::invalid(Some(e));
        match call.args.as_slice() {
            [] => self.error(TypeError::InvalidUse {
                message: format!("missing argument in conversion to {}", self.type_string(target)),
                span: e.span,
            }),
            [arg] => {
                *x = self.expr(arg)?;
                if x.is_invalid() {
                    return Ok(());
                }
                if self.types.is_interface(target)
                    && !self.types.is_type_param(target)
                    && type_set(&self.types, target).is_constraint_only()
                {
                    self.error(TypeError::InvalidUse {
                        message: format!(
                            "cannot use interface {} in conversion (contains specific type constraints or is comparable)",
                            self.type_string(target)
                        ),
                        span: e.span,
                    });
                    x.invalidate();
                    return Ok(());
                }
                if call.ellipsis.is_some() {
                    self.error(TypeError::InvalidUse {
                        message: format!("invalid use of ... in conversion to {}", self.type_string(target)),
                        span: arg.span,
                    });
                    x.invalidate();
                    return Ok(());
                }
                self.conversion(x, target)?;
            }
            [.., last] => {
                self.use_exprs(&call.args)?;
                self.error(TypeError::InvalidUse {
                    message: format!("too many arguments in conversion to {}", self.type_string(target)),
                    span: last.span,
                });
            }
        }
        Ok(())
    }

    // ── Reserved calls ──────────────────────────────────────────────────

    /// An undeclared identifier naming a reserved call.
    fn reserved_candidate(&self, name: &str) -> bool {
        self.lookup(name).is_none() && self.config.reserved_call(name).is_some()
    }

    /// Resolve `echo(...)` to the module member it stands for, recording the
    /// rewrite. Reports a missing import and returns false if the calling
    /// file does not import the module.
    fn reserved_call(&mut self, x: &mut Operand<'a>, fun: &'a Expr, name: &str) -> Flow<bool> {
        let Some(reserved) = self.config.reserved_call(name).cloned() else {
            return Ok(false);
        };
        let file_scope = self.file_scopes.get(self.env.file).copied().unwrap_or(self.pkg_scope);
        let alias = self.scopes.get(file_scope).objects().iter().copied().find(|obj| {
            let o = &self.objects[*obj];
            o.kind == ObjKind::ModuleAlias && o.module.as_deref() == Some(reserved.module.as_str())
        });
        let Some(alias) = alias else {
            self.error(TypeError::MissingImport {
                name: name.to_string(),
                module: reserved.module.clone(),
                span: fun.span,
            });
            return Ok(false);
        };
        self.objects[alias].used = true;
        let qualifier = self.objects[alias].name.clone();
        debug!(name, qualifier = %qualifier, member = %reserved.member, "rewriting reserved call");
        if !self.module_member(x, fun, &qualifier, &reserved.module, &reserved.member, fun.id, fun.span)? {
            return Ok(false);
        }
        self.info.rewrites.insert(
            fun.id,
            QualifiedCall {
                qualifier,
                module: reserved.module,
                member: reserved.member,
            },
        );
        Ok(true)
    }

    // ── Arguments ───────────────────────────────────────────────────────

    /// Evaluate call arguments. A single multi-value call spreads into one
    /// operand per result; generic functions are kept uninstantiated so
    /// that inference can see them.
    fn call_args(&mut self, args: &'a [Expr]) -> Flow<Vec<Operand<'a>>> {
        if let [single] = args {
            if !matches!(single.unparen().kind, ExprKind::Index(..)) {
                let mut x = self.raw_expr(single, None, true)?;
                self.exclude(&mut x, false);
                if !x.is_invalid() {
                    if let Some(elems) = self.types.tuple_elems(x.ty) {
                        return Ok(elems
                            .iter()
                            .map(|t| Operand::new(Mode::Value, *t, Some(single)))
                            .collect());
                    }
                }
                return Ok(vec![x]);
            }
        }
        let mut list = Vec::with_capacity(args.len());
        for arg in args {
            let mut x = Operand::invalid(Some(arg));
            if let ExprKind::Index(base, indices) = &arg.unparen().kind {
                let target = arg.unparen();
                if self.index_or_generic(&mut x, target, base, indices)? {
                    self.func_inst(&mut x, target, indices, true)?;
                }
                x.expr = Some(target);
                self.record_operand(target, &x, false);
                self.exclude(&mut x, false);
                self.single_value(&mut x);
            } else {
                x = self.raw_expr(arg, None, true)?;
                self.exclude(&mut x, false);
                self.single_value(&mut x);
            }
            list.push(x);
        }
        Ok(list)
    }

    /// Match `args` against the parameters of `sig_ty`, inferring missing
    /// type arguments of the callee and of generic function arguments.
    /// Returns the signature the call was checked against.
    fn arguments(
        &mut self,
        call: &'a CallExpr,
        sig_ty: TypeId,
        mut targs: Vec<TypeId>,
        targ_exprs: &'a [Expr],
        args: &mut [Operand<'a>],
    ) -> Flow<TypeId> {
        let Some(sig) = self.types.sig(sig_ty).cloned() else {
            return Ok(sig_ty);
        };
        let fun = expr_string(&call.fun);
        let nargs = args.len();
        let mut npars = sig.params.len();
        let ddd = call.ellipsis.is_some();

        let mut params = sig.params.clone();
        let mut adjusted = false;
        if sig.variadic {
            if ddd {
                if call.args.len() == 1 && nargs > 1 {
                    self.error(TypeError::InvalidUse {
                        message: format!("cannot use ... with {nargs}-valued {}", expr_string(&call.args[0])),
                        span: call.args[0].span,
                    });
                    return Ok(sig_ty);
                }
            } else if nargs + 1 >= npars {
                let elem = params
                    .last()
                    .and_then(|last| match self.types.get(*last) {
                        Type::Slice(elem) => Some(*elem),
                        _ => None,
                    })
                    .unwrap_or(TypeId::INVALID);
                params.truncate(npars - 1);
                params.resize(nargs, elem);
                adjusted = true;
                npars = nargs;
            } else {
                npars -= 1;
            }
        } else if ddd {
            self.error(TypeError::InvalidUse {
                message: format!("cannot use ... in call to non-variadic {fun}"),
                span: call.ellipsis.unwrap_or(call.fun.span),
            });
            return Ok(sig_ty);
        }

        if nargs != npars {
            let not_enough = nargs < npars;
            let span = if !not_enough {
                args[npars].span()
            } else if let Some(last) = call.args.last() {
                last.span
            } else {
                call.fun.span
            };
            let have: Vec<TypeId> = args.iter().map(|a| a.ty).collect();
            self.error(TypeError::ArgumentCount {
                not_enough,
                call: fun,
                have: self.types_summary(&have, false, ddd),
                want: self.types_summary(&sig.params, sig.variadic, false),
                span,
            });
            return Ok(sig_ty);
        }

        let mut tparams = sig.type_params.clone();
        let n = tparams.len();
        let mut generic_args = Vec::new();
        for (i, arg) in args.iter_mut().enumerate() {
            if arg.is_invalid() || !self.is_generic_func(arg.ty) {
                continue;
            }
            let (renamed, fresh) = self.rename_type_params(arg.ty);
            arg.ty = renamed;
            tparams.extend(fresh);
            generic_args.push(i);
        }
        if !generic_args.is_empty() && !self.version_ok(Feature::TypeParams, call.fun.span) {
            return Ok(sig_ty);
        }

        let mut result = sig_ty;
        if !tparams.is_empty() {
            let span = call.args.first().map_or(call.fun.span, |a| a.span);
            let Some(inferred) = self.infer(&fun, span, &tparams, &targs, &params, args)? else {
                return Ok(sig_ty);
            };
            trace!(call = %fun, inferred = inferred.len(), "inferred call type arguments");
            targs = inferred;
            if n > 0 {
                result = self.instantiate_func(&call.fun, sig_ty, &targs[..n], targ_exprs);
                params = if adjusted {
                    let smap = SubstMap::new(&tparams[..n], &targs[..n]);
                    params.iter().map(|p| subst(&mut self.types, *p, &smap)).collect()
                } else {
                    self.types.sig(result).map(|s| s.params.clone()).unwrap_or_default()
                };
            }
            let mut j = n;
            for i in generic_args {
                let arg = &mut args[i];
                let k = j + self.sig_type_params(arg.ty).len();
                let Some(expr) = arg.expr else {
                    j = k;
                    continue;
                };
                arg.ty = self.instantiate_func(expr, arg.ty, &targs[j..k], &[]);
                arg.mode = Mode::Value;
                let (ty, mode) = (arg.ty, arg.mode);
                self.record_type_and_value(expr, mode, ty, None);
                j = k;
            }
        }

        let context = format!("argument to {fun}");
        for (arg, param) in args.iter_mut().zip(params) {
            self.assignment(arg, Some(param), &context)?;
        }
        Ok(result)
    }

    // ── Instantiation ───────────────────────────────────────────────────

    /// `f[T...]` outside a call. With `infer`, missing trailing type
    /// arguments are inferred from the type arguments given; otherwise a
    /// partial list is left for the caller and returned.
    pub(crate) fn func_inst(
        &mut self,
        x: &mut Operand<'a>,
        e: &'a Expr,
        indices: &'a [Expr],
        infer: bool,
    ) -> Flow<Option<Vec<TypeId>>> {
        x.expr = Some(e);
        if !self.version_ok(Feature::TypeParams, e.span) {
            x.invalidate();
            return Ok(None);
        }
        let Some(mut targs) = self.type_list(indices)? else {
            x.invalidate();
            return Ok(None);
        };
        let tparams = self.sig_type_params(x.ty);
        let (got, want) = (targs.len(), tparams.len());
        if got > want {
            self.error(TypeError::TypeArgCount {
                got,
                want,
                name: x.text(),
                span: indices[got - 1].span,
            });
            x.invalidate();
            return Ok(None);
        }
        if got < want {
            if !infer {
                return Ok(Some(targs));
            }
            match self.infer(&x.text(), e.span, &tparams, &targs, &[], &[])? {
                Some(inferred) => targs = inferred,
                None => {
                    x.invalidate();
                    return Ok(None);
                }
            }
        }
        x.ty = self.instantiate_func(e, x.ty, &targs, indices);
        x.mode = Mode::Value;
        Ok(None)
    }

    /// Instantiate a generic signature, recording the instance and queueing
    /// the constraint check.
    fn instantiate_func(&mut self, e: &'a Expr, sig: TypeId, targs: &[TypeId], exprs: &'a [Expr]) -> TypeId {
        let tparams = self.sig_type_params(sig);
        let inst = instantiate_signature(&mut self.types, sig, targs);
        trace!(func = %expr_string(e), instance = %self.type_string(inst), "instantiated function");
        self.record_instance(instance_node(e), targs.to_vec(), inst);
        let span = exprs.first().map_or(e.span, |x| x.span);
        self.later(Task::VerifyInstance {
            span,
            tparams,
            targs: targs.to_vec(),
        });
        inst
    }

    /// Evaluate type arguments. `None` if any of them is invalid.
    fn type_list(&mut self, exprs: &'a [Expr]) -> Flow<Option<Vec<TypeId>>> {
        let mut list = Vec::with_capacity(exprs.len());
        let mut ok = true;
        for e in exprs {
            let t = self.var_type(e)?;
            ok &= t.is_valid();
            list.push(t);
        }
        Ok(ok.then_some(list))
    }

    pub(crate) fn is_generic_func(&self, t: TypeId) -> bool {
        !self.sig_type_params(t).is_empty()
    }

    fn sig_type_params(&self, t: TypeId) -> Vec<TypeId> {
        self.types
            .sig(self.types.underlying(t))
            .map(|s| s.type_params.clone())
            .unwrap_or_default()
    }

    // ── Selectors ───────────────────────────────────────────────────────

    /// `base.sel`: a module member, field, method value or method
    /// expression.
    pub(crate) fn selector(
        &mut self,
        x: &mut Operand<'a>,
        e: &'a Expr,
        base: &'a Expr,
        sel: &'a Ident,
        want_type: bool,
    ) -> Flow<()> {
        if let ExprKind::Ident(name) = &base.kind {
            if let Some(alias) = self.lookup(name).filter(|o| self.objects[*o].kind == ObjKind::ModuleAlias) {
                self.record_use(base.id, alias);
                self.objects[alias].used = true;
                let module = self.objects[alias].module.clone().unwrap_or_default();
                if !self.module_member(x, e, name, &module, &sel.name, sel.id, sel.span)? {
                    x.invalidate();
                }
                if want_type && !x.is_invalid() {
                    self.error(TypeError::NotAType {
                        expr: expr_string(e),
                        span: sel.span,
                    });
                    x.invalidate();
                }
                return Ok(());
            }
        }

        *x = self.expr_or_type(base, false)?;
        match x.mode {
            Mode::Invalid => return Ok(()),
            Mode::Builtin(_) => {
                self.error(TypeError::InvalidUse {
                    message: format!("invalid use of {} in selector expression", self.describe(x)),
                    span: e.span,
                });
                x.invalidate();
                return Ok(());
            }
            _ => {}
        }
        if want_type {
            self.error(TypeError::NotAType {
                expr: expr_string(e),
                span: sel.span,
            });
            x.invalidate();
            return Ok(());
        }

        let found = self.lookup_field_or_method(x.ty, x.mode == Mode::Variable, &sel.name)?;
        let (obj, member_ty, path, indirect, is_method) = match found {
            Lookup::Field { obj, ty, path, indirect } => (obj, ty, path, indirect, false),
            Lookup::Method { obj, ty, path, indirect } => (obj, ty, path, indirect, true),
            Lookup::Ambiguous => {
                self.error(TypeError::AmbiguousSelector {
                    expr: expr_string(base),
                    sel: sel.name.clone(),
                    span: sel.span,
                });
                x.invalidate();
                return Ok(());
            }
            Lookup::NeedsPointer { .. } => {
                if x.mode == Mode::TypeExpr {
                    let ty = self.type_string(x.ty);
                    self.error(TypeError::InvalidUse {
                        message: format!(
                            "invalid method expression {}.{} (needs pointer receiver (*{ty}).{})",
                            expr_string(base),
                            sel.name,
                            sel.name
                        ),
                        span: sel.span,
                    });
                } else {
                    self.error(TypeError::PointerMethod {
                        method: sel.name.clone(),
                        operand: self.type_string(x.ty),
                        span: sel.span,
                    });
                }
                x.invalidate();
                return Ok(());
            }
            Lookup::NotFound => {
                if self.types.underlying(x.ty).is_valid() {
                    self.missing_selector(x, base, sel);
                }
                x.invalidate();
                return Ok(());
            }
        };

        if x.mode == Mode::TypeExpr {
            if !is_method {
                self.error(TypeError::InvalidUse {
                    message: format!(
                        "{}.{} undefined (type {} has no method {})",
                        expr_string(base),
                        sel.name,
                        self.type_string(x.ty),
                        sel.name
                    ),
                    span: sel.span,
                });
                x.invalidate();
                return Ok(());
            }
            let recv = x.ty;
            self.record_selection(
                e.id,
                Selection {
                    kind: SelectionKind::MethodExpr,
                    recv,
                    obj,
                    path,
                    indirect,
                    ty: member_ty,
                },
            );
            let Some(sig) = self.types.sig(member_ty).cloned() else {
                x.invalidate();
                return Ok(());
            };
            let mut params = Vec::with_capacity(sig.params.len() + 1);
            params.push(recv);
            params.extend(sig.params.iter().copied());
            x.mode = Mode::Value;
            x.ty = self.types.signature(Signature {
                type_params: sig.type_params,
                recv: None,
                recv_type_params: Vec::new(),
                params,
                results: sig.results,
                variadic: sig.variadic,
            });
            self.add_decl_dep(obj);
            return Ok(());
        }

        let kind = if is_method {
            SelectionKind::MethodVal
        } else {
            SelectionKind::FieldVal
        };
        self.record_selection(
            e.id,
            Selection {
                kind,
                recv: x.ty,
                obj,
                path,
                indirect,
                ty: member_ty,
            },
        );
        if is_method {
            x.mode = Mode::Value;
            self.add_decl_dep(obj);
        } else if x.mode == Mode::Variable || indirect {
            x.mode = Mode::Variable;
        } else {
            x.mode = Mode::Value;
        }
        x.ty = member_ty;
        Ok(())
    }

    fn missing_selector(&mut self, x: &Operand<'a>, base: &'a Expr, sel: &'a Ident) {
        let pointer_to_interface = match self.types.get(self.types.underlying(x.ty)) {
            Type::Pointer(elem) => self.types.is_interface(*elem) && !self.types.is_type_param(*elem),
            _ => false,
        };
        if pointer_to_interface {
            self.error(TypeError::InvalidUse {
                message: format!(
                    "{}.{} undefined (type {} is pointer to interface, not interface)",
                    expr_string(base),
                    sel.name,
                    self.type_string(x.ty)
                ),
                span: sel.span,
            });
            return;
        }
        self.error(TypeError::MissingFieldOrMethod {
            expr: expr_string(base),
            sel: sel.name.clone(),
            ty: self.type_string(x.ty),
            span: sel.span,
        });
    }

    /// Resolve `member` in the module imported as `qualifier`. Only exported
    /// names are accessible.
    #[allow(clippy::too_many_arguments)]
    fn module_member(
        &mut self,
        x: &mut Operand<'a>,
        e: &'a Expr,
        qualifier: &str,
        module: &str,
        member: &str,
        node: NodeId,
        span: Span,
    ) -> Flow<bool> {
        *x = Operand::invalid(Some(e));
        let Some(scope) = self.module_scope(module) else {
            self.error(TypeError::UndefinedMember {
                module: qualifier.to_string(),
                name: member.to_string(),
                span,
            });
            return Ok(false);
        };
        let Some(obj) = self.scopes.lookup_local(scope, member) else {
            self.error(TypeError::UndefinedMember {
                module: qualifier.to_string(),
                name: member.to_string(),
                span,
            });
            return Ok(false);
        };
        if !self.objects[obj].is_exported() {
            self.error(TypeError::NotExported {
                name: member.to_string(),
                module: qualifier.to_string(),
                span,
            });
        }
        self.record_use(node, obj);
        Ok(self.member_operand(x, obj))
    }

    fn member_operand(&mut self, x: &mut Operand<'a>, obj: ObjId) -> bool {
        let o = &self.objects[obj];
        let ty = o.ty_or_invalid();
        match o.kind {
            ObjKind::Const => {
                let Some(val) = o.val.clone() else {
                    return false;
                };
                x.mode = Mode::Constant;
                x.val = Some(val);
            }
            ObjKind::Var => x.mode = Mode::Variable,
            ObjKind::Func => x.mode = Mode::Value,
            ObjKind::TypeName => x.mode = Mode::TypeExpr,
            _ => return false,
        }
        x.ty = ty;
        true
    }
}

/// Node that instance information is recorded on: the name of the
/// instantiated function.
fn instance_node(e: &Expr) -> NodeId {
    match &e.kind {
        ExprKind::Paren(inner) | ExprKind::Index(inner, _) => instance_node(inner),
        ExprKind::Selector(_, sel) => sel.id,
        _ => e.id,
    }
}
