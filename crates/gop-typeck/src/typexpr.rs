//! Type expressions: names, literals, instantiations and signatures.

use gop_ast::printer::expr_string;
use gop_ast::{Expr, ExprKind, Field, FuncType, Ident, InterfaceElem, NodeId};
use tracing::trace;

use crate::checker::Task;
use crate::checker::Checker;
use crate::config::{AliasMode, Feature};
use crate::error::{Fatal, Flow, TypeError};
use crate::objects::{ObjId, ObjKind, Object};
use crate::operand::{Mode, Operand};
use crate::predicates::{self, identical, type_set};
use crate::scope::{ScopeId, ScopeKind};
use crate::subst::{instantiate_named, subst, SubstMap};
use crate::types::{Interface, Method, Signature, StructField, Term, Type, TypeId, TypeParam};

impl<'a> Checker<'a> {
    // ── Identifiers ─────────────────────────────────────────────────────

    /// Evaluate the identifier `e`. Package-level objects are resolved on
    /// first use.
    pub(crate) fn ident(&mut self, x: &mut Operand<'a>, e: &'a Expr, name: &str, want_type: bool) -> Flow<()> {
        *x = Operand::invalid(Some(e));
        let Some(obj) = self.lookup(name) else {
            if name == "_" {
                self.error(TypeError::BlankUse { span: e.span });
            } else {
                self.error(TypeError::Undefined {
                    name: name.to_string(),
                    span: e.span,
                });
            }
            return Ok(());
        };
        if obj == self.universe.comparable_obj || obj == self.universe.any {
            if !self.version_ok(Feature::TypeParams, e.span) {
                return Ok(());
            }
        }
        self.record_use(e.id, obj);

        let kind = self.objects[obj].kind;
        let is_type = kind == ObjKind::TypeName;
        if !is_type && want_type {
            self.error(TypeError::NotAType {
                expr: name.to_string(),
                span: e.span,
            });
            if kind == ObjKind::Var {
                self.objects[obj].used = true;
            }
            return Ok(());
        }

        if self.objects[obj].ty.is_none() || (is_type && want_type) {
            self.obj_decl(obj)?;
        }
        let Some(ty) = self.objects[obj].ty else {
            return Err(Fatal::new(format!("{name} has no type after resolution"), e.span));
        };

        match kind {
            ObjKind::ModuleAlias => {
                self.objects[obj].used = true;
                self.error(TypeError::InvalidUse {
                    message: format!("use of package {name} not in selector"),
                    span: e.span,
                });
                return Ok(());
            }
            ObjKind::Const => {
                self.add_decl_dep(obj);
                if !ty.is_valid() {
                    return Ok(());
                }
                if obj == self.universe.iota {
                    let Some(iota) = self.env.iota.clone() else {
                        self.error(TypeError::InvalidUse {
                            message: "cannot use iota outside constant declaration".to_string(),
                            span: e.span,
                        });
                        return Ok(());
                    };
                    x.val = Some(iota);
                } else {
                    x.val = self.objects[obj].val.clone();
                }
                if x.val.is_none() {
                    return Ok(());
                }
                x.mode = Mode::Constant;
            }
            ObjKind::TypeName => {
                if self.config.alias_mode == AliasMode::Transparent && self.broken_aliases.contains(&obj) {
                    self.error(TypeError::InvalidTypeExpr {
                        message: format!("invalid use of type alias {name} in recursive type"),
                        span: e.span,
                    });
                    self.objects[obj].ty = Some(TypeId::INVALID);
                    return Ok(());
                }
                x.mode = Mode::TypeExpr;
            }
            ObjKind::Var => {
                if self.objects[obj].module.is_none() {
                    self.objects[obj].used = true;
                }
                self.add_decl_dep(obj);
                if !ty.is_valid() {
                    return Ok(());
                }
                x.mode = Mode::Variable;
            }
            ObjKind::Func => {
                self.add_decl_dep(obj);
                x.mode = Mode::Value;
            }
            ObjKind::Builtin(b) => x.mode = Mode::Builtin(b),
            ObjKind::Nil => x.mode = Mode::Value,
            ObjKind::Label => {
                self.error(TypeError::Undefined {
                    name: name.to_string(),
                    span: e.span,
                });
                return Ok(());
            }
        }
        x.ty = ty;
        Ok(())
    }

    // ── Type expressions ────────────────────────────────────────────────

    /// Evaluate `e` as a type. Reports and returns `invalid type` if it is
    /// not one.
    pub(crate) fn type_expr(&mut self, e: &'a Expr) -> Flow<TypeId> {
        self.typ(e, false)
    }

    /// Like [`Checker::type_expr`], but a generic type may be used without
    /// type arguments.
    pub(crate) fn generic_type(&mut self, e: &'a Expr) -> Flow<TypeId> {
        self.typ(e, true)
    }

    /// A type used for a variable, parameter or field. Constraint
    /// interfaces are not allowed there.
    pub(crate) fn var_type(&mut self, e: &'a Expr) -> Flow<TypeId> {
        let t = self.type_expr(e)?;
        self.valid_var_type(e, t);
        Ok(t)
    }

    fn valid_var_type(&mut self, e: &'a Expr, t: TypeId) {
        if self.types.is_type_param(t) || !self.types.is_interface(t) {
            return;
        }
        let set = type_set(&self.types, t);
        if !set.is_constraint_only() {
            return;
        }
        let why = if set.comparable && set.terms.is_none() {
            "interface is (or embeds) comparable"
        } else {
            "interface contains type constraints"
        };
        self.error(TypeError::InvalidTypeExpr {
            message: format!("cannot use type {} outside a type constraint: {why}", self.type_string(t)),
            span: e.span,
        });
    }

    fn typ(&mut self, e: &'a Expr, allow_generic: bool) -> Flow<TypeId> {
        let t = self.typ_internal(e, allow_generic)?;
        self.record_type_and_value(e, Mode::TypeExpr, t, None);
        Ok(t)
    }

    fn typ_internal(&mut self, e: &'a Expr, allow_generic: bool) -> Flow<TypeId> {
        match &e.kind {
            ExprKind::Bad => Ok(TypeId::INVALID),
            ExprKind::Ident(name) => {
                let mut x = Operand::invalid(Some(e));
                self.ident(&mut x, e, name, true)?;
                self.type_operand(&x, e, allow_generic)
            }
            ExprKind::Selector(base, sel) => {
                let mut x = Operand::invalid(Some(e));
                self.selector(&mut x, e, base, sel, true)?;
                self.type_operand(&x, e, allow_generic)
            }
            ExprKind::Index(base, indices) => self.instantiated_type(e, base, indices),
            ExprKind::Paren(inner) => self.typ_internal(inner, allow_generic),
            ExprKind::ArrayType(Some(len), elem) => {
                if let ExprKind::Ellipsis(None) = len.kind {
                    self.error(TypeError::InvalidTypeExpr {
                        message: "invalid use of [...] array (outside a composite literal)".to_string(),
                        span: len.span,
                    });
                    self.var_type(elem)?;
                    return Ok(TypeId::INVALID);
                }
                let n = self.array_length(len)?;
                let elem = self.var_type(elem)?;
                Ok(match n {
                    Some(n) => self.types.array(elem, n),
                    None => TypeId::INVALID,
                })
            }
            ExprKind::ArrayType(None, elem) => {
                let elem = self.var_type(elem)?;
                Ok(self.types.slice(elem))
            }
            ExprKind::Ellipsis(_) => {
                self.error(TypeError::InvalidTypeExpr {
                    message: "invalid use of ...".to_string(),
                    span: e.span,
                });
                Ok(TypeId::INVALID)
            }
            ExprKind::Star(base) => {
                let base = self.var_type(base)?;
                if !base.is_valid() {
                    return Ok(TypeId::INVALID);
                }
                Ok(self.types.pointer(base))
            }
            ExprKind::FuncType(ft) => {
                let (sig, _) = self.func_type(e.id, ft, None)?;
                Ok(sig)
            }
            ExprKind::InterfaceType(elems) => self.interface_type(elems, false),
            ExprKind::MapType(key, value) => {
                let k = self.var_type(key)?;
                let v = self.var_type(value)?;
                if k.is_valid() {
                    self.later(Task::CheckMapKey { key: k, span: key.span });
                }
                Ok(self.types.map(k, v))
            }
            ExprKind::ChanType(dir, elem) => {
                let elem = self.var_type(elem)?;
                Ok(self.types.chan(*dir, elem))
            }
            ExprKind::StructType(fields) => self.struct_type(fields),
            ExprKind::Union(_) => {
                self.error(TypeError::InvalidTypeExpr {
                    message: format!("cannot use {} outside a type constraint", expr_string(e)),
                    span: e.span,
                });
                Ok(TypeId::INVALID)
            }
            _ => {
                self.error(TypeError::NotAType {
                    expr: expr_string(e),
                    span: e.span,
                });
                Ok(TypeId::INVALID)
            }
        }
    }

    fn type_operand(&mut self, x: &Operand<'a>, e: &'a Expr, allow_generic: bool) -> Flow<TypeId> {
        match x.mode {
            Mode::Invalid => Ok(TypeId::INVALID),
            Mode::TypeExpr => {
                if !allow_generic && self.is_generic(x.ty) {
                    self.error(TypeError::GenericWithoutInstantiation {
                        what: "type".to_string(),
                        name: self.generic_type_string(x.ty),
                        span: e.span,
                    });
                    return Ok(TypeId::INVALID);
                }
                Ok(x.ty)
            }
            _ => {
                self.error(TypeError::NotAType {
                    expr: x.text(),
                    span: e.span,
                });
                Ok(TypeId::INVALID)
            }
        }
    }

    /// A defined type with type parameters and no type arguments.
    pub(crate) fn is_generic(&self, t: TypeId) -> bool {
        self.types
            .named(self.types.unalias(t))
            .is_some_and(|n| !n.type_params.is_empty() && n.origin.is_none())
    }

    /// `List[T any]`
    pub(crate) fn generic_type_string(&self, t: TypeId) -> String {
        let t = self.types.unalias(t);
        let Some(n) = self.types.named(t) else {
            return self.type_string(t);
        };
        let params: Vec<String> = n
            .type_params
            .iter()
            .map(|p| {
                let bound = self.types.type_param(*p).map(|tp| tp.bound).unwrap_or(TypeId::ANY);
                format!("{} {}", self.type_string(*p), self.type_string(bound))
            })
            .collect();
        format!("{}[{}]", n.name, params.join(", "))
    }

    // ── Instantiation ───────────────────────────────────────────────────

    pub(crate) fn instantiated_type(&mut self, e: &'a Expr, base: &'a Expr, indices: &'a [Expr]) -> Flow<TypeId> {
        let gtyp = self.generic_type(base)?;
        if !gtyp.is_valid() {
            return Ok(TypeId::INVALID);
        }
        if !self.is_generic(gtyp) {
            self.error(TypeError::InvalidTypeExpr {
                message: format!("{} is not a generic type", expr_string(base)),
                span: base.span,
            });
            return Ok(TypeId::INVALID);
        }
        if !self.version_ok(Feature::TypeParams, e.span) {
            return Ok(TypeId::INVALID);
        }
        let mut targs = Vec::with_capacity(indices.len());
        for idx in indices {
            let t = self.var_type(idx)?;
            if !t.is_valid() {
                return Ok(TypeId::INVALID);
            }
            targs.push(t);
        }
        let origin = self.types.unalias(gtyp);
        let (name, tparams) = match self.types.named(origin) {
            Some(n) => (n.name.clone(), n.type_params.clone()),
            None => return Ok(TypeId::INVALID),
        };
        if targs.len() != tparams.len() {
            self.error(TypeError::TypeArgCount {
                got: targs.len(),
                want: tparams.len(),
                name,
                span: e.span,
            });
            return Ok(TypeId::INVALID);
        }
        let inst = instantiate_named(&mut self.types, origin, targs.clone());
        trace!(instance = %self.type_string(inst), "instantiated type");
        self.record_instance(e.id, targs.clone(), inst);
        self.later(Task::VerifyInstance {
            span: e.span,
            tparams,
            targs,
        });
        Ok(inst)
    }

    // ── Composite type literals ─────────────────────────────────────────

    /// Length of an array type, or `None` after reporting why it is invalid.
    pub(crate) fn array_length(&mut self, e: &'a Expr) -> Flow<Option<u64>> {
        if let ExprKind::Ident(name) = &e.kind {
            match self.lookup(name).map(|o| self.objects[o].kind) {
                None => {
                    self.error(TypeError::InvalidArrayLength {
                        message: format!("undefined array length {name} or missing type constraint"),
                        span: e.span,
                    });
                    return Ok(None);
                }
                Some(ObjKind::Const) => {}
                Some(_) => {
                    self.error(TypeError::InvalidArrayLength {
                        message: format!("invalid array length {name}"),
                        span: e.span,
                    });
                    return Ok(None);
                }
            }
        }
        let x = self.expr(e)?;
        if x.mode != Mode::Constant {
            if !x.is_invalid() {
                self.error(TypeError::InvalidArrayLength {
                    message: format!("array length {} must be constant", self.describe(&x)),
                    span: e.span,
                });
            }
            return Ok(None);
        }
        if self.types.is_untyped(x.ty) || self.types.is_integer(x.ty) {
            if let Some(n) = x.val.as_ref().and_then(|v| v.to_int()) {
                if (0..=i64::MAX as i128).contains(&n) {
                    return Ok(Some(n as u64));
                }
            }
        }
        let message = if self.types.is_integer(x.ty) {
            format!("invalid array length {}", self.describe(&x))
        } else {
            format!("array length {} must be integer", self.describe(&x))
        };
        self.error(TypeError::InvalidArrayLength { message, span: e.span });
        Ok(None)
    }

    fn struct_type(&mut self, fields: &'a [Field]) -> Flow<TypeId> {
        let mut out: Vec<StructField> = Vec::new();
        let mut seen: Vec<(String, gop_common::Span)> = Vec::new();
        for f in fields {
            let ty = self.var_type(&f.ty)?;
            if f.names.is_empty() {
                let Some(name) = embedded_name(&f.ty) else {
                    self.error(TypeError::InvalidTypeExpr {
                        message: format!("invalid embedded field type {}", expr_string(&f.ty)),
                        span: f.ty.span,
                    });
                    continue;
                };
                self.check_embedded(&f.ty, ty);
                let obj = self.field_object(name, f.ty.span, ty, true);
                self.record_implicit(f.ty.id, obj);
                self.add_field(&mut out, &mut seen, name, f.ty.span, ty, obj, true);
            } else {
                for ident in &f.names {
                    let obj = self.field_object(&ident.name, ident.span, ty, false);
                    self.record_def(ident, obj);
                    self.add_field(&mut out, &mut seen, &ident.name, ident.span, ty, obj, false);
                }
            }
        }
        Ok(self.types.intern(Type::Struct(out)))
    }

    fn field_object(&mut self, name: &str, span: gop_common::Span, ty: TypeId, embedded: bool) -> ObjId {
        let mut obj = Object::typed(ObjKind::Var, name, span, ty);
        obj.is_field = true;
        obj.embedded = embedded;
        obj.used = true;
        self.new_object(obj)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_field(
        &mut self,
        out: &mut Vec<StructField>,
        seen: &mut Vec<(String, gop_common::Span)>,
        name: &str,
        span: gop_common::Span,
        ty: TypeId,
        obj: ObjId,
        embedded: bool,
    ) {
        if name != "_" {
            if let Some((_, prev)) = seen.iter().find(|(n, _)| n == name) {
                self.error(TypeError::Redeclared {
                    name: name.to_string(),
                    span,
                    prev: *prev,
                });
                return;
            }
            seen.push((name.to_string(), span));
        }
        out.push(StructField {
            name: name.to_string(),
            ty,
            embedded,
            obj,
        });
    }

    fn check_embedded(&mut self, e: &'a Expr, ty: TypeId) {
        let (base, is_ptr) = match self.types.get(ty) {
            Type::Pointer(b) => (*b, true),
            _ => (ty, false),
        };
        if !base.is_valid() {
            return;
        }
        let message = if self.types.is_type_param(base) {
            Some("embedded field type cannot be a (pointer to a) type parameter")
        } else {
            match self.types.get(self.types.underlying(base)) {
                Type::Pointer(_) => Some("embedded field type cannot be a pointer"),
                Type::Interface(_) if is_ptr => Some("embedded field type cannot be a pointer to an interface"),
                _ => None,
            }
        };
        if let Some(message) = message {
            self.error(TypeError::InvalidTypeExpr {
                message: message.to_string(),
                span: e.span,
            });
        }
    }

    // ── Signatures ──────────────────────────────────────────────────────

    /// Check a function type, declaring its receiver, type parameters and
    /// parameters in a new function scope. Returns the signature and the
    /// scope, which becomes the parent of the body.
    pub(crate) fn func_type(
        &mut self,
        node: NodeId,
        ft: &'a FuncType,
        recv: Option<&'a Field>,
    ) -> Flow<(TypeId, ScopeId)> {
        let scope = self.open_scope(node, ScopeKind::Func, ft.span);
        let result = self.func_type_in(ft, recv, scope);
        self.close_scope();
        Ok((result?, scope))
    }

    fn func_type_in(&mut self, ft: &'a FuncType, recv: Option<&'a Field>, scope: ScopeId) -> Flow<TypeId> {
        let mut sig = Signature::default();
        let mut recv_var: Option<(ObjId, Option<&'a Ident>)> = None;
        if let Some(field) = recv {
            let (obj, rparams) = self.collect_recv(field, scope)?;
            sig.recv = self.objects[obj].ty;
            sig.recv_type_params = rparams;
            recv_var = Some((obj, field.names.first()));
        }
        if !ft.type_params.is_empty() {
            if recv.is_some() {
                self.error(TypeError::InvalidDecl {
                    message: "methods cannot have type parameters".to_string(),
                    span: ft.type_params[0].span,
                });
            }
            sig.type_params = self.collect_type_params(&ft.type_params, scope)?;
        }
        let (params, variadic) = self.collect_params(&ft.params, true)?;
        let (results, _) = self.collect_params(&ft.results, false)?;

        if let Some((obj, ident)) = recv_var {
            self.declare(scope, ident, obj);
        }
        for (obj, ident) in params.iter().chain(&results) {
            match ident {
                Some(_) => self.declare(scope, *ident, *obj),
                None => self.objects[*obj].scope = Some(scope),
            }
        }
        self.func_results.insert(scope, results.iter().map(|(o, _)| *o).collect());
        sig.params = params.iter().map(|(o, _)| self.objects[*o].ty_or_invalid()).collect();
        sig.results = results.iter().map(|(o, _)| self.objects[*o].ty_or_invalid()).collect();
        sig.variadic = variadic;
        Ok(self.types.signature(sig))
    }

    fn param_object(&mut self, name: &str, span: gop_common::Span, ty: TypeId) -> ObjId {
        let mut obj = Object::typed(ObjKind::Var, name, span, ty);
        obj.is_param = true;
        self.new_object(obj)
    }

    /// Parameter objects with their declaring identifiers, and whether the
    /// last parameter is variadic.
    #[allow(clippy::type_complexity)]
    fn collect_params(
        &mut self,
        fields: &'a [Field],
        variadic_ok: bool,
    ) -> Flow<(Vec<(ObjId, Option<&'a Ident>)>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        for (i, f) in fields.iter().enumerate() {
            let mut ftype = &f.ty;
            let mut dots = false;
            if let ExprKind::Ellipsis(Some(elem)) = &f.ty.kind {
                ftype = elem;
                if variadic_ok && i == fields.len() - 1 && f.names.len() <= 1 {
                    dots = true;
                    variadic = true;
                } else {
                    self.error(TypeError::InvalidTypeExpr {
                        message: "can only use ... with final parameter in list".to_string(),
                        span: f.ty.span,
                    });
                }
            }
            let mut ty = self.var_type(ftype)?;
            if dots {
                ty = self.types.slice(ty);
                self.record_type_and_value(&f.ty, Mode::TypeExpr, ty, None);
            }
            if f.names.is_empty() {
                let obj = self.param_object("", ftype.span, ty);
                self.record_implicit(f.ty.id, obj);
                params.push((obj, None));
            } else {
                for ident in &f.names {
                    let obj = self.param_object(&ident.name, ident.span, ty);
                    params.push((obj, Some(ident)));
                }
            }
        }
        Ok((params, variadic))
    }

    /// Check a receiver `r T`, `r *T` or `r *T[P]`. Receiver type
    /// parameters are declared in `scope` with the bounds of the base
    /// type's parameters.
    fn collect_recv(&mut self, field: &'a Field, scope: ScopeId) -> Flow<(ObjId, Vec<TypeId>)> {
        let (base_expr, is_ptr) = match &field.ty.unparen().kind {
            ExprKind::Star(b) => (b.as_ref(), true),
            _ => (&field.ty, false),
        };
        let mut rparams = Vec::new();
        let recv_ty = match &base_expr.unparen().kind {
            ExprKind::Index(gen, args) => {
                let base = self.generic_type(gen)?;
                let origin = self.types.unalias(base);
                let tparams = self.types.named(origin).map(|n| n.type_params.clone()).unwrap_or_default();
                if !base.is_valid() || tparams.is_empty() {
                    if base.is_valid() {
                        self.error(TypeError::InvalidReceiver {
                            message: format!("{} (not a generic type)", expr_string(gen)),
                            span: gen.span,
                        });
                    }
                    TypeId::INVALID
                } else if args.len() != tparams.len() {
                    self.error(TypeError::TypeArgCount {
                        got: args.len(),
                        want: tparams.len(),
                        name: expr_string(gen),
                        span: base_expr.span,
                    });
                    TypeId::INVALID
                } else {
                    for (i, arg) in args.iter().enumerate() {
                        let name = arg.as_ident().unwrap_or("_");
                        let obj = self.new_object(Object::new(ObjKind::TypeName, name, arg.span));
                        let tp = self.types.add(Type::TypeParam(TypeParam {
                            name: name.to_string(),
                            obj,
                            index: i,
                            bound: TypeId::INVALID,
                        }));
                        self.objects[obj].ty = Some(tp);
                        self.objects.mark_black(obj);
                        if arg.as_ident().is_none() {
                            self.error(TypeError::InvalidReceiver {
                                message: format!("{} (receiver type parameter must be an identifier)", expr_string(arg)),
                                span: arg.span,
                            });
                        }
                        self.declare(scope, None, obj);
                        self.record_type_and_value(arg, Mode::TypeExpr, tp, None);
                        rparams.push(tp);
                    }
                    let smap = SubstMap::new(&tparams, &rparams);
                    for (orig, new) in tparams.iter().zip(&rparams) {
                        let bound = self.types.type_param(*orig).map(|p| p.bound).unwrap_or(TypeId::ANY);
                        let bound = subst(&mut self.types, bound, &smap);
                        if let Type::TypeParam(p) = self.types.get_mut(*new) {
                            p.bound = bound;
                        }
                    }
                    let inst = instantiate_named(&mut self.types, origin, rparams.clone());
                    self.record_type_and_value(base_expr, Mode::TypeExpr, inst, None);
                    inst
                }
            }
            _ => self.generic_type(base_expr)?,
        };
        let ty = if is_ptr && recv_ty.is_valid() {
            self.types.pointer(recv_ty)
        } else {
            recv_ty
        };
        if recv_ty.is_valid() && rparams.is_empty() && self.is_generic(recv_ty) {
            self.error(TypeError::GenericWithoutInstantiation {
                what: "type".to_string(),
                name: self.generic_type_string(recv_ty),
                span: base_expr.span,
            });
        }
        let (name, span) = match field.names.first() {
            Some(ident) => (ident.name.as_str(), ident.span),
            None => ("", field.ty.span),
        };
        let obj = self.param_object(name, span, ty);
        self.valid_recv(field.ty.span, ty);
        Ok((obj, rparams))
    }

    fn valid_recv(&mut self, span: gop_common::Span, recv: TypeId) {
        let base = match self.types.get(recv) {
            Type::Pointer(b) => *b,
            _ => recv,
        };
        let base = self.types.unalias(base);
        if !base.is_valid() {
            return;
        }
        match self.types.get(base) {
            Type::Named(n) => {
                if n.module.is_some() || self.objects[n.obj].scope == Some(self.universe.scope) {
                    self.error(TypeError::InvalidDecl {
                        message: format!("cannot define new methods on non-local type {}", self.type_string(base)),
                        span,
                    });
                    return;
                }
                let under = self.types.underlying(base);
                if matches!(self.types.get(under), Type::Pointer(_) | Type::Interface(_)) {
                    self.error(TypeError::InvalidReceiver {
                        message: format!("{} (pointer or interface type)", self.type_string(base)),
                        span,
                    });
                }
            }
            Type::Basic(_) => self.error(TypeError::InvalidDecl {
                message: format!("cannot define new methods on non-local type {}", self.type_string(base)),
                span,
            }),
            _ => self.error(TypeError::InvalidReceiver {
                message: self.type_string(recv),
                span,
            }),
        }
    }

    /// Declare the type parameters of a generic function or type in
    /// `scope` and resolve their constraints.
    pub(crate) fn collect_type_params(&mut self, fields: &'a [Field], scope: ScopeId) -> Flow<Vec<TypeId>> {
        let tparams = self.declare_type_params(fields, scope);
        self.resolve_bounds(fields, &tparams, scope)?;
        Ok(tparams)
    }

    /// Declare type parameters with unresolved bounds. A generic type
    /// publishes them before its constraints are checked so the
    /// constraints may refer to the type itself.
    pub(crate) fn declare_type_params(&mut self, fields: &'a [Field], scope: ScopeId) -> Vec<TypeId> {
        if let Some(first) = fields.first() {
            self.version_ok(Feature::TypeParams, first.span);
        }
        let mut tparams = Vec::new();
        for f in fields {
            for ident in &f.names {
                let obj = self.new_object(Object::new(ObjKind::TypeName, ident.name.as_str(), ident.span));
                let tp = self.types.add(Type::TypeParam(TypeParam {
                    name: ident.name.clone(),
                    obj,
                    index: tparams.len(),
                    bound: TypeId::INVALID,
                }));
                self.objects[obj].ty = Some(tp);
                self.objects.mark_black(obj);
                self.declare(scope, Some(ident), obj);
                tparams.push(tp);
            }
        }
        tparams
    }

    pub(crate) fn resolve_bounds(&mut self, fields: &'a [Field], tparams: &[TypeId], scope: ScopeId) -> Flow<()> {
        let saved = std::mem::replace(&mut self.env.in_tparam_list, true);
        let saved_scope = std::mem::replace(&mut self.env.scope, scope);
        let result = self.resolve_bounds_in(fields, tparams);
        self.env.in_tparam_list = saved;
        self.env.scope = saved_scope;
        result
    }

    fn resolve_bounds_in(&mut self, fields: &'a [Field], tparams: &[TypeId]) -> Flow<()> {
        let mut index = 0;
        for f in fields {
            let mut bound = self.bound(&f.ty)?;
            if self.types.is_type_param(bound) {
                self.error(TypeError::InvalidTypeExpr {
                    message: "cannot use a type parameter as constraint".to_string(),
                    span: f.ty.span,
                });
                bound = TypeId::INVALID;
            }
            let end = (index + f.names.len()).min(tparams.len());
            for tp in &tparams[index..end] {
                if let Type::TypeParam(p) = self.types.get_mut(*tp) {
                    p.bound = bound;
                }
            }
            index = end;
        }
        Ok(())
    }

    /// A constraint. A bare union `~int | string` or a plain type `int` is
    /// an implicit interface.
    fn bound(&mut self, e: &'a Expr) -> Flow<TypeId> {
        let embedded = match &e.kind {
            ExprKind::Union(terms) => self.union(e, terms)?,
            _ => {
                let t = self.type_expr(e)?;
                if !t.is_valid() || self.types.is_interface(t) || self.types.is_type_param(t) {
                    return Ok(t);
                }
                self.types.intern(Type::Union(vec![Term { tilde: false, ty: t }]))
            }
        };
        let iface = self.types.intern(Type::Interface(Interface {
            embedded: vec![embedded],
            implicit: true,
            ..Interface::default()
        }));
        self.record_type_and_value(e, Mode::TypeExpr, iface, None);
        Ok(iface)
    }

    // ── Interfaces and unions ───────────────────────────────────────────

    fn interface_type(&mut self, elems: &'a [InterfaceElem], implicit: bool) -> Flow<TypeId> {
        let mut iface = Interface {
            implicit,
            ..Interface::default()
        };
        for elem in elems {
            match elem {
                InterfaceElem::Method { name, sig } => {
                    if !sig.type_params.is_empty() {
                        self.error(TypeError::InvalidDecl {
                            message: "interface method must have no type parameters".to_string(),
                            span: sig.type_params[0].span,
                        });
                    }
                    let (ty, _) = self.func_type(name.id, sig, None)?;
                    if name.name == "_" {
                        self.error(TypeError::InvalidDecl {
                            message: "methods must have a unique non-blank name".to_string(),
                            span: name.span,
                        });
                        continue;
                    }
                    if let Some(prev) = iface.methods.iter().find(|m| m.name == name.name) {
                        let prev = prev.obj.map(|o| self.objects[o].span).unwrap_or_default();
                        self.error(TypeError::Redeclared {
                            name: name.name.clone(),
                            span: name.span,
                            prev,
                        });
                        continue;
                    }
                    let obj = self.new_object(Object::typed(ObjKind::Func, name.name.as_str(), name.span, ty));
                    self.record_def(name, obj);
                    iface.methods.push(Method {
                        name: name.name.clone(),
                        sig: ty,
                        obj: Some(obj),
                    });
                }
                InterfaceElem::Embedded(e) => {
                    let t = match &e.kind {
                        ExprKind::Union(terms) => self.union(e, terms)?,
                        _ => {
                            let t = self.type_expr(e)?;
                            if t.is_valid() && self.types.is_type_param(t) {
                                self.error(TypeError::InvalidTypeExpr {
                                    message: "term cannot be a type parameter".to_string(),
                                    span: e.span,
                                });
                                continue;
                            }
                            t
                        }
                    };
                    if t.is_valid() {
                        iface.embedded.push(t);
                    }
                }
            }
        }
        Ok(self.types.add(Type::Interface(iface)))
    }

    fn union(&mut self, e: &'a Expr, terms: &'a [gop_ast::Term]) -> Flow<TypeId> {
        let mut out: Vec<Term> = Vec::with_capacity(terms.len());
        for term in terms {
            let t = self.type_expr(&term.ty)?;
            if !t.is_valid() {
                continue;
            }
            if self.types.is_type_param(t) {
                self.error(TypeError::InvalidTypeExpr {
                    message: "term cannot be a type parameter".to_string(),
                    span: term.ty.span,
                });
                continue;
            }
            let u = self.types.underlying(t);
            if term.tilde && !identical(&self.types, t, u) {
                self.error(TypeError::InvalidTypeExpr {
                    message: format!(
                        "invalid use of ~ (underlying type of {} is {})",
                        self.type_string(t),
                        self.type_string(u)
                    ),
                    span: term.ty.span,
                });
                continue;
            }
            if terms.len() > 1 && self.types.is_interface(t) && !type_set(&self.types, t).methods.is_empty() {
                self.error(TypeError::InvalidTypeExpr {
                    message: format!(
                        "cannot use {} in union ({} contains methods)",
                        expr_string(&term.ty),
                        self.type_string(t)
                    ),
                    span: term.ty.span,
                });
                continue;
            }
            let new = Term { tilde: term.tilde, ty: t };
            if let Some(prev) = out.iter().find(|p| self.terms_overlap(p, &new)) {
                let prev = predicates::terms_string(&self.types, &[*prev]);
                self.error(TypeError::InvalidTypeExpr {
                    message: format!(
                        "overlapping terms {} and {prev}",
                        predicates::terms_string(&self.types, &[new])
                    ),
                    span: term.ty.span,
                });
                continue;
            }
            out.push(new);
        }
        let u = self.types.intern(Type::Union(out));
        self.record_type_and_value(e, Mode::TypeExpr, u, None);
        Ok(u)
    }

    fn terms_overlap(&self, a: &Term, b: &Term) -> bool {
        if self.types.is_interface(a.ty) || self.types.is_interface(b.ty) {
            return false;
        }
        let (ua, ub) = (self.types.underlying(a.ty), self.types.underlying(b.ty));
        match (a.tilde, b.tilde) {
            (false, false) => identical(&self.types, a.ty, b.ty),
            (true, true) => identical(&self.types, ua, ub),
            (true, false) => identical(&self.types, ua, ub),
            (false, true) => identical(&self.types, ua, ub),
        }
    }
}

/// Field name of an embedded field `T`, `*T`, `m.T` or `T[A]`.
fn embedded_name(e: &Expr) -> Option<&str> {
    match &e.unparen().kind {
        ExprKind::Ident(name) => Some(name),
        ExprKind::Star(inner) => match &inner.unparen().kind {
            ExprKind::Star(_) => None,
            _ => embedded_name(inner),
        },
        ExprKind::Selector(_, sel) => Some(&sel.name),
        ExprKind::Index(base, _) => embedded_name(base),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gop_ast::AstBuilder;

    #[test]
    fn embedded_field_names() {
        let b = AstBuilder::new();
        assert_eq!(embedded_name(&b.name("Node")), Some("Node"));
        assert_eq!(embedded_name(&b.star(b.name("Node"))), Some("Node"));
        assert_eq!(embedded_name(&b.sel(b.name("m"), "Reader")), Some("Reader"));
        assert_eq!(
            embedded_name(&b.instantiate(b.name("List"), vec![b.name("int")])),
            Some("List")
        );
        assert_eq!(embedded_name(&b.star(b.star(b.name("T")))), None);
        assert_eq!(embedded_name(&b.slice_ty(b.name("T"))), None);
    }
}
