//! Declarations: collecting package objects and resolving them in
//! dependency order.
//!
//! Every package-level object starts White. [`Checker::obj_decl`] turns it
//! Grey while its declaration is being checked and Black when done; meeting
//! a Grey object again means the declaration refers to itself, which is
//! classified by [`Checker::valid_cycle`].

use gop_ast::{Decl, Expr, ExprKind, FuncDecl, GenDecl, Ident, TypeSpec, ValueSpec};
use gop_common::Span;
use tracing::{debug, trace};

use crate::checker::{Checker, DeclInfo, DeclKind, Env, Task};
use crate::config::AliasMode;
use crate::constant::Value;
use crate::error::{Fatal, Flow, TypeError};
use crate::objects::{Color, ObjId, ObjKind, Object};
use crate::operand::{Mode, Operand};
use crate::scope::ScopeKind;
use crate::subst::expand_pending;
use crate::types::{Alias, Named, Type, TypeId};

impl<'a> Checker<'a> {
    // ── Collection ──────────────────────────────────────────────────────

    /// Declare every package-level object and remember its declaration.
    pub(crate) fn collect_objects(&mut self) -> Flow<()> {
        let files = self.files;
        let mut methods: Vec<(ObjId, &'a FuncDecl)> = Vec::new();

        for (fi, file) in files.iter().enumerate() {
            let file_scope = self.scopes.push(Some(self.pkg_scope), ScopeKind::File, file.span);
            self.file_scopes.push(file_scope);
            for spec in &file.imports {
                self.import(file_scope, spec);
            }
            for decl in &file.decls {
                match decl {
                    Decl::Gen(GenDecl::Const(specs)) => self.collect_consts(fi, specs),
                    Decl::Gen(GenDecl::Var(specs)) => {
                        for spec in specs {
                            self.collect_vars(fi, spec);
                        }
                    }
                    Decl::Gen(GenDecl::Type(specs)) => {
                        for spec in specs {
                            let mut obj = Object::new(ObjKind::TypeName, spec.name.name.as_str(), spec.name.span);
                            obj.is_alias = spec.alias;
                            let id = self.declare_pkg(&spec.name, obj);
                            self.decls.insert(id, DeclInfo::new(fi, DeclKind::Type { spec }));
                        }
                    }
                    Decl::Func(fd) => {
                        let id = self.collect_func(fi, fd);
                        if fd.recv.is_some() {
                            methods.push((id, fd));
                        }
                    }
                }
            }
        }

        for (id, fd) in methods {
            self.associate_method(id, fd);
        }

        // A file-scope import must not shadow a package-level name.
        for fs in self.file_scopes.clone() {
            for imp in self.scopes.get(fs).objects().to_vec() {
                let name = self.objects[imp].name.clone();
                if let Some(other) = self.scopes.lookup_local(self.pkg_scope, &name) {
                    self.error(TypeError::Redeclared {
                        name,
                        span: self.objects[other].span,
                        prev: self.objects[imp].span,
                    });
                }
            }
        }
        Ok(())
    }

    fn declare_pkg(&mut self, ident: &Ident, mut obj: Object) -> ObjId {
        obj.pkg_level = true;
        let id = self.new_object(obj);
        self.declare(self.pkg_scope, Some(ident), id);
        self.pkg_objects.push(id);
        id
    }

    fn collect_consts(&mut self, fi: usize, specs: &'a [ValueSpec]) {
        let mut last: Option<&'a ValueSpec> = None;
        for (iota, spec) in specs.iter().enumerate() {
            let inherited = spec.ty.is_none() && spec.values.is_empty();
            let src = if inherited { last.unwrap_or(spec) } else { spec };
            if !inherited {
                last = Some(spec);
            }
            for (i, name) in spec.names.iter().enumerate() {
                let obj = Object::new(ObjKind::Const, name.name.as_str(), name.span);
                let id = self.declare_pkg(name, obj);
                let kind = DeclKind::Const {
                    ty: src.ty.as_ref(),
                    init: src.values.get(i),
                    iota: iota as i128,
                };
                self.decls.insert(id, DeclInfo::new(fi, kind));
            }
            self.value_spec_arity(spec, src, true);
        }
    }

    fn collect_vars(&mut self, fi: usize, spec: &'a ValueSpec) {
        let ids: Vec<ObjId> = spec
            .names
            .iter()
            .map(|name| self.declare_pkg(name, Object::new(ObjKind::Var, name.name.as_str(), name.span)))
            .collect();
        let shared = spec.values.len() == 1 && ids.len() > 1;
        for (i, id) in ids.iter().enumerate() {
            let kind = if shared {
                DeclKind::Var {
                    ty: spec.ty.as_ref(),
                    init: spec.values.first(),
                    lhs: Some(ids.clone()),
                }
            } else {
                DeclKind::Var {
                    ty: spec.ty.as_ref(),
                    init: spec.values.get(i),
                    lhs: None,
                }
            };
            self.decls.insert(*id, DeclInfo::new(fi, kind));
        }
        if !shared {
            self.value_spec_arity(spec, spec, false);
        }
    }

    /// Report a name/value count mismatch in `spec`, whose values come
    /// from `src` for inherited constant specs.
    fn value_spec_arity(&mut self, spec: &ValueSpec, src: &ValueSpec, constant: bool) {
        let (names, values) = (spec.names.len(), src.values.len());
        if values == 0 {
            if constant && spec.ty.is_some() {
                if let Some(n) = spec.names.first() {
                    self.error(TypeError::InvalidDecl {
                        message: format!("missing init expr for {}", n.name),
                        span: n.span,
                    });
                }
            } else if !constant && spec.ty.is_none() {
                self.error(TypeError::InvalidDecl {
                    message: "missing type or init expr".to_string(),
                    span: spec.span,
                });
            }
            return;
        }
        if names > values {
            self.error(TypeError::InvalidDecl {
                message: format!("missing init expr for {}", spec.names[values].name),
                span: spec.names[values].span,
            });
        } else if names < values {
            let span = if std::ptr::eq(spec, src) { src.values[names].span } else { spec.span };
            self.error(TypeError::InvalidDecl {
                message: "extra init expr".to_string(),
                span,
            });
        }
    }

    fn collect_func(&mut self, fi: usize, fd: &'a FuncDecl) -> ObjId {
        let mut obj = Object::new(ObjKind::Func, fd.name.name.as_str(), fd.name.span);
        obj.pkg_level = true;
        let id = if fd.recv.is_some() {
            let id = self.new_object(obj);
            self.record_def(&fd.name, id);
            self.pkg_objects.push(id);
            id
        } else if fd.name.name == "init" {
            // init functions cannot be referred to
            obj.used = true;
            let id = self.new_object(obj);
            self.record_def(&fd.name, id);
            self.pkg_objects.push(id);
            id
        } else {
            self.declare_pkg(&fd.name, obj)
        };
        self.decls.insert(id, DeclInfo::new(fi, DeclKind::Func { decl: fd }));
        id
    }

    /// Attach a method to its receiver base type, reporting duplicates.
    fn associate_method(&mut self, method: ObjId, fd: &'a FuncDecl) {
        let Some(recv) = &fd.recv else {
            return;
        };
        let Some(base_name) = receiver_base(&recv.ty) else {
            return;
        };
        let Some(base) = self.scopes.lookup_local(self.pkg_scope, base_name) else {
            return;
        };
        if self.objects[base].kind != ObjKind::TypeName || self.objects[base].is_alias {
            return;
        }
        let name = fd.name.name.clone();
        if name == "_" {
            return;
        }
        let prev = self
            .methods
            .get(&base)
            .and_then(|ms| ms.iter().copied().find(|m| self.objects[*m].name == name));
        if let Some(prev) = prev {
            self.error(TypeError::Redeclared {
                name: format!("{base_name}.{name}"),
                span: fd.name.span,
                prev: self.objects[prev].span,
            });
            return;
        }
        self.methods.entry(base).or_default().push(method);
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Resolve all package-level objects. Defined types go first so that
    /// aliases and values see them complete.
    pub(crate) fn package_objects(&mut self) -> Flow<()> {
        let objs = self.pkg_objects.clone();
        let is_type = |c: &Self, o: ObjId| c.objects[o].kind == ObjKind::TypeName;
        let (types, rest): (Vec<ObjId>, Vec<ObjId>) = objs.into_iter().partition(|o| is_type(self, *o));
        let (aliases, defined): (Vec<ObjId>, Vec<ObjId>) =
            types.into_iter().partition(|o| self.objects[*o].is_alias);

        for obj in defined.into_iter().chain(aliases).chain(rest) {
            self.obj_decl(obj)?;
        }
        self.settle_underlying();
        expand_pending(&mut self.types);
        self.check_type_validity()?;
        Ok(())
    }

    /// Type-check the declaration of `obj` if it has not been checked yet.
    pub(crate) fn obj_decl(&mut self, obj: ObjId) -> Flow<()> {
        match self.objects[obj].color {
            Color::Black => return Ok(()),
            Color::White if self.objects[obj].ty.is_some() => {
                self.objects.mark_black(obj);
                return Ok(());
            }
            Color::White => {}
            Color::Grey(_) => {
                self.grey_object(obj);
                return Ok(());
            }
        }
        let Some(info) = self.decls.get(&obj) else {
            // Local objects are declared and resolved in one step. Only a
            // local alias that refers to itself gets here.
            if self.objects[obj].ty.is_none() {
                self.objects[obj].ty = Some(TypeId::INVALID);
            }
            self.objects.mark_black(obj);
            return Ok(());
        };
        let file = info.file;
        let kind = info.kind.clone();

        let index = self.resolution_stack.len();
        self.objects.mark_grey(obj, index);
        self.resolution_stack.push(obj);
        trace!(name = %self.objects[obj].name, depth = index, "resolving");

        let saved = std::mem::replace(
            &mut self.env,
            Env {
                scope: self.file_scopes.get(file).copied().unwrap_or(self.pkg_scope),
                decl: Some(obj),
                file,
                ..Env::default()
            },
        );
        let result = match kind {
            DeclKind::Const { ty, init, iota } => {
                self.env.iota = Some(Value::Int(iota));
                self.const_decl(obj, ty, init)
            }
            DeclKind::Var { ty, init, lhs } => self.var_decl(obj, ty, init, lhs),
            DeclKind::Type { spec } => self.type_decl(obj, spec),
            DeclKind::Func { decl } => self.func_decl(obj, decl),
        };
        self.env = saved;

        if self.resolution_stack.pop() != Some(obj) {
            return Err(Fatal::new(
                format!("resolution stack out of order at {}", self.objects[obj].name),
                self.objects[obj].span,
            ));
        }
        self.objects.mark_black(obj);
        result
    }

    /// `obj` was reached again while its own declaration is being checked.
    fn grey_object(&mut self, obj: ObjId) {
        let valid = self.valid_cycle(obj);
        match self.objects[obj].kind {
            ObjKind::Const | ObjKind::Var => {
                if !valid || self.objects[obj].ty.is_none() {
                    self.objects[obj].ty = Some(TypeId::INVALID);
                }
            }
            ObjKind::TypeName => {
                if !valid {
                    self.pin_invalid(obj);
                }
            }
            _ => {}
        }
    }

    /// Decide whether the cycle that starts at Grey `obj` is permitted,
    /// reporting it if not.
    pub(crate) fn valid_cycle(&mut self, obj: ObjId) -> bool {
        let Color::Grey(start) = self.objects[obj].color else {
            return true;
        };
        let cycle: Vec<ObjId> = self.resolution_stack[start.min(self.resolution_stack.len())..].to_vec();

        let (mut nval, mut ndef) = (0, 0);
        let mut tparam_cycle = false;
        for &o in &cycle {
            match self.objects[o].kind {
                ObjKind::Const | ObjKind::Var => nval += 1,
                ObjKind::TypeName => {
                    let generic = self.objects[o].ty.is_some_and(|t| self.is_generic(t));
                    if self.env.in_tparam_list && generic {
                        tparam_cycle = true;
                        break;
                    }
                    if !self.objects[o].is_alias {
                        ndef += 1;
                    }
                }
                _ => {}
            }
        }
        debug!(len = cycle.len(), nval, ndef, tparam_cycle, "declaration cycle");

        if !tparam_cycle {
            // Value cycles are reported by the initialization order.
            if nval == cycle.len() {
                return true;
            }
            if nval == 0 && ndef > 0 {
                return true;
            }
        }
        self.cycle_error(&cycle);
        false
    }

    /// Report a cycle once, starting at the member declared first.
    fn cycle_error(&mut self, cycle: &[ObjId]) {
        let Some(first) = (0..cycle.len()).min_by_key(|i| self.objects[cycle[*i]].span.start) else {
            return;
        };
        let rotated: Vec<ObjId> = cycle[first..].iter().chain(&cycle[..first]).copied().collect();
        let head = rotated[0];
        let steps: Vec<(String, Span)> = rotated
            .iter()
            .map(|o| (self.objects[*o].name.clone(), self.objects[*o].span))
            .collect();
        let name = self.objects[head].name.clone();
        let span = self.objects[head].span;
        if self.objects[head].kind == ObjKind::TypeName {
            if self.objects[head].is_alias {
                self.pin_invalid(head);
            }
            self.error(TypeError::InvalidRecursiveType {
                name,
                cycle: steps,
                span,
            });
        } else {
            self.error(TypeError::DeclCycle {
                name,
                cycle: steps,
                span,
            });
        }
    }

    /// Break a cycle through a type name by making it `invalid type`.
    fn pin_invalid(&mut self, obj: ObjId) {
        if !self.objects[obj].is_alias {
            if self.objects[obj].ty.is_none() {
                self.objects[obj].ty = Some(TypeId::INVALID);
            }
            return;
        }
        match self.config.alias_mode {
            AliasMode::Materialized => match self.objects[obj].ty {
                Some(t) => {
                    if let Type::Alias(a) = self.types.get_mut(t) {
                        if a.actual.is_none() {
                            a.actual = Some(TypeId::INVALID);
                        }
                    }
                }
                None => self.objects[obj].ty = Some(TypeId::INVALID),
            },
            AliasMode::Transparent => {
                self.objects[obj].ty = Some(TypeId::INVALID);
                self.broken_aliases.remove(&obj);
            }
        }
    }

    // ── Constants and variables ─────────────────────────────────────────

    pub(crate) fn const_decl(&mut self, obj: ObjId, ty: Option<&'a Expr>, init: Option<&'a Expr>) -> Flow<()> {
        let mut target = None;
        if let Some(te) = ty {
            let t = self.type_expr(te)?;
            if t.is_valid() && !self.types.is_const_type(t) {
                self.error(TypeError::InvalidDecl {
                    message: format!("invalid constant type {}", self.type_string(t)),
                    span: te.span,
                });
                self.objects[obj].ty = Some(TypeId::INVALID);
                return Ok(());
            }
            target = Some(t);
        }
        let mut x = match init {
            Some(e) => self.expr(e)?,
            None => Operand::invalid(None),
        };
        self.init_const(obj, target, &mut x)
    }

    fn init_const(&mut self, obj: ObjId, target: Option<TypeId>, x: &mut Operand<'a>) -> Flow<()> {
        if x.is_invalid() || !x.ty.is_valid() || target == Some(TypeId::INVALID) {
            self.objects[obj].ty = Some(TypeId::INVALID);
            return Ok(());
        }
        if x.mode != Mode::Constant {
            let span = x.expr.map(|e| e.span).unwrap_or(self.objects[obj].span);
            self.error(TypeError::InvalidDecl {
                message: format!("{} is not constant", self.describe(x)),
                span,
            });
            self.objects[obj].ty = Some(TypeId::INVALID);
            return Ok(());
        }
        let t = target.unwrap_or(x.ty);
        self.objects[obj].ty = Some(t);
        self.assignment(x, Some(t), "constant declaration")?;
        if x.is_invalid() {
            return Ok(());
        }
        self.objects[obj].val = x.val.clone();
        Ok(())
    }

    pub(crate) fn var_decl(
        &mut self,
        obj: ObjId,
        ty: Option<&'a Expr>,
        init: Option<&'a Expr>,
        lhs: Option<Vec<ObjId>>,
    ) -> Flow<()> {
        if let Some(te) = ty {
            let t = self.var_type(te)?;
            self.objects[obj].ty = Some(t);
        }
        let Some(init) = init else {
            if ty.is_none() {
                self.objects[obj].ty = Some(TypeId::INVALID);
            }
            return Ok(());
        };
        match lhs {
            Some(lhs) if lhs.len() > 1 => {
                if let Some(t) = self.objects[obj].ty {
                    for &o in &lhs {
                        self.objects[o].ty = Some(t);
                    }
                }
                self.init_vars(&lhs, std::slice::from_ref(init), None)?;
                // The other variables share this declaration.
                let deps = self.decls.get(&obj).map(|d| d.deps.clone()).unwrap_or_default();
                for &o in lhs.iter().filter(|o| **o != obj) {
                    self.objects.mark_black(o);
                    if let Some(info) = self.decls.get_mut(&o) {
                        info.deps = deps.clone();
                    }
                }
                Ok(())
            }
            _ => {
                let hint = self.objects[obj].ty;
                let mut x = self.expr_with_hint(init, hint)?;
                self.init_var(obj, &mut x, "variable declaration")
            }
        }
    }

    // ── Types ───────────────────────────────────────────────────────────

    pub(crate) fn type_decl(&mut self, obj: ObjId, spec: &'a TypeSpec) -> Flow<()> {
        if spec.alias {
            return self.alias_decl(obj, spec);
        }
        let named = self.types.add(Type::Named(Named {
            name: spec.name.name.clone(),
            obj,
            underlying: None,
            methods: self.methods.get(&obj).cloned().unwrap_or_default(),
            type_params: Vec::new(),
            type_args: Vec::new(),
            origin: None,
            module: None,
        }));
        self.objects[obj].ty = Some(named);

        let rhs = if spec.type_params.is_empty() {
            self.defined_type(&spec.ty)?
        } else {
            let scope = self.open_scope(spec.name.id, ScopeKind::Block, spec.span);
            let result = self.generic_decl(named, spec, scope);
            self.close_scope();
            result?
        };

        let rhs = if self.types.is_type_param(rhs) {
            self.error(TypeError::InvalidDecl {
                message: "cannot use a type parameter as RHS in type declaration".to_string(),
                span: spec.ty.span,
            });
            TypeId::INVALID
        } else {
            rhs
        };
        self.named_rhs.insert(named, rhs);
        self.resolve_underlying(named);
        self.settle_underlying();
        Ok(())
    }

    fn generic_decl(&mut self, named: TypeId, spec: &'a TypeSpec, scope: crate::scope::ScopeId) -> Flow<TypeId> {
        let tparams = self.declare_type_params(&spec.type_params, scope);
        if let Some(n) = self.types.named_mut(named) {
            n.type_params = tparams.clone();
        }
        self.resolve_bounds(&spec.type_params, &tparams, scope)?;
        self.defined_type(&spec.ty)
    }

    /// The right-hand side of a type definition. A generic type may appear
    /// uninstantiated only if it is being defined.
    fn defined_type(&mut self, e: &'a Expr) -> Flow<TypeId> {
        self.type_expr(e)
    }

    fn alias_decl(&mut self, obj: ObjId, spec: &'a TypeSpec) -> Flow<()> {
        if let Some(tp) = spec.type_params.first() {
            self.error(TypeError::InvalidDecl {
                message: "generic type cannot be alias".to_string(),
                span: tp.span,
            });
        }
        match self.config.alias_mode {
            AliasMode::Materialized => {
                let alias = self.types.add(Type::Alias(Alias {
                    name: spec.name.name.clone(),
                    obj,
                    actual: None,
                }));
                self.objects[obj].ty = Some(alias);
                let rhs = self.type_expr(&spec.ty)?;
                if let Type::Alias(a) = self.types.get_mut(alias) {
                    if a.actual.is_none() {
                        a.actual = Some(rhs);
                    }
                }
            }
            AliasMode::Transparent => {
                self.broken_aliases.insert(obj);
                let rhs = self.type_expr(&spec.ty)?;
                if self.broken_aliases.remove(&obj) || self.objects[obj].ty.is_none() {
                    self.objects[obj].ty = Some(rhs);
                }
            }
        }
        Ok(())
    }

    /// Follow `type A B` chains to the first type with a known underlying
    /// type. A chain that returns to its start is an invalid recursive type.
    fn resolve_underlying(&mut self, named: TypeId) {
        let mut chain = vec![named];
        let mut t = match self.named_rhs.get(&named) {
            Some(r) => *r,
            None => return,
        };
        let under = loop {
            t = self.types.unalias(t);
            let known = match self.types.get(t) {
                Type::Named(n) => n.underlying,
                _ => break t,
            };
            if let Some(u) = known {
                break u;
            }
            if let Some(pos) = chain.iter().position(|c| *c == t) {
                let cycle = chain[pos..].to_vec();
                self.underlying_cycle(&cycle);
                break TypeId::INVALID;
            }
            let Some(next) = self.named_rhs.get(&t).copied() else {
                // still being declared further up
                return;
            };
            chain.push(t);
            t = next;
        };
        for c in chain {
            if let Some(n) = self.types.named_mut(c) {
                if n.underlying.is_none() {
                    n.underlying = Some(under);
                }
            }
        }
    }

    fn underlying_cycle(&mut self, chain: &[TypeId]) {
        let objs: Vec<ObjId> = chain.iter().filter_map(|t| self.types.named(*t).map(|n| n.obj)).collect();
        let Some(first) = (0..objs.len()).min_by_key(|i| self.objects[objs[*i]].span.start) else {
            return;
        };
        let rotated: Vec<ObjId> = objs[first..].iter().chain(&objs[..first]).copied().collect();
        for t in chain {
            self.invalid_types.insert(*t);
        }
        let head = rotated[0];
        self.error(TypeError::InvalidRecursiveType {
            name: self.objects[head].name.clone(),
            cycle: rotated
                .iter()
                .map(|o| (self.objects[*o].name.clone(), self.objects[*o].span))
                .collect(),
            span: self.objects[head].span,
        });
    }

    /// Retry defined types whose right-hand side was incomplete.
    pub(crate) fn settle_underlying(&mut self) {
        let mut pending: Vec<TypeId> = self
            .named_rhs
            .keys()
            .copied()
            .filter(|t| self.types.named(*t).is_some_and(|n| n.underlying.is_none()))
            .collect();
        pending.sort();
        for t in pending {
            self.resolve_underlying(t);
        }
    }

    /// Infinite-size checks and field/method collisions, once all
    /// package-level types are complete.
    fn check_type_validity(&mut self) -> Flow<()> {
        let mut named: Vec<TypeId> = self.named_rhs.keys().copied().collect();
        named.sort();
        for t in named {
            self.valid_type(t);
            self.check_field_uniqueness(t);
        }
        Ok(())
    }

    /// Report a defined type that contains itself without indirection.
    pub(crate) fn valid_type(&mut self, t: TypeId) {
        let mut path = Vec::new();
        self.valid_type_in(t, &mut path);
    }

    fn valid_type_in(&mut self, t: TypeId, path: &mut Vec<TypeId>) -> bool {
        match self.types.get(t).clone() {
            Type::Array { elem, .. } => self.valid_type_in(elem, path),
            Type::Struct(fields) => fields.iter().all(|f| self.valid_type_in(f.ty, path)),
            Type::Union(terms) => terms.iter().all(|term| self.valid_type_in(term.ty, path)),
            Type::Interface(iface) => iface.embedded.iter().all(|e| self.valid_type_in(*e, path)),
            Type::Alias(a) => a.actual.map_or(true, |actual| self.valid_type_in(actual, path)),
            Type::Named(n) => {
                if self.invalid_types.contains(&t) {
                    return false;
                }
                let key = self.valid_type_key(t);
                if let Some(pos) = path.iter().position(|p| self.valid_type_key(*p) == key) {
                    let chain: Vec<TypeId> = path[pos..].to_vec();
                    self.underlying_cycle(&chain);
                    self.invalid_types.insert(t);
                    return false;
                }
                let Some(under) = n.underlying else {
                    return true;
                };
                path.push(t);
                let ok = self.valid_type_in(under, path);
                path.pop();
                if !ok {
                    self.invalid_types.insert(t);
                }
                ok
            }
            _ => true,
        }
    }

    /// A generic type and its instance over its own parameters are the
    /// same for size purposes.
    fn valid_type_key(&self, t: TypeId) -> (TypeId, Vec<TypeId>) {
        match self.types.named(t) {
            Some(n) => match n.origin {
                Some(origin) => (origin, n.type_args.clone()),
                None => (t, n.type_params.clone()),
            },
            None => (t, Vec::new()),
        }
    }

    fn check_field_uniqueness(&mut self, t: TypeId) {
        let Some(n) = self.types.named(t) else {
            return;
        };
        let methods = n.methods.clone();
        let Type::Struct(fields) = self.types.get(self.types.underlying(t)).clone() else {
            return;
        };
        for m in methods {
            let name = &self.objects[m].name;
            if fields.iter().any(|f| &f.name == name) {
                self.error(TypeError::InvalidDecl {
                    message: format!("field and method with the same name {name}"),
                    span: self.objects[m].span,
                });
            }
        }
    }

    // ── Functions ───────────────────────────────────────────────────────

    fn func_decl(&mut self, obj: ObjId, fd: &'a FuncDecl) -> Flow<()> {
        let (sig, scope) = self.func_type(fd.id, &fd.ty, fd.recv.as_ref())?;
        self.objects[obj].ty = Some(sig);
        if let Some(recv) = &fd.recv {
            self.objects[obj].ptr_recv = matches!(recv.ty.unparen().kind, ExprKind::Star(_));
        } else {
            self.special_func(fd, sig);
        }
        match &fd.body {
            Some(body) => self.later(Task::FuncBody {
                decl: obj,
                name: fd.name.name.clone(),
                sig,
                body,
                scope,
                file: self.env.file,
            }),
            None => {
                if fd.recv.is_none() && (fd.name.name == "init" || fd.name.name == "main") {
                    self.error(TypeError::InvalidDecl {
                        message: format!("missing function body for {}", fd.name.name),
                        span: fd.name.span,
                    });
                }
            }
        }
        Ok(())
    }

    /// `init` and `main` take nothing, return nothing and are not generic.
    fn special_func(&mut self, fd: &FuncDecl, sig: TypeId) {
        let name = fd.name.name.as_str();
        let is_main = name == "main" && self.files.first().is_some_and(|f| f.package.name == "main");
        if name != "init" && !is_main {
            return;
        }
        if let Some(tp) = fd.ty.type_params.first() {
            self.error(TypeError::InvalidDecl {
                message: format!("func {name} must have no type parameters"),
                span: tp.span,
            });
        }
        let Some(s) = self.types.sig(sig) else {
            return;
        };
        if !s.params.is_empty() || !s.results.is_empty() {
            self.error(TypeError::InvalidDecl {
                message: format!("func {name} must have no arguments and no return values"),
                span: fd.name.span,
            });
        }
    }

    // ── Local declarations ──────────────────────────────────────────────

    /// Declarations inside a function body. Each name comes into scope at
    /// the end of its spec, type names at their identifier.
    pub(crate) fn decl_stmt(&mut self, decl: &'a GenDecl) -> Flow<()> {
        match decl {
            GenDecl::Const(specs) => {
                let mut last: Option<&'a ValueSpec> = None;
                for (iota, spec) in specs.iter().enumerate() {
                    let inherited = spec.ty.is_none() && spec.values.is_empty();
                    let src = if inherited { last.unwrap_or(spec) } else { spec };
                    if !inherited {
                        last = Some(spec);
                    }
                    let saved = self.env.iota.replace(Value::Int(iota as i128));
                    let mut objs = Vec::new();
                    for (i, name) in spec.names.iter().enumerate() {
                        let id = self.new_object(Object::new(ObjKind::Const, name.name.as_str(), name.span));
                        let r = self.const_decl(id, src.ty.as_ref(), src.values.get(i));
                        if let Err(e) = r {
                            self.env.iota = saved;
                            return Err(e);
                        }
                        self.objects.mark_black(id);
                        objs.push((id, name));
                    }
                    self.env.iota = saved;
                    self.value_spec_arity(spec, src, true);
                    for (id, name) in objs {
                        self.objects[id].used = true;
                        self.declare(self.env.scope, Some(name), id);
                    }
                }
            }
            GenDecl::Var(specs) => {
                for spec in specs {
                    self.local_vars(spec)?;
                }
            }
            GenDecl::Type(specs) => {
                for spec in specs {
                    let mut obj = Object::new(ObjKind::TypeName, spec.name.name.as_str(), spec.name.span);
                    obj.is_alias = spec.alias;
                    obj.used = true;
                    let id = self.new_object(obj);
                    self.declare(self.env.scope, Some(&spec.name), id);
                    self.type_decl(id, spec)?;
                    self.objects.mark_black(id);
                    if let Some(t) = self.objects[id].ty {
                        if self.named_rhs.contains_key(&t) {
                            expand_pending(&mut self.types);
                            self.valid_type(t);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn local_vars(&mut self, spec: &'a ValueSpec) -> Flow<()> {
        let ids: Vec<ObjId> = spec
            .names
            .iter()
            .map(|n| self.new_object(Object::new(ObjKind::Var, n.name.as_str(), n.span)))
            .collect();
        let shared = spec.values.len() == 1 && ids.len() > 1;
        if shared || spec.values.is_empty() {
            if let Some(first) = ids.first() {
                let lhs = shared.then(|| ids.clone());
                self.var_decl(*first, spec.ty.as_ref(), spec.values.first(), lhs)?;
                let t = self.objects[*first].ty;
                for id in &ids[1..] {
                    if self.objects[*id].ty.is_none() {
                        self.objects[*id].ty = t;
                    }
                }
            }
        } else {
            let t = match &spec.ty {
                Some(te) => Some(self.var_type(te)?),
                None => None,
            };
            for id in &ids {
                self.objects[*id].ty = t;
            }
            if spec.values.len() == ids.len() {
                for (id, value) in ids.iter().zip(&spec.values) {
                    let mut x = self.expr_with_hint(value, t)?;
                    self.init_var(*id, &mut x, "variable declaration")?;
                }
            } else {
                self.init_vars(&ids, &spec.values, None)?;
            }
        }
        if spec.values.is_empty() && spec.ty.is_none() {
            self.error(TypeError::InvalidDecl {
                message: "missing type or init expr".to_string(),
                span: spec.span,
            });
        }
        for (id, name) in ids.iter().zip(&spec.names) {
            if self.objects[*id].ty.is_none() {
                self.objects[*id].ty = Some(TypeId::INVALID);
            }
            self.objects.mark_black(*id);
            self.declare(self.env.scope, Some(name), *id);
            self.locals.push(*id);
        }
        Ok(())
    }
}

/// Name of the base type of a receiver `T`, `*T`, `T[P]` or `*T[P]`.
fn receiver_base(e: &Expr) -> Option<&str> {
    match &e.unparen().kind {
        ExprKind::Ident(name) => Some(name),
        ExprKind::Star(inner) => receiver_base(inner),
        ExprKind::Index(base, _) => receiver_base(base),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gop_ast::AstBuilder;

    #[test]
    fn receiver_base_names() {
        let b = AstBuilder::new();
        assert_eq!(receiver_base(&b.name("T")), Some("T"));
        assert_eq!(receiver_base(&b.star(b.name("T"))), Some("T"));
        assert_eq!(
            receiver_base(&b.star(b.instantiate(b.name("List"), vec![b.name("E")]))),
            Some("List")
        );
        assert_eq!(receiver_base(&b.slice_ty(b.name("T"))), None);
    }
}
