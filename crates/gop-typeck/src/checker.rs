//! Checker state and the plumbing shared by every pass.
//!
//! One [`Checker`] checks one package. Package-level declarations are
//! collected first and resolved on demand in dependency order; function
//! bodies and other work that must wait for complete types are queued as
//! [`Task`]s and drained afterwards.

use gop_ast::{Block, Expr, File, Ident, NodeId};
use gop_common::Span;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::config::{Config, Feature};
use crate::constant::Value;
use crate::error::{Flow, TypeError};
use crate::importer::{ExtType, Importer, MemberKind, Module};
use crate::info::{ImplicitConversion, Info, Instance, Selection, TypeAndValue};
use crate::objects::{Color, ObjId, ObjKind, Object, ObjectTable};
use crate::operand::{Mode, Operand};
use crate::predicates;
use crate::scope::{ScopeId, ScopeKind, ScopeTable};
use crate::trace::InferTrace;
use crate::types::{TypeId, TypeTable};
use crate::universe::{self, Universe};

/// The declaration an object came from, kept until the object is resolved.
#[derive(Clone, Debug)]
pub(crate) struct DeclInfo<'a> {
    pub file: usize,
    pub kind: DeclKind<'a>,
    /// Package-level objects this declaration refers to, in first-use order.
    pub deps: Vec<ObjId>,
    dep_set: FxHashSet<ObjId>,
}

impl<'a> DeclInfo<'a> {
    pub fn new(file: usize, kind: DeclKind<'a>) -> Self {
        DeclInfo {
            file,
            kind,
            deps: Vec::new(),
            dep_set: FxHashSet::default(),
        }
    }

    fn add_dep(&mut self, obj: ObjId) {
        if self.dep_set.insert(obj) {
            self.deps.push(obj);
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum DeclKind<'a> {
    Const {
        ty: Option<&'a Expr>,
        init: Option<&'a Expr>,
        iota: i128,
    },
    Var {
        ty: Option<&'a Expr>,
        init: Option<&'a Expr>,
        /// All variables initialised by the same multi-value expression.
        lhs: Option<Vec<ObjId>>,
    },
    Type {
        spec: &'a gop_ast::TypeSpec,
    },
    Func {
        decl: &'a gop_ast::FuncDecl,
    },
}

/// The context an expression or statement is checked in.
#[derive(Clone, Debug, Default)]
pub(crate) struct Env {
    pub scope: ScopeId,
    /// Package-level declaration being checked; collects dependencies.
    pub decl: Option<ObjId>,
    /// Value of `iota` inside a constant declaration.
    pub iota: Option<Value>,
    /// Signature of the enclosing function.
    pub sig: Option<TypeId>,
    pub in_tparam_list: bool,
    /// The function body contains labels.
    pub has_label: bool,
    /// The expression being checked contains a call or receive.
    pub has_call_or_recv: bool,
    pub file: usize,
}

/// Work that must wait until package-level types are complete.
#[derive(Clone, Debug)]
pub(crate) enum Task<'a> {
    FuncBody {
        decl: ObjId,
        name: String,
        sig: TypeId,
        body: &'a Block,
        scope: ScopeId,
        file: usize,
    },
    FuncLitBody {
        env: Env,
        sig: TypeId,
        body: &'a Block,
        scope: ScopeId,
    },
    /// Check that type arguments satisfy their constraints.
    VerifyInstance {
        span: Span,
        tparams: Vec<TypeId>,
        targs: Vec<TypeId>,
    },
    CheckMapKey {
        key: TypeId,
        span: Span,
    },
}

impl Task<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Task::FuncBody { .. } => "function body",
            Task::FuncLitBody { .. } => "function literal",
            Task::VerifyInstance { .. } => "instance verification",
            Task::CheckMapKey { .. } => "map key check",
        }
    }
}

/// An expression whose untyped type may still change once its context is
/// known.
#[derive(Clone, Debug)]
pub(crate) struct Untyped<'a> {
    pub expr: &'a Expr,
    pub mode: Mode,
    pub ty: TypeId,
    pub val: Option<Value>,
    /// Left operand of a non-constant shift.
    pub is_lhs: bool,
}

pub(crate) struct Checker<'a> {
    pub config: &'a Config,
    pub files: &'a [File],
    importer: &'a dyn Importer,
    pub types: TypeTable,
    pub objects: ObjectTable,
    pub scopes: ScopeTable,
    pub info: Info,
    pub errors: Vec<TypeError>,
    pub universe: Universe,
    pub pkg_scope: ScopeId,
    pub file_scopes: Vec<ScopeId>,
    pub decls: FxHashMap<ObjId, DeclInfo<'a>>,
    /// Package-level objects in source order.
    pub pkg_objects: Vec<ObjId>,
    pub resolution_stack: Vec<ObjId>,
    tasks: Vec<Option<Task<'a>>>,
    pub untyped: FxHashMap<NodeId, Untyped<'a>>,
    pub env: Env,
    pub impl_cache: FxHashMap<(TypeId, TypeId), Result<(), String>>,
    /// Methods collected per receiver base type name.
    pub methods: FxHashMap<ObjId, Vec<ObjId>>,
    /// Right-hand side of each defined type, for resolving `type A B`.
    pub named_rhs: FxHashMap<TypeId, TypeId>,
    /// Types already reported as invalid recursive types.
    pub invalid_types: FxHashSet<TypeId>,
    /// Aliases pinned to `invalid type` by a cycle error.
    pub broken_aliases: FxHashSet<ObjId>,
    /// Import path to the module's member scope and default qualifier.
    modules: FxHashMap<String, Option<(ScopeId, String)>>,
    imports: Vec<(ObjId, Span)>,
    /// Local variables of the functions being checked, innermost last.
    pub locals: Vec<ObjId>,
    /// Calls of `panic` in functions with results.
    pub panics: FxHashSet<NodeId>,
    /// Result variables of each function, keyed by the function's scope.
    pub func_results: FxHashMap<ScopeId, Vec<ObjId>>,
    pub traces: Vec<InferTrace>,
}

impl<'a> Checker<'a> {
    pub fn new(config: &'a Config, files: &'a [File], importer: &'a dyn Importer) -> Self {
        let mut types = TypeTable::new();
        let mut objects = ObjectTable::new();
        let mut scopes = ScopeTable::new();
        let universe = universe::build(&mut types, &mut objects, &mut scopes);
        let pkg_scope = scopes.push(Some(universe.scope), ScopeKind::Package, Span::default());
        Checker {
            config,
            files,
            importer,
            types,
            objects,
            scopes,
            info: Info::default(),
            errors: Vec::new(),
            universe,
            pkg_scope,
            file_scopes: Vec::new(),
            decls: FxHashMap::default(),
            pkg_objects: Vec::new(),
            resolution_stack: Vec::new(),
            tasks: Vec::new(),
            untyped: FxHashMap::default(),
            env: Env {
                scope: pkg_scope,
                ..Env::default()
            },
            impl_cache: FxHashMap::default(),
            methods: FxHashMap::default(),
            named_rhs: FxHashMap::default(),
            invalid_types: FxHashSet::default(),
            broken_aliases: FxHashSet::default(),
            modules: FxHashMap::default(),
            imports: Vec::new(),
            locals: Vec::new(),
            panics: FxHashSet::default(),
            func_results: FxHashMap::default(),
            traces: Vec::new(),
        }
    }

    /// Check the whole package.
    pub fn check_package(&mut self) -> Flow<()> {
        self.collect_objects()?;
        debug!(objects = self.pkg_objects.len(), "collected package objects");
        self.package_objects()?;
        self.process_tasks(0)?;
        self.init_order();
        self.unused_imports();
        self.record_untyped();
        debug!(errors = self.errors.len(), "package checked");
        Ok(())
    }

    // ── Errors ──────────────────────────────────────────────────────────

    pub fn error(&mut self, err: TypeError) {
        trace!(code = err.code(), message = %err, "type error");
        self.errors.push(err);
    }

    /// Report and return false if the language version lacks `feature`.
    pub fn version_ok(&mut self, feature: Feature, span: Span) -> bool {
        if self.config.allows(feature) {
            return true;
        }
        self.error(TypeError::VersionTooLow {
            feature: feature.describe().to_string(),
            required: feature.required(),
            span,
        });
        false
    }

    pub fn describe(&self, x: &Operand<'_>) -> String {
        x.describe(&self.types)
    }

    pub fn type_string(&self, t: TypeId) -> String {
        self.types.type_string(t)
    }

    // ── Delayed work ────────────────────────────────────────────────────

    pub fn later(&mut self, task: Task<'a>) {
        trace!(task = task.describe(), "queued");
        self.tasks.push(Some(task));
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run queued tasks from index `top` onwards, including tasks queued
    /// while running them, then drop them from the queue.
    pub fn process_tasks(&mut self, top: usize) -> Flow<()> {
        let mut i = top;
        while i < self.tasks.len() {
            if let Some(task) = self.tasks[i].take() {
                trace!(task = task.describe(), index = i, "running delayed task");
                self.run_task(task)?;
            }
            i += 1;
        }
        self.tasks.truncate(top);
        Ok(())
    }

    fn run_task(&mut self, task: Task<'a>) -> Flow<()> {
        match task {
            Task::FuncBody {
                decl,
                name,
                sig,
                body,
                scope,
                file,
            } => {
                let env = Env {
                    scope,
                    decl: Some(decl),
                    sig: Some(sig),
                    file,
                    ..Env::default()
                };
                self.func_body(env, &name, sig, body)
            }
            Task::FuncLitBody {
                env,
                sig,
                body,
                scope,
            } => {
                let env = Env {
                    scope,
                    sig: Some(sig),
                    has_label: false,
                    has_call_or_recv: false,
                    in_tparam_list: false,
                    ..env
                };
                self.func_body(env, "<function literal>", sig, body)
            }
            Task::VerifyInstance {
                span,
                tparams,
                targs,
            } => {
                self.verify_instance(span, &tparams, &targs)
            }
            Task::CheckMapKey { key, span } => {
                if !predicates::comparable(&self.types, key, false) {
                    let mut ty = self.type_string(key);
                    if self.types.is_type_param(key) {
                        ty.push_str(" (missing comparable constraint)");
                    }
                    self.error(TypeError::InvalidMapKey { ty, span });
                }
                Ok(())
            }
        }
    }

    // ── Recording ───────────────────────────────────────────────────────

    pub fn record_type_and_value(&mut self, e: &Expr, mode: Mode, ty: TypeId, value: Option<Value>) {
        if mode == Mode::Invalid {
            return;
        }
        self.info.types.insert(e.id, TypeAndValue { mode, ty, value });
    }

    /// Record the result of evaluating `e`. Untyped results are held back
    /// until their final type is known.
    pub fn record_operand(&mut self, e: &'a Expr, x: &Operand<'a>, is_lhs: bool) {
        if x.is_invalid() {
            return;
        }
        if self.types.is_untyped(x.ty) {
            self.untyped.insert(
                e.id,
                Untyped {
                    expr: e,
                    mode: x.mode,
                    ty: x.ty,
                    val: x.val.clone(),
                    is_lhs,
                },
            );
        } else {
            self.record_type_and_value(e, x.mode, x.ty, x.val.clone());
        }
    }

    /// Record whatever is still untyped at the end of the pass.
    fn record_untyped(&mut self) {
        let mut pending: Vec<_> = self.untyped.drain().collect();
        pending.sort_by_key(|(id, _)| *id);
        for (_, u) in pending {
            self.record_type_and_value(u.expr, u.mode, u.ty, u.val);
        }
    }

    pub fn record_def(&mut self, ident: &Ident, obj: ObjId) {
        self.info.defs.insert(ident.id, obj);
    }

    pub fn record_use(&mut self, node: NodeId, obj: ObjId) {
        self.info.uses.insert(node, obj);
    }

    pub fn record_implicit(&mut self, node: NodeId, obj: ObjId) {
        self.info.implicits.insert(node, obj);
    }

    pub fn record_selection(&mut self, node: NodeId, sel: Selection) {
        self.info.selections.insert(node, sel);
    }

    pub fn record_instance(&mut self, node: NodeId, type_args: Vec<TypeId>, ty: TypeId) {
        self.info.instances.insert(node, Instance { type_args, ty });
    }

    pub fn record_conversion(&mut self, node: NodeId, conv: ImplicitConversion) {
        self.info.conversions.insert(node, conv);
    }

    // ── Scopes ──────────────────────────────────────────────────────────

    pub fn new_object(&mut self, obj: Object) -> ObjId {
        self.objects.add(obj)
    }

    /// Declare `obj` in `scope`, reporting a redeclaration. The blank
    /// identifier is never inserted.
    pub fn declare(&mut self, scope: ScopeId, ident: Option<&Ident>, obj: ObjId) {
        if let Some(ident) = ident {
            self.record_def(ident, obj);
        }
        let name = self.objects[obj].name.clone();
        if name == "_" {
            return;
        }
        if let Some(prev) = self.scopes.insert(scope, &name, obj) {
            self.error(TypeError::Redeclared {
                span: self.objects[obj].span,
                prev: self.objects[prev].span,
                name,
            });
            return;
        }
        self.objects[obj].scope = Some(scope);
    }

    pub fn lookup_scope(&self, name: &str) -> Option<(ScopeId, ObjId)> {
        self.scopes.lookup_parent(self.env.scope, name)
    }

    pub fn lookup(&self, name: &str) -> Option<ObjId> {
        self.lookup_scope(name).map(|(_, obj)| obj)
    }

    /// Enter a block scope for `node`.
    pub fn open_scope(&mut self, node: NodeId, kind: ScopeKind, span: Span) -> ScopeId {
        let scope = self.scopes.push(Some(self.env.scope), kind, span);
        self.info.scopes.insert(node, scope);
        self.env.scope = scope;
        scope
    }

    pub fn close_scope(&mut self) {
        if let Some(parent) = self.scopes.get(self.env.scope).parent {
            self.env.scope = parent;
        }
    }

    /// Record that the declaration being checked depends on `obj`.
    pub fn add_decl_dep(&mut self, obj: ObjId) {
        let Some(decl) = self.env.decl else {
            return;
        };
        if !self.decls.contains_key(&obj) {
            return;
        }
        if let Some(info) = self.decls.get_mut(&decl) {
            info.add_dep(obj);
        }
    }

    // ── Unused names ────────────────────────────────────────────────────

    /// Report unused locals declared since `top` and forget them.
    pub fn usage(&mut self, top: usize) {
        let mut unused: Vec<ObjId> = self.locals[top..]
            .iter()
            .copied()
            .filter(|id| {
                let obj = &self.objects[*id];
                !obj.used && !obj.is_param && obj.name != "_"
            })
            .collect();
        self.locals.truncate(top);
        if !self.config.report_unused {
            return;
        }
        unused.sort_by_key(|id| self.objects[*id].span.start);
        for id in unused {
            let obj = &self.objects[id];
            self.error(TypeError::UnusedVariable {
                name: obj.name.clone(),
                span: obj.span,
            });
        }
    }

    fn unused_imports(&mut self) {
        if !self.config.report_unused {
            return;
        }
        let imports = std::mem::take(&mut self.imports);
        for (obj, span) in imports {
            let o = &self.objects[obj];
            if !o.used {
                self.error(TypeError::UnusedImport {
                    path: o.module.clone().unwrap_or_default(),
                    span,
                });
            }
        }
    }

    // ── Modules ─────────────────────────────────────────────────────────

    /// Declare the import in file scope `scope`.
    pub fn import(&mut self, scope: ScopeId, spec: &'a gop_ast::ImportSpec) {
        let Some((_, module_name)) = self.import_module(&spec.path) else {
            self.error(TypeError::ImportNotFound {
                path: spec.path.clone(),
                span: spec.span,
            });
            return;
        };
        let (name, span) = match &spec.alias {
            Some(alias) => (alias.name.clone(), alias.span),
            None => (module_name, spec.span),
        };
        if name == "." {
            self.error(TypeError::InvalidDecl {
                message: format!("dot import of {:?} is not supported", spec.path),
                span,
            });
            return;
        }
        let mut obj = Object::new(ObjKind::ModuleAlias, name.as_str(), span);
        obj.module = Some(spec.path.clone());
        obj.color = Color::Black;
        obj.ty = Some(TypeId::INVALID);
        let id = self.new_object(obj);
        match &spec.alias {
            Some(alias) => self.record_def(alias, id),
            None => self.record_implicit(spec.id, id),
        }
        if name == "_" {
            return;
        }
        self.declare(scope, None, id);
        self.imports.push((id, spec.span));
    }

    /// Scope holding the members of the module at `path`.
    pub fn module_scope(&mut self, path: &str) -> Option<ScopeId> {
        self.import_module(path).map(|(scope, _)| scope)
    }

    fn import_module(&mut self, path: &str) -> Option<(ScopeId, String)> {
        if let Some(known) = self.modules.get(path) {
            return known.clone();
        }
        let module = self
            .importer
            .import(path)
            .map(|m| (self.define_module(&m), m.name));
        self.modules.insert(path.to_string(), module.clone());
        module
    }

    fn define_module(&mut self, module: &Module) -> ScopeId {
        debug!(path = %module.path, members = module.members.len(), "importing module");
        let scope = self.scopes.push(None, ScopeKind::Package, Span::default());
        for member in &module.members {
            let (kind, ty, val) = match &member.kind {
                MemberKind::Func(f) => {
                    let params = f.params.iter().map(|p| self.ext_type(p)).collect();
                    let results = f.results.iter().map(|r| self.ext_type(r)).collect();
                    (ObjKind::Func, self.types.func(params, results, f.variadic), None)
                }
                MemberKind::Const(t, v) => (ObjKind::Const, self.ext_type(t), Some(v.clone())),
                MemberKind::Var(t) => (ObjKind::Var, self.ext_type(t), None),
            };
            let mut obj = Object::typed(kind, member.name.as_str(), Span::default(), ty);
            obj.val = val;
            obj.module = Some(module.path.clone());
            obj.pkg_level = true;
            obj.used = true;
            let id = self.new_object(obj);
            self.scopes.insert(scope, &member.name, id);
        }
        scope
    }

    fn ext_type(&mut self, t: &ExtType) -> TypeId {
        match t {
            ExtType::Bool => TypeId::BOOL,
            ExtType::Int => TypeId::INT,
            ExtType::Int64 => TypeId::INT64,
            ExtType::Uint8 => TypeId::UINT8,
            ExtType::Rune => TypeId::INT32,
            ExtType::Float64 => TypeId::FLOAT64,
            ExtType::String => TypeId::STRING,
            ExtType::Error => self.universe.error,
            ExtType::Any => TypeId::ANY,
            ExtType::Slice(elem) => {
                let e = self.ext_type(elem);
                self.types.slice(e)
            }
        }
    }
}
