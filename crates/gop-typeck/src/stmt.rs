//! Function bodies and statements.

use gop_ast::printer::expr_string;
use gop_ast::{
    AssignStmt, AssignTok, BinaryOp, Block, BranchKind, CaseClause, ChanDir, CommClause, Expr, ExprKind, ForStmt,
    Ident, IfStmt, RangeStmt, Stmt, StmtKind, SwitchStmt, TypeSwitchStmt, UnaryOp,
};
use gop_common::Span;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::checker::{Checker, Env};
use crate::config::Feature;
use crate::constant::Value;
use crate::error::{Flow, TypeError};
use crate::info::ImplicitConversion;
use crate::literal::key_of;
use crate::objects::{ObjId, ObjKind, Object};
use crate::operand::{Mode, Operand};
use crate::predicates::{all_numeric, all_string, comparable, core_type, has_nil, identical};
use crate::scope::ScopeKind;
use crate::types::{Type, TypeId};

/// Control-flow context of a statement.
type StmtCtx = u8;

const BREAK_OK: StmtCtx = 1 << 0;
const CONTINUE_OK: StmtCtx = 1 << 1;
const FALLTHROUGH_OK: StmtCtx = 1 << 2;
const FINAL_SWITCH_CASE: StmtCtx = 1 << 3;
const IN_TYPE_SWITCH: StmtCtx = 1 << 4;

/// How an expression may appear in statement position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ExprClass {
    Conversion,
    Expression,
    Statement,
}

impl<'a> Checker<'a> {
    // ── Function bodies ─────────────────────────────────────────────────

    pub(crate) fn func_body(&mut self, env: Env, name: &str, sig: TypeId, body: &'a Block) -> Flow<()> {
        debug!(func = name, "checking function body");
        let saved = std::mem::replace(&mut self.env, env);
        let top = self.locals.len();
        let result = self.func_body_in(sig, body, top);
        self.env = saved;
        result
    }

    fn func_body_in(&mut self, sig: TypeId, body: &'a Block, top: usize) -> Flow<()> {
        self.stmt_list(0, &body.stmts)?;
        if self.env.has_label {
            self.labels(body);
        }
        let has_results = self.types.sig(sig).is_some_and(|s| !s.results.is_empty());
        if has_results && !self.is_terminating_list(&body.stmts, None) {
            self.error(TypeError::MissingReturn {
                span: body.span.end_point(),
            });
        }
        self.usage(top);
        Ok(())
    }

    // ── Statement lists ─────────────────────────────────────────────────

    fn stmt_list(&mut self, ctxt: StmtCtx, list: &'a [Stmt]) -> Flow<()> {
        let fallthrough_ok = ctxt & FALLTHROUGH_OK != 0;
        let inner = ctxt & !FALLTHROUGH_OK;
        let end = list
            .iter()
            .rposition(|s| !matches!(s.kind, StmtKind::Empty))
            .map_or(0, |i| i + 1);
        for (i, s) in list[..end].iter().enumerate() {
            let mut ctxt = inner;
            if fallthrough_ok && i + 1 == end {
                ctxt |= FALLTHROUGH_OK;
            }
            self.stmt(ctxt, s)?;
        }
        Ok(())
    }

    fn block(&mut self, ctxt: StmtCtx, b: &'a Block) -> Flow<()> {
        self.open_scope(b.id, ScopeKind::Block, b.span);
        let result = self.stmt_list(ctxt, &b.stmts);
        self.close_scope();
        result
    }

    fn stmt(&mut self, ctxt: StmtCtx, s: &'a Stmt) -> Flow<()> {
        let top = self.task_count();
        self.stmt_inner(ctxt, s)?;
        // Function literals see the scope they were written in.
        self.process_tasks(top)
    }

    fn simple_stmt(&mut self, s: Option<&'a Stmt>) -> Flow<()> {
        match s {
            Some(s) => self.stmt(0, s),
            None => Ok(()),
        }
    }

    fn stmt_inner(&mut self, ctxt: StmtCtx, s: &'a Stmt) -> Flow<()> {
        let inner = ctxt & !(FALLTHROUGH_OK | FINAL_SWITCH_CASE | IN_TYPE_SWITCH);
        match &s.kind {
            StmtKind::Bad | StmtKind::Empty => Ok(()),
            StmtKind::Decl(d) => self.decl_stmt(d),
            StmtKind::Labeled(_, inner_stmt) => {
                self.env.has_label = true;
                self.stmt(ctxt, inner_stmt)
            }
            StmtKind::Expr(e) => self.expr_stmt(e),
            StmtKind::Send(ch, val) => self.send_stmt(s.span, ch, val),
            StmtKind::IncDec(e, inc) => self.inc_dec(e, *inc),
            StmtKind::Assign(a) => self.assign_stmt(s, a),
            StmtKind::Go(call) => self.suspended_call("go", call),
            StmtKind::Defer(call) => self.suspended_call("defer", call),
            StmtKind::Return(results) => self.return_stmt(s, results),
            StmtKind::Branch(kind, label) => {
                self.branch_stmt(ctxt, s.span, *kind, label.as_ref());
                Ok(())
            }
            StmtKind::Block(b) => self.block(inner, b),
            StmtKind::If(st) => self.if_stmt(inner, s, st),
            StmtKind::Switch(st) => self.switch_stmt(inner | BREAK_OK, s, st),
            StmtKind::TypeSwitch(st) => self.type_switch_stmt(inner | BREAK_OK | IN_TYPE_SWITCH, s, st),
            StmtKind::Select(clauses) => self.select_stmt(inner | BREAK_OK, s, clauses),
            StmtKind::For(st) => self.for_stmt(inner | BREAK_OK | CONTINUE_OK, s, st),
            StmtKind::Range(st) => self.range_stmt(inner | BREAK_OK | CONTINUE_OK, s, st),
            StmtKind::Assert(cond, message) => self.assert_stmt(cond, message.as_ref()),
        }
    }

    // ── Simple statements ───────────────────────────────────────────────

    fn expr_stmt(&mut self, e: &'a Expr) -> Flow<()> {
        let x = self.raw_expr(e, None, false)?;
        match x.mode {
            Mode::Invalid => {}
            Mode::Builtin(_) => self.error(TypeError::InvalidUse {
                message: format!("{} must be called", self.describe(&x)),
                span: x.span(),
            }),
            Mode::TypeExpr => self.error(TypeError::NotAnExpr {
                expr: x.text(),
                span: x.span(),
            }),
            _ if self.expr_class(e) == ExprClass::Statement => {}
            _ => self.error(TypeError::NotUsed {
                operand: self.describe(&x),
                span: x.span(),
            }),
        }
        Ok(())
    }

    /// Calls and receives may stand alone; conversions and value-producing
    /// builtins may not.
    fn expr_class(&self, e: &Expr) -> ExprClass {
        match &e.unparen().kind {
            ExprKind::Call(c) => {
                let fun = c.fun.unparen();
                if self.info.types.get(&fun.id).is_some_and(|tv| tv.mode == Mode::TypeExpr) {
                    return ExprClass::Conversion;
                }
                if let ExprKind::Ident(name) = &fun.kind {
                    if let Some(obj) = self.lookup(name) {
                        if let ObjKind::Builtin(b) = self.objects[obj].kind {
                            return if b.is_statement() {
                                ExprClass::Statement
                            } else {
                                ExprClass::Expression
                            };
                        }
                    }
                }
                ExprClass::Statement
            }
            ExprKind::Unary(UnaryOp::Recv, _) => ExprClass::Statement,
            _ => ExprClass::Expression,
        }
    }

    fn send_stmt(&mut self, span: Span, ch: &'a Expr, val: &'a Expr) -> Flow<()> {
        let ch = self.expr(ch)?;
        let mut val = self.expr(val)?;
        if ch.is_invalid() || val.is_invalid() {
            return Ok(());
        }
        let desc = self.describe(&ch);
        let problem = match core_type(&self.types, ch.ty).map(|u| self.types.get(u)) {
            None => format!("cannot send to {desc}: no core type"),
            Some(Type::Chan { dir: ChanDir::Recv, .. }) => format!("cannot send to receive-only channel {desc}"),
            Some(Type::Chan { elem, .. }) => {
                let elem = *elem;
                return self.assignment(&mut val, Some(elem), "send");
            }
            Some(_) => format!("cannot send to non-channel {desc}"),
        };
        self.error(TypeError::InvalidOperation { message: problem, span });
        Ok(())
    }

    fn inc_dec(&mut self, e: &'a Expr, inc: bool) -> Flow<()> {
        let mut x = self.expr(e)?;
        if x.is_invalid() {
            return Ok(());
        }
        if !all_numeric(&self.types, x.ty) {
            let op = if inc { "++" } else { "--" };
            self.error(TypeError::InvalidOperation {
                message: format!(
                    "{}{op} (non-numeric type {})",
                    expr_string(e),
                    self.type_string(x.ty)
                ),
                span: e.span,
            });
            return Ok(());
        }
        self.assign_var(e, None, Some(&mut x), "assignment")
    }

    fn assign_stmt(&mut self, s: &'a Stmt, a: &'a AssignStmt) -> Flow<()> {
        match a.tok {
            AssignTok::Assign => self.assign_vars(&a.lhs, &a.rhs),
            AssignTok::Define => self.short_var_decl(s.span, &a.lhs, &a.rhs),
            AssignTok::Op(op) => {
                let ([lhs], [rhs]) = (a.lhs.as_slice(), a.rhs.as_slice()) else {
                    self.error(TypeError::InvalidUse {
                        message: format!("assignment operation {op} requires single-valued expressions"),
                        span: s.span,
                    });
                    return Ok(());
                };
                let mut x = self.binary(None, lhs, rhs, op)?;
                self.assign_var(lhs, None, Some(&mut x), "assignment operation")
            }
        }
    }

    /// `go f()` and `defer f()`.
    fn suspended_call(&mut self, keyword: &str, call: &'a Expr) -> Flow<()> {
        if !matches!(call.unparen().kind, ExprKind::Call(_)) {
            self.error(TypeError::InvalidUse {
                message: format!("expression in {keyword} must be function call"),
                span: call.span,
            });
            self.use_exprs(std::slice::from_ref(call))?;
            return Ok(());
        }
        let x = self.raw_expr(call, None, false)?;
        if x.is_invalid() {
            return Ok(());
        }
        let what = match self.expr_class(call) {
            ExprClass::Statement => return Ok(()),
            ExprClass::Conversion => "requires function call, not conversion",
            ExprClass::Expression => "discards result of",
        };
        self.error(TypeError::InvalidUse {
            message: format!("{keyword} {what} {}", self.describe(&x)),
            span: x.span(),
        });
        Ok(())
    }

    fn return_stmt(&mut self, s: &'a Stmt, results: &'a [Expr]) -> Flow<()> {
        let res = self
            .scopes
            .enclosing_func(self.env.scope)
            .and_then(|scope| self.func_results.get(&scope))
            .cloned()
            .unwrap_or_default();
        let named = res.first().is_some_and(|obj| !self.objects[*obj].name.is_empty());
        if results.is_empty() && named {
            // A bare return needs every named result visible.
            for obj in &res {
                let name = self.objects[*obj].name.clone();
                if self.lookup(&name).is_some_and(|alt| alt != *obj) {
                    self.error(TypeError::InvalidDecl {
                        message: format!("result parameter {name} not in scope at return"),
                        span: s.span,
                    });
                }
            }
        } else if !results.is_empty() || !res.is_empty() {
            self.init_vars(&res, results, Some(s.span))?;
        }
        Ok(())
    }

    fn branch_stmt(&mut self, ctxt: StmtCtx, span: Span, kind: BranchKind, label: Option<&Ident>) {
        if label.is_some() {
            // Resolved once the whole body is known.
            self.env.has_label = true;
            return;
        }
        let message = match kind {
            BranchKind::Break if ctxt & BREAK_OK == 0 => "break is not in a loop, switch, or select",
            BranchKind::Continue if ctxt & CONTINUE_OK == 0 => "continue is not in a loop",
            BranchKind::Fallthrough if ctxt & FALLTHROUGH_OK == 0 => {
                if ctxt & FINAL_SWITCH_CASE != 0 {
                    "cannot fallthrough final case in switch"
                } else if ctxt & IN_TYPE_SWITCH != 0 {
                    "cannot fallthrough in type switch"
                } else {
                    "fallthrough statement out of place"
                }
            }
            BranchKind::Goto => "goto requires a label",
            _ => return,
        };
        self.error(TypeError::MisplacedBranch {
            message: message.to_string(),
            span,
        });
    }

    /// `assert cond[, message]`. The condition may be any value; a message
    /// that is not a string is rendered as text.
    fn assert_stmt(&mut self, cond: &'a Expr, message: Option<&'a Expr>) -> Flow<()> {
        self.condition(cond)?;
        let Some(m) = message else {
            return Ok(());
        };
        let mut x = self.expr(m)?;
        self.assignment(&mut x, None, "assert message")?;
        if !x.is_invalid() && !all_string(&self.types, x.ty) {
            self.record_conversion(m.id, ImplicitConversion::ToText { from: x.ty });
        }
        Ok(())
    }

    // ── Structured statements ───────────────────────────────────────────

    fn if_stmt(&mut self, ctxt: StmtCtx, s: &'a Stmt, st: &'a IfStmt) -> Flow<()> {
        self.open_scope(s.id, ScopeKind::Block, s.span);
        let result = self.if_stmt_in(ctxt, st);
        self.close_scope();
        result
    }

    fn if_stmt_in(&mut self, ctxt: StmtCtx, st: &'a IfStmt) -> Flow<()> {
        self.simple_stmt(st.init.as_deref())?;
        self.condition(&st.cond)?;
        self.block(ctxt, &st.then)?;
        match st.els.as_deref() {
            Some(els) if matches!(els.kind, StmtKind::If(_) | StmtKind::Block(_)) => self.stmt(ctxt, els),
            Some(els) => {
                self.error(TypeError::InvalidUse {
                    message: "invalid else branch".to_string(),
                    span: els.span,
                });
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn for_stmt(&mut self, ctxt: StmtCtx, s: &'a Stmt, st: &'a ForStmt) -> Flow<()> {
        self.open_scope(s.id, ScopeKind::Block, s.span);
        let result = self.for_stmt_in(ctxt, st);
        self.close_scope();
        result
    }

    fn for_stmt_in(&mut self, ctxt: StmtCtx, st: &'a ForStmt) -> Flow<()> {
        self.simple_stmt(st.init.as_deref())?;
        if let Some(cond) = &st.cond {
            self.condition(cond)?;
        }
        if let Some(post) = st.post.as_deref() {
            if let StmtKind::Assign(a) = &post.kind {
                if a.tok == AssignTok::Define {
                    self.error(TypeError::InvalidUse {
                        message: "cannot declare in post statement of for loop".to_string(),
                        span: post.span,
                    });
                    self.use_lhs(&a.lhs)?;
                    self.use_exprs(&a.rhs)?;
                } else {
                    self.stmt(0, post)?;
                }
            } else {
                self.stmt(0, post)?;
            }
        }
        self.block(ctxt, &st.body)
    }

    fn multiple_defaults(&mut self, defaults: impl Iterator<Item = (bool, Span)>, what: &str) {
        let mut first: Option<Span> = None;
        for (is_default, span) in defaults {
            if !is_default {
                continue;
            }
            if first.is_some() {
                self.error(TypeError::InvalidUse {
                    message: format!("multiple defaults in {what}"),
                    span,
                });
            } else {
                first = Some(span);
            }
        }
    }

    // ── Expression switches ─────────────────────────────────────────────

    fn switch_stmt(&mut self, ctxt: StmtCtx, s: &'a Stmt, st: &'a SwitchStmt) -> Flow<()> {
        self.open_scope(s.id, ScopeKind::Block, s.span);
        let result = self.switch_stmt_in(ctxt, st);
        self.close_scope();
        result
    }

    fn switch_stmt_in(&mut self, ctxt: StmtCtx, st: &'a SwitchStmt) -> Flow<()> {
        self.simple_stmt(st.init.as_deref())?;
        let x = match &st.tag {
            Some(tag) => {
                let mut x = self.expr(tag)?;
                self.assignment(&mut x, None, "switch expression")?;
                if !x.is_invalid() && !comparable(&self.types, x.ty, false) && !has_nil(&self.types, x.ty) {
                    self.error(TypeError::InvalidOperation {
                        message: format!(
                            "cannot switch on {} ({} is not comparable)",
                            self.describe(&x),
                            self.type_string(x.ty)
                        ),
                        span: x.span(),
                    });
                    x.invalidate();
                }
                x
            }
            None => Operand::constant(TypeId::BOOL, Value::Bool(true), None),
        };
        self.multiple_defaults(st.clauses.iter().map(|c| (c.list.is_none(), c.span)), "switch");

        let mut seen: FxHashMap<String, Vec<(Span, TypeId)>> = FxHashMap::default();
        let n = st.clauses.len();
        for (i, clause) in st.clauses.iter().enumerate() {
            let mut inner = ctxt;
            if i + 1 < n {
                inner |= FALLTHROUGH_OK;
            } else {
                inner |= FINAL_SWITCH_CASE;
            }
            if let Some(values) = &clause.list {
                self.case_values(&x, values, &mut seen)?;
            }
            self.clause_body(inner, clause)?;
        }
        Ok(())
    }

    fn clause_body(&mut self, ctxt: StmtCtx, clause: &'a CaseClause) -> Flow<()> {
        self.open_scope(clause.id, ScopeKind::Block, clause.span);
        let result = self.stmt_list(ctxt, &clause.body);
        self.close_scope();
        result
    }

    /// Check case values against the tag `x`, reporting duplicate
    /// constants.
    fn case_values(
        &mut self,
        x: &Operand<'a>,
        values: &'a [Expr],
        seen: &mut FxHashMap<String, Vec<(Span, TypeId)>>,
    ) -> Flow<()> {
        for e in values {
            let mut v = self.expr(e)?;
            if x.is_invalid() || v.is_invalid() {
                continue;
            }
            self.convert_untyped(&mut v, x.ty)?;
            if v.is_invalid() {
                continue;
            }
            let mut res = v.clone();
            let mut tag = x.clone();
            self.comparison(&mut res, &mut tag, BinaryOp::Eql, true)?;
            if res.is_invalid() || v.mode != Mode::Constant {
                continue;
            }
            let Some(val) = &v.val else {
                continue;
            };
            let entries = seen.entry(key_of(val)).or_default();
            if let Some((prev, _)) = entries.iter().find(|(_, t)| identical(&self.types, v.ty, *t)) {
                let prev = *prev;
                self.error(TypeError::DuplicateCase {
                    value: self.describe(&v),
                    type_switch: false,
                    span: v.span(),
                    prev,
                });
                continue;
            }
            entries.push((v.span(), v.ty));
        }
        Ok(())
    }

    // ── Type switches ───────────────────────────────────────────────────

    fn type_switch_stmt(&mut self, ctxt: StmtCtx, s: &'a Stmt, st: &'a TypeSwitchStmt) -> Flow<()> {
        self.open_scope(s.id, ScopeKind::Block, s.span);
        let result = self.type_switch_stmt_in(ctxt, st);
        self.close_scope();
        result
    }

    fn type_switch_stmt_in(&mut self, ctxt: StmtCtx, st: &'a TypeSwitchStmt) -> Flow<()> {
        self.simple_stmt(st.init.as_deref())?;
        let mut binding = st.binding.as_ref();
        if let Some(b) = binding {
            if b.name == "_" {
                self.error(TypeError::NoNewVariables { span: b.span });
                binding = None;
            }
        }

        let x = self.expr(&st.x)?;
        let mut guard: Option<Operand<'a>> = None;
        if !x.is_invalid() {
            if self.types.is_type_param(x.ty) {
                self.error(TypeError::InvalidUse {
                    message: format!("cannot use type switch on type parameter value {}", self.describe(&x)),
                    span: x.span(),
                });
            } else if self.types.is_interface(x.ty) {
                guard = Some(x.clone());
            } else {
                self.error(TypeError::InvalidUse {
                    message: format!("{} is not an interface", self.describe(&x)),
                    span: x.span(),
                });
            }
        }
        self.multiple_defaults(st.clauses.iter().map(|c| (c.list.is_none(), c.span)), "type switch");

        let mut bound: Vec<ObjId> = Vec::new();
        let mut seen: Vec<(Option<TypeId>, Span)> = Vec::new();
        for clause in &st.clauses {
            let cases = clause.list.as_deref().unwrap_or_default();
            let t = self.case_types(guard.as_ref(), cases, &mut seen)?;
            self.open_scope(clause.id, ScopeKind::Block, clause.span);
            if let Some(b) = binding {
                // One type: the variable has that type; otherwise the
                // type of the guard.
                let ty = match (cases.len(), t) {
                    (1, Some(t)) => t,
                    _ => guard.as_ref().map_or(TypeId::INVALID, |g| g.ty),
                };
                let obj = self.new_object(Object::typed(ObjKind::Var, b.name.as_str(), b.span, ty));
                self.objects.mark_black(obj);
                let scope = self.env.scope;
                self.declare(scope, None, obj);
                self.record_implicit(clause.id, obj);
                bound.push(obj);
            }
            let result = self.stmt_list(ctxt, &clause.body);
            self.close_scope();
            result?;
        }

        // The clause variables count as one: any use of them uses all.
        if let Some(b) = binding {
            let used = bound.iter().any(|obj| self.objects[*obj].used);
            for obj in &bound {
                self.objects[*obj].used = true;
            }
            if !used && self.config.report_unused {
                self.error(TypeError::UnusedVariable {
                    name: b.name.clone(),
                    span: b.span,
                });
            }
        }
        Ok(())
    }

    /// Check the types of one type switch clause. Returns the clause's last
    /// type; `None` for `nil` or an invalid type.
    fn case_types(
        &mut self,
        x: Option<&Operand<'a>>,
        cases: &'a [Expr],
        seen: &mut Vec<(Option<TypeId>, Span)>,
    ) -> Flow<Option<TypeId>> {
        let mut last = None;
        for e in cases {
            let t = if self.is_nil_ident(e) {
                self.expr(e)?;
                None
            } else {
                let t = self.var_type(e)?;
                if !t.is_valid() {
                    last = None;
                    continue;
                }
                Some(t)
            };
            last = t;
            let dup = seen.iter().find(|(other, _)| match (t, other) {
                (None, None) => true,
                (Some(t), Some(o)) => identical(&self.types, t, *o),
                _ => false,
            });
            if let Some((_, prev)) = dup {
                let prev = *prev;
                self.error(TypeError::DuplicateCase {
                    value: t.map_or_else(|| "nil".to_string(), |t| self.type_string(t)),
                    type_switch: true,
                    span: e.span,
                    prev,
                });
                continue;
            }
            seen.push((t, e.span));
            if let (Some(x), Some(t)) = (x, t) {
                self.type_assertion(e, x, t, true)?;
            }
        }
        Ok(last)
    }

    fn is_nil_ident(&self, e: &Expr) -> bool {
        match &e.unparen().kind {
            ExprKind::Ident(name) => self
                .lookup(name)
                .is_some_and(|obj| self.objects[obj].kind == ObjKind::Nil),
            _ => false,
        }
    }

    // ── Select ──────────────────────────────────────────────────────────

    fn select_stmt(&mut self, ctxt: StmtCtx, s: &'a Stmt, clauses: &'a [CommClause]) -> Flow<()> {
        self.multiple_defaults(clauses.iter().map(|c| (c.comm.is_none(), c.span)), "select");
        for clause in clauses {
            let valid = match clause.comm.as_deref().map(|c| &c.kind) {
                None | Some(StmtKind::Send(..)) => true,
                Some(StmtKind::Assign(a)) => {
                    matches!(a.tok, AssignTok::Assign | AssignTok::Define)
                        && a.rhs.len() == 1
                        && is_receive(&a.rhs[0])
                }
                Some(StmtKind::Expr(e)) => is_receive(e),
                _ => false,
            };
            if !valid {
                let span = clause.comm.as_deref().map_or(s.span, |c| c.span);
                self.error(TypeError::InvalidUse {
                    message: "select case must be receive, send or assign recv".to_string(),
                    span,
                });
                continue;
            }
            self.open_scope(clause.id, ScopeKind::Block, clause.span);
            let result = self.comm_clause(ctxt, clause);
            self.close_scope();
            result?;
        }
        Ok(())
    }

    fn comm_clause(&mut self, ctxt: StmtCtx, clause: &'a CommClause) -> Flow<()> {
        if let Some(comm) = clause.comm.as_deref() {
            self.stmt(ctxt, comm)?;
        }
        self.stmt_list(ctxt, &clause.body)
    }

    // ── Range loops ─────────────────────────────────────────────────────

    fn range_stmt(&mut self, ctxt: StmtCtx, s: &'a Stmt, st: &'a RangeStmt) -> Flow<()> {
        let mut x = self.expr(&st.x)?;
        let mut key = None;
        let mut val = None;
        if !x.is_invalid() {
            match self.range_key_val(&x)? {
                Ok((k, v)) => {
                    if let (Some(value), None) = (&st.value, v) {
                        self.error(TypeError::InvalidUse {
                            message: format!(
                                "range over {} permits only one iteration variable",
                                self.describe(&x)
                            ),
                            span: value.span,
                        });
                    }
                    key = Some(k);
                    val = v;
                }
                Err(cause) => {
                    let mut message = format!("cannot range over {}", self.describe(&x));
                    if !cause.is_empty() {
                        message.push_str(": ");
                        message.push_str(&cause);
                    }
                    self.error(TypeError::InvalidUse {
                        message,
                        span: x.span(),
                    });
                }
            }
        }

        // Iteration variables live in the loop's scope.
        self.open_scope(s.id, ScopeKind::Block, s.span);
        let result = self.range_vars(s, st, &mut x, [key, val]);
        let result = result.and_then(|()| self.block(ctxt, &st.body));
        self.close_scope();
        result
    }

    fn range_vars(
        &mut self,
        s: &'a Stmt,
        st: &'a RangeStmt,
        x: &mut Operand<'a>,
        rhs: [Option<TypeId>; 2],
    ) -> Flow<()> {
        let lhs = [st.key.as_ref(), st.value.as_ref()];
        let over_int = !x.is_invalid() && self.types.is_integer(x.ty);
        match st.tok {
            Some(AssignTok::Define) => {
                let mut vars = Vec::new();
                for (target, ty) in lhs.into_iter().zip(rhs) {
                    let Some(target) = target else {
                        continue;
                    };
                    let obj = match &target.kind {
                        ExprKind::Ident(name) => {
                            let obj = self.new_object(Object::new(ObjKind::Var, name.as_str(), target.span));
                            self.info.defs.insert(target.id, obj);
                            if name != "_" {
                                vars.push(obj);
                            }
                            obj
                        }
                        _ => {
                            self.error(TypeError::InvalidUse {
                                message: format!("cannot declare {}", expr_string(target)),
                                span: target.span,
                            });
                            self.use_exprs(std::slice::from_ref(target))?;
                            self.new_object(Object::new(ObjKind::Var, "_", target.span))
                        }
                    };
                    match ty {
                        Some(ty) if ty.is_valid() => {
                            if over_int {
                                self.init_var(obj, x, "range clause")?;
                            } else {
                                let mut y = Operand::new(Mode::Value, ty, Some(target));
                                self.init_var(obj, &mut y, "assignment")?;
                            }
                        }
                        _ => {
                            self.objects[obj].ty = Some(TypeId::INVALID);
                            self.objects[obj].used = true;
                        }
                    }
                }
                if vars.is_empty() {
                    self.error(TypeError::NoNewVariables { span: s.span });
                    return Ok(());
                }
                let scope = self.env.scope;
                trace!(count = vars.len(), "range variables");
                for obj in vars {
                    self.objects.mark_black(obj);
                    self.declare(scope, None, obj);
                    self.locals.push(obj);
                }
            }
            Some(_) if st.key.is_some() => {
                for (target, ty) in lhs.into_iter().zip(rhs) {
                    let (Some(target), Some(ty)) = (target, ty) else {
                        continue;
                    };
                    if !ty.is_valid() {
                        continue;
                    }
                    if over_int {
                        self.assign_var(target, None, Some(&mut *x), "range clause")?;
                        if !x.is_invalid() && !self.types.is_integer(x.ty) {
                            self.error(TypeError::InvalidUse {
                                message: format!(
                                    "cannot use iteration variable of type {}",
                                    self.type_string(x.ty)
                                ),
                                span: target.span,
                            });
                        }
                    } else {
                        let mut y = Operand::new(Mode::Value, ty, Some(target));
                        self.assign_var(target, None, Some(&mut y), "assignment")?;
                    }
                }
            }
            _ if over_int => self.assignment(x, None, "range clause")?,
            _ => {}
        }
        Ok(())
    }

    /// Key and value types of ranging over `x`, or why it cannot be
    /// ranged over.
    fn range_key_val(&mut self, x: &Operand<'a>) -> Flow<Result<(TypeId, Option<TypeId>), String>> {
        let Some(mut u) = core_type(&self.types, x.ty) else {
            return Ok(Err("no core type".to_string()));
        };
        if let Type::Pointer(p) = self.types.get(u) {
            let pu = self.types.underlying(*p);
            if matches!(self.types.get(pu), Type::Array { .. }) {
                u = pu;
            }
        }
        Ok(match self.types.get(u) {
            Type::Basic(kind) if kind.is_string() => Ok((TypeId::INT, Some(self.rune_type()))),
            Type::Basic(kind) if kind.is_integer() => {
                if !self.config.allows(Feature::RangeOverInt) {
                    return Ok(Err(format!("requires {} or later", Feature::RangeOverInt.required())));
                }
                Ok((x.ty, None))
            }
            Type::Array { elem, .. } | Type::Slice(elem) => Ok((TypeId::INT, Some(*elem))),
            Type::Map { key, value } => Ok((*key, Some(*value))),
            Type::Chan { dir: ChanDir::Send, .. } => Err("receive from send-only channel".to_string()),
            Type::Chan { elem, .. } => Ok((*elem, None)),
            _ => Err(String::new()),
        })
    }

    fn rune_type(&self) -> TypeId {
        self.scopes
            .lookup_local(self.universe.scope, "rune")
            .map_or(TypeId::INT32, |obj| self.objects[obj].ty_or_invalid())
    }
}

fn is_receive(e: &Expr) -> bool {
    matches!(e.unparen().kind, ExprKind::Unary(UnaryOp::Recv, _))
}
