//! Label declarations and labeled branches, checked once per function body
//! that contains labels.

use gop_ast::{AssignTok, Block, BranchKind, GenDecl, Ident, NodeId, Stmt, StmtKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::checker::Checker;
use crate::error::TypeError;
use crate::objects::{ObjId, ObjKind, Object};

/// Labels declared in one block, chained to the enclosing blocks.
struct Frame<'p, 'a> {
    parent: Option<&'p Frame<'p, 'a>>,
    /// The labeled statement this block is the body of.
    target: Option<(&'a str, &'a Stmt)>,
    labels: FxHashSet<&'a str>,
}

impl<'p, 'a> Frame<'p, 'a> {
    fn goto_target(&self, name: &str) -> bool {
        let mut frame = Some(self);
        while let Some(f) = frame {
            if f.labels.contains(name) {
                return true;
            }
            frame = f.parent;
        }
        false
    }

    fn enclosing_target(&self, name: &str) -> Option<&'a Stmt> {
        let mut frame = Some(self);
        while let Some(f) = frame {
            if let Some((label, stmt)) = f.target {
                if label == name {
                    return Some(stmt);
                }
            }
            frame = f.parent;
        }
        None
    }
}

/// Forward `goto`s of one block.
#[derive(Default)]
struct Jumps<'a> {
    forward: Vec<&'a Ident>,
    /// Forward jumps pending when the last variable declaration was seen.
    over_decl: Vec<NodeId>,
}

impl<'a> Checker<'a> {
    pub(crate) fn labels(&mut self, body: &'a Block) {
        let mut all: FxHashMap<&'a str, ObjId> = FxHashMap::default();
        let forward = self.block_branches(&mut all, None, None, &body.stmts);
        for jump in forward {
            let message = match all.get(jump.name.as_str()) {
                Some(obj) => {
                    self.objects[*obj].used = true;
                    format!("goto {} jumps into block", jump.name)
                }
                None => format!("label {} not declared", jump.name),
            };
            self.error(TypeError::MisplacedBranch {
                message,
                span: jump.span,
            });
        }
        let mut unused: Vec<ObjId> = all.into_values().filter(|obj| !self.objects[*obj].used).collect();
        unused.sort_by_key(|obj| self.objects[*obj].span.start);
        for obj in unused {
            self.error(TypeError::UnusedLabel {
                name: self.objects[obj].name.clone(),
                span: self.objects[obj].span,
            });
        }
    }

    /// Check the branches of a statement list. Returns the `goto`s whose
    /// label is not declared in this block or before them in an enclosing
    /// one.
    fn block_branches(
        &mut self,
        all: &mut FxHashMap<&'a str, ObjId>,
        parent: Option<&Frame<'_, 'a>>,
        target: Option<(&'a str, &'a Stmt)>,
        list: &'a [Stmt],
    ) -> Vec<&'a Ident> {
        let mut frame = Frame {
            parent,
            target,
            labels: FxHashSet::default(),
        };
        let mut jumps = Jumps::default();
        for s in list {
            self.stmt_branches(all, &mut frame, &mut jumps, s, None);
        }
        jumps.forward
    }

    fn stmt_branches(
        &mut self,
        all: &mut FxHashMap<&'a str, ObjId>,
        frame: &mut Frame<'_, 'a>,
        jumps: &mut Jumps<'a>,
        s: &'a Stmt,
        target: Option<(&'a str, &'a Stmt)>,
    ) {
        match &s.kind {
            StmtKind::Decl(GenDecl::Var(_)) => {
                jumps.over_decl = jumps.forward.iter().map(|j| j.id).collect();
            }
            StmtKind::Assign(a) if a.tok == AssignTok::Define => {
                jumps.over_decl = jumps.forward.iter().map(|j| j.id).collect();
            }
            StmtKind::Labeled(label, inner) => {
                let inner: &'a Stmt = inner;
                let name = label.name.as_str();
                if name == "_" {
                    self.stmt_branches(all, frame, jumps, inner, None);
                    return;
                }
                let obj = match all.get(name) {
                    Some(prev) => {
                        self.error(TypeError::InvalidDecl {
                            message: format!("label {name} already declared"),
                            span: label.span,
                        });
                        *prev
                    }
                    None => {
                        let obj = self.new_object(Object::new(ObjKind::Label, name, label.span));
                        all.insert(name, obj);
                        frame.labels.insert(name);
                        self.record_def(label, obj);
                        obj
                    }
                };
                let pending = std::mem::take(&mut jumps.forward);
                for jump in pending {
                    if jump.name != name {
                        jumps.forward.push(jump);
                        continue;
                    }
                    self.objects[obj].used = true;
                    self.record_use(jump.id, obj);
                    if jumps.over_decl.contains(&jump.id) {
                        self.error(TypeError::MisplacedBranch {
                            message: format!("goto {name} jumps over variable declaration"),
                            span: jump.span,
                        });
                    }
                }
                self.stmt_branches(all, frame, jumps, inner, Some((name, inner)));
            }
            StmtKind::Branch(kind, Some(label)) => {
                let name = label.name.as_str();
                let valid = match kind {
                    BranchKind::Break => frame.enclosing_target(name).is_some_and(|t| {
                        matches!(
                            t.kind,
                            StmtKind::For(_)
                                | StmtKind::Range(_)
                                | StmtKind::Switch(_)
                                | StmtKind::TypeSwitch(_)
                                | StmtKind::Select(_)
                        )
                    }),
                    BranchKind::Continue => frame
                        .enclosing_target(name)
                        .is_some_and(|t| matches!(t.kind, StmtKind::For(_) | StmtKind::Range(_))),
                    BranchKind::Goto => {
                        if !frame.goto_target(name) {
                            jumps.forward.push(label);
                            return;
                        }
                        true
                    }
                    BranchKind::Fallthrough => false,
                };
                if !valid {
                    self.error(TypeError::MisplacedBranch {
                        message: format!("invalid {} label {name}", kind.as_str()),
                        span: label.span,
                    });
                    return;
                }
                if let Some(obj) = all.get(name) {
                    self.objects[*obj].used = true;
                    self.record_use(label.id, *obj);
                }
            }
            StmtKind::Block(b) => {
                let nested = self.block_branches(all, Some(&*frame), target, &b.stmts);
                jumps.forward.extend(nested);
            }
            StmtKind::If(s) => {
                let nested = self.block_branches(all, Some(&*frame), target, &s.then.stmts);
                jumps.forward.extend(nested);
                if let Some(els) = &s.els {
                    self.stmt_branches(all, frame, jumps, els, None);
                }
            }
            StmtKind::Switch(sw) => {
                let nested = self.clause_branches(all, frame, target, sw.clauses.iter().map(|c| c.body.as_slice()));
                jumps.forward.extend(nested);
            }
            StmtKind::TypeSwitch(sw) => {
                let nested = self.clause_branches(all, frame, target, sw.clauses.iter().map(|c| c.body.as_slice()));
                jumps.forward.extend(nested);
            }
            StmtKind::Select(clauses) => {
                let nested = self.clause_branches(all, frame, target, clauses.iter().map(|c| c.body.as_slice()));
                jumps.forward.extend(nested);
            }
            StmtKind::For(f) => {
                let nested = self.block_branches(all, Some(&*frame), target, &f.body.stmts);
                jumps.forward.extend(nested);
            }
            StmtKind::Range(r) => {
                let nested = self.block_branches(all, Some(&*frame), target, &r.body.stmts);
                jumps.forward.extend(nested);
            }
            _ => {}
        }
    }

    /// Clause bodies of a switch or select: each is its own block inside
    /// the statement's block.
    fn clause_branches(
        &mut self,
        all: &mut FxHashMap<&'a str, ObjId>,
        frame: &Frame<'_, 'a>,
        target: Option<(&'a str, &'a Stmt)>,
        bodies: impl Iterator<Item = &'a [Stmt]>,
    ) -> Vec<&'a Ident> {
        let outer = Frame {
            parent: Some(frame),
            target,
            labels: FxHashSet::default(),
        };
        let mut forward = Vec::new();
        for body in bodies {
            forward.extend(self.block_branches(all, Some(&outer), None, body));
        }
        forward
    }
}
