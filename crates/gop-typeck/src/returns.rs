//! Terminating statement analysis for the missing-return check.

use gop_ast::{BranchKind, CaseClause, CommClause, ExprKind, Stmt, StmtKind};

use crate::checker::Checker;

impl<'a> Checker<'a> {
    /// Whether `s` ends control flow: no statement after it in the same
    /// block is reachable. `label` names `s` when it is labeled.
    pub(crate) fn is_terminating(&self, s: &Stmt, label: Option<&str>) -> bool {
        match &s.kind {
            StmtKind::Labeled(l, inner) => self.is_terminating(inner, Some(&l.name)),
            StmtKind::Expr(e) => {
                let call = e.unparen();
                matches!(call.kind, ExprKind::Call(_)) && self.panics.contains(&call.id)
            }
            StmtKind::Return(_) => true,
            StmtKind::Branch(kind, _) => matches!(kind, BranchKind::Goto | BranchKind::Fallthrough),
            StmtKind::Block(b) => self.is_terminating_list(&b.stmts, None),
            StmtKind::If(s) => {
                s.els.as_ref().is_some_and(|els| {
                    self.is_terminating_list(&s.then.stmts, None) && self.is_terminating(els, None)
                })
            }
            StmtKind::Switch(s) => self.is_terminating_switch(&s.clauses, label),
            StmtKind::TypeSwitch(s) => self.is_terminating_switch(&s.clauses, label),
            StmtKind::Select(clauses) => self.is_terminating_select(clauses, label),
            // A condition-less loop without breaks never falls through.
            StmtKind::For(f) => f.cond.is_none() && !has_break_list(&f.body.stmts, label, true),
            _ => false,
        }
    }

    pub(crate) fn is_terminating_list(&self, list: &[Stmt], label: Option<&str>) -> bool {
        list.iter()
            .rev()
            .find(|s| !matches!(s.kind, StmtKind::Empty))
            .is_some_and(|last| self.is_terminating(last, label))
    }

    fn is_terminating_switch(&self, clauses: &[CaseClause], label: Option<&str>) -> bool {
        let mut has_default = false;
        for cc in clauses {
            has_default |= cc.list.is_none();
            if !self.is_terminating_list(&cc.body, None) || has_break_list(&cc.body, label, true) {
                return false;
            }
        }
        has_default
    }

    fn is_terminating_select(&self, clauses: &[CommClause], label: Option<&str>) -> bool {
        clauses
            .iter()
            .all(|cc| self.is_terminating_list(&cc.body, None) && !has_break_list(&cc.body, label, true))
    }
}

/// Whether `s` is or contains a `break` leaving the statement labeled
/// `label`, or with `implicit`, the closest enclosing breakable statement.
fn has_break(s: &Stmt, label: Option<&str>, implicit: bool) -> bool {
    match &s.kind {
        StmtKind::Labeled(_, inner) => has_break(inner, label, implicit),
        StmtKind::Branch(BranchKind::Break, target) => match target {
            None => implicit,
            Some(t) => label == Some(t.name.as_str()),
        },
        StmtKind::Block(b) => has_break_list(&b.stmts, label, implicit),
        StmtKind::If(s) => {
            has_break_list(&s.then.stmts, label, implicit)
                || s.els.as_ref().is_some_and(|els| has_break(els, label, implicit))
        }
        // Unlabeled breaks inside these leave the inner statement.
        StmtKind::Switch(s) => label.is_some() && has_break_clauses(&s.clauses, label),
        StmtKind::TypeSwitch(s) => label.is_some() && has_break_clauses(&s.clauses, label),
        StmtKind::Select(clauses) => {
            label.is_some() && clauses.iter().any(|cc| has_break_list(&cc.body, label, false))
        }
        StmtKind::For(f) => label.is_some() && has_break_list(&f.body.stmts, label, false),
        StmtKind::Range(r) => label.is_some() && has_break_list(&r.body.stmts, label, false),
        _ => false,
    }
}

fn has_break_list(list: &[Stmt], label: Option<&str>, implicit: bool) -> bool {
    list.iter().any(|s| has_break(s, label, implicit))
}

fn has_break_clauses(clauses: &[CaseClause], label: Option<&str>) -> bool {
    clauses.iter().any(|cc| has_break_list(&cc.body, label, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gop_ast::{Block, ForStmt, Ident, NodeId};
    use gop_common::Span;

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt {
            id: NodeId(0),
            span: Span::default(),
            kind,
        }
    }

    fn ident(name: &str) -> Ident {
        Ident {
            id: NodeId(0),
            name: name.to_string(),
            span: Span::default(),
        }
    }

    fn forever(body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::For(ForStmt {
            init: None,
            cond: None,
            post: None,
            body: Block {
                id: NodeId(0),
                span: Span::default(),
                stmts: body,
            },
        }))
    }

    #[test]
    fn breaks_are_attributed_to_the_right_statement() {
        let plain = forever(vec![stmt(StmtKind::Branch(BranchKind::Break, None))]);
        assert!(has_break_list(
            match &plain.kind {
                StmtKind::For(f) => &f.body.stmts,
                _ => unreachable!(),
            },
            None,
            true
        ));

        // An unlabeled break inside a nested loop does not leave the outer one.
        let nested = forever(vec![forever(vec![stmt(StmtKind::Branch(BranchKind::Break, None))])]);
        let StmtKind::For(f) = &nested.kind else { unreachable!() };
        assert!(!has_break_list(&f.body.stmts, None, true));

        // A labeled break does.
        let labeled = forever(vec![forever(vec![stmt(StmtKind::Branch(
            BranchKind::Break,
            Some(ident("outer")),
        ))])]);
        let StmtKind::For(f) = &labeled.kind else { unreachable!() };
        assert!(has_break_list(&f.body.stmts, Some("outer"), true));
    }
}
