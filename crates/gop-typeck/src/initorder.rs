//! Initialization order of package-level variables.
//!
//! Package-level constants, variables and functions form a dependency
//! graph. Functions are removed from the graph by linking their dependents
//! directly to their dependencies, then nodes are emitted fewest
//! dependencies first with source order breaking ties. A node popped while
//! it still has dependencies is part of a cycle.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::checker::{Checker, DeclKind};
use crate::error::TypeError;
use crate::info::Initializer;
use crate::objects::{ObjId, ObjKind};

struct Node {
    obj: ObjId,
    /// Nodes this one depends on.
    succ: FxHashSet<usize>,
    /// Nodes depending on this one.
    pred: FxHashSet<usize>,
    ndeps: usize,
}

impl<'a> Checker<'a> {
    pub(crate) fn init_order(&mut self) {
        let mut nodes = self.dependency_graph();
        debug!(nodes = nodes.len(), "computing initialization order");

        // Ordered by (remaining dependencies, source order).
        let mut queue: BTreeSet<(usize, usize)> = nodes.iter().enumerate().map(|(i, n)| (n.ndeps, i)).collect();
        let mut emitted = FxHashSet::default();

        while let Some((ndeps, i)) = queue.pop_first() {
            let obj = nodes[i].obj;
            if ndeps > 0 {
                if let Some(cycle) = self.find_path(obj, obj, &mut FxHashSet::default()) {
                    self.report_init_cycle(&cycle);
                }
            }

            let preds: Vec<usize> = nodes[i].pred.iter().copied().collect();
            for p in preds {
                if queue.remove(&(nodes[p].ndeps, p)) {
                    nodes[p].ndeps = nodes[p].ndeps.saturating_sub(1);
                    queue.insert((nodes[p].ndeps, p));
                }
            }

            // Only variables with initializers produce an entry; `a, b = f()`
            // produces one for all of its variables.
            let Some(DeclKind::Var { init: Some(init), lhs, .. }) = self.decls.get(&obj).map(|d| &d.kind) else {
                continue;
            };
            if !emitted.insert(init.id) {
                continue;
            }
            let lhs = lhs.clone().unwrap_or_else(|| vec![obj]);
            trace!(var = %self.objects[obj].name, "initializer");
            self.info.init_order.push(Initializer { lhs, rhs: init.id });
        }
    }

    /// The dependency graph of package-level values, with functions
    /// removed. Node indices follow source order.
    fn dependency_graph(&self) -> Vec<Node> {
        let objs: Vec<ObjId> = self
            .pkg_objects
            .iter()
            .copied()
            .filter(|obj| {
                self.decls.contains_key(obj)
                    && matches!(self.objects[*obj].kind, ObjKind::Const | ObjKind::Var | ObjKind::Func)
            })
            .collect();
        let index: FxHashMap<ObjId, usize> = objs.iter().enumerate().map(|(i, obj)| (*obj, i)).collect();

        let mut nodes: Vec<Node> = objs
            .iter()
            .map(|obj| Node {
                obj: *obj,
                succ: FxHashSet::default(),
                pred: FxHashSet::default(),
                ndeps: 0,
            })
            .collect();
        for (i, obj) in objs.iter().enumerate() {
            let Some(info) = self.decls.get(obj) else {
                continue;
            };
            for dep in &info.deps {
                if let Some(&d) = index.get(dep) {
                    nodes[i].succ.insert(d);
                    nodes[d].pred.insert(i);
                }
            }
        }

        // Functions with many edges are cheaper to remove last.
        let mut funcs: Vec<usize> = (0..nodes.len())
            .filter(|i| self.objects[nodes[*i].obj].kind == ObjKind::Func)
            .collect();
        funcs.sort_by_key(|i| (nodes[*i].pred.len() * nodes[*i].succ.len(), *i));
        for n in &funcs {
            let n = *n;
            let preds: Vec<usize> = nodes[n].pred.iter().copied().filter(|p| *p != n).collect();
            let succs: Vec<usize> = nodes[n].succ.iter().copied().filter(|s| *s != n).collect();
            for &p in &preds {
                for &s in &succs {
                    nodes[p].succ.insert(s);
                    nodes[s].pred.insert(p);
                }
                nodes[p].succ.remove(&n);
            }
            for &s in &succs {
                nodes[s].pred.remove(&n);
            }
            nodes[n].pred.clear();
            nodes[n].succ.clear();
        }

        let removed: FxHashSet<usize> = funcs.into_iter().collect();
        let remap: FxHashMap<usize, usize> = (0..nodes.len())
            .filter(|i| !removed.contains(i))
            .enumerate()
            .map(|(new, old)| (old, new))
            .collect();
        nodes
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !removed.contains(i))
            .map(|(_, n)| {
                let succ: FxHashSet<usize> = n.succ.iter().filter_map(|s| remap.get(s).copied()).collect();
                let pred: FxHashSet<usize> = n.pred.iter().filter_map(|p| remap.get(p).copied()).collect();
                Node {
                    obj: n.obj,
                    ndeps: succ.len(),
                    succ,
                    pred,
                }
            })
            .collect()
    }

    /// A dependency path from `from` to `to`, following the original
    /// dependencies including those through functions.
    fn find_path(&self, from: ObjId, to: ObjId, seen: &mut FxHashSet<ObjId>) -> Option<Vec<ObjId>> {
        if !seen.insert(from) {
            return None;
        }
        let deps = &self.decls.get(&from)?.deps;
        for &dep in deps {
            if dep == to {
                return Some(vec![dep]);
            }
            if let Some(mut path) = self.find_path(dep, to, seen) {
                path.insert(0, dep);
                return Some(path);
            }
        }
        None
    }

    fn report_init_cycle(&mut self, cycle: &[ObjId]) {
        // The path ends where it starts; report from its first element.
        let Some(&last) = cycle.last() else {
            return;
        };
        let mut ordered = vec![last];
        ordered.extend_from_slice(&cycle[..cycle.len() - 1]);
        let steps: Vec<(String, _)> = ordered
            .iter()
            .map(|o| (self.objects[*o].name.clone(), self.objects[*o].span))
            .collect();
        let head = ordered[0];
        self.error(TypeError::InitializationCycle {
            name: self.objects[head].name.clone(),
            cycle: steps,
            span: self.objects[head].span,
        });
    }
}
