//! Lexical scopes.
//!
//! Scopes form a tree stored in an arena: each scope maps names to object
//! ids and keeps a back-reference to its parent. Entering a block creates a
//! child scope; lookups walk outward to the universe.

use gop_common::Span;
use rustc_hash::FxHashMap;

use crate::objects::ObjId;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ScopeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Universe,
    Package,
    File,
    /// Function body including parameters and results.
    Func,
    Block,
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub span: Span,
    names: FxHashMap<String, ObjId>,
    /// Declaration order, for deterministic iteration.
    order: Vec<ObjId>,
}

impl Scope {
    pub fn lookup(&self, name: &str) -> Option<ObjId> {
        self.names.get(name).copied()
    }

    pub fn objects(&self) -> &[ObjId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parent: Option<ScopeId>, kind: ScopeKind, span: Span) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            kind,
            span,
            names: FxHashMap::default(),
            order: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Insert `name` into `scope`. If the name is already declared there,
    /// nothing is inserted and the existing object is returned.
    pub fn insert(&mut self, scope: ScopeId, name: &str, obj: ObjId) -> Option<ObjId> {
        let s = &mut self.scopes[scope.0 as usize];
        if let Some(existing) = s.names.get(name) {
            return Some(*existing);
        }
        s.names.insert(name.to_string(), obj);
        s.order.push(obj);
        None
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<ObjId> {
        self.get(scope).lookup(name)
    }

    /// Search `scope` and its ancestors; returns the scope where the name
    /// was found along with the object.
    pub fn lookup_parent(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, ObjId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            if let Some(obj) = s.lookup(name) {
                return Some((id, obj));
            }
            current = s.parent;
        }
        None
    }

    /// The innermost enclosing function scope.
    pub fn enclosing_func(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            match s.kind {
                ScopeKind::Func => return Some(id),
                ScopeKind::File | ScopeKind::Package | ScopeKind::Universe => return None,
                ScopeKind::Block => current = s.parent,
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let mut table = ScopeTable::new();
        let outer = table.push(None, ScopeKind::Package, Span::default());
        let inner = table.push(Some(outer), ScopeKind::Block, Span::default());
        assert_eq!(table.insert(outer, "x", ObjId(1)), None);
        assert_eq!(table.lookup_parent(inner, "x"), Some((outer, ObjId(1))));
        assert_eq!(table.insert(inner, "x", ObjId(2)), None);
        assert_eq!(table.lookup_parent(inner, "x"), Some((inner, ObjId(2))));
        assert_eq!(table.lookup_parent(outer, "x"), Some((outer, ObjId(1))));
    }

    #[test]
    fn duplicate_insert_reports_existing() {
        let mut table = ScopeTable::new();
        let s = table.push(None, ScopeKind::Block, Span::default());
        assert_eq!(table.insert(s, "x", ObjId(1)), None);
        assert_eq!(table.insert(s, "x", ObjId(2)), Some(ObjId(1)));
        assert_eq!(table.get(s).objects(), &[ObjId(1)]);
    }

    #[test]
    fn enclosing_func_stops_at_file() {
        let mut table = ScopeTable::new();
        let file = table.push(None, ScopeKind::File, Span::default());
        let func = table.push(Some(file), ScopeKind::Func, Span::default());
        let block = table.push(Some(func), ScopeKind::Block, Span::default());
        assert_eq!(table.enclosing_func(block), Some(func));
        assert_eq!(table.enclosing_func(file), None);
    }
}
