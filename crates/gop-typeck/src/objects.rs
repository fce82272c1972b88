//! Declared entities and their resolution state.
//!
//! Every named thing the checker knows about (constants, variables,
//! functions, type names, labels, module aliases, builtins) is an
//! [`Object`] in the [`ObjectTable`] arena. Package-level objects carry a
//! [`Color`] used for dependency-ordered resolution.

use std::ops::{Index, IndexMut};

use gop_common::Span;
use serde::Serialize;

use crate::builtins::Builtin;
use crate::constant::Value;
use crate::scope::ScopeId;
use crate::types::TypeId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjKind {
    Const,
    Var,
    Func,
    TypeName,
    Label,
    ModuleAlias,
    Builtin(Builtin),
    Nil,
}

impl ObjKind {
    pub fn describe(self) -> &'static str {
        match self {
            ObjKind::Const => "constant",
            ObjKind::Var => "variable",
            ObjKind::Func => "function",
            ObjKind::TypeName => "type",
            ObjKind::Label => "label",
            ObjKind::ModuleAlias => "package",
            ObjKind::Builtin(_) => "built-in",
            ObjKind::Nil => "nil",
        }
    }
}

/// Resolution state of a package-level object.
///
/// White: not yet visited. Grey: resolution in progress; the payload is the
/// object's index on the resolution stack. Black: type is final.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Color {
    White,
    Grey(usize),
    Black,
}

#[derive(Clone, Debug)]
pub struct Object {
    pub kind: ObjKind,
    pub name: String,
    /// Unset until the object is resolved.
    pub ty: Option<TypeId>,
    /// Constant value (`Const` only).
    pub val: Option<Value>,
    pub span: Span,
    pub color: Color,
    /// Scope the object is declared in, if any.
    pub scope: Option<ScopeId>,
    pub used: bool,
    /// Declared at package level.
    pub pkg_level: bool,
    /// Struct field (`Var` only).
    pub is_field: bool,
    /// Embedded struct field.
    pub embedded: bool,
    /// Function parameter or result (`Var` only).
    pub is_param: bool,
    /// Method with a pointer receiver (`Func` only).
    pub ptr_recv: bool,
    /// `type A = B` (`TypeName` only).
    pub is_alias: bool,
    /// Import path for `ModuleAlias`; owning module for imported members.
    pub module: Option<String>,
}

impl Object {
    pub fn new(kind: ObjKind, name: impl Into<String>, span: Span) -> Self {
        Object {
            kind,
            name: name.into(),
            ty: None,
            val: None,
            span,
            color: Color::White,
            scope: None,
            used: false,
            pkg_level: false,
            is_field: false,
            embedded: false,
            is_param: false,
            ptr_recv: false,
            is_alias: false,
            module: None,
        }
    }

    /// An object whose type is already known.
    pub fn typed(kind: ObjKind, name: impl Into<String>, span: Span, ty: TypeId) -> Self {
        let mut obj = Object::new(kind, name, span);
        obj.ty = Some(ty);
        obj.color = Color::Black;
        obj
    }

    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }

    pub fn ty_or_invalid(&self) -> TypeId {
        self.ty.unwrap_or(TypeId::INVALID)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ObjectTable {
    objects: Vec<Object>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, obj: Object) -> ObjId {
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(obj);
        id
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjId(i as u32), o))
    }

    /// White -> Grey. Returns false if the object was not White.
    pub fn mark_grey(&mut self, id: ObjId, stack_index: usize) -> bool {
        let obj = &mut self[id];
        if obj.color != Color::White {
            return false;
        }
        obj.color = Color::Grey(stack_index);
        true
    }

    /// Grey -> Black (or White -> Black for objects resolved without
    /// passing through the stack). Black stays Black.
    pub fn mark_black(&mut self, id: ObjId) {
        self[id].color = Color::Black;
    }
}

impl Index<ObjId> for ObjectTable {
    type Output = Object;

    fn index(&self, id: ObjId) -> &Object {
        &self.objects[id.0 as usize]
    }
}

impl IndexMut<ObjId> for ObjectTable {
    fn index_mut(&mut self, id: ObjId) -> &mut Object {
        &mut self.objects[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_only_move_forward() {
        let mut table = ObjectTable::new();
        let id = table.add(Object::new(ObjKind::Var, "x", Span::new(0, 1)));
        assert_eq!(table[id].color, Color::White);
        assert!(table.mark_grey(id, 0));
        assert_eq!(table[id].color, Color::Grey(0));
        assert!(!table.mark_grey(id, 3));
        table.mark_black(id);
        assert_eq!(table[id].color, Color::Black);
        assert!(!table.mark_grey(id, 0));
    }

    #[test]
    fn exported_names_start_uppercase() {
        let obj = Object::new(ObjKind::Func, "Println", Span::default());
        assert!(obj.is_exported());
        let obj = Object::new(ObjKind::Func, "println", Span::default());
        assert!(!obj.is_exported());
    }
}
