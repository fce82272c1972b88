//! The universe scope: predeclared types, constants, `nil` and built-ins.

use gop_common::Span;

use crate::builtins::Builtin;
use crate::constant::Value;
use crate::objects::{ObjId, ObjKind, Object, ObjectTable};
use crate::scope::{ScopeId, ScopeKind, ScopeTable};
use crate::types::{BasicKind, Interface, Method, Named, Type, TypeId, TypeTable};

/// Handles to universe objects the checker treats specially.
#[derive(Clone, Debug)]
pub(crate) struct Universe {
    pub scope: ScopeId,
    pub error: TypeId,
    pub iota: ObjId,
    pub any: ObjId,
    pub comparable_obj: ObjId,
}

const TYPE_NAMES: [(&str, BasicKind); 17] = [
    ("bool", BasicKind::Bool),
    ("int", BasicKind::Int),
    ("int8", BasicKind::Int8),
    ("int16", BasicKind::Int16),
    ("int32", BasicKind::Int32),
    ("int64", BasicKind::Int64),
    ("uint", BasicKind::Uint),
    ("uint8", BasicKind::Uint8),
    ("uint16", BasicKind::Uint16),
    ("uint32", BasicKind::Uint32),
    ("uint64", BasicKind::Uint64),
    ("uintptr", BasicKind::Uintptr),
    ("float32", BasicKind::Float32),
    ("float64", BasicKind::Float64),
    ("complex64", BasicKind::Complex64),
    ("complex128", BasicKind::Complex128),
    ("string", BasicKind::String),
];

fn insert(scopes: &mut ScopeTable, objects: &mut ObjectTable, scope: ScopeId, mut obj: Object) -> ObjId {
    obj.scope = Some(scope);
    let name = obj.name.clone();
    let id = objects.add(obj);
    scopes.insert(scope, &name, id);
    id
}

pub(crate) fn build(types: &mut TypeTable, objects: &mut ObjectTable, scopes: &mut ScopeTable) -> Universe {
    let scope = scopes.push(None, ScopeKind::Universe, Span::default());
    let at = Span::default();

    for (name, kind) in TYPE_NAMES {
        let obj = Object::typed(ObjKind::TypeName, name, at, TypeId::basic(kind));
        insert(scopes, objects, scope, obj);
    }
    for (name, kind) in [("byte", BasicKind::Uint8), ("rune", BasicKind::Int32)] {
        let mut obj = Object::typed(ObjKind::TypeName, name, at, TypeId::basic(kind));
        obj.is_alias = true;
        insert(scopes, objects, scope, obj);
    }

    let mut any = Object::typed(ObjKind::TypeName, "any", at, TypeId::ANY);
    any.is_alias = true;
    let any = insert(scopes, objects, scope, any);

    // type error interface { Error() string }
    let error_obj = insert(scopes, objects, scope, Object::new(ObjKind::TypeName, "error", at));
    let error_sig = types.func(Vec::new(), vec![TypeId::STRING], false);
    let method = insert_method(objects, "Error", error_sig);
    let error_iface = types.add(Type::Interface(Interface {
        methods: vec![Method {
            name: "Error".to_string(),
            sig: error_sig,
            obj: Some(method),
        }],
        ..Interface::default()
    }));
    let error = types.add(Type::Named(Named {
        name: "error".to_string(),
        obj: error_obj,
        underlying: Some(error_iface),
        methods: Vec::new(),
        type_params: Vec::new(),
        type_args: Vec::new(),
        origin: None,
        module: None,
    }));
    finish(objects, error_obj, error);

    let comparable_obj = insert(scopes, objects, scope, Object::new(ObjKind::TypeName, "comparable", at));
    let comparable_iface = types.add(Type::Interface(Interface {
        comparable: true,
        ..Interface::default()
    }));
    let comparable = types.add(Type::Named(Named {
        name: "comparable".to_string(),
        obj: comparable_obj,
        underlying: Some(comparable_iface),
        methods: Vec::new(),
        type_params: Vec::new(),
        type_args: Vec::new(),
        origin: None,
        module: None,
    }));
    finish(objects, comparable_obj, comparable);

    for (name, val) in [("true", true), ("false", false)] {
        let mut obj = Object::typed(ObjKind::Const, name, at, TypeId::UNTYPED_BOOL);
        obj.val = Some(Value::Bool(val));
        insert(scopes, objects, scope, obj);
    }
    let mut iota = Object::typed(ObjKind::Const, "iota", at, TypeId::UNTYPED_INT);
    iota.val = Some(Value::Int(0));
    let iota = insert(scopes, objects, scope, iota);

    insert(scopes, objects, scope, Object::typed(ObjKind::Nil, "nil", at, TypeId::UNTYPED_NIL));

    for b in Builtin::ALL {
        let obj = Object::typed(ObjKind::Builtin(b), b.name(), at, TypeId::INVALID);
        insert(scopes, objects, scope, obj);
    }

    Universe {
        scope,
        error,
        iota,
        any,
        comparable_obj,
    }
}

fn insert_method(objects: &mut ObjectTable, name: &str, sig: TypeId) -> ObjId {
    objects.add(Object::typed(ObjKind::Func, name, Span::default(), sig))
}

fn finish(objects: &mut ObjectTable, obj: ObjId, ty: TypeId) {
    objects[obj].ty = Some(ty);
    objects.mark_black(obj);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predeclared_names_resolve() {
        let mut types = TypeTable::new();
        let mut objects = ObjectTable::new();
        let mut scopes = ScopeTable::new();
        let u = build(&mut types, &mut objects, &mut scopes);

        let lookup = |name: &str| scopes.lookup_local(u.scope, name).map(|id| &objects[id]);
        assert_eq!(lookup("int").and_then(|o| o.ty), Some(TypeId::INT));
        assert_eq!(lookup("byte").and_then(|o| o.ty), Some(TypeId::UINT8));
        assert_eq!(lookup("nil").map(|o| o.kind), Some(ObjKind::Nil));
        assert_eq!(
            lookup("append").map(|o| o.kind),
            Some(ObjKind::Builtin(Builtin::Append))
        );
        assert_eq!(types.type_string(u.error), "error");
        assert_eq!(types.type_string(types.underlying(u.error)), "interface{Error() string}");
        assert_eq!(types.type_string(objects[u.comparable_obj].ty.unwrap()), "comparable");
        assert!(lookup("true").and_then(|o| o.val.clone()) == Some(Value::Bool(true)));
    }
}
