//! Type representation for the Gop type system.
//!
//! Types live in a [`TypeTable`] arena and are addressed by [`TypeId`].
//! Basic types occupy the first ids (`TypeId(kind as u32)`), followed by
//! the empty interface `any`. Composite literal types (pointers, slices,
//! arrays, maps, channels, tuples) are interned, so structurally equal
//! instances share an id; defined types, type parameters and aliases have
//! identity and are never interned.

use std::fmt::Write;

use gop_ast::ChanDir;
use rustc_hash::FxHashMap;

use crate::objects::ObjId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct TypeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

pub const BASIC_KINDS: [BasicKind; 26] = [
    BasicKind::Invalid,
    BasicKind::Bool,
    BasicKind::Int,
    BasicKind::Int8,
    BasicKind::Int16,
    BasicKind::Int32,
    BasicKind::Int64,
    BasicKind::Uint,
    BasicKind::Uint8,
    BasicKind::Uint16,
    BasicKind::Uint32,
    BasicKind::Uint64,
    BasicKind::Uintptr,
    BasicKind::Float32,
    BasicKind::Float64,
    BasicKind::Complex64,
    BasicKind::Complex128,
    BasicKind::String,
    BasicKind::UnsafePointer,
    BasicKind::UntypedBool,
    BasicKind::UntypedInt,
    BasicKind::UntypedRune,
    BasicKind::UntypedFloat,
    BasicKind::UntypedComplex,
    BasicKind::UntypedString,
    BasicKind::UntypedNil,
];

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedComplex => "untyped complex",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, BasicKind::Float32 | BasicKind::Float64 | BasicKind::UntypedFloat)
    }

    pub fn is_complex(self) -> bool {
        matches!(
            self,
            BasicKind::Complex64 | BasicKind::Complex128 | BasicKind::UntypedComplex
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedComplex
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    pub fn is_ordered(self) -> bool {
        self.is_integer() || self.is_float() || self.is_string()
    }

    /// Kinds whose values may be constants.
    pub fn is_const_type(self) -> bool {
        self.is_boolean() || self.is_numeric() || self.is_string()
    }

    /// Size in bits for sized numeric kinds; `int`, `uint` and `uintptr` are 64-bit.
    pub fn bits(self) -> Option<u32> {
        match self {
            BasicKind::Int8 | BasicKind::Uint8 => Some(8),
            BasicKind::Int16 | BasicKind::Uint16 => Some(16),
            BasicKind::Int32 | BasicKind::Uint32 | BasicKind::Float32 => Some(32),
            BasicKind::Int | BasicKind::Int64 | BasicKind::Uint | BasicKind::Uint64 => Some(64),
            BasicKind::Uintptr | BasicKind::Float64 | BasicKind::Complex64 => Some(64),
            BasicKind::Complex128 => Some(128),
            _ => None,
        }
    }

    /// The default type of an untyped kind.
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedRune => BasicKind::Int32,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedComplex => BasicKind::Complex128,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }
}

impl TypeId {
    pub const INVALID: TypeId = TypeId::basic(BasicKind::Invalid);
    pub const BOOL: TypeId = TypeId::basic(BasicKind::Bool);
    pub const INT: TypeId = TypeId::basic(BasicKind::Int);
    pub const INT32: TypeId = TypeId::basic(BasicKind::Int32);
    pub const INT64: TypeId = TypeId::basic(BasicKind::Int64);
    pub const UINT8: TypeId = TypeId::basic(BasicKind::Uint8);
    pub const FLOAT64: TypeId = TypeId::basic(BasicKind::Float64);
    pub const COMPLEX128: TypeId = TypeId::basic(BasicKind::Complex128);
    pub const STRING: TypeId = TypeId::basic(BasicKind::String);
    pub const UNTYPED_BOOL: TypeId = TypeId::basic(BasicKind::UntypedBool);
    pub const UNTYPED_INT: TypeId = TypeId::basic(BasicKind::UntypedInt);
    pub const UNTYPED_RUNE: TypeId = TypeId::basic(BasicKind::UntypedRune);
    pub const UNTYPED_FLOAT: TypeId = TypeId::basic(BasicKind::UntypedFloat);
    pub const UNTYPED_COMPLEX: TypeId = TypeId::basic(BasicKind::UntypedComplex);
    pub const UNTYPED_STRING: TypeId = TypeId::basic(BasicKind::UntypedString);
    pub const UNTYPED_NIL: TypeId = TypeId::basic(BasicKind::UntypedNil);
    /// The predeclared empty interface.
    pub const ANY: TypeId = TypeId(BASIC_KINDS.len() as u32);

    pub const fn basic(kind: BasicKind) -> TypeId {
        TypeId(kind as u32)
    }

    pub fn is_valid(self) -> bool {
        self != TypeId::INVALID
    }
}

/// A defined type, or an instance of a generic defined type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Named {
    pub name: String,
    pub obj: ObjId,
    /// Unset while the declaration is being resolved.
    pub underlying: Option<TypeId>,
    /// Method objects; instances use their origin's methods.
    pub methods: Vec<ObjId>,
    pub type_params: Vec<TypeId>,
    pub type_args: Vec<TypeId>,
    /// The generic type this is an instance of.
    pub origin: Option<TypeId>,
    /// Qualifier for types that belong to an imported module.
    pub module: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Alias {
    pub name: String,
    pub obj: ObjId,
    pub actual: Option<TypeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub ty: TypeId,
    pub embedded: bool,
    pub obj: ObjId,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub type_params: Vec<TypeId>,
    pub recv: Option<TypeId>,
    /// Type parameters introduced by a generic receiver `(l *List[T])`.
    pub recv_type_params: Vec<TypeId>,
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
    /// The last parameter has type `[]T` and accepts `...T`.
    pub variadic: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub name: String,
    pub sig: TypeId,
    pub obj: Option<ObjId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Interface {
    pub methods: Vec<Method>,
    /// Embedded interfaces, unions and single type terms.
    pub embedded: Vec<TypeId>,
    /// Written as a bare constraint `[T ~int]` rather than `interface{...}`.
    pub implicit: bool,
    /// The predeclared `comparable`.
    pub comparable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParam {
    pub name: String,
    pub obj: ObjId,
    pub index: usize,
    /// Constraint interface; `INVALID` until resolved.
    pub bound: TypeId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Term {
    pub tilde: bool,
    pub ty: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(BasicKind),
    Named(Named),
    Alias(Alias),
    Array { elem: TypeId, len: u64 },
    Slice(TypeId),
    Struct(Vec<StructField>),
    Pointer(TypeId),
    Map { key: TypeId, value: TypeId },
    Chan { dir: ChanDir, elem: TypeId },
    Signature(Signature),
    Interface(Interface),
    TypeParam(TypeParam),
    Tuple(Vec<TypeId>),
    Union(Vec<Term>),
}

/// Arena of all types created while checking one package.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Type>,
    interned: FxHashMap<Type, TypeId>,
    /// `(origin, type args) -> instance`
    pub(crate) instances: FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
    /// Instances created before their origin's underlying type was known.
    pub(crate) pending_expansion: Vec<TypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut types: Vec<Type> = BASIC_KINDS.iter().map(|k| Type::Basic(*k)).collect();
        types.push(Type::Interface(Interface::default()));
        TypeTable {
            types,
            interned: FxHashMap::default(),
            instances: FxHashMap::default(),
            pending_expansion: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub(crate) fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.0 as usize]
    }

    /// Add a type with identity.
    pub fn add(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Add a structural type, reusing an existing id for an equal type.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(id) = self.interned.get(&ty) {
            return *id;
        }
        let id = self.add(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Pointer(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Slice(elem))
    }

    pub fn array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.intern(Type::Array { elem, len })
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(Type::Map { key, value })
    }

    pub fn chan(&mut self, dir: ChanDir, elem: TypeId) -> TypeId {
        self.intern(Type::Chan { dir, elem })
    }

    pub fn tuple(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.intern(Type::Tuple(elems))
    }

    pub fn signature(&mut self, sig: Signature) -> TypeId {
        self.intern(Type::Signature(sig))
    }

    /// A plain `func(params) results` signature.
    pub fn func(&mut self, params: Vec<TypeId>, results: Vec<TypeId>, variadic: bool) -> TypeId {
        self.signature(Signature {
            params,
            results,
            variadic,
            ..Signature::default()
        })
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn named(&self, id: TypeId) -> Option<&Named> {
        match self.get(id) {
            Type::Named(n) => Some(n),
            _ => None,
        }
    }

    pub(crate) fn named_mut(&mut self, id: TypeId) -> Option<&mut Named> {
        match self.get_mut(id) {
            Type::Named(n) => Some(n),
            _ => None,
        }
    }

    pub fn sig(&self, id: TypeId) -> Option<&Signature> {
        match self.get(self.underlying(id)) {
            Type::Signature(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_param(&self, id: TypeId) -> Option<&TypeParam> {
        match self.get(id) {
            Type::TypeParam(tp) => Some(tp),
            _ => None,
        }
    }

    pub fn tuple_elems(&self, id: TypeId) -> Option<&[TypeId]> {
        match self.get(id) {
            Type::Tuple(elems) => Some(elems),
            _ => None,
        }
    }

    /// Follow alias chains to the aliased type.
    pub fn unalias(&self, mut id: TypeId) -> TypeId {
        for _ in 0..=self.types.len() {
            match self.get(id) {
                Type::Alias(a) => match a.actual {
                    Some(actual) => id = actual,
                    None => return TypeId::INVALID,
                },
                _ => return id,
            }
        }
        TypeId::INVALID
    }

    /// The structural type behind defined types and aliases. Type
    /// parameters are their own underlying type. A defined type whose
    /// declaration is still in flight reports `invalid type`.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        let mut id = self.unalias(id);
        for _ in 0..=self.types.len() {
            match self.get(id) {
                Type::Named(n) => match n.underlying {
                    Some(u) => id = self.unalias(u),
                    None => return TypeId::INVALID,
                },
                _ => return id,
            }
        }
        TypeId::INVALID
    }

    pub fn basic_kind(&self, id: TypeId) -> Option<BasicKind> {
        match self.get(self.underlying(id)) {
            Type::Basic(k) => Some(*k),
            _ => None,
        }
    }

    fn basic_is(&self, id: TypeId, pred: fn(BasicKind) -> bool) -> bool {
        self.basic_kind(id).is_some_and(pred)
    }

    pub fn is_boolean(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_boolean)
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_integer)
    }

    pub fn is_unsigned(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_unsigned)
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_float)
    }

    pub fn is_complex(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_complex)
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_numeric)
    }

    pub fn is_string(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_string)
    }

    pub fn is_ordered(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_ordered)
    }

    pub fn is_const_type(&self, id: TypeId) -> bool {
        self.basic_is(id, BasicKind::is_const_type)
    }

    /// Untyped kinds are only ever used directly, never behind a name.
    pub fn is_untyped(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Basic(k) if k.is_untyped())
    }

    pub fn is_typed(&self, id: TypeId) -> bool {
        !self.is_untyped(id)
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.get(self.underlying(id)), Type::Interface(_))
    }

    pub fn is_type_param(&self, id: TypeId) -> bool {
        matches!(self.get(self.unalias(id)), Type::TypeParam(_))
    }

    /// Interface that is not a type parameter.
    pub fn is_plain_interface(&self, id: TypeId) -> bool {
        !self.is_type_param(id) && self.is_interface(id)
    }

    /// Defined types, basic types and type parameters have names; type
    /// literals do not.
    pub fn has_name(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.unalias(id)),
            Type::Basic(_) | Type::Named(_) | Type::TypeParam(_)
        )
    }

    /// Default type for untyped kinds, the type itself otherwise.
    pub fn default_type(&self, id: TypeId) -> TypeId {
        match self.get(id) {
            Type::Basic(k) if k.is_untyped() => TypeId::basic(k.default_kind()),
            _ => id,
        }
    }

    // ── Display ─────────────────────────────────────────────────────────

    pub fn type_string(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id, 0);
        out
    }

    fn write_list(&self, out: &mut String, ids: &[TypeId], depth: usize) {
        for (i, t) in ids.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_type(out, *t, depth);
        }
    }

    fn write_type(&self, out: &mut String, id: TypeId, depth: usize) {
        if depth > 32 {
            out.push_str("…");
            return;
        }
        let depth = depth + 1;
        if id == TypeId::ANY {
            out.push_str("any");
            return;
        }
        match self.get(id) {
            Type::Basic(k) => out.push_str(k.name()),
            Type::Named(n) => {
                if let Some(module) = &n.module {
                    let _ = write!(out, "{module}.");
                }
                out.push_str(&n.name);
                if !n.type_args.is_empty() {
                    out.push('[');
                    self.write_list(out, &n.type_args, depth);
                    out.push(']');
                }
            }
            Type::Alias(a) => out.push_str(&a.name),
            Type::Array { elem, len } => {
                let _ = write!(out, "[{len}]");
                self.write_type(out, *elem, depth);
            }
            Type::Slice(elem) => {
                out.push_str("[]");
                self.write_type(out, *elem, depth);
            }
            Type::Struct(fields) => {
                out.push_str("struct{");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    if !f.embedded {
                        out.push_str(&f.name);
                        out.push(' ');
                    }
                    self.write_type(out, f.ty, depth);
                }
                out.push('}');
            }
            Type::Pointer(elem) => {
                out.push('*');
                self.write_type(out, *elem, depth);
            }
            Type::Map { key, value } => {
                out.push_str("map[");
                self.write_type(out, *key, depth);
                out.push(']');
                self.write_type(out, *value, depth);
            }
            Type::Chan { dir, elem } => {
                out.push_str(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.write_type(out, *elem, depth);
            }
            Type::Signature(sig) => {
                out.push_str("func");
                self.write_signature(out, sig, depth);
            }
            Type::Interface(iface) => {
                if iface.comparable {
                    out.push_str("comparable");
                    return;
                }
                if iface.implicit && iface.methods.is_empty() && iface.embedded.len() == 1 {
                    self.write_type(out, iface.embedded[0], depth);
                    return;
                }
                out.push_str("interface{");
                let mut first = true;
                for m in &iface.methods {
                    if !first {
                        out.push_str("; ");
                    }
                    first = false;
                    out.push_str(&m.name);
                    match self.get(m.sig) {
                        Type::Signature(sig) => self.write_signature(out, sig, depth),
                        _ => out.push_str("()"),
                    }
                }
                for e in &iface.embedded {
                    if !first {
                        out.push_str("; ");
                    }
                    first = false;
                    self.write_type(out, *e, depth);
                }
                out.push('}');
            }
            Type::TypeParam(tp) => out.push_str(&tp.name),
            Type::Tuple(elems) => {
                out.push('(');
                self.write_list(out, elems, depth);
                out.push(')');
            }
            Type::Union(terms) => {
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" | ");
                    }
                    if t.tilde {
                        out.push('~');
                    }
                    self.write_type(out, t.ty, depth);
                }
            }
        }
    }

    fn write_signature(&self, out: &mut String, sig: &Signature, depth: usize) {
        if !sig.type_params.is_empty() {
            out.push('[');
            for (i, tp) in sig.type_params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                self.write_type(out, *tp, depth);
                out.push(' ');
                let bound = self.type_param(*tp).map(|p| p.bound).unwrap_or(TypeId::ANY);
                if bound.is_valid() {
                    self.write_type(out, bound, depth);
                } else {
                    out.push_str("any");
                }
            }
            out.push(']');
        }
        out.push('(');
        for (i, p) in sig.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if sig.variadic && i + 1 == sig.params.len() {
                out.push_str("...");
                match self.get(*p) {
                    Type::Slice(elem) => self.write_type(out, *elem, depth),
                    _ => self.write_type(out, *p, depth),
                }
            } else {
                self.write_type(out, *p, depth);
            }
        }
        out.push(')');
        match sig.results.as_slice() {
            [] => {}
            [single] => {
                out.push(' ');
                self.write_type(out, *single, depth);
            }
            results => {
                out.push_str(" (");
                self.write_list(out, results, depth);
                out.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_ids_are_fixed() {
        let tt = TypeTable::new();
        assert_eq!(tt.get(TypeId::INT), &Type::Basic(BasicKind::Int));
        assert_eq!(tt.get(TypeId::UNTYPED_NIL), &Type::Basic(BasicKind::UntypedNil));
        assert!(tt.is_interface(TypeId::ANY));
        assert_eq!(tt.type_string(TypeId::ANY), "any");
    }

    #[test]
    fn composite_types_are_interned() {
        let mut tt = TypeTable::new();
        let a = tt.slice(TypeId::INT);
        let b = tt.slice(TypeId::INT);
        assert_eq!(a, b);
        let m = tt.map(TypeId::STRING, a);
        assert_eq!(tt.type_string(m), "map[string][]int");
    }

    #[test]
    fn signature_strings_show_variadic_parameter() {
        let mut tt = TypeTable::new();
        let xs = tt.slice(TypeId::ANY);
        let sig = tt.func(vec![TypeId::STRING, xs], vec![TypeId::INT], true);
        assert_eq!(tt.type_string(sig), "func(string, ...any) int");
        let pair = tt.func(vec![], vec![TypeId::INT, TypeId::BOOL], false);
        assert_eq!(tt.type_string(pair), "func() (int, bool)");
    }

    #[test]
    fn untyped_defaults() {
        let tt = TypeTable::new();
        assert_eq!(tt.default_type(TypeId::UNTYPED_RUNE), TypeId::INT32);
        assert_eq!(tt.default_type(TypeId::UNTYPED_FLOAT), TypeId::FLOAT64);
        assert_eq!(tt.default_type(TypeId::STRING), TypeId::STRING);
        assert!(tt.is_untyped(TypeId::UNTYPED_NIL));
        assert!(!tt.is_untyped(TypeId::INT));
    }
}
