//! The output side tables.

use gop_ast::NodeId;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::constant::Value;
use crate::objects::ObjId;
use crate::operand::Mode;
use crate::scope::ScopeId;
use crate::types::TypeId;

/// What the checker recorded for one expression.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeAndValue {
    pub mode: Mode,
    pub ty: TypeId,
    pub value: Option<Value>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SelectionKind {
    FieldVal,
    MethodVal,
    MethodExpr,
}

/// A resolved `x.f` on a value or type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Selection {
    pub kind: SelectionKind,
    pub recv: TypeId,
    pub obj: ObjId,
    /// Field indices from the receiver down to the selected member.
    pub path: Vec<usize>,
    /// A pointer was followed along the path.
    pub indirect: bool,
    pub ty: TypeId,
}

/// Type arguments of a generic function or type use.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Instance {
    pub type_args: Vec<TypeId>,
    pub ty: TypeId,
}

/// A conversion that code generation must insert at runtime.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ImplicitConversion {
    /// A non-boolean used as a condition. `constant` holds the folded truth
    /// value when the condition is constant.
    Truthy { from: TypeId, constant: Option<bool> },
    /// A number or boolean concatenated with a string.
    ToText { from: TypeId },
}

/// A reserved bare call rewritten to a qualified module member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QualifiedCall {
    /// Name the module is imported under in the calling file.
    pub qualifier: String,
    pub module: String,
    pub member: String,
}

/// One package-level variable initialisation, in execution order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Initializer {
    pub lhs: Vec<ObjId>,
    pub rhs: NodeId,
}

#[derive(Clone, Debug, Default)]
pub struct Info {
    pub types: FxHashMap<NodeId, TypeAndValue>,
    /// Declaring identifiers.
    pub defs: FxHashMap<NodeId, ObjId>,
    /// Identifier expressions and the objects they denote.
    pub uses: FxHashMap<NodeId, ObjId>,
    /// Objects declared implicitly, e.g. the per-clause variable of a type switch.
    pub implicits: FxHashMap<NodeId, ObjId>,
    pub selections: FxHashMap<NodeId, Selection>,
    pub instances: FxHashMap<NodeId, Instance>,
    pub conversions: FxHashMap<NodeId, ImplicitConversion>,
    pub rewrites: FxHashMap<NodeId, QualifiedCall>,
    pub scopes: FxHashMap<NodeId, ScopeId>,
    pub init_order: Vec<Initializer>,
}

impl Info {
    pub fn type_of(&self, node: NodeId) -> Option<TypeId> {
        self.types.get(&node).map(|tv| tv.ty)
    }

    pub fn value_of(&self, node: NodeId) -> Option<&Value> {
        self.types.get(&node).and_then(|tv| tv.value.as_ref())
    }

    pub fn object_of(&self, ident: NodeId) -> Option<ObjId> {
        self.defs.get(&ident).or_else(|| self.uses.get(&ident)).copied()
    }
}
