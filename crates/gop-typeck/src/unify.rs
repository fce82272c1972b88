//! Structural unification against the type parameters of one generic call.
//!
//! Each type parameter being inferred owns a key in an `ena` union-find
//! table. Parameters unified with each other share a root and therefore a
//! binding; binding a root binds every parameter joined with it.

use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use rustc_hash::FxHashMap;

use crate::predicates::{identical, type_set};
use crate::types::{Type, TypeId, TypeTable};

const DEPTH_LIMIT: usize = 50;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamKey(u32);

impl UnifyKey for ParamKey {
    type Value = Binding;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(i: u32) -> Self {
        ParamKey(i)
    }

    fn tag() -> &'static str {
        "ParamKey"
    }
}

/// The type inferred for a set of joined type parameters, if any.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Binding(pub Option<TypeId>);

impl UnifyValue for Binding {
    type Error = NoError;

    /// A binding written later replaces the earlier one.
    fn unify_values(a: &Self, b: &Self) -> Result<Self, NoError> {
        Ok(Binding(b.0.or(a.0)))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnifyMode {
    /// Types must match exactly.
    Exact,
    /// Assignment context: a defined type matches a type literal with the
    /// same underlying type, and channel directions are ignored.
    Assign,
}

pub struct Unifier {
    table: InPlaceUnificationTable<ParamKey>,
    keys: FxHashMap<TypeId, ParamKey>,
    params: Vec<TypeId>,
    depth: usize,
}

impl Unifier {
    /// A unifier for `params`, with the already known type arguments
    /// `targs` (shorter lists leave the remaining parameters unbound).
    pub fn new(params: &[TypeId], targs: &[Option<TypeId>]) -> Self {
        let mut table = InPlaceUnificationTable::new();
        let mut keys = FxHashMap::default();
        for (i, p) in params.iter().enumerate() {
            let bound = targs.get(i).copied().flatten();
            keys.insert(*p, table.new_key(Binding(bound)));
        }
        Unifier {
            table,
            keys,
            params: params.to_vec(),
            depth: 0,
        }
    }

    /// Every one of `tparams` is being inferred here.
    fn inferring(&self, tparams: &[TypeId]) -> bool {
        tparams.iter().all(|t| self.keys.contains_key(t))
    }

    /// `t` if it is one of the parameters being inferred.
    fn bound_param(&self, tt: &TypeTable, t: TypeId) -> Option<TypeId> {
        let t = tt.unalias(t);
        self.keys.contains_key(&t).then_some(t)
    }

    pub fn at(&mut self, param: TypeId) -> Option<TypeId> {
        let key = *self.keys.get(&param)?;
        self.table.probe_value(key).0
    }

    pub fn set(&mut self, param: TypeId, t: TypeId) {
        if let Some(key) = self.keys.get(&param).copied() {
            self.table.union_value(key, Binding(Some(t)));
        }
    }

    /// Make `x` and `y` share a binding. Fails if both are already bound.
    fn join(&mut self, x: TypeId, y: TypeId) -> bool {
        let (Some(kx), Some(ky)) = (self.keys.get(&x).copied(), self.keys.get(&y).copied()) else {
            return false;
        };
        if self.table.unioned(kx, ky) {
            return true;
        }
        if self.table.probe_value(kx).0.is_some() && self.table.probe_value(ky).0.is_some() {
            return false;
        }
        self.table.union(kx, ky);
        true
    }

    /// Number of parameters without a binding.
    pub fn unknowns(&mut self) -> usize {
        let params = self.params.clone();
        params.into_iter().filter(|p| self.at(*p).is_none()).count()
    }

    /// Current bindings in parameter order.
    pub fn inferred(&mut self) -> Vec<Option<TypeId>> {
        let params = self.params.clone();
        params.into_iter().map(|p| self.at(p)).collect()
    }

    pub fn unify(&mut self, tt: &TypeTable, x: TypeId, y: TypeId, mode: UnifyMode) -> bool {
        self.nify(tt, x, y, mode)
    }

    fn nify(&mut self, tt: &TypeTable, x: TypeId, y: TypeId, mode: UnifyMode) -> bool {
        if self.depth > DEPTH_LIMIT {
            return false;
        }
        self.depth += 1;
        let ok = self.nify_inner(tt, x, y, mode);
        self.depth -= 1;
        ok
    }

    fn nify_inner(&mut self, tt: &TypeTable, x: TypeId, y: TypeId, mode: UnifyMode) -> bool {
        let (mut x, mut y) = (tt.unalias(x), tt.unalias(y));
        if x == y {
            return true;
        }

        // Keep a (bound) type parameter on the left.
        let swap = (tt.is_type_param(y) && !tt.is_type_param(x))
            || (self.bound_param(tt, y).is_some() && self.bound_param(tt, x).is_none());
        if swap {
            std::mem::swap(&mut x, &mut y);
        }

        // In an assignment a type literal is assignable to a defined type
        // with that underlying type, so compare against the underlying type.
        if mode == UnifyMode::Assign {
            let lit = |t: TypeId| !tt.has_name(t);
            if tt.named(x).is_some() && lit(y) {
                x = tt.underlying(x);
            } else if tt.named(y).is_some() && lit(x) {
                y = tt.underlying(y);
            }
        }

        match (self.bound_param(tt, x), self.bound_param(tt, y)) {
            (Some(px), Some(py)) => {
                if self.join(px, py) {
                    return true;
                }
                let (Some(bx), Some(by)) = (self.at(px), self.at(py)) else {
                    return false;
                };
                return self.nify(tt, bx, by, mode);
            }
            (Some(px), None) => {
                let Some(bound) = self.at(px) else {
                    self.set(px, y);
                    return true;
                };
                if !self.nify(tt, bound, y, mode) {
                    return false;
                }
                let (bi, yi) = (tt.is_interface(bound), tt.is_interface(y));
                let (bn, yn) = (tt.named(bound).is_some(), tt.named(y).is_some());
                if bi && yi {
                    if bn && yn {
                        return identical(tt, bound, y);
                    }
                    if type_set(tt, bound).methods.len() != type_set(tt, y).methods.len() {
                        return false;
                    }
                } else if bi || yi {
                    // Either side could be the answer; picking one would make
                    // the result depend on argument order.
                    return false;
                }
                // Prefer a defined type over its underlying type literal.
                if yn {
                    self.set(px, y);
                }
                return true;
            }
            _ => {}
        }

        // Element types match exactly, even in assignments.
        let emode = UnifyMode::Exact;
        match (tt.get(x).clone(), tt.get(y).clone()) {
            (Type::Basic(a), Type::Basic(b)) => a == b,
            (Type::Array { elem: ex, len: lx }, Type::Array { elem: ey, len: ly }) => {
                lx == ly && self.nify(tt, ex, ey, emode)
            }
            (Type::Slice(ex), Type::Slice(ey)) => self.nify(tt, ex, ey, emode),
            (Type::Pointer(bx), Type::Pointer(by)) => self.nify(tt, bx, by, emode),
            (Type::Struct(fx), Type::Struct(fy)) => {
                fx.len() == fy.len()
                    && fx.iter().zip(&fy).all(|(a, b)| {
                        a.name == b.name && a.embedded == b.embedded && self.nify(tt, a.ty, b.ty, emode)
                    })
            }
            (Type::Tuple(ex), Type::Tuple(ey)) => {
                ex.len() == ey.len() && ex.iter().zip(&ey).all(|(a, b)| self.nify(tt, *a, *b, mode))
            }
            // A generic function argument joins the inference with its
            // renamed type parameters, so only foreign ones block a match.
            (Type::Signature(sx), Type::Signature(sy)) => {
                self.inferring(&sx.type_params)
                    && self.inferring(&sy.type_params)
                    && sx.variadic == sy.variadic
                    && sx.params.len() == sy.params.len()
                    && sx.results.len() == sy.results.len()
                    && sx.params.iter().zip(&sy.params).all(|(a, b)| self.nify(tt, *a, *b, emode))
                    && sx.results.iter().zip(&sy.results).all(|(a, b)| self.nify(tt, *a, *b, emode))
            }
            (Type::Interface(_), Type::Interface(_)) => self.nify_interfaces(tt, x, y, emode),
            (Type::Map { key: kx, value: vx }, Type::Map { key: ky, value: vy }) => {
                self.nify(tt, kx, ky, emode) && self.nify(tt, vx, vy, emode)
            }
            (Type::Chan { dir: dx, elem: ex }, Type::Chan { dir: dy, elem: ey }) => {
                (mode == UnifyMode::Assign || dx == dy) && self.nify(tt, ex, ey, emode)
            }
            (Type::Named(nx), Type::Named(ny)) => {
                // Type arguments first, so they unify even when the origins
                // differ and the mismatch is reported on the whole type.
                if nx.type_args.len() != ny.type_args.len() {
                    return false;
                }
                let args_ok = nx
                    .type_args
                    .iter()
                    .zip(&ny.type_args)
                    .all(|(a, b)| self.nify(tt, *a, *b, mode));
                args_ok && nx.origin.unwrap_or(x) == ny.origin.unwrap_or(y)
            }
            // An unbound type parameter only matches itself.
            _ => false,
        }
    }

    fn nify_interfaces(&mut self, tt: &TypeTable, x: TypeId, y: TypeId, mode: UnifyMode) -> bool {
        let (sx, sy) = (type_set(tt, x), type_set(tt, y));
        if sx.comparable != sy.comparable {
            return false;
        }
        let terms_match = match (&sx.terms, &sy.terms) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.len() == b.len()
                    && a.iter().all(|t| {
                        b.iter()
                            .any(|u| t.tilde == u.tilde && identical(tt, t.ty, u.ty))
                    })
            }
            _ => false,
        };
        if !terms_match || sx.methods.len() != sy.methods.len() {
            return false;
        }
        sx.methods
            .iter()
            .zip(&sy.methods)
            .all(|(a, b)| a.name == b.name && self.nify(tt, a.sig, b.sig, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjId;
    use crate::types::{Signature, TypeParam};

    fn param(tt: &mut TypeTable, name: &str, index: usize) -> TypeId {
        tt.add(Type::TypeParam(TypeParam {
            name: name.to_string(),
            obj: ObjId(0),
            index,
            bound: TypeId::ANY,
        }))
    }

    #[test]
    fn binds_parameter_inside_structure() {
        let mut tt = TypeTable::new();
        let t = param(&mut tt, "T", 0);
        let formal = tt.slice(t);
        let actual = tt.slice(TypeId::INT);
        let mut u = Unifier::new(&[t], &[]);
        assert!(u.unify(&tt, formal, actual, UnifyMode::Assign));
        assert_eq!(u.inferred(), vec![Some(TypeId::INT)]);
        assert_eq!(u.unknowns(), 0);
    }

    #[test]
    fn conflicting_bindings_fail() {
        let mut tt = TypeTable::new();
        let t = param(&mut tt, "T", 0);
        let mut u = Unifier::new(&[t], &[]);
        assert!(u.unify(&tt, t, TypeId::INT, UnifyMode::Assign));
        assert!(!u.unify(&tt, t, TypeId::STRING, UnifyMode::Assign));
        assert_eq!(u.at(t), Some(TypeId::INT));
    }

    #[test]
    fn joined_parameters_share_a_binding() {
        let mut tt = TypeTable::new();
        let a = param(&mut tt, "A", 0);
        let b = param(&mut tt, "B", 1);
        let mut u = Unifier::new(&[a, b], &[]);
        assert!(u.unify(&tt, a, b, UnifyMode::Exact));
        assert_eq!(u.unknowns(), 2);
        u.set(b, TypeId::FLOAT64);
        assert_eq!(u.inferred(), vec![Some(TypeId::FLOAT64), Some(TypeId::FLOAT64)]);
    }

    #[test]
    fn element_types_match_exactly() {
        let mut tt = TypeTable::new();
        let t = param(&mut tt, "T", 0);
        let formal = tt.map(TypeId::STRING, t);
        let actual = tt.map(TypeId::INT, TypeId::BOOL);
        let mut u = Unifier::new(&[t], &[]);
        assert!(!u.unify(&tt, formal, actual, UnifyMode::Assign));
    }

    fn func(tt: &mut TypeTable, type_params: Vec<TypeId>, params: Vec<TypeId>, results: Vec<TypeId>) -> TypeId {
        tt.signature(Signature {
            type_params,
            recv: None,
            recv_type_params: Vec::new(),
            params,
            results,
            variadic: false,
        })
    }

    #[test]
    fn generic_function_argument_joins_inference() {
        let mut tt = TypeTable::new();
        let t = param(&mut tt, "T", 0);
        let u_param = param(&mut tt, "U", 1);
        let v = param(&mut tt, "V", 0);
        let formal = func(&mut tt, Vec::new(), vec![t], vec![u_param]);
        let actual = func(&mut tt, vec![v], vec![v], vec![v]);
        let mut u = Unifier::new(&[t, u_param, v], &[]);
        assert!(u.unify(&tt, formal, actual, UnifyMode::Assign));
        u.set(t, TypeId::INT);
        assert_eq!(u.inferred(), vec![Some(TypeId::INT); 3]);
    }

    #[test]
    fn foreign_generic_signature_does_not_unify() {
        let mut tt = TypeTable::new();
        let t = param(&mut tt, "T", 0);
        let v = param(&mut tt, "V", 0);
        let formal = func(&mut tt, Vec::new(), vec![t], vec![]);
        let actual = func(&mut tt, vec![v], vec![v], vec![]);
        let mut u = Unifier::new(&[t], &[]);
        assert!(!u.unify(&tt, formal, actual, UnifyMode::Assign));
    }
}
