//! Structural predicates over types.
//!
//! Everything here is a pure function of the [`TypeTable`]. Rules that
//! need method lookup or the implements cache (assignability, interface
//! satisfaction) live on the checker.

use crate::types::{BasicKind, Interface, Method, Term, Type, TypeId, TypeTable};

const MAX_DEPTH: usize = 64;

// ── Identity ────────────────────────────────────────────────────────────

pub fn identical(tt: &TypeTable, x: TypeId, y: TypeId) -> bool {
    identical_depth(tt, x, y, 0)
}

fn identical_list(tt: &TypeTable, xs: &[TypeId], ys: &[TypeId], depth: usize) -> bool {
    xs.len() == ys.len()
        && xs
            .iter()
            .zip(ys)
            .all(|(x, y)| identical_depth(tt, *x, *y, depth))
}

fn identical_depth(tt: &TypeTable, x: TypeId, y: TypeId, depth: usize) -> bool {
    let x = tt.unalias(x);
    let y = tt.unalias(y);
    if x == y {
        return true;
    }
    if depth > MAX_DEPTH {
        return false;
    }
    let depth = depth + 1;
    match (tt.get(x), tt.get(y)) {
        (Type::Basic(a), Type::Basic(b)) => a == b,
        (Type::Named(a), Type::Named(b)) => match (a.origin, b.origin) {
            (Some(oa), Some(ob)) => {
                oa == ob && identical_list(tt, &a.type_args, &b.type_args, depth)
            }
            _ => false,
        },
        (Type::Array { elem: e1, len: l1 }, Type::Array { elem: e2, len: l2 }) => {
            l1 == l2 && identical_depth(tt, *e1, *e2, depth)
        }
        (Type::Slice(a), Type::Slice(b)) | (Type::Pointer(a), Type::Pointer(b)) => {
            identical_depth(tt, *a, *b, depth)
        }
        (Type::Map { key: k1, value: v1 }, Type::Map { key: k2, value: v2 }) => {
            identical_depth(tt, *k1, *k2, depth) && identical_depth(tt, *v1, *v2, depth)
        }
        (Type::Chan { dir: d1, elem: e1 }, Type::Chan { dir: d2, elem: e2 }) => {
            d1 == d2 && identical_depth(tt, *e1, *e2, depth)
        }
        (Type::Struct(f1), Type::Struct(f2)) => {
            f1.len() == f2.len()
                && f1.iter().zip(f2).all(|(a, b)| {
                    a.name == b.name
                        && a.embedded == b.embedded
                        && identical_depth(tt, a.ty, b.ty, depth)
                })
        }
        (Type::Tuple(a), Type::Tuple(b)) => identical_list(tt, a, b, depth),
        (Type::Signature(a), Type::Signature(b)) => {
            a.variadic == b.variadic
                && a.type_params == b.type_params
                && identical_list(tt, &a.params, &b.params, depth)
                && identical_list(tt, &a.results, &b.results, depth)
        }
        (Type::Interface(_), Type::Interface(_)) => {
            let sx = type_set(tt, x);
            let sy = type_set(tt, y);
            sx.comparable == sy.comparable
                && sx.methods.len() == sy.methods.len()
                && sx.methods.iter().zip(&sy.methods).all(|(a, b)| {
                    a.name == b.name && identical_depth(tt, a.sig, b.sig, depth)
                })
                && match (&sx.terms, &sy.terms) {
                    (None, None) => true,
                    (Some(a), Some(b)) => {
                        a.len() == b.len()
                            && a.iter().all(|t| {
                                b.iter().any(|u| {
                                    t.tilde == u.tilde && identical_depth(tt, t.ty, u.ty, depth)
                                })
                            })
                    }
                    _ => false,
                }
        }
        (Type::Union(a), Type::Union(b)) => {
            a.len() == b.len()
                && a.iter().zip(b).all(|(t, u)| {
                    t.tilde == u.tilde && identical_depth(tt, t.ty, u.ty, depth)
                })
        }
        _ => false,
    }
}

// ── Type sets ───────────────────────────────────────────────────────────

/// The methods and permitted types described by an interface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeSet {
    /// All methods, including embedded ones, sorted by name.
    pub methods: Vec<Method>,
    /// `None` means every type is permitted.
    pub terms: Option<Vec<Term>>,
    pub comparable: bool,
}

impl TypeSet {
    pub fn is_all(&self) -> bool {
        self.terms.is_none() && self.methods.is_empty() && !self.comparable
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.terms, Some(t) if t.is_empty())
    }

    /// Constraint-only interfaces (type terms or `comparable`) cannot be
    /// used as ordinary types.
    pub fn is_constraint_only(&self) -> bool {
        self.terms.is_some() || self.comparable
    }
}

/// Type set of an interface (or of a type parameter's bound). Non-interface
/// types denote the single-term set `{t}`.
pub fn type_set(tt: &TypeTable, t: TypeId) -> TypeSet {
    type_set_depth(tt, t, 0)
}

fn type_set_depth(tt: &TypeTable, t: TypeId, depth: usize) -> TypeSet {
    if depth > MAX_DEPTH {
        return TypeSet::default();
    }
    let t = match tt.get(tt.unalias(t)) {
        Type::TypeParam(tp) => {
            if tp.bound.is_valid() {
                tp.bound
            } else {
                return TypeSet::default();
            }
        }
        _ => t,
    };
    let u = tt.underlying(t);
    let iface: &Interface = match tt.get(u) {
        Type::Interface(i) => i,
        Type::Union(terms) => {
            return TypeSet {
                terms: union_terms(tt, terms, depth),
                ..TypeSet::default()
            }
        }
        _ => {
            return TypeSet {
                terms: Some(vec![Term { tilde: false, ty: t }]),
                ..TypeSet::default()
            }
        }
    };
    let mut set = TypeSet {
        methods: iface.methods.clone(),
        terms: None,
        comparable: iface.comparable,
    };
    for e in &iface.embedded {
        let embedded = match tt.get(tt.underlying(*e)) {
            Type::Interface(_) => type_set_depth(tt, *e, depth + 1),
            Type::Union(terms) => TypeSet {
                terms: union_terms(tt, terms, depth + 1),
                ..TypeSet::default()
            },
            _ => TypeSet {
                terms: Some(vec![Term {
                    tilde: false,
                    ty: *e,
                }]),
                ..TypeSet::default()
            },
        };
        for m in embedded.methods {
            if !set.methods.iter().any(|x| x.name == m.name) {
                set.methods.push(m);
            }
        }
        set.comparable |= embedded.comparable;
        set.terms = intersect(tt, set.terms, embedded.terms);
    }
    set.methods.sort_by(|a, b| a.name.cmp(&b.name));
    set
}

fn union_terms(tt: &TypeTable, terms: &[Term], depth: usize) -> Option<Vec<Term>> {
    let mut out = Vec::new();
    for term in terms {
        if !term.tilde && tt.is_interface(term.ty) && !tt.is_type_param(term.ty) {
            match type_set_depth(tt, term.ty, depth + 1).terms {
                None => return None,
                Some(inner) => out.extend(inner),
            }
        } else {
            out.push(*term);
        }
    }
    Some(out)
}

fn term_includes(tt: &TypeTable, term: &Term, t: TypeId) -> bool {
    if term.tilde {
        identical(tt, tt.underlying(t), term.ty)
    } else {
        identical(tt, t, term.ty)
    }
}

fn intersect(tt: &TypeTable, a: Option<Vec<Term>>, b: Option<Vec<Term>>) -> Option<Vec<Term>> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some(a), Some(b)) => {
            let mut out = Vec::new();
            for x in &a {
                for y in &b {
                    let meet = match (x.tilde, y.tilde) {
                        (true, true) if identical(tt, x.ty, y.ty) => Some(*x),
                        (true, false) if term_includes(tt, x, y.ty) => Some(*y),
                        (false, true) if term_includes(tt, y, x.ty) => Some(*x),
                        (false, false) if identical(tt, x.ty, y.ty) => Some(*x),
                        _ => None,
                    };
                    if let Some(m) = meet {
                        if !out.iter().any(|o: &Term| o.tilde == m.tilde && identical(tt, o.ty, m.ty)) {
                            out.push(m);
                        }
                    }
                }
            }
            Some(out)
        }
    }
}

/// Whether `t` is in the type set of the interface `iface`, ignoring methods.
pub fn in_terms(tt: &TypeTable, set: &TypeSet, t: TypeId) -> bool {
    match &set.terms {
        None => true,
        Some(terms) => terms.iter().any(|term| term_includes(tt, term, t)),
    }
}

/// Render a term list, e.g. `~int | string`.
pub fn terms_string(tt: &TypeTable, terms: &[Term]) -> String {
    terms
        .iter()
        .map(|t| {
            let ty = tt.type_string(t.ty);
            if t.tilde {
                format!("~{ty}")
            } else {
                ty
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Call `f` with the underlying type of every member of `t`'s type set.
/// For ordinary types that is just `underlying(t)`. Returns false when a
/// type parameter's set is unrestricted, since nothing can be said about
/// its members.
pub fn under_is(tt: &TypeTable, t: TypeId, mut f: impl FnMut(TypeId) -> bool) -> bool {
    if tt.is_type_param(t) {
        match type_set(tt, t).terms {
            None => false,
            Some(terms) => terms.iter().all(|term| f(tt.underlying(term.ty))),
        }
    } else {
        f(tt.underlying(t))
    }
}

/// Like [`under_is`] for basic-kind properties.
pub fn all_basic(tt: &TypeTable, t: TypeId, pred: fn(BasicKind) -> bool) -> bool {
    under_is(tt, t, |u| matches!(tt.get(u), Type::Basic(k) if pred(*k)))
}

pub fn all_boolean(tt: &TypeTable, t: TypeId) -> bool {
    all_basic(tt, t, BasicKind::is_boolean)
}

pub fn all_integer(tt: &TypeTable, t: TypeId) -> bool {
    all_basic(tt, t, BasicKind::is_integer)
}

pub fn all_unsigned(tt: &TypeTable, t: TypeId) -> bool {
    all_basic(tt, t, BasicKind::is_unsigned)
}

pub fn all_numeric(tt: &TypeTable, t: TypeId) -> bool {
    all_basic(tt, t, BasicKind::is_numeric)
}

pub fn all_string(tt: &TypeTable, t: TypeId) -> bool {
    all_basic(tt, t, BasicKind::is_string)
}

pub fn all_ordered(tt: &TypeTable, t: TypeId) -> bool {
    all_basic(tt, t, BasicKind::is_ordered)
}

pub fn all_numeric_or_string(tt: &TypeTable, t: TypeId) -> bool {
    all_basic(tt, t, |k| k.is_numeric() || k.is_string())
}

// ── Core types ──────────────────────────────────────────────────────────

/// The single underlying type shared by every member of `t`'s type set.
/// Ordinary types are their own core type.
pub fn core_type(tt: &TypeTable, t: TypeId) -> Option<TypeId> {
    if !tt.is_type_param(t) {
        let u = tt.underlying(t);
        if let Type::Interface(_) = tt.get(u) {
            let set = type_set(tt, u);
            if let Some(terms) = set.terms {
                return common_underlying(tt, &terms);
            }
        }
        return Some(u);
    }
    let terms = type_set(tt, t).terms?;
    common_underlying(tt, &terms)
}

fn common_underlying(tt: &TypeTable, terms: &[Term]) -> Option<TypeId> {
    let first = tt.underlying(terms.first()?.ty);
    terms[1..]
        .iter()
        .all(|term| identical(tt, tt.underlying(term.ty), first))
        .then_some(first)
}

/// Core term of a constraint: the single term if there is one, otherwise
/// `~U` when every term shares the underlying type `U`. The flag reports
/// whether the set consists of exactly one term.
pub fn core_term(tt: &TypeTable, bound: TypeId) -> Option<(Term, bool)> {
    let terms = type_set(tt, bound).terms?;
    match terms.as_slice() {
        [single] => Some((*single, true)),
        _ => common_underlying(tt, &terms).map(|u| (Term { tilde: true, ty: u }, false)),
    }
}

// ── Comparability and nil ───────────────────────────────────────────────

/// Whether values of `t` support `==`. In `dynamic` mode interfaces are
/// always comparable since a runtime check guards the comparison.
pub fn comparable(tt: &TypeTable, t: TypeId, dynamic: bool) -> bool {
    comparable_depth(tt, t, dynamic, 0)
}

fn comparable_depth(tt: &TypeTable, t: TypeId, dynamic: bool, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        return true;
    }
    if tt.is_type_param(t) {
        let set = type_set(tt, t);
        return set.comparable
            || match &set.terms {
                Some(terms) => terms
                    .iter()
                    .all(|term| comparable_depth(tt, term.ty, dynamic, depth + 1)),
                None => false,
            };
    }
    let u = tt.underlying(t);
    match tt.get(u) {
        Type::Basic(k) => *k != BasicKind::UntypedNil,
        Type::Pointer(_) | Type::Chan { .. } => true,
        Type::Struct(fields) => fields
            .iter()
            .all(|f| comparable_depth(tt, f.ty, dynamic, depth + 1)),
        Type::Array { elem, .. } => comparable_depth(tt, *elem, dynamic, depth + 1),
        Type::Interface(_) => {
            if dynamic {
                return true;
            }
            let set = type_set(tt, u);
            set.comparable
                || match &set.terms {
                    Some(terms) => terms
                        .iter()
                        .all(|term| comparable_depth(tt, term.ty, false, depth + 1)),
                    None => true,
                }
        }
        _ => false,
    }
}

/// Whether `nil` is a valid value of `t`.
pub fn has_nil(tt: &TypeTable, t: TypeId) -> bool {
    if tt.is_type_param(t) {
        return under_is(tt, t, |u| has_nil(tt, u));
    }
    match tt.get(tt.underlying(t)) {
        Type::Basic(k) => matches!(k, BasicKind::UnsafePointer | BasicKind::UntypedNil),
        Type::Pointer(_)
        | Type::Slice(_)
        | Type::Signature(_)
        | Type::Map { .. }
        | Type::Chan { .. } => true,
        Type::Interface(_) => !type_set(tt, t).is_constraint_only(),
        _ => false,
    }
}

/// Whether `t` mentions any of `params`.
pub fn mentions(tt: &TypeTable, t: TypeId, params: &[TypeId]) -> bool {
    mentions_depth(tt, t, params, 0)
}

fn mentions_depth(tt: &TypeTable, t: TypeId, params: &[TypeId], depth: usize) -> bool {
    if params.is_empty() || depth > MAX_DEPTH {
        return false;
    }
    if params.contains(&t) {
        return true;
    }
    let d = depth + 1;
    let any = |ids: &[TypeId]| ids.iter().any(|x| mentions_depth(tt, *x, params, d));
    match tt.get(t) {
        Type::Basic(_) | Type::TypeParam(_) => false,
        Type::Named(n) => any(&n.type_args),
        Type::Alias(a) => a.actual.is_some_and(|x| mentions_depth(tt, x, params, d)),
        Type::Array { elem, .. } | Type::Slice(elem) | Type::Pointer(elem) | Type::Chan { elem, .. } => {
            mentions_depth(tt, *elem, params, d)
        }
        Type::Map { key, value } => any(&[*key, *value]),
        Type::Struct(fields) => fields.iter().any(|f| mentions_depth(tt, f.ty, params, d)),
        Type::Signature(sig) => any(&sig.params) || any(&sig.results),
        Type::Interface(iface) => {
            iface.methods.iter().any(|m| mentions_depth(tt, m.sig, params, d)) || any(&iface.embedded)
        }
        Type::Tuple(elems) => any(elems),
        Type::Union(terms) => terms.iter().any(|term| mentions_depth(tt, term.ty, params, d)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjId;
    use crate::types::{Named, StructField, TypeParam};
    use gop_ast::ChanDir;

    fn named(tt: &mut TypeTable, name: &str, underlying: TypeId) -> TypeId {
        tt.add(Type::Named(Named {
            name: name.into(),
            obj: ObjId(0),
            underlying: Some(underlying),
            methods: Vec::new(),
            type_params: Vec::new(),
            type_args: Vec::new(),
            origin: None,
            module: None,
        }))
    }

    fn constraint(tt: &mut TypeTable, terms: Vec<Term>) -> TypeId {
        let union = tt.add(Type::Union(terms));
        tt.add(Type::Interface(Interface {
            embedded: vec![union],
            implicit: true,
            ..Interface::default()
        }))
    }

    fn type_param(tt: &mut TypeTable, name: &str, bound: TypeId) -> TypeId {
        tt.add(Type::TypeParam(TypeParam {
            name: name.into(),
            obj: ObjId(0),
            index: 0,
            bound,
        }))
    }

    #[test]
    fn defined_types_are_distinct() {
        let mut tt = TypeTable::new();
        let a = named(&mut tt, "A", TypeId::INT);
        let b = named(&mut tt, "B", TypeId::INT);
        assert!(!identical(&tt, a, b));
        assert!(identical(&tt, tt.underlying(a), tt.underlying(b)));
        let s1 = tt.slice(a);
        let s2 = tt.slice(a);
        assert!(identical(&tt, s1, s2));
    }

    #[test]
    fn comparability() {
        let mut tt = TypeTable::new();
        let ints = tt.slice(TypeId::INT);
        assert!(!comparable(&tt, ints, false));
        let arr = tt.array(TypeId::STRING, 3);
        assert!(comparable(&tt, arr, false));
        let st = tt.add(Type::Struct(vec![StructField {
            name: "xs".into(),
            ty: ints,
            embedded: false,
            obj: ObjId(0),
        }]));
        assert!(!comparable(&tt, st, false));
        let ch = tt.chan(ChanDir::Both, ints);
        assert!(comparable(&tt, ch, false));
        assert!(comparable(&tt, TypeId::ANY, true));
        assert!(!comparable(&tt, TypeId::UNTYPED_NIL, false));
    }

    #[test]
    fn nil_capable_types() {
        let mut tt = TypeTable::new();
        let p = tt.pointer(TypeId::INT);
        let m = tt.map(TypeId::STRING, TypeId::INT);
        assert!(has_nil(&tt, p));
        assert!(has_nil(&tt, m));
        assert!(has_nil(&tt, TypeId::ANY));
        assert!(!has_nil(&tt, TypeId::INT));
        let arr = tt.array(TypeId::INT, 2);
        assert!(!has_nil(&tt, arr));
    }

    #[test]
    fn type_param_predicates_hold_member_wise() {
        let mut tt = TypeTable::new();
        let number = constraint(
            &mut tt,
            vec![
                Term { tilde: true, ty: TypeId::INT },
                Term { tilde: true, ty: TypeId::FLOAT64 },
            ],
        );
        let t = type_param(&mut tt, "T", number);
        assert!(all_numeric(&tt, t));
        assert!(!all_integer(&tt, t));
        assert!(comparable(&tt, t, false));
        assert_eq!(core_type(&tt, t), None);

        let any_t = type_param(&mut tt, "U", TypeId::ANY);
        assert!(!all_numeric(&tt, any_t));
        assert!(!comparable(&tt, any_t, false));
    }

    #[test]
    fn core_types_of_single_underlying_sets() {
        let mut tt = TypeTable::new();
        let ints = tt.slice(TypeId::INT);
        let c = constraint(&mut tt, vec![Term { tilde: true, ty: ints }]);
        let t = type_param(&mut tt, "S", c);
        assert_eq!(core_type(&tt, t), Some(ints));
        assert_eq!(core_term(&tt, c), Some((Term { tilde: true, ty: ints }, true)));
    }

    #[test]
    fn tilde_terms_include_defined_types() {
        let mut tt = TypeTable::new();
        let my_int = named(&mut tt, "MyInt", TypeId::INT);
        let c = constraint(&mut tt, vec![Term { tilde: true, ty: TypeId::INT }]);
        let set = type_set(&tt, c);
        assert!(in_terms(&tt, &set, my_int));
        assert!(in_terms(&tt, &set, TypeId::INT));
        assert!(!in_terms(&tt, &set, TypeId::STRING));
        let exact = constraint(&mut tt, vec![Term { tilde: false, ty: TypeId::INT }]);
        assert!(!in_terms(&tt, &type_set(&tt, exact), my_int));
        assert_eq!(terms_string(&tt, set.terms.as_deref().unwrap_or(&[])), "~int");
    }
}
