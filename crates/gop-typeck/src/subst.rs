//! Type-parameter substitution and instantiation of generic types.

use rustc_hash::FxHashMap;

use crate::types::{Interface, Method, Named, Signature, StructField, Term, Type, TypeId, TypeTable};

const MAX_DEPTH: usize = 64;

/// Mapping from type parameters to the types that replace them.
#[derive(Clone, Debug, Default)]
pub struct SubstMap {
    map: FxHashMap<TypeId, TypeId>,
}

impl SubstMap {
    pub fn new(params: &[TypeId], args: &[TypeId]) -> Self {
        SubstMap {
            map: params.iter().copied().zip(args.iter().copied()).collect(),
        }
    }

    pub fn insert(&mut self, param: TypeId, arg: TypeId) {
        self.map.insert(param, arg);
    }

    pub fn get(&self, param: TypeId) -> Option<TypeId> {
        self.map.get(&param).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Replace type parameters in `t`. Returns `t` itself when nothing in it
/// changes, so identity of defined types is preserved.
pub fn subst(tt: &mut TypeTable, t: TypeId, smap: &SubstMap) -> TypeId {
    if smap.is_empty() {
        return t;
    }
    subst_depth(tt, t, smap, 0)
}

fn subst_list(tt: &mut TypeTable, ids: &[TypeId], smap: &SubstMap, depth: usize) -> Option<Vec<TypeId>> {
    let mut changed = false;
    let out: Vec<TypeId> = ids
        .iter()
        .map(|id| {
            let n = subst_depth(tt, *id, smap, depth);
            changed |= n != *id;
            n
        })
        .collect();
    changed.then_some(out)
}

fn subst_depth(tt: &mut TypeTable, t: TypeId, smap: &SubstMap, depth: usize) -> TypeId {
    if depth > MAX_DEPTH {
        return t;
    }
    if let Some(r) = smap.get(t) {
        return r;
    }
    let d = depth + 1;
    match tt.get(t).clone() {
        Type::Basic(_) | Type::TypeParam(_) | Type::Alias(_) => t,
        Type::Named(n) => {
            if n.type_args.is_empty() {
                return t;
            }
            match (subst_list(tt, &n.type_args, smap, d), n.origin) {
                (Some(args), Some(origin)) => instantiate_named(tt, origin, args),
                _ => t,
            }
        }
        Type::Array { elem, len } => {
            let e = subst_depth(tt, elem, smap, d);
            if e == elem { t } else { tt.array(e, len) }
        }
        Type::Slice(elem) => {
            let e = subst_depth(tt, elem, smap, d);
            if e == elem { t } else { tt.slice(e) }
        }
        Type::Pointer(elem) => {
            let e = subst_depth(tt, elem, smap, d);
            if e == elem { t } else { tt.pointer(e) }
        }
        Type::Chan { dir, elem } => {
            let e = subst_depth(tt, elem, smap, d);
            if e == elem { t } else { tt.chan(dir, e) }
        }
        Type::Map { key, value } => {
            let k = subst_depth(tt, key, smap, d);
            let v = subst_depth(tt, value, smap, d);
            if k == key && v == value { t } else { tt.map(k, v) }
        }
        Type::Tuple(elems) => match subst_list(tt, &elems, smap, d) {
            Some(elems) => tt.tuple(elems),
            None => t,
        },
        Type::Struct(fields) => {
            let mut changed = false;
            let fields: Vec<StructField> = fields
                .into_iter()
                .map(|f| {
                    let ty = subst_depth(tt, f.ty, smap, d);
                    changed |= ty != f.ty;
                    StructField { ty, ..f }
                })
                .collect();
            if changed { tt.intern(Type::Struct(fields)) } else { t }
        }
        Type::Signature(sig) => {
            let params = subst_list(tt, &sig.params, smap, d);
            let results = subst_list(tt, &sig.results, smap, d);
            if params.is_none() && results.is_none() {
                return t;
            }
            tt.signature(Signature {
                params: params.unwrap_or(sig.params),
                results: results.unwrap_or(sig.results),
                ..sig
            })
        }
        Type::Interface(iface) => {
            let mut changed = false;
            let methods: Vec<Method> = iface
                .methods
                .into_iter()
                .map(|m| {
                    let sig = subst_depth(tt, m.sig, smap, d);
                    changed |= sig != m.sig;
                    Method { sig, ..m }
                })
                .collect();
            let embedded = match subst_list(tt, &iface.embedded, smap, d) {
                Some(e) => {
                    changed = true;
                    e
                }
                None => iface.embedded,
            };
            if !changed {
                return t;
            }
            tt.intern(Type::Interface(Interface {
                methods,
                embedded,
                ..iface
            }))
        }
        Type::Union(terms) => {
            let mut changed = false;
            let terms: Vec<Term> = terms
                .into_iter()
                .map(|term| {
                    let ty = subst_depth(tt, term.ty, smap, d);
                    changed |= ty != term.ty;
                    Term { ty, ..term }
                })
                .collect();
            if changed { tt.intern(Type::Union(terms)) } else { t }
        }
    }
}

/// The instance `origin[args]`, created once per distinct argument list.
///
/// The instance is registered before its underlying type is substituted so
/// that self-references such as `next *List[T]` resolve to it. If the
/// origin's underlying type is not known yet the instance is queued for
/// [`expand_pending`].
pub fn instantiate_named(tt: &mut TypeTable, origin: TypeId, args: Vec<TypeId>) -> TypeId {
    let key = (origin, args);
    if let Some(id) = tt.instances.get(&key) {
        return *id;
    }
    let Some(base) = tt.named(origin).cloned() else {
        return TypeId::INVALID;
    };
    let (origin, args) = key;
    let inst = tt.add(Type::Named(Named {
        name: base.name.clone(),
        obj: base.obj,
        underlying: None,
        methods: base.methods.clone(),
        type_params: Vec::new(),
        type_args: args.clone(),
        origin: Some(origin),
        module: base.module.clone(),
    }));
    tt.instances.insert((origin, args), inst);
    if !expand(tt, inst) {
        tt.pending_expansion.push(inst);
    }
    inst
}

/// Compute the underlying type of an instance from its origin. Returns
/// false if the origin is still unresolved.
fn expand(tt: &mut TypeTable, inst: TypeId) -> bool {
    let Some(named) = tt.named(inst).cloned() else {
        return true;
    };
    let Some(origin) = named.origin.and_then(|o| tt.named(o).cloned()) else {
        return true;
    };
    let Some(under) = origin.underlying else {
        return false;
    };
    let smap = SubstMap::new(&origin.type_params, &named.type_args);
    let u = subst(tt, under, &smap);
    let u = tt.underlying(u);
    if let Some(n) = tt.named_mut(inst) {
        n.underlying = Some(u);
    }
    true
}

/// Retry instances whose origin was unresolved when they were created.
pub fn expand_pending(tt: &mut TypeTable) {
    let pending = std::mem::take(&mut tt.pending_expansion);
    for inst in pending {
        if !expand(tt, inst) {
            tt.pending_expansion.push(inst);
        }
    }
}

/// The signature of a generic function with its type parameters replaced.
pub fn instantiate_signature(tt: &mut TypeTable, sig: TypeId, args: &[TypeId]) -> TypeId {
    let Some(s) = tt.sig(sig).cloned() else {
        return TypeId::INVALID;
    };
    let smap = SubstMap::new(&s.type_params, args);
    let params: Vec<TypeId> = s.params.iter().map(|p| subst(tt, *p, &smap)).collect();
    let results: Vec<TypeId> = s.results.iter().map(|r| subst(tt, *r, &smap)).collect();
    tt.signature(Signature {
        type_params: Vec::new(),
        recv: s.recv,
        recv_type_params: Vec::new(),
        params,
        results,
        variadic: s.variadic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjId;
    use crate::types::TypeParam;

    fn tparam(tt: &mut TypeTable, name: &str) -> TypeId {
        tt.add(Type::TypeParam(TypeParam {
            name: name.into(),
            obj: ObjId(0),
            index: 0,
            bound: TypeId::ANY,
        }))
    }

    #[test]
    fn unchanged_types_keep_their_id() {
        let mut tt = TypeTable::new();
        let t = tparam(&mut tt, "T");
        let ints = tt.slice(TypeId::INT);
        let smap = SubstMap::new(&[t], &[TypeId::STRING]);
        assert_eq!(subst(&mut tt, ints, &smap), ints);
        let ts = tt.slice(t);
        let strings = subst(&mut tt, ts, &smap);
        assert_eq!(tt.type_string(strings), "[]string");
    }

    #[test]
    fn recursive_generic_instances_refer_to_themselves() {
        let mut tt = TypeTable::new();
        let t = tparam(&mut tt, "T");
        let list = tt.add(Type::Named(Named {
            name: "List".into(),
            obj: ObjId(0),
            underlying: None,
            methods: Vec::new(),
            type_params: vec![t],
            type_args: Vec::new(),
            origin: None,
            module: None,
        }));
        let self_inst = instantiate_named(&mut tt, list, vec![t]);
        let next = tt.pointer(self_inst);
        let body = tt.intern(Type::Struct(vec![
            StructField { name: "val".into(), ty: t, embedded: false, obj: ObjId(0) },
            StructField { name: "next".into(), ty: next, embedded: false, obj: ObjId(0) },
        ]));
        if let Some(n) = tt.named_mut(list) {
            n.underlying = Some(body);
        }
        expand_pending(&mut tt);

        let ints = instantiate_named(&mut tt, list, vec![TypeId::INT]);
        assert_eq!(tt.type_string(ints), "List[int]");
        assert_eq!(
            tt.type_string(tt.underlying(ints)),
            "struct{val int; next *List[int]}"
        );
        assert_eq!(instantiate_named(&mut tt, list, vec![TypeId::INT]), ints);
    }

    #[test]
    fn generic_signatures_lose_their_type_parameters() {
        let mut tt = TypeTable::new();
        let t = tparam(&mut tt, "T");
        let sig = tt.signature(Signature {
            type_params: vec![t],
            params: vec![t, t],
            results: vec![t],
            ..Signature::default()
        });
        let inst = instantiate_signature(&mut tt, sig, &[TypeId::FLOAT64]);
        assert_eq!(tt.type_string(inst), "func(float64, float64) float64");
    }
}
