//! Field and method lookup, method sets and interface satisfaction.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::checker::Checker;
use crate::error::{Flow, TypeError};
use crate::objects::ObjId;
use crate::predicates::{self, identical, in_terms, type_set};
use crate::subst::{subst, SubstMap};
use crate::types::{Signature, Term, Type, TypeId};

/// Outcome of looking up a field or method by name.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Lookup {
    Field {
        obj: ObjId,
        ty: TypeId,
        path: Vec<usize>,
        indirect: bool,
    },
    /// `ty` is the method's signature without receiver, with the type
    /// arguments of the receiver substituted.
    Method {
        obj: ObjId,
        ty: TypeId,
        path: Vec<usize>,
        indirect: bool,
    },
    /// Two candidates at the same embedding depth.
    Ambiguous,
    /// A method with a pointer receiver on a value that is not addressable.
    NeedsPointer { obj: ObjId },
    NotFound,
}

/// A type reached through embedded fields.
#[derive(Clone, Debug)]
struct Embedded {
    ty: TypeId,
    path: Vec<usize>,
    indirect: bool,
    /// The same type was embedded more than once at this depth.
    multiples: bool,
}

enum Candidate {
    Field(ObjId, TypeId),
    Method(ObjId, TypeId),
}

impl<'a> Checker<'a> {
    /// `(T, false)` for `T`, `(B, true)` for a pointer `*B`.
    pub(crate) fn deref(&self, t: TypeId) -> (TypeId, bool) {
        match self.types.get(self.types.unalias(t)) {
            Type::Pointer(base) => (*base, true),
            _ => (t, false),
        }
    }

    /// Look up `name` among the fields and methods of `t`, breadth first
    /// through embedded fields. `addressable` permits pointer-receiver
    /// methods on a non-pointer `t`.
    pub(crate) fn lookup_field_or_method(&mut self, t: TypeId, addressable: bool, name: &str) -> Flow<Lookup> {
        if name == "_" {
            return Ok(Lookup::NotFound);
        }
        // A defined pointer type has the fields of its base but no methods.
        let t = self.types.unalias(t);
        if self.types.named(t).is_some() {
            let under = self.types.underlying(t);
            if matches!(self.types.get(under), Type::Pointer(_)) {
                let found = self.lookup_impl(under, false, name)?;
                return Ok(match found {
                    Lookup::Method { .. } | Lookup::NeedsPointer { .. } => Lookup::NotFound,
                    other => other,
                });
            }
        }
        self.lookup_impl(t, addressable, name)
    }

    fn lookup_impl(&mut self, t: TypeId, addressable: bool, name: &str) -> Flow<Lookup> {
        let (typ, is_ptr) = self.deref(t);
        if is_ptr && self.types.is_interface(typ) && !self.types.is_type_param(typ) {
            return Ok(Lookup::NotFound);
        }

        let mut current = vec![Embedded {
            ty: typ,
            path: Vec::new(),
            indirect: is_ptr,
            multiples: false,
        }];
        let mut seen: FxHashSet<TypeId> = FxHashSet::default();

        while !current.is_empty() {
            let mut next: Vec<Embedded> = Vec::new();
            let mut found: Option<(Candidate, Vec<usize>, bool)> = None;

            for e in &current {
                let typ = self.types.unalias(e.ty);
                if self.types.named(typ).is_some() {
                    if !seen.insert(typ) {
                        continue;
                    }
                    if let Some((i, m)) = self.named_method(typ, name) {
                        if found.is_some() || e.multiples {
                            return Ok(Lookup::Ambiguous);
                        }
                        self.resolve_method(m)?;
                        let ty = self.method_sig(typ, m);
                        found = Some((Candidate::Method(m, ty), concat(&e.path, i), e.indirect));
                        continue;
                    }
                }

                let under = self.types.underlying(typ);
                match self.types.get(under).clone() {
                    Type::Struct(fields) => {
                        for (i, f) in fields.iter().enumerate() {
                            if f.name == name {
                                if found.is_some() || e.multiples {
                                    return Ok(Lookup::Ambiguous);
                                }
                                found = Some((Candidate::Field(f.obj, f.ty), concat(&e.path, i), e.indirect));
                                continue;
                            }
                            if found.is_none() && f.embedded {
                                let (ft, ptr) = self.deref(f.ty);
                                next.push(Embedded {
                                    ty: ft,
                                    path: concat(&e.path, i),
                                    indirect: e.indirect || ptr,
                                    multiples: e.multiples,
                                });
                            }
                        }
                    }
                    Type::Interface(_) | Type::TypeParam(_) => {
                        let set = type_set(&self.types, under);
                        if let Some((i, m)) = set.methods.iter().enumerate().find(|(_, m)| m.name == name) {
                            let Some(obj) = m.obj else {
                                continue;
                            };
                            if found.is_some() || e.multiples {
                                return Ok(Lookup::Ambiguous);
                            }
                            found = Some((Candidate::Method(obj, m.sig), concat(&e.path, i), e.indirect));
                        }
                    }
                    _ => {}
                }
            }

            if let Some((cand, path, indirect)) = found {
                return Ok(match cand {
                    Candidate::Field(obj, ty) => Lookup::Field {
                        obj,
                        ty,
                        path,
                        indirect,
                    },
                    Candidate::Method(obj, ty) => {
                        if self.objects[obj].ptr_recv && !indirect && !addressable {
                            Lookup::NeedsPointer { obj }
                        } else {
                            Lookup::Method {
                                obj,
                                ty,
                                path,
                                indirect,
                            }
                        }
                    }
                });
            }
            current = self.consolidate_multiples(next);
        }
        Ok(Lookup::NotFound)
    }

    /// Merge entries for the same type found at the same depth.
    fn consolidate_multiples(&self, list: Vec<Embedded>) -> Vec<Embedded> {
        let mut out: Vec<Embedded> = Vec::with_capacity(list.len());
        for e in list {
            match out.iter_mut().find(|o| identical(&self.types, o.ty, e.ty)) {
                Some(o) => o.multiples = true,
                None => out.push(e),
            }
        }
        out
    }

    /// Index and object of the method `name` declared on the defined type
    /// `t` (or on its origin).
    fn named_method(&self, t: TypeId, name: &str) -> Option<(usize, ObjId)> {
        let n = self.types.named(t)?;
        let base = n.origin.and_then(|o| self.types.named(o)).unwrap_or(n);
        base.methods
            .iter()
            .enumerate()
            .find(|(_, m)| self.objects[**m].name == name)
            .map(|(i, m)| (i, *m))
    }

    /// Methods may be looked up before their declaration was checked.
    pub(crate) fn resolve_method(&mut self, m: ObjId) -> Flow<()> {
        if self.objects[m].ty.is_none() {
            self.obj_decl(m)?;
        }
        Ok(())
    }

    /// Signature of method `m` selected on `recv`, without receiver. Type
    /// parameters of a generic receiver are replaced by `recv`'s type
    /// arguments.
    pub(crate) fn method_sig(&mut self, recv: TypeId, m: ObjId) -> TypeId {
        let Some(sig_id) = self.objects[m].ty else {
            return TypeId::INVALID;
        };
        let Some(sig) = self.types.sig(sig_id).cloned() else {
            return sig_id;
        };
        let args = self.types.named(recv).map(|n| n.type_args.clone()).unwrap_or_default();
        let plain = self.types.signature(Signature {
            recv: None,
            recv_type_params: Vec::new(),
            ..sig.clone()
        });
        if sig.recv_type_params.is_empty() || args.len() != sig.recv_type_params.len() {
            return plain;
        }
        let smap = SubstMap::new(&sig.recv_type_params, &args);
        subst(&mut self.types, plain, &smap)
    }

    /// Type of method `name` in the method set of `t`, if any.
    pub(crate) fn method_type(&mut self, t: TypeId, name: &str) -> Flow<Option<TypeId>> {
        Ok(match self.lookup_field_or_method(t, false, name)? {
            Lookup::Method { ty, .. } => Some(ty),
            _ => None,
        })
    }

    // ── Method sets and interfaces ──────────────────────────────────────

    /// The first method of interface `iface` that `v` lacks, with the cause.
    /// With `is_static` false an interface `v` may lack methods (a type
    /// assertion can still succeed); only mismatched signatures count.
    pub(crate) fn missing_method(
        &mut self,
        v: TypeId,
        iface: TypeId,
        is_static: bool,
    ) -> Flow<Option<(String, String)>> {
        let methods = type_set(&self.types, iface).methods;
        if methods.is_empty() {
            return Ok(None);
        }
        let vu = self.types.underlying(v);
        if self.types.is_interface(vu) && !self.types.is_type_param(v) {
            let vset = type_set(&self.types, vu);
            for m in &methods {
                match vset.methods.iter().find(|x| x.name == m.name) {
                    None if is_static => {
                        return Ok(Some((m.name.clone(), format!("missing method {}", m.name))));
                    }
                    None => {}
                    Some(have) if !identical(&self.types, have.sig, m.sig) => {
                        let cause = self.wrong_method_cause(&m.name, have.sig, m.sig);
                        return Ok(Some((m.name.clone(), cause)));
                    }
                    Some(_) => {}
                }
            }
            return Ok(None);
        }

        for m in &methods {
            match self.lookup_field_or_method(v, false, &m.name)? {
                Lookup::Method { ty, .. } => {
                    if !identical(&self.types, ty, m.sig) {
                        let cause = self.wrong_method_cause(&m.name, ty, m.sig);
                        return Ok(Some((m.name.clone(), cause)));
                    }
                }
                Lookup::NeedsPointer { .. } => {
                    return Ok(Some((
                        m.name.clone(),
                        format!("method {} has pointer receiver", m.name),
                    )));
                }
                Lookup::Field { .. } => {
                    return Ok(Some((m.name.clone(), format!("{} is a field, not a method", m.name))));
                }
                Lookup::Ambiguous | Lookup::NotFound => {
                    let cause = self.missing_method_cause(v, &m.name)?;
                    return Ok(Some((m.name.clone(), cause)));
                }
            }
        }
        Ok(None)
    }

    fn wrong_method_cause(&self, name: &str, have: TypeId, want: TypeId) -> String {
        let strip = |s: String| s.strip_prefix("func").map(str::to_string).unwrap_or(s);
        format!(
            "wrong type for method {name}\n\t\thave {name}{}\n\t\twant {name}{}",
            strip(self.type_string(have)),
            strip(self.type_string(want))
        )
    }

    /// `missing method m`, with a hint when a method of the same name in a
    /// different case exists.
    fn missing_method_cause(&mut self, v: TypeId, name: &str) -> Flow<String> {
        let (base, _) = self.deref(v);
        let base = self.types.unalias(base);
        let lower = name.to_lowercase();
        let other = self.types.named(base).and_then(|n| {
            let origin = n.origin.and_then(|o| self.types.named(o)).unwrap_or(n);
            origin
                .methods
                .iter()
                .map(|m| self.objects[*m].name.clone())
                .find(|m| m != name && m.to_lowercase() == lower)
        });
        Ok(match other {
            Some(have) => format!("missing method {name}\n\t\thave {have}\n\t\twant {name}"),
            None => format!("missing method {name}"),
        })
    }

    /// Whether `v` implements (or, for a `constraint`, satisfies) the
    /// interface `t`. The error is the cause, empty when there is nothing
    /// to add to "V does not implement T".
    pub(crate) fn implements(&mut self, v: TypeId, t: TypeId, constraint: bool) -> Flow<Result<(), String>> {
        if !constraint {
            if let Some(cached) = self.impl_cache.get(&(v, t)) {
                return Ok(cached.clone());
            }
        }
        let result = self.implements_uncached(v, t, constraint)?;
        if !constraint {
            self.impl_cache.insert((v, t), result.clone());
        }
        trace!(v = %self.type_string(v), t = %self.type_string(t), ok = result.is_ok(), "implements");
        Ok(result)
    }

    fn implements_uncached(&mut self, v: TypeId, t: TypeId, constraint: bool) -> Flow<Result<(), String>> {
        let vu = self.types.underlying(v);
        let tu = self.types.underlying(t);
        if !vu.is_valid() || !tu.is_valid() {
            return Ok(Ok(()));
        }
        if let Type::Pointer(base) = self.types.get(vu) {
            if !self.types.underlying(*base).is_valid() {
                return Ok(Ok(()));
            }
        }
        if !matches!(self.types.get(tu), Type::Interface(_)) {
            return Ok(Err(format!("{} is not an interface", self.type_string(t))));
        }
        let tset = type_set(&self.types, tu);
        if tset.is_all() {
            return Ok(Ok(()));
        }
        let v_is_iface = self.types.is_interface(vu) && !self.types.is_type_param(v);
        if v_is_iface && type_set(&self.types, vu).is_empty() {
            return Ok(Ok(()));
        }
        if tset.is_empty() {
            return Ok(Err("empty type set".to_string()));
        }
        if let Some((_, cause)) = self.missing_method(v, t, true)? {
            return Ok(Err(cause));
        }

        let comparable_ok = |c: &Self| -> Result<(), String> {
            if !tset.comparable {
                return Ok(());
            }
            if predicates::comparable(&c.types, v, false) || (constraint && predicates::comparable(&c.types, v, true))
            {
                return Ok(());
            }
            Err(format!("{} is not comparable", c.type_string(v)))
        };

        let Some(terms) = &tset.terms else {
            return Ok(comparable_ok(self));
        };
        if v_is_iface || self.types.is_type_param(v) {
            let vset = type_set(&self.types, v);
            let subset = match &vset.terms {
                None => false,
                Some(vterms) => vterms.iter().all(|vt| self.term_subset(vt, terms)),
            };
            if !subset {
                return Ok(Err(String::new()));
            }
            return Ok(comparable_ok(self));
        }
        if !in_terms(&self.types, &tset, v) {
            let alt = terms.iter().find(|term| {
                !term.tilde
                    && identical(&self.types, term.ty, self.types.underlying(term.ty))
                    && identical(&self.types, self.types.underlying(v), term.ty)
            });
            return Ok(Err(match alt {
                Some(term) => format!(
                    "possibly missing ~ for {} in {}",
                    self.type_string(term.ty),
                    self.type_string(t)
                ),
                None => String::new(),
            }));
        }
        Ok(comparable_ok(self))
    }

    /// Whether every type of term `x` is in one of `terms`.
    fn term_subset(&self, x: &Term, terms: &[Term]) -> bool {
        terms.iter().any(|y| {
            if y.tilde {
                identical(&self.types, self.types.underlying(x.ty), y.ty)
            } else {
                !x.tilde && identical(&self.types, x.ty, y.ty)
            }
        })
    }

    /// Check type arguments against their constraints. Bounds may mention
    /// other type parameters of the same declaration.
    pub(crate) fn verify_instance(&mut self, span: gop_common::Span, tparams: &[TypeId], targs: &[TypeId]) -> Flow<()> {
        let smap = SubstMap::new(tparams, targs);
        for (tp, targ) in tparams.iter().zip(targs) {
            let Some(bound) = self.types.type_param(*tp).map(|p| p.bound) else {
                continue;
            };
            if !bound.is_valid() || !targ.is_valid() {
                continue;
            }
            let bound = subst(&mut self.types, bound, &smap);
            if let Err(reason) = self.implements(*targ, bound, true)? {
                self.error(TypeError::Unsatisfied {
                    ty: self.type_string(*targ),
                    constraint: self.type_string(bound),
                    reason,
                    span,
                });
                return Ok(());
            }
        }
        Ok(())
    }
}

fn concat(path: &[usize], i: usize) -> Vec<usize> {
    let mut p = Vec::with_capacity(path.len() + 1);
    p.extend_from_slice(path);
    p.push(i);
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_extend_without_aliasing() {
        let base = vec![0, 2];
        let a = concat(&base, 1);
        let b = concat(&base, 3);
        assert_eq!(a, [0, 2, 1]);
        assert_eq!(b, [0, 2, 3]);
        assert_eq!(concat(&[], 4), [4]);
    }
}
