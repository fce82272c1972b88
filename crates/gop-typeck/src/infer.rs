//! Inference of missing type arguments at a generic call.
//!
//! Inference runs in five steps over one [`Unifier`]:
//!
//! 1. typed arguments are unified with their parameter types;
//! 2. constraints with a core type or core term are unified with the
//!    parameters they bound, repeated while new bindings appear;
//! 3. parameters still unbound that receive only untyped constants get the
//!    default type of the largest constant kind;
//! 4. bindings that would expand forever (`P := *P`) are cleared;
//! 5. bindings that mention other parameters are simplified by substitution
//!    until nothing changes.
//!
//! A parameter left unbound, or still mentioning a parameter, is reported
//! as "cannot infer".

use gop_common::Span;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::checker::Checker;
use crate::error::{Flow, TypeError};
use crate::operand::Operand;
use crate::predicates::{core_term, identical, mentions, type_set};
use crate::subst::{subst, SubstMap};
use crate::trace::{InferPhase, InferTrace};
use crate::types::{BasicKind, Signature, Type, TypeId, TypeParam};
use crate::unify::{Unifier, UnifyMode};

/// Upper bound on constraint and simplification rounds per parameter.
const ROUNDS_PER_PARAM: usize = 2;

fn untyped_rank(k: BasicKind) -> Option<u8> {
    match k {
        BasicKind::UntypedInt => Some(0),
        BasicKind::UntypedRune => Some(1),
        BasicKind::UntypedFloat => Some(2),
        BasicKind::UntypedComplex => Some(3),
        _ => None,
    }
}

impl<'a> Checker<'a> {
    fn param_name(&self, tp: TypeId) -> String {
        self.type_string(tp)
    }

    fn cannot_infer(&mut self, func: &str, span: Span, tp: TypeId, reason: Option<String>) {
        let decl = self
            .types
            .type_param(tp)
            .map(|p| self.objects[p.obj].span)
            .unwrap_or_default();
        self.error(TypeError::CannotInfer {
            func: func.to_string(),
            param: self.param_name(tp),
            reason,
            span,
            decl,
        });
    }

    /// Infer type arguments for `tparams` from the call arguments `args`
    /// passed to parameters of types `params`. `targs` holds explicitly
    /// supplied arguments, possibly fewer than `tparams`.
    ///
    /// Returns the complete list, or `None` after reporting an error.
    pub(crate) fn infer(
        &mut self,
        func: &str,
        span: Span,
        tparams: &[TypeId],
        targs: &[TypeId],
        params: &[TypeId],
        args: &[Operand<'a>],
    ) -> Flow<Option<Vec<TypeId>>> {
        let n = tparams.len();
        if targs.len() == n {
            return Ok(Some(targs.to_vec()));
        }
        if args.iter().any(Operand::is_invalid) {
            return Ok(None);
        }
        let mut trace = self.config.trace_inference.then(|| InferTrace::new(func, span));
        let result = self.infer_steps(func, span, tparams, targs, params, args, trace.as_mut())?;
        debug!(func, params = n, inferred = result.is_some(), "type inference");
        if let Some(mut t) = trace {
            t.result = result
                .as_ref()
                .map(|r| r.iter().map(|ty| self.type_string(*ty)).collect());
            self.traces.push(t);
        }
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn infer_steps(
        &mut self,
        func: &str,
        span: Span,
        tparams: &[TypeId],
        targs: &[TypeId],
        params: &[TypeId],
        args: &[Operand<'a>],
        mut trace: Option<&mut InferTrace>,
    ) -> Flow<Option<Vec<TypeId>>> {
        let known: Vec<Option<TypeId>> = (0..tparams.len()).map(|i| targs.get(i).copied()).collect();
        if let Some(t) = trace.as_deref_mut() {
            for (p, a) in tparams.iter().zip(targs) {
                let name = self.param_name(*p);
                t.step(InferPhase::Explicit, Some(&name), format!("{name} = {}", self.type_string(*a)));
            }
        }

        // Parameters with a supplied argument are matched by assignment,
        // not unification, so substitute them first.
        let mut smap = SubstMap::default();
        for (p, a) in tparams.iter().zip(targs) {
            smap.insert(*p, *a);
        }
        let params: Vec<TypeId> = params.iter().map(|p| subst(&mut self.types, *p, &smap)).collect();

        let mut u = Unifier::new(tparams, &known);

        // 1. Typed arguments.
        let mut untyped: Vec<usize> = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            let Some(par) = params.get(i).copied() else {
                break;
            };
            if !mentions(&self.types, par, tparams) && !mentions(&self.types, arg.ty, tparams) {
                continue;
            }
            if self.types.is_typed(arg.ty) {
                if !u.unify(&self.types, par, arg.ty, UnifyMode::Assign) {
                    self.inference_mismatch(&mut u, tparams, par, arg);
                    return Ok(None);
                }
                if let Some(t) = trace.as_deref_mut() {
                    t.step(
                        InferPhase::Arguments,
                        None,
                        format!("{} ~ {} ({})", self.type_string(par), self.type_string(arg.ty), arg.text()),
                    );
                }
            } else if tparams.contains(&self.types.unalias(par)) && !arg.is_nil() {
                untyped.push(i);
            }
        }

        // 2. Constraints.
        for _ in 0..tparams.len() * ROUNDS_PER_PARAM + 1 {
            let before = u.unknowns();
            for tp in tparams {
                let Some(bound) = self.types.type_param(*tp).map(|p| p.bound) else {
                    continue;
                };
                let tx = u.at(*tp);
                match core_term(&self.types, bound) {
                    Some((core, single)) => match tx {
                        Some(tx) => {
                            if !u.unify(&self.types, tx, core.ty, UnifyMode::Assign) {
                                let reason = format!("does not match {}", self.term_string(core.tilde, core.ty));
                                self.error(TypeError::Unsatisfied {
                                    ty: format!("{} (type {})", self.param_name(*tp), self.type_string(tx)),
                                    constraint: self.type_string(bound),
                                    reason,
                                    span,
                                });
                                return Ok(None);
                            }
                        }
                        None if single && !core.tilde => {
                            u.set(*tp, core.ty);
                            if let Some(t) = trace.as_deref_mut() {
                                let name = self.param_name(*tp);
                                t.step(
                                    InferPhase::Constraints,
                                    Some(&name),
                                    format!("{name} := {} (core type)", self.type_string(core.ty)),
                                );
                            }
                        }
                        None => {}
                    },
                    None => {
                        if let Some(tx) = tx {
                            if let Some(cause) = self.constraint_methods_unify(&mut u, tx, bound)? {
                                self.error(TypeError::Unsatisfied {
                                    ty: format!("{} (type {})", self.param_name(*tp), self.type_string(tx)),
                                    constraint: self.type_string(bound),
                                    reason: cause,
                                    span,
                                });
                                return Ok(None);
                            }
                        }
                    }
                }
            }
            if u.unknowns() == before {
                break;
            }
        }

        // 3. Untyped constants.
        let mut max_untyped: Vec<(TypeId, TypeId)> = Vec::new();
        for i in untyped {
            let tp = self.types.unalias(params[i]);
            if u.at(tp).is_some() {
                continue;
            }
            let arg = &args[i];
            match max_untyped.iter_mut().find(|(p, _)| *p == tp) {
                None => max_untyped.push((tp, arg.ty)),
                Some((_, max)) => match self.max_untyped(*max, arg.ty) {
                    Some(m) => *max = m,
                    None => {
                        let reason = format!(
                            "mismatched types {} and {}",
                            self.type_string(*max),
                            self.type_string(arg.ty)
                        );
                        let at = arg.expr.map(|e| e.span).unwrap_or(span);
                        self.cannot_infer(func, at, tp, Some(reason));
                        return Ok(None);
                    }
                },
            }
        }
        for (tp, max) in max_untyped {
            let d = self.types.default_type(max);
            u.set(tp, d);
            if let Some(t) = trace.as_deref_mut() {
                let name = self.param_name(tp);
                t.step(
                    InferPhase::Untyped,
                    Some(&name),
                    format!("{name} := {} (default of {})", self.type_string(d), self.type_string(max)),
                );
            }
        }

        // 4. Cycles.
        let mut inferred = u.inferred();
        for cleared in self.kill_cycles(tparams, &mut inferred) {
            trace!(param = %self.param_name(cleared), "cleared cyclic binding");
            if let Some(t) = trace.as_deref_mut() {
                let name = self.param_name(cleared);
                t.step(InferPhase::Cycles, Some(&name), format!("{name} refers to itself"));
            }
        }

        // 5. Simplification.
        let mut dirty: Vec<usize> = (0..tparams.len())
            .filter(|i| inferred[*i].is_some() && *i >= targs.len())
            .collect();
        for _ in 0..tparams.len() * ROUNDS_PER_PARAM + 1 {
            if dirty.is_empty() {
                break;
            }
            let mut smap = SubstMap::default();
            for (p, t) in tparams.iter().zip(&inferred) {
                if let Some(t) = t {
                    smap.insert(*p, *t);
                }
            }
            let mut still = Vec::new();
            for i in dirty {
                let Some(t0) = inferred[i] else {
                    continue;
                };
                let t1 = subst(&mut self.types, t0, &smap);
                if t1 != t0 {
                    let t1 = self.drop_stale_type_params(t1, tparams);
                    inferred[i] = Some(t1);
                    still.push(i);
                    if let Some(t) = trace.as_deref_mut() {
                        let name = self.param_name(tparams[i]);
                        t.step(InferPhase::Simplify, Some(&name), format!("{name} = {}", self.type_string(t1)));
                    }
                }
            }
            dirty = still;
        }

        let mut result = Vec::with_capacity(tparams.len());
        for (tp, t) in tparams.iter().zip(inferred) {
            match t {
                Some(t) if !mentions(&self.types, t, tparams) => result.push(t),
                _ => {
                    self.cannot_infer(func, span, *tp, None);
                    return Ok(None);
                }
            }
        }
        Ok(Some(result))
    }

    fn term_string(&self, tilde: bool, ty: TypeId) -> String {
        let s = self.type_string(ty);
        if tilde {
            format!("~{s}")
        } else {
            s
        }
    }

    fn inference_mismatch(&mut self, u: &mut Unifier, tparams: &[TypeId], par: TypeId, arg: &Operand<'a>) {
        let inferred = u.inferred();
        let span = arg.expr.map(|e| e.span).unwrap_or_default();
        let arg_type = self.type_string(arg.ty);
        let text = arg.text();
        if inferred.iter().all(Option::is_none) {
            let names: Vec<String> = tparams.iter().map(|p| self.param_name(*p)).collect();
            self.error(TypeError::InferenceMismatch {
                arg: text,
                arg_type,
                param_type: format!("{} (cannot infer {})", self.type_string(par), names.join(", ")),
                span,
            });
            return;
        }
        let mut smap = SubstMap::default();
        for (p, t) in tparams.iter().zip(&inferred) {
            if let Some(t) = t {
                smap.insert(*p, *t);
            }
        }
        let substituted = subst(&mut self.types, par, &smap);
        let param_type = if substituted != par {
            format!(
                "inferred type {} for {}",
                self.type_string(substituted),
                self.type_string(par)
            )
        } else {
            self.type_string(par)
        };
        self.error(TypeError::InferenceMismatch {
            arg: text,
            arg_type,
            param_type,
            span,
        });
    }

    /// Without a core type, a known type argument must still have every
    /// method of its constraint with a unifying signature. Returns the
    /// failure cause.
    fn constraint_methods_unify(&mut self, u: &mut Unifier, tx: TypeId, bound: TypeId) -> Flow<Option<String>> {
        let methods = type_set(&self.types, bound).methods;
        for m in methods {
            let found = self.method_type(tx, &m.name)?;
            match found {
                Some(sig) if u.unify(&self.types, sig, m.sig, UnifyMode::Exact) => {}
                Some(_) => return Ok(Some(format!("wrong type for method {}", m.name))),
                None => return Ok(Some(format!("missing method {}", m.name))),
            }
        }
        Ok(None)
    }

    /// The larger of two untyped constant kinds, if they can mix.
    pub(crate) fn max_untyped(&self, x: TypeId, y: TypeId) -> Option<TypeId> {
        if x == y || identical(&self.types, x, y) {
            return Some(x);
        }
        let rank = |t: TypeId| self.types.basic_kind(t).and_then(untyped_rank);
        match (rank(x), rank(y)) {
            (Some(rx), Some(ry)) => Some(if rx >= ry { x } else { y }),
            _ => None,
        }
    }

    /// Clear bindings whose expansion reaches their own parameter and return
    /// the parameters cleared.
    fn kill_cycles(&self, tparams: &[TypeId], inferred: &mut [Option<TypeId>]) -> Vec<TypeId> {
        let mut cleared = Vec::new();
        for tp in tparams {
            let mut seen = Vec::new();
            self.find_cycles(*tp, tparams, inferred, &mut seen, &mut cleared);
        }
        cleared
    }

    fn find_cycles(
        &self,
        t: TypeId,
        tparams: &[TypeId],
        inferred: &mut [Option<TypeId>],
        seen: &mut Vec<TypeId>,
        cleared: &mut Vec<TypeId>,
    ) {
        let t = self.types.unalias(t);
        if seen.contains(&t) {
            if let Some(i) = tparams.iter().position(|p| *p == t) {
                if inferred[i].take().is_some() {
                    cleared.push(t);
                }
            }
            return;
        }
        seen.push(t);
        let children: Vec<TypeId> = match self.types.get(t) {
            Type::Basic(_) | Type::Alias(_) => Vec::new(),
            Type::Array { elem, .. } | Type::Slice(elem) | Type::Pointer(elem) | Type::Chan { elem, .. } => {
                vec![*elem]
            }
            Type::Struct(fields) => fields.iter().map(|f| f.ty).collect(),
            Type::Signature(s) => s.params.iter().chain(&s.results).copied().collect(),
            Type::Union(terms) => terms.iter().map(|t| t.ty).collect(),
            Type::Interface(i) => i.methods.iter().map(|m| m.sig).chain(i.embedded.iter().copied()).collect(),
            Type::Map { key, value } => vec![*key, *value],
            Type::Named(n) => n.type_args.clone(),
            Type::Tuple(elems) => elems.clone(),
            Type::TypeParam(_) => match tparams.iter().position(|p| *p == t) {
                Some(i) => inferred[i].into_iter().collect(),
                None => Vec::new(),
            },
        };
        for c in children {
            self.find_cycles(c, tparams, inferred, seen, cleared);
        }
        seen.pop();
    }

    /// A generic function argument whose signature no longer mentions any
    /// type parameter is not generic anymore.
    fn drop_stale_type_params(&mut self, t: TypeId, tparams: &[TypeId]) -> TypeId {
        let Type::Signature(sig) = self.types.get(t).clone() else {
            return t;
        };
        if sig.type_params.is_empty() || mentions(&self.types, t, tparams) {
            return t;
        }
        self.types.signature(Signature {
            type_params: Vec::new(),
            ..sig
        })
    }

    /// Give the type parameters of a generic function value fresh
    /// identities, so that `f(g, g)` infers each use of `g` separately.
    /// Returns the renamed signature and its new type parameters.
    pub(crate) fn rename_type_params(&mut self, sig: TypeId) -> (TypeId, Vec<TypeId>) {
        let Some(s) = self.types.sig(sig).cloned() else {
            return (sig, Vec::new());
        };
        let mut fresh = Vec::with_capacity(s.type_params.len());
        for tp in &s.type_params {
            let Some(p) = self.types.type_param(*tp).cloned() else {
                continue;
            };
            fresh.push(self.types.add(Type::TypeParam(TypeParam {
                bound: TypeId::INVALID,
                ..p
            })));
        }
        let smap = SubstMap::new(&s.type_params, &fresh);
        let mut bounds = FxHashMap::default();
        for (old, new) in s.type_params.iter().zip(&fresh) {
            let bound = self.types.type_param(*old).map(|p| p.bound).unwrap_or(TypeId::ANY);
            bounds.insert(*new, subst(&mut self.types, bound, &smap));
        }
        for (new, bound) in bounds {
            if let Type::TypeParam(p) = self.types.get_mut(new) {
                p.bound = bound;
            }
        }
        let params = s.params.iter().map(|p| subst(&mut self.types, *p, &smap)).collect();
        let results = s.results.iter().map(|r| subst(&mut self.types, *r, &smap)).collect();
        let renamed = self.types.add(Type::Signature(Signature {
            type_params: fresh.clone(),
            params,
            results,
            ..s
        }));
        (renamed, fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_ranks_follow_numeric_widening() {
        let r = |k| untyped_rank(k).unwrap();
        assert!(r(BasicKind::UntypedInt) < r(BasicKind::UntypedRune));
        assert!(r(BasicKind::UntypedRune) < r(BasicKind::UntypedFloat));
        assert!(r(BasicKind::UntypedFloat) < r(BasicKind::UntypedComplex));
        assert_eq!(untyped_rank(BasicKind::UntypedString), None);
    }
}
