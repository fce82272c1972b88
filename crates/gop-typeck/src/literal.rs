//! Literals: basic, function and composite literals, and the untyped
//! container literals `[a, b]`, `[k: v]` and `{k: v}`.
//!
//! A container literal without a type takes its element types from the
//! context if it expects a slice, array or map. Otherwise the element
//! types are unified: identical types are kept, untyped constants widen to
//! the largest kind they share, and anything else falls back to `any`.

use gop_ast::printer::expr_string;
use gop_ast::{
    BasicLit, CompositeLit, Element, Expr, ExprKind, FuncLit, LitKind, MapEntry, MapKey, MapLit, SliceLit,
};
use gop_common::Span;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::checker::{Checker, Task};
use crate::constant::{self, Value};
use crate::error::{Flow, TypeError};
use crate::operand::{Mode, Operand};
use crate::predicates::{core_type, identical};
use crate::types::{StructField, Type, TypeId, TypeTable};

/// Key for duplicate detection. Numeric keys compare by value, so `1` and
/// `1.0` collide.
pub(crate) fn key_of(v: &Value) -> String {
    match v {
        Value::Bool(b) => format!("b:{b}"),
        Value::String(s) => format!("s:{s}"),
        Value::Int(i) => format!("n:{i}"),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e30 => format!("n:{}", *f as i128),
        Value::Float(f) => format!("f:{f}"),
        Value::Complex(re, im) if *im == 0.0 && re.fract() == 0.0 && re.abs() < 1e30 => {
            format!("n:{}", *re as i128)
        }
        Value::Complex(re, im) => format!("c:{re}:{im}"),
    }
}

/// Constant keys seen so far in one map literal.
#[derive(Default)]
struct SeenKeys {
    keys: FxHashMap<String, Vec<(TypeId, Span)>>,
}

impl SeenKeys {
    /// The previous position of an equal key, or record this one.
    /// `by_type`: keys of an interface-typed map collide only if their
    /// dynamic types are identical too.
    fn check(&mut self, types: &TypeTable, v: &Value, ty: TypeId, span: Span, by_type: bool) -> Option<Span> {
        let entry = self.keys.entry(key_of(v)).or_default();
        let prev = entry
            .iter()
            .find(|(t, _)| !by_type || identical(types, *t, ty))
            .map(|(_, s)| *s);
        if prev.is_none() {
            entry.push((ty, span));
        }
        prev
    }
}

impl<'a> Checker<'a> {
    // ── Basic and function literals ─────────────────────────────────────

    pub(crate) fn basic_lit(&mut self, e: &'a Expr, lit: &BasicLit) -> Operand<'a> {
        let (ty, val) = match lit.kind {
            LitKind::Int => (TypeId::UNTYPED_INT, constant::parse_int(&lit.value)),
            LitKind::Float => (TypeId::UNTYPED_FLOAT, constant::parse_float(&lit.value)),
            LitKind::Imag => (TypeId::UNTYPED_COMPLEX, constant::parse_imag(&lit.value)),
            LitKind::Char => {
                let mut chars = lit.value.chars();
                let c = match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Int(c as i128)),
                    _ => None,
                };
                (TypeId::UNTYPED_RUNE, c)
            }
            LitKind::String => (TypeId::UNTYPED_STRING, Some(Value::String(lit.value.clone()))),
        };
        match val {
            Some(val) => Operand::constant(ty, val, Some(e)),
            None => {
                self.error(TypeError::InvalidLiteral {
                    message: format!("malformed constant: {}", lit.value),
                    span: e.span,
                });
                Operand::invalid(Some(e))
            }
        }
    }

    /// The body is checked later, but before the enclosing scope changes.
    pub(crate) fn func_lit(&mut self, e: &'a Expr, lit: &'a FuncLit) -> Flow<Operand<'a>> {
        if let Some(tp) = lit.sig.type_params.first() {
            self.error(TypeError::InvalidDecl {
                message: "function literal cannot have type parameters".to_string(),
                span: tp.span,
            });
        }
        let (sig, scope) = self.func_type(e.id, &lit.sig, None)?;
        if !sig.is_valid() {
            return Ok(Operand::invalid(Some(e)));
        }
        self.later(Task::FuncLitBody {
            env: self.env.clone(),
            sig,
            body: &lit.body,
            scope,
        });
        Ok(Operand::new(Mode::Value, sig, Some(e)))
    }

    // ── Composite literals ──────────────────────────────────────────────

    /// `T{...}`, or `{...}` as an element of an enclosing literal whose
    /// element type is `hint`.
    pub(crate) fn composite_lit(
        &mut self,
        e: &'a Expr,
        lit: &'a CompositeLit,
        hint: Option<TypeId>,
    ) -> Flow<Operand<'a>> {
        let mut open_array: Option<(&'a Expr, TypeId)> = None;
        let (ty, base, is_elem) = match (&lit.ty, hint) {
            (Some(te), _) => match &te.kind {
                ExprKind::ArrayType(Some(len), elem) if matches!(len.kind, ExprKind::Ellipsis(None)) => {
                    let elem = self.var_type(elem)?;
                    open_array = Some((&**te, elem));
                    (TypeId::INVALID, TypeId::INVALID, false)
                }
                _ => {
                    let t = self.type_expr(te)?;
                    (t, t, false)
                }
            },
            (None, Some(hint)) => {
                // `*T` elements may be written `{...}` for `&T{...}`.
                let base = match core_type(&self.types, hint) {
                    Some(core) => match self.types.get(core) {
                        Type::Pointer(b) => *b,
                        _ => hint,
                    },
                    None => hint,
                };
                (hint, base, true)
            }
            (None, None) => {
                self.error(TypeError::InvalidLiteral {
                    message: "invalid composite literal type: missing type".to_string(),
                    span: e.span,
                });
                self.use_elements(&lit.elts)?;
                return Ok(Operand::invalid(Some(e)));
            }
        };

        if let Some((te, elem)) = open_array {
            let n = self.indexed_elements(&lit.elts, elem, None)?;
            let arr = self.types.array(elem, n);
            self.record_type_and_value(te, Mode::TypeExpr, arr, None);
            return Ok(Operand::new(Mode::Value, arr, Some(e)));
        }

        let core = core_type(&self.types, base);
        let shape = core.map(|c| self.types.get(c).clone());
        match shape {
            Some(Type::Struct(fields)) => self.struct_elements(e, &lit.elts, &fields, base)?,
            Some(Type::Array { elem, len }) => {
                self.indexed_elements(&lit.elts, elem, Some(len))?;
            }
            Some(Type::Slice(elem)) => {
                self.indexed_elements(&lit.elts, elem, None)?;
            }
            Some(Type::Map { key, value }) => self.map_elements(&lit.elts, key, value)?,
            _ => {
                self.use_elements(&lit.elts)?;
                if base.is_valid() && core != Some(TypeId::INVALID) {
                    let qualifier = if is_elem { " element" } else { "" };
                    let cause = if core.is_none() { " (no core type)" } else { "" };
                    self.error(TypeError::InvalidLiteral {
                        message: format!(
                            "invalid composite literal{qualifier} type {}{cause}",
                            self.type_string(ty)
                        ),
                        span: e.span,
                    });
                }
                return Ok(Operand::invalid(Some(e)));
            }
        }
        Ok(Operand::new(Mode::Value, ty, Some(e)))
    }

    fn use_elements(&mut self, elts: &'a [Element]) -> Flow<()> {
        for elt in elts {
            self.use_exprs(std::slice::from_ref(&elt.value))?;
        }
        Ok(())
    }

    fn struct_elements(
        &mut self,
        e: &'a Expr,
        elts: &'a [Element],
        fields: &[StructField],
        base: TypeId,
    ) -> Flow<()> {
        let Some(first) = elts.first() else {
            return Ok(());
        };
        if first.key.is_some() {
            let mut visited = vec![false; fields.len()];
            for elt in elts {
                let Some(key) = &elt.key else {
                    self.error(TypeError::InvalidLiteral {
                        message: "mixture of field:value and value elements in struct literal".to_string(),
                        span: elt.value.span,
                    });
                    continue;
                };
                let mut x = self.expr(&elt.value)?;
                let Some(name) = key.as_ident() else {
                    self.error(TypeError::InvalidLiteral {
                        message: format!("invalid field name {} in struct literal", expr_string(key)),
                        span: key.span,
                    });
                    continue;
                };
                let Some(i) = fields.iter().position(|f| f.name == name) else {
                    self.error(TypeError::InvalidLiteral {
                        message: format!(
                            "unknown field {name} in struct literal of type {}",
                            self.type_string(base)
                        ),
                        span: key.span,
                    });
                    continue;
                };
                self.record_use(key.id, fields[i].obj);
                self.assignment(&mut x, Some(fields[i].ty), "struct literal")?;
                if visited[i] {
                    self.error(TypeError::InvalidLiteral {
                        message: format!("duplicate field name {name} in struct literal"),
                        span: key.span,
                    });
                    continue;
                }
                visited[i] = true;
            }
            return Ok(());
        }

        for (i, elt) in elts.iter().enumerate() {
            if let Some(key) = &elt.key {
                self.error(TypeError::InvalidLiteral {
                    message: "mixture of field:value and value elements in struct literal".to_string(),
                    span: key.span,
                });
                continue;
            }
            let mut x = self.expr(&elt.value)?;
            let Some(field) = fields.get(i) else {
                self.error(TypeError::InvalidLiteral {
                    message: "too many values in struct literal".to_string(),
                    span: x.span(),
                });
                break;
            };
            self.assignment(&mut x, Some(field.ty), "struct literal")?;
        }
        if elts.len() < fields.len() {
            self.error(TypeError::InvalidLiteral {
                message: "too few values in struct literal".to_string(),
                span: Span::new(e.span.end.saturating_sub(1), e.span.end),
            });
        }
        Ok(())
    }

    /// Check array or slice elements against `elem`. Returns the length
    /// the literal needs.
    fn indexed_elements(&mut self, elts: &'a [Element], elem: TypeId, len: Option<u64>) -> Flow<u64> {
        let limit = len.map(|n| n as i128);
        let mut visited: FxHashSet<i128> = FxHashSet::default();
        let (mut index, mut max) = (0i128, 0i128);
        for elt in elts {
            let mut valid_index = false;
            if let Some(key) = &elt.key {
                let (t, i) = self.index_value(key, limit, false)?;
                if t.is_valid() {
                    match i {
                        Some(i) => {
                            index = i;
                            valid_index = true;
                        }
                        None => self.error(TypeError::InvalidLiteral {
                            message: format!("index {} must be integer constant", expr_string(key)),
                            span: key.span,
                        }),
                    }
                }
            } else if limit.is_some_and(|n| index >= n) {
                self.error(TypeError::InvalidLiteral {
                    message: format!("index {index} is out of bounds (>= {})", limit.unwrap_or_default()),
                    span: elt.value.span,
                });
            } else {
                valid_index = true;
            }
            if valid_index && !visited.insert(index) {
                self.error(TypeError::InvalidLiteral {
                    message: format!("duplicate index {index} in array or slice literal"),
                    span: elt.value.span,
                });
            }
            index += 1;
            max = max.max(index);
            let mut x = self.expr_with_hint(&elt.value, Some(elem))?;
            self.assignment(&mut x, Some(elem), "array or slice literal")?;
        }
        Ok(max.max(0) as u64)
    }

    fn map_elements(&mut self, elts: &'a [Element], key: TypeId, value: TypeId) -> Flow<()> {
        let by_type = self.types.is_plain_interface(key);
        let mut seen = SeenKeys::default();
        for elt in elts {
            let Some(k) = &elt.key else {
                self.error(TypeError::InvalidLiteral {
                    message: "missing key in map literal".to_string(),
                    span: elt.value.span,
                });
                continue;
            };
            let mut x = self.expr_with_hint(k, Some(key))?;
            self.assignment(&mut x, Some(key), "map literal")?;
            if !self.unique_key(&mut seen, &x, by_type) {
                continue;
            }
            let mut v = self.expr_with_hint(&elt.value, Some(value))?;
            self.assignment(&mut v, Some(value), "map literal")?;
        }
        Ok(())
    }

    /// Report a constant key seen before in the same literal.
    fn unique_key(&mut self, seen: &mut SeenKeys, x: &Operand<'a>, by_type: bool) -> bool {
        let (Mode::Constant, Some(val)) = (x.mode, &x.val) else {
            return true;
        };
        match seen.check(&self.types, val, x.ty, x.span(), by_type) {
            None => true,
            Some(prev) => {
                self.error(TypeError::DuplicateKey {
                    key: val.to_string(),
                    span: x.span(),
                    prev,
                });
                false
            }
        }
    }

    // ── Container literals ──────────────────────────────────────────────

    /// `[a, b, c]`: a slice, or an array or slice of the expected type.
    pub(crate) fn slice_lit(&mut self, e: &'a Expr, lit: &'a SliceLit, hint: Option<TypeId>) -> Flow<Operand<'a>> {
        let expected = hint.and_then(|h| core_type(&self.types, h).map(|c| (h, self.types.get(c).clone())));
        match expected {
            Some((h, Type::Slice(elem))) => {
                for elt in &lit.elts {
                    let mut x = self.expr_with_hint(elt, Some(elem))?;
                    self.assignment(&mut x, Some(elem), "slice literal")?;
                }
                return Ok(Operand::new(Mode::Value, h, Some(e)));
            }
            Some((h, Type::Array { elem, len })) => {
                for elt in &lit.elts {
                    let mut x = self.expr_with_hint(elt, Some(elem))?;
                    self.assignment(&mut x, Some(elem), "array literal")?;
                }
                if lit.elts.len() as u64 > len {
                    self.error(TypeError::InvalidLiteral {
                        message: format!("index {len} is out of bounds (>= {len})"),
                        span: lit.elts[len as usize].span,
                    });
                }
                return Ok(Operand::new(Mode::Value, h, Some(e)));
            }
            _ => {}
        }

        let mut elems = Vec::with_capacity(lit.elts.len());
        for elt in &lit.elts {
            elems.push(self.expr(elt)?);
        }
        let elem = self.unify_elements(&elems);
        for x in &mut elems {
            self.assignment(x, Some(elem), "slice literal")?;
        }
        let ty = self.types.slice(elem);
        trace!(ty = %self.type_string(ty), len = elems.len(), "slice literal");
        Ok(Operand::new(Mode::Value, ty, Some(e)))
    }

    /// `[k: v, ...]` or `{k: v, ...}`, with or without separators. A bare
    /// identifier key in a brace literal is a string key.
    pub(crate) fn map_lit(&mut self, e: &'a Expr, lit: &'a MapLit, hint: Option<TypeId>) -> Flow<Operand<'a>> {
        let expected = hint.and_then(|h| {
            let core = core_type(&self.types, h)?;
            match self.types.get(core) {
                Type::Map { key, value } => Some((h, *key, *value)),
                _ => None,
            }
        });

        if let Some((h, key, value)) = expected {
            let by_type = self.types.is_plain_interface(key);
            let mut seen = SeenKeys::default();
            for entry in &lit.entries {
                let mut k = self.map_key(entry, Some(key))?;
                self.map_key_assignment(entry, &mut k, key)?;
                if !self.unique_key(&mut seen, &k, by_type) {
                    continue;
                }
                let mut v = self.expr_with_hint(&entry.value, Some(value))?;
                self.assignment(&mut v, Some(value), "map literal")?;
            }
            return Ok(Operand::new(Mode::Value, h, Some(e)));
        }

        let mut keys = Vec::with_capacity(lit.entries.len());
        let mut values = Vec::with_capacity(lit.entries.len());
        for entry in &lit.entries {
            keys.push(self.map_key(entry, None)?);
            values.push(self.expr(&entry.value)?);
        }
        let key = if lit.entries.is_empty() {
            TypeId::STRING
        } else {
            self.unify_elements(&keys)
        };
        let value = self.unify_elements(&values);

        let by_type = self.types.is_plain_interface(key);
        let mut seen = SeenKeys::default();
        for (entry, k) in lit.entries.iter().zip(keys.iter_mut()) {
            self.map_key_assignment(entry, k, key)?;
            self.unique_key(&mut seen, k, by_type);
        }
        for v in &mut values {
            self.assignment(v, Some(value), "map literal")?;
        }
        let ty = self.types.map(key, value);
        self.later(Task::CheckMapKey { key, span: e.span });
        trace!(ty = %self.type_string(ty), len = lit.entries.len(), "map literal");
        Ok(Operand::new(Mode::Value, ty, Some(e)))
    }

    fn map_key(&mut self, entry: &'a MapEntry, hint: Option<TypeId>) -> Flow<Operand<'a>> {
        match &entry.key {
            MapKey::Expr(k) => self.expr_with_hint(k, hint),
            MapKey::Bare(ident) => Ok(Operand::constant(
                TypeId::UNTYPED_STRING,
                Value::String(ident.name.clone()),
                None,
            )),
        }
    }

    /// Assign a key to the map's key type. Bare keys have no expression of
    /// their own, so their errors point at the identifier.
    fn map_key_assignment(&mut self, entry: &'a MapEntry, k: &mut Operand<'a>, key: TypeId) -> Flow<()> {
        match &entry.key {
            MapKey::Expr(_) => self.assignment(k, Some(key), "map literal"),
            MapKey::Bare(ident) => {
                if self.assignable_to(k, key)?.is_err() {
                    self.error(TypeError::CannotUse {
                        operand: format!("{} (untyped string constant)", ident.name),
                        target: self.type_string(key),
                        context: "map literal".to_string(),
                        detail: String::new(),
                        span: ident.span,
                    });
                    k.invalidate();
                    return Ok(());
                }
                if self.types.is_typed(key) && !self.types.is_plain_interface(key) {
                    k.ty = key;
                } else {
                    k.ty = TypeId::STRING;
                }
                Ok(())
            }
        }
    }

    /// The common type of the elements of an untyped container literal.
    fn unify_elements(&self, elems: &[Operand<'a>]) -> TypeId {
        let valid: Vec<&Operand<'a>> = elems.iter().filter(|x| !x.is_invalid()).collect();
        if valid.is_empty() {
            return TypeId::ANY;
        }
        let mut typed: Option<TypeId> = None;
        let mut untyped: Option<TypeId> = None;
        for x in &valid {
            if self.types.is_untyped(x.ty) {
                untyped = match untyped {
                    None => Some(x.ty),
                    Some(u) => match self.max_untyped(u, x.ty) {
                        Some(m) => Some(m),
                        None => return TypeId::ANY,
                    },
                };
            } else {
                match typed {
                    None => typed = Some(x.ty),
                    Some(t) if identical(&self.types, t, x.ty) => {}
                    Some(_) => return TypeId::ANY,
                }
            }
        }
        match (typed, untyped) {
            (Some(t), None) => t,
            (Some(t), Some(_)) => {
                let fits = valid
                    .iter()
                    .filter(|x| self.types.is_untyped(x.ty))
                    .all(|x| self.implicit_type_and_value(x, t).is_ok());
                if fits {
                    t
                } else {
                    TypeId::ANY
                }
            }
            (None, Some(u)) if u == TypeId::UNTYPED_NIL => TypeId::ANY,
            (None, Some(u)) => self.types.default_type(u),
            (None, None) => TypeId::ANY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_compare_by_value() {
        assert_eq!(key_of(&Value::Int(1)), key_of(&Value::Float(1.0)));
        assert_eq!(key_of(&Value::Int(2)), key_of(&Value::Complex(2.0, 0.0)));
        assert_ne!(key_of(&Value::Int(1)), key_of(&Value::String("1".into())));
        assert_ne!(key_of(&Value::Float(1.5)), key_of(&Value::Int(1)));
    }
}
