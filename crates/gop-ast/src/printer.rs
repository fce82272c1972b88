//! Render expressions back to compact source text.
//!
//! Used for operand descriptions in diagnostics (`x + 1 (value of type int)`).
//! Function literal bodies and composite literal contents are elided.

use std::fmt::Write;

use crate::expr::{
    ChanDir, Expr, ExprKind, Field, FuncType, InterfaceElem, LitKind, MapKey,
};

pub fn expr_string(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Bad => out.push_str("BadExpr"),
        ExprKind::Ident(name) => out.push_str(name),
        ExprKind::BasicLit(lit) => match lit.kind {
            LitKind::String => {
                let _ = write!(out, "{:?}", lit.value);
            }
            LitKind::Char => {
                let c = lit.value.chars().next().unwrap_or('\0');
                let _ = write!(out, "{c:?}");
            }
            _ => out.push_str(&lit.value),
        },
        ExprKind::CompositeLit(lit) => {
            if let Some(ty) = &lit.ty {
                write_expr(out, ty);
            }
            out.push_str("{…}");
        }
        ExprKind::SliceLit(_) => out.push_str("[…]"),
        ExprKind::MapLit(lit) => match lit.delim {
            crate::expr::Delim::Brace => out.push_str("{…}"),
            crate::expr::Delim::Bracket => out.push_str("[…:…]"),
        },
        ExprKind::FuncLit(lit) => {
            out.push_str("func");
            write_signature(out, &lit.sig);
            out.push_str(" {…}");
        }
        ExprKind::Paren(x) => {
            out.push('(');
            write_expr(out, x);
            out.push(')');
        }
        ExprKind::Selector(x, sel) => {
            write_expr(out, x);
            out.push('.');
            out.push_str(&sel.name);
        }
        ExprKind::Index(x, indices) => {
            write_expr(out, x);
            out.push('[');
            write_list(out, indices);
            out.push(']');
        }
        ExprKind::OneBasedIndex(x, index) => {
            write_expr(out, x);
            out.push('#');
            write_expr(out, index);
        }
        ExprKind::Slice(s) => {
            write_expr(out, &s.x);
            out.push('[');
            if let Some(low) = &s.low {
                write_expr(out, low);
            }
            out.push(':');
            if let Some(high) = &s.high {
                write_expr(out, high);
            }
            if let Some(max) = &s.max {
                out.push(':');
                write_expr(out, max);
            }
            out.push(']');
        }
        ExprKind::TypeAssert(x, ty) => {
            write_expr(out, x);
            out.push_str(".(");
            match ty {
                Some(ty) => write_expr(out, ty),
                None => out.push_str("type"),
            }
            out.push(')');
        }
        ExprKind::Call(call) => {
            write_expr(out, &call.fun);
            out.push('(');
            write_list(out, &call.args);
            if call.ellipsis.is_some() {
                out.push_str("...");
            }
            out.push(')');
        }
        ExprKind::Star(x) => {
            out.push('*');
            write_expr(out, x);
        }
        ExprKind::Unary(op, x) => {
            out.push_str(op.as_str());
            write_expr(out, x);
        }
        ExprKind::Binary(op, x, y) => {
            write_expr(out, x);
            let _ = write!(out, " {op} ");
            write_expr(out, y);
        }
        ExprKind::ArrayType(len, elem) => {
            out.push('[');
            if let Some(len) = len {
                write_expr(out, len);
            }
            out.push(']');
            write_expr(out, elem);
        }
        ExprKind::Ellipsis(elem) => {
            out.push_str("...");
            if let Some(elem) = elem {
                write_expr(out, elem);
            }
        }
        ExprKind::MapType(key, value) => {
            out.push_str("map[");
            write_expr(out, key);
            out.push(']');
            write_expr(out, value);
        }
        ExprKind::ChanType(dir, elem) => {
            out.push_str(match dir {
                ChanDir::Both => "chan ",
                ChanDir::Send => "chan<- ",
                ChanDir::Recv => "<-chan ",
            });
            write_expr(out, elem);
        }
        ExprKind::FuncType(sig) => {
            out.push_str("func");
            write_signature(out, sig);
        }
        ExprKind::StructType(fields) => {
            out.push_str("struct{");
            write_fields(out, fields, "; ");
            out.push('}');
        }
        ExprKind::InterfaceType(elems) => {
            out.push_str("interface{");
            for (i, elem) in elems.iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                match elem {
                    InterfaceElem::Method { name, sig } => {
                        out.push_str(&name.name);
                        write_signature(out, sig);
                    }
                    InterfaceElem::Embedded(e) => write_expr(out, e),
                }
            }
            out.push('}');
        }
        ExprKind::Union(terms) => {
            for (i, term) in terms.iter().enumerate() {
                if i > 0 {
                    out.push_str(" | ");
                }
                if term.tilde {
                    out.push('~');
                }
                write_expr(out, &term.ty);
            }
        }
    }
}

fn write_list(out: &mut String, exprs: &[Expr]) {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, e);
    }
}

fn write_fields(out: &mut String, fields: &[Field], sep: &str) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        for (j, name) in field.names.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            out.push_str(&name.name);
        }
        if !field.names.is_empty() {
            out.push(' ');
        }
        write_expr(out, &field.ty);
    }
}

fn write_signature(out: &mut String, sig: &FuncType) {
    out.push('(');
    write_fields(out, &sig.params, ", ");
    out.push(')');
    match sig.results.as_slice() {
        [] => {}
        [single] if single.names.is_empty() => {
            out.push(' ');
            write_expr(out, &single.ty);
        }
        results => {
            out.push_str(" (");
            write_fields(out, results, ", ");
            out.push(')');
        }
    }
}

/// Text of a bare map key, used when a brace literal keys by identifier.
pub fn map_key_string(key: &MapKey) -> String {
    match key {
        MapKey::Expr(e) => expr_string(e),
        MapKey::Bare(ident) => ident.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::AstBuilder;
    use crate::op::{BinaryOp, UnaryOp};

    #[test]
    fn renders_operators_with_user_spelling() {
        let b = AstBuilder::new();
        let e = b.binary(
            BinaryOp::AndWord,
            b.name("a"),
            b.unary(UnaryOp::NotUnicode, b.name("b")),
        );
        assert_eq!(expr_string(&e), "a and ¬b");
    }

    #[test]
    fn renders_calls_and_types() {
        let b = AstBuilder::new();
        let call = b.call_spread(b.sel(b.name("fmt"), "Println"), vec![b.name("xs")]);
        assert_eq!(expr_string(&call), "fmt.Println(xs...)");
        let ty = b.map_ty(b.name("string"), b.slice_ty(b.star(b.name("T"))));
        assert_eq!(expr_string(&ty), "map[string][]*T");
        let one = b.one_based(b.name("v"), b.int(2));
        assert_eq!(expr_string(&one), "v#2");
        assert_eq!(expr_string(&b.string("hi")), "\"hi\"");
    }

    #[test]
    fn renders_type_expressions() {
        let b = AstBuilder::new();
        let rendered = [
            b.func_lit(
                b.sig(vec![b.field(&["x"], b.name("int"))], vec![b.anon(b.name("string"))]),
                b.block(vec![]),
            ),
            b.struct_ty(vec![b.field(&["X", "Y"], b.name("int")), b.anon(b.name("Base"))]),
            b.chan_ty(ChanDir::Recv, b.name("int")),
            b.union(vec![b.term(true, b.name("int")), b.term(false, b.name("string"))]),
            b.func_ty(b.sig(vec![], vec![b.anon(b.name("int")), b.anon(b.name("error"))])),
            b.type_guard(b.name("x")),
            b.composite(Some(b.name("Point")), vec![]),
            b.map_lit(crate::expr::Delim::Bracket, vec![]),
        ]
        .iter()
        .map(expr_string)
        .collect::<Vec<_>>()
        .join("\n");
        insta::assert_snapshot!(rendered, @r"
        func(x int) string {…}
        struct{X, Y int; Base}
        <-chan int
        ~int | string
        func() (int, error)
        x.(type)
        Point{…}
        […:…]
        ");
    }
}
