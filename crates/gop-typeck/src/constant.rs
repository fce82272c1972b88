//! Compile-time constant values and their arithmetic.
//!
//! Integers are held as `i128` and floats as `f64`; results that leave the
//! `i128` range report [`ConstError::Overflow`]. Representability against a
//! concrete basic kind is decided by [`representable`].

use std::fmt;

use gop_ast::{BinaryOp, UnaryOp};
use serde::Serialize;

use crate::types::BasicKind;

/// Text for `true` when a boolean is concatenated with a string.
pub const TRUE_GLYPH: &str = "✓";
/// Text for `false` when a boolean is concatenated with a string.
pub const FALSE_GLYPH: &str = "✗";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    String(String),
    Int(i128),
    Float(f64),
    Complex(f64, f64),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstError {
    DivByZero,
    Overflow,
    /// Operator not defined for the operand values.
    Invalid,
}

/// Why a value does not fit a target kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReprError {
    Overflow,
    Truncated,
    NotRepresentable,
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Complex(..))
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Float(_) => 1,
            Value::Complex(..) => 2,
            _ => 3,
        }
    }

    /// Exact integer value, if there is one.
    pub fn to_int(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => float_to_int(*f),
            Value::Complex(re, im) if *im == 0.0 => float_to_int(*re),
            _ => None,
        }
    }

    pub fn to_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Complex(re, im) if *im == 0.0 => Some(*re),
            _ => None,
        }
    }

    pub fn to_complex(&self) -> Option<(f64, f64)> {
        match self {
            Value::Int(i) => Some((*i as f64, 0.0)),
            Value::Float(f) => Some((*f, 0.0)),
            Value::Complex(re, im) => Some((*re, *im)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to the representation of the given rank.
    fn promote(&self, rank: u8) -> Option<Value> {
        match rank {
            0 => self.to_int().map(Value::Int),
            1 => self.to_float().map(Value::Float),
            2 => self.to_complex().map(|(re, im)| Value::Complex(re, im)),
            _ => None,
        }
    }

    /// Whether the value is negative (integers and floats only).
    pub fn is_negative(&self) -> bool {
        match self {
            Value::Int(i) => *i < 0,
            Value::Float(f) => *f < 0.0,
            _ => false,
        }
    }

    /// Runtime truthiness: zero, empty and false are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Complex(re, im) => *re != 0.0 || *im != 0.0,
        }
    }

    /// Text used when the value is concatenated with a string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Bool(true) => TRUE_GLYPH.to_string(),
            Value::Bool(false) => FALSE_GLYPH.to_string(),
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Complex(re, im) => format_complex(*re, *im),
        }
    }

    /// The character a rune constant encodes, if it is a valid scalar value.
    pub fn to_char(&self) -> Option<char> {
        match self {
            Value::Int(i) => u32::try_from(*i).ok().and_then(char::from_u32),
            _ => None,
        }
    }
}

fn float_to_int(f: f64) -> Option<i128> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.7e38 {
        Some(f as i128)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Complex(re, im) => f.write_str(&format_complex(*re, *im)),
        }
    }
}

/// Shortest `%v`-style rendering: plain decimal for decimal exponents in
/// `-4..6`, scientific otherwise.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf".to_string() } else { "-Inf".to_string() };
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0".to_string() } else { "0".to_string() };
    }
    let sci = format!("{f:e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };
    if !(-4..6).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exp.abs());
    }
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let point = exp + 1;
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if point <= 0 {
        out.push_str("0.");
        for _ in 0..-point {
            out.push('0');
        }
        out.push_str(&digits);
    } else if point as usize >= digits.len() {
        out.push_str(&digits);
        for _ in 0..(point as usize - digits.len()) {
            out.push('0');
        }
    } else {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    }
    out
}

fn format_complex(re: f64, im: f64) -> String {
    let im_text = format_float(im);
    let sign = if im_text.starts_with('-') || im_text.starts_with('+') { "" } else { "+" };
    format!("({}{sign}{im_text}i)", format_float(re))
}

// ── Literals ────────────────────────────────────────────────────────────

/// Parse an integer literal (`42`, `0x2A`, `0o52`, `052`, `0b101010`, `1_000`).
pub fn parse_int(text: &str) -> Option<Value> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        i128::from_str_radix(hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i128::from_str_radix(oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i128::from_str_radix(bin, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        i128::from_str_radix(&lower[1..], 8)
    } else {
        lower.parse::<i128>()
    };
    parsed.ok().map(Value::Int)
}

/// Parse a decimal float literal. Integral values stay floats.
pub fn parse_float(text: &str) -> Option<Value> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    clean.parse::<f64>().ok().map(Value::Float)
}

/// Parse an imaginary literal (`2i`, `1.5i`).
pub fn parse_imag(text: &str) -> Option<Value> {
    let body = text.strip_suffix('i')?;
    let im = match parse_float(body)? {
        Value::Float(f) => f,
        _ => return None,
    };
    Some(Value::Complex(0.0, im))
}

// ── Operations ──────────────────────────────────────────────────────────

/// Evaluate `x op y`. `int_div` selects truncated integer division for `/`.
pub fn binary_op(x: &Value, op: BinaryOp, y: &Value, int_div: bool) -> Result<Value, ConstError> {
    let op = op.canonical();
    match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::LAnd => Ok(Value::Bool(*a && *b)),
            BinaryOp::LOr => Ok(Value::Bool(*a || *b)),
            _ => Err(ConstError::Invalid),
        },
        (Value::String(a), Value::String(b)) => match op {
            BinaryOp::Add => Ok(Value::String(format!("{a}{b}"))),
            _ => Err(ConstError::Invalid),
        },
        _ if x.is_numeric() && y.is_numeric() => {
            let mut rank = x.rank().max(y.rank());
            if op == BinaryOp::Quo && !int_div && rank == 0 {
                rank = 1;
            }
            let a = x.promote(rank).ok_or(ConstError::Invalid)?;
            let b = y.promote(rank).ok_or(ConstError::Invalid)?;
            numeric_op(&a, op, &b)
        }
        _ => Err(ConstError::Invalid),
    }
}

fn numeric_op(a: &Value, op: BinaryOp, b: &Value) -> Result<Value, ConstError> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let r = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Quo | BinaryOp::Rem if b == 0 => return Err(ConstError::DivByZero),
                BinaryOp::Quo => a.checked_div(b),
                BinaryOp::Rem => a.checked_rem(b),
                BinaryOp::And => Some(a & b),
                BinaryOp::Or => Some(a | b),
                BinaryOp::Xor => Some(a ^ b),
                BinaryOp::AndNot => Some(a & !b),
                _ => return Err(ConstError::Invalid),
            };
            r.map(Value::Int).ok_or(ConstError::Overflow)
        }
        (Value::Float(a), Value::Float(b)) => {
            let r = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Quo if *b == 0.0 => return Err(ConstError::DivByZero),
                BinaryOp::Quo => a / b,
                _ => return Err(ConstError::Invalid),
            };
            if r.is_finite() {
                Ok(Value::Float(r))
            } else {
                Err(ConstError::Overflow)
            }
        }
        (Value::Complex(ar, ai), Value::Complex(br, bi)) => {
            let (re, im) = match op {
                BinaryOp::Add => (ar + br, ai + bi),
                BinaryOp::Sub => (ar - br, ai - bi),
                BinaryOp::Mul => (ar * br - ai * bi, ar * bi + ai * br),
                BinaryOp::Quo => {
                    let d = br * br + bi * bi;
                    if d == 0.0 {
                        return Err(ConstError::DivByZero);
                    }
                    ((ar * br + ai * bi) / d, (ai * br - ar * bi) / d)
                }
                _ => return Err(ConstError::Invalid),
            };
            Ok(Value::Complex(re, im))
        }
        _ => Err(ConstError::Invalid),
    }
}

/// Evaluate a comparison. `None` if the values are not comparable.
pub fn compare(x: &Value, op: BinaryOp, y: &Value) -> Option<bool> {
    use std::cmp::Ordering;
    let op = op.canonical();
    let ord: Option<Ordering> = match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => {
            return match op {
                BinaryOp::Eql => Some(a == b),
                BinaryOp::Neq => Some(a != b),
                _ => None,
            }
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ if x.is_numeric() && y.is_numeric() => {
            let rank = x.rank().max(y.rank());
            match (x.promote(rank)?, y.promote(rank)?) {
                (Value::Int(a), Value::Int(b)) => Some(a.cmp(&b)),
                (Value::Float(a), Value::Float(b)) => a.partial_cmp(&b),
                (Value::Complex(ar, ai), Value::Complex(br, bi)) => {
                    let eq = ar == br && ai == bi;
                    return match op {
                        BinaryOp::Eql => Some(eq),
                        BinaryOp::Neq => Some(!eq),
                        _ => None,
                    };
                }
                _ => None,
            }
        }
        _ => None,
    };
    let ord = ord?;
    Some(match op {
        BinaryOp::Eql => ord == Ordering::Equal,
        BinaryOp::Neq => ord != Ordering::Equal,
        BinaryOp::Lss => ord == Ordering::Less,
        BinaryOp::Leq => ord != Ordering::Greater,
        BinaryOp::Gtr => ord == Ordering::Greater,
        BinaryOp::Geq => ord != Ordering::Less,
        _ => return None,
    })
}

/// Evaluate `x << s` or `x >> s` on an integer value.
pub fn shift(x: &Value, op: BinaryOp, s: u64) -> Result<Value, ConstError> {
    let x = x.to_int().ok_or(ConstError::Invalid)?;
    match op {
        BinaryOp::Shl => {
            if x == 0 {
                return Ok(Value::Int(0));
            }
            if s >= 127 {
                return Err(ConstError::Overflow);
            }
            let r = x.checked_shl(s as u32).ok_or(ConstError::Overflow)?;
            if r >> s != x {
                return Err(ConstError::Overflow);
            }
            Ok(Value::Int(r))
        }
        BinaryOp::Shr => Ok(Value::Int(x >> s.min(127))),
        _ => Err(ConstError::Invalid),
    }
}

/// Evaluate a unary operator. `unsigned_bits` is the width of the operand's
/// type when it is an unsigned integer, which `^x` needs.
pub fn unary_op(op: UnaryOp, x: &Value, unsigned_bits: Option<u32>) -> Result<Value, ConstError> {
    match (op.canonical(), x) {
        (UnaryOp::Plus, v) if v.is_numeric() => Ok(v.clone()),
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(ConstError::Overflow),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, Value::Complex(re, im)) => Ok(Value::Complex(-re, -im)),
        (UnaryOp::Xor, Value::Int(i)) => match unsigned_bits {
            Some(bits) if bits < 128 => Ok(Value::Int(!i & ((1i128 << bits) - 1))),
            _ => Ok(Value::Int(!i)),
        },
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        _ => Err(ConstError::Invalid),
    }
}

/// Check that `v` fits `kind` and return it in that kind's representation
/// (floats rounded to the kind's precision).
pub fn representable(v: &Value, kind: BasicKind) -> Result<Value, ReprError> {
    if kind.is_integer() {
        let i = match v {
            Value::Int(i) => *i,
            Value::Float(_) | Value::Complex(..) => match v.to_int() {
                Some(i) => i,
                None if v.to_float().is_some_and(|f| f.fract() == 0.0) => {
                    return Err(ReprError::Overflow)
                }
                None => return Err(ReprError::Truncated),
            },
            _ => return Err(ReprError::NotRepresentable),
        };
        let (min, max): (i128, i128) = match kind {
            BasicKind::Int8 => (i8::MIN as i128, i8::MAX as i128),
            BasicKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
            BasicKind::Int32 => (i32::MIN as i128, i32::MAX as i128),
            BasicKind::Int | BasicKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
            BasicKind::Uint8 => (0, u8::MAX as i128),
            BasicKind::Uint16 => (0, u16::MAX as i128),
            BasicKind::Uint32 => (0, u32::MAX as i128),
            BasicKind::Uint | BasicKind::Uint64 | BasicKind::Uintptr => (0, u64::MAX as i128),
            _ => (i128::MIN, i128::MAX),
        };
        if i < min || i > max {
            return Err(ReprError::Overflow);
        }
        return Ok(Value::Int(i));
    }
    if kind.is_float() {
        let f = match v {
            Value::Int(_) | Value::Float(_) => v.to_float().ok_or(ReprError::NotRepresentable)?,
            Value::Complex(..) => v.to_float().ok_or(ReprError::Truncated)?,
            _ => return Err(ReprError::NotRepresentable),
        };
        return match kind {
            BasicKind::Float32 => {
                if f.abs() > f32::MAX as f64 {
                    Err(ReprError::Overflow)
                } else {
                    Ok(Value::Float(f as f32 as f64))
                }
            }
            _ if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(ReprError::Overflow),
        };
    }
    if kind.is_complex() {
        let (re, im) = v.to_complex().ok_or(ReprError::NotRepresentable)?;
        return match kind {
            BasicKind::Complex64 => Ok(Value::Complex(re as f32 as f64, im as f32 as f64)),
            _ => Ok(Value::Complex(re, im)),
        };
    }
    match (kind, v) {
        (k, Value::String(_)) if k.is_string() => Ok(v.clone()),
        (k, Value::Bool(_)) if k.is_boolean() => Ok(v.clone()),
        _ => Err(ReprError::NotRepresentable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals_in_all_bases() {
        assert_eq!(parse_int("42"), Some(Value::Int(42)));
        assert_eq!(parse_int("0x2A"), Some(Value::Int(42)));
        assert_eq!(parse_int("0o52"), Some(Value::Int(42)));
        assert_eq!(parse_int("052"), Some(Value::Int(42)));
        assert_eq!(parse_int("0b101010"), Some(Value::Int(42)));
        assert_eq!(parse_int("1_000"), Some(Value::Int(1000)));
        assert_eq!(parse_imag("2i"), Some(Value::Complex(0.0, 2.0)));
    }

    #[test]
    fn untyped_division_depends_on_kind() {
        let seven = Value::Int(7);
        let two = Value::Int(2);
        assert_eq!(binary_op(&seven, BinaryOp::Quo, &two, true), Ok(Value::Int(3)));
        assert_eq!(binary_op(&seven, BinaryOp::Quo, &two, false), Ok(Value::Float(3.5)));
        assert_eq!(
            binary_op(&seven, BinaryOp::Rem, &Value::Int(0), true),
            Err(ConstError::DivByZero)
        );
    }

    #[test]
    fn mixed_kinds_promote() {
        let r = binary_op(&Value::Int(1), BinaryOp::Add, &Value::Float(0.5), false);
        assert_eq!(r, Ok(Value::Float(1.5)));
        assert_eq!(compare(&Value::Int(2), BinaryOp::Lss, &Value::Float(2.5)), Some(true));
        assert_eq!(compare(&Value::Bool(true), BinaryOp::NeqUnicode, &Value::Bool(false)), Some(true));
    }

    #[test]
    fn overflow_is_detected() {
        let big = Value::Int(i128::MAX);
        assert_eq!(binary_op(&big, BinaryOp::Add, &Value::Int(1), true), Err(ConstError::Overflow));
        assert_eq!(shift(&Value::Int(1), BinaryOp::Shl, 200), Err(ConstError::Overflow));
        assert_eq!(shift(&Value::Int(1), BinaryOp::Shl, 10), Ok(Value::Int(1024)));
    }

    #[test]
    fn representability() {
        assert_eq!(representable(&Value::Int(255), BasicKind::Uint8), Ok(Value::Int(255)));
        assert_eq!(representable(&Value::Int(256), BasicKind::Uint8), Err(ReprError::Overflow));
        assert_eq!(representable(&Value::Float(1.5), BasicKind::Int), Err(ReprError::Truncated));
        assert_eq!(representable(&Value::Float(2.0), BasicKind::Int), Ok(Value::Int(2)));
        assert_eq!(
            representable(&Value::String("a".into()), BasicKind::Int),
            Err(ReprError::NotRepresentable)
        );
    }

    #[test]
    fn unsigned_complement_is_masked() {
        assert_eq!(unary_op(UnaryOp::Xor, &Value::Int(0), Some(8)), Ok(Value::Int(255)));
        assert_eq!(unary_op(UnaryOp::Xor, &Value::Int(0), None), Ok(Value::Int(-1)));
        assert_eq!(unary_op(UnaryOp::NotWord, &Value::Bool(true), None), Ok(Value::Bool(false)));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Int(0).truthy());
        assert!(!Value::String(String::new()).truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Int(-3).truthy());
        assert!(Value::String("x".into()).truthy());
        assert!(Value::Bool(true).truthy());
    }

    #[test]
    fn text_conversion() {
        assert_eq!(Value::Int(12).to_text(), "12");
        assert_eq!(Value::Bool(true).to_text(), "✓");
        assert_eq!(Value::Bool(false).to_text(), "✗");
        assert_eq!(Value::Float(1.5).to_text(), "1.5");
        assert_eq!(Value::Float(100000.0).to_text(), "100000");
        assert_eq!(Value::Float(1e6).to_text(), "1e+06");
        assert_eq!(Value::Float(1234567.0).to_text(), "1.234567e+06");
        assert_eq!(Value::Float(1e21).to_text(), "1e+21");
        assert_eq!(Value::Float(0.0001).to_text(), "0.0001");
        assert_eq!(Value::Float(0.00001).to_text(), "1e-05");
        assert_eq!(Value::Complex(1.0, 2.0).to_text(), "(1+2i)");
    }
}
