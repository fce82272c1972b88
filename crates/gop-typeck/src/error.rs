//! Type errors and checker failures.
//!
//! [`TypeError`] is a soft error: it is recorded and checking continues.
//! Each variant has a stable code (see [`TypeError::code`]) and renders a
//! Go-style one-line message through `Display`. Secondary positions
//! ("other declaration of x", "x refers to y") travel in [`TypeError::related`].
//!
//! [`Fatal`] is an internal invariant violation. It unwinds the whole pass
//! through `Result` and is reported to the caller as [`CheckError::Internal`].

use std::fmt;

use gop_common::{Diagnostic, Span};

use crate::config::{AliasMode, LangVersion};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConversionFailure {
    Cannot,
    Truncated,
    Overflows,
}

/// A soft error found while checking.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    Undefined {
        name: String,
        span: Span,
    },
    Redeclared {
        name: String,
        span: Span,
        prev: Span,
    },
    NotAType {
        expr: String,
        span: Span,
    },
    /// A type used where a value is required.
    NotAnExpr {
        expr: String,
        span: Span,
    },
    /// `cannot use x (variable of type int) as string value in assignment`.
    /// `detail` is appended verbatim (`" (overflows)"`, `": T does not implement I ..."`).
    CannotUse {
        operand: String,
        target: String,
        context: String,
        detail: String,
        span: Span,
    },
    MismatchedTypes {
        expr: String,
        left: String,
        right: String,
        span: Span,
    },
    InvalidOperation {
        message: String,
        span: Span,
    },
    DivisionByZero {
        span: Span,
    },
    InvalidConversion {
        operand: String,
        target: String,
        failure: ConversionFailure,
        /// Why the conversion is impossible, when more can be said.
        cause: String,
        span: Span,
    },
    /// A constant left the range the checker can represent exactly.
    ConstantOverflow {
        span: Span,
    },
    ArgumentCount {
        not_enough: bool,
        call: String,
        have: String,
        want: String,
        span: Span,
    },
    ReturnCount {
        not_enough: bool,
        have: String,
        want: String,
        span: Span,
    },
    AssignmentMismatch {
        vars: usize,
        values: usize,
        /// Set when the single right-hand side is a call.
        call: Option<String>,
        span: Span,
    },
    CannotInfer {
        func: String,
        param: String,
        reason: Option<String>,
        span: Span,
        decl: Span,
    },
    InferenceMismatch {
        arg: String,
        arg_type: String,
        param_type: String,
        span: Span,
    },
    Unsatisfied {
        ty: String,
        constraint: String,
        reason: String,
        span: Span,
    },
    InvalidRecursiveType {
        name: String,
        /// Each participant of the cycle with its declaration position.
        cycle: Vec<(String, Span)>,
        span: Span,
    },
    InitializationCycle {
        name: String,
        cycle: Vec<(String, Span)>,
        span: Span,
    },
    GenericWithoutInstantiation {
        what: String,
        name: String,
        span: Span,
    },
    MissingReturn {
        span: Span,
    },
    UnusedVariable {
        name: String,
        span: Span,
    },
    UnusedImport {
        path: String,
        span: Span,
    },
    UnusedLabel {
        name: String,
        span: Span,
    },
    MisplacedBranch {
        message: String,
        span: Span,
    },
    MissingFieldOrMethod {
        expr: String,
        sel: String,
        ty: String,
        span: Span,
    },
    AmbiguousSelector {
        expr: String,
        sel: String,
        span: Span,
    },
    PointerMethod {
        method: String,
        operand: String,
        span: Span,
    },
    MissingImport {
        name: String,
        module: String,
        span: Span,
    },
    NotExported {
        name: String,
        module: String,
        span: Span,
    },
    UndefinedMember {
        module: String,
        name: String,
        span: Span,
    },
    VersionTooLow {
        feature: String,
        required: LangVersion,
        span: Span,
    },
    InvalidArgument {
        message: String,
        span: Span,
    },
    DuplicateCase {
        value: String,
        type_switch: bool,
        span: Span,
        prev: Span,
    },
    DuplicateKey {
        key: String,
        span: Span,
        prev: Span,
    },
    ImpossibleAssertion {
        expr: String,
        reason: String,
        span: Span,
    },
    CannotAssign {
        operand: String,
        span: Span,
    },
    NoNewVariables {
        span: Span,
    },
    NotUsed {
        operand: String,
        span: Span,
    },
    InvalidReceiver {
        message: String,
        span: Span,
    },
    TypeArgCount {
        got: usize,
        want: usize,
        name: String,
        span: Span,
    },
    InvalidLiteral {
        message: String,
        span: Span,
    },
    BlankUse {
        span: Span,
    },
    InvalidDecl {
        message: String,
        span: Span,
    },
    InvalidMapKey {
        ty: String,
        span: Span,
    },
    UntypedNil {
        context: String,
        span: Span,
    },
    ImportNotFound {
        path: String,
        span: Span,
    },
    /// Cycle through constants or variables and at least one type or
    /// function.
    DeclCycle {
        name: String,
        cycle: Vec<(String, Span)>,
        span: Span,
    },
    InvalidArrayLength {
        message: String,
        span: Span,
    },
    /// Malformed type expression: misplaced constraint, bad union term,
    /// bad embedded field, missing instantiation.
    InvalidTypeExpr {
        message: String,
        span: Span,
    },
    /// A name used where its kind is not allowed (`iota` outside a
    /// constant declaration, a module name outside a selector, ...).
    InvalidUse {
        message: String,
        span: Span,
    },
}

impl TypeError {
    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            TypeError::Undefined { .. } => "E0001",
            TypeError::Redeclared { .. } => "E0002",
            TypeError::NotAType { .. } => "E0003",
            TypeError::NotAnExpr { .. } => "E0004",
            TypeError::CannotUse { .. } => "E0005",
            TypeError::MismatchedTypes { .. } => "E0006",
            TypeError::InvalidOperation { .. } => "E0007",
            TypeError::DivisionByZero { .. } => "E0008",
            TypeError::InvalidConversion { .. } => "E0009",
            TypeError::ConstantOverflow { .. } => "E0010",
            TypeError::ArgumentCount { .. } => "E0011",
            TypeError::ReturnCount { .. } => "E0012",
            TypeError::AssignmentMismatch { .. } => "E0013",
            TypeError::CannotInfer { .. } => "E0014",
            TypeError::InferenceMismatch { .. } => "E0015",
            TypeError::Unsatisfied { .. } => "E0016",
            TypeError::InvalidRecursiveType { .. } => "E0017",
            TypeError::InitializationCycle { .. } => "E0018",
            TypeError::GenericWithoutInstantiation { .. } => "E0019",
            TypeError::MissingReturn { .. } => "E0020",
            TypeError::UnusedVariable { .. } => "E0021",
            TypeError::UnusedImport { .. } => "E0022",
            TypeError::UnusedLabel { .. } => "E0023",
            TypeError::MisplacedBranch { .. } => "E0024",
            TypeError::MissingFieldOrMethod { .. } => "E0025",
            TypeError::AmbiguousSelector { .. } => "E0026",
            TypeError::PointerMethod { .. } => "E0027",
            TypeError::MissingImport { .. } => "E0028",
            TypeError::NotExported { .. } => "E0029",
            TypeError::UndefinedMember { .. } => "E0030",
            TypeError::VersionTooLow { .. } => "E0031",
            TypeError::InvalidArgument { .. } => "E0032",
            TypeError::DuplicateCase { .. } => "E0033",
            TypeError::DuplicateKey { .. } => "E0034",
            TypeError::ImpossibleAssertion { .. } => "E0035",
            TypeError::CannotAssign { .. } => "E0036",
            TypeError::NoNewVariables { .. } => "E0037",
            TypeError::NotUsed { .. } => "E0038",
            TypeError::InvalidReceiver { .. } => "E0039",
            TypeError::TypeArgCount { .. } => "E0040",
            TypeError::InvalidLiteral { .. } => "E0041",
            TypeError::BlankUse { .. } => "E0042",
            TypeError::InvalidDecl { .. } => "E0043",
            TypeError::InvalidMapKey { .. } => "E0044",
            TypeError::UntypedNil { .. } => "E0045",
            TypeError::ImportNotFound { .. } => "E0046",
            TypeError::DeclCycle { .. } => "E0047",
            TypeError::InvalidArrayLength { .. } => "E0048",
            TypeError::InvalidTypeExpr { .. } => "E0049",
            TypeError::InvalidUse { .. } => "E0050",
        }
    }

    /// Primary position.
    pub fn span(&self) -> Span {
        match self {
            TypeError::Undefined { span, .. }
            | TypeError::Redeclared { span, .. }
            | TypeError::NotAType { span, .. }
            | TypeError::NotAnExpr { span, .. }
            | TypeError::CannotUse { span, .. }
            | TypeError::MismatchedTypes { span, .. }
            | TypeError::InvalidOperation { span, .. }
            | TypeError::DivisionByZero { span }
            | TypeError::InvalidConversion { span, .. }
            | TypeError::ConstantOverflow { span }
            | TypeError::ArgumentCount { span, .. }
            | TypeError::ReturnCount { span, .. }
            | TypeError::AssignmentMismatch { span, .. }
            | TypeError::CannotInfer { span, .. }
            | TypeError::InferenceMismatch { span, .. }
            | TypeError::Unsatisfied { span, .. }
            | TypeError::InvalidRecursiveType { span, .. }
            | TypeError::InitializationCycle { span, .. }
            | TypeError::GenericWithoutInstantiation { span, .. }
            | TypeError::MissingReturn { span }
            | TypeError::UnusedVariable { span, .. }
            | TypeError::UnusedImport { span, .. }
            | TypeError::UnusedLabel { span, .. }
            | TypeError::MisplacedBranch { span, .. }
            | TypeError::MissingFieldOrMethod { span, .. }
            | TypeError::AmbiguousSelector { span, .. }
            | TypeError::PointerMethod { span, .. }
            | TypeError::MissingImport { span, .. }
            | TypeError::NotExported { span, .. }
            | TypeError::UndefinedMember { span, .. }
            | TypeError::VersionTooLow { span, .. }
            | TypeError::InvalidArgument { span, .. }
            | TypeError::DuplicateCase { span, .. }
            | TypeError::DuplicateKey { span, .. }
            | TypeError::ImpossibleAssertion { span, .. }
            | TypeError::CannotAssign { span, .. }
            | TypeError::NoNewVariables { span }
            | TypeError::NotUsed { span, .. }
            | TypeError::InvalidReceiver { span, .. }
            | TypeError::TypeArgCount { span, .. }
            | TypeError::InvalidLiteral { span, .. }
            | TypeError::BlankUse { span }
            | TypeError::InvalidDecl { span, .. }
            | TypeError::InvalidMapKey { span, .. }
            | TypeError::UntypedNil { span, .. }
            | TypeError::ImportNotFound { span, .. }
            | TypeError::DeclCycle { span, .. }
            | TypeError::InvalidArrayLength { span, .. }
            | TypeError::InvalidTypeExpr { span, .. }
            | TypeError::InvalidUse { span, .. } => *span,
        }
    }

    /// Secondary "see also" positions.
    pub fn related(&self) -> Vec<(Span, String)> {
        match self {
            TypeError::Redeclared { name, prev, .. } => {
                vec![(*prev, format!("other declaration of {name}"))]
            }
            TypeError::CannotInfer { param, decl, .. } => {
                vec![(*decl, format!("type parameter {param} declared here"))]
            }
            TypeError::InvalidRecursiveType { cycle, .. }
            | TypeError::InitializationCycle { cycle, .. }
            | TypeError::DeclCycle { cycle, .. } => cycle_steps(cycle),
            TypeError::DuplicateCase { prev, .. } => vec![(*prev, "previous case".to_string())],
            TypeError::DuplicateKey { prev, .. } => vec![(*prev, "previous key".to_string())],
            _ => Vec::new(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        self.related().into_iter().fold(
            Diagnostic::error(self.code(), self.to_string(), self.span()),
            |diag, (span, message)| diag.with_related(span, message),
        )
    }
}

/// `a refers to b`, `b refers to a`, one entry per cycle member.
fn cycle_steps(cycle: &[(String, Span)]) -> Vec<(Span, String)> {
    if cycle.len() < 2 {
        return Vec::new();
    }
    cycle
        .iter()
        .enumerate()
        .map(|(i, (name, span))| {
            let next = &cycle[(i + 1) % cycle.len()].0;
            (*span, format!("{name} refers to {next}"))
        })
        .collect()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Undefined { name, .. } => write!(f, "undefined: {name}"),
            TypeError::Redeclared { name, .. } => write!(f, "{name} redeclared in this block"),
            TypeError::NotAType { expr, .. } => write!(f, "{expr} is not a type"),
            TypeError::NotAnExpr { expr, .. } => write!(f, "{expr} (type) is not an expression"),
            TypeError::CannotUse {
                operand,
                target,
                context,
                detail,
                ..
            } => write!(f, "cannot use {operand} as {target} value in {context}{detail}"),
            TypeError::MismatchedTypes {
                expr, left, right, ..
            } => write!(
                f,
                "invalid operation: {expr} (mismatched types {left} and {right})"
            ),
            TypeError::InvalidOperation { message, .. } => {
                write!(f, "invalid operation: {message}")
            }
            TypeError::DivisionByZero { .. } => write!(f, "invalid operation: division by zero"),
            TypeError::InvalidConversion {
                operand,
                target,
                failure,
                cause,
                ..
            } => match failure {
                ConversionFailure::Cannot if cause.is_empty() => {
                    write!(f, "cannot convert {operand} to type {target}")
                }
                ConversionFailure::Cannot => write!(f, "cannot convert {operand} to type {target}: {cause}"),
                ConversionFailure::Truncated => write!(f, "{operand} truncated to {target}"),
                ConversionFailure::Overflows => write!(f, "{operand} overflows {target}"),
            },
            TypeError::ConstantOverflow { .. } => write!(f, "constant overflow"),
            TypeError::ArgumentCount {
                not_enough,
                call,
                have,
                want,
                ..
            } => {
                let which = if *not_enough { "not enough" } else { "too many" };
                write!(
                    f,
                    "{which} arguments in call to {call}\n\thave {have}\n\twant {want}"
                )
            }
            TypeError::ReturnCount {
                not_enough,
                have,
                want,
                ..
            } => {
                let which = if *not_enough { "not enough" } else { "too many" };
                write!(f, "{which} return values\n\thave {have}\n\twant {want}")
            }
            TypeError::AssignmentMismatch {
                vars, values, call, ..
            } => match call {
                Some(call) => write!(
                    f,
                    "assignment mismatch: {} but {call} returns {}",
                    plural(*vars, "variable"),
                    plural(*values, "value")
                ),
                None => write!(
                    f,
                    "assignment mismatch: {} but {}",
                    plural(*vars, "variable"),
                    plural(*values, "value")
                ),
            },
            TypeError::CannotInfer {
                func,
                param,
                reason,
                ..
            } => {
                write!(f, "in call to {func}, cannot infer {param}")?;
                if let Some(reason) = reason {
                    write!(f, " ({reason})")?;
                }
                Ok(())
            }
            TypeError::InferenceMismatch {
                arg,
                arg_type,
                param_type,
                ..
            } => write!(f, "type {arg_type} of {arg} does not match {param_type}"),
            TypeError::Unsatisfied {
                ty,
                constraint,
                reason,
                ..
            } => {
                write!(f, "{ty} does not satisfy {constraint}")?;
                if !reason.is_empty() {
                    write!(f, " ({reason})")?;
                }
                Ok(())
            }
            TypeError::InvalidRecursiveType { name, cycle, .. } => {
                if cycle.len() == 1 {
                    write!(f, "invalid recursive type: {name} refers to itself")
                } else {
                    write!(f, "invalid recursive type {name}")
                }
            }
            TypeError::InitializationCycle { name, cycle, .. } => {
                if cycle.len() == 1 {
                    write!(f, "initialization cycle: {name} refers to itself")
                } else {
                    write!(f, "initialization cycle for {name}")
                }
            }
            TypeError::GenericWithoutInstantiation { what, name, .. } => {
                write!(f, "cannot use generic {what} {name} without instantiation")
            }
            TypeError::MissingReturn { .. } => write!(f, "missing return"),
            TypeError::UnusedVariable { name, .. } => write!(f, "declared and not used: {name}"),
            TypeError::UnusedImport { path, .. } => write!(f, "{path:?} imported and not used"),
            TypeError::UnusedLabel { name, .. } => write!(f, "label {name} defined and not used"),
            TypeError::MisplacedBranch { message, .. } => f.write_str(message),
            TypeError::MissingFieldOrMethod { expr, sel, ty, .. } => write!(
                f,
                "{expr}.{sel} undefined (type {ty} has no field or method {sel})"
            ),
            TypeError::AmbiguousSelector { expr, sel, .. } => {
                write!(f, "ambiguous selector {expr}.{sel}")
            }
            TypeError::PointerMethod {
                method, operand, ..
            } => write!(f, "cannot call pointer method {method} on {operand}"),
            TypeError::MissingImport { name, module, .. } => {
                write!(f, "undefined: {name} (add `import {module:?}` to use it)")
            }
            TypeError::NotExported { name, module, .. } => {
                write!(f, "name {name} not exported by package {module}")
            }
            TypeError::UndefinedMember { module, name, .. } => {
                write!(f, "undefined: {module}.{name}")
            }
            TypeError::VersionTooLow {
                feature, required, ..
            } => write!(f, "{feature} requires {required} or later"),
            TypeError::InvalidArgument { message, .. } => write!(f, "invalid argument: {message}"),
            TypeError::DuplicateCase {
                value, type_switch, ..
            } => {
                let kind = if *type_switch { "type" } else { "expression" };
                write!(f, "duplicate case {value} in {kind} switch")
            }
            TypeError::DuplicateKey { key, .. } => write!(f, "duplicate key {key} in map literal"),
            TypeError::ImpossibleAssertion { expr, reason, .. } => {
                write!(f, "impossible type assertion: {expr}\n\t{reason}")
            }
            TypeError::CannotAssign { operand, .. } => write!(
                f,
                "cannot assign to {operand} (neither addressable nor a map index expression)"
            ),
            TypeError::NoNewVariables { .. } => write!(f, "no new variables on left side of :="),
            TypeError::NotUsed { operand, .. } => write!(f, "{operand} is not used"),
            TypeError::InvalidReceiver { message, .. } => write!(f, "invalid receiver type {message}"),
            TypeError::TypeArgCount {
                got, want, name, ..
            } => {
                if got < want {
                    write!(
                        f,
                        "not enough type arguments for {name}: have {got}, want {want}"
                    )
                } else {
                    write!(
                        f,
                        "got {got} type arguments but {name} has {} type parameters",
                        want
                    )
                }
            }
            TypeError::InvalidLiteral { message, .. } => f.write_str(message),
            TypeError::BlankUse { .. } => write!(f, "cannot use _ as value"),
            TypeError::InvalidDecl { message, .. }
            | TypeError::InvalidArrayLength { message, .. }
            | TypeError::InvalidTypeExpr { message, .. }
            | TypeError::InvalidUse { message, .. } => f.write_str(message),
            TypeError::InvalidMapKey { ty, .. } => write!(f, "invalid map key type {ty}"),
            TypeError::UntypedNil { context, .. } => write!(f, "use of untyped nil in {context}"),
            TypeError::ImportNotFound { path, .. } => write!(f, "could not import {path:?}"),
            TypeError::DeclCycle { name, cycle, .. } => {
                if cycle.len() == 1 {
                    write!(f, "invalid cycle in declaration: {name} refers to itself")
                } else {
                    write!(f, "invalid cycle in declaration of {name}")
                }
            }
        }
    }
}

impl std::error::Error for TypeError {}

/// An internal invariant was violated; the pass cannot continue.
#[derive(Clone, Debug, PartialEq)]
pub struct Fatal {
    pub message: String,
    pub span: Span,
}

impl Fatal {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Fatal {
            message: message.into(),
            span,
        }
    }
}

/// Result of checker operations that may need to abandon the pass.
pub type Flow<T> = Result<T, Fatal>;

/// Why a check produced no result.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckError {
    /// The checker hit an internal invariant violation. Partial results are
    /// discarded; the first soft error seen before bailing out is kept.
    Internal {
        message: String,
        span: Span,
        first_error: Option<TypeError>,
    },
    /// Another checker sharing the context runs with a different alias mode.
    ModeConflict {
        requested: AliasMode,
        active: AliasMode,
    },
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Internal {
                message,
                first_error,
                ..
            } => {
                write!(f, "internal checker error: {message}")?;
                if let Some(first) = first_error {
                    write!(f, " (first error: {first})")?;
                }
                Ok(())
            }
            CheckError::ModeConflict { requested, active } => write!(
                f,
                "alias mode {requested:?} conflicts with mode {active:?} used by a concurrent check"
            ),
        }
    }
}

impl std::error::Error for CheckError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_and_codes() {
        let err = TypeError::Undefined {
            name: "x".into(),
            span: Span::new(0, 1),
        };
        assert_eq!(err.to_string(), "undefined: x");
        assert_eq!(err.code(), "E0001");

        let err = TypeError::AssignmentMismatch {
            vars: 2,
            values: 1,
            call: Some("f()".into()),
            span: Span::new(0, 1),
        };
        assert_eq!(
            err.to_string(),
            "assignment mismatch: 2 variables but f() returns 1 value"
        );

        let err = TypeError::MissingImport {
            name: "echo".into(),
            module: "fmt".into(),
            span: Span::new(0, 4),
        };
        assert_eq!(
            err.to_string(),
            "undefined: echo (add `import \"fmt\"` to use it)"
        );
    }

    #[test]
    fn cycle_errors_list_each_step() {
        let err = TypeError::InvalidRecursiveType {
            name: "A".into(),
            cycle: vec![("A".into(), Span::new(0, 1)), ("B".into(), Span::new(5, 6))],
            span: Span::new(0, 1),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.message, "invalid recursive type A");
        let related: Vec<_> = diag.related.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(related, ["A refers to B", "B refers to A"]);
    }

    #[test]
    fn version_message() {
        let err = TypeError::VersionTooLow {
            feature: "predeclared min".into(),
            required: LangVersion::GO1_21,
            span: Span::default(),
        };
        assert_eq!(err.to_string(), "predeclared min requires go1.21 or later");
    }
}
