//! Shared types for the Gop compiler: source spans and diagnostics.

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Diagnostic, Related, Severity};
pub use span::{LineIndex, Span};
