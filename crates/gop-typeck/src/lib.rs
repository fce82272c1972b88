//! Gop type checker.
//!
//! Semantic analysis for Gop, a Go-like language with a few conveniences
//! layered on top: truthiness in conditions, word and unicode operator
//! spellings, one-based indexing `v#i`, flexible slice and map literals and
//! automatic string concatenation of numbers and booleans.
//!
//! The checker resolves package-level declarations in dependency order,
//! infers missing type arguments of generic calls, and records a mode, a
//! type and (for constants) a value for every expression.
//!
//! # Architecture
//!
//! - [`types`]: type arena and structural types
//! - [`predicates`]: identity, comparability, type sets and core types
//! - [`constant`]: compile-time values and representability
//! - [`objects`], [`scope`]: declared names and their scopes
//! - [`operand`]: the result of checking one expression
//! - [`info`]: side tables filled while checking
//! - [`config`]: language version, alias mode and reserved calls
//! - [`importer`]: exported interfaces of imported modules
//! - [`error`], [`diagnostics`]: type errors and their rendering
//! - [`trace`]: optional record of generic inference

pub mod builtins;
pub mod config;
pub mod constant;
pub mod diagnostics;
pub mod error;
pub mod importer;
pub mod info;
pub mod objects;
pub mod operand;
pub mod predicates;
pub mod scope;
pub mod trace;
pub mod types;

mod assign;
mod call;
mod checker;
mod conversion;
mod decl;
mod expr;
mod index;
mod infer;
mod initorder;
mod labels;
mod literal;
mod lookup;
mod returns;
mod stmt;
mod subst;
mod typexpr;
mod unify;
mod universe;

use gop_ast::File;
use gop_common::Diagnostic;
use tracing::{debug, instrument};

use crate::checker::Checker;
use crate::config::{Config, SharedContext};
use crate::error::{CheckError, TypeError};
use crate::importer::{Importer, StdImporter};
use crate::info::Info;
use crate::objects::ObjectTable;
use crate::scope::{ScopeId, ScopeTable};
use crate::trace::InferTrace;
use crate::types::{TypeId, TypeTable};

/// The result of checking one package.
#[derive(Debug)]
pub struct TypeckResult {
    pub info: Info,
    pub types: TypeTable,
    pub objects: ObjectTable,
    pub scopes: ScopeTable,
    pub package_scope: ScopeId,
    /// Soft errors in the order they were found.
    pub errors: Vec<TypeError>,
    /// One entry per inference, when [`Config::trace_inference`] is set.
    pub traces: Vec<InferTrace>,
}

impl TypeckResult {
    /// The error that decides the outcome of the pass.
    pub fn first_error(&self) -> Option<&TypeError> {
        self.errors.first()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn type_string(&self, t: TypeId) -> String {
        self.types.type_string(t)
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors.iter().map(TypeError::to_diagnostic).collect()
    }

    pub fn diagnostics_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.diagnostics())
    }

    /// Render every error against `source`.
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.errors
            .iter()
            .map(|e| diagnostics::render_error(e, source, filename))
            .collect()
    }
}

/// Check a package importing from the standard modules.
pub fn check(files: &[File], config: &Config) -> Result<TypeckResult, CheckError> {
    check_with_importer(files, config, &StdImporter)
}

/// Check a package, resolving imports through `importer`.
#[instrument(skip_all, fields(files = files.len(), version = %config.lang_version))]
pub fn check_with_importer(
    files: &[File],
    config: &Config,
    importer: &dyn Importer,
) -> Result<TypeckResult, CheckError> {
    let mut checker = Checker::new(config, files, importer);
    if let Err(fatal) = checker.check_package() {
        return Err(CheckError::Internal {
            message: fatal.message,
            span: fatal.span,
            first_error: checker.errors.into_iter().next(),
        });
    }
    debug!(errors = checker.errors.len(), "check finished");
    Ok(TypeckResult {
        info: checker.info,
        types: checker.types,
        objects: checker.objects,
        scopes: checker.scopes,
        package_scope: checker.pkg_scope,
        errors: checker.errors,
        traces: checker.traces,
    })
}

/// Check a package while other checkers share `ctx`; all of them must use
/// the same alias mode.
pub fn check_shared(
    files: &[File],
    config: &Config,
    importer: &dyn Importer,
    ctx: &SharedContext,
) -> Result<TypeckResult, CheckError> {
    let _lease = ctx.acquire(config.alias_mode)?;
    check_with_importer(files, config, importer)
}
