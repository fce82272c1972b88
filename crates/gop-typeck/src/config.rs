//! Checker configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::CheckError;

/// A `go1.N` language version.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LangVersion {
    pub major: u32,
    pub minor: u32,
}

impl LangVersion {
    pub const GO1_18: LangVersion = LangVersion::new(1, 18);
    pub const GO1_21: LangVersion = LangVersion::new(1, 21);
    pub const GO1_22: LangVersion = LangVersion::new(1, 22);
    pub const LATEST: LangVersion = LangVersion::GO1_22;

    pub const fn new(major: u32, minor: u32) -> Self {
        LangVersion { major, minor }
    }
}

impl fmt::Display for LangVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "go{}.{}", self.major, self.minor)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseVersionError(pub String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid language version {:?} (expected goX.Y)", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for LangVersion {
    type Err = ParseVersionError;

    /// Accepts `go1.21`, `1.21` and `go1.21.3` (the patch level is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let rest = s.strip_prefix("go").unwrap_or(s);
        let mut parts = rest.split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        if let Some(patch) = parts.next() {
            patch.parse::<u32>().map_err(|_| err())?;
        }
        Ok(LangVersion { major, minor })
    }
}

/// Language features gated on a minimum version.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Feature {
    TypeParams,
    Min,
    Max,
    Clear,
    RangeOverInt,
}

impl Feature {
    pub fn required(self) -> LangVersion {
        match self {
            Feature::TypeParams => LangVersion::GO1_18,
            Feature::Min | Feature::Max | Feature::Clear => LangVersion::GO1_21,
            Feature::RangeOverInt => LangVersion::GO1_22,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Feature::TypeParams => "type parameters",
            Feature::Min => "predeclared min",
            Feature::Max => "predeclared max",
            Feature::Clear => "predeclared clear",
            Feature::RangeOverInt => "range over int",
        }
    }
}

/// How `type A = B` declarations are represented.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AliasMode {
    /// Aliases are distinct `Alias` types that print under their own name.
    Materialized,
    /// Alias names denote the aliased type directly.
    Transparent,
}

/// A bare call that is rewritten to a qualified module member,
/// e.g. `echo(x)` to `fmt.Println(x)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservedCall {
    pub name: String,
    pub module: String,
    pub member: String,
}

impl ReservedCall {
    pub fn new(name: &str, module: &str, member: &str) -> Self {
        ReservedCall {
            name: name.to_string(),
            module: module.to_string(),
            member: member.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub lang_version: LangVersion,
    pub alias_mode: AliasMode,
    pub reserved_calls: Vec<ReservedCall>,
    /// Report unused local variables and imports.
    pub report_unused: bool,
    /// Keep a step-by-step record of every generic inference.
    pub trace_inference: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lang_version: LangVersion::LATEST,
            alias_mode: AliasMode::Materialized,
            reserved_calls: vec![ReservedCall::new("echo", "fmt", "Println")],
            report_unused: true,
            trace_inference: false,
        }
    }
}

impl Config {
    pub fn allows(&self, feature: Feature) -> bool {
        self.lang_version >= feature.required()
    }

    pub fn reserved_call(&self, name: &str) -> Option<&ReservedCall> {
        self.reserved_calls.iter().find(|r| r.name == name)
    }
}

/// Coordinates checkers that run concurrently in one process.
///
/// All checkers holding a lease must agree on the alias mode. A checker
/// asking for a different mode while leases are outstanding is refused
/// with [`CheckError::ModeConflict`].
#[derive(Debug, Default)]
pub struct SharedContext {
    state: Mutex<Option<(AliasMode, usize)>>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, mode: AliasMode) -> Result<ModeLease<'_>, CheckError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            Some((active, count)) if active == mode => *state = Some((active, count + 1)),
            Some((active, _)) => {
                return Err(CheckError::ModeConflict {
                    requested: mode,
                    active,
                })
            }
            None => *state = Some((mode, 1)),
        }
        Ok(ModeLease { ctx: self })
    }

    /// The mode agreed by the current lease holders, if any.
    pub fn active_mode(&self) -> Option<AliasMode> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.map(|(mode, _)| mode)
    }
}

/// Held for the duration of one check; releases the mode when dropped.
#[derive(Debug)]
pub struct ModeLease<'a> {
    ctx: &'a SharedContext,
}

impl Drop for ModeLease<'_> {
    fn drop(&mut self) {
        let mut state = self.ctx.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = match *state {
            Some((mode, count)) if count > 1 => Some((mode, count - 1)),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        assert_eq!("go1.21".parse::<LangVersion>(), Ok(LangVersion::GO1_21));
        assert_eq!("1.18".parse::<LangVersion>(), Ok(LangVersion::GO1_18));
        assert_eq!("go1.22.3".parse::<LangVersion>(), Ok(LangVersion::GO1_22));
        assert!("go1".parse::<LangVersion>().is_err());
        assert!("banana".parse::<LangVersion>().is_err());
        assert_eq!(LangVersion::GO1_21.to_string(), "go1.21");
    }

    #[test]
    fn features_follow_version() {
        let mut config = Config::default();
        assert!(config.allows(Feature::RangeOverInt));
        config.lang_version = LangVersion::new(1, 20);
        assert!(config.allows(Feature::TypeParams));
        assert!(!config.allows(Feature::Min));
        assert!(!config.allows(Feature::RangeOverInt));
    }

    #[test]
    fn default_reserved_call_is_echo() {
        let config = Config::default();
        let echo = config.reserved_call("echo").unwrap();
        assert_eq!((echo.module.as_str(), echo.member.as_str()), ("fmt", "Println"));
        assert!(config.reserved_call("print").is_none());
    }

    #[test]
    fn shared_context_enforces_one_mode() {
        let ctx = SharedContext::new();
        let a = ctx.acquire(AliasMode::Materialized).unwrap();
        let b = ctx.acquire(AliasMode::Materialized).unwrap();
        assert!(matches!(
            ctx.acquire(AliasMode::Transparent),
            Err(CheckError::ModeConflict { .. })
        ));
        drop(a);
        drop(b);
        assert_eq!(ctx.active_mode(), None);
        let _c = ctx.acquire(AliasMode::Transparent).unwrap();
        assert_eq!(ctx.active_mode(), Some(AliasMode::Transparent));
    }
}
