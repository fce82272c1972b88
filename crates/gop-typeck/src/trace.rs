//! Step-by-step records of generic type inference.
//!
//! Recording is opt-in through `Config::trace_inference`; when disabled no
//! trace values are built.

use gop_common::Span;
use serde::Serialize;

/// Which inference phase produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferPhase {
    /// Explicit type arguments supplied at the call.
    Explicit,
    /// Typed argument unified with its parameter.
    Arguments,
    /// Core type or core term of a constraint.
    Constraints,
    /// Untyped constant arguments defaulted.
    Untyped,
    /// A binding that refers back to itself was cleared.
    Cycles,
    /// Known bindings substituted into the others.
    Simplify,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferStep {
    pub phase: InferPhase,
    /// Type parameter affected, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    pub detail: String,
}

/// Full record of one inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferTrace {
    pub func: String,
    pub span: Span,
    pub steps: Vec<InferStep>,
    /// Final bindings, `None` when inference failed.
    pub result: Option<Vec<String>>,
}

impl InferTrace {
    pub fn new(func: impl Into<String>, span: Span) -> Self {
        InferTrace {
            func: func.into(),
            span,
            steps: Vec::new(),
            result: None,
        }
    }

    pub fn step(&mut self, phase: InferPhase, param: Option<&str>, detail: impl Into<String>) {
        self.steps.push(InferStep {
            phase,
            param: param.map(str::to_string),
            detail: detail.into(),
        });
    }

    pub fn phases(&self) -> Vec<InferPhase> {
        let mut phases: Vec<InferPhase> = Vec::new();
        for s in &self.steps {
            if phases.last() != Some(&s.phase) {
                phases.push(s.phase);
            }
        }
        phases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_snake_case_phases() {
        let mut trace = InferTrace::new("Map", Span::new(3, 9));
        trace.step(InferPhase::Arguments, Some("T"), "T := int");
        trace.step(InferPhase::Untyped, None, "no untyped arguments");
        trace.result = Some(vec!["int".into()]);
        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["steps"][0]["phase"], "arguments");
        assert_eq!(json["steps"][0]["param"], "T");
        assert!(json["steps"][1].get("param").is_none());
        assert_eq!(trace.phases(), [InferPhase::Arguments, InferPhase::Untyped]);
    }
}
