use serde::{Deserialize, Serialize};

/// Evaluator-wide knobs, fixed when the evaluator is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Fail with `UnknownOperator` when a tree uses an operator symbol that has
    /// no registered function. When false the operator evaluates to `undefined`.
    pub strict_operators: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self { strict_operators: true }
    }
}

impl EvalOptions {
    pub fn lenient() -> Self {
        Self { strict_operators: false }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
