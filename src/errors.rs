use thiserror::Error;

use crate::parser::ParseError;

/// Everything that can go wrong while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Raised by the active parser, surfaced unchanged.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// No registered node type handles this grammar tag.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("invalid function callee type: {0}")]
    InvalidCalleeType(String),

    /// The callee evaluated to a falsy value. Carries the best-effort callee name.
    #[error("could not evaluate '{0}'")]
    CalleeNotFound(String),

    #[error("'{0}' is not a function")]
    NotCallable(String),

    #[error("invalid parameter path node type: {0}")]
    InvalidParameterPathNodeType(String),

    #[error("member expression property is missing")]
    MissingProperty,

    /// A handler was registered under a tag whose nodes it cannot evaluate.
    #[error("{expected} handler cannot evaluate a {found} node")]
    NodeTypeMismatch { expected: &'static str, found: String },

    /// Raised by host callables and built-in methods.
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
