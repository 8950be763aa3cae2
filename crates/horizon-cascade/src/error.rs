//! Error types for the cascade engine.

use crate::graph::NodeId;

/// Result type alias for cascade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing a cascade graph.
///
/// All errors are reported at the call site that caused them. Resolution
/// never fails, and a failed mutation leaves the graph untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A value was rejected by its attribute's validator.
    #[error("Invalid value for attribute '{attribute}': {message}")]
    InvalidValue { attribute: String, message: String },

    /// A malformed call, such as an unknown `after` reference.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested dependency edge would close a cycle.
    #[error("Adding {parent:?} as a dependency of {node:?} would create a cycle")]
    CycleDetected { node: NodeId, parent: NodeId },

    /// A type was unrelated to the type it had to refine, or an attribute
    /// was looked up with the wrong value type.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The node handle is stale or belongs to another graph.
    #[error("Unknown or destroyed cascade node {0:?}")]
    UnknownNode(NodeId),
}

impl Error {
    /// Create a value error.
    pub fn invalid_value(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create an argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
