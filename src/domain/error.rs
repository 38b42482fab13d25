//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::kind::KindId;
use crate::domain::arena::NodeId;

/// Domain errors represent violations of the object model's rules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid value for property '{property}': {message}")]
    Validation { property: String, message: String },

    #[error("unknown kind: {0}")]
    UnknownKind(KindId),

    #[error("kind already registered: {0}")]
    DuplicateKind(KindId),

    #[error("kind {kind} declares no property '{property}'")]
    UnknownProperty { kind: KindId, property: String },

    #[error("encoding for property '{property}' does not match, expected {expected}")]
    EncodingMismatch {
        property: String,
        expected: &'static str,
    },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("duplicate sibling name '{name}' under {owner}")]
    NameCollision { owner: String, name: String },
}

impl DomainError {
    pub fn validation(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            property: property.into(),
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
