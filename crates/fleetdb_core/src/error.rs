//! Error types for FleetDB core.

use crate::types::Kind;
use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// A single violated rule: the field and a human-readable reason.
///
/// Recoverable. The caller corrects the candidate and resubmits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A record in another collection that points at a record being deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referrer {
    /// Kind of the referring record.
    pub kind: Kind,
    /// Id of the referring record.
    pub id: String,
    /// Field holding the reference.
    pub field: String,
}

impl fmt::Display for Referrer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.kind, self.id, self.field)
    }
}

fn join_referrers(referrers: &[Referrer]) -> String {
    referrers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur in FleetDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] fleetdb_storage::StorageError),

    /// Document encoding error.
    #[error("encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// A schema pattern failed to compile.
    #[error("invalid schema pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The kind has no registered schema.
    #[error("unknown record kind: {name}")]
    UnknownKind {
        /// The name that was asked for.
        name: String,
    },

    /// The candidate violates a schema rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A foreign-key field names a record that does not exist.
    #[error("{kind}.{field} references missing {target} {id:?}")]
    Referential {
        /// Kind of the record being written.
        kind: Kind,
        /// The foreign-key field.
        field: String,
        /// Kind the field points into.
        target: Kind,
        /// The dangling id.
        id: String,
    },

    /// Delete blocked because other records still point at the target.
    #[error("{kind} {id} is still referenced by {}", join_referrers(.referenced_by))]
    ReferentialIntegrity {
        /// Kind of the record that could not be deleted.
        kind: Kind,
        /// Id of the record that could not be deleted.
        id: String,
        /// Records still holding a reference.
        referenced_by: Vec<Referrer>,
    },

    /// The target record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind searched.
        kind: Kind,
        /// Id that was not found.
        id: String,
    },

    /// The identifier allocator could not find a free id.
    #[error("identifier space exhausted for {kind} after {attempts} attempts")]
    AllocationExhausted {
        /// Kind whose ids were being allocated.
        kind: Kind,
        /// Number of attempts made.
        attempts: usize,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The password hasher failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl CoreError {
    /// Creates an unknown kind error.
    pub fn unknown_kind(name: impl Into<String>) -> Self {
        Self::UnknownKind { name: name.into() }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, reason))
    }

    /// Creates a not found error.
    pub fn not_found(kind: Kind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the validation details if this is a validation failure.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the caller can fix the input and retry.
    ///
    /// `UnknownKind` and `AllocationExhausted` point at programming or
    /// capacity problems; storage failures depend on the environment.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Referential { .. }
                | Self::ReferentialIntegrity { .. }
                | Self::NotFound { .. }
        )
    }
}
