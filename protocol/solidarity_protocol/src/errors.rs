//! Domain error taxonomy shared by every engine.

use thiserror::Error;

/// Why a domain operation was refused.
///
/// Each variant is a distinct failure category; the service maps them onto
/// HTTP status codes one-to-one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Missing or malformed input: empty fields, bad date ordering,
    /// non-positive quantity or amount.
    #[error("{0}")]
    Validation(String),

    /// The actor's role or ownership does not allow the operation.
    #[error("{0}")]
    Permission(String),

    /// The entity is missing, or not in the state the lookup requires.
    #[error("{0}")]
    NotFound(String),

    /// The entity is in a state with no outgoing transition for this operation.
    #[error("{0}")]
    StateConflict(String),

    /// The beneficiary already holds the maximum number of pending requests.
    #[error("{0}")]
    AdmissionLimit(String),

    /// The entity still has dependent records.
    #[error("{0}")]
    Conflict(String),
}

impl ProtocolError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn state_conflict(msg: impl Into<String>) -> Self {
        Self::StateConflict(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
