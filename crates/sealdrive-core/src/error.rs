//! Service-wide error taxonomy.
//!
//! [`ServiceError`] covers every failure kind the core surfaces to callers.
//! Each variant maps to an HTTP status code via [`ServiceError::status_code`]
//! and to the JSON field-map body via [`ServiceError::field_errors`]; clients
//! key off the status code, not the body.
//!
//! Access denials on entities the caller has no right to see are returned as
//! `NotFound`, never `Forbidden`.

use serde_json::{Map, Value, json};

/// Error type shared by every SealDrive service operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed payload, missing required encrypted fields, invalid ids.
    #[error("bad request: {field}: {message}")]
    BadRequest {
        /// The offending request field.
        field: String,
        /// Human-readable description.
        message: String,
    },

    /// No token, or a token that failed verification.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Why the request was rejected.
        reason: String,
    },

    /// Authenticated but lacking the required permission level.
    #[error("forbidden: requires {required} permission")]
    Forbidden {
        /// The permission level the operation requires.
        required: String,
    },

    /// Entity absent, or filtered out by its state.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. `"collection"`, `"file"`).
        entity: String,
        /// The identifier that did not resolve.
        id: String,
    },

    /// Request conflicts with current state.
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable description.
        message: String,
    },

    /// The requested lifecycle transition is not allowed.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },

    /// A collection cannot be moved under itself or one of its descendants.
    #[error("cannot move collection {id} under its own descendant")]
    MoveUnderDescendant {
        /// The collection being moved.
        id: String,
    },

    /// The recipient already holds a membership on this collection.
    #[error("membership already exists for recipient {recipient_id}")]
    DuplicateMembership {
        /// The duplicated recipient.
        recipient_id: String,
    },

    /// The entity is in state `deleted` on an endpoint that refuses deleted
    /// entities.
    #[error("{entity} is deleted: {id}")]
    Gone {
        /// Entity kind.
        entity: String,
        /// The deleted entity's identifier.
        id: String,
    },

    /// The named lock could not be acquired within the retry budget.
    #[error("failed to acquire lock: {key}")]
    LockUnavailable {
        /// The lock key that stayed contended.
        key: String,
    },

    /// Upload completion found no object at the expected key.
    #[error("object missing from store: {key}")]
    ObjectMissing {
        /// The object-store key that was probed.
        key: String,
    },

    /// Upload completion found an object of the wrong size.
    #[error("object size mismatch for {key}: expected {expected}, got {actual}")]
    ObjectSizeMismatch {
        /// The object-store key that was probed.
        key: String,
        /// The size the client declared at create-pending.
        expected: u64,
        /// The size the object store reports.
        actual: u64,
    },

    /// Metadata store, object store, or lock service unreachable.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Human-readable description.
        message: String,
    },

    /// Unclassified internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// The HTTP status code this error surfaces as.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. }
            | Self::InvalidStateTransition { .. }
            | Self::MoveUnderDescendant { .. }
            | Self::DuplicateMembership { .. } => 409,
            Self::Gone { .. } => 410,
            Self::LockUnavailable { .. } => 423,
            Self::ObjectMissing { .. }
            | Self::ObjectSizeMismatch { .. }
            | Self::StoreUnavailable { .. } => 503,
            Self::Internal(_) => 500,
        }
    }

    /// The JSON body: a map of field names to human-readable messages.
    ///
    /// `BadRequest` names the offending field; every other kind reports under
    /// the `message` key.
    #[must_use]
    pub fn field_errors(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            Self::BadRequest { field, message } => {
                map.insert(field.clone(), json!(message));
            }
            other => {
                map.insert("message".to_owned(), json!(other.to_string()));
            }
        }
        map
    }
}

/// Convenience result type for SealDrive operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
