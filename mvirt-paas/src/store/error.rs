//! Store error types.

use thiserror::Error;

use crate::model::EntityKind;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No entity with this ID in the partition.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    /// A partition lock was poisoned by a panicking writer.
    #[error("internal: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: &str) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
