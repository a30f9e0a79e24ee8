/*
    errors.rs - Error types for the node store

    Covers:
    - Missing nodes and name collisions
    - Invalid names and operations
    - I/O and serialization of persisted state
*/

use thiserror::Error;

/// Errors that can occur in the node store and the structures built on it
#[derive(Debug, Error)]
pub enum StoreError {
    /// Node or item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A node or property with the same name already exists
    #[error("Item exists: {0}")]
    ItemExists(String),

    /// Name is empty or contains structural characters
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// Operation not allowed on the target
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Storage I/O error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Write rejected by the store
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
