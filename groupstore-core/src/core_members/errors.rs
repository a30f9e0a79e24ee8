//! Error types for the membership core
//!
//! Rejected mutations (wrong workspace, self-membership, cycles) are not
//! errors: they come back as `Ok(false)`. Only store failures and lookups
//! of authorizables that do not exist surface here.

use crate::core_store::StoreError;
use thiserror::Error;

/// Result type for membership operations
pub type MembershipResult<T> = Result<T, MembershipError>;

/// Errors that can occur in membership operations
#[derive(Error, Debug)]
pub enum MembershipError {
    /// Underlying store failed; pending changes were reverted
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No authorizable with this ID
    #[error("Authorizable not found: {0}")]
    AuthorizableNotFound(String),

    /// An authorizable with this ID already exists
    #[error("Authorizable already exists: {0}")]
    AuthorizableExists(String),

    /// Node does not represent a user or a group
    #[error("Node {node} has type {node_type}, not an authorizable")]
    InvalidNodeType { node: String, node_type: String },

    /// Authorizable IDs must be non-empty
    #[error("Invalid authorizable ID: {0:?}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_conversion() {
        let err: MembershipError = StoreError::NotFound("node x".to_string()).into();
        assert!(matches!(err, MembershipError::Store(_)));
        assert_eq!(err.to_string(), "Store error: Not found: node x");
    }

    #[test]
    fn test_invalid_node_type_display() {
        let err = MembershipError::InvalidNodeType {
            node: "n1".to_string(),
            node_type: "nt:unstructured".to_string(),
        };
        assert!(err.to_string().contains("nt:unstructured"));
    }
}
