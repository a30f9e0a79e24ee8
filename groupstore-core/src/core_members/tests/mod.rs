/*
    Scenario tests for core_members

    Test suite covering:
    - Mutation guards and idempotence
    - Transitive resolution, diamonds and externally created cycles
    - Representation selection and representation independence
    - Dangling references and cache invalidation
    - Revert on store failure
    - Principal view
*/

pub mod representation_tests;

use crate::config::MembershipConfig;
use crate::core_members::AuthorizableManager;
use crate::core_store::{MemoryNodeStore, NodeStore};
use std::sync::Arc;

/// Manager over a fresh in-memory store
pub fn manager(split_threshold: usize) -> AuthorizableManager {
    manager_over(Arc::new(MemoryNodeStore::new("default")), split_threshold)
}

pub fn manager_over(store: Arc<dyn NodeStore>, split_threshold: usize) -> AuthorizableManager {
    let config = MembershipConfig {
        split_threshold,
        ..MembershipConfig::default()
    };
    AuthorizableManager::new(store, config).unwrap()
}
