//! Test fixtures for membership scenarios
//!
//! ```ignore
//! let fx = MembershipFixture::new(0);
//! let staff = fx.group("staff");
//! let alice = fx.user("alice");
//! staff.add_member(&alice)?;
//! ```

use crate::config::MembershipConfig;
use crate::core_members::{Authorizable, AuthorizableManager, Group};
use crate::core_store::MemoryNodeStore;
use std::sync::Arc;

/// A manager over a fresh in-memory store
pub struct MembershipFixture {
    pub store: Arc<MemoryNodeStore>,
    pub manager: AuthorizableManager,
}

impl MembershipFixture {
    pub fn new(split_threshold: usize) -> Self {
        Self::with_config(MembershipConfig {
            split_threshold,
            ..MembershipConfig::default()
        })
    }

    pub fn with_config(config: MembershipConfig) -> Self {
        let store = Arc::new(MemoryNodeStore::new("default"));
        let manager = AuthorizableManager::new(store.clone(), config)
            .unwrap_or_else(|e| panic!("fixture manager: {e}"));
        Self { store, manager }
    }

    pub fn user(&self, id: &str) -> Authorizable {
        self.manager
            .create_user(id, None)
            .unwrap_or_else(|e| panic!("fixture user {id}: {e}"))
    }

    pub fn group(&self, id: &str) -> Group {
        self.manager
            .create_group(id, None)
            .unwrap_or_else(|e| panic!("fixture group {id}: {e}"))
    }

    /// `count` users named `{prefix}{n}`, zero-padded so IDs sort numerically
    pub fn users(&self, prefix: &str, count: usize) -> Vec<Authorizable> {
        (0..count).map(|i| self.user(&format!("{prefix}{i:05}"))).collect()
    }

    /// Group `id` with `members` added as direct members
    pub fn group_with(&self, id: &str, members: &[&Authorizable]) -> Group {
        let group = self.group(id);
        for member in members {
            let added = group
                .add_member(member)
                .unwrap_or_else(|e| panic!("fixture add {} to {id}: {e}", member.id()));
            assert!(added, "fixture add {} to {id} rejected", member.id());
        }
        group
    }
}
