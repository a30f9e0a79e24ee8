//! groupstore-core: group membership over a hierarchical node store
//!
//! Users and groups are nodes; a group's member list is stored either as a
//! flat multi-valued reference property or as a B-tree of nodes, chosen per
//! group. See [`core_members`] for the membership API.

pub mod config;
pub mod core_members;
pub mod core_sequence;
pub mod core_store;
pub mod logging;
pub mod metrics;
pub mod test_utils;

pub use config::{Config, MembershipConfig};
pub use core_members::{
    Authorizable, AuthorizableManager, Group, MemberFilter, MembershipError, MembershipResult,
};
pub use core_store::{MemoryNodeStore, NodeStore};
pub use logging::{init_logging, LogLevel};
