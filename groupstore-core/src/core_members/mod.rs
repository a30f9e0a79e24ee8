/*
    core_members - Group membership on top of the node store

    Handles:
    - Users and groups as nodes (AuthorizableManager)
    - Member lists in two representations: a flat property or an indexed
      BTreeSequence, chosen per group from what is already on disk
    - Transitive resolution tolerant of dangling references and of cycles
      created outside the coordinator
    - Mutation guards (self-membership, cycles) with revert on failure
    - Membership cache shared by the groups of one manager
    - Principal view for the authorization layer
*/

pub mod cache;
pub mod context;
pub mod errors;
pub mod flat;
pub mod group;
pub mod indexed;
pub mod manager;
pub mod principal;
pub mod provider;
pub mod reference;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use cache::{CacheKey, MembershipCache};
pub use context::MembershipContext;
pub use errors::{MembershipError, MembershipResult};
pub use group::Group;
pub use manager::AuthorizableManager;
pub use principal::{GroupPrincipal, Principal};
pub use provider::{select_representation, MembershipProvider, NodeShape, Representation};
pub use reference::{escape_name, unescape_name};
pub use types::{Authorizable, AuthorizableId, AuthorizableKind, MemberFilter};
