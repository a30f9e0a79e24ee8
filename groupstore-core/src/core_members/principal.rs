//! Principal view of groups for the authorization layer
//!
//! A [`GroupPrincipal`] answers "is this principal name in the group?" from
//! a member set computed once and kept for the adapter's lifetime. Mutation
//! is not possible through this view: `add_member` and `remove_member`
//! always return false.

use super::context::MembershipContext;
use super::errors::MembershipResult;
use super::group::Group;
use super::types::Authorizable;
use serde::ser::{Error as _, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A named principal
///
/// Compared and hashed by name only.
#[derive(Clone)]
pub enum Principal {
    Individual(String),
    Group(Arc<GroupPrincipal>),
}

impl Principal {
    pub fn name(&self) -> &str {
        match self {
            Principal::Individual(name) => name,
            Principal::Group(group) => group.name(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Principal::Group(_))
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Individual(name) => write!(f, "Individual({name})"),
            Principal::Group(group) => write!(f, "Group({})", group.name()),
        }
    }
}

pub struct GroupPrincipal {
    authorizable: Authorizable,
    ctx: Arc<MembershipContext>,
    members: OnceLock<HashSet<Principal>>,
}

impl GroupPrincipal {
    pub(crate) fn new(authorizable: Authorizable, ctx: Arc<MembershipContext>) -> Self {
        GroupPrincipal {
            authorizable,
            ctx,
            members: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.authorizable.principal_name()
    }

    /// Direct and inherited members as principals, computed on first call
    ///
    /// Later changes to the group are not reflected; ask the group for a
    /// fresh principal.
    pub fn members(&self) -> MembershipResult<&HashSet<Principal>> {
        if let Some(members) = self.members.get() {
            return Ok(members);
        }

        let group = Group::new(self.authorizable.clone(), Arc::clone(&self.ctx));
        let computed = group
            .members()?
            .into_iter()
            .map(|member| {
                if member.is_group() {
                    Principal::Group(Arc::new(GroupPrincipal::new(member, Arc::clone(&self.ctx))))
                } else {
                    Principal::Individual(member.principal_name().to_string())
                }
            })
            .collect();
        Ok(self.members.get_or_init(|| computed))
    }

    /// True if a principal named `name` is a member, directly or through a
    /// member group
    pub fn is_member(&self, name: &str) -> MembershipResult<bool> {
        let mut visited = HashSet::new();
        self.is_member_visiting(name, &mut visited)
    }

    fn is_member_visiting(&self, name: &str, visited: &mut HashSet<String>) -> MembershipResult<bool> {
        if !visited.insert(self.name().to_string()) {
            return Ok(false);
        }

        let members = self.members()?;
        if members.contains(&Principal::Individual(name.to_string())) {
            return Ok(true);
        }
        for member in members {
            if let Principal::Group(group) = member {
                if group.is_member_visiting(name, visited)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    pub fn add_member(&self, principal: &Principal) -> bool {
        debug!("Membership of {} cannot be changed through its principal: add {}", self.name(), principal.name());
        false
    }

    pub fn remove_member(&self, principal: &Principal) -> bool {
        debug!("Membership of {} cannot be changed through its principal: remove {}", self.name(), principal.name());
        false
    }
}

impl fmt::Debug for GroupPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupPrincipal")
            .field("name", &self.name())
            .field("resolved", &self.members.get().is_some())
            .finish()
    }
}

impl Serialize for GroupPrincipal {
    /// Forces member computation and writes `{ name, members }` with the
    /// member names sorted
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let members = self.members().map_err(S::Error::custom)?;
        let mut names: Vec<&str> = members.iter().map(Principal::name).collect();
        names.sort_unstable();

        let mut state = serializer.serialize_struct("GroupPrincipal", 2)?;
        state.serialize_field("name", self.name())?;
        state.serialize_field("members", &names)?;
        state.end()
    }
}
