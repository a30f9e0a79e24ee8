//! Core types for group membership
//!
//! An [`Authorizable`] is a read-only view of one user or group node. It is
//! compared by workspace and node identity, never by ID string, so two
//! materializations of the same node are equal.

use crate::core_store::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Type tag of user nodes
pub const NT_USER: &str = "gs:User";

/// Type tag of group nodes
pub const NT_GROUP: &str = "gs:Group";

/// Type tag of the container holding an indexed member list
pub const NT_MEMBERS: &str = "gs:Members";

/// Type tag of the folder holding all authorizables
pub const NT_AUTHORIZABLE_FOLDER: &str = "gs:AuthorizableFolder";

/// Multi-valued weak-reference property of the flat representation
pub const P_MEMBERS: &str = "gs:members";

/// Child container of the indexed representation
pub const N_MEMBERS: &str = "gs:members";

/// Authorizable ID property
pub const P_AUTHORIZABLE_ID: &str = "gs:authorizableId";

/// Principal name property
pub const P_PRINCIPAL_NAME: &str = "gs:principalName";

/// Name of the folder below the root holding all authorizables
pub const AUTHORIZABLES_FOLDER: &str = "authorizables";

/// Stable, user-facing identifier of a user or group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuthorizableId(pub String);

impl AuthorizableId {
    pub fn new(id: impl Into<String>) -> Self {
        AuthorizableId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorizableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of an authorizable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizableKind {
    User,
    Group,
}

impl AuthorizableKind {
    pub fn node_type(&self) -> &'static str {
        match self {
            AuthorizableKind::User => NT_USER,
            AuthorizableKind::Group => NT_GROUP,
        }
    }

    /// Kind represented by a node type tag, if any
    pub fn from_node_type(node_type: &str) -> Option<Self> {
        match node_type {
            NT_USER => Some(AuthorizableKind::User),
            NT_GROUP => Some(AuthorizableKind::Group),
            _ => None,
        }
    }
}

/// Which members a resolution returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemberFilter {
    #[default]
    All,
    Groups,
    Users,
}

impl MemberFilter {
    pub fn accepts(&self, kind: AuthorizableKind) -> bool {
        match (self, kind) {
            (MemberFilter::All, _) => true,
            (MemberFilter::Groups, AuthorizableKind::Group) => true,
            (MemberFilter::Users, AuthorizableKind::User) => true,
            _ => false,
        }
    }
}

/// A user or group as materialized from its node
#[derive(Debug, Clone, Serialize)]
pub struct Authorizable {
    id: AuthorizableId,
    node: NodeId,
    kind: AuthorizableKind,
    principal_name: String,
    workspace: String,
}

impl Authorizable {
    pub(crate) fn new(
        id: AuthorizableId,
        node: NodeId,
        kind: AuthorizableKind,
        principal_name: String,
        workspace: String,
    ) -> Self {
        Authorizable {
            id,
            node,
            kind,
            principal_name,
            workspace,
        }
    }

    pub fn id(&self) -> &AuthorizableId {
        &self.id
    }

    /// Node backing this authorizable
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn kind(&self) -> AuthorizableKind {
        self.kind
    }

    pub fn is_group(&self) -> bool {
        self.kind == AuthorizableKind::Group
    }

    pub fn principal_name(&self) -> &str {
        &self.principal_name
    }

    /// Workspace of the store this authorizable was read from
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// True if both refer to the same node of the same workspace
    pub fn is_same(&self, other: &Authorizable) -> bool {
        self.workspace == other.workspace && self.node == other.node
    }
}

impl PartialEq for Authorizable {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for Authorizable {}

impl Hash for Authorizable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.workspace.hash(state);
        self.node.hash(state);
    }
}

impl fmt::Display for Authorizable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            AuthorizableKind::User => "user",
            AuthorizableKind::Group => "group",
        };
        write!(f, "{} '{}'", kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn authorizable(id: &str, node: &str, kind: AuthorizableKind) -> Authorizable {
        Authorizable::new(
            AuthorizableId::new(id),
            NodeId::new(node),
            kind,
            id.to_string(),
            "default".to_string(),
        )
    }

    #[test]
    fn test_equality_by_node() {
        let a = authorizable("alice", "n1", AuthorizableKind::User);
        let renamed = authorizable("alice-renamed", "n1", AuthorizableKind::User);
        let other = authorizable("alice", "n2", AuthorizableKind::User);

        assert_eq!(a, renamed);
        assert_ne!(a, other);

        let set: HashSet<_> = [a, renamed, other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_member_filter() {
        assert!(MemberFilter::All.accepts(AuthorizableKind::User));
        assert!(MemberFilter::All.accepts(AuthorizableKind::Group));
        assert!(MemberFilter::Groups.accepts(AuthorizableKind::Group));
        assert!(!MemberFilter::Groups.accepts(AuthorizableKind::User));
        assert!(MemberFilter::Users.accepts(AuthorizableKind::User));
        assert!(!MemberFilter::Users.accepts(AuthorizableKind::Group));
    }

    #[test]
    fn test_kind_node_types() {
        assert_eq!(AuthorizableKind::from_node_type(NT_GROUP), Some(AuthorizableKind::Group));
        assert_eq!(AuthorizableKind::from_node_type(NT_USER), Some(AuthorizableKind::User));
        assert_eq!(AuthorizableKind::from_node_type(NT_MEMBERS), None);
        assert_eq!(AuthorizableKind::Group.node_type(), NT_GROUP);
    }

    #[test]
    fn test_display() {
        let g = authorizable("admins", "n3", AuthorizableKind::Group);
        assert_eq!(g.to_string(), "group 'admins'");
    }
}
