//! MembershipProvider Trait - the two storage representations of a member list
//!
//! ```text
//! Group
//!   |
//!   v
//! provider_for()  --  select_representation(shape, split_threshold)
//!   |
//!   +---> FlatProvider     (one multi-valued property on the group)
//!   |
//!   +---> IndexedProvider  (BTreeSequence below a child container)
//! ```
//!
//! Selection looks at what is on disk first and at the configuration
//! second, so an existing group keeps its representation whatever the
//! current split threshold is. Nothing is ever migrated.

use super::context::MembershipContext;
use super::errors::MembershipResult;
use super::flat::FlatProvider;
use super::group::Group;
use super::indexed::IndexedProvider;
use super::types::{Authorizable, AuthorizableKind, MemberFilter, N_MEMBERS, P_MEMBERS};
use crate::core_store::{NodeId, NodeStore, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage representation of a member list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    Flat,
    Indexed,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Flat => write!(f, "property"),
            Representation::Indexed => write!(f, "node"),
        }
    }
}

/// What a group node currently holds on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeShape {
    /// The flat member property exists
    pub has_property: bool,
    /// The indexed member container exists
    pub has_container: bool,
}

impl NodeShape {
    pub fn inspect(store: &dyn NodeStore, group: &NodeId) -> MembershipResult<Self> {
        Ok(NodeShape {
            has_property: store.has_property(group, P_MEMBERS)?,
            has_container: store.has_child(group, N_MEMBERS)?,
        })
    }

    /// Both representations present at once
    pub fn is_conflicting(&self) -> bool {
        self.has_property && self.has_container
    }
}

/// Pick the representation for a group of the given shape
///
/// With a positive split threshold the indexed form wins unless only a
/// flat property exists; with threshold 0 the flat form wins unless only
/// a container exists.
pub fn select_representation(shape: NodeShape, split_threshold: usize) -> Representation {
    if split_threshold > 0 {
        if shape.has_container || !shape.has_property {
            Representation::Indexed
        } else {
            Representation::Flat
        }
    } else if shape.has_property || !shape.has_container {
        Representation::Flat
    } else {
        Representation::Indexed
    }
}

/// One storage representation of a group's member list
pub trait MembershipProvider {
    /// Which representation this provider reads and writes
    fn representation(&self) -> Representation;

    /// Add a direct member
    ///
    /// Returns `Ok(false)` without touching the store if `member` is
    /// already listed. On error every pending change below the group has
    /// been reverted.
    fn add_member(&self, member: &Authorizable) -> MembershipResult<bool>;

    /// Remove a direct member
    ///
    /// Returns `Ok(false)` if `member` is not listed or the group has no
    /// member list at all. Same revert guarantee as `add_member`.
    fn remove_member(&self, member: &Authorizable) -> MembershipResult<bool>;

    /// Resolve every listed reference into `out`
    ///
    /// `out` doubles as the visited set of the transitive walk; see
    /// [`collect_member`].
    fn collect_members(
        &self,
        out: &mut HashSet<Authorizable>,
        include_indirect: bool,
        filter: MemberFilter,
    ) -> MembershipResult<()>;

    /// Members of the group, optionally with the members of member groups
    fn get_members(
        &self,
        include_indirect: bool,
        filter: MemberFilter,
    ) -> MembershipResult<HashSet<Authorizable>> {
        let mut out = HashSet::new();
        self.collect_members(&mut out, include_indirect, filter)?;
        Ok(out)
    }
}

/// Provider for the representation `group` currently uses
pub fn provider_for<'a>(
    ctx: &'a Arc<MembershipContext>,
    group: &'a Authorizable,
) -> MembershipResult<Box<dyn MembershipProvider + 'a>> {
    let split_threshold = ctx.config().split_threshold;
    let shape = NodeShape::inspect(ctx.store(), group.node())?;
    let representation = select_representation(shape, split_threshold);

    if shape.is_conflicting() {
        let ignored = match representation {
            Representation::Flat => Representation::Indexed,
            Representation::Indexed => Representation::Flat,
        };
        warn!(
            "Found members node and members property on {}. Ignoring {} members",
            group, ignored
        );
    }

    Ok(match representation {
        Representation::Flat => Box::new(FlatProvider::new(ctx, group)),
        Representation::Indexed => Box::new(IndexedProvider::new(ctx, group)),
    })
}

/// Resolve one member reference of `owner` into `out`
///
/// Dangling references and references to non-authorizable nodes are
/// skipped. A member group is expanded only when it was newly inserted
/// into `out`: the same check that deduplicates the result also stops the
/// walk on cycles that got into the store behind the coordinator's back.
///
/// With [`MemberFilter::Users`] groups are neither returned nor expanded.
pub fn collect_member(
    ctx: &Arc<MembershipContext>,
    owner: &Authorizable,
    reference: &Value,
    out: &mut HashSet<Authorizable>,
    include_indirect: bool,
    filter: MemberFilter,
) -> MembershipResult<()> {
    let Some(target) = reference.as_weak_reference() else {
        debug!("Non-reference value in member list of {} -> ignored", owner);
        return Ok(());
    };
    let Some(node) = ctx.store().node_by_identifier(target.as_str())? else {
        debug!(
            "Authorizable node {} referenced by {} doesn't exist any more -> ignored from member list",
            target, owner
        );
        return Ok(());
    };

    match ctx.authorizable_for_node(&node)? {
        Some(member) if member.kind() == AuthorizableKind::Group => {
            if filter != MemberFilter::Users && out.insert(member.clone()) && include_indirect {
                Group::new(member, Arc::clone(ctx)).collect_into(out, true, filter)?;
            }
        }
        Some(member) => {
            if filter.accepts(member.kind()) {
                out.insert(member);
            }
        }
        None => {
            debug!(
                "Member entry of {} points to node {} of type {} -> not included in member set",
                owner,
                node,
                ctx.store().node_type(&node)?
            );
        }
    }
    Ok(())
}
