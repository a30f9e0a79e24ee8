//! Group - membership coordinator of one group
//!
//! Guards every mutation (same store, no self-membership, no cycles),
//! selects the provider for the group's current representation and
//! delegates. Resolved member sets go through the membership cache.

use super::context::MembershipContext;
use super::errors::{MembershipError, MembershipResult};
use super::principal::GroupPrincipal;
use super::provider::provider_for;
use super::cache::CacheKey;
use super::types::{Authorizable, AuthorizableId, MemberFilter};
use crate::metrics::{record_counter, Timer};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

pub struct Group {
    authorizable: Authorizable,
    ctx: Arc<MembershipContext>,
    principal: OnceLock<Arc<GroupPrincipal>>,
}

impl Group {
    /// Bind a coordinator to a group authorizable
    ///
    /// `authorizable` must be a group; the manager is the only caller that
    /// does not already know that.
    pub(crate) fn new(authorizable: Authorizable, ctx: Arc<MembershipContext>) -> Self {
        debug_assert!(authorizable.is_group());
        Group {
            authorizable,
            ctx,
            principal: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &AuthorizableId {
        self.authorizable.id()
    }

    pub fn authorizable(&self) -> &Authorizable {
        &self.authorizable
    }

    pub fn is_group(&self) -> bool {
        true
    }

    /// Principal view of this group, created on first use
    pub fn principal(&self) -> Arc<GroupPrincipal> {
        Arc::clone(self.principal.get_or_init(|| {
            Arc::new(GroupPrincipal::new(
                self.authorizable.clone(),
                Arc::clone(&self.ctx),
            ))
        }))
    }

    /// Direct members of any kind
    pub fn declared_members(&self) -> MembershipResult<HashSet<Authorizable>> {
        self.members_filtered(false, MemberFilter::All)
    }

    /// Direct and transitive members of any kind
    pub fn members(&self) -> MembershipResult<HashSet<Authorizable>> {
        self.members_filtered(true, MemberFilter::All)
    }

    pub fn members_filtered(
        &self,
        include_indirect: bool,
        filter: MemberFilter,
    ) -> MembershipResult<HashSet<Authorizable>> {
        let key = CacheKey::Members {
            group: self.authorizable.node().clone(),
            indirect: include_indirect,
            filter,
        };
        if let Some(hit) = self.ctx.cache().get(&key) {
            return Ok(hit);
        }

        let generation = self.ctx.cache().generation();
        let timer = Timer::new("membership.resolve.duration_ms");
        let members = provider_for(&self.ctx, &self.authorizable)?.get_members(include_indirect, filter)?;
        timer.stop();

        self.ctx.cache().insert(key, members.clone(), generation);
        Ok(members)
    }

    /// Resolve this group's members into an accumulating set
    ///
    /// Used by the transitive walk; bypasses the cache so the shared set
    /// stays the single visited set.
    pub(crate) fn collect_into(
        &self,
        out: &mut HashSet<Authorizable>,
        include_indirect: bool,
        filter: MemberFilter,
    ) -> MembershipResult<()> {
        provider_for(&self.ctx, &self.authorizable)?.collect_members(out, include_indirect, filter)
    }

    /// True if one of the groups indexed as enclosing `candidate` is this
    /// group
    ///
    /// Reads the enclosing-group index, not the member lists. The two can
    /// disagree when the index is stale.
    pub fn is_member(&self, candidate: &Authorizable) -> MembershipResult<bool> {
        if !self.ctx.owns(candidate) || candidate.is_same(&self.authorizable) {
            return Ok(false);
        }
        Ok(self
            .ctx
            .member_of(candidate, true)?
            .iter()
            .any(|group| group.id() == self.id()))
    }

    /// Add a direct member
    ///
    /// Returns `Ok(false)` and changes nothing if `candidate` comes from
    /// another store, is this group itself, would close a cycle, or is
    /// already a member.
    pub fn add_member(&self, candidate: &Authorizable) -> MembershipResult<bool> {
        if !self.ctx.owns(candidate) {
            warn!("Attempt to add an authorizable of another store to {}: {}", self, candidate);
            record_counter("membership.add.rejected", 1);
            return Ok(false);
        }
        if candidate.is_same(&self.authorizable) {
            warn!("Attempt to add a group as member of itself ({})", self.id());
            record_counter("membership.add.rejected", 1);
            return Ok(false);
        }
        if !self.ctx.store().node_exists(candidate.node())? {
            return Err(MembershipError::AuthorizableNotFound(candidate.id().to_string()));
        }
        if self.is_cyclic_membership(candidate)? {
            warn!("Attempt to create circular group membership: {} -> {}", self, candidate);
            record_counter("membership.add.rejected", 1);
            return Ok(false);
        }

        let provider = provider_for(&self.ctx, &self.authorizable)?;
        let added = self.mutate(|| provider.add_member(candidate))?;
        record_counter(
            if added { "membership.add.accepted" } else { "membership.add.rejected" },
            1,
        );
        Ok(added)
    }

    /// Remove a direct member
    ///
    /// `candidate` may already be deleted from the store: its reference is
    /// still removed.
    pub fn remove_member(&self, candidate: &Authorizable) -> MembershipResult<bool> {
        if !self.ctx.owns(candidate) {
            warn!("Attempt to remove an authorizable of another store from {}: {}", self, candidate);
            record_counter("membership.remove.rejected", 1);
            return Ok(false);
        }

        let provider = provider_for(&self.ctx, &self.authorizable)?;
        let removed = self.mutate(|| provider.remove_member(candidate))?;
        record_counter(
            if removed { "membership.remove.accepted" } else { "membership.remove.rejected" },
            1,
        );
        Ok(removed)
    }

    // The provider reverted the store; drop anything computed meanwhile.
    fn mutate(&self, op: impl FnOnce() -> MembershipResult<bool>) -> MembershipResult<bool> {
        op().inspect_err(|e| {
            debug!("Membership change on {} failed: {}", self, e);
            self.ctx.cache().clear();
        })
    }

    /// True if `candidate` is a group that already contains this group
    /// somewhere below it
    fn is_cyclic_membership(&self, candidate: &Authorizable) -> MembershipResult<bool> {
        if !candidate.is_group() {
            return Ok(false);
        }
        let nested = Group::new(candidate.clone(), Arc::clone(&self.ctx))
            .members_filtered(true, MemberFilter::Groups)?;
        Ok(nested.contains(&self.authorizable))
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("id", self.authorizable.id())
            .field("node", self.authorizable.node())
            .finish()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.authorizable.fmt(f)
    }
}
