//! Indexed member list: a BTreeSequence below a child container
//!
//! Entries are keyed by the escaped member ID and hold a weak reference to
//! the member node. Lookups, adds and removes are logarithmic and node
//! fan-out stays bounded however large the group grows. The container is
//! created by the first add and deleted with the last remove.

use super::context::MembershipContext;
use super::errors::MembershipResult;
use super::provider::{collect_member, MembershipProvider, Representation};
use super::reference::{escape_name, weak_reference};
use super::types::{Authorizable, MemberFilter, N_MEMBERS, NT_MEMBERS};
use crate::core_sequence::BTreeSequence;
use crate::core_store::{NodeId, RevertScope};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct IndexedProvider<'a> {
    ctx: &'a Arc<MembershipContext>,
    group: &'a Authorizable,
}

impl<'a> IndexedProvider<'a> {
    pub fn new(ctx: &'a Arc<MembershipContext>, group: &'a Authorizable) -> Self {
        IndexedProvider { ctx, group }
    }

    fn sequence(&self, container: NodeId) -> MembershipResult<BTreeSequence<'a>> {
        let (min_children, max_children) = self.ctx.config().fan_out();
        Ok(BTreeSequence::new(self.ctx.store(), container, min_children, max_children)?
            .ignoring_bookkeeping())
    }

    fn container(&self) -> MembershipResult<Option<NodeId>> {
        Ok(self.ctx.store().child(self.group.node(), N_MEMBERS)?)
    }
}

impl MembershipProvider for IndexedProvider<'_> {
    fn representation(&self) -> Representation {
        Representation::Indexed
    }

    fn add_member(&self, member: &Authorizable) -> MembershipResult<bool> {
        let key = escape_name(member.id().as_str());
        let existing = self.container()?;
        if let Some(container) = &existing {
            if self.sequence(container.clone())?.has_item(&key)? {
                debug!("{} is already member of {}", member, self.group);
                return Ok(false);
            }
        }

        let store = self.ctx.store();
        let scope = RevertScope::begin(store, self.group.node())?;
        let container = match existing {
            Some(container) => container,
            None => store.add_child(self.group.node(), N_MEMBERS, NT_MEMBERS)?,
        };
        self.sequence(container)?
            .insert(&key, weak_reference(member.node()))?;
        self.ctx.persist()?;
        scope.commit();

        self.ctx.cache().clear();
        Ok(true)
    }

    fn remove_member(&self, member: &Authorizable) -> MembershipResult<bool> {
        let Some(container) = self.container()? else {
            debug!("{} has no members -> cannot remove member {}", self.group, member.id());
            return Ok(false);
        };

        let key = escape_name(member.id().as_str());
        let sequence = self.sequence(container.clone())?;
        if !sequence.has_item(&key)? {
            debug!("{} was not member of {}", member.id(), self.group);
            return Ok(false);
        }

        let store = self.ctx.store();
        let scope = RevertScope::begin(store, self.group.node())?;
        sequence.remove(&key)?;
        if sequence.is_empty()? {
            store.remove_node(&container)?;
        }
        self.ctx.persist()?;
        scope.commit();

        self.ctx.cache().clear();
        Ok(true)
    }

    fn collect_members(
        &self,
        out: &mut HashSet<Authorizable>,
        include_indirect: bool,
        filter: MemberFilter,
    ) -> MembershipResult<()> {
        let Some(container) = self.container()? else {
            return Ok(());
        };
        for (_, value) in self.sequence(container)?.iter()? {
            collect_member(self.ctx, self.group, &value, out, include_indirect, filter)?;
        }
        Ok(())
    }
}
