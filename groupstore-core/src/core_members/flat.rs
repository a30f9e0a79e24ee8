//! Flat member list: one multi-valued weak-reference property on the group
//!
//! Add and remove read the whole list, scan it, and write it back, so both
//! are O(n). Good for small groups: no extra nodes, one write per change.
//! A missing property is an empty list; removing the last member deletes
//! the property.

use super::context::MembershipContext;
use super::errors::MembershipResult;
use super::provider::{collect_member, MembershipProvider, Representation};
use super::reference::weak_reference;
use super::types::{Authorizable, MemberFilter, P_MEMBERS};
use crate::core_store::{PropertyValue, RevertScope, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct FlatProvider<'a> {
    ctx: &'a Arc<MembershipContext>,
    group: &'a Authorizable,
}

impl<'a> FlatProvider<'a> {
    pub fn new(ctx: &'a Arc<MembershipContext>, group: &'a Authorizable) -> Self {
        FlatProvider { ctx, group }
    }

    fn values(&self) -> MembershipResult<Vec<Value>> {
        Ok(self
            .ctx
            .store()
            .property(self.group.node(), P_MEMBERS)?
            .map(|p| p.values())
            .unwrap_or_default())
    }

    /// Drop references whose target no longer exists
    ///
    /// Only run on a list that is about to be rewritten anyway.
    fn prune_dangling(&self, values: Vec<Value>) -> MembershipResult<Vec<Value>> {
        let store = self.ctx.store();
        let mut kept = Vec::with_capacity(values.len());
        for value in values {
            let alive = match value.as_weak_reference() {
                Some(target) => store.node_by_identifier(target.as_str())?.is_some(),
                None => false,
            };
            if alive {
                kept.push(value);
            } else {
                debug!("Dropping dangling member entry {:?} of {}", value, self.group);
            }
        }
        Ok(kept)
    }

    /// Write the list back, deleting the property when it ran empty
    fn write(&self, values: Vec<Value>) -> MembershipResult<()> {
        let store = self.ctx.store();
        let scope = RevertScope::begin(store, self.group.node())?;
        if values.is_empty() {
            store.remove_property(self.group.node(), P_MEMBERS)?;
        } else {
            store.set_property(self.group.node(), P_MEMBERS, PropertyValue::Multiple(values))?;
        }
        self.ctx.persist()?;
        scope.commit();
        Ok(())
    }
}

impl MembershipProvider for FlatProvider<'_> {
    fn representation(&self) -> Representation {
        Representation::Flat
    }

    fn add_member(&self, member: &Authorizable) -> MembershipResult<bool> {
        let to_add = weak_reference(member.node());
        let values = self.values()?;
        if values.contains(&to_add) {
            debug!("{} is already member of {}", member, self.group);
            return Ok(false);
        }

        let mut values = self.prune_dangling(values)?;
        values.push(to_add);
        self.write(values)?;
        self.ctx.cache().clear();
        Ok(true)
    }

    fn remove_member(&self, member: &Authorizable) -> MembershipResult<bool> {
        if !self.ctx.store().has_property(self.group.node(), P_MEMBERS)? {
            debug!("{} has no members -> cannot remove member {}", self.group, member.id());
            return Ok(false);
        }

        let to_remove = weak_reference(member.node());
        let mut values = self.values()?;
        let Some(pos) = values.iter().position(|v| *v == to_remove) else {
            debug!("{} was not member of {}", member.id(), self.group);
            return Ok(false);
        };
        values.remove(pos);

        let values = self.prune_dangling(values)?;
        self.write(values)?;
        self.ctx.cache().clear();
        Ok(true)
    }

    fn collect_members(
        &self,
        out: &mut HashSet<Authorizable>,
        include_indirect: bool,
        filter: MemberFilter,
    ) -> MembershipResult<()> {
        for value in self.values()? {
            collect_member(self.ctx, self.group, &value, out, include_indirect, filter)?;
        }
        Ok(())
    }
}
