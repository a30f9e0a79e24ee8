//! Shared state of one membership manager
//!
//! Every [`Group`](super::group::Group) handed out by a manager carries an
//! `Arc` of this context: the store, the membership configuration and the
//! membership cache.

use super::cache::{CacheKey, MembershipCache};
use super::errors::MembershipResult;
use super::provider::{select_representation, NodeShape, Representation};
use super::reference::unescape_name;
use super::types::{
    Authorizable, AuthorizableId, AuthorizableKind, N_MEMBERS, NT_MEMBERS, P_AUTHORIZABLE_ID,
    P_MEMBERS, P_PRINCIPAL_NAME,
};
use crate::config::MembershipConfig;
use crate::core_store::{NodeId, NodeStore, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

pub struct MembershipContext {
    store: Arc<dyn NodeStore>,
    config: MembershipConfig,
    cache: Arc<MembershipCache>,
}

impl MembershipContext {
    pub fn new(
        store: Arc<dyn NodeStore>,
        config: MembershipConfig,
        cache: Arc<MembershipCache>,
    ) -> Self {
        MembershipContext {
            store,
            config,
            cache,
        }
    }

    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &MembershipConfig {
        &self.config
    }

    pub fn cache(&self) -> &MembershipCache {
        &self.cache
    }

    /// True if `authorizable` was materialized from this context's store
    pub fn owns(&self, authorizable: &Authorizable) -> bool {
        authorizable.workspace() == self.store.workspace()
    }

    /// Publish pending changes when auto-save is configured
    pub fn persist(&self) -> MembershipResult<()> {
        if self.config.auto_save {
            self.store.save()?;
        }
        Ok(())
    }

    /// Materialize the authorizable stored at `node`
    ///
    /// Returns `Ok(None)` if the node is neither a user nor a group.
    pub fn authorizable_for_node(&self, node: &NodeId) -> MembershipResult<Option<Authorizable>> {
        let node_type = self.store.node_type(node)?;
        let Some(kind) = AuthorizableKind::from_node_type(&node_type) else {
            return Ok(None);
        };

        let id = match self.store.property(node, P_AUTHORIZABLE_ID)?.and_then(|p| p.single().cloned()) {
            Some(Value::String(id)) => id,
            _ => unescape_name(&self.store.node_name(node)?),
        };
        let principal_name = match self.store.property(node, P_PRINCIPAL_NAME)?.and_then(|p| p.single().cloned()) {
            Some(Value::String(name)) => name,
            _ => id.clone(),
        };

        Ok(Some(Authorizable::new(
            AuthorizableId::new(id),
            node.clone(),
            kind,
            principal_name,
            self.store.workspace().to_string(),
        )))
    }

    /// Groups declaring `authorizable` as a member, optionally with the
    /// groups enclosing those
    ///
    /// Built from the store's reverse weak-reference lookup rather than by
    /// walking member lists, and cached under [`CacheKey::MemberOf`]. A
    /// reference only counts if it sits in the representation the selector
    /// currently treats as authoritative for the holding group.
    pub fn member_of(
        &self,
        authorizable: &Authorizable,
        inherited: bool,
    ) -> MembershipResult<HashSet<Authorizable>> {
        let key = CacheKey::MemberOf {
            authorizable: authorizable.node().clone(),
            inherited,
        };
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let generation = self.cache.generation();
        let mut groups = HashSet::new();
        let mut queue = VecDeque::from([authorizable.node().clone()]);
        while let Some(node) = queue.pop_front() {
            for group in self.declared_member_of(&node)? {
                if groups.insert(group.clone()) && inherited {
                    queue.push_back(group.node().clone());
                }
            }
        }

        self.cache.insert(key, groups.clone(), generation);
        Ok(groups)
    }

    fn declared_member_of(&self, node: &NodeId) -> MembershipResult<Vec<Authorizable>> {
        let mut groups = Vec::new();
        for (holder, property) in self.store.weak_references(node)? {
            match self.group_holding(&holder, &property)? {
                Some(group) => groups.push(group),
                None => debug!(
                    "Reference to {} in {}/{} is not a member entry -> ignored",
                    node, holder, property
                ),
            }
        }
        Ok(groups)
    }

    /// Group whose member list contains the reference at `holder`/`property`
    fn group_holding(&self, holder: &NodeId, property: &str) -> MembershipResult<Option<Authorizable>> {
        // flat: the property sits on the group itself
        if let Some(group) = self.authorizable_for_node(holder)? {
            if group.is_group() && property == P_MEMBERS && self.selected(&group)? == Representation::Flat {
                return Ok(Some(group));
            }
            return Ok(None);
        }

        // indexed: walk up to the member container, whose parent is the group
        let mut current = holder.clone();
        loop {
            let Some(parent) = self.store.parent(&current)? else {
                return Ok(None);
            };
            if self.store.node_type(&current)? == NT_MEMBERS && self.store.node_name(&current)? == N_MEMBERS {
                return match self.authorizable_for_node(&parent)? {
                    Some(group) if group.is_group() && self.selected(&group)? == Representation::Indexed => {
                        Ok(Some(group))
                    }
                    _ => Ok(None),
                };
            }
            current = parent;
        }
    }

    fn selected(&self, group: &Authorizable) -> MembershipResult<Representation> {
        let shape = NodeShape::inspect(self.store(), group.node())?;
        Ok(select_representation(shape, self.config.split_threshold))
    }
}
