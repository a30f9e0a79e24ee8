//! Authorizable manager
//!
//! Entry point of the membership core. Owns one [`MembershipContext`] and
//! hands out users and [`Group`] coordinators that share it. Authorizables
//! live below a single folder under the store root, one node each, named
//! after the escaped authorizable ID.

use super::cache::MembershipCache;
use super::context::MembershipContext;
use super::errors::{MembershipError, MembershipResult};
use super::group::Group;
use super::reference::escape_name;
use super::types::{
    Authorizable, AuthorizableKind, AUTHORIZABLES_FOLDER, NT_AUTHORIZABLE_FOLDER,
    P_AUTHORIZABLE_ID, P_PRINCIPAL_NAME,
};
use crate::config::MembershipConfig;
use crate::core_store::{NodeId, NodeStore, PropertyValue, RevertScope, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct AuthorizableManager {
    ctx: Arc<MembershipContext>,
    folder: NodeId,
}

impl AuthorizableManager {
    /// Manager with a cache of its own
    pub fn new(store: Arc<dyn NodeStore>, config: MembershipConfig) -> MembershipResult<Self> {
        Self::with_cache(store, config, Arc::new(MembershipCache::new()))
    }

    /// Manager sharing `cache` with other managers of the same store
    pub fn with_cache(
        store: Arc<dyn NodeStore>,
        config: MembershipConfig,
        cache: Arc<MembershipCache>,
    ) -> MembershipResult<Self> {
        let root = store.root();
        let folder = match store.child(&root, AUTHORIZABLES_FOLDER)? {
            Some(folder) => folder,
            None => {
                let folder = store.add_child(&root, AUTHORIZABLES_FOLDER, NT_AUTHORIZABLE_FOLDER)?;
                store.save()?;
                info!("Created authorizables folder in workspace {}", store.workspace());
                folder
            }
        };

        Ok(AuthorizableManager {
            ctx: Arc::new(MembershipContext::new(store, config, cache)),
            folder,
        })
    }

    pub fn context(&self) -> &Arc<MembershipContext> {
        &self.ctx
    }

    pub fn cache(&self) -> &MembershipCache {
        self.ctx.cache()
    }

    pub fn create_user(&self, id: &str, principal_name: Option<&str>) -> MembershipResult<Authorizable> {
        self.create(id, principal_name, AuthorizableKind::User)
    }

    pub fn create_group(&self, id: &str, principal_name: Option<&str>) -> MembershipResult<Group> {
        let authorizable = self.create(id, principal_name, AuthorizableKind::Group)?;
        Ok(Group::new(authorizable, Arc::clone(&self.ctx)))
    }

    fn create(
        &self,
        id: &str,
        principal_name: Option<&str>,
        kind: AuthorizableKind,
    ) -> MembershipResult<Authorizable> {
        if id.is_empty() {
            return Err(MembershipError::InvalidId(id.to_string()));
        }
        let store = self.ctx.store();
        let name = escape_name(id);
        if store.has_child(&self.folder, &name)? {
            return Err(MembershipError::AuthorizableExists(id.to_string()));
        }

        let node = store.add_child(&self.folder, &name, kind.node_type())?;
        if let Err(e) = self.init_node(&node, id, principal_name.unwrap_or(id)) {
            debug!("Creating {} failed, removing its node: {}", id, e);
            store.remove_node(&node)?;
            return Err(e);
        }

        debug!("Created {:?} {}", kind, id);
        self.authorizable_for_node(&node)?
            .ok_or_else(|| MembershipError::AuthorizableNotFound(id.to_string()))
    }

    fn init_node(&self, node: &NodeId, id: &str, principal_name: &str) -> MembershipResult<()> {
        let store = self.ctx.store();
        store.set_property(node, P_AUTHORIZABLE_ID, PropertyValue::Single(Value::String(id.to_string())))?;
        store.set_property(
            node,
            P_PRINCIPAL_NAME,
            PropertyValue::Single(Value::String(principal_name.to_string())),
        )?;
        self.ctx.persist()
    }

    /// Look up a user or group by ID
    pub fn get_authorizable(&self, id: &str) -> MembershipResult<Option<Authorizable>> {
        match self.ctx.store().child(&self.folder, &escape_name(id))? {
            Some(node) => self.authorizable_for_node(&node),
            None => Ok(None),
        }
    }

    /// Look up a group by ID; `Ok(None)` also when `id` names a user
    pub fn get_group(&self, id: &str) -> MembershipResult<Option<Group>> {
        Ok(self
            .get_authorizable(id)?
            .filter(Authorizable::is_group)
            .map(|a| Group::new(a, Arc::clone(&self.ctx))))
    }

    /// Coordinator for a group authorizable
    pub fn group(&self, authorizable: &Authorizable) -> MembershipResult<Group> {
        if !authorizable.is_group() {
            return Err(MembershipError::InvalidNodeType {
                node: authorizable.node().to_string(),
                node_type: authorizable.kind().node_type().to_string(),
            });
        }
        Ok(Group::new(authorizable.clone(), Arc::clone(&self.ctx)))
    }

    pub fn authorizable_for_node(&self, node: &NodeId) -> MembershipResult<Option<Authorizable>> {
        self.ctx.authorizable_for_node(node)
    }

    /// All users and groups, sorted by ID
    pub fn authorizables(&self) -> MembershipResult<Vec<Authorizable>> {
        let mut all = Vec::new();
        for (_, node) in self.ctx.store().children(&self.folder)? {
            if let Some(a) = self.authorizable_for_node(&node)? {
                all.push(a);
            }
        }
        all.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(all)
    }

    /// Delete the node of `authorizable`
    ///
    /// Member entries pointing at it are left in place and skipped by
    /// later resolutions.
    pub fn remove_authorizable(&self, authorizable: &Authorizable) -> MembershipResult<()> {
        let store = self.ctx.store();
        if !store.node_exists(authorizable.node())? {
            return Err(MembershipError::AuthorizableNotFound(authorizable.id().to_string()));
        }

        let scope = RevertScope::begin(store, authorizable.node())?;
        store.remove_node(authorizable.node())?;
        self.ctx.persist()?;
        scope.commit();

        self.ctx.cache().clear();
        debug!("Removed {}", authorizable);
        Ok(())
    }

    /// Groups `authorizable` belongs to, declared only or inherited too
    pub fn member_of(
        &self,
        authorizable: &Authorizable,
        inherited: bool,
    ) -> MembershipResult<HashSet<Authorizable>> {
        self.ctx.member_of(authorizable, inherited)
    }

    pub fn save(&self) -> MembershipResult<()> {
        Ok(self.ctx.store().save()?)
    }

    /// Discard unsaved changes
    pub fn refresh(&self) -> MembershipResult<()> {
        self.ctx.store().refresh()?;
        self.ctx.cache().clear();
        Ok(())
    }
}
