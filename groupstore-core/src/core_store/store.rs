//! NodeStore Trait - Abstraction over the persisted-entity store
//!
//! The membership core never talks to a concrete backend. Everything it
//! needs from the hierarchical store goes through this trait:
//!
//! ```text
//! Group / MembershipProvider / BTreeSequence
//!       |
//!       v
//! NodeStore (trait)
//!       |
//!       +---> MemoryNodeStore (in-process, optional JSON backing file)
//!       |
//!       +---> test doubles (fault injection)
//! ```
//!
//! Writes go to a pending (transient) view. `save` publishes pending
//! changes, `refresh` discards them. Scoped revert of one subtree is built
//! on `snapshot_subtree` / `restore_subtree` (see [`RevertScope`]).
//!
//! [`RevertScope`]: super::scope::RevertScope

use super::errors::StoreResult;
use super::node::{NodeData, NodeId, PropertyValue};
use std::collections::HashMap;

/// Pending state of one subtree, captured for a later restore
#[derive(Debug, Clone)]
pub struct SubtreeSnapshot {
    /// Root of the captured subtree
    pub root: NodeId,
    /// Every node of the subtree, root included
    pub nodes: HashMap<NodeId, NodeData>,
}

/// Capability consumed from the hierarchical persisted-entity store
pub trait NodeStore: Send + Sync {
    /// Name of the workspace this store serves
    ///
    /// Authorizables materialized from different workspaces never mix.
    fn workspace(&self) -> &str;

    /// Identifier of the root node
    fn root(&self) -> NodeId;

    /// Check whether a node exists in the pending view
    fn node_exists(&self, id: &NodeId) -> StoreResult<bool>;

    /// Type tag of a node
    fn node_type(&self, id: &NodeId) -> StoreResult<String>;

    /// Name of a node within its parent
    fn node_name(&self, id: &NodeId) -> StoreResult<String>;

    /// Parent of a node, `None` for the root
    fn parent(&self, id: &NodeId) -> StoreResult<Option<NodeId>>;

    /// Resolve a reference value to a node
    ///
    /// Returns `Ok(None)` when no node carries the identifier, which is how
    /// dangling weak references show up.
    fn node_by_identifier(&self, identifier: &str) -> StoreResult<Option<NodeId>>;

    fn has_property(&self, id: &NodeId, name: &str) -> StoreResult<bool>;

    fn property(&self, id: &NodeId, name: &str) -> StoreResult<Option<PropertyValue>>;

    /// Property names of a node in sorted order
    fn property_names(&self, id: &NodeId) -> StoreResult<Vec<String>>;

    /// Create or replace a property
    fn set_property(&self, id: &NodeId, name: &str, value: PropertyValue) -> StoreResult<()>;

    /// Remove a property, returning whether it existed
    fn remove_property(&self, id: &NodeId, name: &str) -> StoreResult<bool>;

    fn has_child(&self, id: &NodeId, name: &str) -> StoreResult<bool>;

    fn child(&self, id: &NodeId, name: &str) -> StoreResult<Option<NodeId>>;

    /// Named children of a node in name order
    fn children(&self, id: &NodeId) -> StoreResult<Vec<(String, NodeId)>>;

    /// Create a child node
    ///
    /// # Arguments
    ///
    /// * `parent` - Node receiving the child
    /// * `name` - Child name, unique under `parent`
    /// * `node_type` - Type tag of the new node
    ///
    /// # Returns
    ///
    /// Identifier of the created node
    fn add_child(&self, parent: &NodeId, name: &str, node_type: &str) -> StoreResult<NodeId>;

    /// Remove a node together with its subtree
    fn remove_node(&self, id: &NodeId) -> StoreResult<()>;

    /// Move a node (and its subtree) under a new parent and name
    fn move_node(&self, id: &NodeId, new_parent: &NodeId, new_name: &str) -> StoreResult<()>;

    /// All `(holder node, property name)` pairs holding a weak reference to `target`
    fn weak_references(&self, target: &NodeId) -> StoreResult<Vec<(NodeId, String)>>;

    /// Publish all pending changes
    fn save(&self) -> StoreResult<()>;

    /// Discard all pending changes
    fn refresh(&self) -> StoreResult<()>;

    /// Capture the pending state of the subtree rooted at `id`
    fn snapshot_subtree(&self, id: &NodeId) -> StoreResult<SubtreeSnapshot>;

    /// Replace the pending state of a subtree with a captured snapshot
    fn restore_subtree(&self, snapshot: SubtreeSnapshot) -> StoreResult<()>;
}
