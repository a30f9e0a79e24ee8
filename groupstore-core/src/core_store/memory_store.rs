/*
    memory_store.rs - In-process NodeStore implementation

    Keeps two views of the node tree:
    - transient: what readers see, where every write lands
    - saved: the last published state

    save() copies transient over saved (and writes the optional JSON backing
    file), refresh() copies saved over transient.
*/

use super::errors::{StoreError, StoreResult};
use super::node::{
    is_valid_name, NodeData, NodeId, PropertyValue, Timestamp, Value, P_CREATED, P_CREATED_BY,
};
use super::store::{NodeStore, SubtreeSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Type tag of the root node
pub const NT_ROOT: &str = "rep:root";

const DEFAULT_USER: &str = "system";

/// Helper to convert poison errors into StoreError
fn handle_poison<T>(_err: PoisonError<T>) -> StoreError {
    StoreError::Storage("Lock poisoned: a thread panicked while holding the lock".to_string())
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    transient: HashMap<NodeId, NodeData>,
    saved: HashMap<NodeId, NodeData>,
}

impl StoreState {
    fn get(&self, id: &NodeId) -> StoreResult<&NodeData> {
        self.transient
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("node {}", id)))
    }

    fn get_mut(&mut self, id: &NodeId) -> StoreResult<&mut NodeData> {
        self.transient
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("node {}", id)))
    }

    /// Identifiers of `id` and all its descendants, parents first
    fn subtree_ids(&self, id: &NodeId) -> StoreResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let node = self.get(&current)?;
            stack.extend(node.children.values().cloned());
            out.push(current);
        }
        Ok(out)
    }
}

/// On-disk layout of the JSON backing file
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    workspace: String,
    root: NodeId,
    nodes: Vec<NodeData>,
}

/// In-memory node store with pending/saved views
pub struct MemoryNodeStore {
    workspace: String,
    user: String,
    root: NodeId,
    state: RwLock<StoreState>,
    backing_file: Option<PathBuf>,
}

impl MemoryNodeStore {
    /// Create an empty store holding only the root node
    pub fn new(workspace: impl Into<String>) -> Self {
        let root = NodeId::generate();
        let mut node = NodeData::new(root.clone(), String::new(), NT_ROOT.to_string(), None);
        stamp(&mut node, DEFAULT_USER);

        let mut state = StoreState::default();
        state.transient.insert(root.clone(), node);
        state.saved = state.transient.clone();

        MemoryNodeStore {
            workspace: workspace.into(),
            user: DEFAULT_USER.to_string(),
            root,
            state: RwLock::new(state),
            backing_file: None,
        }
    }

    /// Open a store backed by a JSON file, creating a fresh one if the file is absent
    ///
    /// Every successful `save()` rewrites the file.
    pub fn open(path: impl AsRef<Path>, workspace: impl Into<String>) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No store file at {}, starting empty", path.display());
            let mut store = Self::new(workspace);
            store.backing_file = Some(path.to_path_buf());
            return Ok(store);
        }

        let contents = std::fs::read_to_string(path)?;
        let persisted: PersistedStore = serde_json::from_str(&contents)?;
        let nodes: HashMap<NodeId, NodeData> = persisted
            .nodes
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();
        if !nodes.contains_key(&persisted.root) {
            return Err(StoreError::Serialization(format!(
                "root node {} missing from {}",
                persisted.root,
                path.display()
            )));
        }

        Ok(MemoryNodeStore {
            workspace: persisted.workspace,
            user: DEFAULT_USER.to_string(),
            root: persisted.root,
            state: RwLock::new(StoreState {
                transient: nodes.clone(),
                saved: nodes,
            }),
            backing_file: Some(path.to_path_buf()),
        })
    }

    /// Set the user name stamped into `gs:createdBy` of new nodes
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Whether there are changes that `save()` would publish
    pub fn has_pending_changes(&self) -> StoreResult<bool> {
        let state = self.state.read().map_err(handle_poison)?;
        Ok(state.transient != state.saved)
    }

    fn write_backing_file(&self, saved: &HashMap<NodeId, NodeData>) -> StoreResult<()> {
        let Some(path) = &self.backing_file else {
            return Ok(());
        };

        let mut nodes: Vec<NodeData> = saved.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let persisted = PersistedStore {
            workspace: self.workspace.clone(),
            root: self.root.clone(),
            nodes,
        };
        let json = serde_json::to_string_pretty(&persisted)?;

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn stamp(node: &mut NodeData, user: &str) {
    node.properties.insert(
        P_CREATED.to_string(),
        PropertyValue::Single(Value::Date(Timestamp::now())),
    );
    node.properties.insert(
        P_CREATED_BY.to_string(),
        PropertyValue::Single(Value::String(user.to_string())),
    );
}

fn check_name(name: &str) -> StoreResult<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

impl NodeStore for MemoryNodeStore {
    fn workspace(&self) -> &str {
        &self.workspace
    }

    fn root(&self) -> NodeId {
        self.root.clone()
    }

    fn node_exists(&self, id: &NodeId) -> StoreResult<bool> {
        Ok(self.state.read().map_err(handle_poison)?.transient.contains_key(id))
    }

    fn node_type(&self, id: &NodeId) -> StoreResult<String> {
        Ok(self.state.read().map_err(handle_poison)?.get(id)?.node_type.clone())
    }

    fn node_name(&self, id: &NodeId) -> StoreResult<String> {
        Ok(self.state.read().map_err(handle_poison)?.get(id)?.name.clone())
    }

    fn parent(&self, id: &NodeId) -> StoreResult<Option<NodeId>> {
        Ok(self.state.read().map_err(handle_poison)?.get(id)?.parent.clone())
    }

    fn node_by_identifier(&self, identifier: &str) -> StoreResult<Option<NodeId>> {
        let id = NodeId::new(identifier);
        let state = self.state.read().map_err(handle_poison)?;
        Ok(state.transient.contains_key(&id).then_some(id))
    }

    fn has_property(&self, id: &NodeId, name: &str) -> StoreResult<bool> {
        let state = self.state.read().map_err(handle_poison)?;
        Ok(state.get(id)?.properties.contains_key(name))
    }

    fn property(&self, id: &NodeId, name: &str) -> StoreResult<Option<PropertyValue>> {
        let state = self.state.read().map_err(handle_poison)?;
        Ok(state.get(id)?.properties.get(name).cloned())
    }

    fn property_names(&self, id: &NodeId) -> StoreResult<Vec<String>> {
        let state = self.state.read().map_err(handle_poison)?;
        Ok(state.get(id)?.properties.keys().cloned().collect())
    }

    fn set_property(&self, id: &NodeId, name: &str, value: PropertyValue) -> StoreResult<()> {
        check_name(name)?;
        let mut state = self.state.write().map_err(handle_poison)?;
        state.get_mut(id)?.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn remove_property(&self, id: &NodeId, name: &str) -> StoreResult<bool> {
        let mut state = self.state.write().map_err(handle_poison)?;
        Ok(state.get_mut(id)?.properties.remove(name).is_some())
    }

    fn has_child(&self, id: &NodeId, name: &str) -> StoreResult<bool> {
        let state = self.state.read().map_err(handle_poison)?;
        Ok(state.get(id)?.children.contains_key(name))
    }

    fn child(&self, id: &NodeId, name: &str) -> StoreResult<Option<NodeId>> {
        let state = self.state.read().map_err(handle_poison)?;
        Ok(state.get(id)?.children.get(name).cloned())
    }

    fn children(&self, id: &NodeId) -> StoreResult<Vec<(String, NodeId)>> {
        let state = self.state.read().map_err(handle_poison)?;
        Ok(state
            .get(id)?
            .children
            .iter()
            .map(|(name, child)| (name.clone(), child.clone()))
            .collect())
    }

    fn add_child(&self, parent: &NodeId, name: &str, node_type: &str) -> StoreResult<NodeId> {
        check_name(name)?;
        let mut state = self.state.write().map_err(handle_poison)?;
        if state.get(parent)?.children.contains_key(name) {
            return Err(StoreError::ItemExists(format!("{} under {}", name, parent)));
        }

        let id = NodeId::generate();
        let mut node = NodeData::new(
            id.clone(),
            name.to_string(),
            node_type.to_string(),
            Some(parent.clone()),
        );
        stamp(&mut node, &self.user);

        state.transient.insert(id.clone(), node);
        state.get_mut(parent)?.children.insert(name.to_string(), id.clone());
        Ok(id)
    }

    fn remove_node(&self, id: &NodeId) -> StoreResult<()> {
        if *id == self.root {
            return Err(StoreError::InvalidOperation("cannot remove the root node".to_string()));
        }

        let mut state = self.state.write().map_err(handle_poison)?;
        let (name, parent) = {
            let node = state.get(id)?;
            (node.name.clone(), node.parent.clone())
        };
        for doomed in state.subtree_ids(id)? {
            state.transient.remove(&doomed);
        }
        if let Some(parent) = parent {
            if let Some(p) = state.transient.get_mut(&parent) {
                p.children.remove(&name);
            }
        }
        Ok(())
    }

    fn move_node(&self, id: &NodeId, new_parent: &NodeId, new_name: &str) -> StoreResult<()> {
        check_name(new_name)?;
        if *id == self.root {
            return Err(StoreError::InvalidOperation("cannot move the root node".to_string()));
        }

        let mut state = self.state.write().map_err(handle_poison)?;
        if state.subtree_ids(id)?.contains(new_parent) {
            return Err(StoreError::InvalidOperation(format!(
                "cannot move {} below itself",
                id
            )));
        }
        if let Some(existing) = state.get(new_parent)?.children.get(new_name) {
            if existing != id {
                return Err(StoreError::ItemExists(format!("{} under {}", new_name, new_parent)));
            }
        }

        let (old_name, old_parent) = {
            let node = state.get(id)?;
            (node.name.clone(), node.parent.clone())
        };
        if let Some(old_parent) = old_parent {
            state.get_mut(&old_parent)?.children.remove(&old_name);
        }
        state
            .get_mut(new_parent)?
            .children
            .insert(new_name.to_string(), id.clone());
        let node = state.get_mut(id)?;
        node.name = new_name.to_string();
        node.parent = Some(new_parent.clone());
        Ok(())
    }

    fn weak_references(&self, target: &NodeId) -> StoreResult<Vec<(NodeId, String)>> {
        let state = self.state.read().map_err(handle_poison)?;
        let mut refs: Vec<(NodeId, String)> = state
            .transient
            .values()
            .flat_map(|node| {
                node.properties
                    .iter()
                    .filter(|(_, value)| value.references(target))
                    .map(|(name, _)| (node.id.clone(), name.clone()))
            })
            .collect();
        refs.sort();
        Ok(refs)
    }

    fn save(&self) -> StoreResult<()> {
        let mut state = self.state.write().map_err(handle_poison)?;
        self.write_backing_file(&state.transient)?;
        state.saved = state.transient.clone();
        Ok(())
    }

    fn refresh(&self) -> StoreResult<()> {
        let mut state = self.state.write().map_err(handle_poison)?;
        state.transient = state.saved.clone();
        Ok(())
    }

    fn snapshot_subtree(&self, id: &NodeId) -> StoreResult<SubtreeSnapshot> {
        let state = self.state.read().map_err(handle_poison)?;
        let mut nodes = HashMap::new();
        for node_id in state.subtree_ids(id)? {
            let node = state.get(&node_id)?.clone();
            nodes.insert(node_id, node);
        }
        Ok(SubtreeSnapshot {
            root: id.clone(),
            nodes,
        })
    }

    fn restore_subtree(&self, snapshot: SubtreeSnapshot) -> StoreResult<()> {
        let root = snapshot
            .nodes
            .get(&snapshot.root)
            .cloned()
            .ok_or_else(|| StoreError::InvalidOperation("snapshot without its root".to_string()))?;

        let mut state = self.state.write().map_err(handle_poison)?;
        if state.transient.contains_key(&snapshot.root) {
            for current in state.subtree_ids(&snapshot.root)? {
                state.transient.remove(&current);
            }
        }
        state.transient.extend(snapshot.nodes);
        if let Some(parent) = &root.parent {
            if let Some(p) = state.transient.get_mut(parent) {
                p.children.insert(root.name.clone(), root.id.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn string(v: &str) -> PropertyValue {
        PropertyValue::Single(Value::String(v.to_string()))
    }

    #[test]
    fn test_new_store_has_stamped_root() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        assert!(store.node_exists(&root).unwrap());
        assert_eq!(store.node_type(&root).unwrap(), NT_ROOT);
        assert!(store.has_property(&root, P_CREATED).unwrap());
        assert!(store.has_property(&root, P_CREATED_BY).unwrap());
    }

    #[test]
    fn test_add_child_and_lookup() {
        let store = MemoryNodeStore::new("default").with_user("alice");
        let root = store.root();
        let child = store.add_child(&root, "a", "nt:unstructured").unwrap();

        assert!(store.has_child(&root, "a").unwrap());
        assert_eq!(store.child(&root, "a").unwrap(), Some(child.clone()));
        assert_eq!(store.parent(&child).unwrap(), Some(root.clone()));
        assert_eq!(
            store.property(&child, P_CREATED_BY).unwrap(),
            Some(string("alice"))
        );
        assert_eq!(
            store.node_by_identifier(child.as_str()).unwrap(),
            Some(child)
        );
    }

    #[test]
    fn test_duplicate_child_name_rejected() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        store.add_child(&root, "a", "t").unwrap();
        let err = store.add_child(&root, "a", "t").unwrap_err();
        assert!(matches!(err, StoreError::ItemExists(_)));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        assert!(matches!(
            store.add_child(&root, "a/b", "t"),
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.set_property(&root, "", string("x")),
            Err(StoreError::InvalidName(_))
        ));
    }

    #[test]
    fn test_remove_node_removes_subtree() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        let a = store.add_child(&root, "a", "t").unwrap();
        let b = store.add_child(&a, "b", "t").unwrap();

        store.remove_node(&a).unwrap();
        assert!(!store.node_exists(&a).unwrap());
        assert!(!store.node_exists(&b).unwrap());
        assert!(!store.has_child(&root, "a").unwrap());
        assert!(store.remove_node(&root).is_err());
    }

    #[test]
    fn test_move_node() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        let a = store.add_child(&root, "a", "t").unwrap();
        let b = store.add_child(&root, "b", "t").unwrap();

        store.move_node(&b, &a, "moved").unwrap();
        assert!(!store.has_child(&root, "b").unwrap());
        assert_eq!(store.child(&a, "moved").unwrap(), Some(b.clone()));
        assert_eq!(store.node_name(&b).unwrap(), "moved");

        // cannot move a node below itself
        assert!(store.move_node(&a, &b, "loop").is_err());
    }

    #[test]
    fn test_weak_references_found_in_single_and_multi_values() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        let target = store.add_child(&root, "target", "t").unwrap();
        let holder = store.add_child(&root, "holder", "t").unwrap();

        store
            .set_property(
                &holder,
                "many",
                PropertyValue::Multiple(vec![Value::WeakReference(target.clone())]),
            )
            .unwrap();
        store
            .set_property(&root, "one", PropertyValue::Single(Value::WeakReference(target.clone())))
            .unwrap();

        let refs = store.weak_references(&target).unwrap();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&(holder, "many".to_string())));
        assert!(refs.contains(&(root, "one".to_string())));
    }

    #[test]
    fn test_refresh_discards_pending_changes() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        store.add_child(&root, "kept", "t").unwrap();
        store.save().unwrap();

        store.add_child(&root, "dropped", "t").unwrap();
        assert!(store.has_pending_changes().unwrap());
        store.refresh().unwrap();

        assert!(store.has_child(&root, "kept").unwrap());
        assert!(!store.has_child(&root, "dropped").unwrap());
        assert!(!store.has_pending_changes().unwrap());
    }

    #[test]
    fn test_snapshot_and_restore_subtree() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        let group = store.add_child(&root, "group", "t").unwrap();
        store.set_property(&group, "p", string("before")).unwrap();
        let unrelated = store.add_child(&root, "other", "t").unwrap();

        let snapshot = store.snapshot_subtree(&group).unwrap();
        store.set_property(&group, "p", string("after")).unwrap();
        let added = store.add_child(&group, "child", "t").unwrap();
        store.set_property(&unrelated, "q", string("kept")).unwrap();

        store.restore_subtree(snapshot).unwrap();
        assert_eq!(store.property(&group, "p").unwrap(), Some(string("before")));
        assert!(!store.node_exists(&added).unwrap());
        assert!(!store.has_child(&group, "child").unwrap());
        // changes outside the subtree survive
        assert_eq!(store.property(&unrelated, "q").unwrap(), Some(string("kept")));
    }

    #[test]
    fn test_backing_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryNodeStore::open(&path, "ws").unwrap();
        let root = store.root();
        let a = store.add_child(&root, "a", "t").unwrap();
        store.set_property(&a, "p", string("v")).unwrap();
        store.save().unwrap();
        // unsaved changes never reach the file
        store.add_child(&root, "pending", "t").unwrap();

        let reopened = MemoryNodeStore::open(&path, "ignored").unwrap();
        assert_eq!(reopened.workspace(), "ws");
        assert_eq!(reopened.root(), root);
        assert_eq!(reopened.child(&root, "a").unwrap(), Some(a.clone()));
        assert_eq!(reopened.property(&a, "p").unwrap(), Some(string("v")));
        assert!(!reopened.has_child(&root, "pending").unwrap());
    }
}
