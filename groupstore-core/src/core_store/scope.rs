/*
    scope.rs - Scoped revert of pending changes

    A RevertScope captures the pending state of one subtree when it is
    opened. Unless commit() is called, dropping the scope puts the subtree
    back exactly as captured, so every early return and every `?` inside a
    multi-step write undoes the partial change.
*/

use super::errors::StoreResult;
use super::node::NodeId;
use super::store::{NodeStore, SubtreeSnapshot};
use tracing::{debug, error};

/// Guard reverting one subtree to its state at creation unless committed
pub struct RevertScope<'a> {
    store: &'a dyn NodeStore,
    snapshot: Option<SubtreeSnapshot>,
}

impl<'a> RevertScope<'a> {
    /// Capture the subtree rooted at `node`
    pub fn begin(store: &'a dyn NodeStore, node: &NodeId) -> StoreResult<Self> {
        let snapshot = store.snapshot_subtree(node)?;
        Ok(RevertScope {
            store,
            snapshot: Some(snapshot),
        })
    }

    /// Keep the changes made inside the scope
    pub fn commit(mut self) {
        self.snapshot = None;
    }

    /// Revert now, reporting a failed restore to the caller
    pub fn revert(mut self) -> StoreResult<()> {
        match self.snapshot.take() {
            Some(snapshot) => self.store.restore_subtree(snapshot),
            None => Ok(()),
        }
    }
}

impl Drop for RevertScope<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            let root = snapshot.root.clone();
            debug!("Reverting pending changes below {}", root);
            if let Err(e) = self.store.restore_subtree(snapshot) {
                error!("Failed to revert pending changes below {}: {}", root, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_store::memory_store::MemoryNodeStore;
    use crate::core_store::node::{PropertyValue, Value};
    use crate::core_store::StoreError;

    fn long(v: i64) -> PropertyValue {
        PropertyValue::Single(Value::Long(v))
    }

    fn failing_write(store: &MemoryNodeStore, node: &NodeId) -> StoreResult<()> {
        let _scope = RevertScope::begin(store, node)?;
        store.set_property(node, "counter", long(2))?;
        store.add_child(node, "partial", "t")?;
        Err(StoreError::Constraint("rejected".to_string()))
    }

    #[test]
    fn test_drop_reverts() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        let node = store.add_child(&root, "n", "t").unwrap();
        store.set_property(&node, "counter", long(1)).unwrap();

        assert!(failing_write(&store, &node).is_err());
        assert_eq!(store.property(&node, "counter").unwrap(), Some(long(1)));
        assert!(!store.has_child(&node, "partial").unwrap());
    }

    #[test]
    fn test_commit_keeps_changes() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        let node = store.add_child(&root, "n", "t").unwrap();

        let scope = RevertScope::begin(&store, &node).unwrap();
        store.set_property(&node, "counter", long(5)).unwrap();
        scope.commit();

        assert_eq!(store.property(&node, "counter").unwrap(), Some(long(5)));
    }

    #[test]
    fn test_explicit_revert() {
        let store = MemoryNodeStore::new("default");
        let root = store.root();
        let node = store.add_child(&root, "n", "t").unwrap();

        let scope = RevertScope::begin(&store, &node).unwrap();
        store.set_property(&node, "counter", long(5)).unwrap();
        scope.revert().unwrap();

        assert_eq!(store.property(&node, "counter").unwrap(), None);
    }
}
