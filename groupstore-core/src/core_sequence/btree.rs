/*
    btree.rs - Sorted string-keyed map laid out as a node subtree

    Layout below the container node:
    - leaf nodes carry the entries as single-valued properties (key = name)
    - inner nodes carry only child nodes, each named after the lower bound
      of the keys in its subtree
    - an empty sequence is an empty container

    A node holding more than `max_children` items splits, a node holding
    fewer than `min_children` items merges with a neighbour when the result
    fits, and an inner container left with a single child absorbs it.

    Properties listed as ignored (bookkeeping stamped by the store) are
    never entries and never count towards a node's fan-out.
*/

use crate::core_store::{
    NodeId, NodeStore, PropertyValue, StoreError, StoreResult, Value, P_CREATED, P_CREATED_BY,
};
use crate::core_store::node::NT_UNSTRUCTURED;
use std::collections::HashSet;
use tracing::trace;

/// Sorted map from string keys to values, persisted under one container node
pub struct BTreeSequence<'a> {
    store: &'a dyn NodeStore,
    root: NodeId,
    min_children: usize,
    max_children: usize,
    ignored_properties: HashSet<String>,
}

impl<'a> BTreeSequence<'a> {
    /// Open the sequence rooted at `root`
    ///
    /// `max_children` must be at least 2 and at least twice `min_children`,
    /// and `min_children` at least 1.
    pub fn new(
        store: &'a dyn NodeStore,
        root: NodeId,
        min_children: usize,
        max_children: usize,
    ) -> StoreResult<Self> {
        if min_children < 1 || max_children < 2 || min_children * 2 > max_children {
            return Err(StoreError::InvalidOperation(format!(
                "invalid fan-out: min {} max {}",
                min_children, max_children
            )));
        }

        Ok(BTreeSequence {
            store,
            root,
            min_children,
            max_children,
            ignored_properties: HashSet::new(),
        })
    }

    /// Set of property names excluded from the key space
    pub fn ignored_properties_mut(&mut self) -> &mut HashSet<String> {
        &mut self.ignored_properties
    }

    /// Exclude the store's bookkeeping properties (`gs:created`, `gs:createdBy`)
    pub fn ignoring_bookkeeping(mut self) -> Self {
        let ignored = self.ignored_properties_mut();
        ignored.insert(P_CREATED.to_string());
        ignored.insert(P_CREATED_BY.to_string());
        self
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    fn is_ignored(&self, key: &str) -> bool {
        self.ignored_properties.contains(key)
    }

    pub fn has_item(&self, key: &str) -> StoreResult<bool> {
        if self.is_ignored(key) {
            return Ok(false);
        }
        let leaf = self.find_leaf(key)?;
        self.store.has_property(&leaf, key)
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        if self.is_ignored(key) {
            return Ok(None);
        }
        let leaf = self.find_leaf(key)?;
        Ok(self
            .store
            .property(&leaf, key)?
            .and_then(|p| p.single().cloned()))
    }

    /// Insert a new entry; fails with `ItemExists` if `key` is present
    pub fn insert(&self, key: &str, value: Value) -> StoreResult<()> {
        if self.is_ignored(key) {
            return Err(StoreError::InvalidName(key.to_string()));
        }
        if self.has_item(key)? {
            return Err(StoreError::ItemExists(key.to_string()));
        }
        let leaf = self.descend(key, true)?;

        self.store.set_property(&leaf, key, PropertyValue::Single(value))?;
        if self.items(&leaf)?.len() > self.max_children {
            self.split(&leaf)?;
        }
        Ok(())
    }

    /// Remove the entry under `key`, returning whether it existed
    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        if self.is_ignored(key) {
            return Ok(false);
        }
        let leaf = self.find_leaf(key)?;
        if !self.store.remove_property(&leaf, key)? {
            return Ok(false);
        }

        self.rebalance(&leaf)?;
        Ok(true)
    }

    /// All entries in key order
    pub fn iter(&self) -> StoreResult<std::vec::IntoIter<(String, Value)>> {
        let mut out = Vec::new();
        self.collect(&self.root, &mut out)?;
        Ok(out.into_iter())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.iter()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        // non-root leaves are removed as soon as they run empty
        Ok(self.store.children(&self.root)?.is_empty() && self.entry_names(&self.root)?.is_empty())
    }

    /// Depth of the tree, 1 for a sequence stored directly on the container
    pub fn depth(&self) -> StoreResult<usize> {
        let mut depth = 1;
        let mut node = self.root.clone();
        while let Some((_, first)) = self.store.children(&node)?.into_iter().next() {
            node = first;
            depth += 1;
        }
        Ok(depth)
    }

    fn collect(&self, node: &NodeId, out: &mut Vec<(String, Value)>) -> StoreResult<()> {
        let children = self.store.children(node)?;
        if children.is_empty() {
            for key in self.entry_names(node)? {
                if let Some(value) = self.store.property(node, &key)?.and_then(|p| p.single().cloned()) {
                    out.push((key, value));
                }
            }
        } else {
            for (_, child) in children {
                self.collect(&child, out)?;
            }
        }
        Ok(())
    }

    fn entry_names(&self, node: &NodeId) -> StoreResult<Vec<String>> {
        Ok(self
            .store
            .property_names(node)?
            .into_iter()
            .filter(|name| !self.is_ignored(name))
            .collect())
    }

    /// Items of a node: child names for inner nodes, entry keys for leaves
    fn items(&self, node: &NodeId) -> StoreResult<Vec<String>> {
        let children = self.store.children(node)?;
        if children.is_empty() {
            self.entry_names(node)
        } else {
            Ok(children.into_iter().map(|(name, _)| name).collect())
        }
    }

    fn is_leaf(&self, node: &NodeId) -> StoreResult<bool> {
        Ok(self.store.children(node)?.is_empty())
    }

    /// Leaf whose key range covers `key`
    fn find_leaf(&self, key: &str) -> StoreResult<NodeId> {
        self.descend(key, false)
    }

    /// Walk from the container to the leaf for `key`
    ///
    /// With `widen` set, a leftmost child whose name is above `key` is
    /// renamed to `key` on the way down, so every node name stays a lower
    /// bound of the keys below it.
    fn descend(&self, key: &str, widen: bool) -> StoreResult<NodeId> {
        let mut node = self.root.clone();
        loop {
            let children = self.store.children(&node)?;
            let Some((first_name, first)) = children.first() else {
                return Ok(node);
            };
            let next = match children.iter().rev().find(|(name, _)| name.as_str() <= key) {
                Some((_, id)) => id.clone(),
                None => {
                    if widen {
                        trace!("Widening sequence node {} to {}", first_name, key);
                        self.store.move_node(first, &node, key)?;
                    }
                    first.clone()
                }
            };
            node = next;
        }
    }

    /// Move the named items of `from` (leaf entries or child nodes) into `to`
    fn move_items(&self, from: &NodeId, to: &NodeId, items: &[String], leaf: bool) -> StoreResult<()> {
        for item in items {
            if leaf {
                if let Some(value) = self.store.property(from, item)? {
                    self.store.set_property(to, item, value)?;
                    self.store.remove_property(from, item)?;
                }
            } else if let Some(child) = self.store.child(from, item)? {
                self.store.move_node(&child, to, item)?;
            }
        }
        Ok(())
    }

    /// Child under a throwaway name, renamed once the items it replaces have moved out
    fn temp_child(&self, parent: &NodeId) -> StoreResult<NodeId> {
        let temp = format!("tmp-{}", uuid::Uuid::new_v4());
        self.store.add_child(parent, &temp, NT_UNSTRUCTURED)
    }

    fn split(&self, node: &NodeId) -> StoreResult<()> {
        let items = self.items(node)?;
        let leaf = self.is_leaf(node)?;
        let (lower, upper) = items.split_at(items.len() / 2);

        if *node == self.root {
            trace!("Splitting sequence root {} ({} items)", node, items.len());
            for half in [lower, upper] {
                let holder = self.temp_child(node)?;
                self.move_items(node, &holder, half, leaf)?;
                self.store.move_node(&holder, node, &half[0])?;
            }
            return Ok(());
        }

        let parent = self
            .store
            .parent(node)?
            .ok_or_else(|| StoreError::InvalidOperation(format!("sequence node {} has no parent", node)))?;
        trace!("Splitting sequence node {} ({} items)", node, items.len());

        // upper[0] lies strictly inside this node's key range, so it is
        // free under the parent and sorts right after this node
        let sibling = self.store.add_child(&parent, &upper[0], NT_UNSTRUCTURED)?;
        self.move_items(node, &sibling, upper, leaf)?;

        if self.items(&parent)?.len() > self.max_children {
            self.split(&parent)?;
        }
        Ok(())
    }

    fn rebalance(&self, node: &NodeId) -> StoreResult<()> {
        if *node == self.root {
            return self.collapse_root();
        }

        let parent = self
            .store
            .parent(node)?
            .ok_or_else(|| StoreError::InvalidOperation(format!("sequence node {} has no parent", node)))?;
        let count = self.items(node)?.len();

        if count == 0 {
            trace!("Removing empty sequence node {}", node);
            self.store.remove_node(node)?;
            return self.rebalance(&parent);
        }
        if count >= self.min_children {
            return Ok(());
        }

        let siblings: Vec<NodeId> = self
            .store
            .children(&parent)?
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        let Some(pos) = siblings.iter().position(|id| id == node) else {
            return Ok(());
        };
        let (earlier, later) = if pos > 0 {
            (siblings[pos - 1].clone(), node.clone())
        } else if pos + 1 < siblings.len() {
            (node.clone(), siblings[pos + 1].clone())
        } else {
            return self.rebalance(&parent);
        };

        let later_items = self.items(&later)?;
        if self.items(&earlier)?.len() + later_items.len() > self.max_children {
            return Ok(());
        }

        trace!("Merging sequence node {} into {}", later, earlier);
        let leaf = self.is_leaf(&later)?;
        self.move_items(&later, &earlier, &later_items, leaf)?;
        self.store.remove_node(&later)?;
        self.rebalance(&parent)
    }

    fn collapse_root(&self) -> StoreResult<()> {
        loop {
            let children = self.store.children(&self.root)?;
            if children.len() != 1 {
                return Ok(());
            }
            let (_, only) = &children[0];
            trace!("Collapsing single child {} into sequence root", only);

            // park the child under a temporary name so its items can take any name
            let temp = format!("tmp-{}", uuid::Uuid::new_v4());
            self.store.move_node(only, &self.root, &temp)?;
            let items = self.items(only)?;
            let leaf = self.is_leaf(only)?;
            self.move_items(only, &self.root, &items, leaf)?;
            self.store.remove_node(only)?;
        }
    }
}
